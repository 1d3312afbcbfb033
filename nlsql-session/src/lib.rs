pub mod error;
pub mod store;
pub mod types;

pub use error::SessionError;
pub use store::{InMemorySessionStore, SessionStore};
pub use types::{Message, Sender, Thread};
