pub mod handlers;
pub mod server;
pub mod state;

pub use server::ApiServer;
pub use state::ApiState;
