pub mod catalog;
pub mod error;
pub mod manager;
pub mod safety;

pub use catalog::{CatalogEntry, DatasourceCatalog, DatasourceSpec};
pub use error::DatasourceError;
pub use manager::{DatasourceManager, QueryResult};
