pub mod config;
pub mod error;
pub mod prompts;
pub mod schema;
pub mod types;

pub use config::Config;
pub use error::{CoreError, Result};
pub use prompts::{ModelTier, PromptRegistry, PromptTemplate};
pub use schema::{Column, SchemaCatalog, SchemaDefinition, Table};
pub use types::{
    Confidence, DataSourceSummary, ErrorCategory, Operation, PlanStep, QueryPlan, StepResult,
    TokenUsage,
};
