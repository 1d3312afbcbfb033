use chrono::{DateTime, Utc};
use nlsql_core::types::{TokenUsage, UsedDatabases};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Server,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub messages: Vec<Message>,
    #[serde(skip)]
    pub token_usage: TokenUsage,
    #[serde(skip)]
    pub used_databases: UsedDatabases,
}

impl Thread {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
            messages: Vec::new(),
            token_usage: TokenUsage::default(),
            used_databases: UsedDatabases::default(),
        }
    }
}
