use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use nlsql_core::types::TokenUsage;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::SessionError;
use crate::types::{Message, Sender, Thread};

/// Capability set a persistent backend must implement; the in-memory realization
/// below satisfies every invariant and is what the binary wires up by default.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_thread(&self, name: String) -> Thread;
    async fn get_thread(&self, id: Uuid) -> Result<Thread, SessionError>;
    async fn list_threads(&self) -> Vec<Thread>;
    async fn add_message(
        &self,
        id: Uuid,
        sender: Sender,
        content: String,
        metadata: Option<serde_json::Value>,
    ) -> Result<Message, SessionError>;
    async fn get_messages(&self, id: Uuid) -> Result<Vec<Message>, SessionError>;
    async fn add_token_usage(&self, id: Uuid, input: u64, output: u64) -> Result<(), SessionError>;
    async fn get_token_usage(&self, id: Uuid) -> Result<TokenUsage, SessionError>;
    async fn add_used_databases(&self, id: Uuid, db_ids: Vec<String>) -> Result<(), SessionError>;
    async fn get_used_databases(&self, id: Uuid) -> Result<Vec<String>, SessionError>;
}

/// One `RwLock` per thread so that turns in distinct threads never contend;
/// the outer map lock is only held for the lookup itself.
#[derive(Default)]
pub struct InMemorySessionStore {
    threads: RwLock<HashMap<Uuid, Arc<RwLock<Thread>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn thread_lock(&self, id: Uuid) -> Result<Arc<RwLock<Thread>>, SessionError> {
        self.threads
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| SessionError::ThreadNotFound(id.to_string()))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_thread(&self, name: String) -> Thread {
        let thread = Thread::new(name);
        let snapshot = thread.clone_shallow();
        self.threads.write().await.insert(thread.id, Arc::new(RwLock::new(thread)));
        snapshot
    }

    async fn get_thread(&self, id: Uuid) -> Result<Thread, SessionError> {
        let lock = self.thread_lock(id).await?;
        let guard = lock.read().await;
        Ok(guard.clone_shallow())
    }

    async fn list_threads(&self) -> Vec<Thread> {
        let threads = self.threads.read().await;
        let mut out = Vec::with_capacity(threads.len());
        for lock in threads.values() {
            out.push(lock.read().await.clone_shallow());
        }
        out.sort_by_key(|t| t.created_at);
        out
    }

    async fn add_message(
        &self,
        id: Uuid,
        sender: Sender,
        content: String,
        metadata: Option<serde_json::Value>,
    ) -> Result<Message, SessionError> {
        let lock = self.thread_lock(id).await?;
        let mut thread = lock.write().await;
        let message = Message { id: Uuid::new_v4(), sender, content, created_at: Utc::now(), metadata };
        thread.messages.push(message.clone());
        Ok(message)
    }

    async fn get_messages(&self, id: Uuid) -> Result<Vec<Message>, SessionError> {
        let lock = self.thread_lock(id).await?;
        let guard = lock.read().await;
        Ok(guard.messages.clone())
    }

    async fn add_token_usage(&self, id: Uuid, input: u64, output: u64) -> Result<(), SessionError> {
        let lock = self.thread_lock(id).await?;
        lock.write().await.token_usage.add(input, output);
        Ok(())
    }

    async fn get_token_usage(&self, id: Uuid) -> Result<TokenUsage, SessionError> {
        let lock = self.thread_lock(id).await?;
        let guard = lock.read().await;
        Ok(guard.token_usage)
    }

    async fn add_used_databases(&self, id: Uuid, db_ids: Vec<String>) -> Result<(), SessionError> {
        let lock = self.thread_lock(id).await?;
        lock.write().await.used_databases.union_in(db_ids);
        Ok(())
    }

    async fn get_used_databases(&self, id: Uuid) -> Result<Vec<String>, SessionError> {
        let lock = self.thread_lock(id).await?;
        let guard = lock.read().await;
        Ok(guard.used_databases.as_sorted_vec())
    }
}

impl Thread {
    /// Clone taken while holding only a read lock, for list/get responses.
    fn clone_shallow(&self) -> Thread {
        Thread {
            id: self.id,
            name: self.name.clone(),
            created_at: self.created_at,
            messages: self.messages.clone(),
            token_usage: self.token_usage,
            used_databases: self.used_databases.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_usage_is_additive_across_calls() {
        let store = InMemorySessionStore::new();
        let thread = store.create_thread("t".to_string()).await;
        store.add_token_usage(thread.id, 10, 20).await.unwrap();
        store.add_token_usage(thread.id, 5, 5).await.unwrap();
        let usage = store.get_token_usage(thread.id).await.unwrap();
        assert_eq!(usage.input_tokens, 15);
        assert_eq!(usage.output_tokens, 25);
        assert_eq!(usage.call_count, 2);
    }

    #[tokio::test]
    async fn used_databases_union_is_idempotent() {
        let store = InMemorySessionStore::new();
        let thread = store.create_thread("t".to_string()).await;
        store.add_used_databases(thread.id, vec!["a".to_string(), "b".to_string()]).await.unwrap();
        store.add_used_databases(thread.id, vec!["a".to_string()]).await.unwrap();
        let dbs = store.get_used_databases(thread.id).await.unwrap();
        assert_eq!(dbs, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn messages_are_appended_in_order() {
        let store = InMemorySessionStore::new();
        let thread = store.create_thread("t".to_string()).await;
        store.add_message(thread.id, Sender::User, "hi".to_string(), None).await.unwrap();
        store.add_message(thread.id, Sender::Server, "hello".to_string(), None).await.unwrap();
        let messages = store.get_messages(thread.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "hi");
        assert_eq!(messages[1].content, "hello");
    }

    #[tokio::test]
    async fn unknown_thread_id_is_an_error() {
        let store = InMemorySessionStore::new();
        assert!(store.get_thread(Uuid::new_v4()).await.is_err());
    }
}
