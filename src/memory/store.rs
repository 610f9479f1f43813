//! Memory storage backends

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Storage for per-user memory
///
/// Keys are opaque user identifiers. Implementations must be safe to share
/// across handlers.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Current memory for a user, if any
    async fn get(&self, user: &str) -> Option<String>;

    /// Replace a user's memory; `None` or blank text clears it
    async fn set(&self, user: &str, memory: Option<String>);

    /// Remove a user's memory
    async fn clear(&self, user: &str) {
        self.set(user, None).await;
    }
}

/// Process-local memory store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with stored memory
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no user has stored memory
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn get(&self, user: &str) -> Option<String> {
        self.entries.read().await.get(user).cloned()
    }

    async fn set(&self, user: &str, memory: Option<String>) {
        let mut entries = self.entries.write().await;
        match memory.filter(|m| !m.trim().is_empty()) {
            Some(memory) => {
                entries.insert(user.to_string(), memory);
            }
            None => {
                entries.remove(user);
            }
        }
    }
}
