//! Failure-tolerant facade over a [`DocumentStore`]

use super::{
    ChatTurn, DocumentStore, FileRecord, SearchRecord, UserProfile, UserStats, UserUpsert,
};
use std::sync::Arc;

/// Logs and swallows storage errors, returning a failure indicator instead
#[derive(Clone)]
pub struct Persistence {
    store: Arc<dyn DocumentStore>,
}

impl Persistence {
    /// Wrap a store
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Insert or refresh a user; `None` when the store failed
    pub async fn save_user(&self, user: &UserProfile) -> Option<UserUpsert> {
        match self.store.upsert_user(user).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!(user_id = user.user_id, "Error saving user: {}", e);
                None
            }
        }
    }

    /// Store a user's phone number
    pub async fn update_contact(&self, user_id: i64, phone_number: &str) -> bool {
        match self.store.update_user_contact(user_id, phone_number).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(user_id, "Error updating user contact: {}", e);
                false
            }
        }
    }

    /// Record a prompt/reply exchange
    pub async fn save_chat_turn(&self, user_id: i64, message: &str, response: &str) -> bool {
        let turn = ChatTurn::new(user_id, message, response);
        match self.store.insert_chat_turn(&turn).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(user_id, "Error saving chat history: {}", e);
                false
            }
        }
    }

    /// Record a file analysis
    pub async fn save_file_record(&self, record: &FileRecord) -> bool {
        match self.store.insert_file_record(record).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(user_id = record.user_id, "Error saving file metadata: {}", e);
                false
            }
        }
    }

    /// Record a web search
    pub async fn save_search(&self, record: &SearchRecord) -> bool {
        match self.store.insert_search_record(record).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(user_id = record.user_id, "Error saving search history: {}", e);
                false
            }
        }
    }

    /// Per-user counters; `None` when the store failed
    pub async fn user_stats(&self, user_id: i64) -> Option<UserStats> {
        match self.store.user_stats(user_id).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::error!(user_id, "Error getting user stats: {}", e);
                None
            }
        }
    }

    /// Recent chat turns, newest first; empty when the store failed
    pub async fn recent_chat_turns(&self, user_id: i64, limit: usize) -> Vec<ChatTurn> {
        self.store
            .recent_chat_turns(user_id, limit)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(user_id, "Error getting chat history: {}", e);
                Vec::new()
            })
    }

    /// Close the underlying store
    pub async fn close(&self) {
        if let Err(e) = self.store.close().await {
            tracing::error!("Error closing database connection: {}", e);
        }
    }
}
