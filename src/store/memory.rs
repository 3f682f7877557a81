//! In-memory store
//!
//! Same semantics as the MongoDB store; data is lost on restart.

use super::{
    now_millis, ChatTurn, DocumentStore, FileRecord, SearchRecord, UserProfile, UserStats,
    UserUpsert,
};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory document store
pub struct MemoryStore {
    users: RwLock<HashMap<i64, UserProfile>>,
    chat_history: RwLock<Vec<ChatTurn>>,
    file_metadata: RwLock<Vec<FileRecord>>,
    search_history: RwLock<Vec<SearchRecord>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            chat_history: RwLock::new(Vec::new()),
            file_metadata: RwLock::new(Vec::new()),
            search_history: RwLock::new(Vec::new()),
        }
    }

    /// Number of registered users
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// All file records, oldest first
    pub async fn file_records(&self) -> Vec<FileRecord> {
        self.file_metadata.read().await.clone()
    }

    /// All search records, oldest first
    pub async fn search_records(&self) -> Vec<SearchRecord> {
        self.search_history.read().await.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn upsert_user(&self, user: &UserProfile) -> Result<UserUpsert> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.user_id) {
            Some(existing) => {
                existing.chat_id = user.chat_id;
                existing.username = user.username.clone();
                existing.first_name = user.first_name.clone();
                existing.last_name = user.last_name.clone();
                if user.phone_number.is_some() {
                    existing.phone_number = user.phone_number.clone();
                }
                existing.last_interaction = user.last_interaction;
                Ok(UserUpsert::Updated)
            }
            None => {
                users.insert(user.user_id, user.clone());
                Ok(UserUpsert::Created)
            }
        }
    }

    async fn update_user_contact(&self, user_id: i64, phone_number: &str) -> Result<()> {
        if let Some(user) = self.users.write().await.get_mut(&user_id) {
            user.phone_number = Some(phone_number.to_string());
            user.last_interaction = now_millis();
        }
        Ok(())
    }

    async fn insert_chat_turn(&self, turn: &ChatTurn) -> Result<()> {
        self.chat_history.write().await.push(turn.clone());
        if let Some(user) = self.users.write().await.get_mut(&turn.user_id) {
            user.last_interaction = turn.timestamp;
        }
        Ok(())
    }

    async fn insert_file_record(&self, record: &FileRecord) -> Result<()> {
        self.file_metadata.write().await.push(record.clone());
        Ok(())
    }

    async fn insert_search_record(&self, record: &SearchRecord) -> Result<()> {
        self.search_history.write().await.push(record.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<UserProfile>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn user_stats(&self, user_id: i64) -> Result<UserStats> {
        let total_messages = self
            .chat_history
            .read()
            .await
            .iter()
            .filter(|t| t.user_id == user_id)
            .count() as u64;
        let total_files = self
            .file_metadata
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .count() as u64;
        let total_searches = self
            .search_history
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .count() as u64;
        let join_date = self
            .users
            .read()
            .await
            .get(&user_id)
            .map(|u| u.created_at);

        Ok(UserStats {
            total_messages,
            total_files,
            total_searches,
            join_date,
        })
    }

    async fn recent_chat_turns(&self, user_id: i64, limit: usize) -> Result<Vec<ChatTurn>> {
        let history = self.chat_history.read().await;
        let mut turns: Vec<ChatTurn> = history
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        // newest first
        turns.sort_by_key(|t| t.timestamp);
        turns.reverse();
        turns.truncate(limit);
        Ok(turns)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
