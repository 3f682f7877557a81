//! Interaction history persistence
//!
//! Four collections (`users`, `chat_history`, `file_metadata`,
//! `search_history`), append or upsert only, queried by user ID.
//!
//! Handlers never talk to a [`DocumentStore`] directly; they go through
//! [`Persistence`], which logs and swallows failures so that a database
//! outage does not block a reply.

mod memory;
mod mongo;
mod persistence;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use persistence::Persistence;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use crate::search::SearchResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Collection names
pub const USERS: &str = "users";
pub const CHAT_HISTORY: &str = "chat_history";
pub const FILE_METADATA: &str = "file_metadata";
pub const SEARCH_HISTORY: &str = "search_history";

/// Current time in Unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub created_at: i64,
    pub last_interaction: i64,
}

impl UserProfile {
    /// New profile stamped with the current time
    pub fn new(user_id: i64, chat_id: i64, first_name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            user_id,
            chat_id,
            username: None,
            first_name: first_name.into(),
            last_name: None,
            phone_number: None,
            created_at: now,
            last_interaction: now,
        }
    }
}

/// Whether an upsert inserted or updated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserUpsert {
    Created,
    Updated,
}

/// One prompt/reply exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user_id: i64,
    pub message: String,
    pub response: String,
    pub timestamp: i64,
}

impl ChatTurn {
    /// New turn stamped with the current time
    pub fn new(user_id: i64, message: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            user_id,
            message: message.into(),
            response: response.into(),
            timestamp: now_millis(),
        }
    }
}

/// Analysis of an uploaded photo or document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub user_id: i64,
    pub file_id: String,
    pub file_name: String,
    pub file_type: String,
    pub analysis: String,
    pub timestamp: i64,
}

/// A web search and what came back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub user_id: i64,
    pub username: Option<String>,
    pub query: String,
    pub results: Vec<SearchResult>,
    pub summary: String,
    pub timestamp: i64,
}

/// Per-user counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_messages: u64,
    pub total_files: u64,
    pub total_searches: u64,
    /// `created_at` of the user, if registered
    pub join_date: Option<i64>,
}

/// Document store backend
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert the user or update it in place, keeping `created_at` and any
    /// stored phone number
    async fn upsert_user(&self, user: &UserProfile) -> Result<UserUpsert>;

    /// Store a phone number; no-op for unknown users
    async fn update_user_contact(&self, user_id: i64, phone_number: &str) -> Result<()>;

    /// Append a chat turn and touch the user's `last_interaction`
    async fn insert_chat_turn(&self, turn: &ChatTurn) -> Result<()>;

    /// Append a file record
    async fn insert_file_record(&self, record: &FileRecord) -> Result<()>;

    /// Append a search record
    async fn insert_search_record(&self, record: &SearchRecord) -> Result<()>;

    /// Look up a user
    async fn get_user(&self, user_id: i64) -> Result<Option<UserProfile>>;

    /// Count a user's records
    async fn user_stats(&self, user_id: i64) -> Result<UserStats>;

    /// Most recent chat turns, newest first
    async fn recent_chat_turns(&self, user_id: i64, limit: usize) -> Result<Vec<ChatTurn>>;

    /// Release connections
    async fn close(&self) -> Result<()>;
}

/// Open the configured backend
pub async fn open(config: &StorageConfig) -> Result<Arc<dyn DocumentStore>> {
    match config.backend {
        StorageBackend::Mongodb => Ok(Arc::new(MongoStore::connect(config).await?)),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; history is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
