//! Channel adapter trait and shared adapter state

use super::message::{CallbackQuery, InboundMessage, OutboundMessage};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::RwLock;
use tokio::sync::mpsc;

/// Events emitted by a channel adapter
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// A user sent a message
    Message(InboundMessage),
    /// A user pressed an inline button
    Callback(CallbackQuery),
    /// Adapter connected to the platform
    Connected { channel: String },
    /// Adapter disconnected
    Disconnected { channel: String, reason: String },
    /// Non-fatal adapter error
    Error { channel: String, error: String },
}

/// Adapter lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterStatus {
    /// Not started
    Stopped,
    /// Starting up
    Starting,
    /// Receiving updates
    Running,
    /// Shutting down
    Stopping,
}

/// Name + status bookkeeping shared by adapters
#[derive(Debug)]
pub struct AdapterBase {
    name: String,
    status: RwLock<AdapterStatus>,
}

impl AdapterBase {
    /// Create a stopped adapter base
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: RwLock::new(AdapterStatus::Stopped),
        }
    }

    /// Adapter name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current status
    pub fn status(&self) -> AdapterStatus {
        *self.status.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Set status
    pub fn set_status(&self, status: AdapterStatus) {
        *self.status.write().unwrap_or_else(|e| e.into_inner()) = status;
    }

    /// Whether the adapter is running
    pub fn is_running(&self) -> bool {
        self.status() == AdapterStatus::Running
    }
}

/// Bridge to a chat platform
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Channel name
    fn name(&self) -> &str;

    /// Start receiving updates; events are pushed into `event_tx`
    async fn start(&self, event_tx: mpsc::Sender<ChannelEvent>) -> Result<()>;

    /// Stop receiving updates
    async fn stop(&self) -> Result<()>;

    /// Send a message, returning the platform message ID
    async fn send_message(&self, message: OutboundMessage) -> Result<i64>;

    /// Delete a previously sent message
    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()>;

    /// Show a typing indicator
    async fn send_typing(&self, chat_id: i64) -> Result<()>;

    /// Acknowledge an inline button press, optionally with a toast text
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;

    /// Download a file the user uploaded
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>>;

    /// Whether the adapter is connected
    fn is_connected(&self) -> bool;
}
