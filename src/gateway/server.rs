//! Gateway server implementation

use super::handler::BotHandler;
use crate::ai::{AiService, GeminiClient};
use crate::channels::{ChannelAdapter, ChannelEvent, TelegramAdapter};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::search::{SerpApiClient, WebSearch};
use crate::store::{self, DocumentStore, Persistence};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

/// Capacity of the channel event queue
const EVENT_QUEUE: usize = 1000;

/// Gateway server state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GatewayState {
    /// Not started
    Stopped,
    /// Starting up
    Starting,
    /// Running
    Running,
    /// Shutting down
    ShuttingDown,
}

/// Wires the chat channel to the bot handler
pub struct Gateway {
    config: AppConfig,
    state: Arc<RwLock<GatewayState>>,
    channel: Arc<dyn ChannelAdapter>,
    handler: Arc<BotHandler>,
    persistence: Persistence,
    processor: Mutex<Option<JoinHandle<()>>>,
    events_processed: Arc<AtomicU64>,
    started_at: RwLock<Option<Instant>>,
}

impl Gateway {
    /// Create a gateway over already constructed backends
    pub fn new(
        config: AppConfig,
        channel: Arc<dyn ChannelAdapter>,
        ai: Arc<dyn AiService>,
        search: Arc<dyn WebSearch>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let persistence = Persistence::new(store);
        let handler = Arc::new(BotHandler::new(
            channel.clone(),
            ai,
            search,
            persistence.clone(),
            &config,
        ));

        Self {
            config,
            state: Arc::new(RwLock::new(GatewayState::Stopped)),
            channel,
            handler,
            persistence,
            processor: Mutex::new(None),
            events_processed: Arc::new(AtomicU64::new(0)),
            started_at: RwLock::new(None),
        }
    }

    /// Get current state
    pub async fn state(&self) -> GatewayState {
        *self.state.read().await
    }

    /// Get configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Start the channel and the event processor
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if *state != GatewayState::Stopped {
            return Err(Error::Gateway("Gateway already running".to_string()));
        }
        *state = GatewayState::Starting;
        drop(state);

        tracing::info!(channel = self.channel.name(), "Starting gateway");

        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
        if let Err(e) = self.channel.start(event_tx).await {
            *self.state.write().await = GatewayState::Stopped;
            return Err(e);
        }

        self.start_event_processor(event_rx).await;

        *self.started_at.write().await = Some(Instant::now());
        *self.state.write().await = GatewayState::Running;

        tracing::info!("Gateway started");
        Ok(())
    }

    /// Stop the channel and release storage
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if *state != GatewayState::Running {
            return Ok(());
        }
        *state = GatewayState::ShuttingDown;
        drop(state);

        tracing::info!("Stopping gateway");

        if let Err(e) = self.channel.stop().await {
            tracing::warn!("Failed to stop channel {}: {}", self.channel.name(), e);
        }

        if let Some(processor) = self.processor.lock().await.take() {
            processor.abort();
        }

        self.persistence.close().await;

        *self.started_at.write().await = None;
        *self.state.write().await = GatewayState::Stopped;

        tracing::info!("Gateway stopped");
        Ok(())
    }

    /// Events are handled concurrently, one task each
    async fn start_event_processor(&self, mut event_rx: mpsc::Receiver<ChannelEvent>) {
        let handler = self.handler.clone();
        let counter = self.events_processed.clone();

        let processor = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                counter.fetch_add(1, Ordering::Relaxed);
                let handler = handler.clone();
                tokio::spawn(async move {
                    handler.handle_event(event).await;
                });
            }
            tracing::debug!("Event queue closed");
        });

        *self.processor.lock().await = Some(processor);
    }

    /// Get gateway status information
    pub async fn status(&self) -> GatewayStatus {
        let state = *self.state.read().await;
        let uptime_secs = self
            .started_at
            .read()
            .await
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0);

        GatewayStatus {
            state: format!("{:?}", state),
            channel: self.channel.name().to_string(),
            connected: self.channel.is_connected(),
            events_processed: self.events_processed.load(Ordering::Relaxed),
            active_quizzes: self.handler.quizzes().active_count().await,
            uptime_secs,
        }
    }
}

/// Gateway status information
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    /// Current state
    pub state: String,
    /// Channel name
    pub channel: String,
    /// Whether the channel is receiving updates
    pub connected: bool,
    /// Events taken off the queue since start-up
    pub events_processed: u64,
    /// Quizzes in progress
    pub active_quizzes: usize,
    /// Seconds since the last start
    pub uptime_secs: u64,
}

/// Builder for Gateway.
///
/// Backends not set explicitly are created from the configuration.
pub struct GatewayBuilder {
    config: AppConfig,
    channel: Option<Arc<dyn ChannelAdapter>>,
    ai: Option<Arc<dyn AiService>>,
    search: Option<Arc<dyn WebSearch>>,
    store: Option<Arc<dyn DocumentStore>>,
}

impl GatewayBuilder {
    /// Create a builder for the given configuration
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            channel: None,
            ai: None,
            search: None,
            store: None,
        }
    }

    /// Use this channel instead of Telegram
    pub fn channel(mut self, channel: Arc<dyn ChannelAdapter>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Use this AI backend instead of Gemini
    pub fn ai(mut self, ai: Arc<dyn AiService>) -> Self {
        self.ai = Some(ai);
        self
    }

    /// Use this search backend instead of SerpAPI
    pub fn search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.search = Some(search);
        self
    }

    /// Use this store instead of the configured backend
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the gateway, connecting to storage if needed
    pub async fn build(self) -> Result<Gateway> {
        let channel: Arc<dyn ChannelAdapter> = match self.channel {
            Some(channel) => channel,
            None => Arc::new(TelegramAdapter::new(self.config.telegram.clone())),
        };

        let ai: Arc<dyn AiService> = match self.ai {
            Some(ai) => ai,
            None => Arc::new(GeminiClient::new(self.config.ai.clone())?),
        };

        let search: Arc<dyn WebSearch> = match self.search {
            Some(search) => search,
            None => Arc::new(SerpApiClient::new(self.config.search.clone(), ai.clone())?),
        };

        let store = match self.store {
            Some(store) => store,
            None => store::open(&self.config.storage).await?,
        };

        Ok(Gateway::new(self.config, channel, ai, search, store))
    }
}
