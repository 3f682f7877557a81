//! Teleassist - Telegram assistant backed by Gemini, SerpAPI and MongoDB
//!
//! Messages arrive from Telegram by long polling, are answered with the help
//! of a generative-AI backend and a web-search backend, and every interaction
//! is recorded in a document store.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ChannelEvent   ┌───────────────────────────────────┐
//! │   Telegram   │ ───────────────▶ │              Gateway              │
//! │   adapter    │ ◀─────────────── │  event loop ─▶ BotHandler         │
//! └──────────────┘  OutboundMessage │       │          │         │      │
//!                                   └───────┼──────────┼─────────┼──────┘
//!                                           ▼          ▼         ▼
//!                                     ┌──────────┐ ┌────────┐ ┌────────┐
//!                                     │  Gemini  │ │SerpAPI │ │MongoDB │
//!                                     │ (ai,     │ │(search)│ │(store) │
//!                                     │  files,  │ └────────┘ └────────┘
//!                                     │  quiz)   │
//!                                     └──────────┘
//! ```
//!
//! ## Modules
//!
//! - [`channels`]: channel adapter trait and the Telegram Bot API adapter
//! - [`gateway`]: event loop, update handlers, reply formatting, health API
//! - [`ai`]: Gemini client and prompt templates
//! - [`search`]: SerpAPI client with AI summaries
//! - [`files`]: image, PDF and text analysis
//! - [`quiz`]: quiz generation, parsing and per-user sessions
//! - [`store`]: MongoDB and in-memory persistence
//! - [`config`]: configuration management

pub mod ai;
pub mod channels;
pub mod config;
pub mod error;
pub mod files;
pub mod gateway;
pub mod quiz;
pub mod search;
pub mod store;

pub use config::AppConfig;
pub use error::{Error, Result};
