//! Chat platform adapters
//!
//! Provides a platform-neutral interface for receiving and sending messages.
//! Telegram is the only platform wired up; the gateway only talks to the
//! [`ChannelAdapter`] trait.

mod adapter;
mod message;
mod telegram;

pub use adapter::{AdapterBase, AdapterStatus, ChannelAdapter, ChannelEvent};
pub use message::{
    CallbackQuery, InboundMessage, InlineButton, MessageContent, OutboundMessage, ParseMode,
    ReplyMarkup, Sender,
};
pub use telegram::{parse_command, TelegramAdapter};
