//! Gateway for Teleassist
//!
//! Connects the Telegram channel to the bot handler and exposes an optional
//! health API.

pub mod api;
pub mod format;
mod handler;
mod server;

pub use handler::{BotHandler, GENERIC_APOLOGY};
pub use server::{Gateway, GatewayBuilder, GatewayState, GatewayStatus};
