//! Platform-neutral message types

use serde::{Deserialize, Serialize};

/// Who sent a message or pressed a button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// Platform user ID
    pub id: i64,
    /// Public handle, without `@`
    pub username: Option<String>,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: Option<String>,
}

impl Sender {
    /// Best human-readable name for greetings
    pub fn display_name(&self) -> &str {
        if self.first_name.is_empty() {
            self.username.as_deref().unwrap_or("there")
        } else {
            &self.first_name
        }
    }
}

/// What an inbound message carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
    /// `/name arg1 arg2`
    Command { name: String, args: Vec<String> },
    /// Plain text
    Text { text: String },
    /// Photo; `file_id` is the largest available size
    Photo {
        file_id: String,
        file_size: Option<u64>,
    },
    /// Uploaded file
    Document {
        file_id: String,
        file_name: Option<String>,
        mime_type: Option<String>,
        file_size: Option<u64>,
    },
    /// Voice note
    Voice {
        file_id: String,
        duration: u32,
        mime_type: Option<String>,
    },
    /// Shared contact card
    Contact {
        phone_number: String,
        user_id: Option<i64>,
    },
}

impl MessageContent {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            MessageContent::Command { .. } => "command",
            MessageContent::Text { .. } => "text",
            MessageContent::Photo { .. } => "photo",
            MessageContent::Document { .. } => "document",
            MessageContent::Voice { .. } => "voice",
            MessageContent::Contact { .. } => "contact",
        }
    }
}

/// Message received from a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Local correlation ID
    pub id: String,
    /// Channel name
    pub channel: String,
    /// Platform message ID
    pub message_id: i64,
    /// Chat the message was posted in
    pub chat_id: i64,
    /// Author
    pub sender: Sender,
    /// Payload
    pub content: MessageContent,
    /// Unix milliseconds
    pub timestamp: i64,
}

impl InboundMessage {
    /// Create a new inbound message
    pub fn new(
        channel: &str,
        chat_id: i64,
        message_id: i64,
        sender: Sender,
        content: MessageContent,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel: channel.to_string(),
            message_id,
            chat_id,
            sender,
            content,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Inline button press
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Callback ID to acknowledge
    pub id: String,
    /// Who pressed the button
    pub sender: Sender,
    /// Chat of the message carrying the button
    pub chat_id: i64,
    /// Message carrying the button
    pub message_id: Option<i64>,
    /// Button payload
    pub data: String,
}

/// Text markup mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    /// Telegram HTML subset
    Html,
}

/// One inline button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    /// Label
    pub text: String,
    /// Payload returned on press
    pub callback_data: String,
}

/// Keyboard attached to an outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyMarkup {
    /// Reply keyboard with a single "share contact" button
    RequestContact { button_text: String },
    /// Inline buttons, one inner vec per row
    Inline(Vec<Vec<InlineButton>>),
    /// Remove a previously shown reply keyboard
    Remove,
}

/// Message to send through a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Target chat
    pub chat_id: i64,
    /// Body
    pub content: String,
    /// Markup mode
    pub parse_mode: Option<ParseMode>,
    /// Keyboard
    pub reply_markup: Option<ReplyMarkup>,
    /// Suppress link previews
    pub disable_link_preview: bool,
}

impl OutboundMessage {
    /// Create a plain-text outbound message
    pub fn new(chat_id: i64, content: impl Into<String>) -> Self {
        Self {
            chat_id,
            content: content.into(),
            parse_mode: None,
            reply_markup: None,
            disable_link_preview: false,
        }
    }

    /// Render as HTML
    pub fn html(mut self) -> Self {
        self.parse_mode = Some(ParseMode::Html);
        self
    }

    /// Attach a keyboard
    pub fn markup(mut self, markup: ReplyMarkup) -> Self {
        self.reply_markup = Some(markup);
        self
    }

    /// Suppress link previews
    pub fn without_preview(mut self) -> Self {
        self.disable_link_preview = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> Sender {
        Sender {
            id: 7,
            username: Some("ada".to_string()),
            first_name: "Ada".to_string(),
            last_name: None,
        }
    }

    #[test]
    fn test_display_name_prefers_first_name() {
        assert_eq!(sender().display_name(), "Ada");

        let anon = Sender {
            first_name: String::new(),
            ..sender()
        };
        assert_eq!(anon.display_name(), "ada");
    }

    #[test]
    fn test_outbound_builder() {
        let msg = OutboundMessage::new(1, "hi")
            .html()
            .without_preview()
            .markup(ReplyMarkup::Remove);

        assert_eq!(msg.parse_mode, Some(ParseMode::Html));
        assert!(msg.disable_link_preview);
        assert_eq!(msg.reply_markup, Some(ReplyMarkup::Remove));
    }

    #[test]
    fn test_inbound_message_kind() {
        let msg = InboundMessage::new(
            "telegram",
            1,
            2,
            sender(),
            MessageContent::Text {
                text: "hello".to_string(),
            },
        );
        assert_eq!(msg.content.kind(), "text");
        assert!(!msg.id.is_empty());
    }
}
