//! Telegram channel adapter
//!
//! Talks to the Bot API over HTTPS with long polling (`getUpdates`). Raw
//! updates are converted into [`ChannelEvent`]s; anything the bot does not
//! understand (stickers, channel posts, edits) is dropped.

use super::adapter::{AdapterBase, AdapterStatus, ChannelAdapter, ChannelEvent};
use super::message::{
    CallbackQuery, InboundMessage, MessageContent, OutboundMessage, ParseMode, ReplyMarkup, Sender,
};
use crate::config::TelegramConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

const CHANNEL: &str = "telegram";

/// Thin Bot API client shared by the adapter and its poll loop
#[derive(Clone)]
struct BotApi {
    client: reqwest::Client,
    api_base: String,
    token: String,
    request_timeout: Duration,
}

impl BotApi {
    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.token, file_path)
    }

    /// Call a Bot API method and unwrap the `{ok, result}` envelope
    async fn call<T: DeserializeOwned>(&self, method: &str, payload: serde_json::Value) -> Result<T> {
        let response = self
            .client
            .post(self.method_url(method))
            .timeout(self.request_timeout)
            .json(&payload)
            .send()
            .await
            // the URL carries the bot token
            .map_err(|e| Error::Http(e.without_url()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;

        let envelope: TgResponse<T> =
            serde_json::from_str(&body).map_err(|_| Error::api("Telegram", status, body.clone()))?;

        if !envelope.ok {
            let code = envelope.error_code.map(|c| c as u16).unwrap_or(status);
            return Err(Error::api(
                "Telegram",
                code,
                envelope.description.unwrap_or_default(),
            ));
        }

        envelope
            .result
            .ok_or_else(|| Error::Channel(format!("Telegram {} returned no result", method)))
    }
}

/// Telegram channel adapter
pub struct TelegramAdapter {
    config: TelegramConfig,
    base: Arc<AdapterBase>,
    api: BotApi,
    event_tx: Arc<RwLock<Option<mpsc::Sender<ChannelEvent>>>>,
    poller: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl TelegramAdapter {
    /// Create a new Telegram adapter
    pub fn new(config: TelegramConfig) -> Self {
        let api = BotApi {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
            // must outlive the long-poll window
            request_timeout: Duration::from_secs(config.poll_timeout_secs + 30),
        };

        Self {
            config,
            base: Arc::new(AdapterBase::new(CHANNEL)),
            api,
            event_tx: Arc::new(RwLock::new(None)),
            poller: Arc::new(RwLock::new(None)),
        }
    }

    /// Check if a user is allowed
    pub fn is_user_allowed(&self, user_id: i64) -> bool {
        is_allowed(&self.config.allowed_users, user_id)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.base.is_running() {
            Ok(())
        } else {
            Err(Error::Channel("Telegram adapter not running".to_string()))
        }
    }
}

#[async_trait]
impl ChannelAdapter for TelegramAdapter {
    fn name(&self) -> &str {
        self.base.name()
    }

    async fn start(&self, event_tx: mpsc::Sender<ChannelEvent>) -> Result<()> {
        self.base.set_status(AdapterStatus::Starting);

        let me: TgUser = match self.api.call("getMe", json!({})).await {
            Ok(me) => me,
            Err(e) => {
                self.base.set_status(AdapterStatus::Stopped);
                return Err(Error::Channel(format!("Telegram token check failed: {}", e)));
            }
        };

        if self.config.drop_pending_updates {
            if let Err(e) = self
                .api
                .call::<bool>("deleteWebhook", json!({ "drop_pending_updates": true }))
                .await
            {
                tracing::warn!("Failed to drop pending Telegram updates: {}", e);
            }
        }

        *self.event_tx.write().await = Some(event_tx.clone());
        self.base.set_status(AdapterStatus::Running);

        let handle = tokio::spawn(poll_updates(
            self.api.clone(),
            self.config.clone(),
            self.base.clone(),
            event_tx.clone(),
        ));
        *self.poller.write().await = Some(handle);

        tracing::info!(
            bot = me.username.as_deref().unwrap_or("?"),
            "Telegram adapter started"
        );

        let _ = event_tx
            .send(ChannelEvent::Connected {
                channel: CHANNEL.to_string(),
            })
            .await;

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.base.set_status(AdapterStatus::Stopping);

        if let Some(handle) = self.poller.write().await.take() {
            handle.abort();
        }

        if let Some(tx) = self.event_tx.read().await.as_ref() {
            let _ = tx
                .send(ChannelEvent::Disconnected {
                    channel: CHANNEL.to_string(),
                    reason: "Adapter stopped".to_string(),
                })
                .await;
        }

        *self.event_tx.write().await = None;
        self.base.set_status(AdapterStatus::Stopped);

        tracing::info!("Telegram adapter stopped");

        Ok(())
    }

    async fn send_message(&self, message: OutboundMessage) -> Result<i64> {
        self.ensure_running()?;

        tracing::debug!(
            chat_id = message.chat_id,
            len = message.content.len(),
            "Sending Telegram message"
        );

        let sent: TgMessage = self
            .api
            .call("sendMessage", outbound_payload(&message))
            .await?;
        Ok(sent.message_id)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        self.ensure_running()?;

        self.api
            .call::<bool>(
                "deleteMessage",
                json!({ "chat_id": chat_id, "message_id": message_id }),
            )
            .await?;
        Ok(())
    }

    async fn send_typing(&self, chat_id: i64) -> Result<()> {
        self.ensure_running()?;

        self.api
            .call::<bool>(
                "sendChatAction",
                json!({ "chat_id": chat_id, "action": "typing" }),
            )
            .await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.ensure_running()?;

        let mut payload = json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            payload["text"] = json!(text);
        }
        self.api.call::<bool>("answerCallbackQuery", payload).await?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        self.ensure_running()?;

        let file: TgFile = self.api.call("getFile", json!({ "file_id": file_id })).await?;
        let file_path = file
            .file_path
            .ok_or_else(|| Error::Channel(format!("File {} is not downloadable", file_id)))?;

        let response = self
            .api
            .client
            .get(self.api.file_url(&file_path))
            .timeout(self.api.request_timeout)
            .send()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::api("Telegram", status.as_u16(), "file download failed"));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;
        Ok(bytes.to_vec())
    }

    fn is_connected(&self) -> bool {
        self.base.is_running()
    }
}

/// Long-poll loop; runs until the adapter leaves `Running` or the receiver is gone
async fn poll_updates(
    api: BotApi,
    config: TelegramConfig,
    base: Arc<AdapterBase>,
    event_tx: mpsc::Sender<ChannelEvent>,
) {
    let mut offset: i64 = 0;

    while base.is_running() {
        let payload = json!({
            "offset": offset,
            "timeout": config.poll_timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });

        match api.call::<Vec<serde_json::Value>>("getUpdates", payload).await {
            Ok(batch) => {
                let (next_offset, updates) = decode_updates(batch, offset);
                offset = next_offset;

                for update in updates {
                    let Some(event) = parse_update(update) else {
                        continue;
                    };

                    if let Some(user_id) = event_sender_id(&event) {
                        if !is_allowed(&config.allowed_users, user_id) {
                            tracing::debug!(user_id, "Dropping update from user not on allow-list");
                            continue;
                        }
                    }

                    if event_tx.send(event).await.is_err() {
                        tracing::debug!("Event receiver dropped, stopping Telegram poller");
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Telegram getUpdates failed: {}", e);
                let _ = event_tx
                    .send(ChannelEvent::Error {
                        channel: CHANNEL.to_string(),
                        error: e.to_string(),
                    })
                    .await;
                tokio::time::sleep(Duration::from_secs(config.retry_delay_secs)).await;
            }
        }
    }
}

/// Decode a `getUpdates` batch. The offset moves past every update id seen,
/// including updates that fail to decode, which are logged and skipped.
fn decode_updates(batch: Vec<serde_json::Value>, offset: i64) -> (i64, Vec<TgUpdate>) {
    let mut next = offset;
    let mut updates = Vec::with_capacity(batch.len());

    for raw in batch {
        if let Some(update_id) = raw.get("update_id").and_then(|v| v.as_i64()) {
            next = next.max(update_id + 1);
        }
        match serde_json::from_value::<TgUpdate>(raw) {
            Ok(update) => updates.push(update),
            Err(e) => tracing::warn!(offset = next, "Skipping malformed Telegram update: {}", e),
        }
    }

    (next, updates)
}

fn is_allowed(allowed_users: &[i64], user_id: i64) -> bool {
    allowed_users.is_empty() || allowed_users.contains(&user_id)
}

fn event_sender_id(event: &ChannelEvent) -> Option<i64> {
    match event {
        ChannelEvent::Message(msg) => Some(msg.sender.id),
        ChannelEvent::Callback(cb) => Some(cb.sender.id),
        _ => None,
    }
}

/// Convert a raw update into a channel event
fn parse_update(update: TgUpdate) -> Option<ChannelEvent> {
    if let Some(message) = update.message {
        return parse_message(message).map(ChannelEvent::Message);
    }

    let query = update.callback_query?;
    let data = query.data?;
    let (chat_id, message_id) = match &query.message {
        Some(m) => (m.chat.id, Some(m.message_id)),
        None => (query.from.id, None),
    };

    Some(ChannelEvent::Callback(CallbackQuery {
        id: query.id,
        sender: query.from.into(),
        chat_id,
        message_id,
        data,
    }))
}

fn parse_message(message: TgMessage) -> Option<InboundMessage> {
    let sender: Sender = message.from?.into();

    let content = if let Some(contact) = message.contact {
        MessageContent::Contact {
            phone_number: contact.phone_number,
            user_id: contact.user_id,
        }
    } else if let Some(photo) = message.photo.as_ref().and_then(|sizes| sizes.last()) {
        // Telegram lists sizes smallest first
        MessageContent::Photo {
            file_id: photo.file_id.clone(),
            file_size: photo.file_size,
        }
    } else if let Some(doc) = message.document {
        MessageContent::Document {
            file_id: doc.file_id,
            file_name: doc.file_name,
            mime_type: doc.mime_type,
            file_size: doc.file_size,
        }
    } else if let Some(voice) = message.voice {
        MessageContent::Voice {
            file_id: voice.file_id,
            duration: voice.duration,
            mime_type: voice.mime_type,
        }
    } else if let Some(text) = message.text {
        match parse_command(&text) {
            Some((name, args)) => MessageContent::Command { name, args },
            None => MessageContent::Text { text },
        }
    } else {
        return None;
    };

    let mut inbound = InboundMessage::new(
        CHANNEL,
        message.chat.id,
        message.message_id,
        sender,
        content,
    );
    inbound.timestamp = message.date * 1000;
    Some(inbound)
}

/// Split `/name@bot arg1 arg2` into a lower-cased name and its arguments
pub fn parse_command(text: &str) -> Option<(String, Vec<String>)> {
    let rest = text.trim_start().strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let head = parts.next()?;
    let name = head.split('@').next().unwrap_or(head).to_lowercase();
    if name.is_empty() {
        return None;
    }
    Some((name, parts.map(str::to_string).collect()))
}

/// Build the `sendMessage` payload
fn outbound_payload(message: &OutboundMessage) -> serde_json::Value {
    let mut payload = json!({
        "chat_id": message.chat_id,
        "text": message.content,
    });

    if let Some(ParseMode::Html) = message.parse_mode {
        payload["parse_mode"] = json!("HTML");
    }
    if message.disable_link_preview {
        payload["disable_web_page_preview"] = json!(true);
    }
    if let Some(markup) = &message.reply_markup {
        payload["reply_markup"] = markup_json(markup);
    }

    payload
}

fn markup_json(markup: &ReplyMarkup) -> serde_json::Value {
    match markup {
        ReplyMarkup::RequestContact { button_text } => json!({
            "keyboard": [[{ "text": button_text, "request_contact": true }]],
            "resize_keyboard": true,
            "one_time_keyboard": true,
        }),
        ReplyMarkup::Inline(rows) => {
            let rows: Vec<Vec<serde_json::Value>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| json!({ "text": b.text, "callback_data": b.callback_data }))
                        .collect()
                })
                .collect();
            json!({ "inline_keyboard": rows })
        }
        ReplyMarkup::Remove => json!({ "remove_keyboard": true }),
    }
}

// =============================================================================
// Bot API wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct TgResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<i64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: i64,
    message: Option<TgMessage>,
    callback_query: Option<TgCallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
    first_name: String,
    last_name: Option<String>,
    username: Option<String>,
}

impl From<TgUser> for Sender {
    fn from(user: TgUser) -> Self {
        Sender {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    from: Option<TgUser>,
    chat: TgChat,
    #[serde(default)]
    date: i64,
    text: Option<String>,
    photo: Option<Vec<TgPhotoSize>>,
    document: Option<TgDocument>,
    voice: Option<TgVoice>,
    contact: Option<TgContact>,
}

#[derive(Debug, Deserialize)]
struct TgPhotoSize {
    file_id: String,
    file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TgDocument {
    file_id: String,
    file_name: Option<String>,
    mime_type: Option<String>,
    file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TgVoice {
    file_id: String,
    #[serde(default)]
    duration: u32,
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgContact {
    phone_number: String,
    user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TgCallbackQuery {
    id: String,
    from: TgUser,
    message: Option<TgMessage>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgFile {
    file_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::message::InlineButton;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "123:abc";

    fn create_test_config() -> TelegramConfig {
        TelegramConfig {
            bot_token: TOKEN.to_string(),
            allowed_users: vec![123456789],
            ..Default::default()
        }
    }

    fn config_for(server: &MockServer) -> TelegramConfig {
        TelegramConfig {
            bot_token: TOKEN.to_string(),
            api_base: server.uri(),
            poll_timeout_secs: 0,
            retry_delay_secs: 0,
            ..Default::default()
        }
    }

    fn update(value: serde_json::Value) -> TgUpdate {
        serde_json::from_value(value).unwrap()
    }

    fn message_update(extra: serde_json::Value) -> TgUpdate {
        let mut message = json!({
            "message_id": 10,
            "from": {"id": 7, "is_bot": false, "first_name": "Ada", "username": "ada"},
            "chat": {"id": 70, "type": "private"},
            "date": 1700000000,
        });
        for (k, v) in extra.as_object().unwrap() {
            message[k] = v.clone();
        }
        update(json!({"update_id": 1, "message": message}))
    }

    fn inbound(event: Option<ChannelEvent>) -> InboundMessage {
        match event {
            Some(ChannelEvent::Message(msg)) => msg,
            other => panic!("expected message, got {:?}", other),
        }
    }

    #[test]
    fn test_adapter_creation() {
        let adapter = TelegramAdapter::new(create_test_config());

        assert_eq!(adapter.name(), "telegram");
        assert!(!adapter.is_connected());
    }

    #[test]
    fn test_user_allowed() {
        let adapter = TelegramAdapter::new(create_test_config());

        assert!(adapter.is_user_allowed(123456789));
        assert!(!adapter.is_user_allowed(987654321));
    }

    #[test]
    fn test_empty_allowed_users() {
        let config = TelegramConfig {
            allowed_users: vec![],
            ..create_test_config()
        };
        let adapter = TelegramAdapter::new(config);

        assert!(adapter.is_user_allowed(123456789));
        assert!(adapter.is_user_allowed(987654321));
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command("/websearch rust async"),
            Some((
                "websearch".to_string(),
                vec!["rust".to_string(), "async".to_string()]
            ))
        );
        assert_eq!(
            parse_command("/Start@teleassist_bot"),
            Some(("start".to_string(), vec![]))
        );
        assert_eq!(parse_command("hello /start"), None);
        assert_eq!(parse_command("/"), None);
    }

    #[test]
    fn test_parse_text_and_command() {
        let msg = inbound(parse_update(message_update(json!({"text": "hello there"}))));
        assert_eq!(msg.chat_id, 70);
        assert_eq!(msg.message_id, 10);
        assert_eq!(msg.sender.id, 7);
        assert_eq!(msg.sender.username.as_deref(), Some("ada"));
        assert_eq!(msg.timestamp, 1_700_000_000_000);
        assert_eq!(
            msg.content,
            MessageContent::Text {
                text: "hello there".to_string()
            }
        );

        let msg = inbound(parse_update(message_update(json!({"text": "/quiz rust"}))));
        assert_eq!(
            msg.content,
            MessageContent::Command {
                name: "quiz".to_string(),
                args: vec!["rust".to_string()]
            }
        );
    }

    #[test]
    fn test_parse_photo_picks_largest() {
        let msg = inbound(parse_update(message_update(json!({
            "photo": [
                {"file_id": "small", "file_unique_id": "s", "width": 90, "height": 90},
                {"file_id": "large", "file_unique_id": "l", "width": 1280, "height": 1280, "file_size": 2048}
            ],
            "caption": "what is this?"
        }))));

        assert_eq!(
            msg.content,
            MessageContent::Photo {
                file_id: "large".to_string(),
                file_size: Some(2048),
            }
        );
    }

    #[test]
    fn test_parse_document_voice_contact() {
        let msg = inbound(parse_update(message_update(json!({
            "document": {"file_id": "doc1", "file_unique_id": "d", "file_name": "report.pdf", "mime_type": "application/pdf", "file_size": 1000}
        }))));
        assert!(matches!(
            msg.content,
            MessageContent::Document { ref file_name, .. } if file_name.as_deref() == Some("report.pdf")
        ));

        let msg = inbound(parse_update(message_update(json!({
            "voice": {"file_id": "v1", "file_unique_id": "v", "duration": 4, "mime_type": "audio/ogg"}
        }))));
        assert!(matches!(msg.content, MessageContent::Voice { duration: 4, .. }));

        let msg = inbound(parse_update(message_update(json!({
            "contact": {"phone_number": "+15550100", "first_name": "Ada", "user_id": 7}
        }))));
        assert_eq!(
            msg.content,
            MessageContent::Contact {
                phone_number: "+15550100".to_string(),
                user_id: Some(7)
            }
        );
    }

    #[test]
    fn test_parse_ignores_unknown_and_senderless() {
        // sticker only
        assert!(parse_update(message_update(json!({"sticker": {"file_id": "x"}}))).is_none());

        // channel post without `from`
        let channel_post = update(json!({
            "update_id": 3,
            "message": {"message_id": 1, "chat": {"id": -100}, "date": 0, "text": "hi"}
        }));
        assert!(parse_update(channel_post).is_none());
    }

    #[test]
    fn test_decode_updates_skips_malformed_entries() {
        let batch = vec![
            json!({"update_id": 41, "message": {"message_id": 1, "chat": {"id": 70}, "text": "hi",
                   "from": {"id": 7, "first_name": "Ada"}}}),
            // `chat` has the wrong shape
            json!({"update_id": 42, "message": {"message_id": 2, "chat": "nope"}}),
            json!({"update_id": 43, "edited_message": {}}),
        ];

        let (offset, updates) = decode_updates(batch, 0);
        assert_eq!(offset, 44);
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].update_id, 41);
        assert_eq!(updates[1].update_id, 43);

        let (offset, updates) = decode_updates(vec![json!({"garbage": true})], 44);
        assert_eq!(offset, 44);
        assert!(updates.is_empty());
    }

    #[test]
    fn test_parse_callback() {
        let event = parse_update(update(json!({
            "update_id": 5,
            "callback_query": {
                "id": "cb1",
                "from": {"id": 7, "is_bot": false, "first_name": "Ada"},
                "message": {"message_id": 44, "chat": {"id": 70}, "date": 0, "text": "Q1"},
                "chat_instance": "x",
                "data": "quiz:0:2"
            }
        })));

        match event {
            Some(ChannelEvent::Callback(cb)) => {
                assert_eq!(cb.id, "cb1");
                assert_eq!(cb.chat_id, 70);
                assert_eq!(cb.message_id, Some(44));
                assert_eq!(cb.data, "quiz:0:2");
                assert_eq!(event_sender_id(&ChannelEvent::Callback(cb)), Some(7));
            }
            other => panic!("expected callback, got {:?}", other),
        }
    }

    #[test]
    fn test_outbound_payload() {
        let msg = OutboundMessage::new(70, "<b>hi</b>")
            .html()
            .without_preview()
            .markup(ReplyMarkup::Inline(vec![vec![InlineButton {
                text: "A".to_string(),
                callback_data: "quiz:0:0".to_string(),
            }]]));

        let payload = outbound_payload(&msg);
        assert_eq!(payload["chat_id"], 70);
        assert_eq!(payload["parse_mode"], "HTML");
        assert_eq!(payload["disable_web_page_preview"], true);
        assert_eq!(
            payload["reply_markup"]["inline_keyboard"][0][0]["callback_data"],
            "quiz:0:0"
        );

        let contact = outbound_payload(&OutboundMessage::new(1, "share").markup(
            ReplyMarkup::RequestContact {
                button_text: "Share Contact".to_string(),
            },
        ));
        assert_eq!(contact["reply_markup"]["keyboard"][0][0]["request_contact"], true);
    }

    #[tokio::test]
    async fn test_send_requires_running() {
        let adapter = TelegramAdapter::new(create_test_config());
        let err = adapter
            .send_message(OutboundMessage::new(1, "hi"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not running"));
    }

    #[tokio::test]
    async fn test_send_message_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{}/sendMessage", TOKEN)))
            .and(body_partial_json(json!({"chat_id": 70, "text": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"message_id": 55, "chat": {"id": 70}, "date": 0, "text": "hello"}
            })))
            .mount(&server)
            .await;

        let adapter = TelegramAdapter::new(config_for(&server));
        adapter.base.set_status(AdapterStatus::Running);

        let id = adapter
            .send_message(OutboundMessage::new(70, "hello"))
            .await
            .unwrap();
        assert_eq!(id, 55);
    }

    #[tokio::test]
    async fn test_api_error_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{}/sendMessage", TOKEN)))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let adapter = TelegramAdapter::new(config_for(&server));
        adapter.base.set_status(AdapterStatus::Running);

        let err = adapter
            .send_message(OutboundMessage::new(1, "x"))
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("chat not found"));
        assert!(!msg.contains(TOKEN));
    }

    #[tokio::test]
    async fn test_download_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{}/getFile", TOKEN)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"file_id": "f1", "file_unique_id": "u", "file_path": "photos/f1.jpg"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/file/bot{}/photos/f1.jpg", TOKEN)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .mount(&server)
            .await;

        let adapter = TelegramAdapter::new(config_for(&server));
        adapter.base.set_status(AdapterStatus::Running);

        let bytes = adapter.download_file("f1").await.unwrap();
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn test_adapter_lifecycle() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{}/getMe", TOKEN)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"id": 1, "is_bot": true, "first_name": "Bot", "username": "teleassist_bot"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{}/deleteWebhook", TOKEN)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": true})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{}/getUpdates", TOKEN)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [{
                    "update_id": 900,
                    "message": {
                        "message_id": 1,
                        "from": {"id": 7, "is_bot": false, "first_name": "Ada"},
                        "chat": {"id": 70},
                        "date": 0,
                        "text": "ping"
                    }
                }]
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{}/getUpdates", TOKEN)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true, "result": []}))
                    .set_delay(Duration::from_millis(50)),
            )
            .mount(&server)
            .await;

        let adapter = TelegramAdapter::new(config_for(&server));
        let (tx, mut rx) = mpsc::channel(10);

        adapter.start(tx).await.unwrap();
        assert!(adapter.is_connected());

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ChannelEvent::Connected { .. }));

        let event = rx.recv().await.unwrap();
        let msg = inbound(Some(event));
        assert_eq!(
            msg.content,
            MessageContent::Text {
                text: "ping".to_string()
            }
        );

        adapter.stop().await.unwrap();
        assert!(!adapter.is_connected());
    }

    #[tokio::test]
    async fn test_start_fails_on_bad_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{}/getMe", TOKEN)))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "ok": false,
                "error_code": 401,
                "description": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let adapter = TelegramAdapter::new(config_for(&server));
        let (tx, _rx) = mpsc::channel(10);

        let err = adapter.start(tx).await.unwrap_err();
        assert!(err.to_string().contains("401"));
        assert!(!adapter.is_connected());
    }
}
