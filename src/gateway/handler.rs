//! Update handlers
//!
//! Every handler follows the same shape: acknowledge, call one backend,
//! format, reply, persist. Backend failures become a fixed apology; storage
//! failures are swallowed by [`Persistence`].

use super::format::{escape_html, format_message, split_message, MAX_MESSAGE_CHARS};
use crate::ai::AiService;
use crate::channels::{
    CallbackQuery, ChannelAdapter, ChannelEvent, InboundMessage, InlineButton, MessageContent,
    OutboundMessage, ReplyMarkup,
};
use crate::config::AppConfig;
use crate::error::Result;
use crate::files::{FileKind, FileProcessor};
use crate::quiz::{self, QuizMaster, QuizQuestion, QuizSession, QuizSessions, QuizStep};
use crate::search::WebSearch;
use crate::store::{now_millis, FileRecord, Persistence, SearchRecord, UserProfile, UserUpsert};
use std::sync::Arc;

/// Reply when a handler fails unexpectedly
pub const GENERIC_APOLOGY: &str = "❌ Sorry, something went wrong. Please try again later.";

const CHAT_APOLOGY: &str = "❌ Sorry, I couldn't process your message. Please try again later.";
const IMAGE_APOLOGY: &str = "❌ Sorry, I couldn't analyze this image. Please try again.";
const FILE_APOLOGY: &str = "❌ Sorry, I couldn't analyze this file. Please try again.";
const SEARCH_APOLOGY: &str = "❌ Sorry, I couldn't complete the web search. Please try again later.";
const VOICE_APOLOGY: &str = "❌ Sorry, I couldn't understand the voice message.";
const UNSUPPORTED_FILE: &str = "⚠️ Sorry, I can only process PDF, text and image files \
(.pdf, .txt, .md, .csv, .log, .jpg, .jpeg, .png, .webp).";
const STALE_ANSWER: &str = "This question is no longer active.";

const HELP_TEXT: &str = "Welcome to the Bot! Here are some commands you can use:

/start - Register and start using the bot.
/help - Show this help message.
/websearch <query> - Search the web and get an AI summary.
/quiz <topic> - Take a multiple-choice quiz on any topic.
/stats - See your usage statistics.
/history - Show your recent conversations.

You can also:
• Send any text message to chat with the AI.
• Send a photo to get a detailed analysis.
• Send a PDF or text document to get it analyzed.
• Send a voice message to have it transcribed.
• Share your contact with the button shown after /start.";

/// Recent turns shown by `/history`
const HISTORY_LIMIT: usize = 5;

/// Telegram caps callback toasts at 200 characters
const MAX_TOAST_CHARS: usize = 180;

/// Dispatches channel events to the bot's features
pub struct BotHandler {
    channel: Arc<dyn ChannelAdapter>,
    ai: Arc<dyn AiService>,
    search: Arc<dyn WebSearch>,
    files: FileProcessor,
    quiz_master: QuizMaster,
    quizzes: QuizSessions,
    persistence: Persistence,
    search_results: usize,
    max_file_bytes: u64,
}

impl BotHandler {
    /// Create a handler over the given backends
    pub fn new(
        channel: Arc<dyn ChannelAdapter>,
        ai: Arc<dyn AiService>,
        search: Arc<dyn WebSearch>,
        persistence: Persistence,
        config: &AppConfig,
    ) -> Self {
        Self {
            files: FileProcessor::new(ai.clone(), config.files.clone()),
            quiz_master: QuizMaster::new(ai.clone()),
            quizzes: QuizSessions::new(),
            channel,
            ai,
            search,
            persistence,
            search_results: config.search.num_results,
            max_file_bytes: config.files.max_bytes,
        }
    }

    /// Quiz sessions in progress
    pub fn quizzes(&self) -> &QuizSessions {
        &self.quizzes
    }

    /// Handle one channel event; errors are logged and answered with an apology
    pub async fn handle_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Message(message) => {
                let chat_id = message.chat_id;
                let user_id = message.sender.id;
                tracing::debug!(
                    user_id,
                    chat_id,
                    kind = message.content.kind(),
                    "Received message"
                );

                if let Err(e) = self.handle_message(&message).await {
                    tracing::error!(user_id, chat_id, "Error handling message: {}", e);
                    if let Err(e) = self.send_text(chat_id, GENERIC_APOLOGY).await {
                        tracing::error!(chat_id, "Error sending apology: {}", e);
                    }
                }
            }
            ChannelEvent::Callback(query) => {
                let user_id = query.sender.id;
                if let Err(e) = self.handle_callback(&query).await {
                    tracing::error!(user_id, "Error handling callback: {}", e);
                }
            }
            ChannelEvent::Connected { channel } => {
                tracing::info!("Channel {} connected", channel);
            }
            ChannelEvent::Disconnected { channel, reason } => {
                tracing::warn!("Channel {} disconnected: {}", channel, reason);
            }
            ChannelEvent::Error { channel, error } => {
                tracing::error!("Channel {} error: {}", channel, error);
            }
        }
    }

    async fn handle_message(&self, msg: &InboundMessage) -> Result<()> {
        match &msg.content {
            MessageContent::Command { name, args } => match name.as_str() {
                "start" => self.handle_start(msg).await,
                "help" => self.handle_help(msg).await,
                "websearch" => self.handle_websearch(msg, &args.join(" ")).await,
                "quiz" => self.handle_quiz(msg, &args.join(" ")).await,
                "stats" => self.handle_stats(msg).await,
                "history" => self.handle_history(msg).await,
                other => {
                    tracing::debug!(command = other, "Unknown command");
                    self.send_text(
                        msg.chat_id,
                        "Sorry, I don't know that command. Send /help to see what I can do.",
                    )
                    .await
                    .map(|_| ())
                }
            },
            MessageContent::Text { text } => self.handle_text(msg, text).await,
            MessageContent::Photo {
                file_id, file_size, ..
            } => self.handle_photo(msg, file_id, *file_size).await,
            MessageContent::Document {
                file_id,
                file_name,
                file_size,
                ..
            } => {
                self.handle_document(msg, file_id, file_name.as_deref(), *file_size)
                    .await
            }
            MessageContent::Voice {
                file_id, mime_type, ..
            } => {
                self.handle_voice(msg, file_id, mime_type.as_deref().unwrap_or("audio/ogg"))
                    .await
            }
            MessageContent::Contact {
                phone_number,
                user_id,
            } => self.handle_contact(msg, phone_number, *user_id).await,
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    async fn handle_start(&self, msg: &InboundMessage) -> Result<()> {
        let sender = &msg.sender;
        let profile = UserProfile {
            username: sender.username.clone(),
            last_name: sender.last_name.clone(),
            ..UserProfile::new(sender.id, msg.chat_id, sender.first_name.clone())
        };

        let name = sender.display_name();
        let greeting = match self.persistence.save_user(&profile).await {
            Some(UserUpsert::Created) => {
                tracing::info!(user_id = sender.id, "Registered new user");
                format!("You have been successfully registered! 🎉\n\nWelcome {}! ✨", name)
            }
            Some(UserUpsert::Updated) => match &sender.username {
                Some(username) => format!(
                    "Welcome back {}! You are already registered as @{} ✨",
                    name, username
                ),
                None => format!("Welcome back {}! You are already registered ✨", name),
            },
            None => format!("Welcome {}! ✨", name),
        };

        let text = format!(
            "{}\n\nShare your contact with the button below, or send /help to see what I can do.",
            greeting
        );
        self.send(
            OutboundMessage::new(msg.chat_id, text).markup(ReplyMarkup::RequestContact {
                button_text: "Share Contact".to_string(),
            }),
        )
        .await?;
        Ok(())
    }

    async fn handle_help(&self, msg: &InboundMessage) -> Result<()> {
        self.send_text(msg.chat_id, HELP_TEXT).await?;
        Ok(())
    }

    async fn handle_websearch(&self, msg: &InboundMessage, query: &str) -> Result<()> {
        let chat_id = msg.chat_id;
        let query = query.trim();
        if query.is_empty() {
            self.send_text(
                chat_id,
                "ℹ️ Please provide a search query.\nExample: /websearch artificial intelligence",
            )
            .await?;
            return Ok(());
        }

        let progress = self
            .send_text(chat_id, "🔍 Searching the web... Please wait.")
            .await?;

        let sent: Result<()> = match self.search.search(query, self.search_results).await {
            Ok(outcome) => {
                let record = SearchRecord {
                    user_id: msg.sender.id,
                    username: msg.sender.username.clone(),
                    query: query.to_string(),
                    results: outcome.results,
                    summary: outcome.summary,
                    timestamp: now_millis(),
                };
                self.persistence.save_search(&record).await;
                self.send_search_results(chat_id, &record).await
            }
            Err(e) => {
                tracing::error!(query, "Search error: {}", e);
                self.send_text(chat_id, SEARCH_APOLOGY).await.map(|_| ())
            }
        };

        self.clear_progress(chat_id, progress).await;
        sent
    }

    async fn send_search_results(&self, chat_id: i64, record: &SearchRecord) -> Result<()> {
        let summary = format!(
            "Search results for: {}\n\n{}",
            escape_html(&record.query),
            format_message(&record.summary)
        );
        self.send_html_chunks(chat_id, &summary).await?;

        for (i, result) in record.results.iter().enumerate() {
            let mut text = format!("{}. {}\n", i + 1, result.title);
            if !result.link.is_empty() {
                text.push_str(&format!("🔗 {}\n", result.link));
            }
            text.push_str(&result.snippet);
            self.send(OutboundMessage::new(chat_id, text).without_preview())
                .await?;
        }
        Ok(())
    }

    async fn handle_quiz(&self, msg: &InboundMessage, topic: &str) -> Result<()> {
        let chat_id = msg.chat_id;
        let topic = topic.trim();
        if topic.is_empty() {
            self.send_text(
                chat_id,
                "ℹ️ Please provide a topic for the quiz.\nExample: /quiz python",
            )
            .await?;
            return Ok(());
        }

        let progress = self
            .send_text(chat_id, "🔄 Generating your quiz... Please wait.")
            .await?;
        let questions = self.quiz_master.generate(topic).await;
        self.clear_progress(chat_id, progress).await;

        let session = match QuizSession::new(topic, questions) {
            Ok(session) => session,
            Err(_) => {
                self.send_text(
                    chat_id,
                    "Sorry, I couldn't find any questions for that topic. Try another one.",
                )
                .await?;
                return Ok(());
            }
        };

        let total = session.total();
        tracing::info!(user_id = msg.sender.id, topic, total, "Quiz started");

        if let Some(first) = self.quizzes.start(msg.sender.id, session).await {
            self.ask_question(chat_id, 0, total, &first).await?;
        }
        Ok(())
    }

    async fn handle_stats(&self, msg: &InboundMessage) -> Result<()> {
        let text = match self.persistence.user_stats(msg.sender.id).await {
            Some(stats) => {
                let since = stats
                    .join_date
                    .and_then(chrono::DateTime::from_timestamp_millis)
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "not registered yet (send /start)".to_string());
                format!(
                    "📊 Your statistics\n\nMessages: {}\nFiles analyzed: {}\nWeb searches: {}\nMember since: {}",
                    stats.total_messages, stats.total_files, stats.total_searches, since
                )
            }
            None => "❌ Sorry, I couldn't load your statistics right now.".to_string(),
        };

        self.send_text(msg.chat_id, &text).await?;
        Ok(())
    }

    async fn handle_history(&self, msg: &InboundMessage) -> Result<()> {
        let turns = self
            .persistence
            .recent_chat_turns(msg.sender.id, HISTORY_LIMIT)
            .await;

        let text = if turns.is_empty() {
            "You have no chat history yet. Send me a message to get started!".to_string()
        } else {
            let entries: Vec<String> = turns
                .iter()
                .map(|t| format!("You: {}\nBot: {}", clip(&t.message, 100), clip(&t.response, 200)))
                .collect();
            format!("🕘 Your recent conversations\n\n{}", entries.join("\n\n"))
        };

        self.send_text(msg.chat_id, &text).await?;
        Ok(())
    }

    // =========================================================================
    // Content
    // =========================================================================

    async fn handle_contact(
        &self,
        msg: &InboundMessage,
        phone_number: &str,
        contact_user_id: Option<i64>,
    ) -> Result<()> {
        if contact_user_id != Some(msg.sender.id) {
            self.send_text(msg.chat_id, "Please share your own contact information.")
                .await?;
            return Ok(());
        }

        let reply = if self
            .persistence
            .update_contact(msg.sender.id, phone_number)
            .await
        {
            OutboundMessage::new(msg.chat_id, "Contact information saved successfully!")
                .markup(ReplyMarkup::Remove)
        } else {
            OutboundMessage::new(
                msg.chat_id,
                "❌ Sorry, I couldn't save your contact right now. Please try again later.",
            )
        };
        self.send(reply).await?;
        Ok(())
    }

    async fn handle_text(&self, msg: &InboundMessage, text: &str) -> Result<()> {
        self.typing(msg.chat_id).await;

        match self.ai.generate_text(text).await {
            Ok(reply) => {
                self.send_formatted(msg.chat_id, &reply).await?;
                self.persistence
                    .save_chat_turn(msg.sender.id, text, &reply)
                    .await;
            }
            Err(e) => {
                tracing::error!(user_id = msg.sender.id, "Error getting chat response: {}", e);
                self.send_text(msg.chat_id, CHAT_APOLOGY).await?;
            }
        }
        Ok(())
    }

    async fn handle_photo(
        &self,
        msg: &InboundMessage,
        file_id: &str,
        file_size: Option<u64>,
    ) -> Result<()> {
        let chat_id = msg.chat_id;
        let progress = self
            .send_text(chat_id, "🔄 Processing your image... Please wait.")
            .await?;

        let analysis: Result<String> = async {
            self.files.check_size(file_size)?;
            let bytes = self.channel.download_file(file_id).await?;
            self.files.analyze_image(&bytes, "image/jpeg").await
        }
        .await;

        let sent = match analysis {
            Ok(analysis) => {
                let record = FileRecord {
                    user_id: msg.sender.id,
                    file_id: file_id.to_string(),
                    file_name: format!("photo_{}", file_id),
                    file_type: "photo".to_string(),
                    analysis,
                    timestamp: now_millis(),
                };
                self.persistence.save_file_record(&record).await;
                self.send_formatted(chat_id, &record.analysis).await
            }
            Err(e) => {
                tracing::error!(user_id = msg.sender.id, "Error processing image: {}", e);
                self.send_text(chat_id, IMAGE_APOLOGY).await.map(|_| ())
            }
        };

        self.clear_progress(chat_id, progress).await;
        sent
    }

    async fn handle_document(
        &self,
        msg: &InboundMessage,
        file_id: &str,
        file_name: Option<&str>,
        file_size: Option<u64>,
    ) -> Result<()> {
        let chat_id = msg.chat_id;
        let file_name = file_name.unwrap_or("document");

        let kind = match FileKind::from_file_name(file_name) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::debug!(file_name, "Rejected upload: {}", e);
                self.send_text(chat_id, UNSUPPORTED_FILE).await?;
                return Ok(());
            }
        };

        if self.files.check_size(file_size).is_err() {
            let text = format!(
                "⚠️ This file is too large. The maximum size is {} MB.",
                self.max_file_bytes / (1024 * 1024)
            );
            self.send_text(chat_id, &text).await?;
            return Ok(());
        }

        let progress = self
            .send_text(chat_id, "🔄 Processing your file... Please wait.")
            .await?;

        let analysis: Result<String> = async {
            let bytes = self.channel.download_file(file_id).await?;
            self.files.process(file_name, bytes).await
        }
        .await;

        let sent = match analysis {
            Ok(analysis) => {
                let record = FileRecord {
                    user_id: msg.sender.id,
                    file_id: file_id.to_string(),
                    file_name: file_name.to_string(),
                    file_type: kind.as_str().to_string(),
                    analysis,
                    timestamp: now_millis(),
                };
                self.persistence.save_file_record(&record).await;
                self.send_formatted(chat_id, &record.analysis).await
            }
            Err(e) => {
                tracing::error!(user_id = msg.sender.id, file_name, "Error processing file: {}", e);
                self.send_text(chat_id, FILE_APOLOGY).await.map(|_| ())
            }
        };

        self.clear_progress(chat_id, progress).await;
        sent
    }

    async fn handle_voice(&self, msg: &InboundMessage, file_id: &str, mime_type: &str) -> Result<()> {
        self.typing(msg.chat_id).await;

        let transcript: Result<String> = async {
            let bytes = self.channel.download_file(file_id).await?;
            self.files.transcribe_voice(&bytes, mime_type).await
        }
        .await;

        match transcript {
            Ok(text) if !text.is_empty() => {
                self.send_text(msg.chat_id, &format!("You said: {}", text))
                    .await?;
            }
            Ok(_) => {
                self.send_text(msg.chat_id, VOICE_APOLOGY).await?;
            }
            Err(e) => {
                tracing::error!(user_id = msg.sender.id, "Error processing voice message: {}", e);
                self.send_text(msg.chat_id, VOICE_APOLOGY).await?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Quiz answers
    // =========================================================================

    async fn handle_callback(&self, query: &CallbackQuery) -> Result<()> {
        let Some((question_index, option_index)) = quiz::parse_callback(&query.data) else {
            tracing::debug!(data = %query.data, "Ignoring unknown callback");
            return self.channel.answer_callback(&query.id, None).await;
        };

        let reply = match self
            .quizzes
            .answer(query.sender.id, question_index, option_index)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!(user_id = query.sender.id, "Rejected quiz answer: {}", e);
                return self
                    .channel
                    .answer_callback(&query.id, Some(STALE_ANSWER))
                    .await;
            }
        };

        let toast = if reply.outcome.correct {
            "✅ Correct!".to_string()
        } else {
            format!(
                "❌ Incorrect! The correct answer was: {}",
                reply.outcome.correct_option
            )
        };
        self.channel
            .answer_callback(&query.id, Some(clip(&toast, MAX_TOAST_CHARS)))
            .await?;

        match reply.step {
            QuizStep::Next {
                index,
                total,
                question,
            } => self.ask_question(query.chat_id, index, total, &question).await,
            QuizStep::Finished(session) => {
                let summary = session.summary();
                tracing::info!(
                    user_id = query.sender.id,
                    topic = session.topic(),
                    score = session.score(),
                    total = session.total(),
                    "Quiz finished"
                );
                self.send_text(query.chat_id, &summary).await?;

                let log: Vec<String> = session
                    .answer_log()
                    .into_iter()
                    .map(|(q, a)| format!("{} -> {}", q, a))
                    .collect();
                self.persistence
                    .save_chat_turn(
                        query.sender.id,
                        &format!("/quiz {}", session.topic()),
                        &format!("{}\n{}", summary, log.join("\n")),
                    )
                    .await;
                Ok(())
            }
        }
    }

    async fn ask_question(
        &self,
        chat_id: i64,
        index: usize,
        total: usize,
        question: &QuizQuestion,
    ) -> Result<()> {
        let options: Vec<String> = question
            .options
            .iter()
            .enumerate()
            .map(|(i, o)| format!("{}) {}", quiz::option_label(i), o))
            .collect();
        let text = format!(
            "❓ Question {}/{}\n\n{}\n\n{}",
            index + 1,
            total,
            question.question,
            options.join("\n")
        );

        let buttons = (0..question.options.len())
            .map(|i| InlineButton {
                text: quiz::option_label(i).to_string(),
                callback_data: quiz::callback_data(index, i),
            })
            .collect();

        self.send(OutboundMessage::new(chat_id, text).markup(ReplyMarkup::Inline(vec![buttons])))
            .await?;
        Ok(())
    }

    // =========================================================================
    // Sending helpers
    // =========================================================================

    async fn send(&self, message: OutboundMessage) -> Result<i64> {
        self.channel.send_message(message).await
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i64> {
        self.send(OutboundMessage::new(chat_id, text)).await
    }

    /// Format model output and send it as one or more HTML messages
    async fn send_formatted(&self, chat_id: i64, text: &str) -> Result<()> {
        self.send_html_chunks(chat_id, &format_message(text)).await
    }

    async fn send_html_chunks(&self, chat_id: i64, html: &str) -> Result<()> {
        for chunk in split_message(html, MAX_MESSAGE_CHARS) {
            self.send(OutboundMessage::new(chat_id, chunk).html()).await?;
        }
        Ok(())
    }

    async fn typing(&self, chat_id: i64) {
        if let Err(e) = self.channel.send_typing(chat_id).await {
            tracing::debug!(chat_id, "Failed to send typing action: {}", e);
        }
    }

    async fn clear_progress(&self, chat_id: i64, message_id: i64) {
        if let Err(e) = self.channel.delete_message(chat_id, message_id).await {
            tracing::debug!(chat_id, message_id, "Failed to delete progress message: {}", e);
        }
    }
}

/// First `max_chars` characters
fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
