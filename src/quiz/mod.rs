//! Multiple-choice quizzes generated by the AI backend
//!
//! [`QuizMaster`] asks the model for questions, [`parse_questions`] turns the
//! reply into [`QuizQuestion`]s and [`QuizSessions`] tracks each user's
//! progress in memory. Nothing here is durable.

mod parser;
mod session;

pub use parser::parse_questions;
pub use session::{AnswerOutcome, QuizReply, QuizSession, QuizSessions, QuizStep};

use crate::ai::{prompts, AiService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Prefix of inline-button payloads
pub const CALLBACK_PREFIX: &str = "quiz";

/// One question with its options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub answer_index: usize,
}

impl QuizQuestion {
    /// Text of the right option
    pub fn correct_option(&self) -> &str {
        self.options
            .get(self.answer_index)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// `A`, `B`, `C`, ... for option `index`
pub fn option_label(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

/// Inline-button payload for an answer; stays well under Telegram's 64 bytes
pub fn callback_data(question_index: usize, option_index: usize) -> String {
    format!("{}:{}:{}", CALLBACK_PREFIX, question_index, option_index)
}

/// Parse `quiz:<question>:<option>`
pub fn parse_callback(data: &str) -> Option<(usize, usize)> {
    let mut parts = data.split(':');
    if parts.next()? != CALLBACK_PREFIX {
        return None;
    }
    let question = parts.next()?.parse().ok()?;
    let option = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((question, option))
}

/// Generates quiz questions with the AI backend
pub struct QuizMaster {
    ai: Arc<dyn AiService>,
}

impl QuizMaster {
    pub fn new(ai: Arc<dyn AiService>) -> Self {
        Self { ai }
    }

    /// Questions for `topic`; empty when the model fails or nothing parses
    pub async fn generate(&self, topic: &str) -> Vec<QuizQuestion> {
        let reply = match self.ai.generate_text(&prompts::quiz(topic)).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(topic, "Error fetching quiz questions: {}", e);
                return Vec::new();
            }
        };

        let questions = parse_questions(&reply);
        if questions.is_empty() {
            tracing::warn!(topic, "No quiz questions could be parsed from the model reply");
        } else {
            tracing::debug!(topic, count = questions.len(), "Quiz generated");
        }
        questions
    }
}
