//! Per-user quiz progress

use super::QuizQuestion;
use crate::error::{Error, Result};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Result of answering one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    /// Whether the chosen option was right
    pub correct: bool,
    /// Text of the right option
    pub correct_option: String,
}

/// One user's quiz in progress
#[derive(Debug, Clone)]
pub struct QuizSession {
    topic: String,
    questions: Vec<QuizQuestion>,
    current: usize,
    score: usize,
    answers: Vec<usize>,
}

impl QuizSession {
    /// Start a quiz; at least one question is required
    pub fn new(topic: impl Into<String>, questions: Vec<QuizQuestion>) -> Result<Self> {
        if questions.is_empty() {
            return Err(Error::Quiz("a quiz needs at least one question".to_string()));
        }
        Ok(Self {
            topic: topic.into(),
            questions,
            current: 0,
            score: 0,
            answers: Vec::new(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Index of the question awaiting an answer
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Question awaiting an answer, `None` once finished
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    pub fn score(&self) -> usize {
        self.score
    }

    /// Number of questions answered so far
    pub fn asked(&self) -> usize {
        self.answers.len()
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.questions.len()
    }

    /// Record an answer for the current question and move to the next one
    pub fn submit(&mut self, option_index: usize) -> Result<AnswerOutcome> {
        let question = self
            .questions
            .get(self.current)
            .ok_or_else(|| Error::Quiz("quiz already finished".to_string()))?;

        if option_index >= question.options.len() {
            return Err(Error::Quiz(format!(
                "option {} out of range for question {}",
                option_index, self.current
            )));
        }

        let correct = option_index == question.answer_index;
        let correct_option = question.correct_option().to_string();

        self.answers.push(option_index);
        if correct {
            self.score += 1;
        }
        self.current += 1;

        Ok(AnswerOutcome {
            correct,
            correct_option,
        })
    }

    /// Final score line
    pub fn summary(&self) -> String {
        format!(
            "Quiz completed! Your final score: {}/{} 🎉",
            self.score,
            self.total()
        )
    }

    /// Answered questions with the chosen option text, for the history record
    pub fn answer_log(&self) -> Vec<(String, String)> {
        self.questions
            .iter()
            .zip(&self.answers)
            .map(|(q, &a)| (q.question.clone(), q.options[a].clone()))
            .collect()
    }
}

/// What happens after an answer
#[derive(Debug, Clone)]
pub enum QuizStep {
    /// Ask this question next
    Next {
        index: usize,
        total: usize,
        question: QuizQuestion,
    },
    /// The quiz is over; the session has been removed
    Finished(QuizSession),
}

/// Answer outcome plus the next step
#[derive(Debug, Clone)]
pub struct QuizReply {
    pub outcome: AnswerOutcome,
    pub step: QuizStep,
}

/// Transient per-user quiz sessions
#[derive(Default)]
pub struct QuizSessions {
    sessions: Mutex<HashMap<i64, QuizSession>>,
}

impl QuizSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a user's quiz and return its first question
    pub async fn start(&self, user_id: i64, session: QuizSession) -> Option<QuizQuestion> {
        let first = session.current_question().cloned();
        self.sessions.lock().await.insert(user_id, session);
        first
    }

    /// Answer `question_index` with `option_index`.
    ///
    /// Answers for any question other than the current one are rejected, so
    /// a double tap or an old keyboard cannot advance the quiz twice.
    pub async fn answer(
        &self,
        user_id: i64,
        question_index: usize,
        option_index: usize,
    ) -> Result<QuizReply> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&user_id)
            .ok_or_else(|| Error::Quiz("no active quiz".to_string()))?;

        if question_index != session.current_index() {
            return Err(Error::Quiz(format!(
                "stale answer for question {} (current is {})",
                question_index,
                session.current_index()
            )));
        }

        let outcome = session.submit(option_index)?;

        let next = session
            .current_question()
            .cloned()
            .map(|question| (session.current_index(), session.total(), question));

        let step = match next {
            Some((index, total, question)) => QuizStep::Next {
                index,
                total,
                question,
            },
            None => match sessions.remove(&user_id) {
                Some(finished) => QuizStep::Finished(finished),
                None => return Err(Error::Internal("quiz session vanished".to_string())),
            },
        };

        Ok(QuizReply { outcome, step })
    }

    /// Number of quizzes in progress
    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
