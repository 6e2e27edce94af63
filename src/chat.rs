// src/chat.rs
//! Advisor conversation log.

use metrics::counter;
use parking_lot::Mutex;
use pulldown_cmark::{html, Options, Parser};
use serde::Serialize;
use tracing::{debug, warn};

use crate::client::DynApi;

/// Bot turn appended when the advisor call fails.
pub const CHAT_ERROR_MESSAGE: &str = "Erreur IA.";

/// Canned question behind the "generate advice" shortcut.
pub const BRIEFING_QUESTION: &str = "Génère un rapport stratégique rapide.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    /// Plain text for user turns, rendered HTML for bot turns.
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing sent, nothing appended.
    Ignored,
    Answered,
    Failed,
}

#[derive(Default)]
struct ChatLog {
    turns: Vec<ChatTurn>,
    in_flight: u32,
}

/// In-flight marker; lowered on drop so an abandoned send clears loading too.
struct Pending<'a>(&'a Mutex<ChatLog>);

impl<'a> Pending<'a> {
    fn enter(log: &'a Mutex<ChatLog>) -> Self {
        log.lock().in_flight += 1;
        Self(log)
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        let mut log = self.0.lock();
        log.in_flight = log.in_flight.saturating_sub(1);
    }
}

pub struct ChatSession {
    client: DynApi,
    log: Mutex<ChatLog>,
}

impl ChatSession {
    pub fn new(client: DynApi) -> Self {
        Self {
            client,
            log: Mutex::new(ChatLog::default()),
        }
    }

    pub async fn send(&self, question: &str) -> SendOutcome {
        if question.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        self.log.lock().turns.push(ChatTurn {
            role: ChatRole::User,
            content: question.to_string(),
        });
        let _pending = Pending::enter(&self.log);
        counter!("chat_requests_total").increment(1);
        debug!(target: "chat", len = question.len(), "asking advisor");

        let (turn, outcome) = match self.client.send_chat(question).await {
            Ok(reply) => (render_markdown(&reply.response), SendOutcome::Answered),
            Err(e) => {
                warn!(target: "chat", error = %e, "advisor call failed");
                counter!("chat_errors_total").increment(1);
                (CHAT_ERROR_MESSAGE.to_string(), SendOutcome::Failed)
            }
        };

        self.log.lock().turns.push(ChatTurn {
            role: ChatRole::Bot,
            content: turn,
        });
        outcome
    }

    pub async fn request_briefing(&self) -> SendOutcome {
        self.send(BRIEFING_QUESTION).await
    }

    pub fn turns(&self) -> Vec<ChatTurn> {
        self.log.lock().turns.clone()
    }

    pub fn len(&self) -> usize {
        self.log.lock().turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_loading(&self) -> bool {
        self.log.lock().in_flight > 0
    }

    pub fn clear(&self) {
        self.log.lock().turns.clear();
    }
}

/// Markdown to HTML, with tables and strikethrough that advisor reports use.
pub fn render_markdown(md: &str) -> String {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(md, opts);
    let mut out = String::with_capacity(md.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
