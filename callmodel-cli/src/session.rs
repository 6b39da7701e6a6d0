//! Conversation history for the interactive front end.

use callmodel_core::ActionResponse;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Question text recorded when a session is ended.
pub const SESSION_ENDED: &str = "Session Ended";
/// Answer recorded when a session is ended.
pub const FAREWELL: &str = "Thank you for using AnyCompany Support Agent!";

/// One row of a rendered content list.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRow {
    pub kind: String,
    pub text: String,
}

/// A reply body, shaped for display.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Text(String),
    Table(Vec<ContentRow>),
}

impl Answer {
    /// A body that parses as a JSON list becomes a table; anything else is text.
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(serde_json::Value::Array(items)) => Answer::Table(
                items
                    .iter()
                    .map(|item| ContentRow {
                        kind: item["type"].as_str().unwrap_or("-").to_string(),
                        text: match item.get("text").and_then(|t| t.as_str()) {
                            Some(text) => text.to_string(),
                            None => item.to_string(),
                        },
                    })
                    .collect(),
            ),
            _ => Answer::Text(body.to_string()),
        }
    }

    pub fn render(&self) -> String {
        match self {
            Answer::Text(text) => text.clone(),
            Answer::Table(rows) => render_table(rows),
        }
    }
}

/// Render content rows as a `type | text` table.
pub fn render_table(rows: &[ContentRow]) -> String {
    let kind_width = rows
        .iter()
        .map(|r| r.kind.chars().count())
        .chain(std::iter::once("type".len()))
        .max()
        .unwrap_or(4);

    let mut out = format!("{:<kind_width$} | text\n", "type");
    out.push_str(&format!("{}-+-{}\n", "-".repeat(kind_width), "-".repeat(4)));
    for row in rows {
        let mut lines = row.text.lines();
        let first = lines.next().unwrap_or("");
        out.push_str(&format!("{:<kind_width$} | {}\n", row.kind, first));
        for line in lines {
            out.push_str(&format!("{:<kind_width$} | {}\n", "", line));
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: Answer,
    pub at: DateTime<Utc>,
}

/// Turns of the current session plus the last raw reply envelope.
#[derive(Debug)]
pub struct History {
    session_id: String,
    turns: Vec<ConversationTurn>,
    last_envelope: Option<ActionResponse>,
}

impl History {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            turns: Vec::new(),
            last_envelope: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Record a question and the reply it produced.
    pub fn record(&mut self, question: &str, reply: ActionResponse) -> &ConversationTurn {
        self.turns.push(ConversationTurn {
            question: question.to_string(),
            answer: Answer::from_body(reply.body()),
            at: Utc::now(),
        });
        self.last_envelope = Some(reply);
        &self.turns[self.turns.len() - 1]
    }

    /// Turns, most recent first.
    pub fn newest_first(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Raw envelope of the most recent reply.
    pub fn last_trace(&self) -> Option<&ActionResponse> {
        self.last_envelope.as_ref()
    }

    /// Append the farewell turn, then hand back the closed transcript and
    /// start a new session. The returned turns are oldest first and always
    /// end with the farewell.
    pub fn end(&mut self) -> Vec<ConversationTurn> {
        self.turns.push(ConversationTurn {
            question: SESSION_ENDED.to_string(),
            answer: Answer::Text(FAREWELL.to_string()),
            at: Utc::now(),
        });
        self.last_envelope = None;
        self.session_id = Uuid::new_v4().to_string();
        std::mem::take(&mut self.turns)
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
