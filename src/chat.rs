use std::time::{SystemTime, UNIX_EPOCH};

pub const WELCOME: &str = "Hello! I'm Sprout, your personal gardening assistant. \
Ask me anything about plants, pest control, or landscaping ideas!";

// Send failures degrade into the conversation instead of an error banner.
pub const SEND_FAILED: &str = "I'm sorry, I encountered an issue connecting to \
the gardening database. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: u64,
    pub role: Role,
    pub text: String,
    pub timestamp: i64,
}

/// The ordered sequence of chat turns shown to the user. Append-only, seeded
/// with a synthetic welcome turn, discarded when the app exits.
#[derive(Debug)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    next_id: u64,
    pub is_sending: bool,
}

impl Transcript {
    pub fn new() -> Self {
        let mut transcript = Transcript {
            messages: Vec::new(),
            next_id: 0,
            is_sending: false,
        };
        transcript.push(Role::Model, WELCOME.to_string());
        transcript
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    fn push(&mut self, role: Role, text: String) {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id,
            role,
            text,
            timestamp: now(),
        });
    }

    /// Appends the user turn optimistically and returns the text to submit.
    /// None when the input is blank or a send is already in flight.
    pub fn begin_send(&mut self, input: &str) -> Option<String> {
        if self.is_sending || input.trim().is_empty() {
            return None;
        }
        let text = input.to_string();
        self.push(Role::User, text.clone());
        self.is_sending = true;
        Some(text)
    }

    /// Appends the model turn for a completed send. A failed send appends the
    /// fixed apology instead, keeping the conversation intact.
    pub fn finish_send(&mut self, outcome: Result<String, String>) {
        let text = outcome.unwrap_or_else(|_| SEND_FAILED.to_string());
        self.push(Role::Model, text);
        self.is_sending = false;
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
