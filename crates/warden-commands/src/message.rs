//! Inbound messages and outbound replies.

use warden_rbac::Principal;

/// An inbound chat message addressed to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Who sent the message
    pub sender: Principal,
    /// Message text with the bot mention already stripped
    pub text: String,
    /// Request correlation ID
    pub correlation_id: String,
}

impl Message {
    /// Create a message with a fresh correlation id.
    pub fn new(sender: Principal, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            correlation_id: uuid::Uuid::now_v7().to_string(),
        }
    }
}

/// Who can see a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Posted to the channel
    Channel,
    /// Shown to the sender only
    Ephemeral,
}

/// A reply to the sender of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply text
    pub text: String,
    /// Who can see it
    pub visibility: Visibility,
}

impl Reply {
    /// A reply posted to the channel.
    pub fn say(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            visibility: Visibility::Channel,
        }
    }

    /// A reply only the sender sees.
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            visibility: Visibility::Ephemeral,
        }
    }

    /// Check if only the sender sees this reply.
    pub fn is_ephemeral(&self) -> bool {
        self.visibility == Visibility::Ephemeral
    }
}
