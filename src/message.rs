//! Line protocol definitions
//!
//! Newline-delimited text in both directions. Server lines are modelled as
//! an enum whose `Display` impl renders the exact wire literal; the only
//! structured client line is the registration reply.

use std::fmt;

use crate::error::AppError;

/// Server → Client line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Request a screen name
    SubmitName,
    /// A new member joined
    NameAccepted { name: String, address: String },
    /// Broadcast delivery
    Message { from: String, line: String },
    /// Direct delivery to a single member
    Whisper {
        from: String,
        to: String,
        line: String,
    },
    /// A member departed (`name` is empty if it never registered)
    Left { name: String },
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::SubmitName => f.write_str("SUBMITNAME"),
            ServerMessage::NameAccepted { name, address } => {
                write!(f, "NAMEACCEPTED {}({}) has entering", name, address)
            }
            ServerMessage::Message { from, line } => write!(f, "MESSAGE {}: {}", from, line),
            ServerMessage::Whisper { from, to, line } => {
                write!(f, "WHISPER from {} to {} {}", from, to, line)
            }
            // No space before "has": wire-compatible with existing clients
            ServerMessage::Left { name } => write!(f, "LEFT {}has left", name),
        }
    }
}

/// Client → Server registration reply: `<name> <address>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Requested screen name
    pub name: String,
    /// Self-reported address, informational only
    pub address: String,
}

impl Registration {
    /// Parse a registration line
    ///
    /// The line must split on single spaces into exactly two non-empty
    /// tokens. Anything else is a protocol violation that ends the session.
    pub fn parse(line: &str) -> Result<Self, AppError> {
        let mut parts = line.split(' ');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(name), Some(address), None) if !name.is_empty() && !address.is_empty() => {
                Ok(Self {
                    name: name.to_string(),
                    address: address.to_string(),
                })
            }
            _ => Err(AppError::MalformedRegistration(line.to_string())),
        }
    }
}
