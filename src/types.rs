//! Basic type definitions for the chat server
//!
//! Provides:
//! - `SessionId`: UUID-based identifier for one connection
//! - `SessionState`: lifecycle of a session

use uuid::Uuid;

/// Unique session identifier (newtype pattern)
///
/// Wraps a UUID v4. Screen names identify chatters on the wire, but a
/// name is not known until registration completes, so the broadcast set
/// and the logs key sessions by this id instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session lifecycle
///
/// Linear: `Registering -> Active -> Terminated`, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for a unique screen name
    Registering,
    /// Registered and enrolled in the broadcast set
    Active,
    /// Cleanup done, connection released
    Terminated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Registering => "registering",
            SessionState::Active => "active",
            SessionState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_unique() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::Registering.to_string(), "registering");
        assert_eq!(SessionState::Active.to_string(), "active");
        assert_eq!(SessionState::Terminated.to_string(), "terminated");
    }
}
