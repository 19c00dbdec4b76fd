//! Basic type definitions for the messaging hub
//!
//! Provides newtype wrappers for type safety:
//! - `UserId`: numeric identity of an authenticated user
//! - `ConnId`: UUID-based unique identifier for one live connection
//! - `MessageId`: numeric identity of a persisted message

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated user identifier (newtype pattern)
///
/// A user may hold several concurrent connections; all of them share
/// the same `UserId`. Serializes as a bare number on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4 so two connections of the same user stay
/// distinguishable in rooms and in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub Uuid);

impl ConnId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted message identifier, issued by the message store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conn_id_unique() {
        let id1 = ConnId::new();
        let id2 = ConnId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_user_id_serializes_as_number() {
        let json = serde_json::to_string(&UserId(42)).unwrap();
        assert_eq!(json, "42");
        let back: UserId = serde_json::from_str("42").unwrap();
        assert_eq!(back, UserId(42));
    }

    #[test]
    fn test_user_id_ordering() {
        assert!(UserId(3) < UserId(7));
    }
}
