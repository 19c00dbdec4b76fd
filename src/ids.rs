//! Canonical room id codec
//!
//! A two-party conversation is keyed by a deterministic, order-independent
//! string: the numerically smaller user id first, joined by `-`. The codec
//! also parses ids back into their participant pair, which is how every
//! authorization check re-derives who is allowed in a room.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::types::UserId;

const DELIMITER: char = '-';

/// Canonical identifier of a two-party room
///
/// Wire form is the raw string (e.g. `"3-7"`); validity is checked at use
/// sites via [`RoomId::parse_pair`] rather than at decode time, so malformed
/// ids arriving from a client fail the operation instead of the frame decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Build the canonical id for the unordered pair {a, b}
    ///
    /// Swapping the arguments yields the identical id.
    pub fn canonical(a: UserId, b: UserId) -> Self {
        if a < b {
            Self(format!("{}{}{}", a, DELIMITER, b))
        } else {
            Self(format!("{}{}{}", b, DELIMITER, a))
        }
    }

    /// Parse the two participant ids out of this room id
    ///
    /// Fails with [`AppError::MalformedRoomId`] unless the id is exactly
    /// two unsigned integers joined by the delimiter.
    pub fn parse_pair(&self) -> Result<(UserId, UserId), AppError> {
        let mut parts = self.0.split(DELIMITER);
        let (Some(first), Some(second), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(AppError::MalformedRoomId(self.0.clone()));
        };
        let a: u64 = first
            .parse()
            .map_err(|_| AppError::MalformedRoomId(self.0.clone()))?;
        let b: u64 = second
            .parse()
            .map_err(|_| AppError::MalformedRoomId(self.0.clone()))?;
        Ok((UserId(a), UserId(b)))
    }

    /// The other participant of this room, from `me`'s perspective
    ///
    /// Fails with [`AppError::UserNotInRoom`] if `me` is neither participant.
    pub fn counterparty(&self, me: UserId) -> Result<UserId, AppError> {
        let (a, b) = self.parse_pair()?;
        if a == me {
            Ok(b)
        } else if b == me {
            Ok(a)
        } else {
            Err(AppError::UserNotInRoom {
                room: self.0.clone(),
                user: me,
            })
        }
    }

    /// True iff the id parses and `user` is one of its two participants
    pub fn is_member(&self, user: UserId) -> bool {
        match self.parse_pair() {
            Ok((a, b)) => a == user || b == user,
            Err(_) => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
