//! Shared primitive types.

/// A tracked member's Torn user id. Assigned by the remote service,
/// never generated locally.
pub type MemberId = i64;
