use thiserror::Error;

use crate::types::MemberId;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Member {member_id} not found")]
    MemberNotFound { member_id: MemberId },

    #[error("Member {member_id} has an inconsistent stored snapshot")]
    CorruptSnapshot { member_id: MemberId },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type TrackerResult<T> = Result<T, TrackerError>;
