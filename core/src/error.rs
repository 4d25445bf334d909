use crate::types::TopicId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The configured limits cannot be satisfied by the configured populations.
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// A topic cannot reach the required number of distinct specialists.
    #[error("Topic {topic} has {available} eligible specialists, {required} required")]
    InsufficientSpecialists {
        topic: TopicId,
        available: usize,
        required: usize,
    },

    /// Every (submitter, date) bucket is at its daily cap.
    #[error("No submission slot left for a {kind} request: every submitter-day is at {cap}")]
    CapacityExhausted { kind: &'static str, cap: u32 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GenError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

pub type GenResult<T> = Result<T, GenError>;
