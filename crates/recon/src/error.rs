use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::window::QueryWindow;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconError {
    /// Requested range is empty or reversed, or the window width is zero.
    #[error("invalid range {start}..={end} with {width}-day windows")]
    InvalidRange {
        start: NaiveDate,
        end: NaiveDate,
        width: u32,
    },
    /// Reconstruction input is not ordered newest first.
    #[error("transactions not sorted newest first at index {index}")]
    Unordered { index: usize },
    /// A raw record could not be normalized.
    #[error("record '{record_id}': cannot parse {field} '{value}'")]
    Malformed {
        record_id: String,
        field: &'static str,
        value: String,
    },
    /// The portal rejected the session; no further windows were queried.
    #[error("{window}: portal rejected the session: {message}")]
    SessionRejected { window: QueryWindow, message: String },
}

/// Why a single window could not be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Transport failure or timeout.
    Network,
    /// Session rejected by the portal (401/403).
    Auth,
    /// Portal answered but reported `success: false` or a 4xx/5xx.
    Rejected,
    /// Body could not be parsed.
    Malformed,
}

impl fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network error"),
            Self::Auth => write!(f, "authentication rejected"),
            Self::Rejected => write!(f, "query rejected"),
            Self::Malformed => write!(f, "malformed payload"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct SourceError {
    pub kind: SourceErrorKind,
    pub message: String,
}

impl SourceError {
    pub fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Network, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Auth, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Rejected, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Malformed, message)
    }
}
