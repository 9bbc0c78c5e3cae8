pub use anyhow::{anyhow, Result};

use thiserror::Error as TError;

use crate::session::PodKey;

/// Failures produced by session transitions.
///
/// Gateway errors never escape the controller as-is: they are folded into
/// inventory or stream state first and then reported with one of these kinds.
#[derive(Debug, TError)]
pub enum SessionError {
    #[error("InventoryFetchFailed: {0}")]
    InventoryFetchFailed(String),
    #[error("StreamStartFailed: {0}")]
    StreamStartFailed(String),
    #[error("StreamCloseFailed: {0}")]
    StreamCloseFailed(String),
    #[error("ClipboardFailed: {0}")]
    ClipboardFailed(String),
    #[error("PodNotFound: {0}")]
    PodNotFound(PodKey),
    #[error("NoPodSelected")]
    NoPodSelected,
    #[error(transparent)]
    Describe(#[from] serde_yaml::Error),
}

impl SessionError {
    /// Transient kinds are only logged; the rest are shown until the next success.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StreamCloseFailed(_) | Self::ClipboardFailed(_))
    }
}

/// Uses the error's message, falling back when the gateway gave nothing readable.
pub(crate) fn message_or(err: &anyhow::Error, fallback: &str) -> String {
    let message = err.to_string();

    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
