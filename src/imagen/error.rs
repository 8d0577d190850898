//! Error type for Imagen API operations.

use std::time::Duration;

use super::options::JobKind;

/// Errors that can occur while driving an Imagen job.
#[derive(Debug, thiserror::Error)]
pub enum ImagenError {
    /// Missing credential, missing profile identifier or unusable settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The API key was rejected (HTTP 401).
    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// A named profile does not exist for this API key.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transfer failed: {message}")]
    Transfer {
        /// Remote error message or a summary of failed file transfers
        message: String,
    },

    #[error("Project {job_id} {kind} failed")]
    JobFailed {
        /// Project UUID of the failed job
        job_id: String,
        /// Phase that reported the failure
        kind: JobKind,
    },

    #[error("Project {job_id} {kind} did not finish within {waited:?}")]
    PollTimeout {
        job_id: String,
        kind: JobKind,
        /// Time spent polling before giving up
        waited: Duration,
    },

    #[error("Remote request failed with status {status}: {message}")]
    Remote {
        /// HTTP status code of the response
        status: u16,
        /// Remote `error.message`, or the raw body when absent
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

impl ImagenError {
    /// Whether repeating the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ImagenError::Http(_) | ImagenError::Io(_) => true,
            ImagenError::Remote { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
