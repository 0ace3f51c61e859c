//! Survey delivery error types.

use thiserror::Error;

/// Result type for survey delivery operations.
pub type Result<T> = std::result::Result<T, SurveysError>;

/// Survey delivery errors.
#[derive(Debug, Error)]
pub enum SurveysError {
    /// A fetch is already outstanding; this call was rejected, not queued.
    #[error("surveys are already being loaded")]
    FetchInFlight,

    /// The surveys endpoint answered with a non-200 status.
    #[error("surveys endpoint returned status {status}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
    },

    /// The response body could not be parsed as a survey list.
    #[error("surveys response could not be parsed: {0}")]
    Parse(String),

    /// Transport-level failure reaching the surveys endpoint.
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The renderer extension has not been loaded.
    #[error("survey renderer extension is not loaded")]
    ExtensionNotLoaded,

    /// The extension loader failed to produce a renderer.
    #[error("survey renderer extension failed to load: {0}")]
    ExtensionLoad(String),

    /// No cached or fetched survey carries the requested id.
    #[error("unknown survey id: {0}")]
    UnknownSurvey(String),
}

impl SurveysError {
    /// Whether the failure is transient and a later call may succeed
    /// without any configuration change.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::FetchInFlight => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for SurveysError {
    fn from(err: serde_json::Error) -> Self {
        SurveysError::Parse(err.to_string())
    }
}
