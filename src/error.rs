use thiserror::Error;

/// Failure taxonomy for the extraction pipeline.
///
/// Every variant is terminal for the current request; the server layer maps
/// each to an HTTP status and a `detail` string. Carried strings are
/// human-readable and never include stack traces or internal identifiers.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("not a recognized YouTube video reference: {0}")]
    InvalidReference(String),

    #[error("video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("no captions available: {0}")]
    NoCaptionsAvailable(String),

    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("upstream rate limited, try again later")]
    UpstreamRateLimited,

    #[error("caption fetch failed: {0}")]
    FetchFailed(String),

    #[error("caption payload could not be parsed: {0}")]
    ParseError(String),
}

impl ExtractError {
    /// Whether a retry may help. Only network-level failures qualify;
    /// everything else is surfaced immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, ExtractError::UpstreamUnreachable(_))
    }
}

/// Result type alias for the extraction pipeline.
pub type Result<T> = std::result::Result<T, ExtractError>;
