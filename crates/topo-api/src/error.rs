use thiserror::Error;

/// Top-level error type for the `topo-api` crate.
///
/// Covers every failure mode of the entity endpoints: authentication,
/// transport, non-success responses and payload decoding.
/// `topo-core` maps these into per-type or run-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Token rejected by the platform (HTTP 401).
    #[error("Invalid API token")]
    InvalidApiToken,

    /// Token could not be turned into a header value.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The request limiter was shut down while a request waited for a slot.
    #[error("Request limiter closed")]
    LimiterClosed,

    /// A listing window bound is too far from now to be represented.
    #[error("Time window of {minutes} minutes is out of range")]
    TimeframeOutOfRange { minutes: i64 },

    // ── Platform responses ──────────────────────────────────────────
    /// Non-success response. The raw body is kept so callers can inspect
    /// the platform's error envelope.
    #[error("API error (HTTP {status}): {}", preview(.body))]
    Response { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

fn preview(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    &body[..end]
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Response { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }

    /// HTTP status of a non-success response, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Raw body of a non-success response.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::Response { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Statuses the transport retries on its own.
pub(crate) fn is_transient_status(status: u16) -> bool {
    matches!(status, 429 | 502 | 503 | 504)
}
