// ── Core error types ──
//
// Run-level and per-type failures of the entity downloader. Run-level
// variants abort a download; per-type variants are logged and recorded
// against their type while sibling types keep going.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Run-level errors ─────────────────────────────────────────────
    #[error("Failed to fetch the entity type catalog: {source}")]
    CatalogFetch {
        #[source]
        source: topo_api::Error,
    },

    #[error("Entity types not found in catalog: {}", missing.join(", "))]
    TypeNotFound { missing: Vec<String> },

    #[error("No entity types were requested")]
    NoTypesRequested,

    // ── Per-type errors ──────────────────────────────────────────────
    #[error("Entity type {type_id} rejected (HTTP {status}): {message}")]
    UnrecoverableResponse {
        type_id: String,
        status: u16,
        message: String,
    },

    #[error("Entity type {type_id} could not be fetched: {source}")]
    Transport {
        type_id: String,
        #[source]
        source: topo_api::Error,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Classify a listing failure for one type.
    ///
    /// Non-success responses become `UnrecoverableResponse`, using the
    /// platform's error message when the body carries one. Everything else
    /// stays a transport failure.
    pub fn for_type(type_id: &str, err: topo_api::Error) -> Self {
        match err {
            topo_api::Error::Response { status, body } => {
                let message = topo_api::ErrorEnvelope::parse(&body)
                    .map(|env| env.error.message)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(body);
                Self::UnrecoverableResponse {
                    type_id: type_id.to_owned(),
                    status,
                    message,
                }
            }
            source => Self::Transport {
                type_id: type_id.to_owned(),
                source,
            },
        }
    }
}

impl From<topo_api::Error> for CoreError {
    fn from(err: topo_api::Error) -> Self {
        match err {
            topo_api::Error::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            topo_api::Error::Tls(msg) => Self::Config {
                message: format!("TLS setup failed: {msg}"),
            },
            topo_api::Error::Authentication { message } => Self::Config { message },
            e @ topo_api::Error::TimeframeOutOfRange { .. } => Self::Config {
                message: e.to_string(),
            },
            source => Self::CatalogFetch { source },
        }
    }
}
