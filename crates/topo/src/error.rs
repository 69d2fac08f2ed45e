//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use topo_config::ConfigError;
use topo_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not fetch entity types from {url}")]
    #[diagnostic(
        code(topo::catalog_failed),
        help(
            "Check that the environment is reachable and the token has the\n\
             entities.read scope. Run with -vv for request details."
        )
    )]
    CatalogFailed {
        url: String,
        #[source]
        source: CoreError,
    },

    // ── Authentication ───────────────────────────────────────────────
    #[error("The environment rejected the API token")]
    #[diagnostic(
        code(topo::auth_failed),
        help("Verify the token and that it has not expired.")
    )]
    AuthFailed,

    #[error("No API token configured for environment '{environment}'")]
    #[diagnostic(
        code(topo::no_credentials),
        help(
            "Set token_env in the environment profile, store a token in the\n\
             system keyring under service 'topo', account '{environment}/api-token',\n\
             or pass --token-env VAR."
        )
    )]
    NoCredentials { environment: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Entity types not found: {missing}")]
    #[diagnostic(
        code(topo::type_not_found),
        help("Run: topo types to see the available entity types")
    )]
    TypeNotFound { missing: String },

    #[error("Output folder {path} already exists")]
    #[diagnostic(
        code(topo::output_exists),
        help("Choose another --project or --output-folder, or pass --force to overwrite.")
    )]
    OutputExists { path: String },

    #[error("Entity types '{first}' and '{second}' would both be written to folder {folder}")]
    #[diagnostic(
        code(topo::folder_collision),
        help("Download the types separately with --specific-types and distinct --project names.")
    )]
    FolderCollision {
        folder: String,
        first: String,
        second: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(topo::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Environment '{name}' not found in configuration")]
    #[diagnostic(
        code(topo::environment_not_found),
        help("Available environments: {available}")
    )]
    EnvironmentNotFound { name: String, available: String },

    #[error("No environment configured")]
    #[diagnostic(
        code(topo::no_config),
        help(
            "Add an [environments.<name>] table to {path}\n\
             or pass --url and --token-env."
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(topo::config))]
    Config(Box<figment::Error>),

    // ── Download ─────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(topo::download))]
    Download(CoreError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error("Failed to write {path}: {source}")]
    #[diagnostic(code(topo::io))]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(topo::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    #[diagnostic(code(topo::json))]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CatalogFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::TypeNotFound { .. } | Self::EnvironmentNotFound { .. } => exit_code::NOT_FOUND,
            Self::OutputExists { .. } | Self::FolderCollision { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the environment URL to a core error.
    pub fn from_core(err: CoreError, url: &str) -> Self {
        match err {
            CoreError::CatalogFetch {
                source: topo_core::ApiError::InvalidApiToken,
            } => Self::AuthFailed,
            err @ CoreError::CatalogFetch { .. } => Self::CatalogFailed {
                url: url.to_owned(),
                source: err,
            },
            other => other.into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::TypeNotFound { missing } => Self::TypeNotFound {
                missing: missing.join(", "),
            },
            CoreError::NoTypesRequested => Self::Validation {
                field: "specific-types".into(),
                reason: "no entity types given".into(),
            },
            CoreError::Config { message } => Self::Validation {
                field: "environment".into(),
                reason: message,
            },
            other => Self::Download(other),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { environment } => Self::NoCredentials { environment },
            ConfigError::UnknownEnvironment { name, available } => Self::EnvironmentNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            },
            ConfigError::Figment(err) => Self::Config(err),
        }
    }
}
