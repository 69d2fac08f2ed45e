// ── Runtime download configuration ──
//
// These types describe *where* to download from and *how*. They carry
// credential data and tuning, but never touch disk. The CLI constructs
// them and hands them in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use topo_api::limit::DEFAULT_CONCURRENT_REQUESTS;
use topo_api::{
    EntitiesClient, HttpTransport, LimitedTransport, ListEntitiesOptions, TlsMode, TransportConfig,
};

use crate::error::CoreError;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed managed deployments).
    DangerAcceptInvalid,
}

/// Connection details for one environment.
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// Environment URL (e.g., `https://abc12345.live.example.com`).
    pub url: Url,
    /// API token sent as `Authorization: Api-Token <token>`.
    pub token: SecretString,
    pub tls: TlsVerification,
    pub timeout: Duration,
}

/// Tuning for one download run.
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub list: ListEntitiesOptions,
    /// Max requests in flight across all workers. 0 = default.
    pub concurrent_requests: usize,
    /// Pause before re-fetching a type after a field rejection.
    pub field_retry_delay: Duration,
    /// Project name stamped on every record's coordinate.
    pub project_name: String,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            list: ListEntitiesOptions::default(),
            concurrent_requests: DEFAULT_CONCURRENT_REQUESTS,
            field_retry_delay: Duration::from_secs(1),
            project_name: "project".into(),
        }
    }
}

/// The client stack used for real downloads.
pub type LimitedClient = EntitiesClient<LimitedTransport<HttpTransport>>;

impl EnvironmentConfig {
    fn transport_config(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
            ..TransportConfig::default()
        }
    }

    /// Build an authenticated client, limited to `concurrent_requests`
    /// requests in flight.
    pub fn connect(&self, concurrent_requests: usize) -> Result<LimitedClient, CoreError> {
        let transport =
            HttpTransport::from_api_token(self.url.as_str(), &self.token, self.transport_config())?;
        Ok(EntitiesClient::new(LimitedTransport::new(
            transport,
            concurrent_requests,
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = DownloadSettings::default();
        assert_eq!(settings.concurrent_requests, 5);
        assert_eq!(settings.list.entity_page_size, 500);
        assert_eq!(settings.field_retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn connect_applies_concurrency_limit() {
        let env = EnvironmentConfig {
            url: "https://tenant.example.com".parse().unwrap(),
            token: SecretString::from("token".to_owned()),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(5),
        };
        let client = env.connect(3).unwrap();
        assert_eq!(client.transport().limit(), 3);

        let client = env.connect(0).unwrap();
        assert_eq!(client.transport().limit(), DEFAULT_CONCURRENT_REQUESTS);
    }
}
