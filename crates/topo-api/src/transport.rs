// Shared transport layer for the entity endpoints.
//
// `TransportConfig` owns TLS, timeout and retry tuning. `HttpTransport`
// executes authenticated GETs and retries transient failures itself, so
// everything above it sees one response per logical request.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, is_transient_status};

/// TLS verification mode.
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (for self-signed managed deployments).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
    /// Total attempts per request, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on every further retry.
    pub retry_base_delay: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(60),
            max_attempts: 3,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` with additional default headers.
    ///
    /// Used to inject the `Authorization: Api-Token ...` header.
    pub fn build_client_with_headers(&self, headers: HeaderMap) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("topo/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    fn delay_for_retry(&self, retry: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

// ── Transport abstraction ────────────────────────────────────────────

/// Status and body of one completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes GET requests against the platform API.
///
/// Implementations return every completed exchange as a `RawResponse`,
/// whatever its status; only failures to complete the exchange are errors.
pub trait Transport: Send + Sync {
    fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> impl Future<Output = Result<RawResponse, Error>> + Send;
}

// ── HTTP implementation ──────────────────────────────────────────────

/// Authenticated `reqwest` transport rooted at an environment URL.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
    config: TransportConfig,
}

impl HttpTransport {
    /// Build from an API token and transport config.
    ///
    /// Injects `Authorization: Api-Token <token>` on every request.
    pub fn from_api_token(
        base_url: &str,
        token: &SecretString,
        config: TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(&format!("Api-Token {}", token.expose_secret()))
            .map_err(|e| Error::Authentication {
                message: format!("invalid API token header value: {e}"),
            })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);

        let http = config.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        config: TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    /// Ensure the base path ends with `/` so relative joins append.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn send_once(&self, url: &Url, query: &[(&str, String)]) -> Result<RawResponse, Error> {
        let resp = self.http.get(url.clone()).query(query).send().await?;
        let status = resp.status().as_u16();
        if status == 401 {
            return Err(Error::InvalidApiToken);
        }
        let body = resp.text().await?;
        Ok(RawResponse { status, body })
    }
}

impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<RawResponse, Error> {
        let url = self.base_url.join(path.trim_start_matches('/'))?;
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!(%url, attempt, "GET");
            let outcome = self.send_once(&url, query).await;

            let retryable = match &outcome {
                Ok(resp) => is_transient_status(resp.status),
                Err(e) => e.is_transient(),
            };
            if !retryable || attempt >= max_attempts {
                return outcome;
            }

            let delay = self.config.delay_for_retry(attempt);
            warn!(%url, attempt, ?delay, "transient failure, retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
