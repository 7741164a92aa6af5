use crate::{FetchError, RequestError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error as _;
use std::time::Duration;
use tracing::{debug, error, instrument};

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

const DEFAULT_USER_AGENT: &str = concat!("parallel-get/", env!("CARGO_PKG_VERSION"));

/// Anything that can turn a url into a response body.
///
/// The dispatcher attaches the url to any error returned here.
#[async_trait]
pub trait BodySource: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, RequestError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Applied both as the connect timeout and the whole-request timeout.
    /// Zero disables both.
    #[serde(rename = "timeout_ms", with = "duration_millis")]
    pub timeout: Duration,
    pub user_agent: String,
    pub pool_max_idle_per_host: usize,
    /// Treat 4xx/5xx responses as failures instead of returning their bodies.
    pub error_for_status: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            pool_max_idle_per_host: 10,
            error_for_status: false,
        }
    }
}

impl FetcherConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_error_for_status(mut self, error_for_status: bool) -> Self {
        self.error_for_status = error_for_status;
        self
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// reqwest-backed [`BodySource`]. Dropping the last clone closes its connection pool.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    config: FetcherConfig,
}

impl Fetcher {
    pub fn new() -> Result<Self, FetchError> {
        Self::new_with_config(FetcherConfig::default())
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        Self::new_with_config(FetcherConfig::default().with_timeout(timeout))
    }

    pub fn new_with_config(config: FetcherConfig) -> Result<Self, FetchError> {
        let mut builder = Client::builder();
        if !config.timeout.is_zero() {
            builder = builder
                .connect_timeout(config.timeout)
                .timeout(config.timeout);
        }

        let client = builder
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| {
                error!(error = %e, "Failed to create HTTP client");
                FetchError::ClientBuild(e.to_string())
            })?;

        debug!(timeout_ms = config.timeout.as_millis() as u64, "Fetcher initialized");
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<String, RequestError> {
        debug!(url = %url, "Starting fetch request");

        let mut response = self.client.get(url).send().await.map_err(|e| {
            debug!(error = %e, url = %url, "Failed to send request");
            self.describe(&e)
        })?;

        if self.config.error_for_status {
            response = response.error_for_status().map_err(|e| match e.status() {
                Some(status) => RequestError::Status(status.as_u16()),
                None => self.describe(&e),
            })?;
        }

        let content = response.text().await.map_err(|e| {
            debug!(error = %e, url = %url, "Failed to read response body");
            match self.describe(&e) {
                RequestError::Transport(cause) => RequestError::Body(cause),
                other => other,
            }
        })?;

        debug!(url = %url, content_length = content.len(), "Successfully fetched body");
        Ok(content)
    }

    fn describe(&self, e: &reqwest::Error) -> RequestError {
        if e.is_timeout() {
            return RequestError::Timeout {
                after_ms: self.config.timeout.as_millis() as u64,
            };
        }

        let mut description = e.to_string();
        let mut source = e.source();
        while let Some(cause) = source {
            description.push_str(": ");
            description.push_str(&cause.to_string());
            source = cause.source();
        }
        RequestError::Transport(description)
    }
}

#[async_trait]
impl BodySource for Fetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, RequestError> {
        self.fetch(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_default_config() {
        let config = FetcherConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(5000));
        assert!(config.user_agent.starts_with("parallel-get/"));
        assert!(!config.error_for_status);
    }

    #[test]
    fn test_config_timeout_is_milliseconds_in_serde() {
        let config: FetcherConfig = serde_json::from_str(r#"{"timeout_ms": 1500}"#).unwrap();
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.pool_max_idle_per_host, 10);
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hello"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Hello"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let body = fetcher.fetch(&format!("{}/hello", server.uri())).await;
        assert_eq!(body, Ok("Hello".to_string()));
    }

    #[tokio::test]
    async fn test_error_status_body_is_returned_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let body = fetcher.fetch(&server.uri()).await;
        assert_eq!(body, Ok("missing".to_string()));
    }

    #[tokio::test]
    async fn test_error_for_status_turns_404_into_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher =
            Fetcher::new_with_config(FetcherConfig::default().with_error_for_status(true))
                .unwrap();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert_eq!(err, RequestError::Status(404));
    }

    #[tokio::test]
    async fn test_timeout_is_described() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_timeout(Duration::from_millis(100)).unwrap();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert_eq!(err, RequestError::Timeout { after_ms: 100 });
    }

    #[tokio::test]
    async fn test_malformed_url_is_a_failure() {
        let fetcher = Fetcher::new().unwrap();
        assert!(matches!(
            fetcher.fetch("not a url").await,
            Err(RequestError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_timeout_means_no_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_timeout(Duration::ZERO).unwrap();
        assert_eq!(fetcher.fetch(&server.uri()).await, Ok("late".to_string()));
    }
}
