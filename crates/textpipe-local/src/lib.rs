use std::time::{Duration, Instant};
use textpipe_core::{Error, Result, TextFetcher};

pub mod inference;

pub use inference::{InferenceClient, InferenceConfig};

/// Fixed fetch timeout used unless the caller picks another one.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("textpipe-local/", env!("CARGO_PKG_VERSION"));

pub(crate) fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub(crate) fn env_u64(key: &str) -> Option<u64> {
    env(key).and_then(|s| s.parse::<u64>().ok())
}

#[derive(Debug, Clone)]
pub struct LocalFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl LocalFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    /// `timeout` bounds the whole request: connect, headers, and body.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait::async_trait]
impl TextFetcher for LocalFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;

        let t0 = Instant::now();
        tracing::debug!(%parsed, timeout_ms = self.timeout.as_millis() as u64, "fetching document");
        let resp = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Fetch(e.to_string()))?;

        // Decodes using the charset from Content-Type, falling back to UTF-8.
        let text = resp.text().await.map_err(|e| Error::Fetch(e.to_string()))?;
        tracing::debug!(
            bytes = text.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "fetched document"
        );
        Ok(text)
    }
}
