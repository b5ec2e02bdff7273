use serde::Serialize;

pub mod pipeline;
pub mod rank;
pub mod text;

pub use pipeline::{rank_words_from_url, rank_words_in_text, WordRanking};
pub use rank::{frequency_table, rank, RankWindow, RankedWord};
pub use text::{cleanse, tokenize, trim_to_last_sentence};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("Request failed with status code {status}: {body}")]
    Inference { status: u16, body: String },
    #[error("Error fetching text from URL: {0}")]
    Fetch(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub const DEFAULT_MAX_NEW_TOKENS: u32 = 50;
pub const DEFAULT_TEMPERATURE: f64 = 0.8;

#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Upper bound on generated tokens. Must be positive.
    pub max_new_tokens: u32,
    /// Sampling temperature. Must be positive and finite.
    pub temperature: f64,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_new_tokens == 0 {
            return Err(Error::InvalidParameter(
                "max_new_tokens must be greater than zero".to_string(),
            ));
        }
        if !self.temperature.is_finite() || self.temperature <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "temperature must be a positive number (got {})",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Remote text generation. Implementations return the continuation already
/// trimmed to its last complete sentence.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, req: &GenerationRequest) -> Result<String>;
}

/// Fetches a document body as text.
#[async_trait::async_trait]
pub trait TextFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String>;
}
