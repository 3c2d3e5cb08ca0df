use std::future::Future;
use std::time::Duration;

use regex_lite::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("upstream returned {0}")]
    Status(StatusCode),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("no passage in response")]
    EmptyPayload,
}

impl FetchError {
    /// Timeouts, connection failures and 5xx are worth another attempt;
    /// 4xx and bad payloads are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status(status) => status.is_server_error(),
            FetchError::Malformed(_) | FetchError::EmptyPayload => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Exponential backoff schedule for transient upstream failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given 1-based attempt fails.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
        exp.min(self.max_delay)
    }

    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay(attempt);
                    warn!(
                        "fetch attempt {}/{} failed ({}), retrying in {:?}",
                        attempt, self.max_attempts, err, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    data: SearchData,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SearchData {
    verses: Vec<VerseItem>,
    passages: Vec<PassageItem>,
}

#[derive(Deserialize)]
struct VerseItem {
    text: String,
}

#[derive(Deserialize)]
struct PassageItem {
    content: String,
}

pub struct BibleClient {
    client: Client,
    api_key: String,
    base_url: String,
    bible_id: String,
    retry: RetryPolicy,
}

impl BibleClient {
    pub fn new(base_url: &str, bible_id: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bible_id: bible_id.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Look up the passage text for a reference such as "Psalm 34:18".
    /// `None` means the passage is unavailable right now; callers fall back
    /// rather than treating it as a fault.
    pub async fn fetch(&self, reference: &str) -> Option<String> {
        match self.retry.run(|| self.attempt(reference)).await {
            Ok(text) => {
                info!("fetched passage for {}", reference);
                Some(text)
            }
            Err(err) => {
                warn!("passage {} unavailable: {}", reference, err);
                None
            }
        }
    }

    async fn attempt(&self, reference: &str) -> Result<String, FetchError> {
        let url = format!("{}/{}/search", self.base_url, self.bible_id);

        let response = self
            .client
            .get(&url)
            .header("api-key", &self.api_key)
            .query(&[("query", reference), ("limit", "1")])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body: SearchResponse = response.json().await?;
        extract_text(body)
    }
}

/// Pull the passage text out of a search response. Verses take precedence
/// over passages; a response carrying neither is a non-retryable miss.
fn extract_text(body: SearchResponse) -> Result<String, FetchError> {
    if let Some(verse) = body.data.verses.first() {
        Ok(plain_text(&verse.text))
    } else if let Some(passage) = body.data.passages.first() {
        Ok(plain_text(&passage.content))
    } else {
        Err(FetchError::EmptyPayload)
    }
}

/// Strip markup tags and collapse whitespace runs to single spaces.
pub fn plain_text(raw: &str) -> String {
    let mut text = raw.to_string();
    let tags = Regex::new(r"<[^>]*>").ok();
    if let Some(re) = tags {
        text = re.replace_all(&text, " ").to_string();
    }
    let spaces = Regex::new(r"\s+").ok();
    if let Some(re) = spaces {
        text = re.replace_all(&text, " ").to_string();
    }
    text.trim().to_string()
}
