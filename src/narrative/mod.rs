pub mod anthropic;

pub use anthropic::AnthropicClient;

use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Instruction sent with every narrative request.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that analyzes data about a GitHub \
repository and writes a tech health appendix for a pitch deck, auditing the codebase to build \
investor confidence. Write flowing prose rather than lists. The scores in the data are arbitrary, \
so do not mention them; use them only to judge what a good repository looks like.";

const PROMPT_PREFIX: &str = "Analyze this data: ";

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("Provider request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Provider API key not found in config or environment")]
    MissingApiKey,

    #[error("Failed to serialize prompt data: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl NarrativeError {
    /// Connection problems, timeouts, rate limiting and provider-side
    /// errors are worth another attempt; everything else is final.
    pub fn is_transient(&self) -> bool {
        match self {
            NarrativeError::ApiRequest(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err.status().is_some_and(|s| is_retryable_status(s.as_u16()))
            }
            NarrativeError::Status { status, .. } => is_retryable_status(*status),
            NarrativeError::MissingApiKey | NarrativeError::Serialize(_) => false,
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

/// Opaque text-generation capability. AnthropicClient is the production
/// implementation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt` under the `system` instruction and
    /// return the text as received.
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, NarrativeError>;
}

/// Serialize `data` into the single user message sent to the provider.
pub fn build_prompt<T: Serialize + ?Sized>(data: &T) -> Result<String, NarrativeError> {
    let json = serde_json::to_string(data)?;
    Ok(format!("{}{}", PROMPT_PREFIX, json))
}

/// Turn analyzer output into investor-facing prose. The generated text is
/// returned unmodified.
#[instrument(skip_all)]
pub async fn generate_narrative<T: Serialize + ?Sized>(
    generator: &dyn TextGenerator,
    data: &T,
) -> Result<String, NarrativeError> {
    let prompt = build_prompt(data)?;
    debug!(prompt_bytes = prompt.len(), "requesting narrative");
    let text = generator.generate(SYSTEM_PROMPT, &prompt).await?;
    debug!(text_bytes = text.len(), "received narrative");
    Ok(text)
}

/// Run `attempt` until it succeeds, fails with a non-transient error, or
/// `max_retries` retries have been spent. The delay doubles after each retry.
pub async fn with_retries<T, F, Fut>(
    max_retries: u32,
    backoff: Duration,
    mut attempt: F,
) -> Result<T, NarrativeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NarrativeError>>,
{
    let mut retries = 0;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && retries < max_retries => {
                let delay = retry_delay(backoff, retries);
                retries += 1;
                warn!(
                    retry = retries,
                    max_retries,
                    error = %err,
                    ?delay,
                    "transient provider failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// `backoff * 2^retries`, saturating instead of overflowing.
fn retry_delay(backoff: Duration, retries: u32) -> Duration {
    backoff.saturating_mul(2u32.saturating_pow(retries))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Records the last prompt and answers with a fixed reply, or fails when
    /// `reply` is None.
    #[derive(Default)]
    pub struct MockGenerator {
        pub reply: Option<String>,
        pub last_prompt: Mutex<Option<(String, String)>>,
    }

    impl MockGenerator {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl TextGenerator for MockGenerator {
        async fn generate(&self, system: &str, prompt: &str) -> Result<String, NarrativeError> {
            *self.last_prompt.lock().unwrap() = Some((system.to_string(), prompt.to_string()));
            self.reply.clone().ok_or(NarrativeError::Status {
                status: 529,
                body: "overloaded".to_string(),
            })
        }
    }

    fn status(code: u16) -> NarrativeError {
        NarrativeError::Status {
            status: code,
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn test_generate_narrative_returns_text_verbatim() {
        let generator = MockGenerator::replying("  Solid engineering.\n\n");
        let text = generate_narrative(&generator, &json!({"repo": {"name": "widget"}}))
            .await
            .unwrap();
        assert_eq!(text, "  Solid engineering.\n\n");

        let (system, prompt) = generator.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(system, SYSTEM_PROMPT);
        assert_eq!(prompt, r#"Analyze this data: {"repo":{"name":"widget"}}"#);
    }

    #[tokio::test]
    async fn test_generate_narrative_propagates_failure() {
        let generator = MockGenerator::default();
        let err = generate_narrative(&generator, &json!({})).await.unwrap_err();
        assert!(matches!(err, NarrativeError::Status { status: 529, .. }));
    }

    #[test]
    fn test_build_prompt_handles_deep_nesting() {
        let mut value = json!("leaf");
        for depth in 0..200 {
            value = json!({ "level": depth, "child": value, "tags": ["a", "b"] });
        }
        let prompt = build_prompt(&value).unwrap();
        assert!(prompt.starts_with(PROMPT_PREFIX));
        assert!(prompt.contains("\"leaf\""));
    }

    #[test]
    fn test_build_prompt_accepts_any_json() {
        for value in [Value::Null, json!(42), json!("text"), json!([1, [2, [3]]])] {
            assert!(build_prompt(&value).is_ok());
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(status(429).is_transient());
        assert!(status(500).is_transient());
        assert!(status(529).is_transient());
        assert!(!status(400).is_transient());
        assert!(!status(401).is_transient());
        assert!(!NarrativeError::MissingApiKey.is_transient());
    }

    #[test]
    fn test_retry_delay_doubles() {
        let backoff = Duration::from_millis(500);
        assert_eq!(retry_delay(backoff, 0), Duration::from_millis(500));
        assert_eq!(retry_delay(backoff, 1), Duration::from_secs(1));
        assert_eq!(retry_delay(backoff, 3), Duration::from_secs(4));
    }

    #[test]
    fn test_retry_delay_saturates_for_large_retry_counts() {
        let backoff = Duration::from_millis(500);
        assert_eq!(retry_delay(backoff, 32), backoff * u32::MAX);
        assert_eq!(retry_delay(Duration::MAX, 40), Duration::MAX);
        assert!(retry_delay(backoff, 40) >= retry_delay(backoff, 31));
    }

    #[tokio::test]
    async fn test_with_retries_recovers_from_transient_failures() {
        let calls = &AtomicU32::new(0);
        let result = with_retries(2, Duration::ZERO, move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(status(503))
            } else {
                Ok("done")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retries_gives_up_after_limit() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_retries(2, Duration::ZERO, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(status(529))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retries_does_not_retry_client_errors() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_retries(2, Duration::ZERO, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(status(400))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
