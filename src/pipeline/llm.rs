//! Transcription engine: one page image + instruction text → page text.
//!
//! [`PageTranscriber`] is the seam to the remote model. [`LlmTranscriber`]
//! drives an edgequake-llm provider; tests plug in fakes. [`transcribe_page`]
//! wraps either with the per-page error isolation the orchestrator relies on:
//! it always returns a [`TranscriptionResult`], never an `Err`.
//!
//! ## Retry Strategy
//!
//! Each attempt is bounded by `api_timeout_secs`. Failed attempts back off
//! exponentially (`retry_backoff_ms * 2^(attempt-1)`). The default of zero
//! retries keeps one provider call per page.

use crate::config::{RunConfig, DEFAULT_PROVIDER};
use crate::error::{PageError, Pdf2DocxError};
use crate::output::{PageStatus, TranscriptionResult};
use crate::pipeline::encode::encode_page;
use crate::pipeline::postprocess::clean_transcript;
use crate::prompts::{error_placeholder, NO_TEXT_PLACEHOLDER};
use async_trait::async_trait;
use edgequake_llm::{
    AnthropicProvider, ChatMessage, CompletionOptions, GeminiProvider, ImageData, LLMProvider,
    OpenAIProvider, ProviderFactory,
};
use image::RgbImage;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Sends one page to a transcription service.
#[async_trait]
pub trait PageTranscriber: Send + Sync {
    /// Return the raw text for `image`. `page_num` is only used for
    /// diagnostics.
    async fn transcribe(
        &self,
        page_num: usize,
        image: ImageData,
        instructions: &str,
    ) -> Result<String, PageError>;
}

/// [`PageTranscriber`] backed by an edgequake-llm vision provider.
pub struct LlmTranscriber {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    max_retries: u32,
    retry_backoff_ms: u64,
    api_timeout_secs: u64,
}

impl LlmTranscriber {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &RunConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout_secs: config.api_timeout_secs,
        }
    }
}

#[async_trait]
impl PageTranscriber for LlmTranscriber {
    async fn transcribe(
        &self,
        page_num: usize,
        image: ImageData,
        instructions: &str,
    ) -> Result<String, PageError> {
        // Prompt and page travel together in one user turn.
        let messages = vec![ChatMessage::user_with_images(instructions, vec![image])];

        let mut last_err = PageError::LlmFailed {
            page: page_num,
            attempts: 0,
            detail: "no attempt made".to_string(),
        };

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "Page {}: retry {}/{} after {}ms",
                    page_num, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            let call = self.provider.chat(&messages, Some(&self.options));
            match timeout(Duration::from_secs(self.api_timeout_secs), call).await {
                Ok(Ok(response)) => {
                    debug!(
                        "Page {}: {} input tokens, {} output tokens",
                        page_num, response.prompt_tokens, response.completion_tokens
                    );
                    return Ok(response.content);
                }
                Ok(Err(e)) => {
                    warn!("Page {}: attempt {} failed: {}", page_num, attempt + 1, e);
                    last_err = PageError::LlmFailed {
                        page: page_num,
                        attempts: attempt + 1,
                        detail: e.to_string(),
                    };
                }
                Err(_) => {
                    warn!(
                        "Page {}: attempt {} timed out after {}s",
                        page_num,
                        attempt + 1,
                        self.api_timeout_secs
                    );
                    last_err = PageError::Timeout {
                        page: page_num,
                        secs: self.api_timeout_secs,
                    };
                }
            }
        }

        Err(last_err)
    }
}

/// Delay before retry number `attempt` (1-based), saturating on overflow.
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

fn build_options(config: &RunConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Transcribe one page with error isolation.
///
/// Successful text is cleaned and trimmed; an empty result becomes
/// [`NO_TEXT_PLACEHOLDER`]. Any failure becomes an error placeholder and a
/// [`PageStatus::Error`].
pub async fn transcribe_page(
    transcriber: &dyn PageTranscriber,
    page_num: usize,
    image: &RgbImage,
    instructions: &str,
) -> TranscriptionResult {
    let start = Instant::now();

    let outcome = match encode_page(image) {
        Ok(data) => transcriber.transcribe(page_num, data, instructions).await,
        Err(e) => Err(PageError::EncodeFailed {
            page: page_num,
            detail: e.to_string(),
        }),
    };
    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(raw) => {
            let cleaned = clean_transcript(&raw);
            let text = cleaned.trim();
            let text = if text.is_empty() {
                info!("Page {}: no text detected", page_num);
                NO_TEXT_PLACEHOLDER.to_string()
            } else {
                text.to_string()
            };
            TranscriptionResult {
                page_num,
                text,
                status: PageStatus::Ok,
                duration_ms,
                figures: 0,
            }
        }
        Err(e) => {
            warn!("Page {}: {}", page_num, e);
            TranscriptionResult {
                page_num,
                text: error_placeholder(&e.to_string()),
                status: PageStatus::Error(e),
                duration_ms,
                figures: 0,
            }
        }
    }
}

/// Construct providers that accept the credential directly. `None` for
/// providers that read their own configuration (Ollama, LM Studio, ...).
fn keyed_provider(provider: &str, credential: &str, model: &str) -> Option<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match provider.to_ascii_lowercase().as_str() {
        "gemini" | "google" => Arc::new(GeminiProvider::new(credential).with_model(model)),
        "openai" => Arc::new(OpenAIProvider::new(credential).with_model(model)),
        "anthropic" | "claude" => Arc::new(AnthropicProvider::new(credential).with_model(model)),
        _ => return None,
    };
    Some(provider)
}

/// Resolve the transcriber for a run, from most-specific to least-specific.
///
/// 1. `config.transcriber`, used as-is.
/// 2. `config.provider_name`, else `settings_provider` (conf.txt), else
///    [`DEFAULT_PROVIDER`], created with `config.model_name()`. Gemini,
///    OpenAI and Anthropic receive the credential through their
///    constructor; other providers go through [`ProviderFactory`] and their
///    usual environment configuration.
pub fn resolve_transcriber(
    credential: &str,
    config: &RunConfig,
    settings_provider: Option<&str>,
) -> Result<Arc<dyn PageTranscriber>, Pdf2DocxError> {
    if let Some(ref transcriber) = config.transcriber {
        return Ok(Arc::clone(transcriber));
    }

    let provider_name = config
        .provider_name
        .as_deref()
        .or(settings_provider)
        .unwrap_or(DEFAULT_PROVIDER);
    let model = config.model_name();

    let provider = match keyed_provider(provider_name, credential, model) {
        Some(provider) => provider,
        None => ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            Pdf2DocxError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?,
    };
    info!("Using provider '{}' with model '{}'", provider_name, model);

    Ok(Arc::new(LlmTranscriber::new(provider, config)))
}
