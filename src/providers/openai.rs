use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use crate::language_utils::{get_language_name, map_locale};
use crate::translation::fields::TextFormat;

use super::{ProviderOptions, ProviderRequest, ShortenRequest, TranslationProvider};

const SYSTEM_NO_EXTRAS: &str =
    "Do not add any additional information like that you are trained on data up to certain date";
const SYSTEM_JSON_ARRAY: &str =
    "The text to translate is provided json format array. Respond also in json array format.";
const SYSTEM_EMPTY: &str = "If source text is not provided return empty response.";
const SYSTEM_ONLY_TRANSLATION: &str =
    "Respond only with translated text. Without any additional information.";

const DEFAULT_SHORTEN_PROMPT: &str = "Shorten the following text to not more than {length} characters. Can be less. Keep the language and meaning: \n{text}";

/// OpenAI client for the chat completions API
#[derive(Debug)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API endpoint base URL
    endpoint: String,
    /// Model name
    model: String,
    /// Initialization options
    options: ProviderOptions,
    /// Cumulative total tokens reported by the API
    total_tokens: AtomicU64,
    /// Bounds in-flight requests
    permits: Semaphore,
    /// Minimum interval between requests when rate limited
    min_interval: Option<Duration>,
    /// Time of the last request sent
    last_request: Mutex<Option<Instant>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u64,
}

impl OpenAI {
    /// Create a client from the provider configuration
    pub fn new_with_config(config: &ProviderConfig, options: ProviderOptions) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let min_interval = config
            .rate_limit
            .filter(|r| *r > 0)
            .map(|r| Duration::from_millis(60_000 / r as u64));

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            options,
            total_tokens: AtomicU64::new(0),
            permits: Semaphore::new(config.max_concurrent_requests.max(1)),
            min_interval,
            last_request: Mutex::new(None),
        })
    }

    fn locale_label(&self, locale: &str) -> String {
        let code = map_locale(locale, &self.options.locale_map);
        match get_language_name(locale) {
            Ok(name) => format!("{} ({})", name, code),
            Err(_) => code,
        }
    }

    fn format_instruction(format: TextFormat) -> Option<&'static str> {
        match format {
            TextFormat::Plain => None,
            TextFormat::Markdown => Some("The texts are Markdown. Keep all Markdown syntax, links and code blocks intact."),
            TextFormat::Html => Some("The texts are HTML. Translate only text content, keep every tag and attribute unchanged."),
        }
    }

    /// Build the request body, merging passthrough options over the defaults
    fn build_body(&self, messages: Vec<Value>) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if let Value::Object(map) = &mut body {
            for (key, value) in &self.options.api_options {
                if key != "messages" {
                    map.insert(key.clone(), value.clone());
                }
            }
        }
        body
    }

    async fn throttle(&self) {
        let Some(interval) = self.min_interval else {
            return;
        };
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Send a chat completion and return the first message content
    async fn complete(&self, body: Value) -> Result<String, ProviderError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        self.throttle().await;

        let api_url = format!("{}/chat/completions", self.endpoint);
        let response = self
            .client
            .post(&api_url)
            .bearer_auth(&self.options.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ProviderError::ConnectionError(e.to_string())
                } else {
                    ProviderError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("OpenAI API error ({}): {}", status, error_text);
            return Err(match status.as_u16() {
                401 | 403 => ProviderError::AuthenticationError(error_text),
                429 => ProviderError::RateLimitExceeded(error_text),
                code => ProviderError::ApiError {
                    status_code: code,
                    message: error_text,
                },
            });
        }

        let parsed = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        if let Some(usage) = &parsed.usage {
            self.total_tokens.fetch_add(usage.total_tokens, Ordering::Relaxed);
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::ParseError("Response contained no text".to_string()))
    }
}

/// Parse a JSON array of strings, tolerating a surrounding code fence
pub fn parse_translated_array(content: &str) -> Result<Vec<String>, ProviderError> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str::<Vec<String>>(unfenced)
        .map_err(|e| ProviderError::ParseError(format!("Expected a JSON array of strings: {}", e)))
}

/// Fill the shortening template
pub fn render_shorten_prompt(template: Option<&str>, text: &str, length: usize) -> String {
    template
        .unwrap_or(DEFAULT_SHORTEN_PROMPT)
        .replace("{length}", &length.to_string())
        .replace("{text}", text)
}

#[async_trait]
impl TranslationProvider for OpenAI {
    fn name(&self) -> &str {
        "openai"
    }

    async fn translate(&self, request: ProviderRequest) -> Result<Vec<String>, ProviderError> {
        if request.text.is_empty() {
            return Ok(Vec::new());
        }

        let texts = serde_json::to_string_pretty(&request.text)
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let prompt = format!(
            "Translate the following text from {} to {}: \n{}",
            self.locale_label(&request.source_locale),
            self.locale_label(&request.target_locale),
            texts
        );
        debug!("Translating {} {} texts with {}", request.text.len(), request.format, self.model);

        let mut messages = vec![
            json!({"role": "system", "content": SYSTEM_NO_EXTRAS}),
            json!({"role": "system", "content": SYSTEM_JSON_ARRAY}),
            json!({"role": "system", "content": SYSTEM_EMPTY}),
            json!({"role": "system", "content": SYSTEM_ONLY_TRANSLATION}),
        ];
        if let Some(instruction) = Self::format_instruction(request.format) {
            messages.push(json!({"role": "system", "content": instruction}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let content = self.complete(self.build_body(messages)).await?;
        parse_translated_array(&content)
    }

    async fn shorten(&self, request: ShortenRequest) -> Result<String, ProviderError> {
        let prompt = render_shorten_prompt(
            self.options.shorten_prompt.as_deref(),
            &request.text,
            request.length,
        );
        let messages = vec![
            json!({"role": "system", "content": SYSTEM_NO_EXTRAS}),
            json!({"role": "user", "content": prompt}),
        ];

        let content = self.complete(self.build_body(messages)).await?;
        Ok(content.trim().to_string())
    }

    async fn usage(&self) -> Result<u64, ProviderError> {
        Ok(self.total_tokens.load(Ordering::Relaxed))
    }
}
