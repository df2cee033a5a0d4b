//! Chat completion client with an ordered model fallback chain.

use std::fmt;
use std::time::Duration;

use painradar_core::config::DEFAULT_OPENROUTER_URL;
use painradar_core::{RadarConfig, RetryDecision, RetryPolicy};
use painradar_signals::ScoredPost;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::InsightError;
use crate::parse::parse_structured;
use crate::prompt::build_prompt;
use crate::types::InsightReport;

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 1500;
const REFERER: &str = "https://github.com/painradar/painradar";
const APP_TITLE: &str = "Pain Radar Problem Analyzer";
const ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// One model's failure, labelled with the model for the final error list.
#[derive(Debug)]
struct ModelFailure {
    model: String,
    error: InsightError,
}

impl fmt::Display for ModelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.model, self.error)
    }
}

/// Client for an OpenAI-compatible chat completion endpoint.
///
/// Use [`Summarizer::new`] for OpenRouter or [`Summarizer::with_base_url`] to
/// point at a mock server in tests.
pub struct Summarizer {
    client: Client,
    api_key: String,
    endpoint: String,
    models: Vec<String>,
}

impl fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Summarizer")
            .field("api_key", &"[redacted]")
            .field("endpoint", &self.endpoint)
            .field("models", &self.models)
            .finish_non_exhaustive()
    }
}

impl Summarizer {
    /// # Errors
    ///
    /// Returns [`InsightError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, models: Vec<String>, timeout_secs: u64) -> Result<Self, InsightError> {
        Self::with_base_url(api_key, models, timeout_secs, DEFAULT_OPENROUTER_URL)
    }

    /// `endpoint` is the full chat completions URL.
    ///
    /// # Errors
    ///
    /// Returns [`InsightError::Http`] if the HTTP client cannot be built.
    pub fn with_base_url(
        api_key: &str,
        models: Vec<String>,
        timeout_secs: u64,
        endpoint: &str,
    ) -> Result<Self, InsightError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            endpoint: endpoint.to_owned(),
            models,
        })
    }

    /// `None`, with a warning, when no API key is configured or the client
    /// cannot be built; analysis is then skipped rather than failing the run.
    #[must_use]
    pub fn from_config(cfg: &RadarConfig) -> Option<Self> {
        let Some(api_key) = cfg.openrouter_api_key.as_deref() else {
            tracing::warn!("OPENROUTER_API_KEY not set, insight analysis disabled");
            return None;
        };
        match Self::with_base_url(
            api_key,
            cfg.insight_models.clone(),
            cfg.timeout_secs,
            &cfg.openrouter_base_url,
        ) {
            Ok(summarizer) => Some(summarizer),
            Err(e) => {
                tracing::warn!(error = %e, "could not build insight client, analysis disabled");
                None
            }
        }
    }

    #[must_use]
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Summarizes up to the first 30 posts.
    ///
    /// Each model is tried in order with the identical request until one
    /// answers. Any failure, a 401 included, moves on to the next model. An
    /// empty post list returns a fixed report without a request.
    ///
    /// # Errors
    ///
    /// Returns [`InsightError::AllModelsFailed`] with one entry per model when
    /// every model fails.
    pub async fn summarize(
        &self,
        topic: &str,
        posts: &[ScoredPost],
    ) -> Result<InsightReport, InsightError> {
        if posts.is_empty() {
            return Ok(InsightReport::empty(topic));
        }
        if self.models.is_empty() {
            return Err(InsightError::AllModelsFailed {
                errors: vec!["no models configured".to_string()],
            });
        }

        let prompt = build_prompt(topic, posts);
        let attempts = u32::try_from(self.models.len()).unwrap_or(u32::MAX);
        let outcome = RetryPolicy::immediate(attempts)
            .run(
                |attempt| {
                    let model = self.models[attempt as usize].as_str();
                    let prompt = prompt.as_str();
                    async move {
                        tracing::info!(model, "requesting analysis");
                        self.complete(model, prompt)
                            .await
                            .map(|raw| (model.to_string(), raw))
                            .map_err(|error| ModelFailure {
                                model: model.to_string(),
                                error,
                            })
                    }
                },
                |failure: &ModelFailure| {
                    tracing::warn!(
                        model = %failure.model,
                        error = %failure.error,
                        "model failed, trying next"
                    );
                    RetryDecision::Retry
                },
            )
            .await;

        match outcome {
            Ok((model, raw)) => {
                let mut report = parse_structured(topic, &raw);
                report.model = Some(model);
                Ok(report)
            }
            Err(failure) => Err(InsightError::AllModelsFailed {
                errors: failure.errors.iter().map(ToString::to_string).collect(),
            }),
        }
    }

    /// One completion request; returns the reply text, empty when absent.
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, InsightError> {
        let request = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(InsightError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(model, status = status.as_u16(), "completion request failed");
            return Err(InsightError::UnexpectedStatus {
                status: status.as_u16(),
                model: model.to_string(),
                body: body.chars().take(ERROR_BODY_CHARS).collect(),
            });
        }

        let bytes = response.bytes().await?;
        let parsed: ChatResponse =
            serde_json::from_slice(&bytes).map_err(|source| InsightError::Deserialize {
                context: format!("chat completion from {model}"),
                source,
            })?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
