//! Hugging Face text-generation inference client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::Oracle;
use crate::config::OracleConfig;
use crate::errors::OracleError;

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Debug, Clone, Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
    top_k: u32,
    do_sample: bool,
    return_full_text: bool,
}

#[derive(Debug, Deserialize)]
struct Generation {
    generated_text: String,
}

/// The endpoint answers with a list, a single object, or an error object
/// depending on the deployment.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerationResponse {
    Batch(Vec<Generation>),
    Single(Generation),
    Failure { error: String },
}

/// Asynchronous client for a Hugging Face text-generation endpoint.
#[derive(Clone)]
pub struct HuggingFaceOracle {
    http: reqwest::Client,
    url: String,
    model: String,
    token: Option<String>,
    token_env: String,
    parameters: GenerationParameters,
}

impl HuggingFaceOracle {
    /// Build a client from the `[oracle]` config section.
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("mergewise/0.1"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let url = format!(
            "{}/{}",
            config.endpoint.trim_end_matches('/'),
            config.model.trim_start_matches('/')
        );
        info!(url = %url, "created HuggingFaceOracle");

        Ok(Self {
            http,
            url,
            model: config.model.clone(),
            token: config.token.clone(),
            token_env: config.token_env.clone(),
            parameters: GenerationParameters {
                max_new_tokens: config.max_new_tokens,
                temperature: config.temperature,
                top_k: config.top_k,
                do_sample: config.temperature > 0.0,
                return_full_text: false,
            },
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Oracle for HuggingFaceOracle {
    fn name(&self) -> &str {
        "huggingface"
    }

    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| OracleError::MissingToken(self.token_env.clone()))?;

        let body = GenerationRequest {
            inputs: prompt,
            parameters: self.parameters.clone(),
        };

        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "text-generation endpoint returned error");
            return Err(OracleError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let raw = resp.text().await?;
        let text = parse_generation(&raw)?;
        debug!(len = text.len(), "completion received");
        Ok(text)
    }
}

fn parse_generation(raw: &str) -> Result<String, OracleError> {
    let parsed: GenerationResponse =
        serde_json::from_str(raw).map_err(|e| OracleError::ParseError(e.to_string()))?;

    let text = match parsed {
        GenerationResponse::Batch(mut items) => {
            if items.is_empty() {
                return Err(OracleError::EmptyResponse);
            }
            items.swap_remove(0).generated_text
        }
        GenerationResponse::Single(item) => item.generated_text,
        GenerationResponse::Failure { error } => {
            return Err(OracleError::ApiError { status: 200, body: error })
        }
    };

    if text.trim().is_empty() {
        return Err(OracleError::EmptyResponse);
    }
    Ok(text)
}
