use serde::{Deserialize, Serialize};
use log::{debug, trace, error, warn, info};

use crate::error::Error;
use crate::providers::CompletionClient;
use crate::request::{CompletionRequest, CompletionResponse, Role};

const OPENAI_API_BASE: &str
  = "https://api.openai.com/v1";

/// Model family markers for reasoning models
const REASONING_FAMILIES: &[&str]
  = &["o1-", "o3-", "gpt-5"];

/// Cost per 1M tokens in USD (input, output), most specific first
const COSTS: &[(&str, f64, f64)] = &[
    ("gpt-4o-mini", 0.150, 0.600)
  , ("gpt-4o", 2.50, 10.00)
  , ("gpt-4-turbo", 10.00, 30.00)
  , ("gpt-4", 30.00, 60.00)
  , ("gpt-3.5-turbo", 0.50, 1.50)
  , ("o1-preview", 15.00, 60.00)
  , ("o1-mini", 3.00, 12.00)
  , ("o3-mini", 3.00, 12.00)
];

/// Token budget when a reasoning request does not set one
const REASONING_DEFAULT_MAX_TOKENS: usize = 2_000;

// ===== Wire Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage
{   pub role: String
  , pub content: String
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiChatRequest
{   pub model: String
  , pub messages: Vec<WireMessage>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<usize>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChatResponse
{   pub choices: Vec<Choice>
  , #[serde(default)]
    pub usage: Option<OpenAiUsage>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   pub message: ChoiceMessage
  , pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage
{   #[serde(default)]
    pub content: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiUsage
{   #[serde(default)]
    pub prompt_tokens: usize
  , #[serde(default)]
    pub completion_tokens: usize
}

// ===== OpenAI Adapter =====

/// OpenAI adapter: the primary general/reasoning-capable provider
#[derive(Debug, Clone)]
pub struct OpenAiClient
{   api_key: Option<String>
  , default_model: String
  , default_max_tokens: usize
  , default_temperature: f32
  , retry: crate::retry::RetryPolicy
  , component: String
  , http_client: reqwest::Client
}

impl OpenAiClient
{   /// Build the adapter once at startup from immutable settings
    pub fn new(cfg: &crate::config::Settings) -> Self
    {   debug!("Creating OpenAiClient");
        OpenAiClient
        {   api_key: cfg.openai_api_key.clone()
          , default_model: cfg.model_primary.clone()
          , default_max_tokens: cfg.default_max_tokens
          , default_temperature: cfg.default_temperature
          , retry: cfg.retry_policy()
          , component: "ai_client.openai".to_string()
          , http_client: build_http_client(cfg.timeout_secs)
        }
    }

    /// Assemble wire parameters for one request
    ///
    /// An explicit system_prompt is prepended as a system message;
    /// OpenAI accepts it alongside system-role messages. Reasoning
    /// models take max_completion_tokens and no temperature.
    pub fn build_request(
      &self
    , request: &CompletionRequest
    , model: &str
    ) -> OpenAiChatRequest
    {   let mut messages = Vec::new();

        if let Some(system) = &request.system_prompt
        {   messages.push(WireMessage
            {   role: Role::System.as_str().to_string()
              , content: system.clone()
            });
        }

        for msg in &request.messages
        {   messages.push(WireMessage
            {   role: msg.role.as_str().to_string()
              , content: msg.content.clone()
            });
        }

        if self.is_reasoning_model(model)
        {   OpenAiChatRequest
            {   model: model.to_string()
              , messages
              , max_tokens: None
              , max_completion_tokens: Some(
                  request.max_tokens
                    .unwrap_or(REASONING_DEFAULT_MAX_TOKENS)
                )
              , temperature: None
            }
        } else
        {   OpenAiChatRequest
            {   model: model.to_string()
              , messages
              , max_tokens: Some(
                  request.max_tokens
                    .unwrap_or(self.default_max_tokens)
                )
              , max_completion_tokens: None
              , temperature: Some(
                  request.temperature
                    .unwrap_or(self.default_temperature)
                )
            }
        }
    }

    /// One API attempt: call, classify, normalize
    async fn try_complete(
      &self
    , request: &CompletionRequest
    , model: &str
    ) -> Result<CompletionResponse, Error>
    {   let api_key = self.api_key.as_ref()
          .ok_or_else(|| {
            error!("No OpenAI API key configured");
            Error::MissingApiKey("openai".to_string())
          })?;

        let wire = self.build_request(request, model);
        trace!("OpenAI request: {:?}", wire);

        let response = self.http_client
          .post(format!("{}/chat/completions", OPENAI_API_BASE))
          .header("Authorization", format!("Bearer {}", api_key))
          .header("Content-Type", "application/json")
          .json(&wire)
          .send()
          .await
          .map_err(crate::providers::classify_transport_error)?;

        let status = response.status();
        trace!("OpenAI response status: {}", status);

        if status.as_u16() == 429
        {   warn!("OpenAI rate limit hit");
            return Err(Error::RateLimited);
        }

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("OpenAI API error: {}", error_text);
            return Err(Error::ApiError(
              format!("OpenAI {}: {}", status, error_text)
            ));
        }

        let body = response.text().await
          .map_err(|e| {
            error!("Failed to read response body: {}", e);
            Error::HttpError(e.to_string())
          })?;

        let raw: serde_json::Value
          = serde_json::from_str(&body).map_err(|e| {
              error!("Parse error: {}", e);
              Error::ParseError(e.to_string())
            })?;

        let chat: OpenAiChatResponse
          = serde_json::from_value(raw.clone()).map_err(|e| {
              error!("Parse error: {}", e);
              Error::ParseError(e.to_string())
            })?;

        let choice = chat.choices.first()
          .ok_or_else(|| {
            error!("No choices in OpenAI response");
            Error::NoChoicesInResponse
          })?;

        let content = choice.message.content
          .clone()
          .unwrap_or_default();

        if content.trim().is_empty()
        {   warn!("Empty completion from OpenAI model: {}", model);
            return Err(Error::EmptyCompletion);
        }

        let (input_tokens, output_tokens) = match &chat.usage
        {   Some(usage) => (usage.prompt_tokens, usage.completion_tokens)
          , None => (0, 0)
        };

        let cost = self.calculate_cost(model, input_tokens, output_tokens);

        crate::usage::log_completion(
          model,
          input_tokens,
          output_tokens,
          cost,
          &self.component
        );

        info!(
          "OpenAI completion successful: model={} tokens={} cost=${:.6}",
          model,
          input_tokens + output_tokens,
          cost
        );

        Ok(CompletionResponse
        {   content: content.trim().to_string()
          , model: model.to_string()
          , input_tokens
          , output_tokens
          , total_tokens: input_tokens + output_tokens
          , cost
          , provider: crate::Provider::OpenAI
          , raw_response: Some(raw)
        })
    }
}

impl CompletionClient for OpenAiClient
{   fn provider(&self) -> crate::Provider
    {   crate::Provider::OpenAI
    }

    fn default_model(&self) -> &str
    {   &self.default_model
    }

    fn is_reasoning_model(&self, model: &str) -> bool
    {   let model_lower = model.to_lowercase();
        REASONING_FAMILIES.iter()
          .any(|family| model_lower.contains(family))
    }

    fn calculate_cost(
      &self
    , model: &str
    , input_tokens: usize
    , output_tokens: usize
    ) -> f64
    {   let model_lower = model.to_lowercase();
        match COSTS.iter()
          .find(|&&(family, _, _)| model_lower.contains(family))
        {   Some(&(_, input_rate, output_rate)) => {
              (input_tokens as f64 / 1_000_000.0) * input_rate
                + (output_tokens as f64 / 1_000_000.0) * output_rate
            }
          , None => {
              warn!("Unknown model for cost calculation: {}", model);
              0.0
            }
        }
    }

    async fn complete(
      &self
    , request: &CompletionRequest
    ) -> Result<CompletionResponse, Error>
    {   let model = request.model
          .clone()
          .unwrap_or_else(|| self.default_model.clone());

        debug!(
          "Starting OpenAI completion: model={} messages={}",
          model,
          request.messages.len()
        );

        let mut last_error
          = Error::Other("no attempts made".to_string());

        for attempt in 1..=self.retry.max_retries
        {   info!(
              "OpenAI API call attempt {}/{}",
              attempt, self.retry.max_retries
            );

            match self.try_complete(request, &model).await
            {   Ok(response) => {
                  return Ok(response);
                }
              , Err(e) if e.is_transient() => {
                  warn!(
                    "OpenAI transient failure (attempt {}): {}",
                    attempt, e
                  );
                  last_error = e;

                  if attempt < self.retry.max_retries
                  {   let wait
                        = self.retry.backoff_for_attempt(attempt);
                      info!("Retrying in {:?}...", wait);
                      tokio::time::sleep(wait).await;
                  }
                }
              , Err(e) => {
                  error!("OpenAI terminal failure: {}", e);
                  return Err(e);
                }
            }
        }

        Err(Error::RetriesExhausted
        {   attempts: self.retry.max_retries
          , last: last_error.to_string()
        })
    }
}

/// HTTP client with the configured per-request timeout
pub(crate) fn build_http_client(timeout_secs: u64) -> reqwest::Client
{   reqwest::Client::builder()
      .timeout(std::time::Duration::from_secs(timeout_secs))
      .build()
      .unwrap_or_else(|e| {
        warn!("HTTP client builder failed ({}), using defaults", e);
        reqwest::Client::new()
      })
}
