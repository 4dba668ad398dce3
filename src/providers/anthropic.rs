use serde::{Deserialize, Serialize};
use log::{debug, trace, error, warn, info};

use crate::error::Error;
use crate::providers::CompletionClient;
use crate::request::{CompletionRequest, CompletionResponse, Role};

const ANTHROPIC_API_BASE: &str
  = "https://api.anthropic.com/v1";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Cost per 1M tokens in USD (input, output); the first entry is
/// also the fallback tier for unknown models
const COSTS: &[(&str, f64, f64)] = &[
    ("claude-3-5-sonnet", 3.00, 15.00)
  , ("claude-3-opus", 15.00, 75.00)
  , ("claude-3-sonnet", 3.00, 15.00)
  , ("claude-3-haiku", 0.25, 1.25)
];

// ===== Wire Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage
{   pub role: String
  , pub content: String
}

#[derive(Debug, Clone, Serialize)]
pub struct AnthropicChatRequest
{   pub model: String
  , pub max_tokens: usize
  , pub messages: Vec<WireMessage>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicChatResponse
{   pub content: Vec<ContentBlock>
  , #[serde(default)]
    pub usage: Option<AnthropicUsage>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock
{   #[serde(rename = "type", default)]
    pub kind: String
  , #[serde(default)]
    pub text: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicUsage
{   #[serde(default)]
    pub input_tokens: usize
  , #[serde(default)]
    pub output_tokens: usize
}

// ===== Anthropic Adapter =====

/// Anthropic adapter: the fallback provider
#[derive(Debug, Clone)]
pub struct AnthropicClient
{   api_key: Option<String>
  , default_model: String
  , default_max_tokens: usize
  , default_temperature: f32
  , retry: crate::retry::RetryPolicy
  , component: String
  , http_client: reqwest::Client
}

impl AnthropicClient
{   /// Build the adapter once at startup from immutable settings
    pub fn new(cfg: &crate::config::Settings) -> Self
    {   debug!("Creating AnthropicClient");
        AnthropicClient
        {   api_key: cfg.anthropic_api_key.clone()
          , default_model: cfg.model_fallback.clone()
          , default_max_tokens: cfg.default_max_tokens
          , default_temperature: cfg.default_temperature
          , retry: cfg.retry_policy()
          , component: "ai_client.anthropic".to_string()
          , http_client: crate::providers::openai::build_http_client(
              cfg.timeout_secs
            )
        }
    }

    /// Assemble wire parameters for one request
    ///
    /// Anthropic carries the system instruction on a separate
    /// top-level channel; an explicit system-role message wins over
    /// request.system_prompt when both are present.
    pub fn build_request(
      &self
    , request: &CompletionRequest
    , model: &str
    ) -> AnthropicChatRequest
    {   let mut system = request.system_prompt.clone();
        let mut messages = Vec::new();

        for msg in &request.messages
        {   if msg.role == Role::System
            {   system = Some(msg.content.clone());
            } else
            {   messages.push(WireMessage
                {   role: msg.role.as_str().to_string()
                  , content: msg.content.clone()
                });
            }
        }

        AnthropicChatRequest
        {   model: model.to_string()
          , max_tokens: request.max_tokens
              .unwrap_or(self.default_max_tokens)
          , messages
          , system
          , temperature: Some(
              request.temperature
                .unwrap_or(self.default_temperature)
            )
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
            error!("No Anthropic API key configured");
            Error::MissingApiKey("anthropic".to_string())
          })?;

        let wire = self.build_request(request, model);
        trace!("Anthropic request: {:?}", wire);

        let response = self.http_client
          .post(format!("{}/messages", ANTHROPIC_API_BASE))
          .header("x-api-key", api_key.as_str())
          .header("anthropic-version", ANTHROPIC_VERSION)
          .header("Content-Type", "application/json")
          .json(&wire)
          .send()
          .await
          .map_err(crate::providers::classify_transport_error)?;

        let status = response.status();
        trace!("Anthropic response status: {}", status);

        if status.as_u16() == 429
        {   warn!("Anthropic rate limit hit");
            return Err(Error::RateLimited);
        }

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("Anthropic API error: {}", error_text);
            return Err(Error::ApiError(
              format!("Anthropic {}: {}", status, error_text)
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

        let chat: AnthropicChatResponse
          = serde_json::from_value(raw.clone()).map_err(|e| {
              error!("Parse error: {}", e);
              Error::ParseError(e.to_string())
            })?;

        // Concatenate the text blocks
        let mut content = String::new();
        for block in &chat.content
        {   if let Some(text) = &block.text
            {   content.push_str(text);
            }
        }

        if content.trim().is_empty()
        {   warn!("Empty completion from Anthropic model: {}", model);
            return Err(Error::EmptyCompletion);
        }

        let (input_tokens, output_tokens) = match &chat.usage
        {   Some(usage) => (usage.input_tokens, usage.output_tokens)
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
          "Anthropic completion successful: model={} tokens={} cost=${:.6}",
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
          , provider: crate::Provider::Anthropic
          , raw_response: Some(raw)
        })
    }
}

impl CompletionClient for AnthropicClient
{   fn provider(&self) -> crate::Provider
    {   crate::Provider::Anthropic
    }

    fn default_model(&self) -> &str
    {   &self.default_model
    }

    /// Claude models have no separate reasoning parameter mode
    fn is_reasoning_model(&self, _model: &str) -> bool
    {   false
    }

    fn calculate_cost(
      &self
    , model: &str
    , input_tokens: usize
    , output_tokens: usize
    ) -> f64
    {   let model_lower = model.to_lowercase();
        let rates = COSTS.iter()
          .find(|&&(family, _, _)| model_lower.contains(family))
          .or_else(|| {
            warn!(
              "Unknown model for cost calculation: {}, using {} pricing",
              model, COSTS[0].0
            );
            COSTS.first()
          });

        match rates
        {   Some(&(_, input_rate, output_rate)) => {
              (input_tokens as f64 / 1_000_000.0) * input_rate
                + (output_tokens as f64 / 1_000_000.0) * output_rate
            }
          , None => 0.0
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
          "Starting Anthropic completion: model={} messages={}",
          model,
          request.messages.len()
        );

        let mut last_error
          = Error::Other("no attempts made".to_string());

        for attempt in 1..=self.retry.max_retries
        {   info!(
              "Anthropic API call attempt {}/{}",
              attempt, self.retry.max_retries
            );

            match self.try_complete(request, &model).await
            {   Ok(response) => {
                  return Ok(response);
                }
              , Err(e) if e.is_transient() => {
                  warn!(
                    "Anthropic transient failure (attempt {}): {}",
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
                  error!("Anthropic terminal failure: {}", e);
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
