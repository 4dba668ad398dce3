//! Completion provider adapters

use std::future::Future;
use log::error;

pub mod openai;
pub mod anthropic;

// Re-export for convenience
pub use openai::OpenAiClient;
pub use anthropic::AnthropicClient;

use crate::error::Error;
use crate::request::{CompletionRequest, CompletionResponse};

/// Capability contract every provider adapter implements
///
/// Adapters are the only code aware of provider-specific parameter
/// names. They are stateless apart from their static cost tables and
/// safe to share across concurrent tasks.
pub trait CompletionClient
{   /// Which provider this adapter speaks for
    fn provider(&self) -> crate::Provider;

    /// Model used when the request does not name one
    fn default_model(&self) -> &str;

    /// Whether the model takes reasoning-style parameters
    ///
    /// Reasoning models carry their token budget under a different
    /// parameter name and reject temperature tuning; every adapter
    /// checks this before building call parameters.
    fn is_reasoning_model(&self, model: &str) -> bool;

    /// Estimated cost in USD for one call, from the static rate table
    fn calculate_cost(
      &self
    , model: &str
    , input_tokens: usize
    , output_tokens: usize
    ) -> f64;

    /// Turn one request into exactly one successful response, or
    /// fail once the retry budget is exhausted
    fn complete(
      &self
    , request: &CompletionRequest
    ) -> impl Future<Output = Result<CompletionResponse, Error>> + Send;
}

/// Map a reqwest transport failure onto the error taxonomy
pub(crate) fn classify_transport_error(e: reqwest::Error) -> Error
{   if e.is_timeout()
    {   error!("Request timed out: {}", e);
        Error::Timeout
    } else
    {   error!("HTTP error: {}", e);
        Error::HttpError(e.to_string())
    }
}
