//! Unified request and response types across completion providers

use serde::{Deserialize, Serialize};

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   System
  , User
  , Assistant
}

impl Role
{   /// Wire-format role name
    pub fn as_str(&self) -> &'static str
    {   match self
        {   Role::System => "system"
          , Role::User => "user"
          , Role::Assistant => "assistant"
        }
    }
}

/// Single conversation message, immutable once constructed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message
{   pub role: Role
  , pub content: String
}

impl Message
{   pub fn system(content: &str) -> Self
    {   Message
        {   role: Role::System
          , content: content.to_string()
        }
    }

    pub fn user(content: &str) -> Self
    {   Message
        {   role: Role::User
          , content: content.to_string()
        }
    }

    pub fn assistant(content: &str) -> Self
    {   Message
        {   role: Role::Assistant
          , content: content.to_string()
        }
    }
}

/// Unified completion request
///
/// Switching providers never requires touching application logic;
/// adapters translate this into provider-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest
{   /// Conversation messages, in order
    pub messages: Vec<Message>
  , /// Model override; the adapter default applies when None
    pub model: Option<String>
  , /// Completion token budget
    pub max_tokens: Option<usize>
  , /// Sampling temperature
    pub temperature: Option<f32>
  , /// Alternative carrier for the system instruction
    ///
    /// When a system-role message is also present and the provider
    /// supports only one system channel, the explicit message wins.
    pub system_prompt: Option<String>
}

/// Unified completion response
///
/// Produced exactly once per successful adapter call and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse
{   /// Generated text, non-empty
    pub content: String
  , /// Actual model used
    pub model: String
  , /// Input tokens consumed
    pub input_tokens: usize
  , /// Output tokens generated
    pub output_tokens: usize
  , /// Always input_tokens + output_tokens
    pub total_tokens: usize
  , /// Estimated cost in USD
    pub cost: f64
  , /// Provider that produced the completion
    pub provider: crate::Provider
  , /// Original response body for debugging
    pub raw_response: Option<serde_json::Value>
}
