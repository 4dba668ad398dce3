//! Configuration for providers, retries, and generation defaults

use serde::{Deserialize, Serialize};

/// Process-wide settings, read once at startup and immutable after
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings
{   /// OpenAI API key
    pub openai_api_key: Option<String>
  , /// Anthropic API key
    pub anthropic_api_key: Option<String>
  , /// Primary model for refinement, generation, and validation
    pub model_primary: String
  , /// Fallback model tried once after the primary chain is spent
    pub model_fallback: String
  , /// Max attempts per adapter call and per generation chain
    pub max_retries: usize
  , /// Initial backoff duration in milliseconds
    pub backoff_min_ms: u64
  , /// Backoff ceiling in milliseconds
    pub backoff_max_ms: u64
  , /// Default completion token budget
    pub default_max_tokens: usize
  , /// Default sampling temperature
    pub default_temperature: f32
  , /// Per-request HTTP timeout in seconds
    pub timeout_secs: u64
}

impl Default for Settings
{   fn default() -> Self
    {   Settings
        {   openai_api_key: None
          , anthropic_api_key: None
          , model_primary: "gpt-5".to_string()
          , model_fallback: "claude-3-5-sonnet-20241022".to_string()
          , max_retries: 3
          , backoff_min_ms: 1_000
          , backoff_max_ms: 30_000
          , default_max_tokens: 4096
          , default_temperature: 0.7
          , timeout_secs: 120
        }
    }
}

impl Settings
{   /// Load settings from the process environment
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self
    {   let defaults = Settings::default();
        Settings
        {   openai_api_key: std::env::var("OPENAI_API_KEY").ok()
          , anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok()
          , model_primary: std::env::var("MODEL_PRIMARY")
              .unwrap_or(defaults.model_primary)
          , model_fallback: std::env::var("MODEL_FALLBACK")
              .unwrap_or(defaults.model_fallback)
          , max_retries: env_parse("MAX_RETRIES", defaults.max_retries)
          , backoff_min_ms: env_parse("BACKOFF_MIN_MS", defaults.backoff_min_ms)
          , backoff_max_ms: env_parse("BACKOFF_MAX_MS", defaults.backoff_max_ms)
          , default_max_tokens: env_parse(
              "DEFAULT_MAX_TOKENS",
              defaults.default_max_tokens
            )
          , default_temperature: env_parse(
              "DEFAULT_TEMPERATURE",
              defaults.default_temperature
            )
          , timeout_secs: env_parse("TIMEOUT_SECS", defaults.timeout_secs)
        }
    }

    /// Backoff policy shared by the adapters and the generation chain
    pub fn retry_policy(&self) -> crate::retry::RetryPolicy
    {   crate::retry::RetryPolicy::new(
          self.max_retries,
          self.backoff_min_ms,
          self.backoff_max_ms
        )
    }
}

/// Parse an environment variable, falling back to a default
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T
{   std::env::var(name)
      .ok()
      .and_then(|v| v.parse().ok())
      .unwrap_or(default)
}
