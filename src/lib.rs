pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod retry;
pub mod usage;
pub mod extract;
pub mod generator;
pub mod validator;
pub mod fixer;
pub mod pipeline;
use serde::{Deserialize, Serialize};

/*

bloggen automates blog-article production by chaining calls to
AI completion providers behind one unified request syntax: refine
a raw keyword into a question-style title, generate long-form
content with an automatic fail-over to another provider when the
primary fails, score the result, and auto-repair deficiencies.

bloggen/
├── Cargo.toml          # Main manifest
├── src/
│   ├── lib.rs          # Re-exports and main documentation
│   ├── error.rs        # Custom error types and classification
│   ├── config.rs       # Settings for providers and retries
│   ├── request.rs      # Unified request/response types
│   ├── retry.rs        # Backoff policy and fallback chain
│   ├── usage.rs        # Token usage and cost events
│   ├── extract.rs      # JSON extraction from model output
│   ├── providers/      # Provider-specific adapters
│   │   ├── mod.rs      # Completion contract + re-exports
│   │   ├── openai.rs   # OpenAI adapter (primary)
│   │   └── anthropic.rs# Anthropic adapter (fallback)
│   ├── generator.rs    # Topic refinement + generation chain
│   ├── validator.rs    # Content quality scoring
│   ├── fixer.rs        # Report-driven content repair
│   └── pipeline.rs     # Process facade over all stages
└── tests/              # Integration and pipeline tests

*/

// ===== Re-exports =====

pub use config::Settings;
pub use error::Error;
pub use fixer::{FixMetadata, FixResult};
pub use pipeline::Pipeline;
pub use providers::{AnthropicClient, CompletionClient, OpenAiClient};
pub use request::{CompletionRequest, CompletionResponse, Message, Role};
pub use validator::{DimensionScores, ValidationIssue, ValidationReport};

/// Enum representing the supported completion providers
///
/// The provider set is fixed and small; adding one is a code change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Hash)]
pub enum Provider
{   /// OpenAI (GPT-4o family, o1/o3/gpt-5 reasoning models)
    OpenAI
  , /// Anthropic (Claude models)
    Anthropic
}

impl Provider
{   /// Stable identifier used in responses and log events
    pub fn as_str(&self) -> &'static str
    {   match self
        {   Provider::OpenAI => "openai"
          , Provider::Anthropic => "anthropic"
        }
    }
}
