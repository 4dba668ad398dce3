//! Process-level facade: adapters constructed once at startup,
//! pipeline stages exposed to the routing layer

use log::debug;

use crate::config::Settings;
use crate::error::Error;
use crate::fixer::{FixMetadata, FixResult};
use crate::providers::{AnthropicClient, OpenAiClient};
use crate::validator::ValidationReport;

/// Owns the provider adapters and wires the pipeline stages
///
/// One instance per process. The adapters are stateless apart from
/// their static cost tables, so a shared reference serves any number
/// of concurrent pipeline runs.
pub struct Pipeline
{   settings: Settings
  , primary: OpenAiClient
  , fallback: AnthropicClient
}

impl Pipeline
{   /// Build both adapters once from immutable settings
    pub fn new(settings: Settings) -> Self
    {   debug!("Initializing pipeline");
        let primary = OpenAiClient::new(&settings);
        let fallback = AnthropicClient::new(&settings);
        Pipeline
        {   settings
          , primary
          , fallback
        }
    }

    pub fn settings(&self) -> &Settings
    {   &self.settings
    }

    /// Refine a raw keyword into a question-style title
    ///
    /// Falls back to the input on provider failure.
    pub async fn refine(&self, topic: &str) -> String
    {   crate::generator::refine_topic(&self.primary, topic).await
    }

    /// Generate blog content for a topic
    ///
    /// The only hard-failing stage: errors once the whole fallback
    /// chain is exhausted.
    pub async fn generate(&self, topic: &str)
      -> Result<String, Error>
    {   crate::generator::generate_content(
          &self.primary,
          &self.fallback,
          &self.settings,
          topic
        ).await
    }

    /// Score content quality into a structured report
    pub async fn validate(
      &self
    , content: &str
    , model: Option<&str>
    ) -> ValidationReport
    {   crate::validator::validate_content(
          &self.primary,
          content,
          model
        ).await
    }

    /// Repair content according to a validation report
    pub async fn fix(
      &self
    , content: &str
    , report: &ValidationReport
    , metadata: Option<&FixMetadata>
    ) -> FixResult
    {   crate::fixer::fix_content(
          &self.primary,
          content,
          report,
          metadata
        ).await
    }
}
