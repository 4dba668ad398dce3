//! Retry backoff and fallback-chain policy for provider calls

use std::time::Duration;
use log::debug;

/// Bounded exponential backoff policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy
{   pub max_retries: usize
  , pub backoff_min: Duration
  , pub backoff_max: Duration
}

impl RetryPolicy
{   /// Create a new retry policy
    pub fn new(
      max_retries: usize
    , backoff_min_ms: u64
    , backoff_max_ms: u64
    ) -> Self
    {   RetryPolicy
        {   max_retries
          , backoff_min: Duration::from_millis(backoff_min_ms)
          , backoff_max: Duration::from_millis(backoff_max_ms)
        }
    }

    /// Backoff before the retry that follows the given attempt
    ///
    /// Attempts are 1-based: min(backoff_min * 2^(attempt-1), backoff_max).
    pub fn backoff_for_attempt(
      &self
    , attempt: usize
    ) -> Duration
    {   debug!("Calculating backoff for attempt {}", attempt);
        let exponent = attempt.saturating_sub(1).min(32) as u32;
        let factor = 1u64 << exponent;
        let wait_ms = (self.backoff_min.as_millis() as u64)
          .saturating_mul(factor)
          .min(self.backoff_max.as_millis() as u64);
        Duration::from_millis(wait_ms)
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::new(3, 1_000, 30_000)
    }
}

/// One entry in the generation fallback chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStep
{   pub provider: crate::Provider
  , pub model: String
}

/// The fixed ordered provider/model sequence the generator exhausts
/// before declaring terminal failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackChain
{   steps: Vec<ChainStep>
}

impl FallbackChain
{   /// Primary entry repeated `primary_attempts` times, then exactly
    /// one fallback entry
    pub fn new(
      primary: ChainStep
    , primary_attempts: usize
    , fallback: ChainStep
    ) -> Self
    {   debug!(
          "Creating fallback chain: {} x{} then {}",
          primary.model, primary_attempts, fallback.model
        );
        let mut steps = vec![primary; primary_attempts];
        steps.push(fallback);
        FallbackChain { steps }
    }

    pub fn steps(&self) -> &[ChainStep]
    {   &self.steps
    }

    pub fn len(&self) -> usize
    {   self.steps.len()
    }

    pub fn is_empty(&self) -> bool
    {   self.steps.is_empty()
    }

    /// Whether the 0-based index addresses a primary entry
    pub fn is_primary(&self, index: usize) -> bool
    {   index + 1 < self.steps.len()
    }
}
