use std::fmt;

/// Custom error type for bloggen operations
/// Implements Clone for sending across task boundaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// API key is missing for a provider
    MissingApiKey(String)
  , /// HTTP transport error (connection refused, DNS, TLS)
    HttpError(String)
  , /// API returned a non-success response
    ApiError(String)
  , /// API returned HTTP 429
    RateLimited
  , /// Failed to parse an API response
    ParseError(String)
  , /// No choices in API response
    NoChoicesInResponse
  , /// Completion text was empty or whitespace-only
    EmptyCompletion
  , /// Request timed out
    Timeout
  , /// Retry budget exhausted for one adapter
    RetriesExhausted
    {   attempts: usize
      , last: String
    }
  , /// Every entry in the generation fallback chain failed
    PipelineFailed
    {   topic: String
    }
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Generic error
    Other(String)
}

impl Error
{   /// Whether a failure class is worth retrying locally
    ///
    /// Transient: rate limiting, transport failures, timeouts, and
    /// empty completions (not distinguishable from a transient fault
    /// for retry purposes). Everything else fails the call at once.
    pub fn is_transient(&self) -> bool
    {   matches!(
          self,
          Error::RateLimited
            | Error::HttpError(_)
            | Error::Timeout
            | Error::EmptyCompletion
            | Error::NoChoicesInResponse
        )
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey(provider) => {
              write!(f, "Missing API key for: {}", provider)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError(msg) => {
              write!(f, "API error: {}", msg)
            }
          , Error::RateLimited => {
              write!(f, "API rate limit exceeded")
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::NoChoicesInResponse => {
              write!(f, "API response contained no choices")
            }
          , Error::EmptyCompletion => {
              write!(f, "Completion was empty")
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::RetriesExhausted { attempts, last } => {
              write!(f,
                "Failed after {} attempts: {}",
                attempts, last
              )
            }
          , Error::PipelineFailed { topic } => {
              write!(f,
                "All model attempts failed for topic: {}",
                topic
              )
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}
