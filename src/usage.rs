//! Token usage and cost observability

use log::info;

/// Emit the per-completion usage event
///
/// One event per successful adapter call. Cost dashboards consume
/// these lines via the `usage` log target.
pub fn log_completion(
  model: &str
, input_tokens: usize
, output_tokens: usize
, cost: f64
, component: &str
)
{   let total_tokens = input_tokens + output_tokens;
    info!(
      target: "usage",
      "model={} tokens={} input={} output={} cost=${:.6} component={}",
      model,
      total_tokens,
      input_tokens,
      output_tokens,
      cost,
      component
    );
}
