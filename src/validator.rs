//! Quality validation: one scoring call, robust JSON extraction,
//! and degraded reports on every failure path

use serde::{Deserialize, Serialize};
use log::{info, error};

use crate::providers::CompletionClient;
use crate::request::{CompletionRequest, Message};

/// Evaluation instruction for the scoring call
pub const VALIDATOR_PROMPT: &str = r#"You are an expert content quality analyst specializing in SEO, AEO (Answer Engine Optimization), and AI-written content detection.

Your task is to evaluate blog articles and provide a detailed quality assessment.

Analyze the content for:
1. **Grammar & Readability** (grammar_score: 0-10)
   - Spelling, punctuation, sentence structure
   - Flow and readability

2. **Human-like Quality** (human_score: 0-10)
   - Does it sound natural or robotic?
   - Does it have AI telltale signs (repetitive phrases, generic conclusions, excessive formal tone)?
   - Higher score = more human-like

3. **SEO/AEO Quality** (seo_score: 0-10)
   - Keyword optimization
   - Header structure (H1, H2, H3)
   - Meta information
   - Answer Engine Optimization for featured snippets

4. **FAQ Section** (has_faq: true/false)
   - Does the article include an FAQ section?

5. **Suggestions** (list of objects with type and message)
   - Specific, actionable improvements in Korean
   - Each suggestion must have a "type" (category) and "message" (description)
   - Types: intro_missing, faq_missing, ai_tone, keyword_density_low, repetitive_phrases, etc.

**IMPORTANT**: You must respond ONLY with valid JSON in this exact format:
```json
{
  "grammar_score": 8,
  "human_score": 7,
  "seo_score": 9,
  "has_faq": true,
  "suggestions": [
    {"type": "intro_improvement", "message": "서론을 더 자연스럽게 작성하세요."},
    {"type": "ai_tone", "message": "AI 특유의 반복적인 표현을 줄이세요."},
    {"type": "seo_meta", "message": "메타 설명을 추가하세요."}
  ]
}
```

Do NOT include any explanation outside the JSON structure."#;

/// Keys the scoring reply must carry to count as parsed
const REQUIRED_KEYS: &[&str] = &[
    "grammar_score"
  , "human_score"
  , "seo_score"
  , "has_faq"
  , "suggestions"
];

/// Token budget and temperature for the scoring call
const VALIDATE_MAX_TOKENS: usize = 800;
const VALIDATE_TEMPERATURE: f32 = 0.3;

// ===== Report Types =====

/// Per-dimension quality scores, each in 0..=10
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScores
{   pub grammar: u8
  , pub human: u8
  , pub seo: u8
}

/// One issue the validator flagged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue
{   #[serde(rename = "type")]
    pub kind: String
  , pub message: String
}

/// Structured quality report
///
/// The legacy flat view (grammar_score() and friends) is derived
/// from the same fields, so the two views cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport
{   pub scores: DimensionScores
  , pub has_faq: bool
  , pub issues: Vec<ValidationIssue>
  , /// Unparsed model text, kept on failure paths for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>
}

impl ValidationReport
{   /// Zeroed report with a single synthetic issue
    pub fn degraded(
      kind: &str
    , message: &str
    , raw_output: Option<String>
    ) -> Self
    {   ValidationReport
        {   scores: DimensionScores::default()
          , has_faq: false
          , issues: vec![
              ValidationIssue
              {   kind: kind.to_string()
                , message: message.to_string()
              }
            ]
          , raw_output
        }
    }

    // ===== Legacy flat view =====

    pub fn grammar_score(&self) -> u8
    {   self.scores.grammar
    }

    pub fn human_score(&self) -> u8
    {   self.scores.human
    }

    pub fn seo_score(&self) -> u8
    {   self.scores.seo
    }

    /// Issue messages only, in order
    pub fn suggestions(&self) -> Vec<String>
    {   self.issues.iter()
          .map(|issue| issue.message.clone())
          .collect()
    }
}

// ===== Parsing =====

/// Clamp a JSON score value into 0..=10
fn clamp_score(value: &serde_json::Value) -> u8
{   value.as_i64().unwrap_or(0).clamp(0, 10) as u8
}

/// Parse the model's free-form reply into a report
///
/// Never fails: a missing object, missing required keys, or
/// malformed JSON all degrade to a zeroed report carrying one
/// parse_error issue and the raw text.
pub fn parse_report(raw: &str) -> ValidationReport
{   let object = match crate::extract::first_json_object(raw)
    {   Some(object) => object
      , None => {
          error!("No JSON object in validator response");
          return ValidationReport::degraded(
            "parse_error",
            "응답 파싱 실패",
            Some(raw.to_string())
          );
        }
    };

    let value: serde_json::Value = match serde_json::from_str(object)
    {   Ok(value) => value
      , Err(e) => {
          error!("Validator JSON parse failed: {}", e);
          return ValidationReport::degraded(
            "parse_error",
            "JSON 파싱 실패",
            Some(raw.to_string())
          );
        }
    };

    let missing: Vec<&str> = REQUIRED_KEYS.iter()
      .filter(|key| value.get(**key).is_none())
      .copied()
      .collect();

    if !missing.is_empty()
    {   error!("Validator response missing keys: {:?}", missing);
        return ValidationReport::degraded(
          "parse_error",
          "응답 구조 오류",
          Some(raw.to_string())
        );
    }

    let scores = DimensionScores
    {   grammar: clamp_score(&value["grammar_score"])
      , human: clamp_score(&value["human_score"])
      , seo: clamp_score(&value["seo_score"])
    };

    let has_faq = value["has_faq"].as_bool().unwrap_or(false);

    // Suggestions arrive as {type, message} objects, or as bare
    // strings in the legacy shape
    let issues = value["suggestions"].as_array()
      .map(|items| {
        items.iter()
          .map(|item| {
            if let Some(object) = item.as_object()
            {   ValidationIssue
                {   kind: object.get("type")
                      .and_then(|v| v.as_str())
                      .unwrap_or("general")
                      .to_string()
                  , message: object.get("message")
                      .and_then(|v| v.as_str())
                      .unwrap_or_default()
                      .to_string()
                }
            } else
            {   ValidationIssue
                {   kind: "general".to_string()
                  , message: item.as_str()
                      .unwrap_or_default()
                      .to_string()
                }
            }
          })
          .collect()
      })
      .unwrap_or_default();

    ValidationReport
    {   scores
      , has_faq
      , issues
      , raw_output: None
    }
}

// ===== Validation =====

/// Score `content` via one adapter call
///
/// Never errors: adapter failure and unparsable output both produce
/// a usable degraded report. The adapter's retry loop covers empty
/// responses before this degrades.
pub async fn validate_content<C>(
  client: &C
, content: &str
, model: Option<&str>
) -> ValidationReport
where C: CompletionClient
{   info!(
      "Starting content validation: content_length={} model={:?}",
      content.len(),
      model
    );

    let request = CompletionRequest
    {   messages: vec![
          Message::system(VALIDATOR_PROMPT)
        , Message::user(&format!(
            "다음 블로그 글을 평가해주세요:\n\n{}",
            content
          ))
        ]
      , model: model.map(|m| m.to_string())
      , max_tokens: Some(VALIDATE_MAX_TOKENS)
      , temperature: Some(VALIDATE_TEMPERATURE)
      , system_prompt: None
    };

    let response = match client.complete(&request).await
    {   Ok(response) => response
      , Err(e) => {
          error!("Validation call failed: {}", e);
          return ValidationReport::degraded(
            "validation_error",
            "검증 중 오류가 발생했습니다.",
            None
          );
        }
    };

    let report = parse_report(&response.content);
    info!(
      "Validation completed: grammar={} human={} seo={} has_faq={} issues={}",
      report.scores.grammar,
      report.scores.human,
      report.scores.seo,
      report.has_faq,
      report.issues.len()
    );
    report
}
