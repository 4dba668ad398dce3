//! Offline pipeline tests driven by substitute adapters

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use bloggen::fixer;
use bloggen::generator;
use bloggen::validator;
use bloggen::{
    CompletionClient, CompletionRequest, CompletionResponse,
    DimensionScores, Error, Message, Provider, Settings,
    ValidationIssue, ValidationReport,
};

// ===== Substitute adapter =====

/// Scripted adapter: pops one reply per complete() call
struct MockClient
{   replies: Mutex<VecDeque<Result<String, Error>>>
  , calls: Mutex<usize>
}

impl MockClient
{   fn new(replies: Vec<Result<String, Error>>) -> Self
    {   MockClient
        {   replies: Mutex::new(replies.into_iter().collect())
          , calls: Mutex::new(0)
        }
    }

    fn call_count(&self) -> usize
    {   *self.calls.lock().unwrap()
    }
}

impl CompletionClient for MockClient
{   fn provider(&self) -> Provider
    {   Provider::OpenAI
    }

    fn default_model(&self) -> &str
    {   "mock-model"
    }

    fn is_reasoning_model(&self, model: &str) -> bool
    {   model.to_lowercase().contains("o1-")
    }

    fn calculate_cost(
      &self
    , _model: &str
    , _input_tokens: usize
    , _output_tokens: usize
    ) -> f64
    {   0.0
    }

    async fn complete(
      &self
    , _request: &CompletionRequest
    ) -> Result<CompletionResponse, Error>
    {   *self.calls.lock().unwrap() += 1;
        let next = self.replies.lock().unwrap().pop_front();
        match next
        {   Some(Ok(text)) => {
              Ok(CompletionResponse
              {   content: text
                , model: "mock-model".to_string()
                , input_tokens: 10
                , output_tokens: 20
                , total_tokens: 30
                , cost: 0.0
                , provider: Provider::OpenAI
                , raw_response: None
              })
            }
          , Some(Err(e)) => Err(e)
          , None => Err(Error::Other(
              "mock replies exhausted".to_string()
            ))
        }
    }
}

/// Settings with near-zero backoff so chain walks stay fast
fn test_settings() -> Settings
{   Settings
    {   max_retries: 3
      , backoff_min_ms: 1
      , backoff_max_ms: 4
      , ..Settings::default()
    }
}

fn report_with(
  grammar: u8
, human: u8
, seo: u8
, has_faq: bool
, issues: Vec<ValidationIssue>
) -> ValidationReport
{   ValidationReport
    {   scores: DimensionScores { grammar, human, seo }
      , has_faq
      , issues
      , raw_output: None
    }
}

// ===== Backoff policy =====

#[test]
fn test_backoff_formula()
{   let policy = bloggen::retry::RetryPolicy::new(3, 1_000, 30_000);
    assert_eq!(
      policy.backoff_for_attempt(1),
      Duration::from_millis(1_000)
    );
    assert_eq!(
      policy.backoff_for_attempt(2),
      Duration::from_millis(2_000)
    );
    assert_eq!(
      policy.backoff_for_attempt(3),
      Duration::from_millis(4_000)
    );
}

#[test]
fn test_backoff_respects_ceiling()
{   let policy = bloggen::retry::RetryPolicy::new(3, 1_000, 30_000);
    // 1000 * 2^5 = 32000, capped at 30000
    assert_eq!(
      policy.backoff_for_attempt(6),
      Duration::from_millis(30_000)
    );
    assert_eq!(
      policy.backoff_for_attempt(40),
      Duration::from_millis(30_000)
    );
}

// ===== Reasoning branch =====

#[test]
fn test_reasoning_model_detection()
{   let client = bloggen::OpenAiClient::new(&Settings::default());
    assert!(client.is_reasoning_model("o1-preview"));
    assert!(client.is_reasoning_model("o3-mini"));
    assert!(client.is_reasoning_model("gpt-5"));
    assert!(client.is_reasoning_model("GPT-5-Turbo"));
    assert!(!client.is_reasoning_model("gpt-4o"));
    assert!(!client.is_reasoning_model("gpt-4o-mini"));
}

#[test]
fn test_reasoning_request_never_sets_temperature()
{   let client = bloggen::OpenAiClient::new(&Settings::default());
    let request = CompletionRequest
    {   messages: vec![Message::user("안녕하세요")]
      , model: None
      , max_tokens: Some(1_000)
      , temperature: Some(0.9)
      , system_prompt: None
    };

    let wire = client.build_request(&request, "o1-mini");
    assert!(wire.temperature.is_none());
    assert!(wire.max_tokens.is_none());
    assert_eq!(wire.max_completion_tokens, Some(1_000));
}

#[test]
fn test_standard_request_keeps_temperature()
{   let client = bloggen::OpenAiClient::new(&Settings::default());
    let request = CompletionRequest
    {   messages: vec![Message::user("안녕하세요")]
      , model: None
      , max_tokens: Some(1_000)
      , temperature: Some(0.9)
      , system_prompt: None
    };

    let wire = client.build_request(&request, "gpt-4o");
    assert_eq!(wire.temperature, Some(0.9));
    assert_eq!(wire.max_tokens, Some(1_000));
    assert!(wire.max_completion_tokens.is_none());
}

#[test]
fn test_openai_system_prompt_prepended()
{   let client = bloggen::OpenAiClient::new(&Settings::default());
    let request = CompletionRequest
    {   messages: vec![Message::user("질문입니다")]
      , model: None
      , max_tokens: None
      , temperature: None
      , system_prompt: Some("시스템 지시".to_string())
    };

    let wire = client.build_request(&request, "gpt-4o");
    assert_eq!(wire.messages.len(), 2);
    assert_eq!(wire.messages[0].role, "system");
    assert_eq!(wire.messages[0].content, "시스템 지시");
    assert_eq!(wire.messages[1].role, "user");
}

#[test]
fn test_anthropic_explicit_system_message_wins()
{   let client = bloggen::AnthropicClient::new(&Settings::default());
    let request = CompletionRequest
    {   messages: vec![
          Message::system("명시적 시스템 메시지")
        , Message::user("질문입니다")
        ]
      , model: None
      , max_tokens: None
      , temperature: None
      , system_prompt: Some("필드로 전달된 지시".to_string())
    };

    let wire = client.build_request(&request, "claude-3-haiku");
    assert_eq!(wire.system.as_deref(), Some("명시적 시스템 메시지"));
    assert_eq!(wire.messages.len(), 1);
    assert_eq!(wire.messages[0].role, "user");
}

// ===== Cost tables =====

#[test]
fn test_openai_cost_table()
{   let client = bloggen::OpenAiClient::new(&Settings::default());

    let cost = client.calculate_cost("gpt-4o-mini", 1_000_000, 1_000_000);
    assert!((cost - 0.75).abs() < 1e-9);

    // substring match is case-insensitive
    let cost = client.calculate_cost("GPT-4o-Mini-2024", 1_000_000, 0);
    assert!((cost - 0.15).abs() < 1e-9);

    // unknown models cost nothing rather than guessing a tier
    assert_eq!(client.calculate_cost("mystery-model", 1_000_000, 0), 0.0);

    assert!(client.calculate_cost("gpt-4o", 0, 0) >= 0.0);
}

#[test]
fn test_anthropic_unknown_model_uses_default_tier()
{   let client = bloggen::AnthropicClient::new(&Settings::default());

    let known = client.calculate_cost("claude-3-haiku", 1_000_000, 0);
    assert!((known - 0.25).abs() < 1e-9);

    // unmatched models fall back to the claude-3-5-sonnet tier
    let unknown = client.calculate_cost("claude-9-ultra", 1_000_000, 0);
    assert!((unknown - 3.00).abs() < 1e-9);
}

// ===== JSON extraction =====

#[test]
fn test_extract_plain_object()
{   assert_eq!(
      bloggen::extract::first_json_object(r#"{"a": 1}"#),
      Some(r#"{"a": 1}"#)
    );
}

#[test]
fn test_extract_object_wrapped_in_prose()
{   let text = r#"평가 결과는 다음과 같습니다: {"a": 1} 참고하세요."#;
    assert_eq!(
      bloggen::extract::first_json_object(text),
      Some(r#"{"a": 1}"#)
    );
}

#[test]
fn test_extract_object_in_code_fence()
{   let text = "```json\n{\"grammar_score\": 8}\n```";
    assert_eq!(
      bloggen::extract::first_json_object(text),
      Some(r#"{"grammar_score": 8}"#)
    );
}

#[test]
fn test_extract_nested_object()
{   let text = r#"{"a": {"b": {"c": 3}}, "d": 4}"#;
    assert_eq!(
      bloggen::extract::first_json_object(text),
      Some(text)
    );
}

#[test]
fn test_extract_braces_inside_strings()
{   let text = r#"{"a": "}{", "b": 2}"#;
    assert_eq!(
      bloggen::extract::first_json_object(text),
      Some(text)
    );
}

#[test]
fn test_extract_escaped_quotes()
{   let text = r#"{"a": "say \"hi\" {ok}"}"#;
    assert_eq!(
      bloggen::extract::first_json_object(text),
      Some(text)
    );
}

#[test]
fn test_extract_no_object()
{   assert_eq!(bloggen::extract::first_json_object("no json here"), None);
    assert_eq!(bloggen::extract::first_json_object(""), None);
}

#[test]
fn test_extract_unbalanced_object()
{   assert_eq!(
      bloggen::extract::first_json_object(r#"{"a": 1"#),
      None
    );
}

#[test]
fn test_extract_skips_unbalanced_prefix()
{   let text = r#"{ oops {"a": 1}"#;
    assert_eq!(
      bloggen::extract::first_json_object(text),
      Some(r#"{"a": 1}"#)
    );
}

#[test]
fn test_extract_unterminated_string()
{   assert_eq!(
      bloggen::extract::first_json_object(r#"{"a": "never ends"#),
      None
    );
}

// ===== Report parsing =====

const VALID_REPLY: &str = r#"```json
{
  "grammar_score": 8,
  "human_score": 7,
  "seo_score": 9,
  "has_faq": true,
  "suggestions": [
    {"type": "ai_tone", "message": "AI 특유의 반복적인 표현을 줄이세요."},
    {"type": "seo_meta", "message": "메타 설명을 추가하세요."}
  ]
}
```"#;

#[test]
fn test_parse_report_full()
{   let report = validator::parse_report(VALID_REPLY);
    assert_eq!(report.scores.grammar, 8);
    assert_eq!(report.scores.human, 7);
    assert_eq!(report.scores.seo, 9);
    assert!(report.has_faq);
    assert_eq!(report.issues.len(), 2);
    assert_eq!(report.issues[0].kind, "ai_tone");
    assert!(report.raw_output.is_none());
}

#[test]
fn test_legacy_view_matches_structured_view()
{   let report = validator::parse_report(VALID_REPLY);
    assert_eq!(report.grammar_score(), report.scores.grammar);
    assert_eq!(report.human_score(), report.scores.human);
    assert_eq!(report.seo_score(), report.scores.seo);

    let suggestions = report.suggestions();
    assert_eq!(suggestions.len(), report.issues.len());
    for (suggestion, issue) in suggestions.iter().zip(&report.issues)
    {   assert_eq!(suggestion, &issue.message);
    }
}

#[test]
fn test_parse_report_accepts_bare_string_suggestions()
{   let reply = r#"{
      "grammar_score": 6,
      "human_score": 6,
      "seo_score": 6,
      "has_faq": false,
      "suggestions": ["FAQ 섹션이 없습니다."]
    }"#;
    let report = validator::parse_report(reply);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].kind, "general");
    assert_eq!(report.issues[0].message, "FAQ 섹션이 없습니다.");
}

#[test]
fn test_parse_report_missing_keys_degrades()
{   let reply = r#"{"grammar_score": 8, "human_score": 7}"#;
    let report = validator::parse_report(reply);
    assert_eq!(report.scores, DimensionScores::default());
    assert!(!report.has_faq);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].kind, "parse_error");
    assert!(report.raw_output.is_some());
}

#[test]
fn test_parse_report_no_json_degrades()
{   let report = validator::parse_report("점수를 매길 수 없습니다.");
    assert_eq!(report.scores, DimensionScores::default());
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].kind, "parse_error");
}

#[test]
fn test_parse_report_clamps_scores()
{   let reply = r#"{
      "grammar_score": 15,
      "human_score": -3,
      "seo_score": 10,
      "has_faq": false,
      "suggestions": []
    }"#;
    let report = validator::parse_report(reply);
    assert_eq!(report.scores.grammar, 10);
    assert_eq!(report.scores.human, 0);
    assert_eq!(report.scores.seo, 10);
}

#[tokio::test]
async fn test_validate_degrades_without_json()
{   let client = MockClient::new(vec![
      Ok("이 글은 평가할 수 없습니다.".to_string())
    ]);
    let report
      = validator::validate_content(&client, "본문 내용", None).await;
    assert_eq!(report.scores.grammar, 0);
    assert_eq!(report.scores.human, 0);
    assert_eq!(report.scores.seo, 0);
    assert!(!report.has_faq);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].kind, "parse_error");
}

#[tokio::test]
async fn test_validate_degrades_on_adapter_failure()
{   let client = MockClient::new(vec![
      Err(Error::RetriesExhausted
      {   attempts: 3
        , last: "API rate limit exceeded".to_string()
      })
    ]);
    let report
      = validator::validate_content(&client, "본문 내용", None).await;
    assert_eq!(report.scores, DimensionScores::default());
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].kind, "validation_error");
}

// ===== Topic refinement =====

#[tokio::test]
async fn test_refine_returns_question_title()
{   let client = MockClient::new(vec![
      Ok("겨울철 싱크대 냄새는 왜 생길까?".to_string())
    ]);
    let title
      = generator::refine_topic(&client, "겨울철 싱크대 냄새").await;
    assert!(title.ends_with('?'));
    assert_ne!(title, "겨울철 싱크대 냄새");
}

#[tokio::test]
async fn test_refine_falls_back_on_failure()
{   let client = MockClient::new(vec![Err(Error::Timeout)]);
    let title
      = generator::refine_topic(&client, "겨울철 싱크대 냄새").await;
    assert_eq!(title, "겨울철 싱크대 냄새");
}

#[tokio::test]
async fn test_refine_keeps_original_when_echoed()
{   let client = MockClient::new(vec![
      Ok("겨울철 싱크대 냄새".to_string())
    ]);
    let title
      = generator::refine_topic(&client, "겨울철 싱크대 냄새").await;
    assert_eq!(title, "겨울철 싱크대 냄새");
}

#[tokio::test]
async fn test_refine_strips_quotes()
{   let client = MockClient::new(vec![
      Ok("\"겨울철 싱크대 냄새는 왜 생길까?\"".to_string())
    ]);
    let title
      = generator::refine_topic(&client, "겨울철 싱크대 냄새").await;
    assert_eq!(title, "겨울철 싱크대 냄새는 왜 생길까?");
}

// ===== Generation chain =====

#[tokio::test]
async fn test_generate_total_failure_names_topic()
{   let cfg = test_settings();
    // one refinement call, then three primary chain entries
    let primary = MockClient::new(vec![
        Err(Error::RateLimited)
      , Err(Error::RateLimited)
      , Err(Error::RateLimited)
      , Err(Error::RateLimited)
    ]);
    let fallback = MockClient::new(vec![Err(Error::RateLimited)]);

    let result = generator::generate_content(
      &primary, &fallback, &cfg, "겨울철 싱크대 냄새"
    ).await;

    match result
    {   Err(Error::PipelineFailed { topic }) => {
          assert_eq!(topic, "겨울철 싱크대 냄새");
        }
      , other => panic!("expected PipelineFailed, got {:?}", other)
    }

    assert_eq!(primary.call_count(), 4);
    assert_eq!(fallback.call_count(), 1);
}

#[tokio::test]
async fn test_generate_treats_empty_content_as_failure()
{   let cfg = test_settings();
    let primary = MockClient::new(vec![
        Err(Error::Timeout)   // refinement
      , Ok("".to_string())
      , Ok("   ".to_string())
      , Ok("\n".to_string())
    ]);
    let fallback = MockClient::new(vec![Ok("".to_string())]);

    let result = generator::generate_content(
      &primary, &fallback, &cfg, "파이썬 웹 크롤링"
    ).await;

    match result
    {   Err(Error::PipelineFailed { topic }) => {
          assert_eq!(topic, "파이썬 웹 크롤링");
          let message = Error::PipelineFailed { topic }.to_string();
          assert!(message.contains("파이썬 웹 크롤링"));
        }
      , other => panic!("expected PipelineFailed, got {:?}", other)
    }
}

#[tokio::test]
async fn test_generate_succeeds_on_fallback()
{   let cfg = test_settings();
    let primary = MockClient::new(vec![
        Ok("겨울철 싱크대 냄새는 왜 생길까?".to_string())  // refinement
      , Err(Error::RateLimited)
      , Err(Error::RateLimited)
      , Err(Error::RateLimited)
    ]);
    let fallback = MockClient::new(vec![
      Ok("# 겨울철 싱크대 냄새\n\n본문입니다.".to_string())
    ]);

    let content = generator::generate_content(
      &primary, &fallback, &cfg, "겨울철 싱크대 냄새"
    ).await
      .expect("fallback content");

    assert!(content.contains("본문입니다"));
    assert_eq!(fallback.call_count(), 1);
}

#[tokio::test]
async fn test_generate_stops_at_first_success()
{   let cfg = test_settings();
    let primary = MockClient::new(vec![
        Ok("겨울철 싱크대 냄새는 왜 생길까?".to_string())  // refinement
      , Ok("# 첫 번째 시도 성공".to_string())
    ]);
    let fallback = MockClient::new(vec![]);

    let content = generator::generate_content(
      &primary, &fallback, &cfg, "겨울철 싱크대 냄새"
    ).await
      .expect("primary content");

    assert!(content.contains("첫 번째 시도 성공"));
    assert_eq!(primary.call_count(), 2);
    assert_eq!(fallback.call_count(), 0);
}

// ===== Fix needs =====

#[test]
fn test_extract_fix_needs_from_scores_and_faq()
{   let report = report_with(5, 6, 9, false, vec![
      ValidationIssue
      {   kind: "ai_tone".to_string()
        , message: "반복 표현을 줄이세요.".to_string()
      }
    ]);

    let needs = fixer::extract_fix_needs(&report);
    assert!(needs.iter().any(|n| n == "ai_tone"));
    assert!(needs.iter().any(|n| n == "faq_missing"));
    assert!(needs.iter().any(|n| n == "grammar_improvement"));
    assert!(needs.iter().any(|n| n == "humanize_content"));
    assert!(!needs.iter().any(|n| n == "seo_optimization"));
}

#[test]
fn test_extract_fix_needs_empty_for_good_report()
{   let report = report_with(9, 8, 8, true, vec![]);
    assert!(fixer::extract_fix_needs(&report).is_empty());
}

// ===== Keyword density =====

#[test]
fn test_keyword_density_two_in_hundred_words()
{   // 2-word phrase twice plus 96 filler words: 100 words total
    let filler: Vec<String>
      = (0..48).map(|i| format!("채움말{}", i)).collect();
    let half = filler.join(" ");
    let content = format!(
      "위젯 가격 {} 위젯 가격 {}",
      half, half
    );

    assert_eq!(fixer::keyword_density(&content, "위젯 가격"), 2.00);
}

#[test]
fn test_keyword_density_ignores_code_blocks()
{   let content
      = "위젯 가격 하나 둘 셋\n```\n위젯 가격\n```";
    // one occurrence over five words
    assert_eq!(fixer::keyword_density(content, "위젯 가격"), 20.00);
}

#[test]
fn test_keyword_density_case_insensitive()
{   let content = "Rust Tutorial one two three rust tutorial four five six";
    // 2 occurrences / 10 words
    assert_eq!(fixer::keyword_density(content, "rust tutorial"), 20.00);
}

#[test]
fn test_keyword_density_empty_inputs()
{   assert_eq!(fixer::keyword_density("", "위젯"), 0.0);
    assert_eq!(fixer::keyword_density("본문", ""), 0.0);
}

// ===== Post-processing =====

#[test]
fn test_post_process_collapses_whitespace()
{   let raw = "제목  입니다\n\n\n\n본문  \n";
    assert_eq!(fixer::post_process(raw), "제목 입니다\n\n본문");
}

#[test]
fn test_has_faq_section()
{   assert!(fixer::has_faq_section("## FAQ\n\n**Q:** 질문"));
    assert!(fixer::has_faq_section("## 자주 묻는 질문\n"));
    assert!(fixer::has_faq_section("##FAQ"));
    assert!(fixer::has_faq_section("## faq"));
    assert!(!fixer::has_faq_section("FAQ라는 단어만 있는 본문"));
}

// ===== Fixing =====

#[tokio::test]
async fn test_fix_skips_when_quality_good()
{   let client = MockClient::new(vec![]);
    let report = report_with(9, 8, 8, true, vec![]);

    let result
      = fixer::fix_content(&client, "본문 내용", &report, None).await;

    assert_eq!(result.fixed_content, "본문 내용");
    assert!(result.added_faq);
    assert_eq!(client.call_count(), 0);
    assert_eq!(result.fix_summary.len(), 1);
}

#[tokio::test]
async fn test_fix_returns_original_on_adapter_failure()
{   let client = MockClient::new(vec![
      Err(Error::ApiError("OpenAI 500: boom".to_string()))
    ]);
    let report = report_with(5, 5, 5, false, vec![]);

    let result
      = fixer::fix_content(&client, "원본 본문", &report, None).await;

    assert_eq!(result.fixed_content, "원본 본문");
    assert!(!result.added_faq);
    assert!(result.fix_summary[0].contains("교정 실패"));
}

#[tokio::test]
async fn test_fix_detects_added_faq()
{   let client = MockClient::new(vec![
      Ok("# 제목\n\n본문입니다.\n\n## FAQ\n\n**Q:** 질문\nA: 답변"
          .to_string())
    ]);
    let report = report_with(6, 6, 6, false, vec![]);
    let metadata = bloggen::FixMetadata
    {   focus_keyphrase: "본문".to_string()
      , language: "ko".to_string()
      , style: "guide".to_string()
    };

    let result = fixer::fix_content(
      &client, "# 제목\n\n본문입니다.", &report, Some(&metadata)
    ).await;

    assert!(result.added_faq);
    assert!(result.fix_summary.iter().any(|s| s.contains("FAQ")));
    assert!(result.keyword_density >= 0.0);
}

#[tokio::test]
async fn test_fix_post_processes_rewrite()
{   let client = MockClient::new(vec![
      Ok("교정된  본문\n\n\n\n결론  ".to_string())
    ]);
    let report = report_with(5, 5, 5, true, vec![]);

    let result
      = fixer::fix_content(&client, "원본", &report, None).await;

    assert_eq!(result.fixed_content, "교정된 본문\n\n결론");
}
