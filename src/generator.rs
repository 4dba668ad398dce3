//! Content generation pipeline: topic refinement plus a provider
//! fallback chain with bounded backoff between entries

use log::{info, warn, error};

use crate::config::Settings;
use crate::error::Error;
use crate::providers::CompletionClient;
use crate::request::{CompletionRequest, Message};
use crate::retry::{ChainStep, FallbackChain};

// ===== Prompts =====

/// System instruction for blog generation
pub const SYSTEM_PROMPT: &str = r#"당신은 네이버와 구글 검색 상위 노출을 목표로 하는 전문 블로그 작가입니다.

원칙:
1. 모든 글은 마크다운 형식으로 작성합니다
2. 구조: 제목(H1) → 서론(H2) → 본론(H2/H3) → FAQ(H2) → 결론(H2)
3. 서론은 독자의 문제 상황에 공감하며 시작합니다
4. 본론은 구체적인 정보와 실용적인 팁을 담습니다
5. FAQ는 실제로 검색될 만한 질문 2~3개로 구성합니다
6. AI가 쓴 티가 나지 않도록 자연스러운 문체를 유지합니다
7. 전체 분량은 1500~2500자 내외로 합니다"#;

/// User prompt template; `{topic}` is substituted before the call
pub const USER_PROMPT_TEMPLATE: &str = r#"다음 주제로 블로그 글을 작성해주세요.

주제: {topic}

위 원칙에 따라 완성된 마크다운 글만 출력하세요. 메타 설명이나 부가 설명은 포함하지 마세요."#;

/// Topic refinement instruction: raw keyword to question-style title
pub const TOPIC_PROMPT: &str = r#"당신은 SEO 전문가입니다. 주어진 키워드를 자연스러운 질문형 제목으로 변환해주세요.

규칙:
1. 한국어로 질문 형태의 제목을 만드세요 (? 로 끝나야 함)
2. 25-35자 정도의 자연스러운 문장
3. 원본 키워드를 그대로 반환하지 말고, 반드시 질문으로 변환하세요
4. 따옴표나 설명 없이 제목만 출력하세요

예시:
입력: 목동 영어유치원 학비
출력: 목동 영어유치원 학비는 얼마나 될까?

입력: 겨울철 싱크대 냄새
출력: 겨울철 싱크대 냄새는 왜 생길까?

입력받은 키워드를 위 형식으로 변환해주세요."#;

/// Token budget for the refinement call
const REFINE_MAX_TOKENS: usize = 500;

// ===== Pipeline-step logging =====

/// First 50 characters of a topic, for log lines
fn topic_head(topic: &str) -> String
{   topic.chars().take(50).collect()
}

/// One structured event per pipeline state transition
fn log_event(
  model: &str
, topic: &str
, status: &str
, error_detail: Option<&str>
)
{   let head = topic_head(topic);
    if let Some(detail) = error_detail
    {   error!("[{}] [{}] topic: {} | {}", model, status, head, detail);
    } else if status.contains("FAIL")
    {   warn!("[{}] [{}] topic: {}", model, status, head);
    } else
    {   info!("[{}] [{}] topic: {}", model, status, head);
    }
}

// ===== Topic refinement =====

/// Convert a raw keyword into a natural question-style title
///
/// One adapter call; the adapter's own retry budget applies. Every
/// failure path returns the original topic: refinement is never
/// fatal to the pipeline and does not count against the generation
/// chain.
pub async fn refine_topic<C>(
  client: &C
, topic: &str
) -> String
where C: CompletionClient
{   info!("Starting topic refinement: {}", topic_head(topic));

    let request = CompletionRequest
    {   messages: vec![
          Message::system(TOPIC_PROMPT)
        , Message::user(topic)
        ]
      , model: None
      , max_tokens: Some(REFINE_MAX_TOKENS)
      , temperature: None
      , system_prompt: None
    };

    match client.complete(&request).await
    {   Ok(response) => {
          let title = response.content
            .replace('"', "")
            .replace('\'', "")
            .trim()
            .to_string();

          if title.is_empty() || title == topic.trim()
          {   warn!(
                "Model returned unchanged topic, keeping original: {}",
                topic
              );
              return topic.trim().to_string();
          }

          info!("Topic refined successfully: {}", topic_head(&title));
          title
        }
      , Err(e) => {
          warn!("Topic refinement failed, using original: {}", e);
          topic.trim().to_string()
        }
    }
}

// ===== Generation =====

/// Produce blog content for a topic via the model fallback chain
///
/// Chain: the primary adapter for `max_retries` entries, then the
/// fallback adapter exactly once. The first non-empty completion
/// wins. An adapter error or empty result is a soft failure: it is
/// logged, backed off (skipped after the final entry), and the chain
/// advances. Exhausting the chain is the pipeline's only hard
/// failure.
pub async fn generate_content<P, F>(
  primary: &P
, fallback: &F
, cfg: &Settings
, topic: &str
) -> Result<String, Error>
where P: CompletionClient, F: CompletionClient
{   // 1. question-style title; falls back to the raw topic
    let refined = refine_topic(primary, topic).await;
    if refined != topic
    {   info!("Topic refined: {} -> {}", topic, refined);
    }

    // 2. fill the generation prompt
    let user_prompt = USER_PROMPT_TEMPLATE.replace("{topic}", &refined);

    // 3. walk the chain
    let chain = FallbackChain::new(
      ChainStep
      {   provider: primary.provider()
        , model: primary.default_model().to_string()
      }
    , cfg.max_retries
    , ChainStep
      {   provider: fallback.provider()
        , model: fallback.default_model().to_string()
      }
    );
    let policy = cfg.retry_policy();

    for (index, step) in chain.steps().iter().enumerate()
    {   let attempt = index + 1;
        let start_label
          = if attempt > 1 { "RETRY_START" } else { "START" };
        log_event(&step.model, &refined, start_label, None);

        let request = CompletionRequest
        {   messages: vec![
              Message::system(SYSTEM_PROMPT)
            , Message::user(&user_prompt)
            ]
          , model: None
          , max_tokens: None
          , temperature: None
          , system_prompt: None
        };

        let outcome = if chain.is_primary(index)
        {   primary.complete(&request).await
        } else
        {   fallback.complete(&request).await
        };

        match outcome
        {   Ok(response) if !response.content.trim().is_empty() => {
              let label
                = if attempt > 1 { "RETRY_SUCCESS" } else { "SUCCESS" };
              log_event(&step.model, &refined, label, None);
              return Ok(response.content);
            }
          , Ok(_) => {
              let label
                = if attempt > 1 { "RETRY_FAIL" } else { "FAIL" };
              log_event(&step.model, &refined, label, Some("empty content"));
            }
          , Err(e) => {
              let label
                = if attempt > 1 { "RETRY_FAIL" } else { "FAIL" };
              log_event(&step.model, &refined, label, Some(&e.to_string()));
            }
        }

        // soft failure: back off, except after the final entry
        if attempt < chain.len()
        {   let wait = policy.backoff_for_attempt(attempt);
            info!("Waiting {:?} before next attempt...", wait);
            tokio::time::sleep(wait).await;
        }
    }

    // 4. every entry failed
    log_event("SYSTEM", &refined, "TOTAL_FAIL", Some("all attempts failed"));
    Err(Error::PipelineFailed { topic: refined })
}
