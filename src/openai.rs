//! Minimal OpenAI-compatible client for the AI mentor.
//!
//! We only call chat.completions and request plain text. Calls are
//! instrumented and log model names, latencies, and response sizes (not
//! contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short to
//! avoid PII leaks.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::Prompts;
use crate::domain::{ChallengeRef, WorldType};
use crate::tracker::{PerformanceEntry, ProgressSnapshot, WorldPerformance};
use crate::util::fill_template;

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let fast_model =
      std::env::var("OPENAI_FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let strong_model =
      std::env::var("OPENAI_STRONG_MODEL").unwrap_or_else(|_| "gpt-4o".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, fast_model, strong_model })
  }

  /// Plain-text chat completion. All mentor calls go through here.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat_plain(
    &self,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<String, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      max_tokens: Some(300),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "careerquest-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or_else(|| body);
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.get(0)
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    Ok(text)
  }

  // --- High-level helpers (mentor-specialized) ---

  /// Leveled hint for the in-flight challenge. The caller enforces the
  /// 4-hint cap and formats the result.
  #[instrument(level = "info", skip(self, prompts, challenge, description, progress),
               fields(name = %challenge.name, level))]
  pub async fn generate_hint(
    &self,
    prompts: &Prompts,
    challenge: &ChallengeRef,
    description: &str,
    progress: Option<&ProgressSnapshot>,
    level: u8,
  ) -> Result<String, String> {
    let kind = challenge.kind.map(|k| k.as_str()).unwrap_or("general");
    let (time_spent, attempts, errors) = match progress {
      Some(p) => (p.time_spent, p.attempts, p.errors.join(", ")),
      None => (0, 0, String::new()),
    };
    let errors = if errors.is_empty() { "None".to_string() } else { errors };
    let user = fill_template(
      &prompts.hint_user_template,
      &[
        ("name", &challenge.name),
        ("world", challenge.world.as_str()),
        ("kind", kind),
        ("difficulty", &challenge.difficulty.to_string()),
        ("description", description),
        ("time_spent", &time_spent.to_string()),
        ("attempts", &attempts.to_string()),
        ("errors", &errors),
        ("level", &level.to_string()),
      ],
    );
    self.chat_plain(&self.fast_model, &prompts.hint_system, &user, 0.4).await
  }

  /// Post-completion performance analysis for one entry.
  #[instrument(level = "info", skip(self, prompts, entry), fields(name = %entry.challenge_name))]
  pub async fn performance_analysis(
    &self,
    prompts: &Prompts,
    entry: &PerformanceEntry,
  ) -> Result<String, String> {
    let user = fill_template(
      &prompts.analysis_user_template,
      &[
        ("world", entry.world_type.as_str()),
        ("name", &entry.challenge_name),
        ("difficulty", &entry.difficulty.to_string()),
        ("completion_time", &entry.completion_time.unwrap_or(0).to_string()),
        ("hints_used", &entry.hints_used.to_string()),
        ("attempts", &entry.attempts.to_string()),
        ("completed", if entry.completed { "Yes" } else { "No" }),
      ],
    );
    self.chat_plain(&self.strong_model, &prompts.analysis_system, &user, 0.2).await
  }

  /// Career guidance for a world, based on its aggregated performance.
  #[instrument(level = "info", skip(self, prompts, perf), fields(%world))]
  pub async fn career_recommendation(
    &self,
    prompts: &Prompts,
    world: WorldType,
    perf: &WorldPerformance,
  ) -> Result<String, String> {
    let preferred = if perf.preferred_types.is_empty() {
      "Various".to_string()
    } else {
      perf.preferred_types.join(", ")
    };
    let user = fill_template(
      &prompts.recommendation_user_template,
      &[
        ("world", world.as_str()),
        ("avg_time", &format!("{:.0}", perf.average_time)),
        ("success_rate", &format!("{:.0}", perf.success_rate)),
        ("avg_hints", &format!("{:.1}", perf.average_hints)),
        ("preferred_types", &preferred),
      ],
    );
    self.chat_plain(&self.strong_model, &prompts.recommendation_system, &user, 0.2).await
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
