//! Loading agent configuration (prompts + optional challenge bank) from TOML.
//!
//! See `AgentConfig` and `Prompts` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{ChallengeType, WorldType};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub challenges: Vec<ChallengeCfg>,
}

/// Challenge entry accepted in TOML configuration. `description` and
/// `starting_code` together make the entry fully authored; without them the
/// engine serves a generic content block for it.
#[derive(Clone, Debug, Deserialize)]
pub struct ChallengeCfg {
  pub name: String,
  pub world: WorldType,
  #[serde(default)] pub kind: Option<ChallengeType>,
  pub difficulty: u8,
  #[serde(default)] pub description: Option<String>,
  #[serde(default)] pub starting_code: Option<String>,
  #[serde(default)] pub expected_output: Option<String>,
  #[serde(default)] pub hints: Option<Vec<String>>,
}

/// Prompts used by the AI mentor client. Defaults are sensible for career
/// mentoring; override them in TOML to tune tone/structure.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  pub hint_system: String,
  pub hint_user_template: String,
  pub analysis_system: String,
  pub analysis_user_template: String,
  pub recommendation_system: String,
  pub recommendation_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      hint_system: "You are an AI mentor helping a student learn software engineering. Keep hints encouraging, educational, and appropriate for the requested level. Do NOT reveal the full solution before level 4. Limit your response to 2-3 sentences.".into(),
      hint_user_template: "The student is working on: \"{name}\" ({world} track)\n\nChallenge details:\n- Type: {kind}\n- Difficulty: {difficulty}/5\n- Description: {description}\n\nStudent progress:\n- Time spent: {time_spent}ms\n- Attempts made: {attempts}\n- Previous errors: {errors}\n\nHint level: {level}/4\nLevel 1: conceptual hint - point them in the right direction.\nLevel 2: specific hint - mention key concepts or methods to use.\nLevel 3: code example - provide a small code snippet or structure.\nLevel 4: detailed solution - give step-by-step instructions.".into(),
      analysis_system: "You are a career mentor reviewing a student's performance. Be encouraging and actionable. Limit your response to 3-4 sentences.".into(),
      analysis_user_template: "Analyze this student's performance on a {world} challenge:\n\nChallenge: {name} (Level {difficulty})\nPerformance data:\n- Completion time: {completion_time}ms\n- Hints used: {hints_used}/4\n- Attempts: {attempts}\n- Final success: {completed}\n\nCover: strengths demonstrated, areas for improvement, specific next steps, and career aptitude insights.".into(),
      recommendation_system: "You give concise career guidance for software engineering tracks. Be specific and actionable. Limit your response to 4-5 sentences.".into(),
      recommendation_user_template: "Based on performance across {world} challenges:\n- Average completion time: {avg_time}ms\n- Success rate: {success_rate}%\n- Hint dependency: {avg_hints}/4\n- Preferred challenge types: {preferred_types}\n\nProvide career guidance for {world} development: specific role recommendations, skills to focus on, and next learning steps.".into(),
    }
  }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO
/// error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AgentConfig>(&s) {
      Ok(cfg) => {
        info!(target: "careerquest_backend", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "careerquest_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "careerquest_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bank_challenges_parse_from_toml() {
    let cfg: AgentConfig = toml::from_str(
      r#"
[[challenges]]
name = "Queue Design"
world = "backend"
kind = "design"
difficulty = 3
description = "Design a durable work queue."
starting_code = "// Queue Design challenge"

[[challenges]]
name = "Chart Audit"
world = "datascience"
difficulty = 2
"#,
    )
    .unwrap();
    assert_eq!(cfg.challenges.len(), 2);
    assert_eq!(cfg.challenges[0].world, WorldType::Backend);
    assert_eq!(cfg.challenges[0].kind, Some(ChallengeType::Design));
    assert_eq!(cfg.challenges[1].world, WorldType::DataScience);
    assert!(cfg.challenges[1].kind.is_none());
    // Prompts fall back to the defaults when absent.
    assert!(cfg.prompts.hint_user_template.contains("{level}"));
  }
}
