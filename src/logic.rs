//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Serving static and dynamic challenge content
//!   - Checking solutions and recording attempts
//!   - Leveled hints (AI mentor with static fallbacks, capped at 4)
//!   - Completing challenges and reading session analytics
//!
//! Remote failures never surface here: every AI/network path falls back to
//! fixed local content.

use tracing::{debug, error, instrument};

use crate::catalog::{skills_for, Challenge};
use crate::domain::{ChallengeRef, SolutionCheck, WorldType};
use crate::protocol::{to_dynamic_out, to_out, ChallengeOut, ChallengeSummary, DynamicChallengeOut};
use crate::state::AppState;
use crate::tracker::{PerformanceEntry, ProgressSnapshot, SessionData, WorldPerformance};
use crate::util::trunc_for_log;

const MAX_HINT_LEVEL: u32 = 4;

const MAX_HINTS_MESSAGE: &str =
  "You've reached the maximum number of hints. Try working through the problem step by step!";

/// Resolve a (world, name) pair against the catalog. Unknown names keep
/// working with no kind tag and the supplied (or minimum) difficulty.
fn resolve_ref(state: &AppState, world: WorldType, name: &str, difficulty: Option<u8>) -> ChallengeRef {
  match state.catalog.get(world, name) {
    Some(c) => ChallengeRef { name: c.name.clone(), world, kind: c.kind, difficulty: c.difficulty },
    None => ChallengeRef {
      name: name.to_string(),
      world,
      kind: None,
      difficulty: difficulty.unwrap_or(1),
    },
  }
}

#[instrument(level = "info", skip(state), fields(%world, %name))]
pub async fn serve_challenge(
  state: &AppState,
  world: WorldType,
  name: &str,
  difficulty: Option<u8>,
) -> ChallengeOut {
  let challenge = resolve_ref(state, world, name, difficulty);
  let content = state.engine.generate_challenge(&challenge);
  let time_limit = state.engine.time_limit_ms(challenge.difficulty);
  to_out(&challenge, content, time_limit)
}

/// Roster listing for a world, in progression order (or one difficulty
/// tier), with per-challenge unlock state derived from the session history.
#[instrument(level = "info", skip(state), fields(%world))]
pub async fn list_challenges(
  state: &AppState,
  world: WorldType,
  difficulty: Option<u8>,
) -> Vec<ChallengeSummary> {
  let completed = completed_names(state).await;
  let list = match difficulty {
    Some(d) => state.catalog.by_difficulty(world, d),
    None => state.catalog.progression_path(world),
  };
  list.into_iter().map(|c| summarize(state, c, &completed)).collect()
}

/// Case-insensitive name search across all worlds.
#[instrument(level = "info", skip(state))]
pub async fn search_challenges(state: &AppState, query: &str) -> Vec<ChallengeSummary> {
  let completed = completed_names(state).await;
  state
    .catalog
    .search(query)
    .into_iter()
    .map(|c| summarize(state, c, &completed))
    .collect()
}

/// A random challenge from a world, served with full content. None only
/// when a difficulty filter matches nothing.
#[instrument(level = "info", skip(state), fields(%world))]
pub async fn serve_random_challenge(
  state: &AppState,
  world: WorldType,
  difficulty: Option<u8>,
) -> Option<ChallengeOut> {
  let name = state.catalog.random_challenge(world, difficulty).map(|c| c.name.clone())?;
  Some(serve_challenge(state, world, &name, difficulty).await)
}

/// Distinct skills assessed anywhere in a world.
pub async fn world_skills(state: &AppState, world: WorldType) -> Vec<String> {
  state.catalog.skills_for_world(world)
}

async fn completed_names(state: &AppState) -> Vec<String> {
  let tracker = state.tracker.read().await;
  tracker
    .session()
    .challenges
    .iter()
    .filter(|c| c.completed)
    .map(|c| c.challenge_name.clone())
    .collect()
}

fn summarize(state: &AppState, c: &Challenge, completed: &[String]) -> ChallengeSummary {
  ChallengeSummary {
    name: c.name.clone(),
    world_type: c.world,
    kind: c.kind,
    difficulty: c.difficulty,
    skills: skills_for(c.world, &c.name),
    unlocked: state.catalog.prerequisites_met(c, completed),
  }
}

#[instrument(level = "info", skip(state), fields(%world, difficulty))]
pub async fn serve_dynamic_challenge(
  state: &AppState,
  world: WorldType,
  difficulty: u8,
  force_refresh: bool,
) -> DynamicChallengeOut {
  let remote = state
    .challenge_api
    .fetch(world.occupation(), difficulty, force_refresh)
    .await;
  to_dynamic_out(&remote)
}

#[instrument(level = "info", skip(state), fields(%world, %name, difficulty))]
pub async fn start_challenge(state: &AppState, world: WorldType, name: &str, difficulty: u8) {
  state.tracker.write().await.start_challenge(name, world, difficulty);
}

/// Check a submitted solution and record the attempt.
#[instrument(level = "info", skip(state, solution), fields(%world, %name, solution_len = solution.len()))]
pub async fn submit_solution(
  state: &AppState,
  world: WorldType,
  name: &str,
  solution: &str,
) -> SolutionCheck {
  debug!(target: "challenge", preview = %trunc_for_log(solution, 80), "Solution submitted");
  let challenge = resolve_ref(state, world, name, None);
  let check = state.engine.check_solution(&challenge, solution);

  let mut tracker = state.tracker.write().await;
  let feedback = (!check.correct).then_some(check.feedback.as_str());
  tracker.record_attempt(check.correct, feedback);
  check
}

/// Check an answer to the current dynamic challenge for this (world,
/// difficulty) slot. Fallback payloads carry no expected answer and are not
/// scored as attempts.
#[instrument(level = "info", skip(state, answer), fields(%world, difficulty))]
pub async fn submit_dynamic_answer(
  state: &AppState,
  world: WorldType,
  difficulty: u8,
  answer: &str,
) -> SolutionCheck {
  let remote = state.challenge_api.fetch(world.occupation(), difficulty, false).await;
  let Some(expected) = remote.answer else {
    return SolutionCheck {
      correct: false,
      feedback: "This challenge has no automated answer check. Request a new challenge and try again."
        .into(),
    };
  };

  let check = state.engine.check_dynamic_answer(&expected, answer);
  let mut tracker = state.tracker.write().await;
  let feedback = (!check.correct).then_some(check.feedback.as_str());
  tracker.record_attempt(check.correct, feedback);
  check
}

/// Leveled hint for a challenge. The level is the in-flight hint count plus
/// one; past level 4 the player gets the fixed cap message and nothing is
/// recorded.
#[instrument(level = "info", skip(state), fields(%world, %name))]
pub async fn get_hint_text(
  state: &AppState,
  world: WorldType,
  name: &str,
  difficulty: Option<u8>,
) -> String {
  let (level, progress) = {
    let tracker = state.tracker.read().await;
    (tracker.hint_count() + 1, tracker.current_progress())
  };
  if level > MAX_HINT_LEVEL {
    return MAX_HINTS_MESSAGE.into();
  }
  let level = level as u8;

  let challenge = resolve_ref(state, world, name, difficulty);
  let description = state.engine.generate_challenge(&challenge).description;

  let text = if let Some(oa) = &state.openai {
    match oa
      .generate_hint(&state.prompts, &challenge, &description, progress.as_ref(), level)
      .await
    {
      Ok(t) => t,
      Err(e) => {
        error!(target: "challenge", %name, error = %e, "AI hint failed; using static fallback.");
        fallback_hint(world, level).to_string()
      }
    }
  } else {
    fallback_hint(world, level).to_string()
  };

  state.tracker.write().await.record_hint_usage();
  format_hint(&text, level)
}

#[instrument(level = "info", skip(state))]
pub async fn complete_challenge(
  state: &AppState,
  success: bool,
) -> (Option<PerformanceEntry>, SessionData) {
  let mut tracker = state.tracker.write().await;
  let entry = tracker.complete_challenge(success);
  (entry, tracker.session().clone())
}

pub async fn current_progress(state: &AppState) -> Option<ProgressSnapshot> {
  state.tracker.read().await.current_progress()
}

pub async fn world_performance(state: &AppState, world: WorldType) -> Option<WorldPerformance> {
  state.tracker.read().await.world_type_performance(world)
}

pub async fn export_report(state: &AppState) -> String {
  state.tracker.read().await.export_performance_report()
}

/// Reset the session and drop cached dynamic challenges so a fresh session
/// starts from fresh content.
#[instrument(level = "info", skip(state))]
pub async fn clear_session(state: &AppState) {
  state.tracker.write().await.clear_session_data();
  state.challenge_api.clear_cache().await;
}

/// Analysis of the most recently completed challenge.
#[instrument(level = "info", skip(state))]
pub async fn performance_analysis_text(state: &AppState) -> String {
  let entry = { state.tracker.read().await.session().challenges.last().cloned() };
  let Some(entry) = entry else {
    return "Complete a challenge to get a performance analysis.".into();
  };

  if let Some(oa) = &state.openai {
    match oa.performance_analysis(&state.prompts, &entry).await {
      Ok(t) => t,
      Err(e) => {
        error!(target: "challenge", name = %entry.challenge_name, error = %e, "AI analysis failed; using fallback.");
        fallback_analysis(&entry)
      }
    }
  } else {
    fallback_analysis(&entry)
  }
}

/// Career guidance for one world, based on its session history.
#[instrument(level = "info", skip(state), fields(%world))]
pub async fn career_recommendation_text(state: &AppState, world: WorldType) -> String {
  let perf = { state.tracker.read().await.world_type_performance(world) };
  match (&state.openai, perf) {
    (Some(oa), Some(perf)) => match oa.career_recommendation(&state.prompts, world, &perf).await {
      Ok(t) => t,
      Err(e) => {
        error!(target: "challenge", %world, error = %e, "AI recommendation failed; using fallback.");
        fallback_recommendation(world).to_string()
      }
    },
    _ => fallback_recommendation(world).to_string(),
  }
}

// -------- Local fallbacks & utilities --------

fn format_hint(text: &str, level: u8) -> String {
  let labels = ["Concept", "Specific", "Example", "Solution"];
  let label = labels[usize::from(level.clamp(1, 4)) - 1];
  format!("{} hint {}/4:\n\n{}", label, level, text)
}

fn fallback_hint(world: WorldType, level: u8) -> &'static str {
  match level.clamp(1, 4) {
    1 => match world {
      WorldType::Backend => "Consider the data flow - what happens when a request comes in? Think about validation and error handling.",
      WorldType::Frontend => "Think about the user experience - how should the interface respond to different screen sizes?",
      WorldType::DataScience => "Start by exploring the data - what patterns or issues do you notice in the dataset?",
    },
    2 => match world {
      WorldType::Backend => "Look into using try-catch blocks, input validation, and proper HTTP status codes for robust APIs.",
      WorldType::Frontend => "Consider using CSS Grid or Flexbox for layout, and media queries for responsive design.",
      WorldType::DataScience => "Use pandas methods like .info(), .describe(), and .isnull() to understand your data better.",
    },
    3 => match world {
      WorldType::Backend => "Here's a pattern: if (!user) { return res.status(404).json({ error: 'User not found' }); }",
      WorldType::Frontend => "Try: .container { display: grid; grid-template-columns: repeat(auto-fit, minmax(300px, 1fr)); }",
      WorldType::DataScience => "Example: df = df.dropna().drop_duplicates().reset_index(drop=True)",
    },
    _ => match world {
      WorldType::Backend => "Step 1: Validate input, Step 2: Check if resource exists, Step 3: Handle errors properly, Step 4: Return appropriate responses",
      WorldType::Frontend => "Step 1: Set up grid container, Step 2: Add responsive breakpoints, Step 3: Style individual items, Step 4: Test on different devices",
      WorldType::DataScience => "Step 1: Identify missing data, Step 2: Choose cleaning strategy, Step 3: Remove duplicates, Step 4: Verify data quality",
    },
  }
}

fn fallback_analysis(entry: &PerformanceEntry) -> String {
  let speed = if entry.completion_time.unwrap_or(0) < 300_000 { "excellent" } else { "good" };
  let guidance = if entry.hints_used <= 2 { "minimal guidance" } else { "some assistance" };
  format!(
    "You showed {speed} problem-solving speed and worked through the challenge with {guidance}. \
     Your approach to {} demonstrates growing {} skills. Focus on practicing similar challenges \
     to build confidence, and consider exploring more advanced concepts in this area.",
    entry.challenge_name, entry.world_type
  )
}

fn fallback_recommendation(world: WorldType) -> &'static str {
  match world {
    WorldType::Backend => "Consider roles like Backend Developer, API Engineer, or DevOps Engineer. Focus on mastering databases, system design, and cloud technologies. Next steps: build REST APIs, learn containerization, and practice system architecture.",
    WorldType::Frontend => "Explore positions like Frontend Developer, UI Engineer, or UX Developer. Develop expertise in modern frameworks, design systems, and user experience. Next steps: master React/Vue, learn design principles, and build responsive applications.",
    WorldType::DataScience => "Look into Data Scientist, ML Engineer, or Data Analyst roles. Strengthen your statistics, machine learning, and data visualization skills. Next steps: work with real datasets, learn advanced ML algorithms, and practice storytelling with data.",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::state::test_state;

  #[tokio::test]
  async fn hints_escalate_and_cap_at_four() {
    let state = test_state();
    start_challenge(&state, WorldType::Backend, "API Debugging", 2).await;

    let h1 = get_hint_text(&state, WorldType::Backend, "API Debugging", None).await;
    assert!(h1.starts_with("Concept hint 1/4:"));
    let h2 = get_hint_text(&state, WorldType::Backend, "API Debugging", None).await;
    assert!(h2.starts_with("Specific hint 2/4:"));
    let h3 = get_hint_text(&state, WorldType::Backend, "API Debugging", None).await;
    assert!(h3.starts_with("Example hint 3/4:"));
    let h4 = get_hint_text(&state, WorldType::Backend, "API Debugging", None).await;
    assert!(h4.starts_with("Solution hint 4/4:"));

    let capped = get_hint_text(&state, WorldType::Backend, "API Debugging", None).await;
    assert_eq!(capped, MAX_HINTS_MESSAGE);
    assert_eq!(state.tracker.read().await.hint_count(), 4);
  }

  #[tokio::test]
  async fn submit_then_complete_tracks_attempts_and_accuracy() {
    let state = test_state();
    start_challenge(&state, WorldType::Backend, "API Debugging", 2).await;

    let bad = submit_solution(&state, WorldType::Backend, "API Debugging", "too short").await;
    assert!(!bad.correct);

    let good = submit_solution(
      &state,
      WorldType::Backend,
      "API Debugging",
      "Add try/catch with an error response and input validation for the id.",
    )
    .await;
    assert!(good.correct, "{}", good.feedback);

    let (entry, session) = complete_challenge(&state, true).await;
    let entry = entry.unwrap();
    assert_eq!(entry.attempts, 2);
    assert_eq!(entry.accuracy, 50);
    assert_eq!(entry.errors.len(), 1);
    assert_eq!(session.challenges.len(), 1);
    assert_eq!(session.preferred_world_type, Some(WorldType::Backend));
  }

  #[tokio::test]
  async fn dynamic_fallback_answers_are_not_scored() {
    // test_state points the challenge API at an unreachable endpoint, so the
    // fetch inside returns the fallback payload with no expected answer.
    let state = test_state();
    start_challenge(&state, WorldType::Backend, "Dynamic", 2).await;

    let check = submit_dynamic_answer(&state, WorldType::Backend, 2, "B").await;
    assert!(!check.correct);
    assert!(check.feedback.contains("no automated answer check"));
    assert_eq!(state.tracker.read().await.current_progress().unwrap().attempts, 0);
  }

  #[tokio::test]
  async fn dynamic_challenge_serving_hides_the_answer() {
    let state = test_state();
    let out = serve_dynamic_challenge(&state, WorldType::Frontend, 3, false).await;
    assert!(out.question.contains("unavailable"));
    let raw = serde_json::to_string(&out).unwrap();
    assert!(!raw.contains("answer"));
  }

  #[tokio::test]
  async fn analysis_and_recommendation_fall_back_without_history() {
    let state = test_state();
    let analysis = performance_analysis_text(&state).await;
    assert!(analysis.contains("Complete a challenge"));

    let rec = career_recommendation_text(&state, WorldType::DataScience).await;
    assert!(rec.contains("Data Scientist"));
  }

  #[tokio::test]
  async fn analysis_uses_the_last_completed_entry() {
    let state = test_state();
    start_challenge(&state, WorldType::Frontend, "Component Layout", 2).await;
    submit_solution(
      &state,
      WorldType::Frontend,
      "Component Layout",
      "Use grid with flex fallback, responsive breakpoints via media queries.",
    )
    .await;
    complete_challenge(&state, true).await;

    let analysis = performance_analysis_text(&state).await;
    assert!(analysis.contains("Component Layout"));
    assert!(analysis.contains("frontend"));
  }

  #[tokio::test]
  async fn listing_orders_by_difficulty_and_tracks_unlocks() {
    let state = test_state();
    let list = list_challenges(&state, WorldType::Frontend, None).await;
    assert_eq!(list.len(), 5);
    assert_eq!(list[0].name, "CSS Positioning");
    assert!(list[0].unlocked, "easiest challenge starts unlocked");
    let animation = list.iter().find(|c| c.name == "Animation System").unwrap();
    assert!(!animation.unlocked, "hard challenges start locked");

    // Completing two easier frontend challenges unlocks the level-4 one.
    for name in ["CSS Positioning", "Component Layout"] {
      start_challenge(&state, WorldType::Frontend, name, 1).await;
      complete_challenge(&state, true).await;
    }
    let list = list_challenges(&state, WorldType::Frontend, None).await;
    let animation = list.iter().find(|c| c.name == "Animation System").unwrap();
    assert!(animation.unlocked);
  }

  #[tokio::test]
  async fn search_and_random_selection_stay_inside_the_catalog() {
    let state = test_state();
    let found = search_challenges(&state, "css").await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "CSS Positioning");

    let random = serve_random_challenge(&state, WorldType::DataScience, Some(5)).await.unwrap();
    assert_eq!(random.name, "ML Pipeline");
    assert!(serve_random_challenge(&state, WorldType::DataScience, Some(0)).await.is_none());

    let skills = world_skills(&state, WorldType::Backend).await;
    assert!(skills.contains(&"Debugging".to_string()));
    assert!(skills.contains(&"Distributed Systems".to_string()));
  }

  #[tokio::test]
  async fn serve_challenge_includes_time_limit_and_roster_difficulty() {
    let state = test_state();
    let out = serve_challenge(&state, WorldType::Backend, "Database Optimization", None).await;
    assert_eq!(out.difficulty, 3);
    assert_eq!(out.time_limit_ms, 450_000);
    assert!(out.description.contains("slow database query"));

    let generic = serve_challenge(&state, WorldType::Backend, "Never Heard Of It", Some(2)).await;
    assert!(generic.description.contains("Never Heard Of It"));
    assert!(generic.kind.is_none());
  }
}
