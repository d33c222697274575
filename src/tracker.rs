//! Per-session performance tracking and skill analytics.
//!
//! One tracker owns the session for the process lifetime. A challenge moves
//! through Idle -> InProgress -> Completed; starting a new challenge while
//! one is in flight discards the unfinished entry without recording it.
//! Session aggregates are recomputed after every completion and the whole
//! session is written to the store at that point.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::catalog::skills_for;
use crate::domain::WorldType;
use crate::store::SessionStore;

/// Average completion time above which the skill score starts to decay.
const SKILL_TIME_PIVOT_MS: f64 = 300_000.0;

pub fn now_ms() -> i64 {
  Utc::now().timestamp_millis()
}

/// One attempted challenge. Field names match the persisted session blob.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceEntry {
  pub challenge_name: String,
  pub world_type: WorldType,
  pub difficulty: u8,
  pub start_time: i64,
  #[serde(default)] pub end_time: Option<i64>,
  #[serde(default)] pub completion_time: Option<i64>,
  pub hints_used: u32,
  pub attempts: u32,
  pub completed: bool,
  pub accuracy: u8,
  pub errors: Vec<String>,
  pub skills_assessed: Vec<String>,
}

impl PerformanceEntry {
  fn new(challenge_name: String, world_type: WorldType, difficulty: u8) -> Self {
    Self {
      challenge_name,
      world_type,
      difficulty,
      start_time: now_ms(),
      end_time: None,
      completion_time: None,
      hints_used: 0,
      attempts: 0,
      completed: false,
      accuracy: 0,
      errors: vec![],
      skills_assessed: vec![],
    }
  }

  /// accuracy = round(100 * completed / max(attempts, 1)).
  fn update_accuracy(&mut self) {
    let successes = if self.completed { 1.0 } else { 0.0 };
    let total = f64::from(self.attempts.max(1));
    self.accuracy = (successes / total * 100.0).round() as u8;
  }
}

/// Accumulated record of all completed challenges since the last clear.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionData {
  pub challenges: Vec<PerformanceEntry>,
  pub total_time: i64,
  pub average_accuracy: f64,
  pub preferred_world_type: Option<WorldType>,
  pub skill_strengths: Vec<String>,
  pub skill_weaknesses: Vec<String>,
}

impl SessionData {
  /// Recompute every aggregate from the entry list.
  pub fn recompute(&mut self) {
    self.total_time = self.challenges.iter().filter_map(|c| c.completion_time).sum();

    self.average_accuracy = if self.challenges.is_empty() {
      0.0
    } else {
      let sum: f64 = self.challenges.iter().map(|c| f64::from(c.accuracy)).sum();
      sum / self.challenges.len() as f64
    };

    // Most-played world; ties break alphabetically by wire name so the
    // result does not depend on map iteration order.
    let mut best: Option<(WorldType, usize)> = None;
    for world in WorldType::ALL {
      let n = self.challenges.iter().filter(|c| c.world_type == world).count();
      if n == 0 {
        continue;
      }
      let better = match best {
        None => true,
        Some((bw, bn)) => n > bn || (n == bn && world.as_str() < bw.as_str()),
      };
      if better {
        best = Some((world, n));
      }
    }
    self.preferred_world_type = best.map(|(w, _)| w);

    let ranked = rank_skills(&self.challenges);
    self.skill_strengths = ranked.iter().take(3).map(|(name, _)| name.clone()).collect();
    let skip = ranked.len().saturating_sub(3);
    self.skill_weaknesses = ranked.iter().skip(skip).map(|(name, _)| name.clone()).collect();
  }
}

/// Score every skill seen in the history and rank it best-first.
///
/// score = success_rate * (1 / max(avg_time / 5min, 1)): slower-than-five-
/// minute averages decay the score, faster ones are never a bonus. Equal
/// scores order by name so the ranking is stable.
fn rank_skills(challenges: &[PerformanceEntry]) -> Vec<(String, f64)> {
  use std::collections::BTreeMap;

  #[derive(Default)]
  struct Agg {
    total: u32,
    successes: u32,
    time: i64,
  }

  let mut per_skill: BTreeMap<&str, Agg> = BTreeMap::new();
  for entry in challenges {
    for skill in &entry.skills_assessed {
      let agg = per_skill.entry(skill.as_str()).or_default();
      agg.total += 1;
      if entry.completed {
        agg.successes += 1;
      }
      agg.time += entry.completion_time.unwrap_or(0);
    }
  }

  let mut ranked: Vec<(String, f64)> = per_skill
    .into_iter()
    .map(|(name, agg)| {
      let success_rate = f64::from(agg.successes) / f64::from(agg.total);
      let avg_time = agg.time as f64 / f64::from(agg.total);
      let score = success_rate * (1.0 / (avg_time / SKILL_TIME_PIVOT_MS).max(1.0));
      (name.to_string(), score)
    })
    .collect();
  // Stable sort keeps the BTreeMap's name order for equal scores.
  ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
  ranked
}

/// Snapshot of the in-flight challenge for the UI.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
  pub time_spent: i64,
  pub attempts: u32,
  pub hints_used: u32,
  pub errors: Vec<String>,
  pub accuracy: u8,
}

/// Aggregated view over one world's completed entries.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldPerformance {
  pub average_time: f64,
  pub success_rate: f64,
  pub average_hints: f64,
  pub challenges_completed: usize,
  pub preferred_types: Vec<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PerformanceReport {
  report_id: String,
  session_summary: SessionData,
  current_challenge: Option<PerformanceEntry>,
  timestamp: String,
}

pub struct PerformanceTracker {
  current: Option<PerformanceEntry>,
  session: SessionData,
  store: Box<dyn SessionStore>,
}

impl PerformanceTracker {
  /// Load the persisted session, recovering to an empty one on missing or
  /// corrupt data (logged, never fatal).
  #[instrument(level = "info", skip_all)]
  pub fn new(store: Box<dyn SessionStore>) -> Self {
    let session = match store.load() {
      Ok(Some(session)) => {
        info!(target: "careerquest_backend", entries = session.challenges.len(), "Loaded persisted session");
        session
      }
      Ok(None) => SessionData::default(),
      Err(e) => {
        error!(target: "careerquest_backend", error = %e, "Session data unreadable; starting empty");
        SessionData::default()
      }
    };
    Self { current: None, session, store }
  }

  /// Begin tracking a challenge. A prior in-flight entry is discarded
  /// without touching the session history.
  #[instrument(level = "info", skip(self), fields(%world_type, difficulty))]
  pub fn start_challenge(&mut self, challenge_name: &str, world_type: WorldType, difficulty: u8) {
    if let Some(prev) = &self.current {
      warn!(target: "challenge", abandoned = %prev.challenge_name, "Discarding unfinished challenge");
    }
    self.current = Some(PerformanceEntry::new(challenge_name.to_string(), world_type, difficulty));
  }

  /// Record one submission attempt. Failed attempts log their feedback as an
  /// error message. No-op when idle.
  pub fn record_attempt(&mut self, success: bool, feedback: Option<&str>) {
    let Some(cur) = self.current.as_mut() else { return };
    cur.attempts += 1;
    if !success {
      if let Some(fb) = feedback {
        cur.errors.push(fb.to_string());
      }
    }
    cur.update_accuracy();
  }

  /// Count a hint. The 4-hint cap is enforced by the caller.
  pub fn record_hint_usage(&mut self) {
    if let Some(cur) = self.current.as_mut() {
      cur.hints_used += 1;
    }
  }

  /// Finish the in-flight challenge: stamp the end time, finalize accuracy,
  /// assign assessed skills, append to the session, recompute aggregates,
  /// and persist. Returns the completed entry, or None when idle.
  #[instrument(level = "info", skip(self))]
  pub fn complete_challenge(&mut self, success: bool) -> Option<PerformanceEntry> {
    let mut entry = match self.current.take() {
      Some(entry) => entry,
      None => {
        warn!(target: "challenge", "complete_challenge with no challenge in flight");
        return None;
      }
    };

    let end = now_ms();
    entry.end_time = Some(end);
    entry.completion_time = Some(end - entry.start_time);
    entry.completed = success;
    entry.update_accuracy();
    entry.skills_assessed = skills_for(entry.world_type, &entry.challenge_name);

    self.session.challenges.push(entry.clone());
    self.session.recompute();

    if let Err(e) = self.store.save(&self.session) {
      error!(target: "careerquest_backend", error = %e, "Failed to persist session");
    }

    info!(
      target: "challenge",
      name = %entry.challenge_name,
      success,
      attempts = entry.attempts,
      accuracy = entry.accuracy,
      "Challenge completed"
    );
    Some(entry)
  }

  pub fn session(&self) -> &SessionData {
    &self.session
  }

  pub fn current_progress(&self) -> Option<ProgressSnapshot> {
    self.current.as_ref().map(|cur| ProgressSnapshot {
      time_spent: now_ms() - cur.start_time,
      attempts: cur.attempts,
      hints_used: cur.hints_used,
      errors: cur.errors.clone(),
      accuracy: cur.accuracy,
    })
  }

  pub fn elapsed_time(&self) -> i64 {
    self.current.as_ref().map_or(0, |cur| now_ms() - cur.start_time)
  }

  pub fn hint_count(&self) -> u32 {
    self.current.as_ref().map_or(0, |cur| cur.hints_used)
  }

  /// Averages over one world's recorded entries; None when the world has no
  /// history yet.
  pub fn world_type_performance(&self, world_type: WorldType) -> Option<WorldPerformance> {
    let entries: Vec<&PerformanceEntry> = self
      .session
      .challenges
      .iter()
      .filter(|c| c.world_type == world_type)
      .collect();
    if entries.is_empty() {
      return None;
    }

    let n = entries.len() as f64;
    let total_time: i64 = entries.iter().filter_map(|c| c.completion_time).sum();
    let successes = entries.iter().filter(|c| c.completed).count();
    let total_hints: u32 = entries.iter().map(|c| c.hints_used).sum();

    Some(WorldPerformance {
      average_time: total_time as f64 / n,
      success_rate: successes as f64 / n * 100.0,
      average_hints: f64::from(total_hints) / n,
      challenges_completed: entries.len(),
      preferred_types: preferred_challenge_types(&entries),
    })
  }

  /// Serialize the session, the in-flight entry, and a generation timestamp.
  #[instrument(level = "info", skip(self))]
  pub fn export_performance_report(&self) -> String {
    let report = PerformanceReport {
      report_id: Uuid::new_v4().to_string(),
      session_summary: self.session.clone(),
      current_challenge: self.current.clone(),
      timestamp: Utc::now().to_rfc3339(),
    };
    serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
      error!(target: "careerquest_backend", error = %e, "Report serialization failed");
      "{}".into()
    })
  }

  /// Reset in-memory state and delete the persisted blob.
  #[instrument(level = "info", skip(self))]
  pub fn clear_session_data(&mut self) {
    self.current = None;
    self.session = SessionData::default();
    if let Err(e) = self.store.clear() {
      error!(target: "careerquest_backend", error = %e, "Failed to clear persisted session");
    }
  }
}

/// Top three challenge names (lowercased) by completed count.
fn preferred_challenge_types(entries: &[&PerformanceEntry]) -> Vec<String> {
  use std::collections::BTreeMap;

  let mut counts: BTreeMap<String, u32> = BTreeMap::new();
  for entry in entries.iter().filter(|c| c.completed) {
    *counts.entry(entry.challenge_name.to_lowercase()).or_default() += 1;
  }
  let mut ranked: Vec<(String, u32)> = counts.into_iter().collect();
  ranked.sort_by(|a, b| b.1.cmp(&a.1));
  ranked.into_iter().take(3).map(|(name, _)| name).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemorySessionStore;

  fn tracker() -> PerformanceTracker {
    PerformanceTracker::new(Box::new(MemorySessionStore::default()))
  }

  fn fabricated(
    name: &str,
    world: WorldType,
    skills: &[&str],
    completed: bool,
    completion_time: i64,
  ) -> PerformanceEntry {
    PerformanceEntry {
      challenge_name: name.to_string(),
      world_type: world,
      difficulty: 2,
      start_time: 0,
      end_time: Some(completion_time),
      completion_time: Some(completion_time),
      hints_used: 1,
      attempts: 1,
      completed,
      accuracy: if completed { 100 } else { 0 },
      errors: vec![],
      skills_assessed: skills.iter().map(|s| s.to_string()).collect(),
    }
  }

  #[test]
  fn one_failed_then_one_successful_attempt_yields_fifty() {
    let mut t = tracker();
    t.start_challenge("API Debugging", WorldType::Backend, 2);
    t.record_attempt(false, Some("missing validation"));
    t.record_attempt(true, None);
    let entry = t.complete_challenge(true).unwrap();
    assert_eq!(entry.attempts, 2);
    assert_eq!(entry.accuracy, 50);
    assert_eq!(entry.errors, vec!["missing validation"]);
  }

  #[test]
  fn failed_completion_has_zero_accuracy() {
    let mut t = tracker();
    t.start_challenge("API Debugging", WorldType::Backend, 2);
    t.record_attempt(false, Some("nope"));
    let entry = t.complete_challenge(false).unwrap();
    assert!(!entry.completed);
    assert_eq!(entry.accuracy, 0);
  }

  #[test]
  fn completion_assigns_skills_from_the_taxonomy() {
    let mut t = tracker();
    t.start_challenge("Data Cleaning", WorldType::DataScience, 2);
    t.record_attempt(true, None);
    let entry = t.complete_challenge(true).unwrap();
    assert_eq!(
      entry.skills_assessed,
      vec!["Data Preprocessing", "Attention to Detail", "Data Quality"]
    );

    t.start_challenge("Unknown Thing", WorldType::Backend, 1);
    t.record_attempt(true, None);
    let entry = t.complete_challenge(true).unwrap();
    assert!(entry.skills_assessed.is_empty());
  }

  #[test]
  fn abandoning_a_challenge_leaves_history_untouched() {
    let mut t = tracker();
    t.start_challenge("API Debugging", WorldType::Backend, 2);
    t.record_attempt(false, Some("x"));
    // A new start discards the in-flight entry.
    t.start_challenge("Data Cleaning", WorldType::DataScience, 2);
    assert!(t.session().challenges.is_empty());
    t.record_attempt(true, None);
    t.complete_challenge(true);
    assert_eq!(t.session().challenges.len(), 1);
    assert_eq!(t.session().challenges[0].challenge_name, "Data Cleaning");
  }

  #[test]
  fn operations_are_noops_when_idle() {
    let mut t = tracker();
    t.record_attempt(false, Some("x"));
    t.record_hint_usage();
    assert!(t.complete_challenge(true).is_none());
    assert!(t.current_progress().is_none());
    assert_eq!(t.elapsed_time(), 0);
    assert_eq!(t.hint_count(), 0);
    assert!(t.session().challenges.is_empty());
  }

  #[test]
  fn skill_ranking_matches_a_hand_computed_fixture() {
    let mut session = SessionData::default();
    session.challenges = vec![
      fabricated("a", WorldType::Backend, &["Alpha"], true, 60_000),
      fabricated("b", WorldType::Backend, &["Bravo"], true, 600_000),
      fabricated("c", WorldType::Backend, &["Charlie"], false, 60_000),
      fabricated("d", WorldType::Backend, &["Delta"], true, 300_000),
      fabricated("e", WorldType::Backend, &["Echo"], true, 120_000),
      fabricated("e2", WorldType::Backend, &["Echo"], false, 120_000),
      fabricated("f", WorldType::Backend, &["Foxtrot"], true, 1_200_000),
    ];
    session.recompute();

    // Scores: Alpha 1.0, Delta 1.0 (exactly at the 5-minute pivot, no
    // penalty), Bravo 0.5, Echo 0.5, Foxtrot 0.25, Charlie 0.0.
    assert_eq!(session.skill_strengths, vec!["Alpha", "Delta", "Bravo"]);
    assert_eq!(session.skill_weaknesses, vec!["Echo", "Foxtrot", "Charlie"]);
  }

  #[test]
  fn small_sessions_overlap_strengths_and_weaknesses() {
    let mut session = SessionData::default();
    session.challenges = vec![
      fabricated("a", WorldType::Backend, &["Alpha", "Bravo"], true, 60_000),
    ];
    session.recompute();
    assert_eq!(session.skill_strengths, vec!["Alpha", "Bravo"]);
    assert_eq!(session.skill_weaknesses, vec!["Alpha", "Bravo"]);
  }

  #[test]
  fn aggregates_sum_time_and_average_accuracy() {
    let mut session = SessionData::default();
    let mut a = fabricated("a", WorldType::Backend, &[], true, 100_000);
    a.accuracy = 100;
    let mut b = fabricated("b", WorldType::Frontend, &[], false, 50_000);
    b.accuracy = 0;
    session.challenges = vec![a, b];
    session.recompute();
    assert_eq!(session.total_time, 150_000);
    assert!((session.average_accuracy - 50.0).abs() < f64::EPSILON);
  }

  #[test]
  fn preferred_world_ties_break_alphabetically() {
    let mut session = SessionData::default();
    session.challenges = vec![
      fabricated("a", WorldType::Frontend, &[], true, 1),
      fabricated("b", WorldType::Backend, &[], true, 1),
    ];
    session.recompute();
    assert_eq!(session.preferred_world_type, Some(WorldType::Backend));

    session.challenges = vec![
      fabricated("a", WorldType::Frontend, &[], true, 1),
      fabricated("b", WorldType::DataScience, &[], true, 1),
    ];
    session.recompute();
    assert_eq!(session.preferred_world_type, Some(WorldType::DataScience));

    session.challenges.push(fabricated("c", WorldType::Frontend, &[], true, 1));
    session.recompute();
    assert_eq!(session.preferred_world_type, Some(WorldType::Frontend));
  }

  #[test]
  fn world_performance_averages_and_preferred_types() {
    let mut t = tracker();
    t.session.challenges = vec![
      fabricated("API Debugging", WorldType::Backend, &[], true, 100_000),
      fabricated("API Debugging", WorldType::Backend, &[], true, 200_000),
      fabricated("Load Testing", WorldType::Backend, &[], false, 300_000),
    ];
    let perf = t.world_type_performance(WorldType::Backend).unwrap();
    assert!((perf.average_time - 200_000.0).abs() < f64::EPSILON);
    assert!((perf.success_rate - 2.0 / 3.0 * 100.0).abs() < 1e-9);
    assert!((perf.average_hints - 1.0).abs() < f64::EPSILON);
    assert_eq!(perf.challenges_completed, 3);
    // Only completed entries count toward preferred types.
    assert_eq!(perf.preferred_types, vec!["api debugging"]);

    assert!(t.world_type_performance(WorldType::Frontend).is_none());
  }

  #[test]
  fn report_round_trips_entry_count_and_totals() {
    let mut t = tracker();
    t.start_challenge("API Debugging", WorldType::Backend, 2);
    t.record_attempt(true, None);
    t.complete_challenge(true);
    t.start_challenge("Data Cleaning", WorldType::DataScience, 2);

    let raw = t.export_performance_report();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let summary = &parsed["sessionSummary"];
    assert_eq!(summary["challenges"].as_array().unwrap().len(), 1);
    assert_eq!(summary["totalTime"].as_i64().unwrap(), t.session().total_time);
    assert!(parsed["currentChallenge"]["challengeName"] == "Data Cleaning");
    assert!(parsed["timestamp"].as_str().is_some());

    // The summary deserializes back into the same session shape.
    let session: SessionData = serde_json::from_value(summary.clone()).unwrap();
    assert_eq!(session.challenges.len(), t.session().challenges.len());
    assert_eq!(session.total_time, t.session().total_time);
  }

  #[test]
  fn session_persists_across_tracker_instances() {
    let store = MemorySessionStore::default();
    let mut t = PerformanceTracker::new(Box::new(store.clone()));
    t.start_challenge("API Debugging", WorldType::Backend, 2);
    t.record_attempt(true, None);
    t.complete_challenge(true);

    let reloaded = PerformanceTracker::new(Box::new(store));
    assert_eq!(reloaded.session().challenges.len(), 1);
    assert_eq!(reloaded.session().preferred_world_type, Some(WorldType::Backend));
  }

  #[test]
  fn clear_session_resets_state_and_store() {
    let store = MemorySessionStore::default();
    let mut t = PerformanceTracker::new(Box::new(store.clone()));
    t.start_challenge("API Debugging", WorldType::Backend, 2);
    t.record_attempt(true, None);
    t.complete_challenge(true);
    t.clear_session_data();
    assert!(t.session().challenges.is_empty());
    assert!(PerformanceTracker::new(Box::new(store)).session().challenges.is_empty());
  }
}
