//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs include parameters and basic result info.

use std::sync::Arc;

use axum::{extract::{Query, State}, response::IntoResponse, Json};
use tracing::{info, instrument};

use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state), fields(world = %q.world, name = %q.name))]
pub async fn http_get_challenge(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ChallengeQuery>,
) -> impl IntoResponse {
  let out = serve_challenge(&state, q.world, &q.name, q.difficulty).await;
  info!(target: "challenge", world = %q.world, name = %q.name, "HTTP challenge served");
  Json(out)
}

#[instrument(level = "info", skip(state), fields(world = %q.world))]
pub async fn http_list_challenges(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ChallengesQuery>,
) -> impl IntoResponse {
  Json(list_challenges(&state, q.world, q.difficulty).await)
}

#[instrument(level = "info", skip(state), fields(q = %q.q))]
pub async fn http_search_challenges(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SearchQuery>,
) -> impl IntoResponse {
  Json(search_challenges(&state, &q.q).await)
}

#[instrument(level = "info", skip(state), fields(world = %q.world))]
pub async fn http_get_random_challenge(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ChallengesQuery>,
) -> impl IntoResponse {
  Json(serve_random_challenge(&state, q.world, q.difficulty).await)
}

#[instrument(level = "info", skip(state), fields(world = %q.world))]
pub async fn http_get_skills(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SkillsQuery>,
) -> impl IntoResponse {
  Json(SkillsOut { skills: world_skills(&state, q.world).await })
}

#[instrument(level = "info", skip(state), fields(world = %q.world, difficulty = q.difficulty))]
pub async fn http_get_dynamic_challenge(
  State(state): State<Arc<AppState>>,
  Query(q): Query<DynamicChallengeQuery>,
) -> impl IntoResponse {
  let out = serve_dynamic_challenge(&state, q.world, q.difficulty, q.force_refresh).await;
  info!(target: "challenge", world = %q.world, difficulty = q.difficulty, "HTTP dynamic challenge served");
  Json(out)
}

#[instrument(level = "info", skip(state, body), fields(world = %body.world, name = %body.name))]
pub async fn http_post_start(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StartIn>,
) -> impl IntoResponse {
  start_challenge(&state, body.world, &body.name, body.difficulty).await;
  Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state, body), fields(world = %body.world, name = %body.name, solution_len = body.solution.len()))]
pub async fn http_post_solution(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SolutionIn>,
) -> impl IntoResponse {
  let check = submit_solution(&state, body.world, &body.name, &body.solution).await;
  info!(target: "challenge", name = %body.name, correct = check.correct, "HTTP solution evaluated");
  Json(SolutionOut { correct: check.correct, feedback: check.feedback })
}

#[instrument(level = "info", skip(state, body), fields(world = %body.world, difficulty = body.difficulty))]
pub async fn http_post_dynamic_answer(
  State(state): State<Arc<AppState>>,
  Json(body): Json<DynamicAnswerIn>,
) -> impl IntoResponse {
  let check = submit_dynamic_answer(&state, body.world, body.difficulty, &body.answer).await;
  info!(target: "challenge", world = %body.world, correct = check.correct, "HTTP dynamic answer evaluated");
  Json(SolutionOut { correct: check.correct, feedback: check.feedback })
}

#[instrument(level = "info", skip(state), fields(world = %q.world, name = %q.name))]
pub async fn http_get_hint(
  State(state): State<Arc<AppState>>,
  Query(q): Query<HintQuery>,
) -> impl IntoResponse {
  let text = get_hint_text(&state, q.world, &q.name, q.difficulty).await;
  info!(target: "challenge", name = %q.name, "HTTP hint served");
  Json(HintOut { text })
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_complete(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CompleteIn>,
) -> impl IntoResponse {
  let (entry, session) = complete_challenge(&state, body.success).await;
  Json(CompleteOut { entry, session })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(ProgressOut { progress: current_progress(&state).await })
}

#[instrument(level = "info", skip(state), fields(world = %q.world))]
pub async fn http_get_performance(
  State(state): State<Arc<AppState>>,
  Query(q): Query<PerformanceQuery>,
) -> impl IntoResponse {
  Json(world_performance(&state, q.world).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_report(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(ReportOut { report: export_report(&state).await })
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_analysis(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let text = performance_analysis_text(&state).await;
  Json(TextOut { text })
}

#[instrument(level = "info", skip(state, body), fields(world = %body.world))]
pub async fn http_post_recommendation(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RecommendationIn>,
) -> impl IntoResponse {
  let text = career_recommendation_text(&state, body.world).await;
  Json(TextOut { text })
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_clear_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  clear_session(&state).await;
  info!(target: "careerquest_backend", "Session cleared");
  Json(HealthOut { ok: true })
}
