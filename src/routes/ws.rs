//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::logic::*;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "careerquest_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "careerquest_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "careerquest_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "careerquest_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "careerquest_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::NewChallenge { world, name, difficulty } => {
      let challenge = serve_challenge(state, world, &name, difficulty).await;
      tracing::info!(target: "challenge", %world, %name, "WS challenge served");
      ServerWsMessage::Challenge { challenge }
    }

    ClientWsMessage::DynamicChallenge { world, difficulty, force_refresh } => {
      let challenge = serve_dynamic_challenge(state, world, difficulty, force_refresh).await;
      tracing::info!(target: "challenge", %world, difficulty, "WS dynamic challenge served");
      ServerWsMessage::DynamicChallenge { challenge }
    }

    ClientWsMessage::StartChallenge { world, name, difficulty } => {
      start_challenge(state, world, &name, difficulty).await;
      ServerWsMessage::Started { name }
    }

    ClientWsMessage::SubmitSolution { world, name, solution } => {
      let check = submit_solution(state, world, &name, &solution).await;
      tracing::info!(target: "challenge", %name, correct = check.correct, "WS solution evaluated");
      ServerWsMessage::SolutionResult { correct: check.correct, feedback: check.feedback }
    }

    ClientWsMessage::SubmitDynamicAnswer { world, difficulty, answer } => {
      let check = submit_dynamic_answer(state, world, difficulty, &answer).await;
      tracing::info!(target: "challenge", %world, correct = check.correct, "WS dynamic answer evaluated");
      ServerWsMessage::SolutionResult { correct: check.correct, feedback: check.feedback }
    }

    ClientWsMessage::Hint { world, name, difficulty } => {
      let text = get_hint_text(state, world, &name, difficulty).await;
      tracing::info!(target: "challenge", %name, "WS hint served");
      ServerWsMessage::Hint { text }
    }

    ClientWsMessage::CompleteChallenge { success } => {
      let (entry, session) = complete_challenge(state, success).await;
      ServerWsMessage::Completed { entry, session }
    }

    ClientWsMessage::Progress => ServerWsMessage::Progress { progress: current_progress(state).await },

    ClientWsMessage::WorldPerformance { world } => ServerWsMessage::WorldPerformance {
      performance: world_performance(state, world).await,
    },

    ClientWsMessage::Report => ServerWsMessage::Report { report: export_report(state).await },

    ClientWsMessage::Analysis => ServerWsMessage::Analysis {
      text: performance_analysis_text(state).await,
    },

    ClientWsMessage::Recommendation { world } => ServerWsMessage::Recommendation {
      text: career_recommendation_text(state, world).await,
    },

    ClientWsMessage::ClearSession => {
      clear_session(state).await;
      ServerWsMessage::SessionCleared
    }
  }
}
