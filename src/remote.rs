//! Client for the remote challenge-generation endpoint.
//!
//! POSTs `{occupation, difficulty}` and expects `{question, answer?, hint?}`.
//! Responses are cached per (occupation, difficulty) with a TTL so repeated
//! requests within a session reuse the result; expired entries are deleted
//! lazily on the next lookup. Every failure path degrades to a fixed
//! fallback payload, so callers never see a transport error. Fallbacks are
//! not cached so a later retry can reach the service again.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, instrument};

use crate::domain::RemoteChallenge;
use crate::tracker::now_ms;

const DEFAULT_ENDPOINT: &str =
  "https://mlnc0zllig.execute-api.us-west-2.amazonaws.com/task-function";
const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

pub struct ChallengeApi {
  client: reqwest::Client,
  endpoint: String,
  ttl_ms: i64,
  cache: RwLock<HashMap<(String, u8), CacheEntry>>,
}

struct CacheEntry {
  data: RemoteChallenge,
  fetched_at: i64,
}

#[derive(Serialize)]
struct ChallengeRequest<'a> {
  occupation: &'a str,
  difficulty: u8,
}

impl ChallengeApi {
  pub fn new(endpoint: String, ttl: Duration) -> Self {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .unwrap_or_default();
    Self {
      client,
      endpoint,
      ttl_ms: ttl.as_millis() as i64,
      cache: RwLock::new(HashMap::new()),
    }
  }

  /// Endpoint from CHALLENGE_API_URL, TTL from CHALLENGE_CACHE_TTL_SECS.
  #[instrument(level = "info")]
  pub fn from_env() -> Self {
    let endpoint =
      std::env::var("CHALLENGE_API_URL").unwrap_or_else(|_| DEFAULT_ENDPOINT.into());
    let ttl = std::env::var("CHALLENGE_CACHE_TTL_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .map(Duration::from_secs)
      .unwrap_or(DEFAULT_TTL);
    info!(target: "careerquest_backend", %endpoint, ttl_secs = ttl.as_secs(), "Challenge API configured");
    Self::new(endpoint, ttl)
  }

  /// Fetch a dynamic challenge, serving from cache within the TTL. Never
  /// fails: any upstream problem yields the fallback payload.
  #[instrument(level = "info", skip(self), fields(%occupation, difficulty, force_refresh))]
  pub async fn fetch(
    &self,
    occupation: &str,
    difficulty: u8,
    force_refresh: bool,
  ) -> RemoteChallenge {
    let key = (occupation.to_string(), difficulty);
    let now = now_ms();

    if !force_refresh {
      let cached = {
        let cache = self.cache.read().await;
        cache.get(&key).map(|e| (e.data.clone(), now - e.fetched_at))
      };
      match cached {
        Some((data, age)) if age < self.ttl_ms => {
          info!(target: "challenge", %occupation, difficulty, age_ms = age, "Serving cached dynamic challenge");
          return data;
        }
        Some(_) => {
          // Expired; delete lazily before refetching.
          self.cache.write().await.remove(&key);
        }
        None => {}
      }
    }

    match self.fetch_upstream(occupation, difficulty).await {
      Ok(data) => {
        self
          .cache
          .write()
          .await
          .insert(key, CacheEntry { data: data.clone(), fetched_at: now });
        data
      }
      Err(e) => {
        error!(target: "challenge", %occupation, difficulty, error = %e, "Dynamic challenge fetch failed; serving fallback");
        fallback_challenge(occupation, difficulty)
      }
    }
  }

  async fn fetch_upstream(
    &self,
    occupation: &str,
    difficulty: u8,
  ) -> Result<RemoteChallenge, String> {
    let res = self
      .client
      .post(&self.endpoint)
      .header(USER_AGENT, "careerquest-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&ChallengeRequest { occupation, difficulty })
      .send()
      .await
      .map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      return Err(format!("HTTP {}", res.status()));
    }

    // `question` must be a string; anything else is an invalid payload.
    res
      .json::<RemoteChallenge>()
      .await
      .map_err(|e| format!("invalid challenge format from API: {e}"))
  }

  pub async fn clear_cache(&self) {
    self.cache.write().await.clear();
  }
}

fn fallback_challenge(occupation: &str, difficulty: u8) -> RemoteChallenge {
  RemoteChallenge {
    question: format!(
      "Dynamic challenge service unavailable. Please try again later.\n\n(Occupation: {occupation}, Difficulty: {difficulty})"
    ),
    answer: None,
    hint: Some("Service fallback: check network or API configuration.".into()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  use axum::{routing::post, Json, Router};

  async fn spawn_counting_server(hits: Arc<AtomicUsize>) -> String {
    let app = Router::new().route(
      "/",
      post(move || {
        let hits = hits.clone();
        async move {
          hits.fetch_add(1, Ordering::SeqCst);
          Json(serde_json::json!({
            "question": "Which structure gives O(1) lookups?",
            "answer": "B",
            "hint": "Think about hashing."
          }))
        }
      }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
  }

  #[tokio::test]
  async fn cache_serves_within_ttl_and_refetches_after_expiry() {
    let hits = Arc::new(AtomicUsize::new(0));
    let endpoint = spawn_counting_server(hits.clone()).await;
    let api = ChallengeApi::new(endpoint, Duration::from_millis(80));

    let a = api.fetch("Backend Engineer", 2, false).await;
    let b = api.fetch("Backend Engineer", 2, false).await;
    assert_eq!(a, b);
    assert_eq!(hits.load(Ordering::SeqCst), 1, "second lookup must hit the cache");

    tokio::time::sleep(Duration::from_millis(120)).await;
    let c = api.fetch("Backend Engineer", 2, false).await;
    assert_eq!(c.question, a.question);
    assert_eq!(hits.load(Ordering::SeqCst), 2, "expired entry must refetch");
  }

  #[tokio::test]
  async fn cache_keys_include_difficulty() {
    let hits = Arc::new(AtomicUsize::new(0));
    let endpoint = spawn_counting_server(hits.clone()).await;
    let api = ChallengeApi::new(endpoint, Duration::from_secs(60));

    api.fetch("Data Scientist", 1, false).await;
    api.fetch("Data Scientist", 2, false).await;
    api.fetch("Data Scientist", 1, false).await;
    assert_eq!(hits.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn force_refresh_bypasses_the_cache() {
    let hits = Arc::new(AtomicUsize::new(0));
    let endpoint = spawn_counting_server(hits.clone()).await;
    let api = ChallengeApi::new(endpoint, Duration::from_secs(60));

    api.fetch("Backend Engineer", 3, false).await;
    api.fetch("Backend Engineer", 3, true).await;
    assert_eq!(hits.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn unreachable_endpoint_yields_uncached_fallback() {
    // Port 9 (discard) is not listening in test environments.
    let api = ChallengeApi::new("http://127.0.0.1:9/".into(), Duration::from_secs(60));
    let challenge = api.fetch("Backend Engineer", 2, false).await;
    assert!(challenge.question.contains("unavailable"));
    assert!(challenge.question.contains("Backend Engineer"));
    assert!(challenge.answer.is_none());
    assert!(api.cache.read().await.is_empty(), "fallbacks must not be cached");
  }

  #[tokio::test]
  async fn malformed_payload_yields_fallback() {
    let app = Router::new().route(
      "/",
      post(|| async { Json(serde_json::json!({ "unexpected": true })) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });

    let api = ChallengeApi::new(format!("http://{addr}/"), Duration::from_secs(60));
    let challenge = api.fetch("Frontend Engineer", 4, false).await;
    assert!(challenge.question.contains("unavailable"));
  }
}
