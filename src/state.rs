//! Application state: catalog, engine, tracker, clients, and prompts.
//!
//! Everything is explicitly constructed here and handed to consumers:
//! content lookup is a plain injected object, not a global singleton, and
//! the tracker owns the single live session behind an async lock.

use tokio::sync::RwLock;
use tracing::{info, instrument};

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::{load_agent_config_from_env, Prompts};
use crate::engine::ChallengeEngine;
use crate::openai::OpenAI;
use crate::remote::ChallengeApi;
use crate::store::FileSessionStore;
use crate::tracker::PerformanceTracker;

pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub engine: ChallengeEngine,
    pub tracker: RwLock<PerformanceTracker>,
    pub challenge_api: ChallengeApi,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from env: load config, build the catalog, restore the
    /// persisted session, init clients. Fails only on inconsistent built-in
    /// catalog tables.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Result<Self, String> {
        let cfg = load_agent_config_from_env().unwrap_or_default();
        let prompts = cfg.prompts.clone();

        let catalog = Arc::new(Catalog::new(&cfg.challenges)?);
        let engine = ChallengeEngine::new(catalog.clone());

        let store = FileSessionStore::from_env();
        let tracker = PerformanceTracker::new(Box::new(store));

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "careerquest_backend", base_url = %oa.base_url, fast_model = %oa.fast_model, strong_model = %oa.strong_model, "AI mentor enabled.");
        } else {
            info!(target: "careerquest_backend", "AI mentor disabled (no OPENAI_API_KEY). Using static fallbacks.");
        }

        let challenge_api = ChallengeApi::from_env();

        Ok(Self {
            catalog,
            engine,
            tracker: RwLock::new(tracker),
            challenge_api,
            openai,
            prompts,
        })
    }
}

/// State wired to in-memory storage and an unreachable challenge endpoint,
/// for handler tests.
#[cfg(test)]
pub fn test_state() -> Arc<AppState> {
    use crate::store::MemorySessionStore;
    use std::time::Duration;

    let catalog = Arc::new(Catalog::new(&[]).unwrap());
    Arc::new(AppState {
        catalog: catalog.clone(),
        engine: ChallengeEngine::new(catalog),
        tracker: RwLock::new(PerformanceTracker::new(Box::new(MemorySessionStore::default()))),
        challenge_api: ChallengeApi::new("http://127.0.0.1:9/".into(), Duration::from_secs(60)),
        openai: None,
        prompts: Prompts::default(),
    })
}
