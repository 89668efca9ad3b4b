use crate::render::Renderer;
use anyhow::{Context, Result};
use pdf_chat::{ClaudeService, Config, ContextBudget, PdfExtractor, SessionController, SessionState};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

struct SessionSlot {
    state: Arc<Mutex<SessionState>>,
    last_seen: Instant,
}

/// One lock per session, so a session's actions run one at a time.
/// Sessions idle for longer than the TTL are dropped.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, SessionSlot>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Looks up the session for `id`, creating a fresh one when the id is absent,
    /// unknown or expired. The returned flag is true when a new session was created.
    pub async fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, Arc<Mutex<SessionState>>, bool) {
        self.get_or_create_at(id, Instant::now()).await
    }

    async fn get_or_create_at(
        &self,
        id: Option<Uuid>,
        now: Instant,
    ) -> (Uuid, Arc<Mutex<SessionState>>, bool) {
        let mut sessions = self.sessions.lock().await;

        if let Some(id) = id {
            if let Some(slot) = sessions.get_mut(&id) {
                if now.saturating_duration_since(slot.last_seen) <= self.ttl {
                    slot.last_seen = now;
                    return (id, slot.state.clone(), false);
                }
            }
        }

        let before = sessions.len();
        let ttl = self.ttl;
        sessions.retain(|_, slot| now.saturating_duration_since(slot.last_seen) <= ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            log::info!("Evicted {} idle session(s)", evicted);
        }

        let id = Uuid::new_v4();
        let state = Arc::new(Mutex::new(SessionState::new()));
        sessions.insert(
            id,
            SessionSlot {
                state: state.clone(),
                last_seen: now,
            },
        );
        log::info!("Started session {} ({} active)", id, sessions.len());
        (id, state, true)
    }
}

pub struct AppState {
    pub controller: SessionController,
    pub sessions: SessionStore,
    pub renderer: Renderer,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        log::info!("Initializing chat services...");

        let answer_service = Arc::new(ClaudeService::new(config)?);
        let budget = ContextBudget::new(config.context_token_limit)?;
        let controller = SessionController::new(
            answer_service,
            Arc::new(PdfExtractor::new()),
            budget,
            config.max_upload_bytes,
        );

        let state = Self::with_controller(controller, config.session_ttl)?;
        log::info!("Chat services initialized with model {}", config.model);
        Ok(state)
    }

    pub fn with_controller(controller: SessionController, session_ttl: Duration) -> Result<Self> {
        let renderer = Renderer::new(controller.model(), controller.max_upload_bytes())
            .context("failed to load page template")?;
        Ok(Self {
            controller,
            sessions: SessionStore::new(session_ttl),
            renderer,
        })
    }
}
