//! TourEngine — the explicitly constructed tour runtime.
//!
//! One engine per application. The UI layer owns it and passes it (or a
//! handle to it) to whatever needs to start tours or relay renderer
//! callbacks. All operations run on the UI event loop and complete before the
//! next event is processed.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::assistant::{
    AssistantNotifier, AssistantSettings, AssistantState, Personality, SharedAssistant,
};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::navigation::{NavigationBridge, Navigator};
use crate::overlay::{OverlayAdapter, OverlayCommand, RendererCallback, RendererProps, RendererStep};
use crate::resolver::{PageOracle, TargetResolver};
use crate::store::{LibSqlBackend, MemoryBackend, PersistenceStore, SettingsStore};
use crate::tour::{SessionSnapshot, Step, TourEvent, TourRegistry, TourSession};

/// External collaborators the engine drives.
pub struct EngineDeps {
    pub navigator: Arc<dyn Navigator>,
    pub page: Arc<dyn PageOracle>,
    pub settings: Arc<dyn SettingsStore>,
}

pub struct TourEngine {
    config: EngineConfig,
    session: TourSession,
    overlay: OverlayAdapter,
    persistence: Arc<PersistenceStore>,
    assistant: SharedAssistant,
    notifier: Option<JoinHandle<()>>,
}

impl TourEngine {
    /// Build an engine: load persisted settings, seed the built-in tours and
    /// start the assistant notifier.
    pub async fn new(config: EngineConfig, deps: EngineDeps) -> Self {
        let persistence = Arc::new(PersistenceStore::load(deps.settings, &config.user_id).await);
        let assistant = SharedAssistant::new(AssistantState::from_settings(
            persistence.assistant_settings(),
        ));

        let session = TourSession::new(
            TourRegistry::with_builtin(),
            NavigationBridge::new(deps.navigator),
            Arc::clone(&persistence),
        );
        let overlay = OverlayAdapter::new(TargetResolver::new(deps.page));

        let notifier = config.notify_assistant.then(|| {
            AssistantNotifier::new(Arc::new(assistant.clone())).spawn(session.subscribe())
        });

        info!(
            user_id = %config.user_id,
            tours = session.registry().count(),
            seen = persistence.seen_tours().len(),
            "Tour engine ready"
        );

        Self {
            config,
            session,
            overlay,
            persistence,
            assistant,
            notifier,
        }
    }

    /// Open the settings backend named by `config`: a libSQL file when a
    /// path is set, otherwise an in-memory store.
    pub async fn open_settings(config: &EngineConfig) -> Result<Arc<dyn SettingsStore>> {
        match &config.db_path {
            Some(path) => Ok(Arc::new(LibSqlBackend::new_local(path).await?)),
            None => Ok(Arc::new(MemoryBackend::new())),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> &TourSession {
        &self.session
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<TourEvent> {
        self.session.subscribe()
    }

    // ── Tours ───────────────────────────────────────────────────────

    pub fn register_tour(&mut self, name: impl Into<String>, steps: Vec<Step>) {
        self.session.register(name, steps);
    }

    /// Start `tour`, or the configured default tour when `None`.
    pub fn start(&mut self, tour: Option<&str>) -> bool {
        let name = tour.unwrap_or(&self.config.default_tour).to_string();
        self.session.start(&name)
    }

    /// Start `tour` unless the user has already seen it.
    pub fn start_if_unseen(&mut self, tour: &str) -> bool {
        if self.persistence.has_seen(tour) {
            tracing::debug!(tour, "Tour already seen, not auto-starting");
            return false;
        }
        self.session.start(tour)
    }

    pub fn next_step(&mut self) -> bool {
        self.session.next_step()
    }

    pub fn prev_step(&mut self) -> bool {
        self.session.prev_step()
    }

    pub fn go_to_step(&mut self, index: usize) -> bool {
        self.session.go_to_step(index)
    }

    pub fn target_not_found_at(&mut self, index: usize) -> bool {
        self.session.target_not_found_at(index)
    }

    pub fn close(&mut self) {
        self.session.close();
    }

    pub fn skip(&mut self) {
        self.session.skip();
    }

    // ── Overlay renderer ────────────────────────────────────────────

    pub fn renderer_props(&self) -> RendererProps {
        self.overlay.props(&self.session)
    }

    pub fn current_renderer_step(&self) -> Option<RendererStep> {
        self.overlay.current(&self.session)
    }

    pub fn handle_renderer_callback(
        &mut self,
        callback: &RendererCallback,
    ) -> Option<OverlayCommand> {
        self.overlay.handle(&mut self.session, callback)
    }

    pub fn handle_renderer_json(&mut self, payload: &serde_json::Value) -> Option<OverlayCommand> {
        self.overlay.handle_json(&mut self.session, payload)
    }

    // ── Seen tours ──────────────────────────────────────────────────

    pub fn has_seen(&self, tour: &str) -> bool {
        self.persistence.has_seen(tour)
    }

    pub fn mark_seen(&self, tour: &str) {
        self.persistence.mark_seen(tour);
    }

    pub fn reset_seen_tours(&self) {
        self.persistence.reset_seen();
    }

    // ── Assistant ───────────────────────────────────────────────────

    pub fn assistant(&self) -> AssistantState {
        self.assistant.snapshot()
    }

    pub fn set_assistant_visible(&self, visible: bool) {
        self.persistence.set_assistant_visible(visible);
        self.sync_assistant();
    }

    /// Flip assistant visibility, returning the new value.
    pub fn toggle_assistant(&self) -> bool {
        let visible = !self.persistence.assistant_settings().visible;
        self.set_assistant_visible(visible);
        visible
    }

    pub fn set_assistant_name(&self, name: &str) {
        self.persistence.set_assistant_name(name);
        self.sync_assistant();
    }

    pub fn set_assistant_avatar(&self, avatar: &str) {
        self.persistence.set_assistant_avatar(avatar);
        self.sync_assistant();
    }

    pub fn set_assistant_personality(&self, personality: Personality) {
        self.persistence.set_assistant_personality(personality);
        self.sync_assistant();
    }

    pub fn assistant_settings(&self) -> AssistantSettings {
        self.persistence.assistant_settings()
    }

    fn sync_assistant(&self) {
        self.assistant
            .apply_settings(&self.persistence.assistant_settings());
    }

    /// Flush pending settings writes and stop the notifier.
    pub async fn shutdown(mut self) {
        self.persistence.flush().await;
        if let Some(handle) = self.notifier.take() {
            handle.abort();
        }
        info!("Tour engine stopped");
    }
}
