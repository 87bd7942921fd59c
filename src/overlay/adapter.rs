//! OverlayAdapter — the seam between the session and the overlay renderer.
//!
//! Outbound, it projects the running tour into the renderer's step shape,
//! resolving every target against the page at the moment of projection.
//! Projections are plain data: strings, numbers and flags, no closures and no
//! references back into the session. Inbound, it decodes renderer callbacks
//! and applies the resulting command to the session.

use serde::Serialize;
use tracing::{debug, warn};

use crate::resolver::TargetResolver;
use crate::tour::model::{Placement, Step};
use crate::tour::session::TourSession;

use super::event::{OverlayCommand, RendererCallback};

/// A step as the overlay renderer consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererStep {
    pub target: String,
    pub title: String,
    pub content: String,
    pub placement: Placement,
    pub disable_beacon: bool,
    pub spotlight_padding: u32,
    pub disable_overlay: bool,
    pub show_skip_button: bool,
}

/// Everything the renderer needs for one render pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererProps {
    pub steps: Vec<RendererStep>,
    pub step_index: usize,
    pub run: bool,
}

pub struct OverlayAdapter {
    resolver: TargetResolver,
}

impl OverlayAdapter {
    pub fn new(resolver: TargetResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &TargetResolver {
        &self.resolver
    }

    /// Project one step, substituting its resolved anchor. Centered anchors
    /// (including degraded ones) force centered placement.
    pub fn project_step(&self, step: &Step) -> RendererStep {
        let anchor = self.resolver.resolve(&step.target);
        let placement = if anchor.is_whole_screen() {
            Placement::Center
        } else {
            step.placement
        };
        RendererStep {
            target: anchor.render_target().to_string(),
            title: step.title.clone(),
            content: step.content.clone(),
            placement,
            disable_beacon: step.disable_beacon,
            spotlight_padding: step.spotlight_padding,
            disable_overlay: step.disable_overlay,
            show_skip_button: step.show_skip_button,
        }
    }

    /// Project the running tour. Idle sessions produce an empty, stopped
    /// renderer.
    pub fn props(&self, session: &TourSession) -> RendererProps {
        RendererProps {
            steps: session
                .current_steps()
                .iter()
                .map(|step| self.project_step(step))
                .collect(),
            step_index: session.step_index(),
            run: session.is_active(),
        }
    }

    /// Project only the step about to be shown.
    pub fn current(&self, session: &TourSession) -> Option<RendererStep> {
        session.current_step().map(|step| self.project_step(step))
    }

    /// Classify a renderer callback and apply it. Returns the command that
    /// was applied, if the callback carried one.
    pub fn handle(
        &self,
        session: &mut TourSession,
        callback: &RendererCallback,
    ) -> Option<OverlayCommand> {
        let command = callback.classify()?;
        if session.is_active() && callback.index != session.step_index() {
            debug!(
                renderer_index = callback.index,
                session_index = session.step_index(),
                "Renderer callback refers to a different step, using its index"
            );
        }
        apply(session, command);
        Some(command)
    }

    /// Decode a raw JSON callback and apply it. Malformed payloads are
    /// logged and dropped.
    pub fn handle_json(
        &self,
        session: &mut TourSession,
        payload: &serde_json::Value,
    ) -> Option<OverlayCommand> {
        match serde_json::from_value::<RendererCallback>(payload.clone()) {
            Ok(callback) => self.handle(session, &callback),
            Err(e) => {
                warn!(error = %e, %payload, "Ignoring malformed renderer callback");
                None
            }
        }
    }
}

fn apply(session: &mut TourSession, command: OverlayCommand) {
    match command {
        OverlayCommand::Advance { from } => {
            session.advance_from(from);
        }
        OverlayCommand::Retreat { from } => {
            session.retreat_from(from);
        }
        OverlayCommand::TargetMissing { index } => {
            session.target_not_found_at(index);
        }
        OverlayCommand::Terminate { reason } => session.finish(reason.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::navigation::{MemoryNavigator, NavigationBridge, Navigator};
    use crate::overlay::event::{CallbackType, RendererAction, RendererStatus, TerminateReason};
    use crate::resolver::{PageElement, PageOracle, StaticPage, WHOLE_SCREEN_TARGET};
    use crate::store::{MemoryBackend, PersistenceStore, SettingsStore};
    use crate::tour::registry::TourRegistry;
    use crate::tour::session::SessionStatus;

    struct Fixture {
        session: TourSession,
        adapter: OverlayAdapter,
        page: Arc<StaticPage>,
    }

    async fn fixture() -> Fixture {
        let backend: Arc<dyn SettingsStore> = Arc::new(MemoryBackend::new());
        let persistence = Arc::new(PersistenceStore::load(backend, "default").await);
        let nav: Arc<dyn Navigator> = Arc::new(MemoryNavigator::new("/"));
        let mut session =
            TourSession::new(TourRegistry::new(), NavigationBridge::new(nav), persistence);
        session.register(
            "demo",
            vec![
                Step::new("#sidebar", "Sidebar", "Navigate here"),
                Step::new("#missing", "Gone", "Never rendered"),
                Step::centered("Done", "That's it"),
            ],
        );

        let page = Arc::new(StaticPage::new());
        page.insert(PageElement::new("nav").with_id("sidebar"));
        let adapter =
            OverlayAdapter::new(TargetResolver::new(Arc::clone(&page) as Arc<dyn PageOracle>));
        Fixture {
            session,
            adapter,
            page,
        }
    }

    fn cb(action: RendererAction, index: usize, kind: CallbackType) -> RendererCallback {
        RendererCallback::new(action, index, RendererStatus::Running, kind)
    }

    #[tokio::test]
    async fn idle_session_projects_nothing() {
        let f = fixture().await;
        let props = f.adapter.props(&f.session);
        assert!(props.steps.is_empty());
        assert!(!props.run);
        assert!(f.adapter.current(&f.session).is_none());
    }

    #[tokio::test]
    async fn projection_substitutes_resolved_anchors() {
        let mut f = fixture().await;
        f.session.start("demo");

        let props = f.adapter.props(&f.session);
        assert!(props.run);
        assert_eq!(props.step_index, 0);
        assert_eq!(props.steps.len(), 3);

        assert_eq!(props.steps[0].target, "#sidebar");
        assert_eq!(props.steps[0].placement, Placement::Bottom);
        // Missing element degrades to a centered presentation.
        assert_eq!(props.steps[1].target, WHOLE_SCREEN_TARGET);
        assert_eq!(props.steps[1].placement, Placement::Center);
        assert_eq!(props.steps[2].target, WHOLE_SCREEN_TARGET);
    }

    #[tokio::test]
    async fn projection_is_plain_json() {
        let mut f = fixture().await;
        f.session.start("demo");
        let json = serde_json::to_value(f.adapter.props(&f.session)).unwrap();

        assert_eq!(json["run"], true);
        assert_eq!(json["stepIndex"], 0);
        let step = &json["steps"][0];
        assert_eq!(step["target"], "#sidebar");
        assert_eq!(step["disableBeacon"], true);
        assert_eq!(step["spotlightPadding"], 8);
        assert_eq!(step["showSkipButton"], true);
        assert_eq!(step["placement"], "bottom");
    }

    #[tokio::test]
    async fn projection_rechecks_the_page() {
        let mut f = fixture().await;
        f.session.start("demo");
        f.session.next_step();
        assert_eq!(
            f.adapter.current(&f.session).unwrap().target,
            WHOLE_SCREEN_TARGET
        );

        f.page.insert(PageElement::new("div").with_id("missing"));
        assert_eq!(f.adapter.current(&f.session).unwrap().target, "#missing");
    }

    #[tokio::test]
    async fn callbacks_drive_the_session() {
        let mut f = fixture().await;
        f.session.start("demo");

        let applied = f
            .adapter
            .handle(&mut f.session, &cb(RendererAction::Next, 0, CallbackType::StepAfter));
        assert_eq!(applied, Some(OverlayCommand::Advance { from: 0 }));
        assert_eq!(f.session.step_index(), 1);

        f.adapter
            .handle(&mut f.session, &cb(RendererAction::Prev, 1, CallbackType::StepAfter));
        assert_eq!(f.session.step_index(), 0);

        // step:before is informational.
        let applied = f
            .adapter
            .handle(&mut f.session, &cb(RendererAction::Next, 0, CallbackType::StepBefore));
        assert_eq!(applied, None);
        assert_eq!(f.session.step_index(), 0);
    }

    #[tokio::test]
    async fn lagging_renderer_uses_payload_index() {
        let mut f = fixture().await;
        f.session.start("demo");
        f.session.go_to_step(2);

        // Renderer still thinks it is on step 0.
        f.adapter
            .handle(&mut f.session, &cb(RendererAction::Next, 0, CallbackType::StepAfter));
        assert_eq!(f.session.step_index(), 1);
        assert!(f.session.is_active());
    }

    #[tokio::test]
    async fn target_missing_on_last_step_completes() {
        let mut f = fixture().await;
        f.session.start("demo");
        f.session.go_to_step(2);

        let applied = f.adapter.handle(
            &mut f.session,
            &cb(RendererAction::Next, 2, CallbackType::TargetNotFound),
        );
        assert_eq!(applied, Some(OverlayCommand::TargetMissing { index: 2 }));
        assert_eq!(f.session.status(), SessionStatus::Idle);
        assert!(f.session.persistence().has_seen("demo"));
    }

    #[tokio::test]
    async fn skip_and_close_terminate() {
        let mut f = fixture().await;
        f.session.start("demo");
        let applied = f.adapter.handle(
            &mut f.session,
            &RendererCallback::new(
                RendererAction::Skip,
                0,
                RendererStatus::Skipped,
                CallbackType::StepAfter,
            ),
        );
        assert_eq!(
            applied,
            Some(OverlayCommand::Terminate {
                reason: TerminateReason::Skipped
            })
        );
        assert_eq!(f.session.status(), SessionStatus::Idle);
        assert!(f.session.persistence().has_seen("demo"));

        // A trailing close after the session is already idle changes nothing.
        f.adapter
            .handle(&mut f.session, &cb(RendererAction::Close, 0, CallbackType::StepAfter));
        assert_eq!(f.session.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn malformed_json_is_ignored() {
        let mut f = fixture().await;
        f.session.start("demo");
        let applied = f
            .adapter
            .handle_json(&mut f.session, &serde_json::json!({"action": "next"}));
        assert!(applied.is_none());
        assert_eq!(f.session.step_index(), 0);

        let applied = f.adapter.handle_json(
            &mut f.session,
            &serde_json::json!({
                "action": "next", "index": 0, "status": "running", "type": "step:after"
            }),
        );
        assert_eq!(applied, Some(OverlayCommand::Advance { from: 0 }));
        assert_eq!(f.session.step_index(), 1);
    }
}
