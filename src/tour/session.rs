//! TourSession — the tour state machine.
//!
//! ```text
//!  Idle ──start──▶ Active ──next/prev/goto/target-missing──▶ Active
//!   ▲                 │
//!   └──── Closed ◀────┘  close / skip / past-the-end
//! ```
//!
//! `Closed` only exists for the duration of the finishing transition: the
//! tour is marked seen, listeners are told, and the session collapses back to
//! `Idle`. Nothing here returns an error; invalid requests are logged and
//! ignored so a broken tour can always be dismissed.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::navigation::NavigationBridge;
use crate::store::PersistenceStore;

use super::events::{FinishReason, TourEvent};
use super::model::Step;
use super::registry::TourRegistry;

/// Default broadcast channel capacity.
const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Active,
    Closed,
}

/// Read-only view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub current_tour: Option<String>,
    pub step_index: usize,
}

#[derive(Debug, Clone)]
struct ActiveRun {
    tour: String,
    run_id: Uuid,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

pub struct TourSession {
    registry: TourRegistry,
    navigation: NavigationBridge,
    persistence: Arc<PersistenceStore>,
    events: broadcast::Sender<TourEvent>,
    status: SessionStatus,
    run: Option<ActiveRun>,
    step_index: usize,
}

impl TourSession {
    pub fn new(
        registry: TourRegistry,
        navigation: NavigationBridge,
        persistence: Arc<PersistenceStore>,
    ) -> Self {
        let (events, _rx) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            registry,
            navigation,
            persistence,
            events,
            status: SessionStatus::Idle,
            run: None,
            step_index: 0,
        }
    }

    /// Subscribe to progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<TourEvent> {
        self.events.subscribe()
    }

    pub fn registry(&self) -> &TourRegistry {
        &self.registry
    }

    pub fn persistence(&self) -> &Arc<PersistenceStore> {
        &self.persistence
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn current_tour(&self) -> Option<&str> {
        self.run.as_ref().map(|r| r.tour.as_str())
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            current_tour: self.current_tour().map(str::to_string),
            step_index: self.step_index,
        }
    }

    /// Steps of the running tour; empty while idle.
    pub fn current_steps(&self) -> &[Step] {
        match &self.run {
            Some(run) => self.registry.steps_of(&run.tour),
            None => &[],
        }
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.current_steps().get(self.step_index)
    }

    /// Register or replace a tour. If the replaced tour is running, the
    /// session is kept inside the new bounds.
    pub fn register(&mut self, name: impl Into<String>, steps: Vec<Step>) {
        let name = name.into();
        self.registry.register(name.clone(), steps);

        if self.current_tour() != Some(name.as_str()) {
            return;
        }
        let len = self.registry.len_of(&name);
        if len == 0 {
            warn!(tour = %name, "Running tour re-registered without steps, ending it");
            self.finish(FinishReason::Replaced);
        } else if self.step_index >= len {
            warn!(tour = %name, index = self.step_index, len, "Running tour shrank, clamping step");
            self.step_index = len - 1;
        }
    }

    // ── Transitions ─────────────────────────────────────────────────

    /// Open `tour` at its first eligible step. Unknown or empty tours are
    /// ignored. Starting while another tour runs replaces it.
    pub fn start(&mut self, tour: &str) -> bool {
        let steps = self.registry.steps_of(tour);
        if steps.is_empty() {
            warn!(tour, "Ignoring start of unknown or empty tour");
            return false;
        }
        let Some(first) = next_eligible(steps, None, Direction::Forward) else {
            warn!(tour, "No step of this tour is currently eligible");
            return false;
        };
        let len = steps.len();

        if self.is_active() {
            self.finish(FinishReason::Replaced);
        }

        self.navigation
            .ensure_route(self.registry.steps_of(tour)[first].required_route.as_deref());

        let run_id = Uuid::new_v4();
        self.run = Some(ActiveRun {
            tour: tour.to_string(),
            run_id,
        });
        self.step_index = first;
        self.status = SessionStatus::Active;

        info!(tour, %run_id, index = first, steps = len, "Tour started");
        let _ = self.events.send(TourEvent::Started {
            run_id,
            tour: tour.to_string(),
            index: first,
            steps: len,
        });
        true
    }

    /// Jump to step `index`. Ignored when idle, out of range, or when the
    /// step's condition does not hold.
    pub fn go_to_step(&mut self, index: usize) -> bool {
        let Some(len) = self.active_len() else {
            debug!(index, "go_to_step while idle, ignoring");
            return false;
        };
        if index >= len {
            debug!(index, len, "go_to_step out of range, ignoring");
            return false;
        }
        if !self.current_steps()[index].is_eligible() {
            debug!(index, "go_to_step to an ineligible step, ignoring");
            return false;
        }
        self.move_to(index);
        true
    }

    pub fn next_step(&mut self) -> bool {
        self.advance_from(self.step_index)
    }

    pub fn prev_step(&mut self) -> bool {
        self.retreat_from(self.step_index)
    }

    /// Move past step `from`, closing the tour when nothing follows it.
    ///
    /// `from` may differ from the current index when the caller (the overlay
    /// renderer) is a tick behind.
    pub fn advance_from(&mut self, from: usize) -> bool {
        let Some(len) = self.active_len() else {
            debug!(from, "advance while idle, ignoring");
            return false;
        };
        if from >= len {
            debug!(from, len, "advance from out-of-range step, ignoring");
            return false;
        }
        match next_eligible(self.current_steps(), Some(from), Direction::Forward) {
            Some(index) => self.move_to(index),
            None => self.finish(FinishReason::Completed),
        }
        true
    }

    /// Move before step `from`. No-op at the first eligible step.
    pub fn retreat_from(&mut self, from: usize) -> bool {
        let Some(len) = self.active_len() else {
            debug!(from, "retreat while idle, ignoring");
            return false;
        };
        if from >= len {
            debug!(from, len, "retreat from out-of-range step, ignoring");
            return false;
        }
        match next_eligible(self.current_steps(), Some(from), Direction::Backward) {
            Some(index) => {
                self.move_to(index);
                true
            }
            None => false,
        }
    }

    /// The renderer could not find step `index`'s target. Skip ahead, or
    /// complete the tour if it was the last step.
    pub fn target_not_found_at(&mut self, index: usize) -> bool {
        let Some(len) = self.active_len() else {
            debug!(index, "target-missing while idle, ignoring");
            return false;
        };
        if index >= len {
            debug!(index, len, "target-missing for out-of-range step, ignoring");
            return false;
        }
        info!(
            tour = self.current_tour().unwrap_or_default(),
            index, "Tour target missing, skipping step"
        );
        match next_eligible(self.current_steps(), Some(index), Direction::Forward) {
            Some(next) => self.move_to(next),
            None => self.finish(FinishReason::Completed),
        }
        true
    }

    /// Dismiss the running tour. Marks it seen. Idempotent.
    pub fn close(&mut self) {
        self.finish(FinishReason::Closed);
    }

    /// User pressed skip. Same end state as `close`.
    pub fn skip(&mut self) {
        self.finish(FinishReason::Skipped);
    }

    /// End the run for `reason`. Every terminal path comes through here.
    pub fn finish(&mut self, reason: FinishReason) {
        let Some(run) = self.run.take() else {
            return;
        };
        self.status = SessionStatus::Closed;
        if reason.marks_seen() {
            self.persistence.mark_seen(&run.tour);
        }
        info!(tour = %run.tour, run_id = %run.run_id, %reason, "Tour finished");
        let _ = self.events.send(TourEvent::Finished {
            run_id: run.run_id,
            tour: run.tour,
            reason,
        });

        self.status = SessionStatus::Idle;
        self.step_index = 0;
    }

    // ── Internals ───────────────────────────────────────────────────

    fn active_len(&self) -> Option<usize> {
        if !self.is_active() {
            return None;
        }
        Some(self.current_steps().len()).filter(|len| *len > 0)
    }

    fn move_to(&mut self, index: usize) {
        let steps = self.current_steps();
        let len = steps.len();
        let route = steps[index].required_route.clone();
        self.navigation.ensure_route(route.as_deref());

        if index == self.step_index {
            return;
        }
        self.step_index = index;

        let Some(run) = &self.run else {
            return;
        };
        debug!(tour = %run.tour, index, "Tour step changed");
        let _ = self.events.send(TourEvent::StepChanged {
            run_id: run.run_id,
            tour: run.tour.clone(),
            index,
            steps: len,
        });
    }
}

/// First eligible index strictly after (or before) `from`. With `from =
/// None`, searches from the start.
fn next_eligible(steps: &[Step], from: Option<usize>, direction: Direction) -> Option<usize> {
    match direction {
        Direction::Forward => {
            let start = from.map_or(0, |i| i + 1);
            (start..steps.len()).find(|&i| steps[i].is_eligible())
        }
        Direction::Backward => {
            let end = from?;
            (0..end).rev().find(|&i| steps[i].is_eligible())
        }
    }
}
