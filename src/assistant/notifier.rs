//! AssistantNotifier — turns tour progress into assistant chatter.
//!
//! Listens to `TourEvent`s and pushes canned messages to the assistant
//! widget at a few milestones. It holds no handle back into the session.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::tour::catalog::KnownTour;
use crate::tour::events::{FinishReason, TourEvent};

use super::model::AssistantChannel;

const FIRST_STEP: &str = "Let's get started! I'll walk you through it step by step.";
const MIDPOINT: &str = "You're halfway there, nice work.";
const ALMOST_DONE: &str = "Almost done, just one more after this.";
const GENERIC_COMPLETE: &str = "Tour complete! Ask me anytime if you need a refresher.";

/// Which milestone a step index lands on, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    FirstStep,
    Midpoint,
    AlmostDone,
}

impl Milestone {
    /// First step wins over penultimate, which wins over midpoint.
    pub fn for_step(index: usize, len: usize) -> Option<Self> {
        if len == 0 || index >= len {
            return None;
        }
        if index == 0 {
            return Some(Self::FirstStep);
        }
        if len >= 3 && index == len - 2 {
            return Some(Self::AlmostDone);
        }
        if len >= 4 && index == (len - 1) / 2 {
            return Some(Self::Midpoint);
        }
        None
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::FirstStep => FIRST_STEP,
            Self::Midpoint => MIDPOINT,
            Self::AlmostDone => ALMOST_DONE,
        }
    }
}

/// Completion message for `tour`, falling back to a generic one.
pub fn completion_message(tour: &str) -> &'static str {
    match KnownTour::from_name(tour) {
        Some(KnownTour::Main) => "That's the grand tour! You know your way around now.",
        Some(KnownTour::Dashboard) => "Dashboard tour done. Your numbers will be waiting here.",
        Some(KnownTour::Projects) => "You're ready to start your first project.",
        Some(KnownTour::Chat) => "Chat tour done. Say hi whenever you like!",
        Some(KnownTour::Settings) => "Settings covered. Make me your own!",
        None => GENERIC_COMPLETE,
    }
}

pub struct AssistantNotifier {
    channel: Arc<dyn AssistantChannel>,
}

impl AssistantNotifier {
    pub fn new(channel: Arc<dyn AssistantChannel>) -> Self {
        Self { channel }
    }

    /// The message an event should produce, if any. Only completed runs get
    /// a completion message; skipped, closed and replaced runs stay quiet.
    pub fn message_for(event: &TourEvent) -> Option<&'static str> {
        match event {
            TourEvent::Started { index, steps, .. }
            | TourEvent::StepChanged { index, steps, .. } => {
                Milestone::for_step(*index, *steps).map(|m| m.message())
            }
            TourEvent::Finished {
                tour,
                reason: FinishReason::Completed,
                ..
            } => Some(completion_message(tour)),
            TourEvent::Finished { .. } => None,
        }
    }

    pub fn handle(&self, event: &TourEvent) {
        if let Some(message) = Self::message_for(event) {
            debug!(tour = %event.tour(), message, "Assistant message");
            self.channel.set_message(message);
        }
    }

    /// Consume events until the session goes away.
    pub fn spawn(self, mut rx: broadcast::Receiver<TourEvent>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => self.handle(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Assistant notifier lagged behind tour events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
