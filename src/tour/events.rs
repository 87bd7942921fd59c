//! Progress events published by the tour session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a tour run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The user went past the last step (or the last step's target was missing).
    Completed,
    /// The user pressed skip.
    Skipped,
    /// The tour was dismissed.
    Closed,
    /// Another tour was started on top of this one. Not marked seen.
    Replaced,
}

impl FinishReason {
    /// Whether the run counts towards the seen-tours record.
    pub fn marks_seen(&self) -> bool {
        !matches!(self, Self::Replaced)
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Closed => "closed",
            Self::Replaced => "replaced",
        };
        write!(f, "{s}")
    }
}

/// Broadcast on every session transition. Listeners cannot feed back into
/// the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TourEvent {
    /// A run opened at `index` (the first eligible step).
    Started {
        run_id: Uuid,
        tour: String,
        index: usize,
        steps: usize,
    },
    /// The current step moved.
    StepChanged {
        run_id: Uuid,
        tour: String,
        index: usize,
        steps: usize,
    },
    /// The run ended and the session is idle again.
    Finished {
        run_id: Uuid,
        tour: String,
        reason: FinishReason,
    },
}

impl TourEvent {
    pub fn tour(&self) -> &str {
        match self {
            Self::Started { tour, .. }
            | Self::StepChanged { tour, .. }
            | Self::Finished { tour, .. } => tour,
        }
    }

    pub fn run_id(&self) -> Uuid {
        match self {
            Self::Started { run_id, .. }
            | Self::StepChanged { run_id, .. }
            | Self::Finished { run_id, .. } => *run_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_type_tag() {
        let event = TourEvent::Finished {
            run_id: Uuid::nil(),
            tour: "main".to_string(),
            reason: FinishReason::Skipped,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "finished");
        assert_eq!(json["reason"], "skipped");
        assert_eq!(json["tour"], "main");
    }

    #[test]
    fn only_replacement_is_not_seen() {
        assert!(FinishReason::Completed.marks_seen());
        assert!(FinishReason::Skipped.marks_seen());
        assert!(FinishReason::Closed.marks_seen());
        assert!(!FinishReason::Replaced.marks_seen());
    }
}
