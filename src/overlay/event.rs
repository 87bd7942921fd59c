//! Overlay renderer callback payloads and their classification.
//!
//! The renderer reports lifecycle changes as a loose `{action, index, status,
//! type}` object. It is decoded once here into `RendererCallback`, then
//! reduced to at most one `OverlayCommand`. Nothing downstream looks at the
//! raw shape again.

use serde::{Deserialize, Serialize};

use crate::tour::events::FinishReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererAction {
    Next,
    Prev,
    Close,
    Skip,
    /// Anything else the renderer reports (`start`, `update`, ...).
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererStatus {
    Running,
    Finished,
    Skipped,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallbackType {
    #[serde(rename = "step:before")]
    StepBefore,
    #[serde(rename = "step:after")]
    StepAfter,
    #[serde(rename = "error:target_not_found")]
    TargetNotFound,
    #[serde(other)]
    Other,
}

/// One lifecycle callback from the overlay renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererCallback {
    pub action: RendererAction,
    pub index: usize,
    pub status: RendererStatus,
    #[serde(rename = "type")]
    pub kind: CallbackType,
}

impl RendererCallback {
    pub fn new(
        action: RendererAction,
        index: usize,
        status: RendererStatus,
        kind: CallbackType,
    ) -> Self {
        Self {
            action,
            index,
            status,
            kind,
        }
    }

    /// Reduce the callback to the session operation it stands for.
    ///
    /// A missing target wins over everything else; a terminal status or a
    /// close/skip action ends the tour; `step:after` with next/prev moves
    /// relative to the callback's own index. Everything else is informational.
    pub fn classify(&self) -> Option<OverlayCommand> {
        if self.kind == CallbackType::TargetNotFound {
            return Some(OverlayCommand::TargetMissing { index: self.index });
        }
        match self.status {
            RendererStatus::Finished => {
                return Some(OverlayCommand::Terminate {
                    reason: TerminateReason::Finished,
                });
            }
            RendererStatus::Skipped => {
                return Some(OverlayCommand::Terminate {
                    reason: TerminateReason::Skipped,
                });
            }
            RendererStatus::Running | RendererStatus::Other => {}
        }
        match (self.action, self.kind) {
            (RendererAction::Close, _) => Some(OverlayCommand::Terminate {
                reason: TerminateReason::Closed,
            }),
            (RendererAction::Skip, _) => Some(OverlayCommand::Terminate {
                reason: TerminateReason::Skipped,
            }),
            (RendererAction::Next, CallbackType::StepAfter) => {
                Some(OverlayCommand::Advance { from: self.index })
            }
            (RendererAction::Prev, CallbackType::StepAfter) => {
                Some(OverlayCommand::Retreat { from: self.index })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminateReason {
    Closed,
    Skipped,
    Finished,
}

impl From<TerminateReason> for FinishReason {
    fn from(reason: TerminateReason) -> Self {
        match reason {
            TerminateReason::Closed => FinishReason::Closed,
            TerminateReason::Skipped => FinishReason::Skipped,
            TerminateReason::Finished => FinishReason::Completed,
        }
    }
}

/// The four things a renderer callback can ask of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OverlayCommand {
    Advance { from: usize },
    Retreat { from: usize },
    TargetMissing { index: usize },
    Terminate { reason: TerminateReason },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> RendererCallback {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn decodes_renderer_payload() {
        let cb = parse(serde_json::json!({
            "action": "next",
            "index": 2,
            "status": "running",
            "type": "step:after",
            "lifecycle": "complete"
        }));
        assert_eq!(
            cb,
            RendererCallback::new(
                RendererAction::Next,
                2,
                RendererStatus::Running,
                CallbackType::StepAfter
            )
        );
    }

    #[test]
    fn unknown_strings_decode_as_other() {
        let cb = parse(serde_json::json!({
            "action": "update",
            "index": 0,
            "status": "paused",
            "type": "tooltip"
        }));
        assert_eq!(cb.action, RendererAction::Other);
        assert_eq!(cb.status, RendererStatus::Other);
        assert_eq!(cb.kind, CallbackType::Other);
        assert_eq!(cb.classify(), None);
    }

    #[test]
    fn negative_index_is_rejected() {
        let result = serde_json::from_value::<RendererCallback>(serde_json::json!({
            "action": "next", "index": -1, "status": "running", "type": "step:after"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn classification_table() {
        use CallbackType::*;
        use RendererAction::*;
        use RendererStatus::*;

        let cases = [
            ((Next, 1, Running, StepAfter), Some(OverlayCommand::Advance { from: 1 })),
            ((Prev, 2, Running, StepAfter), Some(OverlayCommand::Retreat { from: 2 })),
            ((Next, 1, Running, StepBefore), None),
            ((Next, 3, Running, TargetNotFound), Some(OverlayCommand::TargetMissing { index: 3 })),
            (
                (Close, 0, Running, StepAfter),
                Some(OverlayCommand::Terminate { reason: TerminateReason::Closed }),
            ),
            (
                (Skip, 0, Skipped, StepAfter),
                Some(OverlayCommand::Terminate { reason: TerminateReason::Skipped }),
            ),
            (
                (Next, 4, Finished, CallbackType::Other),
                Some(OverlayCommand::Terminate { reason: TerminateReason::Finished }),
            ),
        ];

        for ((action, index, status, kind), expected) in cases {
            let cb = RendererCallback::new(action, index, status, kind);
            assert_eq!(cb.classify(), expected, "{cb:?}");
        }
    }

    #[test]
    fn missing_target_beats_terminal_status() {
        let cb = RendererCallback::new(
            RendererAction::Next,
            1,
            RendererStatus::Finished,
            CallbackType::TargetNotFound,
        );
        assert_eq!(cb.classify(), Some(OverlayCommand::TargetMissing { index: 1 }));
    }

    #[test]
    fn terminate_maps_to_finish_reason() {
        assert_eq!(FinishReason::from(TerminateReason::Finished), FinishReason::Completed);
        assert_eq!(FinishReason::from(TerminateReason::Skipped), FinishReason::Skipped);
        assert_eq!(FinishReason::from(TerminateReason::Closed), FinishReason::Closed);
    }
}
