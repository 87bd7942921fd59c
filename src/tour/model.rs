//! Tour and step data models.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Where a step anchors visually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetDescriptor {
    /// A selector resolved against the live page at presentation time.
    Selector(String),
    /// Centered on the screen, no anchor element.
    WholeScreen,
}

impl TargetDescriptor {
    pub fn selector(&self) -> Option<&str> {
        match self {
            Self::Selector(s) => Some(s),
            Self::WholeScreen => None,
        }
    }
}

impl From<&str> for TargetDescriptor {
    fn from(selector: &str) -> Self {
        Self::Selector(selector.to_string())
    }
}

impl std::fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Selector(s) => write!(f, "{s}"),
            Self::WholeScreen => write!(f, "<whole-screen>"),
        }
    }
}

/// Tooltip placement relative to the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    Auto,
    Top,
    TopStart,
    TopEnd,
    #[default]
    Bottom,
    BottomStart,
    BottomEnd,
    Left,
    Right,
    Center,
}

/// Predicate evaluated when a step is about to become current.
pub type StepCondition = Arc<dyn Fn() -> bool + Send + Sync>;

/// One unit of a tour. Immutable once registered; identified by position.
#[derive(Clone)]
pub struct Step {
    pub target: TargetDescriptor,
    pub title: String,
    pub content: String,
    pub placement: Placement,
    pub disable_beacon: bool,
    pub spotlight_padding: u32,
    pub disable_overlay: bool,
    pub show_skip_button: bool,
    pub required_route: Option<String>,
    pub condition: Option<StepCondition>,
}

impl Step {
    pub fn new(
        target: impl Into<TargetDescriptor>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let target = target.into();
        let placement = match target {
            TargetDescriptor::WholeScreen => Placement::Center,
            TargetDescriptor::Selector(_) => Placement::default(),
        };
        Self {
            target,
            title: title.into(),
            content: content.into(),
            placement,
            disable_beacon: true,
            spotlight_padding: 8,
            disable_overlay: false,
            show_skip_button: true,
            required_route: None,
            condition: None,
        }
    }

    /// A centered step with no anchor element.
    pub fn centered(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(TargetDescriptor::WholeScreen, title, content)
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.required_route = Some(route.into());
        self
    }

    pub fn with_spotlight_padding(mut self, padding: u32) -> Self {
        self.spotlight_padding = padding;
        self
    }

    pub fn with_beacon(mut self) -> Self {
        self.disable_beacon = false;
        self
    }

    pub fn without_overlay(mut self) -> Self {
        self.disable_overlay = true;
        self
    }

    pub fn without_skip(mut self) -> Self {
        self.show_skip_button = false;
        self
    }

    /// Only present this step while `condition` holds.
    pub fn when(mut self, condition: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Whether the step may be presented right now.
    pub fn is_eligible(&self) -> bool {
        self.condition.as_ref().is_none_or(|cond| cond())
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("target", &self.target)
            .field("title", &self.title)
            .field("placement", &self.placement)
            .field("required_route", &self.required_route)
            .field("conditional", &self.condition.is_some())
            .finish_non_exhaustive()
    }
}

/// A named, ordered sequence of steps.
#[derive(Debug, Clone)]
pub struct Tour {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Tour {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn centered_steps_default_to_center_placement() {
        let step = Step::centered("Welcome", "Let's look around");
        assert_eq!(step.target, TargetDescriptor::WholeScreen);
        assert_eq!(step.placement, Placement::Center);

        let anchored = Step::new("#sidebar", "Sidebar", "Navigate here");
        assert_eq!(anchored.placement, Placement::Bottom);
        assert_eq!(anchored.target.selector(), Some("#sidebar"));
    }

    #[test]
    fn condition_is_evaluated_on_each_call() {
        let flag = Arc::new(AtomicBool::new(false));
        let probe = Arc::clone(&flag);
        let step = Step::new("#x", "t", "c").when(move || probe.load(Ordering::SeqCst));

        assert!(!step.is_eligible());
        flag.store(true, Ordering::SeqCst);
        assert!(step.is_eligible());
        assert!(Step::new("#y", "t", "c").is_eligible());
    }

    #[test]
    fn placement_serde_is_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Placement::BottomStart).unwrap(),
            "\"bottom-start\""
        );
        assert_eq!(serde_json::to_string(&Placement::Center).unwrap(), "\"center\"");
    }

    #[test]
    fn debug_does_not_expose_closure() {
        let step = Step::new("#x", "t", "c").when(|| true);
        let debug = format!("{step:?}");
        assert!(debug.contains("conditional: true"));
    }
}
