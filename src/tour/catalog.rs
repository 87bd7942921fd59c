//! Built-in tours shipped with the application.
//!
//! The copy is deliberately plain; product teams replace it by registering
//! their own steps under the same names.

use super::model::{Placement, Step, Tour};

/// Tours the application knows about at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownTour {
    Main,
    Dashboard,
    Projects,
    Chat,
    Settings,
}

impl KnownTour {
    pub const ALL: [KnownTour; 5] = [
        Self::Main,
        Self::Dashboard,
        Self::Projects,
        Self::Chat,
        Self::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Dashboard => "dashboard",
            Self::Projects => "projects",
            Self::Chat => "chat",
            Self::Settings => "settings",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl std::fmt::Display for KnownTour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn builtin_tours() -> Vec<Tour> {
    vec![
        Tour::new(
            KnownTour::Main.as_str(),
            vec![
                Step::centered("Welcome", "Here's a quick look around the app."),
                Step::new("[data-tour=\"sidebar\"]", "Navigation", "Every section lives here.")
                    .with_placement(Placement::Right),
                Step::new(
                    "[data-tour=\"dashboard-overview\"]",
                    "Dashboard",
                    "Your activity at a glance.",
                )
                .with_route("/dashboard"),
                Step::new("[data-tour=\"new-project\"]", "Projects", "Start a new project here.")
                    .with_route("/projects"),
                Step::new("[data-tour=\"assistant\"]", "Assistant", "Ask for help any time.")
                    .with_placement(Placement::Left),
            ],
        ),
        Tour::new(
            KnownTour::Dashboard.as_str(),
            vec![
                Step::new(
                    "[data-tour=\"dashboard-overview\"]",
                    "Overview",
                    "Key numbers for your workspace.",
                )
                .with_route("/dashboard"),
                Step::new(
                    "[data-tour=\"recent-activity\"]",
                    "Recent activity",
                    "What changed lately.",
                )
                .with_route("/dashboard"),
            ],
        ),
        Tour::new(
            KnownTour::Projects.as_str(),
            vec![
                Step::new("[data-tour=\"new-project\"]", "Create", "Start a project.")
                    .with_route("/projects"),
                Step::new("[data-tour=\"project-list\"]", "Browse", "All your projects.")
                    .with_route("/projects"),
            ],
        ),
        Tour::new(
            KnownTour::Chat.as_str(),
            vec![
                Step::new("[data-tour=\"chat-input\"]", "Ask", "Type a question.")
                    .with_route("/chat")
                    .with_placement(Placement::Top),
                Step::new("[data-tour=\"voice-button\"]", "Talk", "Or use your voice.")
                    .with_route("/chat"),
            ],
        ),
        Tour::new(
            KnownTour::Settings.as_str(),
            vec![
                Step::new(
                    "[data-tour=\"assistant-settings\"]",
                    "Assistant",
                    "Rename or restyle your assistant.",
                )
                .with_route("/settings"),
                Step::centered("All set", "You can replay any tour from here."),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for tour in KnownTour::ALL {
            assert_eq!(KnownTour::from_name(tour.as_str()), Some(tour));
        }
        assert_eq!(KnownTour::from_name("custom"), None);
    }

    #[test]
    fn every_builtin_tour_is_non_empty() {
        let tours = builtin_tours();
        assert_eq!(tours.len(), KnownTour::ALL.len());
        for tour in tours {
            assert!(!tour.steps.is_empty(), "{} has no steps", tour.name);
        }
    }
}
