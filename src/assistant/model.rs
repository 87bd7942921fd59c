//! Assistant widget data models.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Voice the assistant speaks in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    #[default]
    Friendly,
    Technical,
    Funny,
    Sassy,
}

impl std::fmt::Display for Personality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Friendly => write!(f, "friendly"),
            Self::Technical => write!(f, "technical"),
            Self::Funny => write!(f, "funny"),
            Self::Sassy => write!(f, "sassy"),
        }
    }
}

/// The persisted part of the assistant's state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssistantSettings {
    pub visible: bool,
    pub name: String,
    pub avatar: String,
    pub personality: Personality,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            visible: true,
            name: "Guide".to_string(),
            avatar: "default".to_string(),
            personality: Personality::default(),
        }
    }
}

/// Full assistant state as the widget renders it. `message` is never persisted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct AssistantState {
    pub visible: bool,
    pub message: String,
    pub name: String,
    pub avatar_ref: String,
    pub personality: Personality,
}

impl AssistantState {
    pub fn from_settings(settings: AssistantSettings) -> Self {
        Self {
            visible: settings.visible,
            message: String::new(),
            name: settings.name,
            avatar_ref: settings.avatar,
            personality: settings.personality,
        }
    }
}

/// Outbound message channel to the assistant widget. Fire-and-forget.
pub trait AssistantChannel: Send + Sync {
    fn set_message(&self, text: &str);
}

/// Shared, in-process assistant state. The UI layer reads snapshots; the
/// notifier writes messages through `AssistantChannel`.
#[derive(Clone, Default)]
pub struct SharedAssistant {
    inner: Arc<RwLock<AssistantState>>,
}

impl SharedAssistant {
    pub fn new(state: AssistantState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    pub fn snapshot(&self) -> AssistantState {
        self.inner
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Apply persisted settings, leaving the current message alone.
    pub fn apply_settings(&self, settings: &AssistantSettings) {
        if let Ok(mut state) = self.inner.write() {
            state.visible = settings.visible;
            state.name = settings.name.clone();
            state.avatar_ref = settings.avatar.clone();
            state.personality = settings.personality;
        }
    }
}

impl AssistantChannel for SharedAssistant {
    fn set_message(&self, text: &str) {
        if let Ok(mut state) = self.inner.write() {
            state.message = text.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn personality_serde() {
        for (raw, expected) in [
            ("\"friendly\"", Personality::Friendly),
            ("\"technical\"", Personality::Technical),
            ("\"funny\"", Personality::Funny),
            ("\"sassy\"", Personality::Sassy),
        ] {
            let parsed: Personality = serde_json::from_str(raw).unwrap();
            assert_eq!(parsed, expected);
            assert_eq!(format!("\"{parsed}\""), raw, "Display and serde should match");
        }
        assert!(serde_json::from_str::<Personality>("\"grumpy\"").is_err());
    }

    #[test]
    fn shared_assistant_keeps_message_across_settings() {
        let assistant = SharedAssistant::new(AssistantState::from_settings(
            AssistantSettings::default(),
        ));
        assistant.set_message("hello");
        assistant.apply_settings(&AssistantSettings {
            visible: false,
            name: "Ada".to_string(),
            avatar: "owl.png".to_string(),
            personality: Personality::Technical,
        });

        let state = assistant.snapshot();
        assert_eq!(state.message, "hello");
        assert_eq!(state.name, "Ada");
        assert!(!state.visible);
        assert_eq!(state.personality, Personality::Technical);
    }
}
