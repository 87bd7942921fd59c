//! NavigationBridge — keeps the app on the route a step needs.

use std::sync::{Arc, RwLock};

use tracing::debug;

/// The host application's router.
pub trait Navigator: Send + Sync {
    fn current_route(&self) -> String;
    /// Request a route change. Completion may land on a later tick.
    fn navigate(&self, route: &str);
}

/// Asks the navigator to switch routes only when needed.
#[derive(Clone)]
pub struct NavigationBridge {
    navigator: Arc<dyn Navigator>,
}

impl NavigationBridge {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self { navigator }
    }

    pub fn current_route(&self) -> String {
        self.navigator.current_route()
    }

    /// Navigate to `route` unless the app is already there. Returns whether a
    /// navigation was requested.
    pub fn ensure_route(&self, route: Option<&str>) -> bool {
        let Some(route) = route else {
            return false;
        };
        let current = self.navigator.current_route();
        if current == route {
            return false;
        }
        debug!(from = %current, to = %route, "Navigating for tour step");
        self.navigator.navigate(route);
        true
    }
}

/// In-process navigator that records every request. Route changes apply
/// immediately.
#[derive(Default)]
pub struct MemoryNavigator {
    route: RwLock<String>,
    history: RwLock<Vec<String>>,
}

impl MemoryNavigator {
    pub fn new(initial: &str) -> Self {
        Self {
            route: RwLock::new(initial.to_string()),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Routes requested through `navigate`, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history.read().map(|h| h.clone()).unwrap_or_default()
    }
}

impl Navigator for MemoryNavigator {
    fn current_route(&self) -> String {
        self.route.read().map(|r| r.clone()).unwrap_or_default()
    }

    fn navigate(&self, route: &str) {
        if let Ok(mut current) = self.route.write() {
            *current = route.to_string();
        }
        if let Ok(mut history) = self.history.write() {
            history.push(route.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigates_only_when_route_differs() {
        let nav = Arc::new(MemoryNavigator::new("/"));
        let bridge = NavigationBridge::new(Arc::clone(&nav) as Arc<dyn Navigator>);

        assert!(bridge.ensure_route(Some("/dashboard")));
        assert!(!bridge.ensure_route(Some("/dashboard")));
        assert!(!bridge.ensure_route(None));

        assert_eq!(nav.history(), vec!["/dashboard".to_string()]);
        assert_eq!(bridge.current_route(), "/dashboard");
    }
}
