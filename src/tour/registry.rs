//! Tour registry — name → ordered step list.

use std::collections::HashMap;

use super::catalog;
use super::model::{Step, Tour};

/// Registry of available tours.
///
/// Later registrations under the same name replace earlier ones.
#[derive(Debug, Default)]
pub struct TourRegistry {
    tours: HashMap<String, Vec<Step>>,
}

impl TourRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with the built-in catalog.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for tour in catalog::builtin_tours() {
            registry.register_tour(tour);
        }
        registry
    }

    /// Register (or replace) a tour.
    pub fn register(&mut self, name: impl Into<String>, steps: Vec<Step>) {
        let name = name.into();
        let len = steps.len();
        if self.tours.insert(name.clone(), steps).is_some() {
            tracing::debug!(tour = %name, steps = len, "Replaced tour registration");
        } else {
            tracing::debug!(tour = %name, steps = len, "Registered tour");
        }
    }

    pub fn register_tour(&mut self, tour: Tour) {
        self.register(tour.name, tour.steps);
    }

    /// Steps of `name`, or an empty slice if the tour is unknown.
    pub fn steps_of(&self, name: &str) -> &[Step] {
        self.tours.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, name: &str) -> bool {
        self.tours.contains_key(name)
    }

    pub fn len_of(&self, name: &str) -> usize {
        self.steps_of(name).len()
    }

    /// All registered tour names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tours.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn count(&self) -> usize {
        self.tours.len()
    }
}
