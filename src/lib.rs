//! Tour Engine — guided product tours for a running UI.
//!
//! Sequences tooltip/spotlight steps, resolves each step's target against the
//! live page, keeps the app on the route a step needs, recovers from missing
//! targets, and remembers which tours the user has seen.

pub mod assistant;
pub mod config;
pub mod engine;
pub mod error;
pub mod navigation;
pub mod overlay;
pub mod resolver;
pub mod store;
pub mod tour;

pub use engine::{EngineDeps, TourEngine};
