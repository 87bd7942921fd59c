//! Tours — step model, registry, built-in catalog and the session state
//! machine that walks through them.

pub mod catalog;
pub mod events;
pub mod model;
pub mod registry;
pub mod session;

pub use catalog::KnownTour;
pub use events::{FinishReason, TourEvent};
pub use model::{Placement, Step, TargetDescriptor, Tour};
pub use registry::TourRegistry;
pub use session::{SessionSnapshot, SessionStatus, TourSession};
