//! Overlay renderer integration.

pub mod adapter;
pub mod event;

pub use adapter::{OverlayAdapter, RendererProps, RendererStep};
pub use event::{
    CallbackType, OverlayCommand, RendererAction, RendererCallback, RendererStatus,
    TerminateReason,
};
