//! Rendering adapter: the renderer-agnostic frame loop.
//!
//! # Invariants
//! - Backends read scene state; only the loop toggles visibility, and only
//!   around a single capture refresh.
//! - A capture's reflector is hidden while that capture refreshes and has its
//!   previous visibility back before anything else is drawn.
//! - Only the primary scene reaches the output surface.

mod frame;
mod stats;
mod trace;
mod viewport;

pub use frame::{FrameBackend, Hidden, RenderLoop, refresh_captures};
pub use stats::FrameStats;
pub use trace::{TraceBackend, TraceError, TraceEvent};
pub use viewport::Viewport;
