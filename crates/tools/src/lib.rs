//! Developer tooling: the debug control panel and the frame statistics overlay.
//!
//! # Invariants
//! - The panel never touches scenes directly; it edits `Config` and emits
//!   `PanelChange` commands that go through `SceneSettings`.

mod panel;

pub use panel::{DebugPanel, PanelChange, config_changes, stats_overlay};
