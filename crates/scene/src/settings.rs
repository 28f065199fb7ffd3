use cubecam_common::Color;
use std::fmt;

/// Debug helper objects that can be toggled at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Helper {
    Grid,
    Axes,
}

impl fmt::Display for Helper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Helper::Grid => f.write_str("grid"),
            Helper::Axes => f.write_str("axes"),
        }
    }
}

/// Mutations the debug panel may apply to live scene state.
///
/// Each call takes effect immediately and is visible on the next rendered frame.
pub trait SceneSettings {
    /// Set the background of every scene.
    fn set_background(&mut self, color: Color);

    /// Set the main camera's vertical field of view (degrees) and recompute
    /// its projection.
    fn set_field_of_view(&mut self, degrees: f32);

    /// Show or hide one helper object. Other objects are untouched.
    fn set_helper_visible(&mut self, helper: Helper, visible: bool);
}
