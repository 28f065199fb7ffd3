use cubecam_common::Color;

/// Live-tunable demo settings. Owned by the application and edited through
/// the debug panel; never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Background color of both scenes.
    pub background: Color,
    /// Main camera vertical field of view, degrees.
    pub fov: f32,
    /// Grid helper visibility.
    pub grid: bool,
    /// Axes helper visibility.
    pub axes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            background: Color::from_hex(0x393939),
            fov: 50.0,
            grid: true,
            axes: true,
        }
    }
}
