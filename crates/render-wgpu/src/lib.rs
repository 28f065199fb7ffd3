//! wgpu render backend for the cubecam stage.
//!
//! Uploads both scenes once, refreshes each capture point into a six-layer
//! cube texture and draws the primary scene with spot-light shadows, MSAA and
//! ACES tone mapping. Orbit controls drive the main camera.
//!
//! # Invariants
//! - The renderer never mutates scene state; visibility toggles around
//!   captures belong to the frame loop.
//! - An object that samples a capture is never drawn into that capture.
//! - Captures store linear color; tone mapping runs only on the screen pass.

mod capture;
mod gpu;
mod mesh;
mod orbit;
mod shaders;
mod uniforms;

pub use capture::{CAPTURE_FORMAT, CUBE_FACES, face_view_projection};
pub use gpu::{DEPTH_FORMAT, GpuFrame, RenderError, WgpuRenderer};
pub use mesh::{LineVertex, MeshData, Vertex};
pub use orbit::OrbitControls;
