//! Scene model for the cubecam demo: two scenes, their capture points, the
//! main camera and the settings interface the debug panel drives.
//!
//! # Invariants
//! - Object ids are stable for the life of a scene (objects are never removed).
//! - Every capture point belongs to exactly one scene, and its reflector (if
//!   any) lives in that same scene.
//! - Both scenes always share one background color.

pub mod builder;
pub mod camera;
pub mod config;
pub mod scene;
pub mod settings;
pub mod stage;

pub use builder::build_stage;
pub use camera::PerspectiveCamera;
pub use config::Config;
pub use scene::{
    CaptureId, CapturePoint, Geometry, Light, Material, ObjectId, Scene, SceneId, SceneObject,
    ShadowSettings, SpotLight,
};
pub use settings::{Helper, SceneSettings};
pub use stage::{Stage, StageHandles};
