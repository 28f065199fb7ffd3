use crate::frame::FrameBackend;
use cubecam_common::Color;
use cubecam_scene::{CaptureId, CapturePoint, ObjectId, PerspectiveCamera, Scene, SceneId};
use std::fmt;

/// One backend call as seen by [`TraceBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    Capture {
        scene: SceneId,
        capture: CaptureId,
        /// Objects that would have been drawn into the cube image.
        visible: Vec<ObjectId>,
    },
    Render {
        scene: SceneId,
        visible: Vec<ObjectId>,
        background: Color,
        fov: f32,
    },
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::Capture {
                scene,
                capture,
                visible,
            } => write!(f, "capture {capture} in {scene}: {} visible", visible.len()),
            TraceEvent::Render {
                scene,
                visible,
                background,
                fov,
            } => {
                let [r, g, b] = background.to_srgb8();
                write!(
                    f,
                    "render {scene}: {} visible, bg=#{r:02x}{g:02x}{b:02x}, fov={fov:.1}",
                    visible.len()
                )
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("capture {0} failed")]
    CaptureFailed(CaptureId),
}

/// Headless backend that records what each call would draw instead of drawing.
///
/// Useful for logging and for checking frame ordering without a GPU.
#[derive(Debug, Default)]
pub struct TraceBackend {
    events: Vec<TraceEvent>,
    fail_capture: Option<CaptureId>,
}

impl TraceBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose refresh of `capture` always fails.
    pub fn failing_on(capture: CaptureId) -> Self {
        Self {
            fail_capture: Some(capture),
            ..Self::default()
        }
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

fn visible_ids(scene: &Scene) -> Vec<ObjectId> {
    scene
        .objects()
        .filter(|(_, o)| o.visible)
        .map(|(id, _)| id)
        .collect()
}

impl FrameBackend for TraceBackend {
    type Error = TraceError;

    fn update_capture(&mut self, scene: &Scene, capture: &CapturePoint) -> Result<(), TraceError> {
        if self.fail_capture == Some(capture.id) {
            return Err(TraceError::CaptureFailed(capture.id));
        }
        self.events.push(TraceEvent::Capture {
            scene: scene.id(),
            capture: capture.id,
            visible: visible_ids(scene),
        });
        Ok(())
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), TraceError> {
        self.events.push(TraceEvent::Render {
            scene: scene.id(),
            visible: visible_ids(scene),
            background: scene.background(),
            fov: camera.fov,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubecam_scene::{Config, build_stage};

    #[test]
    fn records_render_state() {
        let stage = build_stage(&Config::default());
        let mut backend = TraceBackend::new();
        backend.render(&stage.primary, &stage.camera).unwrap();

        let line = backend.events()[0].to_string();
        assert!(line.contains("render scene#1"));
        assert!(line.contains("bg=#393939"));
        assert!(line.contains("fov=50.0"));
    }

    #[test]
    fn capture_lists_only_visible_objects() {
        let mut stage = build_stage(&Config::default());
        stage.primary.set_visible(stage.handles.grid, false);
        let capture = stage.primary.captures()[0];

        let mut backend = TraceBackend::new();
        backend.update_capture(&stage.primary, &capture).unwrap();

        let TraceEvent::Capture { visible, .. } = &backend.events()[0] else {
            panic!("expected capture event");
        };
        assert!(!visible.contains(&stage.handles.grid));
        assert_eq!(visible.len(), stage.primary.object_count() - 1);
    }

    #[test]
    fn clear_drops_events() {
        let stage = build_stage(&Config::default());
        let mut backend = TraceBackend::new();
        backend.render(&stage.primary, &stage.camera).unwrap();
        backend.clear();
        assert!(backend.events().is_empty());
    }
}
