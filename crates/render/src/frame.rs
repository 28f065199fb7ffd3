use crate::stats::FrameStats;
use cubecam_scene::{CapturePoint, ObjectId, PerspectiveCamera, Scene, Stage};
use std::ops::Deref;
use std::time::Instant;

/// Renderer-agnostic interface the render loop drives. All renderers implement
/// this trait.
///
/// Backends read scene state; they never mutate it. Visibility toggling around
/// captures is the loop's job.
pub trait FrameBackend {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Re-render `scene` into the capture point's six-face cube image.
    fn update_capture(&mut self, scene: &Scene, capture: &CapturePoint) -> Result<(), Self::Error>;

    /// Render `scene` to the output surface through `camera`.
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), Self::Error>;
}

/// Scoped visibility override: hides one object for as long as the guard
/// lives and restores its previous visibility on drop, including on early
/// return and unwind.
pub struct Hidden<'a> {
    scene: &'a mut Scene,
    restore: Option<(ObjectId, bool)>,
}

impl<'a> Hidden<'a> {
    /// Hide `object` in `scene`. A `None` or unknown object hides nothing.
    pub fn new(scene: &'a mut Scene, object: Option<ObjectId>) -> Self {
        let restore = object.and_then(|id| scene.set_visible(id, false).map(|was| (id, was)));
        Self { scene, restore }
    }
}

impl Deref for Hidden<'_> {
    type Target = Scene;

    fn deref(&self) -> &Scene {
        self.scene
    }
}

impl Drop for Hidden<'_> {
    fn drop(&mut self) {
        if let Some((id, was)) = self.restore {
            self.scene.set_visible(id, was);
        }
    }
}

/// Refresh every capture point of `scene`, each with its own reflector hidden.
pub fn refresh_captures<B: FrameBackend>(
    backend: &mut B,
    scene: &mut Scene,
) -> Result<(), B::Error> {
    for index in 0..scene.captures().len() {
        let capture = scene.captures()[index];
        let hidden = Hidden::new(scene, capture.reflector);
        tracing::trace!("refreshing {} in {}", capture.id, hidden.id());
        backend.update_capture(&hidden, &capture)?;
    }
    Ok(())
}

/// Per-frame driver: capture refresh, on-screen draw, stats update.
#[derive(Debug, Default)]
pub struct RenderLoop {
    stats: FrameStats,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one frame.
    ///
    /// Captures are refreshed scene by scene in stage order, then only the
    /// primary scene is drawn. The first backend error aborts the frame.
    pub fn frame<B: FrameBackend>(
        &mut self,
        backend: &mut B,
        stage: &mut Stage,
        now: Instant,
    ) -> Result<(), B::Error> {
        for scene in stage.scenes_mut() {
            refresh_captures(backend, scene)?;
        }

        backend.render(&stage.primary, &stage.camera)?;

        self.stats.update(now);
        Ok(())
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{TraceBackend, TraceError, TraceEvent};
    use cubecam_scene::builder::{PRIMARY_CAPTURE, SECONDARY_CAPTURE};
    use cubecam_scene::{Config, SceneSettings, build_stage};
    use std::time::Duration;

    #[test]
    fn reflector_hidden_only_during_its_capture() {
        let mut stage = build_stage(&Config::default());
        let mut backend = TraceBackend::new();
        RenderLoop::new()
            .frame(&mut backend, &mut stage, Instant::now())
            .unwrap();

        let events = backend.events();
        assert_eq!(events.len(), 3);

        let TraceEvent::Capture {
            scene,
            capture,
            visible,
        } = &events[0]
        else {
            panic!("expected capture first, got {:?}", events[0]);
        };
        assert_eq!(*scene, stage.primary.id());
        assert_eq!(*capture, PRIMARY_CAPTURE);
        assert!(!visible.contains(&stage.handles.primary_sphere));
        assert!(visible.contains(&stage.handles.primary_cube));
        assert_eq!(visible.len(), stage.primary.object_count() - 1);

        let TraceEvent::Capture {
            scene,
            capture,
            visible,
        } = &events[1]
        else {
            panic!("expected second capture, got {:?}", events[1]);
        };
        assert_eq!(*scene, stage.secondary.id());
        assert_eq!(*capture, SECONDARY_CAPTURE);
        assert!(!visible.contains(&stage.handles.secondary_sphere));
        assert!(visible.contains(&stage.handles.secondary_cube));

        let TraceEvent::Render { scene, visible, .. } = &events[2] else {
            panic!("expected render last, got {:?}", events[2]);
        };
        assert_eq!(*scene, stage.primary.id());
        assert!(visible.contains(&stage.handles.primary_sphere));

        assert_eq!(stage.primary.is_visible(stage.handles.primary_sphere), Some(true));
        assert_eq!(
            stage.secondary.is_visible(stage.handles.secondary_sphere),
            Some(true)
        );
    }

    #[test]
    fn refreshing_one_scene_leaves_the_other_alone() {
        let mut stage = build_stage(&Config::default());
        let mut backend = TraceBackend::new();
        stage
            .secondary
            .set_visible(stage.handles.secondary_sphere, false);

        refresh_captures(&mut backend, &mut stage.primary).unwrap();

        assert_eq!(
            stage.secondary.is_visible(stage.handles.secondary_sphere),
            Some(false)
        );
        assert_eq!(stage.primary.is_visible(stage.handles.primary_sphere), Some(true));
    }

    #[test]
    fn failed_capture_still_restores_visibility() {
        let mut stage = build_stage(&Config::default());
        let mut backend = TraceBackend::failing_on(PRIMARY_CAPTURE);
        let mut render_loop = RenderLoop::new();

        let err = render_loop
            .frame(&mut backend, &mut stage, Instant::now())
            .unwrap_err();
        assert!(matches!(err, TraceError::CaptureFailed(id) if id == PRIMARY_CAPTURE));

        assert_eq!(stage.primary.is_visible(stage.handles.primary_sphere), Some(true));
        // Nothing after the failing capture ran.
        assert!(backend.events().is_empty());
        assert_eq!(render_loop.stats().total_frames(), 0);
    }

    #[test]
    fn hidden_guard_keeps_prior_visibility() {
        let mut stage = build_stage(&Config::default());
        let id = stage.handles.primary_cube;
        stage.primary.set_visible(id, false);
        {
            let hidden = Hidden::new(&mut stage.primary, Some(id));
            assert_eq!(hidden.is_visible(id), Some(false));
        }
        assert_eq!(stage.primary.is_visible(id), Some(false));
    }

    #[test]
    fn settings_changes_reach_the_next_frame() {
        let mut stage = build_stage(&Config::default());
        let mut backend = TraceBackend::new();
        stage.set_field_of_view(30.0);
        RenderLoop::new()
            .frame(&mut backend, &mut stage, Instant::now())
            .unwrap();
        let Some(TraceEvent::Render { fov, .. }) = backend.events().last() else {
            panic!("no render event");
        };
        assert_eq!(*fov, 30.0);
    }

    #[test]
    fn runs_many_frames_with_defaults() {
        let mut stage = build_stage(&Config::default());
        let mut backend = TraceBackend::new();
        let mut render_loop = RenderLoop::new();
        let start = Instant::now();

        for i in 0..600u64 {
            render_loop
                .frame(&mut backend, &mut stage, start + Duration::from_millis(i * 16))
                .unwrap();
            backend.clear();
        }
        assert_eq!(render_loop.stats().total_frames(), 600);
        assert!(render_loop.stats().fps() > 0.0);
    }
}
