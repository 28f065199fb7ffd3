use cubecam_scene::PerspectiveCamera;

/// Output surface size, kept in sync with the window and the main camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    width: u32,
    height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Apply a window resize: camera aspect becomes `width / height` and its
    /// projection is recomputed.
    ///
    /// Zero-sized notifications (a minimized window) are ignored and return
    /// `false`; the caller then leaves its surface untouched.
    pub fn resize(&mut self, camera: &mut PerspectiveCamera, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            tracing::debug!("ignoring {width}x{height} resize");
            return false;
        }
        self.width = width;
        self.height = height;
        camera.aspect = width as f32 / height as f32;
        camera.update_projection_matrix();
        tracing::debug!("viewport resized to {width}x{height}");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(50.0, 1.0, 0.1, 1000.0)
    }

    #[test]
    fn resize_sets_aspect_and_size() {
        let mut cam = camera();
        let mut viewport = Viewport::new(1, 1);
        for (w, h) in [(1280, 720), (1, 1), (333, 1999), (4096, 2160)] {
            assert!(viewport.resize(&mut cam, w, h));
            assert_eq!(cam.aspect, w as f32 / h as f32);
            assert_eq!(viewport.size(), (w, h));
        }
    }

    #[test]
    fn resize_updates_projection() {
        let mut cam = camera();
        let before = cam.projection_matrix();
        Viewport::new(1, 1).resize(&mut cam, 1600, 900);
        assert_ne!(cam.projection_matrix(), before);
    }

    #[test]
    fn resize_is_idempotent() {
        let mut cam = camera();
        let mut viewport = Viewport::new(1, 1);
        viewport.resize(&mut cam, 800, 600);
        let first = (cam.clone(), viewport);
        viewport.resize(&mut cam, 800, 600);
        assert_eq!((cam, viewport), first);
    }

    #[test]
    fn zero_size_is_ignored() {
        let mut cam = camera();
        let mut viewport = Viewport::new(640, 480);
        assert!(!viewport.resize(&mut cam, 0, 480));
        assert_eq!(viewport.size(), (640, 480));
        assert_eq!(cam.aspect, 1.0);
    }
}
