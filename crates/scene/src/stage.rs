use crate::camera::PerspectiveCamera;
use crate::scene::{ObjectId, Scene};
use crate::settings::{Helper, SceneSettings};
use cubecam_common::Color;

/// Ids of the objects the panel and render loop need to reach after setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageHandles {
    pub primary_cube: ObjectId,
    pub primary_sphere: ObjectId,
    pub quad: ObjectId,
    pub grid: ObjectId,
    pub axes: ObjectId,
    pub secondary_cube: ObjectId,
    pub secondary_sphere: ObjectId,
}

/// Everything the demo renders: both scenes and the main camera.
///
/// Only `primary` is drawn to the screen. `secondary` exists to feed its
/// capture point, which the composite quad samples.
#[derive(Debug, Clone)]
pub struct Stage {
    pub primary: Scene,
    pub secondary: Scene,
    pub camera: PerspectiveCamera,
    pub handles: StageHandles,
}

impl Stage {
    pub fn scenes(&self) -> [&Scene; 2] {
        [&self.primary, &self.secondary]
    }

    pub fn scenes_mut(&mut self) -> [&mut Scene; 2] {
        [&mut self.primary, &mut self.secondary]
    }

    fn helper_id(&self, helper: Helper) -> ObjectId {
        match helper {
            Helper::Grid => self.handles.grid,
            Helper::Axes => self.handles.axes,
        }
    }
}

impl SceneSettings for Stage {
    fn set_background(&mut self, color: Color) {
        for scene in self.scenes_mut() {
            scene.set_background(color);
        }
    }

    fn set_field_of_view(&mut self, degrees: f32) {
        self.camera.fov = degrees;
        self.camera.update_projection_matrix();
    }

    fn set_helper_visible(&mut self, helper: Helper, visible: bool) {
        let id = self.helper_id(helper);
        if self.primary.set_visible(id, visible).is_none() {
            tracing::warn!("{helper} helper {id} missing from primary scene");
        }
    }
}
