use cubecam_scene::PerspectiveCamera;
use glam::Vec3;

/// Keeps the polar angle away from the poles so `look_at` stays defined.
const POLE_EPSILON: f32 = 1e-3;

/// Orbit controls: rotate around, dolly towards and pan the camera's target.
///
/// Camera motion is UI state and never touches the scenes.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            min_distance: 0.5,
            max_distance: 500.0,
        }
    }
}

impl OrbitControls {
    /// Controls orbiting the camera's current target.
    pub fn for_camera(camera: &PerspectiveCamera) -> Self {
        Self {
            target: camera.target,
            ..Self::default()
        }
    }

    /// Orbit by a pointer drag of (`dx`, `dy`) pixels. A drag across the full
    /// viewport height turns the camera once around.
    pub fn rotate(&self, camera: &mut PerspectiveCamera, dx: f32, dy: f32, viewport_height: f32) {
        let scale = std::f32::consts::TAU / viewport_height.max(1.0);
        let offset = camera.position - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return;
        }

        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();
        theta -= dx * scale;
        phi = (phi - dy * scale).clamp(POLE_EPSILON, std::f32::consts::PI - POLE_EPSILON);

        camera.position = self.target
            + Vec3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
        camera.look_at(self.target);
    }

    /// Dolly towards (positive `steps`) or away from the target.
    pub fn zoom(&self, camera: &mut PerspectiveCamera, steps: f32) {
        let offset = camera.position - self.target;
        let factor = 0.95_f32.powf(steps);
        let distance = (offset.length() * factor).clamp(self.min_distance, self.max_distance);
        let direction = offset.try_normalize().unwrap_or(Vec3::Z);
        camera.position = self.target + direction * distance;
        camera.look_at(self.target);
    }

    /// Slide camera and target together in the view plane, so the point under
    /// the pointer follows it.
    pub fn pan(&mut self, camera: &mut PerspectiveCamera, dx: f32, dy: f32, viewport_height: f32) {
        let offset = camera.position - self.target;
        let forward = (-offset).try_normalize().unwrap_or(Vec3::NEG_Z);
        let right = forward.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);
        let up = right.cross(forward);

        // World units per pixel at the target's depth.
        let half_height = offset.length() * (camera.fov.to_radians() * 0.5).tan();
        let per_pixel = 2.0 * half_height / viewport_height.max(1.0);
        let shift = (-right * dx + up * dy) * per_pixel;

        self.target += shift;
        camera.position += shift;
        camera.look_at(self.target);
    }
}
