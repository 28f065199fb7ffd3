use cubecam_scene::{CaptureId, CapturePoint};
use glam::{Mat4, Vec3};

/// Offscreen color format for cube captures. Linear, so the env map and the
/// composite quad sample unclamped scene radiance.
pub const CAPTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Forward and up vectors of the six cube faces, in array-layer order
/// (+X, -X, +Y, -Y, +Z, -Z).
pub const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::Y),
    (Vec3::NEG_X, Vec3::Y),
    (Vec3::Y, Vec3::NEG_Z),
    (Vec3::NEG_Y, Vec3::Z),
    (Vec3::Z, Vec3::Y),
    (Vec3::NEG_Z, Vec3::Y),
];

/// View-projection for one cube face seen from `position`.
///
/// Cube map sampling is left-handed, so the right-handed view is mirrored in
/// x; each face then stores exactly what a lookup along its directions returns.
///
/// # Panics
/// If `face` is not an index into [`CUBE_FACES`] (`0..6`).
pub fn face_view_projection(position: Vec3, face: usize, near: f32, far: f32) -> Mat4 {
    let (forward, up) = CUBE_FACES[face];
    let projection = Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0))
        * Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, near, far);
    projection * Mat4::look_at_rh(position, position + forward, up)
}

/// GPU side of a capture point: a six-layer color texture viewed both as a
/// cube (for sampling) and per face (for rendering), plus a shared depth buffer.
pub struct CubeTarget {
    id: CaptureId,
    cube_view: wgpu::TextureView,
    face_views: Vec<wgpu::TextureView>,
    depth_view: wgpu::TextureView,
    /// First of six consecutive camera uniform slots, one per face.
    first_slot: u32,
}

impl CubeTarget {
    pub fn new(device: &wgpu::Device, capture: &CapturePoint, first_slot: u32) -> Self {
        let size = capture.resolution.max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("capture_texture"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CAPTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let cube_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("capture_cube_view"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            array_layer_count: Some(6),
            ..Default::default()
        });

        let face_views = (0..6)
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("capture_face_view"),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("capture_depth"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: crate::gpu::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        Self {
            id: capture.id,
            cube_view,
            face_views,
            depth_view: depth.create_view(&Default::default()),
            first_slot,
        }
    }

    pub fn id(&self) -> CaptureId {
        self.id
    }

    pub fn cube_view(&self) -> &wgpu::TextureView {
        &self.cube_view
    }

    pub fn face_view(&self, face: usize) -> &wgpu::TextureView {
        &self.face_views[face]
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    pub fn slot(&self, face: usize) -> u32 {
        self.first_slot + face as u32
    }
}
