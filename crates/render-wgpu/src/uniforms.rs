use bytemuck::{Pod, Zeroable};
use cubecam_common::Color;
use cubecam_scene::{Light, Material, Scene, SceneObject, ShadowSettings, SpotLight};
use glam::{Mat4, Vec3};

/// Smallest gap kept between the inner and outer cone cosines so the
/// shader's smoothstep never sees equal edges.
const MIN_CONE_GAP: f32 = 1e-4;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
    pub params: [f32; 4],
}

impl CameraUniform {
    pub fn new(view_proj: Mat4, eye: Vec3, tone_map: bool) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            eye: eye.extend(1.0).to_array(),
            params: [if tone_map { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LightingUniform {
    pub spot_position: [f32; 4],
    pub spot_direction: [f32; 4],
    pub spot_color: [f32; 4],
    pub spot_cone: [f32; 4],
    pub ambient: [f32; 4],
    pub shadow_view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub params: [f32; 4],
}

/// Byte distance between camera slots in the shared dynamic-offset buffer.
pub fn camera_stride(min_alignment: u32) -> u64 {
    let size = std::mem::size_of::<CameraUniform>() as u64;
    size.next_multiple_of(u64::from(min_alignment.max(1)))
}

/// The scene's first spot light, which drives direct lighting and shadows.
pub fn spot_light(scene: &Scene) -> Option<&SpotLight> {
    scene.lights().iter().find_map(|light| match light {
        Light::Spot(spot) => Some(spot),
        Light::Ambient { .. } => None,
    })
}

/// Light-space view-projection for a spot light's shadow map.
pub fn shadow_view_projection(light: &SpotLight, shadow: &ShadowSettings) -> Mat4 {
    let direction = light.direction();
    let up = if direction.y.abs() > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let fov = (2.0 * light.angle).clamp(1f32.to_radians(), 179f32.to_radians());
    Mat4::perspective_rh(fov, 1.0, shadow.near, shadow.far)
        * Mat4::look_at_rh(light.position, light.position + direction, up)
}

pub fn lighting_uniform(scene: &Scene) -> LightingUniform {
    let ambient = scene
        .lights()
        .iter()
        .fold(Color::BLACK, |sum, light| match *light {
            Light::Ambient { color, intensity } => {
                let c = color.scaled(intensity);
                Color::rgb(sum.r + c.r, sum.g + c.g, sum.b + c.b)
            }
            Light::Spot(_) => sum,
        });

    let mut uniform = LightingUniform {
        spot_position: [0.0, 0.0, 0.0, 1.0],
        spot_direction: [0.0, -1.0, 0.0, 0.0],
        spot_color: [0.0; 4],
        spot_cone: [0.0, 1.0, 0.0, 0.0],
        ambient: ambient.to_vec4(1.0),
        shadow_view_proj: Mat4::IDENTITY.to_cols_array_2d(),
    };

    if let Some(spot) = spot_light(scene) {
        let (outer, inner) = spot.cone_cosines();
        let inner = inner.max(outer + MIN_CONE_GAP);
        uniform.spot_position = spot.position.extend(1.0).to_array();
        uniform.spot_direction = spot.direction().extend(0.0).to_array();
        uniform.spot_color = spot.color.to_vec4(spot.intensity);
        uniform.spot_cone = [outer, inner, 0.0, 0.0];
        if let Some(shadow) = &spot.shadow {
            uniform.spot_cone[2] = shadow.bias;
            uniform.spot_cone[3] = 1.0;
            uniform.shadow_view_proj = shadow_view_projection(spot, shadow).to_cols_array_2d();
        }
    }
    uniform
}

pub fn object_uniform(object: &SceneObject) -> ObjectUniform {
    let model = object.transform.matrix();
    let (color, alpha, env) = match object.material {
        Material::Standard { color, opacity } => (color, opacity, 0.0),
        Material::Lambert { color, env_map } => {
            (color, 1.0, if env_map.is_some() { 1.0 } else { 0.0 })
        }
        Material::Composite { .. } | Material::Lines => (Color::WHITE, 1.0, 0.0),
    };
    ObjectUniform {
        model: model.to_cols_array_2d(),
        normal: model.inverse().transpose().to_cols_array_2d(),
        color: color.to_vec4(alpha),
        params: [env, if object.receive_shadow { 1.0 } else { 0.0 }, 0.0, 0.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubecam_common::Transform;
    use cubecam_scene::{CaptureId, Config, Geometry, SceneId, build_stage};

    #[test]
    fn uniform_sizes_match_shader_layout() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 96);
        assert_eq!(std::mem::size_of::<LightingUniform>(), 144);
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 160);
    }

    #[test]
    fn camera_stride_respects_alignment() {
        assert_eq!(camera_stride(256), 256);
        assert_eq!(camera_stride(64), 128);
        assert_eq!(camera_stride(0), 96);
    }

    #[test]
    fn primary_scene_lighting() {
        let stage = build_stage(&Config::default());
        let lighting = lighting_uniform(&stage.primary);

        assert_eq!(lighting.spot_position, [15.0, 15.0, 15.0, 1.0]);
        assert_eq!(lighting.spot_color[3], 2.0);
        let [outer, inner, bias, shadowed] = lighting.spot_cone;
        assert!(inner > outer);
        assert_eq!(bias, -0.0001);
        assert_eq!(shadowed, 1.0);
        assert!((lighting.ambient[0] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn full_penumbra_keeps_cone_edges_apart() {
        let mut scene = Scene::new(SceneId(9), Color::BLACK);
        scene.add_light(Light::Spot(SpotLight {
            penumbra: 0.0,
            ..SpotLight::default()
        }));
        let [outer, inner, ..] = lighting_uniform(&scene).spot_cone;
        assert!(inner - outer >= MIN_CONE_GAP * 0.5);
    }

    #[test]
    fn scene_without_spot_has_no_direct_light() {
        let mut scene = Scene::new(SceneId(9), Color::BLACK);
        scene.add_light(Light::Ambient {
            color: Color::WHITE,
            intensity: 0.5,
        });
        let lighting = lighting_uniform(&scene);
        assert_eq!(lighting.spot_color, [0.0; 4]);
        assert_eq!(lighting.spot_cone[3], 0.0);
        assert_eq!(lighting.ambient, [0.5, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn shadow_camera_looks_at_the_target() {
        let light = SpotLight {
            position: Vec3::new(15.0, 15.0, 15.0),
            ..SpotLight::default()
        };
        let vp = shadow_view_projection(&light, &ShadowSettings::default());
        let ndc = vp.project_point3(Vec3::ZERO);
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn straight_down_spot_is_finite() {
        let light = SpotLight {
            position: Vec3::new(0.0, 10.0, 0.0),
            ..SpotLight::default()
        };
        assert!(shadow_view_projection(&light, &ShadowSettings::default()).is_finite());
    }

    #[test]
    fn env_flag_follows_material() {
        let sphere = SceneObject::new(
            "sphere",
            Geometry::Icosahedron {
                radius: 1.0,
                detail: 1,
            },
            Material::Lambert {
                color: Color::WHITE,
                env_map: Some(CaptureId(1)),
            },
        )
        .receiving_shadow();
        let uniform = object_uniform(&sphere);
        assert_eq!(uniform.params[0], 1.0);
        assert_eq!(uniform.params[1], 1.0);
    }

    #[test]
    fn ground_opacity_reaches_alpha() {
        let stage = build_stage(&Config::default());
        let ground = stage
            .primary
            .find("ground")
            .and_then(|id| stage.primary.get(id))
            .cloned()
            .unwrap();
        let uniform = object_uniform(&ground);
        assert!((uniform.color[3] - 0.8).abs() < 1e-6);
        assert_eq!(uniform.params[1], 1.0);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let mut object = SceneObject::new(
            "box",
            Geometry::Box {
                width: 1.0,
                height: 1.0,
                depth: 1.0,
            },
            Material::Lines,
        );
        object.transform = Transform {
            scale: Vec3::new(2.0, 1.0, 1.0),
            ..Transform::default()
        };
        let normal = Mat4::from_cols_array_2d(&object_uniform(&object).normal);
        let n = normal.transform_vector3(Vec3::X);
        assert!((n.x - 0.5).abs() < 1e-6);
    }
}
