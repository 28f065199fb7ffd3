//! One-shot construction of the demo's two scenes.

use crate::camera::PerspectiveCamera;
use crate::config::Config;
use crate::scene::{
    CaptureId, CapturePoint, Geometry, Light, Material, ObjectId, Scene, SceneId, SceneObject,
    ShadowSettings, SpotLight,
};
use crate::stage::{Stage, StageHandles};
use cubecam_common::{Color, Transform};
use glam::{Quat, Vec3};

pub const PRIMARY_SCENE: SceneId = SceneId(1);
pub const SECONDARY_SCENE: SceneId = SceneId(2);
pub const PRIMARY_CAPTURE: CaptureId = CaptureId(1);
pub const SECONDARY_CAPTURE: CaptureId = CaptureId(2);

/// Main camera starting position. The camera looks at the origin.
pub const CAMERA_POSITION: Vec3 = Vec3::new(7.0, 4.0, 21.0);

const CAPTURE_RESOLUTION: u32 = 128;
const CAPTURE_NEAR: f32 = 0.1;
const CAPTURE_FAR: f32 = 100_000.0;

const CUBE: Geometry = Geometry::Box {
    width: 2.0,
    height: 2.0,
    depth: 2.0,
};
const SPHERE: Geometry = Geometry::Icosahedron {
    radius: 1.0,
    detail: 1,
};
const GROUND: Geometry = Geometry::Box {
    width: 100.0,
    height: 100.0,
    depth: 0.1,
};

/// Objects a populated scene hands back to the stage.
struct Populated {
    cube: ObjectId,
    sphere: ObjectId,
}

/// Build both scenes and the main camera from the given configuration.
pub fn build_stage(config: &Config) -> Stage {
    let mut primary = Scene::new(PRIMARY_SCENE, config.background);
    let mut secondary = Scene::new(SECONDARY_SCENE, config.background);

    let first = populate(
        &mut primary,
        PRIMARY_CAPTURE,
        Vec3::new(0.0, 1.0, 5.0),
        Color::from_hex(0x0000ff),
    );
    let second = populate(
        &mut secondary,
        SECONDARY_CAPTURE,
        Vec3::new(4.0, 1.0, 0.0),
        Color::from_hex(0x800080),
    );

    let quad = primary.add(
        SceneObject::new(
            "quad",
            Geometry::Plane {
                width: 1.0,
                height: 1.0,
            },
            Material::Composite {
                map1: PRIMARY_CAPTURE,
                map2: SECONDARY_CAPTURE,
            },
        )
        .at(Transform::from_position(Vec3::new(3.0, 2.0, 0.0))),
    );

    let mut grid = SceneObject::new(
        "grid",
        Geometry::Grid {
            size: 30.0,
            divisions: 30,
        },
        Material::Lines,
    );
    grid.visible = config.grid;
    let grid = primary.add(grid);

    let mut axes = SceneObject::new("axes", Geometry::Axes { size: 5.0 }, Material::Lines);
    axes.visible = config.axes;
    let axes = primary.add(axes);

    let mut camera = PerspectiveCamera::new(config.fov, 16.0 / 9.0, 0.1, 1000.0);
    camera.position = CAMERA_POSITION;
    camera.look_at(Vec3::ZERO);

    tracing::info!(
        "built stage: {} objects in {}, {} objects in {}",
        primary.object_count(),
        primary.id(),
        secondary.object_count(),
        secondary.id()
    );

    Stage {
        primary,
        secondary,
        camera,
        handles: StageHandles {
            primary_cube: first.cube,
            primary_sphere: first.sphere,
            quad,
            grid,
            axes,
            secondary_cube: second.cube,
            secondary_sphere: second.sphere,
        },
    }
}

/// Add the cube, reflective sphere, ground, lights and capture point shared by
/// both scenes.
fn populate(
    scene: &mut Scene,
    capture: CaptureId,
    capture_at: Vec3,
    cube_color: Color,
) -> Populated {
    let cube = scene.add(
        SceneObject::new(
            "cube",
            CUBE,
            Material::Standard {
                color: cube_color,
                opacity: 1.0,
            },
        )
        .at(Transform::from_position(Vec3::new(0.0, 1.0, 0.0)))
        .casting_shadow(),
    );

    // The sphere sits on its capture point so the reflection is taken from its centre.
    let sphere = scene.add(
        SceneObject::new(
            "sphere",
            SPHERE,
            Material::Lambert {
                color: Color::WHITE,
                env_map: Some(capture),
            },
        )
        .at(Transform::from_position(capture_at))
        .casting_shadow(),
    );

    scene.add(
        SceneObject::new(
            "ground",
            GROUND,
            Material::Standard {
                color: Color::from_hex(0x808080),
                opacity: 0.8,
            },
        )
        .at(
            Transform::from_position(Vec3::new(0.0, -0.05, 0.0))
                .with_rotation(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2)),
        )
        .receiving_shadow(),
    );

    scene.add_light(Light::Spot(SpotLight {
        position: Vec3::new(15.0, 15.0, 15.0),
        target: Vec3::ZERO,
        color: Color::WHITE,
        intensity: 2.0,
        angle: std::f32::consts::FRAC_PI_3,
        penumbra: 1.0,
        shadow: Some(ShadowSettings {
            bias: -0.0001,
            ..ShadowSettings::default()
        }),
    }));
    scene.add_light(Light::Ambient {
        color: Color::WHITE,
        intensity: 0.2,
    });

    scene.add_capture(CapturePoint {
        id: capture,
        position: capture_at,
        resolution: CAPTURE_RESOLUTION,
        near: CAPTURE_NEAR,
        far: CAPTURE_FAR,
        reflector: Some(sphere),
    });

    Populated { cube, sphere }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(scene: &Scene, pred: impl Fn(&SceneObject) -> bool) -> usize {
        scene.objects().filter(|(_, o)| pred(o)).count()
    }

    fn is_cube(o: &SceneObject) -> bool {
        o.geometry == CUBE
    }

    fn is_reflective_sphere(o: &SceneObject) -> bool {
        matches!(o.geometry, Geometry::Icosahedron { .. })
            && matches!(o.material, Material::Lambert { env_map: Some(_), .. })
    }

    fn is_ground(o: &SceneObject) -> bool {
        o.geometry == GROUND && o.receive_shadow
    }

    #[test]
    fn both_scenes_are_populated() {
        let stage = build_stage(&Config::default());
        assert_eq!(stage.scenes().len(), 2);
        assert_ne!(stage.primary.id(), stage.secondary.id());

        for scene in stage.scenes() {
            assert!(!scene.lights().is_empty());
            assert!(count(scene, is_cube) >= 1);
            assert!(count(scene, is_reflective_sphere) >= 1);
            assert!(count(scene, is_ground) >= 1);
            assert_eq!(scene.captures().len(), 1);
        }
    }

    #[test]
    fn camera_starts_at_default_position() {
        let stage = build_stage(&Config::default());
        assert_eq!(stage.camera.position, CAMERA_POSITION);
        assert_eq!(stage.camera.target, Vec3::ZERO);
        assert_eq!(stage.camera.fov, 50.0);
    }

    #[test]
    fn reflectors_sit_on_their_capture_points() {
        let stage = build_stage(&Config::default());
        for scene in stage.scenes() {
            let capture = scene.captures()[0];
            let reflector = capture.reflector.and_then(|id| scene.get(id)).unwrap();
            assert_eq!(reflector.transform.position, capture.position);
            assert!(reflector.material.samples(capture.id));
        }
        assert_eq!(
            stage.primary.captures()[0].reflector,
            Some(stage.handles.primary_sphere)
        );
        assert_eq!(
            stage.secondary.captures()[0].reflector,
            Some(stage.handles.secondary_sphere)
        );
    }

    #[test]
    fn quad_samples_both_captures() {
        let stage = build_stage(&Config::default());
        let quad = stage.primary.get(stage.handles.quad).unwrap();
        assert!(quad.material.samples(PRIMARY_CAPTURE));
        assert!(quad.material.samples(SECONDARY_CAPTURE));
        assert!(stage.secondary.find("quad").is_none());
    }

    #[test]
    fn helpers_follow_config() {
        let config = Config {
            grid: false,
            ..Config::default()
        };
        let stage = build_stage(&config);
        assert_eq!(stage.primary.is_visible(stage.handles.grid), Some(false));
        assert_eq!(stage.primary.is_visible(stage.handles.axes), Some(true));
    }

    #[test]
    fn backgrounds_match_config() {
        let config = Config {
            background: Color::from_hex(0xff8800),
            ..Config::default()
        };
        let stage = build_stage(&config);
        assert_eq!(stage.primary.background(), config.background);
        assert_eq!(stage.secondary.background(), config.background);
    }
}
