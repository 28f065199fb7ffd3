use cubecam_common::{Color, Transform};
use glam::Vec3;
use std::fmt;

/// Identifies one of the stage's scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(pub u32);

/// Index of an object inside its scene. Only meaningful for that scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

/// Identifies a capture point across the whole stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptureId(pub u32);

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scene#{}", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

impl fmt::Display for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "capture#{}", self.0)
    }
}

/// Shape of a renderable object. Sizes are in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    /// Axis-aligned box centred on the origin.
    Box { width: f32, height: f32, depth: f32 },
    /// Subdivided icosahedron projected onto a sphere.
    Icosahedron { radius: f32, detail: u32 },
    /// Flat quad in the XY plane facing +Z.
    Plane { width: f32, height: f32 },
    /// Square line grid on the XZ plane.
    Grid { size: f32, divisions: u32 },
    /// Red/green/blue lines along +X/+Y/+Z.
    Axes { size: f32 },
}

impl Geometry {
    /// True for geometry drawn as line segments rather than triangles.
    pub fn is_lines(&self) -> bool {
        matches!(self, Geometry::Grid { .. } | Geometry::Axes { .. })
    }
}

/// Surface appearance of an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Diffuse surface lit by the scene's lights. Opacity below 1 blends.
    Standard { color: Color, opacity: f32 },
    /// Diffuse surface, optionally modulated by a capture point's cube image
    /// sampled along the reflection vector.
    Lambert {
        color: Color,
        env_map: Option<CaptureId>,
    },
    /// Custom program showing two capture images side by side.
    Composite { map1: CaptureId, map2: CaptureId },
    /// Unlit vertex-colored lines.
    Lines,
}

impl Material {
    /// Whether drawing this material reads the given capture point's image.
    pub fn samples(&self, capture: CaptureId) -> bool {
        match *self {
            Material::Lambert { env_map, .. } => env_map == Some(capture),
            Material::Composite { map1, map2 } => map1 == capture || map2 == capture,
            Material::Standard { .. } | Material::Lines => false,
        }
    }

    pub fn is_transparent(&self) -> bool {
        matches!(*self, Material::Standard { opacity, .. } if opacity < 1.0)
    }
}

/// A renderable entry in a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub geometry: Geometry,
    pub material: Material,
    pub transform: Transform,
    pub visible: bool,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, geometry: Geometry, material: Material) -> Self {
        Self {
            name: name.into(),
            geometry,
            material,
            transform: Transform::default(),
            visible: true,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn at(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn casting_shadow(mut self) -> Self {
        self.cast_shadow = true;
        self
    }

    pub fn receiving_shadow(mut self) -> Self {
        self.receive_shadow = true;
        self
    }
}

/// Depth-map shadow parameters for a spot light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSettings {
    /// Added to the fragment's light-space depth before comparison.
    pub bias: f32,
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            bias: 0.0,
            map_size: 512,
            near: 0.5,
            far: 500.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub position: Vec3,
    pub target: Vec3,
    pub color: Color,
    pub intensity: f32,
    /// Half-angle of the cone in radians.
    pub angle: f32,
    /// Fraction of the cone that fades out, 0..=1.
    pub penumbra: f32,
    pub shadow: Option<ShadowSettings>,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.0, 0.0),
            target: Vec3::ZERO,
            color: Color::WHITE,
            intensity: 1.0,
            angle: std::f32::consts::FRAC_PI_3,
            penumbra: 0.0,
            shadow: None,
        }
    }
}

impl SpotLight {
    /// Normalized direction the light points in.
    pub fn direction(&self) -> Vec3 {
        (self.target - self.position)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Y)
    }

    /// Cosines of the outer and inner cone edges, for a smoothstep falloff.
    pub fn cone_cosines(&self) -> (f32, f32) {
        let outer = self.angle.cos();
        let inner = (self.angle * (1.0 - self.penumbra.clamp(0.0, 1.0))).cos();
        (outer, inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Spot(SpotLight),
    Ambient { color: Color, intensity: f32 },
}

/// A cube camera: renders its scene in six directions into an offscreen cube
/// image that reflective materials sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapturePoint {
    pub id: CaptureId,
    pub position: Vec3,
    /// Edge length in texels of each cube face.
    pub resolution: u32,
    pub near: f32,
    pub far: f32,
    /// Object that displays this capture and must be hidden while refreshing it.
    pub reflector: Option<ObjectId>,
}

/// An ordered collection of objects, lights and capture points rendered together.
#[derive(Debug, Clone)]
pub struct Scene {
    id: SceneId,
    background: Color,
    objects: Vec<SceneObject>,
    lights: Vec<Light>,
    captures: Vec<CapturePoint>,
}

impl Scene {
    /// Create an empty scene with the given background.
    pub fn new(id: SceneId, background: Color) -> Self {
        Self {
            id,
            background,
            objects: Vec::new(),
            lights: Vec::new(),
            captures: Vec::new(),
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    /// Add an object. Returns its id.
    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        let id = ObjectId(self.objects.len());
        self.objects.push(object);
        id
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn add_capture(&mut self, capture: CapturePoint) {
        self.captures.push(capture);
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id.0)
    }

    /// Objects in insertion order, with their ids.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter().enumerate().map(|(i, o)| (ObjectId(i), o))
    }

    /// First object with the given name.
    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.objects().find(|(_, o)| o.name == name).map(|(id, _)| id)
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn captures(&self) -> &[CapturePoint] {
        &self.captures
    }

    pub fn is_visible(&self, id: ObjectId) -> Option<bool> {
        self.get(id).map(|o| o.visible)
    }

    /// Set an object's visibility. Returns the previous value, or `None` if the
    /// object does not exist.
    pub fn set_visible(&mut self, id: ObjectId, visible: bool) -> Option<bool> {
        self.get_mut(id)
            .map(|o| std::mem::replace(&mut o.visible, visible))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> SceneObject {
        SceneObject::new(
            "cube",
            Geometry::Box {
                width: 2.0,
                height: 2.0,
                depth: 2.0,
            },
            Material::Standard {
                color: Color::WHITE,
                opacity: 1.0,
            },
        )
    }

    #[test]
    fn scene_starts_empty() {
        let scene = Scene::new(SceneId(0), Color::BLACK);
        assert_eq!(scene.object_count(), 0);
        assert!(scene.lights().is_empty());
        assert!(scene.captures().is_empty());
    }

    #[test]
    fn ids_follow_insertion_order() {
        let mut scene = Scene::new(SceneId(0), Color::BLACK);
        let a = scene.add(cube());
        let b = scene.add(cube());
        assert_eq!(a, ObjectId(0));
        assert_eq!(b, ObjectId(1));
        let ids: Vec<ObjectId> = scene.objects().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn set_visible_returns_previous() {
        let mut scene = Scene::new(SceneId(0), Color::BLACK);
        let id = scene.add(cube());
        assert_eq!(scene.set_visible(id, false), Some(true));
        assert_eq!(scene.is_visible(id), Some(false));
        assert_eq!(scene.set_visible(id, true), Some(false));
        assert_eq!(scene.set_visible(ObjectId(9), false), None);
    }

    #[test]
    fn material_sampling() {
        let lambert = Material::Lambert {
            color: Color::WHITE,
            env_map: Some(CaptureId(1)),
        };
        assert!(lambert.samples(CaptureId(1)));
        assert!(!lambert.samples(CaptureId(2)));

        let composite = Material::Composite {
            map1: CaptureId(1),
            map2: CaptureId(2),
        };
        assert!(composite.samples(CaptureId(1)));
        assert!(composite.samples(CaptureId(2)));
        assert!(!Material::Lines.samples(CaptureId(1)));
    }

    #[test]
    fn transparency_follows_opacity() {
        let ground = Material::Standard {
            color: Color::WHITE,
            opacity: 0.8,
        };
        assert!(ground.is_transparent());
        assert!(!Material::Lines.is_transparent());
    }

    #[test]
    fn spot_cone_with_full_penumbra() {
        let spot = SpotLight {
            penumbra: 1.0,
            ..SpotLight::default()
        };
        let (outer, inner) = spot.cone_cosines();
        assert!((outer - 0.5).abs() < 1e-6);
        assert!((inner - 1.0).abs() < 1e-6);
    }
}
