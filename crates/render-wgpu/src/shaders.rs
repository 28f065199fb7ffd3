//! WGSL sources. Every program shares the camera block and tone mapping in
//! [`COMMON`]; object data lives in a per-program bind group.

/// Camera uniform (group 0) and the ACES filmic tone-mapping curve.
pub const COMMON: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
    // x: 1.0 applies tone mapping
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> camera: Camera;

struct Object {
    model: mat4x4<f32>,
    normal: mat4x4<f32>,
    color: vec4<f32>,
    // x: env map strength, y: receives shadow
    params: vec4<f32>,
};

fn aces_fit(v: vec3<f32>) -> vec3<f32> {
    let a = v * (v + 0.0245786) - 0.000090537;
    let b = v * (0.983729 * v + 0.4329510) + 0.238081;
    return a / b;
}

fn tone_map(color: vec3<f32>) -> vec3<f32> {
    let input_mat = mat3x3<f32>(
        vec3<f32>(0.59719, 0.07600, 0.02840),
        vec3<f32>(0.35458, 0.90834, 0.13383),
        vec3<f32>(0.04823, 0.01566, 0.83777),
    );
    let output_mat = mat3x3<f32>(
        vec3<f32>(1.60475, -0.10208, -0.00327),
        vec3<f32>(-0.53108, 1.10813, -0.07276),
        vec3<f32>(-0.07367, -0.00605, 1.07602),
    );
    var c = input_mat * (color / 0.6);
    c = output_mat * aces_fit(c);
    return clamp(c, vec3<f32>(0.0), vec3<f32>(1.0));
}

fn finish(color: vec3<f32>) -> vec3<f32> {
    return mix(color, tone_map(color), camera.params.x);
}
"#;

/// Lit surfaces: spot + ambient light, PCF shadows, optional cube env map.
pub const MESH: &str = r#"
struct Lighting {
    spot_position: vec4<f32>,
    spot_direction: vec4<f32>,
    // rgb: color, a: intensity
    spot_color: vec4<f32>,
    // x: cos outer, y: cos inner, z: shadow bias, w: 1.0 when shadowed
    spot_cone: vec4<f32>,
    ambient: vec4<f32>,
    shadow_view_proj: mat4x4<f32>,
};

@group(1) @binding(0)
var<uniform> lighting: Lighting;
@group(1) @binding(1)
var shadow_map: texture_depth_2d;
@group(1) @binding(2)
var shadow_sampler: sampler_comparison;

@group(2) @binding(0)
var<uniform> entity: Object;

@group(3) @binding(0)
var env_map: texture_cube<f32>;
@group(3) @binding(1)
var env_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let world = entity.model * vec4<f32>(vertex.position, 1.0);
    var out: VertexOutput;
    out.clip_position = camera.view_proj * world;
    out.world_position = world.xyz;
    out.world_normal = (entity.normal * vec4<f32>(vertex.normal, 0.0)).xyz;
    return out;
}

fn shadow_factor(world_position: vec3<f32>) -> f32 {
    let clip = lighting.shadow_view_proj * vec4<f32>(world_position, 1.0);
    if (clip.w <= 0.0) {
        return 1.0;
    }
    let ndc = clip.xyz / clip.w;
    let uv = vec2<f32>(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
    if (any(uv < vec2<f32>(0.0)) || any(uv > vec2<f32>(1.0)) || ndc.z > 1.0) {
        return 1.0;
    }
    let texel = 1.0 / vec2<f32>(textureDimensions(shadow_map));
    let depth = ndc.z + lighting.spot_cone.z;
    var lit = 0.0;
    for (var y = -1; y <= 1; y = y + 1) {
        for (var x = -1; x <= 1; x = x + 1) {
            let offset = vec2<f32>(f32(x), f32(y)) * texel;
            lit = lit + textureSampleCompareLevel(shadow_map, shadow_sampler, uv + offset, depth);
        }
    }
    return lit / 9.0;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(in.world_normal);
    let view_dir = normalize(in.world_position - camera.eye.xyz);
    let env = textureSample(env_map, env_sampler, reflect(view_dir, n)).rgb;

    let to_light = normalize(lighting.spot_position.xyz - in.world_position);
    let cos_angle = dot(-to_light, lighting.spot_direction.xyz);
    let cone = smoothstep(lighting.spot_cone.x, lighting.spot_cone.y, cos_angle);
    let diffuse = max(dot(n, to_light), 0.0);

    var shadow = 1.0;
    if (entity.params.y > 0.5 && lighting.spot_cone.w > 0.5) {
        shadow = shadow_factor(in.world_position);
    }

    let light = lighting.ambient.rgb
        + lighting.spot_color.rgb * lighting.spot_color.a * diffuse * cone * shadow;
    var color = entity.color.rgb * light;
    color = mix(color, color * env, entity.params.x);
    return vec4<f32>(finish(color), entity.color.a);
}
"#;

/// Unlit vertex-colored line lists (grid and axes helpers).
pub const LINES: &str = r#"
@group(1) @binding(0)
var<uniform> entity: Object;

struct LineInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec3<f32>,
};

struct LineOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn vs_lines(vertex: LineInput) -> LineOutput {
    var out: LineOutput;
    out.clip_position = camera.view_proj * entity.model * vec4<f32>(vertex.position, 1.0);
    out.color = vertex.color;
    return out;
}

@fragment
fn fs_lines(in: LineOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(finish(in.color), 1.0);
}
"#;

/// Composite quad: `map1` on the left half, `map2` on the right, each shown as
/// a full panorama around its capture point.
pub const COMPOSITE: &str = r#"
const PI: f32 = 3.14159265;

@group(1) @binding(0)
var<uniform> entity: Object;

@group(2) @binding(0)
var map1: texture_cube<f32>;
@group(2) @binding(1)
var map2: texture_cube<f32>;
@group(2) @binding(2)
var map_sampler: sampler;

struct QuadInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct QuadOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_quad(vertex: QuadInput) -> QuadOutput {
    var out: QuadOutput;
    out.clip_position = camera.view_proj * entity.model * vec4<f32>(vertex.position, 1.0);
    out.uv = vertex.uv;
    return out;
}

fn panorama_direction(u: f32, v: f32) -> vec3<f32> {
    let theta = u * 2.0 * PI;
    let phi = (1.0 - v) * PI;
    return vec3<f32>(sin(phi) * cos(theta), cos(phi), sin(phi) * sin(theta));
}

@fragment
fn fs_quad(in: QuadOutput) -> @location(0) vec4<f32> {
    let dir = panorama_direction(fract(in.uv.x * 2.0), in.uv.y);
    let left = textureSample(map1, map_sampler, dir).rgb;
    let right = textureSample(map2, map_sampler, dir).rgb;
    let t = smoothstep(0.49, 0.51, in.uv.x);
    return vec4<f32>(finish(mix(left, right, t)), 1.0);
}
"#;

/// Depth-only pass from a spot light.
pub const SHADOW: &str = r#"
@group(1) @binding(0)
var<uniform> entity: Object;

@vertex
fn vs_shadow(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return camera.view_proj * entity.model * vec4<f32>(position, 1.0);
}
"#;

/// Full program source: the shared prelude followed by `body`.
pub fn program(body: &str) -> String {
    format!("{COMMON}\n{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn programs_declare_their_entry_points() {
        for (body, entries) in [
            (MESH, &["vs_main", "fs_main"][..]),
            (LINES, &["vs_lines", "fs_lines"][..]),
            (COMPOSITE, &["vs_quad", "fs_quad"][..]),
            (SHADOW, &["vs_shadow"][..]),
        ] {
            let src = program(body);
            for entry in entries {
                assert!(src.contains(&format!("fn {entry}(")), "missing {entry}");
            }
        }
    }

    #[test]
    fn composite_binds_both_maps_by_name() {
        assert!(COMPOSITE.contains("var map1: texture_cube<f32>"));
        assert!(COMPOSITE.contains("var map2: texture_cube<f32>"));
    }
}
