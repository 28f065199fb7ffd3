use bytemuck::{Pod, Zeroable};
use cubecam_common::Color;
use cubecam_scene::Geometry;
use glam::{Vec2, Vec3};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: uv.to_array(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl LineVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    fn new(position: Vec3, color: Color) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
        }
    }
}

/// CPU-side geometry ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshData {
    Triangles {
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
    },
    /// Line list: every two vertices form one segment.
    Lines(Vec<LineVertex>),
}

pub fn build(geometry: &Geometry) -> MeshData {
    match *geometry {
        Geometry::Box {
            width,
            height,
            depth,
        } => box_mesh(Vec3::new(width, height, depth)),
        Geometry::Icosahedron { radius, detail } => icosahedron_mesh(radius, detail),
        Geometry::Plane { width, height } => plane_mesh(width, height),
        Geometry::Grid { size, divisions } => MeshData::Lines(grid_lines(size, divisions)),
        Geometry::Axes { size } => MeshData::Lines(axes_lines(size)),
    }
}

/// Box centred on the origin, four vertices per face so normals stay flat.
fn box_mesh(size: Vec3) -> MeshData {
    let h = size * 0.5;
    // (normal, u axis, v axis) per face; corners are normal ± u ± v.
    let faces = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = (normal + u * su + v * sv) * h;
            let uv = Vec2::new((su + 1.0) * 0.5, (sv + 1.0) * 0.5);
            vertices.push(Vertex::new(position, normal, uv));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    MeshData::Triangles { vertices, indices }
}

/// Quad in the XY plane facing +Z, `uv.y` = 1 along the top edge.
fn plane_mesh(width: f32, height: f32) -> MeshData {
    let (hw, hh) = (width * 0.5, height * 0.5);
    let vertices = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
        .into_iter()
        .map(|(x, y)| {
            Vertex::new(
                Vec3::new(x * hw, y * hh, 0.0),
                Vec3::Z,
                Vec2::new((x + 1.0) * 0.5, (y + 1.0) * 0.5),
            )
        })
        .collect();
    MeshData::Triangles {
        vertices,
        indices: vec![0, 1, 2, 2, 3, 0],
    }
}

#[rustfmt::skip]
const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
    [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
    [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
    [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
];

fn icosahedron_corners() -> [Vec3; 12] {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ]
}

/// Icosahedron with each face split into `(detail + 1)^2` triangles, pushed
/// out to the sphere. Normals point away from the centre, so shading is smooth.
fn icosahedron_mesh(radius: f32, detail: u32) -> MeshData {
    let corners = icosahedron_corners();
    let n = detail as usize + 1;
    let mut vertices = Vec::with_capacity(ICOSAHEDRON_FACES.len() * n * n * 3);

    let mut push = |p: Vec3| {
        let normal = p.normalize();
        let u = 0.5 + normal.z.atan2(normal.x) / std::f32::consts::TAU;
        let v = 0.5 + normal.y.asin() / std::f32::consts::PI;
        vertices.push(Vertex::new(normal * radius, normal, Vec2::new(u, v)));
    };

    for [a, b, c] in ICOSAHEDRON_FACES {
        let (a, b, c) = (corners[a], corners[b], corners[c]);
        let step = 1.0 / n as f32;
        let point =
            |i: usize, j: usize| a + (b - a) * (i as f32 * step) + (c - a) * (j as f32 * step);
        for i in 0..n {
            for j in 0..n - i {
                push(point(i, j));
                push(point(i + 1, j));
                push(point(i, j + 1));
                if i + j + 1 < n {
                    push(point(i + 1, j));
                    push(point(i + 1, j + 1));
                    push(point(i, j + 1));
                }
            }
        }
    }

    let indices = (0..vertices.len() as u32).collect();
    MeshData::Triangles { vertices, indices }
}

/// Square grid on the XZ plane; the middle lines use a darker color.
fn grid_lines(size: f32, divisions: u32) -> Vec<LineVertex> {
    let center_color = Color::from_hex(0x444444);
    let grid_color = Color::from_hex(0x888888);
    let half = size / 2.0;
    let step = size / divisions.max(1) as f32;

    let mut lines = Vec::with_capacity((divisions as usize + 1) * 4);
    for i in 0..=divisions {
        let k = -half + i as f32 * step;
        let color = if i == divisions / 2 {
            center_color
        } else {
            grid_color
        };
        lines.push(LineVertex::new(Vec3::new(-half, 0.0, k), color));
        lines.push(LineVertex::new(Vec3::new(half, 0.0, k), color));
        lines.push(LineVertex::new(Vec3::new(k, 0.0, -half), color));
        lines.push(LineVertex::new(Vec3::new(k, 0.0, half), color));
    }
    lines
}

fn axes_lines(size: f32) -> Vec<LineVertex> {
    [
        (Vec3::X, Color::rgb(1.0, 0.0, 0.0)),
        (Vec3::Y, Color::rgb(0.0, 1.0, 0.0)),
        (Vec3::Z, Color::rgb(0.0, 0.0, 1.0)),
    ]
    .into_iter()
    .flat_map(|(axis, color)| {
        [
            LineVertex::new(Vec3::ZERO, color),
            LineVertex::new(axis * size, color),
        ]
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangles(data: MeshData) -> (Vec<Vertex>, Vec<u32>) {
        match data {
            MeshData::Triangles { vertices, indices } => (vertices, indices),
            MeshData::Lines(_) => panic!("expected triangles"),
        }
    }

    fn lines(data: MeshData) -> Vec<LineVertex> {
        match data {
            MeshData::Lines(v) => v,
            MeshData::Triangles { .. } => panic!("expected lines"),
        }
    }

    #[test]
    fn box_has_flat_faces_within_extent() {
        let (vertices, indices) = triangles(build(&Geometry::Box {
            width: 2.0,
            height: 4.0,
            depth: 6.0,
        }));
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
        for v in &vertices {
            let p = Vec3::from(v.position);
            assert!(p.x.abs() <= 1.0 + 1e-6 && p.y.abs() <= 2.0 + 1e-6 && p.z.abs() <= 3.0 + 1e-6);
            // Every vertex lies on the face its normal points through.
            let n = Vec3::from(v.normal);
            assert!((p.dot(n) - (Vec3::new(1.0, 2.0, 3.0) * n.abs()).element_sum()).abs() < 1e-5);
        }
    }

    #[test]
    fn icosahedron_lies_on_sphere() {
        let (vertices, indices) = triangles(build(&Geometry::Icosahedron {
            radius: 2.0,
            detail: 1,
        }));
        // 20 faces, 4 triangles each.
        assert_eq!(vertices.len(), 20 * 4 * 3);
        assert_eq!(indices.len(), vertices.len());
        for v in &vertices {
            assert!((Vec3::from(v.position).length() - 2.0).abs() < 1e-5);
            assert!((Vec3::from(v.normal).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn icosahedron_detail_zero_is_base_solid() {
        let (vertices, _) = triangles(build(&Geometry::Icosahedron {
            radius: 1.0,
            detail: 0,
        }));
        assert_eq!(vertices.len(), 60);
    }

    #[test]
    fn plane_faces_forward() {
        let (vertices, indices) = triangles(build(&Geometry::Plane {
            width: 1.0,
            height: 1.0,
        }));
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices, vec![0, 1, 2, 2, 3, 0]);
        assert!(vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        assert_eq!(vertices[2].uv, [1.0, 1.0]);
    }

    #[test]
    fn grid_line_count_matches_divisions() {
        let verts = lines(build(&Geometry::Grid {
            size: 30.0,
            divisions: 30,
        }));
        assert_eq!(verts.len(), 31 * 4);
        assert!(verts.iter().all(|v| v.position[1] == 0.0));
        assert!(
            verts
                .iter()
                .all(|v| v.position[0].abs() <= 15.0 && v.position[2].abs() <= 15.0)
        );
    }

    #[test]
    fn axes_are_three_segments() {
        let verts = lines(build(&Geometry::Axes { size: 5.0 }));
        assert_eq!(verts.len(), 6);
        assert_eq!(verts[1].position, [5.0, 0.0, 0.0]);
        assert_eq!(verts[3].position, [0.0, 5.0, 0.0]);
        assert_eq!(verts[5].position, [0.0, 0.0, 5.0]);
    }
}
