//! Mesh data structures and generation

use crate::backend::types::Vertex;
use glam::{Vec2, Vec3};

/// A mesh with vertex and index data
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Index into the owning model's materials
    pub material_index: Option<usize>,
    pub name: String,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            material_index: None,
            name: name.to_string(),
        }
    }

    pub fn with_material(mut self, index: usize) -> Self {
        self.material_index = Some(index);
        self
    }

    /// Calculate vertex count
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Calculate index count
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Calculate triangle count
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get vertex data as bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Get index data as bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Derive per-vertex tangent and bitangent from positions and UVs.
    ///
    /// Triangle contributions are accumulated per vertex, then orthogonalized
    /// against the normal. Vertices without usable UVs get an arbitrary frame
    /// around the normal.
    pub fn compute_tangents(&mut self) {
        let mut tangents = vec![Vec3::ZERO; self.vertices.len()];
        let mut bitangents = vec![Vec3::ZERO; self.vertices.len()];

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (Some(v0), Some(v1), Some(v2)) =
                (self.vertices.get(i0), self.vertices.get(i1), self.vertices.get(i2))
            else {
                continue;
            };

            let e1 = v1.position - v0.position;
            let e2 = v2.position - v0.position;
            let d1 = v1.uv - v0.uv;
            let d2 = v2.uv - v0.uv;

            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (e1 * d2.y - e2 * d1.y) * r;
            let bitangent = (e2 * d1.x - e1 * d2.x) * r;

            for i in [i0, i1, i2] {
                tangents[i] += tangent;
                bitangents[i] += bitangent;
            }
        }

        for (vertex, (tangent, bitangent)) in self
            .vertices
            .iter_mut()
            .zip(tangents.into_iter().zip(bitangents))
        {
            let n = vertex.normal.normalize_or_zero();
            let t = (tangent - n * n.dot(tangent)).normalize_or_zero();
            let t = if t == Vec3::ZERO { n.any_orthonormal_vector() } else { t };
            let mut b = n.cross(t);
            if b.dot(bitangent) < 0.0 {
                b = -b;
            }
            vertex.tangent = t;
            vertex.bitangent = b;
        }
    }

    /// Create a unit cube centered at origin
    pub fn cube() -> Self {
        let mut mesh = Mesh::new("cube");

        let faces = [
            (Vec3::Z, Vec3::X),
            (-Vec3::Z, -Vec3::X),
            (Vec3::X, -Vec3::Z),
            (-Vec3::X, Vec3::Z),
            (Vec3::Y, Vec3::X),
            (-Vec3::Y, Vec3::X),
        ];
        let corners = [
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ];

        for (face, (normal, right)) in faces.into_iter().enumerate() {
            let up = normal.cross(right);
            for uv in corners {
                let offset = right * (uv.x - 0.5) + up * (0.5 - uv.y);
                mesh.vertices.push(Vertex {
                    position: normal * 0.5 + offset,
                    normal,
                    tangent: right,
                    bitangent: up,
                    uv,
                });
            }
            let base = face as u32 * 4;
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_six_quads() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.triangle_count(), 12);
        assert_eq!(cube.vertex_bytes().len(), 24 * 56);
    }

    #[test]
    fn cube_faces_wind_counter_clockwise() {
        let cube = Mesh::cube();
        for tri in cube.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| cube.vertices[i as usize]);
            let face_normal = (b.position - a.position).cross(c.position - a.position);
            assert!(face_normal.dot(a.normal) > 0.0);
        }
    }

    #[test]
    fn tangents_follow_uv_directions() {
        let mut mesh = Mesh::new("quad");
        for (position, uv) in [
            (Vec3::new(0.0, 0.0, 0.0), Vec2::new(0.0, 0.0)),
            (Vec3::new(1.0, 0.0, 0.0), Vec2::new(1.0, 0.0)),
            (Vec3::new(0.0, 1.0, 0.0), Vec2::new(0.0, 1.0)),
        ] {
            mesh.vertices.push(Vertex {
                position,
                normal: Vec3::Z,
                tangent: Vec3::ZERO,
                bitangent: Vec3::ZERO,
                uv,
            });
        }
        mesh.indices = vec![0, 1, 2];
        mesh.compute_tangents();

        for vertex in &mesh.vertices {
            assert!(vertex.tangent.abs_diff_eq(Vec3::X, 1e-5), "tangent {}", vertex.tangent);
            assert!(vertex.bitangent.abs_diff_eq(Vec3::Y, 1e-5), "bitangent {}", vertex.bitangent);
        }
    }

    #[test]
    fn degenerate_uvs_still_give_orthonormal_frame() {
        let mut mesh = Mesh::cube();
        for vertex in &mut mesh.vertices {
            vertex.uv = Vec2::ZERO;
        }
        mesh.compute_tangents();
        for vertex in &mesh.vertices {
            assert!((vertex.tangent.length() - 1.0).abs() < 1e-5);
            assert!(vertex.tangent.dot(vertex.normal).abs() < 1e-5);
        }
    }
}
