//! Triangle-stream mesh shared by terrain chunks and the road strip.
//!
//! Vertices are pushed three at a time with a UV each, then optionally welded
//! into an indexed mesh before being handed to the physics world as a trimesh
//! collider (and to whatever renders it).

use std::collections::HashMap;

use rapier3d::prelude::{Point, Real};

#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    pub vertices: Vec<Point<Real>>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_triangle(&mut self, verts: [Point<Real>; 3], uvs: [[f32; 2]; 3]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&verts);
        self.uvs.extend_from_slice(&uvs);
        self.indices.push([base, base + 1, base + 2]);
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Merge vertices that share both position and UV.
    pub fn weld(&mut self) {
        let mut remap: HashMap<[u32; 5], u32> = HashMap::new();
        let mut vertices = Vec::with_capacity(self.vertices.len());
        let mut uvs = Vec::with_capacity(self.uvs.len());

        let old_to_new: Vec<u32> = self
            .vertices
            .iter()
            .zip(&self.uvs)
            .map(|(p, uv)| {
                let key = [
                    p.x.to_bits(), p.y.to_bits(), p.z.to_bits(),
                    uv[0].to_bits(), uv[1].to_bits(),
                ];
                *remap.entry(key).or_insert_with(|| {
                    vertices.push(*p);
                    uvs.push(*uv);
                    (vertices.len() - 1) as u32
                })
            })
            .collect();

        for tri in &mut self.indices {
            for i in tri.iter_mut() {
                *i = old_to_new[*i as usize];
            }
        }
        self.vertices = vertices;
        self.uvs = uvs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weld_merges_shared_corners() {
        let mut m = TriangleMesh::new();
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(1.0, 0.0, 0.0);
        let c = Point::new(0.0, 0.0, 1.0);
        let d = Point::new(1.0, 0.0, 1.0);
        m.push_triangle([a, b, c], [[0.0, 0.0]; 3]);
        m.push_triangle([c, b, d], [[0.0, 0.0]; 3]);
        assert_eq!(m.vertices.len(), 6);

        m.weld();
        assert_eq!(m.vertices.len(), 4);
        assert_eq!(m.triangle_count(), 2);
        assert_eq!(m.indices[1][0], m.indices[0][2]);
    }

    #[test]
    fn test_weld_keeps_uv_seams() {
        let mut m = TriangleMesh::new();
        let p = Point::new(0.0, 0.0, 0.0);
        m.push_triangle([p, p, p], [[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]);
        m.weld();
        assert_eq!(m.vertices.len(), 2);
    }
}
