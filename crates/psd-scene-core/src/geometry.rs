//! # Geometry Buffer
//!
//! Vertex positions, UVs and triangle indices backing a paintable node's mesh.
//!
//! The buffer keeps structured lists (`Vec2` per vertex, `[u32; 3]` per
//! triangle) for editing and regenerates the flat arrays the renderer reads
//! after every successful mutation.

use crate::errors::GeometryError;
use glam::Vec2;
use kurbo::BezPath;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryBuffer {
    positions: Vec<Vec2>,
    uvs: Vec<Vec2>,
    triangles: Vec<[u32; 3]>,

    flat_positions: Vec<f32>,
    flat_uvs: Vec<f32>,
    flat_indices: Vec<u32>,
    revision: u64,
}

impl GeometryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `width` x `height` quad with its origin at the top-left corner.
    pub fn quad(width: f32, height: f32) -> Self {
        let mut geometry = Self::new();
        geometry.positions = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(width, 0.0),
            Vec2::new(width, height),
            Vec2::new(0.0, height),
        ];
        geometry.uvs = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        geometry.triangles = vec![[0, 1, 2], [0, 2, 3]];
        geometry.regenerate();
        geometry
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn flat_positions(&self) -> &[f32] {
        &self.flat_positions
    }

    pub fn flat_uvs(&self) -> &[f32] {
        &self.flat_uvs
    }

    pub fn flat_indices(&self) -> &[u32] {
        &self.flat_indices
    }

    /// Incremented by every mutation; lets consumers skip unchanged uploads.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Appends a vertex and returns its index. No triangle is added.
    pub fn add_vertex(&mut self, x: f32, y: f32, u: f32, v: f32) -> u32 {
        self.positions.push(Vec2::new(x, y));
        self.uvs.push(Vec2::new(u, v));
        self.regenerate();
        (self.positions.len() - 1) as u32
    }

    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) -> Result<(), GeometryError> {
        let len = self.positions.len();
        for index in [i0, i1, i2] {
            if index as usize >= len {
                return Err(GeometryError::InvalidIndex { index, len });
            }
        }
        self.triangles.push([i0, i1, i2]);
        self.regenerate();
        Ok(())
    }

    pub fn set_vertex(&mut self, index: usize, x: f32, y: f32) -> Result<(), GeometryError> {
        let len = self.positions.len();
        let slot = self
            .positions
            .get_mut(index)
            .ok_or(GeometryError::OutOfRange { index, len })?;
        *slot = Vec2::new(x, y);
        self.regenerate();
        Ok(())
    }

    pub fn set_uv(&mut self, index: usize, u: f32, v: f32) -> Result<(), GeometryError> {
        let len = self.uvs.len();
        let slot = self
            .uvs
            .get_mut(index)
            .ok_or(GeometryError::OutOfRange { index, len })?;
        *slot = Vec2::new(u, v);
        self.regenerate();
        Ok(())
    }

    /// Removes a vertex and its UV.
    ///
    /// Every triangle that referenced the vertex is dropped as a whole (a
    /// triangle never survives with fewer than three corners); indices above
    /// the removed one shift down by one.
    pub fn remove_vertex(&mut self, index: usize) -> Result<(), GeometryError> {
        let len = self.positions.len();
        if index >= len {
            return Err(GeometryError::OutOfRange { index, len });
        }
        self.positions.remove(index);
        self.uvs.remove(index);

        let removed = index as u32;
        self.triangles.retain(|tri| !tri.contains(&removed));
        for tri in &mut self.triangles {
            for corner in tri.iter_mut() {
                if *corner > removed {
                    *corner -= 1;
                }
            }
        }
        self.regenerate();
        Ok(())
    }

    /// Outline of every triangle, for debug overlays.
    pub fn wireframe(&self) -> BezPath {
        let mut path = BezPath::new();
        for tri in &self.triangles {
            let [a, b, c] = tri.map(|i| {
                let p = self.positions[i as usize];
                kurbo::Point::new(p.x as f64, p.y as f64)
            });
            path.move_to(a);
            path.line_to(b);
            path.line_to(c);
            path.close_path();
        }
        path
    }

    fn regenerate(&mut self) {
        self.flat_positions.clear();
        self.flat_positions
            .extend(self.positions.iter().flat_map(|p| [p.x, p.y]));
        self.flat_uvs.clear();
        self.flat_uvs.extend(self.uvs.iter().flat_map(|uv| [uv.x, uv.y]));
        self.flat_indices.clear();
        self.flat_indices
            .extend(self.triangles.iter().flat_map(|tri| tri.iter().copied()));
        self.revision += 1;
    }
}
