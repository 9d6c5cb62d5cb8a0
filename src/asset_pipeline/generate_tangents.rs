// The moon's normal map needs per-vertex tangents, which the procedural sphere doesn't have.

use anyhow::bail;
use bevy_mikktspace::{generate_tangents, Geometry};
use glam::Vec4;

use crate::model::ModelPrimitive;

impl Geometry for ModelPrimitive {
    fn num_faces(&self) -> usize {
        self.indices.len() / 3
    }

    fn num_vertices_of_face(&self, _face: usize) -> usize {
        3
    }

    fn position(&self, face: usize, vert: usize) -> [f32; 3] {
        self.vertex_by_triangle_index(face, vert).position.to_array()
    }

    fn normal(&self, face: usize, vert: usize) -> [f32; 3] {
        self.vertex_by_triangle_index(face, vert).normal.to_array()
    }

    fn tex_coord(&self, face: usize, vert: usize) -> [f32; 2] {
        self.vertex_by_triangle_index(face, vert)
            .tex_coords
            .to_array()
    }

    fn set_tangent_encoded(&mut self, tangent: [f32; 4], face: usize, vert: usize) {
        self.vertex_by_triangle_index_mut(face, vert).tangent = Vec4::from_array(tangent);
    }
}

impl ModelPrimitive {
    /// Generate tangents for this primitive using mikktspace algorithm
    pub fn generate_tangents(&mut self) -> anyhow::Result<()> {
        if !generate_tangents(self) {
            bail!("Failed to generate tangents")
        }

        Ok(())
    }
}
