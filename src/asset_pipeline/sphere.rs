use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};
use itertools::iproduct;

use crate::model::{ModelPrimitive, Vertex};

/// Builds a UV sphere centered on the origin.
///
/// Vertices are laid out in `height_segments + 1` rows of `width_segments + 1`,
/// starting at the north pole (+Y). The seam column is duplicated so texture
/// coordinates wrap cleanly, and pole rows only emit one triangle per quad.
/// Texture coordinates use a top-left origin, `v = 0` at the north pole.
pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> ModelPrimitive {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);

    let mut vertices = Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);

    for (iy, ix) in iproduct!(0..=height_segments, 0..=width_segments) {
        let v = iy as f32 / height_segments as f32;
        let u = ix as f32 / width_segments as f32;

        // Pole vertices sit at the middle of their quad in u
        let u_offset = if iy == 0 {
            0.5 / width_segments as f32
        } else if iy == height_segments {
            -0.5 / width_segments as f32
        } else {
            0.0
        };

        let phi = u * TAU;
        let theta = v * PI;
        let normal = Vec3::new(
            -phi.cos() * theta.sin(),
            theta.cos(),
            phi.sin() * theta.sin(),
        );

        vertices.push(Vertex::new(
            normal * radius,
            normal,
            Vec2::new(u + u_offset, v),
        ));
    }

    let row = width_segments + 1;
    let mut indices = Vec::new();

    for (iy, ix) in iproduct!(0..height_segments, 0..width_segments) {
        let a = iy * row + ix + 1;
        let b = iy * row + ix;
        let c = (iy + 1) * row + ix;
        let d = (iy + 1) * row + ix + 1;

        if iy != 0 {
            indices.extend_from_slice(&[a, b, d]);
        }
        if iy != height_segments - 1 {
            indices.extend_from_slice(&[b, c, d]);
        }
    }

    ModelPrimitive {
        index: 0,
        vertices,
        indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_by_twelve_sphere_has_expected_counts() {
        let sphere = sphere(1.0, 12, 12);

        assert_eq!(sphere.vertices.len(), 13 * 13);
        // Pole rows contribute one triangle per segment, inner rows two
        assert_eq!(sphere.indices.len(), (12 + 12 + 10 * 24) * 3);
        assert!(sphere
            .indices
            .iter()
            .all(|&index| (index as usize) < sphere.vertices.len()));
    }

    #[test]
    fn vertices_lie_on_the_radius() {
        let sphere = sphere(3.0, 12, 12);

        for vertex in &sphere.vertices {
            assert!((vertex.position.length() - 3.0).abs() < 1e-4);
            assert!((vertex.normal.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn poles_are_at_plus_and_minus_y() {
        let sphere = sphere(1.0, 12, 12);

        let north = sphere.vertices.first().unwrap();
        let south = sphere.vertices.last().unwrap();
        assert!(north.position.abs_diff_eq(Vec3::Y, 1e-5));
        assert!(south.position.abs_diff_eq(Vec3::NEG_Y, 1e-5));
        assert_eq!(north.tex_coords.y, 0.0);
        assert_eq!(south.tex_coords.y, 1.0);
    }

    #[test]
    fn triangles_wind_counter_clockwise_from_outside() {
        let sphere = sphere(1.0, 12, 12);

        for triangle in sphere.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| sphere.vertices[triangle[i] as usize].position);
            let face_normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(face_normal.dot(centroid) > 0.0);
        }
    }
}
