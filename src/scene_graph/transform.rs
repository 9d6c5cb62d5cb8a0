use glam::{Mat4, Quat, Vec3};
use std::cell::Cell;

/// Local translation/rotation/scale of a scene node, with cached local and world matrices.
///
/// The world matrix is written by [`crate::scene_graph::scene::Scene`] during its
/// hierarchical update; the transform itself only tracks whether it needs one.
#[derive(Debug, Clone)]
pub struct Transform {
    translation: Vec3,
    rotation: Quat,
    scale: f32,

    local_matrix: Cell<Mat4>,
    world_matrix: Cell<Mat4>,
    local_dirty: Cell<bool>,
    world_dirty: Cell<bool>,
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::IDENTITY, 1.0)
    }

    pub fn new(translation: Vec3, rotation: Quat, scale: f32) -> Self {
        Self {
            translation,
            rotation,
            scale,
            local_matrix: Cell::new(Mat4::IDENTITY),
            world_matrix: Cell::new(Mat4::IDENTITY),
            local_dirty: Cell::new(true),
            world_dirty: Cell::new(true),
        }
    }

    pub fn local_matrix(&self) -> Mat4 {
        if self.local_dirty.get() {
            let matrix = Mat4::from_scale_rotation_translation(
                Vec3::splat(self.scale),
                self.rotation,
                self.translation,
            );

            self.local_matrix.set(matrix);
            self.local_dirty.set(false);
            self.invalidate_world();
        }

        self.local_matrix.get()
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix.get()
    }

    pub fn set_world_matrix(&self, world_matrix: Mat4) {
        self.world_matrix.set(world_matrix);
        self.world_dirty.set(false);
    }

    pub fn invalidate_local(&self) {
        self.local_dirty.set(true);
        self.world_dirty.set(true);
    }

    pub fn invalidate_world(&self) {
        self.world_dirty.set(true);
    }

    pub fn is_world_dirty(&self) -> bool {
        self.world_dirty.get()
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.invalidate_local();
    }

    #[cfg(test)]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    #[cfg(test)]
    pub fn scale(&self) -> f32 {
        self.scale
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_translation(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_matrix_applies_scale_then_rotation_then_translation() {
        let transform = Transform::new(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            2.0,
        );

        let point = transform.local_matrix().transform_point3(Vec3::X);

        assert!(point.abs_diff_eq(Vec3::new(10.0, 0.0, -2.0), 1e-5));
    }

    #[test]
    fn setters_mark_the_transform_dirty() {
        let mut transform = Transform::default();
        transform.local_matrix();
        transform.set_world_matrix(Mat4::IDENTITY);
        assert!(!transform.is_world_dirty());

        transform.set_rotation(Quat::from_rotation_y(1.0));

        assert!(transform.is_world_dirty());
        assert_eq!(transform.rotation(), Quat::from_rotation_y(1.0));
    }
}
