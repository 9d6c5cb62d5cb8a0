use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use wgpu::util::DeviceExt;

/// Right-handed perspective camera. Looks from `eye` towards `target`.
#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    aspect: f32,
}

impl Camera {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            eye: Vec3::Z,
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: fov_y_degrees.to_radians(),
            near,
            far,
            aspect,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Matches the projection to a viewport of the given pixel size. Zero sizes are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn get_vp_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable, Default)]
pub struct CameraUniform {
    view_proj: Mat4,
    // w is unused
    eye: Vec4,
}

impl CameraUniform {
    pub fn update(&mut self, camera: &Camera) {
        self.view_proj = camera.get_vp_matrix();
        self.eye = camera.eye.extend(1.0);
    }

    pub fn create_buffer(&self, device: &wgpu::Device) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform Buffer"),
            contents: bytemuck::cast_slice(&[*self]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })
    }

    pub fn update_buffer(&self, queue: &wgpu::Queue, buffer: &wgpu::Buffer) {
        queue.write_buffer(buffer, 0, bytemuck::cast_slice(&[*self]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_sets_aspect_ratio() {
        let mut camera = Camera::perspective(75.0, 1.0, 0.1, 100.0);

        camera.set_viewport(800, 600);
        assert_eq!(camera.aspect(), 800.0 / 600.0);

        camera.set_viewport(400, 400);
        assert_eq!(camera.aspect(), 1.0);
    }

    #[test]
    fn zero_sized_viewport_keeps_previous_aspect() {
        let mut camera = Camera::perspective(75.0, 2.0, 0.1, 100.0);

        camera.set_viewport(0, 600);
        camera.set_viewport(800, 0);

        assert_eq!(camera.aspect(), 2.0);
    }

    #[test]
    fn target_projects_to_the_center_of_the_screen() {
        let mut camera = Camera::perspective(75.0, 4.0 / 3.0, 0.1, 100.0);
        camera.eye = Vec3::new(0.0, 0.0, 20.0);

        let clip = camera.get_vp_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;

        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
