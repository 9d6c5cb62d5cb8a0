//! Pointer-drag camera controller that orbits the camera around a target point.
//!
//! Left drag rotates, right or middle drag pans, the wheel dollies in and out.
//! Dragging across the full window height turns the camera one full revolution.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton};

use crate::camera::Camera;

// Keeps the camera off the poles, where the up vector degenerates
const POLAR_EPSILON: f32 = 1e-4;

// The eye must never reach the target, the view matrix is undefined there
const DEFAULT_MIN_DISTANCE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Rotate,
    Pan,
}

#[derive(Debug, Clone)]
pub struct OrbitControls {
    target: Vec3,
    radius: f32,
    /// Azimuth around +Y, zero looking down -Z
    theta: f32,
    /// Angle from +Y
    phi: f32,

    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    drag: Option<DragMode>,
    last_pointer: Option<Vec2>,
}

impl OrbitControls {
    pub fn new(camera: &Camera) -> Self {
        let mut controls = Self {
            target: camera.target,
            radius: 1.0,
            theta: 0.0,
            phi: PI / 2.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: DEFAULT_MIN_DISTANCE,
            max_distance: f32::INFINITY,
            drag: None,
            last_pointer: None,
        };
        controls.set_eye(camera.eye);
        controls
    }

    fn set_eye(&mut self, eye: Vec3) {
        let offset = eye - self.target;
        self.radius = offset.length();
        if self.radius > 0.0 {
            self.theta = offset.x.atan2(offset.z);
            self.phi = (offset.y / self.radius).clamp(-1.0, 1.0).acos();
        }
        self.phi = self.phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn eye(&self) -> Vec3 {
        let sin_phi = self.phi.sin();
        self.target
            + self.radius
                * Vec3::new(
                    sin_phi * self.theta.sin(),
                    self.phi.cos(),
                    sin_phi * self.theta.cos(),
                )
    }

    #[cfg(test)]
    pub fn distance(&self) -> f32 {
        self.radius
    }

    pub fn pointer_button(&mut self, button: MouseButton, state: ElementState) {
        let mode = match button {
            MouseButton::Left => DragMode::Rotate,
            MouseButton::Right | MouseButton::Middle => DragMode::Pan,
            _ => return,
        };

        match state {
            ElementState::Pressed => self.drag = Some(mode),
            ElementState::Released if self.drag == Some(mode) => self.drag = None,
            ElementState::Released => {}
        }
    }

    /// Feeds a new pointer position in window pixels. Returns true if the camera moved.
    pub fn pointer_moved(
        &mut self,
        position: Vec2,
        viewport: PhysicalSize<u32>,
        camera: &Camera,
    ) -> bool {
        let last = self.last_pointer.replace(position);

        let (Some(mode), Some(last)) = (self.drag, last) else {
            return false;
        };
        if viewport.height == 0 {
            return false;
        }

        let delta = position - last;
        let height = viewport.height as f32;

        match mode {
            DragMode::Rotate => {
                self.theta -= TAU * delta.x / height * self.rotate_speed;
                self.phi = (self.phi - TAU * delta.y / height * self.rotate_speed)
                    .clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
            }
            DragMode::Pan => self.pan(delta, height, camera),
        }

        true
    }

    fn pan(&mut self, delta: Vec2, height: f32, camera: &Camera) {
        let eye = self.eye();
        let forward = (self.target - eye).normalize_or_zero();
        let right = forward.cross(camera.up).normalize_or_zero();
        let screen_up = right.cross(forward);

        // World units covered by one pixel at the target's depth
        let target_distance = self.radius * (camera.fov_y / 2.0).tan();
        let scale = 2.0 * target_distance / height * self.pan_speed;

        self.target += (-right * delta.x + screen_up * delta.y) * scale;
    }

    /// Wheel input in lines, positive away from the user (zoom in).
    pub fn scrolled(&mut self, lines: f32) {
        let scale = 0.95_f32.powf(self.zoom_speed * lines);
        self.radius = (self.radius * scale).clamp(self.min_distance, self.max_distance);
    }

    pub fn apply(&self, camera: &mut Camera) {
        camera.target = self.target;
        camera.eye = self.eye();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: PhysicalSize<u32> = PhysicalSize::new(800, 600);

    fn camera() -> Camera {
        let mut camera = Camera::perspective(75.0, 800.0 / 600.0, 0.1, 100.0);
        camera.eye = Vec3::new(0.0, 0.0, 20.0);
        camera
    }

    fn drag(controls: &mut OrbitControls, button: MouseButton, from: Vec2, to: Vec2) {
        let camera = camera();
        controls.pointer_moved(from, VIEWPORT, &camera);
        controls.pointer_button(button, ElementState::Pressed);
        controls.pointer_moved(to, VIEWPORT, &camera);
        controls.pointer_button(button, ElementState::Released);
    }

    #[test]
    fn starts_at_the_camera_position() {
        let controls = OrbitControls::new(&camera());

        assert!(controls.eye().abs_diff_eq(Vec3::new(0.0, 0.0, 20.0), 1e-4));
        assert_eq!(controls.distance(), 20.0);
    }

    #[test]
    fn quarter_height_drag_rotates_a_quarter_turn() {
        let mut controls = OrbitControls::new(&camera());

        drag(
            &mut controls,
            MouseButton::Left,
            Vec2::new(100.0, 300.0),
            Vec2::new(250.0, 300.0),
        );

        assert!(controls.eye().abs_diff_eq(Vec3::new(-20.0, 0.0, 0.0), 1e-3));
        assert!(controls.target().abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn moving_without_a_button_does_nothing() {
        let mut controls = OrbitControls::new(&camera());
        let camera = camera();

        assert!(!controls.pointer_moved(Vec2::new(0.0, 0.0), VIEWPORT, &camera));
        assert!(!controls.pointer_moved(Vec2::new(300.0, 100.0), VIEWPORT, &camera));
        assert!(controls.eye().abs_diff_eq(Vec3::new(0.0, 0.0, 20.0), 1e-4));
    }

    #[test]
    fn dragging_up_past_the_pole_stops_short_of_it() {
        let mut controls = OrbitControls::new(&camera());

        drag(
            &mut controls,
            MouseButton::Left,
            Vec2::new(0.0, 600.0),
            Vec2::new(0.0, 0.0),
        );

        // Dragging up swings the camera underneath the target
        let eye = controls.eye();
        assert!(eye.y < -19.99);
        assert!(eye.x.abs() > 0.0 || eye.z.abs() > 0.0);
    }

    #[test]
    fn pan_moves_target_and_eye_together() {
        let mut controls = OrbitControls::new(&camera());

        drag(
            &mut controls,
            MouseButton::Right,
            Vec2::new(400.0, 300.0),
            Vec2::new(300.0, 300.0),
        );

        // Dragging left slides the target to the right
        assert!(controls.target().x > 0.0);
        assert!(controls.target().y.abs() < 1e-5);
        assert!((controls.eye() - controls.target()).abs_diff_eq(Vec3::new(0.0, 0.0, 20.0), 1e-3));
    }

    #[test]
    fn wheel_zoom_respects_distance_limits() {
        let mut controls = OrbitControls::new(&camera());
        controls.min_distance = 5.0;
        controls.max_distance = 50.0;

        controls.scrolled(1.0);
        assert!((controls.distance() - 19.0).abs() < 1e-4);

        controls.scrolled(1000.0);
        assert_eq!(controls.distance(), 5.0);

        controls.scrolled(-1000.0);
        assert_eq!(controls.distance(), 50.0);
    }

    #[test]
    fn zooming_all_the_way_in_keeps_the_view_defined() {
        let mut controls = OrbitControls::new(&camera());

        controls.scrolled(10_000.0);

        let mut camera = camera();
        controls.apply(&mut camera);
        assert_eq!(controls.distance(), DEFAULT_MIN_DISTANCE);
        assert_ne!(camera.eye, camera.target);
        assert!(camera.get_vp_matrix().is_finite());
    }

    #[test]
    fn apply_writes_eye_and_target() {
        let mut controls = OrbitControls::new(&camera());
        controls.scrolled(1.0);

        let mut camera = camera();
        controls.apply(&mut camera);

        assert!(camera.eye.abs_diff_eq(Vec3::new(0.0, 0.0, 19.0), 1e-3));
        assert_eq!(camera.target, Vec3::ZERO);
    }
}
