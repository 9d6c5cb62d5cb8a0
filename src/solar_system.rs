use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use glam::{Quat, Vec2, Vec3};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton};

use crate::{
    asset_pipeline::{materials::MaterialData, sphere::sphere},
    camera::Camera,
    config::AppConfig,
    material_manager::MaterialManager,
    model::Model,
    orbit_controls::OrbitControls,
    scene_graph::{Object3D, ObjectId, Renderable, Scene, SceneModel, Transform},
};

pub const SOLAR_SYSTEM: &str = "Solar System";
pub const EARTH_ORBIT: &str = "Earth Orbit";
pub const MOON_ORBIT: &str = "Moon Orbit";

const FIELD_OF_VIEW: f32 = 75.0;
const NEAR: f32 = 0.1;
const FAR: f32 = 100.0;
const CAMERA_DISTANCE: f32 = 20.0;

const EARTH_ORBIT_RADIUS: f32 = 10.0;
const MOON_ORBIT_RADIUS: f32 = 5.0;
const SUN_SCALE: f32 = 3.0;
const MOON_SCALE: f32 = 0.5;

/// Rotation about +Y of each orbit node, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitAngles {
    pub solar_system: f32,
    pub earth_orbit: f32,
    pub moon_orbit: f32,
}

impl OrbitAngles {
    /// Angles are derived from the absolute elapsed time, so frame pacing never accumulates drift.
    pub fn at(elapsed: Duration) -> Self {
        let t = elapsed.as_secs_f32();

        Self {
            solar_system: t / 2.0,
            earth_orbit: t / 2.0,
            moon_orbit: t * 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DirectionalLight {
    pub color: Vec3,
    pub intensity: f32,
    /// The light shines from here towards the origin
    pub position: Vec3,
}

impl DirectionalLight {
    pub fn direction(&self) -> Vec3 {
        (-self.position).normalize_or_zero()
    }
}

pub struct SolarSystem {
    camera: Camera,
    controls: OrbitControls,
    light: DirectionalLight,
    background: PathBuf,
    scene: Scene,
    materials: MaterialManager,
    viewport: PhysicalSize<u32>,
    elapsed: Duration,
    solar_system: ObjectId,
    earth_orbit: ObjectId,
    moon_orbit: ObjectId,
}

impl SolarSystem {
    pub fn new(config: &AppConfig, viewport: PhysicalSize<u32>) -> anyhow::Result<Self> {
        let mut camera = Camera::perspective(FIELD_OF_VIEW, 1.0, NEAR, FAR);
        camera.set_viewport(viewport.width, viewport.height);
        camera.eye = Vec3::new(0.0, 0.0, CAMERA_DISTANCE);

        let light = DirectionalLight {
            color: Vec3::ONE,
            intensity: 1.0,
            position: Vec3::new(-1.0, 2.0, 4.0),
        };

        let mut scene = Scene::new();
        let mut materials = MaterialManager::new();

        let mut sphere = sphere(1.0, 12, 12);
        sphere
            .generate_tangents()
            .context("Failed to generate sphere tangents")?;
        let sphere = scene.add_model(SceneModel::new(Model::from_primitive("Sphere", sphere)));

        let sun_material = materials.add_material(
            MaterialData::phong("Sun").with_color_map(config.texture_path("sun.jpeg")),
        );
        let earth_material = materials.add_material(
            MaterialData::phong("Earth").with_color_map(config.texture_path("earth.jpg")),
        );
        let moon_material = materials.add_material(
            MaterialData::standard("Moon")
                .with_color_map(config.texture_path("moon.jpg"))
                .with_normal_map(config.texture_path("normal.jpg")),
        );

        let mesh = |name: &str, scale: f32, material_id| {
            Object3D::new(name, Transform::new(Vec3::ZERO, Quat::IDENTITY, scale)).with_renderable(
                Renderable {
                    model_id: sphere,
                    material_id,
                },
            )
        };

        let solar_system = scene.add_object(Object3D::new(SOLAR_SYSTEM, Transform::default()));
        scene.add_child(solar_system, mesh("Sun", SUN_SCALE, sun_material));

        let earth_orbit = scene.add_child(
            solar_system,
            Object3D::new(
                EARTH_ORBIT,
                Transform::from_translation(Vec3::X * EARTH_ORBIT_RADIUS),
            ),
        );
        scene.add_child(earth_orbit, mesh("Earth", 1.0, earth_material));

        let moon_orbit = scene.add_child(
            earth_orbit,
            Object3D::new(
                MOON_ORBIT,
                Transform::from_translation(Vec3::X * MOON_ORBIT_RADIUS),
            ),
        );
        scene.add_child(moon_orbit, mesh("Moon", MOON_SCALE, moon_material));

        scene.late_update();
        scene.log_hierarchy();

        let controls = OrbitControls::new(&camera);

        Ok(Self {
            camera,
            controls,
            light,
            background: config.texture_path("space.jpg"),
            scene,
            materials,
            viewport,
            elapsed: Duration::ZERO,
            solar_system,
            earth_orbit,
            moon_orbit,
        })
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn light(&self) -> &DirectionalLight {
        &self.light
    }

    pub fn background(&self) -> &Path {
        &self.background
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn materials(&self) -> &MaterialManager {
        &self.materials
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[cfg(test)]
    pub fn orbit_angles(&self) -> OrbitAngles {
        OrbitAngles::at(self.elapsed)
    }

    #[cfg(test)]
    pub fn orbit_ids(&self) -> [ObjectId; 3] {
        [self.solar_system, self.earth_orbit, self.moon_orbit]
    }

    /// Tracks the container size. Zero-sized viewports (minimized windows) are ignored.
    pub fn resize(&mut self, viewport: PhysicalSize<u32>) {
        if viewport.width == 0 || viewport.height == 0 {
            return;
        }

        self.viewport = viewport;
        self.camera.set_viewport(viewport.width, viewport.height);
    }

    pub fn pointer_button(&mut self, button: MouseButton, state: ElementState) {
        self.controls.pointer_button(button, state);
    }

    pub fn pointer_moved(&mut self, position: Vec2) {
        if self
            .controls
            .pointer_moved(position, self.viewport, &self.camera)
        {
            self.controls.apply(&mut self.camera);
        }
    }

    pub fn scrolled(&mut self, lines: f32) {
        self.controls.scrolled(lines);
        self.controls.apply(&mut self.camera);
    }

    pub fn update(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
        let angles = OrbitAngles::at(elapsed);

        for (id, angle) in [
            (self.solar_system, angles.solar_system),
            (self.earth_orbit, angles.earth_orbit),
            (self.moon_orbit, angles.moon_orbit),
        ] {
            self.scene.set_object_rotation(id, Quat::from_rotation_y(angle));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::TAU;

    use super::*;
    use crate::engine;

    fn solar_system() -> SolarSystem {
        SolarSystem::new(&AppConfig::default(), PhysicalSize::new(800, 600)).unwrap()
    }

    fn world_position(state: &SolarSystem, name: &str) -> Vec3 {
        let id = state.scene().get_object_by_name(name).unwrap();
        state
            .scene()
            .get_object_transform(id)
            .unwrap()
            .world_matrix()
            .transform_point3(Vec3::ZERO)
    }

    fn rotation_angle(state: &SolarSystem, id: ObjectId) -> f32 {
        let rotation = state.scene().get_object_transform(id).unwrap().rotation();
        let (axis, angle) = rotation.to_axis_angle();
        angle * axis.y.signum()
    }

    #[test]
    fn all_angles_are_zero_at_start() {
        assert_eq!(
            OrbitAngles::at(Duration::ZERO),
            OrbitAngles {
                solar_system: 0.0,
                earth_orbit: 0.0,
                moon_orbit: 0.0,
            }
        );
    }

    #[test]
    fn angles_follow_elapsed_seconds() {
        let angles = OrbitAngles::at(Duration::from_millis(2000));

        assert_eq!(angles.solar_system, 1.0);
        assert_eq!(angles.earth_orbit, 1.0);
        assert_eq!(angles.moon_orbit, 10.0);
    }

    #[test]
    fn angles_do_not_depend_on_frame_history() {
        let mut stepped = solar_system();
        for frame in 0..=120 {
            engine::update(&mut stepped, Duration::from_millis(frame * 16));
        }

        let mut jumped = solar_system();
        engine::update(&mut jumped, Duration::from_millis(120 * 16));

        assert_eq!(stepped.orbit_angles(), jumped.orbit_angles());
        for name in ["Sun", "Earth", "Moon"] {
            assert!(world_position(&stepped, name).abs_diff_eq(world_position(&jumped, name), 1e-5));
        }
    }

    #[test]
    fn hierarchy_places_bodies_at_their_orbits() {
        let state = solar_system();

        assert!(world_position(&state, "Sun").abs_diff_eq(Vec3::ZERO, 1e-6));
        assert!(world_position(&state, "Earth").abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-5));
        assert!(world_position(&state, "Moon").abs_diff_eq(Vec3::new(15.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn orbit_nodes_rotate_about_the_vertical_axis() {
        let mut state = solar_system();
        engine::update(&mut state, Duration::from_millis(500));

        let [solar_system, earth_orbit, moon_orbit] = state.orbit_ids();
        assert!((rotation_angle(&state, solar_system) - 0.25).abs() < 1e-5);
        assert!((rotation_angle(&state, earth_orbit) - 0.25).abs() < 1e-5);
        assert!((rotation_angle(&state, moon_orbit) - 2.5).abs() < 1e-5);
    }

    #[test]
    fn moon_orbit_at_two_seconds_is_ten_radians() {
        let mut state = solar_system();
        engine::update(&mut state, Duration::from_millis(2000));

        let [_, _, moon_orbit] = state.orbit_ids();
        let rotation = state
            .scene()
            .get_object_transform(moon_orbit)
            .unwrap()
            .rotation();
        let expected = Quat::from_rotation_y(10.0 - TAU);

        // q and -q are the same rotation
        assert!(rotation.dot(expected).abs() > 1.0 - 1e-5);
    }

    #[test]
    fn bodies_share_one_sphere_model() {
        let state = solar_system();

        let models: Vec<_> = state
            .scene()
            .renderables()
            .map(|(_, renderable, _)| renderable.model_id)
            .collect();

        assert_eq!(models.len(), 3);
        assert!(models.iter().all(|&id| id == models[0]));
        assert_eq!(state.scene().models().count(), 1);
    }

    #[test]
    fn sun_and_moon_are_scaled() {
        let state = solar_system();

        let scale_of = |name: &str| {
            let id = state.scene().get_object_by_name(name).unwrap();
            state.scene().get_object_transform(id).unwrap().scale()
        };

        assert_eq!(scale_of("Sun"), 3.0);
        assert_eq!(scale_of("Earth"), 1.0);
        assert_eq!(scale_of("Moon"), 0.5);
    }

    #[test]
    fn resize_tracks_aspect_and_ignores_zero_sizes() {
        let mut state = solar_system();
        assert_eq!(state.camera().aspect(), 800.0 / 600.0);

        state.resize(PhysicalSize::new(400, 400));
        assert_eq!(state.camera().aspect(), 1.0);

        state.resize(PhysicalSize::new(0, 0));
        assert_eq!(state.camera().aspect(), 1.0);
    }

    #[test]
    fn scrolling_moves_the_camera_closer() {
        let mut state = solar_system();

        state.scrolled(2.0);

        assert!(state.camera().eye.z < CAMERA_DISTANCE);
        assert_eq!(state.camera().target, Vec3::ZERO);
    }

    #[test]
    fn light_shines_towards_the_origin() {
        let state = solar_system();

        let direction = state.light().direction();
        assert!(direction.abs_diff_eq(-Vec3::new(-1.0, 2.0, 4.0).normalize(), 1e-6));
    }
}
