use winit::dpi::PhysicalSize;

use crate::{
    engine,
    frame_loop::{FrameClock, FrameLoop, StopToken},
    solar_system::SolarSystem,
};

/// The output side of the application: something that owns a surface and can draw the scene.
pub trait FrameRenderer {
    type Error;

    fn surface_size(&self) -> PhysicalSize<u32>;

    /// Called with positive sizes only.
    fn resize(&mut self, size: PhysicalSize<u32>);

    fn render(&mut self, state: &SolarSystem) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Schedule another frame.
    Continue,
    Stopped,
}

/// Owns the scene state, its renderer and the frame loop that drives both.
pub struct SceneApp<R> {
    state: SolarSystem,
    renderer: R,
    frame_loop: FrameLoop,
}

impl<R: FrameRenderer> SceneApp<R> {
    pub fn new(state: SolarSystem, renderer: R, clock: FrameClock) -> Self {
        let size = renderer.surface_size();

        let mut app = Self {
            state,
            renderer,
            frame_loop: FrameLoop::new(clock),
        };
        app.resize(size);
        app
    }

    /// Matches camera and surface to the container size. Zero sizes are ignored.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            log::debug!("Ignoring resize to {}x{}", size.width, size.height);
            return;
        }

        self.state.resize(size);
        self.renderer.resize(size);
    }

    /// Updates the orbits for the current elapsed time and renders one frame.
    pub fn on_frame(&mut self) -> Result<FrameStatus, R::Error> {
        let Some(elapsed) = self.frame_loop.next_frame() else {
            return Ok(FrameStatus::Stopped);
        };

        engine::update(&mut self.state, elapsed);
        self.renderer.render(&self.state)?;

        Ok(if self.frame_loop.is_running() {
            FrameStatus::Continue
        } else {
            FrameStatus::Stopped
        })
    }

    pub fn stop_token(&self) -> StopToken {
        self.frame_loop.stop_token()
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    pub fn clock_mut(&mut self) -> &mut FrameClock {
        self.frame_loop.clock_mut()
    }

    pub fn state(&self) -> &SolarSystem {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SolarSystem {
        &mut self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::time::Duration;

    use super::*;
    use crate::config::AppConfig;

    /// Stands in for the GPU renderer; remembers what it was asked to do.
    struct HeadlessRenderer {
        size: PhysicalSize<u32>,
        resizes: Vec<PhysicalSize<u32>>,
        rendered: Vec<Duration>,
    }

    impl HeadlessRenderer {
        fn new(width: u32, height: u32) -> Self {
            Self {
                size: PhysicalSize::new(width, height),
                resizes: Vec::new(),
                rendered: Vec::new(),
            }
        }
    }

    impl FrameRenderer for HeadlessRenderer {
        type Error = Infallible;

        fn surface_size(&self) -> PhysicalSize<u32> {
            self.size
        }

        fn resize(&mut self, size: PhysicalSize<u32>) {
            self.size = size;
            self.resizes.push(size);
        }

        fn render(&mut self, state: &SolarSystem) -> Result<(), Infallible> {
            self.rendered.push(state.elapsed());
            Ok(())
        }
    }

    fn app(width: u32, height: u32) -> SceneApp<HeadlessRenderer> {
        let size = PhysicalSize::new(width, height);
        let state = SolarSystem::new(&AppConfig::default(), size).unwrap();
        SceneApp::new(state, HeadlessRenderer::new(width, height), FrameClock::manual())
    }

    #[test]
    fn initial_size_sets_aspect_and_surface() {
        let app = app(800, 600);

        assert!((app.state().camera().aspect() - 1.333_333_3).abs() < 1e-6);
        assert_eq!(app.renderer().size, PhysicalSize::new(800, 600));
    }

    #[test]
    fn resize_updates_camera_and_surface() {
        let mut app = app(800, 600);

        app.resize(PhysicalSize::new(400, 400));

        assert_eq!(app.state().camera().aspect(), 1.0);
        assert_eq!(app.renderer().surface_size(), PhysicalSize::new(400, 400));
    }

    #[test]
    fn aspect_is_exact_for_arbitrary_sizes() {
        let mut app = app(800, 600);

        for (width, height) in [(1, 1), (1920, 1080), (333, 777), (4096, 1), (1, 4096)] {
            app.resize(PhysicalSize::new(width, height));
            assert_eq!(app.state().camera().aspect(), width as f32 / height as f32);
        }
    }

    #[test]
    fn last_resize_wins() {
        let mut app = app(800, 600);

        app.resize(PhysicalSize::new(1024, 768));
        app.resize(PhysicalSize::new(640, 480));

        assert_eq!(app.renderer().surface_size(), PhysicalSize::new(640, 480));
        assert_eq!(app.state().camera().aspect(), 640.0 / 480.0);
    }

    #[test]
    fn zero_size_resize_is_ignored() {
        let mut app = app(800, 600);
        let resizes_before = app.renderer().resizes.len();

        app.resize(PhysicalSize::new(0, 0));

        assert_eq!(app.renderer().resizes.len(), resizes_before);
        assert_eq!(app.renderer().surface_size(), PhysicalSize::new(800, 600));
    }

    #[test]
    fn each_frame_updates_then_renders_once() {
        let mut app = app(800, 600);

        app.clock_mut().advance(Duration::from_millis(2000));
        assert_eq!(app.on_frame(), Ok(FrameStatus::Continue));

        assert_eq!(app.renderer().rendered, vec![Duration::from_millis(2000)]);
        assert_eq!(app.state().orbit_angles().moon_orbit, 10.0);
    }

    #[test]
    fn stopped_app_renders_nothing() {
        let mut app = app(800, 600);
        assert_eq!(app.on_frame(), Ok(FrameStatus::Continue));

        app.stop_token().stop();

        assert!(!app.is_running());
        assert_eq!(app.on_frame(), Ok(FrameStatus::Stopped));
        assert_eq!(app.renderer().rendered.len(), 1);
    }
}
