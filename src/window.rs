use std::sync::Arc;

use anyhow::Context;
use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::{
    app::{FrameStatus, SceneApp},
    config::AppConfig,
    frame_loop::FrameClock,
    rendering::renderer::Renderer,
    solar_system::SolarSystem,
};

// Trackpads report pixels, wheels report lines
const PIXELS_PER_LINE: f32 = 100.0;

struct App {
    config: AppConfig,
    scene_app: Option<SceneApp<Renderer>>,
    startup_error: Option<anyhow::Error>,
}

impl App {
    fn new(config: AppConfig) -> Self {
        Self {
            config,
            scene_app: None,
            startup_error: None,
        }
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<SceneApp<Renderer>> {
        let window_attributes = Window::default_attributes()
            .with_title(self.config.window_title.clone())
            .with_inner_size(self.config.initial_size);
        let window = event_loop
            .create_window(window_attributes)
            .context("Failed to create window")?;
        let window = Arc::new(window);

        let state = SolarSystem::new(&self.config, window.inner_size())
            .context("Failed to create solar system")?;
        let renderer = pollster::block_on(Renderer::new(window.clone(), &state, &self.config))
            .context("Failed to create renderer")?;

        window.request_redraw();

        Ok(SceneApp::new(state, renderer, FrameClock::realtime()))
    }

    fn redraw(scene_app: &mut SceneApp<Renderer>, event_loop: &ActiveEventLoop) {
        match scene_app.on_frame() {
            Ok(FrameStatus::Continue) => {}
            Ok(FrameStatus::Stopped) => {
                event_loop.exit();
                return;
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                scene_app.renderer_mut().reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of memory");
                scene_app.stop_token().stop();
                event_loop.exit();
                return;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timeout");
            }
            Err(other) => {
                log::error!("Unexpected error: {:?}", other);
            }
        }

        scene_app.renderer().window().request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.scene_app.is_some() {
            return;
        }

        match self.start(event_loop) {
            Ok(scene_app) => self.scene_app = Some(scene_app),
            Err(error) => {
                self.startup_error = Some(error);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(scene_app) = self.scene_app.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                scene_app.stop_token().stop();
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.logical_key == Key::Named(NamedKey::Escape) =>
            {
                scene_app.stop_token().stop();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                scene_app.resize(new_size);
            }
            WindowEvent::RedrawRequested => {
                Self::redraw(scene_app, event_loop);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                scene_app.state_mut().pointer_button(button, state);
            }
            WindowEvent::CursorMoved { position, .. } => {
                scene_app
                    .state_mut()
                    .pointer_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
                };
                scene_app.state_mut().scrolled(lines);
            }
            _ => (),
        }
    }
}

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.startup_error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
