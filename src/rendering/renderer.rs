use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use wgpu::CommandEncoderDescriptor;
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    app::FrameRenderer,
    camera::CameraUniform,
    config::AppConfig,
    rendering::{
        global_uniform::GlobalUniformState,
        instance::{gather_instances, InstanceBuffer, Instances},
        passes::{
            background_pass::{BackgroundPass, BackgroundPassTextureViews},
            mesh_pass::{MeshPass, MeshPassTextureViews},
            pass::Pass,
        },
        render_common::RenderCommon,
        render_material_manager::RenderMaterialManager,
        render_model::RenderModel,
        shader_loader::{PipelineCacheBuilder, ShaderLoader},
        texture::{DepthTexture, RenderTarget},
    },
    scene_graph::SceneModelId,
    solar_system::SolarSystem,
};

pub struct Renderer {
    window: Arc<Window>,
    size: PhysicalSize<u32>,

    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,

    common: Arc<RenderCommon>,
    depth_texture: DepthTexture,
    msaa_target: Option<RenderTarget>,

    camera_uniform: CameraUniform,
    render_models: HashMap<SceneModelId, RenderModel>,
    material_manager: RenderMaterialManager,
    background_generation: u64,

    instances: Instances,
    instance_buffer: InstanceBuffer,

    shader_loader: ShaderLoader,

    background_pass: BackgroundPass,
    mesh_pass: MeshPass,
}

impl Renderer {
    pub async fn new(
        window: Arc<Window>,
        state: &SolarSystem,
        config: &AppConfig,
    ) -> anyhow::Result<Renderer> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable graphics adapter")?;

        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create device")?;

        let mut camera_uniform = CameraUniform::default();
        camera_uniform.update(state.camera());
        let camera_uniform_buffer = camera_uniform.create_buffer(&device);

        let common = RenderCommon::new(
            &device,
            &adapter,
            &surface,
            size,
            config,
            camera_uniform_buffer,
            state.light(),
        )?;
        let common = Arc::new(common);

        let depth_texture = DepthTexture::new(&device, size, common.sample_count, "Depth Texture");
        let msaa_target = Self::create_msaa_target(&device, &common, size);

        let mut cache_builder = PipelineCacheBuilder::new();

        let mut background_pass = BackgroundPass::create(&device, common.clone(), &mut cache_builder)?;
        let mesh_pass = MeshPass::create(&device, common.clone(), &mut cache_builder)?;

        let shader_loader = ShaderLoader::new(device.clone(), cache_builder, config.shader_dir())?;

        let mut material_manager =
            RenderMaterialManager::new(&device, &queue, common.material_bind_group_layout.clone())?;
        material_manager.load_all_materials(state.materials());
        material_manager.load_background(state.background());

        background_pass.set_texture(
            &device,
            material_manager.background_view(),
            material_manager.sampler(),
        );
        let background_generation = material_manager.generation();

        let render_models = Self::load_models(&device, state);
        let instance_buffer = InstanceBuffer::new(&device, "Scene");

        Ok(Self {
            window,
            size,
            surface,
            device,
            queue,
            common,
            depth_texture,
            msaa_target,
            camera_uniform,
            render_models,
            material_manager,
            background_generation,
            instances: Instances::new(),
            instance_buffer,
            shader_loader,
            background_pass,
            mesh_pass,
        })
    }

    fn load_models(device: &wgpu::Device, state: &SolarSystem) -> HashMap<SceneModelId, RenderModel> {
        state
            .scene()
            .models()
            .map(|(id, scene_model)| {
                log::info!(
                    "Loaded model {} with {} primitives",
                    scene_model.name(),
                    scene_model.model.primitives.len()
                );
                (id, RenderModel::from_model(device, &scene_model.model))
            })
            .collect()
    }

    fn create_msaa_target(
        device: &wgpu::Device,
        common: &RenderCommon,
        size: PhysicalSize<u32>,
    ) -> Option<RenderTarget> {
        (common.sample_count > 1).then(|| {
            RenderTarget::new(
                device,
                size,
                common.surface_format(),
                common.sample_count,
                "MSAA Color Target",
            )
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Reconfigures the surface at its current size, e.g. after it was lost.
    pub fn reconfigure(&mut self) {
        self.resize(self.size);
    }

    fn upload_textures(&mut self) {
        self.material_manager.load_pending_textures();

        let generation = self.material_manager.generation();
        if generation != self.background_generation {
            self.background_pass.set_texture(
                &self.device,
                self.material_manager.background_view(),
                self.material_manager.sampler(),
            );
            self.background_generation = generation;
        }
    }
}

impl FrameRenderer for Renderer {
    type Error = wgpu::SurfaceError;

    fn surface_size(&self) -> PhysicalSize<u32> {
        self.size
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;

        {
            let mut config = match self.common.output_surface_config.write() {
                Ok(config) => config,
                Err(poisoned) => poisoned.into_inner(),
            };
            config.width = new_size.width;
            config.height = new_size.height;
            self.surface.configure(&self.device, &config);
        }

        self.depth_texture.resize(&self.device, new_size);
        if let Some(msaa_target) = &mut self.msaa_target {
            msaa_target.resize(&self.device, new_size);
        }
    }

    fn render(&mut self, state: &SolarSystem) -> Result<(), wgpu::SurfaceError> {
        self.shader_loader.load_pending_shaders();
        self.upload_textures();

        self.camera_uniform.update(state.camera());
        self.camera_uniform
            .update_buffer(&self.queue, &self.common.camera_uniform_buffer);
        self.common.global_uniform.update(
            &self.queue,
            GlobalUniformState::new(self.size, state.elapsed().as_secs_f32(), state.light()),
        );

        gather_instances(state.scene(), &mut self.instances);
        self.instances
            .write_to_buffer(&self.queue, &self.instance_buffer);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let (color, resolve_target) = match &self.msaa_target {
            Some(msaa_target) => (msaa_target.view().clone(), Some(view.clone())),
            None => (view.clone(), None),
        };

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let pipeline_cache = &self.shader_loader.cache;

        self.background_pass.render(
            &BackgroundPassTextureViews {
                color: color.clone(),
            },
            &mut encoder,
            pipeline_cache,
            |render_pass| {
                // Fullscreen triangle
                render_pass.draw(0..3, 0..1);
            },
        );

        self.mesh_pass.render(
            &MeshPassTextureViews {
                color,
                resolve_target,
                depth: self.depth_texture.view().clone(),
            },
            &mut encoder,
            pipeline_cache,
            |render_pass| {
                if !self.instances.should_render() {
                    return;
                }

                self.instance_buffer.bind(render_pass);

                for batch in self.instances.batches() {
                    let (Some(render_model), Some(material)) = (
                        self.render_models.get(&batch.model_id),
                        self.material_manager.bind_group(batch.material_id),
                    ) else {
                        continue;
                    };

                    render_pass.set_bind_group(2, material, &[]);
                    render_model.draw(render_pass, batch.instances.clone());
                }
            },
        );

        self.queue.submit([encoder.finish()]);

        self.window.pre_present_notify();
        output.present();

        Ok(())
    }
}
