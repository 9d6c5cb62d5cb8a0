use std::sync::RwLock;

use wgpu::SurfaceConfiguration;
use winit::dpi::PhysicalSize;

use crate::config::AppConfig;
use crate::rendering::global_uniform::{GlobalUniform, GlobalUniformState};
use crate::rendering::texture::DepthTexture;
use crate::solar_system::DirectionalLight;

/// State shared by every pass, including the pipeline factories that run on the shader watcher thread.
pub struct RenderCommon {
    pub output_surface_config: RwLock<SurfaceConfiguration>,
    pub sample_count: u32,
    pub camera_uniform_buffer: wgpu::Buffer,
    pub global_uniform: GlobalUniform,
    pub material_bind_group_layout: wgpu::BindGroupLayout,
}

impl RenderCommon {
    pub fn new(
        device: &wgpu::Device,
        adapter: &wgpu::Adapter,
        surface: &wgpu::Surface,
        size: PhysicalSize<u32>,
        config: &AppConfig,
        camera_uniform_buffer: wgpu::Buffer,
        light: &DirectionalLight,
    ) -> anyhow::Result<Self> {
        let surface_caps = surface.get_capabilities(adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Surface is not compatible with the adapter"))?;

        let present_mode = if config.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let output_surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(device, &output_surface_config);

        let sample_count = supported_sample_count(adapter, surface_format, config.sample_count);
        log::info!(
            "Surface format {:?}, {}x{}, {} sample(s)",
            surface_format,
            output_surface_config.width,
            output_surface_config.height,
            sample_count
        );

        let global_uniform = GlobalUniform::new(device, GlobalUniformState::new(size, 0.0, light));
        let material_bind_group_layout = create_material_bind_group_layout(device);

        Ok(Self {
            output_surface_config: RwLock::new(output_surface_config),
            sample_count,
            camera_uniform_buffer,
            global_uniform,
            material_bind_group_layout,
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        match self.output_surface_config.read() {
            Ok(config) => config.format,
            Err(poisoned) => poisoned.into_inner().format,
        }
    }

    pub fn multisample_state(&self) -> wgpu::MultisampleState {
        wgpu::MultisampleState {
            count: self.sample_count,
            ..Default::default()
        }
    }
}

fn supported_sample_count(
    adapter: &wgpu::Adapter,
    format: wgpu::TextureFormat,
    requested: u32,
) -> u32 {
    let color = adapter.get_texture_format_features(format).flags;
    let depth = adapter
        .get_texture_format_features(DepthTexture::DEPTH_FORMAT)
        .flags;

    if requested > 1
        && !(color.sample_count_supported(requested) && depth.sample_count_supported(requested))
    {
        log::warn!("{requested}x MSAA is not supported for {format:?}, rendering without it");
        return 1;
    }

    requested.max(1)
}

fn create_material_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    };

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Material bind group layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            texture(1),
            texture(2),
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}
