use winit::dpi::PhysicalSize;

/// A render attachment that follows the surface size.
pub struct RenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    label: String,
    format: wgpu::TextureFormat,
    sample_count: u32,
}

impl RenderTarget {
    pub fn new(
        device: &wgpu::Device,
        size: PhysicalSize<u32>,
        format: wgpu::TextureFormat,
        sample_count: u32,
        label: impl Into<String>,
    ) -> Self {
        let label: String = label.into();
        let texture = Self::create_wgpu_texture(device, size, format, sample_count, &label);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            label,
            format,
            sample_count,
        }
    }

    fn create_wgpu_texture(
        device: &wgpu::Device,
        size: PhysicalSize<u32>,
        format: wgpu::TextureFormat,
        sample_count: u32,
        label: &str,
    ) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, size: PhysicalSize<u32>) {
        self.texture = Self::create_wgpu_texture(
            device,
            size,
            self.format,
            self.sample_count,
            &self.label,
        );
        self.view = self
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

pub struct DepthTexture(RenderTarget);

impl DepthTexture {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn new(
        device: &wgpu::Device,
        size: PhysicalSize<u32>,
        sample_count: u32,
        label: impl Into<String>,
    ) -> Self {
        Self(RenderTarget::new(
            device,
            size,
            Self::DEPTH_FORMAT,
            sample_count,
            label,
        ))
    }

    pub fn resize(&mut self, device: &wgpu::Device, size: PhysicalSize<u32>) {
        self.0.resize(device, size);
    }

    pub fn view(&self) -> &wgpu::TextureView {
        self.0.view()
    }
}
