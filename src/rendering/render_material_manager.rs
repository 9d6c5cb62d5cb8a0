use std::collections::HashMap;
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use wgpu::util::DeviceExt;

use crate::{
    asset_pipeline::materials::{MaterialData, ShadingModel},
    material_manager::{MaterialId, MaterialManager},
    rendering::texture_loader::{DecodedImage, TextureLoader, TextureRequestId},
};

pub struct TextureEntry {
    #[allow(dead_code)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureType {
    BaseColor,
    Normal,
    Background,
}

impl TextureType {
    fn format(self) -> wgpu::TextureFormat {
        match self {
            TextureType::BaseColor | TextureType::Background => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureType::Normal => wgpu::TextureFormat::Rgba8Unorm,
        }
    }

    /// What an untextured material samples.
    fn placeholder(self) -> [u8; 4] {
        match self {
            TextureType::BaseColor => [255, 255, 255, 255],
            TextureType::Normal => [128, 128, 255, 255],
            TextureType::Background => [0, 0, 0, 255],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MaterialUniform {
    pub base_color: Vec4,
    pub emissive: Vec4,
    // x: shading model (0 phong, 1 standard), y: flat shading, z: shininess, w: has normal map
    pub params: Vec4,
}

impl MaterialUniform {
    pub fn from_material(material: &MaterialData) -> Self {
        let shading = match material.shading {
            ShadingModel::Phong => 0.0,
            ShadingModel::Standard => 1.0,
        };

        Self {
            base_color: material.color.extend(1.0),
            emissive: material.emissive.extend(1.0),
            params: Vec4::new(
                shading,
                if material.flat_shading { 1.0 } else { 0.0 },
                material.shininess,
                if material.normal_map.is_some() { 1.0 } else { 0.0 },
            ),
        }
    }
}

struct RenderMaterial {
    name: String,
    uniform_buffer: wgpu::Buffer,
    base_color: usize,
    normal: usize,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug, Clone, Copy)]
enum TextureTarget {
    Material(MaterialId, TextureType),
    Background,
}

/// GPU side of the materials: uniforms, textures and one bind group per material.
///
/// Textures start out as placeholders and are swapped in as the loader finishes them.
pub struct RenderMaterialManager {
    device: wgpu::Device,
    queue: wgpu::Queue,

    textures: Vec<TextureEntry>,
    materials: HashMap<MaterialId, RenderMaterial>,
    background: usize,
    generation: u64,

    loader: TextureLoader,
    pending: HashMap<TextureRequestId, TextureTarget>,

    sampler: wgpu::Sampler,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl RenderMaterialManager {
    const DEFAULT_TEXTURE_BASE_COLOR: usize = 0;
    const DEFAULT_TEXTURE_NORMAL: usize = 1;
    const DEFAULT_TEXTURE_BACKGROUND: usize = 2;

    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bind_group_layout: wgpu::BindGroupLayout,
    ) -> anyhow::Result<Self> {
        let textures: Vec<TextureEntry> = [
            TextureType::BaseColor,
            TextureType::Normal,
            TextureType::Background,
        ]
        .map(|texture_type| Self::create_default_texture(device, queue, texture_type))
        .into();

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            lod_min_clamp: 0.0,
            lod_max_clamp: 32.0,
            compare: None,
            anisotropy_clamp: 1,
            border_color: None,
        });

        Ok(Self {
            device: device.clone(),
            queue: queue.clone(),

            textures,
            materials: HashMap::new(),
            background: Self::DEFAULT_TEXTURE_BACKGROUND,
            generation: 0,

            loader: TextureLoader::new(device.limits().max_texture_dimension_2d)?,
            pending: HashMap::new(),

            sampler,
            bind_group_layout,
        })
    }

    pub fn load_material(&mut self, id: MaterialId, material: &MaterialData) {
        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Material uniform ({})", material.name)),
                contents: bytemuck::cast_slice(&[MaterialUniform::from_material(material)]),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        for (path, texture_type) in [
            (&material.color_map, TextureType::BaseColor),
            (&material.normal_map, TextureType::Normal),
        ] {
            if let Some(path) = path {
                let request = self.loader.request(path);
                self.pending
                    .insert(request, TextureTarget::Material(id, texture_type));
            }
        }

        let base_color = Self::DEFAULT_TEXTURE_BASE_COLOR;
        let normal = Self::DEFAULT_TEXTURE_NORMAL;
        let bind_group = self.create_bind_group(&material.name, &uniform_buffer, base_color, normal);

        self.materials.insert(
            id,
            RenderMaterial {
                name: material.name.clone(),
                uniform_buffer,
                base_color,
                normal,
                bind_group,
            },
        );
    }

    pub fn load_all_materials(&mut self, material_manager: &MaterialManager) {
        for (id, material) in material_manager.materials() {
            self.load_material(id, material);
        }
    }

    pub fn load_background(&mut self, path: &Path) {
        let request = self.loader.request(path);
        self.pending.insert(request, TextureTarget::Background);
    }

    /// Uploads whatever the loader has finished. Failed loads keep their placeholder.
    pub fn load_pending_textures(&mut self) {
        for loaded in self.loader.poll() {
            let Some(target) = self.pending.remove(&loaded.id) else {
                continue;
            };

            let image = match loaded.result {
                Ok(image) => image,
                Err(error) => {
                    log::warn!("{:#}, using an untextured material", error);
                    continue;
                }
            };

            log::debug!(
                "Loaded texture {} ({}x{})",
                loaded.path.display(),
                image.width,
                image.height
            );

            match target {
                TextureTarget::Material(id, texture_type) => {
                    let Some(material) = self.materials.get(&id) else {
                        continue;
                    };
                    let name = material.name.clone();
                    let texture = self.create_texture(&name, texture_type, &image);
                    self.set_material_texture(id, texture_type, texture);
                }
                TextureTarget::Background => {
                    self.background = self.create_texture("Background", TextureType::Background, &image);
                }
            }

            self.generation += 1;
        }
    }

    fn set_material_texture(&mut self, id: MaterialId, texture_type: TextureType, texture: usize) {
        let Some(material) = self.materials.get_mut(&id) else {
            return;
        };

        match texture_type {
            TextureType::Normal => material.normal = texture,
            _ => material.base_color = texture,
        }

        let (base_color, normal) = (material.base_color, material.normal);
        let bind_group = Self::build_bind_group(
            &self.device,
            &self.bind_group_layout,
            &self.sampler,
            &self.textures,
            &material.name,
            &material.uniform_buffer,
            base_color,
            normal,
        );
        material.bind_group = bind_group;
    }

    pub fn bind_group(&self, id: MaterialId) -> Option<&wgpu::BindGroup> {
        self.materials.get(&id).map(|material| &material.bind_group)
    }

    pub fn background_view(&self) -> &wgpu::TextureView {
        &self.textures[self.background].view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Bumped every time a texture is uploaded.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn create_bind_group(
        &self,
        name: &str,
        uniform_buffer: &wgpu::Buffer,
        base_color: usize,
        normal: usize,
    ) -> wgpu::BindGroup {
        Self::build_bind_group(
            &self.device,
            &self.bind_group_layout,
            &self.sampler,
            &self.textures,
            name,
            uniform_buffer,
            base_color,
            normal,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        textures: &[TextureEntry],
        name: &str,
        uniform_buffer: &wgpu::Buffer,
        base_color: usize,
        normal: usize,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("Material bind group ({name})")),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&textures[base_color].view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&textures[normal].view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn create_texture(&mut self, name: &str, texture_type: TextureType, image: &DecodedImage) -> usize {
        let label = format!("{name} ({texture_type:?})");

        let texture = self.device.create_texture_with_data(
            &self.queue,
            &wgpu::TextureDescriptor {
                label: Some(&label),
                size: wgpu::Extent3d {
                    width: image.width,
                    height: image.height,
                    depth_or_array_layers: 1,
                },
                // TODO: Generate mipmaps
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: texture_type.format(),
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &image.pixels,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let texture_index = self.textures.len();
        self.textures.push(TextureEntry { texture, view });
        texture_index
    }

    fn create_default_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture_type: TextureType,
    ) -> TextureEntry {
        let label = format!("Default Texture ({:?})", texture_type);

        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(&label),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: texture_type.format(),
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &texture_type.placeholder(),
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        TextureEntry { texture, view }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn uniform_encodes_material_parameters() {
        let mut moon = MaterialData::standard("Moon").with_normal_map("normal.jpg");
        moon.color = Vec3::splat(0.5);

        let uniform = MaterialUniform::from_material(&moon);

        assert_eq!(uniform.base_color, Vec4::new(0.5, 0.5, 0.5, 1.0));
        assert_eq!(uniform.params, Vec4::new(1.0, 0.0, 30.0, 1.0));
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 48);
    }

    #[test]
    fn phong_without_maps() {
        let uniform = MaterialUniform::from_material(&MaterialData::phong("Earth"));

        assert_eq!(uniform.params, Vec4::new(0.0, 0.0, 30.0, 0.0));
        assert_eq!(uniform.emissive, Vec4::new(0.0, 0.0, 0.0, 1.0));
    }
}
