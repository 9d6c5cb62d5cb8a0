use std::collections::BTreeMap;
use std::ops::Range;

use glam::Mat4;
use wgpu::BufferUsages;

use crate::{material_manager::MaterialId, scene_graph::Scene, scene_graph::SceneModelId};

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Instance {
    pub model: Mat4,
}

impl Instance {
    pub fn descriptor() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Instance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// A run of instances that share a model and a material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceBatch {
    pub model_id: SceneModelId,
    pub material_id: MaterialId,
    pub instances: Range<u32>,
}

pub struct Instances {
    instances: Vec<Instance>,
    batches: Vec<InstanceBatch>,
}

impl Instances {
    pub fn new() -> Self {
        Self {
            instances: Vec::new(),
            batches: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.instances.clear();
        self.batches.clear();
    }

    pub fn write_to_buffer(&self, queue: &wgpu::Queue, instance_buffer: &InstanceBuffer) {
        let count = self.instances.len().min(InstanceBuffer::MAX_INSTANCES as usize);
        queue.write_buffer(
            instance_buffer.buffer(),
            0,
            bytemuck::cast_slice(&self.instances[..count]),
        );
    }

    pub fn should_render(&self) -> bool {
        !self.instances.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn batches(&self) -> &[InstanceBatch] {
        &self.batches
    }
}

/// Collects the world matrix of every renderable object, grouped into one batch per
/// model and material pair. Transforms must be up to date.
pub fn gather_instances(scene: &Scene, instances: &mut Instances) {
    instances.clear();

    let mut groups: BTreeMap<(SceneModelId, MaterialId), Vec<Mat4>> = BTreeMap::new();
    for (_id, renderable, world) in scene.renderables() {
        groups
            .entry((renderable.model_id, renderable.material_id))
            .or_default()
            .push(world);
    }

    for ((model_id, material_id), matrices) in groups {
        let start = instances.instances.len() as u32;
        let end = (start + matrices.len() as u32).min(InstanceBuffer::MAX_INSTANCES as u32);

        if end <= start {
            log::warn!("Instance buffer is full, skipping {} instances", matrices.len());
            continue;
        }

        instances
            .instances
            .extend(matrices.into_iter().map(|model| Instance { model }));
        instances.batches.push(InstanceBatch {
            model_id,
            material_id,
            instances: start..end,
        });
    }
}

pub struct InstanceBuffer(wgpu::Buffer);

impl InstanceBuffer {
    const MAX_INSTANCES: u64 = 128;

    pub fn new(device: &wgpu::Device, name: &str) -> Self {
        let label = format!("Instance buffer ({})", name);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&label),
            size: std::mem::size_of::<Instance>() as u64 * Self::MAX_INSTANCES,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self(buffer)
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.0
    }

    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(1, self.buffer().slice(..));
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::{config::AppConfig, engine, solar_system::SolarSystem};
    use std::time::Duration;
    use winit::dpi::PhysicalSize;

    fn gathered(elapsed: Duration) -> (SolarSystem, Instances) {
        let mut state = SolarSystem::new(&AppConfig::default(), PhysicalSize::new(800, 600)).unwrap();
        engine::update(&mut state, elapsed);

        let mut instances = Instances::new();
        gather_instances(state.scene(), &mut instances);
        (state, instances)
    }

    #[test]
    fn one_batch_per_material() {
        let (_state, instances) = gathered(Duration::ZERO);

        assert_eq!(instances.len(), 3);
        assert_eq!(instances.batches().len(), 3);

        let covered: u32 = instances
            .batches()
            .iter()
            .map(|batch| batch.instances.end - batch.instances.start)
            .sum();
        assert_eq!(covered, 3);
    }

    #[test]
    fn batches_share_the_sphere_model() {
        let (_state, instances) = gathered(Duration::ZERO);
        let model = instances.batches()[0].model_id;

        assert!(instances.batches().iter().all(|batch| batch.model_id == model));
    }

    #[test]
    fn instances_carry_world_matrices() {
        let (_state, instances) = gathered(Duration::ZERO);

        let mut translations: Vec<Vec3> = instances
            .instances
            .iter()
            .map(|instance| instance.model.w_axis.truncate())
            .collect();
        translations.sort_by(|a, b| a.x.total_cmp(&b.x));

        assert!(translations[0].abs_diff_eq(Vec3::ZERO, 1e-5));
        assert!(translations[1].abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-5));
        assert!(translations[2].abs_diff_eq(Vec3::new(15.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn regathering_replaces_previous_frame() {
        let (mut state, mut instances) = gathered(Duration::ZERO);

        engine::update(&mut state, Duration::from_secs(1));
        gather_instances(state.scene(), &mut instances);

        assert_eq!(instances.len(), 3);
        assert!(instances.should_render());
    }
}
