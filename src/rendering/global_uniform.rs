use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::solar_system::DirectionalLight;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct GlobalUniformState {
    pub resolution: [f32; 2],
    pub now: f32,
    _padding: f32,
    // xyz: direction the light travels in, w unused
    pub light_direction: [f32; 4],
    // rgb premultiplied by intensity
    pub light_color: [f32; 4],
}

impl GlobalUniformState {
    pub fn new(resolution: PhysicalSize<u32>, now: f32, light: &DirectionalLight) -> Self {
        Self {
            resolution: [resolution.width as f32, resolution.height as f32],
            now,
            _padding: 0.0,
            light_direction: light.direction().extend(0.0).to_array(),
            light_color: (light.color * light.intensity).extend(1.0).to_array(),
        }
    }
}

pub struct GlobalUniform {
    buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl GlobalUniform {
    pub fn new(device: &wgpu::Device, initial_state: GlobalUniformState) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Global uniform buffer"),
            contents: bytemuck::cast_slice(&[initial_state]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Global uniform bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Global uniform bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, state: GlobalUniformState) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[state]));
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn state_matches_the_shader_layout() {
        assert_eq!(std::mem::size_of::<GlobalUniformState>(), 48);
    }

    #[test]
    fn light_color_is_scaled_by_intensity() {
        let light = DirectionalLight {
            color: Vec3::new(1.0, 0.5, 0.25),
            intensity: 2.0,
            position: Vec3::Y,
        };

        let state = GlobalUniformState::new(PhysicalSize::new(640, 480), 1.5, &light);

        assert_eq!(state.resolution, [640.0, 480.0]);
        assert_eq!(state.light_color, [2.0, 1.0, 0.5, 1.0]);
        assert_eq!(state.light_direction, [0.0, -1.0, 0.0, 0.0]);
    }
}
