use wgpu::{
    BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BufferSize, Device,
    SamplerBindingType, ShaderStages, TextureSampleType, TextureViewDimension, VertexAttribute,
    VertexBufferLayout, VertexStepMode,
};

#[derive(Debug, Clone, Copy)]
pub enum BindEntryType {
    BufferUniform {
        /// Bound with a per draw offset into a shared buffer.
        dynamic: bool,
        size: u64,
    },
    Texture {
        sample_type: TextureSampleType,
        view_dimension: TextureViewDimension,
    },
    Sampler(SamplerBindingType),
}

#[derive(Debug, Clone, Copy)]
pub struct BindEntry {
    pub visibility: ShaderStages,
    pub ty: BindEntryType,
}

impl BindEntry {
    pub fn layout_entry(&self, binding: u32) -> BindGroupLayoutEntry {
        BindGroupLayoutEntry {
            binding,
            visibility: self.visibility,
            ty: match self.ty {
                BindEntryType::BufferUniform { dynamic, size } => wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: dynamic,
                    min_binding_size: BufferSize::new(size),
                },
                BindEntryType::Texture {
                    sample_type,
                    view_dimension,
                } => wgpu::BindingType::Texture {
                    sample_type,
                    view_dimension,
                    multisampled: false,
                },
                BindEntryType::Sampler(binding_type) => wgpu::BindingType::Sampler(binding_type),
            },
            count: None,
        }
    }
}

/// Builds a layout whose bindings are numbered in entry order.
pub fn bind_group_layout(device: &Device, label: &str, entries: &[BindEntry]) -> BindGroupLayout {
    let layout_entries = entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| entry.layout_entry(idx as u32))
        .collect::<Vec<_>>();

    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &layout_entries,
    })
}

pub struct VertexBufferEntry {
    pub array_stride: u64,
    pub step_mode: VertexStepMode,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexBufferEntry {
    pub fn layout(&self) -> VertexBufferLayout {
        VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: self.step_mode,
            attributes: self.attributes.as_slice(),
        }
    }
}
