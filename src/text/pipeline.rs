use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use wgpu::{
    vertex_attr_array, AddressMode, BindGroupLayout, Device, FilterMode, RenderPipeline, Sampler,
    SamplerBindingType, SamplerDescriptor, ShaderStages, TextureFormat, TextureSampleType,
    TextureViewDimension,
};

use crate::{
    bind::{bind_group_layout, BindEntry, BindEntryType},
    pipeline::PipelineBuilder,
};

use super::layout::TextVertex;

/// Per draw uniform: where the screen is and what color the glyph gets.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TextUniform {
    pub projection: [[f32; 4]; 4],
    pub color: [f32; 4],
}

pub struct TextPipeline {
    pub pipeline: RenderPipeline,
    /// Group 0, one dynamic offset per draw.
    pub uniform_layout: BindGroupLayout,
    /// Group 1, one bind group per glyph texture.
    pub texture_layout: BindGroupLayout,
    pub sampler: Sampler,
}

pub fn text_pipeline(device: &Device, format: TextureFormat) -> Result<TextPipeline> {
    let uniform_layout = bind_group_layout(
        device,
        "text uniforms",
        &[BindEntry {
            visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
            ty: BindEntryType::BufferUniform {
                dynamic: true,
                size: std::mem::size_of::<TextUniform>() as u64,
            },
        }],
    );

    let texture_layout = bind_group_layout(
        device,
        "glyph texture",
        &[
            BindEntry {
                visibility: ShaderStages::FRAGMENT,
                ty: BindEntryType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                    view_dimension: TextureViewDimension::D2,
                },
            },
            BindEntry {
                visibility: ShaderStages::FRAGMENT,
                ty: BindEntryType::Sampler(SamplerBindingType::Filtering),
            },
        ],
    );

    let pipeline = PipelineBuilder::new()
        .with_label("text")
        .with_format(format)
        .with_cull_mode(None)
        .with_bind_layout(&uniform_layout)
        .with_bind_layout(&texture_layout)
        .with_shader(include_str!("../shaders/text.wgsl"))
        .with_vb::<TextVertex>(
            wgpu::VertexStepMode::Vertex,
            &vertex_attr_array![
                // position
                0 => Float32x2,
                // uv
                1 => Float32x2,
            ],
        )
        .build(device)?;

    let sampler = device.create_sampler(&SamplerDescriptor {
        label: Some("glyph sampler"),
        address_mode_u: AddressMode::ClampToEdge,
        address_mode_v: AddressMode::ClampToEdge,
        address_mode_w: AddressMode::ClampToEdge,
        mag_filter: FilterMode::Linear,
        min_filter: FilterMode::Linear,
        ..Default::default()
    });

    Ok(TextPipeline {
        pipeline,
        uniform_layout,
        texture_layout,
        sampler,
    })
}
