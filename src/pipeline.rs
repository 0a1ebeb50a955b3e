use anyhow::{anyhow, Result};
use wgpu::{
    BindGroupLayout, BlendState, ColorTargetState, ColorWrites, Device, Face, FragmentState,
    MultisampleState, PipelineCompilationOptions, PipelineLayoutDescriptor, PrimitiveState,
    RenderPipeline, RenderPipelineDescriptor, ShaderModule, ShaderModuleDescriptor, TextureFormat,
    VertexAttribute, VertexState, VertexStepMode,
};

use crate::bind::VertexBufferEntry;

/// Bundles the creation of a [wgpu::RenderPipeline] with its shader module and layout.
///
/// ```ignore
/// let pipeline = PipelineBuilder::new()
///     .with_shader(include_str!("shaders/text.wgsl"))
///     .with_bind_layout(&uniform_layout)
///     .with_vb::<TextVertex>(VertexStepMode::Vertex, &vertex_attr_array![0 => Float32x2])
///     .build(&device)?;
/// ```
///
/// Shaders must name their entry points `vertex` and `fragment`.
pub struct PipelineBuilder<'a> {
    label: &'a str,
    bind_layouts: Vec<&'a BindGroupLayout>,
    shader_src: Option<&'a str>,
    primitive_state: PrimitiveState,
    format: TextureFormat,
    vertex_entries: Vec<VertexBufferEntry>,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new() -> Self {
        Self {
            label: "pipeline",
            bind_layouts: Vec::new(),
            shader_src: None,
            primitive_state: PrimitiveState::default(),
            format: TextureFormat::Bgra8UnormSrgb,
            vertex_entries: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: &'a str) -> Self {
        self.label = label;
        self
    }

    pub fn with_cull_mode(mut self, cull_mode: Option<Face>) -> Self {
        self.primitive_state.cull_mode = cull_mode;
        self
    }

    pub fn with_shader(mut self, shader_src: &'a str) -> Self {
        self.shader_src = Some(shader_src);
        self
    }

    pub fn with_format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    /// Layouts are assigned groups in the order they're added.
    pub fn with_bind_layout(mut self, layout: &'a BindGroupLayout) -> Self {
        self.bind_layouts.push(layout);
        self
    }

    pub fn with_vb<T>(mut self, step_mode: VertexStepMode, attributes: &[VertexAttribute]) -> Self {
        self.vertex_entries.push(VertexBufferEntry {
            array_stride: std::mem::size_of::<T>() as u64,
            step_mode,
            attributes: attributes.into(),
        });
        self
    }

    fn create_module(&self, device: &Device) -> Result<ShaderModule> {
        let source = self
            .shader_src
            .ok_or(anyhow!("Shader source should be set for {}.", self.label))?;
        Ok(device.create_shader_module(ShaderModuleDescriptor {
            label: Some(self.label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        }))
    }

    pub fn build(&self, device: &Device) -> Result<RenderPipeline> {
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(self.label),
            bind_group_layouts: self.bind_layouts.as_slice(),
            push_constant_ranges: &[],
        });

        let module = self.create_module(device)?;

        let vbs = self
            .vertex_entries
            .iter()
            .map(|ent| ent.layout())
            .collect::<Vec<_>>();

        Ok(device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(self.label),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &module,
                entry_point: "vertex",
                buffers: vbs.as_slice(),
                compilation_options: PipelineCompilationOptions::default(),
            },
            primitive: self.primitive_state,
            // 2d overlay, drawn in submission order
            depth_stencil: None,
            multisample: MultisampleState::default(),
            fragment: Some(FragmentState {
                module: &module,
                entry_point: "fragment",
                targets: &[Some(ColorTargetState {
                    format: self.format,
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::all(),
                })],
                compilation_options: PipelineCompilationOptions::default(),
            }),
            multiview: None,
        }))
    }
}

impl Default for PipelineBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}
