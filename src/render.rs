use anyhow::{anyhow, Result};
use generational_arena::Arena;
use log::{debug, info, warn};
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindingResource, Buffer, BufferBinding,
    BufferDescriptor, BufferSize, BufferUsages, Color, CommandEncoderDescriptor, Device,
    DeviceDescriptor, Extent3d, ImageDataLayout, Instance, LoadOp, Operations, Queue,
    RenderPassColorAttachment, RenderPassDescriptor, RequestAdapterOptions, StoreOp,
    TextureDescriptor, TextureDimension, TextureUsages, TextureView, TextureViewDescriptor,
};

use crate::{
    backend::{BufferHandle, GlyphDraw, RenderBackend, TextureHandle},
    camera::ScreenProjection,
    text::{
        layout::TextVertex,
        pipeline::{text_pipeline, TextPipeline, TextUniform},
    },
    texture::{GlyphBitmap, TextureFormat},
};

struct GlyphTexture {
    // kept alive alongside the bind group that samples it
    _texture: wgpu::Texture,
    bind_group: BindGroup,
}

struct VertexBuffer {
    buffer: Buffer,
    capacity: usize,
}

/// wgpu implementation of [RenderBackend].
///
/// Glyph draws are queued by [RenderBackend::draw_glyph] and recorded into a
/// single render pass by [Render::submit], in the order they were queued.
pub struct Render {
    device: Device,
    queue: Queue,
    format: wgpu::TextureFormat,
    pipeline: TextPipeline,
    textures: Arena<GlyphTexture>,
    buffers: Arena<VertexBuffer>,
    draws: Vec<GlyphDraw>,
}

fn uniform_stride(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

impl Render {
    /// Requests a default adapter with no surface, for offscreen rendering.
    pub fn headless(format: wgpu::TextureFormat) -> Result<Self> {
        let instance = Instance::default();

        let (device, queue) = pollster::block_on(async {
            let adapter = instance
                .request_adapter(&RequestAdapterOptions::default())
                .await
                .ok_or(anyhow!("No suitable adapter found."))?;
            info!("Using adapter {:?}", adapter.get_info().name);

            let (device, queue) = adapter
                .request_device(&DeviceDescriptor::default(), None)
                .await?;

            Ok::<(Device, Queue), anyhow::Error>((device, queue))
        })?;

        Self::from_device(device, queue, format)
    }

    /// Renders into targets of `format` using an existing device.
    pub fn from_device(device: Device, queue: Queue, format: wgpu::TextureFormat) -> Result<Self> {
        let pipeline = text_pipeline(&device, format)?;
        Ok(Self {
            device,
            queue,
            format,
            pipeline,
            textures: Arena::new(),
            buffers: Arena::new(),
            draws: Vec::new(),
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn pending_draws(&self) -> usize {
        self.draws.len()
    }

    /// Records every queued draw into `target`, a `width` x `height` view in
    /// the format this renderer was created for. Loads the existing contents
    /// unless `clear` is given. The queue is empty afterwards.
    pub fn submit(
        &mut self,
        target: &TextureView,
        width: u32,
        height: u32,
        clear: Option<Color>,
    ) -> Result<()> {
        let draws = std::mem::take(&mut self.draws);
        let projection = ScreenProjection::new(width, height).to_cols_array();

        let uniform_size = std::mem::size_of::<TextUniform>() as u64;
        let stride = uniform_stride(
            uniform_size,
            self.device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let mut uniforms = vec![0u8; (stride * draws.len().max(1) as u64) as usize];
        for (idx, draw) in draws.iter().enumerate() {
            let uniform = TextUniform {
                projection,
                color: draw.color,
            };
            let offset = idx * stride as usize;
            uniforms[offset..offset + uniform_size as usize]
                .copy_from_slice(bytemuck::bytes_of(&uniform));
        }

        let uniform_buffer = self.device.create_buffer_init(&BufferInitDescriptor {
            label: Some("text uniforms"),
            contents: &uniforms,
            usage: BufferUsages::UNIFORM,
        });
        let uniform_bind_group = self.device.create_bind_group(&BindGroupDescriptor {
            label: Some("text uniforms"),
            layout: &self.pipeline.uniform_layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: BindingResource::Buffer(BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: BufferSize::new(uniform_size),
                }),
            }],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor { label: Some("text") });

        let mut skipped = 0;
        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("text"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: Operations {
                        load: match clear {
                            Some(color) => LoadOp::Clear(color),
                            None => LoadOp::Load,
                        },
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(&self.pipeline.pipeline);

            for (idx, draw) in draws.iter().enumerate() {
                // resources destroyed after the draw was queued
                let (Some(texture), Some(buffer)) = (
                    self.textures.get(draw.texture.0),
                    self.buffers.get(draw.buffer.0),
                ) else {
                    skipped += 1;
                    continue;
                };

                rpass.set_bind_group(0, &uniform_bind_group, &[(idx as u64 * stride) as u32]);
                rpass.set_bind_group(1, &texture.bind_group, &[]);
                rpass.set_vertex_buffer(0, buffer.buffer.slice(..));
                rpass.draw(draw.first_vertex..draw.first_vertex + draw.vertex_count, 0..1);
            }
        }

        self.queue.submit([encoder.finish()]);

        if skipped > 0 {
            warn!("Skipped {} glyph draws whose resources were destroyed", skipped);
        }
        debug!("Submitted {} glyph draws", draws.len() - skipped);
        Ok(())
    }
}

impl RenderBackend for Render {
    fn create_glyph_texture(&mut self, bitmap: &GlyphBitmap) -> Result<TextureHandle> {
        let bitmap = bitmap.padded();
        let format = match bitmap.format {
            TextureFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
        };
        let size = Extent3d {
            width: bitmap.width(),
            height: bitmap.height(),
            depth_or_array_layers: 1,
        };

        let texture = self.device.create_texture(&TextureDescriptor {
            label: Some("glyph"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            texture.as_image_copy(),
            &bitmap.data,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bitmap.bytes_per_row()),
                rows_per_image: None,
            },
            size,
        );

        let view = texture.create_view(&TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&BindGroupDescriptor {
            label: Some("glyph"),
            layout: &self.pipeline.texture_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&self.pipeline.sampler),
                },
            ],
        });

        Ok(TextureHandle(self.textures.insert(GlyphTexture {
            _texture: texture,
            bind_group,
        })))
    }

    fn destroy_texture(&mut self, handle: TextureHandle) {
        if self.textures.remove(handle.0).is_none() {
            warn!("Texture {:?} was already destroyed", handle);
        }
    }

    fn create_vertex_buffer(&mut self, capacity: usize) -> Result<BufferHandle> {
        let capacity = capacity.max(1);
        let buffer = self.device.create_buffer(&BufferDescriptor {
            label: Some("text vertices"),
            size: (capacity * std::mem::size_of::<TextVertex>()) as u64,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(BufferHandle(
            self.buffers.insert(VertexBuffer { buffer, capacity }),
        ))
    }

    fn write_vertex_buffer(&mut self, handle: BufferHandle, vertices: &[TextVertex]) -> Result<()> {
        let buffer = self
            .buffers
            .get(handle.0)
            .ok_or(anyhow!("No vertex buffer for handle {:?}", handle))?;
        if vertices.len() > buffer.capacity {
            return Err(anyhow!(
                "{} vertices don't fit a buffer of {}",
                vertices.len(),
                buffer.capacity
            ));
        }
        if !vertices.is_empty() {
            self.queue
                .write_buffer(&buffer.buffer, 0, bytemuck::cast_slice(vertices));
        }
        Ok(())
    }

    fn destroy_buffer(&mut self, handle: BufferHandle) {
        if self.buffers.remove(handle.0).is_none() {
            warn!("Vertex buffer {:?} was already destroyed", handle);
        }
    }

    fn draw_glyph(&mut self, draw: GlyphDraw) -> Result<()> {
        if !self.textures.contains(draw.texture.0) {
            return Err(anyhow!("No texture for handle {:?}", draw.texture));
        }
        let buffer = self
            .buffers
            .get(draw.buffer.0)
            .ok_or(anyhow!("No vertex buffer for handle {:?}", draw.buffer))?;
        if (draw.first_vertex + draw.vertex_count) as usize > buffer.capacity {
            return Err(anyhow!(
                "draw of vertices {}..{} overruns a buffer of {}",
                draw.first_vertex,
                draw.first_vertex + draw.vertex_count,
                buffer.capacity
            ));
        }
        self.draws.push(draw);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_stride_respects_alignment() {
        assert_eq!(uniform_stride(80, 256), 256);
        assert_eq!(uniform_stride(256, 256), 256);
        assert_eq!(uniform_stride(300, 256), 512);
        assert_eq!(uniform_stride(80, 16), 80);
    }
}
