use anyhow::Result;
use generational_arena::Index;

use crate::{text::layout::TextVertex, texture::GlyphBitmap};

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct TextureHandle(pub Index);

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct BufferHandle(pub Index);

/// One glyph quad to draw: six vertices of `buffer` starting at `first_vertex`,
/// sampled from `texture` and tinted with `color`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphDraw {
    pub buffer: BufferHandle,
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub texture: TextureHandle,
    pub color: [f32; 4],
}

/// The gpu side of text rendering.
///
/// Everything the text layer needs from a graphics api goes through here:
/// one single channel texture per glyph, dynamic vertex buffers holding
/// interleaved position + uv (4 floats per vertex), and one triangle list
/// draw per glyph. [crate::render::Render] implements it on top of wgpu.
pub trait RenderBackend {
    /// Uploads an 8-bit coverage bitmap. Sampled with clamp-to-edge wrapping and linear filtering.
    fn create_glyph_texture(&mut self, bitmap: &GlyphBitmap) -> Result<TextureHandle>;

    fn destroy_texture(&mut self, handle: TextureHandle);

    /// Allocates room for `capacity` vertices.
    fn create_vertex_buffer(&mut self, capacity: usize) -> Result<BufferHandle>;

    fn write_vertex_buffer(&mut self, handle: BufferHandle, vertices: &[TextVertex]) -> Result<()>;

    fn destroy_buffer(&mut self, handle: BufferHandle);

    fn draw_glyph(&mut self, draw: GlyphDraw) -> Result<()>;
}
