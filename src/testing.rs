// test doubles for the gpu and the font backend
// the recording backend keeps real arenas so handles behave the same as wgpu's

use anyhow::{anyhow, Result};
use generational_arena::Arena;

use crate::{
    backend::{BufferHandle, GlyphDraw, RenderBackend, TextureHandle},
    error::{TextError, TextResult},
    text::{
        layout::TextVertex,
        rasterizer::{GlyphMetrics, GlyphRasterizer, RasterizedFont, RasterizedGlyph, PRINTABLE},
    },
    texture::GlyphBitmap,
};

#[derive(Debug)]
pub(crate) struct RecordedBuffer {
    pub capacity: usize,
    pub contents: Vec<TextVertex>,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingBackend {
    pub textures: Arena<GlyphBitmap>,
    pub buffers: Arena<RecordedBuffer>,
    pub draws: Vec<GlyphDraw>,
    pub uploads: usize,
    pub textures_destroyed: usize,
    pub buffers_created: usize,
    pub buffers_destroyed: usize,
    /// Texture creation starts failing once this many have been created.
    pub texture_budget: Option<usize>,
}

impl RecordingBackend {
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn contents(&self, handle: BufferHandle) -> &[TextVertex] {
        &self.buffers.get(handle.0).unwrap().contents
    }
}

impl RenderBackend for RecordingBackend {
    fn create_glyph_texture(&mut self, bitmap: &GlyphBitmap) -> Result<TextureHandle> {
        if let Some(budget) = self.texture_budget {
            if self.textures.len() + self.textures_destroyed >= budget {
                return Err(anyhow!("out of texture memory"));
            }
        }
        Ok(TextureHandle(self.textures.insert(bitmap.clone())))
    }

    fn destroy_texture(&mut self, handle: TextureHandle) {
        if self.textures.remove(handle.0).is_some() {
            self.textures_destroyed += 1;
        }
    }

    fn create_vertex_buffer(&mut self, capacity: usize) -> Result<BufferHandle> {
        self.buffers_created += 1;
        Ok(BufferHandle(self.buffers.insert(RecordedBuffer {
            capacity,
            contents: Vec::new(),
        })))
    }

    fn write_vertex_buffer(&mut self, handle: BufferHandle, vertices: &[TextVertex]) -> Result<()> {
        let buffer = self
            .buffers
            .get_mut(handle.0)
            .ok_or(anyhow!("no buffer for handle {:?}", handle))?;
        if vertices.len() > buffer.capacity {
            return Err(anyhow!(
                "{} vertices overflow a buffer of {}",
                vertices.len(),
                buffer.capacity
            ));
        }
        buffer.contents = vertices.to_vec();
        self.uploads += 1;
        Ok(())
    }

    fn destroy_buffer(&mut self, handle: BufferHandle) {
        if self.buffers.remove(handle.0).is_some() {
            self.buffers_destroyed += 1;
        }
    }

    fn draw_glyph(&mut self, draw: GlyphDraw) -> Result<()> {
        if !self.textures.contains(draw.texture.0) {
            return Err(anyhow!("draw references a destroyed texture"));
        }
        self.draws.push(draw);
        Ok(())
    }
}

/// Produces deterministic glyphs without touching the filesystem.
///
/// Paths containing "missing" fail to load, paths containing "broken" fail on the
/// glyph 'x'. Line height equals the pixel size.
#[derive(Debug, Default)]
pub(crate) struct FakeRasterizer {
    pub calls: Vec<(String, u32)>,
}

impl FakeRasterizer {
    pub fn metrics_for(character: char) -> GlyphMetrics {
        if character == ' ' {
            return GlyphMetrics {
                width: 0,
                height: 0,
                bearing_x: 0,
                bearing_y: 0,
                advance: 6 << 6,
            };
        }
        let code = character as i32 - 32;
        GlyphMetrics {
            width: 6 + (code % 4) as u32,
            height: 10 + (code % 3) as u32,
            bearing_x: code % 2,
            bearing_y: 9 + code % 3,
            // a fractional part that must be truncated away
            advance: ((8 + code % 5) << 6) + 17,
        }
    }

    pub fn rasterizations(&self) -> usize {
        self.calls.len()
    }
}

impl GlyphRasterizer for FakeRasterizer {
    fn rasterize(&mut self, path: &str, pixel_size: u32) -> TextResult<RasterizedFont> {
        self.calls.push((path.to_string(), pixel_size));
        if path.contains("missing") {
            return Err(TextError::font_load(path, "No such file or directory"));
        }

        let glyphs = PRINTABLE
            .map(|character| {
                if character == 'x' && path.contains("broken") {
                    return Err(TextError::GlyphRasterization {
                        path: path.to_string(),
                        character,
                        reason: "bad outline".into(),
                    });
                }
                let metrics = Self::metrics_for(character);
                let data = vec![character as u8; (metrics.width * metrics.height) as usize];
                Ok(RasterizedGlyph {
                    character,
                    metrics,
                    bitmap: GlyphBitmap::new(data, metrics.width, metrics.height)?,
                })
            })
            .collect::<TextResult<Vec<_>>>()?;

        Ok(RasterizedFont {
            glyphs,
            line_height: pixel_size,
        })
    }
}

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
