use log::{debug, warn};
use nalgebra::Vector2;

use crate::{
    backend::{BufferHandle, GlyphDraw, RenderBackend, TextureHandle},
    error::{TextError, TextResult},
};

use super::{
    font::{FontKey, FontResource},
    font_cache::{FontCache, FontHandle},
    layout::{self, LayoutParams, VERTICES_PER_GLYPH},
    rasterizer::{GlyphRasterizer, PRINTABLE},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Whether the vertex buffer had to be rebuilt and uploaded for this call.
    pub rebuilt: bool,
    pub glyphs: usize,
    pub draws: usize,
}

#[derive(Debug, Clone, Copy)]
struct VertexBuffer {
    handle: BufferHandle,
    capacity: usize,
}

/// A string drawn with one cached font.
///
/// Geometry is rebuilt lazily: every mutator except [TextObject::set_color] marks
/// the object dirty and the next [TextObject::render] lays the string out again
/// and uploads it in one buffer write. Color is only applied at draw time.
///
/// A text object holds gpu resources and a font reference, so it has to be
/// handed back with [TextObject::destroy] instead of dropped.
#[derive(Debug)]
pub struct TextObject {
    string: String,
    position: Vector2<f32>,
    color: [f32; 4],
    scale: f32,
    line_spacing: f32,
    replacement: char,
    font: Option<FontHandle>,
    dirty: bool,
    glyph_count: usize,
    textures: Vec<TextureHandle>,
    buffer: Option<VertexBuffer>,
}

impl Default for TextObject {
    fn default() -> Self {
        Self::new()
    }
}

impl TextObject {
    pub fn new() -> Self {
        Self {
            string: String::new(),
            position: Vector2::zeros(),
            color: [1.0, 1.0, 1.0, 1.0],
            scale: 1.0,
            line_spacing: 0.0,
            replacement: '?',
            font: None,
            dirty: true,
            glyph_count: 0,
            textures: Vec::new(),
            buffer: None,
        }
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_line_spacing(mut self, line_spacing: f32) -> Self {
        self.line_spacing = line_spacing;
        self
    }

    /// Character drawn in place of anything the font doesn't cover. Only
    /// printable ascii is rasterized, so anything else is ignored.
    pub fn with_replacement(mut self, replacement: char) -> Self {
        if PRINTABLE.contains(&replacement) {
            self.replacement = replacement;
        } else {
            warn!(
                "Replacement {:?} is outside the rasterized range, keeping {:?}",
                replacement, self.replacement
            );
        }
        self
    }

    // every path that changes the font binding comes through here
    fn rebind<B, R>(
        &mut self,
        cache: &mut FontCache,
        backend: &mut B,
        rasterizer: &mut R,
        path: &str,
        size: u32,
    ) -> TextResult<()>
    where
        B: RenderBackend,
        R: GlyphRasterizer + ?Sized,
    {
        let unchanged = self
            .font_key(cache)
            .is_some_and(|key| key.path == path && key.size == size);
        if unchanged {
            return Ok(());
        }

        // acquire first so a failure leaves the current binding alone
        let handle = cache.acquire(backend, rasterizer, path, size)?;
        if let Some(previous) = self.font.replace(handle) {
            cache.release(backend, previous);
        }
        self.dirty = true;
        Ok(())
    }

    /// Binds the font at `path` rendered at `size` pixels.
    ///
    /// Binding the font that is already bound changes nothing. On failure the
    /// previous binding (or lack of one) is kept and the error returned.
    pub fn set_font<B, R>(
        &mut self,
        cache: &mut FontCache,
        backend: &mut B,
        rasterizer: &mut R,
        path: &str,
        size: u32,
    ) -> TextResult<()>
    where
        B: RenderBackend,
        R: GlyphRasterizer + ?Sized,
    {
        self.rebind(cache, backend, rasterizer, path, size)
    }

    pub fn set_font_size<B, R>(
        &mut self,
        cache: &mut FontCache,
        backend: &mut B,
        rasterizer: &mut R,
        size: u32,
    ) -> TextResult<()>
    where
        B: RenderBackend,
        R: GlyphRasterizer + ?Sized,
    {
        let path = self
            .font_key(cache)
            .map(|key| key.path.clone())
            .ok_or(TextError::UnboundFont)?;
        self.rebind(cache, backend, rasterizer, &path, size)
    }

    pub fn set_string(&mut self, string: &str) {
        self.string = string.to_string();
        self.glyph_count = layout::count_glyphs(&self.string);
        self.dirty = true;
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.position = Vector2::new(x, y);
        self.dirty = true;
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.position += Vector2::new(dx, dy);
        self.dirty = true;
    }

    pub fn set_color(&mut self, color: [f32; 4]) {
        self.color = color;
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
        self.dirty = true;
    }

    pub fn set_line_spacing(&mut self, line_spacing: f32) {
        self.line_spacing = line_spacing;
        self.dirty = true;
    }

    pub fn string(&self) -> &str {
        &self.string
    }

    pub fn position(&self) -> Vector2<f32> {
        self.position
    }

    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn line_spacing(&self) -> f32 {
        self.line_spacing
    }

    pub fn glyph_count(&self) -> usize {
        self.glyph_count
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_bound(&self) -> bool {
        self.font.is_some()
    }

    pub fn font<'a>(&self, cache: &'a FontCache) -> Option<&'a FontResource> {
        self.font.as_ref().and_then(|handle| cache.get(handle))
    }

    pub fn font_key<'a>(&self, cache: &'a FontCache) -> Option<&'a FontKey> {
        self.font(cache).map(|font| font.key())
    }

    /// Line height of the bound font in pixels, 0 when nothing is bound.
    pub fn font_height(&self, cache: &FontCache) -> u32 {
        self.font(cache).map_or(0, |font| font.line_height())
    }

    /// The texture of every quad in the last built buffer, in draw order.
    pub fn textures(&self) -> &[TextureHandle] {
        &self.textures
    }

    pub fn buffer(&self) -> Option<BufferHandle> {
        self.buffer.map(|buffer| buffer.handle)
    }

    fn ensure_capacity<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        vertices: usize,
    ) -> TextResult<BufferHandle> {
        let current = self.buffer;
        match current {
            Some(buffer) if buffer.capacity >= vertices => Ok(buffer.handle),
            previous => {
                if let Some(previous) = previous {
                    backend.destroy_buffer(previous.handle);
                    self.buffer = None;
                }
                let handle = backend.create_vertex_buffer(vertices)?;
                self.buffer = Some(VertexBuffer {
                    handle,
                    capacity: vertices,
                });
                Ok(handle)
            }
        }
    }

    fn rebuild<B: RenderBackend>(&mut self, cache: &FontCache, backend: &mut B) -> TextResult<()> {
        let font = self.font(cache).ok_or(TextError::UnboundFont)?;
        let layout = layout::layout_text(
            &self.string,
            font,
            &LayoutParams {
                position: self.position,
                scale: self.scale,
                line_spacing: self.line_spacing,
                replacement: self.replacement,
            },
        );

        if !layout.vertices.is_empty() {
            let handle = self.ensure_capacity(backend, layout.vertices.len())?;
            backend.write_vertex_buffer(handle, &layout.vertices)?;
        }

        debug!(
            "Rebuilt {} glyphs ({} vertices) for {:?}",
            layout.glyph_count(),
            layout.vertices.len(),
            self.string
        );

        self.glyph_count = layout.glyph_count();
        self.textures = layout.quads.iter().map(|quad| quad.texture).collect();
        self.dirty = false;
        Ok(())
    }

    /// Rebuilds the vertex buffer if anything changed since the last call, then
    /// draws one quad per glyph.
    ///
    /// Rendering without a bound font is refused with [TextError::UnboundFont]
    /// and draws nothing.
    pub fn render<B: RenderBackend>(
        &mut self,
        cache: &FontCache,
        backend: &mut B,
    ) -> TextResult<RenderStats> {
        if self.font(cache).is_none() {
            return Err(TextError::UnboundFont);
        }

        let rebuilt = self.dirty;
        if rebuilt {
            self.rebuild(cache, backend)?;
        }

        let mut stats = RenderStats {
            rebuilt,
            glyphs: self.glyph_count,
            draws: 0,
        };

        let Some(buffer) = self.buffer() else {
            return Ok(stats);
        };

        for (index, texture) in self.textures.iter().enumerate() {
            backend.draw_glyph(GlyphDraw {
                buffer,
                first_vertex: (index * VERTICES_PER_GLYPH) as u32,
                vertex_count: VERTICES_PER_GLYPH as u32,
                texture: *texture,
                color: self.color,
            })?;
            stats.draws += 1;
        }

        Ok(stats)
    }

    /// A copy with its own vertex buffer and its own reference to the same font.
    pub fn duplicate<B, R>(
        &self,
        cache: &mut FontCache,
        backend: &mut B,
        rasterizer: &mut R,
    ) -> TextResult<TextObject>
    where
        B: RenderBackend,
        R: GlyphRasterizer + ?Sized,
    {
        let mut copy = TextObject::new()
            .with_color(self.color)
            .with_scale(self.scale)
            .with_line_spacing(self.line_spacing)
            .with_replacement(self.replacement);
        copy.position = self.position;
        copy.set_string(&self.string);

        if let Some(key) = self.font_key(cache).cloned() {
            copy.rebind(cache, backend, rasterizer, &key.path, key.size)?;
        }
        Ok(copy)
    }

    /// Releases the font reference and frees the vertex buffer.
    pub fn destroy<B: RenderBackend>(mut self, cache: &mut FontCache, backend: &mut B) {
        if let Some(font) = self.font.take() {
            cache.release(backend, font);
        }
        if let Some(buffer) = self.buffer.take() {
            backend.destroy_buffer(buffer.handle);
        }
    }
}
