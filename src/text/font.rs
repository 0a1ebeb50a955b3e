use std::collections::BTreeMap;

use log::{debug, info};
use nalgebra::Vector2;

use crate::{
    backend::{RenderBackend, TextureHandle},
    error::TextResult,
};

use super::rasterizer::GlyphRasterizer;

/// Identifies one font configuration: a font file at one pixel size.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontKey {
    pub path: String,
    pub size: u32,
}

impl FontKey {
    pub fn new(path: &str, size: u32) -> Self {
        Self {
            path: path.to_string(),
            size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub texture: TextureHandle,
    /// Bitmap width and height in pixels.
    pub size: Vector2<i32>,
    /// Left offset from the pen, top offset from the baseline.
    pub bearing: Vector2<i32>,
    /// 1/64 pixel units.
    pub advance: i32,
}

impl Glyph {
    pub fn advance_px(&self) -> i32 {
        self.advance >> 6
    }
}

// one of these exists per (path, size) currently in use
// text objects only ever read from it; the cache is the only thing that creates or destroys one
#[derive(Debug)]
pub struct FontResource {
    key: FontKey,
    glyphs: BTreeMap<char, Glyph>,
    line_height: u32,
    pub(crate) ref_count: usize,
}

impl FontResource {
    /// Rasterizes the font and uploads one texture per glyph. If any upload fails the
    /// textures created so far are destroyed again.
    pub(crate) fn load<B, R>(backend: &mut B, rasterizer: &mut R, key: FontKey) -> TextResult<Self>
    where
        B: RenderBackend,
        R: GlyphRasterizer + ?Sized,
    {
        let rasterized = rasterizer.rasterize(&key.path, key.size)?;

        let mut glyphs: BTreeMap<char, Glyph> = BTreeMap::new();
        for glyph in rasterized.glyphs {
            let texture = match backend.create_glyph_texture(&glyph.bitmap) {
                Ok(texture) => texture,
                Err(err) => {
                    debug!(
                        "Texture upload failed for {:?}, dropping {} uploaded glyphs",
                        glyph.character,
                        glyphs.len()
                    );
                    for uploaded in glyphs.values() {
                        backend.destroy_texture(uploaded.texture);
                    }
                    return Err(err.into());
                }
            };

            let metrics = glyph.metrics;
            glyphs.insert(
                glyph.character,
                Glyph {
                    texture,
                    size: Vector2::new(metrics.width as i32, metrics.height as i32),
                    bearing: Vector2::new(metrics.bearing_x, metrics.bearing_y),
                    advance: metrics.advance,
                },
            );
        }

        info!(
            "Loaded font '{}' at {}px: {} glyph textures",
            key.path,
            key.size,
            glyphs.len()
        );

        Ok(Self {
            key,
            glyphs,
            line_height: rasterized.line_height,
            ref_count: 0,
        })
    }

    pub(crate) fn destroy<B: RenderBackend>(self, backend: &mut B) {
        for glyph in self.glyphs.values() {
            backend.destroy_texture(glyph.texture);
        }
        info!("Unloaded font '{}' at {}px", self.key.path, self.key.size);
    }

    pub fn key(&self) -> &FontKey {
        &self.key
    }

    pub fn path(&self) -> &str {
        &self.key.path
    }

    pub fn size(&self) -> u32 {
        self.key.size
    }

    pub fn line_height(&self) -> u32 {
        self.line_height
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count
    }

    pub fn glyph(&self, character: char) -> Option<&Glyph> {
        self.glyphs.get(&character)
    }

    /// Looks up `character`, falling back to `replacement` when the font doesn't cover it.
    pub fn glyph_or(&self, character: char, replacement: char) -> Option<&Glyph> {
        self.glyph(character).or_else(|| self.glyph(replacement))
    }

    pub fn glyphs(&self) -> impl Iterator<Item = (char, &Glyph)> {
        self.glyphs.iter().map(|(character, glyph)| (*character, glyph))
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }
}
