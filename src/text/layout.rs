use bytemuck::{Pod, Zeroable};
use log::warn;
use nalgebra::Vector2;

use crate::backend::TextureHandle;

use super::font::FontResource;

/// Interleaved position + uv, 4 floats per vertex.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TextVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

/// Two triangles per glyph.
pub const VERTICES_PER_GLYPH: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphQuad {
    pub character: char,
    /// Pen position this glyph was placed from, before bearing is applied.
    pub pen: Vector2<f32>,
    pub texture: TextureHandle,
}

#[derive(Clone, Debug, Default)]
pub struct TextLayout {
    pub vertices: Vec<TextVertex>,
    pub quads: Vec<GlyphQuad>,
}

impl TextLayout {
    pub fn glyph_count(&self) -> usize {
        self.quads.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutParams {
    pub position: Vector2<f32>,
    pub scale: f32,
    pub line_spacing: f32,
    pub replacement: char,
}

fn v(x: f32, y: f32, u: f32, v: f32) -> TextVertex {
    TextVertex {
        pos: [x, y],
        uv: [u, v],
    }
}

pub fn count_glyphs(text: &str) -> usize {
    text.chars().filter(|character| *character != '\n').count()
}

/// Walks `text` with a pen starting at `params.position`.
///
/// Y grows upward: a newline sends the pen back to the starting x and down by
/// `line_height + line_spacing`. No kerning; each glyph moves the pen by its
/// whole pixel advance times the scale.
pub fn layout_text(text: &str, font: &FontResource, params: &LayoutParams) -> TextLayout {
    let scale = params.scale;
    let glyph_count = count_glyphs(text);
    let mut layout = TextLayout {
        vertices: Vec::with_capacity(glyph_count * VERTICES_PER_GLYPH),
        quads: Vec::with_capacity(glyph_count),
    };

    let mut pen = params.position;

    for character in text.chars() {
        if character == '\n' {
            pen.x = params.position.x;
            pen.y -= font.line_height() as f32 + params.line_spacing;
            continue;
        }

        if font.glyph(character).is_none() {
            warn!(
                "'{}' has no glyph for {:?}, drawing {:?}",
                font.path(),
                character,
                params.replacement
            );
        }
        let Some(glyph) = font.glyph_or(character, params.replacement) else {
            warn!(
                "No glyph for {:?} or replacement {:?} in '{}', skipping",
                character,
                params.replacement,
                font.path()
            );
            continue;
        };

        let xpos = pen.x + glyph.bearing.x as f32 * scale;
        let ypos = pen.y - (glyph.size.y - glyph.bearing.y) as f32 * scale;
        let w = glyph.size.x as f32 * scale;
        let h = glyph.size.y as f32 * scale;

        layout.vertices.extend_from_slice(&[
            v(xpos, ypos + h, 0.0, 0.0),
            v(xpos, ypos, 0.0, 1.0),
            v(xpos + w, ypos, 1.0, 1.0),
            v(xpos, ypos + h, 0.0, 0.0),
            v(xpos + w, ypos, 1.0, 1.0),
            v(xpos + w, ypos + h, 1.0, 0.0),
        ]);
        layout.quads.push(GlyphQuad {
            character,
            pen,
            texture: glyph.texture,
        });

        pen.x += glyph.advance_px() as f32 * scale;
    }

    layout
}
