use std::{
    fs::File,
    io::{BufReader, Read},
    ops::RangeInclusive,
};

use fontdue::{Font, FontSettings};
use log::{debug, info};

use crate::{
    error::{TextError, TextResult},
    texture::GlyphBitmap,
};

/// Every font is rasterized over the same fixed range: printable ascii, space to tilde.
pub const PRINTABLE: RangeInclusive<char> = ' '..='~';

#[cfg(test)]
pub(crate) fn printable_count() -> usize {
    PRINTABLE.count()
}

/// Metrics for one rasterized glyph, in pixels unless stated otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlyphMetrics {
    pub width: u32,
    pub height: u32,
    /// Offset from the pen to the left edge of the bitmap.
    pub bearing_x: i32,
    /// Offset from the baseline up to the top edge of the bitmap.
    pub bearing_y: i32,
    /// Horizontal pen movement in 1/64 pixel units. Shift right by 6 for whole pixels.
    pub advance: i32,
}

impl GlyphMetrics {
    fn from_fontdue(metrics: &fontdue::Metrics) -> Self {
        Self::from_parts(
            metrics.xmin,
            metrics.ymin,
            metrics.width,
            metrics.height,
            metrics.advance_width,
        )
    }

    // fontdue measures ymin from the baseline down to the bottom of the bitmap,
    // and advances in fractional pixels
    fn from_parts(xmin: i32, ymin: i32, width: usize, height: usize, advance_width: f32) -> Self {
        Self {
            width: width as u32,
            height: height as u32,
            bearing_x: xmin,
            bearing_y: ymin + height as i32,
            advance: (advance_width * 64.0).round() as i32,
        }
    }
}

/// Whole pixel line height from fontdue's `new_line_size`, or the pixel size
/// when the face has no horizontal metrics.
fn line_height_px(new_line_size: Option<f32>, pixel_size: u32) -> u32 {
    match new_line_size {
        // 26.6 fixed point, same as the advances
        Some(size) => ((size * 64.0).round() as i64 >> 6) as u32,
        None => pixel_size,
    }
}

/// fontdue maps uncovered characters to glyph index 0.
fn require_glyph(path: &str, character: char, glyph_index: u16) -> TextResult<()> {
    if glyph_index == 0 {
        return Err(TextError::GlyphRasterization {
            path: path.to_string(),
            character,
            reason: "face has no glyph for this character".into(),
        });
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct RasterizedGlyph {
    pub character: char,
    pub metrics: GlyphMetrics,
    pub bitmap: GlyphBitmap,
}

#[derive(Clone, Debug)]
pub struct RasterizedFont {
    pub glyphs: Vec<RasterizedGlyph>,
    pub line_height: u32,
}

pub trait GlyphRasterizer {
    /// Rasterizes every character in [PRINTABLE] from the font at `path`.
    /// Either the whole range comes back or nothing does.
    fn rasterize(&mut self, path: &str, pixel_size: u32) -> TextResult<RasterizedFont>;
}

/// Rasterizes with fontdue. Faces are parsed fresh on every call; the
/// font cache is what keeps this from happening more than once per (path, size).
#[derive(Debug, Default, Clone, Copy)]
pub struct FontdueRasterizer;

impl FontdueRasterizer {
    fn open(path: &str) -> TextResult<Font> {
        let file = File::open(path).map_err(|err| TextError::font_load(path, err))?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let _ = reader
            .read_to_end(&mut buf)
            .map_err(|err| TextError::font_load(path, err))?;
        Font::from_bytes(buf, FontSettings::default())
            .map_err(|err| TextError::font_load(path, err))
    }
}

impl GlyphRasterizer for FontdueRasterizer {
    fn rasterize(&mut self, path: &str, pixel_size: u32) -> TextResult<RasterizedFont> {
        if pixel_size == 0 {
            return Err(TextError::font_load(path, "pixel size must be at least 1"));
        }
        let font = Self::open(path)?;
        let px = pixel_size as f32;

        let glyphs = PRINTABLE
            .map(|character| {
                require_glyph(path, character, font.lookup_glyph_index(character))?;

                let (metrics, bitmap) = font.rasterize(character, px);
                let metrics = GlyphMetrics::from_fontdue(&metrics);
                let bitmap = GlyphBitmap::new(bitmap, metrics.width, metrics.height).map_err(
                    |err| TextError::GlyphRasterization {
                        path: path.to_string(),
                        character,
                        reason: err.to_string(),
                    },
                )?;

                Ok(RasterizedGlyph {
                    character,
                    metrics,
                    bitmap,
                })
            })
            .collect::<TextResult<Vec<_>>>()?;

        let new_line_size = font
            .horizontal_line_metrics(px)
            .map(|line_metrics| line_metrics.new_line_size);
        if new_line_size.is_none() {
            debug!("'{}' has no horizontal line metrics, using pixel size", path);
        }
        let line_height = line_height_px(new_line_size, pixel_size);

        info!(
            "Rasterized {} glyphs from '{}' at {}px (line height {})",
            glyphs.len(),
            path,
            pixel_size,
            line_height
        );

        Ok(RasterizedFont {
            glyphs,
            line_height,
        })
    }
}
