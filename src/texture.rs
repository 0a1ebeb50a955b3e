use anyhow::{anyhow, Result};

/// Pixel layout of a glyph bitmap. Glyphs are coverage masks, so only one
/// channel is ever uploaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    R8Unorm,
}

impl TextureFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8Unorm => 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphBitmap {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl GlyphBitmap {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width * height) as usize;
        if data.len() != expected {
            return Err(anyhow!(
                "bitmap is {} bytes but {}x{} needs {}",
                data.len(),
                width,
                height,
                expected
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            format: TextureFormat::R8Unorm,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.width * self.format.bytes_per_pixel()
    }

    /// Whitespace glyphs rasterize to 0x0, but gpu textures need at least one texel.
    /// Returns a single transparent texel in that case.
    pub fn padded(&self) -> GlyphBitmap {
        if self.is_empty() {
            GlyphBitmap {
                data: vec![0],
                width: 1,
                height: 1,
                format: self.format,
            }
        } else {
            self.clone()
        }
    }
}
