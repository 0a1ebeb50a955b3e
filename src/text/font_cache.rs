use std::collections::HashMap;

use generational_arena::{Arena, Index};
use log::{debug, warn};

use crate::{backend::RenderBackend, error::TextResult};

use super::{
    font::{FontKey, FontResource},
    rasterizer::GlyphRasterizer,
};

/// A counted reference to a cached font.
///
/// Handles are move-only: the only way to give one up is [FontCache::release],
/// which consumes it, so a reference can't be released twice. Once the last
/// reference is gone the arena slot is reused under a new generation and any
/// stale index simply stops resolving.
#[derive(Debug, PartialEq, Eq)]
pub struct FontHandle(Index);

impl FontHandle {
    pub fn index(&self) -> Index {
        self.0
    }
}

/// Registry of the fonts currently in use, one entry per (path, size).
///
/// Entries are created on the first acquire and destroyed, textures included,
/// on the last release.
#[derive(Debug, Default)]
pub struct FontCache {
    fonts: Arena<FontResource>,
    lookup: HashMap<FontKey, Index>,
    rasterizations: usize,
}

impl FontCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire<B, R>(
        &mut self,
        backend: &mut B,
        rasterizer: &mut R,
        path: &str,
        size: u32,
    ) -> TextResult<FontHandle>
    where
        B: RenderBackend,
        R: GlyphRasterizer + ?Sized,
    {
        let key = FontKey::new(path, size);

        if let Some(index) = self.lookup.get(&key).copied() {
            if let Some(font) = self.fonts.get_mut(index) {
                font.ref_count += 1;
                debug!("Font cache hit for '{}' at {}px ({} refs)", path, size, font.ref_count);
                return Ok(FontHandle(index));
            }
            // lookup and arena disagree; drop the dangling entry and load fresh
            self.lookup.remove(&key);
        }

        self.rasterizations += 1;
        let mut font = FontResource::load(backend, rasterizer, key.clone())?;
        font.ref_count = 1;
        let index = self.fonts.insert(font);
        self.lookup.insert(key, index);
        Ok(FontHandle(index))
    }

    pub fn release<B: RenderBackend>(&mut self, backend: &mut B, handle: FontHandle) {
        let Some(font) = self.fonts.get_mut(handle.0) else {
            warn!("Released a font handle that no longer resolves: {:?}", handle.0);
            return;
        };

        font.ref_count = font.ref_count.saturating_sub(1);
        if font.ref_count > 0 {
            debug!(
                "Released '{}' at {}px ({} refs left)",
                font.path(),
                font.size(),
                font.ref_count
            );
            return;
        }

        if let Some(font) = self.fonts.remove(handle.0) {
            self.lookup.remove(font.key());
            font.destroy(backend);
        }
    }

    pub fn get(&self, handle: &FontHandle) -> Option<&FontResource> {
        self.fonts.get(handle.0)
    }

    pub fn find(&self, path: &str, size: u32) -> Option<&FontResource> {
        self.lookup
            .get(&FontKey::new(path, size))
            .and_then(|index| self.fonts.get(*index))
    }

    pub fn contains(&self, path: &str, size: u32) -> bool {
        self.find(path, size).is_some()
    }

    /// 0 when the font isn't loaded.
    pub fn ref_count(&self, path: &str, size: u32) -> usize {
        self.find(path, size).map_or(0, FontResource::ref_count)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// How many times a font had to be rasterized because it wasn't cached.
    pub fn rasterizations(&self) -> usize {
        self.rasterizations
    }

    pub fn iter(&self) -> impl Iterator<Item = &FontResource> {
        self.fonts.iter().map(|(_, font)| font)
    }

    /// Destroys every font regardless of outstanding references.
    pub fn clear<B: RenderBackend>(&mut self, backend: &mut B) {
        let indices = self.fonts.iter().map(|(index, _)| index).collect::<Vec<_>>();
        for index in indices {
            if let Some(font) = self.fonts.remove(index) {
                warn!(
                    "Font '{}' at {}px still had {} references at teardown",
                    font.path(),
                    font.size(),
                    font.ref_count()
                );
                font.destroy(backend);
            }
        }
        self.lookup.clear();
    }
}
