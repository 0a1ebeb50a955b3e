use generational_arena::{Arena, Index};
use log::{info, warn};

use crate::{
    backend::RenderBackend,
    config::TextConfig,
    error::{TextError, TextResult},
};

use super::{
    font_cache::FontCache,
    rasterizer::GlyphRasterizer,
    text_object::{RenderStats, TextObject},
};

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct TextHandle(pub Index);

/// Owns everything text rendering needs: the gpu backend, the rasterizer, the
/// font cache and every live text object.
///
/// Consumers only ever see [TextHandle]s. The system lives from [TextSystem::new]
/// until [TextSystem::shutdown], which frees whatever is still alive.
pub struct TextSystem<B: RenderBackend, R: GlyphRasterizer> {
    backend: B,
    rasterizer: R,
    fonts: FontCache,
    texts: Arena<TextObject>,
    config: TextConfig,
}

impl<B: RenderBackend, R: GlyphRasterizer> TextSystem<B, R> {
    /// Fails with [TextError::Config] if `config` doesn't validate.
    pub fn new(backend: B, rasterizer: R, config: TextConfig) -> TextResult<Self> {
        config.validate()?;
        info!("Text rendering initialized");
        Ok(Self {
            backend,
            rasterizer,
            fonts: FontCache::new(),
            texts: Arena::new(),
            config,
        })
    }

    /// Destroys every remaining text object and font and hands the backend back.
    pub fn shutdown(mut self) -> B {
        if !self.texts.is_empty() {
            warn!(
                "{} text objects were not destroyed before shutdown",
                self.texts.len()
            );
        }
        let handles = self.texts.iter().map(|(index, _)| index).collect::<Vec<_>>();
        for index in handles {
            if let Some(text) = self.texts.remove(index) {
                text.destroy(&mut self.fonts, &mut self.backend);
            }
        }
        // anything left here was acquired outside of a text object
        self.fonts.clear(&mut self.backend);

        info!("Text rendering shut down");
        self.backend
    }

    pub fn create_text(&mut self) -> TextHandle {
        let text = TextObject::new()
            .with_color(self.config.color)
            .with_scale(self.config.scale)
            .with_line_spacing(self.config.line_spacing)
            .with_replacement(self.config.replacement);
        TextHandle(self.texts.insert(text))
    }

    pub fn destroy_text(&mut self, handle: TextHandle) -> TextResult<()> {
        let text = self.texts.remove(handle.0).ok_or(TextError::UnknownText)?;
        text.destroy(&mut self.fonts, &mut self.backend);
        Ok(())
    }

    pub fn duplicate_text(&mut self, handle: TextHandle) -> TextResult<TextHandle> {
        let text = self.texts.get(handle.0).ok_or(TextError::UnknownText)?;
        let copy = text.duplicate(&mut self.fonts, &mut self.backend, &mut self.rasterizer)?;
        Ok(TextHandle(self.texts.insert(copy)))
    }

    fn text_mut(&mut self, handle: TextHandle) -> TextResult<&mut TextObject> {
        self.texts.get_mut(handle.0).ok_or(TextError::UnknownText)
    }

    pub fn text(&self, handle: TextHandle) -> Option<&TextObject> {
        self.texts.get(handle.0)
    }

    pub fn set_font(&mut self, handle: TextHandle, path: &str, size: u32) -> TextResult<()> {
        let text = self.texts.get_mut(handle.0).ok_or(TextError::UnknownText)?;
        text.set_font(&mut self.fonts, &mut self.backend, &mut self.rasterizer, path, size)
    }

    pub fn set_font_size(&mut self, handle: TextHandle, size: u32) -> TextResult<()> {
        let text = self.texts.get_mut(handle.0).ok_or(TextError::UnknownText)?;
        text.set_font_size(&mut self.fonts, &mut self.backend, &mut self.rasterizer, size)
    }

    pub fn set_string(&mut self, handle: TextHandle, string: &str) -> TextResult<()> {
        self.text_mut(handle)?.set_string(string);
        Ok(())
    }

    pub fn set_position(&mut self, handle: TextHandle, x: f32, y: f32) -> TextResult<()> {
        self.text_mut(handle)?.set_position(x, y);
        Ok(())
    }

    pub fn translate(&mut self, handle: TextHandle, dx: f32, dy: f32) -> TextResult<()> {
        self.text_mut(handle)?.translate(dx, dy);
        Ok(())
    }

    pub fn set_color(&mut self, handle: TextHandle, color: [f32; 4]) -> TextResult<()> {
        self.text_mut(handle)?.set_color(color);
        Ok(())
    }

    pub fn set_scale(&mut self, handle: TextHandle, scale: f32) -> TextResult<()> {
        self.text_mut(handle)?.set_scale(scale);
        Ok(())
    }

    pub fn set_line_spacing(&mut self, handle: TextHandle, line_spacing: f32) -> TextResult<()> {
        self.text_mut(handle)?.set_line_spacing(line_spacing);
        Ok(())
    }

    /// Line height in pixels of the text's font; 0 if it has none.
    pub fn font_height(&self, handle: TextHandle) -> TextResult<u32> {
        let text = self.texts.get(handle.0).ok_or(TextError::UnknownText)?;
        Ok(text.font_height(&self.fonts))
    }

    pub fn render(&mut self, handle: TextHandle) -> TextResult<RenderStats> {
        let text = self.texts.get_mut(handle.0).ok_or(TextError::UnknownText)?;
        text.render(&self.fonts, &mut self.backend)
    }

    pub fn text_count(&self) -> usize {
        self.texts.len()
    }

    pub fn fonts(&self) -> &FontCache {
        &self.fonts
    }

    pub fn config(&self) -> &TextConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{init_logging, FakeRasterizer, RecordingBackend};

    fn system() -> TextSystem<RecordingBackend, FakeRasterizer> {
        init_logging();
        TextSystem::new(
            RecordingBackend::default(),
            FakeRasterizer::default(),
            TextConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn end_to_end_through_handles() {
        let mut system = system();
        let text = system.create_text();
        system.set_font(text, "font.ttf", 20).unwrap();
        system.set_string(text, "Hi").unwrap();

        let stats = system.render(text).unwrap();
        assert_eq!((stats.glyphs, stats.draws), (2, 2));
        assert_eq!(system.backend().uploads, 1);
        assert_eq!(system.font_height(text).unwrap(), 20);

        system.destroy_text(text).unwrap();
        assert!(system.fonts().is_empty());
        assert_eq!(system.text_count(), 0);
    }

    #[test]
    fn new_texts_take_config_defaults() {
        init_logging();
        let config = TextConfig::default()
            .with_color([0.0, 1.0, 0.0, 1.0])
            .with_scale(2.0)
            .with_line_spacing(4.0);
        let mut system =
            TextSystem::new(RecordingBackend::default(), FakeRasterizer::default(), config)
                .unwrap();

        let handle = system.create_text();
        let text = system.text(handle).unwrap();
        assert_eq!(text.color(), [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(text.scale(), 2.0);
        assert_eq!(text.line_spacing(), 4.0);
        assert!(!text.is_bound());
    }

    #[test]
    fn unprintable_replacement_is_refused() {
        init_logging();
        let config = TextConfig::default().with_replacement('\u{e9}');
        let result =
            TextSystem::new(RecordingBackend::default(), FakeRasterizer::default(), config);
        assert!(matches!(result, Err(TextError::Config(_))));
    }

    #[test]
    fn glyph_count_survives_unknown_characters() {
        let mut system = system();
        let text = system.create_text();
        system.set_font(text, "font.ttf", 20).unwrap();
        system.set_string(text, "caf\u{e9}\nol\u{e9}").unwrap();
        assert_eq!(system.text(text).unwrap().glyph_count(), 7);

        let stats = system.render(text).unwrap();
        assert_eq!((stats.glyphs, stats.draws), (7, 7));
        assert_eq!(system.text(text).unwrap().glyph_count(), 7);
    }

    #[test]
    fn destroyed_handles_are_rejected() {
        let mut system = system();
        let text = system.create_text();
        system.destroy_text(text).unwrap();

        assert!(matches!(system.destroy_text(text), Err(TextError::UnknownText)));
        assert!(matches!(system.set_string(text, "x"), Err(TextError::UnknownText)));
        assert!(matches!(system.render(text), Err(TextError::UnknownText)));
        assert!(matches!(system.font_height(text), Err(TextError::UnknownText)));
        assert!(system.text(text).is_none());
    }

    #[test]
    fn unbound_text_reports_zero_height() {
        let mut system = system();
        let text = system.create_text();
        assert_eq!(system.font_height(text).unwrap(), 0);
        assert!(matches!(system.render(text), Err(TextError::UnboundFont)));
    }

    #[test]
    fn many_texts_one_font() {
        let mut system = system();
        let texts = (0..5).map(|_| system.create_text()).collect::<Vec<_>>();
        for text in &texts {
            system.set_font(*text, "font.ttf", 20).unwrap();
        }
        assert_eq!(system.fonts().len(), 1);
        assert_eq!(system.fonts().ref_count("font.ttf", 20), 5);
        assert_eq!(system.fonts().rasterizations(), 1);

        for text in texts {
            system.destroy_text(text).unwrap();
        }
        assert!(system.fonts().is_empty());
    }

    #[test]
    fn duplicate_is_independent() {
        let mut system = system();
        let original = system.create_text();
        system.set_font(original, "font.ttf", 20).unwrap();
        system.set_string(original, "same").unwrap();

        let copy = system.duplicate_text(original).unwrap();
        system.set_string(copy, "different").unwrap();

        assert_eq!(system.text(original).unwrap().string(), "same");
        assert_eq!(system.text(copy).unwrap().string(), "different");
        assert_eq!(system.fonts().ref_count("font.ttf", 20), 2);
    }

    #[test]
    fn shutdown_frees_everything_left_behind() {
        let mut system = system();
        for path in ["font.ttf", "other.ttf"] {
            let text = system.create_text();
            system.set_font(text, path, 16).unwrap();
            system.set_string(text, "leak").unwrap();
            system.render(text).unwrap();
        }
        let _never_bound = system.create_text();

        let backend = system.shutdown();
        assert_eq!(backend.live_textures(), 0);
        assert_eq!(backend.live_buffers(), 0);
    }
}
