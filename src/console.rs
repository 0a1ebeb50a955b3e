use std::collections::VecDeque;

use log::debug;

use crate::{
    backend::RenderBackend,
    config::ConsoleConfig,
    error::TextResult,
    text::{
        rasterizer::GlyphRasterizer,
        system::{TextHandle, TextSystem},
        text_object::RenderStats,
    },
};

/// A scrolling log view: the newest line sits at the origin and older lines
/// stack upward, one font height apart.
///
/// Only uses the public text interface, so it doubles as the reference
/// consumer for it. Command parsing and input are somebody else's problem.
pub struct ConsoleLog {
    config: ConsoleConfig,
    lines: VecDeque<TextHandle>,
    opacity: f32,
}

impl ConsoleLog {
    pub fn new(config: &ConsoleConfig) -> TextResult<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            lines: VecDeque::new(),
            opacity: 1.0,
        })
    }

    pub fn log<B: RenderBackend, R: GlyphRasterizer>(
        &mut self,
        system: &mut TextSystem<B, R>,
        line: &str,
    ) -> TextResult<()> {
        // the new line must bind before anything is evicted
        let text = system.create_text();
        let prepared = system
            .set_font(text, &self.config.font_path, self.config.font_size)
            .and_then(|_| system.set_color(text, self.color()))
            .and_then(|_| system.set_line_spacing(text, self.config.line_spacing))
            .and_then(|_| system.set_string(text, line));
        if let Err(err) = prepared {
            system.destroy_text(text)?;
            return Err(err);
        }

        if self.lines.len() >= self.config.max_lines {
            if let Some(oldest) = self.lines.pop_front() {
                system.destroy_text(oldest)?;
            }
        }
        self.lines.push_back(text);
        self.layout(system)
    }

    /// Rebinds every line at a new size and restacks them.
    pub fn set_font_size<B: RenderBackend, R: GlyphRasterizer>(
        &mut self,
        system: &mut TextSystem<B, R>,
        size: u32,
    ) -> TextResult<()> {
        if size == self.config.font_size {
            return Ok(());
        }
        for line in &self.lines {
            system.set_font_size(*line, size)?;
        }
        self.config.font_size = size;
        self.layout(system)
    }

    /// Fades every line; only touches color so no geometry is rebuilt.
    pub fn set_opacity<B: RenderBackend, R: GlyphRasterizer>(
        &mut self,
        system: &mut TextSystem<B, R>,
        opacity: f32,
    ) -> TextResult<()> {
        self.opacity = opacity.clamp(0.0, 1.0);
        let color = self.color();
        for line in &self.lines {
            system.set_color(*line, color)?;
        }
        Ok(())
    }

    fn color(&self) -> [f32; 4] {
        let [r, g, b, a] = self.config.color;
        [r, g, b, a * self.opacity]
    }

    pub fn layout<B: RenderBackend, R: GlyphRasterizer>(
        &mut self,
        system: &mut TextSystem<B, R>,
    ) -> TextResult<()> {
        let [x, y] = self.config.origin;
        let Some(newest) = self.lines.back() else {
            return Ok(());
        };
        let step = system.font_height(*newest)? as f32 + self.config.line_spacing;

        for (row, line) in self.lines.iter().rev().enumerate() {
            system.set_position(*line, x, y + step * row as f32)?;
        }
        debug!("Stacked {} console lines {}px apart", self.lines.len(), step);
        Ok(())
    }

    pub fn render<B: RenderBackend, R: GlyphRasterizer>(
        &self,
        system: &mut TextSystem<B, R>,
    ) -> TextResult<RenderStats> {
        let mut total = RenderStats::default();
        if self.opacity <= 0.0 {
            return Ok(total);
        }
        for line in &self.lines {
            let stats = system.render(*line)?;
            total.rebuilt |= stats.rebuilt;
            total.glyphs += stats.glyphs;
            total.draws += stats.draws;
        }
        Ok(total)
    }

    pub fn clear<B: RenderBackend, R: GlyphRasterizer>(
        &mut self,
        system: &mut TextSystem<B, R>,
    ) -> TextResult<()> {
        while let Some(line) = self.lines.pop_front() {
            system.destroy_text(line)?;
        }
        Ok(())
    }

    /// Oldest first.
    pub fn lines(&self) -> impl Iterator<Item = TextHandle> + '_ {
        self.lines.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        config::TextConfig,
        error::TextError,
        testing::{init_logging, FakeRasterizer, RecordingBackend},
    };

    fn setup(max_lines: usize) -> (TextSystem<RecordingBackend, FakeRasterizer>, ConsoleLog) {
        init_logging();
        let console = ConsoleConfig::default()
            .with_font("console.ttf", 20)
            .with_max_lines(max_lines)
            .with_origin(5.0, 5.0);
        let system = TextSystem::new(
            RecordingBackend::default(),
            FakeRasterizer::default(),
            TextConfig::default(),
        )
        .unwrap();
        (system, ConsoleLog::new(&console).unwrap())
    }

    fn strings(
        console: &ConsoleLog,
        system: &TextSystem<RecordingBackend, FakeRasterizer>,
    ) -> Vec<String> {
        console
            .lines()
            .map(|line| system.text(line).unwrap().string().to_string())
            .collect()
    }

    #[test]
    fn oldest_lines_are_evicted() {
        let (mut system, mut console) = setup(3);
        for line in ["one", "two", "three", "four"] {
            console.log(&mut system, line).unwrap();
        }

        assert_eq!(strings(&console, &system), ["two", "three", "four"]);
        assert_eq!(system.text_count(), 3);
        assert_eq!(system.fonts().ref_count("console.ttf", 20), 3);
        assert_eq!(system.fonts().rasterizations(), 1);
    }

    #[test]
    fn lines_stack_upward_by_font_height() {
        let (mut system, mut console) = setup(5);
        for line in ["a", "b", "c"] {
            console.log(&mut system, line).unwrap();
        }

        let ys = console
            .lines()
            .map(|line| system.text(line).unwrap().position())
            .collect::<Vec<_>>();
        // oldest first, newest at the origin
        assert_relative_eq!(ys[2].y, 5.0);
        assert_relative_eq!(ys[1].y, 25.0);
        assert_relative_eq!(ys[0].y, 45.0);
        assert!(ys.iter().all(|position| position.x == 5.0));
    }

    #[test]
    fn resizing_rebinds_and_restacks() {
        let (mut system, mut console) = setup(5);
        console.log(&mut system, "first").unwrap();
        console.log(&mut system, "second").unwrap();

        console.set_font_size(&mut system, 30).unwrap();
        assert!(!system.fonts().contains("console.ttf", 20));
        assert_eq!(system.fonts().ref_count("console.ttf", 30), 2);

        let oldest = console.lines().next().unwrap();
        assert_relative_eq!(system.text(oldest).unwrap().position().y, 35.0);
    }

    #[test]
    fn opacity_only_changes_color() {
        let (mut system, mut console) = setup(5);
        console.log(&mut system, "fade").unwrap();
        console.render(&mut system).unwrap();

        console.set_opacity(&mut system, 0.5).unwrap();
        let stats = console.render(&mut system).unwrap();
        assert!(!stats.rebuilt);
        let last = system.backend().draws.last().unwrap();
        assert_relative_eq!(last.color[3], 0.5);

        console.set_opacity(&mut system, 0.0).unwrap();
        assert_eq!(console.render(&mut system).unwrap().draws, 0);
    }

    #[test]
    fn failed_font_leaves_no_line_behind() {
        let (mut system, _) = setup(5);
        let mut console =
            ConsoleLog::new(&ConsoleConfig::default().with_font("missing.ttf", 20)).unwrap();

        let err = console.log(&mut system, "lost").unwrap_err();
        assert!(matches!(err, TextError::FontLoad { .. }));
        assert!(console.is_empty());
        assert_eq!(system.text_count(), 0);
    }

    #[test]
    fn failed_log_on_a_full_console_keeps_every_line() {
        let (mut system, mut console) = setup(2);
        console.log(&mut system, "one").unwrap();
        console.log(&mut system, "two").unwrap();

        console.config.font_path = "missing.ttf".into();
        let err = console.log(&mut system, "three").unwrap_err();
        assert!(matches!(err, TextError::FontLoad { .. }));

        assert_eq!(strings(&console, &system), ["one", "two"]);
        assert_eq!(system.text_count(), 2);
        assert_eq!(system.fonts().ref_count("console.ttf", 20), 2);
    }

    #[test]
    fn zero_max_lines_is_rejected() {
        let config = ConsoleConfig::default().with_max_lines(0);
        assert!(matches!(ConsoleLog::new(&config), Err(TextError::Config(_))));
    }

    #[test]
    fn clear_releases_every_line() {
        let (mut system, mut console) = setup(5);
        console.log(&mut system, "x").unwrap();
        console.log(&mut system, "y").unwrap();
        let stats = console.render(&mut system).unwrap();
        assert_eq!(stats.draws, 2);

        console.clear(&mut system).unwrap();
        assert!(console.is_empty());
        assert!(system.fonts().is_empty());
        let backend = system.shutdown();
        assert_eq!(backend.live_buffers(), 0);
    }
}
