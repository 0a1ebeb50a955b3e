// text rendering, kept simple:
// - fontdue rasterizes every printable glyph of a font into its own bitmap
// - each bitmap becomes one texture, shared by every text object using that font + size
// - a text object lays its string out into textured quads and draws them one glyph at a time

pub mod font;
pub mod font_cache;
pub mod layout;
pub mod pipeline;
pub mod rasterizer;
pub mod system;
pub mod text_object;
