pub mod backend;
pub mod bind;
pub mod camera;
pub mod config;
pub mod console;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod text;
pub mod texture;

#[cfg(test)]
mod testing;

pub use backend::{BufferHandle, GlyphDraw, RenderBackend, TextureHandle};
pub use config::{ConsoleConfig, TextConfig};
pub use console::ConsoleLog;
pub use error::{TextError, TextResult};
pub use render::Render;
pub use text::{
    font::{FontKey, FontResource, Glyph},
    font_cache::{FontCache, FontHandle},
    rasterizer::{FontdueRasterizer, GlyphRasterizer},
    system::{TextHandle, TextSystem},
    text_object::{RenderStats, TextObject},
};

// everything above the backend trait is gpu agnostic and tested against a
// recording backend; only render.rs and the pipeline talk to wgpu.
//
// console.rs is the only consumer in the crate, it should stay on the
// TextSystem surface and never reach into text objects directly.
