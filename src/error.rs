/// Result type for the text layer.
pub type TextResult<T> = Result<T, TextError>;

/// Errors surfaced by font loading, text binding and text rendering.
///
/// None of these abort the process. A failed bind leaves the text object in
/// whatever state it was in before the call.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The font file is missing, unreadable or not a font.
    #[error("failed to load font '{path}': {reason}")]
    FontLoad { path: String, reason: String },

    /// A glyph in the printable range could not be rasterized. The whole font is rejected.
    #[error("failed to rasterize glyph {character:?} from '{path}': {reason}")]
    GlyphRasterization {
        path: String,
        character: char,
        reason: String,
    },

    /// The operation needs a bound font and the text object has none.
    #[error("text object has no font bound")]
    UnboundFont,

    /// The text handle does not refer to a live text object.
    #[error("unknown text handle")]
    UnknownText,

    #[error("invalid text config: {0}")]
    Config(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl TextError {
    pub(crate) fn font_load(path: &str, reason: impl ToString) -> Self {
        TextError::FontLoad {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}
