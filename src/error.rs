use thiserror::Error;

/// Errors reported by the engine.
///
/// Degenerate input (a glyph without ink, an empty template set) is not an
/// error; those cases surface as `None` or an empty candidate list.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid alphabet: {0}")]
    InvalidAlphabet(String),

    #[error("invalid region: ({from_x}, {from_y}) -> ({to_x}, {to_y})")]
    InvalidRegion {
        from_x: f64,
        from_y: f64,
        to_x: f64,
        to_y: f64,
    },

    #[error("page not loaded - call load_page first")]
    PageNotLoaded,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T, E = OcrError> = std::result::Result<T, E>;
