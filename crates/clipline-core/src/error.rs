use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipError {
    #[error("bounding box is missing one of x, y, width, height")]
    IncompleteBox,

    #[error("bounding box has negative extent (width {width}, height {height})")]
    NegativeExtent { width: f64, height: f64 },

    #[error("geometry contains a non-finite coordinate")]
    NonFiniteGeometry,

    #[error("field tree nested deeper than {depth} levels")]
    TooDeep { depth: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
