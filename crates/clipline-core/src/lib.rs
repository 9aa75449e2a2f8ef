pub mod corrector;
pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod matcher;
pub mod normalize;
pub mod ocr;
pub mod pipeline;
pub mod projector;
pub mod tree;

pub use corrector::correct;
pub use diagnostics::{CapturingDiagnostics, Diagnostics, Level, NullDiagnostics, TracingDiagnostics};
pub use error::ClipError;
pub use geometry::{BoundingBox, Quad, RawBox, Vertex, vertices_to_box};
pub use matcher::find_match;
pub use normalize::{FieldType, normalize, parse_date};
pub use ocr::{OcrInput, OcrWord, words};
pub use pipeline::{ClipMessage, MessageStatus, ProcessedDocument, format_message, process_extraction};
pub use projector::{Clip, project};
pub use tree::{FieldNode, Leaf, Scalar};
