//! Document-level stage: wraps correction and projection with the checks
//! and envelope the message consumer expects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::corrector::correct;
use crate::diagnostics::Diagnostics;
use crate::ocr::{OcrInput, words};
use crate::projector::{Clip, project};
use crate::tree::FieldNode;

/// Error recorded when the extraction step produced nothing usable.
pub const NO_STRUCTURED_DATA: &str = "No structured data from LLM";

/// Outcome of [`process_extraction`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub processed: bool,
    pub original_data: Value,
    pub corrected_data: Option<FieldNode>,
    pub error: Option<String>,
    pub process_timestamp: DateTime<Utc>,
}

/// Overall result reported alongside the clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Success,
    /// Processing succeeded but no clip survived filtering.
    Warning,
    Error,
}

impl MessageStatus {
    /// Same spelling as the serialised form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload handed to the delivery layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipMessage {
    pub clipping_request_id: String,
    pub status: MessageStatus,
    pub clips: Vec<Clip>,
    pub error_message: Option<String>,
    pub processed_timestamp: DateTime<Utc>,
}

/// Validate the extraction output and correct its boxes against `ocr`.
///
/// A non-object, an empty object, or an object carrying only the model's
/// `raw_response` is not processed. Without OCR input the tree passes
/// through uncorrected.
pub fn process_extraction(
    extracted: &Value,
    ocr: Option<&OcrInput>,
    diagnostics: &dyn Diagnostics,
) -> ProcessedDocument {
    diagnostics.info("Processing extracted data");
    let now = Utc::now();

    let structured = match extracted {
        Value::Object(map) => !map.is_empty() && !map.contains_key("raw_response"),
        _ => false,
    };
    if !structured {
        diagnostics.warn("Only raw response available, no structured data to process");
        return ProcessedDocument {
            processed: false,
            original_data: extracted.clone(),
            corrected_data: None,
            error: Some(NO_STRUCTURED_DATA.to_string()),
            process_timestamp: now,
        };
    }

    let tree = FieldNode::from_keyed(None, extracted);
    let corrected = match ocr {
        Some(ocr) => correct(&tree, &words(ocr, diagnostics), diagnostics),
        None => {
            diagnostics.info("No OCR data provided; using extracted boxes as-is.");
            tree
        }
    };

    ProcessedDocument {
        processed: true,
        original_data: extracted.clone(),
        corrected_data: Some(corrected),
        error: None,
        process_timestamp: now,
    }
}

/// Project a processed document into the outgoing message.
pub fn format_message(
    document: &ProcessedDocument,
    clipping_request_id: &str,
    diagnostics: &dyn Diagnostics,
) -> ClipMessage {
    diagnostics.info(&format!("Formatting clip message for request {clipping_request_id}"));

    let mut message = ClipMessage {
        clipping_request_id: clipping_request_id.to_string(),
        status: MessageStatus::Error,
        clips: Vec::new(),
        error_message: document.error.clone(),
        processed_timestamp: document.process_timestamp,
    };

    match (&document.corrected_data, &document.error) {
        (Some(tree), _) if document.processed => {
            let clips = project(tree, diagnostics);
            if clips.is_empty() {
                diagnostics.warn("No valid clips generated although processing succeeded.");
                message.status = MessageStatus::Warning;
                message.error_message =
                    Some("No valid clips could be generated from the processed data.".into());
            } else {
                diagnostics.info(&format!("Formatted {} clips.", clips.len()));
                message.status = MessageStatus::Success;
                message.error_message = None;
                message.clips = clips;
            }
        }
        (_, Some(error)) => {
            diagnostics.warn(&format!("Formatting error message due to processing error: {error}"));
        }
        _ => {
            diagnostics.error("Processed document has neither data nor an error.");
            message.error_message = Some("Unknown error during processing or formatting.".into());
        }
    }
    message
}
