//! File-backed drivers for each subcommand: read JSON → run the core → hand
//! the result back for printing.

use std::path::Path;

use anyhow::Context;
use clipline_core::matcher::reading_order;
use clipline_core::{
    ClipMessage, OcrInput, OcrWord, TracingDiagnostics, format_message,
    process_extraction,
};
use serde::Serialize;

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {} as JSON", path.display()))
}

fn read_ocr(path: &Path) -> anyhow::Result<OcrInput> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    OcrInput::from_json_str(&text)
        .with_context(|| format!("parsing {} as an OCR annotation response", path.display()))
}

/// Full pipeline: extraction + OCR → clip message.
pub fn clip(fields: &Path, ocr: &Path, request_id: &str) -> anyhow::Result<ClipMessage> {
    let extracted = read_json(fields)?;
    let ocr = read_ocr(ocr)?;

    let diagnostics = TracingDiagnostics;
    let document = process_extraction(&extracted, Some(&ocr), &diagnostics);
    let message = format_message(&document, request_id, &diagnostics);
    tracing::info!(
        request_id,
        clips = message.clips.len(),
        "clip message ready"
    );
    Ok(message)
}

/// Correction only. An unprocessable extraction is echoed back unchanged.
pub fn correct(fields: &Path, ocr: &Path) -> anyhow::Result<serde_json::Value> {
    let extracted = read_json(fields)?;
    let ocr = read_ocr(ocr)?;

    let document = process_extraction(&extracted, Some(&ocr), &TracingDiagnostics);
    Ok(match document.corrected_data {
        Some(tree) => tree.to_json(),
        None => document.original_data,
    })
}

/// Word index of an OCR file, in reading order.
pub fn words(ocr: &Path) -> anyhow::Result<Vec<OcrWord>> {
    let ocr = read_ocr(ocr)?;
    let words = clipline_core::words(&ocr, &TracingDiagnostics);
    let refs: Vec<&OcrWord> = words.iter().collect();
    Ok(reading_order(&refs).into_iter().cloned().collect())
}

/// Pretty JSON to `output`, or stdout.
pub fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialising output")?;
    match output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("  Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
