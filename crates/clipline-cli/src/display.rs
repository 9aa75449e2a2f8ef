//! Human-readable output for clip messages and word listings.

use clipline_core::{Clip, ClipMessage, OcrWord};

const MAX_VALUE_CHARS: usize = 30;

// ── Public API ──

/// Print a clip message as a header plus one row per clip.
pub fn print_clip_table(message: &ClipMessage) {
    println!("=== {} ===", message.clipping_request_id);
    println!(
        "status: {}  clips: {}  at: {}",
        message.status,
        message.clips.len(),
        message.processed_timestamp.to_rfc3339()
    );
    if let Some(err) = &message.error_message {
        println!("error: {err}");
    }
    println!();

    if message.clips.is_empty() {
        return;
    }

    println!(
        "  {:<36} {:>4} {:>8} {:>8} {:>8} {:>8} {:>6}  value",
        "field", "page", "x", "y", "width", "height", "score"
    );
    for clip in &message.clips {
        print_clip_row(clip);
    }
}

/// Print one line per word: envelope then text.
pub fn print_words(words: &[OcrWord]) {
    for word in words {
        let b = word.envelope();
        println!(
            "  {:>8.1} {:>8.1} {:>8.1} {:>8.1}  {}",
            b.x,
            b.y,
            b.width,
            b.height,
            word.text()
        );
    }
    eprintln!("  {} words", words.len());
}

// ── Rows ──

fn print_clip_row(clip: &Clip) {
    let score = match clip.reliability_score {
        Some(s) => format!("{s:.2}"),
        None => "-".to_string(),
    };
    println!(
        "  {:<36} {:>4} {:>8.1} {:>8.1} {:>8.1} {:>8.1} {:>6}  {}",
        clip.field_name,
        clip.page,
        clip.x_coordinate,
        clip.y_coordinate,
        clip.width,
        clip.height,
        score,
        truncate(&clip.value)
    );
}

// ── Helpers ──

/// Cut on a char boundary; values are often Japanese.
fn truncate(value: &str) -> String {
    if value.chars().count() > MAX_VALUE_CHARS {
        let head: String = value.chars().take(MAX_VALUE_CHARS - 3).collect();
        format!("{head}...")
    } else {
        value.to_string()
    }
}
