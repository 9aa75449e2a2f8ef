//! Finds the run of OCR words that spells a field value.

use crate::normalize::{FieldType, normalize};
use crate::ocr::OcrWord;

/// Sort words into reading order: top-to-bottom by the first corner's y,
/// then left-to-right by its x. Stable, so ties keep index order.
pub fn reading_order<'a>(words: &[&'a OcrWord]) -> Vec<&'a OcrWord> {
    let mut sorted = words.to_vec();
    sorted.sort_by(|a, b| {
        let (pa, pb) = (a.quad.origin(), b.quad.origin());
        pa.y.total_cmp(&pb.y).then(pa.x.total_cmp(&pb.x))
    });
    sorted
}

/// Find the contiguous run of `words` whose concatenated text matches
/// `target` under `field_type`'s normalisation.
///
/// Windows are scanned shortest first, then earliest first, and the scan
/// stops at the first hit. Exact matches are tried over every window before
/// containment (text fields only) is considered, so the whole value wins
/// over a fragment of it.
pub fn find_match<'a>(
    target: &str,
    words: &[&'a OcrWord],
    field_type: FieldType,
) -> Option<Vec<&'a OcrWord>> {
    let target = normalize(Some(target), field_type);
    if target.is_empty() || words.is_empty() {
        return None;
    }

    let ordered = reading_order(words);
    let exact = first_window(&ordered, field_type, |text| text == target);
    let (start, len) = exact.or_else(|| match field_type {
        FieldType::Text => first_window(&ordered, field_type, |text| {
            text.contains(target.as_str()) || target.contains(text)
        }),
        FieldType::Number | FieldType::Date => None,
    })?;

    Some(ordered[start..start + len].to_vec())
}

/// First `(start, len)` in length-major order whose normalised text is
/// non-empty and accepted. Windows are built one at a time.
fn first_window(
    ordered: &[&OcrWord],
    field_type: FieldType,
    accept: impl Fn(&str) -> bool,
) -> Option<(usize, usize)> {
    let n = ordered.len();
    (1..=n)
        .flat_map(|len| (0..=n - len).map(move |start| (start, len)))
        .find(|&(start, len)| {
            let joined: String = ordered[start..start + len]
                .iter()
                .map(|w| w.text())
                .collect();
            let text = normalize(Some(&joined), field_type);
            !text.is_empty() && accept(&text)
        })
}
