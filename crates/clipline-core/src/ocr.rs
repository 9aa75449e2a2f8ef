//! OCR document-text annotation model and the flat word index built from it.
//!
//! Accepts the engine's JSON in either key style: camelCase from the REST
//! API, snake_case from protobuf-to-dict conversions. Hierarchy is
//! pages → blocks → paragraphs → words → symbols. Any level may be
//! missing or `null`; it then contributes nothing.

use serde::{Deserialize, Deserializer, Serialize};

use crate::diagnostics::Diagnostics;
use crate::error::ClipError;
use crate::geometry::{BoundingBox, Quad, Vertex};

/// Treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Polygon attached to a word, paragraph or block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoundingPoly {
    #[serde(default, deserialize_with = "null_as_default")]
    pub vertices: Vec<Vertex>,
}

/// One recognised character.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Symbol {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    #[serde(default, alias = "bounding_box")]
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub symbols: Vec<Symbol>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    #[serde(default, alias = "bounding_box")]
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub words: Vec<Word>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(default, alias = "bounding_box")]
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextAnnotation {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pages: Vec<Page>,
}

/// OCR result for one image or one rendered PDF page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateResponse {
    #[serde(default, alias = "full_text_annotation")]
    pub full_text_annotation: Option<TextAnnotation>,
}

/// Everything the word index accepts: one response, one per page, or the
/// engine's batch envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OcrInput {
    Batch {
        #[serde(deserialize_with = "null_as_default")]
        responses: Vec<AnnotateResponse>,
    },
    Pages(Vec<AnnotateResponse>),
    Single(AnnotateResponse),
}

impl OcrInput {
    /// Parse OCR JSON text. Only malformed JSON or a shape that is not an
    /// annotation response at all is an error.
    pub fn from_json_str(s: &str) -> Result<Self, ClipError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Responses in page order.
    pub fn responses(&self) -> &[AnnotateResponse] {
        match self {
            Self::Batch { responses } | Self::Pages(responses) => responses,
            Self::Single(response) => std::slice::from_ref(response),
        }
    }
}

/// A recognised word: its glyphs in order and its quad.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub glyphs: Vec<String>,
    pub quad: Quad,
}

impl OcrWord {
    pub fn new(glyphs: Vec<String>, quad: Quad) -> Self {
        Self { glyphs, quad }
    }

    /// Glyphs concatenated.
    pub fn text(&self) -> String {
        self.glyphs.concat()
    }

    pub fn envelope(&self) -> BoundingBox {
        self.quad.envelope()
    }
}

/// Flatten OCR responses into words: page order, then block, paragraph and
/// intra-paragraph order exactly as the engine reported them.
///
/// Missing annotation levels contribute nothing. Words without a
/// four-corner box are skipped.
pub fn words(input: &OcrInput, diagnostics: &dyn Diagnostics) -> Vec<OcrWord> {
    let mut out = Vec::new();
    let mut skipped = 0usize;

    for response in input.responses() {
        let Some(annotation) = &response.full_text_annotation else {
            continue;
        };
        for page in &annotation.pages {
            for block in &page.blocks {
                for paragraph in &block.paragraphs {
                    for word in &paragraph.words {
                        match to_ocr_word(word) {
                            Some(w) => out.push(w),
                            None => skipped += 1,
                        }
                    }
                }
            }
        }
    }

    if skipped > 0 {
        diagnostics.debug(&format!("skipped {skipped} OCR words without a four-corner box"));
    }
    out
}

fn to_ocr_word(word: &Word) -> Option<OcrWord> {
    let poly = word.bounding_box.as_ref()?;
    let quad = Quad::from_vertices(&poly.vertices)?;
    let glyphs = word.symbols.iter().map(|s| s.text.clone()).collect();
    Some(OcrWord::new(glyphs, quad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CapturingDiagnostics, Level, NullDiagnostics};
    use serde_json::json;

    fn word_json(text: &str, x: f64, y: f64, w: f64, h: f64) -> serde_json::Value {
        json!({
            "boundingBox": {"vertices": [
                {"x": x, "y": y}, {"x": x + w, "y": y},
                {"x": x + w, "y": y + h}, {"x": x, "y": y + h}
            ]},
            "symbols": text.chars().map(|c| json!({"text": c.to_string()})).collect::<Vec<_>>()
        })
    }

    fn response_json(words: Vec<serde_json::Value>) -> serde_json::Value {
        json!({"fullTextAnnotation": {"pages": [{"blocks": [{"paragraphs": [{"words": words}]}]}]}})
    }

    fn parse(value: serde_json::Value) -> OcrInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn single_response_flattens_in_order() {
        let input = parse(response_json(vec![
            word_json("テスト", 10.0, 10.0, 40.0, 20.0),
            word_json("会社", 60.0, 10.0, 40.0, 20.0),
        ]));
        let words = words(&input, &NullDiagnostics);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text(), "テスト");
        assert_eq!(words[1].text(), "会社");
        assert_eq!(words[1].envelope(), BoundingBox::new(60.0, 10.0, 40.0, 20.0));
    }

    #[test]
    fn multi_page_keeps_page_order() {
        let input = parse(json!([
            response_json(vec![word_json("ページ1", 10.0, 10.0, 60.0, 20.0)]),
            response_json(vec![word_json("ページ2", 10.0, 10.0, 60.0, 20.0)]),
        ]));
        let words = words(&input, &NullDiagnostics);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text(), "ページ1");
        assert_eq!(words[1].text(), "ページ2");
    }

    #[test]
    fn batch_envelope_is_accepted() {
        let input = parse(json!({"responses": [
            response_json(vec![word_json("A", 0.0, 0.0, 5.0, 5.0)])
        ]}));
        assert_eq!(words(&input, &NullDiagnostics).len(), 1);
    }

    #[test]
    fn snake_case_keys_and_omitted_zero_coordinates() {
        let input = parse(json!({"full_text_annotation": {"pages": [{"blocks": [{"paragraphs": [{"words": [{
            "bounding_box": {"vertices": [{}, {"x": 30}, {"x": 30, "y": 12}, {"y": 12}]},
            "symbols": [{"text": "x"}]
        }]}]}]}]}}));
        let words = words(&input, &NullDiagnostics);
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].envelope(), BoundingBox::new(0.0, 0.0, 30.0, 12.0));
    }

    #[test]
    fn missing_structures_yield_empty() {
        let sink = NullDiagnostics;
        assert!(words(&parse(json!({})), &sink).is_empty());
        assert!(words(&parse(json!({"fullTextAnnotation": null})), &sink).is_empty());
        assert!(words(&parse(json!({"fullTextAnnotation": {"pages": [{}]}})), &sink).is_empty());
        assert!(words(&parse(json!([])), &sink).is_empty());
    }

    #[test]
    fn null_levels_yield_empty() {
        let sink = NullDiagnostics;
        for value in [
            json!({"fullTextAnnotation": {"pages": null}}),
            json!({"fullTextAnnotation": {"pages": [{"blocks": null}]}}),
            json!({"fullTextAnnotation": {"pages": [{"blocks": [{"paragraphs": null}]}]}}),
            json!({"fullTextAnnotation": {"pages": [{"blocks": [{"paragraphs": [{"words": null}]}]}]}}),
            json!({"responses": null}),
        ] {
            assert!(words(&parse(value), &sink).is_empty());
        }
    }

    #[test]
    fn null_symbols_and_float_page_size_are_accepted() {
        let input = parse(json!({"fullTextAnnotation": {"pages": [{
            "width": 1240.0,
            "height": 1754.5,
            "blocks": [{"paragraphs": [{"words": [
                {"boundingBox": {"vertices": [{"x": 0, "y": 0}, {"x": 5, "y": 0}, {"x": 5, "y": 5}, {"x": 0, "y": 5}]}, "symbols": null},
                word_json("ok", 10.0, 0.0, 10.0, 10.0)
            ]}]}]
        }]}}));
        let words = words(&input, &NullDiagnostics);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text(), "");
        assert_eq!(words[1].text(), "ok");
    }

    #[test]
    fn from_json_str_reports_syntax_errors() {
        let input = OcrInput::from_json_str(r#"{"fullTextAnnotation": {"pages": null}}"#).unwrap();
        assert!(words(&input, &NullDiagnostics).is_empty());
        assert!(matches!(
            OcrInput::from_json_str("{not json"),
            Err(ClipError::Json(_))
        ));
    }

    #[test]
    fn words_without_quad_are_skipped() {
        let input = parse(response_json(vec![
            json!({"symbols": [{"text": "?"}]}),
            json!({"boundingBox": {"vertices": [{"x": 1, "y": 1}]}, "symbols": [{"text": "!"}]}),
            word_json("ok", 0.0, 0.0, 10.0, 10.0),
        ]));
        let sink = CapturingDiagnostics::new();
        let words = words(&input, &sink);
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text(), "ok");
        assert_eq!(sink.count(Level::Debug), 1);
    }
}
