//! Bounding-box correction: snaps each leaf's approximate box to the OCR
//! words that spell its value.
//!
//! Correction is best-effort. Leaves that cannot be matched keep the
//! model's box, and any internal fault returns the input tree untouched.

use crate::diagnostics::Diagnostics;
use crate::error::ClipError;
use crate::geometry::{BoundingBox, RawBox};
use crate::matcher::find_match;
use crate::normalize::FieldType;
use crate::ocr::OcrWord;
use crate::tree::{FieldNode, Group, Leaf, Scalar, TaxBreakdownEntry};

/// Nesting limit for the recursive walks over a field tree.
pub const MAX_TREE_DEPTH: usize = 64;

/// Return a copy of `tree` with every matchable leaf box replaced by the
/// envelope of its OCR words. Never fails.
pub fn correct(tree: &FieldNode, words: &[OcrWord], diagnostics: &dyn Diagnostics) -> FieldNode {
    if words.is_empty() {
        diagnostics.warn("No OCR words available; skipping bounding box correction.");
        return tree.clone();
    }

    diagnostics.info("Starting bounding box correction using OCR data.");
    diagnostics.info(&format!("Found {} words in OCR data for correction.", words.len()));

    let mut corrector = Corrector {
        words,
        diagnostics,
        corrected: 0,
    };
    match corrector.node(tree, 0) {
        Ok(out) => {
            diagnostics.debug(&format!("corrected {} leaf boxes", corrector.corrected));
            diagnostics.info("Bounding box correction process completed.");
            out
        }
        Err(e) => {
            diagnostics.error(&format!("bounding box correction failed: {e}"));
            tree.clone()
        }
    }
}

struct Corrector<'a> {
    words: &'a [OcrWord],
    diagnostics: &'a dyn Diagnostics,
    corrected: usize,
}

impl Corrector<'_> {
    fn node(&mut self, node: &FieldNode, depth: usize) -> Result<FieldNode, ClipError> {
        if depth > MAX_TREE_DEPTH {
            return Err(ClipError::TooDeep {
                depth: MAX_TREE_DEPTH,
            });
        }
        Ok(match node {
            FieldNode::Leaf(leaf) => FieldNode::Leaf(self.leaf(leaf, depth)?),
            FieldNode::Group(group) => FieldNode::Group(Group {
                attrs: group.attrs.clone(),
                children: self.children(&group.children, depth)?,
            }),
            FieldNode::TaxBreakdown(entries) => FieldNode::TaxBreakdown(
                entries
                    .iter()
                    .map(|e| {
                        self.node(&e.node, depth + 1)
                            .map(|node| TaxBreakdownEntry { node })
                    })
                    .collect::<Result<_, _>>()?,
            ),
            FieldNode::List(items) => FieldNode::List(
                items
                    .iter()
                    .map(|item| self.node(item, depth + 1))
                    .collect::<Result<_, _>>()?,
            ),
            FieldNode::Raw(value) => FieldNode::Raw(value.clone()),
        })
    }

    fn children(
        &mut self,
        children: &[(String, FieldNode)],
        depth: usize,
    ) -> Result<Vec<(String, FieldNode)>, ClipError> {
        children
            .iter()
            .map(|(key, child)| self.node(child, depth + 1).map(|n| (key.clone(), n)))
            .collect()
    }

    fn leaf(&mut self, leaf: &Leaf, depth: usize) -> Result<Leaf, ClipError> {
        let mut out = Leaf {
            value: leaf.value.clone(),
            attrs: leaf.attrs.clone(),
            children: self.children(&leaf.children, depth)?,
        };

        let (Some(text), Some(approx)) = (leaf.value.as_text(), leaf.complete_bbox()) else {
            return Ok(out);
        };
        if !approx.is_finite() {
            return Err(ClipError::NonFiniteGeometry);
        }

        let overlapping: Vec<&OcrWord> = self
            .words
            .iter()
            .filter(|w| w.envelope().overlaps(&approx))
            .collect();
        if overlapping.is_empty() {
            return Ok(out);
        }

        let field_type = match leaf.value {
            Scalar::Number(_) => FieldType::Number,
            _ => FieldType::classify(&text),
        };

        if let Some(matched) = find_match(&text, &overlapping, field_type) {
            let corners = matched.iter().flat_map(|w| w.quad.corners);
            if let Some(tight) = BoundingBox::enclosing(corners) {
                self.diagnostics.debug(&format!(
                    "corrected {} box for {text:?} using {} words",
                    field_type.as_str(),
                    matched.len()
                ));
                out.attrs.bbox = Some(RawBox::from(tight));
                self.corrected += 1;
            }
        }
        Ok(out)
    }
}
