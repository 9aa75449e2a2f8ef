//! Clip projection: flattens a corrected field tree into named, positioned
//! records.
//!
//! Names come from the key path of each node, rewritten by a small ordered
//! rule table ([`NAMING_RULES`]). Tax breakdown rows are bucketed by rate
//! instead of walked. Candidates are filtered for geometry and `bank` clips
//! are deduplicated before returning.

use serde::{Deserialize, Serialize};

use crate::corrector::MAX_TREE_DEPTH;
use crate::diagnostics::Diagnostics;
use crate::error::ClipError;
use crate::geometry::{BoundingBox, RawBox};
use crate::tree::{FieldNode, TaxBreakdownEntry};

/// Group whose own box is emitted as a single clip.
pub const BANK_GROUP_KEY: &str = "bank_details";
/// Field name of that clip.
pub const BANK_CLIP_NAME: &str = "bank";

const RATE_TOLERANCE: f64 = 1e-9;

/// Tax rate → field-name suffix.
const TAX_BUCKETS: &[(f64, &str)] = &[
    (0.10, "_for_10_percent"),
    (0.08, "_for_8_percent"),
    (0.0, "_for_0_percent"),
];

/// Breakdown sub-field keys (first present wins) → clip name prefix.
const TAX_SUB_FIELDS: &[(&[&str], &str)] = &[
    (&["amount_include_tax", "taxable_amount"], "taxable_amount"),
    (&["amount_consumption_tax"], "tax_amount"),
    (&["amount_exclude_tax"], "amount_without_tax"),
];

/// One flat output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub field_name: String,
    pub value: String,
    pub x_coordinate: f64,
    pub y_coordinate: f64,
    pub width: f64,
    pub height: f64,
    pub page: i64,
    pub reliability_score: Option<f64>,
}

impl Clip {
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.x_coordinate, self.y_coordinate, self.width, self.height)
    }
}

// ── Naming rules ──

/// What a matching rule does to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingAction {
    /// Emit nothing for this node or anything below it.
    Suppress,
    /// Emit under this fixed name.
    Rename(&'static str),
}

/// A predicate over a node's key lineage (root first) and its action.
#[derive(Debug, Clone, Copy)]
pub struct NamingRule {
    pub matches: fn(&[&str]) -> bool,
    pub action: NamingAction,
}

/// Evaluated top to bottom; the first match wins.
pub const NAMING_RULES: &[NamingRule] = &[
    NamingRule {
        matches: inside_bank_group,
        action: NamingAction::Suppress,
    },
    NamingRule {
        matches: is_bank_group,
        action: NamingAction::Rename(BANK_CLIP_NAME),
    },
    NamingRule {
        matches: is_withholding_amount,
        action: NamingAction::Rename("withholding_tax_amount"),
    },
    NamingRule {
        matches: is_tax_free_amount,
        action: NamingAction::Rename("taxable_amount_for_0_percent"),
    },
];

fn inside_bank_group(lineage: &[&str]) -> bool {
    lineage
        .split_last()
        .is_some_and(|(_, ancestors)| ancestors.contains(&BANK_GROUP_KEY))
}

fn is_bank_group(lineage: &[&str]) -> bool {
    lineage.last() == Some(&BANK_GROUP_KEY)
}

fn is_withholding_amount(lineage: &[&str]) -> bool {
    lineage.ends_with(&["amount_info", "amount_withholding"])
}

fn is_tax_free_amount(lineage: &[&str]) -> bool {
    lineage.ends_with(&["amount_info", "tax_free_amount"])
}

/// First rule in [`NAMING_RULES`] matching `lineage`.
pub fn naming_action(lineage: &[&str]) -> Option<NamingAction> {
    NAMING_RULES
        .iter()
        .find(|rule| (rule.matches)(lineage))
        .map(|rule| rule.action)
}

/// Field-name suffix for `rate`, if it is one of the fixed rates.
pub fn tax_bucket(rate: f64) -> Option<&'static str> {
    TAX_BUCKETS
        .iter()
        .find(|(bucket, _)| (rate - bucket).abs() < RATE_TOLERANCE)
        .map(|(_, suffix)| *suffix)
}

// ── Projection ──

/// Flatten `tree` into clips. Never fails: malformed nodes are dropped and
/// an internal fault returns whatever was collected before it.
pub fn project(tree: &FieldNode, diagnostics: &dyn Diagnostics) -> Vec<Clip> {
    let mut projector = Projector {
        diagnostics,
        candidates: Vec::new(),
    };
    let mut path = Vec::new();
    if let Err(e) = projector.walk(tree, &mut path, 0, 0) {
        diagnostics.error(&format!("clip projection stopped early: {e}"));
    }
    let clips = finalize(projector.candidates, diagnostics);
    diagnostics.debug(&format!("projected {} clips", clips.len()));
    clips
}

struct Candidate {
    field_name: String,
    value: String,
    bbox: RawBox,
    page: i64,
    confidence: Option<f64>,
}

struct Projector<'a> {
    diagnostics: &'a dyn Diagnostics,
    candidates: Vec<Candidate>,
}

impl Projector<'_> {
    fn walk(
        &mut self,
        node: &FieldNode,
        path: &mut Vec<String>,
        page: i64,
        depth: usize,
    ) -> Result<(), ClipError> {
        if depth > MAX_TREE_DEPTH {
            return Err(ClipError::TooDeep {
                depth: MAX_TREE_DEPTH,
            });
        }

        let lineage: Vec<&str> = path.iter().map(String::as_str).collect();
        let action = naming_action(&lineage);
        if action == Some(NamingAction::Suppress) {
            return Ok(());
        }
        let rename = match action {
            Some(NamingAction::Rename(name)) => Some(name),
            _ => None,
        };

        let page = node.attrs().and_then(|a| a.page).unwrap_or(page);

        match node {
            FieldNode::Leaf(leaf) => {
                if let Some(bbox) = leaf.attrs.bbox {
                    let value = if is_bank_group(&lineage) {
                        String::new()
                    } else {
                        leaf.value.as_text().unwrap_or_default()
                    };
                    self.push(
                        rename,
                        path,
                        leaf.attrs.name.as_deref(),
                        value,
                        bbox,
                        page,
                        leaf.attrs.confidence,
                    );
                }
                self.walk_children(&leaf.children, path, page, depth)
            }
            FieldNode::Group(group) => {
                if is_bank_group(&lineage) {
                    if let Some(bbox) = group.attrs.bbox {
                        self.push(
                            rename,
                            path,
                            None,
                            String::new(),
                            bbox,
                            page,
                            group.attrs.confidence,
                        );
                    }
                }
                self.walk_children(&group.children, path, page, depth)
            }
            FieldNode::TaxBreakdown(entries) => {
                for entry in entries {
                    self.tax_entry(entry, page);
                }
                Ok(())
            }
            FieldNode::List(items) => {
                for item in items {
                    self.walk(item, path, page, depth + 1)?;
                }
                Ok(())
            }
            FieldNode::Raw(_) => Ok(()),
        }
    }

    fn walk_children(
        &mut self,
        children: &[(String, FieldNode)],
        path: &mut Vec<String>,
        page: i64,
        depth: usize,
    ) -> Result<(), ClipError> {
        for (key, child) in children {
            path.push(key.clone());
            let result = self.walk(child, path, page, depth + 1);
            path.pop();
            result?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        rename: Option<&'static str>,
        path: &[String],
        name: Option<&str>,
        value: String,
        bbox: RawBox,
        page: i64,
        confidence: Option<f64>,
    ) {
        let field_name = match (rename, name) {
            (Some(fixed), _) => fixed.to_string(),
            (None, name) => match full_name(path, name) {
                Some(n) => n,
                None => {
                    self.diagnostics
                        .warn("field has neither a key path nor a name; skipping clip");
                    return;
                }
            },
        };
        self.candidates.push(Candidate {
            field_name,
            value,
            bbox,
            page,
            confidence,
        });
    }

    fn tax_entry(&mut self, entry: &TaxBreakdownEntry, page: i64) {
        let Some(attrs) = entry.node.attrs() else {
            self.diagnostics.debug("skipping non-object tax breakdown entry");
            return;
        };
        let Some(rate) = entry.rate() else {
            self.diagnostics.debug("skipping tax breakdown entry without a numeric rate");
            return;
        };
        let Some(suffix) = tax_bucket(rate) else {
            self.diagnostics
                .debug(&format!("skipping tax breakdown entry with rate {rate}"));
            return;
        };
        let page = attrs.page.unwrap_or(page);

        for (keys, prefix) in TAX_SUB_FIELDS {
            // Fall back only when the earlier key is absent, not malformed.
            let Some(key) = keys.iter().find(|k| entry.node.child(k).is_some()) else {
                continue;
            };
            let Some(leaf) = entry.amount(key) else {
                continue;
            };
            let Some(bbox) = leaf.attrs.bbox else {
                continue;
            };
            self.candidates.push(Candidate {
                field_name: format!("{prefix}{suffix}"),
                value: leaf.value.as_text().unwrap_or_default(),
                bbox,
                page: leaf.attrs.page.unwrap_or(page),
                confidence: leaf.attrs.confidence,
            });
        }
    }
}

/// `path.name` when the node has a name, else `path`; `None` when both are
/// missing.
fn full_name(path: &[String], name: Option<&str>) -> Option<String> {
    let joined = path.join(".");
    match (joined.is_empty(), name.filter(|n| !n.is_empty())) {
        (false, Some(name)) => Some(format!("{joined}.{name}")),
        (true, Some(name)) => Some(name.to_string()),
        (false, None) => Some(joined),
        (true, None) => None,
    }
}

/// Geometry filters and `bank` deduplication.
fn finalize(candidates: Vec<Candidate>, diagnostics: &dyn Diagnostics) -> Vec<Clip> {
    let mut clips: Vec<Clip> = Vec::with_capacity(candidates.len());

    for c in candidates {
        let bbox = match c.bbox.resolve() {
            Ok(bbox) => bbox,
            Err(ClipError::IncompleteBox) => {
                diagnostics.debug(&format!("dropping {}: incomplete bounding box", c.field_name));
                continue;
            }
            Err(e) => {
                diagnostics.warn(&format!("dropping {}: {e}", c.field_name));
                continue;
            }
        };
        if bbox.is_zero() {
            continue;
        }
        if bbox.x < 0.0 || bbox.y < 0.0 {
            diagnostics.warn(&format!(
                "negative coordinates for {}: ({}, {}); keeping clip",
                c.field_name, bbox.x, bbox.y
            ));
        }

        if c.field_name == BANK_CLIP_NAME
            && clips
                .iter()
                .any(|k| k.field_name == BANK_CLIP_NAME && k.bbox() == bbox && k.page == c.page)
        {
            diagnostics.debug("dropping duplicate bank clip");
            continue;
        }

        clips.push(Clip {
            field_name: c.field_name,
            value: c.value,
            x_coordinate: bbox.x,
            y_coordinate: bbox.y,
            width: bbox.width,
            height: bbox.height,
            page: c.page,
            reliability_score: c.confidence,
        });
    }
    clips
}
