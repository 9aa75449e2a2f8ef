//! The semantic field tree produced by the extraction model.
//!
//! Parsed from arbitrary JSON into a tagged variant. Attribute keys (`bbox`,
//! `confidence`, `name`, `page`) are lifted out of the child list only when
//! they carry the expected JSON type; anything else stays an ordinary child.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::geometry::{BoundingBox, RawBox};

/// Key under which the extraction model reports per-rate tax amounts.
pub const TAX_BREAKDOWN_KEY: &str = "tax_breakdown";

/// Scalar payload of a leaf's `value`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scalar {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
}

impl Scalar {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// String form used for matching and for clip values. `None` for null.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }

    /// Numeric reading: JSON numbers directly, strings if they parse.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

/// Positional metadata a leaf or group may carry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeAttrs {
    pub bbox: Option<RawBox>,
    pub confidence: Option<f64>,
    pub name: Option<String>,
    pub page: Option<i64>,
}

impl NodeAttrs {
    /// Try to take `key` as an attribute. Returns `false` when the key is not
    /// an attribute or the value has the wrong type.
    fn absorb(&mut self, key: &str, value: &Value) -> bool {
        match (key, value) {
            ("bbox", Value::Object(map)) => {
                self.bbox = Some(RawBox::from_json(map));
                true
            }
            ("bbox", Value::Null) => true,
            ("confidence", Value::Number(n)) => {
                self.confidence = n.as_f64();
                true
            }
            ("name", Value::String(s)) => {
                self.name = Some(s.clone());
                true
            }
            ("page", Value::Number(n)) if n.as_i64().is_some() => {
                self.page = n.as_i64();
                true
            }
            _ => false,
        }
    }

    fn write_into(&self, map: &mut Map<String, Value>) {
        if let Some(bbox) = &self.bbox {
            let raw = serde_json::to_value(bbox).unwrap_or(Value::Null);
            map.insert("bbox".into(), raw);
        }
        if let Some(c) = self.confidence {
            map.insert("confidence".into(), Value::from(c));
        }
        if let Some(name) = &self.name {
            map.insert("name".into(), Value::String(name.clone()));
        }
        if let Some(page) = self.page {
            map.insert("page".into(), Value::from(page));
        }
    }
}

/// A field value with its approximate position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Leaf {
    pub value: Scalar,
    pub attrs: NodeAttrs,
    /// Non-attribute keys next to `value`, in input order.
    pub children: Vec<(String, FieldNode)>,
}

impl Leaf {
    /// The model's box, when all four components are numbers.
    pub fn complete_bbox(&self) -> Option<BoundingBox> {
        self.attrs.bbox.as_ref().and_then(RawBox::complete)
    }
}

/// A keyed container. May carry its own box (e.g. the bank details group).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Group {
    pub attrs: NodeAttrs,
    pub children: Vec<(String, FieldNode)>,
}

/// One row of the tax breakdown array.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxBreakdownEntry {
    pub node: FieldNode,
}

impl TaxBreakdownEntry {
    /// The entry's tax rate, read from `tax_rate.value` as a number or a
    /// numeric string.
    pub fn rate(&self) -> Option<f64> {
        match self.node.child("tax_rate")? {
            FieldNode::Leaf(leaf) => leaf.value.as_f64(),
            _ => None,
        }
    }

    /// Sub-field of the entry, only if it is a leaf.
    pub fn amount(&self, key: &str) -> Option<&Leaf> {
        match self.node.child(key)? {
            FieldNode::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }
}

/// A node of the field tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum FieldNode {
    Leaf(Leaf),
    Group(Group),
    TaxBreakdown(Vec<TaxBreakdownEntry>),
    List(Vec<FieldNode>),
    Raw(Value),
}

impl FieldNode {
    /// Parse `value`, given the key it sits under in its parent.
    pub fn from_keyed(key: Option<&str>, value: &Value) -> Self {
        match value {
            Value::Object(map) => Self::from_object(map),
            Value::Array(items) if key == Some(TAX_BREAKDOWN_KEY) => Self::TaxBreakdown(
                items
                    .iter()
                    .map(|item| TaxBreakdownEntry {
                        node: Self::from_keyed(None, item),
                    })
                    .collect(),
            ),
            Value::Array(items) => Self::List(items.iter().map(|v| Self::from_keyed(key, v)).collect()),
            other => Self::Raw(other.clone()),
        }
    }

    fn from_object(map: &Map<String, Value>) -> Self {
        let value = map.get("value").and_then(Scalar::from_json);
        let mut attrs = NodeAttrs::default();
        let mut children = Vec::new();

        for (key, child) in map {
            if key == "value" && value.is_some() {
                continue;
            }
            if attrs.absorb(key, child) {
                continue;
            }
            children.push((key.clone(), Self::from_keyed(Some(key), child)));
        }

        match value {
            Some(value) => Self::Leaf(Leaf {
                value,
                attrs,
                children,
            }),
            None => Self::Group(Group { attrs, children }),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Leaf(leaf) => {
                let mut map = Map::new();
                map.insert("value".into(), leaf.value.to_json());
                leaf.attrs.write_into(&mut map);
                for (key, child) in &leaf.children {
                    map.insert(key.clone(), child.to_json());
                }
                Value::Object(map)
            }
            Self::Group(group) => {
                let mut map = Map::new();
                group.attrs.write_into(&mut map);
                for (key, child) in &group.children {
                    map.insert(key.clone(), child.to_json());
                }
                Value::Object(map)
            }
            Self::TaxBreakdown(entries) => {
                Value::Array(entries.iter().map(|e| e.node.to_json()).collect())
            }
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Raw(value) => value.clone(),
        }
    }

    pub fn attrs(&self) -> Option<&NodeAttrs> {
        match self {
            Self::Leaf(leaf) => Some(&leaf.attrs),
            Self::Group(group) => Some(&group.attrs),
            _ => None,
        }
    }

    /// Keyed children of a leaf or group, in input order.
    pub fn children(&self) -> &[(String, FieldNode)] {
        match self {
            Self::Leaf(leaf) => &leaf.children,
            Self::Group(group) => &group.children,
            _ => &[],
        }
    }

    pub fn child(&self, key: &str) -> Option<&FieldNode> {
        self.children()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, node)| node)
    }
}

impl From<Value> for FieldNode {
    fn from(value: Value) -> Self {
        Self::from_keyed(None, &value)
    }
}

impl From<FieldNode> for Value {
    fn from(node: FieldNode) -> Self {
        node.to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaf_with_attributes() {
        let node = FieldNode::from(json!({
            "value": "テスト会社",
            "bbox": {"x": 10, "y": 20, "width": 100, "height": 50},
            "confidence": 0.9,
            "name": "company",
            "page": 2
        }));
        let FieldNode::Leaf(leaf) = node else {
            panic!("expected leaf, got {node:?}");
        };
        assert_eq!(leaf.value, Scalar::Text("テスト会社".into()));
        assert_eq!(
            leaf.complete_bbox(),
            Some(BoundingBox::new(10.0, 20.0, 100.0, 50.0))
        );
        assert_eq!(leaf.attrs.confidence, Some(0.9));
        assert_eq!(leaf.attrs.name.as_deref(), Some("company"));
        assert_eq!(leaf.attrs.page, Some(2));
        assert!(leaf.children.is_empty());
    }

    #[test]
    fn null_value_is_still_a_leaf() {
        let node = FieldNode::from(json!({"value": null, "bbox": null}));
        let FieldNode::Leaf(leaf) = node else {
            panic!("expected leaf");
        };
        assert!(leaf.value.is_null());
        assert!(leaf.attrs.bbox.is_none());
    }

    #[test]
    fn object_value_makes_a_group() {
        let node = FieldNode::from(json!({"value": {"nested": {"value": 1}}}));
        assert!(matches!(node, FieldNode::Group(_)));
        assert!(matches!(node.child("value"), Some(FieldNode::Group(_))));
    }

    #[test]
    fn wrongly_typed_attributes_stay_children() {
        let node = FieldNode::from(json!({
            "value": "x",
            "name": {"value": "nested name"},
            "page": "2",
            "confidence": "high"
        }));
        let attrs = node.attrs().unwrap();
        assert!(attrs.name.is_none());
        assert!(attrs.page.is_none());
        assert!(attrs.confidence.is_none());
        assert!(matches!(node.child("name"), Some(FieldNode::Leaf(_))));
        assert!(matches!(node.child("page"), Some(FieldNode::Raw(Value::String(_)))));
    }

    #[test]
    fn tax_breakdown_is_its_own_variant() {
        let node = FieldNode::from(json!({
            "tax_breakdown": [
                {"tax_rate": {"value": 0.1}, "amount_include_tax": {"value": 11000}},
                {"tax_rate": {"value": "0.08"}}
            ],
            "items": [{"value": "a"}]
        }));
        let Some(FieldNode::TaxBreakdown(entries)) = node.child("tax_breakdown") else {
            panic!("expected tax breakdown");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].rate(), Some(0.1));
        assert_eq!(entries[1].rate(), Some(0.08));
        assert!(entries[0].amount("amount_include_tax").is_some());
        assert!(entries[1].amount("amount_include_tax").is_none());
        assert!(matches!(node.child("items"), Some(FieldNode::List(_))));
    }

    #[test]
    fn children_keep_input_order() {
        let node = FieldNode::from(json!({"c": {"value": 1}, "a": {"value": 2}, "b": {"value": 3}}));
        let keys: Vec<&str> = node.children().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
    }

    #[test]
    fn serialisation_reproduces_input() {
        let input = json!({
            "page": 1,
            "invoice_number": {"value": "INV-001", "bbox": {"x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0}, "confidence": 0.5},
            "tax_breakdown": [{"tax_rate": {"value": 0.1}}],
            "notes": ["free text", 3]
        });
        let node: FieldNode = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(serde_json::to_value(&node).unwrap(), input);
    }

    #[test]
    fn null_bbox_is_omitted_on_output() {
        let node = FieldNode::from(json!({"value": "x", "bbox": null}));
        assert_eq!(node.to_json(), json!({"value": "x"}));
    }

    #[test]
    fn scalar_text_forms() {
        assert_eq!(Scalar::Number(Number::from(10000)).as_text().as_deref(), Some("10000"));
        assert_eq!(Scalar::Bool(true).as_text().as_deref(), Some("true"));
        assert_eq!(Scalar::Null.as_text(), None);
        assert_eq!(Scalar::Text(" 0.1 ".into()).as_f64(), Some(0.1));
    }
}
