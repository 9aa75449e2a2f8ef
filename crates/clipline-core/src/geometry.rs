//! Pixel-space geometry: OCR quads, axis-aligned boxes, and the loosely
//! typed boxes reported by the extraction model.
//!
//! Origin is top-left, y grows downward.

use serde::{Deserialize, Serialize};

use crate::error::ClipError;

/// One corner of an OCR bounding polygon.
///
/// The OCR engine omits zero-valued coordinates from its JSON, so both
/// fields default to 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Four corners, clockwise from top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub corners: [Vertex; 4],
}

impl Quad {
    /// Build a quad from a vertex list; anything but exactly four is rejected.
    pub fn from_vertices(vertices: &[Vertex]) -> Option<Self> {
        let corners: [Vertex; 4] = vertices.try_into().ok()?;
        Some(Self { corners })
    }

    /// Axis-aligned rectangle `(x, y, w, h)` as a quad.
    pub fn from_rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            corners: [
                Vertex::new(x, y),
                Vertex::new(x + width, y),
                Vertex::new(x + width, y + height),
                Vertex::new(x, y + height),
            ],
        }
    }

    /// First corner; reading order sorts on this point.
    pub fn origin(&self) -> Vertex {
        self.corners[0]
    }

    /// Min/max envelope of the four corners.
    pub fn envelope(&self) -> BoundingBox {
        BoundingBox::enclosing(self.corners.iter().copied())
            .unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0))
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Standard AABB test: the boxes overlap unless they are disjoint on
    /// either axis. Touching edges count as overlapping.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        let disjoint_x = self.right() < other.x || other.right() < self.x;
        let disjoint_y = self.bottom() < other.y || other.bottom() < self.y;
        !(disjoint_x || disjoint_y)
    }

    /// Smallest box containing every point, or `None` for an empty iterator.
    pub fn enclosing(points: impl IntoIterator<Item = Vertex>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// All four components are exactly zero ("no signal" from the model).
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.width == 0.0 && self.height == 0.0
    }
}

/// Convert an OCR vertex list into its envelope box.
///
/// Returns `None` unless exactly four vertices are given.
pub fn vertices_to_box(vertices: &[Vertex]) -> Option<BoundingBox> {
    Quad::from_vertices(vertices).map(|q| q.envelope())
}

/// A box as reported by the extraction model: any component may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawBox {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl RawBox {
    /// Read the four components from a JSON object. Non-numeric components
    /// count as missing.
    pub fn from_json(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| v.as_f64());
        Self {
            x: get("x"),
            y: get("y"),
            width: get("width"),
            height: get("height"),
        }
    }

    /// All four components present.
    pub fn complete(&self) -> Option<BoundingBox> {
        Some(BoundingBox::new(self.x?, self.y?, self.width?, self.height?))
    }

    /// Complete, finite, and with non-negative extent.
    pub fn resolve(&self) -> Result<BoundingBox, ClipError> {
        let bbox = self.complete().ok_or(ClipError::IncompleteBox)?;
        if !bbox.is_finite() {
            return Err(ClipError::NonFiniteGeometry);
        }
        if bbox.width < 0.0 || bbox.height < 0.0 {
            return Err(ClipError::NegativeExtent {
                width: bbox.width,
                height: bbox.height,
            });
        }
        Ok(bbox)
    }
}

impl From<BoundingBox> for RawBox {
    fn from(b: BoundingBox) -> Self {
        Self {
            x: Some(b.x),
            y: Some(b.y),
            width: Some(b.width),
            height: Some(b.height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertices(points: &[(f64, f64)]) -> Vec<Vertex> {
        points.iter().map(|&(x, y)| Vertex::new(x, y)).collect()
    }

    #[test]
    fn vertices_to_box_envelope() {
        let v = vertices(&[(10.0, 20.0), (110.0, 20.0), (110.0, 50.0), (10.0, 50.0)]);
        assert_eq!(
            vertices_to_box(&v),
            Some(BoundingBox::new(10.0, 20.0, 100.0, 30.0))
        );
    }

    #[test]
    fn vertices_to_box_rejects_wrong_count() {
        assert_eq!(vertices_to_box(&[]), None);
        let three = vertices(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        assert_eq!(vertices_to_box(&three), None);
    }

    #[test]
    fn envelope_of_skewed_quad() {
        // Slightly rotated word: corners are not axis aligned.
        let q = Quad::from_vertices(&vertices(&[
            (12.0, 10.0),
            (60.0, 12.0),
            (58.0, 30.0),
            (10.0, 28.0),
        ]))
        .unwrap();
        assert_eq!(q.envelope(), BoundingBox::new(10.0, 10.0, 50.0, 20.0));
    }

    #[test]
    fn overlapping_boxes() {
        let a = BoundingBox::new(10.0, 10.0, 50.0, 30.0);
        let b = BoundingBox::new(30.0, 20.0, 40.0, 25.0);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn disjoint_boxes() {
        let a = BoundingBox::new(10.0, 10.0, 30.0, 20.0);
        let b = BoundingBox::new(50.0, 40.0, 30.0, 20.0);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn disjoint_on_one_axis_only() {
        // Same row, far apart horizontally.
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(100.0, 0.0, 10.0, 10.0);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn touching_edges_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(10.0, 0.0, 10.0, 10.0);
        assert!(a.overlaps(&b));
    }

    #[test]
    fn raw_box_resolution() {
        let full = RawBox::from(BoundingBox::new(1.0, 2.0, 3.0, 4.0));
        assert!(full.resolve().is_ok());

        let partial = RawBox {
            x: Some(1.0),
            y: Some(2.0),
            ..Default::default()
        };
        assert!(matches!(partial.resolve(), Err(ClipError::IncompleteBox)));

        let negative = RawBox::from(BoundingBox::new(1.0, 2.0, -3.0, 4.0));
        assert!(matches!(
            negative.resolve(),
            Err(ClipError::NegativeExtent { .. })
        ));
    }

    #[test]
    fn raw_box_from_json_ignores_non_numbers() {
        let json = serde_json::json!({"x": 1, "y": "2", "width": 3.5, "height": 4});
        let raw = RawBox::from_json(json.as_object().unwrap());
        assert_eq!(raw.x, Some(1.0));
        assert_eq!(raw.y, None);
        assert_eq!(raw.width, Some(3.5));
        assert!(raw.complete().is_none());
    }

    #[test]
    fn zero_box() {
        assert!(BoundingBox::new(0.0, 0.0, 0.0, 0.0).is_zero());
        assert!(!BoundingBox::new(0.0, 0.0, 1.0, 0.0).is_zero());
    }
}
