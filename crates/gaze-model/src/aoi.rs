//! Areas of Interest and their geometry.
//!
//! AOIs are authored in normalized stimulus coordinates: `(0.0, 0.0)` is the
//! top-left and `(1.0, 1.0)` the bottom-right of the stimulus. All
//! containment and area computations happen after denormalizing into the
//! stimulus pixel space, so ellipses stay ellipses on non-square stimuli.

use serde::{Deserialize, Serialize};

use crate::calibration::PixelSpace;

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Shape kind of an AOI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AoiShapeType {
    /// Two opposite corners.
    Rectangle,
    /// Two opposite corners of the bounding box.
    Ellipse,
    /// Three or more vertices.
    Polygon,
}

/// An experimenter-defined region over a stimulus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AoiElement {
    pub id: String,
    pub name: String,
    pub shape_type: AoiShapeType,
    /// Points in normalized stimulus coordinates.
    pub normalized_points: Vec<Point2D>,
    /// Display color, e.g. `"#ff8800"`.
    #[serde(default)]
    pub color: String,
    #[serde(default = "default_line_width")]
    pub line_width: f32,
}

fn default_line_width() -> f32 {
    2.0
}

impl AoiElement {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        shape_type: AoiShapeType,
        normalized_points: Vec<Point2D>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            shape_type,
            normalized_points,
            color: String::new(),
            line_width: default_line_width(),
        }
    }

    /// Denormalize into pixel geometry.
    ///
    /// Returns `None` when the point list is too short for the shape type or
    /// contains non-finite values.
    pub fn geometry(&self, space: PixelSpace) -> Option<AoiGeometry> {
        let points: Vec<Point2D> = self
            .normalized_points
            .iter()
            .map(|p| Point2D::new(p.x * space.width, p.y * space.height))
            .collect();

        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return None;
        }

        match self.shape_type {
            AoiShapeType::Rectangle | AoiShapeType::Ellipse => {
                let (a, b) = match points.as_slice() {
                    [a, b, ..] => (*a, *b),
                    _ => return None,
                };
                let min = Point2D::new(a.x.min(b.x), a.y.min(b.y));
                let max = Point2D::new(a.x.max(b.x), a.y.max(b.y));

                Some(if self.shape_type == AoiShapeType::Rectangle {
                    AoiGeometry::Rectangle { min, max }
                } else {
                    AoiGeometry::Ellipse {
                        center: Point2D::new((min.x + max.x) * 0.5, (min.y + max.y) * 0.5),
                        rx: (max.x - min.x) * 0.5,
                        ry: (max.y - min.y) * 0.5,
                    }
                })
            }
            AoiShapeType::Polygon => {
                if points.len() < 3 {
                    return None;
                }
                Some(AoiGeometry::Polygon { vertices: points })
            }
        }
    }
}

/// AOI shape in pixel space.
#[derive(Debug, Clone, PartialEq)]
pub enum AoiGeometry {
    Rectangle { min: Point2D, max: Point2D },
    Ellipse { center: Point2D, rx: f64, ry: f64 },
    Polygon { vertices: Vec<Point2D> },
}

impl AoiGeometry {
    /// Point-in-shape test. Edges of rectangles and ellipses count as inside;
    /// polygons use the even-odd rule.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if !x.is_finite() || !y.is_finite() {
            return false;
        }

        match self {
            AoiGeometry::Rectangle { min, max } => {
                x >= min.x && x <= max.x && y >= min.y && y <= max.y
            }
            AoiGeometry::Ellipse { center, rx, ry } => {
                if *rx <= 0.0 || *ry <= 0.0 {
                    return false;
                }
                let nx = (x - center.x) / rx;
                let ny = (y - center.y) / ry;
                nx * nx + ny * ny <= 1.0
            }
            AoiGeometry::Polygon { vertices } => {
                if vertices.len() < 3 {
                    return false;
                }
                let mut inside = false;
                let mut j = vertices.len() - 1;
                for i in 0..vertices.len() {
                    let (a, b) = (vertices[i], vertices[j]);
                    if (a.y > y) != (b.y > y) && x < (b.x - a.x) * (y - a.y) / (b.y - a.y) + a.x {
                        inside = !inside;
                    }
                    j = i;
                }
                inside
            }
        }
    }

    /// Area in square pixels.
    pub fn area(&self) -> f64 {
        match self {
            AoiGeometry::Rectangle { min, max } => (max.x - min.x) * (max.y - min.y),
            AoiGeometry::Ellipse { rx, ry, .. } => std::f64::consts::PI * rx * ry,
            AoiGeometry::Polygon { vertices } => {
                let n = vertices.len();
                let twice: f64 = (0..n)
                    .map(|i| {
                        let a = vertices[i];
                        let b = vertices[(i + 1) % n];
                        a.x * b.y - b.x * a.y
                    })
                    .sum();
                twice.abs() * 0.5
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> PixelSpace {
        PixelSpace::new(800.0, 600.0)
    }

    #[test]
    fn test_rectangle_from_swapped_corners() {
        let aoi = AoiElement::new(
            "r",
            "rect",
            AoiShapeType::Rectangle,
            vec![Point2D::new(0.5, 0.5), Point2D::new(0.25, 0.0)],
        );
        let geom = aoi.geometry(space()).unwrap();
        assert!((geom.area() - 200.0 * 300.0).abs() < 1e-9);
        assert!(geom.contains(300.0, 100.0));
        assert!(geom.contains(200.0, 0.0));
        assert!(!geom.contains(500.0, 100.0));
    }

    #[test]
    fn test_ellipse_containment_and_area() {
        let aoi = AoiElement::new(
            "e",
            "ellipse",
            AoiShapeType::Ellipse,
            vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)],
        );
        let geom = aoi.geometry(space()).unwrap();
        assert!((geom.area() - std::f64::consts::PI * 400.0 * 300.0).abs() < 1e-6);
        assert!(geom.contains(400.0, 300.0));
        assert!(geom.contains(799.0, 300.0));
        // Corner of the bounding box is outside the ellipse
        assert!(!geom.contains(10.0, 10.0));
    }

    #[test]
    fn test_polygon_even_odd() {
        // Right triangle covering the lower-left half
        let aoi = AoiElement::new(
            "p",
            "triangle",
            AoiShapeType::Polygon,
            vec![
                Point2D::new(0.0, 0.0),
                Point2D::new(0.0, 1.0),
                Point2D::new(1.0, 1.0),
            ],
        );
        let geom = aoi.geometry(space()).unwrap();
        assert!((geom.area() - 800.0 * 600.0 * 0.5).abs() < 1e-6);
        assert!(geom.contains(100.0, 500.0));
        assert!(!geom.contains(700.0, 100.0));
    }

    #[test]
    fn test_degenerate_shapes_have_no_geometry() {
        let poly = AoiElement::new(
            "p",
            "line",
            AoiShapeType::Polygon,
            vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)],
        );
        assert!(poly.geometry(space()).is_none());

        let rect = AoiElement::new(
            "r",
            "dot",
            AoiShapeType::Rectangle,
            vec![Point2D::new(0.1, 0.1)],
        );
        assert!(rect.geometry(space()).is_none());
    }

    #[test]
    fn test_short_polygon_contains_nothing() {
        let empty = AoiGeometry::Polygon { vertices: vec![] };
        assert!(!empty.contains(0.0, 0.0));
        assert_eq!(empty.area(), 0.0);

        let segment = AoiGeometry::Polygon {
            vertices: vec![Point2D::new(0.0, 0.0), Point2D::new(10.0, 10.0)],
        };
        assert!(!segment.contains(5.0, 5.0));
    }

    #[test]
    fn test_aoi_json_defaults_style() {
        let raw = r#"{
            "id": "a1",
            "name": "Logo",
            "shape_type": "rectangle",
            "normalized_points": [{"x": 0.1, "y": 0.1}, {"x": 0.2, "y": 0.3}]
        }"#;
        let aoi: AoiElement = serde_json::from_str(raw).unwrap();
        assert_eq!(aoi.shape_type, AoiShapeType::Rectangle);
        assert_eq!(aoi.line_width, 2.0);
        assert!(aoi.color.is_empty());
    }
}
