//! Freehand stroke element.

use super::{ElementId, ElementStyle, ElementTrait, StrokeOptions, freehand_path, point_to_polyline_dist};
use kurbo::{BezPath, Point, Rect, Shape};
use serde::{Deserialize, Serialize};

/// A pointer-sampled stroke, rendered as a filled variable-width outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Freehand {
    #[serde(default)]
    pub(crate) id: ElementId,
    /// Sampled points in input order.
    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(flatten)]
    pub style: ElementStyle,
    #[serde(skip)]
    path: BezPath,
}

impl Freehand {
    pub fn from_points(id: ElementId, points: Vec<Point>, style: ElementStyle) -> Self {
        let mut stroke = Self {
            id,
            points,
            style,
            path: BezPath::new(),
        };
        stroke.refresh();
        stroke
    }

    /// Append points and rebuild the outline from the whole sequence.
    pub fn extend(&mut self, points: impl Iterator<Item = Point>) {
        self.points.extend(points);
        self.refresh();
    }

    /// Cached stroke outline.
    pub fn path(&self) -> &BezPath {
        &self.path
    }

    fn options(&self) -> StrokeOptions {
        StrokeOptions::with_size(self.style.stroke_width.max(1.0))
    }
}

impl ElementTrait for Freehand {
    fn id(&self) -> &ElementId {
        &self.id
    }

    fn bounds(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect::ZERO;
        };
        let half = self.style.stroke_width / 2.0;
        self.points
            .iter()
            .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
            .inflate(half, half)
    }

    fn is_point_near(&self, point: Point, tolerance: f64) -> bool {
        if self.path.contains(point) {
            return true;
        }
        point_to_polyline_dist(point, &self.points) <= tolerance + self.style.stroke_width / 2.0
    }

    fn outline(&self) -> BezPath {
        let mut path = BezPath::new();
        let mut iter = self.points.iter();
        if let Some(first) = iter.next() {
            path.move_to(*first);
            for p in iter {
                path.line_to(*p);
            }
        }
        path
    }

    fn style(&self) -> &ElementStyle {
        &self.style
    }

    fn refresh(&mut self) {
        self.path = freehand_path(&self.points, &self.options());
    }
}
