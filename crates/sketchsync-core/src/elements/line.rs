//! Line element.

use super::{ElementId, ElementStyle, ElementTrait, normalized_rect, point_to_segment_dist, sketch_path};
use kurbo::{BezPath, Point, Rect};
use serde::{Deserialize, Serialize};

/// A straight line between two corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    #[serde(default)]
    pub(crate) id: ElementId,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(flatten)]
    pub style: ElementStyle,
    #[serde(skip)]
    sketch: BezPath,
}

impl Line {
    pub fn new(id: ElementId, x1: f64, y1: f64, x2: f64, y2: f64, style: ElementStyle) -> Self {
        let mut line = Self {
            id,
            x1,
            y1,
            x2,
            y2,
            style,
            sketch: BezPath::new(),
        };
        line.refresh();
        line
    }

    pub fn corners(&self) -> (Point, Point) {
        (Point::new(self.x1, self.y1), Point::new(self.x2, self.y2))
    }

    pub fn set_end(&mut self, end: Point) {
        self.x2 = end.x;
        self.y2 = end.y;
        self.refresh();
    }

    pub fn length(&self) -> f64 {
        let (start, end) = self.corners();
        start.distance(end)
    }

    /// Pre-rendered sketch geometry.
    pub fn sketch(&self) -> &BezPath {
        &self.sketch
    }
}

impl ElementTrait for Line {
    fn id(&self) -> &ElementId {
        &self.id
    }

    fn bounds(&self) -> Rect {
        normalized_rect(self.x1, self.y1, self.x2, self.y2)
    }

    fn is_point_near(&self, point: Point, tolerance: f64) -> bool {
        let (start, end) = self.corners();
        point_to_segment_dist(point, start, end) <= tolerance + self.style.stroke_width / 2.0
    }

    fn outline(&self) -> BezPath {
        let (start, end) = self.corners();
        let mut path = BezPath::new();
        path.move_to(start);
        path.line_to(end);
        path
    }

    fn style(&self) -> &ElementStyle {
        &self.style
    }

    fn refresh(&mut self) {
        self.sketch = sketch_path(&self.outline(), &self.style);
    }
}
