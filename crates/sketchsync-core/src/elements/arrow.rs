//! Arrow element.

use super::{ElementId, ElementStyle, ElementTrait, normalized_rect, point_to_segment_dist, sketch_path};
use kurbo::{BezPath, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Length of each arrowhead barb.
pub const HEAD_LENGTH: f64 = 20.0;

/// Angle between the shaft and each barb, in radians.
const HEAD_ANGLE: f64 = std::f64::consts::FRAC_PI_6;

/// A line from `(x1,y1)` with an arrowhead at `(x2,y2)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
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

impl Arrow {
    pub fn new(id: ElementId, x1: f64, y1: f64, x2: f64, y2: f64, style: ElementStyle) -> Self {
        let mut arrow = Self {
            id,
            x1,
            y1,
            x2,
            y2,
            style,
            sketch: BezPath::new(),
        };
        arrow.refresh();
        arrow
    }

    pub fn corners(&self) -> (Point, Point) {
        (Point::new(self.x1, self.y1), Point::new(self.x2, self.y2))
    }

    pub fn set_end(&mut self, end: Point) {
        self.x2 = end.x;
        self.y2 = end.y;
        self.refresh();
    }

    /// Unit vector from start to end.
    pub fn direction(&self) -> Vec2 {
        let (start, end) = self.corners();
        let delta = end - start;
        let len = delta.hypot();
        if len < f64::EPSILON {
            Vec2::new(1.0, 0.0)
        } else {
            delta / len
        }
    }

    /// End points of the two arrowhead barbs.
    pub fn head_points(&self) -> (Point, Point) {
        let (_, end) = self.corners();
        let back = -self.direction();
        let rotate = |v: Vec2, angle: f64| {
            let (sin, cos) = angle.sin_cos();
            Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
        };
        (
            end + rotate(back, HEAD_ANGLE) * HEAD_LENGTH,
            end + rotate(back, -HEAD_ANGLE) * HEAD_LENGTH,
        )
    }

    pub fn sketch(&self) -> &BezPath {
        &self.sketch
    }
}

impl ElementTrait for Arrow {
    fn id(&self) -> &ElementId {
        &self.id
    }

    fn bounds(&self) -> Rect {
        let (left, right) = self.head_points();
        normalized_rect(self.x1, self.y1, self.x2, self.y2)
            .union_pt(left)
            .union_pt(right)
    }

    fn is_point_near(&self, point: Point, tolerance: f64) -> bool {
        let (start, end) = self.corners();
        let (left, right) = self.head_points();
        let reach = tolerance + self.style.stroke_width / 2.0;
        point_to_segment_dist(point, start, end) <= reach
            || point_to_segment_dist(point, end, left) <= reach
            || point_to_segment_dist(point, end, right) <= reach
    }

    fn outline(&self) -> BezPath {
        let (start, end) = self.corners();
        let (left, right) = self.head_points();
        let mut path = BezPath::new();
        path.move_to(start);
        path.line_to(end);
        path.move_to(left);
        path.line_to(end);
        path.line_to(right);
        path
    }

    fn style(&self) -> &ElementStyle {
        &self.style
    }

    fn refresh(&mut self) {
        self.sketch = sketch_path(&self.outline(), &self.style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrow(x2: f64, y2: f64) -> Arrow {
        Arrow::new("a".into(), 0.0, 0.0, x2, y2, ElementStyle::default())
    }

    #[test]
    fn test_direction() {
        let dir = arrow(100.0, 0.0).direction();
        assert!((dir.x - 1.0).abs() < 1e-9);
        assert!(dir.y.abs() < 1e-9);
    }

    #[test]
    fn test_head_points_behind_tip() {
        let (left, right) = arrow(100.0, 0.0).head_points();
        assert!(left.x < 100.0 && right.x < 100.0);
        assert!((left.y + right.y).abs() < 1e-9);
    }

    #[test]
    fn test_hit_test_includes_head() {
        let a = arrow(100.0, 0.0);
        let (left, _) = a.head_points();
        assert!(a.is_point_near(left, 1.0));
        assert!(a.is_point_near(Point::new(50.0, 0.0), 1.0));
        assert!(!a.is_point_near(Point::new(50.0, 30.0), 1.0));
    }

    #[test]
    fn test_bounds_include_head() {
        let bounds = arrow(100.0, 0.0).bounds();
        assert!(bounds.y0 < 0.0 && bounds.y1 > 0.0);
    }
}
