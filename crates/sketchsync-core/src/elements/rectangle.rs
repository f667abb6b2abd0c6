//! Rectangle element.

use super::{ElementId, ElementStyle, ElementTrait, normalized_rect, sketch_path};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle spanned by two corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
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

impl Rectangle {
    pub fn new(id: ElementId, x1: f64, y1: f64, x2: f64, y2: f64, style: ElementStyle) -> Self {
        let mut rect = Self {
            id,
            x1,
            y1,
            x2,
            y2,
            style,
            sketch: BezPath::new(),
        };
        rect.refresh();
        rect
    }

    pub fn corners(&self) -> (Point, Point) {
        (Point::new(self.x1, self.y1), Point::new(self.x2, self.y2))
    }

    pub fn set_end(&mut self, end: Point) {
        self.x2 = end.x;
        self.y2 = end.y;
        self.refresh();
    }

    /// Get the rectangle as a kurbo Rect.
    pub fn as_rect(&self) -> Rect {
        normalized_rect(self.x1, self.y1, self.x2, self.y2)
    }

    pub fn sketch(&self) -> &BezPath {
        &self.sketch
    }
}

impl ElementTrait for Rectangle {
    fn id(&self) -> &ElementId {
        &self.id
    }

    fn bounds(&self) -> Rect {
        self.as_rect()
    }

    fn is_point_near(&self, point: Point, tolerance: f64) -> bool {
        let rect = self.as_rect();
        let reach = tolerance + self.style.stroke_width / 2.0;
        if self.style.fill_color.is_some() {
            // Filled: hit anywhere inside
            return rect.inflate(reach, reach).contains(point);
        }
        // Outline only: hit on the border
        let outer = rect.inflate(reach, reach);
        let inner = rect.inflate(-reach, -reach);
        let inside_inner = inner.width() > 0.0 && inner.height() > 0.0 && inner.contains(point);
        outer.contains(point) && !inside_inner
    }

    fn outline(&self) -> BezPath {
        self.as_rect().to_path(0.1)
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
    use crate::elements::SerializableColor;

    fn rect(x1: f64, y1: f64, x2: f64, y2: f64) -> Rectangle {
        Rectangle::new("r".into(), x1, y1, x2, y2, ElementStyle::default())
    }

    #[test]
    fn test_as_rect_normalizes_corners() {
        let r = rect(100.0, 100.0, 50.0, 50.0).as_rect();
        assert!((r.x0 - 50.0).abs() < f64::EPSILON);
        assert!((r.y0 - 50.0).abs() < f64::EPSILON);
        assert!((r.width() - 50.0).abs() < f64::EPSILON);
        assert!((r.height() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_test_outline() {
        let r = rect(0.0, 0.0, 100.0, 100.0);
        assert!(r.is_point_near(Point::new(0.0, 50.0), 2.0));
        assert!(r.is_point_near(Point::new(103.0, 50.0), 5.0));
        assert!(!r.is_point_near(Point::new(50.0, 50.0), 2.0));
        assert!(!r.is_point_near(Point::new(150.0, 50.0), 2.0));
    }

    #[test]
    fn test_hit_test_filled() {
        let mut style = ElementStyle::default();
        style.fill_color = Some(SerializableColor::white());
        let r = Rectangle::new("r".into(), 0.0, 0.0, 100.0, 100.0, style);
        assert!(r.is_point_near(Point::new(50.0, 50.0), 0.0));
    }

    #[test]
    fn test_hit_test_degenerate() {
        let r = rect(10.0, 10.0, 10.0, 10.0);
        assert!(r.is_point_near(Point::new(10.0, 10.0), 1.0));
    }
}
