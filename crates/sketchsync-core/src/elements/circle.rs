//! Circle (ellipse) element.

use super::{ElementId, ElementStyle, ElementTrait, normalized_rect, sketch_path};
use kurbo::{BezPath, Ellipse as KurboEllipse, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// An ellipse inscribed in the rectangle spanned by two corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
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

impl Circle {
    pub fn new(id: ElementId, x1: f64, y1: f64, x2: f64, y2: f64, style: ElementStyle) -> Self {
        let mut circle = Self {
            id,
            x1,
            y1,
            x2,
            y2,
            style,
            sketch: BezPath::new(),
        };
        circle.refresh();
        circle
    }

    pub fn corners(&self) -> (Point, Point) {
        (Point::new(self.x1, self.y1), Point::new(self.x2, self.y2))
    }

    pub fn set_end(&mut self, end: Point) {
        self.x2 = end.x;
        self.y2 = end.y;
        self.refresh();
    }

    pub fn center(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn radii(&self) -> (f64, f64) {
        ((self.x2 - self.x1).abs() / 2.0, (self.y2 - self.y1).abs() / 2.0)
    }

    /// Get as a kurbo Ellipse.
    pub fn as_kurbo(&self) -> KurboEllipse {
        KurboEllipse::new(self.center(), self.radii(), 0.0)
    }

    pub fn sketch(&self) -> &BezPath {
        &self.sketch
    }
}

impl ElementTrait for Circle {
    fn id(&self) -> &ElementId {
        &self.id
    }

    fn bounds(&self) -> Rect {
        normalized_rect(self.x1, self.y1, self.x2, self.y2)
    }

    fn is_point_near(&self, point: Point, tolerance: f64) -> bool {
        let center = self.center();
        let (rx, ry) = self.radii();
        let reach = tolerance + self.style.stroke_width / 2.0;

        let dx_outer = (point.x - center.x) / (rx + reach);
        let dy_outer = (point.y - center.y) / (ry + reach);
        if dx_outer * dx_outer + dy_outer * dy_outer > 1.0 {
            return false;
        }
        if self.style.fill_color.is_some() {
            return true;
        }
        // Outline only: reject if inside inner ellipse
        let inner_rx = rx - reach;
        let inner_ry = ry - reach;
        if inner_rx < f64::EPSILON || inner_ry < f64::EPSILON {
            return true;
        }
        let dx_inner = (point.x - center.x) / inner_rx;
        let dy_inner = (point.y - center.y) / inner_ry;
        dx_inner * dx_inner + dy_inner * dy_inner > 1.0
    }

    fn outline(&self) -> BezPath {
        self.as_kurbo().to_path(0.1)
    }

    fn style(&self) -> &ElementStyle {
        &self.style
    }

    fn refresh(&mut self) {
        self.sketch = sketch_path(&self.outline(), &self.style);
    }
}
