//! Text element.

use super::{ElementId, ElementStyle, ElementTrait};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// Approximate glyph advance relative to the font size.
const CHAR_WIDTH_FACTOR: f64 = 0.6;
const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// A text block anchored at its top-left corner. `style.stroke_width` is the font size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    #[serde(default)]
    pub(crate) id: ElementId,
    pub x1: f64,
    pub y1: f64,
    #[serde(rename = "text", default)]
    pub content: String,
    #[serde(flatten)]
    pub style: ElementStyle,
}

impl Text {
    pub fn new(id: ElementId, x1: f64, y1: f64, content: String, style: ElementStyle) -> Self {
        Self {
            id,
            x1,
            y1,
            content,
            style,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn font_size(&self) -> f64 {
        self.style.stroke_width
    }

    /// Approximate laid-out size; empty text still occupies one character cell.
    fn approx_size(&self) -> (f64, f64) {
        let size = self.font_size();
        let lines = self.content.split('\n').count().max(1);
        let widest = self
            .content
            .split('\n')
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0)
            .max(1);
        (
            widest as f64 * size * CHAR_WIDTH_FACTOR,
            lines as f64 * size * LINE_HEIGHT_FACTOR,
        )
    }
}

impl ElementTrait for Text {
    fn id(&self) -> &ElementId {
        &self.id
    }

    fn bounds(&self) -> Rect {
        let (w, h) = self.approx_size();
        Rect::from_origin_size(self.position(), (w, h))
    }

    fn is_point_near(&self, point: Point, tolerance: f64) -> bool {
        self.bounds().inflate(tolerance, tolerance).contains(point)
    }

    fn outline(&self) -> BezPath {
        self.bounds().to_path(0.1)
    }

    fn style(&self) -> &ElementStyle {
        &self.style
    }

    fn refresh(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(content: &str) -> Text {
        let mut style = ElementStyle::default();
        style.stroke_width = 10.0;
        Text::new("t".into(), 0.0, 0.0, content.to_string(), style)
    }

    #[test]
    fn test_bounds_multiline() {
        let b = text("abcd\nab").bounds();
        assert!((b.width() - 24.0).abs() < 1e-9);
        assert!((b.height() - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_text_has_bounds() {
        let b = text("").bounds();
        assert!(b.width() > 0.0 && b.height() > 0.0);
    }

    #[test]
    fn test_hit_test() {
        let t = text("hello");
        assert!(t.is_point_near(Point::new(10.0, 5.0), 0.0));
        assert!(t.is_point_near(Point::new(32.0, 5.0), 3.0));
        assert!(!t.is_point_near(Point::new(100.0, 5.0), 3.0));
    }

    #[test]
    fn test_wire_field_name() {
        let json = serde_json::to_value(text("hi")).unwrap();
        assert_eq!(json["text"], "hi");
        assert_eq!(json["size"], 10.0);
    }
}
