//! Drawable element definitions for the board.

mod arrow;
mod circle;
mod freehand;
mod line;
mod patch;
mod rectangle;
mod sketch;
mod stroke;
mod text;

pub use arrow::Arrow;
pub use circle::Circle;
pub use freehand::Freehand;
pub use line::Line;
pub use patch::ElementPatch;
pub use rectangle::Rectangle;
pub use sketch::sketch_path;
pub use stroke::{StrokeOptions, freehand_path, outline_to_path, stroke_outline};
pub use text::Text;

use crate::error::ElementError;
use kurbo::{BezPath, Point, Rect};
use peniko::Color;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of an element within a document.
///
/// Temporary ids are issued by the authoring client while the element is provisional;
/// the commit operation may re-key the element to a final id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Issue a fresh client-side temporary id.
    pub fn temporary() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ElementId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The kind of an element. Fixed for the element's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementKind {
    Line,
    Rectangle,
    Circle,
    Arrow,
    #[serde(alias = "BRUSH")]
    Freehand,
    Text,
}

impl ElementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Line => "LINE",
            ElementKind::Rectangle => "RECTANGLE",
            ElementKind::Circle => "CIRCLE",
            ElementKind::Arrow => "ARROW",
            ElementKind::Freehand => "FREEHAND",
            ElementKind::Text => "TEXT",
        }
    }

    /// Whether this kind is described by two corner points.
    pub fn has_corners(self) -> bool {
        matches!(
            self,
            ElementKind::Line | ElementKind::Rectangle | ElementKind::Circle | ElementKind::Arrow
        )
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = ElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LINE" => Ok(ElementKind::Line),
            "RECTANGLE" => Ok(ElementKind::Rectangle),
            "CIRCLE" => Ok(ElementKind::Circle),
            "ARROW" => Ok(ElementKind::Arrow),
            "FREEHAND" | "BRUSH" => Ok(ElementKind::Freehand),
            "TEXT" => Ok(ElementKind::Text),
            other => Err(ElementError::InvalidKind(other.to_string())),
        }
    }
}

/// Serializable color representation (RGBA8), written on the wire as a CSS hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if !digits.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match digits.len() {
            3 => {
                let mut rgb = [0u8; 3];
                for (i, c) in digits.chars().enumerate() {
                    let v = c.to_digit(16)? as u8;
                    rgb[i] = v * 17;
                }
                Some(Self::new(rgb[0], rgb[1], rgb[2], 255))
            }
            6 => Some(Self::new(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
                255,
            )),
            8 => Some(Self::new(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
                channel(&digits[6..8])?,
            )),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl fmt::Display for SerializableColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

impl Serialize for SerializableColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SerializableColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        SerializableColor::from_hex(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color: {text}")))
    }
}

/// Fill colors arrive as `null`, an empty string or a hex color.
pub(crate) fn deserialize_optional_color<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<SerializableColor>, D::Error> {
    let text: Option<String> = Option::deserialize(deserializer)?;
    match text.as_deref() {
        None | Some("") | Some("none") | Some("transparent") => Ok(None),
        Some(hex) => SerializableColor::from_hex(hex)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color: {hex}"))),
    }
}

/// Sloppiness level for the hand-drawn sketch geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sloppiness {
    /// Clean, precise lines.
    Architect,
    /// Slight hand-drawn feel.
    #[default]
    Artist,
    /// Very sketchy.
    Cartoonist,
}

impl Sloppiness {
    pub fn roughness(&self) -> f64 {
        match self {
            Sloppiness::Architect => 0.0,
            Sloppiness::Artist => 1.0,
            Sloppiness::Cartoonist => 2.0,
        }
    }
}

/// Style properties shared by every element kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementStyle {
    /// Stroke color (also the text color).
    #[serde(rename = "stroke", default = "SerializableColor::black")]
    pub stroke_color: SerializableColor,
    /// Fill color (None = no fill).
    #[serde(
        rename = "fill",
        default,
        deserialize_with = "deserialize_optional_color"
    )]
    pub fill_color: Option<SerializableColor>,
    /// Stroke weight, or font size for text.
    #[serde(rename = "size", default = "default_size")]
    pub stroke_width: f64,
    #[serde(default)]
    pub sloppiness: Sloppiness,
    /// Seed for the sketch geometry, shared by every participant rendering the element.
    #[serde(default)]
    pub seed: u32,
}

fn default_size() -> f64 {
    2.0
}

/// Generate a seed for new elements.
/// Counter + splitmix-style mixing, no clock or OS randomness needed.
pub fn generate_seed() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};

    static SEED_COUNTER: AtomicU32 = AtomicU32::new(1);

    let counter = SEED_COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut x = counter.wrapping_mul(0x9E3779B9);
    x ^= x >> 16;
    x = x.wrapping_mul(0x85EBCA6B);
    x ^= x >> 13;
    x = x.wrapping_mul(0xC2B2AE35);
    x ^= x >> 16;
    x
}

impl ElementStyle {
    pub fn new(stroke_color: SerializableColor, fill_color: Option<SerializableColor>, stroke_width: f64) -> Self {
        Self {
            stroke_color,
            fill_color,
            stroke_width,
            sloppiness: Sloppiness::default(),
            seed: generate_seed(),
        }
    }

    /// Get the stroke color as a peniko Color.
    pub fn stroke(&self) -> Color {
        self.stroke_color.into()
    }

    /// Get the fill color as a peniko Color.
    pub fn fill(&self) -> Option<Color> {
        self.fill_color.map(|c| c.into())
    }

    /// Same style with a fresh seed.
    pub fn reseeded(&self) -> Self {
        Self {
            seed: generate_seed(),
            ..self.clone()
        }
    }

    fn validate(&self) -> Result<(), ElementError> {
        if !self.stroke_width.is_finite() || self.stroke_width < 0.0 {
            return Err(ElementError::Malformed(format!(
                "invalid size {}",
                self.stroke_width
            )));
        }
        Ok(())
    }
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self::new(SerializableColor::black(), None, default_size())
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    point.distance(proj)
}

/// Minimum distance from a point to a polyline.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [single] => point.distance(*single),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Axis-aligned rectangle spanned by two corners, in either order.
pub(crate) fn normalized_rect(x1: f64, y1: f64, x2: f64, y2: f64) -> Rect {
    Rect::new(x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2))
}

fn check_finite(values: &[f64]) -> Result<(), ElementError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ElementError::Malformed("non-finite coordinate".to_string()))
    }
}

/// Common behavior of every element kind.
pub trait ElementTrait {
    /// Get the identifier.
    fn id(&self) -> &ElementId;

    /// Bounding box in board coordinates.
    fn bounds(&self) -> Rect;

    /// Hit test used by the eraser.
    fn is_point_near(&self, point: Point, tolerance: f64) -> bool;

    /// Clean (un-sketched) outline of the geometry.
    fn outline(&self) -> BezPath;

    fn style(&self) -> &ElementStyle;

    /// Recompute the cached rendering aid from the current geometry.
    fn refresh(&mut self);
}

/// A drawable element. The variant is the element's kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Element {
    #[serde(rename = "LINE")]
    Line(Line),
    #[serde(rename = "RECTANGLE")]
    Rectangle(Rectangle),
    #[serde(rename = "CIRCLE")]
    Circle(Circle),
    #[serde(rename = "ARROW")]
    Arrow(Arrow),
    #[serde(rename = "FREEHAND", alias = "BRUSH")]
    Freehand(Freehand),
    #[serde(rename = "TEXT")]
    Text(Text),
}

macro_rules! dispatch {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            Element::Line($inner) => $body,
            Element::Rectangle($inner) => $body,
            Element::Circle($inner) => $body,
            Element::Arrow($inner) => $body,
            Element::Freehand($inner) => $body,
            Element::Text($inner) => $body,
        }
    };
}

impl Element {
    /// Construct an element of `kind` spanning the given corners.
    ///
    /// Freehand strokes start with the first corner as their only point; text is anchored at
    /// the first corner with empty content.
    pub fn create(
        id: ElementId,
        kind: ElementKind,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        style: ElementStyle,
    ) -> Self {
        match kind {
            ElementKind::Line => Element::Line(Line::new(id, x1, y1, x2, y2, style)),
            ElementKind::Rectangle => Element::Rectangle(Rectangle::new(id, x1, y1, x2, y2, style)),
            ElementKind::Circle => Element::Circle(Circle::new(id, x1, y1, x2, y2, style)),
            ElementKind::Arrow => Element::Arrow(Arrow::new(id, x1, y1, x2, y2, style)),
            ElementKind::Freehand => {
                Element::Freehand(Freehand::from_points(id, vec![Point::new(x1, y1)], style))
            }
            ElementKind::Text => Element::Text(Text::new(id, x1, y1, String::new(), style)),
        }
    }

    /// Decode an element received from outside the process and derive its cached path.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ElementError> {
        if let Some(kind) = value.get("type").and_then(|t| t.as_str()) {
            kind.parse::<ElementKind>()?;
        }
        let mut element: Element =
            serde_json::from_value(value).map_err(|e| ElementError::Malformed(e.to_string()))?;
        element.validate()?;
        element.refresh();
        Ok(element)
    }

    pub fn id(&self) -> &ElementId {
        dispatch!(self, e => e.id())
    }

    pub(crate) fn set_id(&mut self, id: ElementId) {
        dispatch!(self, e => e.id = id)
    }

    /// Same element under another id.
    pub fn rekeyed(mut self, id: ElementId) -> Self {
        self.set_id(id);
        self
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Line(_) => ElementKind::Line,
            Element::Rectangle(_) => ElementKind::Rectangle,
            Element::Circle(_) => ElementKind::Circle,
            Element::Arrow(_) => ElementKind::Arrow,
            Element::Freehand(_) => ElementKind::Freehand,
            Element::Text(_) => ElementKind::Text,
        }
    }

    pub fn style(&self) -> &ElementStyle {
        dispatch!(self, e => e.style())
    }

    pub fn set_style(&mut self, style: ElementStyle) {
        dispatch!(self, e => {
            e.style = style;
            e.refresh();
        })
    }

    pub fn bounds(&self) -> Rect {
        dispatch!(self, e => e.bounds())
    }

    pub fn is_point_near(&self, point: Point, tolerance: f64) -> bool {
        dispatch!(self, e => e.is_point_near(point, tolerance))
    }

    pub fn outline(&self) -> BezPath {
        dispatch!(self, e => e.outline())
    }

    /// Cached renderable path: sketch geometry for shapes, stroke outline for freehand.
    pub fn path(&self) -> Option<&BezPath> {
        match self {
            Element::Line(e) => Some(e.sketch()),
            Element::Rectangle(e) => Some(e.sketch()),
            Element::Circle(e) => Some(e.sketch()),
            Element::Arrow(e) => Some(e.sketch()),
            Element::Freehand(e) => Some(e.path()),
            Element::Text(_) => None,
        }
    }

    pub fn refresh(&mut self) {
        dispatch!(self, e => e.refresh())
    }

    /// Move the second corner (the drag end) of a shape element.
    pub fn set_end(&mut self, end: Point) -> Result<(), ElementError> {
        match self {
            Element::Line(e) => e.set_end(end),
            Element::Rectangle(e) => e.set_end(end),
            Element::Circle(e) => e.set_end(end),
            Element::Arrow(e) => e.set_end(end),
            other => {
                return Err(ElementError::KindMismatch {
                    operation: "set_end",
                    kind: other.kind(),
                });
            }
        }
        Ok(())
    }

    pub fn append_point(&mut self, point: Point) -> Result<(), ElementError> {
        self.append_points(&[point])
    }

    /// Append sampled points to a freehand stroke and recompute its outline.
    pub fn append_points(&mut self, points: &[Point]) -> Result<(), ElementError> {
        match self {
            Element::Freehand(f) => {
                f.extend(points.iter().copied());
                Ok(())
            }
            other => Err(ElementError::KindMismatch {
                operation: "append_points",
                kind: other.kind(),
            }),
        }
    }

    pub fn set_text(&mut self, content: impl Into<String>) -> Result<(), ElementError> {
        match self {
            Element::Text(t) => {
                t.content = content.into();
                Ok(())
            }
            other => Err(ElementError::KindMismatch {
                operation: "set_text",
                kind: other.kind(),
            }),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Element::Text(t) => Some(&t.content),
            _ => None,
        }
    }

    pub fn points(&self) -> Option<&[Point]> {
        match self {
            Element::Freehand(f) => Some(&f.points),
            _ => None,
        }
    }

    /// Corner points `(x1,y1)`, `(x2,y2)` of shape kinds.
    pub fn corners(&self) -> Option<(Point, Point)> {
        match self {
            Element::Line(e) => Some(e.corners()),
            Element::Rectangle(e) => Some(e.corners()),
            Element::Circle(e) => Some(e.corners()),
            Element::Arrow(e) => Some(e.corners()),
            _ => None,
        }
    }

    /// Merge a partial update. The whole patch is rejected if any field does not apply to
    /// this kind.
    pub fn apply_patch(&mut self, patch: &ElementPatch) -> Result<(), ElementError> {
        patch.check_kind(self.kind())?;
        patch.check_finite()?;
        let mut style = self.style().clone();
        patch.apply_style(&mut style);
        match self {
            Element::Line(e) => patch.apply_corners(&mut e.x1, &mut e.y1, &mut e.x2, &mut e.y2),
            Element::Rectangle(e) => patch.apply_corners(&mut e.x1, &mut e.y1, &mut e.x2, &mut e.y2),
            Element::Circle(e) => patch.apply_corners(&mut e.x1, &mut e.y1, &mut e.x2, &mut e.y2),
            Element::Arrow(e) => patch.apply_corners(&mut e.x1, &mut e.y1, &mut e.x2, &mut e.y2),
            Element::Freehand(_) => {}
            Element::Text(t) => {
                if let Some(x1) = patch.x1 {
                    t.x1 = x1;
                }
                if let Some(y1) = patch.y1 {
                    t.y1 = y1;
                }
                if let Some(content) = &patch.text {
                    t.content = content.clone();
                }
            }
        }
        // set_style refreshes the cache for the new geometry as well
        self.set_style(style);
        Ok(())
    }

    /// Reject payloads with non-finite geometry or size.
    pub fn validate(&self) -> Result<(), ElementError> {
        self.style().validate()?;
        match self {
            Element::Line(e) => check_finite(&[e.x1, e.y1, e.x2, e.y2]),
            Element::Rectangle(e) => check_finite(&[e.x1, e.y1, e.x2, e.y2]),
            Element::Circle(e) => check_finite(&[e.x1, e.y1, e.x2, e.y2]),
            Element::Arrow(e) => check_finite(&[e.x1, e.y1, e.x2, e.y2]),
            Element::Freehand(f) => {
                let coords: Vec<f64> = f.points.iter().flat_map(|p| [p.x, p.y]).collect();
                check_finite(&coords)
            }
            Element::Text(t) => check_finite(&[t.x1, t.y1]),
        }
    }
}
