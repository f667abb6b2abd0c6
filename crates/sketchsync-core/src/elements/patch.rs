//! Partial element updates carried by `element:update`.

use super::{ElementKind, ElementStyle, SerializableColor, check_finite, deserialize_optional_color};
use crate::error::ElementError;
use serde::{Deserialize, Deserializer, Serialize};

/// A partial-field update for one element. Absent fields are left unchanged.
///
/// `fill` distinguishes an absent field (`None`) from an explicit `null` that clears the fill
/// (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<SerializableColor>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_fill")]
    pub fill: Option<Option<SerializableColor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
}

fn deserialize_fill<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Option<SerializableColor>>, D::Error> {
    deserialize_optional_color(deserializer).map(Some)
}

impl ElementPatch {
    /// Patch that moves the second corner of a shape.
    pub fn end(x2: f64, y2: f64) -> Self {
        Self {
            x2: Some(x2),
            y2: Some(y2),
            ..Default::default()
        }
    }

    /// Patch that replaces the content of a text element.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            text: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Reject fields that do not exist on `kind`.
    pub fn check_kind(&self, kind: ElementKind) -> Result<(), ElementError> {
        let first_corner = self.x1.is_some() || self.y1.is_some();
        let second_corner = self.x2.is_some() || self.y2.is_some();
        let allowed = match kind {
            ElementKind::Line | ElementKind::Rectangle | ElementKind::Circle | ElementKind::Arrow => {
                self.text.is_none()
            }
            ElementKind::Text => !second_corner,
            ElementKind::Freehand => !first_corner && !second_corner && self.text.is_none(),
        };
        if allowed {
            Ok(())
        } else {
            Err(ElementError::KindMismatch {
                operation: "patch",
                kind,
            })
        }
    }

    pub fn check_finite(&self) -> Result<(), ElementError> {
        let coords: Vec<f64> = [self.x1, self.y1, self.x2, self.y2, self.size]
            .into_iter()
            .flatten()
            .collect();
        check_finite(&coords)?;
        match self.size {
            Some(size) if size < 0.0 => Err(ElementError::Malformed(format!("invalid size {size}"))),
            _ => Ok(()),
        }
    }

    pub fn apply_style(&self, style: &mut ElementStyle) {
        if let Some(stroke) = self.stroke {
            style.stroke_color = stroke;
        }
        if let Some(fill) = self.fill {
            style.fill_color = fill;
        }
        if let Some(size) = self.size {
            style.stroke_width = size;
        }
    }

    pub fn apply_corners(&self, x1: &mut f64, y1: &mut f64, x2: &mut f64, y2: &mut f64) {
        for (field, value) in [(x1, self.x1), (y1, self.y1), (x2, self.x2), (y2, self.y2)] {
            if let Some(v) = value {
                *field = v;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unknown_fields() {
        let result: Result<ElementPatch, _> = serde_json::from_str(r#"{"x2": 1, "radius": 4}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_fill_null_clears() {
        let patch: ElementPatch = serde_json::from_str(r#"{"fill": null}"#).unwrap();
        assert_eq!(patch.fill, Some(None));

        let mut style = ElementStyle::default();
        style.fill_color = Some(SerializableColor::white());
        patch.apply_style(&mut style);
        assert_eq!(style.fill_color, None);

        let absent: ElementPatch = serde_json::from_str(r#"{"size": 3}"#).unwrap();
        assert_eq!(absent.fill, None);
    }

    #[test]
    fn test_check_kind() {
        assert!(ElementPatch::end(1.0, 1.0).check_kind(ElementKind::Rectangle).is_ok());
        assert!(ElementPatch::end(1.0, 1.0).check_kind(ElementKind::Text).is_err());
        assert!(ElementPatch::end(1.0, 1.0).check_kind(ElementKind::Freehand).is_err());
        assert!(ElementPatch::text("hi").check_kind(ElementKind::Text).is_ok());
        assert!(ElementPatch::text("hi").check_kind(ElementKind::Line).is_err());
        let style_only = ElementPatch {
            size: Some(4.0),
            ..Default::default()
        };
        assert!(style_only.check_kind(ElementKind::Freehand).is_ok());
    }

    #[test]
    fn test_check_finite() {
        let patch = ElementPatch::end(f64::NAN, 1.0);
        assert!(patch.check_finite().is_err());
        let negative = ElementPatch {
            size: Some(-1.0),
            ..Default::default()
        };
        assert!(negative.check_finite().is_err());
    }

    #[test]
    fn test_serialize_omits_absent() {
        let json = serde_json::to_value(ElementPatch::end(3.0, 4.0)).unwrap();
        assert_eq!(json, serde_json::json!({"x2": 3.0, "y2": 4.0}));
    }
}
