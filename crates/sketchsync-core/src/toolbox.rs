//! Per-tool style defaults.

use crate::elements::{ElementStyle, SerializableColor};
use crate::interaction::Tool;
use std::collections::HashMap;

/// Default stroke weight for shape tools.
const SHAPE_SIZE: f64 = 2.0;
/// Default diameter of freehand strokes.
const FREEHAND_SIZE: f64 = 8.0;
/// Default font size for text.
const TEXT_SIZE: f64 = 24.0;

/// Style settings remembered separately for every drawing tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Toolbox {
    styles: HashMap<Tool, ElementStyle>,
}

impl Default for Toolbox {
    fn default() -> Self {
        let black = SerializableColor::black();
        let styles = Tool::ALL
            .iter()
            .filter(|tool| tool.element_kind().is_some())
            .map(|&tool| {
                let size = match tool {
                    Tool::Freehand => FREEHAND_SIZE,
                    Tool::Text => TEXT_SIZE,
                    _ => SHAPE_SIZE,
                };
                (tool, ElementStyle::new(black, None, size))
            })
            .collect();
        Self { styles }
    }
}

impl Toolbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current settings for `tool`; the eraser has none.
    pub fn get(&self, tool: Tool) -> Option<&ElementStyle> {
        self.styles.get(&tool)
    }

    /// Style for a new element drawn with `tool`, with a fresh sketch seed.
    pub fn style_for(&self, tool: Tool) -> ElementStyle {
        self.styles
            .get(&tool)
            .map(ElementStyle::reseeded)
            .unwrap_or_default()
    }

    pub fn change_stroke(&mut self, tool: Tool, color: SerializableColor) {
        if let Some(style) = self.styles.get_mut(&tool) {
            style.stroke_color = color;
        }
    }

    pub fn change_fill(&mut self, tool: Tool, color: Option<SerializableColor>) {
        if let Some(style) = self.styles.get_mut(&tool) {
            style.fill_color = color;
        }
    }

    /// Non-finite or negative sizes are ignored.
    pub fn change_size(&mut self, tool: Tool, size: f64) {
        if !size.is_finite() || size < 0.0 {
            log::warn!("Ignoring invalid size {size} for {tool:?}");
            return;
        }
        if let Some(style) = self.styles.get_mut(&tool) {
            style.stroke_width = size;
        }
    }
}
