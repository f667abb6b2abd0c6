//! Local pointer interaction state machine.
//!
//! Pointer and text events mutate the board directly and return the operations that
//! describe the change to other participants.

use crate::board::Board;
use crate::elements::{Element, ElementId, ElementKind, ElementPatch, ElementStyle};
use crate::error::ElementError;
use crate::protocol::Operation;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Line,
    Rectangle,
    Circle,
    Arrow,
    #[default]
    Freehand,
    Text,
    Eraser,
}

impl Tool {
    pub const ALL: [Tool; 7] = [
        Tool::Line,
        Tool::Rectangle,
        Tool::Circle,
        Tool::Arrow,
        Tool::Freehand,
        Tool::Text,
        Tool::Eraser,
    ];

    /// Kind of element this tool draws, if any.
    pub fn element_kind(self) -> Option<ElementKind> {
        match self {
            Tool::Line => Some(ElementKind::Line),
            Tool::Rectangle => Some(ElementKind::Rectangle),
            Tool::Circle => Some(ElementKind::Circle),
            Tool::Arrow => Some(ElementKind::Arrow),
            Tool::Freehand => Some(ElementKind::Freehand),
            Tool::Text => Some(ElementKind::Text),
            Tool::Eraser => None,
        }
    }
}

impl TryFrom<Tool> for ElementKind {
    type Error = ElementError;

    fn try_from(tool: Tool) -> Result<Self, Self::Error> {
        tool.element_kind()
            .ok_or_else(|| ElementError::InvalidKind(format!("{tool:?}").to_uppercase()))
    }
}

/// State of the local interaction.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// A shape or stroke is being dragged out.
    Drawing { element: ElementId },
    /// The eraser is down; `marked` collects hit elements.
    Erasing { marked: Vec<ElementId> },
    /// A text element is waiting for its content.
    EditingText { element: ElementId },
}

/// Active tool plus interaction state.
#[derive(Debug, Clone)]
pub struct Interaction {
    tool: Tool,
    state: InteractionState,
    eraser_tolerance: f64,
}

impl Default for Interaction {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl Interaction {
    pub fn new(eraser_tolerance: f64) -> Self {
        Self {
            tool: Tool::default(),
            state: InteractionState::Idle,
            eraser_tolerance,
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Id of the element currently authored locally.
    pub fn in_progress(&self) -> Option<&ElementId> {
        match &self.state {
            InteractionState::Drawing { element } | InteractionState::EditingText { element } => Some(element),
            _ => None,
        }
    }

    /// Id of the text element awaiting content.
    pub fn editing_text(&self) -> Option<&ElementId> {
        match &self.state {
            InteractionState::EditingText { element } => Some(element),
            _ => None,
        }
    }

    /// Switch tools. The interaction state is left alone.
    pub fn change_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn pointer_down(&mut self, board: &mut Board, point: Point, style: ElementStyle) -> Vec<Operation> {
        if self.state != InteractionState::Idle {
            log::debug!("Ignoring pointer down while {:?}", self.state);
            return Vec::new();
        }
        let Some(kind) = self.tool.element_kind() else {
            self.state = InteractionState::Erasing { marked: Vec::new() };
            return Vec::new();
        };

        let id = ElementId::temporary();
        let element = Element::create(id.clone(), kind, point.x, point.y, point.x, point.y, style);
        if let Err(e) = board.document_mut().push(element.clone()) {
            log::warn!("Could not start element: {e}");
            return Vec::new();
        }
        self.state = if kind == ElementKind::Text {
            InteractionState::EditingText { element: id.clone() }
        } else {
            InteractionState::Drawing { element: id.clone() }
        };
        vec![Operation::Start { temp_id: id, element }]
    }

    pub fn pointer_move(&mut self, board: &mut Board, point: Point) -> Vec<Operation> {
        match &mut self.state {
            InteractionState::Drawing { element: id } => {
                let Some(element) = board.document_mut().get_mut(id) else {
                    return Vec::new();
                };
                if element.kind() == ElementKind::Freehand {
                    if element.append_point(point).is_err() {
                        return Vec::new();
                    }
                    vec![Operation::Points {
                        temp_id: id.clone(),
                        points_chunk: vec![point],
                    }]
                } else {
                    if element.set_end(point).is_err() {
                        return Vec::new();
                    }
                    vec![Operation::Update {
                        temp_id: id.clone(),
                        patch: ElementPatch::end(point.x, point.y),
                    }]
                }
            }
            InteractionState::Erasing { marked } => {
                for id in board.document().hit_test(point, self.eraser_tolerance) {
                    if !marked.contains(&id) {
                        marked.push(id);
                    }
                }
                Vec::new()
            }
            InteractionState::Idle | InteractionState::EditingText { .. } => Vec::new(),
        }
    }

    pub fn pointer_up(&mut self, board: &mut Board) -> Vec<Operation> {
        match std::mem::take(&mut self.state) {
            InteractionState::Drawing { element: id } => {
                let Some(element) = board.document().get(&id).cloned() else {
                    log::debug!("Element {id} vanished before pointer up");
                    return Vec::new();
                };
                board.commit();
                vec![Operation::Commit {
                    temp_id: id,
                    final_id: None,
                    element,
                }]
            }
            InteractionState::Erasing { marked } => {
                let removed = board.document_mut().remove_ids(&marked);
                if removed.is_empty() {
                    return Vec::new();
                }
                board.commit();
                vec![Operation::Erase { element_ids: removed }]
            }
            editing @ InteractionState::EditingText { .. } => {
                self.state = editing;
                Vec::new()
            }
            InteractionState::Idle => Vec::new(),
        }
    }

    /// Finish text editing with `content`. Empty content is committed as well.
    pub fn text_blur(&mut self, board: &mut Board, content: &str) -> Vec<Operation> {
        let InteractionState::EditingText { element: id } = &self.state else {
            return Vec::new();
        };
        let id = id.clone();
        self.state = InteractionState::Idle;

        let Some(element) = board.document_mut().get_mut(&id) else {
            log::debug!("Text element {id} vanished before blur");
            return Vec::new();
        };
        if let Err(e) = element.set_text(content) {
            log::warn!("Could not set text on {id}: {e}");
            return Vec::new();
        }
        let element = element.clone();
        board.commit();
        vec![Operation::Commit {
            temp_id: id,
            final_id: None,
            element,
        }]
    }
}
