//! Wire frames exchanged with the board relay.
//!
//! Every frame is a single JSON object tagged by `type` and scoped by `boardId`:
//!
//! ```json
//! {"type": "element:update", "boardId": "b1", "tempId": "…", "patch": {"x2": 10, "y2": 10}}
//! ```

use crate::elements::{Element, ElementId, ElementPatch, SerializableColor};
use crate::error::{ElementError, ProtocolError};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Body of a frame, tagged by the event name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    /// Subscribe to a board's room.
    #[serde(rename = "join")]
    Join,
    /// Leave a board's room.
    #[serde(rename = "leave")]
    Leave,
    /// A provisional element was created.
    #[serde(rename = "element:start", rename_all = "camelCase")]
    Start { temp_id: ElementId, element: Element },
    /// Points were appended to a provisional freehand stroke.
    #[serde(rename = "element:points", rename_all = "camelCase")]
    Points {
        temp_id: ElementId,
        points_chunk: Vec<Point>,
    },
    /// Partial update of a provisional element.
    #[serde(rename = "element:update", rename_all = "camelCase")]
    Update {
        temp_id: ElementId,
        patch: ElementPatch,
    },
    /// An element was finished. `final_id` is absent when the author sends it; the relay
    /// may assign one.
    #[serde(rename = "element:commit", rename_all = "camelCase")]
    Commit {
        temp_id: ElementId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        final_id: Option<ElementId>,
        element: Element,
    },
    /// Elements were erased.
    #[serde(rename = "element:erase", rename_all = "camelCase")]
    Erase { element_ids: Vec<ElementId> },
    /// Pointer position of a participant.
    #[serde(rename = "cursor")]
    Cursor {
        x: f64,
        y: f64,
        color: SerializableColor,
        name: String,
    },
}

impl Operation {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Join => "join",
            Operation::Leave => "leave",
            Operation::Start { .. } => "element:start",
            Operation::Points { .. } => "element:points",
            Operation::Update { .. } => "element:update",
            Operation::Commit { .. } => "element:commit",
            Operation::Erase { .. } => "element:erase",
            Operation::Cursor { .. } => "cursor",
        }
    }

    /// Whether this frame may only travel from a client to the relay.
    pub fn is_outbound_only(&self) -> bool {
        matches!(self, Operation::Join | Operation::Leave | Operation::Cursor { .. })
    }

    /// Validate received geometry and derive cached paths of carried elements.
    fn prepare_inbound(&mut self) -> Result<(), ElementError> {
        match self {
            Operation::Start { element, .. } | Operation::Commit { element, .. } => {
                element.validate()?;
                element.refresh();
            }
            Operation::Points { points_chunk, .. } => {
                if points_chunk.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
                    return Err(ElementError::Malformed("non-finite point".to_string()));
                }
            }
            Operation::Update { patch, .. } => patch.check_finite()?,
            _ => {}
        }
        Ok(())
    }
}

/// A complete frame: board scope plus operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "boardId")]
    pub board_id: String,
    #[serde(flatten)]
    pub op: Operation,
}

impl Envelope {
    pub fn new(board_id: impl Into<String>, op: Operation) -> Self {
        Self {
            board_id: board_id.into(),
            op,
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a frame without checking board scope or direction.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse and validate a frame received by the session for `expected_board`.
    pub fn decode(text: &str, expected_board: &str) -> Result<Operation, ProtocolError> {
        let Envelope { board_id, mut op } = Self::parse(text)?;
        if board_id != expected_board {
            return Err(ProtocolError::WrongBoard {
                expected: expected_board.to_string(),
                found: board_id,
            });
        }
        if op.is_outbound_only() {
            return Err(ProtocolError::OutboundOnly(op.name()));
        }
        op.prepare_inbound()?;
        Ok(op)
    }
}
