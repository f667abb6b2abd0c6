//! Error types shared across the crate.

use crate::elements::{ElementId, ElementKind};
use thiserror::Error;

/// Errors raised by the element model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElementError {
    #[error("Invalid element kind: {0}")]
    InvalidKind(String),
    #[error("{operation} is not valid for {kind} elements")]
    KindMismatch {
        operation: &'static str,
        kind: ElementKind,
    },
    #[error("Malformed element: {0}")]
    Malformed(String),
}

/// Soft failures of the reconciliation engine.
///
/// These are never shown to the user; the session logs them and moves on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    #[error("No element with id {0}")]
    Stale(ElementId),
    #[error("Element {0} was already applied")]
    Duplicate(ElementId),
    #[error("Element {0} is being authored locally")]
    LocallyAuthored(ElementId),
    #[error("Element {id} is a {existing}, remote payload is a {incoming}")]
    KindMismatch {
        id: ElementId,
        existing: ElementKind,
        incoming: ElementKind,
    },
    #[error("Rejected remote operation: {0}")]
    Rejected(#[from] ElementError),
}

/// Transport failures. Outbound frames that hit one of these are dropped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("Transport unavailable")]
    Unavailable,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Send failed: {0}")]
    Send(String),
}

/// Wire frame decoding failures.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Frame for board {found} received by session for board {expected}")]
    WrongBoard { expected: String, found: String },
    #[error("{0} frames are outbound only")]
    OutboundOnly(&'static str),
    #[error(transparent)]
    Element(#[from] ElementError),
    /// The frame was valid but did not change the board.
    #[error("Not applied: {0}")]
    NotApplied(#[from] ReconcileError),
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
