//! Application of remote operations to the local board.
//!
//! Remote start, extend and patch only touch the live document. Commit and erase are
//! history-worthy and go through [`Board::commit`] exactly once when they change something.
//! Operations addressed to the element the local user is currently authoring are dropped.

use crate::board::Board;
use crate::elements::{Element, ElementId, ElementPatch};
use crate::error::{ProtocolError, ReconcileError};
use crate::protocol::Operation;
use kurbo::Point;

/// An inbound operation that mutates the document.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOperation {
    Start {
        temp_id: ElementId,
        element: Element,
    },
    Extend {
        temp_id: ElementId,
        points: Vec<Point>,
    },
    Patch {
        temp_id: ElementId,
        patch: ElementPatch,
    },
    Commit {
        temp_id: ElementId,
        final_id: ElementId,
        element: Element,
    },
    Erase {
        ids: Vec<ElementId>,
    },
}

impl TryFrom<Operation> for RemoteOperation {
    type Error = ProtocolError;

    fn try_from(op: Operation) -> Result<Self, Self::Error> {
        Ok(match op {
            Operation::Start { temp_id, element } => RemoteOperation::Start { temp_id, element },
            Operation::Points {
                temp_id,
                points_chunk,
            } => RemoteOperation::Extend {
                temp_id,
                points: points_chunk,
            },
            Operation::Update { temp_id, patch } => RemoteOperation::Patch { temp_id, patch },
            Operation::Commit {
                temp_id,
                final_id,
                element,
            } => {
                let final_id = final_id.unwrap_or_else(|| temp_id.clone());
                RemoteOperation::Commit {
                    temp_id,
                    final_id,
                    element,
                }
            }
            Operation::Erase { element_ids } => RemoteOperation::Erase { ids: element_ids },
            other => return Err(ProtocolError::OutboundOnly(other.name())),
        })
    }
}

/// Apply one remote operation. `authoring` is the id of the locally in-progress element.
pub fn apply(
    board: &mut Board,
    authoring: Option<&ElementId>,
    op: RemoteOperation,
) -> Result<(), ReconcileError> {
    match op {
        RemoteOperation::Start { temp_id, element } => remote_start(board, authoring, temp_id, element),
        RemoteOperation::Extend { temp_id, points } => remote_extend(board, authoring, &temp_id, &points),
        RemoteOperation::Patch { temp_id, patch } => remote_patch(board, authoring, &temp_id, &patch),
        RemoteOperation::Commit {
            temp_id,
            final_id,
            element,
        } => remote_commit(board, authoring, temp_id, final_id, element),
        RemoteOperation::Erase { ids } => {
            remote_erase(board, authoring, &ids);
            Ok(())
        }
    }
}

fn guard(authoring: Option<&ElementId>, id: &ElementId) -> Result<(), ReconcileError> {
    match authoring {
        Some(local) if local == id => Err(ReconcileError::LocallyAuthored(id.clone())),
        _ => Ok(()),
    }
}

/// Add a provisional element keyed by `temp_id`.
pub fn remote_start(
    board: &mut Board,
    authoring: Option<&ElementId>,
    temp_id: ElementId,
    element: Element,
) -> Result<(), ReconcileError> {
    guard(authoring, &temp_id)?;
    if board.final_id(&temp_id).is_some() {
        return Err(ReconcileError::Duplicate(temp_id));
    }
    let mut element = element.rekeyed(temp_id);
    element.refresh();
    board.document_mut().push(element)
}

/// Append points to a provisional freehand stroke.
pub fn remote_extend(
    board: &mut Board,
    authoring: Option<&ElementId>,
    temp_id: &ElementId,
    points: &[Point],
) -> Result<(), ReconcileError> {
    guard(authoring, temp_id)?;
    if board.final_id(temp_id).is_some() {
        return Err(ReconcileError::Stale(temp_id.clone()));
    }
    let element = board
        .document_mut()
        .get_mut(temp_id)
        .ok_or_else(|| ReconcileError::Stale(temp_id.clone()))?;
    element.append_points(points)?;
    Ok(())
}

/// Merge a partial update into a provisional element.
pub fn remote_patch(
    board: &mut Board,
    authoring: Option<&ElementId>,
    temp_id: &ElementId,
    patch: &ElementPatch,
) -> Result<(), ReconcileError> {
    guard(authoring, temp_id)?;
    if board.final_id(temp_id).is_some() {
        return Err(ReconcileError::Stale(temp_id.clone()));
    }
    let element = board
        .document_mut()
        .get_mut(temp_id)
        .ok_or_else(|| ReconcileError::Stale(temp_id.clone()))?;
    element.apply_patch(patch)?;
    Ok(())
}

/// Finalize an element under `final_id` and record a snapshot.
///
/// A provisional element under `temp_id` is replaced in place. Without one, an identical
/// element already under `final_id` makes this a redelivery; a different one is overwritten.
/// A commit for an element this board already committed under `temp_id` is the relay's
/// acknowledgement: the element is re-keyed everywhere and no snapshot is recorded.
pub fn remote_commit(
    board: &mut Board,
    authoring: Option<&ElementId>,
    temp_id: ElementId,
    final_id: ElementId,
    element: Element,
) -> Result<(), ReconcileError> {
    guard(authoring, &temp_id)?;
    guard(authoring, &final_id)?;
    if temp_id != final_id && board.history().contains_element(&temp_id) {
        log::debug!("Commit acknowledged, {temp_id} is now {final_id}");
        board.acknowledge(&temp_id, &final_id);
        return Ok(());
    }
    let mut element = element.rekeyed(final_id.clone());
    element.refresh();

    let doc = board.document_mut();
    if let Some(index) = doc.position(&temp_id) {
        check_kind(doc.iter().nth(index), &element)?;
        doc.replace_at(index, element);
        if final_id != temp_id {
            let stale_copy = doc
                .iter()
                .enumerate()
                .find(|(i, e)| *i != index && e.id() == &final_id)
                .map(|(i, _)| i);
            if let Some(other) = stale_copy {
                doc.remove_at(other);
            }
        }
    } else if let Some(index) = doc.position(&final_id) {
        let existing = doc.iter().nth(index);
        if existing == Some(&element) {
            return Err(ReconcileError::Duplicate(final_id));
        }
        check_kind(existing, &element)?;
        log::debug!("Commit {final_id} overwrites an existing element");
        doc.replace_at(index, element);
    } else {
        doc.push(element)?;
    }

    board.record_final_id(temp_id, final_id);
    board.commit();
    Ok(())
}

fn check_kind(existing: Option<&Element>, incoming: &Element) -> Result<(), ReconcileError> {
    match existing {
        Some(e) if e.kind() != incoming.kind() => Err(ReconcileError::KindMismatch {
            id: e.id().clone(),
            existing: e.kind(),
            incoming: incoming.kind(),
        }),
        _ => Ok(()),
    }
}

/// Remove the present elements among `ids`. Records one snapshot if anything was removed.
pub fn remote_erase(board: &mut Board, authoring: Option<&ElementId>, ids: &[ElementId]) -> Vec<ElementId> {
    let targets: Vec<ElementId> = ids
        .iter()
        .filter(|id| {
            let allowed = guard(authoring, id).is_ok();
            if !allowed {
                log::debug!("Ignoring remote erase of locally authored element {id}");
            }
            allowed
        })
        .cloned()
        .collect();
    let removed = board.document_mut().remove_ids(&targets);
    if !removed.is_empty() {
        board.commit();
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{ElementKind, ElementStyle};
    use crate::error::ElementError;

    fn style() -> ElementStyle {
        let mut style = ElementStyle::default();
        style.seed = 7;
        style
    }

    fn rect(id: &str, x2: f64, y2: f64) -> Element {
        Element::create(id.into(), ElementKind::Rectangle, 0.0, 0.0, x2, y2, style())
    }

    fn stroke(id: &str) -> Element {
        Element::create(id.into(), ElementKind::Freehand, 0.0, 0.0, 0.0, 0.0, style())
    }

    #[test]
    fn test_start_patch_commit_scenario() {
        let mut board = Board::default();
        let before = board.history().len();

        remote_start(&mut board, None, "t1".into(), rect("t1", 0.0, 0.0)).unwrap();
        remote_patch(&mut board, None, &"t1".into(), &ElementPatch::end(10.0, 10.0)).unwrap();
        assert_eq!(board.history().len(), before);

        remote_commit(&mut board, None, "t1".into(), "f1".into(), rect("f1", 10.0, 10.0)).unwrap();

        let doc = board.document();
        assert_eq!(doc.len(), 1);
        let element = doc.get(&"f1".into()).unwrap();
        assert_eq!(element.kind(), ElementKind::Rectangle);
        assert_eq!(
            element.corners(),
            Some((Point::new(0.0, 0.0), Point::new(10.0, 10.0)))
        );
        assert!(!doc.contains(&"t1".into()));
        assert_eq!(board.history().len(), before + 1);
    }

    #[test]
    fn test_commit_is_idempotent() {
        let mut board = Board::default();
        remote_start(&mut board, None, "t1".into(), rect("t1", 0.0, 0.0)).unwrap();
        remote_commit(&mut board, None, "t1".into(), "f1".into(), rect("f1", 5.0, 5.0)).unwrap();
        let doc = board.document().clone();
        let history = board.history().len();

        let again = remote_commit(&mut board, None, "t1".into(), "f1".into(), rect("f1", 5.0, 5.0));
        assert_eq!(again, Err(ReconcileError::Duplicate("f1".into())));
        assert_eq!(board.document(), &doc);
        assert_eq!(board.history().len(), history);
    }

    #[test]
    fn test_commit_without_start_appends() {
        let mut board = Board::default();
        remote_commit(&mut board, None, "t1".into(), "t1".into(), rect("t1", 5.0, 5.0)).unwrap();
        assert_eq!(board.document().len(), 1);
        assert_eq!(board.history().cursor(), 1);
    }

    #[test]
    fn test_commit_last_writer_wins() {
        let mut board = Board::default();
        remote_commit(&mut board, None, "a".into(), "f1".into(), rect("f1", 5.0, 5.0)).unwrap();
        remote_commit(&mut board, None, "b".into(), "f1".into(), rect("f1", 8.0, 8.0)).unwrap();
        let element = board.document().get(&"f1".into()).unwrap();
        assert_eq!(element.corners().map(|(_, end)| end), Some(Point::new(8.0, 8.0)));
        assert_eq!(board.document().len(), 1);
        assert_eq!(board.history().cursor(), 2);
    }

    #[test]
    fn test_commit_drops_stale_final_copy() {
        let mut board = Board::default();
        remote_commit(&mut board, None, "x".into(), "f1".into(), rect("f1", 5.0, 5.0)).unwrap();
        remote_start(&mut board, None, "t1".into(), rect("t1", 0.0, 0.0)).unwrap();
        remote_commit(&mut board, None, "t1".into(), "f1".into(), rect("f1", 9.0, 9.0)).unwrap();
        let ids: Vec<&str> = board.document().ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["f1"]);
    }

    #[test]
    fn test_commit_kind_mismatch() {
        let mut board = Board::default();
        remote_start(&mut board, None, "t1".into(), rect("t1", 0.0, 0.0)).unwrap();
        let err = remote_commit(&mut board, None, "t1".into(), "f1".into(), stroke("f1")).unwrap_err();
        assert!(matches!(err, ReconcileError::KindMismatch { .. }));
        assert!(board.document().contains(&"t1".into()));
        assert_eq!(board.history().len(), 1);
    }

    #[test]
    fn test_start_duplicate_is_noop() {
        let mut board = Board::default();
        remote_start(&mut board, None, "t1".into(), rect("t1", 0.0, 0.0)).unwrap();
        let err = remote_start(&mut board, None, "t1".into(), rect("t1", 3.0, 3.0)).unwrap_err();
        assert_eq!(err, ReconcileError::Duplicate("t1".into()));
        assert_eq!(board.document().len(), 1);
    }

    #[test]
    fn test_extend() {
        let mut board = Board::default();
        remote_start(&mut board, None, "s".into(), stroke("s")).unwrap();
        remote_extend(&mut board, None, &"s".into(), &[Point::new(1.0, 1.0), Point::new(2.0, 2.0)]).unwrap();
        assert_eq!(board.document().get(&"s".into()).and_then(|e| e.points()).map(|p| p.len()), Some(3));

        let stale = remote_extend(&mut board, None, &"missing".into(), &[Point::ZERO]);
        assert_eq!(stale, Err(ReconcileError::Stale("missing".into())));

        remote_start(&mut board, None, "r".into(), rect("r", 0.0, 0.0)).unwrap();
        let rejected = remote_extend(&mut board, None, &"r".into(), &[Point::ZERO]);
        assert!(matches!(
            rejected,
            Err(ReconcileError::Rejected(ElementError::KindMismatch { .. }))
        ));
    }

    #[test]
    fn test_patch_stale_and_rejected() {
        let mut board = Board::default();
        let stale = remote_patch(&mut board, None, &"t".into(), &ElementPatch::end(1.0, 1.0));
        assert_eq!(stale, Err(ReconcileError::Stale("t".into())));

        remote_start(&mut board, None, "s".into(), stroke("s")).unwrap();
        let rejected = remote_patch(&mut board, None, &"s".into(), &ElementPatch::end(1.0, 1.0));
        assert!(matches!(rejected, Err(ReconcileError::Rejected(_))));
    }

    #[test]
    fn test_erase() {
        let mut board = Board::default();
        remote_commit(&mut board, None, "a".into(), "a".into(), rect("a", 1.0, 1.0)).unwrap();
        remote_commit(&mut board, None, "b".into(), "b".into(), rect("b", 1.0, 1.0)).unwrap();
        let history = board.history().len();

        assert!(remote_erase(&mut board, None, &[]).is_empty());
        assert!(remote_erase(&mut board, None, &["zz".into()]).is_empty());
        assert_eq!(board.history().len(), history);

        let removed = remote_erase(&mut board, None, &["a".into(), "zz".into()]);
        assert_eq!(removed, vec![ElementId::from("a")]);
        assert_eq!(board.history().len(), history + 1);
        assert_eq!(board.document().len(), 1);
    }

    #[test]
    fn test_locally_authored_guard() {
        let mut board = Board::default();
        board.document_mut().push(rect("mine", 1.0, 1.0)).unwrap();
        let local = ElementId::from("mine");

        let err = remote_patch(&mut board, Some(&local), &local, &ElementPatch::end(9.0, 9.0));
        assert_eq!(err, Err(ReconcileError::LocallyAuthored(local.clone())));
        let err = remote_commit(&mut board, Some(&local), "t".into(), local.clone(), rect("mine", 2.0, 2.0));
        assert_eq!(err, Err(ReconcileError::LocallyAuthored(local.clone())));

        assert!(remote_erase(&mut board, Some(&local), &[local.clone()]).is_empty());
        assert!(board.document().contains(&local));
        assert_eq!(board.history().len(), 1);
    }

    #[test]
    fn test_late_provisional_ops_after_commit() {
        let mut board = Board::default();
        remote_commit(&mut board, None, "t1".into(), "f1".into(), rect("f1", 5.0, 5.0)).unwrap();
        let history = board.history().len();

        let late = remote_start(&mut board, None, "t1".into(), rect("t1", 0.0, 0.0));
        assert_eq!(late, Err(ReconcileError::Duplicate("t1".into())));
        let late = remote_patch(&mut board, None, &"t1".into(), &ElementPatch::end(1.0, 1.0));
        assert_eq!(late, Err(ReconcileError::Stale("t1".into())));
        let late = remote_extend(&mut board, None, &"t1".into(), &[Point::ZERO]);
        assert_eq!(late, Err(ReconcileError::Stale("t1".into())));

        let ids: Vec<&str> = board.document().ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["f1"]);
        assert_eq!(board.history().len(), history);
    }

    #[test]
    fn test_commit_acknowledges_local_element() {
        let mut board = Board::default();
        board.document_mut().push(rect("t1", 5.0, 5.0)).unwrap();
        board.commit();
        board.document_mut().push(rect("t2", 1.0, 1.0)).unwrap();
        board.commit();

        remote_commit(&mut board, None, "t1".into(), "f1".into(), rect("f1", 5.0, 5.0)).unwrap();
        assert_eq!(board.history().len(), 3);
        assert_eq!(board.history().cursor(), 2);
        let ids: Vec<&str> = board.document().ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["f1", "t2"]);
        assert_eq!(board.final_id(&"t1".into()), Some(&ElementId::from("f1")));

        assert!(board.undo());
        assert!(board.document().contains(&"f1".into()));
        assert!(!board.document().contains(&"t1".into()));

        let removed = remote_erase(&mut board, None, &["f1".into()]);
        assert_eq!(removed, vec![ElementId::from("f1")]);
    }

    #[test]
    fn test_operation_conversion() {
        let op = Operation::Commit {
            temp_id: "t".into(),
            final_id: None,
            element: rect("t", 1.0, 1.0),
        };
        match RemoteOperation::try_from(op).unwrap() {
            RemoteOperation::Commit { final_id, .. } => assert_eq!(final_id.as_str(), "t"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(RemoteOperation::try_from(Operation::Join).is_err());
    }
}
