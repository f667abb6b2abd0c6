//! In-process relay.
//!
//! Behaves like the board server: peers join per-board rooms, frames are forwarded to every
//! other peer in the room, and commits without a final id get one assigned. The author gets
//! the commit back with its final id so it can re-key its own copy. Erase frames that name a
//! temporary id are rewritten to the assigned final id.

use super::{ConnectionState, Transport, TransportEvent};
use crate::elements::ElementId;
use crate::error::TransportError;
use crate::protocol::{Envelope, Operation};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

type Inbox = Rc<RefCell<VecDeque<TransportEvent>>>;

struct Peer {
    board: Option<String>,
    inbox: Inbox,
}

#[derive(Default)]
struct RelayState {
    next_peer: usize,
    next_final: u64,
    peers: HashMap<usize, Peer>,
    /// Temporary id to final id, per board.
    aliases: HashMap<String, HashMap<ElementId, ElementId>>,
}

fn encode(frame: &Envelope) -> Option<String> {
    match frame.encode() {
        Ok(text) => Some(text),
        Err(e) => {
            log::warn!("Relay could not encode {}: {e}", frame.op.name());
            None
        }
    }
}

impl RelayState {
    fn broadcast(&self, from: usize, frame: &Envelope) {
        let Some(text) = encode(frame) else {
            return;
        };
        for (&id, peer) in &self.peers {
            if id != from && peer.board.as_deref() == Some(frame.board_id.as_str()) {
                peer.inbox.borrow_mut().push_back(TransportEvent::Message(text.clone()));
            }
        }
    }

    fn reply(&self, to: usize, frame: &Envelope) {
        if let (Some(peer), Some(text)) = (self.peers.get(&to), encode(frame)) {
            peer.inbox.borrow_mut().push_back(TransportEvent::Message(text));
        }
    }

    /// Forget a board's id aliases once nobody is left in its room.
    fn prune(&mut self, board: &str) {
        let occupied = self.peers.values().any(|p| p.board.as_deref() == Some(board));
        if !occupied && self.aliases.remove(board).is_some() {
            log::debug!("Board {board} is empty, dropping its id aliases");
        }
    }

    fn remove_peer(&mut self, id: usize) {
        if let Some(board) = self.peers.remove(&id).and_then(|p| p.board) {
            self.prune(&board);
        }
    }

    fn route(&mut self, from: usize, frame: &Envelope) {
        let joined = self.peers.get(&from).and_then(|p| p.board.clone());
        match &frame.op {
            Operation::Join => {
                if let Some(peer) = self.peers.get_mut(&from) {
                    log::debug!("Peer {from} joined board {}", frame.board_id);
                    peer.board = Some(frame.board_id.clone());
                }
                return;
            }
            Operation::Leave => {
                if let Some(peer) = self.peers.get_mut(&from) {
                    log::debug!("Peer {from} left board {}", frame.board_id);
                    if let Some(board) = peer.board.take() {
                        self.prune(&board);
                    }
                }
                return;
            }
            _ => {}
        }
        if joined.as_deref() != Some(frame.board_id.as_str()) {
            log::debug!("Peer {from} sent {} to unjoined board {}", frame.op.name(), frame.board_id);
            return;
        }

        let mut frame = frame.clone();
        let aliases = self.aliases.entry(frame.board_id.clone()).or_default();
        let mut acknowledge = false;
        match &mut frame.op {
            Operation::Commit { temp_id, final_id, .. } if final_id.is_none() => {
                self.next_final += 1;
                let assigned = ElementId::new(format!("f{}", self.next_final));
                aliases.insert(temp_id.clone(), assigned.clone());
                *final_id = Some(assigned);
                acknowledge = true;
            }
            Operation::Erase { element_ids } => {
                for id in element_ids.iter_mut() {
                    if let Some(alias) = aliases.get(id) {
                        *id = alias.clone();
                    }
                }
            }
            _ => {}
        }
        self.broadcast(from, &frame);
        if acknowledge {
            self.reply(from, &frame);
        }
    }
}

/// Shared in-memory relay. Cloning yields another handle to the same relay.
#[derive(Clone, Default)]
pub struct MemoryRelay {
    state: Rc<RefCell<RelayState>>,
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new connection to the relay.
    pub fn connect(&self) -> MemoryTransport {
        let mut state = self.state.borrow_mut();
        let id = state.next_peer;
        state.next_peer += 1;
        let inbox: Inbox = Rc::default();
        inbox.borrow_mut().push_back(TransportEvent::Connected);
        state.peers.insert(
            id,
            Peer {
                board: None,
                inbox: inbox.clone(),
            },
        );
        MemoryTransport {
            id,
            relay: self.clone(),
            inbox,
            state: ConnectionState::Connecting,
        }
    }

    /// Number of connected peers that joined `board_id`.
    pub fn peer_count(&self, board_id: &str) -> usize {
        self.state
            .borrow()
            .peers
            .values()
            .filter(|p| p.board.as_deref() == Some(board_id))
            .count()
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.state.borrow().peers.len()
    }
}

/// One peer's connection to a [`MemoryRelay`].
pub struct MemoryTransport {
    id: usize,
    relay: MemoryRelay,
    inbox: Inbox,
    state: ConnectionState,
}

impl Transport for MemoryTransport {
    fn send(&mut self, frame: &Envelope) -> Result<(), TransportError> {
        if self.state == ConnectionState::Disconnected {
            return Err(TransportError::Unavailable);
        }
        self.relay.state.borrow_mut().route(self.id, frame);
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        let events: Vec<TransportEvent> = self.inbox.borrow_mut().drain(..).collect();
        for event in &events {
            match event {
                TransportEvent::Connected => self.state = ConnectionState::Connected,
                TransportEvent::Disconnected => self.state = ConnectionState::Disconnected,
                TransportEvent::Error { .. } => self.state = ConnectionState::Error,
                TransportEvent::Message(_) => {}
            }
        }
        events
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn disconnect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.relay.state.borrow_mut().remove_peer(self.id);
        self.inbox.borrow_mut().clear();
        self.state = ConnectionState::Disconnected;
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Element, ElementKind, ElementStyle};

    fn messages(transport: &mut MemoryTransport) -> Vec<Envelope> {
        transport
            .poll_events()
            .into_iter()
            .filter_map(|event| match event {
                TransportEvent::Message(text) => Envelope::parse(&text).ok(),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_rooms_and_no_echo() {
        let relay = MemoryRelay::new();
        let mut a = relay.connect();
        let mut b = relay.connect();
        let mut c = relay.connect();
        a.send(&Envelope::new("b1", Operation::Join)).unwrap();
        b.send(&Envelope::new("b1", Operation::Join)).unwrap();
        c.send(&Envelope::new("b2", Operation::Join)).unwrap();
        assert_eq!(relay.peer_count("b1"), 2);

        a.send(&Envelope::new("b1", Operation::Erase { element_ids: vec!["x".into()] }))
            .unwrap();
        assert!(messages(&mut a).is_empty());
        assert_eq!(messages(&mut b).len(), 1);
        assert!(messages(&mut c).is_empty());
    }

    #[test]
    fn test_commit_gets_final_id_and_erase_is_rewritten() {
        let relay = MemoryRelay::new();
        let mut a = relay.connect();
        let mut b = relay.connect();
        a.send(&Envelope::new("b1", Operation::Join)).unwrap();
        b.send(&Envelope::new("b1", Operation::Join)).unwrap();

        let element = Element::create("t1".into(), ElementKind::Line, 0.0, 0.0, 1.0, 1.0, ElementStyle::default());
        a.send(&Envelope::new(
            "b1",
            Operation::Commit {
                temp_id: "t1".into(),
                final_id: None,
                element,
            },
        ))
        .unwrap();
        a.send(&Envelope::new("b1", Operation::Erase { element_ids: vec!["t1".into()] }))
            .unwrap();

        let received = messages(&mut b);
        assert!(matches!(
            &received[0].op,
            Operation::Commit { final_id: Some(id), .. } if id.as_str() == "f1"
        ));
        assert!(matches!(
            &received[1].op,
            Operation::Erase { element_ids } if element_ids == &vec![ElementId::from("f1")]
        ));

        let echoed = messages(&mut a);
        assert_eq!(echoed.len(), 1);
        assert!(matches!(
            &echoed[0].op,
            Operation::Commit { temp_id, final_id: Some(id), .. }
                if temp_id.as_str() == "t1" && id.as_str() == "f1"
        ));
    }

    #[test]
    fn test_commit_with_final_id_is_not_echoed() {
        let relay = MemoryRelay::new();
        let mut a = relay.connect();
        a.send(&Envelope::new("b1", Operation::Join)).unwrap();
        let element = Element::create("f9".into(), ElementKind::Line, 0.0, 0.0, 1.0, 1.0, ElementStyle::default());
        a.send(&Envelope::new(
            "b1",
            Operation::Commit {
                temp_id: "t9".into(),
                final_id: Some("f9".into()),
                element,
            },
        ))
        .unwrap();
        assert!(messages(&mut a).is_empty());
    }

    #[test]
    fn test_aliases_dropped_when_room_empties() {
        let relay = MemoryRelay::new();
        let mut a = relay.connect();
        let mut b = relay.connect();
        a.send(&Envelope::new("b1", Operation::Join)).unwrap();
        b.send(&Envelope::new("b1", Operation::Join)).unwrap();
        let element = Element::create("t1".into(), ElementKind::Line, 0.0, 0.0, 1.0, 1.0, ElementStyle::default());
        a.send(&Envelope::new(
            "b1",
            Operation::Commit {
                temp_id: "t1".into(),
                final_id: None,
                element,
            },
        ))
        .unwrap();
        assert!(relay.state.borrow().aliases.contains_key("b1"));

        a.send(&Envelope::new("b1", Operation::Leave)).unwrap();
        assert!(relay.state.borrow().aliases.contains_key("b1"));
        b.disconnect();
        assert!(!relay.state.borrow().aliases.contains_key("b1"));
    }

    #[test]
    fn test_disconnect_deregisters() {
        let relay = MemoryRelay::new();
        let mut a = relay.connect();
        a.send(&Envelope::new("b1", Operation::Join)).unwrap();
        assert_eq!(a.poll_events(), vec![TransportEvent::Connected]);
        assert!(a.is_connected());

        a.disconnect();
        assert_eq!(relay.peer_count("b1"), 0);
        assert_eq!(relay.connection_count(), 0);
        assert_eq!(
            a.send(&Envelope::new("b1", Operation::Leave)),
            Err(TransportError::Unavailable)
        );

        {
            let _dropped = relay.connect();
            assert_eq!(relay.connection_count(), 1);
        }
        assert_eq!(relay.connection_count(), 0);
    }

    #[test]
    fn test_unjoined_sender_is_ignored() {
        let relay = MemoryRelay::new();
        let mut a = relay.connect();
        let mut b = relay.connect();
        b.send(&Envelope::new("b1", Operation::Join)).unwrap();
        a.send(&Envelope::new("b1", Operation::Erase { element_ids: vec![] }))
            .unwrap();
        assert!(messages(&mut b).is_empty());
    }
}
