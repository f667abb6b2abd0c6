//! Connections to the board relay.
//!
//! A session talks to the relay through the [`Transport`] trait: frames go out with
//! [`Transport::send`], inbound traffic is drained with [`Transport::poll_events`] without
//! blocking.

mod memory;
mod websocket;

pub use memory::{MemoryRelay, MemoryTransport};
pub use websocket::WebSocketTransport;

use crate::error::TransportError;
use crate::protocol::Envelope;
use std::cell::RefCell;
use std::rc::Rc;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events produced by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    /// A text frame from the relay.
    Message(String),
    Error { message: String },
}

/// Bidirectional frame channel to the relay.
pub trait Transport {
    /// Queue a frame for delivery.
    fn send(&mut self, frame: &Envelope) -> Result<(), TransportError>;

    /// Drain pending events (non-blocking).
    fn poll_events(&mut self) -> Vec<TransportEvent>;

    fn state(&self) -> ConnectionState;

    /// Close the connection. Calling it again is harmless.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, frame: &Envelope) -> Result<(), TransportError> {
        (**self).send(frame)
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        (**self).poll_events()
    }

    fn state(&self) -> ConnectionState {
        (**self).state()
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }
}

/// A shared connection. Borrows are held only for the duration of each call.
impl<T: Transport> Transport for Rc<RefCell<T>> {
    fn send(&mut self, frame: &Envelope) -> Result<(), TransportError> {
        self.try_borrow_mut()
            .map_err(|_| TransportError::Unavailable)?
            .send(frame)
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        match self.try_borrow_mut() {
            Ok(mut inner) => inner.poll_events(),
            Err(_) => Vec::new(),
        }
    }

    fn state(&self) -> ConnectionState {
        match self.try_borrow() {
            Ok(inner) => inner.state(),
            Err(_) => ConnectionState::Disconnected,
        }
    }

    fn disconnect(&mut self) {
        if let Ok(mut inner) = self.try_borrow_mut() {
            inner.disconnect();
        }
    }
}
