//! sketchsync core library
//!
//! The session state-synchronization engine for a shared drawing board: the element model,
//! the local interaction state machine, the undo/redo history, the reconciliation of remote
//! operations and the session facade that ties them to a transport.

pub mod board;
pub mod config;
pub mod elements;
pub mod error;
pub mod history;
pub mod interaction;
pub mod protocol;
pub mod reconcile;
pub mod session;
pub mod toolbox;
pub mod transport;

pub use board::{Board, Document, LoadReport};
pub use config::SessionConfig;
pub use elements::{Element, ElementId, ElementKind, ElementPatch, ElementStyle, SerializableColor};
pub use error::{ConfigError, ElementError, ProtocolError, ReconcileError, TransportError};
pub use history::History;
pub use interaction::{Interaction, InteractionState, Tool};
pub use protocol::{Envelope, Operation};
pub use reconcile::RemoteOperation;
pub use session::Session;
pub use toolbox::Toolbox;
pub use transport::{ConnectionState, MemoryRelay, MemoryTransport, Transport, TransportEvent, WebSocketTransport};
