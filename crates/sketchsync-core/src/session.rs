//! Session facade tying the board, local interaction and transport together.

use crate::board::{Board, Document, LoadReport};
use crate::config::SessionConfig;
use crate::elements::ElementId;
use crate::error::{ProtocolError, ReconcileError};
use crate::history::History;
use crate::interaction::{Interaction, InteractionState, Tool};
use crate::protocol::{Envelope, Operation};
use crate::reconcile::{self, RemoteOperation};
use crate::toolbox::Toolbox;
use crate::transport::{Transport, TransportEvent};
use kurbo::Point;

/// One participant's view of a shared board.
///
/// Joining announces the session to the relay; dropping it (or calling [`Session::leave`])
/// announces the departure and closes the transport.
pub struct Session<T: Transport> {
    config: SessionConfig,
    board: Board,
    interaction: Interaction,
    toolbox: Toolbox,
    transport: T,
    joined: bool,
}

impl<T: Transport> Session<T> {
    /// Create a session for `config.board_id` and announce it on `transport`.
    pub fn join(config: SessionConfig, transport: T) -> Self {
        let mut session = Self {
            board: Board::new(config.history_limit),
            interaction: Interaction::new(config.eraser_tolerance),
            toolbox: Toolbox::new(),
            config,
            transport,
            joined: true,
        };
        log::info!("Joining board {}", session.config.board_id);
        session.emit(Operation::Join);
        session
    }

    /// Announce departure and close the transport. Later calls do nothing.
    pub fn leave(&mut self) {
        if !self.joined {
            return;
        }
        log::info!("Leaving board {}", self.config.board_id);
        self.emit(Operation::Leave);
        self.joined = false;
        self.transport.disconnect();
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn document(&self) -> &Document {
        self.board.document()
    }

    pub fn history(&self) -> &History {
        self.board.history()
    }

    pub fn interaction_state(&self) -> &InteractionState {
        self.interaction.state()
    }

    pub fn tool(&self) -> Tool {
        self.interaction.tool()
    }

    /// Element currently waiting for text input.
    pub fn editing_text(&self) -> Option<&ElementId> {
        self.interaction.editing_text()
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    pub fn toolbox_mut(&mut self) -> &mut Toolbox {
        &mut self.toolbox
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Replace the document with a fetched element list.
    pub fn load(&mut self, raw: Vec<serde_json::Value>) -> LoadReport {
        self.board.load(raw)
    }

    pub fn change_tool(&mut self, tool: Tool) {
        self.interaction.change_tool(tool);
    }

    pub fn pointer_down(&mut self, point: Point) {
        let style = self.toolbox.style_for(self.interaction.tool());
        let ops = self.interaction.pointer_down(&mut self.board, point, style);
        self.emit_all(ops);
    }

    pub fn pointer_move(&mut self, point: Point) {
        let ops = self.interaction.pointer_move(&mut self.board, point);
        self.emit_all(ops);
        if self.config.emit_cursor {
            self.emit(Operation::Cursor {
                x: point.x,
                y: point.y,
                color: self.config.cursor_color,
                name: self.config.display_name.clone(),
            });
        }
    }

    pub fn pointer_up(&mut self) {
        let ops = self.interaction.pointer_up(&mut self.board);
        self.emit_all(ops);
    }

    pub fn text_blur(&mut self, content: &str) {
        let ops = self.interaction.text_blur(&mut self.board, content);
        self.emit_all(ops);
    }

    pub fn undo(&mut self) -> bool {
        self.board.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.board.redo()
    }

    /// Apply a remote operation. Soft failures are logged and returned.
    pub fn apply_remote(&mut self, op: RemoteOperation) -> Result<(), ReconcileError> {
        let result = reconcile::apply(&mut self.board, self.interaction.in_progress(), op);
        if let Err(e) = &result {
            log::debug!("Dropped remote operation: {e}");
        }
        result
    }

    /// Decode one inbound frame and apply it.
    ///
    /// Frames that decode but leave the board untouched (stale, duplicate, locally authored)
    /// come back as [`ProtocolError::NotApplied`].
    pub fn handle_message(&mut self, text: &str) -> Result<(), ProtocolError> {
        let op = Envelope::decode(text, &self.config.board_id)?;
        let op = RemoteOperation::try_from(op)?;
        self.apply_remote(op)?;
        Ok(())
    }

    /// Drain the transport and apply everything received. Returns the number of frames read.
    pub fn pump(&mut self) -> usize {
        let mut frames = 0;
        for event in self.transport.poll_events() {
            match event {
                TransportEvent::Message(text) => {
                    frames += 1;
                    match self.handle_message(&text) {
                        Ok(()) => {}
                        Err(ProtocolError::OutboundOnly(name)) => log::debug!("Ignoring inbound {name}"),
                        Err(ProtocolError::NotApplied(_)) => {}
                        Err(e) => log::warn!("Dropping inbound frame: {e}"),
                    }
                }
                TransportEvent::Connected => log::info!("Connected to relay"),
                TransportEvent::Disconnected => log::info!("Disconnected from relay"),
                TransportEvent::Error { message } => log::warn!("Transport error: {message}"),
            }
        }
        frames
    }

    fn emit_all(&mut self, ops: Vec<Operation>) {
        for op in ops {
            self.emit(op);
        }
    }

    /// Best effort: failures are logged and the frame is dropped.
    fn emit(&mut self, op: Operation) {
        if !self.joined {
            log::debug!("Not joined, dropping {}", op.name());
            return;
        }
        let name = op.name();
        let frame = Envelope::new(self.config.board_id.clone(), op);
        if let Err(e) = self.transport.send(&frame) {
            log::warn!("Dropping outbound {name}: {e}");
        }
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.leave();
    }
}
