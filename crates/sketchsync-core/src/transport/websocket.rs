//! Native WebSocket transport.
//!
//! Socket I/O runs on a background thread; the session side only touches channels.

use super::{ConnectionState, Transport, TransportEvent};
use crate::error::TransportError;
use crate::protocol::Envelope;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, connect};
use url::Url;

/// How long a socket read may block before the thread checks for outgoing frames.
const READ_TIMEOUT: Duration = Duration::from_millis(50);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Commands sent to the socket thread.
enum Command {
    Send(String),
    Close,
}

/// WebSocket client running on its own thread.
pub struct WebSocketTransport {
    url: Url,
    state: ConnectionState,
    cmd_tx: Option<Sender<Command>>,
    event_rx: Option<Receiver<TransportEvent>>,
    _thread: Option<JoinHandle<()>>,
}

impl WebSocketTransport {
    /// Validate `url` (`ws` or `wss`) and start connecting in the background.
    pub fn connect(url: &str) -> Result<Self, TransportError> {
        let url = Url::parse(url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme {}",
                url.scheme()
            )));
        }

        let (cmd_tx, cmd_rx) = channel::<Command>();
        let (event_tx, event_rx) = channel::<TransportEvent>();
        let target = url.to_string();
        let handle = thread::spawn(move || run_socket(target, cmd_rx, event_tx));

        Ok(Self {
            url,
            state: ConnectionState::Connecting,
            cmd_tx: Some(cmd_tx),
            event_rx: Some(event_rx),
            _thread: Some(handle),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

fn run_socket(url: String, commands: Receiver<Command>, events: Sender<TransportEvent>) {
    log::info!("Connecting to {url}");
    let (mut socket, response) = match connect(url.as_str()) {
        Ok(pair) => pair,
        Err(e) => {
            log::error!("WebSocket connection failed: {e}");
            let _ = events.send(TransportEvent::Error {
                message: format!("Connection failed: {e}"),
            });
            return;
        }
    };
    log::info!("WebSocket connected, status: {}", response.status());
    let _ = events.send(TransportEvent::Connected);

    match socket.get_mut() {
        MaybeTlsStream::Plain(tcp) => {
            let _ = tcp.set_read_timeout(Some(READ_TIMEOUT));
            let _ = tcp.set_write_timeout(Some(WRITE_TIMEOUT));
        }
        #[allow(unreachable_patterns)]
        _ => log::debug!("Non-plain stream, relying on default timeouts"),
    }

    loop {
        match commands.try_recv() {
            Ok(Command::Send(text)) => {
                if let Err(e) = socket.send(Message::Text(text)) {
                    log::error!("WebSocket send error: {e}");
                    break;
                }
            }
            Ok(Command::Close) | Err(TryRecvError::Disconnected) => {
                log::info!("Closing WebSocket");
                let _ = socket.close(None);
                break;
            }
            Err(TryRecvError::Empty) => {}
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                if events.send(TransportEvent::Message(text)).is_err() {
                    break;
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                log::info!("WebSocket received close frame");
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                log::error!("WebSocket read error: {e}");
                let _ = events.send(TransportEvent::Error {
                    message: e.to_string(),
                });
                break;
            }
        }
    }

    log::info!("WebSocket thread exiting");
    let _ = events.send(TransportEvent::Disconnected);
}

impl Transport for WebSocketTransport {
    fn send(&mut self, frame: &Envelope) -> Result<(), TransportError> {
        let text = frame
            .encode()
            .map_err(|e| TransportError::Send(e.to_string()))?;
        match &self.cmd_tx {
            Some(tx) if self.state != ConnectionState::Disconnected && self.state != ConnectionState::Error => tx
                .send(Command::Send(text))
                .map_err(|_| TransportError::Unavailable),
            _ => Err(TransportError::Unavailable),
        }
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        let Some(rx) = &self.event_rx else {
            return Vec::new();
        };
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match &event {
                TransportEvent::Connected => self.state = ConnectionState::Connected,
                TransportEvent::Disconnected => self.state = ConnectionState::Disconnected,
                TransportEvent::Error { .. } => self.state = ConnectionState::Error,
                TransportEvent::Message(_) => {}
            }
            events.push(event);
        }
        events
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(Command::Close);
        }
        self.event_rx = None;
        self._thread = None;
        self.state = ConnectionState::Disconnected;
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}
