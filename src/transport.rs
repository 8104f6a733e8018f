use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use tungstenite::protocol::CloseFrame;
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket, connect};

use crate::dispatch::{Outbound, Transport};
use crate::error::TransportError;
use crate::history_store::TransportConfig;

/// Close code of a clean, user-requested shutdown. No reconnect follows it.
pub const NORMAL_CLOSURE: u16 = 1000;
const ABNORMAL_CLOSURE: u16 = 1006;
const READ_TICK: Duration = Duration::from_millis(50);
const CLOSE_DRAIN_TICKS: usize = 20;
const HELLO_FRAME: &str = r#"{"command":"getcommands","payload":""}"#;

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Message(String),
    Closed { code: u16, reason: String },
    Error(String),
    Reconnecting { attempt: u32, delay: Duration },
}

enum Command {
    Send(String),
    Disconnect,
}

/// Delay before reconnect attempt `attempt` (zero based).
pub fn backoff_delay(config: &TransportConfig, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let millis = config
        .base_delay_ms
        .saturating_mul(factor)
        .min(config.max_delay_ms);
    Duration::from_millis(millis)
}

pub fn should_reconnect(config: &TransportConfig, code: u16, attempts: u32) -> bool {
    code != NORMAL_CLOSURE && attempts < config.max_reconnect_attempts
}

struct Worker {
    commands: Sender<Command>,
    stop: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

/// WebSocket client running on a background thread. Events come back through
/// [`WebSocketTransport::drain_events_limited`].
pub struct WebSocketTransport {
    url: String,
    config: TransportConfig,
    event_tx: Sender<TransportEvent>,
    event_rx: Receiver<TransportEvent>,
    connected: Arc<AtomicBool>,
    worker: Option<Worker>,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>, config: TransportConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        Self {
            url: url.into(),
            config,
            event_tx,
            event_rx,
            connected: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn drain_events_limited(&self, max_events: usize) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while events.len() < max_events {
            let Ok(event) = self.event_rx.try_recv() else {
                break;
            };
            events.push(event);
        }
        events
    }

    /// Stops the worker and waits for it, interrupting any backoff wait.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        worker.stop.store(true, Ordering::SeqCst);
        let _ = worker.commands.send(Command::Disconnect);
        if worker.handle.join().is_err() {
            tracing::error!("websocket worker panicked");
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self) {
        self.shutdown();
        let (command_tx, command_rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let session = Session {
            url: self.url.clone(),
            config: self.config.clone(),
            events: self.event_tx.clone(),
            commands: command_rx,
            connected: self.connected.clone(),
            stop: stop.clone(),
        };
        tracing::info!(url = %self.url, "connecting");
        let handle = thread::spawn(move || session.run());
        self.worker = Some(Worker {
            commands: command_tx,
            stop,
            handle,
        });
    }

    fn disconnect(&mut self) {
        if let Some(worker) = &self.worker {
            let _ = worker.commands.send(Command::Disconnect);
        }
    }

    fn send_message(&mut self, message: &Outbound) -> bool {
        if !self.is_connected() {
            return false;
        }
        let Some(worker) = &self.worker else {
            return false;
        };
        match serde_json::to_string(message) {
            Ok(text) => worker.commands.send(Command::Send(text)).is_ok(),
            Err(err) => {
                tracing::error!(%err, "failed to encode outbound frame");
                false
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn drain_events(&mut self, max_events: usize) -> Vec<TransportEvent> {
        self.drain_events_limited(max_events)
    }
}

enum Exit {
    Closed { code: u16, reason: String },
    Stopped,
}

struct Session {
    url: String,
    config: TransportConfig,
    events: Sender<TransportEvent>,
    commands: Receiver<Command>,
    connected: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl Session {
    fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    fn run(self) {
        let mut attempts = 0u32;
        loop {
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            let (code, reason) = match self.open() {
                Ok(mut socket) => {
                    attempts = 0;
                    self.connected.store(true, Ordering::SeqCst);
                    self.emit(TransportEvent::Open);
                    let exit = self.pump(&mut socket);
                    self.connected.store(false, Ordering::SeqCst);
                    match exit {
                        Exit::Closed { code, reason } => (code, reason),
                        Exit::Stopped => break,
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, url = %self.url, "websocket connect failed");
                    self.emit(TransportEvent::Error(err.to_string()));
                    (ABNORMAL_CLOSURE, String::new())
                }
            };
            tracing::info!(code, %reason, "websocket closed");
            self.emit(TransportEvent::Closed {
                code,
                reason: reason.clone(),
            });

            if !should_reconnect(&self.config, code, attempts) {
                break;
            }
            let delay = backoff_delay(&self.config, attempts);
            attempts += 1;
            self.emit(TransportEvent::Reconnecting {
                attempt: attempts,
                delay,
            });
            if !self.wait(delay) {
                break;
            }
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    fn open(&self) -> Result<Socket, TransportError> {
        let (mut socket, _) =
            connect(self.url.as_str()).map_err(|err| TransportError::Connect(err.to_string()))?;
        if let MaybeTlsStream::Plain(stream) = socket.get_mut() {
            stream
                .set_read_timeout(Some(READ_TICK))
                .map_err(|err| TransportError::Connect(err.to_string()))?;
        }
        socket.send(Message::Text(HELLO_FRAME.to_string()))?;
        Ok(socket)
    }

    /// Backoff wait. Returns false when a stop or disconnect arrives first.
    fn wait(&self, delay: Duration) -> bool {
        match self.commands.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => !self.stop.load(Ordering::SeqCst),
            Ok(Command::Send(_)) => !self.stop.load(Ordering::SeqCst),
            Ok(Command::Disconnect) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    fn pump(&self, socket: &mut Socket) -> Exit {
        let mut peer_close: Option<(u16, String)> = None;
        loop {
            if self.stop.load(Ordering::SeqCst) {
                close_socket(socket, "Client shutting down");
                return Exit::Stopped;
            }
            loop {
                match self.commands.try_recv() {
                    Ok(Command::Send(text)) => {
                        if let Err(err) = socket.send(Message::Text(text)) {
                            self.emit(TransportEvent::Error(TransportError::from(err).to_string()));
                        }
                    }
                    Ok(Command::Disconnect) => {
                        close_socket(socket, "User initiated disconnect");
                        return Exit::Closed {
                            code: NORMAL_CLOSURE,
                            reason: "User initiated disconnect".to_string(),
                        };
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        close_socket(socket, "Client shutting down");
                        return Exit::Stopped;
                    }
                }
            }

            match socket.read() {
                Ok(Message::Text(text)) => self.emit(TransportEvent::Message(text.to_string())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => self.emit(TransportEvent::Message(text)),
                    Err(_) => tracing::debug!("ignoring non-utf8 binary frame"),
                },
                Ok(Message::Close(frame)) => {
                    peer_close = Some(match frame {
                        Some(frame) => (u16::from(frame.code), frame.reason.to_string()),
                        None => (1005, String::new()),
                    });
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(err))
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    let (code, reason) =
                        peer_close.unwrap_or((ABNORMAL_CLOSURE, String::new()));
                    return Exit::Closed { code, reason };
                }
                Err(err) => {
                    self.emit(TransportEvent::Error(err.to_string()));
                    let (code, reason) =
                        peer_close.unwrap_or((ABNORMAL_CLOSURE, String::new()));
                    return Exit::Closed { code, reason };
                }
            }
        }
    }
}

fn close_socket(socket: &mut Socket, reason: &'static str) {
    let frame = CloseFrame {
        code: CloseCode::Normal,
        reason: reason.into(),
    };
    if let Err(err) = socket.close(Some(frame)) {
        tracing::debug!(%err, "close handshake failed");
        return;
    }
    for _ in 0..CLOSE_DRAIN_TICKS {
        match socket.read() {
            Ok(_) => {}
            Err(tungstenite::Error::Io(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(_) => break,
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/transport_tests.rs"]
mod tests;
