//! TCP connection.
//!
//! Frames are carried in `u32` length envelopes. Each established connection
//! runs two background tasks: a writer draining an unbounded queue filled by
//! `send`, and a reader splitting the stream into frames and feeding
//! observers in arrival order.

use crate::connection::{Connection, ConnectionObserver, LinkState, ObserverSet, StateCell};
use crate::error::TransportError;
use bytes::Bytes;
use muxrpc_protocol::{Decoder, Encoder, MAX_FRAME_SIZE};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// TCP connection configuration.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Peer address (used by `connect`).
    pub addr: SocketAddr,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Largest frame accepted or sent.
    pub max_frame_size: u32,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
}

impl TcpConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: Duration::from_secs(10),
            max_frame_size: MAX_FRAME_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_max_frame_size(mut self, size: u32) -> Self {
        self.max_frame_size = size;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }
}

/// A muxrpc connection over TCP.
pub struct TcpConnection {
    config: TcpConfig,
    state: StateCell,
    observers: ObserverSet,
    /// Queue feeding the writer task.
    outbound: Mutex<Option<mpsc::UnboundedSender<Bytes>>>,
    /// Accepted stream waiting for `start`.
    accepted: Mutex<Option<TcpStream>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    peer_addr: Mutex<Option<SocketAddr>>,
}

impl TcpConnection {
    /// Creates a client connection (not yet connected).
    pub fn new(config: TcpConfig) -> Arc<Self> {
        Arc::new(Self::with_stream(config, None))
    }

    /// Wraps an accepted stream. Observers should subscribe before `start`.
    pub fn from_stream(stream: TcpStream, config: TcpConfig) -> Arc<Self> {
        Arc::new(Self::with_stream(config, Some(stream)))
    }

    fn with_stream(config: TcpConfig, stream: Option<TcpStream>) -> Self {
        Self {
            config,
            state: StateCell::new(),
            observers: ObserverSet::default(),
            outbound: Mutex::new(None),
            accepted: Mutex::new(stream),
            reader: Mutex::new(None),
            peer_addr: Mutex::new(None),
        }
    }

    /// Connects to `config.addr` and starts the background tasks.
    pub async fn connect(self: &Arc<Self>) -> Result<(), TransportError> {
        tracing::debug!("Connecting to {}...", self.config.addr);

        let stream = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(self.config.addr),
        )
        .await
        .map_err(|_| {
            tracing::debug!("Connection timeout");
            TransportError::Timeout
        })?
        .map_err(|e| {
            tracing::debug!("Connection failed: {}", e);
            TransportError::Io(e)
        })?;

        self.run(stream)
    }

    /// Starts the background tasks on an accepted stream.
    pub fn start(self: &Arc<Self>) -> Result<(), TransportError> {
        let stream = self
            .accepted
            .lock()
            .take()
            .ok_or(TransportError::NotConnected)?;
        self.run(stream)
    }

    fn run(self: &Arc<Self>, stream: TcpStream) -> Result<(), TransportError> {
        stream.set_nodelay(true).ok();
        *self.peer_addr.lock() = stream.peer_addr().ok();

        if !self.state.open() {
            return Err(TransportError::Closed);
        }

        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        *self.outbound.lock() = Some(tx);

        tokio::spawn(Self::write_loop(self.clone(), write_half, rx));

        // on_connect is delivered before the reader can produce data events
        self.observers.connected(&**self);

        let reader = tokio::spawn(Self::read_loop(self.clone(), read_half));
        *self.reader.lock() = Some(reader);

        tracing::debug!("Connection established with {:?}", self.peer_addr());
        Ok(())
    }

    async fn write_loop(
        conn: Arc<Self>,
        mut writer: OwnedWriteHalf,
        mut rx: mpsc::UnboundedReceiver<Bytes>,
    ) {
        while let Some(envelope) = rx.recv().await {
            if let Err(e) = writer.write_all(&envelope).await {
                tracing::debug!("write failed: {}", e);
                conn.shutdown(Some(TransportError::Io(e)));
                return;
            }
        }
        let _ = writer.shutdown().await;
    }

    async fn read_loop(conn: Arc<Self>, mut reader: OwnedReadHalf) {
        let mut decoder = Decoder::with_max_frame_size(conn.config.max_frame_size);
        let mut buf = vec![0u8; conn.config.read_buffer_size];

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => {
                    tracing::debug!("read_loop: connection closed by peer");
                    conn.shutdown(None);
                    return;
                }
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!("read_loop: read failed: {}", e);
                    conn.shutdown(Some(TransportError::Io(e)));
                    return;
                }
            };

            decoder.extend(&buf[..n]);
            loop {
                match decoder.decode_envelope() {
                    Ok(Some(frame)) => conn.observers.data(&*conn, frame),
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("read_loop: dropping connection: {}", e);
                        conn.shutdown(Some(TransportError::Protocol(e)));
                        return;
                    }
                }
            }
        }
    }

    /// Closes the connection and notifies observers once.
    pub fn close(&self) {
        self.shutdown(None);
    }

    fn shutdown(&self, reason: Option<TransportError>) {
        if !self.state.close() {
            return;
        }

        // Dropping the sender lets the writer flush queued frames, then shut down.
        self.outbound.lock().take();
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }

        tracing::debug!("Connection to {:?} closed", self.peer_addr());
        self.observers.closed(self, reason.as_ref());
    }

    /// Returns the remote address once the connection is established.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        *self.peer_addr.lock()
    }

    pub fn state(&self) -> LinkState {
        self.state.get()
    }
}

impl Connection for TcpConnection {
    fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        self.state.check_sendable()?;
        let envelope = Encoder::encode_envelope_with_limit(&frame, self.config.max_frame_size)?;

        let outbound = self.outbound.lock();
        let tx = outbound.as_ref().ok_or(TransportError::Closed)?;
        tx.send(envelope).map_err(|_| TransportError::Closed)
    }

    fn is_connected(&self) -> bool {
        self.state.get() == LinkState::Connected
    }

    fn is_closed(&self) -> bool {
        self.state.get() == LinkState::Closed
    }

    fn subscribe(&self, observer: Arc<dyn ConnectionObserver>) {
        self.observers.add(observer);
    }
}
