//! TCP accept loop.

use crate::config::Config;
use crate::error::ServerError;
use crate::service::Service;
use dashmap::DashMap;
use muxrpc_transport::{Connection, ConnectionObserver, TcpConfig, TcpConnection, TransportError};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

/// Listener statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub connections_rejected: AtomicU64,
}

type LiveConnections = DashMap<u64, Arc<TcpConnection>>;

/// Accepts TCP connections and attaches a `Service` to each.
pub struct Listener {
    listener: TcpListener,
    config: Config,
    stats: Arc<ServerStats>,
    live: Arc<LiveConnections>,
    next_conn_id: AtomicU64,
}

impl Listener {
    /// Binds to `config.network.bind_addr`.
    pub async fn bind(config: Config) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.network.bind_addr).await?;
        Ok(Self {
            listener,
            config,
            stats: Arc::new(ServerStats::default()),
            live: Arc::new(DashMap::new()),
            next_conn_id: AtomicU64::new(1),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until `service.stop()` is called, then closes
    /// every connection still open.
    pub async fn run<Req: 'static, Resp: 'static>(
        &self,
        service: &Service<Req, Resp>,
    ) -> Result<(), ServerError> {
        tracing::info!("Listening on {}", self.local_addr()?);

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.accept(stream, addr, service),
                        Err(e) => tracing::error!("Accept error: {}", e),
                    }
                }
                _ = service.run() => {
                    tracing::info!("Listener shutting down");
                    break;
                }
            }
        }

        self.close_all();
        Ok(())
    }

    fn accept<Req: 'static, Resp: 'static>(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
        service: &Service<Req, Resp>,
    ) {
        if self.stats.connections_active.load(Ordering::Relaxed)
            >= self.config.network.max_connections as u64
        {
            tracing::warn!("Connection limit reached, rejecting {}", addr);
            self.stats.connections_rejected.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
        self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

        let tcp = TcpConfig::new(addr)
            .with_max_frame_size(self.config.transport.max_frame_size)
            .with_read_buffer_size(self.config.transport.read_buffer_size);
        let conn = TcpConnection::from_stream(stream, tcp);

        let id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        self.live.insert(id, conn.clone());
        conn.subscribe(Arc::new(ConnectionTracker {
            id,
            addr,
            stats: self.stats.clone(),
            live: self.live.clone(),
        }));
        service.serve(&*conn);

        if let Err(e) = conn.start() {
            tracing::warn!("Failed to start connection from {}: {}", addr, e);
            conn.close();
            return;
        }
        tracing::info!("Client connected: {}", addr);
    }

    fn close_all(&self) {
        let open: Vec<Arc<TcpConnection>> = self.live.iter().map(|e| e.value().clone()).collect();
        for conn in open {
            conn.close();
        }
    }

    /// Returns listener statistics.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Returns the number of connections currently open.
    pub fn active_connections(&self) -> usize {
        self.live.len()
    }
}

/// Releases a connection's slot when it closes.
struct ConnectionTracker {
    id: u64,
    addr: SocketAddr,
    stats: Arc<ServerStats>,
    live: Arc<LiveConnections>,
}

impl ConnectionObserver for ConnectionTracker {
    fn on_close(&self, _conn: &dyn Connection, reason: Option<&TransportError>) {
        if self.live.remove(&self.id).is_some() {
            self.stats.connections_active.fetch_sub(1, Ordering::Relaxed);
        }
        match reason {
            Some(e) => tracing::info!("Client disconnected: {} ({})", self.addr, e),
            None => tracing::info!("Client disconnected: {}", self.addr),
        }
    }
}
