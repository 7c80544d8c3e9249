//! TCP Server
//!
//! Accepts connections and spawns one handler task per client.
//!
//! ## Shutdown
//!
//! ```text
//!   shutdown future resolves
//!        │
//!        ├─> stop accepting, drop the listener
//!        ├─> broadcast `true` on the watch channel
//!        │     idle handlers exit at once
//!        │     busy handlers finish the current request first
//!        └─> wait up to `shutdown_grace`, then abort stragglers
//! ```

use crate::commands::CommandHandler;
use crate::config::Config;
use crate::connection::{handle_connection, ConnectionStats};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The relay's listening side.
pub struct Server {
    listener: TcpListener,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    max_frame_size: usize,
    shutdown_grace: Duration,
}

impl Server {
    /// Binds the listener described by `config`.
    pub async fn bind(config: &Config, command_handler: CommandHandler) -> io::Result<Self> {
        let listener = TcpListener::bind(config.bind_address()).await?;
        info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            command_handler,
            stats: Arc::new(ConnectionStats::new()),
            max_frame_size: config.max_frame_size,
            shutdown_grace: config.shutdown_grace,
        })
    }

    /// The address actually bound (useful when binding port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared connection statistics.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Accepts connections until `shutdown` resolves, then drains handlers.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        let Server {
            listener,
            command_handler,
            stats,
            max_frame_size,
            shutdown_grace,
        } = self;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut handlers = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping server...");
                    break;
                }
                // Reap finished handlers so the set does not grow unbounded
                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!(error = %e, "Connection handler panicked");
                        }
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!(client = %addr, "Accepted connection");
                        handlers.spawn(handle_connection(
                            stream,
                            addr,
                            command_handler.clone(),
                            Arc::clone(&stats),
                            shutdown_rx.clone(),
                            Some(max_frame_size),
                        ));
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        let _ = shutdown_tx.send(true);

        let in_flight = handlers.len();
        if in_flight > 0 {
            info!(connections = in_flight, "Waiting for open connections to finish");
        }

        let drained = tokio::time::timeout(shutdown_grace, async {
            while handlers.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = handlers.len(),
                "Shutdown grace period elapsed, aborting remaining connections"
            );
            handlers.shutdown().await;
        }

        info!(
            connections = stats.connections_accepted.load(Ordering::Relaxed),
            commands = stats.commands_processed.load(Ordering::Relaxed),
            bytes_in = stats.bytes_read.load(Ordering::Relaxed),
            bytes_out = stats.bytes_written.load(Ordering::Relaxed),
            "Server stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{init_schema, Store, StoreConfig};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;
    use tokio::time::{sleep, timeout};

    async fn start() -> (
        tempfile::TempDir,
        SocketAddr,
        Arc<ConnectionStats>,
        oneshot::Sender<()>,
        tokio::task::JoinHandle<()>,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::new(StoreConfig::new(dir.path().join("relay.db"))));
        init_schema(&store).unwrap();

        let config = Config {
            port: 0,
            shutdown_grace: Duration::from_secs(2),
            ..Config::default()
        };
        let server = Server::bind(&config, CommandHandler::new(store)).await.unwrap();
        let addr = server.local_addr().unwrap();
        let stats = server.stats();

        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run(async {
            let _ = rx.await;
        }));
        (dir, addr, stats, tx, task)
    }

    async fn roundtrip(client: &mut TcpStream, command: &str) -> String {
        client.write_all(format!("{}\0", command).as_bytes()).await.unwrap();
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            client.read_exact(&mut byte).await.unwrap();
            if byte[0] == 0 {
                return String::from_utf8(out).unwrap();
            }
            out.push(byte[0]);
        }
    }

    #[tokio::test]
    async fn test_serves_many_clients() {
        let (_dir, addr, stats, tx, task) = start().await;

        let mut a = TcpStream::connect(addr).await.unwrap();
        let mut b = TcpStream::connect(addr).await.unwrap();

        assert_eq!(
            roundtrip(&mut a, "INSERT INTO users (username, password) VALUES ('a', 'pw')").await,
            "done"
        );
        assert_eq!(
            roundtrip(&mut b, "SELECT username FROM users").await,
            "SUCCESS|('a',)"
        );
        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 2);

        tx.send(()).unwrap();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_accepting_and_closes_idle_clients() {
        let (_dir, addr, stats, tx, task) = start().await;

        let mut idle = TcpStream::connect(addr).await.unwrap();
        assert_eq!(roundtrip(&mut idle, "SELECT 1").await, "SUCCESS|(1,)");

        tx.send(()).unwrap();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();

        // The idle client sees the connection closed
        let mut buf = [0u8; 8];
        let n = timeout(Duration::from_secs(1), idle.read(&mut buf))
            .await
            .unwrap()
            .unwrap_or(0);
        assert_eq!(n, 0);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        // Nobody is listening any more
        sleep(Duration::from_millis(20)).await;
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
