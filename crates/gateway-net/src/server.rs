//! POS listener.
//!
//! One acceptor task; each accepted connection is owned by a single session
//! task for its lifetime. Sessions read a frame, decode it with the POS
//! dictionary, hand it to the router and write the framed response back —
//! a single writer per connection, so request/response order is preserved
//! within a session.
//!
//! A decode or framing error closes the connection without a reply: the
//! framing can no longer be trusted.

use gateway_codec::{pack, pos_dictionary, unpack};
use gateway_router::TransactionRouter;
use gateway_telemetry::masking;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::framing::{read_pos_frame, write_pos_frame, FramingError};

/// The terminal-facing server.
pub struct PosServer {
    listener: TcpListener,
    router: Arc<TransactionRouter>,
    shutdown: watch::Receiver<bool>,
}

impl PosServer {
    /// Bind the listening socket.
    pub async fn bind(
        host: &str,
        port: u16,
        router: Arc<TransactionRouter>,
        shutdown: watch::Receiver<bool>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind((host, port)).await?;
        info!(host, port, "POS server listening");
        Ok(Self {
            listener,
            router,
            shutdown,
        })
    }

    /// Local address, useful when bound to port 0.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop. Returns when shutdown is signalled; in-flight sessions
    /// observe the same signal and drain.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((socket, peer)) => {
                            debug!(%peer, "terminal connected");
                            let router = Arc::clone(&self.router);
                            let shutdown = self.shutdown.clone();
                            tokio::spawn(session(socket, router, shutdown));
                        }
                        Err(e) => {
                            error!(error = %e, "accept failed");
                        }
                    }
                }
                _ = self.shutdown.changed() => {
                    info!("POS server stopping accept loop");
                    return;
                }
            }
        }
    }
}

/// One terminal connection.
async fn session(
    mut socket: TcpStream,
    router: Arc<TransactionRouter>,
    mut shutdown: watch::Receiver<bool>,
) {
    let peer = socket
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    loop {
        let frame = tokio::select! {
            frame = read_pos_frame(&mut socket) => frame,
            _ = shutdown.changed() => {
                debug!(peer, "session closing for shutdown");
                return;
            }
        };

        let body = match frame {
            Ok(body) => body,
            Err(FramingError::Closed) => {
                debug!(peer, "terminal disconnected");
                return;
            }
            Err(e) => {
                warn!(peer, error = %e, "framing error, closing session");
                return;
            }
        };

        let request = match unpack(pos_dictionary(), &body) {
            Ok(msg) => msg,
            Err(e) => {
                // The stream position is unknown after a decode failure;
                // no reply can safely be framed.
                warn!(peer, error = %e, "decode error, closing session");
                return;
            }
        };
        masking::log_incoming(&request, "POS_TERMINAL");

        let Some(response) = router.handle(&request).await else {
            continue;
        };
        masking::log_outgoing(&response, "POS_TERMINAL");

        let bytes = match pack(pos_dictionary(), &response) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(peer, error = %e, "response failed to pack");
                return;
            }
        };
        if let Err(e) = write_pos_frame(&mut socket, &bytes).await {
            warn!(peer, error = %e, "write failed, closing session");
            return;
        }
    }
}
