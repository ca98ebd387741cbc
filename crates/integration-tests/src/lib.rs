//! Test harness: an in-process gateway plus a scriptable mock bank.
//!
//! `start_gateway` wires the real stack (memory store, terminal service,
//! router, POS listener, optionally the bank dispatcher) on ephemeral
//! ports; `PosClient` speaks the terminal-side wire protocol against it.

use gateway_codec::{bank_dictionary, pack, pos_dictionary, unpack, IsoMessage};
use gateway_net::framing::{
    read_bank_frame, read_pos_frame, write_bank_frame, write_pos_frame,
};
use gateway_net::{BankDispatcher, PosServer};
use gateway_router::TransactionRouter;
use gateway_terminals::{MemoryStore, TerminalService, TerminalStore};
use gateway_types::GatewayConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

/// A running in-process gateway.
pub struct TestGateway {
    /// POS-side address to connect terminals to.
    pub addr: SocketAddr,
    /// The store behind the gateway, for state assertions.
    pub store: Arc<MemoryStore>,
    /// Bank dispatcher when one is attached.
    pub dispatcher: Option<Arc<BankDispatcher>>,
    shutdown: watch::Sender<bool>,
}

impl TestGateway {
    /// Signal shutdown (sessions drain, acceptor stops).
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Start a gateway. When `config.bank.port` is non-zero a real bank
/// dispatcher is attached and pointed at it; port 0 runs without a bank
/// leg (local decisions only).
pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let store = Arc::new(MemoryStore::new());
    let terminals = Arc::new(TerminalService::new(
        store.clone() as Arc<dyn TerminalStore>,
        config.terminal.clone(),
    ));

    let dispatcher = if config.bank.port != 0 {
        Some(BankDispatcher::start(
            config.bank.clone(),
            config.security.clone(),
        ))
    } else {
        None
    };

    let mut router = TransactionRouter::new(config.clone(), terminals);
    if let Some(dispatcher) = &dispatcher {
        router = router.with_bank(dispatcher.clone());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = PosServer::bind("127.0.0.1", 0, Arc::new(router), shutdown_rx)
        .await
        .expect("bind POS listener");
    let addr = server.local_addr().expect("local addr");
    tokio::spawn(server.run());

    TestGateway {
        addr,
        store,
        dispatcher,
        shutdown: shutdown_tx,
    }
}

/// Gateway with no bank leg.
pub async fn start_offline_gateway() -> TestGateway {
    let mut config = GatewayConfig::default();
    config.bank.port = 0;
    start_gateway(config).await
}

/// A mock bank on an ephemeral port.
///
/// Every received request is answered with `reply_code`; `None` makes the
/// bank swallow requests (timeout path). Captured requests are available
/// through the returned receiver.
pub async fn spawn_mock_bank(
    reply_code: Option<&'static str>,
) -> (u16, tokio::sync::mpsc::UnboundedReceiver<IsoMessage>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock bank");
    let port = listener.local_addr().unwrap().port();
    let (seen_tx, seen_rx) = tokio::sync::mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let seen_tx = seen_tx.clone();
            tokio::spawn(async move {
                while let Ok(body) = read_bank_frame(&mut socket).await {
                    let request = match unpack(bank_dictionary(), &body) {
                        Ok(msg) => msg,
                        Err(_) => break,
                    };
                    let _ = seen_tx.send(request.clone());

                    let Some(code) = reply_code else {
                        continue;
                    };
                    let mut response = IsoMessage::new(response_mti(request.mti()));
                    response.copy_fields_from(&request, &[2, 3, 4, 11, 12, 13, 41]);
                    response.set(39, code);
                    let bytes = pack(bank_dictionary(), &response).expect("pack mock response");
                    if write_bank_frame(&mut socket, &bytes).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    (port, seen_rx)
}

fn response_mti(request_mti: &str) -> &'static str {
    match request_mti {
        "0100" => "0110",
        "0400" => "0410",
        "0800" => "0810",
        _ => "0210",
    }
}

/// Terminal-side client speaking the POS wire protocol.
pub struct PosClient {
    socket: TcpStream,
}

impl PosClient {
    /// Connect to a gateway.
    pub async fn connect(addr: SocketAddr) -> Self {
        let socket = TcpStream::connect(addr).await.expect("connect to gateway");
        Self { socket }
    }

    /// Send a request and wait for the framed response.
    pub async fn exchange(&mut self, request: &IsoMessage) -> IsoMessage {
        let bytes = pack(pos_dictionary(), request).expect("pack request");
        write_pos_frame(&mut self.socket, &bytes)
            .await
            .expect("write request");
        let body = read_pos_frame(&mut self.socket).await.expect("read response");
        unpack(pos_dictionary(), &body).expect("unpack response")
    }
}
