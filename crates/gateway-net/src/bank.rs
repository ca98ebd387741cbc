//! Bank dispatcher: the outbound leg.
//!
//! One I/O task owns the upstream connection. Submitters translate the POS
//! message into the bank dialect, register a correlation entry and queue
//! the wire bytes; the I/O task connects lazily, sends, reads the response
//! and resolves the entry. Connection failures retry with exponential
//! backoff; logical declines never retry.
//!
//! Ordering: submissions are sent in queue order on a single connection.
//! No ordering is promised across concurrent submitters.

use async_trait::async_trait;
use chrono::Utc;
use gateway_codec::{bank_dictionary, pack, unpack, IsoMessage};
use gateway_crypto::transposition;
use gateway_router::{BankDispatch, DispatchError};
use gateway_telemetry::masking;
use gateway_types::{BankConfig, SecurityConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::framing::{read_bank_frame, write_bank_frame};
use crate::pending::{self, CorrelationKey, PendingStore};

/// Fields copied from the POS message onto the bank leg.
const FORWARD_FIELDS: [u8; 15] = [2, 3, 4, 7, 11, 12, 13, 14, 22, 25, 35, 41, 42, 43, 49];

/// Submission queue depth; submitters briefly backpressure when full.
const QUEUE_DEPTH: usize = 64;

/// How often the expiry sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

struct WireRequest {
    bytes: Vec<u8>,
    key: CorrelationKey,
}

/// Handle used by the router to forward transactions upstream.
pub struct BankDispatcher {
    tx: mpsc::Sender<WireRequest>,
    pending: Arc<PendingStore>,
    bank: BankConfig,
    security: SecurityConfig,
}

impl BankDispatcher {
    /// Spawn the I/O task and expiry sweep, returning the shared handle.
    pub fn start(bank: BankConfig, security: SecurityConfig) -> Arc<Self> {
        let deadline = Duration::from_millis(bank.timeout_ms as u64);
        let pending = Arc::new(PendingStore::new(deadline));
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);

        tokio::spawn(io_task(rx, Arc::clone(&pending), bank.clone()));
        tokio::spawn(pending::expiry_sweep(Arc::clone(&pending), SWEEP_INTERVAL));

        Arc::new(Self {
            tx,
            pending,
            bank,
            security,
        })
    }

    /// Requests currently awaiting a bank response.
    pub fn in_flight(&self) -> usize {
        self.pending.in_flight()
    }

    /// Translate a POS-dialect message onto the bank dialect.
    fn to_bank_message(&self, pos_msg: &IsoMessage) -> Result<IsoMessage, DispatchError> {
        let mut bank_msg = IsoMessage::new(pos_msg.mti());
        bank_msg.copy_fields_from(pos_msg, &FORWARD_FIELDS);

        // Fresh transmission stamp and reference for the upstream leg.
        bank_msg.set(7, Utc::now().format("%m%d%H%M%S").to_string());
        bank_msg.set(37, mint_rrn());

        if let Some(pinblock) = pos_msg.get(52) {
            if self.security.pin.enable_transposition {
                let pan = pos_msg
                    .get(2)
                    .ok_or_else(|| DispatchError::Codec("PAN missing for PIN leg".into()))?;
                let bank_key = self.bank_pin_key(pos_msg.get(42));
                let transposed = transposition::transpose(
                    &self.security.gateway_zonal_key,
                    bank_key,
                    pinblock,
                    pan,
                )
                .map_err(|e| DispatchError::Codec(format!("bank PIN transposition: {e}")))?;
                bank_msg.set(52, transposed);
            } else {
                bank_msg.set(52, pinblock);
            }
        }

        Ok(bank_msg)
    }

    /// Bank PIN key routed by merchant-id prefix; unknown merchants use the
    /// default key.
    fn bank_pin_key(&self, merchant_id: Option<&str>) -> &str {
        if let Some(merchant) = merchant_id {
            for (prefix, key) in &self.security.bank_keys {
                if merchant.starts_with(prefix.as_str()) {
                    return key;
                }
            }
        }
        &self.security.default_bank_key
    }
}

#[async_trait]
impl BankDispatch for BankDispatcher {
    async fn submit(&self, pos_msg: IsoMessage) -> Result<IsoMessage, DispatchError> {
        let stan = pos_msg
            .get(11)
            .ok_or_else(|| DispatchError::Codec("STAN missing, cannot correlate".into()))?
            .to_string();
        let local_date = pos_msg.get(13).unwrap_or_default().to_string();
        let key: CorrelationKey = (stan, local_date);

        let bank_msg = self.to_bank_message(&pos_msg)?;
        let bytes = pack(bank_dictionary(), &bank_msg)
            .map_err(|e| DispatchError::Codec(e.to_string()))?;
        masking::log_outgoing(&bank_msg, "BANK");

        let rx = self.pending.register(key.clone());
        if self
            .tx
            .send(WireRequest {
                bytes,
                key: key.clone(),
            })
            .await
            .is_err()
        {
            self.pending.fail(&key, DispatchError::Unavailable);
            return Err(DispatchError::Unavailable);
        }

        let deadline = Duration::from_millis(self.bank.timeout_ms as u64);
        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(result)) => result,
            // Sender dropped: the expiry sweep already resolved this entry.
            Ok(Err(_)) => Err(DispatchError::Timeout),
            Err(_) => {
                self.pending.fail(&key, DispatchError::Timeout);
                Err(DispatchError::Timeout)
            }
        }
    }
}

async fn io_task(
    mut rx: mpsc::Receiver<WireRequest>,
    pending: Arc<PendingStore>,
    config: BankConfig,
) {
    let mut connection: Option<TcpStream> = None;

    while let Some(request) = rx.recv().await {
        match exchange_with_retry(&mut connection, &request.bytes, &config).await {
            Ok(response_bytes) => match unpack(bank_dictionary(), &response_bytes) {
                Ok(response) => {
                    masking::log_incoming(&response, "BANK");
                    let response_key: CorrelationKey = (
                        response.get(11).unwrap_or_default().to_string(),
                        response.get(13).unwrap_or_default().to_string(),
                    );
                    // Unmatched responses are logged inside the store and
                    // dropped; the original submitter times out.
                    pending.complete(&response_key, response);
                }
                Err(e) => {
                    warn!(error = %e, "bank response failed to decode");
                    pending.fail(&request.key, DispatchError::Codec(e.to_string()));
                }
            },
            Err(e) => {
                pending.fail(&request.key, e);
            }
        }
    }
    debug!("bank io task stopped");
}

/// Send one frame and read one response, reconnecting with backoff on
/// connection failure.
async fn exchange_with_retry(
    connection: &mut Option<TcpStream>,
    bytes: &[u8],
    config: &BankConfig,
) -> Result<Vec<u8>, DispatchError> {
    let read_deadline = Duration::from_millis(config.timeout_ms as u64);
    let mut delay = Duration::from_millis(config.retry.delay_ms as u64);
    let mut last_error = String::new();

    for attempt in 1..=config.retry.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(delay).await;
            delay = delay.mul_f32(config.retry.backoff_multiplier);
        }

        if connection.is_none() {
            match TcpStream::connect((config.host.as_str(), config.port)).await {
                Ok(stream) => {
                    info!(host = %config.host, port = config.port, attempt, "connected to bank");
                    *connection = Some(stream);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "bank connect failed");
                    last_error = e.to_string();
                    continue;
                }
            }
        }

        let stream = connection.as_mut().expect("connected above");
        let result = async {
            write_bank_frame(stream, bytes).await?;
            match tokio::time::timeout(read_deadline, read_bank_frame(stream)).await {
                Ok(read_result) => read_result,
                Err(_) => Err(crate::framing::FramingError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "bank read timeout",
                ))),
            }
        }
        .await;

        match result {
            Ok(body) => return Ok(body),
            Err(e) => {
                warn!(attempt, error = %e, "bank exchange failed, reconnecting");
                last_error = e.to_string();
                *connection = None;
            }
        }
    }

    Err(DispatchError::Connection(format!(
        "all {} attempts failed: {last_error}",
        config.retry.max_attempts
    )))
}

/// RRN minted for the upstream leg.
fn mint_rrn() -> String {
    let now_ms = Utc::now().timestamp_millis() as u64;
    format!("{:012}", now_ms % 1_000_000_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_crypto::{format0_encode, tdes_decrypt, tdes_encrypt};
    use tokio::net::TcpListener;

    fn test_config(port: u16, timeout_ms: u32) -> (BankConfig, SecurityConfig) {
        let bank = BankConfig {
            host: "127.0.0.1".to_string(),
            port,
            timeout_ms,
            retry: gateway_types::RetryConfig {
                max_attempts: 2,
                delay_ms: 10,
                backoff_multiplier: 2.0,
            },
            ..BankConfig::default()
        };
        (bank, SecurityConfig::default())
    }

    fn pos_request() -> IsoMessage {
        IsoMessage::new("0200")
            .with(2, "4532015112830366")
            .with(3, "000000")
            .with(4, "000000005000")
            .with(11, "000123")
            .with(13, "0802")
            .with(41, "TERM0001")
            .with(42, "MERCH01")
    }

    /// Mock bank: accepts connections, answers every request with the given
    /// response code.
    async fn spawn_mock_bank(reply_code: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(_) => return,
                };
                tokio::spawn(async move {
                    while let Ok(body) = read_bank_frame(&mut socket).await {
                        let request = unpack(bank_dictionary(), &body).unwrap();
                        let mut response = IsoMessage::new("0210");
                        response.copy_fields_from(&request, &[2, 3, 4, 11, 12, 13]);
                        response.set(39, reply_code);
                        let bytes = pack(bank_dictionary(), &response).unwrap();
                        if write_bank_frame(&mut socket, &bytes).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });
        port
    }

    #[tokio::test]
    async fn test_submit_and_correlate() {
        let port = spawn_mock_bank("00").await;
        let (bank, security) = test_config(port, 2_000);
        let dispatcher = BankDispatcher::start(bank, security);

        let response = dispatcher.submit(pos_request()).await.unwrap();
        assert_eq!(response.get(39), Some("00"));
        assert_eq!(response.get(11), Some("000123"));
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_decline_propagates_without_retry() {
        let port = spawn_mock_bank("51").await;
        let (bank, security) = test_config(port, 2_000);
        let dispatcher = BankDispatcher::start(bank, security);

        let response = dispatcher.submit(pos_request()).await.unwrap();
        assert_eq!(response.get(39), Some("51"));
    }

    #[tokio::test]
    async fn test_connect_failure_is_connection_error() {
        // Nothing listens on the port; both attempts fail fast.
        let (bank, security) = test_config(1, 300);
        let dispatcher = BankDispatcher::start(bank, security);

        let result = dispatcher.submit(pos_request()).await;
        assert!(matches!(
            result,
            Err(DispatchError::Connection(_)) | Err(DispatchError::Timeout)
        ));
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_silent_bank_times_out() {
        // Accepts but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                // Hold the socket open without replying.
                tokio::spawn(async move {
                    let _socket = socket;
                    tokio::time::sleep(Duration::from_secs(60)).await;
                });
            }
        });

        let (mut bank, security) = test_config(port, 200);
        bank.retry.max_attempts = 1;
        let dispatcher = BankDispatcher::start(bank, security);

        let result = dispatcher.submit(pos_request()).await;
        assert!(matches!(
            result,
            Err(DispatchError::Timeout) | Err(DispatchError::Connection(_))
        ));
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_missing_stan_rejected() {
        let port = spawn_mock_bank("00").await;
        let (bank, security) = test_config(port, 2_000);
        let dispatcher = BankDispatcher::start(bank, security);

        let mut request = pos_request();
        request.remove(11);
        assert!(matches!(
            dispatcher.submit(request).await,
            Err(DispatchError::Codec(_))
        ));
    }

    #[tokio::test]
    async fn test_pin_moved_to_bank_zone() {
        let security = SecurityConfig::default();
        let pan = "4532015112830366";
        let clear = format0_encode("1234", pan).unwrap();
        let under_zonal = tdes_encrypt(&clear, &security.gateway_zonal_key, false).unwrap();

        // Capture what reaches the wire.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let body = read_bank_frame(&mut socket).await.unwrap();
            let request = unpack(bank_dictionary(), &body).unwrap();
            let _ = seen_tx.send(request.get(52).unwrap().to_string());
            let mut response = IsoMessage::new("0210");
            response.copy_fields_from(&request, &[11, 13]);
            response.set(39, "00");
            let bytes = pack(bank_dictionary(), &response).unwrap();
            write_bank_frame(&mut socket, &bytes).await.unwrap();
        });

        let (bank, _) = test_config(port, 2_000);
        let dispatcher = BankDispatcher::start(bank, security.clone());

        let request = pos_request().with(42, "BANK001MERCHANT").with(52, under_zonal);
        let response = dispatcher.submit(request).await.unwrap();
        assert_eq!(response.get(39), Some("00"));

        let wire_block = seen_rx.await.unwrap();
        let bank_key = security.bank_keys.get("BANK001").unwrap();
        let decrypted = tdes_decrypt(&wire_block, bank_key, false).unwrap();
        assert_eq!(decrypted, clear);
    }
}
