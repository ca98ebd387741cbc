//! MTI dispatch and the per-request transaction pipeline.
//!
//! Processing order for financial requests (0100/0200/0400): card
//! validation, duplicate detection, PIN transposition into the gateway key
//! zone, business caps, optional bank forward, response composition. A PIN
//! failure is fatal — the request is declined with 96 and never forwarded.
//!
//! Network management (0800) is handled locally: sign-on/sign-off/echo,
//! the key-change protocol and terminal status queries. Advices (0220/0420)
//! are recorded and produce no response.

use chrono::Utc;
use gateway_codec::IsoMessage;
use gateway_crypto::{cards, transposition};
use gateway_terminals::TerminalService;
use gateway_types::GatewayConfig;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::codes;
use crate::duplicate::DuplicateCache;
use crate::ports::{BankDispatch, DispatchError};

/// Fields echoed from request to response.
const ECHO_FIELDS: [u8; 14] = [2, 3, 4, 11, 12, 13, 14, 22, 25, 37, 41, 42, 43, 49];

/// Response MTI for a request MTI; unknown requests answer at 0210.
fn response_mti(request_mti: &str) -> &'static str {
    match request_mti {
        "0100" => "0110",
        "0200" => "0210",
        "0400" => "0410",
        "0800" => "0810",
        _ => "0210",
    }
}

/// The gateway's transaction router.
pub struct TransactionRouter {
    config: GatewayConfig,
    terminals: Arc<TerminalService>,
    bank: Option<Arc<dyn BankDispatch>>,
    duplicates: DuplicateCache,
}

impl TransactionRouter {
    /// Build a router without a bank leg; financial requests are decided
    /// locally.
    pub fn new(config: GatewayConfig, terminals: Arc<TerminalService>) -> Self {
        let window = Duration::from_secs(config.router.duplicate_window_secs);
        Self {
            config,
            terminals,
            bank: None,
            duplicates: DuplicateCache::new(window),
        }
    }

    /// Attach the bank dispatcher; its response code then overrides local
    /// approval for forwarded MTIs.
    pub fn with_bank(mut self, bank: Arc<dyn BankDispatch>) -> Self {
        self.bank = Some(bank);
        self
    }

    /// Route one decoded request. `None` means no response is owed
    /// (advices).
    pub async fn handle(&self, request: &IsoMessage) -> Option<IsoMessage> {
        match request.mti() {
            "0100" | "0200" | "0400" => Some(self.handle_financial(request).await),
            "0220" | "0420" => {
                self.record_advice(request);
                None
            }
            "0800" => Some(self.handle_network_management(request).await),
            other => {
                warn!(mti = other, "unsupported MTI");
                Some(self.build_response(request, "12"))
            }
        }
    }

    async fn handle_financial(&self, request: &IsoMessage) -> IsoMessage {
        let stan = request.get(11).unwrap_or_default();

        // Card validation gates everything else.
        if self.config.security.card.enable_validation {
            if let Some(pan) = request.get(2) {
                let validation = cards::validate_pan(pan);
                if !validation.valid && self.config.security.card.reject_invalid {
                    warn!(
                        stan,
                        masked_pan = %validation.masked,
                        brand = validation.brand.display_name(),
                        reason = validation.error.as_deref().unwrap_or("invalid"),
                        "card validation failed"
                    );
                    return self.build_response(request, "14");
                }
            }
        }

        // Exact re-sends inside the window answer 94 without reprocessing.
        if !stan.is_empty() {
            let local_date = request.get(13).unwrap_or_default();
            if self.duplicates.check_and_record(stan, local_date) {
                warn!(stan, local_date, "duplicate transmission");
                return self.build_response(request, "94");
            }
        }

        // Move the PIN block from the terminal zone to the gateway zone.
        let mut working = request.clone();
        if working.has(52) && self.config.security.pin.enable_transposition {
            match self.transpose_inbound(&working).await {
                Ok(block) => working.set(52, block),
                Err(reason) => {
                    error!(stan, %reason, "PIN transposition failed");
                    return self.build_response(request, "96");
                }
            }
        }

        let local_code = business_decision(request.get(3), request.get(4));
        if local_code != "00" {
            let info = codes::pos_code_info(local_code);
            warn!(stan, code = local_code, description = %info.description, "local decline");
            return self.build_response(request, local_code);
        }

        let final_code = match &self.bank {
            Some(bank) => self.forward_to_bank(bank, &working, stan).await,
            None => "00".to_string(),
        };

        self.build_response(request, &final_code)
    }

    async fn forward_to_bank(
        &self,
        bank: &Arc<dyn BankDispatch>,
        working: &IsoMessage,
        stan: &str,
    ) -> String {
        match bank.submit(working.clone()).await {
            Ok(response) => {
                let code = response.get(39).unwrap_or("96").to_string();
                let info = codes::bank_code_info(&code);
                match info.severity {
                    codes::Severity::Info => {
                        info!(stan, code = %code, description = %info.description, "bank response")
                    }
                    codes::Severity::Warn => {
                        warn!(
                            stan,
                            code = %code,
                            description = %info.description,
                            action = %info.recommended_action,
                            "bank decline"
                        )
                    }
                    codes::Severity::Error => {
                        error!(
                            stan,
                            code = %code,
                            description = %info.description,
                            action = %info.recommended_action,
                            "bank error response"
                        )
                    }
                }
                code
            }
            Err(DispatchError::Timeout) => {
                warn!(stan, "bank timeout");
                "91".to_string()
            }
            Err(e) => {
                error!(stan, error = %e, "bank dispatch failed");
                "91".to_string()
            }
        }
    }

    async fn transpose_inbound(&self, msg: &IsoMessage) -> Result<String, String> {
        let pinblock = msg.get(52).expect("caller checked field 52");
        let pan = msg.get(2).ok_or("PAN missing for PIN transposition")?;
        if !transposition::validate_pin_block(pinblock, pan) {
            return Err("PIN block failed structural validation".to_string());
        }

        let terminal_id = msg.get(41).unwrap_or_default();
        let terminal_key = match self.terminals.active_key_value(terminal_id).await {
            Ok(Some(value)) => value,
            Ok(None) => self.config.security.default_terminal_key.clone(),
            Err(e) => return Err(format!("key lookup failed: {e}")),
        };

        transposition::transpose(
            &terminal_key,
            &self.config.security.gateway_zonal_key,
            pinblock,
            pan,
        )
        .map_err(|e| e.to_string())
    }

    async fn handle_network_management(&self, request: &IsoMessage) -> IsoMessage {
        let mut response = IsoMessage::new(response_mti(request.mti()));
        response.copy_fields_from(request, &ECHO_FIELDS);

        let processing_code = request.get(3).unwrap_or_default();
        let terminal_id = request.get(41).unwrap_or_default();

        let code = match processing_code {
            "990000" => {
                info!(terminal_id, "sign-on");
                if !terminal_id.is_empty() {
                    if let Err(e) = self.terminals.update_activity(terminal_id).await {
                        warn!(terminal_id, error = %e, "sign-on activity update failed");
                    }
                }
                "00"
            }
            "990001" => {
                info!(terminal_id, "sign-off");
                "00"
            }
            "990002" => "00",
            "900000" => self.handle_key_change(request, &mut response).await,
            "900001" => self.handle_status_request(request, &mut response).await,
            other => {
                warn!(terminal_id, processing_code = other, "unknown network management code");
                "12"
            }
        };

        response.set(39, code);
        response
    }

    async fn handle_key_change(
        &self,
        request: &IsoMessage,
        response: &mut IsoMessage,
    ) -> &'static str {
        let terminal_id = request.get(41).unwrap_or_default();
        if !self.config.terminal.enable_key_change {
            warn!(terminal_id, "key change disabled, rejecting");
            return "57";
        }
        if terminal_id.trim().is_empty() {
            warn!("key change request missing terminal id");
            return "30";
        }

        let result = self
            .terminals
            .process_key_change(terminal_id, request.get(42))
            .await;
        if result.success {
            let key = result.key.expect("successful result carries the key");
            response.set(53, format!("KEY_ID:{}", key.key_id));
            "00"
        } else {
            error!(terminal_id, message = %result.message, "key change failed");
            "96"
        }
    }

    async fn handle_status_request(
        &self,
        request: &IsoMessage,
        response: &mut IsoMessage,
    ) -> &'static str {
        let terminal_id = request.get(41).unwrap_or_default();
        if !self.config.terminal.enable_key_change {
            return "57";
        }
        if terminal_id.trim().is_empty() {
            return "30";
        }

        match self.terminals.terminal_status(terminal_id).await {
            Ok(Some(status)) => {
                let summary = format!(
                    "STATUS:{},KEYS:{},CHANGES:{}",
                    status.status,
                    if status.has_valid_key { "VALID" } else { "INVALID" },
                    status.key_change_count
                );
                info!(terminal_id, %summary, "terminal status");
                response.set(53, summary);
                "00"
            }
            Ok(None) => {
                warn!(terminal_id, "status request for unknown terminal");
                "14"
            }
            Err(e) => {
                error!(terminal_id, error = %e, "status lookup failed");
                "96"
            }
        }
    }

    fn record_advice(&self, request: &IsoMessage) {
        info!(
            mti = request.mti(),
            stan = request.get(11).unwrap_or_default(),
            amount = request.get(4).unwrap_or_default(),
            "advice recorded"
        );
    }

    fn build_response(&self, request: &IsoMessage, code: &str) -> IsoMessage {
        let mut response = IsoMessage::new(response_mti(request.mti()));
        response.copy_fields_from(request, &ECHO_FIELDS);
        response.set(39, code);
        response.set(37, mint_rrn());
        if code == "00" {
            response.set(38, mint_auth_code());
        }
        response
    }
}

/// Local approval decision from processing code and amount.
fn business_decision(processing_code: Option<&str>, amount: Option<&str>) -> &'static str {
    let Some(processing_code) = processing_code else {
        return "30";
    };
    let amount: u64 = amount.and_then(|a| a.parse().ok()).unwrap_or(0);

    match processing_code {
        // Purchase
        "000000" => {
            if amount > 100_000 {
                "61"
            } else {
                "00"
            }
        }
        // Cash advance
        "010000" => {
            if amount > 50_000 {
                "61"
            } else {
                "00"
            }
        }
        // Refund, balance inquiry, payment
        "200000" | "310000" | "400000" => "00",
        // Transfer
        "500000" => {
            if amount > 1_000_000 {
                "61"
            } else {
                "00"
            }
        }
        _ => "12",
    }
}

/// RRN: current epoch milliseconds modulo 10^12, zero-padded to 12 digits.
fn mint_rrn() -> String {
    let now_ms = Utc::now().timestamp_millis() as u64;
    format!("{:012}", now_ms % 1_000_000_000_000)
}

/// Authorization code: 6 random decimal digits.
fn mint_auth_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32))
}
