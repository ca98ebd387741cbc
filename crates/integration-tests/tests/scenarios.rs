//! End-to-end scenarios over real sockets: terminal wire in, bank wire out.

use gateway_codec::IsoMessage;
use gateway_crypto::{format0_decode, format0_encode, kcv, tdes_decrypt, tdes_encrypt};
use gateway_terminals::TerminalStore;
use gateway_types::{GatewayConfig, KeyStatus};
use integration_tests::{
    spawn_mock_bank, start_gateway, start_offline_gateway, PosClient,
};

fn purchase(stan: &str) -> IsoMessage {
    IsoMessage::new("0200")
        .with(2, "4532015112830366")
        .with(3, "000000")
        .with(4, "000000005000")
        .with(11, stan)
        .with(41, "TERM0001")
}

#[tokio::test]
async fn scenario_a_visa_purchase_approved() {
    let gateway = start_offline_gateway().await;
    let mut client = PosClient::connect(gateway.addr).await;

    let response = client.exchange(&purchase("000123")).await;

    assert_eq!(response.mti(), "0210");
    assert_eq!(response.get(39), Some("00"));
    assert_eq!(response.get(2), Some("4532015112830366"));
    assert_eq!(response.get(3), Some("000000"));
    assert_eq!(response.get(4), Some("000000005000"));
    assert_eq!(response.get(11), Some("000123"));

    let rrn = response.get(37).expect("RRN minted");
    assert_eq!(rrn.len(), 12);
    assert!(rrn.chars().all(|c| c.is_ascii_digit()));
    let auth = response.get(38).expect("auth code on approval");
    assert_eq!(auth.len(), 6);
    assert!(auth.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn scenario_b_luhn_failure_declined() {
    let gateway = start_offline_gateway().await;
    let mut client = PosClient::connect(gateway.addr).await;

    let request = purchase("000200")
        .with(2, "4532015112830367")
        .with(4, "000000001000");
    let response = client.exchange(&request).await;

    assert_eq!(response.mti(), "0210");
    assert_eq!(response.get(39), Some("14"));
    assert!(!response.has(38));
}

#[tokio::test]
async fn scenario_c_amount_cap_declined() {
    let gateway = start_offline_gateway().await;
    let mut client = PosClient::connect(gateway.addr).await;

    let request = purchase("000300").with(4, "000000200000");
    let response = client.exchange(&request).await;

    assert_eq!(response.mti(), "0210");
    assert_eq!(response.get(39), Some("61"));
}

#[tokio::test]
async fn scenario_d_key_change_creates_terminal_and_key() {
    let gateway = start_offline_gateway().await;
    let mut client = PosClient::connect(gateway.addr).await;

    let request = IsoMessage::new("0800")
        .with(3, "900000")
        .with(41, "NEWTID01")
        .with(42, "MERCH01");
    let response = client.exchange(&request).await;

    assert_eq!(response.mti(), "0810");
    assert_eq!(response.get(39), Some("00"));
    let reference = response.get(53).expect("key reference in field 53");
    assert!(reference.starts_with("KEY_ID:"));

    let terminal = gateway
        .store
        .find_terminal("NEWTID01")
        .await
        .unwrap()
        .expect("terminal auto-created");
    assert!(terminal.is_active());
    assert_eq!(terminal.key_change_count, 1);
    assert_eq!(terminal.merchant_id.as_deref(), Some("MERCH01"));

    let key_id: u64 = reference["KEY_ID:".len()..].parse().unwrap();
    let key = gateway.store.find_key(key_id).await.unwrap().unwrap();
    assert_eq!(key.status, KeyStatus::Active);
    assert_eq!(key.value.len(), 32);
    assert_eq!(key.kcv, kcv(&key.value).unwrap());
}

#[tokio::test]
async fn scenario_e_key_rotation_deactivates_prior_key() {
    let gateway = start_offline_gateway().await;
    let mut client = PosClient::connect(gateway.addr).await;

    let request = IsoMessage::new("0800")
        .with(3, "900000")
        .with(41, "NEWTID01")
        .with(42, "MERCH01");

    let first = client.exchange(&request).await;
    let first_id: u64 = first.get(53).unwrap()["KEY_ID:".len()..].parse().unwrap();

    let second = client.exchange(&request).await;
    assert_eq!(second.get(39), Some("00"));
    let second_id: u64 = second.get(53).unwrap()["KEY_ID:".len()..].parse().unwrap();
    assert_ne!(first_id, second_id);

    let terminal = gateway
        .store
        .find_terminal("NEWTID01")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(terminal.key_change_count, 2);
    assert_eq!(terminal.current_key_id, Some(second_id));

    let old_key = gateway.store.find_key(first_id).await.unwrap().unwrap();
    assert_eq!(old_key.status, KeyStatus::Inactive);
    let new_key = gateway.store.find_key(second_id).await.unwrap().unwrap();
    assert_eq!(new_key.status, KeyStatus::Active);
    assert_ne!(old_key.value, new_key.value);
}

#[tokio::test]
async fn scenario_f_bank_timeout_answers_91() {
    let (bank_port, _seen) = spawn_mock_bank(None).await;
    let mut config = GatewayConfig::default();
    config.bank.host = "127.0.0.1".to_string();
    config.bank.port = bank_port;
    config.bank.timeout_ms = 300;
    config.bank.retry.max_attempts = 1;
    config.bank.retry.delay_ms = 10;

    let gateway = start_gateway(config).await;
    let mut client = PosClient::connect(gateway.addr).await;

    let response = client.exchange(&purchase("000600")).await;
    assert_eq!(response.mti(), "0210");
    assert_eq!(response.get(39), Some("91"));

    // The in-flight entry is cleaned up with the failure.
    let dispatcher = gateway.dispatcher.as_ref().unwrap();
    assert_eq!(dispatcher.in_flight(), 0);
}

#[tokio::test]
async fn scenario_g_pin_transposition_chain() {
    let (bank_port, mut seen) = spawn_mock_bank(Some("00")).await;
    let mut config = GatewayConfig::default();
    config.bank.host = "127.0.0.1".to_string();
    config.bank.port = bank_port;
    config.bank.timeout_ms = 2_000;

    let terminal_key = config.security.default_terminal_key.clone();
    let bank_key = config.security.bank_keys.get("BANK001").unwrap().clone();

    let gateway = start_gateway(config).await;
    let mut client = PosClient::connect(gateway.addr).await;

    let pan = "4532015112830366";
    let pin = "1234";
    let clear_block = format0_encode(pin, pan).unwrap();
    let under_terminal = tdes_encrypt(&clear_block, &terminal_key, false).unwrap();

    let request = purchase("000700")
        .with(42, "BANK001MERCHANT")
        .with(52, under_terminal.clone());
    let response = client.exchange(&request).await;
    assert_eq!(response.get(39), Some("00"));

    // What the bank received is the PIN block under the bank key, and it
    // still decodes to the original PIN.
    let forwarded = seen.recv().await.expect("bank saw the request");
    let wire_block = forwarded.get(52).expect("PIN forwarded").to_string();
    assert_ne!(wire_block, under_terminal);
    let clear_at_bank = tdes_decrypt(&wire_block, &bank_key, false).unwrap();
    assert_eq!(format0_decode(&clear_at_bank, pan).unwrap(), pin);
}

#[tokio::test]
async fn bank_decline_propagates_verbatim() {
    let (bank_port, _seen) = spawn_mock_bank(Some("51")).await;
    let mut config = GatewayConfig::default();
    config.bank.host = "127.0.0.1".to_string();
    config.bank.port = bank_port;
    config.bank.timeout_ms = 2_000;

    let gateway = start_gateway(config).await;
    let mut client = PosClient::connect(gateway.addr).await;

    let response = client.exchange(&purchase("000800")).await;
    assert_eq!(response.get(39), Some("51"));
    assert!(!response.has(38));
}

#[tokio::test]
async fn duplicate_transmission_flagged_over_wire() {
    let gateway = start_offline_gateway().await;
    let mut client = PosClient::connect(gateway.addr).await;

    let request = purchase("000900").with(13, "0802");
    let first = client.exchange(&request).await;
    assert_eq!(first.get(39), Some("00"));

    let second = client.exchange(&request).await;
    assert_eq!(second.get(39), Some("94"));
}

#[tokio::test]
async fn sign_on_then_status_query() {
    let gateway = start_offline_gateway().await;
    let mut client = PosClient::connect(gateway.addr).await;

    // Provision the terminal, sign on, then ask for its status.
    let key_change = IsoMessage::new("0800").with(3, "900000").with(41, "NEWTID01");
    client.exchange(&key_change).await;

    let sign_on = IsoMessage::new("0800").with(3, "990000").with(41, "NEWTID01");
    assert_eq!(client.exchange(&sign_on).await.get(39), Some("00"));

    let status = IsoMessage::new("0800").with(3, "900001").with(41, "NEWTID01");
    let response = client.exchange(&status).await;
    assert_eq!(response.get(39), Some("00"));
    assert_eq!(response.get(53), Some("STATUS:ACTIVE,KEYS:VALID,CHANGES:1"));

    let terminal = gateway
        .store
        .find_terminal("NEWTID01")
        .await
        .unwrap()
        .unwrap();
    assert!(terminal.last_activity.is_some());
}

#[tokio::test]
async fn graceful_shutdown_stops_accepting() {
    let gateway = start_offline_gateway().await;
    let mut client = PosClient::connect(gateway.addr).await;

    // In-flight session keeps answering until it drains.
    let response = client.exchange(&purchase("001000")).await;
    assert_eq!(response.get(39), Some("00"));

    gateway.shutdown();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    match tokio::net::TcpStream::connect(gateway.addr).await {
        Ok(socket) => {
            // Acceptor is gone; the socket never gets served.
            drop(socket);
        }
        Err(_) => {}
    }
}
