//! End-to-end scenario tests against a real `Mediator`, an
//! `InMemoryPersistence`, a loopback fake CSMS, and a plain `mpsc` channel
//! standing in for the charger's socket. Named after the scenarios they
//! cover (S1-S7); see each test's doc comment for the literal inputs and
//! expected outputs they assert on.

mod support;

use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

use ocpp_proxy::config::RuntimeConfig;
use ocpp_proxy::domain::{ChargerRow, ChargerStatus, Direction, HandshakeMeta};
use ocpp_proxy::support::errors::{AppError, RegistryError};

use support::harness::{build, logged_id};
use support::mock_csms::MockCsms;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

async fn expect_charger_frame(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a frame toward the charger")
        .expect("charger channel closed unexpectedly")
}

/// S1 — Pass-through. A Heartbeat sent by the charger while upstream is
/// Open is relayed verbatim and logged once as `UPSTREAM`; the reply is
/// relayed back and logged once as `DOWNSTREAM`.
#[tokio::test]
async fn s1_pass_through_relays_both_directions() {
    let mock = MockCsms::bind().await;
    let mut config = RuntimeConfig::default();
    config.target_csms_url = mock.base_url();
    let harness = build(config).await;

    let (charger_tx, mut charger_rx) = mpsc::unbounded_channel();
    let session = harness
        .mediator
        .create_session("CP1".to_string(), charger_tx, HandshakeMeta::default())
        .await
        .unwrap();

    let mut upstream = mock.accept().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    harness
        .mediator
        .handle_charger_frame(&session, r#"[2,"m1","Heartbeat",{}]"#.to_string())
        .await;

    let relayed = timeout(RECV_TIMEOUT, upstream.recv_text())
        .await
        .expect("timed out waiting for the frame upstream")
        .expect("upstream connection closed unexpectedly");
    assert_eq!(relayed, r#"[2,"m1","Heartbeat",{}]"#);

    upstream.send_text(r#"[3,"m1",{"currentTime":"2025-01-01T00:00:00Z"}]"#).await;
    let to_charger = expect_charger_frame(&mut charger_rx).await;
    assert_eq!(to_charger, r#"[3,"m1",{"currentTime":"2025-01-01T00:00:00Z"}]"#);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let log = harness.persistence.log_snapshot();
    assert!(log
        .iter()
        .any(|r| r.direction == Direction::Upstream && logged_id(&r.payload) == "m1"));
    assert!(log
        .iter()
        .any(|r| r.direction == Direction::Downstream && logged_id(&r.payload) == "m1"));
    assert!(!log.iter().any(|r| r.direction == Direction::ProxyResponse));
}

/// S2 — Injection swallow. An operator-injected `RemoteStartTransaction`
/// reaches the charger; the charger's response is intercepted and never
/// forwarded upstream.
#[tokio::test]
async fn s2_injection_response_is_swallowed() {
    let mock = MockCsms::bind().await;
    let mut config = RuntimeConfig::default();
    config.target_csms_url = mock.base_url();
    let harness = build(config).await;

    let (charger_tx, mut charger_rx) = mpsc::unbounded_channel();
    let session = harness
        .mediator
        .create_session("CP1".to_string(), charger_tx, HandshakeMeta::default())
        .await
        .unwrap();
    let mut upstream = mock.accept().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let message_id = harness
        .mediator
        .inject("CP1", "RemoteStartTransaction", json!({"connectorId": 1, "idTag": "T"}))
        .await
        .unwrap();

    let to_charger = expect_charger_frame(&mut charger_rx).await;
    let parsed: serde_json::Value = serde_json::from_str(&to_charger).unwrap();
    assert_eq!(parsed[0], 2);
    assert_eq!(parsed[1], message_id);
    assert_eq!(parsed[2], "RemoteStartTransaction");
    assert_eq!(parsed[3]["connectorId"], 1);
    assert_eq!(parsed[3]["idTag"], "T");

    harness
        .mediator
        .handle_charger_frame(&session, format!(r#"[3,"{message_id}",{{"status":"Accepted"}}]"#))
        .await;

    // Nothing should reach the mock CSMS: give the forwarding path a window
    // to (incorrectly) relay before asserting the timeout fires.
    let not_relayed = timeout(Duration::from_millis(200), upstream.recv_text()).await;
    assert!(not_relayed.is_err(), "injection response must not be forwarded upstream");

    tokio::time::sleep(Duration::from_millis(50)).await;
    let log = harness.persistence.log_snapshot();
    assert!(log
        .iter()
        .any(|r| r.direction == Direction::InjectionRequest && logged_id(&r.payload) == message_id));
    assert!(log
        .iter()
        .any(|r| r.direction == Direction::InjectionResponse && logged_id(&r.payload) == message_id));
    assert!(!log
        .iter()
        .any(|r| r.direction == Direction::Upstream && logged_id(&r.payload) == message_id));
}

/// S3 — Standalone BootNotification. With forwarding disabled, a
/// BootNotification is answered directly by the proxy.
#[tokio::test]
async fn s3_standalone_boot_notification_is_answered_immediately() {
    let mut config = RuntimeConfig::default();
    config.csms_forwarding_enabled = false;
    let harness = build(config).await;

    let (charger_tx, mut charger_rx) = mpsc::unbounded_channel();
    let session = harness
        .mediator
        .create_session("CP1".to_string(), charger_tx, HandshakeMeta::default())
        .await
        .unwrap();

    harness
        .mediator
        .handle_charger_frame(
            &session,
            r#"[2,"m2","BootNotification",{"chargePointVendor":"V","chargePointModel":"M"}]"#.to_string(),
        )
        .await;

    let reply = expect_charger_frame(&mut charger_rx).await;
    let parsed: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(parsed[0], 3);
    assert_eq!(parsed[1], "m2");
    assert_eq!(parsed[2]["status"], "Accepted");
    assert_eq!(parsed[2]["interval"], 300);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let log = harness.persistence.log_snapshot();
    assert!(log
        .iter()
        .any(|r| r.direction == Direction::Upstream && logged_id(&r.payload) == "m2"));
    assert!(log
        .iter()
        .any(|r| r.direction == Direction::ProxyResponse && logged_id(&r.payload) == "m2"));
}

/// S4 — Auto-start on Preparing. With forwarding disabled and auto-charge
/// enabled, a `StatusNotification(Preparing)` gets an immediate empty ack
/// and, shortly after, a `RemoteStartTransaction` injection.
#[tokio::test]
async fn s4_auto_start_on_preparing() {
    let mut config = RuntimeConfig::default();
    config.csms_forwarding_enabled = false;
    config.auto_charge_enabled = true;
    config.default_id_tag = "ADMIN_TAG".to_string();
    let harness = build(config).await;

    let (charger_tx, mut charger_rx) = mpsc::unbounded_channel();
    let session = harness
        .mediator
        .create_session("CP1".to_string(), charger_tx, HandshakeMeta::default())
        .await
        .unwrap();

    harness
        .mediator
        .handle_charger_frame(
            &session,
            r#"[2,"m3","StatusNotification",{"connectorId":1,"status":"Preparing","errorCode":"NoError"}]"#
                .to_string(),
        )
        .await;

    let ack = expect_charger_frame(&mut charger_rx).await;
    assert_eq!(ack, r#"[3,"m3",{}]"#);

    let injected = expect_charger_frame(&mut charger_rx).await;
    let parsed: serde_json::Value = serde_json::from_str(&injected).unwrap();
    assert_eq!(parsed[0], 2);
    assert_eq!(parsed[2], "RemoteStartTransaction");
    assert_eq!(parsed[3]["connectorId"], 1);
    assert_eq!(parsed[3]["idTag"], "ADMIN_TAG");

    let injected_id = parsed[1].as_str().unwrap().to_string();
    harness
        .mediator
        .handle_charger_frame(&session, format!(r#"[3,"{injected_id}",{{"status":"Accepted"}}]"#))
        .await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    let log = harness.persistence.log_snapshot();
    assert!(log
        .iter()
        .any(|r| r.direction == Direction::InjectionResponse && logged_id(&r.payload) == injected_id));
}

/// S5 — Buffering during reconnect. While the upstream connection is down
/// and a reconnect is still scheduled, a charger-originated frame is
/// buffered rather than dropped, and is delivered upstream ahead of
/// anything sent after the reconnect succeeds.
#[tokio::test]
async fn s5_buffers_during_reconnect_and_flushes_in_order() {
    let mock = MockCsms::bind().await;
    let mut config = RuntimeConfig::default();
    config.target_csms_url = mock.base_url();
    config.max_reconnect_attempts = 5;
    config.reconnect_base_delay_ms = 300;
    config.upstream_connect_timeout_secs = 2;
    let harness = build(config).await;

    let (charger_tx, _charger_rx) = mpsc::unbounded_channel();
    let session = harness
        .mediator
        .create_session("CP1".to_string(), charger_tx, HandshakeMeta::default())
        .await
        .unwrap();

    let first = mock.accept().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    first.close().await;

    // Give the manager time to notice the close and enter WaitRetry before
    // the 300ms backoff elapses and it dials again.
    tokio::time::sleep(Duration::from_millis(100)).await;

    harness
        .mediator
        .handle_charger_frame(&session, r#"[2,"m4","Heartbeat",{}]"#.to_string())
        .await;

    let mut second = mock.accept().await;
    let flushed = timeout(RECV_TIMEOUT, second.recv_text())
        .await
        .expect("timed out waiting for the buffered frame on reconnect")
        .expect("reconnected upstream closed unexpectedly");
    assert_eq!(flushed, r#"[2,"m4","Heartbeat",{}]"#);
}

/// S6 — Give up then synthesize. Once the reconnect budget is exhausted,
/// the next charger frame is answered directly instead of being buffered.
#[tokio::test]
async fn s6_gives_up_then_synthesizes() {
    let mock = MockCsms::bind().await;
    let mut config = RuntimeConfig::default();
    config.target_csms_url = mock.base_url();
    config.max_reconnect_attempts = 1;
    config.reconnect_base_delay_ms = 20;
    config.upstream_connect_timeout_secs = 1;
    let harness = build(config).await;

    let (charger_tx, mut charger_rx) = mpsc::unbounded_channel();
    let session = harness
        .mediator
        .create_session("CP1".to_string(), charger_tx, HandshakeMeta::default())
        .await
        .unwrap();

    let first = mock.accept().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    first.close().await;

    // Wait past the single retry's backoff plus its connect timeout (the
    // test never accepts a second connection, so that attempt times out),
    // by which point the session has given up.
    tokio::time::sleep(Duration::from_millis(1400)).await;

    harness
        .mediator
        .handle_charger_frame(&session, r#"[2,"m5","Heartbeat",{}]"#.to_string())
        .await;

    let reply = expect_charger_frame(&mut charger_rx).await;
    let parsed: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(parsed[0], 3);
    assert_eq!(parsed[1], "m5");
    assert!(parsed[2].get("currentTime").is_some());

    tokio::time::sleep(Duration::from_millis(50)).await;
    let log = harness.persistence.log_snapshot();
    assert!(log
        .iter()
        .any(|r| r.direction == Direction::ProxyResponse && logged_id(&r.payload) == "m5"));
}

/// S7 — Persistent limit replay. A charger with a durable `maxPower`
/// receives a `SetChargingProfile` shortly after connecting, without any
/// operator action.
#[tokio::test]
async fn s7_persistent_limit_replays_on_connect() {
    let harness = build(RuntimeConfig {
        csms_forwarding_enabled: false,
        ..RuntimeConfig::default()
    })
    .await;

    let mut row = ChargerRow::new("CP1");
    row.status = ChargerStatus::Offline;
    row.max_power = Some(Decimal::from(16));
    harness.persistence.seed_charger(row);

    let (charger_tx, mut charger_rx) = mpsc::unbounded_channel();
    harness
        .mediator
        .create_session("CP1".to_string(), charger_tx, HandshakeMeta::default())
        .await
        .unwrap();

    let injected = timeout(Duration::from_secs(1), charger_rx.recv())
        .await
        .expect("persistent limit was not replayed within the expected window")
        .expect("charger channel closed unexpectedly");

    let parsed: serde_json::Value = serde_json::from_str(&injected).unwrap();
    assert_eq!(parsed[0], 2);
    assert_eq!(parsed[2], "SetChargingProfile");
    let profile = &parsed[3]["csChargingProfiles"];
    assert_eq!(profile["chargingProfileId"], 1);
    assert_eq!(profile["stackLevel"], 1);
    assert_eq!(profile["chargingProfilePurpose"], "ChargePointMaxProfile");
    assert_eq!(profile["chargingSchedule"]["chargingSchedulePeriod"][0]["startPeriod"], 0);
    assert_eq!(profile["chargingSchedule"]["chargingSchedulePeriod"][0]["limit"], 16);
}

/// Invariant 2 — single session per charger. A second upgrade for a
/// charge point id that already has a live session is rejected; the
/// original session is left registered and untouched.
#[tokio::test]
async fn duplicate_session_is_rejected_not_displaced() {
    let harness = build(RuntimeConfig::default()).await;

    let (first_tx, _first_rx) = mpsc::unbounded_channel();
    harness
        .mediator
        .create_session("CP1".to_string(), first_tx, HandshakeMeta::default())
        .await
        .unwrap();

    let (second_tx, _second_rx) = mpsc::unbounded_channel();
    let err = harness
        .mediator
        .create_session("CP1".to_string(), second_tx, HandshakeMeta::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Registry(RegistryError::DuplicateSession(id)) if id == "CP1"));
    assert!(harness.mediator.registry.lookup("CP1").is_some());
}

/// Idempotence law — calling `SetPersistentLimit(x)` twice in a row
/// produces one injection per call rather than coalescing into one.
#[tokio::test]
async fn set_persistent_limit_does_not_coalesce_repeated_calls() {
    let mut config = RuntimeConfig::default();
    config.csms_forwarding_enabled = false;
    let harness = build(config).await;

    let (charger_tx, mut charger_rx) = mpsc::unbounded_channel();
    harness
        .mediator
        .create_session("CP1".to_string(), charger_tx, HandshakeMeta::default())
        .await
        .unwrap();

    let first_id = harness.mediator.set_persistent_limit("CP1", Some(Decimal::from(16))).await.unwrap();
    let second_id = harness.mediator.set_persistent_limit("CP1", Some(Decimal::from(16))).await.unwrap();
    assert_ne!(first_id, second_id);

    let first_frame = expect_charger_frame(&mut charger_rx).await;
    let second_frame = expect_charger_frame(&mut charger_rx).await;
    assert!(first_frame.contains(first_id.as_str()));
    assert!(second_frame.contains(second_id.as_str()));
}

/// Invariant 1, checked as a standalone property across every record ever
/// logged by the injection-swallow scenario: no message id is ever tagged
/// both `INJECTION_RESPONSE` and `UPSTREAM`.
#[tokio::test]
async fn injection_response_confidentiality_holds_across_the_log() {
    let mock = MockCsms::bind().await;
    let mut config = RuntimeConfig::default();
    config.target_csms_url = mock.base_url();
    let harness = build(config).await;

    let (charger_tx, mut charger_rx) = mpsc::unbounded_channel();
    let session = harness
        .mediator
        .create_session("CP1".to_string(), charger_tx, HandshakeMeta::default())
        .await
        .unwrap();
    let mut upstream = mock.accept().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // A genuine pass-through frame and an injection, interleaved.
    harness
        .mediator
        .handle_charger_frame(&session, r#"[2,"a1","Heartbeat",{}]"#.to_string())
        .await;
    let _ = timeout(RECV_TIMEOUT, upstream.recv_text()).await.unwrap().unwrap();

    let injected_id = harness
        .mediator
        .inject("CP1", "RemoteStartTransaction", json!({"connectorId": 1, "idTag": "T"}))
        .await
        .unwrap();
    let _ = expect_charger_frame(&mut charger_rx).await;
    harness
        .mediator
        .handle_charger_frame(&session, format!(r#"[3,"{injected_id}",{{"status":"Accepted"}}]"#))
        .await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    let log = harness.persistence.log_snapshot();

    let injection_response_ids: Vec<&str> = log
        .iter()
        .filter(|r| r.direction == Direction::InjectionResponse)
        .map(|r| logged_id(&r.payload))
        .collect();
    let upstream_ids: Vec<&str> = log
        .iter()
        .filter(|r| r.direction == Direction::Upstream)
        .map(|r| logged_id(&r.payload))
        .collect();

    assert!(!injection_response_ids.is_empty());
    assert!(!upstream_ids.is_empty());
    for id in &injection_response_ids {
        assert!(!upstream_ids.contains(id), "id {id} logged as both INJECTION_RESPONSE and UPSTREAM");
    }
}
