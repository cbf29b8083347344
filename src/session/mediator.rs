//! The session mediator — the hard part.
//!
//! `Session` is the in-memory record `spec.md` §3 describes: the charger
//! socket's outbound channel, the optional upstream connection, the
//! pending-injection tables, the egress buffer, and the reconnect state,
//! all behind one short-held `std::sync::Mutex` per the concurrency model
//! in §5 (no blocking I/O, no await, while it's held). `Mediator` is the
//! process-wide object that owns the registry, the shared configuration,
//! the persistence provider, and the log queue, and implements the
//! forwarding rules, injection, and reconnect scheduling against whichever
//! `Session` a caller hands it.
//!
//! Grounded in the teacher's `application::commands::CommandSender`
//! (pending-request correlation keyed by message id) and its
//! `ocpp_server`/`websocket` connection-handling tasks (one task per read
//! direction, writes serialized through an outbound channel).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::ConfigStore;
use crate::domain::charger::ChargerStatus;
use crate::domain::frame::OcppFrame;
use crate::domain::handshake::HandshakeMeta;
use crate::domain::log::{Direction, MessageLogRecord};
use crate::domain::messages::{
    ChargingProfile, ClearChargingProfileRequest, SetChargingProfileRequest, PERSISTENT_PROFILE_ID,
};
use crate::domain::persistence::PersistenceProvider;
use crate::infrastructure::upstream::{self, UpstreamStream};
use crate::support::errors::{AppError, MediatorError};
use crate::support::ids::generate_message_id;

use super::log_queue::LogQueue;
use super::reconnect::backoff_delay;
use super::registry::SessionRegistry;
use super::standalone;
use super::ttl::TtlSet;

/// `chargingProfileId` reserved for one-shot session limits, distinct from
/// `PERSISTENT_PROFILE_ID` so the two never collide on the charger's
/// profile stack.
const SESSION_PROFILE_ID: i32 = 2;

/// The upstream sub-state machine from `spec.md` §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamStatus {
    Absent,
    Connecting,
    Open,
    WaitRetry,
    GaveUp,
}

/// Per-Session mutable state, behind one short-held mutex.
struct SessionState {
    upstream_status: UpstreamStatus,
    upstream_tx: Option<mpsc::UnboundedSender<String>>,
    reconnect_attempt: u32,
    pending_injections: TtlSet,
    pending_auth_tags: TtlSet,
    egress_buffer: VecDeque<String>,
    first_frame_seen: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            upstream_status: UpstreamStatus::Absent,
            upstream_tx: None,
            reconnect_attempt: 0,
            pending_injections: TtlSet::new(),
            pending_auth_tags: TtlSet::new(),
            egress_buffer: VecDeque::new(),
            first_frame_seen: false,
        }
    }
}

/// One live charger connection. Destroying it (via `Mediator::teardown`)
/// cancels every timer and task hung off `cancellation`.
pub struct Session {
    pub charge_point_id: String,
    pub handshake: HandshakeMeta,
    charger_tx: mpsc::UnboundedSender<String>,
    state: StdMutex<SessionState>,
    config: Arc<ConfigStore>,
    cancellation: CancellationToken,
}

impl Session {
    pub fn new(
        charge_point_id: String,
        handshake: HandshakeMeta,
        charger_tx: mpsc::UnboundedSender<String>,
        config: Arc<ConfigStore>,
        _log_queue: Arc<LogQueue>,
        _transaction_counter: Arc<AtomicI64>,
    ) -> Self {
        Self {
            charge_point_id,
            handshake,
            charger_tx,
            state: StdMutex::new(SessionState::default()),
            config,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    fn status_snapshot(&self) -> UpstreamStatus {
        self.state.lock().expect("session mutex poisoned").upstream_status
    }

    fn set_status(&self, status: UpstreamStatus) {
        self.state.lock().expect("session mutex poisoned").upstream_status = status;
    }

    /// True when an upstream-bound Request should be buffered rather than
    /// relayed or answered by the standalone responder: a reconnect is
    /// actively in flight (`Connecting`) or scheduled with attempts still
    /// remaining (`WaitRetry`).
    fn should_buffer(&self) -> bool {
        matches!(self.status_snapshot(), UpstreamStatus::Connecting | UpstreamStatus::WaitRetry)
    }

    /// Attempt to relay `text` upstream right now. Only succeeds when the
    /// upstream socket is `Open` and its writer channel is still live.
    fn try_send_upstream(&self, text: &str) -> bool {
        let state = self.state.lock().expect("session mutex poisoned");
        if state.upstream_status == UpstreamStatus::Open {
            if let Some(tx) = &state.upstream_tx {
                return tx.send(text.to_string()).is_ok();
            }
        }
        false
    }

    /// Append to the bounded egress buffer, dropping the oldest frame on
    /// overflow (`spec.md` §5).
    fn buffer_egress(&self, text: String, capacity: usize) {
        let mut state = self.state.lock().expect("session mutex poisoned");
        if state.egress_buffer.len() >= capacity {
            state.egress_buffer.pop_front();
            warn!(charge_point_id = %self.charge_point_id, "egress buffer full, dropping oldest frame");
        }
        state.egress_buffer.push_back(text);
    }

    /// Transition to `Open`, install the new writer channel, and flush the
    /// egress buffer in FIFO order — all inside one critical section, so a
    /// concurrently-running charger-read task can never observe `Open`
    /// with the buffer only half-drained.
    fn mark_open_and_flush(&self, tx: mpsc::UnboundedSender<String>) {
        let mut state = self.state.lock().expect("session mutex poisoned");
        state.upstream_status = UpstreamStatus::Open;
        state.reconnect_attempt = 0;
        while let Some(text) = state.egress_buffer.pop_front() {
            let _ = tx.send(text);
        }
        state.upstream_tx = Some(tx);
    }

    fn mark_closed(&self) {
        let mut state = self.state.lock().expect("session mutex poisoned");
        state.upstream_tx = None;
    }

    fn bump_reconnect_attempt(&self) -> u32 {
        let mut state = self.state.lock().expect("session mutex poisoned");
        state.reconnect_attempt += 1;
        state.reconnect_attempt
    }

    fn insert_injection(&self, id: String) {
        self.state.lock().expect("session mutex poisoned").pending_injections.insert(id);
    }

    fn take_injection(&self, id: &str) -> bool {
        self.state.lock().expect("session mutex poisoned").pending_injections.take(id)
    }

    fn insert_auth_tag(&self, tag: String) {
        self.state.lock().expect("session mutex poisoned").pending_auth_tags.insert(tag);
    }

    fn auth_tag_pending(&self, tag: &str) -> bool {
        self.state.lock().expect("session mutex poisoned").pending_auth_tags.contains(tag)
    }

    fn consume_auth_tag(&self, tag: &str) {
        self.state.lock().expect("session mutex poisoned").pending_auth_tags.take(tag);
    }

    fn sweep_ttls(&self, ttl: Duration) {
        let mut state = self.state.lock().expect("session mutex poisoned");
        state.pending_injections.sweep(ttl);
        state.pending_auth_tags.sweep(ttl);
    }

    fn note_first_frame(&self) {
        let mut state = self.state.lock().expect("session mutex poisoned");
        if !state.first_frame_seen {
            state.first_frame_seen = true;
            info!(charge_point_id = %self.charge_point_id, "first frame received from charger");
        }
    }
}

/// The process-wide mediator: one instance backs every live session.
/// Cheap to clone — every field is an `Arc` — so each per-session task
/// holds its own clone rather than a borrow.
#[derive(Clone)]
pub struct Mediator {
    pub registry: Arc<SessionRegistry>,
    config: Arc<ConfigStore>,
    persistence: Arc<dyn PersistenceProvider>,
    log_queue: Arc<LogQueue>,
    transaction_counter: Arc<AtomicI64>,
}

/// First process-wide transaction id synthesized by the standalone
/// responder's `StartTransaction` handling.
pub const FIRST_TRANSACTION_ID: i64 = 100_000;

impl Mediator {
    pub fn new(config: Arc<ConfigStore>, persistence: Arc<dyn PersistenceProvider>, log_queue: Arc<LogQueue>) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            config,
            persistence,
            log_queue,
            transaction_counter: Arc::new(AtomicI64::new(FIRST_TRANSACTION_ID)),
        }
    }

    pub fn config(&self) -> Arc<ConfigStore> {
        self.config.clone()
    }

    pub fn persistence(&self) -> Arc<dyn PersistenceProvider> {
        self.persistence.clone()
    }

    fn next_transaction_id(&self) -> i64 {
        self.transaction_counter.fetch_add(1, Ordering::SeqCst)
    }

    // ---- session lifecycle -------------------------------------------

    /// Create and register a new session for `charge_point_id`, reusing
    /// `handshake` on every upstream (re)connect attempt for its lifetime.
    /// Spawns the upstream reconnect loop, the TTL sweeper, and — when the
    /// persisted row carries a `max_power` — the one-shot persistent-limit
    /// injection (`spec.md` §4.3).
    pub async fn create_session(
        &self,
        charge_point_id: String,
        charger_tx: mpsc::UnboundedSender<String>,
        handshake: HandshakeMeta,
    ) -> Result<Arc<Session>, AppError> {
        let row = self.persistence.ensure_charger(&charge_point_id).await?;

        let session = Arc::new(Session::new(
            charge_point_id.clone(),
            handshake,
            charger_tx,
            self.config.clone(),
            self.log_queue.clone(),
            self.transaction_counter.clone(),
        ));

        self.registry.create(session.clone())?;

        if let Err(e) = self.persistence.mark_status(&charge_point_id, ChargerStatus::Online).await {
            warn!(charge_point_id, error = %e, "failed to mark charger online");
        }

        let upstream_med = self.clone();
        let upstream_session = session.clone();
        tokio::spawn(async move {
            upstream_med.run_upstream_manager(upstream_session).await;
        });

        let ttl_med = self.clone();
        let ttl_session = session.clone();
        tokio::spawn(async move {
            ttl_med.run_ttl_sweep(ttl_session).await;
        });

        if let Some(max_power) = row.max_power {
            let limit_med = self.clone();
            let limit_session = session.clone();
            tokio::spawn(async move {
                limit_med.schedule_persistent_limit_injection(limit_session, max_power).await;
            });
        }

        Ok(session)
    }

    async fn schedule_persistent_limit_injection(&self, session: Arc<Session>, max_power: Decimal) {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(500)) => {}
            _ = session.cancellation().cancelled() => return,
        }
        let payload = serde_json::to_value(SetChargingProfileRequest {
            connector_id: 0,
            cs_charging_profiles: ChargingProfile::persistent_limit(max_power),
        })
        .expect("SetChargingProfileRequest always serializes");
        let _ = self.inject_call(&session, "SetChargingProfile", payload, false).await;
    }

    /// Tear down the session for `charge_point_id`: cancel its timers and
    /// background tasks, remove it from the registry, and mark the
    /// charger row offline. The acceptor is the only caller, on charger
    /// socket close (`spec.md` §4.2's removal invariant).
    pub async fn teardown(&self, charge_point_id: &str) {
        if let Some(session) = self.registry.lookup(charge_point_id) {
            session.cancellation().cancel();
            self.registry.remove(charge_point_id);
            if let Err(e) = self.persistence.mark_status(charge_point_id, ChargerStatus::Offline).await {
                warn!(charge_point_id, error = %e, "failed to mark charger offline");
            }
        }
    }

    // ---- operator-facing operations (spec.md §6 contract) -------------

    /// `Inject(action, payload) → {id} | ChargerNotConnected`.
    pub async fn inject(&self, charge_point_id: &str, action: &str, payload: Value) -> Result<String, AppError> {
        let session = self.lookup_or_not_connected(charge_point_id)?;
        let track_auth_tag = action == "RemoteStartTransaction";
        self.inject_call(&session, action, payload, track_auth_tag).await
    }

    /// `SetPersistentLimit(amperes | clear)`. Writes the durable row
    /// first; a persistence failure is returned to the caller before any
    /// injection is emitted (`spec.md` §4.3/§7).
    pub async fn set_persistent_limit(&self, charge_point_id: &str, amperes: Option<Decimal>) -> Result<String, AppError> {
        let session = self.lookup_or_not_connected(charge_point_id)?;
        self.persistence.set_max_power(charge_point_id, amperes).await?;

        match amperes {
            Some(value) => {
                let payload = serde_json::to_value(SetChargingProfileRequest {
                    connector_id: 0,
                    cs_charging_profiles: ChargingProfile::persistent_limit(value),
                })
                .expect("SetChargingProfileRequest always serializes");
                self.inject_call(&session, "SetChargingProfile", payload, false).await
            }
            None => {
                let payload = serde_json::to_value(ClearChargingProfileRequest { id: PERSISTENT_PROFILE_ID })
                    .expect("ClearChargingProfileRequest always serializes");
                self.inject_call(&session, "ClearChargingProfile", payload, false).await
            }
        }
    }

    /// `ApplySessionLimit(amperes, transactionId?)` — one-shot, no durable
    /// write. `TxProfile` when a transaction id is given, else
    /// `TxDefaultProfile`.
    pub async fn apply_session_limit(
        &self,
        charge_point_id: &str,
        amperes: Decimal,
        transaction_id: Option<i64>,
    ) -> Result<String, AppError> {
        let session = self.lookup_or_not_connected(charge_point_id)?;
        let payload = serde_json::to_value(SetChargingProfileRequest {
            connector_id: 0,
            cs_charging_profiles: ChargingProfile::session_limit(amperes, transaction_id, SESSION_PROFILE_ID),
        })
        .expect("SetChargingProfileRequest always serializes");
        self.inject_call(&session, "SetChargingProfile", payload, false).await
    }

    fn lookup_or_not_connected(&self, charge_point_id: &str) -> Result<Arc<Session>, AppError> {
        self.registry
            .lookup(charge_point_id)
            .ok_or_else(|| MediatorError::ChargerNotConnected(charge_point_id.to_string()).into())
    }

    /// Shared injection path: generate an id, track it (and, for
    /// `RemoteStartTransaction`, its `idTag`) for the TTL window, log
    /// `INJECTION_REQUEST`, and send the Call to the charger.
    async fn inject_call(
        &self,
        session: &Arc<Session>,
        action: &str,
        payload: Value,
        track_auth_tag: bool,
    ) -> Result<String, AppError> {
        let id = generate_message_id();
        session.insert_injection(id.clone());
        if track_auth_tag {
            if let Some(tag) = payload.get("idTag").and_then(Value::as_str) {
                session.insert_auth_tag(tag.to_string());
            }
        }

        let frame = OcppFrame::Call {
            id: id.clone(),
            action: action.to_string(),
            payload,
        };
        self.log_queue.push(MessageLogRecord::new(
            &session.charge_point_id,
            Direction::InjectionRequest,
            frame_to_json(&frame),
        ));

        if session.charger_tx.send(frame.serialize()).is_err() {
            return Err(MediatorError::ChargerNotConnected(session.charge_point_id.clone()).into());
        }
        Ok(id)
    }

    // ---- forwarding rules (spec.md §4.3) -------------------------------

    /// Charger → upstream direction. Decodes, logs, intercepts injection
    /// responses, then relays, buffers, or standalone-responds depending
    /// on upstream state.
    pub async fn handle_charger_frame(&self, session: &Arc<Session>, text: String) {
        session.note_first_frame();

        let frame = match OcppFrame::parse(&text) {
            Ok(frame) => frame,
            Err(e) => {
                error!(charge_point_id = %session.charge_point_id, error = %e, "malformed frame from charger, dropping");
                return;
            }
        };

        if frame.is_any_response() && session.take_injection(frame.id()) {
            self.log_queue.push(MessageLogRecord::new(
                &session.charge_point_id,
                Direction::InjectionResponse,
                frame_to_json(&frame),
            ));
            return;
        }

        self.log_queue.push(MessageLogRecord::new(
            &session.charge_point_id,
            Direction::Upstream,
            frame_to_json(&frame),
        ));

        match &frame {
            OcppFrame::Call { id, action, payload } => {
                self.forward_or_respond(session, &text, id, action, payload).await;
            }
            _ => {
                // A response that didn't match a pending injection: it must
                // be answering a Call the CSMS itself sent earlier. Relay it
                // if we can, buffer it if a reconnect may still deliver it,
                // otherwise there is nothing sensible to synthesize — drop.
                if session.try_send_upstream(&text) {
                    return;
                }
                if session.should_buffer() {
                    let capacity = session.config.load().egress_buffer_capacity;
                    session.buffer_egress(text, capacity);
                } else {
                    warn!(
                        charge_point_id = %session.charge_point_id,
                        "dropping response with no matching injection, upstream unavailable"
                    );
                }
            }
        }
    }

    async fn forward_or_respond(&self, session: &Arc<Session>, text: &str, id: &str, action: &str, payload: &Value) {
        if session.try_send_upstream(text) {
            return;
        }

        if session.should_buffer() {
            let capacity = session.config.load().egress_buffer_capacity;
            session.buffer_egress(text.to_string(), capacity);
            return;
        }

        let config = session.config.load();
        let outcome = standalone::respond(
            id,
            action,
            payload,
            &config,
            |tag| session.auth_tag_pending(tag),
            || self.next_transaction_id(),
        );

        if outcome.consume_auth_tag {
            if let Some(tag) = payload.get("idTag").and_then(Value::as_str) {
                session.consume_auth_tag(tag);
            }
        }

        if let Some(response) = outcome.response {
            self.log_queue.push(MessageLogRecord::new(
                &session.charge_point_id,
                Direction::ProxyResponse,
                frame_to_json(&response),
            ));
            let _ = session.charger_tx.send(response.serialize());
        }

        if let Some(scheduled) = outcome.schedule {
            let med = self.clone();
            let sess = session.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(scheduled.delay) => {
                        let track_auth_tag = scheduled.action == "RemoteStartTransaction";
                        let _ = med.inject_call(&sess, &scheduled.action, scheduled.payload, track_auth_tag).await;
                    }
                    _ = sess.cancellation().cancelled() => {}
                }
            });
        }
    }

    /// Upstream → charger direction. Decoded only for the log entry —
    /// raw bytes are relayed regardless of decode success, since the CSMS
    /// owns protocol semantics on its own side.
    async fn handle_upstream_frame(&self, session: &Arc<Session>, text: String) {
        let payload = match OcppFrame::parse(&text) {
            Ok(frame) => frame_to_json(&frame),
            Err(_) => Value::String(text.clone()),
        };
        self.log_queue
            .push(MessageLogRecord::new(&session.charge_point_id, Direction::Downstream, payload));

        if session.charger_tx.send(text).is_err() {
            warn!(charge_point_id = %session.charge_point_id, "charger socket closed, dropping downstream frame");
        }
    }

    // ---- upstream lifecycle & reconnect (spec.md §4.3) -----------------

    async fn run_upstream_manager(&self, session: Arc<Session>) {
        loop {
            let config = session.config.load();
            if !config.csms_forwarding_enabled {
                session.set_status(UpstreamStatus::Absent);
                return;
            }

            session.set_status(UpstreamStatus::Connecting);
            let url = config.upstream_url_for(&session.charge_point_id);
            let timeout = Duration::from_secs(config.upstream_connect_timeout_secs);

            let connected = tokio::select! {
                result = upstream::connect(&url, &session.handshake, timeout) => Some(result),
                _ = session.cancellation().cancelled() => None,
            };

            let Some(connected) = connected else {
                return;
            };

            match connected {
                Ok(stream) => {
                    self.run_open_upstream(&session, stream).await;
                    if session.cancellation().is_cancelled() {
                        return;
                    }
                }
                Err(e) => {
                    warn!(charge_point_id = %session.charge_point_id, error = %e, "upstream connect failed");
                }
            }

            let attempt = session.bump_reconnect_attempt();
            if attempt > config.max_reconnect_attempts {
                session.set_status(UpstreamStatus::GaveUp);
                return;
            }

            session.set_status(UpstreamStatus::WaitRetry);
            let delay = backoff_delay(attempt, config.reconnect_base_delay_ms);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = session.cancellation().cancelled() => return,
            }
        }
    }

    /// Drive one open upstream connection until it closes, errors, or the
    /// session is torn down. Flushes the egress buffer the instant the
    /// connection opens, then relays upstream frames one at a time.
    async fn run_open_upstream(&self, session: &Arc<Session>, stream: UpstreamStream) {
        let (mut sink, mut source) = stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        session.mark_open_and_flush(tx);

        let writer_cp_id = session.charge_point_id.clone();
        let writer = tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                if sink.send(TungsteniteMessage::Text(text)).await.is_err() {
                    warn!(charge_point_id = %writer_cp_id, "upstream write failed, treating as closed");
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                message = source.next() => {
                    match message {
                        Some(Ok(TungsteniteMessage::Text(text))) => {
                            self.handle_upstream_frame(session, text).await;
                        }
                        Some(Ok(TungsteniteMessage::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(charge_point_id = %session.charge_point_id, error = %e, "upstream read error");
                            break;
                        }
                    }
                }
                _ = session.cancellation().cancelled() => break,
            }
        }

        writer.abort();
        session.mark_closed();
    }

    async fn run_ttl_sweep(&self, session: Arc<Session>) {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let ttl = Duration::from_secs(session.config.load().injection_ttl_secs);
                    session.sweep_ttls(ttl);
                }
                _ = session.cancellation().cancelled() => return,
            }
        }
    }
}

fn frame_to_json(frame: &OcppFrame) -> Value {
    serde_json::from_str(&frame.serialize()).expect("OcppFrame::serialize always produces valid JSON")
}
