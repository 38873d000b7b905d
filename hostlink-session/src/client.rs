// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The session client (C5, §4.5): owns one transport, one codec, one
//! tracker, one reassembler, one decoder, and drives the connection
//! lifecycle, command/ack matching, AppData ingress fan-out, and team
//! chat/command send with its compatibility fallback ladder.

use crate::decoder::Decoder;
use crate::error::{SessionError, SessionResult};
use crate::reassembler::Reassembler;
use crate::records::{MessageEntry, MessageStatus};
use crate::state::ConnectionState;
use crate::store::SessionStore;
use crate::tracker::{AckOutcome, RequestTracker};
use bytes::{Bytes, BytesMut};
use hostlink_protocol::message::{
    self, CmdTxAppData, CmdTxMsg, EvGps, EvStatus, HelloAck, APP_DATA_FLAG_HAS_TIMESTAMP,
};
use hostlink_protocol::{AckCode, Capabilities, Frame, FrameDecoder, Message, RawFrameObservation};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{split, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{broadcast, oneshot};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_millis(1500);
const DEFAULT_MAX_RETRIES: u32 = 2;
const WATCHDOG_INTERVAL: Duration = Duration::from_millis(200);
/// Conservative estimate of the non-chunk bytes in one `CmdTxAppData`
/// payload, used to size fragments so the encoded frame stays under the
/// device's advertised `max_frame_len`.
const APP_DATA_FRAGMENT_OVERHEAD: usize = 4 + 4 + 4 + 1 + 1 + 8 + 4 + 5 + 4 + 4;

#[derive(Clone, Debug)]
pub struct DeviceInfo {
    pub proto_version: u16,
    pub max_frame_len: u16,
    pub capabilities: Capabilities,
    pub model: String,
    pub firmware: String,
}

#[derive(Clone, Copy, Debug)]
pub struct TeamContext {
    pub team_id: [u8; 8],
    pub team_key_id: u32,
    pub channel: u8,
}

/// One candidate wire shape for a `CmdTxAppData` send, tried in order until
/// one is accepted (§9's open question: the order itself is not
/// load-bearing).
#[derive(Clone, Copy, Debug)]
struct AppDataVariant {
    flags: u8,
    from: u32,
    to: u32,
    channel: u8,
    team_id: [u8; 8],
    team_key_id: u32,
    with_timestamp: bool,
}

fn default_variants(team: Option<TeamContext>) -> Vec<AppDataVariant> {
    let (team_id, team_key_id, channel) = team
        .map(|t| (t.team_id, t.team_key_id, t.channel))
        .unwrap_or(([0; 8], 0, 0));

    vec![
        AppDataVariant {
            flags: APP_DATA_FLAG_HAS_TIMESTAMP,
            from: 0,
            to: 0xFFFF_FFFF,
            channel,
            team_id,
            team_key_id,
            with_timestamp: true,
        },
        AppDataVariant {
            flags: 0,
            from: 0,
            to: 0xFFFF_FFFF,
            channel,
            team_id,
            team_key_id,
            with_timestamp: false,
        },
        AppDataVariant {
            flags: 0,
            from: 0,
            to: 0,
            channel: 0,
            team_id: [0; 8],
            team_key_id: 0,
            with_timestamp: false,
        },
    ]
}

/// Which follow-up action a seq's eventual ACK should trigger, beyond just
/// resolving the tracker's ACK future.
enum PendingKind {
    Generic,
    Message(u32),
    Status(oneshot::Sender<EvStatus>),
    Gps(oneshot::Sender<EvGps>),
}

struct ClientState {
    connection: ConnectionState,
    device_info: Option<DeviceInfo>,
    team_context: Option<TeamContext>,
    hello_waiter: Option<oneshot::Sender<HelloAck>>,
    pending_kinds: HashMap<u16, PendingKind>,
    awaiting_tx_results: VecDeque<u32>,
    #[allow(dead_code)]
    auto_reconnect: bool,
}

/// Owns one transport, one codec, one tracker, one reassembler, one
/// decoder (§4.5). Generic over the transport type so tests can run
/// against an in-memory duplex instead of a real serial port.
pub struct SessionClient<T> {
    writer: tokio::sync::Mutex<WriteHalf<T>>,
    state: Mutex<ClientState>,
    tracker: RequestTracker,
    reassembler: Reassembler,
    decoder: Decoder,
    store: Arc<SessionStore>,
    raw_frame_tx: broadcast::Sender<RawFrameObservation>,
    trace_id: AtomicU64,
}

impl<T> SessionClient<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Splits `transport` into read/write halves and spawns the reader and
    /// watchdog tasks.
    pub fn new(transport: T, store: Arc<SessionStore>, auto_reconnect: bool) -> Arc<Self> {
        let (read_half, write_half) = split(transport);
        let (raw_frame_tx, _rx) = broadcast::channel(256);

        let client = Arc::new(Self {
            writer: tokio::sync::Mutex::new(write_half),
            state: Mutex::new(ClientState {
                connection: ConnectionState::Disconnected,
                device_info: None,
                team_context: None,
                hello_waiter: None,
                pending_kinds: HashMap::new(),
                awaiting_tx_results: VecDeque::new(),
                auto_reconnect,
            }),
            tracker: RequestTracker::new(),
            reassembler: Reassembler::new(),
            decoder: Decoder,
            store,
            raw_frame_tx,
            trace_id: AtomicU64::new(1),
        });

        tokio::spawn(Self::reader_loop(client.clone(), read_half));
        tokio::spawn(Self::watchdog_loop(client.clone()));

        client
    }

    /// Raw-frame inspector feed (§12): every decoded frame's ok/crc-mismatch
    /// observation, for diagnostics tooling outside this crate.
    pub fn subscribe_raw_frames(&self) -> broadcast::Receiver<RawFrameObservation> {
        self.raw_frame_tx.subscribe()
    }

    pub fn is_ready(&self) -> bool {
        self.state.lock().unwrap().connection.is_ready()
    }

    pub fn device_info(&self) -> Option<DeviceInfo> {
        self.state.lock().unwrap().device_info.clone()
    }

    /// §12: capability-gated command behavior -- callers check this before
    /// sending an optional command rather than relying on an `Unsupported`
    /// ACK.
    pub fn supports(&self, capability: Capabilities) -> bool {
        self.state
            .lock()
            .unwrap()
            .device_info
            .as_ref()
            .map(|d| d.capabilities.contains(capability))
            .unwrap_or(false)
    }

    /// Performs the connect/handshake sequence (§4.5): Hello, await
    /// HelloAck within 3 s, store device info, optionally `CmdSetTime`,
    /// then transition to `Ready`.
    pub async fn connect(self: &Arc<Self>) -> SessionResult<()> {
        {
            let mut state = self.state.lock().unwrap();
            state.connection.connect().ok();
            state.connection.begin_handshake().ok();
        }

        let (tx, rx) = oneshot::channel();
        self.state.lock().unwrap().hello_waiter = Some(tx);

        let seq = self.tracker.alloc_seq();
        let frame_bytes = self.encode_message(seq, &Message::Hello)?;
        if let Err(err) = self.write_frame_bytes(&frame_bytes).await {
            self.state.lock().unwrap().connection.fail(err.to_string()).ok();
            return Err(err);
        }

        let hello_ack = match tokio::time::timeout(HANDSHAKE_TIMEOUT, rx).await {
            Ok(Ok(ack)) => ack,
            _ => {
                self.state
                    .lock()
                    .unwrap()
                    .connection
                    .fail("handshake timed out")
                    .ok();
                return Err(SessionError::HandshakeTimeout);
            }
        };

        {
            let mut state = self.state.lock().unwrap();
            state.device_info = Some(DeviceInfo {
                proto_version: hello_ack.proto_version,
                max_frame_len: hello_ack.max_frame_len,
                capabilities: hello_ack.capabilities,
                model: hello_ack.model,
                firmware: hello_ack.firmware,
            });
        }

        if self.supports(Capabilities::SET_TIME) {
            let epoch_s = chrono::Utc::now().timestamp() as u64;
            let cmd = Message::CmdSetTime(message::CmdSetTime { epoch_s });
            if let Err(err) = self.send_tracked(cmd, PendingKind::Generic).await {
                tracing::warn!(?err, "CmdSetTime failed during handshake, continuing");
            }
        }

        self.state.lock().unwrap().connection.handshake_complete().ok();
        tracing::info!("connection ready");
        Ok(())
    }

    /// Sends `CmdTxMsg` and returns the message id (the frame seq, reused
    /// as the session store's key since the wire protocol assigns no
    /// separate id at send time). For broadcast destinations an `Ok` ACK
    /// is terminal; for unicast it advances to `Acked` pending a later
    /// `EvTxResult`, observable via the session store.
    pub async fn send_message(
        self: &Arc<Self>,
        to: u32,
        channel: u8,
        text: impl Into<String>,
    ) -> SessionResult<u32> {
        if !self.is_ready() {
            return Err(SessionError::NotReady);
        }
        let text = text.into();
        let payload = CmdTxMsg {
            to,
            channel,
            flags: 0,
            text: text.clone(),
        };

        let seq = self.tracker.alloc_seq();
        let msg_id = seq as u32;
        self.store
            .put_message(MessageEntry::new(msg_id, to, channel, text));

        let outcome = self
            .send_tracked(Message::CmdTxMsg(payload), PendingKind::Message(msg_id))
            .await;

        let ack_outcome = match outcome {
            Ok(()) => AckOutcome::Ack(AckCode::Ok),
            Err(SessionError::Rejected(code)) => AckOutcome::Ack(code),
            Err(SessionError::Timeout) => AckOutcome::TimedOut,
            Err(other) => return Err(other),
        };
        self.resolve_message_ack(msg_id, to, ack_outcome);
        Ok(msg_id)
    }

    fn resolve_message_ack(&self, msg_id: u32, to: u32, outcome: AckOutcome) {
        let Some(mut entry) = self.store.message(msg_id) else {
            return;
        };
        match outcome {
            AckOutcome::Ack(AckCode::Ok) if MessageEntry::is_broadcast(to) => {
                entry.status = MessageStatus::Succeeded;
            }
            AckOutcome::Ack(AckCode::Ok) => {
                entry.status = MessageStatus::Acked;
                self.state.lock().unwrap().awaiting_tx_results.push_back(msg_id);
            }
            AckOutcome::Ack(code) => {
                entry.status = MessageStatus::Failed;
                entry.error = Some(format!("{code:?}"));
            }
            AckOutcome::TimedOut => {
                entry.status = MessageStatus::Timeout;
            }
        }
        self.store.put_message(entry);
    }

    /// Sends `CmdGetConfig` and returns the device's config TLV map.
    pub async fn get_config(self: &Arc<Self>) -> SessionResult<hostlink_protocol::TlvMap> {
        if !self.supports(Capabilities::CONFIG) {
            return Err(SessionError::UnsupportedCapability);
        }
        let (tx, rx) = oneshot::channel::<EvStatus>();
        self.send_tracked(Message::CmdGetConfig, PendingKind::Status(tx))
            .await?;
        let status = rx.await.map_err(|_| SessionError::Timeout)?;
        Ok(status.config)
    }

    pub async fn set_config(self: &Arc<Self>, config: hostlink_protocol::TlvMap) -> SessionResult<()> {
        if !self.supports(Capabilities::CONFIG) {
            return Err(SessionError::UnsupportedCapability);
        }
        self.send_tracked(Message::CmdSetConfig(config), PendingKind::Generic)
            .await
    }

    /// §12: `request_status()`, distinct from `get_config`/`set_config`
    /// -- a caller only needs the status fields, not the raw config map.
    /// Reuses `CmdGetConfig`, the wire frame `EvStatus` is already defined
    /// to answer: both a spontaneous push and the poll response.
    pub async fn request_status(self: &Arc<Self>) -> SessionResult<EvStatus> {
        if !self.supports(Capabilities::STATUS) {
            return Err(SessionError::UnsupportedCapability);
        }
        let (tx, rx) = oneshot::channel::<EvStatus>();
        self.send_tracked(Message::CmdGetConfig, PendingKind::Status(tx))
            .await?;
        rx.await.map_err(|_| SessionError::Timeout)
    }

    /// §12: `request_gps()`, same register/ack/await-event shape as
    /// `get_config`, reaching the `CmdGetGps`/`EvGps` pair the wire table
    /// names but §4.5 never narrates a method for.
    pub async fn request_gps(self: &Arc<Self>) -> SessionResult<EvGps> {
        if !self.supports(Capabilities::GPS) {
            return Err(SessionError::UnsupportedCapability);
        }
        let (tx, rx) = oneshot::channel::<EvGps>();
        self.send_tracked(Message::CmdGetGps, PendingKind::Gps(tx))
            .await?;
        rx.await.map_err(|_| SessionError::Timeout)
    }

    /// Allocates a seq, encodes `message` under it, registers the pending
    /// entry (with a follow-up `kind`), writes it, and awaits the ACK.
    async fn send_tracked(self: &Arc<Self>, message: Message, kind: PendingKind) -> SessionResult<()> {
        let frame_type = message.frame_type();
        let seq = self.tracker.alloc_seq();
        let frame_bytes = self.encode_message(seq, &message)?;

        let handle = self.tracker.register_with_seq(
            seq,
            frame_type,
            frame_bytes.clone(),
            DEFAULT_ACK_TIMEOUT,
            DEFAULT_MAX_RETRIES,
        );
        self.state.lock().unwrap().pending_kinds.insert(seq, kind);

        self.write_frame_bytes(&frame_bytes).await?;

        match handle.ack.await.unwrap_or(AckOutcome::TimedOut) {
            AckOutcome::Ack(code) if code.is_ok() => Ok(()),
            AckOutcome::Ack(code) => Err(SessionError::Rejected(code)),
            AckOutcome::TimedOut => Err(SessionError::Timeout),
        }
    }

    /// Fragments `payload` under `port` across `CmdTxAppData` frames and
    /// tries the compatibility variant ladder (§4.5, §9), stopping at the
    /// first non-`InvalidParam` ACK.
    pub async fn send_app_data(self: &Arc<Self>, port: u32, payload: Bytes) -> SessionResult<()> {
        if !self.supports(Capabilities::APP_DATA) {
            return Err(SessionError::UnsupportedCapability);
        }
        let team = self.state.lock().unwrap().team_context;
        let variants = default_variants(team);
        let max_frame_len = self
            .device_info()
            .map(|d| d.max_frame_len as usize)
            .unwrap_or(hostlink_protocol::MAX_PAYLOAD_LEN);
        let chunk_len = max_frame_len.saturating_sub(APP_DATA_FRAGMENT_OVERHEAD).max(1);

        let total_length = payload.len() as u32;
        let mut chosen: Option<AppDataVariant> = None;
        let mut offset = 0u32;

        for variant in &variants {
            let trace_id = self.trace_id.fetch_add(1, Ordering::Relaxed);
            let chunk = &payload[..payload.len().min(chunk_len)];
            let cmd = self.build_app_data_cmd(port, *variant, total_length, 0, chunk);
            tracing::debug!(trace_id, ?variant, "attempting app-data variant");

            match self
                .send_tracked(Message::CmdTxAppData(cmd), PendingKind::Generic)
                .await
            {
                Ok(()) => {
                    chosen = Some(*variant);
                    offset = chunk.len() as u32;
                    break;
                }
                Err(SessionError::Rejected(AckCode::InvalidParam)) => {
                    tracing::debug!(trace_id, "variant rejected as invalid param, trying next");
                    continue;
                }
                Err(other) => return Err(other),
            }
        }

        let Some(variant) = chosen else {
            return Err(SessionError::NoCompatibleVariant);
        };

        while (offset as usize) < payload.len() {
            let end = (offset as usize + chunk_len).min(payload.len());
            let chunk = &payload[offset as usize..end];
            let cmd = self.build_app_data_cmd(port, variant, total_length, offset, chunk);
            self.send_tracked(Message::CmdTxAppData(cmd), PendingKind::Generic)
                .await?;
            offset = end as u32;
        }

        Ok(())
    }

    fn build_app_data_cmd(
        &self,
        port: u32,
        variant: AppDataVariant,
        total_length: u32,
        offset: u32,
        chunk: &[u8],
    ) -> CmdTxAppData {
        CmdTxAppData {
            port,
            from: variant.from,
            to: variant.to,
            channel: variant.channel,
            flags: variant.flags,
            team_id: variant.team_id,
            team_key_id: variant.team_key_id,
            ts_s: if variant.with_timestamp {
                Some(chrono::Utc::now().timestamp() as u32)
            } else {
                None
            },
            total_length,
            offset,
            chunk: Bytes::copy_from_slice(chunk),
        }
    }

    fn encode_message(&self, seq: u16, message: &Message) -> SessionResult<Bytes> {
        let frame = Frame::new(message.frame_type(), seq, message.encode_payload());
        frame
            .encode()
            .map(|b| b.freeze())
            .map_err(|e| SessionError::Transport(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    async fn write_frame_bytes(&self, bytes: &[u8]) -> SessionResult<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn reader_loop(self: Arc<Self>, mut read_half: ReadHalf<T>) {
        let mut decoder = FrameDecoder::new();
        let mut buf = vec![0u8; 4096];

        loop {
            match read_half.read(&mut buf).await {
                Ok(0) => {
                    self.on_transport_closed();
                    return;
                }
                Ok(n) => {
                    decoder.extend(&buf[..n]);
                    while let Some(result) = decoder.poll() {
                        match result {
                            Ok((frame, observation)) => {
                                let _ = self.raw_frame_tx.send(observation);
                                self.handle_frame(frame);
                            }
                            Err(err) => {
                                tracing::debug!(?err, "frame resync");
                            }
                        }
                    }
                }
                Err(err) => {
                    tracing::error!(?err, "transport read error");
                    self.on_transport_closed();
                    return;
                }
            }
        }
    }

    fn on_transport_closed(&self) {
        let mut state = self.state.lock().unwrap();
        let _ = state.connection.fail("transport closed");
    }

    fn handle_frame(self: &Arc<Self>, frame: Frame) {
        let decoded = Message::decode(frame.frame_type, frame.payload.clone());
        let message = match decoded {
            Ok(m) => m,
            Err(err) => {
                tracing::debug!(?err, frame_type = frame.frame_type, "undecodable frame");
                return;
            }
        };

        match message {
            Message::HelloAck(hello_ack) => {
                if let Some(tx) = self.state.lock().unwrap().hello_waiter.take() {
                    let _ = tx.send(hello_ack);
                }
            }
            Message::Ack(ack) => {
                self.tracker.handle_ack(frame.seq, ack.code);
            }
            Message::EvTxResult(result) => {
                let msg_id = self.state.lock().unwrap().awaiting_tx_results.pop_front();
                if let Some(msg_id) = msg_id {
                    if let Some(mut entry) = self.store.message(msg_id) {
                        entry.status = if result.success {
                            MessageStatus::Succeeded
                        } else {
                            MessageStatus::Failed
                        };
                        self.store.put_message(entry);
                    }
                }
            }
            Message::EvStatus(status) => {
                if let Some(PendingKind::Status(tx)) = self.take_matching_waiter(is_status_waiter) {
                    let _ = tx.send(status);
                }
            }
            Message::EvGps(gps) => {
                if let Some(PendingKind::Gps(tx)) = self.take_matching_waiter(is_gps_waiter) {
                    let _ = tx.send(gps);
                }
            }
            Message::EvAppData(ev) => {
                if let Some(packet) = self.reassembler.ingest(ev) {
                    let records = self.decoder.decode(packet);
                    for p in records.positions {
                        self.store.put_position(p);
                    }
                    for n in records.node_info {
                        self.store.put_node_info(n);
                    }
                    for e in records.events {
                        self.store.put_event(e);
                    }
                    for m in records.messages {
                        self.store.put_message(m);
                    }
                }
            }
            Message::EvTeamState(ev) => {
                self.state.lock().unwrap().team_context = Some(TeamContext {
                    team_id: ev.team_id,
                    team_key_id: ev.team_key_id,
                    channel: ev.channel,
                });
            }
            Message::EvRxMsg(_) | Message::CmdTxMsg(_) | Message::CmdGetConfig
            | Message::CmdSetConfig(_) | Message::CmdSetTime(_) | Message::CmdGetGps
            | Message::CmdTxAppData(_) | Message::Hello => {
                // Unsolicited or host-originated frame types echoed back;
                // nothing to do on receipt.
            }
        }
    }

    fn take_matching_waiter(&self, matches: fn(&PendingKind) -> bool) -> Option<PendingKind> {
        let mut state = self.state.lock().unwrap();
        let seq = state
            .pending_kinds
            .iter()
            .find(|(_, k)| matches(k))
            .map(|(seq, _)| *seq)?;
        state.pending_kinds.remove(&seq)
    }

    async fn watchdog_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(WATCHDOG_INTERVAL);
        loop {
            ticker.tick().await;
            let timed_out = self.tracker.get_timed_out(std::time::Instant::now());
            for entry in timed_out {
                if entry.retries < entry.max_retries {
                    self.tracker.mark_retried(entry.seq, std::time::Instant::now());
                    if self.write_frame_bytes(&entry.frame_bytes).await.is_err() {
                        self.on_transport_closed();
                    }
                } else {
                    self.tracker.finalize_timeout(entry.seq);
                    let kind = self.state.lock().unwrap().pending_kinds.remove(&entry.seq);
                    if let Some(PendingKind::Message(msg_id)) = kind {
                        if let Some(mut e) = self.store.message(msg_id) {
                            e.status = MessageStatus::Timeout;
                            self.store.put_message(e);
                        }
                    }
                }
            }
        }
    }
}

fn is_status_waiter(kind: &PendingKind) -> bool {
    matches!(kind, PendingKind::Status(_))
}

fn is_gps_waiter(kind: &PendingKind) -> bool {
    matches!(kind, PendingKind::Gps(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostlink_protocol::message::HelloAck as HelloAckMsg;
    use tokio::io::AsyncReadExt as _;

    fn hello_ack_frame(seq: u16) -> BytesMut {
        let ack = HelloAckMsg {
            proto_version: 1,
            max_frame_len: 512,
            capabilities: Capabilities::all(),
            model: "test".into(),
            firmware: "1.0".into(),
        };
        let message = Message::HelloAck(ack);
        Frame::new(message.frame_type(), seq, message.encode_payload())
            .encode()
            .unwrap()
    }

    #[tokio::test]
    async fn connect_completes_handshake_over_duplex_transport() {
        let (client_end, mut device_end) = tokio::io::duplex(4096);
        let store = Arc::new(SessionStore::new());
        let client = SessionClient::new(client_end, store, true);

        // Drain the Hello frame the client sends, then reply with HelloAck.
        let mut hello_buf = vec![0u8; 64];
        let n = device_end.read(&mut hello_buf).await.unwrap();
        assert!(n > 0);

        let reply = hello_ack_frame(1);
        device_end.write_all(&reply).await.unwrap();
        device_end.flush().await.unwrap();

        client.connect().await.unwrap();
        assert!(client.is_ready());
        assert_eq!(client.device_info().unwrap().model, "test");
    }
}
