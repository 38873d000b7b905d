// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Typed encode/decode of each frame payload (C2, §6). All integers are
//! little-endian; strings are length-prefixed (u16 UTF-8 unless noted
//! otherwise).

use crate::rx_meta::RxMetadata;
use crate::tlv::TlvMap;
use crate::types::{frame_type, AckCode, Capabilities};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use displaydoc::Display;

/// Errors decoding a frame payload into a typed [`Message`]. Never fatal to
/// the pipeline on their own (§7): the caller either surfaces them to a
/// waiting caller (for commands it sent) or emits an opaque event (for
/// unsolicited device events).
#[derive(Debug, Clone, PartialEq, Eq, Display, thiserror::Error)]
pub enum DecodeError {
    /// payload too short: needed at least {needed} bytes, had {available}
    Truncated { needed: usize, available: usize },
    /// declared string/slice length {len} exceeds the remaining payload
    LengthOverrun { len: usize },
    /// string field was not valid UTF-8
    InvalidUtf8,
    /// unknown ACK code {0}
    UnknownAckCode(u8),
    /// unrecognized frame type {0:#04x}
    UnknownFrameType(u8),
}

type DecodeResult<T> = Result<T, DecodeError>;

fn require(buf: &[u8], needed: usize) -> DecodeResult<()> {
    if buf.len() < needed {
        Err(DecodeError::Truncated {
            needed,
            available: buf.len(),
        })
    } else {
        Ok(())
    }
}

fn take_u8(buf: &mut Bytes) -> DecodeResult<u8> {
    require(buf, 1)?;
    Ok(buf.get_u8())
}

fn take_u16(buf: &mut Bytes) -> DecodeResult<u16> {
    require(buf, 2)?;
    Ok(buf.get_u16_le())
}

fn take_u32(buf: &mut Bytes) -> DecodeResult<u32> {
    require(buf, 4)?;
    Ok(buf.get_u32_le())
}

fn take_i32(buf: &mut Bytes) -> DecodeResult<i32> {
    require(buf, 4)?;
    Ok(buf.get_i32_le())
}

fn take_u64(buf: &mut Bytes) -> DecodeResult<u64> {
    require(buf, 8)?;
    Ok(buf.get_u64_le())
}

fn take_bytes(buf: &mut Bytes, len: usize) -> DecodeResult<Bytes> {
    if len > buf.len() {
        return Err(DecodeError::LengthOverrun { len });
    }
    Ok(buf.split_to(len))
}

fn take_array8(buf: &mut Bytes) -> DecodeResult<[u8; 8]> {
    require(buf, 8)?;
    let mut out = [0u8; 8];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

fn take_str_u16_prefixed(buf: &mut Bytes) -> DecodeResult<String> {
    let len = take_u16(buf)? as usize;
    let bytes = take_bytes(buf, len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
}

fn take_str_u8_prefixed(buf: &mut Bytes) -> DecodeResult<String> {
    let len = take_u8(buf)? as usize;
    let bytes = take_bytes(buf, len)?;
    // model/firmware strings are ASCII per §6; fall back to lossy rather
    // than aborting decode of the whole HelloAck over a garbled string.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn put_str_u16_prefixed(out: &mut BytesMut, s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(u16::MAX as usize);
    out.put_u16_le(len as u16);
    out.put_slice(&bytes[..len]);
}

fn put_str_u8_prefixed(out: &mut BytesMut, s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(u8::MAX as usize);
    out.put_u8(len as u8);
    out.put_slice(&bytes[..len]);
}

/// `HelloAck` (0x02, device -> host).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloAck {
    pub proto_version: u16,
    pub max_frame_len: u16,
    pub capabilities: Capabilities,
    pub model: String,
    pub firmware: String,
}

impl HelloAck {
    fn decode(mut buf: Bytes) -> DecodeResult<Self> {
        let proto_version = take_u16(&mut buf)?;
        let max_frame_len = take_u16(&mut buf)?;
        let caps_bits = take_u32(&mut buf)?;
        let model = take_str_u8_prefixed(&mut buf)?;
        let firmware = take_str_u8_prefixed(&mut buf)?;
        Ok(Self {
            proto_version,
            max_frame_len,
            capabilities: Capabilities::from_bits_truncate(caps_bits),
            model,
            firmware,
        })
    }

    fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        out.put_u16_le(self.proto_version);
        out.put_u16_le(self.max_frame_len);
        out.put_u32_le(self.capabilities.bits());
        put_str_u8_prefixed(&mut out, &self.model);
        put_str_u8_prefixed(&mut out, &self.firmware);
        out.freeze()
    }
}

/// `Ack` (0x03, device -> host).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub code: AckCode,
}

impl Ack {
    fn decode(mut buf: Bytes) -> DecodeResult<Self> {
        let raw = take_u8(&mut buf)?;
        let code = AckCode::from_u8(raw).ok_or(DecodeError::UnknownAckCode(raw))?;
        Ok(Self { code })
    }

    fn encode(&self) -> Bytes {
        Bytes::copy_from_slice(&[self.code.to_u8()])
    }
}

/// `CmdTxMsg` (0x10, host -> device).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdTxMsg {
    pub to: u32,
    pub channel: u8,
    pub flags: u8,
    pub text: String,
}

impl CmdTxMsg {
    fn decode(mut buf: Bytes) -> DecodeResult<Self> {
        let to = take_u32(&mut buf)?;
        let channel = take_u8(&mut buf)?;
        let flags = take_u8(&mut buf)?;
        let text = take_str_u16_prefixed(&mut buf)?;
        Ok(Self {
            to,
            channel,
            flags,
            text,
        })
    }

    fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        out.put_u32_le(self.to);
        out.put_u8(self.channel);
        out.put_u8(self.flags);
        put_str_u16_prefixed(&mut out, &self.text);
        out.freeze()
    }
}

/// `CmdSetTime` (0x13, host -> device).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmdSetTime {
    pub epoch_s: u64,
}

impl CmdSetTime {
    fn decode(mut buf: Bytes) -> DecodeResult<Self> {
        Ok(Self {
            epoch_s: take_u64(&mut buf)?,
        })
    }

    fn encode(&self) -> Bytes {
        Bytes::copy_from_slice(&self.epoch_s.to_le_bytes())
    }
}

/// Bit in `CmdTxAppData`/`EvAppData`'s `flags` byte indicating a `ts_s`
/// field is present before `total`. This resolves the open question in §9
/// about the two TxAppData wire variants by making presence explicit rather
/// than inferred from frame length.
pub const APP_DATA_FLAG_HAS_TIMESTAMP: u8 = 1 << 0;

/// `CmdTxAppData` (0x15, host -> device).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdTxAppData {
    pub port: u32,
    pub from: u32,
    pub to: u32,
    pub channel: u8,
    pub flags: u8,
    pub team_id: [u8; 8],
    pub team_key_id: u32,
    pub ts_s: Option<u32>,
    pub total_length: u32,
    pub offset: u32,
    pub chunk: Bytes,
}

impl CmdTxAppData {
    fn decode(mut buf: Bytes) -> DecodeResult<Self> {
        let port = take_u32(&mut buf)?;
        let from = take_u32(&mut buf)?;
        let to = take_u32(&mut buf)?;
        let channel = take_u8(&mut buf)?;
        let flags = take_u8(&mut buf)?;
        let team_id = take_array8(&mut buf)?;
        let team_key_id = take_u32(&mut buf)?;
        let ts_s = if flags & APP_DATA_FLAG_HAS_TIMESTAMP != 0 {
            Some(take_u32(&mut buf)?)
        } else {
            None
        };
        let total_length = take_u32(&mut buf)?;
        let offset = take_u32(&mut buf)?;
        let chunk_len = take_u16(&mut buf)? as usize;
        let chunk = take_bytes(&mut buf, chunk_len)?;
        Ok(Self {
            port,
            from,
            to,
            channel,
            flags,
            team_id,
            team_key_id,
            ts_s,
            total_length,
            offset,
            chunk,
        })
    }

    fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        out.put_u32_le(self.port);
        out.put_u32_le(self.from);
        out.put_u32_le(self.to);
        out.put_u8(self.channel);
        out.put_u8(self.flags);
        out.put_slice(&self.team_id);
        out.put_u32_le(self.team_key_id);
        if let Some(ts) = self.ts_s {
            out.put_u32_le(ts);
        }
        out.put_u32_le(self.total_length);
        out.put_u32_le(self.offset);
        out.put_u16_le(self.chunk.len().min(u16::MAX as usize) as u16);
        out.put_slice(&self.chunk);
        out.freeze()
    }
}

/// `EvRxMsg` (0x80, device -> host).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvRxMsg {
    pub msg_id: u32,
    pub from: u32,
    pub to: u32,
    pub channel: u8,
    pub ts: u32,
    pub text: String,
    pub rx_meta: Option<RxMetadata>,
}

impl EvRxMsg {
    fn decode(mut buf: Bytes) -> DecodeResult<Self> {
        let msg_id = take_u32(&mut buf)?;
        let from = take_u32(&mut buf)?;
        let to = take_u32(&mut buf)?;
        let channel = take_u8(&mut buf)?;
        let ts = take_u32(&mut buf)?;
        let text = take_str_u16_prefixed(&mut buf)?;
        let rx_meta = (!buf.is_empty()).then(|| RxMetadata::decode(&buf));
        Ok(Self {
            msg_id,
            from,
            to,
            channel,
            ts,
            text,
            rx_meta,
        })
    }

    fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        out.put_u32_le(self.msg_id);
        out.put_u32_le(self.from);
        out.put_u32_le(self.to);
        out.put_u8(self.channel);
        out.put_u32_le(self.ts);
        put_str_u16_prefixed(&mut out, &self.text);
        if let Some(meta) = &self.rx_meta {
            out.put_slice(&meta.encode());
        }
        out.freeze()
    }
}

/// `EvTxResult` (0x81, device -> host).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvTxResult {
    pub msg_id: u32,
    pub success: bool,
}

impl EvTxResult {
    fn decode(mut buf: Bytes) -> DecodeResult<Self> {
        let msg_id = take_u32(&mut buf)?;
        let success = take_u8(&mut buf)? != 0;
        Ok(Self { msg_id, success })
    }

    fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        out.put_u32_le(self.msg_id);
        out.put_u8(self.success as u8);
        out.freeze()
    }
}

pub mod status_key {
    pub const BATTERY_PCT: u8 = 1;
    pub const UPTIME_S: u8 = 2;
    pub const LINK_QUALITY: u8 = 3;
    pub const VOLTAGE_MV: u8 = 4;
}

/// `EvStatus` (0x82, device -> host): a status record plus a parallel
/// config map sourced from the same TLV stream's known keys (§4.2).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EvStatus {
    pub battery_pct: Option<u8>,
    pub uptime_s: Option<u32>,
    pub link_quality: Option<u8>,
    pub voltage_mv: Option<u16>,
    pub config: TlvMap,
}

impl EvStatus {
    fn decode(buf: Bytes) -> DecodeResult<Self> {
        let config = TlvMap::decode(&buf);
        let mut status = EvStatus {
            config: config.clone(),
            ..Default::default()
        };

        if let Some(v) = config.get(status_key::BATTERY_PCT) {
            if let Some(&b) = v.first() {
                status.battery_pct = Some(b);
            }
        }
        if let Some(v) = config.get(status_key::UPTIME_S) {
            if v.len() == 4 {
                status.uptime_s = Some(u32::from_le_bytes(v[..4].try_into().unwrap()));
            }
        }
        if let Some(v) = config.get(status_key::LINK_QUALITY) {
            if let Some(&b) = v.first() {
                status.link_quality = Some(b);
            }
        }
        if let Some(v) = config.get(status_key::VOLTAGE_MV) {
            if v.len() == 2 {
                status.voltage_mv = Some(u16::from_le_bytes(v[..2].try_into().unwrap()));
            }
        }

        Ok(status)
    }

    fn encode(&self) -> Bytes {
        self.config.encode()
    }
}

/// `EvGps` (0x84, device -> host).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvGps {
    pub flags: u8,
    pub sats: u8,
    pub age_ms: u32,
    pub lat_e7: i32,
    pub lon_e7: i32,
    pub alt_cm: i32,
    pub speed_cms: u16,
    pub course_cdeg: u16,
}

impl EvGps {
    fn decode(mut buf: Bytes) -> DecodeResult<Self> {
        let flags = take_u8(&mut buf)?;
        let sats = take_u8(&mut buf)?;
        let age_ms = take_u32(&mut buf)?;
        let lat_e7 = take_i32(&mut buf)?;
        let lon_e7 = take_i32(&mut buf)?;
        let alt_cm = take_i32(&mut buf)?;
        let speed_cms = take_u16(&mut buf)?;
        let course_cdeg = take_u16(&mut buf)?;
        Ok(Self {
            flags,
            sats,
            age_ms,
            lat_e7,
            lon_e7,
            alt_cm,
            speed_cms,
            course_cdeg,
        })
    }

    fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        out.put_u8(self.flags);
        out.put_u8(self.sats);
        out.put_u32_le(self.age_ms);
        out.put_i32_le(self.lat_e7);
        out.put_i32_le(self.lon_e7);
        out.put_i32_le(self.alt_cm);
        out.put_u16_le(self.speed_cms);
        out.put_u16_le(self.course_cdeg);
        out.freeze()
    }
}

/// `EvAppData` (0x85, device -> host): header + chunk + optional trailing
/// RX metadata TLV (§4.2, §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvAppData {
    pub port: u32,
    pub from: u32,
    pub to: u32,
    pub channel: u8,
    pub flags: u8,
    pub team_id: [u8; 8],
    pub team_key_id: u32,
    pub device_uptime_s: u32,
    pub total_length: u32,
    pub offset: u32,
    pub chunk: Bytes,
    pub rx_meta: Option<RxMetadata>,
}

impl EvAppData {
    fn decode(mut buf: Bytes) -> DecodeResult<Self> {
        let port = take_u32(&mut buf)?;
        let from = take_u32(&mut buf)?;
        let to = take_u32(&mut buf)?;
        let channel = take_u8(&mut buf)?;
        let flags = take_u8(&mut buf)?;
        let team_id = take_array8(&mut buf)?;
        let team_key_id = take_u32(&mut buf)?;
        let device_uptime_s = take_u32(&mut buf)?;
        let total_length = take_u32(&mut buf)?;
        let offset = take_u32(&mut buf)?;
        let chunk_len = take_u16(&mut buf)? as usize;
        let chunk = take_bytes(&mut buf, chunk_len)?;
        let rx_meta = (!buf.is_empty()).then(|| RxMetadata::decode(&buf));
        Ok(Self {
            port,
            from,
            to,
            channel,
            flags,
            team_id,
            team_key_id,
            device_uptime_s,
            total_length,
            offset,
            chunk,
            rx_meta,
        })
    }

    fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        out.put_u32_le(self.port);
        out.put_u32_le(self.from);
        out.put_u32_le(self.to);
        out.put_u8(self.channel);
        out.put_u8(self.flags);
        out.put_slice(&self.team_id);
        out.put_u32_le(self.team_key_id);
        out.put_u32_le(self.device_uptime_s);
        out.put_u32_le(self.total_length);
        out.put_u32_le(self.offset);
        out.put_u16_le(self.chunk.len().min(u16::MAX as usize) as u16);
        out.put_slice(&self.chunk);
        if let Some(meta) = &self.rx_meta {
            out.put_slice(&meta.encode());
        }
        out.freeze()
    }
}

/// `EvTeamState` (0x86, device -> host). §6 defers to "the source schema"
/// without reproducing it; this crate implements the minimal shape the rest
/// of the spec actually reads from it -- the team context triplet (§4.5,
/// glossary) -- and preserves the raw remainder for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvTeamState {
    pub team_id: [u8; 8],
    pub team_key_id: u32,
    pub channel: u8,
    pub extra: Bytes,
}

impl EvTeamState {
    fn decode(mut buf: Bytes) -> DecodeResult<Self> {
        let team_id = take_array8(&mut buf)?;
        let team_key_id = take_u32(&mut buf)?;
        let channel = take_u8(&mut buf)?;
        Ok(Self {
            team_id,
            team_key_id,
            channel,
            extra: buf,
        })
    }

    fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        out.put_slice(&self.team_id);
        out.put_u32_le(self.team_key_id);
        out.put_u8(self.channel);
        out.put_slice(&self.extra);
        out.freeze()
    }
}

/// A decoded HostLink payload, tagged by the frame type it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Hello,
    HelloAck(HelloAck),
    Ack(Ack),
    CmdTxMsg(CmdTxMsg),
    CmdGetConfig,
    CmdSetConfig(TlvMap),
    CmdSetTime(CmdSetTime),
    CmdGetGps,
    CmdTxAppData(CmdTxAppData),
    EvRxMsg(EvRxMsg),
    EvTxResult(EvTxResult),
    EvStatus(EvStatus),
    EvGps(EvGps),
    EvAppData(EvAppData),
    EvTeamState(EvTeamState),
}

impl Message {
    pub fn frame_type(&self) -> u8 {
        match self {
            Message::Hello => frame_type::HELLO,
            Message::HelloAck(_) => frame_type::HELLO_ACK,
            Message::Ack(_) => frame_type::ACK,
            Message::CmdTxMsg(_) => frame_type::CMD_TX_MSG,
            Message::CmdGetConfig => frame_type::CMD_GET_CONFIG,
            Message::CmdSetConfig(_) => frame_type::CMD_SET_CONFIG,
            Message::CmdSetTime(_) => frame_type::CMD_SET_TIME,
            Message::CmdGetGps => frame_type::CMD_GET_GPS,
            Message::CmdTxAppData(_) => frame_type::CMD_TX_APP_DATA,
            Message::EvRxMsg(_) => frame_type::EV_RX_MSG,
            Message::EvTxResult(_) => frame_type::EV_TX_RESULT,
            Message::EvStatus(_) => frame_type::EV_STATUS,
            Message::EvGps(_) => frame_type::EV_GPS,
            Message::EvAppData(_) => frame_type::EV_APP_DATA,
            Message::EvTeamState(_) => frame_type::EV_TEAM_STATE,
        }
    }

    pub fn encode_payload(&self) -> Bytes {
        match self {
            Message::Hello | Message::CmdGetConfig | Message::CmdGetGps => Bytes::new(),
            Message::HelloAck(m) => m.encode(),
            Message::Ack(m) => m.encode(),
            Message::CmdTxMsg(m) => m.encode(),
            Message::CmdSetConfig(m) => m.encode(),
            Message::CmdSetTime(m) => m.encode(),
            Message::CmdTxAppData(m) => m.encode(),
            Message::EvRxMsg(m) => m.encode(),
            Message::EvTxResult(m) => m.encode(),
            Message::EvStatus(m) => m.encode(),
            Message::EvGps(m) => m.encode(),
            Message::EvAppData(m) => m.encode(),
            Message::EvTeamState(m) => m.encode(),
        }
    }

    pub fn decode(frame_type: u8, payload: Bytes) -> DecodeResult<Self> {
        Ok(match frame_type {
            frame_type::HELLO => Message::Hello,
            frame_type::HELLO_ACK => Message::HelloAck(HelloAck::decode(payload)?),
            frame_type::ACK => Message::Ack(Ack::decode(payload)?),
            frame_type::CMD_TX_MSG => Message::CmdTxMsg(CmdTxMsg::decode(payload)?),
            frame_type::CMD_GET_CONFIG => Message::CmdGetConfig,
            frame_type::CMD_SET_CONFIG => Message::CmdSetConfig(TlvMap::decode(&payload)),
            frame_type::CMD_SET_TIME => Message::CmdSetTime(CmdSetTime::decode(payload)?),
            frame_type::CMD_GET_GPS => Message::CmdGetGps,
            frame_type::CMD_TX_APP_DATA => Message::CmdTxAppData(CmdTxAppData::decode(payload)?),
            frame_type::EV_RX_MSG => Message::EvRxMsg(EvRxMsg::decode(payload)?),
            frame_type::EV_TX_RESULT => Message::EvTxResult(EvTxResult::decode(payload)?),
            frame_type::EV_STATUS => Message::EvStatus(EvStatus::decode(payload)?),
            frame_type::EV_GPS => Message::EvGps(EvGps::decode(payload)?),
            frame_type::EV_APP_DATA => Message::EvAppData(EvAppData::decode(payload)?),
            frame_type::EV_TEAM_STATE => Message::EvTeamState(EvTeamState::decode(payload)?),
            other => return Err(DecodeError::UnknownFrameType(other)),
        })
    }
}
