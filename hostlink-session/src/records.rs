// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Semantic domain records (§3): `PositionUpdate`, `NodeInfoUpdate`,
//! `TacticalEvent`, and `MessageEntry`. These are created by the decoder
//! (C7) and held read-only by consumers; `MessageEntry` is the one record
//! with mutable state, and that mutation is serialized by the session
//! client's own lock rather than an internal one.

use chrono::{DateTime, Utc};
use hostlink_protocol::RxMetadata;

/// Where a `PositionUpdate` originated, carried through for provenance and
/// for the APRS gateway's symbol/comment choices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionSource {
    TeamTrack,
    Position,
    NodeInfo,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PositionUpdate {
    pub node_id: u32,
    pub lat_e7: i32,
    pub lon_e7: i32,
    pub alt_m: Option<i32>,
    pub timestamp_utc: Option<i64>,
    pub ground_speed_mps: Option<f32>,
    pub ground_track_cdeg: Option<u32>,
    pub source: PositionSource,
    pub rx_meta: Option<RxMetadata>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct NodeInfoUpdate {
    pub node_id: u32,
    pub user_id: Option<String>,
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub hw_model: Option<i32>,
    pub snr: Option<f32>,
    pub created_at: Option<DateTime<Utc>>,
}

/// `source` byte from a Team Chat location body (§4.7), mapped to a named
/// marker; values outside the known range are preserved verbatim and
/// rendered generically rather than rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocationSource {
    Gps,
    Manual,
    Network,
    Fused,
    DeadReckoning,
    LastKnown,
    Other(u8),
}

impl LocationSource {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Gps,
            1 => Self::Manual,
            2 => Self::Network,
            3 => Self::Fused,
            4 => Self::DeadReckoning,
            5 => Self::LastKnown,
            other => Self::Other(other),
        }
    }
}

/// A populated-fields summary of one telemetry variant (§4.7), without
/// reproducing every protobuf field -- the gateway and any UI only need to
/// know what kind arrived and a few headline values.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct TelemetrySummary {
    pub battery_level_pct: Option<u32>,
    pub voltage: Option<f32>,
    pub temperature_c: Option<f32>,
    pub relative_humidity_pct: Option<f32>,
    pub barometric_pressure_hpa: Option<f32>,
    pub wind_speed_mps: Option<f32>,
    pub wind_direction_deg: Option<u32>,
    pub rainfall_1h_mm: Option<f32>,
    pub rainfall_24h_mm: Option<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TacticalEventKind {
    Chat {
        from: u32,
        msg_id: u32,
        text: String,
    },
    ChatLocation {
        from: u32,
        msg_id: u32,
        lat_e7: i32,
        lon_e7: i32,
        alt_m: i16,
        acc_m: u16,
        source: LocationSource,
        label: String,
    },
    ChatCommand {
        from: u32,
        msg_id: u32,
        cmd_type: u8,
        lat_e7: i32,
        lon_e7: i32,
        radius_m: u32,
        priority: u8,
        note: String,
    },
    TeamMgmt {
        from: u32,
        msg_type: u8,
        payload_len: u16,
    },
    Telemetry {
        node_id: u32,
        variant: &'static str,
        summary: TelemetrySummary,
    },
    Waypoint {
        id: u32,
        name: String,
        description: String,
        lat_e7: i32,
        lon_e7: i32,
        alive: bool,
    },
    MapReport {
        long_name: String,
        short_name: String,
    },
    Unknown {
        port: u32,
        payload_len: usize,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct TacticalEvent {
    pub kind: TacticalEventKind,
    pub rx_meta: Option<RxMetadata>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageStatus {
    Pending,
    Acked,
    Succeeded,
    Failed,
    Timeout,
}

/// Created in `Pending` on send (§4.5); `status`/`error` are the only
/// mutable fields, updated in place by C5 while holding its own lock.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntry {
    pub msg_id: u32,
    pub to: u32,
    pub channel: u8,
    pub text: String,
    pub status: MessageStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MessageEntry {
    pub fn new(msg_id: u32, to: u32, channel: u8, text: impl Into<String>) -> Self {
        Self {
            msg_id,
            to,
            channel,
            text: text.into(),
            status: MessageStatus::Pending,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_broadcast(to: u32) -> bool {
        to == 0 || to == 0xFFFF_FFFF
    }
}

/// Anything C7 can yield for one assembled AppData packet or directly
/// decoded RX message; consumers match on whichever variants they care
/// about.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct DecodedRecords {
    pub positions: Vec<PositionUpdate>,
    pub node_info: Vec<NodeInfoUpdate>,
    pub events: Vec<TacticalEvent>,
    pub messages: Vec<MessageEntry>,
}

impl DecodedRecords {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
            && self.node_info.is_empty()
            && self.events.is_empty()
            && self.messages.is_empty()
    }
}
