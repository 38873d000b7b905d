// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! RX metadata (§3, §6): per-packet measurement and provenance metadata the
//! APRS gateway uses to decide injection policy.
//!
//! §6 names TLV keys 1..19 "per the source table" without reproducing it;
//! this module fixes a concrete key assignment within that range (recorded
//! as an open-question decision in `DESIGN.md`).

use crate::tlv::TlvMap;
use bytes::{BufMut, Bytes, BytesMut};
use displaydoc::Display;

pub mod key {
    pub const TIMESTAMP_UTC: u8 = 1;
    pub const TIMESTAMP_MS: u8 = 2;
    pub const TIME_SOURCE: u8 = 3;
    pub const DIRECT: u8 = 4;
    pub const HOP_COUNT: u8 = 5;
    pub const HOP_LIMIT: u8 = 6;
    pub const ORIGIN: u8 = 7;
    pub const FROM_IS: u8 = 8;
    pub const RSSI_DBM: u8 = 9;
    pub const SNR_DB_TENTHS: u8 = 10;
    pub const FREQ_HZ: u8 = 11;
    pub const BW_HZ: u8 = 12;
    pub const SF: u8 = 13;
    pub const CR: u8 = 14;
    pub const PACKET_ID: u8 = 15;
}

/// Time provenance for an RX metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TimeSource {
    /// device real-time clock
    DeviceRtc,
    /// GPS-disciplined time
    Gps,
    /// host clock, stamped on arrival
    Host,
    /// unknown source
    Unknown,
}

impl TimeSource {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::DeviceRtc,
            1 => Self::Gps,
            2 => Self::Host,
            _ => Self::Unknown,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::DeviceRtc => 0,
            Self::Gps => 1,
            Self::Host => 2,
            Self::Unknown => 3,
        }
    }
}

/// Where a packet originated, used by the gateway for loop prevention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Origin {
    /// provenance unknown
    Unknown,
    /// received over the mesh radio
    Mesh,
    /// ingested from an external system (e.g. an APRS-IS or MQTT bridge)
    External,
}

impl Origin {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Mesh,
            2 => Self::External,
            _ => Self::Unknown,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Mesh => 1,
            Self::External => 2,
        }
    }
}

/// RX metadata as described in §3. All fields beyond `time_source` and
/// `origin` are optional; the APRS gateway's ingress gate (§4.9) requires a
/// specific subset of them to be present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RxMetadata {
    pub timestamp_utc: Option<i64>,
    pub timestamp_ms: Option<u32>,
    pub time_source: Option<TimeSource>,
    pub direct: Option<bool>,
    pub hop_count: Option<u8>,
    pub hop_limit: Option<u8>,
    pub origin: Option<Origin>,
    pub from_is: Option<bool>,
    pub rssi_dbm: Option<i16>,
    pub snr_db: Option<f32>,
    pub freq_hz: Option<u32>,
    pub bw_hz: Option<u32>,
    pub sf: Option<u8>,
    pub cr: Option<u8>,
    pub packet_id: Option<u32>,
}

impl RxMetadata {
    pub fn decode(bytes: &[u8]) -> Self {
        let map = TlvMap::decode(bytes);
        let mut meta = RxMetadata::default();

        for (k, v) in map.iter() {
            match *k {
                key::TIMESTAMP_UTC if v.len() == 8 => {
                    meta.timestamp_utc = Some(i64::from_le_bytes(v[..8].try_into().unwrap()))
                }
                key::TIMESTAMP_MS if v.len() == 4 => {
                    meta.timestamp_ms = Some(u32::from_le_bytes(v[..4].try_into().unwrap()))
                }
                key::TIME_SOURCE if !v.is_empty() => {
                    meta.time_source = Some(TimeSource::from_u8(v[0]))
                }
                key::DIRECT if !v.is_empty() => meta.direct = Some(v[0] != 0),
                key::HOP_COUNT if !v.is_empty() => meta.hop_count = Some(v[0]),
                key::HOP_LIMIT if !v.is_empty() => meta.hop_limit = Some(v[0]),
                key::ORIGIN if !v.is_empty() => meta.origin = Some(Origin::from_u8(v[0])),
                key::FROM_IS if !v.is_empty() => meta.from_is = Some(v[0] != 0),
                key::RSSI_DBM if v.len() == 2 => {
                    meta.rssi_dbm = Some(i16::from_le_bytes(v[..2].try_into().unwrap()))
                }
                key::SNR_DB_TENTHS if v.len() == 2 => {
                    let tenths = i16::from_le_bytes(v[..2].try_into().unwrap());
                    meta.snr_db = Some(tenths as f32 / 10.0);
                }
                key::FREQ_HZ if v.len() == 4 => {
                    meta.freq_hz = Some(u32::from_le_bytes(v[..4].try_into().unwrap()))
                }
                key::BW_HZ if v.len() == 4 => {
                    meta.bw_hz = Some(u32::from_le_bytes(v[..4].try_into().unwrap()))
                }
                key::SF if !v.is_empty() => meta.sf = Some(v[0]),
                key::CR if !v.is_empty() => meta.cr = Some(v[0]),
                key::PACKET_ID if v.len() == 4 => {
                    meta.packet_id = Some(u32::from_le_bytes(v[..4].try_into().unwrap()))
                }
                // unknown or malformed-length TLVs are ignored, never fatal
                _ => {}
            }
        }

        meta
    }

    pub fn encode(&self) -> Bytes {
        let mut map = TlvMap::new();
        let mut scratch = BytesMut::new();

        macro_rules! put {
            ($key:expr, $value:expr) => {
                scratch.clear();
                scratch.put_slice(&$value);
                map.insert($key, scratch.split().freeze());
            };
        }

        if let Some(v) = self.timestamp_utc {
            put!(key::TIMESTAMP_UTC, v.to_le_bytes());
        }
        if let Some(v) = self.timestamp_ms {
            put!(key::TIMESTAMP_MS, v.to_le_bytes());
        }
        if let Some(v) = self.time_source {
            map.insert(key::TIME_SOURCE, Bytes::copy_from_slice(&[v.to_u8()]));
        }
        if let Some(v) = self.direct {
            map.insert(key::DIRECT, Bytes::copy_from_slice(&[v as u8]));
        }
        if let Some(v) = self.hop_count {
            map.insert(key::HOP_COUNT, Bytes::copy_from_slice(&[v]));
        }
        if let Some(v) = self.hop_limit {
            map.insert(key::HOP_LIMIT, Bytes::copy_from_slice(&[v]));
        }
        if let Some(v) = self.origin {
            map.insert(key::ORIGIN, Bytes::copy_from_slice(&[v.to_u8()]));
        }
        if let Some(v) = self.from_is {
            map.insert(key::FROM_IS, Bytes::copy_from_slice(&[v as u8]));
        }
        if let Some(v) = self.rssi_dbm {
            put!(key::RSSI_DBM, v.to_le_bytes());
        }
        if let Some(v) = self.snr_db {
            let tenths = (v * 10.0).round() as i16;
            put!(key::SNR_DB_TENTHS, tenths.to_le_bytes());
        }
        if let Some(v) = self.freq_hz {
            put!(key::FREQ_HZ, v.to_le_bytes());
        }
        if let Some(v) = self.bw_hz {
            put!(key::BW_HZ, v.to_le_bytes());
        }
        if let Some(v) = self.sf {
            map.insert(key::SF, Bytes::copy_from_slice(&[v]));
        }
        if let Some(v) = self.cr {
            map.insert(key::CR, Bytes::copy_from_slice(&[v]));
        }
        if let Some(v) = self.packet_id {
            put!(key::PACKET_ID, v.to_le_bytes());
        }

        map.encode()
    }

    /// Every field the APRS gateway's ingress gate (§4.9) requires is
    /// present.
    pub fn has_gateway_required_fields(&self) -> bool {
        let has_timestamp = self.timestamp_utc.is_some() || self.timestamp_ms.is_some();
        let has_hop_info = self.hop_count.is_some() || self.hop_limit.is_some();

        has_timestamp
            && self.direct.is_some()
            && self.origin.map(|o| o != Origin::Unknown).unwrap_or(false)
            && self.from_is.is_some()
            && self.rssi_dbm.is_some()
            && self.snr_db.is_some()
            && has_hop_info
            && self.packet_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_metadata() -> RxMetadata {
        RxMetadata {
            timestamp_utc: Some(1_700_000_000),
            timestamp_ms: None,
            time_source: Some(TimeSource::Gps),
            direct: Some(true),
            hop_count: Some(0),
            hop_limit: Some(3),
            origin: Some(Origin::Mesh),
            from_is: Some(false),
            rssi_dbm: Some(-97),
            snr_db: Some(8.0),
            freq_hz: Some(915_000_000),
            bw_hz: Some(125_000),
            sf: Some(7),
            cr: Some(5),
            packet_id: Some(42),
        }
    }

    #[test]
    fn round_trips() {
        let meta = full_metadata();
        let decoded = RxMetadata::decode(&meta.encode());
        assert_eq!(decoded, meta);
    }

    #[test]
    fn satisfies_gateway_required_fields_when_complete() {
        assert!(full_metadata().has_gateway_required_fields());
    }

    #[test]
    fn missing_packet_id_fails_required_fields_check() {
        let mut meta = full_metadata();
        meta.packet_id = None;
        assert!(!meta.has_gateway_required_fields());
    }

    #[test]
    fn unknown_origin_fails_required_fields_check() {
        let mut meta = full_metadata();
        meta.origin = Some(Origin::Unknown);
        assert!(!meta.has_gateway_required_fields());
    }
}
