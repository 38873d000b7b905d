// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The AppData decoder (C7, §4.7): port-based dispatch of an assembled
//! packet into typed domain records. No branch here is allowed to abort the
//! pipeline; anything that fails to parse falls back to an opaque `Unknown`
//! tactical event.

use crate::reassembler::CompletedPacket;
use crate::records::{
    DecodedRecords, LocationSource, MessageEntry, MessageStatus, NodeInfoUpdate, PositionSource,
    PositionUpdate, TacticalEvent, TacticalEventKind, TelemetrySummary,
};
use bytes::Buf;
use chrono::Utc;
use hostlink_protocol::RxMetadata;
use meshtastic_proto::{MapReport, NodeInfo, Position, User, Waypoint};
use prost::Message as _;

pub mod port {
    pub const POSITION_APP: u32 = 3;
    pub const NODEINFO_APP: u32 = 4;
    pub const WAYPOINT_APP: u32 = 8;
    pub const TELEMETRY_APP: u32 = 67;
    pub const MAP_REPORT_APP: u32 = 73;
    pub const TEAM_MGMT: u32 = 300;
    pub const TEAM_POSITION: u32 = 301;
    pub const TEAM_WAYPOINT: u32 = 302;
    pub const TEAM_CHAT: u32 = 303;
    pub const TEAM_TRACK: u32 = 304;
}

mod chat_type {
    pub const TEXT: u8 = 0;
    pub const LOCATION: u8 = 1;
    pub const COMMAND: u8 = 2;
}

fn take_u8(buf: &mut &[u8]) -> Option<u8> {
    if buf.is_empty() {
        return None;
    }
    Some(buf.get_u8())
}

fn take_i16(buf: &mut &[u8]) -> Option<i16> {
    if buf.len() < 2 {
        return None;
    }
    Some(buf.get_i16_le())
}

fn take_u16(buf: &mut &[u8]) -> Option<u16> {
    if buf.len() < 2 {
        return None;
    }
    Some(buf.get_u16_le())
}

fn take_i32(buf: &mut &[u8]) -> Option<i32> {
    if buf.len() < 4 {
        return None;
    }
    Some(buf.get_i32_le())
}

fn take_u32(buf: &mut &[u8]) -> Option<u32> {
    if buf.len() < 4 {
        return None;
    }
    Some(buf.get_u32_le())
}

fn take_str(buf: &mut &[u8], len: usize) -> Option<String> {
    if buf.len() < len {
        return None;
    }
    let s = String::from_utf8_lossy(&buf[..len]).into_owned();
    buf.advance(len);
    Some(s)
}

/// Decodes one fully-assembled AppData packet into zero or more domain
/// records.
pub struct Decoder;

impl Decoder {
    pub fn decode(&self, packet: CompletedPacket) -> DecodedRecords {
        let mut out = DecodedRecords::default();
        let from = packet.key.from;
        let port = packet.key.port;
        let payload = packet.payload;
        let rx_meta = packet.rx_meta;
        let now = Utc::now();

        match port {
            port::TEAM_TRACK => decode_team_track(from, &payload, &rx_meta, now, &mut out),
            port::TEAM_CHAT => decode_team_chat(from, &payload, &rx_meta, now, &mut out),
            port::TEAM_MGMT => decode_team_mgmt(from, &payload, &rx_meta, now, &mut out),
            port::POSITION_APP | port::TEAM_POSITION => {
                decode_position(from, &payload, &rx_meta, now, &mut out)
            }
            port::WAYPOINT_APP | port::TEAM_WAYPOINT => {
                decode_waypoint(&payload, &rx_meta, now, &mut out)
            }
            port::NODEINFO_APP => decode_node_info(from, &payload, &rx_meta, now, &mut out),
            port::TELEMETRY_APP => decode_telemetry(from, &payload, &rx_meta, now, &mut out),
            port::MAP_REPORT_APP => decode_map_report(from, &payload, &rx_meta, now, &mut out),
            other => out
                .events
                .push(unknown_event(other, payload.len(), &rx_meta, now)),
        }

        out
    }
}

fn unknown_event(
    port: u32,
    payload_len: usize,
    rx_meta: &Option<RxMetadata>,
    now: chrono::DateTime<Utc>,
) -> TacticalEvent {
    TacticalEvent {
        kind: TacticalEventKind::Unknown { port, payload_len },
        rx_meta: rx_meta.clone(),
        created_at: now,
    }
}

fn decode_team_track(
    from: u32,
    payload: &[u8],
    rx_meta: &Option<RxMetadata>,
    now: chrono::DateTime<Utc>,
    out: &mut DecodedRecords,
) {
    let mut buf = payload;
    let parsed = (|| -> Option<()> {
        let version = take_u8(&mut buf)?;
        if version != 1 {
            return None;
        }
        let start_ts_s = take_u32(&mut buf)?;
        let interval_s = take_u32(&mut buf)?;
        let count = take_u8(&mut buf)?.min(20);
        let valid_mask = take_u32(&mut buf)?;

        for i in 0..count as u32 {
            let lat_e7 = take_i32(&mut buf)?;
            let lon_e7 = take_i32(&mut buf)?;
            if valid_mask & (1 << i) == 0 {
                continue;
            }
            out.positions.push(PositionUpdate {
                node_id: from,
                lat_e7,
                lon_e7,
                alt_m: None,
                timestamp_utc: Some((start_ts_s as i64) + (i as i64) * interval_s as i64),
                ground_speed_mps: None,
                ground_track_cdeg: None,
                source: PositionSource::TeamTrack,
                rx_meta: rx_meta.clone(),
                created_at: now,
            });
        }
        Some(())
    })();

    if parsed.is_none() {
        out.events
            .push(unknown_event(port::TEAM_TRACK, payload.len(), rx_meta, now));
    }
}

fn decode_team_chat(
    from: u32,
    payload: &[u8],
    rx_meta: &Option<RxMetadata>,
    now: chrono::DateTime<Utc>,
    out: &mut DecodedRecords,
) {
    let mut buf = payload;
    let parsed = (|| -> Option<()> {
        let version = take_u8(&mut buf)?;
        if version != 1 {
            return None;
        }
        let chat_type = take_u8(&mut buf)?;
        let _flags = take_u8(&mut buf)?;
        let msg_id = take_u32(&mut buf)?;
        let _ts_s = take_u32(&mut buf)?;
        let chat_from = take_u32(&mut buf)?;
        let chat_from = if chat_from != 0 { chat_from } else { from };

        match chat_type {
            chat_type::TEXT => {
                let text = String::from_utf8_lossy(buf).into_owned();
                out.messages.push(MessageEntry {
                    msg_id,
                    to: 0,
                    channel: 0,
                    text: text.clone(),
                    status: MessageStatus::Succeeded,
                    error: None,
                    created_at: now,
                });
                out.events.push(TacticalEvent {
                    kind: TacticalEventKind::Chat {
                        from: chat_from,
                        msg_id,
                        text,
                    },
                    rx_meta: rx_meta.clone(),
                    created_at: now,
                });
            }
            chat_type::LOCATION => {
                let lat_e7 = take_i32(&mut buf)?;
                let lon_e7 = take_i32(&mut buf)?;
                let alt_m = take_i16(&mut buf)?;
                let acc_m = take_u16(&mut buf)?;
                let ts = take_u32(&mut buf)?;
                let source = LocationSource::from_u8(take_u8(&mut buf)?);
                let label_len = take_u16(&mut buf)? as usize;
                let label = take_str(&mut buf, label_len)?;

                out.positions.push(PositionUpdate {
                    node_id: chat_from,
                    lat_e7,
                    lon_e7,
                    alt_m: Some(alt_m as i32),
                    timestamp_utc: Some(ts as i64),
                    ground_speed_mps: None,
                    ground_track_cdeg: None,
                    source: PositionSource::TeamTrack,
                    rx_meta: rx_meta.clone(),
                    created_at: now,
                });
                out.messages.push(MessageEntry {
                    msg_id,
                    to: 0,
                    channel: 0,
                    text: label.clone(),
                    status: MessageStatus::Succeeded,
                    error: None,
                    created_at: now,
                });
                out.events.push(TacticalEvent {
                    kind: TacticalEventKind::ChatLocation {
                        from: chat_from,
                        msg_id,
                        lat_e7,
                        lon_e7,
                        alt_m,
                        acc_m,
                        source,
                        label,
                    },
                    rx_meta: rx_meta.clone(),
                    created_at: now,
                });
            }
            chat_type::COMMAND => {
                let cmd_type = take_u8(&mut buf)?;
                let lat_e7 = take_i32(&mut buf)?;
                let lon_e7 = take_i32(&mut buf)?;
                let radius_m = take_u32(&mut buf)?;
                let priority = take_u8(&mut buf)?;
                let note_len = take_u16(&mut buf)? as usize;
                let note = take_str(&mut buf, note_len)?;

                out.events.push(TacticalEvent {
                    kind: TacticalEventKind::ChatCommand {
                        from: chat_from,
                        msg_id,
                        cmd_type,
                        lat_e7,
                        lon_e7,
                        radius_m,
                        priority,
                        note,
                    },
                    rx_meta: rx_meta.clone(),
                    created_at: now,
                });
            }
            _ => return None,
        }
        Some(())
    })();

    if parsed.is_none() {
        out.events
            .push(unknown_event(port::TEAM_CHAT, payload.len(), rx_meta, now));
    }
}

fn decode_team_mgmt(
    from: u32,
    payload: &[u8],
    rx_meta: &Option<RxMetadata>,
    now: chrono::DateTime<Utc>,
    out: &mut DecodedRecords,
) {
    let mut buf = payload;
    let parsed = (|| -> Option<()> {
        let version = take_u8(&mut buf)?;
        if version != 1 {
            return None;
        }
        let msg_type = take_u8(&mut buf)?;
        let _reserved = take_u8(&mut buf)?;
        let payload_len = take_u16(&mut buf)?;
        out.events.push(TacticalEvent {
            kind: TacticalEventKind::TeamMgmt {
                from,
                msg_type,
                payload_len,
            },
            rx_meta: rx_meta.clone(),
            created_at: now,
        });
        Some(())
    })();

    if parsed.is_none() {
        out.events
            .push(unknown_event(port::TEAM_MGMT, payload.len(), rx_meta, now));
    }
}

fn decode_position(
    from: u32,
    payload: &[u8],
    rx_meta: &Option<RxMetadata>,
    now: chrono::DateTime<Utc>,
    out: &mut DecodedRecords,
) {
    match Position::decode(payload) {
        Ok(pos) if pos.latitude_i != 0 || pos.longitude_i != 0 => {
            let timestamp_utc = if pos.timestamp != 0 {
                Some(pos.timestamp as i64)
            } else if pos.time != 0 {
                Some(pos.time as i64)
            } else {
                None
            };
            out.positions.push(PositionUpdate {
                node_id: from,
                lat_e7: pos.latitude_i,
                lon_e7: pos.longitude_i,
                alt_m: Some(pos.altitude),
                timestamp_utc,
                ground_speed_mps: Some(pos.ground_speed as f32),
                ground_track_cdeg: Some(pos.ground_track),
                source: PositionSource::Position,
                rx_meta: rx_meta.clone(),
                created_at: now,
            });
        }
        // Missing coordinates, or a decode failure: skip emission rather
        // than surface a bogus (0, 0) fix.
        Ok(_) => {}
        Err(_) => out
            .events
            .push(unknown_event(port::POSITION_APP, payload.len(), rx_meta, now)),
    }
}

fn decode_waypoint(
    payload: &[u8],
    rx_meta: &Option<RxMetadata>,
    now: chrono::DateTime<Utc>,
    out: &mut DecodedRecords,
) {
    match Waypoint::decode(payload) {
        Ok(wp) => {
            let alive = wp.expire == 0 || (wp.expire as i64) > now.timestamp();
            out.events.push(TacticalEvent {
                kind: TacticalEventKind::Waypoint {
                    id: wp.id,
                    name: wp.name,
                    description: wp.description,
                    lat_e7: wp.latitude_i,
                    lon_e7: wp.longitude_i,
                    alive,
                },
                rx_meta: rx_meta.clone(),
                created_at: now,
            });
        }
        Err(_) => out
            .events
            .push(unknown_event(port::WAYPOINT_APP, payload.len(), rx_meta, now)),
    }
}

fn decode_node_info(
    from: u32,
    payload: &[u8],
    rx_meta: &Option<RxMetadata>,
    now: chrono::DateTime<Utc>,
    out: &mut DecodedRecords,
) {
    if let Ok(user) = User::decode(payload) {
        if !user.id.is_empty() {
            out.node_info.push(NodeInfoUpdate {
                node_id: from,
                user_id: Some(user.id),
                long_name: Some(user.long_name),
                short_name: Some(user.short_name),
                hw_model: Some(user.hw_model),
                snr: None,
                created_at: Some(now),
            });
            return;
        }
    }

    match NodeInfo::decode(payload) {
        Ok(info) => {
            let user_id = info.user.as_ref().map(|u| u.id.clone());
            let long_name = info.user.as_ref().map(|u| u.long_name.clone());
            let short_name = info.user.as_ref().map(|u| u.short_name.clone());
            let hw_model = info.user.as_ref().map(|u| u.hw_model);
            let node_id = if info.num != 0 { info.num } else { from };

            out.node_info.push(NodeInfoUpdate {
                node_id,
                user_id,
                long_name,
                short_name,
                hw_model,
                snr: Some(info.snr),
                created_at: Some(now),
            });

            if let Some(pos) = info.position {
                if pos.latitude_i != 0 || pos.longitude_i != 0 {
                    out.positions.push(PositionUpdate {
                        node_id,
                        lat_e7: pos.latitude_i,
                        lon_e7: pos.longitude_i,
                        alt_m: Some(pos.altitude),
                        timestamp_utc: if pos.timestamp != 0 {
                            Some(pos.timestamp as i64)
                        } else {
                            None
                        },
                        ground_speed_mps: Some(pos.ground_speed as f32),
                        ground_track_cdeg: Some(pos.ground_track),
                        source: PositionSource::NodeInfo,
                        rx_meta: rx_meta.clone(),
                        created_at: now,
                    });
                }
            }
        }
        Err(_) => out
            .events
            .push(unknown_event(port::NODEINFO_APP, payload.len(), rx_meta, now)),
    }
}

fn decode_telemetry(
    from: u32,
    payload: &[u8],
    rx_meta: &Option<RxMetadata>,
    now: chrono::DateTime<Utc>,
    out: &mut DecodedRecords,
) {
    use meshtastic_proto::telemetry::Variant;

    let telemetry = match meshtastic_proto::Telemetry::decode(payload) {
        Ok(t) => t,
        Err(_) => {
            out.events
                .push(unknown_event(port::TELEMETRY_APP, payload.len(), rx_meta, now));
            return;
        }
    };

    let Some(variant) = telemetry.variant else {
        out.events
            .push(unknown_event(port::TELEMETRY_APP, payload.len(), rx_meta, now));
        return;
    };

    let (name, summary) = match variant {
        Variant::DeviceMetrics(m) => (
            "device",
            TelemetrySummary {
                battery_level_pct: m.battery_level,
                voltage: m.voltage,
                ..Default::default()
            },
        ),
        Variant::EnvironmentMetrics(m) => (
            "environment",
            TelemetrySummary {
                temperature_c: m.temperature,
                relative_humidity_pct: m.relative_humidity,
                barometric_pressure_hpa: m.barometric_pressure,
                wind_speed_mps: m.wind_speed,
                wind_direction_deg: m.wind_direction.map(|v| v as u32),
                rainfall_1h_mm: m.rainfall_1h,
                rainfall_24h_mm: m.rainfall_24h,
                ..Default::default()
            },
        ),
        Variant::AirQualityMetrics(_) => ("air_quality", TelemetrySummary::default()),
        Variant::PowerMetrics(_) => ("power", TelemetrySummary::default()),
        Variant::LocalStats(_) => ("local_stats", TelemetrySummary::default()),
        Variant::HealthMetrics(m) => (
            "health",
            TelemetrySummary {
                temperature_c: Some(m.temperature),
                ..Default::default()
            },
        ),
        Variant::HostMetrics(_) => ("host", TelemetrySummary::default()),
    };

    out.events.push(TacticalEvent {
        kind: TacticalEventKind::Telemetry {
            node_id: from,
            variant: name,
            summary,
        },
        rx_meta: rx_meta.clone(),
        created_at: now,
    });
}

fn decode_map_report(
    from: u32,
    payload: &[u8],
    rx_meta: &Option<RxMetadata>,
    now: chrono::DateTime<Utc>,
    out: &mut DecodedRecords,
) {
    match MapReport::decode(payload) {
        Ok(report) => out.events.push(TacticalEvent {
            kind: TacticalEventKind::MapReport {
                long_name: report.long_name,
                short_name: report.short_name,
            },
            rx_meta: rx_meta.clone(),
            created_at: now,
        }),
        Err(_) => {
            decode_node_info(from, payload, rx_meta, now, out);
            decode_position(from, payload, rx_meta, now, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reassembler::AssemblyKey;
    use bytes::{BufMut, Bytes, BytesMut};

    fn packet(port: u32, payload: Bytes) -> CompletedPacket {
        CompletedPacket {
            key: AssemblyKey {
                port,
                from: 0xAB,
                to: 0xFFFFFFFF,
                channel: 0,
                team_key_id: 0,
                team_id: [0; 8],
                total_length: payload.len() as u32,
                device_uptime_s: 0,
            },
            payload,
            rx_meta: None,
        }
    }

    #[test]
    fn team_track_emits_only_valid_bits() {
        let mut buf = BytesMut::new();
        buf.put_u8(1);
        buf.put_u32_le(1000);
        buf.put_u32_le(60);
        buf.put_u8(2);
        buf.put_u32_le(0b10);
        buf.put_i32_le(10_000_000);
        buf.put_i32_le(20_000_000);
        buf.put_i32_le(30_000_000);
        buf.put_i32_le(40_000_000);

        let out = Decoder.decode(packet(port::TEAM_TRACK, buf.freeze()));
        assert_eq!(out.positions.len(), 1);
        assert_eq!(out.positions[0].lat_e7, 30_000_000);
        assert_eq!(out.positions[0].timestamp_utc, Some(1060));
    }

    #[test]
    fn team_chat_text_emits_message_and_event() {
        let mut buf = BytesMut::new();
        buf.put_u8(1);
        buf.put_u8(chat_type::TEXT);
        buf.put_u8(0);
        buf.put_u32_le(42);
        buf.put_u32_le(1000);
        buf.put_u32_le(0xAB);
        buf.put_slice(b"hello team");

        let out = Decoder.decode(packet(port::TEAM_CHAT, buf.freeze()));
        assert_eq!(out.messages.len(), 1);
        assert_eq!(out.messages[0].text, "hello team");
        match &out.events[0].kind {
            TacticalEventKind::Chat { text, .. } => assert_eq!(text, "hello team"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_port_yields_opaque_event() {
        let out = Decoder.decode(packet(9999, Bytes::from_static(b"abc")));
        assert_eq!(out.events.len(), 1);
        match &out.events[0].kind {
            TacticalEventKind::Unknown { port, payload_len } => {
                assert_eq!(*port, 9999);
                assert_eq!(*payload_len, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn truncated_team_track_falls_back_to_unknown_event() {
        let out = Decoder.decode(packet(port::TEAM_TRACK, Bytes::from_static(&[1, 2])));
        assert_eq!(out.positions.len(), 0);
        assert_eq!(out.events.len(), 1);
        assert!(matches!(
            out.events[0].kind,
            TacticalEventKind::Unknown { .. }
        ));
    }

    #[test]
    fn malformed_position_protobuf_falls_back_to_unknown_event() {
        // Not a valid protobuf stream (invalid varint continuation).
        let out = Decoder.decode(packet(port::POSITION_APP, Bytes::from_static(&[0xFF])));
        assert_eq!(out.positions.len(), 0);
        assert_eq!(out.events.len(), 1);
    }
}
