// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The gateway service (C9): subscribes to session-store change events,
//! runs each candidate through the ingress gate, resolves a callsign,
//! builds the per-kind APRS info field, then rate-limits, dedups, and
//! enqueues onto the configured [`GatewaySink`].

use crate::callsign::{CallsignResolver, DEFAULT_ADDRESSEE};
use crate::config::GatewayConfig;
use crate::counters::GatewayCounters;
use crate::dedup::{Deduplicator, HOUSEKEEPING_INTERVAL};
use crate::ingress::check_ingress;
use crate::path::build_path;
use crate::ratelimit::RateLimiter;
use crate::sink::{compute_expiry, GatewaySink, QueueItem};
use crate::telemetry_state::TelemetryState;
use aprs_format::{
    assemble_packet, format_message_info, format_object_info, format_position_info,
    format_telemetry_report, format_weather_info, identity_scale, ObjectReport, PositionReport,
    Symbol, WeatherReadings,
};
use chrono::{DateTime, TimeZone, Utc};
use hostlink_protocol::RxMetadata;
use hostlink_session::{
    NodeInfoUpdate, PositionUpdate, SessionStore, StoreEvent, TacticalEvent,
    TacticalEventKind,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const TOCALL: &str = "APRS";

fn mps_to_knots(mps: f32) -> u16 {
    (mps * 1.943_84).round().clamp(0.0, u16::MAX as f32) as u16
}

fn meters_to_feet(m: i32) -> i32 {
    (m as f64 * 3.280_84).round() as i32
}

fn epoch_to_utc(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now)
}

/// Runs the full gateway pipeline: subscribes to a [`SessionStore`] and
/// writes formatted APRS lines to a [`GatewaySink`].
pub struct GatewayService<S: GatewaySink> {
    config: GatewayConfig,
    counters: GatewayCounters,
    resolver: CallsignResolver,
    rate_limiter: RateLimiter,
    dedup: Deduplicator,
    telemetry: TelemetryState,
    sink: S,
}

impl<S: GatewaySink> GatewayService<S> {
    pub fn new(config: GatewayConfig, sink: S) -> Self {
        let resolver = CallsignResolver::new(config.node_id_to_callsign.clone());
        Self {
            config,
            counters: GatewayCounters::default(),
            resolver,
            rate_limiter: RateLimiter::new(),
            dedup: Deduplicator::new(),
            telemetry: TelemetryState::new(),
            sink,
        }
    }

    pub fn counters(&self) -> &GatewayCounters {
        &self.counters
    }

    /// Subscribes to `store` and processes events until `cancel` fires.
    pub async fn run(self: Arc<Self>, store: Arc<SessionStore>, cancel: CancellationToken) {
        let mut events = store.subscribe();
        let mut housekeeping = tokio::time::interval(HOUSEKEEPING_INTERVAL);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("gateway service shutting down");
                    return;
                }
                _ = housekeeping.tick() => {
                    self.dedup.housekeep(Duration::from_secs(self.config.dedupe_window_s), Instant::now());
                }
                event = events.recv() => {
                    match event {
                        Ok(event) => self.handle_store_event(event),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "gateway lagged behind session store events");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                    }
                }
            }
        }
    }

    fn handle_store_event(&self, event: StoreEvent) {
        match event {
            StoreEvent::NodeInfoUpdated(info) => self.handle_node_info(&info),
            StoreEvent::PositionUpdated(position) => self.handle_position(&position),
            StoreEvent::EventAdded(event) => self.handle_tactical_event(&event),
            StoreEvent::MessageUpdated(_) => {}
        }
    }

    fn handle_node_info(&self, info: &NodeInfoUpdate) {
        self.resolver.observe(info);
    }

    fn handle_position(&self, position: &PositionUpdate) {
        let Ok(meta) = check_ingress(&position.rx_meta) else {
            self.reject(&position.rx_meta);
            return;
        };
        let Some(callsign) = self.resolver.resolve(position.node_id) else {
            return;
        };

        let report = PositionReport {
            lat: position.lat_e7 as f64 / 1e7,
            lon: position.lon_e7 as f64 / 1e7,
            symbol: self.config.symbol,
            timestamp: position
                .timestamp_utc
                .map(epoch_to_utc)
                .or(Some(Utc::now())),
            compressed: self.config.compress_positions,
            course_deg: position.ground_track_cdeg.map(|c| (c / 100) as u16),
            speed_knots: position.ground_speed_mps.map(mps_to_knots),
            altitude_ft: position.alt_m.map(meters_to_feet),
            comment: String::new(),
        };
        let info = format_position_info(&report);

        self.emit(
            "position",
            position.node_id,
            meta,
            &callsign,
            &info,
            Duration::from_secs(self.config.position_interval_s),
        );
    }

    fn handle_tactical_event(&self, event: &TacticalEvent) {
        let Ok(meta) = check_ingress(&event.rx_meta) else {
            self.reject(&event.rx_meta);
            return;
        };

        match &event.kind {
            TacticalEventKind::Chat { from, msg_id, text } => {
                self.handle_message(*from, meta, Some(*msg_id), text);
            }
            TacticalEventKind::Waypoint {
                name,
                description,
                lat_e7,
                lon_e7,
                alive,
                ..
            } => self.handle_waypoint(meta, name, description, *lat_e7, *lon_e7, *alive),
            TacticalEventKind::Telemetry {
                node_id,
                variant,
                summary,
            } => self.handle_telemetry(*node_id, meta, variant, summary),
            TacticalEventKind::ChatLocation { .. }
            | TacticalEventKind::ChatCommand { .. }
            | TacticalEventKind::TeamMgmt { .. }
            | TacticalEventKind::MapReport { .. }
            | TacticalEventKind::Unknown { .. } => {
                tracing::trace!(kind = ?event.kind, "tactical event kind has no APRS emission");
            }
        }
    }

    fn handle_message(&self, from: u32, meta: &RxMetadata, msg_id: Option<u32>, text: &str) {
        // Team chat has no resolved recipient; it is always addressed as a
        // bulletin (§4.9).
        let Some(source_callsign) = self.resolver.resolve(from) else {
            return;
        };

        let info = format_message_info(DEFAULT_ADDRESSEE, text, msg_id);
        self.emit(
            "message",
            from,
            meta,
            &source_callsign,
            &info,
            Duration::from_secs(self.config.tx_min_interval_s),
        );
    }

    fn handle_waypoint(
        &self,
        meta: &RxMetadata,
        name: &str,
        description: &str,
        lat_e7: i32,
        lon_e7: i32,
        alive: bool,
    ) {
        // Waypoints carry no mesh node id of their own; attribute them to
        // the igate's own callsign bucket for rate-limit/dedup purposes.
        let report = ObjectReport {
            name: name.to_string(),
            alive,
            timestamp: Utc::now(),
            lat: lat_e7 as f64 / 1e7,
            lon: lon_e7 as f64 / 1e7,
            symbol: Symbol::new('/', '\\'),
            comment: description.to_string(),
        };
        let info = format_object_info(&report);

        self.emit(
            "waypoint",
            0,
            meta,
            &self.config.igate_callsign.clone(),
            &info,
            Duration::from_secs(self.config.tx_min_interval_s),
        );
    }

    fn handle_telemetry(
        &self,
        node_id: u32,
        meta: &RxMetadata,
        variant: &str,
        summary: &hostlink_session::TelemetrySummary,
    ) {
        let Some(callsign) = self.resolver.resolve(node_id) else {
            return;
        };

        if self.telemetry.definitions_due(node_id, Instant::now()) {
            for line in telemetry_definition_lines() {
                self.emit(
                    "telemetry",
                    node_id,
                    meta,
                    &callsign,
                    &line,
                    Duration::from_secs(self.config.tx_min_interval_s),
                );
            }
        }

        let analog = [
            summary.battery_level_pct.map(|v| v as f64).unwrap_or(0.0),
            summary.voltage.map(|v| v as f64).unwrap_or(0.0),
            summary.temperature_c.map(|v| v as f64).unwrap_or(0.0),
            summary.relative_humidity_pct.map(|v| v as f64).unwrap_or(0.0),
            summary
                .barometric_pressure_hpa
                .map(|v| v as f64)
                .unwrap_or(0.0),
        ]
        .map(identity_scale);
        let seq = self.telemetry.next_seq(node_id);
        let info = format_telemetry_report(seq, analog, 0);
        self.emit(
            "telemetry",
            node_id,
            meta,
            &callsign,
            &info,
            Duration::from_secs(self.config.tx_min_interval_s),
        );

        if variant == "environment" {
            let readings = WeatherReadings {
                wind_direction_deg: summary.wind_direction_deg.map(|v| v as f64),
                wind_speed_ms: summary.wind_speed_mps.map(|v| v as f64),
                wind_gust_ms: None,
                temperature_c: summary.temperature_c.map(|v| v as f64),
                rain_1h_mm: summary.rainfall_1h_mm.map(|v| v as f64),
                rain_24h_mm: summary.rainfall_24h_mm.map(|v| v as f64),
                rain_since_midnight_mm: None,
                humidity_pct: summary.relative_humidity_pct.map(|v| v as f64),
                pressure_hpa: summary.barometric_pressure_hpa.map(|v| v as f64),
            };
            if readings.any_present() {
                let info = format_weather_info(&readings);
                self.emit(
                    "weather",
                    node_id,
                    meta,
                    &callsign,
                    &info,
                    Duration::from_secs(self.config.tx_min_interval_s),
                );
            }
        }
    }

    /// Emits a status report directly, for callers wiring in device-status
    /// events outside the session-store fan-out (§4.9's Status emission
    /// has no store-level event of its own to subscribe to).
    pub fn emit_status(&self, node_id: u32, meta: &RxMetadata, text: &str) {
        let Some(callsign) = self.resolver.resolve(node_id) else {
            return;
        };
        let info = aprs_format::format_status_info(text);
        self.emit(
            "status",
            node_id,
            meta,
            &callsign,
            &info,
            Duration::from_secs(self.config.tx_min_interval_s),
        );
    }

    fn emit(
        &self,
        kind: &str,
        source: u32,
        meta: &RxMetadata,
        callsign: &str,
        info: &str,
        interval: Duration,
    ) {
        let now = Instant::now();
        let rate_key = format!("{kind}|{source}");
        if !self.rate_limiter.allow(&rate_key, interval, now) {
            self.counters.incr_rate_limited();
            return;
        }

        let dedup_key = Deduplicator::key(kind, source, meta.packet_id, info);
        if !self
            .dedup
            .check(&dedup_key, Duration::from_secs(self.config.dedupe_window_s), now)
        {
            self.counters.incr_dedupe_hits();
            return;
        }

        let path = build_path(
            &self.config.path_tokens,
            meta.direct.unwrap_or(false),
            &self.config.igate_path_suffix(),
        );
        let line = assemble_packet(callsign, TOCALL, &path, info);

        let rx_ts = meta
            .timestamp_utc
            .map(epoch_to_utc)
            .unwrap_or_else(Utc::now);
        let expires_at = compute_expiry(Utc::now(), rx_ts, self.config.dedupe_window_s);

        self.sink.enqueue(QueueItem { line, expires_at });
        self.counters.incr_sent();
    }

    fn reject(&self, rx_meta: &Option<RxMetadata>) {
        match check_ingress(rx_meta) {
            Err(crate::ingress::GateRejection::MissingMetadata) => self.counters.incr_errors(),
            Err(crate::ingress::GateRejection::LoopSuspect) => self.counters.incr_dropped(),
            Ok(_) => {}
        }
    }
}

fn telemetry_definition_lines() -> Vec<String> {
    let names = ["Battery", "Voltage", "Temp", "Humidity", "Pressure"]
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
    let units = ["%", "V", "C", "%", "hPa"].into_iter().map(String::from).collect::<Vec<_>>();
    let eqns = [(0.0, 1.0, 0.0); 5];
    vec![
        aprs_format::format_parm_line(&names, &[]),
        aprs_format::format_unit_line(&units, &[]),
        aprs_format::format_eqns_line(&eqns),
        aprs_format::format_bits_line([false; 8], "telemetry"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostlink_protocol::rx_meta::{Origin, TimeSource};
    use hostlink_session::{NodeInfoUpdate, PositionSource};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        items: Mutex<Vec<QueueItem>>,
    }

    impl GatewaySink for Arc<RecordingSink> {
        fn enqueue(&self, item: QueueItem) {
            self.items.lock().unwrap().push(item);
        }
    }

    fn meta() -> RxMetadata {
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
            freq_hz: None,
            bw_hz: None,
            sf: None,
            cr: None,
            packet_id: Some(1),
        }
    }

    fn service() -> GatewayService<Arc<RecordingSink>> {
        GatewayService::new(GatewayConfig::default(), Arc::new(RecordingSink::default()))
    }

    #[test]
    fn position_without_known_callsign_is_skipped() {
        let svc = service();
        let position = PositionUpdate {
            node_id: 1,
            lat_e7: 100_000_000,
            lon_e7: 200_000_000,
            alt_m: Some(100),
            timestamp_utc: Some(1_700_000_000),
            ground_speed_mps: Some(2.0),
            ground_track_cdeg: Some(9000),
            source: PositionSource::Position,
            rx_meta: Some(meta()),
            created_at: Utc::now(),
        };
        svc.handle_position(&position);
        assert_eq!(svc.counters().snapshot().sent, 0);
    }

    #[test]
    fn position_with_known_callsign_is_enqueued() {
        let svc = service();
        svc.handle_node_info(&NodeInfoUpdate {
            node_id: 1,
            user_id: Some("BG6ABC".to_string()),
            long_name: None,
            short_name: None,
            hw_model: None,
            snr: None,
            created_at: Some(Utc::now()),
        });
        let position = PositionUpdate {
            node_id: 1,
            lat_e7: 100_000_000,
            lon_e7: 200_000_000,
            alt_m: Some(100),
            timestamp_utc: Some(1_700_000_000),
            ground_speed_mps: Some(2.0),
            ground_track_cdeg: Some(9000),
            source: PositionSource::Position,
            rx_meta: Some(meta()),
            created_at: Utc::now(),
        };
        svc.handle_position(&position);
        assert_eq!(svc.counters().snapshot().sent, 1);
        assert_eq!(svc.sink.items.lock().unwrap().len(), 1);
    }

    #[test]
    fn missing_rx_metadata_increments_errors() {
        let svc = service();
        let position = PositionUpdate {
            node_id: 1,
            lat_e7: 0,
            lon_e7: 0,
            alt_m: None,
            timestamp_utc: None,
            ground_speed_mps: None,
            ground_track_cdeg: None,
            source: PositionSource::Position,
            rx_meta: None,
            created_at: Utc::now(),
        };
        svc.handle_position(&position);
        assert_eq!(svc.counters().snapshot().errors, 1);
    }

    #[test]
    fn from_is_candidate_increments_dropped() {
        let svc = service();
        let mut bad_meta = meta();
        bad_meta.from_is = Some(true);
        let position = PositionUpdate {
            node_id: 1,
            lat_e7: 0,
            lon_e7: 0,
            alt_m: None,
            timestamp_utc: None,
            ground_speed_mps: None,
            ground_track_cdeg: None,
            source: PositionSource::Position,
            rx_meta: Some(bad_meta),
            created_at: Utc::now(),
        };
        svc.handle_position(&position);
        assert_eq!(svc.counters().snapshot().dropped, 1);
    }

    #[test]
    fn duplicate_position_within_window_increments_dedupe_hits() {
        let svc = service();
        svc.handle_node_info(&NodeInfoUpdate {
            node_id: 1,
            user_id: Some("BG6ABC".to_string()),
            long_name: None,
            short_name: None,
            hw_model: None,
            snr: None,
            created_at: Some(Utc::now()),
        });
        let position = PositionUpdate {
            node_id: 1,
            lat_e7: 100_000_000,
            lon_e7: 200_000_000,
            alt_m: None,
            timestamp_utc: Some(1_700_000_000),
            ground_speed_mps: None,
            ground_track_cdeg: None,
            source: PositionSource::Position,
            rx_meta: Some(meta()),
            created_at: Utc::now(),
        };
        svc.handle_position(&position);
        svc.handle_position(&position);
        assert_eq!(svc.counters().snapshot().sent, 1);
        assert_eq!(svc.counters().snapshot().dedupe_hits, 1);
    }
}
