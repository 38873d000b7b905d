// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Position info field assembly (§4.8): `!`/`@` position reports, in either
//! uncompressed or base91-compressed form.

use crate::coord::{compress_lat, compress_lon, format_lat_uncompressed, format_lon_uncompressed};
use crate::symbol::Symbol;
use chrono::{DateTime, Datelike, Timelike, Utc};

/// A position report to format as an APRS position info field.
#[derive(Debug, Clone)]
pub struct PositionReport {
    pub lat: f64,
    pub lon: f64,
    pub symbol: Symbol,
    /// `None` omits the timestamp, producing a `!`-prefixed report instead
    /// of an `@`-prefixed one.
    pub timestamp: Option<DateTime<Utc>>,
    pub compressed: bool,
    pub course_deg: Option<u16>,
    pub speed_knots: Option<u16>,
    pub altitude_ft: Option<i32>,
    pub comment: String,
}

/// Formats a UTC timestamp as the APRS day/hour/minute zulu format
/// `DDHHMMz`.
pub fn format_timestamp_dhmz(ts: DateTime<Utc>) -> String {
    format!("{:02}{:02}{:02}z", ts.day(), ts.hour(), ts.minute())
}

fn compressed_cs_extension(course_deg: Option<u16>, speed_knots: Option<u16>) -> String {
    match (course_deg, speed_knots) {
        (Some(course), Some(speed)) => {
            let c = ((course % 360) / 4).min(89) as u8;
            // Compressed-format speed uses a log scale: speed = 1.08^s - 1.
            let s = if speed == 0 {
                0
            } else {
                ((speed as f64 + 1.0).ln() / 1.08f64.ln()).round().clamp(0.0, 89.0) as u8
            };
            format!("{}{}", (b'!' + c) as char, (b'!' + s) as char)
        }
        _ => "  ".to_string(),
    }
}

/// Formats a [`PositionReport`] into an APRS position info field, per §4.8.
pub fn format_position_info(report: &PositionReport) -> String {
    let prefix = if report.timestamp.is_some() { '@' } else { '!' };
    let ts = report
        .timestamp
        .map(format_timestamp_dhmz)
        .unwrap_or_default();

    let body = if report.compressed {
        let lat = compress_lat(report.lat);
        let lon = compress_lon(report.lon);
        let ext = compressed_cs_extension(report.course_deg, report.speed_knots);
        format!(
            "{}{}{}{}{}{}",
            std::str::from_utf8(&lat).unwrap(),
            report.symbol.table,
            std::str::from_utf8(&lon).unwrap(),
            report.symbol.code,
            ext,
            report.comment,
        )
    } else {
        let lat = format_lat_uncompressed(report.lat);
        let lon = format_lon_uncompressed(report.lon);
        let course_speed = format!(
            "{:03}/{:03}",
            report.course_deg.unwrap_or(0) % 360,
            report.speed_knots.unwrap_or(0).min(999),
        );
        let altitude = report
            .altitude_ft
            .map(|ft| format!("/A={:06}", ft.clamp(-99_999, 999_999)))
            .unwrap_or_default();
        format!(
            "{lat}{}{lon}{}{course_speed}{altitude}{}",
            report.symbol.table, report.symbol.code, report.comment,
        )
    };

    format!("{prefix}{ts}{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(compressed: bool) -> PositionReport {
        PositionReport {
            lat: 37.422,
            lon: -122.084,
            symbol: Symbol::default_node(),
            timestamp: None,
            compressed,
            course_deg: Some(90),
            speed_knots: Some(10),
            altitude_ft: Some(150),
            comment: "test".to_string(),
        }
    }

    #[test]
    fn uncompressed_report_starts_with_bang_and_embeds_symbol() {
        let line = format_position_info(&sample(false));
        assert!(line.starts_with('!'));
        assert!(line.contains('/'));
        assert!(line.contains('>'));
        assert!(line.ends_with("test"));
    }

    #[test]
    fn compressed_report_is_shorter_than_uncompressed() {
        let compressed = format_position_info(&sample(true));
        let uncompressed = format_position_info(&sample(false));
        assert!(compressed.len() < uncompressed.len());
    }

    #[test]
    fn timestamped_report_uses_at_prefix() {
        let mut report = sample(false);
        report.timestamp = Some(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let line = format_position_info(&report);
        assert!(line.starts_with('@'));
        assert_eq!(&line[1..8].chars().last().unwrap(), &'z');
    }

    #[test]
    fn missing_course_speed_uses_blank_compressed_extension() {
        let mut report = sample(true);
        report.course_deg = None;
        report.speed_knots = None;
        let line = format_position_info(&report);
        // table + 4 lat digits + table char + 4 lon digits + code + two blanks
        assert!(line.contains("  "));
    }
}
