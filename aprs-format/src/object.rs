// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Object info field assembly (§4.8):
//! `;<name padded 9><*|_><ts><lat><table><lon><code><comment>`.

use crate::coord::{format_lat_uncompressed, format_lon_uncompressed};
use crate::position::format_timestamp_dhmz;
use crate::symbol::Symbol;
use chrono::{DateTime, Utc};

const NAME_WIDTH: usize = 9;

fn pad_name(name: &str) -> String {
    let truncated: String = name.chars().take(NAME_WIDTH).collect();
    format!("{truncated:<NAME_WIDTH$}")
}

/// An APRS object report (used for waypoints, per §4.9).
#[derive(Debug, Clone)]
pub struct ObjectReport {
    pub name: String,
    pub alive: bool,
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub symbol: Symbol,
    pub comment: String,
}

/// Formats an [`ObjectReport`] into an APRS object info field.
pub fn format_object_info(object: &ObjectReport) -> String {
    let name = pad_name(&object.name);
    let marker = if object.alive { '*' } else { '_' };
    let ts = format_timestamp_dhmz(object.timestamp);
    let lat = format_lat_uncompressed(object.lat);
    let lon = format_lon_uncompressed(object.lon);
    format!(
        ";{name}{marker}{ts}{lat}{}{lon}{}{}",
        object.symbol.table, object.symbol.code, object.comment,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(alive: bool) -> ObjectReport {
        ObjectReport {
            name: "WP1".to_string(),
            alive,
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            lat: 10.0,
            lon: -20.0,
            symbol: Symbol::new('/', 'W'),
            comment: "rally point".to_string(),
        }
    }

    #[test]
    fn live_object_uses_asterisk_marker() {
        let line = format_object_info(&sample(true));
        assert!(line.starts_with(";WP1      *"));
    }

    #[test]
    fn dead_object_uses_underscore_marker() {
        let line = format_object_info(&sample(false));
        assert!(line.starts_with(";WP1      _"));
    }

    #[test]
    fn comment_and_symbol_appear_in_order() {
        let line = format_object_info(&sample(true));
        assert!(line.contains("/W"));
        assert!(line.ends_with("rally point"));
    }
}
