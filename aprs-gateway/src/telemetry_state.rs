// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Per-source telemetry definition refresh tracking (§4.9: "emit
//! `PARM/UNIT/EQNS/BITS` if none sent in the last 30 minutes for that
//! source"), and a running telemetry sequence counter for the `T#` line.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

pub const DEFINITION_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

#[derive(Default)]
pub struct TelemetryState {
    last_definitions_sent: DashMap<u32, Instant>,
    sequence: DashMap<u32, AtomicU32>,
}

impl TelemetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` (and records `now`) if definition lines are due for
    /// `source`: first telemetry ever, or more than
    /// [`DEFINITION_REFRESH_INTERVAL`] since the last refresh.
    pub fn definitions_due(&self, source: u32, now: Instant) -> bool {
        use dashmap::mapref::entry::Entry;
        match self.last_definitions_sent.entry(source) {
            Entry::Occupied(mut occ) => {
                if now.duration_since(*occ.get()) < DEFINITION_REFRESH_INTERVAL {
                    false
                } else {
                    occ.insert(now);
                    true
                }
            }
            Entry::Vacant(vac) => {
                vac.insert(now);
                true
            }
        }
    }

    /// Next telemetry sequence number for `source`, wrapping per the `T#`
    /// line's own mod-1000 rule.
    pub fn next_seq(&self, source: u32) -> u32 {
        self.sequence
            .entry(source)
            .or_insert_with(|| AtomicU32::new(0))
            .fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_telemetry_always_needs_definitions() {
        let state = TelemetryState::new();
        assert!(state.definitions_due(1, Instant::now()));
    }

    #[test]
    fn second_telemetry_within_window_skips_definitions() {
        let state = TelemetryState::new();
        let t0 = Instant::now();
        assert!(state.definitions_due(1, t0));
        assert!(!state.definitions_due(1, t0 + Duration::from_secs(60)));
    }

    #[test]
    fn definitions_refresh_after_the_window() {
        let state = TelemetryState::new();
        let t0 = Instant::now();
        assert!(state.definitions_due(1, t0));
        assert!(state.definitions_due(1, t0 + DEFINITION_REFRESH_INTERVAL + Duration::from_secs(1)));
    }

    #[test]
    fn sequence_increments_per_source() {
        let state = TelemetryState::new();
        assert_eq!(state.next_seq(1), 0);
        assert_eq!(state.next_seq(1), 1);
        assert_eq!(state.next_seq(2), 0);
    }
}
