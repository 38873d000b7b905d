// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The outbound boundary between the gateway and whatever delivers its APRS
//! lines (the APRS-IS client, in the assembled binary). Kept as a trait so
//! neither crate depends on the other; the binary crate supplies the glue.

use chrono::{DateTime, Utc};

/// One formatted APRS packet queued for delivery, with an expiry computed
/// per §4.9: `max(now, rx_ts + max(5, dedupe_window_s*2))`.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub line: String,
    pub expires_at: DateTime<Utc>,
}

/// Implemented by whatever consumes the gateway's formatted output.
pub trait GatewaySink: Send + Sync {
    fn enqueue(&self, item: QueueItem);
}

pub fn compute_expiry(now: DateTime<Utc>, rx_ts: DateTime<Utc>, dedupe_window_s: u64) -> DateTime<Utc> {
    let floor = chrono::Duration::seconds(dedupe_window_s.saturating_mul(2).max(5) as i64);
    std::cmp::max(now, rx_ts + floor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_never_before_now() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let rx_ts = now - chrono::Duration::hours(1);
        assert_eq!(compute_expiry(now, rx_ts, 30), now);
    }

    #[test]
    fn expiry_extends_past_now_when_recent() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(compute_expiry(now, now, 30), now + chrono::Duration::seconds(60));
    }

    #[test]
    fn expiry_floor_is_at_least_five_seconds() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(compute_expiry(now, now, 1), now + chrono::Duration::seconds(5));
    }
}
