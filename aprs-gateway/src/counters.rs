// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Gateway counters (§5: "counters use atomic increments").

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct GatewayCounters {
    pub errors: AtomicU64,
    pub dropped: AtomicU64,
    pub rate_limited: AtomicU64,
    pub dedupe_hits: AtomicU64,
    pub sent: AtomicU64,
}

impl GatewayCounters {
    pub fn snapshot(&self) -> GatewayCountersSnapshot {
        GatewayCountersSnapshot {
            errors: self.errors.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            dedupe_hits: self.dedupe_hits.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
        }
    }

    pub fn incr_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_dedupe_hits(&self) {
        self.dedupe_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GatewayCountersSnapshot {
    pub errors: u64,
    pub dropped: u64,
    pub rate_limited: u64,
    pub dedupe_hits: u64,
    pub sent: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_are_reflected_in_the_snapshot() {
        let counters = GatewayCounters::default();
        counters.incr_sent();
        counters.incr_sent();
        counters.incr_dedupe_hits();
        let snap = counters.snapshot();
        assert_eq!(snap.sent, 2);
        assert_eq!(snap.dedupe_hits, 1);
        assert_eq!(snap.errors, 0);
    }
}
