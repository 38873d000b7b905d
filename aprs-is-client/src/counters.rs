// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! APRS-IS client counters: sent lines, dropped (full queue or expired at
//! dequeue), and connection errors.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct IsClientCounters {
    pub sent: AtomicU64,
    pub dropped: AtomicU64,
    pub errors: AtomicU64,
}

impl IsClientCounters {
    pub fn incr_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> IsClientCountersSnapshot {
        IsClientCountersSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IsClientCountersSnapshot {
    pub sent: u64,
    pub dropped: u64,
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_are_reflected_in_the_snapshot() {
        let counters = IsClientCounters::default();
        counters.incr_sent();
        counters.incr_dropped();
        counters.incr_dropped();
        let snap = counters.snapshot();
        assert_eq!(snap.sent, 1);
        assert_eq!(snap.dropped, 2);
        assert_eq!(snap.errors, 0);
    }
}
