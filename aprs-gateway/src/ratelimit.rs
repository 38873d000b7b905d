// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Per-`(source, kind)` rate limiting (§4.9): Position uses
//! `position_interval_s`, every other kind uses `tx_min_interval_s`.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Tracks the last successful emission time per `(source, kind)` key.
#[derive(Default)]
pub struct RateLimiter {
    last_sent: DashMap<String, Instant>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records `now` if `key` is outside its interval;
    /// returns `false` without recording if the interval hasn't elapsed.
    pub fn allow(&self, key: &str, interval: Duration, now: Instant) -> bool {
        use dashmap::mapref::entry::Entry;
        match self.last_sent.entry(key.to_string()) {
            Entry::Occupied(mut occ) => {
                if now.duration_since(*occ.get()) < interval {
                    return false;
                }
                occ.insert(now);
                true
            }
            Entry::Vacant(vac) => {
                vac.insert(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_emission_is_always_allowed() {
        let limiter = RateLimiter::new();
        assert!(limiter.allow("pos|1", Duration::from_secs(60), Instant::now()));
    }

    #[test]
    fn second_emission_within_interval_is_rejected() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();
        assert!(limiter.allow("pos|1", Duration::from_secs(60), t0));
        assert!(!limiter.allow("pos|1", Duration::from_secs(60), t0 + Duration::from_secs(10)));
    }

    #[test]
    fn emission_after_interval_elapses_is_allowed() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();
        assert!(limiter.allow("pos|1", Duration::from_secs(60), t0));
        assert!(limiter.allow("pos|1", Duration::from_secs(60), t0 + Duration::from_secs(61)));
    }

    #[test]
    fn distinct_keys_are_independent() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();
        assert!(limiter.allow("pos|1", Duration::from_secs(60), t0));
        assert!(limiter.allow("msg|1", Duration::from_secs(60), t0));
    }
}
