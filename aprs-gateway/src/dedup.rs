// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Candidate deduplication (§4.9): key is `kind|source|packet_id` when a
//! non-zero packet id is present, else `kind|source|info`. Housekeeping
//! every 10 s drops entries older than the dedup window.

use dashmap::DashMap;
use std::time::{Duration, Instant};

pub const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Default)]
pub struct Deduplicator {
    seen: DashMap<String, Instant>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(kind: &str, source: u32, packet_id: Option<u32>, info: &str) -> String {
        match packet_id {
            Some(id) if id != 0 => format!("{kind}|{source}|{id}"),
            _ => format!("{kind}|{source}|{info}"),
        }
    }

    /// Returns `true` and records `now` if `key` hasn't been seen within
    /// `window`; returns `false` (a dedup hit) without touching state
    /// otherwise.
    pub fn check(&self, key: &str, window: Duration, now: Instant) -> bool {
        use dashmap::mapref::entry::Entry;
        match self.seen.entry(key.to_string()) {
            Entry::Occupied(mut occ) => {
                if now.duration_since(*occ.get()) < window {
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

    /// Drops entries older than `window`, relative to `now`. Intended to be
    /// called on the [`HOUSEKEEPING_INTERVAL`] tick.
    pub fn housekeep(&self, window: Duration, now: Instant) {
        self.seen
            .retain(|_, last_seen| now.duration_since(*last_seen) < window);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
