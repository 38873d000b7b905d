// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The request tracker (C3, §4.3): sequence allocation, the pending table,
//! ACK matching, and timeout/retry scheduling.

use bytes::Bytes;
use hostlink_protocol::AckCode;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// How a pending request was finally resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    Ack(AckCode),
    /// All retries were exhausted without an ACK.
    TimedOut,
}

/// Returned by [`RequestTracker::register`]. `ack` resolves exactly once,
/// whichever of ACK-received or retries-exhausted happens first; the loser
/// of that race is dropped silently (§4.3's ordering guarantee).
pub struct PendingHandle {
    pub seq: u16,
    pub ack: oneshot::Receiver<AckOutcome>,
}

struct PendingEntry {
    frame_type: u8,
    frame_bytes: Bytes,
    last_sent_at: Instant,
    retries: u32,
    max_retries: u32,
    ack_timeout: Duration,
    ack_tx: Option<oneshot::Sender<AckOutcome>>,
}

/// A pending request that has timed out and either needs to be retried (a
/// fresh copy of `frame_bytes` re-sent with the same `seq`) or finalized as
/// timed out, depending on whether retries remain.
pub struct TimedOutEntry {
    pub seq: u16,
    pub frame_type: u8,
    pub frame_bytes: Bytes,
    pub retries: u32,
    pub max_retries: u32,
}

#[derive(Default)]
struct Inner {
    next_seq: u16,
    pending: HashMap<u16, PendingEntry>,
}

/// Tracks in-flight HostLink commands awaiting an ACK. One instance per
/// session client; guarded by a single lock (§5), since ACK and timeout
/// handling are both infrequent relative to the data path and must agree on
/// a single source of truth for "has this seq already been resolved".
pub struct RequestTracker {
    inner: Mutex<Inner>,
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_seq: 1,
                pending: HashMap::new(),
            }),
        }
    }

    /// Allocates a monotonic sequence number, skipping zero on wrap.
    /// Callers that need the seq embedded in the frame bytes they register
    /// (every command frame does, since the ACK echoes it back) call this
    /// first, encode, then call [`Self::register_with_seq`].
    pub fn alloc_seq(&self) -> u16 {
        let mut inner = self.inner.lock().unwrap();
        let mut seq = inner.next_seq;
        if seq == 0 {
            seq = 1;
        }
        inner.next_seq = seq.wrapping_add(1);
        seq
    }

    /// Allocates a sequence number and registers a pending entry for it in
    /// one step, for callers that don't need the seq before encoding.
    pub fn register(
        &self,
        frame_type: u8,
        frame_bytes: Bytes,
        ack_timeout: Duration,
        max_retries: u32,
    ) -> PendingHandle {
        let seq = self.alloc_seq();
        self.register_with_seq(seq, frame_type, frame_bytes, ack_timeout, max_retries)
    }

    /// Registers a pending entry under a seq obtained from
    /// [`Self::alloc_seq`].
    pub fn register_with_seq(
        &self,
        seq: u16,
        frame_type: u8,
        frame_bytes: Bytes,
        ack_timeout: Duration,
        max_retries: u32,
    ) -> PendingHandle {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock().unwrap();
        inner.pending.insert(
            seq,
            PendingEntry {
                frame_type,
                frame_bytes,
                last_sent_at: Instant::now(),
                retries: 0,
                max_retries,
                ack_timeout,
                ack_tx: Some(tx),
            },
        );
        PendingHandle { seq, ack: rx }
    }

    /// Resolves the ACK future for `seq`, if it's still pending. Returns
    /// `true` if this call was the one that resolved it (the pending entry
    /// is removed on ACK completion, per §3).
    pub fn handle_ack(&self, seq: u16, code: AckCode) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let Some(mut entry) = inner.pending.remove(&seq) else {
            return false;
        };
        if let Some(tx) = entry.ack_tx.take() {
            let _ = tx.send(AckOutcome::Ack(code));
            true
        } else {
            false
        }
    }

    /// Removes a pending entry without resolving its ACK future (used when
    /// a caller cancels or the connection is reset).
    pub fn complete(&self, seq: u16) {
        self.inner.lock().unwrap().pending.remove(&seq);
    }

    pub fn frame_type_of(&self, seq: u16) -> Option<u8> {
        self.inner
            .lock()
            .unwrap()
            .pending
            .get(&seq)
            .map(|e| e.frame_type)
    }

    /// Returns every pending entry whose `ack_timeout` has elapsed since
    /// `last_sent_at`. For entries with retries remaining, the caller is
    /// expected to re-send `frame_bytes` and call [`Self::mark_retried`];
    /// for entries with no retries left, the caller finalizes them as timed
    /// out via [`Self::finalize_timeout`].
    pub fn get_timed_out(&self, now: Instant) -> Vec<TimedOutEntry> {
        let inner = self.inner.lock().unwrap();
        inner
            .pending
            .iter()
            .filter(|(_, e)| now.duration_since(e.last_sent_at) >= e.ack_timeout)
            .map(|(&seq, e)| TimedOutEntry {
                seq,
                frame_type: e.frame_type,
                frame_bytes: e.frame_bytes.clone(),
                retries: e.retries,
                max_retries: e.max_retries,
            })
            .collect()
    }

    pub fn mark_retried(&self, seq: u16, now: Instant) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(entry) = inner.pending.get_mut(&seq) {
            entry.retries += 1;
            entry.last_sent_at = now;
        }
    }

    /// Finalizes `seq` as timed out: removes the entry and resolves its ACK
    /// future with [`AckOutcome::TimedOut`], if the ACK race hasn't already
    /// resolved it (in which case this is a no-op, per §4.3's ordering
    /// guarantee).
    pub fn finalize_timeout(&self, seq: u16) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(mut entry) = inner.pending.remove(&seq) {
            if let Some(tx) = entry.ack_tx.take() {
                let _ = tx.send(AckOutcome::TimedOut);
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    /// Drops every pending entry without resolving their futures (receivers
    /// observe a closed channel). Used on reconnect (§4.5: "Reset ... in-
    /// flight pending entries on reconnect").
    pub fn reset(&self) {
        self.inner.lock().unwrap().pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_are_monotonic_and_skip_zero() {
        let tracker = RequestTracker::new();
        let mut seen = Vec::new();
        for _ in 0..3 {
            let handle = tracker.register(0x10, Bytes::new(), Duration::from_millis(1), 0);
            seen.push(handle.seq);
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn sequence_wraps_without_hitting_zero() {
        let tracker = RequestTracker::new();
        tracker.inner.lock().unwrap().next_seq = u16::MAX;
        let h1 = tracker.register(0x10, Bytes::new(), Duration::from_millis(1), 0);
        assert_eq!(h1.seq, u16::MAX);
        let h2 = tracker.register(0x10, Bytes::new(), Duration::from_millis(1), 0);
        assert_eq!(h2.seq, 1);
    }

    #[tokio::test]
    async fn ack_resolves_the_future_exactly_once() {
        let tracker = RequestTracker::new();
        let handle = tracker.register(0x10, Bytes::new(), Duration::from_secs(5), 2);

        assert!(tracker.handle_ack(handle.seq, AckCode::Ok));
        // Second ack for the same (already-removed) seq is a no-op.
        assert!(!tracker.handle_ack(handle.seq, AckCode::Ok));

        let outcome = handle.ack.await.unwrap();
        assert_eq!(outcome, AckOutcome::Ack(AckCode::Ok));
        assert_eq!(tracker.pending_count(), 0);
    }

    #[test]
    fn timeout_detection_respects_per_entry_timeout() {
        let tracker = RequestTracker::new();
        let handle = tracker.register(0x10, Bytes::new(), Duration::from_millis(0), 1);
        let timed_out = tracker.get_timed_out(Instant::now());
        assert_eq!(timed_out.len(), 1);
        assert_eq!(timed_out[0].seq, handle.seq);
    }

    #[tokio::test]
    async fn retry_exhaustion_finalizes_as_timed_out() {
        let tracker = RequestTracker::new();
        let handle = tracker.register(0x10, Bytes::new(), Duration::from_millis(0), 0);
        let timed_out = tracker.get_timed_out(Instant::now());
        assert_eq!(timed_out[0].retries, 0);
        assert_eq!(timed_out[0].max_retries, 0);

        tracker.finalize_timeout(handle.seq);
        let outcome = handle.ack.await.unwrap();
        assert_eq!(outcome, AckOutcome::TimedOut);
    }

    #[test]
    fn reset_drops_all_pending_entries() {
        let tracker = RequestTracker::new();
        tracker.register(0x10, Bytes::new(), Duration::from_secs(1), 0);
        tracker.register(0x11, Bytes::new(), Duration::from_secs(1), 0);
        assert_eq!(tracker.pending_count(), 2);
        tracker.reset();
        assert_eq!(tracker.pending_count(), 0);
    }
}
