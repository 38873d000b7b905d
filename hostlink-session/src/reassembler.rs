// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The AppData reassembler (C6, §4.6): offset/length-based chunk merging
//! with TTL-based eviction.

use bytes::{Bytes, BytesMut};
use hostlink_protocol::{message::EvAppData, RxMetadata};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const ASSEMBLY_TTL: Duration = Duration::from_secs(20);

/// Identifies one logical AppData packet. Two fragments share a buffer iff
/// every field here matches, including `device_uptime_s`, which
/// disambiguates fragments straddling a device reboot (§4.6).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AssemblyKey {
    pub port: u32,
    pub from: u32,
    pub to: u32,
    pub channel: u8,
    pub team_key_id: u32,
    pub team_id: [u8; 8],
    pub total_length: u32,
    pub device_uptime_s: u32,
}

impl AssemblyKey {
    fn from_event(ev: &EvAppData) -> Self {
        Self {
            port: ev.port,
            from: ev.from,
            to: ev.to,
            channel: ev.channel,
            team_key_id: ev.team_key_id,
            team_id: ev.team_id,
            total_length: ev.total_length,
            device_uptime_s: ev.device_uptime_s,
        }
    }
}

/// A fully reassembled AppData packet, ready for C7 dispatch.
pub struct CompletedPacket {
    pub key: AssemblyKey,
    pub payload: Bytes,
    pub rx_meta: Option<RxMetadata>,
}

struct Assembly {
    buffer: BytesMut,
    received: Vec<bool>,
    received_count: usize,
    rx_meta: Option<RxMetadata>,
    last_update: Instant,
}

impl Assembly {
    fn new(total_length: u32) -> Self {
        let len = total_length as usize;
        Self {
            buffer: BytesMut::zeroed(len),
            received: vec![false; len],
            received_count: 0,
            rx_meta: None,
            last_update: Instant::now(),
        }
    }

    /// Clamps `[offset, offset+chunk.len())` to `[0, total_length)` and
    /// writes it in, marking the bitmap. Writing the same range twice is a
    /// no-op on `received_count` (idempotent duplicates, §4.6).
    fn write(&mut self, offset: u32, chunk: &[u8]) {
        let total_length = self.buffer.len();
        let start = offset as usize;
        if start >= total_length {
            self.last_update = Instant::now();
            return;
        }
        let end = (start + chunk.len()).min(total_length);
        if end <= start {
            self.last_update = Instant::now();
            return;
        }

        self.buffer[start..end].copy_from_slice(&chunk[..end - start]);
        for i in start..end {
            if !self.received[i] {
                self.received[i] = true;
                self.received_count += 1;
            }
        }
        self.last_update = Instant::now();
    }

    fn is_complete(&self) -> bool {
        !self.buffer.is_empty() && self.received_count == self.buffer.len()
    }
}

/// Merges fragmented `EvAppData` frames keyed by logical packet identity
/// (§4.6). One instance per session client, guarded by a single lock
/// (§5): prune and insert happen in the same critical section so a
/// concurrent caller never observes a half-pruned map.
#[derive(Default)]
pub struct Reassembler {
    assemblies: Mutex<HashMap<AssemblyKey, Assembly>>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one `EvAppData` fragment in. Returns `Some` the moment the
    /// packet it belongs to is complete (including immediately, for the
    /// `total_length == 0` single-frame fast path); prunes stale assemblies
    /// on every call.
    pub fn ingest(&self, ev: EvAppData) -> Option<CompletedPacket> {
        if ev.total_length == 0 {
            let key = AssemblyKey::from_event(&ev);
            self.prune_locked();
            return Some(CompletedPacket {
                key,
                payload: ev.chunk,
                rx_meta: ev.rx_meta,
            });
        }

        let key = AssemblyKey::from_event(&ev);
        let mut assemblies = self.assemblies.lock().unwrap();

        let assembly = assemblies
            .entry(key.clone())
            .or_insert_with(|| Assembly::new(ev.total_length));

        if assembly.rx_meta.is_none() {
            assembly.rx_meta = ev.rx_meta;
        }
        assembly.write(ev.offset, &ev.chunk);

        let completed = if assembly.is_complete() {
            let assembly = assemblies.remove(&key).unwrap();
            Some(CompletedPacket {
                key: key.clone(),
                payload: assembly.buffer.freeze(),
                rx_meta: assembly.rx_meta,
            })
        } else {
            None
        };

        self.prune(&mut assemblies);
        completed
    }

    fn prune_locked(&self) {
        let mut assemblies = self.assemblies.lock().unwrap();
        self.prune(&mut assemblies);
    }

    fn prune(&self, assemblies: &mut HashMap<AssemblyKey, Assembly>) {
        let now = Instant::now();
        assemblies.retain(|_, a| now.duration_since(a.last_update) < ASSEMBLY_TTL);
    }

    pub fn assembly_count(&self) -> usize {
        self.assemblies.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(total_length: u32, offset: u32, chunk: &[u8]) -> EvAppData {
        EvAppData {
            port: 303,
            from: 0x01020304,
            to: 0xFFFFFFFF,
            channel: 0,
            flags: 0,
            team_id: [0; 8],
            team_key_id: 0,
            device_uptime_s: 100,
            total_length,
            offset,
            chunk: Bytes::copy_from_slice(chunk),
            rx_meta: None,
        }
    }

    #[test]
    fn single_frame_fast_path_emits_immediately() {
        let r = Reassembler::new();
        let completed = r.ingest(frag(0, 0, b"hello")).unwrap();
        assert_eq!(completed.payload.as_ref(), b"hello");
        assert_eq!(r.assembly_count(), 0);
    }

    #[test]
    fn out_of_order_fragments_reassemble_in_offset_order() {
        let r = Reassembler::new();
        let total = 640u32;
        let mut chunk_b = vec![0u8; 320];
        chunk_b.iter_mut().enumerate().for_each(|(i, b)| *b = (i % 256) as u8);
        let mut chunk_a = vec![0u8; 320];
        chunk_a
            .iter_mut()
            .enumerate()
            .for_each(|(i, b)| *b = ((i + 1) % 256) as u8);

        assert!(r.ingest(frag(total, 320, &chunk_b)).is_none());
        let completed = r.ingest(frag(total, 0, &chunk_a)).unwrap();

        let mut expected = chunk_a.clone();
        expected.extend_from_slice(&chunk_b);
        assert_eq!(completed.payload.as_ref(), expected.as_slice());
        assert_eq!(r.assembly_count(), 0);
    }

    #[test]
    fn duplicate_fragments_are_idempotent() {
        let r = Reassembler::new();
        let total = 10u32;
        assert!(r.ingest(frag(total, 0, &[1; 5])).is_none());
        assert!(r.ingest(frag(total, 0, &[1; 5])).is_none());
        let completed = r.ingest(frag(total, 5, &[2; 5])).unwrap();
        assert_eq!(completed.payload.as_ref(), [1, 1, 1, 1, 1, 2, 2, 2, 2, 2]);
    }

    #[test]
    fn writes_are_clamped_to_total_length() {
        let r = Reassembler::new();
        let total = 4u32;
        let completed = r.ingest(frag(total, 2, &[9, 9, 9, 9, 9])).unwrap();
        assert_eq!(completed.payload.len(), 4);
        assert_eq!(completed.payload.as_ref(), [0, 0, 9, 9]);
    }

    #[test]
    fn distinct_device_uptime_creates_distinct_assemblies() {
        let r = Reassembler::new();
        let mut a = frag(10, 0, &[1; 5]);
        a.device_uptime_s = 1;
        let mut b = frag(10, 0, &[2; 5]);
        b.device_uptime_s = 2;
        assert!(r.ingest(a).is_none());
        assert!(r.ingest(b).is_none());
        assert_eq!(r.assembly_count(), 2);
    }
}
