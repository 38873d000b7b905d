// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Generic `{u8 key, u8 len, bytes}` TLV stream codec shared by config maps,
//! status payloads, and RX metadata (§4.2, §6).
//!
//! Decoding stops (without erroring) as soon as fewer than two bytes remain,
//! or a declared length would overrun the remaining buffer -- an unknown or
//! truncated trailing TLV must never abort decoding of the record it's
//! embedded in.

use bytes::{BufMut, Bytes, BytesMut};

/// An ordered list of `(key, value)` TLV entries. Order is preserved on
/// decode but isn't semantically meaningful -- two maps with the same
/// entries in different orders are equal for encode/decode round-trip
/// purposes (§8: "TLV encode then decode ... returns the same keys->bytes
/// mapping (ignoring insertion order)").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlvMap {
    entries: Vec<(u8, Bytes)>,
}

impl TlvMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: u8, value: impl Into<Bytes>) {
        self.entries.push((key, value.into()));
    }

    pub fn get(&self, key: u8) -> Option<&Bytes> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(u8, Bytes)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decodes a TLV stream from `bytes`. Never errors: an unknown key is
    /// preserved verbatim, and a truncated trailing entry simply ends
    /// decoding early.
    pub fn decode(bytes: &[u8]) -> Self {
        let mut entries = Vec::new();
        let mut offset = 0;

        while bytes.len().saturating_sub(offset) >= 2 {
            let key = bytes[offset];
            let len = bytes[offset + 1] as usize;
            let value_start = offset + 2;
            let value_end = value_start + len;

            if value_end > bytes.len() {
                break;
            }

            entries.push((key, Bytes::copy_from_slice(&bytes[value_start..value_end])));
            offset = value_end;
        }

        Self { entries }
    }

    /// Encodes this map as a TLV stream. Values longer than 255 bytes are
    /// truncated to fit the single-byte length prefix; callers are expected
    /// to keep TLV values small (this mirrors the wire format's own limit).
    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        for (key, value) in &self.entries {
            let len = value.len().min(u8::MAX as usize);
            out.put_u8(*key);
            out.put_u8(len as u8);
            out.put_slice(&value[..len]);
        }
        out.freeze()
    }
}

impl FromIterator<(u8, Bytes)> for TlvMap {
    fn from_iter<T: IntoIterator<Item = (u8, Bytes)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ignoring_order() {
        let mut map = TlvMap::new();
        map.insert(1, Bytes::from_static(b"a"));
        map.insert(2, Bytes::from_static(b"bb"));

        let decoded = TlvMap::decode(&map.encode());
        assert_eq!(decoded.get(1), Some(&Bytes::from_static(b"a")));
        assert_eq!(decoded.get(2), Some(&Bytes::from_static(b"bb")));
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn stops_on_truncated_trailing_entry() {
        // key=5, declared len=10, but only 2 bytes of value follow
        let bytes = [5u8, 10, 0, 1];
        let map = TlvMap::decode(&bytes);
        assert!(map.is_empty());
    }

    #[test]
    fn stops_with_fewer_than_two_bytes_remaining() {
        let mut map = TlvMap::new();
        map.insert(9, Bytes::from_static(b"x"));
        let mut bytes = map.encode().to_vec();
        bytes.push(0xFF); // single dangling byte

        let decoded = TlvMap::decode(&bytes);
        assert_eq!(decoded.get(9), Some(&Bytes::from_static(b"x")));
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn unknown_keys_are_preserved() {
        let mut map = TlvMap::new();
        map.insert(200, Bytes::from_static(b"?"));
        let decoded = TlvMap::decode(&map.encode());
        assert_eq!(decoded.get(200), Some(&Bytes::from_static(b"?")));
    }
}
