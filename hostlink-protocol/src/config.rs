// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Known configuration TLV keys (§4.9) carried inside `CmdSetConfig` /
//! `EvStatus`'s config map.

use bytes::Bytes;

/// Config TLV key whose value is a packed `node_id -> callsign` map, used by
/// the APRS gateway's callsign resolution (§4.9).
pub const NODE_CALLSIGN_MAP_KEY: u8 = 30;

/// Decodes the value of [`NODE_CALLSIGN_MAP_KEY`]: a sequence of
/// `{u32 node_id, u8 callsign_len, ascii callsign}` entries. Malformed
/// trailing bytes are dropped rather than erroring, consistent with the
/// rest of the TLV decoding in this crate never aborting a record.
pub fn decode_node_callsign_map(bytes: &Bytes) -> Vec<(u32, String)> {
    let mut entries = Vec::new();
    let mut offset = 0usize;

    while bytes.len().saturating_sub(offset) >= 5 {
        let node_id = u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
        let len = bytes[offset + 4] as usize;
        let start = offset + 5;
        let end = start + len;
        if end > bytes.len() {
            break;
        }
        if let Ok(callsign) = std::str::from_utf8(&bytes[start..end]) {
            entries.push((node_id, callsign.to_ascii_uppercase()));
        }
        offset = end;
    }

    entries
}

/// Encodes a `node_id -> callsign` map back to its wire form. Used by tests
/// and by any tooling that needs to push the map to the device.
pub fn encode_node_callsign_map(entries: &[(u32, String)]) -> Bytes {
    let mut out = Vec::new();
    for (node_id, callsign) in entries {
        let callsign = callsign.as_bytes();
        let len = callsign.len().min(u8::MAX as usize);
        out.extend_from_slice(&node_id.to_le_bytes());
        out.push(len as u8);
        out.extend_from_slice(&callsign[..len]);
    }
    Bytes::from(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_node_callsign_map() {
        let entries = vec![
            (0x01020304u32, "BG6ABC".to_string()),
            (0x0A0B0C0Du32, "BG6XXX-10".to_string()),
        ];
        let encoded = encode_node_callsign_map(&entries);
        let decoded = decode_node_callsign_map(&encoded);
        assert_eq!(decoded, entries);
    }

    #[test]
    fn truncated_entry_is_dropped_not_fatal() {
        let mut encoded = encode_node_callsign_map(&[(1, "A".to_string())]).to_vec();
        encoded.extend_from_slice(&[1, 2, 3]); // dangling partial entry
        let decoded = decode_node_callsign_map(&Bytes::from(encoded));
        assert_eq!(decoded, vec![(1, "A".to_string())]);
    }
}
