// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Callsign resolution (§4.9): explicit `node_id -> callsign` overrides
//! first, then last-seen `NodeInfo.user_id` parsed as `CALL[-SSID]`.

use dashmap::DashMap;
use hostlink_session::NodeInfoUpdate;
use std::collections::HashMap;

/// Default addressee for messages whose destination callsign is unknown.
pub const DEFAULT_ADDRESSEE: &str = "BLNALL";

/// Validates and normalizes a `user_id` string into an APRS `CALL[-SSID]`
/// token: 1..9 characters, uppercase letters, digits, and `-` only.
pub fn parse_callsign(user_id: &str) -> Option<String> {
    let candidate = user_id.trim().to_ascii_uppercase();
    if candidate.is_empty() || candidate.len() > 9 {
        return None;
    }
    if !candidate
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return None;
    }

    match candidate.split_once('-') {
        None => Some(candidate),
        Some((call, ssid)) => {
            if call.is_empty() || ssid.is_empty() || ssid.len() > 2 {
                return None;
            }
            if !ssid.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            Some(candidate)
        }
    }
}

/// Tracks the last-known callsign per node id, layering config overrides
/// over NodeInfo-derived callsigns.
pub struct CallsignResolver {
    overrides: HashMap<u32, String>,
    learned: DashMap<u32, String>,
}

impl CallsignResolver {
    pub fn new(overrides: HashMap<u32, String>) -> Self {
        Self {
            overrides,
            learned: DashMap::new(),
        }
    }

    /// Records a `NodeInfoUpdate`'s `user_id`, if it parses as a callsign.
    pub fn observe(&self, info: &NodeInfoUpdate) {
        if let Some(user_id) = &info.user_id {
            if let Some(call) = parse_callsign(user_id) {
                self.learned.insert(info.node_id, call);
            }
        }
    }

    /// Resolves `node_id` to a callsign, preferring the configured override.
    pub fn resolve(&self, node_id: u32) -> Option<String> {
        self.overrides
            .get(&node_id)
            .cloned()
            .or_else(|| self.learned.get(&node_id).map(|r| r.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn node_info(node_id: u32, user_id: &str) -> NodeInfoUpdate {
        NodeInfoUpdate {
            node_id,
            user_id: Some(user_id.to_string()),
            long_name: None,
            short_name: None,
            hw_model: None,
            snr: None,
            created_at: Some(Utc::now()),
        }
    }

    #[test]
    fn valid_callsign_with_ssid_parses() {
        assert_eq!(parse_callsign("bg6abc-10"), Some("BG6ABC-10".to_string()));
    }

    #[test]
    fn callsign_without_ssid_parses() {
        assert_eq!(parse_callsign("n0call"), Some("N0CALL".to_string()));
    }

    #[test]
    fn invalid_characters_are_rejected() {
        assert_eq!(parse_callsign("!deadbeef"), None);
    }

    #[test]
    fn too_long_is_rejected() {
        assert_eq!(parse_callsign("WAYTOOLONGCALL"), None);
    }

    #[test]
    fn override_takes_precedence_over_learned() {
        let mut overrides = HashMap::new();
        overrides.insert(1, "BG6XXX".to_string());
        let resolver = CallsignResolver::new(overrides);
        resolver.observe(&node_info(1, "BG6ABC"));
        assert_eq!(resolver.resolve(1), Some("BG6XXX".to_string()));
    }

    #[test]
    fn learned_callsign_used_when_no_override() {
        let resolver = CallsignResolver::new(HashMap::new());
        resolver.observe(&node_info(2, "bg6abc-5"));
        assert_eq!(resolver.resolve(2), Some("BG6ABC-5".to_string()));
    }

    #[test]
    fn unknown_node_resolves_to_none() {
        let resolver = CallsignResolver::new(HashMap::new());
        assert_eq!(resolver.resolve(99), None);
    }

    #[test]
    fn malformed_user_id_is_not_learned() {
        let resolver = CallsignResolver::new(HashMap::new());
        resolver.observe(&node_info(3, "!abcdef12"));
        assert_eq!(resolver.resolve(3), None);
    }
}
