// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Gateway policy settings (§4.9, §11): rate limits, dedup window, path
//! tokens, symbol selection, and the static node-id-to-callsign map (config
//! TLV key 30).

use aprs_format::Symbol;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Minimum spacing between two Position emissions for the same source.
    pub position_interval_s: u64,
    /// Minimum spacing between two non-Position emissions for the same
    /// `(source, kind)`.
    pub tx_min_interval_s: u64,
    /// Dedup suppression window.
    pub dedupe_window_s: u64,
    /// Configured RF path tokens, filtered of `WIDE`/`TRACE`/`Q*` before use.
    pub path_tokens: Vec<String>,
    pub igate_callsign: String,
    pub igate_ssid: u8,
    pub symbol: Symbol,
    pub compress_positions: bool,
    /// Explicit `node_id -> callsign` overrides (config TLV key 30),
    /// consulted before falling back to last-seen `NodeInfo.user_id`.
    pub node_id_to_callsign: HashMap<u32, String>,
}

impl GatewayConfig {
    pub fn igate_path_suffix(&self) -> String {
        if self.igate_ssid == 0 {
            self.igate_callsign.clone()
        } else {
            format!("{}-{}", self.igate_callsign, self.igate_ssid)
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            position_interval_s: 120,
            tx_min_interval_s: 30,
            dedupe_window_s: 30,
            path_tokens: Vec::new(),
            igate_callsign: "N0CALL".to_string(),
            igate_ssid: 10,
            symbol: Symbol::default_node(),
            compress_positions: false,
            node_id_to_callsign: HashMap::new(),
        }
    }
}
