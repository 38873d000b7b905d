// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! TOML configuration file shape. Kept deliberately flat and all-`String`
//! friendly so the file is easy to hand-edit; [`AppConfig::into_parts`]
//! does the conversion into the typed configs the gateway and uplink
//! crates actually want.

use anyhow::{bail, Context, Result};
use aprs_format::Symbol;
use aprs_gateway::GatewayConfig;
use aprs_is_client::IsClientConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub gateway: GatewayTomlConfig,
    pub aprs_is: AprsIsTomlConfig,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            gateway: GatewayTomlConfig::default(),
            aprs_is: AprsIsTomlConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 115_200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayTomlConfig {
    pub position_interval_s: u64,
    pub tx_min_interval_s: u64,
    pub dedupe_window_s: u64,
    pub path_tokens: Vec<String>,
    pub igate_callsign: String,
    pub igate_ssid: u8,
    /// Two-character symbol, e.g. `"/>"` (table then code).
    pub symbol: String,
    pub compress_positions: bool,
    /// `node_id -> callsign` overrides, keyed by decimal node id as a
    /// string since TOML tables require string keys.
    pub node_id_to_callsign: HashMap<String, String>,
}

impl Default for GatewayTomlConfig {
    fn default() -> Self {
        let defaults = GatewayConfig::default();
        Self {
            position_interval_s: defaults.position_interval_s,
            tx_min_interval_s: defaults.tx_min_interval_s,
            dedupe_window_s: defaults.dedupe_window_s,
            path_tokens: defaults.path_tokens,
            igate_callsign: defaults.igate_callsign,
            igate_ssid: defaults.igate_ssid,
            symbol: "/>".to_string(),
            compress_positions: defaults.compress_positions,
            node_id_to_callsign: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AprsIsTomlConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub igate_callsign: String,
    pub igate_ssid: u8,
    pub passcode: String,
    pub filter: Option<String>,
    pub software_name: String,
    pub software_version: String,
}

impl Default for AprsIsTomlConfig {
    fn default() -> Self {
        let defaults = IsClientConfig::default();
        Self {
            enabled: defaults.enabled,
            host: defaults.host,
            port: defaults.port,
            igate_callsign: defaults.igate_callsign,
            igate_ssid: defaults.igate_ssid,
            passcode: defaults.passcode,
            filter: defaults.filter,
            software_name: defaults.software_name,
            software_version: defaults.software_version,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn into_parts(self) -> Result<(SerialConfig, GatewayConfig, IsClientConfig, String)> {
        let symbol = parse_symbol(&self.gateway.symbol)?;

        let mut node_id_to_callsign = HashMap::new();
        for (key, callsign) in self.gateway.node_id_to_callsign {
            let node_id: u32 = key
                .parse()
                .with_context(|| format!("invalid node id key {key:?} in node_id_to_callsign"))?;
            node_id_to_callsign.insert(node_id, callsign);
        }

        let gateway_config = GatewayConfig {
            position_interval_s: self.gateway.position_interval_s,
            tx_min_interval_s: self.gateway.tx_min_interval_s,
            dedupe_window_s: self.gateway.dedupe_window_s,
            path_tokens: self.gateway.path_tokens,
            igate_callsign: self.gateway.igate_callsign,
            igate_ssid: self.gateway.igate_ssid,
            symbol,
            compress_positions: self.gateway.compress_positions,
            node_id_to_callsign,
        };

        let is_client_config = IsClientConfig {
            enabled: self.aprs_is.enabled,
            host: self.aprs_is.host,
            port: self.aprs_is.port,
            igate_callsign: self.aprs_is.igate_callsign,
            igate_ssid: self.aprs_is.igate_ssid,
            passcode: self.aprs_is.passcode,
            filter: self.aprs_is.filter,
            software_name: self.aprs_is.software_name,
            software_version: self.aprs_is.software_version,
        };

        Ok((self.serial, gateway_config, is_client_config, self.log_filter))
    }
}

fn parse_symbol(raw: &str) -> Result<Symbol> {
    let mut chars = raw.chars();
    let (Some(table), Some(code), None) = (chars.next(), chars.next(), chars.next()) else {
        bail!("symbol must be exactly two characters, got {raw:?}");
    };
    Ok(Symbol::new(table, code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_converts_cleanly() {
        let (_, gateway, is_client, log_filter) = AppConfig::default().into_parts().unwrap();
        assert_eq!(gateway.igate_ssid, 10);
        assert!(!is_client.enabled);
        assert_eq!(log_filter, "info");
    }

    #[test]
    fn rejects_malformed_symbol() {
        let mut config = AppConfig::default();
        config.gateway.symbol = "/".to_string();
        assert!(config.into_parts().is_err());
    }

    #[test]
    fn rejects_non_numeric_node_id_key() {
        let mut config = AppConfig::default();
        config
            .gateway
            .node_id_to_callsign
            .insert("not-a-number".to_string(), "BG6ABC".to_string());
        assert!(config.into_parts().is_err());
    }

    #[test]
    fn parses_toml_document() {
        let text = r#"
            log_filter = "debug"

            [serial]
            port = "/dev/ttyUSB0"
            baud_rate = 57600

            [gateway]
            igate_callsign = "BG6ABC"
            igate_ssid = 10
            symbol = "/>"

            [aprs_is]
            enabled = true
            igate_callsign = "BG6ABC"
            passcode = "12345"
        "#;
        let config: AppConfig = toml::from_str(text).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 57600);
        assert!(config.aprs_is.enabled);
    }
}
