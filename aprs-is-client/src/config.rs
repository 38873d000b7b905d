// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! APRS-IS client settings (§4.10).

/// Settings for one APRS-IS uplink. Missing `callsign`/`passcode` while
/// `enabled` is still honored at the call site as a `Disabled` reason
/// rather than rejected here.
#[derive(Debug, Clone)]
pub struct IsClientConfig {
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

impl IsClientConfig {
    pub fn callsign_with_ssid(&self) -> String {
        if self.igate_ssid == 0 {
            self.igate_callsign.clone()
        } else {
            format!("{}-{}", self.igate_callsign, self.igate_ssid)
        }
    }

    /// Why the client can't run, if it can't -- missing credentials count
    /// as disabled even when `enabled` is set (§4.10 step 1).
    pub fn disabled_reason(&self) -> Option<String> {
        if !self.enabled {
            return Some("not enabled".to_string());
        }
        if self.igate_callsign.trim().is_empty() {
            return Some("missing callsign".to_string());
        }
        if self.passcode.trim().is_empty() {
            return Some("missing passcode".to_string());
        }
        None
    }
}

impl Default for IsClientConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "rotate.aprs2.net".to_string(),
            port: 14580,
            igate_callsign: String::new(),
            igate_ssid: 0,
            passcode: String::new(),
            filter: None,
            software_name: "TrailMate".to_string(),
            software_version: "1.0".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_when_not_enabled() {
        let config = IsClientConfig::default();
        assert_eq!(config.disabled_reason(), Some("not enabled".to_string()));
    }

    #[test]
    fn disabled_when_credentials_missing() {
        let mut config = IsClientConfig {
            enabled: true,
            ..IsClientConfig::default()
        };
        assert!(config.disabled_reason().is_some());
        config.igate_callsign = "BG6ABC".to_string();
        assert!(config.disabled_reason().is_some());
        config.passcode = "12345".to_string();
        assert_eq!(config.disabled_reason(), None);
    }

    #[test]
    fn callsign_with_ssid_appends_suffix_only_when_nonzero() {
        let config = IsClientConfig {
            igate_callsign: "BG6ABC".to_string(),
            igate_ssid: 10,
            ..IsClientConfig::default()
        };
        assert_eq!(config.callsign_with_ssid(), "BG6ABC-10");
    }
}
