// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! APRS path construction (§4.9): drop RF-spread tokens, append the
//! direct/non-direct `q` construct and the igate callsign.

/// Builds the outgoing path for one packet. `configured` is filtered to
/// drop any token starting with `WIDE`, `TRACE`, or `Q` -- the RF-spread
/// path must never be re-injected into APRS-IS.
pub fn build_path(configured: &[String], direct: bool, igate_path_suffix: &str) -> Vec<String> {
    let mut path: Vec<String> = configured
        .iter()
        .filter(|token| !is_rf_spread_token(token))
        .cloned()
        .collect();

    path.push(if direct { "qAR".to_string() } else { "qAO".to_string() });
    path.push(igate_path_suffix.to_string());
    path
}

fn is_rf_spread_token(token: &str) -> bool {
    let upper = token.to_ascii_uppercase();
    upper.starts_with("WIDE") || upper.starts_with("TRACE") || upper.starts_with('Q')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_reception_uses_qar() {
        let path = build_path(&[], true, "BG6XXX-10");
        assert_eq!(path, vec!["qAR".to_string(), "BG6XXX-10".to_string()]);
    }

    #[test]
    fn non_direct_reception_uses_qao() {
        let path = build_path(&[], false, "BG6XXX-10");
        assert_eq!(path[0], "qAO");
    }

    #[test]
    fn rf_spread_tokens_are_dropped() {
        let configured = vec!["WIDE1-1".to_string(), "TRACE2-2".to_string(), "QAC".to_string()];
        let path = build_path(&configured, true, "BG6XXX-10");
        assert_eq!(path, vec!["qAR".to_string(), "BG6XXX-10".to_string()]);
    }

    #[test]
    fn non_spread_configured_tokens_are_kept() {
        let configured = vec!["RELAY".to_string()];
        let path = build_path(&configured, true, "BG6XXX-10");
        assert_eq!(
            path,
            vec!["RELAY".to_string(), "qAR".to_string(), "BG6XXX-10".to_string()]
        );
    }
}
