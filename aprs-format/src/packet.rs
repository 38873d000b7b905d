// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Full APRS packet assembly: `SRC>TOCALL[,path…]:INFO`.

/// Assembles a complete APRS packet string from its header parts and an
/// already-formatted info field (position, message, object, telemetry, or
/// weather).
pub fn assemble_packet(source: &str, destination: &str, path: &[String], info: &str) -> String {
    if path.is_empty() {
        format!("{source}>{destination}:{info}")
    } else {
        format!("{source}>{destination},{}:{info}", path.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_path_omits_trailing_comma() {
        let packet = assemble_packet("BG6ABC", "APRS", &[], "!0000.00N/00000.00E>");
        assert_eq!(packet, "BG6ABC>APRS:!0000.00N/00000.00E>");
    }

    #[test]
    fn path_segments_are_comma_joined() {
        let path = vec!["qAR".to_string(), "BG6XXX-10".to_string()];
        let packet = assemble_packet("BG6ABC", "APRS", &path, "status");
        assert_eq!(packet, "BG6ABC>APRS,qAR,BG6XXX-10:status");
    }
}
