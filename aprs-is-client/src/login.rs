// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Login line assembly (§4.10): `user <CALL[-SSID]> pass <passcode> vers
//! <name> <ver>[ filter <filter>]`. The caller appends the `\r\n` line
//! ending at the point it writes to the socket.

pub fn build_login_line(
    call_with_ssid: &str,
    passcode: &str,
    software_name: &str,
    software_version: &str,
    filter: Option<&str>,
) -> String {
    let mut line = format!(
        "user {call_with_ssid} pass {passcode} vers {software_name} {software_version}"
    );
    if let Some(filter) = filter {
        line.push_str(" filter ");
        line.push_str(filter);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_without_filter() {
        let line = build_login_line("BG6ABC-10", "12345", "TrailMate", "1.0", None);
        assert_eq!(line, "user BG6ABC-10 pass 12345 vers TrailMate 1.0");
    }

    #[test]
    fn line_with_filter_appends_trailing_clause() {
        let line = build_login_line("BG6ABC-10", "12345", "TrailMate", "1.0", Some("r/30/120/50"));
        assert_eq!(
            line,
            "user BG6ABC-10 pass 12345 vers TrailMate 1.0 filter r/30/120/50"
        );
    }
}
