// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Message info field assembly (§4.8): `:<addressee>:<text>{<id>}`.

const ADDRESSEE_WIDTH: usize = 9;

fn pad_addressee(addressee: &str) -> String {
    let truncated: String = addressee.chars().take(ADDRESSEE_WIDTH).collect();
    format!("{truncated:<ADDRESSEE_WIDTH$}")
}

/// Formats an APRS message info field. `msg_id`, if given, is rendered as
/// up to five hex digits in the trailing `{...}` ack-id block.
pub fn format_message_info(addressee: &str, text: &str, msg_id: Option<u32>) -> String {
    let addressee = pad_addressee(addressee);
    match msg_id {
        Some(id) => {
            let truncated = id & 0xF_FFFF;
            format!(":{addressee}:{text}{{{truncated:X}}}")
        }
        None => format!(":{addressee}:{text}"),
    }
}
