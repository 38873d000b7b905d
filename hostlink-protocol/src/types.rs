// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Wire constants from §6: frame types, ACK codes, and the capability
//! bitmask.

use bitflags::bitflags;
use displaydoc::Display;

/// HostLink frame type byte values.
pub mod frame_type {
    pub const HELLO: u8 = 0x01;
    pub const HELLO_ACK: u8 = 0x02;
    pub const ACK: u8 = 0x03;
    pub const CMD_TX_MSG: u8 = 0x10;
    pub const CMD_GET_CONFIG: u8 = 0x11;
    pub const CMD_SET_CONFIG: u8 = 0x12;
    pub const CMD_SET_TIME: u8 = 0x13;
    pub const CMD_GET_GPS: u8 = 0x14;
    pub const CMD_TX_APP_DATA: u8 = 0x15;
    pub const EV_RX_MSG: u8 = 0x80;
    pub const EV_TX_RESULT: u8 = 0x81;
    pub const EV_STATUS: u8 = 0x82;
    pub const EV_GPS: u8 = 0x84;
    pub const EV_APP_DATA: u8 = 0x85;
    pub const EV_TEAM_STATE: u8 = 0x86;
}

/// ACK result codes (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AckCode {
    /// command accepted
    Ok,
    /// the command frame's CRC was invalid
    BadCrc,
    /// the command is not supported by this device/firmware
    Unsupported,
    /// the device is busy and could not process the command now
    Busy,
    /// one or more command parameters were invalid
    InvalidParam,
    /// the device is not in a mode that accepts this command
    NotInMode,
    /// an internal device error occurred
    Internal,
}

impl AckCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Ok,
            1 => Self::BadCrc,
            2 => Self::Unsupported,
            3 => Self::Busy,
            4 => Self::InvalidParam,
            5 => Self::NotInMode,
            6 => Self::Internal,
            _ => return None,
        })
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::BadCrc => 1,
            Self::Unsupported => 2,
            Self::Busy => 3,
            Self::InvalidParam => 4,
            Self::NotInMode => 5,
            Self::Internal => 6,
        }
    }

    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

bitflags! {
    /// Device capability bitmask advertised in `HelloAck`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        const TX_MSG        = 1 << 0;
        const CONFIG        = 1 << 1;
        const SET_TIME      = 1 << 2;
        const STATUS        = 1 << 3;
        const LOGS          = 1 << 4;
        const GPS           = 1 << 5;
        const APP_DATA      = 1 << 6;
        const TEAM_STATE    = 1 << 7;
        const APRS_GATEWAY  = 1 << 8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_code_round_trips() {
        for v in 0u8..=6 {
            let code = AckCode::from_u8(v).unwrap();
            assert_eq!(code.to_u8(), v);
        }
        assert!(AckCode::from_u8(7).is_none());
    }

    #[test]
    fn capability_bits_match_spec_layout() {
        assert_eq!(Capabilities::TX_MSG.bits(), 0x001);
        assert_eq!(Capabilities::APRS_GATEWAY.bits(), 0x100);
        let all = Capabilities::all();
        assert!(all.contains(Capabilities::GPS));
    }
}
