// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Pure APRS text-packet formatting (C8): coordinate encoding, info-field
//! assembly for positions, messages, objects, telemetry, and weather, and
//! full-packet assembly. No I/O, no state; every function is a total
//! mapping from typed input to an APRS wire string.

pub mod coord;
pub mod message;
pub mod object;
pub mod packet;
pub mod position;
pub mod status;
pub mod symbol;
pub mod telemetry;
pub mod weather;

pub use coord::{compress_lat, compress_lon, format_lat_uncompressed, format_lon_uncompressed};
pub use message::format_message_info;
pub use object::{format_object_info, ObjectReport};
pub use packet::assemble_packet;
pub use position::{format_position_info, format_timestamp_dhmz, PositionReport};
pub use status::format_status_info;
pub use symbol::Symbol;
pub use telemetry::{
    format_bits_line, format_eqns_line, format_parm_line, format_telemetry_report,
    format_unit_line, identity_scale,
};
pub use weather::{format_weather_info, WeatherReadings};
