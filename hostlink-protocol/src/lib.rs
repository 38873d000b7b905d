// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The HostLink wire protocol: framing, CRC, and typed payload codecs.
//!
//! This crate is pure and allocation-light by design (C1/C2 in the host
//! core's component list) so it can be fuzzed and unit tested without any
//! transport or async runtime in the loop.

pub mod config;
pub mod crc;
pub mod frame;
pub mod message;
pub mod rx_meta;
pub mod tlv;
pub mod types;

pub use frame::{Frame, FrameDecoder, FrameError, RawFrameObservation, MAX_PAYLOAD_LEN};
pub use message::{DecodeError, Message};
pub use rx_meta::{Origin, RxMetadata, TimeSource};
pub use tlv::TlvMap;
pub use types::{AckCode, Capabilities};
