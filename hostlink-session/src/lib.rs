// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The async half of the host core: connection lifecycle, request
//! tracking, AppData reassembly/decoding, the session client, and the
//! in-memory session store (C3-C7, C11).

pub mod client;
pub mod decoder;
pub mod error;
pub mod reassembler;
pub mod records;
pub mod state;
pub mod store;
pub mod tracker;

pub use client::{DeviceInfo, SessionClient, TeamContext};
pub use error::{SessionError, SessionResult};
pub use reassembler::{AssemblyKey, CompletedPacket, Reassembler};
pub use records::{
    DecodedRecords, LocationSource, MessageEntry, MessageStatus, NodeInfoUpdate, PositionSource,
    PositionUpdate, TacticalEvent, TacticalEventKind, TelemetrySummary,
};
pub use state::ConnectionState;
pub use store::{SessionStore, StoreEvent};
pub use tracker::{AckOutcome, PendingHandle, RequestTracker};
