// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The APRS gateway (C9): turns tactical events and position/node-info
//! updates from a session store into formatted APRS packets, subject to an
//! ingress gate, callsign resolution, rate limiting, and deduplication.

pub mod callsign;
pub mod config;
pub mod counters;
pub mod dedup;
pub mod ingress;
pub mod path;
pub mod ratelimit;
pub mod service;
pub mod sink;
pub mod telemetry_state;

pub use callsign::{parse_callsign, CallsignResolver, DEFAULT_ADDRESSEE};
pub use config::GatewayConfig;
pub use counters::{GatewayCounters, GatewayCountersSnapshot};
pub use dedup::Deduplicator;
pub use ingress::{check_ingress, GateRejection};
pub use path::build_path;
pub use ratelimit::RateLimiter;
pub use service::GatewayService;
pub use sink::{compute_expiry, GatewaySink, QueueItem};
pub use telemetry_state::TelemetryState;
