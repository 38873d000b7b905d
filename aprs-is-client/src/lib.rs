// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Persistent APRS-IS uplink (C10): connects, logs in, drains a bounded
//! send queue, and reconnects with a fixed backoff on failure.

pub mod client;
pub mod config;
pub mod counters;
pub mod login;
pub mod queue;
pub mod sink;
pub mod state;

pub use client::IsClient;
pub use config::IsClientConfig;
pub use counters::{IsClientCounters, IsClientCountersSnapshot};
pub use login::build_login_line;
pub use queue::{IsQueue, QUEUE_CAPACITY};
pub use sink::IsClientSink;
pub use state::IsClientState;
