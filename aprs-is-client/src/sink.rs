// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Bridges the gateway's [`GatewaySink`] boundary to this crate's bounded
//! queue, so the gateway can enqueue without depending on this crate.

use crate::client::IsClient;
use aprs_gateway::{GatewaySink, QueueItem};
use std::sync::Arc;

/// A cheaply-clonable handle used as the gateway's sink. Pushing is
/// fire-and-forget from the gateway's synchronous call site; a full
/// queue silently counts a drop rather than blocking the caller.
#[derive(Clone)]
pub struct IsClientSink(pub(crate) Arc<IsClient>);

impl GatewaySink for IsClientSink {
    fn enqueue(&self, item: QueueItem) {
        let client = self.0.clone();
        tokio::spawn(async move {
            if !client.queue().push(item).await {
                client.counters().incr_dropped();
            }
        });
    }
}
