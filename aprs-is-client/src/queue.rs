// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The bounded outbound queue (§4.10, §3 "APRS queue item"): push drops
//! the incoming item when full; pop drops any already-expired item at
//! the head before handing back the next live one.

use aprs_gateway::QueueItem;
use chrono::Utc;
use std::collections::VecDeque;
use tokio::sync::{Mutex, Notify};

pub const QUEUE_CAPACITY: usize = 2000;

pub struct IsQueue {
    items: Mutex<VecDeque<QueueItem>>,
    notify: Notify,
}

impl IsQueue {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    /// Pushes `item`. Returns `false` (and the caller should count a drop)
    /// if the queue was already at [`QUEUE_CAPACITY`].
    pub async fn push(&self, item: QueueItem) -> bool {
        let mut items = self.items.lock().await;
        if items.len() >= QUEUE_CAPACITY {
            return false;
        }
        items.push_back(item);
        drop(items);
        self.notify.notify_one();
        true
    }

    /// Pops the next non-expired item, discarding any expired ones it
    /// encounters at the head along the way. Returns the count of expired
    /// items it dropped alongside the popped item (possibly `None`).
    pub async fn pop_ready(&self) -> (Option<QueueItem>, usize) {
        let mut items = self.items.lock().await;
        let now = Utc::now();
        let mut dropped = 0;
        while let Some(front) = items.front() {
            if front.expires_at <= now {
                items.pop_front();
                dropped += 1;
                continue;
            }
            return (items.pop_front(), dropped);
        }
        (None, dropped)
    }

    pub async fn wait_for_item(&self) {
        self.notify.notified().await;
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }
}

impl Default for IsQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item(expires_in: Duration) -> QueueItem {
        QueueItem {
            line: "test".to_string(),
            expires_at: Utc::now() + expires_in,
        }
    }

    #[tokio::test]
    async fn push_then_pop_round_trips() {
        let queue = IsQueue::new();
        queue.push(item(Duration::seconds(60))).await;
        let (popped, dropped) = queue.pop_ready().await;
        assert!(popped.is_some());
        assert_eq!(dropped, 0);
    }

    #[tokio::test]
    async fn push_is_rejected_once_full() {
        let queue = IsQueue::new();
        for _ in 0..QUEUE_CAPACITY {
            assert!(queue.push(item(Duration::seconds(60))).await);
        }
        assert!(!queue.push(item(Duration::seconds(60))).await);
    }

    #[tokio::test]
    async fn expired_head_items_are_dropped_before_returning_a_live_one() {
        let queue = IsQueue::new();
        queue.push(item(Duration::seconds(-1))).await;
        queue.push(item(Duration::seconds(-1))).await;
        queue.push(item(Duration::seconds(60))).await;
        let (popped, dropped) = queue.pop_ready().await;
        assert!(popped.is_some());
        assert_eq!(dropped, 2);
    }

    #[tokio::test]
    async fn empty_queue_pop_returns_none() {
        let queue = IsQueue::new();
        let (popped, dropped) = queue.pop_ready().await;
        assert!(popped.is_none());
        assert_eq!(dropped, 0);
    }
}
