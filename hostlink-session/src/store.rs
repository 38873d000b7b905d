// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The session store (C11, §4: "In-memory snapshots + change events used by
//! C5/C9"). Modeled as message-passing channels rather than the mutual
//! event-subscription ownership in the original design, per the redesign
//! note on cyclic references: C5 writes in, subscribers (the gateway, any
//! UI) read a snapshot and/or listen on a broadcast channel.

use crate::records::{MessageEntry, NodeInfoUpdate, PositionUpdate, TacticalEvent};
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::broadcast;

/// One fan-out notification. Cheap to clone -- each payload is itself
/// cheaply clonable -- since `broadcast` hands every subscriber its own
/// copy.
#[derive(Clone, Debug)]
pub enum StoreEvent {
    PositionUpdated(PositionUpdate),
    NodeInfoUpdated(NodeInfoUpdate),
    EventAdded(TacticalEvent),
    MessageUpdated(MessageEntry),
}

struct Snapshots {
    positions: HashMap<u32, PositionUpdate>,
    node_info: HashMap<u32, NodeInfoUpdate>,
    messages: HashMap<u32, MessageEntry>,
}

/// Holds the latest-known state per node plus a bounded fan-out channel.
/// Subscribers that fall behind the channel capacity miss intermediate
/// updates but can always recover current state via the snapshot getters.
pub struct SessionStore {
    snapshots: RwLock<Snapshots>,
    events: broadcast::Sender<StoreEvent>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (events, _rx) = broadcast::channel(1024);
        Self {
            snapshots: RwLock::new(Snapshots {
                positions: HashMap::new(),
                node_info: HashMap::new(),
                messages: HashMap::new(),
            }),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn put_position(&self, update: PositionUpdate) {
        self.snapshots
            .write()
            .unwrap()
            .positions
            .insert(update.node_id, update.clone());
        let _ = self.events.send(StoreEvent::PositionUpdated(update));
    }

    pub fn put_node_info(&self, update: NodeInfoUpdate) {
        self.snapshots
            .write()
            .unwrap()
            .node_info
            .insert(update.node_id, update.clone());
        let _ = self.events.send(StoreEvent::NodeInfoUpdated(update));
    }

    pub fn put_event(&self, event: TacticalEvent) {
        let _ = self.events.send(StoreEvent::EventAdded(event));
    }

    pub fn put_message(&self, entry: MessageEntry) {
        self.snapshots
            .write()
            .unwrap()
            .messages
            .insert(entry.msg_id, entry.clone());
        let _ = self.events.send(StoreEvent::MessageUpdated(entry));
    }

    pub fn position(&self, node_id: u32) -> Option<PositionUpdate> {
        self.snapshots.read().unwrap().positions.get(&node_id).cloned()
    }

    pub fn node_info(&self, node_id: u32) -> Option<NodeInfoUpdate> {
        self.snapshots.read().unwrap().node_info.get(&node_id).cloned()
    }

    pub fn message(&self, msg_id: u32) -> Option<MessageEntry> {
        self.snapshots.read().unwrap().messages.get(&msg_id).cloned()
    }

    pub fn node_count(&self) -> usize {
        self.snapshots.read().unwrap().node_info.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{MessageStatus, PositionSource};
    use chrono::Utc;

    fn position(node_id: u32) -> PositionUpdate {
        PositionUpdate {
            node_id,
            lat_e7: 1,
            lon_e7: 2,
            alt_m: None,
            timestamp_utc: None,
            ground_speed_mps: None,
            ground_track_cdeg: None,
            source: PositionSource::Position,
            rx_meta: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn put_position_updates_snapshot_and_broadcasts() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();
        store.put_position(position(7));

        assert_eq!(store.position(7).unwrap().lat_e7, 1);
        match rx.recv().await.unwrap() {
            StoreEvent::PositionUpdated(p) => assert_eq!(p.node_id, 7),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn message_mutation_is_reflected_in_snapshot() {
        let store = SessionStore::new();
        let mut entry = MessageEntry::new(1, 0xFFFFFFFF, 0, "hi");
        store.put_message(entry.clone());
        entry.status = MessageStatus::Succeeded;
        store.put_message(entry);

        assert_eq!(store.message(1).unwrap().status, MessageStatus::Succeeded);
    }
}
