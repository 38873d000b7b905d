// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Session-level error types.

use displaydoc::Display;
use hostlink_protocol::AckCode;
use thiserror::Error;

/// Errors surfaced by the session client (C5).
#[derive(Debug, Display, Error)]
pub enum SessionError {
    /// transport I/O error: {0}
    Transport(#[source] std::io::Error),
    /// handshake timed out waiting for HelloAck
    HandshakeTimeout,
    /// command was rejected with ack code {0:?}
    Rejected(AckCode),
    /// command timed out after all retries were exhausted
    Timeout,
    /// connection is not in the Ready state
    NotReady,
    /// device does not advertise the required capability
    UnsupportedCapability,
    /// no compatible AppData wire variant was accepted by the device
    NoCompatibleVariant,
}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        Self::Transport(e)
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
