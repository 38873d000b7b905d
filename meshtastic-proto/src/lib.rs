// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Generated Meshtastic protobuf types (§9: "Protobuf dependency" -- treated
//! throughout the host core as an external collaborator). Decode failures
//! against this schema must never abort the AppData decode pipeline;
//! callers are expected to recover into an opaque event on error.

#![allow(clippy::all)]

include!(concat!(env!("OUT_DIR"), "/meshtastic.rs"));
