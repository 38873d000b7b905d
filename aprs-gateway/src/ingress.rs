// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The ingress gate (§4.9): every candidate must carry complete RX
//! metadata and must not look like a loop (`from_is`, or `origin ==
//! External`).

use displaydoc::Display;
use hostlink_protocol::rx_meta::Origin;
use hostlink_protocol::RxMetadata;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum GateRejection {
    /// required RX metadata is missing or incomplete
    MissingMetadata,
    /// packet is suspected to be a re-injection loop
    LoopSuspect,
}

/// Runs the ingress gate over a candidate's RX metadata, returning the
/// metadata back to the caller on success.
pub fn check_ingress(rx_meta: &Option<RxMetadata>) -> Result<&RxMetadata, GateRejection> {
    let meta = rx_meta.as_ref().ok_or(GateRejection::MissingMetadata)?;
    if !meta.has_gateway_required_fields() {
        return Err(GateRejection::MissingMetadata);
    }
    if meta.from_is == Some(true) || meta.origin == Some(Origin::External) {
        return Err(GateRejection::LoopSuspect);
    }
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostlink_protocol::rx_meta::TimeSource;

    fn complete_meta() -> RxMetadata {
        RxMetadata {
            timestamp_utc: Some(1_700_000_000),
            timestamp_ms: None,
            time_source: Some(TimeSource::Gps),
            direct: Some(true),
            hop_count: Some(0),
            hop_limit: Some(3),
            origin: Some(Origin::Mesh),
            from_is: Some(false),
            rssi_dbm: Some(-97),
            snr_db: Some(8.0),
            freq_hz: None,
            bw_hz: None,
            sf: None,
            cr: None,
            packet_id: Some(42),
        }
    }

    #[test]
    fn complete_mesh_packet_passes() {
        assert!(check_ingress(&Some(complete_meta())).is_ok());
    }

    #[test]
    fn missing_metadata_is_rejected() {
        assert_eq!(check_ingress(&None), Err(GateRejection::MissingMetadata));
    }

    #[test]
    fn incomplete_metadata_is_rejected() {
        let mut meta = complete_meta();
        meta.packet_id = None;
        assert_eq!(
            check_ingress(&Some(meta)),
            Err(GateRejection::MissingMetadata)
        );
    }

    #[test]
    fn from_is_is_rejected_as_loop_suspect() {
        let mut meta = complete_meta();
        meta.from_is = Some(true);
        assert_eq!(check_ingress(&Some(meta)), Err(GateRejection::LoopSuspect));
    }

    #[test]
    fn external_origin_is_rejected_as_loop_suspect() {
        let mut meta = complete_meta();
        meta.origin = Some(Origin::External);
        assert_eq!(check_ingress(&Some(meta)), Err(GateRejection::LoopSuspect));
    }
}
