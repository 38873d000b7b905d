// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The HostLink frame codec (C1): byte-stream <-> framed messages, CRC
//! verification, and resynchronization on malformed input.

use crate::crc::crc16_ccitt_false;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use displaydoc::Display;

/// Frame magic bytes: ASCII `"HL"`.
pub const MAGIC: [u8; 2] = *b"HL";
/// The only protocol version this codec understands.
pub const VERSION: u8 = 1;
/// Maximum payload length, in bytes.
pub const MAX_PAYLOAD_LEN: usize = 512;
/// Fixed header length: magic(2) + version(1) + type(1) + seq(2) + len(2).
pub const HEADER_LEN: usize = 8;
/// Trailing CRC length.
pub const TRAILER_LEN: usize = 2;

/// A decoded HostLink frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: u8,
    pub seq: u16,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(frame_type: u8, seq: u16, payload: Bytes) -> Self {
        Self {
            frame_type,
            seq,
            payload,
        }
    }

    /// Encodes this frame to the wire representation, including trailing CRC.
    ///
    /// Allocation-friendly for the hot send path: writes directly into `out`
    /// rather than building and discarding intermediate buffers.
    pub fn encode_into(&self, out: &mut BytesMut) -> Result<(), FrameError> {
        if self.payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::LengthTooLarge {
                len: self.payload.len(),
            });
        }

        let start = out.len();
        out.put_slice(&MAGIC);
        out.put_u8(VERSION);
        out.put_u8(self.frame_type);
        out.put_u16_le(self.seq);
        out.put_u16_le(self.payload.len() as u16);
        out.put_slice(&self.payload);

        let crc = crc16_ccitt_false(&out[start..]);
        out.put_u16_le(crc);
        Ok(())
    }

    pub fn encode(&self) -> Result<BytesMut, FrameError> {
        let mut out = BytesMut::with_capacity(HEADER_LEN + self.payload.len() + TRAILER_LEN);
        self.encode_into(&mut out)?;
        Ok(out)
    }
}

/// Framing-level errors. These are always recoverable by resynchronization
/// (see [`FrameDecoder`]) and must never be treated as fatal to the
/// transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, thiserror::Error)]
pub enum FrameError {
    /// invalid start-of-frame (magic or version mismatch)
    InvalidSof,
    /// declared payload length {len} exceeds the maximum of {max}
    LengthTooLarge { len: usize, max: usize },
    /// CRC mismatch on an otherwise well-formed frame
    CrcMismatch,
}

impl FrameError {
    fn length_too_large(len: usize) -> Self {
        FrameError::LengthTooLarge {
            len,
            max: MAX_PAYLOAD_LEN,
        }
    }
}

/// The outcome of one resynchronization/decode attempt, surfaced so
/// inspector tooling can observe every frame boundary the codec finds, not
/// just the ones that decode cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFrameObservation {
    Ok,
    CrcMismatch,
}

/// A streaming decoder: bytes are appended as they arrive and frames are
/// extracted incrementally. Bytes that don't form a valid frame are
/// discarded one at a time so the decoder can resynchronize on the next
/// valid magic sequence, rather than losing the rest of the stream.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Appends newly-received bytes to the internal buffer.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Attempts to extract one frame from the buffer. Returns `None` when
    /// more bytes are needed before any decision (valid or error) can be
    /// made. Call repeatedly (in a loop) to drain every frame currently
    /// available in the buffer.
    pub fn poll(&mut self) -> Option<Result<(Frame, RawFrameObservation), FrameError>> {
        loop {
            if self.buffer.len() < 2 {
                return None;
            }

            if self.buffer[0..2] != MAGIC {
                self.buffer.advance(1);
                return Some(Err(FrameError::InvalidSof));
            }

            if self.buffer.len() < 3 {
                return None;
            }

            if self.buffer[2] != VERSION {
                self.buffer.advance(1);
                return Some(Err(FrameError::InvalidSof));
            }

            if self.buffer.len() < HEADER_LEN {
                return None;
            }

            let len = u16::from_le_bytes([self.buffer[6], self.buffer[7]]) as usize;
            if len > MAX_PAYLOAD_LEN {
                self.buffer.advance(1);
                return Some(Err(FrameError::length_too_large(len)));
            }

            let frame_len = HEADER_LEN + len + TRAILER_LEN;
            if self.buffer.len() < frame_len {
                return None;
            }

            let frame_bytes = self.buffer.split_to(frame_len).freeze();
            let frame_type = frame_bytes[3];
            let seq = u16::from_le_bytes([frame_bytes[4], frame_bytes[5]]);
            let payload = frame_bytes.slice(HEADER_LEN..HEADER_LEN + len);
            let expected_crc = crc16_ccitt_false(&frame_bytes[..HEADER_LEN + len]);
            let actual_crc = u16::from_le_bytes([
                frame_bytes[HEADER_LEN + len],
                frame_bytes[HEADER_LEN + len + 1],
            ]);

            if expected_crc != actual_crc {
                // Don't attempt to reinterpret these bytes: the whole
                // declared frame is consumed even though it was bad.
                return Some(Err(FrameError::CrcMismatch));
            }

            let frame = Frame::new(frame_type, seq, payload);
            return Some(Ok((frame, RawFrameObservation::Ok)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello_frame_bytes() -> Vec<u8> {
        // Matches the worked example in the spec's concrete scenarios:
        // Hello(seq=1) = 48 4C 01 01 01 00 00 00 3E 31
        vec![0x48, 0x4C, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x3E, 0x31]
    }

    #[test]
    fn encodes_hello_matching_spec_worked_example() {
        let frame = Frame::new(0x01, 1, Bytes::new());
        let encoded = frame.encode().unwrap();
        assert_eq!(encoded.as_ref(), hello_frame_bytes().as_slice());
    }

    #[test]
    fn round_trips_encode_decode() {
        let frame = Frame::new(0x10, 42, Bytes::from_static(b"hello world"));
        let encoded = frame.encode().unwrap();

        let mut decoder = FrameDecoder::new();
        decoder.extend(&encoded);
        let (decoded, observation) = decoder.poll().unwrap().unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(observation, RawFrameObservation::Ok);
        assert!(decoder.poll().is_none());
    }

    #[test]
    fn decodes_across_multiple_extend_calls() {
        let frame = Frame::new(0x02, 7, Bytes::from_static(b"chunked"));
        let encoded = frame.encode().unwrap();

        let mut decoder = FrameDecoder::new();
        assert!(decoder.poll().is_none());
        decoder.extend(&encoded[..5]);
        assert!(decoder.poll().is_none());
        decoder.extend(&encoded[5..]);
        let (decoded, _) = decoder.poll().unwrap().unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn resyncs_on_bad_magic() {
        let mut decoder = FrameDecoder::new();
        decoder.extend(&[0xAA, 0xBB]);
        decoder.extend(&hello_frame_bytes());

        assert_eq!(decoder.poll(), Some(Err(FrameError::InvalidSof)));
        assert_eq!(decoder.poll(), Some(Err(FrameError::InvalidSof)));
        let (frame, _) = decoder.poll().unwrap().unwrap();
        assert_eq!(frame.frame_type, 0x01);
    }

    #[test]
    fn resyncs_on_bad_version() {
        let mut bytes = hello_frame_bytes();
        bytes[2] = 0x02; // bad version byte
        let mut decoder = FrameDecoder::new();
        decoder.extend(&bytes);
        assert_eq!(decoder.poll(), Some(Err(FrameError::InvalidSof)));
    }

    #[test]
    fn rejects_length_too_large() {
        let mut bytes = hello_frame_bytes();
        bytes[6] = 0xFF;
        bytes[7] = 0xFF;
        let mut decoder = FrameDecoder::new();
        decoder.extend(&bytes);
        assert!(matches!(
            decoder.poll(),
            Some(Err(FrameError::LengthTooLarge { .. }))
        ));
    }

    #[test]
    fn reports_crc_mismatch_and_consumes_whole_frame() {
        let frame = Frame::new(0x03, 9, Bytes::from_static(b"x"));
        let mut encoded = frame.encode().unwrap();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF; // corrupt the CRC trailer

        let mut decoder = FrameDecoder::new();
        decoder.extend(&encoded);
        assert_eq!(decoder.poll(), Some(Err(FrameError::CrcMismatch)));
        // the whole declared frame was consumed, not reinterpreted
        assert!(decoder.poll().is_none());
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let huge = Bytes::from(vec![0u8; MAX_PAYLOAD_LEN + 1]);
        let frame = Frame::new(0x10, 1, huge);
        assert!(matches!(
            frame.encode(),
            Err(FrameError::LengthTooLarge { .. })
        ));
    }
}
