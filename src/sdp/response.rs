//! SDP response assembly
//!
//! A single SDP response may arrive split over several PDUs, each
//! carrying an opaque continuation state that must be echoed back in
//! the follow-up request. [`Response`] collates those fragments into
//! one growing payload, validates transaction correlation, and decodes
//! the finished payload into typed results: record handles for a
//! service search, an attribute list for the attribute requests.

use heapless::Vec;

use super::element::{DataElement, ElementReader};
use super::{CodecError, ElementType, ErrorCode, PduId};
use crate::constants::{
    MAX_CONTINUATION_SIZE, MAX_SERVICE_HANDLES, PDU_HEADER_SIZE, SDP_RESPONSE_CAPACITY,
};

/// What a single inbound frame did to the response being assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameOutcome {
    /// The response is complete (successfully or with an error status)
    Complete,
    /// The peer returned a continuation state; the request must be
    /// re-finalized with it and resent
    Continuation,
    /// The frame did not belong to this exchange and was dropped
    Ignored,
}

/// A reassembled SDP response.
#[derive(Debug)]
pub struct Response {
    kind: PduId,
    status: ErrorCode,
    total_count: u16,
    payload: Vec<u8, SDP_RESPONSE_CAPACITY>,
    continuation: Vec<u8, MAX_CONTINUATION_SIZE>,
    handles: Vec<u32, MAX_SERVICE_HANDLES>,
}

impl Response {
    /// Create an empty response
    #[must_use]
    pub const fn new() -> Self {
        Self {
            kind: PduId::Invalid,
            status: ErrorCode::Reserved,
            total_count: 0,
            payload: Vec::new(),
            continuation: Vec::new(),
            handles: Vec::new(),
        }
    }

    /// Reset the response for a fresh exchange
    pub fn clear(&mut self) {
        self.kind = PduId::Invalid;
        self.status = ErrorCode::Reserved;
        self.total_count = 0;
        self.payload.clear();
        self.continuation.clear();
        self.handles.clear();
    }

    /// The PDU type of the response, `Invalid` until a frame matched
    #[must_use]
    pub const fn kind(&self) -> PduId {
        self.kind
    }

    /// The response status
    #[must_use]
    pub const fn status(&self) -> ErrorCode {
        self.status
    }

    /// Total number of matching records reported by a search
    #[must_use]
    pub const fn total_count(&self) -> u16 {
        self.total_count
    }

    /// The record handles of a finished service search
    #[must_use]
    pub fn handles(&self) -> &[u32] {
        &self.handles
    }

    /// The reassembled raw payload
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The continuation state returned by the last frame
    #[must_use]
    pub fn continuation(&self) -> &[u8] {
        &self.continuation
    }

    /// Feed one inbound frame into the assembler.
    ///
    /// A frame whose transaction id does not match `expected_tid` is
    /// dropped without touching the response state; the command keeps
    /// waiting. A malformed frame with a matching transaction id
    /// completes the response with `DeserializationFailed`.
    pub fn deserialize(&mut self, expected_tid: u16, frame: &[u8]) -> FrameOutcome {
        if frame.len() < PDU_HEADER_SIZE {
            #[cfg(feature = "defmt")]
            defmt::warn!("dropping undersized SDP frame ({} bytes)", frame.len());
            return FrameOutcome::Ignored;
        }

        let kind_byte = frame[0];
        let transaction_id = u16::from_be_bytes([frame[1], frame[2]]);
        let param_length = u16::from_be_bytes([frame[3], frame[4]]) as usize;

        if transaction_id != expected_tid {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "out-of-order SDP frame: transaction {} while {} outstanding",
                transaction_id,
                expected_tid
            );
            return FrameOutcome::Ignored;
        }

        let Some(kind) = PduId::from_u8(kind_byte) else {
            self.status = ErrorCode::DeserializationFailed;
            return FrameOutcome::Complete;
        };
        self.kind = kind;

        if frame.len() < PDU_HEADER_SIZE + param_length {
            self.status = ErrorCode::DeserializationFailed;
            return FrameOutcome::Complete;
        }

        let params = ElementReader::new(&frame[PDU_HEADER_SIZE..]);
        let merged = match kind {
            PduId::ErrorResponse => {
                self.status = match params.pop_u16() {
                    Ok(code) => ErrorCode::from_u16(code),
                    Err(_) => ErrorCode::DeserializationFailed,
                };
                return FrameOutcome::Complete;
            }
            PduId::ServiceSearchResponse => self.merge_search(&params),
            PduId::ServiceAttributeResponse | PduId::ServiceSearchAttributeResponse => {
                self.merge_attributes(&params)
            }
            _ => Err(CodecError::UnexpectedType),
        };

        if merged.is_err() {
            self.status = ErrorCode::DeserializationFailed;
            return FrameOutcome::Complete;
        }

        if self.continuation.is_empty() {
            self.finish();
            FrameOutcome::Complete
        } else {
            self.status = ErrorCode::PacketContinuation;
            FrameOutcome::Continuation
        }
    }

    fn merge_search(&mut self, params: &ElementReader<'_>) -> Result<(), CodecError> {
        self.total_count = params.pop_u16()?;
        let current_count = params.pop_u16()?;

        let bytes = params.pop_bytes(current_count as usize * 4)?;
        self.payload
            .extend_from_slice(bytes)
            .map_err(|()| CodecError::Overflow)?;

        self.pop_continuation(params)
    }

    fn merge_attributes(&mut self, params: &ElementReader<'_>) -> Result<(), CodecError> {
        let byte_count = params.pop_u16()?;

        let bytes = params.pop_bytes(byte_count as usize)?;
        self.payload
            .extend_from_slice(bytes)
            .map_err(|()| CodecError::Overflow)?;

        self.pop_continuation(params)
    }

    fn pop_continuation(&mut self, params: &ElementReader<'_>) -> Result<(), CodecError> {
        let length = params.pop_u8()? as usize;
        if length > MAX_CONTINUATION_SIZE {
            return Err(CodecError::InvalidSize);
        }

        self.continuation.clear();
        self.continuation
            .extend_from_slice(params.pop_bytes(length)?)
            .map_err(|()| CodecError::Overflow)?;
        Ok(())
    }

    /// No continuation pending: interpret the assembled payload.
    fn finish(&mut self) {
        if self.kind == PduId::ServiceSearchResponse {
            self.handles.clear();
            for chunk in self.payload.chunks_exact(4) {
                let handle = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                if self.handles.push(handle).is_err() {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("search returned more handles than fit; extra dropped");
                    break;
                }
            }
        }
        self.status = ErrorCode::Success;
    }

    /// Iterate the `{attribute id, value}` pairs of a finished
    /// attribute response.
    ///
    /// # Errors
    /// Returns a codec error if the payload is not a top-level sequence
    pub fn attributes(&self) -> Result<AttributeIter<'_>, CodecError> {
        let reader = ElementReader::new(&self.payload);
        let list = reader.pop_sequence()?;
        Ok(AttributeIter { reader: list })
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the attribute list of a finished response.
///
/// Yields `(attribute_id, value)` pairs; the first malformed pair fuses
/// the iterator.
pub struct AttributeIter<'a> {
    reader: ElementReader<'a>,
}

impl AttributeIter<'_> {
    fn pop_pair(&mut self) -> Result<(u16, DataElement), CodecError> {
        let (element_type, size) = self.reader.pop_descriptor()?;
        if element_type != ElementType::Uint && element_type != ElementType::Int {
            return Err(CodecError::UnexpectedType);
        }
        if size != 2 {
            return Err(CodecError::InvalidSize);
        }

        let id = self.reader.pop_u16()?;
        let value = self.reader.pop_element()?;
        Ok((id, value))
    }
}

impl Iterator for AttributeIter<'_> {
    type Item = Result<(u16, DataElement), CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reader.available() == 0 {
            return None;
        }

        match self.pop_pair() {
            Ok(pair) => Some(Ok(pair)),
            Err(error) => {
                self.reader.pop_remaining();
                Some(Err(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdp::element::ElementWriter;
    use crate::uuid::Uuid;

    #[test]
    fn test_search_response_happy_path() {
        let mut response = Response::new();
        let frame = [
            0x03, 0x00, 0x01, 0x00, 0x0C, // header
            0x00, 0x02, // total count
            0x00, 0x02, // current count
            0x00, 0x01, 0x00, 0x03, // handle 1
            0x00, 0x01, 0x00, 0x04, // handle 2
            0x00, // no continuation
        ];

        assert_eq!(response.deserialize(1, &frame), FrameOutcome::Complete);
        assert_eq!(response.status(), ErrorCode::Success);
        assert_eq!(response.kind(), PduId::ServiceSearchResponse);
        assert_eq!(response.handles(), &[0x0001_0003, 0x0001_0004]);
        assert_eq!(response.total_count(), 2);
    }

    #[test]
    fn test_transaction_mismatch_is_dropped() {
        let mut response = Response::new();
        let frame = [
            0x03, 0x00, 0x07, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        assert_eq!(response.deserialize(1, &frame), FrameOutcome::Ignored);
        assert_eq!(response.kind(), PduId::Invalid);
        assert_eq!(response.status(), ErrorCode::Reserved);

        // The matching frame afterwards completes normally.
        let frame = [
            0x03, 0x00, 0x01, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        assert_eq!(response.deserialize(1, &frame), FrameOutcome::Complete);
        assert_eq!(response.status(), ErrorCode::Success);
    }

    #[test]
    fn test_error_response_status() {
        let mut response = Response::new();
        let frame = [0x01, 0x00, 0x01, 0x00, 0x02, 0x00, 0x04];

        assert_eq!(response.deserialize(1, &frame), FrameOutcome::Complete);
        assert_eq!(response.status(), ErrorCode::InvalidPduSize);
        assert_eq!(response.kind(), PduId::ErrorResponse);
    }

    #[test]
    fn test_continuation_is_stored() {
        let mut response = Response::new();
        let frame = [
            0x05, 0x00, 0x01, 0x00, 0x07, // header
            0x00, 0x02, // byte count
            0x35, 0x00, // partial payload
            0x02, 0xAA, 0xBB, // continuation state
        ];

        assert_eq!(response.deserialize(1, &frame), FrameOutcome::Continuation);
        assert_eq!(response.status(), ErrorCode::PacketContinuation);
        assert_eq!(response.continuation(), &[0xAA, 0xBB]);
        assert_eq!(response.payload(), &[0x35, 0x00]);
    }

    #[test]
    fn test_payload_reassembly_across_frames() {
        let mut response = Response::new();

        let first = [
            0x05, 0x00, 0x01, 0x00, 0x06, 0x00, 0x02, 0x11, 0x22, 0x01, 0xAA,
        ];
        let second = [
            0x05, 0x00, 0x02, 0x00, 0x06, 0x00, 0x02, 0x33, 0x44, 0x01, 0xBB,
        ];
        let last = [0x05, 0x00, 0x03, 0x00, 0x05, 0x00, 0x02, 0x55, 0x66, 0x00];

        assert_eq!(response.deserialize(1, &first), FrameOutcome::Continuation);
        assert_eq!(response.continuation(), &[0xAA]);
        assert_eq!(response.deserialize(2, &second), FrameOutcome::Continuation);
        assert_eq!(response.continuation(), &[0xBB]);
        assert_eq!(response.deserialize(3, &last), FrameOutcome::Complete);

        assert_eq!(response.payload(), &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
        assert_eq!(response.status(), ErrorCode::Success);
    }

    #[test]
    fn test_short_attribute_payload_fails() {
        let mut response = Response::new();
        // Claims 64 payload bytes but delivers 40.
        let mut frame: Vec<u8, 64> = Vec::new();
        frame
            .extend_from_slice(&[0x05, 0x00, 0x01, 0x00, 0x43, 0x00, 0x40])
            .unwrap();
        frame.extend_from_slice(&[0u8; 40]).unwrap();

        assert_eq!(response.deserialize(1, &frame), FrameOutcome::Complete);
        assert_eq!(response.status(), ErrorCode::DeserializationFailed);
    }

    #[test]
    fn test_attribute_list_decoding() {
        // Build an attribute response payload: a sequence of
        // {id, value} pairs.
        let mut body: Vec<u8, 64> = Vec::new();
        let mut writer = ElementWriter::new(&mut body);
        writer.put_u8(0x09).unwrap();
        writer.put_u16(0x0000).unwrap();
        writer.push_uint32(0x0001_0003).unwrap();
        writer.put_u8(0x09).unwrap();
        writer.put_u16(0x0001).unwrap();
        writer
            .push_uuid_sequence(&[Uuid::Uuid16(0x110B)])
            .unwrap();

        let mut payload: Vec<u8, 64> = Vec::new();
        let mut writer = ElementWriter::new(&mut payload);
        writer
            .push_descriptor(ElementType::Sequence, body.len())
            .unwrap();
        writer.put_bytes(&body).unwrap();

        let mut frame: Vec<u8, 96> = Vec::new();
        frame.extend_from_slice(&[0x05, 0x00, 0x01, 0x00, 0x00]).unwrap();
        frame
            .extend_from_slice(&(payload.len() as u16).to_be_bytes())
            .unwrap();
        frame.extend_from_slice(&payload).unwrap();
        frame.push(0x00).unwrap();
        let param_length = (payload.len() + 3) as u16;
        frame[3..5].copy_from_slice(&param_length.to_be_bytes());

        let mut response = Response::new();
        assert_eq!(response.deserialize(1, &frame), FrameOutcome::Complete);
        assert_eq!(response.status(), ErrorCode::Success);

        let mut attributes = response.attributes().unwrap();
        let (id, value) = attributes.next().unwrap().unwrap();
        assert_eq!(id, 0x0000);
        assert_eq!(value, DataElement::Uint32(0x0001_0003));

        let (id, value) = attributes.next().unwrap().unwrap();
        assert_eq!(id, 0x0001);
        match value {
            DataElement::Sequence(seq) => {
                assert_eq!(seq.reader().pop_uuid().unwrap(), Uuid::Uuid16(0x110B));
            }
            other => panic!("expected sequence, got {other:?}"),
        }

        assert!(attributes.next().is_none());
    }

    #[test]
    fn test_malformed_attribute_list_fuses() {
        let mut response = Response::new();
        // Top-level sequence whose first pair carries a bogus id
        // descriptor.
        let frame = [
            0x05, 0x00, 0x01, 0x00, 0x07, // header
            0x00, 0x04, // byte count
            0x35, 0x02, 0x28, 0x01, // SEQ { BOOL }
            0x00, // no continuation
        ];

        assert_eq!(response.deserialize(1, &frame), FrameOutcome::Complete);
        let mut attributes = response.attributes().unwrap();
        assert!(attributes.next().unwrap().is_err());
        assert!(attributes.next().is_none());
    }
}
