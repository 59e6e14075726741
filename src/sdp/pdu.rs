//! SDP PDU framing
//!
//! Every SDP message starts with a fixed 5-byte header (PDU id, a
//! big-endian transaction id, a big-endian parameter length) followed
//! by the parameters and a continuation state field: a length byte
//! plus up to 16 opaque bytes.
//!
//! A [`Pdu`] is constructed once with its parameters and finalized once
//! per (re)send: finalizing bumps the transaction id and rewrites the
//! continuation slot, so resending a paginated request reuses the same
//! PDU type and parameters with fresh correlation state.

use heapless::Vec;

use super::element::ElementWriter;
use super::{ElementType, PduId, SdpError};
use crate::constants::{
    MAX_ATTRIBUTE_RANGES, MAX_CONTINUATION_SIZE, MAX_SEARCH_UUIDS, PDU_HEADER_SIZE,
    SDP_PDU_CAPACITY,
};
use crate::uuid::Uuid;

/// Scratch capacity for building request parameters
const REQUEST_SCRATCH: usize = 2048;

/// Size of the reserved continuation slot (length byte + state bytes)
const CONTINUATION_SLOT: usize = 1 + MAX_CONTINUATION_SIZE;

/// Maximum attribute byte count advertised in attribute requests: the
/// response must fit the PDU's remaining capacity after the header and
/// the continuation slot.
#[allow(clippy::cast_possible_truncation)]
pub const MAX_ATTRIBUTE_BYTE_COUNT: u16 =
    (SDP_PDU_CAPACITY - PDU_HEADER_SIZE - CONTINUATION_SLOT) as u16;

/// An inclusive range of attribute IDs.
///
/// On the wire a range is a u32 with the low bound in the upper 16 bits
/// and the high bound in the lower 16 bits; a single ID `X` is encoded
/// as `X << 16 | X`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttributeRange {
    /// First attribute ID in the range (inclusive)
    pub start: u16,
    /// Last attribute ID in the range (inclusive)
    pub end: u16,
}

impl AttributeRange {
    /// The range covering every attribute ID
    pub const ALL: Self = Self {
        start: 0x0000,
        end: 0xFFFF,
    };

    /// Create a new attribute range
    #[must_use]
    pub const fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    /// A range matching exactly one attribute ID
    #[must_use]
    pub const fn single(id: u16) -> Self {
        Self { start: id, end: id }
    }

    /// Whether the range contains `id`
    #[must_use]
    pub const fn contains(&self, id: u16) -> bool {
        id >= self.start && id <= self.end
    }

    /// The u32 wire encoding of this range
    #[must_use]
    pub const fn to_id_range(self) -> u32 {
        ((self.start as u32) << 16) | self.end as u32
    }
}

/// An SDP request PDU with an owned buffer.
#[derive(Debug, Clone)]
pub struct Pdu {
    buffer: Vec<u8, SDP_PDU_CAPACITY>,
    continuation_offset: usize,
    transaction_id: u16,
    kind: PduId,
}

impl Pdu {
    /// Create an empty, invalid PDU
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            continuation_offset: PDU_HEADER_SIZE,
            transaction_id: 0,
            kind: PduId::Invalid,
        }
    }

    /// Build a `ServiceSearchRequest`: a sequence of up to 12 UUIDs and
    /// the maximum number of record handles to return.
    ///
    /// # Errors
    /// Returns `TooManyUuids` for oversized patterns and
    /// `BufferTooSmall` if the parameters do not fit
    pub fn service_search(uuids: &[Uuid], max_results: u16) -> Result<Self, SdpError> {
        if uuids.len() > MAX_SEARCH_UUIDS {
            return Err(SdpError::TooManyUuids);
        }

        let mut params: Vec<u8, REQUEST_SCRATCH> = Vec::new();
        let mut writer = ElementWriter::new(&mut params);
        writer.push_uuid_sequence(uuids)?;
        writer.put_u16(max_results)?;

        let mut pdu = Self::new();
        pdu.construct(PduId::ServiceSearchRequest, &params)?;
        Ok(pdu)
    }

    /// Build a `ServiceAttributeRequest` for one record handle and a
    /// list of attribute ID ranges.
    ///
    /// # Errors
    /// Returns `TooManyRanges` for oversized lists and `BufferTooSmall`
    /// if the parameters do not fit
    pub fn service_attribute(
        handle: u32,
        ranges: &[AttributeRange],
    ) -> Result<Self, SdpError> {
        if ranges.len() > MAX_ATTRIBUTE_RANGES {
            return Err(SdpError::TooManyRanges);
        }

        let mut params: Vec<u8, REQUEST_SCRATCH> = Vec::new();
        let mut writer = ElementWriter::new(&mut params);
        writer.put_u32(handle)?;
        writer.put_u16(MAX_ATTRIBUTE_BYTE_COUNT)?;
        push_range_sequence(&mut writer, ranges)?;

        let mut pdu = Self::new();
        pdu.construct(PduId::ServiceAttributeRequest, &params)?;
        Ok(pdu)
    }

    /// Build a `ServiceSearchAttributeRequest`: a UUID search pattern
    /// fused with an attribute ID range list.
    ///
    /// # Errors
    /// Returns `TooManyUuids`/`TooManyRanges` for oversized lists and
    /// `BufferTooSmall` if the parameters do not fit
    pub fn service_search_attribute(
        uuids: &[Uuid],
        ranges: &[AttributeRange],
    ) -> Result<Self, SdpError> {
        if uuids.len() > MAX_SEARCH_UUIDS {
            return Err(SdpError::TooManyUuids);
        }
        if ranges.len() > MAX_ATTRIBUTE_RANGES {
            return Err(SdpError::TooManyRanges);
        }

        let mut params: Vec<u8, REQUEST_SCRATCH> = Vec::new();
        let mut writer = ElementWriter::new(&mut params);
        writer.push_uuid_sequence(uuids)?;
        writer.put_u16(MAX_ATTRIBUTE_BYTE_COUNT)?;
        push_range_sequence(&mut writer, ranges)?;

        let mut pdu = Self::new();
        pdu.construct(PduId::ServiceSearchAttributeRequest, &params)?;
        Ok(pdu)
    }

    /// Frame `params` as a PDU of the given type and finalize with an
    /// empty continuation.
    ///
    /// # Errors
    /// Returns `BufferTooSmall` if the header, parameters and
    /// continuation slot exceed the buffer capacity
    pub fn construct(&mut self, kind: PduId, params: &[u8]) -> Result<(), SdpError> {
        if PDU_HEADER_SIZE + params.len() + CONTINUATION_SLOT > SDP_PDU_CAPACITY {
            return Err(SdpError::BufferTooSmall);
        }

        self.buffer.clear();
        self.buffer
            .resize(PDU_HEADER_SIZE, 0)
            .map_err(|()| SdpError::BufferTooSmall)?;
        self.buffer
            .extend_from_slice(params)
            .map_err(|()| SdpError::BufferTooSmall)?;

        self.kind = kind;
        self.transaction_id = 0;
        self.continuation_offset = PDU_HEADER_SIZE + params.len();
        self.finalize(&[])
    }

    /// Stamp the header for the next (re)send: bump the transaction id,
    /// rewrite the parameter length and replace the continuation state.
    ///
    /// The first finalize after [`construct`](Self::construct) yields
    /// transaction id 1; the counter wraps at 2^16, so 0 reappears on
    /// the wire only after a wrap.
    ///
    /// # Errors
    /// Returns `BufferTooSmall` if the continuation state exceeds 16
    /// bytes
    #[allow(clippy::cast_possible_truncation)]
    pub fn finalize(&mut self, continuation: &[u8]) -> Result<(), SdpError> {
        if continuation.len() > MAX_CONTINUATION_SIZE
            || self.buffer.len() < self.continuation_offset
        {
            return Err(SdpError::BufferTooSmall);
        }

        self.transaction_id = self.transaction_id.wrapping_add(1);

        let param_length = (self.continuation_offset - PDU_HEADER_SIZE) + 1 + continuation.len();
        self.buffer[0] = self.kind as u8;
        self.buffer[1..3].copy_from_slice(&self.transaction_id.to_be_bytes());
        self.buffer[3..5].copy_from_slice(&(param_length as u16).to_be_bytes());

        self.buffer.truncate(self.continuation_offset);
        self.buffer
            .push(continuation.len() as u8)
            .map_err(|_| SdpError::BufferTooSmall)?;
        self.buffer
            .extend_from_slice(continuation)
            .map_err(|()| SdpError::BufferTooSmall)?;
        Ok(())
    }

    /// Whether the PDU has been constructed with a known type and its
    /// buffer can hold the minimum frame
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.kind != PduId::Invalid && SDP_PDU_CAPACITY > PDU_HEADER_SIZE + CONTINUATION_SLOT
    }

    /// The PDU type
    #[must_use]
    pub const fn kind(&self) -> PduId {
        self.kind
    }

    /// The transaction id stamped by the last finalize
    #[must_use]
    pub const fn transaction_id(&self) -> u16 {
        self.transaction_id
    }

    /// Total frame length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the PDU holds no frame
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The complete frame bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// The parameter bytes between the header and the continuation slot
    #[must_use]
    pub fn parameters(&self) -> &[u8] {
        &self.buffer[PDU_HEADER_SIZE..self.continuation_offset]
    }
}

impl Default for Pdu {
    fn default() -> Self {
        Self::new()
    }
}

fn push_range_sequence<const N: usize>(
    writer: &mut ElementWriter<'_, N>,
    ranges: &[AttributeRange],
) -> Result<(), SdpError> {
    // Each range encodes as a descriptored u32 (5 bytes).
    writer.push_descriptor(ElementType::Sequence, ranges.len() * 5)?;
    for range in ranges {
        writer.push_uint32(range.to_id_range())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_range_encoding() {
        assert_eq!(AttributeRange::ALL.to_id_range(), 0x0000_FFFF);
        assert_eq!(AttributeRange::single(0x0004).to_id_range(), 0x0004_0004);
        assert_eq!(
            AttributeRange::new(0x0100, 0x01FF).to_id_range(),
            0x0100_01FF
        );

        let range = AttributeRange::new(0x0100, 0x01FF);
        assert!(range.contains(0x0150));
        assert!(!range.contains(0x0050));
    }

    #[test]
    fn test_service_search_wire_layout() {
        let pdu = Pdu::service_search(&[Uuid::Uuid16(0x110B)], 256).unwrap();

        assert_eq!(
            pdu.as_bytes(),
            &[
                0x02, // ServiceSearchRequest
                0x00, 0x01, // transaction id 1
                0x00, 0x08, // parameter length
                0x35, 0x03, 0x19, 0x11, 0x0B, // UUID sequence
                0x01, 0x00, // max results 256
                0x00, // empty continuation
            ]
        );
        assert!(pdu.is_valid());
        assert_eq!(pdu.kind(), PduId::ServiceSearchRequest);
    }

    #[test]
    fn test_service_attribute_wire_layout() {
        let pdu = Pdu::service_attribute(0x0001_0003, &[AttributeRange::ALL]).unwrap();

        let expected_count = MAX_ATTRIBUTE_BYTE_COUNT.to_be_bytes();
        assert_eq!(
            pdu.as_bytes(),
            &[
                0x04, // ServiceAttributeRequest
                0x00, 0x01, // transaction id 1
                0x00, 0x0E, // parameter length: 4 + 2 + 7 + 1
                0x00, 0x01, 0x00, 0x03, // service handle
                expected_count[0], expected_count[1], // max byte count
                0x35, 0x05, 0x0A, 0x00, 0x00, 0xFF, 0xFF, // range sequence
                0x00, // empty continuation
            ]
        );
    }

    #[test]
    fn test_finalize_increments_transaction_id() {
        let mut pdu = Pdu::service_search(&[Uuid::Uuid16(0x110A)], 16).unwrap();
        assert_eq!(pdu.transaction_id(), 1);

        pdu.finalize(&[0xAA]).unwrap();
        assert_eq!(pdu.transaction_id(), 2);
        assert_eq!(pdu.as_bytes()[1..3], [0x00, 0x02]);

        pdu.finalize(&[]).unwrap();
        assert_eq!(pdu.transaction_id(), 3);
    }

    #[test]
    fn test_transaction_id_wraps() {
        let mut pdu = Pdu::service_search(&[Uuid::Uuid16(0x110A)], 16).unwrap();

        // One finalize happened in construct; 0xFFFF more wrap to zero.
        for _ in 0..0xFFFF {
            pdu.finalize(&[]).unwrap();
        }
        assert_eq!(pdu.transaction_id(), 0);
        assert_eq!(pdu.as_bytes()[1..3], [0x00, 0x00]);
    }

    #[test]
    fn test_parameter_length_covers_continuation() {
        let mut pdu = Pdu::service_search(&[Uuid::Uuid16(0x110A)], 16).unwrap();
        let params = pdu.parameters().len();

        pdu.finalize(&[0xAA, 0xBB]).unwrap();
        let header_length = u16::from_be_bytes([pdu.as_bytes()[3], pdu.as_bytes()[4]]);
        assert_eq!(header_length as usize, params + 1 + 2);
        assert_eq!(pdu.len(), PDU_HEADER_SIZE + params + 1 + 2);
    }

    #[test]
    fn test_resend_preserves_parameters() {
        let mut pdu = Pdu::service_attribute(0x0001_0000, &[AttributeRange::ALL]).unwrap();
        let original: heapless::Vec<u8, 64> =
            heapless::Vec::from_slice(pdu.parameters()).unwrap();

        pdu.finalize(&[0xAA]).unwrap();
        assert_eq!(pdu.parameters(), original.as_slice());
        assert_eq!(pdu.kind(), PduId::ServiceAttributeRequest);
    }

    #[test]
    fn test_oversized_lists_are_rejected() {
        let uuids = [Uuid::Uuid16(0x1101); MAX_SEARCH_UUIDS + 1];
        assert_eq!(
            Pdu::service_search(&uuids, 16).unwrap_err(),
            SdpError::TooManyUuids
        );

        let ranges = [AttributeRange::ALL; MAX_ATTRIBUTE_RANGES + 1];
        assert_eq!(
            Pdu::service_attribute(1, &ranges).unwrap_err(),
            SdpError::TooManyRanges
        );
    }

    #[test]
    fn test_oversized_continuation_is_rejected() {
        let mut pdu = Pdu::service_search(&[Uuid::Uuid16(0x110A)], 16).unwrap();
        let state = [0u8; MAX_CONTINUATION_SIZE + 1];
        assert_eq!(pdu.finalize(&state).unwrap_err(), SdpError::BufferTooSmall);
    }
}
