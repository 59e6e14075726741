//! Service Discovery Protocol (SDP) client
//!
//! This module implements the client side of the Bluetooth Service
//! Discovery Protocol over an L2CAP sequenced-packet channel: locating
//! service records on a remote device and retrieving their attributes.
//!
//! ## Architecture
//!
//! The implementation is organized into specialized modules:
//!
//! - `element`: the Data Element binary codec used in SDP payloads
//! - `pdu`: PDU framing, transaction IDs and request builders
//! - `response`: multi-frame response reassembly and typed decoding
//! - `command`: request/response pairing and command lifecycle
//! - `service`: service records, class registry and descriptors
//! - `profile`: the ServiceSearch → ServiceAttribute discovery driver
//!
//! All operations use transaction IDs for request/response correlation
//! and continuation states to reassemble responses that span several
//! PDUs. At most one command is in flight per socket; the shared queue
//! in [`crate::queue`] enforces that ordering.

/// SDP Protocol Service Multiplexer (PSM) for L2CAP
pub const SDP_PSM: u16 = 0x0001;

/// Transaction ID pairing an SDP request with its response
pub type TransactionId = u16;

/// Service record handle, unique on the remote device
pub type ServiceRecordHandle = u32;

pub mod command;
pub mod element;
pub mod pdu;
pub mod profile;
pub mod response;
pub mod service;

pub use command::Command;
pub use element::{CodecError, DataElement, ElementReader, ElementSeq, ElementType, ElementWriter};
pub use pdu::{AttributeRange, Pdu};
pub use profile::{DiscoveryStatus, ProfileStep, SdpProfile};
pub use response::Response;
pub use service::{AttributeId, ClassId, ProfileDescriptor, ProtocolDescriptor, Service};

/// SDP Protocol Data Unit IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PduId {
    /// Invalid/unset PDU ID
    Invalid = 0x00,
    /// Error Response
    ErrorResponse = 0x01,
    /// Service Search Request
    ServiceSearchRequest = 0x02,
    /// Service Search Response
    ServiceSearchResponse = 0x03,
    /// Service Attribute Request
    ServiceAttributeRequest = 0x04,
    /// Service Attribute Response
    ServiceAttributeResponse = 0x05,
    /// Service Search Attribute Request
    ServiceSearchAttributeRequest = 0x06,
    /// Service Search Attribute Response
    ServiceSearchAttributeResponse = 0x07,
}

impl PduId {
    /// Convert from raw byte value
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::ErrorResponse),
            0x02 => Some(Self::ServiceSearchRequest),
            0x03 => Some(Self::ServiceSearchResponse),
            0x04 => Some(Self::ServiceAttributeRequest),
            0x05 => Some(Self::ServiceAttributeResponse),
            0x06 => Some(Self::ServiceSearchAttributeRequest),
            0x07 => Some(Self::ServiceSearchAttributeResponse),
            _ => None,
        }
    }
}

/// SDP response status codes
///
/// Values 1..=6 are the error codes a peer returns in an `ErrorResponse`
/// PDU. The remaining variants are synthesized locally and never appear
/// on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    /// Request completed successfully
    Success,
    /// Invalid/unsupported SDP version
    UnsupportedSdpVersion,
    /// Invalid service record handle
    InvalidServiceRecordHandle,
    /// Invalid request syntax
    InvalidRequestSyntax,
    /// Invalid PDU size
    InvalidPduSize,
    /// Invalid continuation state
    InvalidContinuationState,
    /// Insufficient resources to satisfy the request
    InsufficientResources,
    /// Reserved/unknown error code
    Reserved,
    /// Local: the response could not be deserialized
    DeserializationFailed,
    /// Local: the response is paginated and a continuation is pending
    PacketContinuation,
}

impl ErrorCode {
    /// Map a wire error code from an `ErrorResponse` PDU
    #[must_use]
    pub const fn from_u16(value: u16) -> Self {
        match value {
            0x0000 => Self::Success,
            0x0001 => Self::UnsupportedSdpVersion,
            0x0002 => Self::InvalidServiceRecordHandle,
            0x0003 => Self::InvalidRequestSyntax,
            0x0004 => Self::InvalidPduSize,
            0x0005 => Self::InvalidContinuationState,
            0x0006 => Self::InsufficientResources,
            _ => Self::Reserved,
        }
    }
}

/// SDP error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SdpError {
    /// Buffer too small for the operation
    BufferTooSmall,
    /// Too many UUIDs in a search pattern
    TooManyUuids,
    /// Too many attribute ID ranges in a request
    TooManyRanges,
    /// Invalid protocol data received
    InvalidProtocolData,
    /// Protocol error reported by the remote device
    ProtocolError(ErrorCode),
}

impl From<ErrorCode> for SdpError {
    fn from(code: ErrorCode) -> Self {
        Self::ProtocolError(code)
    }
}

impl From<CodecError> for SdpError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::Overflow => Self::BufferTooSmall,
            _ => Self::InvalidProtocolData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdu_id_conversion() {
        assert_eq!(PduId::from_u8(0x03), Some(PduId::ServiceSearchResponse));
        assert_eq!(
            PduId::from_u8(0x07),
            Some(PduId::ServiceSearchAttributeResponse)
        );
        assert_eq!(PduId::from_u8(0x00), None);
        assert_eq!(PduId::from_u8(0x08), None);
    }

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(ErrorCode::from_u16(0x0000), ErrorCode::Success);
        assert_eq!(ErrorCode::from_u16(0x0004), ErrorCode::InvalidPduSize);
        assert_eq!(ErrorCode::from_u16(0x0042), ErrorCode::Reserved);
    }

    #[test]
    fn test_error_conversion() {
        let error: SdpError = ErrorCode::InsufficientResources.into();
        assert_eq!(
            error,
            SdpError::ProtocolError(ErrorCode::InsufficientResources)
        );

        assert_eq!(
            SdpError::from(CodecError::Overflow),
            SdpError::BufferTooSmall
        );
        assert_eq!(
            SdpError::from(CodecError::Truncated),
            SdpError::InvalidProtocolData
        );
    }
}
