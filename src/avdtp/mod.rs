//! AVDTP signaling channel
//!
//! The Audio/Video Distribution Transport Protocol carries A2DP stream
//! setup over its own L2CAP channel. Its control messages share the
//! command-queue mechanics of the SDP channel (one request in flight,
//! response correlation, FIFO completion) but correlate by a 4-bit
//! transaction label instead of a 16-bit transaction id.
//!
//! Signaling header, byte 0: `label:4 | packet_type:2 | message_type:2`.
//! Start packets carry a total packet count in the following byte;
//! Start and Single packets carry the signal identifier after that.

pub mod command;

pub use command::{Command, Request, Response, SepInfo};

/// The L2CAP PSM AVDTP signaling listens on by default
pub const AVDTP_PSM: u16 = 0x0019;

/// AVDTP signal identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SignalId {
    /// Discover available stream endpoints
    Discover = 0x01,
    /// Get capabilities of a stream endpoint
    GetCapabilities = 0x02,
    /// Set configuration for a stream endpoint
    SetConfiguration = 0x03,
    /// Get current configuration
    GetConfiguration = 0x04,
    /// Reconfigure a stream endpoint
    Reconfigure = 0x05,
    /// Open a stream
    Open = 0x06,
    /// Start streaming
    Start = 0x07,
    /// Close a stream
    Close = 0x08,
    /// Suspend a stream
    Suspend = 0x09,
    /// Abort a stream
    Abort = 0x0A,
    /// Exchange content-protection data
    SecurityControl = 0x0B,
    /// Get all capabilities (AVDTP 1.3)
    GetAllCapabilities = 0x0C,
    /// Report sink-side rendering delay
    DelayReport = 0x0D,
}

impl SignalId {
    /// Convert from the low six bits of a signaling byte
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Discover),
            0x02 => Some(Self::GetCapabilities),
            0x03 => Some(Self::SetConfiguration),
            0x04 => Some(Self::GetConfiguration),
            0x05 => Some(Self::Reconfigure),
            0x06 => Some(Self::Open),
            0x07 => Some(Self::Start),
            0x08 => Some(Self::Close),
            0x09 => Some(Self::Suspend),
            0x0A => Some(Self::Abort),
            0x0B => Some(Self::SecurityControl),
            0x0C => Some(Self::GetAllCapabilities),
            0x0D => Some(Self::DelayReport),
            _ => None,
        }
    }
}

/// Packet type bits of the signaling header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PacketType {
    /// Complete message in one packet
    Single = 0x00,
    /// First fragment of a message
    Start = 0x01,
    /// Middle fragment
    Continue = 0x02,
    /// Last fragment
    End = 0x03,
}

impl PacketType {
    const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0x00 => Self::Single,
            0x01 => Self::Start,
            0x02 => Self::Continue,
            _ => Self::End,
        }
    }
}

/// Message type bits of the signaling header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MessageType {
    /// Command from the initiator
    Command = 0x00,
    /// General reject (unknown signal)
    GeneralReject = 0x01,
    /// Response accept
    ResponseAccept = 0x02,
    /// Response reject
    ResponseReject = 0x03,
}

impl MessageType {
    const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0x00 => Self::Command,
            0x01 => Self::GeneralReject,
            0x02 => Self::ResponseAccept,
            _ => Self::ResponseReject,
        }
    }
}

/// AVDTP signaling error codes carried in reject responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SignalStatus {
    /// No error
    Success = 0x00,
    /// Malformed signaling header
    BadHeaderFormat = 0x01,
    /// Invalid payload length
    BadLength = 0x11,
    /// Invalid ACP stream endpoint id
    BadAcpSeid = 0x12,
    /// Stream endpoint already in use
    SepInUse = 0x13,
    /// Stream endpoint not in use
    SepNotInUse = 0x14,
    /// Invalid service category
    BadServCategory = 0x17,
    /// Malformed payload
    BadPayloadFormat = 0x18,
    /// Signal not supported
    NotSupportedCommand = 0x19,
    /// Capabilities invalid
    InvalidCapabilities = 0x1A,
    /// Invalid recovery type
    BadRecoveryType = 0x22,
    /// Invalid media transport format
    BadMediaTransportFormat = 0x23,
    /// Invalid recovery format
    BadRecoveryFormat = 0x25,
    /// Invalid header-compression format
    BadRohcFormat = 0x26,
    /// Invalid content-protection format
    BadCpFormat = 0x27,
    /// Invalid multiplexing format
    BadMultiplexingFormat = 0x28,
    /// Configuration not supported
    UnsupportedConfiguration = 0x29,
    /// Message out of sequence for the stream state
    BadState = 0x31,
}

impl SignalStatus {
    /// Convert from a raw error byte
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Success),
            0x01 => Some(Self::BadHeaderFormat),
            0x11 => Some(Self::BadLength),
            0x12 => Some(Self::BadAcpSeid),
            0x13 => Some(Self::SepInUse),
            0x14 => Some(Self::SepNotInUse),
            0x17 => Some(Self::BadServCategory),
            0x18 => Some(Self::BadPayloadFormat),
            0x19 => Some(Self::NotSupportedCommand),
            0x1A => Some(Self::InvalidCapabilities),
            0x22 => Some(Self::BadRecoveryType),
            0x23 => Some(Self::BadMediaTransportFormat),
            0x25 => Some(Self::BadRecoveryFormat),
            0x26 => Some(Self::BadRohcFormat),
            0x27 => Some(Self::BadCpFormat),
            0x28 => Some(Self::BadMultiplexingFormat),
            0x29 => Some(Self::UnsupportedConfiguration),
            0x31 => Some(Self::BadState),
            _ => None,
        }
    }
}

/// Media types a stream endpoint can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MediaType {
    /// Audio media
    Audio = 0x00,
    /// Video media
    Video = 0x01,
    /// Multimedia media
    Multimedia = 0x02,
}

impl MediaType {
    /// Convert from the media-type nibble of a SEP entry
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Audio),
            0x01 => Some(Self::Video),
            0x02 => Some(Self::Multimedia),
            _ => None,
        }
    }
}

/// The transport role of a stream endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamEndpointKind {
    /// The endpoint emits media
    Source,
    /// The endpoint consumes media
    Sink,
}

/// AVDTP request building errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AvdtpError {
    /// The message buffer cannot hold the request
    BufferTooSmall,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_id_conversion() {
        assert_eq!(SignalId::from_u8(0x01), Some(SignalId::Discover));
        assert_eq!(SignalId::from_u8(0x0D), Some(SignalId::DelayReport));
        assert_eq!(SignalId::from_u8(0x00), None);
        assert_eq!(SignalId::from_u8(0x0E), None);
    }

    #[test]
    fn test_header_bit_decoding() {
        assert_eq!(PacketType::from_bits(0x01), PacketType::Start);
        assert_eq!(MessageType::from_bits(0x02), MessageType::ResponseAccept);
        assert_eq!(MessageType::from_bits(0x03), MessageType::ResponseReject);
    }

    #[test]
    fn test_signal_status_conversion() {
        assert_eq!(SignalStatus::from_u8(0x00), Some(SignalStatus::Success));
        assert_eq!(SignalStatus::from_u8(0x12), Some(SignalStatus::BadAcpSeid));
        assert_eq!(SignalStatus::from_u8(0x31), Some(SignalStatus::BadState));
        assert_eq!(SignalStatus::from_u8(0x7F), None);
    }
}
