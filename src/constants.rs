//! `Bowerbird` Constants
//!
//! This module contains the limits and default values used throughout the
//! library. Every buffer and table in the crate is bounded by one of these
//! constants.

/// Size of the SDP PDU header in bytes (PDU id, transaction id, parameter length)
pub const PDU_HEADER_SIZE: usize = 5;

/// Maximum number of opaque continuation state bytes a server may return
pub const MAX_CONTINUATION_SIZE: usize = 16;

/// Capacity of a request PDU buffer in bytes
pub const SDP_PDU_CAPACITY: usize = 4096;

/// Capacity of the reassembled response payload in bytes
pub const SDP_RESPONSE_CAPACITY: usize = 8192;

/// Maximum number of UUIDs in a service search pattern
pub const MAX_SEARCH_UUIDS: usize = 12;

/// Maximum number of attribute ID ranges in an attribute request
pub const MAX_ATTRIBUTE_RANGES: usize = 256;

/// Maximum number of service record handles in a search response
pub const MAX_SERVICE_HANDLES: usize = 16;

/// Maximum number of commands waiting on a single socket queue
pub const MAX_PENDING_COMMANDS: usize = 4;

/// Maximum number of services tracked by one discovery run
pub const MAX_DISCOVERED_SERVICES: usize = 16;

/// Maximum number of attributes stored per service record
pub const MAX_SERVICE_ATTRIBUTES: usize = 32;

/// Maximum number of class, profile or protocol descriptors per service
pub const MAX_SERVICE_DESCRIPTORS: usize = 8;

/// Maximum byte length of an owned text or URL element
pub const MAX_TEXT_LENGTH: usize = 64;

/// Maximum encoded byte length of an owned sub-sequence element
pub const MAX_SEQUENCE_LENGTH: usize = 256;

/// Maximum size of a single inbound L2CAP frame
pub const MAX_FRAME_SIZE: usize = 1024;

/// Depth of the inbound frame channel between the reactor and the queue
pub const FRAME_QUEUE_DEPTH: usize = 4;

/// Capacity of an AVDTP signaling message buffer
pub const AVDTP_MESSAGE_CAPACITY: usize = 256;

/// Default per-command communication timeout in milliseconds
pub const COMMUNICATION_TIMEOUT_MS: u64 = 2000;

/// Default maximum number of service records requested by a search
pub const DEFAULT_MAX_SEARCH_RESULTS: u16 = 256;
