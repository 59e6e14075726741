//! AVDTP signaling commands
//!
//! Builds signaling requests (Discover, GetCapabilities,
//! SetConfiguration, Open, Start) and parses the matching responses.
//! Transaction labels are 4-bit values cycling 1..=15 per channel, 0 is
//! skipped; a response whose label does not match the outstanding
//! request is dropped and the command keeps waiting, mirroring the SDP
//! transaction-id contract.

use heapless::Vec;

use super::{
    AvdtpError, MediaType, MessageType, PacketType, SignalId, SignalStatus, StreamEndpointKind,
};
use crate::constants::AVDTP_MESSAGE_CAPACITY;
use crate::queue::{CommandState, Exchange, FrameDisposition};

/// A signaling request under construction.
#[derive(Debug)]
pub struct Request {
    message: Vec<u8, AVDTP_MESSAGE_CAPACITY>,
    label: u8,
}

impl Request {
    /// Create an empty request; the label counter starts before 1
    #[must_use]
    pub const fn new() -> Self {
        Self {
            message: Vec::new(),
            label: 0,
        }
    }

    /// The transaction label of the current request
    #[must_use]
    pub const fn label(&self) -> u8 {
        self.label
    }

    /// Whether a request has been built
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.message.is_empty()
    }

    /// The request frame bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.message
    }

    /// Build a Discover request
    ///
    /// # Errors
    /// Returns `BufferTooSmall` if the message does not fit
    pub fn discover(&mut self) -> Result<(), AvdtpError> {
        self.begin(SignalId::Discover)
    }

    /// Build a GetCapabilities request for one endpoint
    ///
    /// # Errors
    /// Returns `BufferTooSmall` if the message does not fit
    pub fn get_capabilities(&mut self, seid: u8) -> Result<(), AvdtpError> {
        self.begin(SignalId::GetCapabilities)?;
        self.push(seid << 2)
    }

    /// Build a GetAllCapabilities request for one endpoint
    ///
    /// # Errors
    /// Returns `BufferTooSmall` if the message does not fit
    pub fn get_all_capabilities(&mut self, seid: u8) -> Result<(), AvdtpError> {
        self.begin(SignalId::GetAllCapabilities)?;
        self.push(seid << 2)
    }

    /// Build a SetConfiguration request with raw capability entries
    ///
    /// # Errors
    /// Returns `BufferTooSmall` if the message does not fit
    pub fn set_configuration(
        &mut self,
        acp_seid: u8,
        int_seid: u8,
        capabilities: &[u8],
    ) -> Result<(), AvdtpError> {
        self.begin(SignalId::SetConfiguration)?;
        self.push(acp_seid << 2)?;
        self.push(int_seid << 2)?;
        self.message
            .extend_from_slice(capabilities)
            .map_err(|()| AvdtpError::BufferTooSmall)
    }

    /// Build an Open request for one endpoint
    ///
    /// # Errors
    /// Returns `BufferTooSmall` if the message does not fit
    pub fn open(&mut self, seid: u8) -> Result<(), AvdtpError> {
        self.begin(SignalId::Open)?;
        self.push(seid << 2)
    }

    /// Build a Start request for one endpoint
    ///
    /// # Errors
    /// Returns `BufferTooSmall` if the message does not fit
    pub fn start(&mut self, seid: u8) -> Result<(), AvdtpError> {
        self.begin(SignalId::Start)?;
        self.push(seid << 2)
    }

    fn begin(&mut self, signal: SignalId) -> Result<(), AvdtpError> {
        self.message.clear();
        let label = self.next_label();
        self.push((label << 4) | ((PacketType::Single as u8) << 2) | MessageType::Command as u8)?;
        self.push(signal as u8 & 0x3F)
    }

    fn push(&mut self, byte: u8) -> Result<(), AvdtpError> {
        self.message.push(byte).map_err(|_| AvdtpError::BufferTooSmall)
    }

    fn next_label(&mut self) -> u8 {
        self.label = (self.label + 1) & 0x0F;
        if self.label == 0 {
            self.label = 1;
        }
        self.label
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

/// A parsed signaling response.
#[derive(Debug)]
pub struct Response {
    signal: Option<SignalId>,
    status: u8,
    payload: Vec<u8, AVDTP_MESSAGE_CAPACITY>,
}

impl Response {
    /// Create an empty response
    #[must_use]
    pub const fn new() -> Self {
        Self {
            signal: None,
            status: SignalStatus::Success as u8,
            payload: Vec::new(),
        }
    }

    /// Reset for a fresh exchange
    pub fn clear(&mut self) {
        self.signal = None;
        self.status = SignalStatus::Success as u8;
        self.payload.clear();
    }

    /// The signal the response answers, if one arrived
    #[must_use]
    pub const fn signal(&self) -> Option<SignalId> {
        self.signal
    }

    /// The decoded error status of a reject response
    #[must_use]
    pub const fn status(&self) -> Option<SignalStatus> {
        SignalStatus::from_u8(self.status)
    }

    /// Whether the peer accepted the request
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status == SignalStatus::Success as u8
    }

    /// The raw response payload after the signaling header
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Parse one inbound signaling frame. Returns `false` when the
    /// frame was dropped (undersized, a command, or a label mismatch).
    pub fn deserialize(&mut self, expected_label: u8, frame: &[u8]) -> bool {
        if frame.len() < 2 {
            #[cfg(feature = "defmt")]
            defmt::warn!("dropping undersized AVDTP frame ({} bytes)", frame.len());
            return false;
        }

        let label = frame[0] >> 4;
        let packet_type = PacketType::from_bits(frame[0] >> 2);
        let message_type = MessageType::from_bits(frame[0]);

        if label != expected_label {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "unexpected AVDTP label: {} while {} outstanding",
                label,
                expected_label
            );
            return false;
        }
        if message_type == MessageType::Command {
            return false;
        }

        let mut offset = 1;
        if packet_type == PacketType::Start {
            offset += 1;
        }
        if matches!(packet_type, PacketType::Start | PacketType::Single) {
            if frame.len() <= offset {
                return false;
            }
            self.signal = SignalId::from_u8(frame[offset] & 0x3F);
            offset += 1;
        }

        if message_type == MessageType::ResponseAccept {
            self.status = SignalStatus::Success as u8;
            self.payload.clear();
            if self
                .payload
                .extend_from_slice(&frame[offset..])
                .is_err()
            {
                #[cfg(feature = "defmt")]
                defmt::warn!("AVDTP response payload exceeds buffer; truncated frame dropped");
                return false;
            }
        } else {
            self.status = if frame.len() > offset {
                frame[offset]
            } else {
                SignalStatus::BadLength as u8
            };
        }
        true
    }

    /// Iterate the stream endpoint entries of a Discover response
    #[must_use]
    pub fn seps(&self) -> SepIter<'_> {
        SepIter {
            entries: self.payload.chunks_exact(2),
        }
    }

    /// Iterate the `{category, data}` entries of a capabilities response
    #[must_use]
    pub fn capabilities(&self) -> CapabilityIter<'_> {
        CapabilityIter {
            data: &self.payload,
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

/// One stream endpoint entry from a Discover response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SepInfo {
    /// Stream endpoint identifier
    pub seid: u8,
    /// Whether the endpoint is currently in use
    pub in_use: bool,
    /// The media type the endpoint carries
    pub media_type: Option<MediaType>,
    /// The endpoint's transport role
    pub kind: StreamEndpointKind,
}

/// Iterator over Discover response entries
pub struct SepIter<'a> {
    entries: core::slice::ChunksExact<'a, u8>,
}

impl Iterator for SepIter<'_> {
    type Item = SepInfo;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.next()?;
        Some(SepInfo {
            seid: entry[0] >> 2,
            in_use: entry[0] & 0x02 != 0,
            media_type: MediaType::from_u8(entry[1] >> 4),
            kind: if entry[1] & 0x08 != 0 {
                StreamEndpointKind::Sink
            } else {
                StreamEndpointKind::Source
            },
        })
    }
}

/// Iterator over capability entries of a GetCapabilities response
pub struct CapabilityIter<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for CapabilityIter<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < 2 {
            return None;
        }

        let category = self.data[0];
        let length = self.data[1] as usize;
        if self.data.len() < 2 + length {
            self.data = &[];
            return None;
        }

        let body = &self.data[2..2 + length];
        self.data = &self.data[2 + length..];
        Some((category, body))
    }
}

/// A single AVDTP signaling exchange, reusable across requests.
#[derive(Debug)]
pub struct Command {
    request: Request,
    response: Response,
    state: CommandState,
}

impl Command {
    /// Create a command with no request built yet
    #[must_use]
    pub const fn new() -> Self {
        Self {
            request: Request::new(),
            response: Response::new(),
            state: CommandState::Pending,
        }
    }

    /// Prepare a Discover exchange
    ///
    /// # Errors
    /// Returns `BufferTooSmall` if the message does not fit
    pub fn discover(&mut self) -> Result<(), AvdtpError> {
        self.reset();
        self.request.discover()
    }

    /// Prepare a GetCapabilities exchange
    ///
    /// # Errors
    /// Returns `BufferTooSmall` if the message does not fit
    pub fn get_capabilities(&mut self, seid: u8) -> Result<(), AvdtpError> {
        self.reset();
        self.request.get_capabilities(seid)
    }

    /// Prepare a GetAllCapabilities exchange
    ///
    /// # Errors
    /// Returns `BufferTooSmall` if the message does not fit
    pub fn get_all_capabilities(&mut self, seid: u8) -> Result<(), AvdtpError> {
        self.reset();
        self.request.get_all_capabilities(seid)
    }

    /// Prepare a SetConfiguration exchange
    ///
    /// # Errors
    /// Returns `BufferTooSmall` if the message does not fit
    pub fn set_configuration(
        &mut self,
        acp_seid: u8,
        int_seid: u8,
        capabilities: &[u8],
    ) -> Result<(), AvdtpError> {
        self.reset();
        self.request.set_configuration(acp_seid, int_seid, capabilities)
    }

    /// Prepare an Open exchange
    ///
    /// # Errors
    /// Returns `BufferTooSmall` if the message does not fit
    pub fn open(&mut self, seid: u8) -> Result<(), AvdtpError> {
        self.reset();
        self.request.open(seid)
    }

    /// Prepare a Start exchange
    ///
    /// # Errors
    /// Returns `BufferTooSmall` if the message does not fit
    pub fn start(&mut self, seid: u8) -> Result<(), AvdtpError> {
        self.reset();
        self.request.start(seid)
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> CommandState {
        self.state
    }

    /// The request being sent
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// The parsed response
    #[must_use]
    pub const fn response(&self) -> &Response {
        &self.response
    }

    fn reset(&mut self) {
        self.response.clear();
        self.state = CommandState::Pending;
    }
}

impl Default for Command {
    fn default() -> Self {
        Self::new()
    }
}

impl Exchange for Command {
    fn is_valid(&self) -> bool {
        self.request.is_valid()
    }

    fn transmit(&mut self) -> &[u8] {
        self.request.as_bytes()
    }

    fn handle_frame(&mut self, frame: &[u8]) -> FrameDisposition {
        if self.response.deserialize(self.request.label(), frame) {
            self.state = CommandState::Completed;
            FrameDisposition::Complete
        } else {
            FrameDisposition::Ignored
        }
    }

    fn expire(&mut self) {
        self.state = CommandState::TimedOut;
    }

    fn abort(&mut self) {
        self.state = CommandState::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::CommandQueue;
    use embassy_time::{Duration, Instant};

    fn start_time() -> Instant {
        Instant::from_ticks(0)
    }

    #[test]
    fn test_discover_request_layout() {
        let mut request = Request::new();
        request.discover().unwrap();

        // Label 1, single packet, command; then the signal id.
        assert_eq!(request.as_bytes(), &[0x10, 0x01]);
        assert_eq!(request.label(), 1);
        assert!(request.is_valid());
    }

    #[test]
    fn test_get_capabilities_request_layout() {
        let mut request = Request::new();
        request.get_capabilities(0x04).unwrap();

        assert_eq!(request.as_bytes(), &[0x10, 0x02, 0x10]);
    }

    #[test]
    fn test_label_cycles_skipping_zero() {
        let mut request = Request::new();

        for expected in 1..=15 {
            request.discover().unwrap();
            assert_eq!(request.label(), expected);
        }

        // After 15 the label wraps to 1, never 0.
        request.discover().unwrap();
        assert_eq!(request.label(), 1);
    }

    #[test]
    fn test_accept_response_payload() {
        let mut command = Command::new();
        command.discover().unwrap();

        // Accept for label 1 with two SEP entries.
        let frame = [0x12, 0x01, 0x04, 0x08, 0x0A, 0x00];
        assert_eq!(command.handle_frame(&frame), FrameDisposition::Complete);
        assert_eq!(command.state(), CommandState::Completed);
        assert!(command.response().is_success());
        assert_eq!(command.response().signal(), Some(SignalId::Discover));

        let mut seps = command.response().seps();
        let first = seps.next().unwrap();
        assert_eq!(first.seid, 1);
        assert!(!first.in_use);
        assert_eq!(first.media_type, Some(MediaType::Audio));
        assert_eq!(first.kind, StreamEndpointKind::Sink);

        let second = seps.next().unwrap();
        assert_eq!(second.seid, 2);
        assert!(second.in_use);
        assert_eq!(second.kind, StreamEndpointKind::Source);
        assert!(seps.next().is_none());
    }

    #[test]
    fn test_reject_response_status() {
        let mut command = Command::new();
        command.get_capabilities(0x07).unwrap();

        // Reject for label 1 with BAD_ACP_SEID.
        let frame = [0x13, 0x02, 0x12];
        assert_eq!(command.handle_frame(&frame), FrameDisposition::Complete);
        assert!(!command.response().is_success());
        assert_eq!(command.response().status(), Some(SignalStatus::BadAcpSeid));
    }

    #[test]
    fn test_label_mismatch_is_dropped() {
        let mut command = Command::new();
        command.discover().unwrap();

        // Label 7 while label 1 is outstanding.
        let stray = [0x72, 0x01];
        assert_eq!(command.handle_frame(&stray), FrameDisposition::Ignored);
        assert_eq!(command.state(), CommandState::Pending);

        let frame = [0x12, 0x01];
        assert_eq!(command.handle_frame(&frame), FrameDisposition::Complete);
    }

    #[test]
    fn test_capability_entries() {
        let mut command = Command::new();
        command.get_capabilities(0x01).unwrap();

        // Media transport (empty) and media codec (4 bytes).
        let frame = [0x12, 0x02, 0x01, 0x00, 0x07, 0x04, 0x00, 0x00, 0xFF, 0xFF];
        assert_eq!(command.handle_frame(&frame), FrameDisposition::Complete);

        let mut capabilities = command.response().capabilities();
        assert_eq!(capabilities.next(), Some((0x01, &[][..])));
        assert_eq!(
            capabilities.next(),
            Some((0x07, &[0x00, 0x00, 0xFF, 0xFF][..]))
        );
        assert!(capabilities.next().is_none());
    }

    #[test]
    fn test_shared_queue_mechanics() {
        let mut queue: CommandQueue<Command, 4> = CommandQueue::new();
        let mut command = Command::new();
        command.discover().unwrap();

        queue
            .execute(start_time(), Duration::from_millis(100), command)
            .unwrap();
        assert_eq!(queue.poll_transmit(), Some([0x10, 0x01].as_slice()));

        let done = queue.handle_frame(&[0x12, 0x01]).unwrap();
        assert_eq!(done.command.state(), CommandState::Completed);
        assert!(queue.is_empty());
    }
}
