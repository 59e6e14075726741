//! SDP commands
//!
//! A [`Command`] pairs a request PDU with its response assembler and
//! carries both through the socket queue. The queue drives the exchange:
//! a response fragment with a continuation state silently re-finalizes
//! the request (same PDU type, same parameters, fresh transaction id)
//! and schedules a resend; a complete response or an error from the
//! peer finishes the command. Every command finishes exactly once with
//! a defined state and response status.

use super::pdu::{AttributeRange, Pdu};
use super::response::{FrameOutcome, Response};
use super::SdpError;
use crate::constants::DEFAULT_MAX_SEARCH_RESULTS;
use crate::queue::{CommandState, Exchange, FrameDisposition};
use crate::uuid::Uuid;

/// A single SDP request/response exchange.
#[derive(Debug)]
pub struct Command {
    request: Pdu,
    response: Response,
    state: CommandState,
}

impl Command {
    fn from_request(request: Pdu) -> Self {
        Self {
            request,
            response: Response::new(),
            state: CommandState::Pending,
        }
    }

    /// Search for services matching any of `uuids`, returning at most
    /// `max_results` record handles.
    ///
    /// # Errors
    /// Returns an error if the pattern is oversized or does not fit the
    /// request buffer
    pub fn service_search(uuids: &[Uuid], max_results: u16) -> Result<Self, SdpError> {
        Ok(Self::from_request(Pdu::service_search(uuids, max_results)?))
    }

    /// Search for services of a single class
    ///
    /// # Errors
    /// Returns an error if the request does not fit the buffer
    pub fn service_search_single(uuid: Uuid) -> Result<Self, SdpError> {
        Self::service_search(&[uuid], DEFAULT_MAX_SEARCH_RESULTS)
    }

    /// Request attributes of one service record by ID ranges
    ///
    /// # Errors
    /// Returns an error if the range list is oversized
    pub fn service_attribute(handle: u32, ranges: &[AttributeRange]) -> Result<Self, SdpError> {
        Ok(Self::from_request(Pdu::service_attribute(handle, ranges)?))
    }

    /// Request every attribute of one service record
    ///
    /// # Errors
    /// Returns an error if the request does not fit the buffer
    pub fn service_attribute_all(handle: u32) -> Result<Self, SdpError> {
        Self::service_attribute(handle, &[AttributeRange::ALL])
    }

    /// Request a single attribute of one service record
    ///
    /// # Errors
    /// Returns an error if the request does not fit the buffer
    pub fn service_attribute_single(handle: u32, id: u16) -> Result<Self, SdpError> {
        Self::service_attribute(handle, &[AttributeRange::single(id)])
    }

    /// Fused search plus attribute retrieval in one request
    ///
    /// # Errors
    /// Returns an error if either list is oversized
    pub fn service_search_attribute(
        uuids: &[Uuid],
        ranges: &[AttributeRange],
    ) -> Result<Self, SdpError> {
        Ok(Self::from_request(Pdu::service_search_attribute(
            uuids, ranges,
        )?))
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> CommandState {
        self.state
    }

    /// The request PDU
    #[must_use]
    pub const fn request(&self) -> &Pdu {
        &self.request
    }

    /// The assembled response
    #[must_use]
    pub const fn response(&self) -> &Response {
        &self.response
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
        match self
            .response
            .deserialize(self.request.transaction_id(), frame)
        {
            FrameOutcome::Ignored => FrameDisposition::Ignored,
            FrameOutcome::Continuation => {
                if self
                    .request
                    .finalize(self.response.continuation())
                    .is_err()
                {
                    self.state = CommandState::Failed;
                    return FrameDisposition::Complete;
                }
                FrameDisposition::Resend
            }
            FrameOutcome::Complete => {
                self.state = CommandState::Completed;
                FrameDisposition::Complete
            }
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
    use crate::sdp::{ErrorCode, PduId};
    use embassy_time::{Duration, Instant};
    use heapless::Vec;

    fn start() -> Instant {
        Instant::from_ticks(0)
    }

    fn wait() -> Duration {
        Duration::from_millis(100)
    }

    /// Build an attribute response frame for the given transaction.
    fn attribute_frame(tid: u16, chunk: &[u8], continuation: &[u8]) -> Vec<u8, 64> {
        let mut frame = Vec::new();
        frame.push(0x05).unwrap();
        frame.extend_from_slice(&tid.to_be_bytes()).unwrap();
        let param_length = (2 + chunk.len() + 1 + continuation.len()) as u16;
        frame.extend_from_slice(&param_length.to_be_bytes()).unwrap();
        frame
            .extend_from_slice(&(chunk.len() as u16).to_be_bytes())
            .unwrap();
        frame.extend_from_slice(chunk).unwrap();
        frame.push(continuation.len() as u8).unwrap();
        frame.extend_from_slice(continuation).unwrap();
        frame
    }

    #[test]
    fn test_search_completes_with_handles() {
        let mut queue: CommandQueue<Command, 4> = CommandQueue::new();
        let command = Command::service_search(&[Uuid::Uuid16(0x110B)], 256).unwrap();
        queue.execute(start(), wait(), command).unwrap();
        queue.poll_transmit().unwrap();

        let frame = [
            0x03, 0x00, 0x01, 0x00, 0x0C, 0x00, 0x02, 0x00, 0x02, 0x00, 0x01, 0x00, 0x03, 0x00,
            0x01, 0x00, 0x04, 0x00,
        ];
        let done = queue.handle_frame(&frame).unwrap();

        assert_eq!(done.command.state(), CommandState::Completed);
        assert_eq!(done.command.response().status(), ErrorCode::Success);
        assert_eq!(
            done.command.response().handles(),
            &[0x0001_0003, 0x0001_0004]
        );
    }

    #[test]
    fn test_continuation_resends_with_original_parameters() {
        let mut queue: CommandQueue<Command, 4> = CommandQueue::new();
        let command = Command::service_attribute_all(0x0001_0000).unwrap();
        queue.execute(start(), wait(), command).unwrap();

        let first_tx: Vec<u8, 64> = Vec::from_slice(queue.poll_transmit().unwrap()).unwrap();
        assert_eq!(first_tx[0], PduId::ServiceAttributeRequest as u8);
        assert_eq!(first_tx[1..3], [0x00, 0x01]);
        let original_params = &first_tx[5..first_tx.len() - 1];

        // The full attribute list split over three fragments.
        let payload = [
            0x35, 0x08, 0x09, 0x00, 0x00, 0x0A, 0x00, 0x01, 0x00, 0x03,
        ];
        assert!(queue
            .handle_frame(&attribute_frame(1, &payload[..4], &[0xAA]))
            .is_none());

        let second_tx: Vec<u8, 64> = Vec::from_slice(queue.poll_transmit().unwrap()).unwrap();
        assert_eq!(second_tx[0], PduId::ServiceAttributeRequest as u8);
        assert_eq!(second_tx[1..3], [0x00, 0x02]);
        assert_eq!(&second_tx[5..second_tx.len() - 2], original_params);
        assert_eq!(&second_tx[second_tx.len() - 2..], &[0x01, 0xAA]);

        assert!(queue
            .handle_frame(&attribute_frame(2, &payload[4..7], &[0xBB]))
            .is_none());

        let third_tx: Vec<u8, 64> = Vec::from_slice(queue.poll_transmit().unwrap()).unwrap();
        assert_eq!(third_tx[1..3], [0x00, 0x03]);
        assert_eq!(&third_tx[third_tx.len() - 2..], &[0x01, 0xBB]);

        let done = queue
            .handle_frame(&attribute_frame(3, &payload[7..], &[]))
            .unwrap();
        assert_eq!(done.command.state(), CommandState::Completed);
        assert_eq!(done.command.response().status(), ErrorCode::Success);
        assert_eq!(done.command.response().payload(), &payload);

        let (id, value) = done
            .command
            .response()
            .attributes()
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(id, 0x0000);
        assert_eq!(value, crate::sdp::DataElement::Uint32(0x0001_0003));
    }

    #[test]
    fn test_transaction_mismatch_keeps_waiting() {
        let mut queue: CommandQueue<Command, 4> = CommandQueue::new();
        let command = Command::service_search(&[Uuid::Uuid16(0x110B)], 16).unwrap();
        queue.execute(start(), wait(), command).unwrap();
        queue.poll_transmit().unwrap();

        // Wrong transaction id: dropped, command still pending.
        let stray = [
            0x03, 0x00, 0x07, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        assert!(queue.handle_frame(&stray).is_none());
        assert_eq!(queue.len(), 1);

        // Matching frame completes normally afterwards.
        let frame = [
            0x03, 0x00, 0x01, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        let done = queue.handle_frame(&frame).unwrap();
        assert_eq!(done.command.state(), CommandState::Completed);
    }

    #[test]
    fn test_error_response_completes_with_status() {
        let mut queue: CommandQueue<Command, 4> = CommandQueue::new();
        let command = Command::service_attribute_all(0xDEAD_0000).unwrap();
        queue.execute(start(), wait(), command).unwrap();
        queue.poll_transmit().unwrap();

        let frame = [0x01, 0x00, 0x01, 0x00, 0x02, 0x00, 0x02];
        let done = queue.handle_frame(&frame).unwrap();

        assert_eq!(done.command.state(), CommandState::Completed);
        assert_eq!(
            done.command.response().status(),
            ErrorCode::InvalidServiceRecordHandle
        );
    }

    #[test]
    fn test_truncated_response_fails_once() {
        let mut queue: CommandQueue<Command, 4> = CommandQueue::new();
        let command = Command::service_attribute_all(0x0001_0000).unwrap();
        queue.execute(start(), wait(), command).unwrap();
        queue.poll_transmit().unwrap();

        // Claims 64 bytes, delivers 40.
        let mut frame: Vec<u8, 64> = Vec::new();
        frame
            .extend_from_slice(&[0x05, 0x00, 0x01, 0x00, 0x43, 0x00, 0x40])
            .unwrap();
        frame.extend_from_slice(&[0u8; 40]).unwrap();

        let done = queue.handle_frame(&frame).unwrap();
        assert_eq!(done.command.state(), CommandState::Completed);
        assert_eq!(
            done.command.response().status(),
            ErrorCode::DeserializationFailed
        );
        assert!(queue.is_empty());
    }
}
