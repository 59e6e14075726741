//! L2CAP command queue
//!
//! A request/response exchange on an L2CAP sequenced-packet channel is
//! strictly one-in-flight: the head of the queue is the only command
//! whose bytes go out on the socket, and the next entry is armed only
//! after the head completes. The SDP and AVDTP control channels share
//! these mechanics, so the queue is generic over the [`Exchange`]
//! carried in its entries.
//!
//! The queue itself is a synchronous state machine: the reactor layer
//! ([`crate::engine`]) feeds it inbound frames and the current time and
//! forwards its transmit payloads to the socket. Completed exchanges
//! are handed back by value; the queue never retains references into a
//! finished command.

use embassy_time::{Duration, Instant};
use heapless::Vec;

/// Lifecycle state of a queued command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandState {
    /// Waiting to be sent or for a matching response
    Pending,
    /// Response received, status recorded
    Completed,
    /// Submission rejected or the transport failed
    Failed,
    /// Deadline elapsed before a matching response arrived
    TimedOut,
}

/// What an exchange did with one inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameDisposition {
    /// The exchange finished; pop it and arm the next entry
    Complete,
    /// The request was refined (continuation) and must be resent
    Resend,
    /// The frame was not for this exchange; keep waiting
    Ignored,
}

/// A request/response exchange the queue can drive to completion.
pub trait Exchange {
    /// Whether the exchange holds a sendable request
    fn is_valid(&self) -> bool;

    /// The request frame to put on the wire
    fn transmit(&mut self) -> &[u8];

    /// Process one inbound frame
    fn handle_frame(&mut self, frame: &[u8]) -> FrameDisposition;

    /// Mark the exchange timed out
    fn expire(&mut self);

    /// Mark the exchange failed (transport error)
    fn abort(&mut self);
}

/// Stable handle to a queued command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandId(u16);

/// L2CAP connection parameters captured when the socket opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionInfo {
    /// Negotiated maximum transmission unit
    pub mtu: u16,
    /// L2CAP connection handle
    pub handle: u16,
}

/// A finished exchange handed back to the submitter
#[derive(Debug)]
pub struct Completion<C> {
    /// The handle returned by [`CommandQueue::execute`]
    pub id: CommandId,
    /// The command, carrying its final state and response
    pub command: C,
}

/// Command queue errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueError {
    /// The queue is at capacity
    Full,
    /// The command has no sendable request
    InvalidCommand,
    /// The command is the in-flight head and cannot be revoked
    InFlight,
    /// No queued command has the given id
    UnknownCommand,
}

#[derive(Debug)]
struct Entry<C> {
    id: CommandId,
    deadline: Instant,
    command: C,
    sent: bool,
}

/// FIFO of pending exchanges bound to one L2CAP socket.
#[derive(Debug)]
pub struct CommandQueue<C: Exchange, const N: usize> {
    entries: Vec<Entry<C>, N>,
    next_id: u16,
    connection: Option<ConnectionInfo>,
}

impl<C: Exchange, const N: usize> CommandQueue<C, N> {
    /// Create an empty queue
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            connection: None,
        }
    }

    /// Number of queued commands, the in-flight head included
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no commands are queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the underlying socket has reported open
    #[must_use]
    pub const fn is_operational(&self) -> bool {
        self.connection.is_some()
    }

    /// Connection parameters captured from the open socket
    #[must_use]
    pub const fn connection_info(&self) -> Option<ConnectionInfo> {
        self.connection
    }

    /// Record that the socket reached the open state
    pub fn connection_opened(&mut self, info: ConnectionInfo) {
        self.connection = Some(info);
    }

    /// Enqueue a command with a completion deadline of `now + wait`.
    ///
    /// The command starts transmitting once it reaches the head of the
    /// queue; submission order is completion order.
    ///
    /// # Errors
    /// Returns `InvalidCommand` for commands without a sendable request
    /// and `Full` when the queue is at capacity
    pub fn execute(
        &mut self,
        now: Instant,
        wait: Duration,
        command: C,
    ) -> Result<CommandId, QueueError> {
        if !command.is_valid() {
            return Err(QueueError::InvalidCommand);
        }

        let id = CommandId(self.next_id);
        let entry = Entry {
            id,
            deadline: now + wait,
            command,
            sent: false,
        };
        self.entries.push(entry).map_err(|_| QueueError::Full)?;
        self.next_id = self.next_id.wrapping_add(1);
        Ok(id)
    }

    /// Remove a command that has not reached the head of the queue.
    ///
    /// # Errors
    /// Returns `InFlight` for the head (its response may already be on
    /// the wire) and `UnknownCommand` for unknown ids
    pub fn revoke(&mut self, id: CommandId) -> Result<C, QueueError> {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(QueueError::UnknownCommand)?;

        if position == 0 {
            return Err(QueueError::InFlight);
        }
        Ok(self.entries.remove(position).command)
    }

    /// The next frame to put on the wire, if the head has not been sent
    /// yet. Marks the head as sent.
    pub fn poll_transmit(&mut self) -> Option<&[u8]> {
        let head = self.entries.first_mut()?;
        if head.sent {
            return None;
        }
        head.sent = true;
        Some(head.command.transmit())
    }

    /// Feed one inbound frame to the in-flight head.
    ///
    /// Frames arriving with no command outstanding, or not matching the
    /// head's correlation state, are dropped without popping anything.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Option<Completion<C>> {
        let Some(head) = self.entries.first_mut() else {
            #[cfg(feature = "defmt")]
            defmt::warn!("dropping frame: no command outstanding");
            return None;
        };

        match head.command.handle_frame(frame) {
            FrameDisposition::Complete => Some(self.pop_head()),
            FrameDisposition::Resend => {
                head.sent = false;
                None
            }
            FrameDisposition::Ignored => None,
        }
    }

    /// Complete the head with a timeout if its deadline has passed.
    pub fn poll_timeout(&mut self, now: Instant) -> Option<Completion<C>> {
        let head = self.entries.first_mut()?;
        if now < head.deadline {
            return None;
        }
        head.command.expire();
        Some(self.pop_head())
    }

    /// Complete the head with a transport failure.
    pub fn fail_head(&mut self) -> Option<Completion<C>> {
        let head = self.entries.first_mut()?;
        head.command.abort();
        Some(self.pop_head())
    }

    fn pop_head(&mut self) -> Completion<C> {
        let entry = self.entries.remove(0);
        Completion {
            id: entry.id,
            command: entry.command,
        }
    }
}

impl<C: Exchange, const N: usize> Default for CommandQueue<C, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct MockCommand {
        valid: bool,
        payload: &'static [u8],
        disposition: FrameDisposition,
        state: CommandState,
        transmit_count: usize,
    }

    impl MockCommand {
        fn new(payload: &'static [u8]) -> Self {
            Self {
                valid: true,
                payload,
                disposition: FrameDisposition::Complete,
                state: CommandState::Pending,
                transmit_count: 0,
            }
        }
    }

    impl Exchange for MockCommand {
        fn is_valid(&self) -> bool {
            self.valid
        }

        fn transmit(&mut self) -> &[u8] {
            self.transmit_count += 1;
            self.payload
        }

        fn handle_frame(&mut self, _frame: &[u8]) -> FrameDisposition {
            if self.disposition == FrameDisposition::Complete {
                self.state = CommandState::Completed;
            }
            self.disposition
        }

        fn expire(&mut self) {
            self.state = CommandState::TimedOut;
        }

        fn abort(&mut self) {
            self.state = CommandState::Failed;
        }
    }

    fn start() -> Instant {
        Instant::from_ticks(0)
    }

    #[test]
    fn test_one_in_flight_fifo_order() {
        let mut queue: CommandQueue<MockCommand, 4> = CommandQueue::new();
        let wait = Duration::from_millis(100);

        let first = queue.execute(start(), wait, MockCommand::new(b"one")).unwrap();
        let second = queue.execute(start(), wait, MockCommand::new(b"two")).unwrap();

        // Only the head transmits, exactly once.
        assert_eq!(queue.poll_transmit(), Some(b"one".as_slice()));
        assert_eq!(queue.poll_transmit(), None);

        let done = queue.handle_frame(b"resp").unwrap();
        assert_eq!(done.id, first);
        assert_eq!(done.command.state, CommandState::Completed);

        // Completion arms the next entry.
        assert_eq!(queue.poll_transmit(), Some(b"two".as_slice()));
        let done = queue.handle_frame(b"resp").unwrap();
        assert_eq!(done.id, second);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_ignored_frame_pops_nothing() {
        let mut queue: CommandQueue<MockCommand, 4> = CommandQueue::new();
        let mut command = MockCommand::new(b"cmd");
        command.disposition = FrameDisposition::Ignored;

        queue
            .execute(start(), Duration::from_millis(100), command)
            .unwrap();
        queue.poll_transmit().unwrap();

        assert!(queue.handle_frame(b"stray").is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_resend_rearms_transmit() {
        let mut queue: CommandQueue<MockCommand, 4> = CommandQueue::new();
        let mut command = MockCommand::new(b"cmd");
        command.disposition = FrameDisposition::Resend;

        queue
            .execute(start(), Duration::from_millis(100), command)
            .unwrap();
        assert!(queue.poll_transmit().is_some());
        assert!(queue.poll_transmit().is_none());

        assert!(queue.handle_frame(b"partial").is_none());
        assert!(queue.poll_transmit().is_some());
        assert_eq!(queue.entries[0].command.transmit_count, 2);
    }

    #[test]
    fn test_timeout_completes_head_and_advances() {
        let mut queue: CommandQueue<MockCommand, 4> = CommandQueue::new();
        let wait = Duration::from_millis(50);

        queue.execute(start(), wait, MockCommand::new(b"one")).unwrap();
        queue.execute(start(), wait, MockCommand::new(b"two")).unwrap();
        queue.poll_transmit().unwrap();

        assert!(queue.poll_timeout(start() + Duration::from_millis(10)).is_none());

        let done = queue
            .poll_timeout(start() + Duration::from_millis(60))
            .unwrap();
        assert_eq!(done.command.state, CommandState::TimedOut);

        // The new head transmits next.
        assert_eq!(queue.poll_transmit(), Some(b"two".as_slice()));
    }

    #[test]
    fn test_revoke_semantics() {
        let mut queue: CommandQueue<MockCommand, 4> = CommandQueue::new();
        let wait = Duration::from_millis(100);

        let head = queue.execute(start(), wait, MockCommand::new(b"one")).unwrap();
        let queued = queue.execute(start(), wait, MockCommand::new(b"two")).unwrap();

        assert_eq!(queue.revoke(head).unwrap_err(), QueueError::InFlight);
        assert!(queue.revoke(queued).is_ok());
        assert_eq!(queue.revoke(queued).unwrap_err(), QueueError::UnknownCommand);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_invalid_command_rejected() {
        let mut queue: CommandQueue<MockCommand, 4> = CommandQueue::new();
        let mut command = MockCommand::new(b"");
        command.valid = false;

        assert_eq!(
            queue
                .execute(start(), Duration::from_millis(100), command)
                .unwrap_err(),
            QueueError::InvalidCommand
        );
    }

    #[test]
    fn test_queue_capacity() {
        let mut queue: CommandQueue<MockCommand, 2> = CommandQueue::new();
        let wait = Duration::from_millis(100);

        queue.execute(start(), wait, MockCommand::new(b"a")).unwrap();
        queue.execute(start(), wait, MockCommand::new(b"b")).unwrap();
        assert_eq!(
            queue
                .execute(start(), wait, MockCommand::new(b"c"))
                .unwrap_err(),
            QueueError::Full
        );
    }

    #[test]
    fn test_connection_ready_hook() {
        let mut queue: CommandQueue<MockCommand, 2> = CommandQueue::new();
        assert!(!queue.is_operational());

        queue.connection_opened(ConnectionInfo { mtu: 672, handle: 0x0040 });
        assert!(queue.is_operational());
        assert_eq!(
            queue.connection_info(),
            Some(ConnectionInfo { mtu: 672, handle: 0x0040 })
        );
    }
}
