//! Reactor glue between a command queue and an L2CAP socket
//!
//! The protocol core is a synchronous state machine; this module wires
//! it to the asynchronous world. An [`Engine`] owns the queue behind a
//! blocking mutex (concurrent submitters are serialized; a second
//! caller only enqueues, it never restarts the send pump), an inbound
//! frame channel fed by the socket reactor, and a completion channel
//! that replaces per-command callbacks: finished commands are handed
//! back by value.
//!
//! [`Engine::run`] is the single pump task per socket. It transmits the
//! armed head, forwards inbound frames, polls deadlines and pushes
//! completions. Completion consumers run decoupled from the queue
//! mutex, so they are free to submit follow-up commands.

use core::cell::RefCell;

use embassy_futures::select::{select3, Either3};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use heapless::Vec;

use crate::a2dp::{A2dpProfile, AudioServiceKind};
use crate::constants::{FRAME_QUEUE_DEPTH, MAX_FRAME_SIZE, MAX_PENDING_COMMANDS, SDP_PDU_CAPACITY};
use crate::queue::{CommandId, CommandQueue, Completion, ConnectionInfo, Exchange, QueueError};
use crate::sdp::{DiscoveryStatus, ErrorCode, ProfileStep, SdpProfile};
use crate::uuid::Uuid;

/// One inbound L2CAP frame
pub type Frame = Vec<u8, MAX_FRAME_SIZE>;

type TxFrame = Vec<u8, SDP_PDU_CAPACITY>;

/// How often the pump re-checks the head deadline
const DEADLINE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Byte sink towards the L2CAP socket.
///
/// `send` submits one complete sequenced packet; it must not block
/// beyond the reactor's own backpressure.
#[allow(async_fn_in_trait)]
pub trait FrameTransport {
    /// Transport-specific error
    type Error: core::fmt::Debug;

    /// Submit one frame to the socket
    async fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error>;
}

/// Engine for one L2CAP socket: SDP and AVDTP control channels use the
/// same machinery with their respective command types.
pub struct Engine<C: Exchange, const DEPTH: usize> {
    queue: BlockingMutex<CriticalSectionRawMutex, RefCell<CommandQueue<C, DEPTH>>>,
    inbound: Channel<CriticalSectionRawMutex, Frame, FRAME_QUEUE_DEPTH>,
    completions: Channel<CriticalSectionRawMutex, Completion<C>, DEPTH>,
    kick: Signal<CriticalSectionRawMutex, ()>,
    operational: Signal<CriticalSectionRawMutex, ConnectionInfo>,
}

/// Engine driving SDP commands
pub type SdpEngine = Engine<crate::sdp::Command, MAX_PENDING_COMMANDS>;

/// Engine driving AVDTP signaling commands
pub type AvdtpEngine = Engine<crate::avdtp::Command, MAX_PENDING_COMMANDS>;

impl<C: Exchange, const DEPTH: usize> Engine<C, DEPTH> {
    /// Create an engine; suitable for `static` initialization
    #[must_use]
    pub const fn new() -> Self {
        Self {
            queue: BlockingMutex::new(RefCell::new(CommandQueue::new())),
            inbound: Channel::new(),
            completions: Channel::new(),
            kick: Signal::new(),
            operational: Signal::new(),
        }
    }

    /// Enqueue a command with the given wait budget.
    ///
    /// The completion is delivered through
    /// [`next_completion`](Self::next_completion) in submission order,
    /// exactly once per command.
    ///
    /// # Errors
    /// Returns an error if the command is invalid or the queue is full
    pub fn execute(&self, wait: Duration, command: C) -> Result<CommandId, QueueError> {
        let id = self
            .queue
            .lock(|queue| queue.borrow_mut().execute(Instant::now(), wait, command))?;
        self.kick.signal(());
        Ok(id)
    }

    /// Remove a command that has not started transmitting
    ///
    /// # Errors
    /// Returns an error if the command is in flight or unknown
    pub fn revoke(&self, id: CommandId) -> Result<C, QueueError> {
        self.queue.lock(|queue| queue.borrow_mut().revoke(id))
    }

    /// Hand one inbound sequenced packet to the engine.
    ///
    /// Called from the socket reactor; never blocks. Frames arriving
    /// faster than the pump drains them are dropped.
    pub fn on_receive(&self, data: &[u8]) {
        let Ok(frame) = Frame::from_slice(data) else {
            #[cfg(feature = "defmt")]
            defmt::warn!("dropping oversized frame ({} bytes)", data.len());
            return;
        };

        if self.inbound.try_send(frame).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("inbound frame queue full; frame dropped");
        }
    }

    /// Record that the socket reached the open state
    pub fn on_open(&self, info: ConnectionInfo) {
        self.queue
            .lock(|queue| queue.borrow_mut().connection_opened(info));
        self.operational.signal(info);
        self.kick.signal(());
    }

    /// Wait until the socket has reported open
    pub async fn wait_operational(&self) -> ConnectionInfo {
        self.operational.wait().await
    }

    /// Receive the next finished command
    pub async fn next_completion(&self) -> Completion<C> {
        self.completions.receive().await
    }

    /// The connection parameters, once the socket is open
    #[must_use]
    pub fn connection_info(&self) -> Option<ConnectionInfo> {
        self.queue.lock(|queue| queue.borrow().connection_info())
    }

    /// Drive the socket: transmit armed commands, feed inbound frames,
    /// poll deadlines and deliver completions. One task per socket.
    pub async fn run<T: FrameTransport>(&self, transport: &mut T) -> ! {
        loop {
            self.service(transport).await;

            match select3(
                self.inbound.receive(),
                self.kick.wait(),
                Timer::after(DEADLINE_POLL_INTERVAL),
            )
            .await
            {
                Either3::First(frame) => {
                    let completion = self
                        .queue
                        .lock(|queue| queue.borrow_mut().handle_frame(&frame));
                    if let Some(completion) = completion {
                        self.completions.send(completion).await;
                    }
                }
                Either3::Second(()) | Either3::Third(()) => {}
            }
        }
    }

    async fn service<T: FrameTransport>(&self, transport: &mut T) {
        // Expired heads complete before anything else transmits.
        loop {
            let expired = self
                .queue
                .lock(|queue| queue.borrow_mut().poll_timeout(Instant::now()));
            match expired {
                Some(completion) => self.completions.send(completion).await,
                None => break,
            }
        }

        loop {
            let pending = self.queue.lock(|queue| {
                let mut queue = queue.borrow_mut();
                let bytes = queue.poll_transmit()?;
                TxFrame::from_slice(bytes).ok()
            });

            let Some(frame) = pending else { break };
            if transport.send(&frame).await.is_err() {
                #[cfg(feature = "defmt")]
                defmt::warn!("transport send failed; completing head with failure");
                let failed = self.queue.lock(|queue| queue.borrow_mut().fail_head());
                if let Some(completion) = failed {
                    self.completions.send(completion).await;
                }
            }
        }
    }
}

impl<C: Exchange, const DEPTH: usize> Default for Engine<C, DEPTH> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a full SDP discovery over an engine, driving the profile state
/// machine to its terminal report.
pub async fn discover_services(
    engine: &SdpEngine,
    profile: &mut SdpProfile,
    wait: Duration,
    uuids: &[Uuid],
) -> DiscoveryStatus {
    let Ok(mut step) = profile.begin(Instant::now(), wait, uuids) else {
        return DiscoveryStatus::Failed(ErrorCode::InvalidRequestSyntax);
    };

    loop {
        step = match step {
            ProfileStep::Execute(command, budget) => {
                if engine.execute(budget, command).is_err() {
                    return DiscoveryStatus::Failed(ErrorCode::InsufficientResources);
                }
                let completion = engine.next_completion().await;
                profile.on_completion(Instant::now(), completion)
            }
            ProfileStep::Finished(status) => return status,
            ProfileStep::Idle => return DiscoveryStatus::Failed(ErrorCode::Reserved),
        };
    }
}

/// Run an A2DP discovery over an engine and interpret the conforming
/// records.
pub async fn discover_audio_services(
    engine: &SdpEngine,
    profile: &mut A2dpProfile,
    wait: Duration,
    kind: AudioServiceKind,
) -> DiscoveryStatus {
    let Ok(mut step) = profile.begin(Instant::now(), wait, kind) else {
        return DiscoveryStatus::Failed(ErrorCode::InvalidRequestSyntax);
    };

    loop {
        step = match step {
            ProfileStep::Execute(command, budget) => {
                if engine.execute(budget, command).is_err() {
                    return DiscoveryStatus::Failed(ErrorCode::InsufficientResources);
                }
                let completion = engine.next_completion().await;
                profile.on_completion(Instant::now(), completion)
            }
            ProfileStep::Finished(status) => return status,
            ProfileStep::Idle => return DiscoveryStatus::Failed(ErrorCode::Reserved),
        };
    }
}
