#![no_std]
#![warn(missing_docs)]
#![allow(clippy::large_enum_variant)]

//! # Bowerbird
//!
//! A `no_std` client-side Bluetooth service-discovery and audio-profile
//! engine. Bowerbird locates services on a remote device via the
//! Service Discovery Protocol (SDP) over an L2CAP sequenced-packet
//! channel, parses the returned service records, and interprets A2DP
//! records so a higher layer can open an AVDTP session for audio
//! streaming.
//!
//! The L2CAP socket itself is an external collaborator: the crate
//! consumes a frame send/receive boundary plus a connection-ready
//! event. Everything above that lives here: the Data Element codec,
//! PDU framing with transaction correlation, continuation-state
//! reassembly, the one-in-flight command queue, and the discovery
//! drivers.
//!
//! ## Layers
//!
//! - [`sdp::element`]: the self-describing Data Element codec
//! - [`sdp::pdu`] / [`sdp::response`] / [`sdp::command`]: framing,
//!   reassembly and command lifecycle
//! - [`queue`]: the one-in-flight command queue both control channels
//!   share
//! - [`sdp::service`] / [`sdp::profile`]: the service model and the
//!   ServiceSearch → ServiceAttribute discovery driver
//! - [`a2dp`]: A2DP record interpretation
//! - [`avdtp`]: the AVDTP signaling envelope
//! - [`engine`]: embassy-based reactor glue binding a queue to a socket
//!
//! ## Usage
//!
//! The protocol core is sans-io and can be driven directly:
//!
//! ```rust,no_run
//! use bowerbird::queue::CommandQueue;
//! use bowerbird::sdp::{ClassId, Command};
//! use embassy_time::{Duration, Instant};
//!
//! let mut queue: CommandQueue<Command, 4> = CommandQueue::new();
//! let command = Command::service_search_single(ClassId::AudioSink.to_uuid()).unwrap();
//! queue
//!     .execute(Instant::now(), Duration::from_millis(2000), command)
//!     .unwrap();
//!
//! // Bytes from queue.poll_transmit() go out on the L2CAP socket;
//! // inbound frames are fed to queue.handle_frame(..) and finished
//! // commands come back as completions.
//! ```
//!
//! With an async reactor, [`engine::Engine`] does the pumping and
//! [`engine::discover_audio_services`] runs a whole discovery.

pub mod a2dp;
pub mod avdtp;
pub mod constants;
pub mod engine;
pub mod queue;
pub mod sdp;
pub mod uuid;

pub use a2dp::{A2dpProfile, AudioFeatures, AudioService, AudioServiceKind};
pub use engine::{
    discover_audio_services, discover_services, AvdtpEngine, Engine, FrameTransport, SdpEngine,
};
pub use queue::{
    CommandId, CommandQueue, CommandState, Completion, ConnectionInfo, Exchange,
    FrameDisposition, QueueError,
};
pub use sdp::{Command, DiscoveryStatus, SdpError, SdpProfile, Service};
pub use uuid::Uuid;
