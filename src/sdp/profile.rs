//! SDP discovery driver
//!
//! Discovery is a two-step orchestration: one `ServiceSearch` for the
//! requested class UUIDs, then one `ServiceAttribute` per returned
//! record handle asking for all attributes. The driver is a synchronous
//! state machine: it emits the next command to submit and consumes the
//! completions the queue hands back.
//!
//! Time accounting is per-discovery, not per-PDU: the deadline is fixed
//! when discovery starts and the remaining budget is recomputed before
//! every attribute request. An exhausted budget aborts the discovery
//! with a timeout report. The terminal report is delivered exactly
//! once.

use embassy_time::{Duration, Instant};
use heapless::Vec;

use super::command::Command;
use super::service::Service;
use super::{ErrorCode, PduId, SdpError};
use crate::constants::{DEFAULT_MAX_SEARCH_RESULTS, MAX_DISCOVERED_SERVICES};
use crate::queue::{CommandState, Completion};
use crate::uuid::Uuid;

/// Terminal result of a discovery run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiscoveryStatus {
    /// Services found and their attributes retrieved
    Complete,
    /// The search matched no services
    NoServices,
    /// The discovery budget elapsed
    TimedOut,
    /// A command failed with the given status
    Failed(ErrorCode),
}

/// What the driver wants next
#[derive(Debug)]
pub enum ProfileStep {
    /// Submit this command with the given wait budget
    Execute(Command, Duration),
    /// Discovery finished with the given status
    Finished(DiscoveryStatus),
    /// No discovery in progress; the completion was not for us
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Searching,
    Retrieving(usize),
    Done,
}

/// Service discovery state machine for one remote device.
#[derive(Debug)]
pub struct SdpProfile {
    services: Vec<Service, MAX_DISCOVERED_SERVICES>,
    phase: Phase,
    deadline: Instant,
}

impl SdpProfile {
    /// Create an idle driver
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
            phase: Phase::Idle,
            deadline: Instant::from_ticks(0),
        }
    }

    /// The services collected by the last discovery run
    #[must_use]
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Whether a discovery run is in progress
    #[must_use]
    pub fn is_discovering(&self) -> bool {
        matches!(self.phase, Phase::Searching | Phase::Retrieving(_))
    }

    /// Start a discovery for services matching `uuids`, with an overall
    /// deadline of `now + wait`.
    ///
    /// # Errors
    /// Returns an error if the search request cannot be built
    pub fn begin(
        &mut self,
        now: Instant,
        wait: Duration,
        uuids: &[Uuid],
    ) -> Result<ProfileStep, SdpError> {
        self.services.clear();
        self.deadline = now + wait;
        self.phase = Phase::Searching;

        let command = Command::service_search(uuids, DEFAULT_MAX_SEARCH_RESULTS)?;
        Ok(ProfileStep::Execute(command, wait))
    }

    /// Feed the completion of the previously emitted command and get
    /// the next step.
    pub fn on_completion(&mut self, now: Instant, completion: Completion<Command>) -> ProfileStep {
        match self.phase {
            Phase::Searching => self.search_finished(now, &completion.command),
            Phase::Retrieving(index) => self.attributes_finished(now, index, &completion.command),
            Phase::Idle | Phase::Done => ProfileStep::Idle,
        }
    }

    fn search_finished(&mut self, now: Instant, command: &Command) -> ProfileStep {
        if let Some(status) = Self::failure_of(command, PduId::ServiceSearchResponse) {
            return self.finish(status);
        }

        let handles = command.response().handles();
        if handles.is_empty() {
            return self.finish(DiscoveryStatus::NoServices);
        }

        for handle in handles {
            if self.services.push(Service::new(*handle)).is_err() {
                #[cfg(feature = "defmt")]
                defmt::warn!("discovery result table full; extra services dropped");
                break;
            }
        }

        self.phase = Phase::Retrieving(0);
        self.next_attribute_request(now)
    }

    fn attributes_finished(&mut self, now: Instant, index: usize, command: &Command) -> ProfileStep {
        if let Some(status) = Self::failure_of(command, PduId::ServiceAttributeResponse) {
            return self.finish(status);
        }

        if let Some(service) = self.services.get_mut(index) {
            match command.response().attributes() {
                Ok(attributes) => {
                    for pair in attributes {
                        let Ok((id, value)) = pair else {
                            #[cfg(feature = "defmt")]
                            defmt::warn!("attribute list for record {} cut short", index);
                            break;
                        };
                        if service.ingest_attribute(id, value).is_err() {
                            break;
                        }
                    }
                }
                Err(_) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("attribute response for record {} not a sequence", index);
                }
            }
        }

        self.phase = Phase::Retrieving(index + 1);
        self.next_attribute_request(now)
    }

    fn next_attribute_request(&mut self, now: Instant) -> ProfileStep {
        let Phase::Retrieving(index) = self.phase else {
            return ProfileStep::Idle;
        };

        if index >= self.services.len() {
            return self.finish(DiscoveryStatus::Complete);
        }

        let remaining = self.remaining(now);
        if remaining.as_ticks() == 0 {
            return self.finish(DiscoveryStatus::TimedOut);
        }

        match Command::service_attribute_all(self.services[index].handle()) {
            Ok(command) => ProfileStep::Execute(command, remaining),
            Err(_) => self.finish(DiscoveryStatus::Failed(ErrorCode::Reserved)),
        }
    }

    fn failure_of(command: &Command, expected: PduId) -> Option<DiscoveryStatus> {
        match command.state() {
            CommandState::TimedOut => Some(DiscoveryStatus::TimedOut),
            CommandState::Completed => {
                let status = command.response().status();
                if status != ErrorCode::Success {
                    Some(DiscoveryStatus::Failed(status))
                } else if command.response().kind() != expected {
                    Some(DiscoveryStatus::Failed(ErrorCode::DeserializationFailed))
                } else {
                    None
                }
            }
            _ => Some(DiscoveryStatus::Failed(ErrorCode::Reserved)),
        }
    }

    fn finish(&mut self, status: DiscoveryStatus) -> ProfileStep {
        self.phase = Phase::Done;
        ProfileStep::Finished(status)
    }

    fn remaining(&self, now: Instant) -> Duration {
        Duration::from_ticks(self.deadline.as_ticks().saturating_sub(now.as_ticks()))
    }
}

impl Default for SdpProfile {
    fn default() -> Self {
        Self::new()
    }
}
