//! A2DP profile discovery and record interpretation
//!
//! Wraps the SDP discovery driver with an audio-class filter and
//! extracts the A2DP specifics from each conforming record: role, the
//! AVDTP L2CAP PSM, profile and transport versions, and the optional
//! feature bits.

use embassy_time::{Duration, Instant};
use heapless::Vec;

use super::{A2dpError, AudioFeatures, AudioServiceKind, SUPPORTED_FEATURES_ATTRIBUTE};
use crate::constants::MAX_DISCOVERED_SERVICES;
use crate::queue::Completion;
use crate::sdp::{
    ClassId, Command, DiscoveryStatus, ProfileStep, SdpError, SdpProfile, Service,
};

/// An A2DP service record condensed to what a stream setup needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AudioService {
    /// Whether the remote service is a source or a sink
    pub kind: AudioServiceKind,
    /// The L2CAP PSM the AVDTP transport listens on
    pub psm: u16,
    /// Advanced Audio Distribution profile version
    pub profile_version: u16,
    /// AVDTP protocol version
    pub transport_version: u16,
    /// Advertised feature bits
    pub features: AudioFeatures,
}

impl AudioService {
    /// Interpret a populated service record as an A2DP service.
    ///
    /// # Errors
    /// Returns an error if the record does not conform to Advanced
    /// Audio Distribution or lacks the transport descriptors
    pub fn from_service(service: &Service) -> Result<Self, A2dpError> {
        let a2dp = service
            .profile(ClassId::AdvancedAudioDistribution.to_uuid())
            .ok_or(A2dpError::NotAudioService)?;

        let l2cap = service
            .protocol(ClassId::L2cap.to_uuid())
            .ok_or(A2dpError::MissingTransport)?;
        let psm = l2cap
            .parameters
            .reader()
            .pop_uint16()
            .map_err(|_| A2dpError::InvalidParameters)?;

        let avdtp = service
            .protocol(ClassId::Avdtp.to_uuid())
            .ok_or(A2dpError::MissingTransport)?;
        let transport_version = avdtp
            .parameters
            .reader()
            .pop_uint16()
            .map_err(|_| A2dpError::InvalidParameters)?;

        let kind = if service.has_class(ClassId::AudioSink.to_uuid()) {
            AudioServiceKind::Sink
        } else {
            AudioServiceKind::Source
        };

        // SupportedFeatures is optional. Source roles share the sink
        // nibble on the wire and are normalized into the high nibble.
        let mut features = AudioFeatures::NONE;
        if let Some(value) = service.attribute(SUPPORTED_FEATURES_ATTRIBUTE) {
            if let Some(raw) = value.as_unsigned() {
                #[allow(clippy::cast_possible_truncation)]
                let mut bits = raw as u16;
                if kind == AudioServiceKind::Source {
                    bits = (bits & 0x000F) << 4;
                }
                features = AudioFeatures::from_bits(bits);
            }
        }

        Ok(Self {
            kind,
            psm,
            profile_version: a2dp.version,
            transport_version,
            features,
        })
    }
}

/// A2DP discovery driver: an SDP discovery filtered on the audio
/// service classes, with record interpretation at the end.
#[derive(Debug)]
pub struct A2dpProfile {
    sdp: SdpProfile,
    audio: Vec<AudioService, MAX_DISCOVERED_SERVICES>,
}

impl A2dpProfile {
    /// Create an idle driver
    #[must_use]
    pub fn new() -> Self {
        Self {
            sdp: SdpProfile::new(),
            audio: Vec::new(),
        }
    }

    /// The interpreted audio services of the last discovery run
    #[must_use]
    pub fn audio_services(&self) -> &[AudioService] {
        &self.audio
    }

    /// The underlying service records
    #[must_use]
    pub fn services(&self) -> &[Service] {
        self.sdp.services()
    }

    /// Whether a discovery run is in progress
    #[must_use]
    pub fn is_discovering(&self) -> bool {
        self.sdp.is_discovering()
    }

    /// Start discovering remote audio services of the given role.
    ///
    /// # Errors
    /// Returns an error if the search request cannot be built
    pub fn begin(
        &mut self,
        now: Instant,
        wait: Duration,
        kind: AudioServiceKind,
    ) -> Result<ProfileStep, SdpError> {
        self.audio.clear();

        let class = match kind {
            AudioServiceKind::Sink => ClassId::AudioSink,
            AudioServiceKind::Source => ClassId::AudioSource,
        };
        self.sdp.begin(now, wait, &[class.to_uuid()])
    }

    /// Feed the completion of the previously emitted command; when the
    /// underlying discovery finishes, the conforming records are
    /// interpreted into [`AudioService`] entries.
    pub fn on_completion(&mut self, now: Instant, completion: Completion<Command>) -> ProfileStep {
        let step = self.sdp.on_completion(now, completion);

        if matches!(
            step,
            ProfileStep::Finished(DiscoveryStatus::Complete | DiscoveryStatus::NoServices)
        ) {
            self.interpret();
        }
        step
    }

    fn interpret(&mut self) {
        for service in self.sdp.services() {
            match AudioService::from_service(service) {
                Ok(audio) => {
                    if self.audio.push(audio).is_err() {
                        break;
                    }
                }
                Err(_error) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!(
                        "skipping non-conforming record 0x{:08x}: {}",
                        service.handle(),
                        _error
                    );
                }
            }
        }
    }
}

impl Default for A2dpProfile {
    fn default() -> Self {
        Self::new()
    }
}
