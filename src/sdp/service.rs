//! SDP service records
//!
//! A service on the remote device is a map of attribute IDs to data
//! elements. The universal attributes (IDs 0x0000..=0x000D) give the
//! record its structure: the record handle, the service classes it
//! claims, the profiles it conforms to and the protocol stacks that
//! reach it. [`Service`] decodes those while also keeping every
//! attribute verbatim for profile-specific interpretation.

use heapless::{FnvIndexMap, Vec};

use super::element::{CodecError, DataElement, ElementSeq};
use super::SdpError;
use crate::constants::{MAX_SERVICE_ATTRIBUTES, MAX_SERVICE_DESCRIPTORS};
use crate::uuid::Uuid;

/// Universal attribute IDs defined for every service record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum AttributeId {
    /// Service Record Handle
    ServiceRecordHandle = 0x0000,
    /// Service Class ID List
    ServiceClassIdList = 0x0001,
    /// Service Record State
    ServiceRecordState = 0x0002,
    /// Service ID
    ServiceId = 0x0003,
    /// Protocol Descriptor List
    ProtocolDescriptorList = 0x0004,
    /// Browse Group List
    BrowseGroupList = 0x0005,
    /// Language Base Attribute ID List
    LanguageBaseAttributeIdList = 0x0006,
    /// Service Info Time To Live
    ServiceInfoTimeToLive = 0x0007,
    /// Service Availability
    ServiceAvailability = 0x0008,
    /// Bluetooth Profile Descriptor List
    BluetoothProfileDescriptorList = 0x0009,
    /// Documentation URL
    DocumentationUrl = 0x000A,
    /// Client Executable URL
    ClientExecutableUrl = 0x000B,
    /// Icon URL
    IconUrl = 0x000C,
    /// Additional Protocol Descriptor Lists
    AdditionalProtocolDescriptorLists = 0x000D,
}

impl AttributeId {
    /// Convert to the u16 attribute ID
    #[must_use]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Create from a u16 attribute ID
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0000 => Some(Self::ServiceRecordHandle),
            0x0001 => Some(Self::ServiceClassIdList),
            0x0002 => Some(Self::ServiceRecordState),
            0x0003 => Some(Self::ServiceId),
            0x0004 => Some(Self::ProtocolDescriptorList),
            0x0005 => Some(Self::BrowseGroupList),
            0x0006 => Some(Self::LanguageBaseAttributeIdList),
            0x0007 => Some(Self::ServiceInfoTimeToLive),
            0x0008 => Some(Self::ServiceAvailability),
            0x0009 => Some(Self::BluetoothProfileDescriptorList),
            0x000A => Some(Self::DocumentationUrl),
            0x000B => Some(Self::ClientExecutableUrl),
            0x000C => Some(Self::IconUrl),
            0x000D => Some(Self::AdditionalProtocolDescriptorLists),
            _ => None,
        }
    }
}

/// Well-known protocol and service class identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum ClassId {
    /// Service Discovery Protocol
    Sdp = 0x0001,
    /// User Datagram Protocol
    Udp = 0x0002,
    /// RFCOMM protocol
    Rfcomm = 0x0003,
    /// Transmission Control Protocol
    Tcp = 0x0004,
    /// Telephony Control (binary)
    TcsBin = 0x0005,
    /// Attribute Protocol
    Att = 0x0007,
    /// Object Exchange protocol
    Obex = 0x0008,
    /// Internet Protocol
    Ip = 0x0009,
    /// Bluetooth Network Encapsulation Protocol
    Bnep = 0x000F,
    /// Human Interface Device Protocol
    Hidp = 0x0011,
    /// Audio/Video Control Transport Protocol
    Avctp = 0x0017,
    /// Audio/Video Distribution Transport Protocol
    Avdtp = 0x0019,
    /// Logical Link Control and Adaptation Protocol
    L2cap = 0x0100,
    /// SDP server service
    ServiceDiscoveryServer = 0x1000,
    /// Browse group descriptor
    BrowseGroupDescriptor = 0x1001,
    /// Public browse root group
    PublicBrowseRoot = 0x1002,
    /// Serial Port Profile
    SerialPort = 0x1101,
    /// LAN access using PPP
    LanAccessPpp = 0x1102,
    /// Dialup networking
    DialupNetworking = 0x1103,
    /// IrMC synchronization
    IrMcSync = 0x1104,
    /// OBEX object push
    ObexObjectPush = 0x1105,
    /// OBEX file transfer
    ObexFileTransfer = 0x1106,
    /// Headset Profile
    Headset = 0x1108,
    /// Cordless telephony
    CordlessTelephony = 0x1109,
    /// Audio source
    AudioSource = 0x110A,
    /// Audio sink
    AudioSink = 0x110B,
    /// A/V remote control target
    AvRemoteControlTarget = 0x110C,
    /// Advanced Audio Distribution Profile
    AdvancedAudioDistribution = 0x110D,
    /// A/V remote control
    AvRemoteControl = 0x110E,
    /// A/V remote control controller
    AvRemoteControlController = 0x110F,
    /// Intercom
    Intercom = 0x1110,
    /// Fax
    Fax = 0x1111,
    /// Headset audio gateway
    HeadsetAudioGateway = 0x1112,
    /// Personal area network user
    Panu = 0x1115,
    /// Network access point
    Nap = 0x1116,
    /// Group ad-hoc network
    Gn = 0x1117,
    /// Hands-Free Profile
    Handsfree = 0x111E,
    /// Hands-free audio gateway
    HandsfreeAudioGateway = 0x111F,
    /// Human Interface Device service
    HumanInterfaceDevice = 0x1124,
    /// SIM access
    SimAccess = 0x112D,
    /// Phonebook access client equipment
    PhonebookAccessPce = 0x112E,
    /// Phonebook access server equipment
    PhonebookAccessPse = 0x112F,
    /// Phonebook Access Profile
    PhonebookAccess = 0x1130,
    /// Headset (HS role)
    HeadsetHs = 0x1131,
    /// Message access server
    MessageAccessServer = 0x1132,
    /// Message notification server
    MessageNotificationServer = 0x1133,
    /// Message Access Profile
    MessageAccessProfile = 0x1134,
    /// PnP information
    PnpInformation = 0x1200,
    /// Generic networking
    GenericNetworking = 0x1201,
    /// Generic file transfer
    GenericFileTransfer = 0x1202,
    /// Generic audio
    GenericAudio = 0x1203,
    /// Generic telephony
    GenericTelephony = 0x1204,
    /// Video source
    VideoSource = 0x1303,
    /// Video sink
    VideoSink = 0x1304,
    /// Video Distribution Profile
    VideoDistribution = 0x1305,
    /// Health Device Profile
    Hdp = 0x1400,
    /// Health device source
    HdpSource = 0x1401,
    /// Health device sink
    HdpSink = 0x1402,
}

impl ClassId {
    /// The short-form UUID of this class
    #[must_use]
    pub const fn to_uuid(self) -> Uuid {
        Uuid::Uuid16(self as u16)
    }

    /// Human-readable class name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sdp => "SDP",
            Self::Udp => "UDP",
            Self::Rfcomm => "RFCOMM",
            Self::Tcp => "TCP",
            Self::TcsBin => "TCS-BIN",
            Self::Att => "ATT",
            Self::Obex => "OBEX",
            Self::Ip => "IP",
            Self::Bnep => "BNEP",
            Self::Hidp => "HIDP",
            Self::Avctp => "AVCTP",
            Self::Avdtp => "AVDTP",
            Self::L2cap => "L2CAP",
            Self::ServiceDiscoveryServer => "Service Discovery Server",
            Self::BrowseGroupDescriptor => "Browse Group Descriptor",
            Self::PublicBrowseRoot => "Public Browse Root",
            Self::SerialPort => "Serial Port",
            Self::LanAccessPpp => "LAN Access Using PPP",
            Self::DialupNetworking => "Dialup Networking",
            Self::IrMcSync => "IrMC Sync",
            Self::ObexObjectPush => "OBEX Object Push",
            Self::ObexFileTransfer => "OBEX File Transfer",
            Self::Headset => "Headset",
            Self::CordlessTelephony => "Cordless Telephony",
            Self::AudioSource => "Audio Source",
            Self::AudioSink => "Audio Sink",
            Self::AvRemoteControlTarget => "A/V Remote Control Target",
            Self::AdvancedAudioDistribution => "Advanced Audio Distribution",
            Self::AvRemoteControl => "A/V Remote Control",
            Self::AvRemoteControlController => "A/V Remote Control Controller",
            Self::Intercom => "Intercom",
            Self::Fax => "Fax",
            Self::HeadsetAudioGateway => "Headset Audio Gateway",
            Self::Panu => "PANU",
            Self::Nap => "NAP",
            Self::Gn => "GN",
            Self::Handsfree => "Hands-Free",
            Self::HandsfreeAudioGateway => "Hands-Free Audio Gateway",
            Self::HumanInterfaceDevice => "Human Interface Device",
            Self::SimAccess => "SIM Access",
            Self::PhonebookAccessPce => "Phonebook Access PCE",
            Self::PhonebookAccessPse => "Phonebook Access PSE",
            Self::PhonebookAccess => "Phonebook Access",
            Self::HeadsetHs => "Headset HS",
            Self::MessageAccessServer => "Message Access Server",
            Self::MessageNotificationServer => "Message Notification Server",
            Self::MessageAccessProfile => "Message Access",
            Self::PnpInformation => "PnP Information",
            Self::GenericNetworking => "Generic Networking",
            Self::GenericFileTransfer => "Generic File Transfer",
            Self::GenericAudio => "Generic Audio",
            Self::GenericTelephony => "Generic Telephony",
            Self::VideoSource => "Video Source",
            Self::VideoSink => "Video Sink",
            Self::VideoDistribution => "Video Distribution",
            Self::Hdp => "HDP",
            Self::HdpSource => "HDP Source",
            Self::HdpSink => "HDP Sink",
        }
    }
}

impl From<ClassId> for Uuid {
    fn from(class: ClassId) -> Self {
        class.to_uuid()
    }
}

/// A profile the service conforms to, with its version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileDescriptor {
    /// Profile UUID
    pub uuid: Uuid,
    /// Profile version (major byte, minor byte)
    pub version: u16,
}

/// A protocol stack that reaches the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolDescriptor {
    /// Protocol UUID
    pub uuid: Uuid,
    /// Protocol-specific parameters, kept verbatim (e.g. the L2CAP PSM)
    pub parameters: ElementSeq,
}

/// A service record retrieved from the remote device.
///
/// Created from a search result handle, populated once by the attribute
/// responses and immutable afterwards.
#[derive(Debug)]
pub struct Service {
    handle: u32,
    classes: Vec<Uuid, MAX_SERVICE_DESCRIPTORS>,
    profiles: Vec<ProfileDescriptor, MAX_SERVICE_DESCRIPTORS>,
    protocols: Vec<ProtocolDescriptor, MAX_SERVICE_DESCRIPTORS>,
    attributes: FnvIndexMap<u16, DataElement, MAX_SERVICE_ATTRIBUTES>,
}

impl Service {
    /// Create an empty record for a search result handle
    #[must_use]
    pub fn new(handle: u32) -> Self {
        Self {
            handle,
            classes: Vec::new(),
            profiles: Vec::new(),
            protocols: Vec::new(),
            attributes: FnvIndexMap::new(),
        }
    }

    /// The 32-bit record handle
    #[must_use]
    pub const fn handle(&self) -> u32 {
        self.handle
    }

    /// The service classes this record claims
    #[must_use]
    pub fn classes(&self) -> &[Uuid] {
        &self.classes
    }

    /// The profile descriptors of this record
    #[must_use]
    pub fn profiles(&self) -> &[ProfileDescriptor] {
        &self.profiles
    }

    /// The protocol descriptors of this record
    #[must_use]
    pub fn protocols(&self) -> &[ProtocolDescriptor] {
        &self.protocols
    }

    /// Whether the record claims the given service class
    #[must_use]
    pub fn has_class(&self, uuid: Uuid) -> bool {
        self.classes.iter().any(|class| *class == uuid)
    }

    /// The profile descriptor for the given profile UUID
    #[must_use]
    pub fn profile(&self, uuid: Uuid) -> Option<&ProfileDescriptor> {
        self.profiles.iter().find(|profile| profile.uuid == uuid)
    }

    /// The protocol descriptor for the given protocol UUID
    #[must_use]
    pub fn protocol(&self, uuid: Uuid) -> Option<&ProtocolDescriptor> {
        self.protocols.iter().find(|protocol| protocol.uuid == uuid)
    }

    /// A raw attribute value by ID
    #[must_use]
    pub fn attribute(&self, id: u16) -> Option<&DataElement> {
        self.attributes.get(&id)
    }

    /// Number of stored attributes
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Store one attribute from an attribute response.
    ///
    /// Universal attributes are additionally decoded into the record
    /// structure (handle, classes, profiles, protocols). Duplicate IDs
    /// use first-wins semantics: a repeated ID within a response
    /// sequence is ignored.
    ///
    /// # Errors
    /// Returns `BufferTooSmall` when the attribute table is full
    pub fn ingest_attribute(&mut self, id: u16, value: DataElement) -> Result<(), SdpError> {
        if self.attributes.contains_key(&id) {
            return Ok(());
        }

        if self.decode_universal(id, &value).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("malformed universal attribute 0x{:04x}", id);
        }

        self.attributes
            .insert(id, value)
            .map_err(|_| SdpError::BufferTooSmall)?;
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn decode_universal(&mut self, id: u16, value: &DataElement) -> Result<(), CodecError> {
        match AttributeId::from_u16(id) {
            Some(AttributeId::ServiceRecordHandle) => {
                if let Some(handle) = value.as_unsigned() {
                    self.handle = handle as u32;
                }
            }
            Some(AttributeId::ServiceClassIdList) => {
                if let DataElement::Sequence(seq) = value {
                    let reader = seq.reader();
                    while reader.available() > 0 {
                        let uuid = reader.pop_uuid()?;
                        if self.classes.push(uuid).is_err() {
                            break;
                        }
                    }
                }
            }
            Some(AttributeId::BluetoothProfileDescriptorList) => {
                if let DataElement::Sequence(seq) = value {
                    let reader = seq.reader();
                    while reader.available() > 0 {
                        let entry = reader.pop_sequence()?;
                        let uuid = entry.pop_uuid()?;
                        let version = entry.pop_uint16()?;
                        if self.profiles.push(ProfileDescriptor { uuid, version }).is_err() {
                            break;
                        }
                    }
                }
            }
            Some(AttributeId::ProtocolDescriptorList) => {
                if let DataElement::Sequence(seq) = value {
                    let reader = seq.reader();
                    while reader.available() > 0 {
                        let entry = reader.pop_sequence()?;
                        let uuid = entry.pop_uuid()?;
                        let parameters = ElementSeq::from_slice(entry.pop_remaining())?;
                        if self
                            .protocols
                            .push(ProtocolDescriptor { uuid, parameters })
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}
