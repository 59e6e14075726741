//! SDP Data Element codec
//!
//! Data Elements are the self-describing tagged values SDP payloads are
//! built from. Every element starts with a descriptor byte: the high
//! five bits select the element type, the low three bits a size index.
//! Size indices 0..=4 denote fixed sizes of 1, 2, 4, 8 and 16 bytes;
//! indices 5, 6 and 7 mean a u8, u16 or u32 big-endian length follows
//! the descriptor. NIL is the one exception: its descriptor reads as
//! size index 0 but no payload follows.
//!
//! All multi-byte integers are big-endian, and UUIDs are serialized in
//! big-endian order.
//!
//! [`ElementReader`] parses a borrowed payload non-destructively (the
//! read offset is interior-mutable so a shared record view can be
//! re-read), [`ElementWriter`] appends to a bounded buffer, and
//! [`DataElement`] is the owned decoded form. Sequences and alternatives
//! keep their encoded inner payload verbatim in an [`ElementSeq`] so
//! protocol-specific parameters can be interpreted later.

use core::cell::Cell;

use heapless::Vec;

use crate::constants::{MAX_SEQUENCE_LENGTH, MAX_TEXT_LENGTH};
use crate::uuid::Uuid;

/// Data element type codes, as stored in the high five bits of a
/// descriptor byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ElementType {
    /// Nil (null value, no payload)
    Nil = 0x00,
    /// Unsigned integer
    Uint = 0x08,
    /// Signed integer
    Int = 0x10,
    /// UUID
    Uuid = 0x18,
    /// UTF-8 text string
    Text = 0x20,
    /// Boolean
    Bool = 0x28,
    /// Data element sequence
    Sequence = 0x30,
    /// Data element alternative
    Alternative = 0x38,
    /// URL
    Url = 0x40,
}

impl ElementType {
    /// Extract the type code from a descriptor byte
    #[must_use]
    pub const fn from_descriptor(descriptor: u8) -> Option<Self> {
        match descriptor & 0xF8 {
            0x00 => Some(Self::Nil),
            0x08 => Some(Self::Uint),
            0x10 => Some(Self::Int),
            0x18 => Some(Self::Uuid),
            0x20 => Some(Self::Text),
            0x28 => Some(Self::Bool),
            0x30 => Some(Self::Sequence),
            0x38 => Some(Self::Alternative),
            0x40 => Some(Self::Url),
            _ => None,
        }
    }
}

/// Data element codec errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// The destination buffer cannot hold the encoded value
    Overflow,
    /// The declared length exceeds the available payload
    Truncated,
    /// The descriptor does not match the requested element category
    UnexpectedType,
    /// The size index is invalid for the element type
    InvalidSize,
    /// The descriptor byte carries an unknown type code
    InvalidDescriptor,
}

/// Number of length-prefix bytes a counted element of `size` bytes needs
const fn length_prefix_size(size: usize) -> usize {
    if size <= 0xFF {
        1
    } else if size <= 0xFFFF {
        2
    } else {
        4
    }
}

/// Non-destructive reader over an encoded element payload.
///
/// The read offset is interior-mutable so shared record views can be
/// parsed through `&self`. A read that would run past the declared
/// payload forces the offset to the end of the view and reports
/// [`CodecError::Truncated`], so enclosing `while available()` loops
/// terminate.
#[derive(Debug)]
pub struct ElementReader<'a> {
    data: &'a [u8],
    position: Cell<usize>,
}

impl<'a> ElementReader<'a> {
    /// Create a reader over an encoded payload
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: Cell::new(0),
        }
    }

    /// Number of unread bytes left in the view
    #[must_use]
    pub fn available(&self) -> usize {
        self.data.len() - self.position.get()
    }

    /// Current read offset
    #[must_use]
    pub fn position(&self) -> usize {
        self.position.get()
    }

    /// Reset the read offset to the start of the view
    pub fn rewind(&self) {
        self.position.set(0);
    }

    fn take(&self, count: usize) -> Result<&'a [u8], CodecError> {
        let position = self.position.get();
        if self.data.len() - position < count {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "truncated element payload: need {} bytes, {} available",
                count,
                self.data.len() - position
            );
            self.position.set(self.data.len());
            return Err(CodecError::Truncated);
        }
        self.position.set(position + count);
        Ok(&self.data[position..position + count])
    }

    /// Read a raw byte
    ///
    /// # Errors
    /// Returns `Truncated` if the view is exhausted
    pub fn pop_u8(&self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    /// Read a raw big-endian u16
    ///
    /// # Errors
    /// Returns `Truncated` if the view is exhausted
    pub fn pop_u16(&self) -> Result<u16, CodecError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read a raw big-endian u32
    ///
    /// # Errors
    /// Returns `Truncated` if the view is exhausted
    pub fn pop_u32(&self) -> Result<u32, CodecError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a raw big-endian u64
    ///
    /// # Errors
    /// Returns `Truncated` if the view is exhausted
    pub fn pop_u64(&self) -> Result<u64, CodecError> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(raw))
    }

    /// Read `count` raw bytes
    ///
    /// # Errors
    /// Returns `Truncated` if fewer than `count` bytes remain
    pub fn pop_bytes(&self, count: usize) -> Result<&'a [u8], CodecError> {
        self.take(count)
    }

    /// Read all remaining bytes, leaving the view exhausted
    #[must_use]
    pub fn pop_remaining(&self) -> &'a [u8] {
        let position = self.position.get();
        self.position.set(self.data.len());
        &self.data[position..]
    }

    /// Read a descriptor byte and resolve the payload size it declares.
    ///
    /// NIL is special-cased to a zero payload size.
    ///
    /// # Errors
    /// Returns `InvalidDescriptor` for unknown type codes and
    /// `Truncated` if the length bytes run past the view
    pub fn pop_descriptor(&self) -> Result<(ElementType, usize), CodecError> {
        let descriptor = self.pop_u8()?;
        let element_type =
            ElementType::from_descriptor(descriptor).ok_or(CodecError::InvalidDescriptor)?;

        let size = match descriptor & 0x07 {
            0 => 1,
            1 => 2,
            2 => 4,
            3 => 8,
            4 => 16,
            5 => self.pop_u8()? as usize,
            6 => self.pop_u16()? as usize,
            _ => self.pop_u32()? as usize,
        };

        if element_type == ElementType::Nil {
            Ok((element_type, 0))
        } else {
            Ok((element_type, size))
        }
    }

    /// Read a descriptored unsigned 8-bit integer
    ///
    /// # Errors
    /// Returns `UnexpectedType` unless the descriptor is a 1-byte UINT
    pub fn pop_uint8(&self) -> Result<u8, CodecError> {
        self.expect(ElementType::Uint, 1)?;
        self.pop_u8()
    }

    /// Read a descriptored unsigned 16-bit integer
    ///
    /// # Errors
    /// Returns `UnexpectedType` unless the descriptor is a 2-byte UINT
    pub fn pop_uint16(&self) -> Result<u16, CodecError> {
        self.expect(ElementType::Uint, 2)?;
        self.pop_u16()
    }

    /// Read a descriptored unsigned 32-bit integer
    ///
    /// # Errors
    /// Returns `UnexpectedType` unless the descriptor is a 4-byte UINT
    pub fn pop_uint32(&self) -> Result<u32, CodecError> {
        self.expect(ElementType::Uint, 4)?;
        self.pop_u32()
    }

    /// Read a descriptored boolean
    ///
    /// # Errors
    /// Returns `UnexpectedType` unless the descriptor is a 1-byte BOOL
    pub fn pop_bool(&self) -> Result<bool, CodecError> {
        self.expect(ElementType::Bool, 1)?;
        Ok(self.pop_u8()? != 0)
    }

    /// Read a descriptored UUID in 16, 32 or 128-bit wire form
    ///
    /// # Errors
    /// Returns `UnexpectedType` for non-UUID descriptors and
    /// `InvalidSize` for sizes other than 2, 4 or 16
    pub fn pop_uuid(&self) -> Result<Uuid, CodecError> {
        let (element_type, size) = self.pop_descriptor()?;
        if element_type != ElementType::Uuid {
            return Err(CodecError::UnexpectedType);
        }
        match size {
            2 => Ok(Uuid::Uuid16(self.pop_u16()?)),
            4 => Ok(Uuid::Uuid32(self.pop_u32()?)),
            16 => {
                let bytes = self.take(16)?;
                let mut raw = [0u8; 16];
                raw.copy_from_slice(bytes);
                Ok(Uuid::from_bytes(raw))
            }
            _ => Err(CodecError::InvalidSize),
        }
    }

    /// Read a descriptored text or URL string payload
    ///
    /// # Errors
    /// Returns `UnexpectedType` unless the descriptor is TEXT or URL
    pub fn pop_text(&self) -> Result<&'a [u8], CodecError> {
        let (element_type, size) = self.pop_descriptor()?;
        if element_type != ElementType::Text && element_type != ElementType::Url {
            return Err(CodecError::UnexpectedType);
        }
        self.take(size)
    }

    /// Read a descriptored sequence and return a sub-reader windowed to
    /// exactly the declared inner length. The parent reader advances
    /// past the sequence either way; a non-sequence element is skipped
    /// and reported as `UnexpectedType`.
    ///
    /// # Errors
    /// Returns `UnexpectedType` for non-SEQ descriptors and `Truncated`
    /// if the declared length runs past the view
    pub fn pop_sequence(&self) -> Result<ElementReader<'a>, CodecError> {
        let (element_type, size) = self.pop_descriptor()?;
        let body = self.take(size)?;
        if element_type != ElementType::Sequence {
            return Err(CodecError::UnexpectedType);
        }
        Ok(ElementReader::new(body))
    }

    /// Decode one complete element into its owned form
    ///
    /// # Errors
    /// Returns a codec error if the element is malformed or an owned
    /// buffer limit is exceeded
    pub fn pop_element(&self) -> Result<DataElement, CodecError> {
        let (element_type, size) = self.pop_descriptor()?;

        match element_type {
            ElementType::Nil => Ok(DataElement::Nil),
            ElementType::Bool => {
                if size != 1 {
                    return Err(CodecError::InvalidSize);
                }
                Ok(DataElement::Bool(self.pop_u8()? != 0))
            }
            ElementType::Uint => match size {
                1 => Ok(DataElement::Uint8(self.pop_u8()?)),
                2 => Ok(DataElement::Uint16(self.pop_u16()?)),
                4 => Ok(DataElement::Uint32(self.pop_u32()?)),
                8 => Ok(DataElement::Uint64(self.pop_u64()?)),
                _ => Err(CodecError::InvalidSize),
            },
            ElementType::Int => match size {
                1 => Ok(DataElement::Int8(self.pop_u8()? as i8)),
                2 => Ok(DataElement::Int16(self.pop_u16()? as i16)),
                4 => Ok(DataElement::Int32(self.pop_u32()? as i32)),
                8 => Ok(DataElement::Int64(self.pop_u64()? as i64)),
                _ => Err(CodecError::InvalidSize),
            },
            ElementType::Uuid => match size {
                2 => Ok(DataElement::Uuid(Uuid::Uuid16(self.pop_u16()?))),
                4 => Ok(DataElement::Uuid(Uuid::Uuid32(self.pop_u32()?))),
                16 => {
                    let bytes = self.take(16)?;
                    let mut raw = [0u8; 16];
                    raw.copy_from_slice(bytes);
                    Ok(DataElement::Uuid(Uuid::from_bytes(raw)))
                }
                _ => Err(CodecError::InvalidSize),
            },
            ElementType::Text => {
                let bytes = self.take(size)?;
                let text = Vec::from_slice(bytes).map_err(|()| CodecError::Overflow)?;
                Ok(DataElement::Text(text))
            }
            ElementType::Url => {
                let bytes = self.take(size)?;
                let url = Vec::from_slice(bytes).map_err(|()| CodecError::Overflow)?;
                Ok(DataElement::Url(url))
            }
            ElementType::Sequence => {
                let body = self.take(size)?;
                Ok(DataElement::Sequence(ElementSeq::from_slice(body)?))
            }
            ElementType::Alternative => {
                let body = self.take(size)?;
                Ok(DataElement::Alternative(ElementSeq::from_slice(body)?))
            }
        }
    }

    fn expect(&self, expected: ElementType, expected_size: usize) -> Result<(), CodecError> {
        let (element_type, size) = self.pop_descriptor()?;
        if element_type != expected {
            return Err(CodecError::UnexpectedType);
        }
        if size != expected_size {
            return Err(CodecError::InvalidSize);
        }
        Ok(())
    }
}

/// Appends raw values and descriptored elements to a bounded buffer.
pub struct ElementWriter<'a, const N: usize> {
    buffer: &'a mut Vec<u8, N>,
}

impl<'a, const N: usize> ElementWriter<'a, N> {
    /// Create a writer appending to `buffer`
    pub fn new(buffer: &'a mut Vec<u8, N>) -> Self {
        Self { buffer }
    }

    /// Number of bytes written so far (including prior buffer contents)
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append a raw byte
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    pub fn put_u8(&mut self, value: u8) -> Result<(), CodecError> {
        self.buffer.push(value).map_err(|_| CodecError::Overflow)
    }

    /// Append a raw big-endian u16
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    pub fn put_u16(&mut self, value: u16) -> Result<(), CodecError> {
        self.put_bytes(&value.to_be_bytes())
    }

    /// Append a raw big-endian u32
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    pub fn put_u32(&mut self, value: u32) -> Result<(), CodecError> {
        self.put_bytes(&value.to_be_bytes())
    }

    /// Append a raw big-endian u64
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    pub fn put_u64(&mut self, value: u64) -> Result<(), CodecError> {
        self.put_bytes(&value.to_be_bytes())
    }

    /// Append raw bytes
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.buffer
            .extend_from_slice(bytes)
            .map_err(|()| CodecError::Overflow)
    }

    /// Append a descriptor byte (plus length bytes for counted types)
    /// for an element of `element_type` with a `size`-byte payload.
    ///
    /// The size index is derived from the payload width for fixed-size
    /// types; counted types get the smallest length prefix that fits.
    ///
    /// # Errors
    /// Returns `InvalidSize` if `size` is not valid for the type
    #[allow(clippy::cast_possible_truncation)]
    pub fn push_descriptor(
        &mut self,
        element_type: ElementType,
        size: usize,
    ) -> Result<(), CodecError> {
        let type_bits = element_type as u8;
        match element_type {
            ElementType::Nil => {
                if size != 0 {
                    return Err(CodecError::InvalidSize);
                }
                self.put_u8(type_bits)
            }
            ElementType::Bool => {
                if size != 1 {
                    return Err(CodecError::InvalidSize);
                }
                self.put_u8(type_bits)
            }
            ElementType::Uint | ElementType::Int => {
                let index = match size {
                    1 => 0,
                    2 => 1,
                    4 => 2,
                    8 => 3,
                    _ => return Err(CodecError::InvalidSize),
                };
                self.put_u8(type_bits | index)
            }
            ElementType::Uuid => {
                let index = match size {
                    2 => 1,
                    4 => 2,
                    16 => 4,
                    _ => return Err(CodecError::InvalidSize),
                };
                self.put_u8(type_bits | index)
            }
            ElementType::Text
            | ElementType::Sequence
            | ElementType::Alternative
            | ElementType::Url => {
                if size <= 0xFF {
                    self.put_u8(type_bits | 5)?;
                    self.put_u8(size as u8)
                } else if size <= 0xFFFF {
                    self.put_u8(type_bits | 6)?;
                    self.put_u16(size as u16)
                } else {
                    self.put_u8(type_bits | 7)?;
                    self.put_u32(size as u32)
                }
            }
        }
    }

    /// Append a descriptored NIL element (no payload)
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    pub fn push_nil(&mut self) -> Result<(), CodecError> {
        self.push_descriptor(ElementType::Nil, 0)
    }

    /// Append a descriptored boolean
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    pub fn push_bool(&mut self, value: bool) -> Result<(), CodecError> {
        self.push_descriptor(ElementType::Bool, 1)?;
        self.put_u8(u8::from(value))
    }

    /// Append a descriptored unsigned 8-bit integer
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    pub fn push_uint8(&mut self, value: u8) -> Result<(), CodecError> {
        self.push_descriptor(ElementType::Uint, 1)?;
        self.put_u8(value)
    }

    /// Append a descriptored unsigned 16-bit integer
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    pub fn push_uint16(&mut self, value: u16) -> Result<(), CodecError> {
        self.push_descriptor(ElementType::Uint, 2)?;
        self.put_u16(value)
    }

    /// Append a descriptored unsigned 32-bit integer
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    pub fn push_uint32(&mut self, value: u32) -> Result<(), CodecError> {
        self.push_descriptor(ElementType::Uint, 4)?;
        self.put_u32(value)
    }

    /// Append a descriptored signed 8-bit integer
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    #[allow(clippy::cast_sign_loss)]
    pub fn push_int8(&mut self, value: i8) -> Result<(), CodecError> {
        self.push_descriptor(ElementType::Int, 1)?;
        self.put_u8(value as u8)
    }

    /// Append a descriptored signed 16-bit integer
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    #[allow(clippy::cast_sign_loss)]
    pub fn push_int16(&mut self, value: i16) -> Result<(), CodecError> {
        self.push_descriptor(ElementType::Int, 2)?;
        self.put_u16(value as u16)
    }

    /// Append a descriptored signed 32-bit integer
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    #[allow(clippy::cast_sign_loss)]
    pub fn push_int32(&mut self, value: i32) -> Result<(), CodecError> {
        self.push_descriptor(ElementType::Int, 4)?;
        self.put_u32(value as u32)
    }

    /// Append a descriptored UUID in its natural wire form
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    pub fn push_uuid(&mut self, uuid: &Uuid) -> Result<(), CodecError> {
        self.push_descriptor(ElementType::Uuid, uuid.size())?;
        match uuid {
            Uuid::Uuid16(value) => self.put_u16(*value),
            Uuid::Uuid32(value) => self.put_u32(*value),
            Uuid::Uuid128(bytes) => self.put_bytes(bytes),
        }
    }

    /// Append a descriptored UTF-8 text element
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    pub fn push_text(&mut self, text: &str) -> Result<(), CodecError> {
        self.push_descriptor(ElementType::Text, text.len())?;
        self.put_bytes(text.as_bytes())
    }

    /// Append a descriptored URL element
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    pub fn push_url(&mut self, url: &str) -> Result<(), CodecError> {
        self.push_descriptor(ElementType::Url, url.len())?;
        self.put_bytes(url.as_bytes())
    }

    /// Append a descriptored sequence of UUIDs.
    ///
    /// The body length is pre-measured so the length prefix is written
    /// in a single pass.
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    pub fn push_uuid_sequence(&mut self, uuids: &[Uuid]) -> Result<(), CodecError> {
        let body: usize = uuids.iter().map(|uuid| 1 + uuid.size()).sum();
        self.push_descriptor(ElementType::Sequence, body)?;
        for uuid in uuids {
            self.push_uuid(uuid)?;
        }
        Ok(())
    }

    /// Append an owned element in encoded form
    ///
    /// # Errors
    /// Returns `Overflow` if the buffer is full
    pub fn push_element(&mut self, element: &DataElement) -> Result<(), CodecError> {
        match element {
            DataElement::Nil => self.push_nil(),
            DataElement::Bool(value) => self.push_bool(*value),
            DataElement::Uint8(value) => self.push_uint8(*value),
            DataElement::Uint16(value) => self.push_uint16(*value),
            DataElement::Uint32(value) => self.push_uint32(*value),
            DataElement::Uint64(value) => {
                self.push_descriptor(ElementType::Uint, 8)?;
                self.put_u64(*value)
            }
            DataElement::Int8(value) => self.push_int8(*value),
            DataElement::Int16(value) => self.push_int16(*value),
            DataElement::Int32(value) => self.push_int32(*value),
            #[allow(clippy::cast_sign_loss)]
            DataElement::Int64(value) => {
                self.push_descriptor(ElementType::Int, 8)?;
                self.put_u64(*value as u64)
            }
            DataElement::Uuid(uuid) => self.push_uuid(uuid),
            DataElement::Text(text) => {
                self.push_descriptor(ElementType::Text, text.len())?;
                self.put_bytes(text)
            }
            DataElement::Url(url) => {
                self.push_descriptor(ElementType::Url, url.len())?;
                self.put_bytes(url)
            }
            DataElement::Sequence(seq) => {
                self.push_descriptor(ElementType::Sequence, seq.len())?;
                self.put_bytes(seq.as_slice())
            }
            DataElement::Alternative(seq) => {
                self.push_descriptor(ElementType::Alternative, seq.len())?;
                self.put_bytes(seq.as_slice())
            }
        }
    }
}

/// The encoded inner payload of a sequence or alternative element,
/// kept verbatim for later interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementSeq {
    bytes: Vec<u8, MAX_SEQUENCE_LENGTH>,
}

impl ElementSeq {
    /// Create an empty sequence payload
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Copy an encoded payload into an owned sequence
    ///
    /// # Errors
    /// Returns `Overflow` if the payload exceeds the owned capacity
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            bytes: Vec::from_slice(bytes).map_err(|()| CodecError::Overflow)?,
        })
    }

    /// The encoded payload bytes
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Encoded payload length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// A reader over the encoded payload
    #[must_use]
    pub fn reader(&self) -> ElementReader<'_> {
        ElementReader::new(&self.bytes)
    }

    /// A writer appending elements to the payload
    pub fn writer(&mut self) -> ElementWriter<'_, MAX_SEQUENCE_LENGTH> {
        ElementWriter::new(&mut self.bytes)
    }
}

/// An owned, decoded SDP data element.
///
/// Sequence and alternative variants hold their encoded inner payload
/// verbatim; use [`ElementSeq::reader`] to walk the nested elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataElement {
    /// Nil (null value)
    Nil,
    /// Boolean value
    Bool(bool),
    /// Unsigned 8-bit integer
    Uint8(u8),
    /// Unsigned 16-bit integer
    Uint16(u16),
    /// Unsigned 32-bit integer
    Uint32(u32),
    /// Unsigned 64-bit integer
    Uint64(u64),
    /// Signed 8-bit integer
    Int8(i8),
    /// Signed 16-bit integer
    Int16(i16),
    /// Signed 32-bit integer
    Int32(i32),
    /// Signed 64-bit integer
    Int64(i64),
    /// UUID
    Uuid(Uuid),
    /// UTF-8 text string
    Text(Vec<u8, MAX_TEXT_LENGTH>),
    /// URL string
    Url(Vec<u8, MAX_TEXT_LENGTH>),
    /// Data element sequence (encoded payload)
    Sequence(ElementSeq),
    /// Data element alternative (encoded payload)
    Alternative(ElementSeq),
}

impl DataElement {
    /// The element type this value encodes as
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        match self {
            Self::Nil => ElementType::Nil,
            Self::Bool(_) => ElementType::Bool,
            Self::Uint8(_) | Self::Uint16(_) | Self::Uint32(_) | Self::Uint64(_) => {
                ElementType::Uint
            }
            Self::Int8(_) | Self::Int16(_) | Self::Int32(_) | Self::Int64(_) => ElementType::Int,
            Self::Uuid(_) => ElementType::Uuid,
            Self::Text(_) => ElementType::Text,
            Self::Url(_) => ElementType::Url,
            Self::Sequence(_) => ElementType::Sequence,
            Self::Alternative(_) => ElementType::Alternative,
        }
    }

    /// Total encoded size including descriptor and length bytes
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        match self {
            Self::Nil => 1,
            Self::Bool(_) | Self::Uint8(_) | Self::Int8(_) => 2,
            Self::Uint16(_) | Self::Int16(_) => 3,
            Self::Uint32(_) | Self::Int32(_) => 5,
            Self::Uint64(_) | Self::Int64(_) => 9,
            Self::Uuid(uuid) => 1 + uuid.size(),
            Self::Text(bytes) | Self::Url(bytes) => {
                1 + length_prefix_size(bytes.len()) + bytes.len()
            }
            Self::Sequence(seq) | Self::Alternative(seq) => {
                1 + length_prefix_size(seq.len()) + seq.len()
            }
        }
    }

    /// The value widened to u64 if this is an unsigned integer
    #[must_use]
    pub const fn as_unsigned(&self) -> Option<u64> {
        match self {
            Self::Uint8(value) => Some(*value as u64),
            Self::Uint16(value) => Some(*value as u64),
            Self::Uint32(value) => Some(*value as u64),
            Self::Uint64(value) => Some(*value),
            _ => None,
        }
    }

    /// The UUID value if this is a UUID element
    #[must_use]
    pub const fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(uuid) => Some(*uuid),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(element: &DataElement) -> Vec<u8, 64> {
        let mut buffer = Vec::new();
        ElementWriter::new(&mut buffer).push_element(element).unwrap();
        buffer
    }

    #[test]
    fn test_short_uuid_sequence_wire_bytes() {
        let mut buffer: Vec<u8, 16> = Vec::new();
        let mut writer = ElementWriter::new(&mut buffer);
        writer
            .push_uuid_sequence(&[Uuid::Uuid16(0x110A), Uuid::Uuid16(0x110B)])
            .unwrap();

        assert_eq!(
            buffer.as_slice(),
            &[0x35, 0x06, 0x19, 0x11, 0x0A, 0x19, 0x11, 0x0B]
        );

        let reader = ElementReader::new(&buffer);
        let seq = reader.pop_sequence().unwrap();
        assert_eq!(seq.pop_uuid().unwrap(), Uuid::Uuid16(0x110A));
        assert_eq!(seq.pop_uuid().unwrap(), Uuid::Uuid16(0x110B));
        assert_eq!(seq.available(), 0);
    }

    #[test]
    fn test_element_round_trip() {
        let mut seq = ElementSeq::new();
        seq.writer().push_uint16(0x0019).unwrap();

        let elements = [
            DataElement::Nil,
            DataElement::Bool(true),
            DataElement::Uint8(0x42),
            DataElement::Uint16(0x1234),
            DataElement::Uint32(0xDEAD_BEEF),
            DataElement::Int8(-5),
            DataElement::Int16(-1000),
            DataElement::Int32(-100_000),
            DataElement::Uuid(Uuid::Uuid16(0x110B)),
            DataElement::Uuid(Uuid::Uuid32(0x0001_0002)),
            DataElement::Uuid(Uuid::Uuid128([0xAB; 16])),
            DataElement::Text(Vec::from_slice(b"audio sink").unwrap()),
            DataElement::Url(Vec::from_slice(b"http://example.com").unwrap()),
            DataElement::Sequence(seq.clone()),
            DataElement::Alternative(seq),
        ];

        for element in &elements {
            let encoded = encode(element);
            assert_eq!(encoded.len(), element.encoded_size());

            let reader = ElementReader::new(&encoded);
            let decoded = reader.pop_element().unwrap();
            assert_eq!(&decoded, element);
            assert_eq!(reader.available(), 0);
        }
    }

    #[test]
    fn test_nil_has_no_payload() {
        let encoded = encode(&DataElement::Nil);
        assert_eq!(encoded.as_slice(), &[0x00]);

        let reader = ElementReader::new(&encoded);
        let (element_type, size) = reader.pop_descriptor().unwrap();
        assert_eq!(element_type, ElementType::Nil);
        assert_eq!(size, 0);
        assert_eq!(reader.available(), 0);
    }

    #[test]
    fn test_sequence_length_prefix_selection() {
        let mut buffer: Vec<u8, 8> = Vec::new();
        let mut writer = ElementWriter::new(&mut buffer);

        writer.push_descriptor(ElementType::Sequence, 0xFF).unwrap();
        assert_eq!(buffer.as_slice(), &[0x35, 0xFF]);

        buffer.clear();
        let mut writer = ElementWriter::new(&mut buffer);
        writer.push_descriptor(ElementType::Sequence, 0x100).unwrap();
        assert_eq!(buffer.as_slice(), &[0x36, 0x01, 0x00]);

        buffer.clear();
        let mut writer = ElementWriter::new(&mut buffer);
        writer
            .push_descriptor(ElementType::Sequence, 0x10000)
            .unwrap();
        assert_eq!(buffer.as_slice(), &[0x37, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_uuid_wire_order_is_big_endian() {
        let encoded = encode(&DataElement::Uuid(Uuid::Uuid16(0x110B)));
        assert_eq!(encoded.as_slice(), &[0x19, 0x11, 0x0B]);

        let mut long = [0u8; 16];
        long[0] = 0x12;
        long[1] = 0x34;
        let encoded = encode(&DataElement::Uuid(Uuid::Uuid128(long)));
        assert_eq!(encoded[0], 0x1C);
        assert_eq!(&encoded[1..3], &[0x12, 0x34]);
    }

    #[test]
    fn test_truncated_read_forces_end() {
        // Sequence claims 8 bytes but only 2 follow.
        let data = [0x35, 0x08, 0x19, 0x11];
        let reader = ElementReader::new(&data);

        assert_eq!(reader.pop_sequence().unwrap_err(), CodecError::Truncated);
        assert_eq!(reader.available(), 0);
    }

    #[test]
    fn test_typed_pop_rejects_mismatched_descriptor() {
        // BOOL descriptor where a UINT is expected.
        let data = [0x28, 0x01];
        let reader = ElementReader::new(&data);
        assert_eq!(reader.pop_uint8().unwrap_err(), CodecError::UnexpectedType);

        // 2-byte UINT where a 4-byte UINT is expected.
        let data = [0x09, 0x12, 0x34];
        let reader = ElementReader::new(&data);
        assert_eq!(reader.pop_uint32().unwrap_err(), CodecError::InvalidSize);
    }

    #[test]
    fn test_non_sequence_element_is_skipped() {
        // A UINT16 followed by a UINT8; pop_sequence must skip the first
        // element entirely so the next pop sees the second one.
        let data = [0x09, 0x12, 0x34, 0x08, 0x55];
        let reader = ElementReader::new(&data);

        assert_eq!(
            reader.pop_sequence().unwrap_err(),
            CodecError::UnexpectedType
        );
        assert_eq!(reader.pop_uint8().unwrap(), 0x55);
    }

    #[test]
    fn test_shared_view_rewind() {
        let data = [0x09, 0x12, 0x34];
        let reader = ElementReader::new(&data);

        assert_eq!(reader.pop_uint16().unwrap(), 0x1234);
        reader.rewind();
        assert_eq!(reader.pop_uint16().unwrap(), 0x1234);
    }
}
