//! Wire-level layout of the binary element stream.
//!
//! Every element starts with a fixed 6-byte [`ElementHeader`]; array
//! payloads add a 4-byte [`ArrayHeader`]. Adding an element's size to the
//! end of its header yields the offset of the next element, so a frame can
//! be walked without any sentinel. All multi-byte fields are host-endian.

/// Discriminator stored in the low 3 bits of the header tag.
///
/// `Null` is an in-memory tombstone left behind by an override; it never
/// appears in a finalized stream. As an array *inner* type it marks an
/// opaque memory chunk instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ElementType {
    Int = 0,
    UInt = 1,
    Float = 2,
    Bool = 3,
    String = 4,
    Object = 5,
    Array = 6,
    Null = 7,
}

impl ElementType {
    /// Parse the low 3 bits of a packed tag.
    #[inline]
    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => ElementType::Int,
            1 => ElementType::UInt,
            2 => ElementType::Float,
            3 => ElementType::Bool,
            4 => ElementType::String,
            5 => ElementType::Object,
            6 => ElementType::Array,
            _ => ElementType::Null,
        }
    }

    /// Scalar kinds the conversion policy can interchange.
    #[inline]
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ElementType::Int | ElementType::UInt | ElementType::Float | ElementType::Bool
        )
    }
}

/// Highest string-table index the 13-bit name field can carry.
pub const MAX_NAME_INDEX: usize = 8191;

/// Highest element count the 29-bit array length field can carry.
pub const MAX_ARRAY_LEN: usize = (1 << 29) - 1;

/// The 6-byte tagged prefix of every element.
///
/// Layout: a host-endian `u16` packing `(type: low 3 bits, name index:
/// high 13 bits)` followed by a host-endian `u32` payload size. The size
/// excludes the header itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHeader {
    pub ty: ElementType,
    pub name: u16,
    pub size: u32,
}

impl ElementHeader {
    pub const LEN: usize = 6;

    #[must_use]
    pub fn encode(self) -> [u8; Self::LEN] {
        debug_assert!((self.name as usize) <= MAX_NAME_INDEX);
        let packed = (self.name << 3) | self.ty as u16;
        let mut out = [0u8; Self::LEN];
        out[..2].copy_from_slice(&packed.to_ne_bytes());
        out[2..].copy_from_slice(&self.size.to_ne_bytes());
        out
    }

    #[must_use]
    pub fn decode(bytes: &[u8]) -> Self {
        let packed = u16::from_ne_bytes([bytes[0], bytes[1]]);
        let size = u32::from_ne_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
        ElementHeader {
            ty: ElementType::from_bits(packed as u8),
            name: packed >> 3,
            size,
        }
    }

    /// Decode the header at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the header would escape the buffer (corrupted stream).
    #[must_use]
    pub fn read_at(buf: &[u8], offset: usize) -> Self {
        assert!(
            offset + Self::LEN <= buf.len(),
            "element header at {offset} escapes the stream"
        );
        Self::decode(&buf[offset..offset + Self::LEN])
    }

    pub fn write_at(self, buf: &mut [u8], offset: usize) {
        buf[offset..offset + Self::LEN].copy_from_slice(&self.encode());
    }

    /// Offset of the element that follows this one.
    #[inline]
    #[must_use]
    pub fn next_offset(self, offset: usize) -> usize {
        offset + Self::LEN + self.size as usize
    }
}

/// The 4-byte prefix of an array payload: a host-endian `u32` packing
/// `(inner type: low 3 bits, element count: high 29 bits)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayHeader {
    pub inner: ElementType,
    pub len: u32,
}

impl ArrayHeader {
    pub const LEN: usize = 4;

    #[must_use]
    pub fn encode(self) -> [u8; Self::LEN] {
        debug_assert!((self.len as usize) <= MAX_ARRAY_LEN);
        let packed = (self.len << 3) | self.inner as u32;
        packed.to_ne_bytes()
    }

    #[must_use]
    pub fn decode(bytes: &[u8]) -> Self {
        let packed = u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        ArrayHeader {
            inner: ElementType::from_bits(packed as u8),
            len: packed >> 3,
        }
    }

    /// Decode the array header at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the header would escape the buffer (corrupted stream).
    #[must_use]
    pub fn read_at(buf: &[u8], offset: usize) -> Self {
        assert!(
            offset + Self::LEN <= buf.len(),
            "array header at {offset} escapes the stream"
        );
        Self::decode(&buf[offset..offset + Self::LEN])
    }

    pub fn write_at(self, buf: &mut [u8], offset: usize) {
        buf[offset..offset + Self::LEN].copy_from_slice(&self.encode());
    }
}

/// Byte width of one element in a homogeneous array body.
#[inline]
#[must_use]
pub fn array_stride(inner: ElementType) -> usize {
    match inner {
        ElementType::Bool | ElementType::Null => 1,
        _ => 4,
    }
}

/// A scalar read off the wire, convertible to any scalar slot kind.
///
/// Conversions are lossy by design: numeric-to-numeric follows `as`-cast
/// semantics, bools map to 0/1, nonzero numerics map to `true`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i32),
    UInt(u32),
    Float(f32),
    Bool(bool),
}

impl Numeric {
    /// Decode the payload of a numeric element. Non-numeric element types
    /// yield `None`, which makes the caller skip the slot.
    #[must_use]
    pub fn decode(ty: ElementType, payload: &[u8]) -> Option<Numeric> {
        match ty {
            ElementType::Int => Some(Numeric::Int(i32::from_ne_bytes(four(payload)))),
            ElementType::UInt => Some(Numeric::UInt(u32::from_ne_bytes(four(payload)))),
            ElementType::Float => Some(Numeric::Float(f32::from_ne_bytes(four(payload)))),
            ElementType::Bool => Some(Numeric::Bool(payload[0] > 0)),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_i32(self) -> i32 {
        match self {
            Numeric::Int(v) => v,
            Numeric::UInt(v) => v as i32,
            Numeric::Float(v) => v as i32,
            Numeric::Bool(v) => i32::from(v),
        }
    }

    #[must_use]
    pub fn to_u32(self) -> u32 {
        match self {
            Numeric::Int(v) => v as u32,
            Numeric::UInt(v) => v,
            Numeric::Float(v) => v as u32,
            Numeric::Bool(v) => u32::from(v),
        }
    }

    #[must_use]
    pub fn to_f32(self) -> f32 {
        match self {
            Numeric::Int(v) => v as f32,
            Numeric::UInt(v) => v as f32,
            Numeric::Float(v) => v,
            Numeric::Bool(v) => f32::from(u8::from(v)),
        }
    }

    #[must_use]
    pub fn to_bool(self) -> bool {
        match self {
            Numeric::Int(v) => v != 0,
            Numeric::UInt(v) => v != 0,
            Numeric::Float(v) => v != 0.0,
            Numeric::Bool(v) => v,
        }
    }
}

fn four(payload: &[u8]) -> [u8; 4] {
    payload[..4]
        .try_into()
        .expect("scalar payload shorter than four bytes")
}

/// Scalar kinds that occupy four raw host-endian bytes on the wire.
pub(crate) trait WireScalar: Copy {
    const TYPE: ElementType;
    fn to_wire(self) -> [u8; 4];
    fn from_wire(bytes: [u8; 4]) -> Self;
    fn from_numeric(n: Numeric) -> Self;
}

impl WireScalar for i32 {
    const TYPE: ElementType = ElementType::Int;
    fn to_wire(self) -> [u8; 4] {
        self.to_ne_bytes()
    }
    fn from_wire(bytes: [u8; 4]) -> Self {
        i32::from_ne_bytes(bytes)
    }
    fn from_numeric(n: Numeric) -> Self {
        n.to_i32()
    }
}

impl WireScalar for u32 {
    const TYPE: ElementType = ElementType::UInt;
    fn to_wire(self) -> [u8; 4] {
        self.to_ne_bytes()
    }
    fn from_wire(bytes: [u8; 4]) -> Self {
        u32::from_ne_bytes(bytes)
    }
    fn from_numeric(n: Numeric) -> Self {
        n.to_u32()
    }
}

impl WireScalar for f32 {
    const TYPE: ElementType = ElementType::Float;
    fn to_wire(self) -> [u8; 4] {
        self.to_ne_bytes()
    }
    fn from_wire(bytes: [u8; 4]) -> Self {
        f32::from_ne_bytes(bytes)
    }
    fn from_numeric(n: Numeric) -> Self {
        n.to_f32()
    }
}
