//! Replaying one document's content as visitor events on another backend.
//!
//! This is the format-conversion mechanism: walk a source document and
//! drive any destination serializer with the same logical writes.
//! Supporting a new format means implementing the [`Serializer`] trait
//! once; every existing source then converts into it.

use serde_json::Value;

use crate::array::ArrayAdapter;
use crate::document::{BinaryDocument, BinaryView};
use crate::element::{ArrayHeader, ElementHeader, ElementType, Numeric, WireScalar};
use crate::json;
use crate::name::Name;
use crate::serializer::{serialize_object, write_object_array, Serializer};

/// Drive `dst` with the logical content of a JSON document.
///
/// Scalars dispatch on the JSON kind: integers that fit `i32` become
/// `int32`, otherwise those fitting `u32` become `uint32`, anything else
/// numeric becomes `float32`. Arrays classify on element 0; an array mixing
/// integers and reals is promoted to `float32`. Empty arrays and `null`
/// members are skipped.
///
/// # Panics
///
/// Panics if `dst` is a reader or the source root is not an object.
pub fn transcode_json<'doc>(source: &'doc Value, dst: &mut dyn Serializer<'doc>) {
    assert!(!dst.is_reader(), "transcoding needs a writer destination");
    let map = source
        .as_object()
        .expect("the root of a transcoded JSON document must be an object");
    for (key, value) in map {
        json_member(value, Name::new(key), dst);
    }
}

fn json_member<'doc>(value: &'doc Value, name: Name<'_>, dst: &mut dyn Serializer<'doc>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            let mut slot = *b;
            dst.boolean(name, &mut slot);
        }
        Value::Number(_) => json_number(value, name, dst),
        Value::String(s) => {
            let mut slot = Some(s.as_str());
            dst.string(name, &mut slot);
        }
        Value::Object(map) => {
            serialize_object(dst, name, |sub| {
                for (key, child) in map {
                    json_member(child, Name::new(key), sub);
                }
            });
        }
        Value::Array(items) => json_array(items, name, dst),
    }
}

fn json_number<'doc>(value: &Value, name: Name<'_>, dst: &mut dyn Serializer<'doc>) {
    if let Some(i) = value.as_i64() {
        if let Ok(mut slot) = i32::try_from(i) {
            dst.int32(name, &mut slot);
        } else if let Ok(mut slot) = u32::try_from(i) {
            dst.uint32(name, &mut slot);
        } else {
            let mut slot = i as f32;
            dst.float32(name, &mut slot);
        }
    } else if let Some(u) = value.as_u64() {
        if let Ok(mut slot) = u32::try_from(u) {
            dst.uint32(name, &mut slot);
        } else {
            let mut slot = u as f32;
            dst.float32(name, &mut slot);
        }
    } else if let Some(f) = value.as_f64() {
        let mut slot = f as f32;
        dst.float32(name, &mut slot);
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Integer,
    Real,
    Bool,
    Str,
}

fn kind_of(value: &Value) -> Option<Kind> {
    if value.is_i64() || value.is_u64() {
        Some(Kind::Integer)
    } else if value.is_f64() {
        Some(Kind::Real)
    } else if value.is_boolean() {
        Some(Kind::Bool)
    } else if value.is_string() {
        Some(Kind::Str)
    } else {
        None
    }
}

fn json_array<'doc>(items: &'doc [Value], name: Name<'_>, dst: &mut dyn Serializer<'doc>) {
    if items.is_empty() {
        return;
    }
    if items[0].is_object() {
        write_object_array(dst, name, items.len(), |sub, index| {
            if let Some(map) = items[index].as_object() {
                for (key, child) in map {
                    json_member(child, Name::new(key), sub);
                }
            }
        });
        return;
    }
    let Some(mut kind) = kind_of(&items[0]) else {
        return;
    };
    if kind == Kind::Integer && items.iter().any(Value::is_f64) {
        kind = Kind::Real;
    }
    match kind {
        Kind::Integer => dst.int32_array(name, &mut JsonScalarArray::new(items, json::to_i32)),
        Kind::Real => dst.float32_array(name, &mut JsonScalarArray::new(items, json::to_f32)),
        Kind::Bool => dst.bool_array(name, &mut JsonScalarArray::new(items, json::to_bool)),
        Kind::Str => dst.string_array(name, &mut JsonStringArray { items }),
    }
}

// Transient read-only view over a JSON array of scalars.
struct JsonScalarArray<'v, T> {
    items: &'v [Value],
    convert: fn(&Value) -> Option<T>,
}

impl<'v, T> JsonScalarArray<'v, T> {
    fn new(items: &'v [Value], convert: fn(&Value) -> Option<T>) -> Self {
        JsonScalarArray { items, convert }
    }
}

impl<T: Copy + Default> ArrayAdapter<T> for JsonScalarArray<'_, T> {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn get(&self, index: usize) -> T {
        (self.convert)(&self.items[index]).unwrap_or_default()
    }
}

struct JsonStringArray<'v> {
    items: &'v [Value],
}

impl<'v> ArrayAdapter<Name<'v>> for JsonStringArray<'v> {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn get(&self, index: usize) -> Name<'v> {
        self.items[index].as_str().map_or(Name::new(""), Name::new)
    }
}

/// Drive `dst` with the logical content of a binary document.
///
/// Memory chunks (inner-`Null` arrays) have no meaning outside the binary
/// format and are skipped.
///
/// # Panics
///
/// Panics if `dst` is a reader.
pub fn transcode_binary<'doc>(source: &'doc BinaryDocument, dst: &mut dyn Serializer<'doc>) {
    assert!(!dst.is_reader(), "transcoding needs a writer destination");
    binary_frame(source.strings(), source.stream(), dst);
}

/// [`transcode_binary`] for a parsed [`BinaryView`].
pub fn transcode_binary_view<'doc>(source: &'doc BinaryView<'_>, dst: &mut dyn Serializer<'doc>) {
    assert!(!dst.is_reader(), "transcoding needs a writer destination");
    binary_frame(source.strings(), source.stream(), dst);
}

fn binary_frame<'doc>(strings: &'doc [String], frame: &'doc [u8], dst: &mut dyn Serializer<'doc>) {
    let mut cursor = 0;
    while cursor < frame.len() {
        let header = ElementHeader::read_at(frame, cursor);
        let payload_start = cursor + ElementHeader::LEN;
        let payload = &frame[payload_start..payload_start + header.size as usize];
        binary_element(strings, header, payload, dst);
        cursor = header.next_offset(cursor);
    }
}

fn binary_element<'doc>(
    strings: &'doc [String],
    header: ElementHeader,
    payload: &'doc [u8],
    dst: &mut dyn Serializer<'doc>,
) {
    let name = Name::new(strings[header.name as usize].as_str());
    match header.ty {
        ElementType::Int | ElementType::UInt | ElementType::Float | ElementType::Bool => {
            match Numeric::decode(header.ty, payload) {
                Some(Numeric::Int(mut v)) => dst.int32(name, &mut v),
                Some(Numeric::UInt(mut v)) => dst.uint32(name, &mut v),
                Some(Numeric::Float(mut v)) => dst.float32(name, &mut v),
                Some(Numeric::Bool(mut v)) => dst.boolean(name, &mut v),
                None => {}
            }
        }
        ElementType::String => {
            let index =
                u32::from_ne_bytes(payload[..4].try_into().expect("string payload is 4 bytes"))
                    as usize;
            let mut slot = Some(strings[index].as_str());
            dst.string(name, &mut slot);
        }
        ElementType::Object => {
            serialize_object(dst, name, |sub| binary_frame(strings, payload, sub));
        }
        ElementType::Array => binary_array(strings, name, payload, dst),
        ElementType::Null => {
            debug_assert!(false, "finalized streams contain no tombstones");
        }
    }
}

fn binary_array<'doc>(
    strings: &'doc [String],
    name: Name<'_>,
    payload: &'doc [u8],
    dst: &mut dyn Serializer<'doc>,
) {
    let array = ArrayHeader::read_at(payload, 0);
    let body = &payload[ArrayHeader::LEN..];
    let len = array.len as usize;
    match array.inner {
        ElementType::Int => dst.int32_array(name, &mut WireScalarArray::<i32>::new(body, len)),
        ElementType::UInt => dst.uint32_array(name, &mut WireScalarArray::<u32>::new(body, len)),
        ElementType::Float => {
            dst.float32_array(name, &mut WireScalarArray::<f32>::new(body, len));
        }
        ElementType::Bool => dst.bool_array(name, &mut WireBoolArray { body, len }),
        ElementType::String => dst.string_array(name, &mut WireStringArray { strings, body, len }),
        ElementType::Object => {
            write_object_array(dst, name, len, |sub, index| {
                let mut cursor = 0;
                let mut remaining = index;
                loop {
                    let slot_size = u32::from_ne_bytes(
                        body[cursor..cursor + 4]
                            .try_into()
                            .expect("4-byte slot size"),
                    ) as usize;
                    if remaining == 0 {
                        binary_frame(strings, &body[cursor + 4..cursor + 4 + slot_size], sub);
                        break;
                    }
                    cursor += 4 + slot_size;
                    remaining -= 1;
                }
            });
        }
        ElementType::Array | ElementType::Null => {
            // Memory chunks are opaque to other formats.
        }
    }
}

// Transient read-only views over a raw homogeneous array body.

struct WireScalarArray<'v, T> {
    body: &'v [u8],
    len: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<'v, T> WireScalarArray<'v, T> {
    fn new(body: &'v [u8], len: usize) -> Self {
        WireScalarArray {
            body,
            len,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: WireScalar> ArrayAdapter<T> for WireScalarArray<'_, T> {
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, index: usize) -> T {
        let at = index * 4;
        T::from_wire(
            self.body[at..at + 4]
                .try_into()
                .expect("stride-aligned slice is 4 bytes"),
        )
    }
}

struct WireBoolArray<'v> {
    body: &'v [u8],
    len: usize,
}

impl ArrayAdapter<bool> for WireBoolArray<'_> {
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, index: usize) -> bool {
        self.body[index] > 0
    }
}

struct WireStringArray<'v> {
    strings: &'v [String],
    body: &'v [u8],
    len: usize,
}

impl<'v> ArrayAdapter<Name<'v>> for WireStringArray<'v> {
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, index: usize) -> Name<'v> {
        let at = index * 4;
        let table_index = u32::from_ne_bytes(
            self.body[at..at + 4]
                .try_into()
                .expect("stride-aligned slice is 4 bytes"),
        ) as usize;
        Name::new(self.strings[table_index].as_str())
    }
}
