//! Binary writer: appends tagged elements, interns strings, applies the
//! last-write-wins override and null compaction.

use tracing::trace;

use crate::array::ArrayAdapter;
use crate::document::BinaryDocument;
use crate::element::{
    ArrayHeader, ElementHeader, ElementType, WireScalar, MAX_ARRAY_LEN, MAX_NAME_INDEX,
};
use crate::name::Name;
use crate::serializer::Serializer;

// First capacity the buffer grows to; doubled from there on.
const INITIAL_CAPACITY: usize = 4096;

/// Appends elements to a [`BinaryDocument`].
///
/// A writer covers one frame: the byte span from its creation point to the
/// end of the buffer. Writing a name already present in the frame retags
/// the earlier element as a `Null` tombstone; tombstones are removed when
/// the frame closes (nested frames before the parent patches their header,
/// the root frame when the root writer drops), so a finalized document
/// never contains them.
pub struct BinaryWriter<'a> {
    doc: &'a mut BinaryDocument,
    frame_start: usize,
    root: bool,
}

impl<'a> BinaryWriter<'a> {
    pub fn new(doc: &'a mut BinaryDocument) -> BinaryWriter<'a> {
        let frame_start = doc.bytes.len();
        BinaryWriter {
            doc,
            frame_start,
            root: true,
        }
    }

    /// Embed an opaque byte blob under `name`.
    ///
    /// On the wire this is an `Array` element with inner type `Null`; only
    /// the application that wrote it knows how to interpret the bytes.
    /// Overriding applies like any other write.
    pub fn write_chunk(&mut self, name: Name<'_>, chunk: &[u8]) {
        assert!(
            chunk.len() <= MAX_ARRAY_LEN,
            "memory chunk of {} bytes exceeds the {MAX_ARRAY_LEN}-byte limit",
            chunk.len()
        );
        let name_idx = self.intern(name.as_str());
        self.tombstone(name_idx, self.doc.bytes.len());
        self.append(
            &ElementHeader {
                ty: ElementType::Array,
                name: name_idx,
                size: size32(ArrayHeader::LEN + chunk.len()),
            }
            .encode(),
        );
        self.append(
            &ArrayHeader {
                inner: ElementType::Null,
                len: chunk.len() as u32,
            }
            .encode(),
        );
        self.append(chunk);
    }

    /// Serialize `embedded` whole and store it as a memory chunk under
    /// `name`. The counterpart is
    /// [`BinaryReader::read_embedded`](crate::BinaryReader::read_embedded).
    pub fn embed_document(&mut self, name: Name<'_>, embedded: &BinaryDocument) {
        self.write_chunk(name, &embedded.to_bytes());
    }

    /// Map a string to its table index, appending it on first sight.
    fn intern(&mut self, text: &str) -> u16 {
        if let Some(found) = self.doc.strings.iter().position(|s| s == text) {
            return found as u16;
        }
        let index = self.doc.strings.len();
        assert!(
            index <= MAX_NAME_INDEX,
            "string table overflow: more than {} distinct strings",
            MAX_NAME_INDEX + 1
        );
        self.doc.strings.push(text.to_owned());
        index as u16
    }

    /// Retag every element named `name_idx` in `[frame_start, end)` as a
    /// tombstone. Name and size stay intact so the frame walk still strides
    /// past.
    fn tombstone(&mut self, name_idx: u16, end: usize) {
        let bytes = &mut self.doc.bytes;
        let mut cursor = self.frame_start;
        while cursor < end {
            let mut header = ElementHeader::read_at(bytes, cursor);
            let next = header.next_offset(cursor);
            if header.name == name_idx && header.ty != ElementType::Null {
                header.ty = ElementType::Null;
                header.write_at(bytes, cursor);
            }
            cursor = next;
        }
    }

    /// Make room for `additional` bytes: capacity starts at 4096 and
    /// doubles until sufficient; it never shrinks.
    fn reserve(&mut self, additional: usize) {
        let bytes = &mut self.doc.bytes;
        let needed = bytes.len() + additional;
        if needed <= bytes.capacity() {
            return;
        }
        let mut capacity = bytes.capacity().max(INITIAL_CAPACITY);
        while capacity < needed {
            capacity *= 2;
        }
        trace!(capacity, "growing write buffer");
        bytes.reserve_exact(capacity - bytes.len());
    }

    fn append(&mut self, data: &[u8]) {
        self.reserve(data.len());
        self.doc.bytes.extend_from_slice(data);
    }

    /// Reserve `len` zeroed bytes to be patched later; returns their offset.
    fn reserve_zeroed(&mut self, len: usize) -> usize {
        self.reserve(len);
        let offset = self.doc.bytes.len();
        self.doc.bytes.resize(offset + len, 0);
        offset
    }

    fn write_scalar<T: WireScalar>(&mut self, name: Name<'_>, value: T) {
        let name_idx = self.intern(name.as_str());
        self.tombstone(name_idx, self.doc.bytes.len());
        self.append(
            &ElementHeader {
                ty: T::TYPE,
                name: name_idx,
                size: 4,
            }
            .encode(),
        );
        self.append(&value.to_wire());
    }

    fn write_scalar_array<T: WireScalar>(
        &mut self,
        name: Name<'_>,
        array: &mut dyn ArrayAdapter<T>,
    ) {
        let len = array.len();
        assert!(
            len <= MAX_ARRAY_LEN,
            "array of {len} elements exceeds the {MAX_ARRAY_LEN}-element limit"
        );
        let name_idx = self.intern(name.as_str());
        self.tombstone(name_idx, self.doc.bytes.len());
        self.append(
            &ElementHeader {
                ty: ElementType::Array,
                name: name_idx,
                size: size32(ArrayHeader::LEN + len * 4),
            }
            .encode(),
        );
        self.append(
            &ArrayHeader {
                inner: T::TYPE,
                len: len as u32,
            }
            .encode(),
        );
        self.reserve(len * 4);
        if array.supports_bulk() {
            for &value in array.as_slice() {
                self.doc.bytes.extend_from_slice(&value.to_wire());
            }
        } else {
            for i in 0..len {
                let value = array.get(i);
                self.doc.bytes.extend_from_slice(&value.to_wire());
            }
        }
    }
}

impl<'a, 'doc> Serializer<'doc> for BinaryWriter<'a> {
    fn is_reader(&self) -> bool {
        false
    }

    fn has_member(&self, name: Name<'_>) -> bool {
        let bytes = &self.doc.bytes;
        let mut cursor = self.frame_start;
        while cursor < bytes.len() {
            let header = ElementHeader::read_at(bytes, cursor);
            if header.ty != ElementType::Null
                && name == self.doc.strings[header.name as usize].as_str()
            {
                return true;
            }
            cursor = header.next_offset(cursor);
        }
        false
    }

    fn int32(&mut self, name: Name<'_>, slot: &mut i32) {
        self.write_scalar(name, *slot);
    }

    fn uint32(&mut self, name: Name<'_>, slot: &mut u32) {
        self.write_scalar(name, *slot);
    }

    fn float32(&mut self, name: Name<'_>, slot: &mut f32) {
        self.write_scalar(name, *slot);
    }

    fn boolean(&mut self, name: Name<'_>, slot: &mut bool) {
        let name_idx = self.intern(name.as_str());
        self.tombstone(name_idx, self.doc.bytes.len());
        self.append(
            &ElementHeader {
                ty: ElementType::Bool,
                name: name_idx,
                size: 1,
            }
            .encode(),
        );
        self.append(&[u8::from(*slot)]);
    }

    fn string<'x>(&mut self, name: Name<'_>, slot: &mut Option<&'x str>)
    where
        'doc: 'x,
    {
        let value = slot.expect("writing a string requires the slot to hold a value");
        // The value is interned before the name; table order is part of the
        // format's determinism.
        let value_idx = u32::from(self.intern(value));
        let name_idx = self.intern(name.as_str());
        self.tombstone(name_idx, self.doc.bytes.len());
        self.append(
            &ElementHeader {
                ty: ElementType::String,
                name: name_idx,
                size: 4,
            }
            .encode(),
        );
        self.append(&value_idx.to_ne_bytes());
    }

    fn object(&mut self, name: Name<'_>, body: &mut dyn FnMut(&mut dyn Serializer<'doc>)) {
        let header_start = self.reserve_zeroed(ElementHeader::LEN);
        let frame = self.doc.bytes.len();
        {
            let mut sub = BinaryWriter {
                doc: &mut *self.doc,
                frame_start: frame,
                root: false,
            };
            body(&mut sub);
        }
        compact_frame(&mut self.doc.bytes, frame);
        if self.doc.bytes.len() == frame {
            // Nothing was written: give the reserved header back.
            self.doc.bytes.truncate(header_start);
            return;
        }
        let name_idx = self.intern(name.as_str());
        self.tombstone(name_idx, header_start);
        ElementHeader {
            ty: ElementType::Object,
            name: name_idx,
            size: size32(self.doc.bytes.len() - frame),
        }
        .write_at(&mut self.doc.bytes, header_start);
    }

    fn iterate(&mut self, visit: &mut dyn FnMut(&mut dyn Serializer<'doc>, Name<'_>) -> bool) {
        let mut cursor = self.frame_start;
        while cursor < self.doc.bytes.len() {
            let header = ElementHeader::read_at(&self.doc.bytes, cursor);
            if header.ty != ElementType::Null {
                let element_name = self.doc.strings[header.name as usize].clone();
                if !visit(self, Name::new(&element_name)) {
                    break;
                }
            }
            cursor = header.next_offset(cursor);
        }
    }

    fn int32_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<i32>) {
        self.write_scalar_array(name, array);
    }

    fn uint32_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<u32>) {
        self.write_scalar_array(name, array);
    }

    fn float32_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<f32>) {
        self.write_scalar_array(name, array);
    }

    fn bool_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<bool>) {
        let len = array.len();
        assert!(
            len <= MAX_ARRAY_LEN,
            "array of {len} elements exceeds the {MAX_ARRAY_LEN}-element limit"
        );
        let name_idx = self.intern(name.as_str());
        self.tombstone(name_idx, self.doc.bytes.len());
        self.append(
            &ElementHeader {
                ty: ElementType::Array,
                name: name_idx,
                size: size32(ArrayHeader::LEN + len),
            }
            .encode(),
        );
        self.append(
            &ArrayHeader {
                inner: ElementType::Bool,
                len: len as u32,
            }
            .encode(),
        );
        self.reserve(len);
        for i in 0..len {
            let value = array.get(i);
            self.doc.bytes.push(u8::from(value));
        }
    }

    fn string_array<'x>(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<Name<'x>>)
    where
        'doc: 'x,
    {
        let len = array.len();
        assert!(
            len <= MAX_ARRAY_LEN,
            "array of {len} elements exceeds the {MAX_ARRAY_LEN}-element limit"
        );
        let name_idx = self.intern(name.as_str());
        self.tombstone(name_idx, self.doc.bytes.len());
        self.append(
            &ElementHeader {
                ty: ElementType::Array,
                name: name_idx,
                size: size32(ArrayHeader::LEN + len * 4),
            }
            .encode(),
        );
        self.append(
            &ArrayHeader {
                inner: ElementType::String,
                len: len as u32,
            }
            .encode(),
        );
        for i in 0..len {
            let item = array.get(i);
            let index = u32::from(self.intern(item.as_str()));
            self.append(&index.to_ne_bytes());
        }
    }

    fn write_object_array(
        &mut self,
        name: Name<'_>,
        len: usize,
        each: &mut dyn FnMut(&mut dyn Serializer<'doc>, usize),
    ) {
        assert!(
            len <= MAX_ARRAY_LEN,
            "array of {len} elements exceeds the {MAX_ARRAY_LEN}-element limit"
        );
        let header_start = self.reserve_zeroed(ElementHeader::LEN + ArrayHeader::LEN);
        let body_start = self.doc.bytes.len();
        for index in 0..len {
            let size_slot = self.reserve_zeroed(4);
            let frame = self.doc.bytes.len();
            {
                let mut sub = BinaryWriter {
                    doc: &mut *self.doc,
                    frame_start: frame,
                    root: false,
                };
                each(&mut sub, index);
            }
            compact_frame(&mut self.doc.bytes, frame);
            // A zero size is legal: it marks a null slot.
            let slot_size = size32(self.doc.bytes.len() - frame);
            self.doc.bytes[size_slot..size_slot + 4].copy_from_slice(&slot_size.to_ne_bytes());
        }
        if self.doc.bytes.len() == body_start + 4 * len {
            // No slot wrote anything: elide the whole element.
            self.doc.bytes.truncate(header_start);
            return;
        }
        let name_idx = self.intern(name.as_str());
        self.tombstone(name_idx, header_start);
        ElementHeader {
            ty: ElementType::Array,
            name: name_idx,
            size: size32(self.doc.bytes.len() - header_start - ElementHeader::LEN),
        }
        .write_at(&mut self.doc.bytes, header_start);
        ArrayHeader {
            inner: ElementType::Object,
            len: len as u32,
        }
        .write_at(&mut self.doc.bytes, header_start + ElementHeader::LEN);
    }

    fn read_object_array_len(&mut self, _name: Name<'_>) -> usize {
        panic!("read_object_array_len is a reader operation, this serializer is a writer");
    }

    fn read_object_array(
        &mut self,
        _name: Name<'_>,
        _each: &mut dyn FnMut(&mut dyn Serializer<'doc>, usize),
    ) {
        panic!("read_object_array is a reader operation, this serializer is a writer");
    }
}

impl Drop for BinaryWriter<'_> {
    fn drop(&mut self) {
        if self.root {
            compact_frame(&mut self.doc.bytes, self.frame_start);
        }
    }
}

/// Remove tombstones from the frame `[start, end-of-buffer)` with an
/// overlap-safe in-buffer copy, then shrink the used size. The walk strides
/// top-level elements only; sub-frames were compacted when they closed.
fn compact_frame(bytes: &mut Vec<u8>, start: usize) {
    let end = bytes.len();
    let mut read = start;
    let mut write = start;
    while read < end {
        let header = ElementHeader::read_at(bytes, read);
        let span = ElementHeader::LEN + header.size as usize;
        if header.ty != ElementType::Null {
            if write != read {
                bytes.copy_within(read..read + span, write);
            }
            write += span;
        }
        read += span;
    }
    if write != end {
        trace!(removed = end - write, "compacted tombstones");
        bytes.truncate(write);
    }
}

fn size32(len: usize) -> u32 {
    u32::try_from(len).expect("element payload exceeds the 32-bit size limit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Numeric;

    fn walk(doc: &BinaryDocument) -> Vec<(ElementType, String)> {
        let mut out = Vec::new();
        let mut cursor = 0;
        while cursor < doc.bytes.len() {
            let header = ElementHeader::read_at(&doc.bytes, cursor);
            out.push((header.ty, doc.strings[header.name as usize].clone()));
            cursor = header.next_offset(cursor);
        }
        out
    }

    #[test]
    fn test_scalar_layout() {
        let mut doc = BinaryDocument::new();
        {
            let mut w = BinaryWriter::new(&mut doc);
            let mut v = -7i32;
            w.int32(Name::new("a"), &mut v);
        }
        assert_eq!(doc.strings, vec!["a"]);
        assert_eq!(doc.bytes.len(), ElementHeader::LEN + 4);

        let header = ElementHeader::read_at(&doc.bytes, 0);
        assert_eq!(header.ty, ElementType::Int);
        assert_eq!(header.name, 0);
        assert_eq!(header.size, 4);
        assert_eq!(
            Numeric::decode(header.ty, &doc.bytes[ElementHeader::LEN..]),
            Some(Numeric::Int(-7))
        );
    }

    #[test]
    fn test_override_leaves_single_survivor() {
        let mut doc = BinaryDocument::new();
        {
            let mut w = BinaryWriter::new(&mut doc);
            let mut first = 1i32;
            let mut second = 2i32;
            let mut other = 9u32;
            w.int32(Name::new("x"), &mut first);
            w.uint32(Name::new("y"), &mut other);
            w.int32(Name::new("x"), &mut second);
        }
        let elements = walk(&doc);
        assert_eq!(
            elements,
            vec![
                (ElementType::UInt, String::from("y")),
                (ElementType::Int, String::from("x")),
            ]
        );
        let header = ElementHeader::read_at(&doc.bytes, ElementHeader::LEN + 4);
        let payload = &doc.bytes[2 * ElementHeader::LEN + 4..];
        assert_eq!(Numeric::decode(header.ty, payload), Some(Numeric::Int(2)));
    }

    #[test]
    fn test_empty_object_is_elided() {
        let mut doc = BinaryDocument::new();
        {
            let mut w = BinaryWriter::new(&mut doc);
            w.object(Name::new("empty"), &mut |_| {});
        }
        assert!(doc.bytes.is_empty());
        assert!(doc.strings.is_empty());
    }

    #[test]
    fn test_empty_object_array_is_elided() {
        let mut doc = BinaryDocument::new();
        {
            let mut w = BinaryWriter::new(&mut doc);
            w.write_object_array(Name::new("list"), 3, &mut |_, _| {});
        }
        assert!(doc.bytes.is_empty());
        assert!(doc.strings.is_empty());
    }

    #[test]
    fn test_string_interning_dedupes_and_orders() {
        let mut doc = BinaryDocument::new();
        {
            let mut w = BinaryWriter::new(&mut doc);
            let mut a = Some("shared");
            let mut b = Some("shared");
            w.string(Name::new("first"), &mut a);
            w.string(Name::new("second"), &mut b);
        }
        // Values are interned before names, duplicates hit the table.
        assert_eq!(doc.strings, vec!["shared", "first", "second"]);
    }

    #[test]
    fn test_nested_override_compacts_inside_object() {
        let mut doc = BinaryDocument::new();
        {
            let mut w = BinaryWriter::new(&mut doc);
            w.object(Name::new("o"), &mut |s| {
                let mut v1 = 1i32;
                let mut v2 = 2i32;
                s.int32(Name::new("dup"), &mut v1);
                s.int32(Name::new("dup"), &mut v2);
            });
        }
        let header = ElementHeader::read_at(&doc.bytes, 0);
        assert_eq!(header.ty, ElementType::Object);
        // One surviving child: its header plus a 4-byte payload.
        assert_eq!(header.size as usize, ElementHeader::LEN + 4);
        assert_eq!(doc.bytes.len(), 2 * ElementHeader::LEN + 4);
    }

    #[test]
    fn test_chunk_layout() {
        let mut doc = BinaryDocument::new();
        {
            let mut w = BinaryWriter::new(&mut doc);
            w.write_chunk(Name::new("blob"), &[0xAA, 0xBB, 0xCC]);
        }
        let header = ElementHeader::read_at(&doc.bytes, 0);
        assert_eq!(header.ty, ElementType::Array);
        assert_eq!(header.size as usize, ArrayHeader::LEN + 3);
        let array = ArrayHeader::read_at(&doc.bytes, ElementHeader::LEN);
        assert_eq!(array.inner, ElementType::Null);
        assert_eq!(array.len, 3);
        assert_eq!(
            &doc.bytes[ElementHeader::LEN + ArrayHeader::LEN..],
            &[0xAA, 0xBB, 0xCC]
        );
    }

    #[test]
    #[should_panic(expected = "reader operation")]
    fn test_reader_entry_point_panics() {
        let mut doc = BinaryDocument::new();
        let mut w = BinaryWriter::new(&mut doc);
        let _ = w.read_object_array_len(Name::new("x"));
    }
}
