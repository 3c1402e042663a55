//! Binary reader: locates elements by name and materializes scalars,
//! strings, arrays, and sub-objects.

use crate::array::ArrayAdapter;
use crate::document::{BinaryDocument, BinaryView};
use crate::element::{
    array_stride, ArrayHeader, ElementHeader, ElementType, Numeric, WireScalar,
};
use crate::error::Result;
use crate::name::Name;
use crate::serializer::Serializer;

/// Reads one frame of a binary document.
///
/// Lookups compare the request against each element's *resolved* name
/// string, not its interned index, so a name that never made it into the
/// table still misses cleanly. The first match wins; combined with the
/// writer's override this yields the surviving write.
#[derive(Clone, Copy)]
pub struct BinaryReader<'doc> {
    strings: &'doc [String],
    data: &'doc [u8],
}

impl<'doc> BinaryReader<'doc> {
    #[must_use]
    pub fn new(doc: &'doc BinaryDocument) -> BinaryReader<'doc> {
        BinaryReader {
            strings: &doc.strings,
            data: &doc.bytes,
        }
    }

    #[must_use]
    pub fn from_view(view: &'doc BinaryView<'_>) -> BinaryReader<'doc> {
        BinaryReader {
            strings: &view.strings,
            data: view.stream,
        }
    }

    /// Extract the opaque byte blob stored under `name`, if any.
    #[must_use]
    pub fn read_chunk(&self, name: Name<'_>) -> Option<&'doc [u8]> {
        let (header, payload) = self.find(name)?;
        if header.ty != ElementType::Array {
            return None;
        }
        let array = ArrayHeader::read_at(self.data, payload);
        if array.inner != ElementType::Null {
            return None;
        }
        let body = payload + ArrayHeader::LEN;
        Some(&self.data[body..body + array.len as usize])
    }

    /// Extract and re-parse a document embedded with
    /// [`BinaryWriter::embed_document`](crate::BinaryWriter::embed_document).
    ///
    /// `None` when no chunk is stored under `name`; `Some(Err(..))` when the
    /// chunk does not parse as a document.
    #[must_use]
    pub fn read_embedded(&self, name: Name<'_>) -> Option<Result<BinaryView<'doc>>> {
        self.read_chunk(name).map(BinaryView::from_bytes)
    }

    /// Walk the frame for the first element whose resolved name matches.
    /// Returns the header and its payload offset.
    fn find(&self, name: Name<'_>) -> Option<(ElementHeader, usize)> {
        let mut cursor = 0;
        while cursor < self.data.len() {
            let header = ElementHeader::read_at(self.data, cursor);
            let payload = cursor + ElementHeader::LEN;
            assert!(
                payload + header.size as usize <= self.data.len(),
                "element at {cursor} escapes the stream"
            );
            if header.ty != ElementType::Null
                && name == self.strings[header.name as usize].as_str()
            {
                return Some((header, payload));
            }
            cursor = header.next_offset(cursor);
        }
        None
    }

    fn payload(&self, header: ElementHeader, offset: usize) -> &'doc [u8] {
        &self.data[offset..offset + header.size as usize]
    }

    fn read_numeric(&self, name: Name<'_>) -> Option<Numeric> {
        let (header, payload) = self.find(name)?;
        Numeric::decode(header.ty, self.payload(header, payload))
    }

    fn read_scalar_array<T: WireScalar>(&self, name: Name<'_>, array: &mut dyn ArrayAdapter<T>) {
        let Some((header, payload)) = self.find(name) else {
            return;
        };
        match header.ty {
            ElementType::Array => {
                let arr = ArrayHeader::read_at(self.data, payload);
                let len = arr.len as usize;
                let body = payload + ArrayHeader::LEN;
                let stride = array_stride(arr.inner);
                assert!(
                    ArrayHeader::LEN + len * stride <= header.size as usize,
                    "array body escapes its element"
                );
                if arr.inner == T::TYPE {
                    if array.supports_bulk() {
                        let mut values = Vec::with_capacity(len);
                        for chunk in self.data[body..body + len * 4].chunks_exact(4) {
                            values.push(T::from_wire(
                                chunk.try_into().expect("chunks_exact yields 4-byte chunks"),
                            ));
                        }
                        array.assign(&values);
                    } else {
                        array.resize(len);
                        for i in 0..len {
                            let at = body + i * 4;
                            array.set(
                                i,
                                T::from_wire(
                                    self.data[at..at + 4]
                                        .try_into()
                                        .expect("stride-aligned slice is 4 bytes"),
                                ),
                            );
                        }
                    }
                } else {
                    // Mismatched inner type: convert element by element at
                    // the stored stride. Refused conversions leave the slot
                    // at its post-resize default.
                    array.resize(len);
                    for i in 0..len {
                        let at = body + i * stride;
                        if let Some(n) = Numeric::decode(arr.inner, &self.data[at..at + stride]) {
                            array.set(i, T::from_numeric(n));
                        }
                    }
                }
            }
            ty if ty.is_numeric() => {
                // A scalar stored where an array was requested: coerce to a
                // single-element array.
                if let Some(n) = Numeric::decode(ty, self.payload(header, payload)) {
                    array.resize(1);
                    array.set(0, T::from_numeric(n));
                }
            }
            _ => {}
        }
    }

    fn string_at(&self, index: usize) -> &'doc str {
        self.strings[index].as_str()
    }

    fn table_index(&self, bytes: &[u8]) -> usize {
        u32::from_ne_bytes(bytes[..4].try_into().expect("string payload is 4 bytes")) as usize
    }
}

impl<'doc> Serializer<'doc> for BinaryReader<'doc> {
    fn is_reader(&self) -> bool {
        true
    }

    fn has_member(&self, name: Name<'_>) -> bool {
        self.find(name).is_some()
    }

    fn int32(&mut self, name: Name<'_>, slot: &mut i32) {
        if let Some(n) = self.read_numeric(name) {
            *slot = n.to_i32();
        }
    }

    fn uint32(&mut self, name: Name<'_>, slot: &mut u32) {
        if let Some(n) = self.read_numeric(name) {
            *slot = n.to_u32();
        }
    }

    fn float32(&mut self, name: Name<'_>, slot: &mut f32) {
        if let Some(n) = self.read_numeric(name) {
            *slot = n.to_f32();
        }
    }

    fn boolean(&mut self, name: Name<'_>, slot: &mut bool) {
        if let Some(n) = self.read_numeric(name) {
            *slot = n.to_bool();
        }
    }

    fn string<'x>(&mut self, name: Name<'_>, slot: &mut Option<&'x str>)
    where
        'doc: 'x,
    {
        let Some((header, payload)) = self.find(name) else {
            return;
        };
        if header.ty != ElementType::String {
            return;
        }
        let index = self.table_index(self.payload(header, payload));
        *slot = Some(self.string_at(index));
    }

    fn object(&mut self, name: Name<'_>, body: &mut dyn FnMut(&mut dyn Serializer<'doc>)) {
        let Some((header, payload)) = self.find(name) else {
            return;
        };
        if header.ty != ElementType::Object {
            return;
        }
        let mut sub = BinaryReader {
            strings: self.strings,
            data: self.payload(header, payload),
        };
        body(&mut sub);
    }

    fn iterate(&mut self, visit: &mut dyn FnMut(&mut dyn Serializer<'doc>, Name<'_>) -> bool) {
        let strings = self.strings;
        let data = self.data;
        let mut cursor = 0;
        while cursor < data.len() {
            let header = ElementHeader::read_at(data, cursor);
            // Finalized streams hold no tombstones; skip them anyway.
            if header.ty != ElementType::Null {
                let element_name = Name::new(strings[header.name as usize].as_str());
                if !visit(self, element_name) {
                    break;
                }
            }
            cursor = header.next_offset(cursor);
        }
    }

    fn int32_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<i32>) {
        self.read_scalar_array(name, array);
    }

    fn uint32_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<u32>) {
        self.read_scalar_array(name, array);
    }

    fn float32_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<f32>) {
        self.read_scalar_array(name, array);
    }

    fn bool_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<bool>) {
        let Some((header, payload)) = self.find(name) else {
            return;
        };
        match header.ty {
            ElementType::Array => {
                let arr = ArrayHeader::read_at(self.data, payload);
                let len = arr.len as usize;
                let body = payload + ArrayHeader::LEN;
                let stride = array_stride(arr.inner);
                assert!(
                    ArrayHeader::LEN + len * stride <= header.size as usize,
                    "array body escapes its element"
                );
                array.resize(len);
                for i in 0..len {
                    let at = body + i * stride;
                    if let Some(n) = Numeric::decode(arr.inner, &self.data[at..at + stride]) {
                        array.set(i, n.to_bool());
                    }
                }
            }
            ty if ty.is_numeric() => {
                if let Some(n) = Numeric::decode(ty, self.payload(header, payload)) {
                    array.resize(1);
                    array.set(0, n.to_bool());
                }
            }
            _ => {}
        }
    }

    fn string_array<'x>(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<Name<'x>>)
    where
        'doc: 'x,
    {
        let Some((header, payload)) = self.find(name) else {
            return;
        };
        match header.ty {
            ElementType::Array => {
                let arr = ArrayHeader::read_at(self.data, payload);
                if arr.inner != ElementType::String {
                    return;
                }
                let len = arr.len as usize;
                let body = payload + ArrayHeader::LEN;
                assert!(
                    ArrayHeader::LEN + len * 4 <= header.size as usize,
                    "array body escapes its element"
                );
                array.resize(len);
                for i in 0..len {
                    let index = self.table_index(&self.data[body + i * 4..body + i * 4 + 4]);
                    array.set(i, Name::new(self.string_at(index)));
                }
            }
            ElementType::String => {
                let index = self.table_index(self.payload(header, payload));
                array.resize(1);
                array.set(0, Name::new(self.string_at(index)));
            }
            _ => {}
        }
    }

    fn write_object_array(
        &mut self,
        _name: Name<'_>,
        _len: usize,
        _each: &mut dyn FnMut(&mut dyn Serializer<'doc>, usize),
    ) {
        panic!("write_object_array is a writer operation, this serializer is a reader");
    }

    fn read_object_array_len(&mut self, name: Name<'_>) -> usize {
        let Some((header, payload)) = self.find(name) else {
            return 0;
        };
        if header.ty != ElementType::Array {
            return 0;
        }
        let arr = ArrayHeader::read_at(self.data, payload);
        if arr.inner != ElementType::Object {
            return 0;
        }
        arr.len as usize
    }

    fn read_object_array(
        &mut self,
        name: Name<'_>,
        each: &mut dyn FnMut(&mut dyn Serializer<'doc>, usize),
    ) {
        let strings = self.strings;
        let data = self.data;
        let Some((header, payload)) = self.find(name) else {
            return;
        };
        if header.ty != ElementType::Array {
            return;
        }
        let arr = ArrayHeader::read_at(data, payload);
        if arr.inner != ElementType::Object {
            return;
        }
        let end = payload + header.size as usize;
        let mut cursor = payload + ArrayHeader::LEN;
        for index in 0..arr.len as usize {
            assert!(cursor + 4 <= end, "object array record escapes its element");
            let slot_size =
                u32::from_ne_bytes(data[cursor..cursor + 4].try_into().expect("4-byte size"))
                    as usize;
            cursor += 4;
            assert!(
                cursor + slot_size <= end,
                "object array record escapes its element"
            );
            if slot_size > 0 {
                let mut sub = BinaryReader {
                    strings,
                    data: &data[cursor..cursor + slot_size],
                };
                each(&mut sub, index);
                cursor += slot_size;
            }
            // A zero size marks a null slot: the callback is not invoked.
        }
    }
}
