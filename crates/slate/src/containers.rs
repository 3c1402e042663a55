//! Glue between the visitor interface and std containers.
//!
//! [`Persist`] is the describe-once entry point for values that serialize
//! under a name; the adapter types wrap vectors, slices, and fixed buffers
//! so they can travel through the array operations.

use crate::array::ArrayAdapter;
use crate::name::Name;
use crate::serializer::Serializer;

/// Values that serialize themselves under a name, in either direction.
///
/// Implementations branch on [`is_reader`](Serializer::is_reader) only when
/// the two directions genuinely differ (container resize, child
/// construction); scalar impls are direction-blind.
pub trait Persist {
    fn persist(&mut self, s: &mut dyn Serializer<'_>, name: Name<'_>);
}

impl Persist for i32 {
    fn persist(&mut self, s: &mut dyn Serializer<'_>, name: Name<'_>) {
        s.int32(name, self);
    }
}

impl Persist for u32 {
    fn persist(&mut self, s: &mut dyn Serializer<'_>, name: Name<'_>) {
        s.uint32(name, self);
    }
}

impl Persist for f32 {
    fn persist(&mut self, s: &mut dyn Serializer<'_>, name: Name<'_>) {
        s.float32(name, self);
    }
}

impl Persist for bool {
    fn persist(&mut self, s: &mut dyn Serializer<'_>, name: Name<'_>) {
        s.boolean(name, self);
    }
}

// Narrow integers round-trip through a 32-bit temporary.

impl Persist for i8 {
    fn persist(&mut self, s: &mut dyn Serializer<'_>, name: Name<'_>) {
        let mut wide = i32::from(*self);
        s.int32(name, &mut wide);
        *self = wide as i8;
    }
}

impl Persist for i16 {
    fn persist(&mut self, s: &mut dyn Serializer<'_>, name: Name<'_>) {
        let mut wide = i32::from(*self);
        s.int32(name, &mut wide);
        *self = wide as i16;
    }
}

impl Persist for u8 {
    fn persist(&mut self, s: &mut dyn Serializer<'_>, name: Name<'_>) {
        let mut wide = u32::from(*self);
        s.uint32(name, &mut wide);
        *self = wide as u8;
    }
}

impl Persist for u16 {
    fn persist(&mut self, s: &mut dyn Serializer<'_>, name: Name<'_>) {
        let mut wide = u32::from(*self);
        s.uint32(name, &mut wide);
        *self = wide as u16;
    }
}

impl Persist for String {
    fn persist(&mut self, s: &mut dyn Serializer<'_>, name: Name<'_>) {
        if s.is_reader() {
            let mut slot = None;
            s.string(name, &mut slot);
            if let Some(text) = slot {
                *self = text.to_owned();
            }
        } else {
            let mut slot = Some(self.as_str());
            s.string(name, &mut slot);
        }
    }
}

impl Persist for Vec<i32> {
    fn persist(&mut self, s: &mut dyn Serializer<'_>, name: Name<'_>) {
        s.int32_array(name, &mut VecArray::new(self));
    }
}

impl Persist for Vec<u32> {
    fn persist(&mut self, s: &mut dyn Serializer<'_>, name: Name<'_>) {
        s.uint32_array(name, &mut VecArray::new(self));
    }
}

impl Persist for Vec<f32> {
    fn persist(&mut self, s: &mut dyn Serializer<'_>, name: Name<'_>) {
        s.float32_array(name, &mut VecArray::new(self));
    }
}

impl Persist for Vec<bool> {
    fn persist(&mut self, s: &mut dyn Serializer<'_>, name: Name<'_>) {
        s.bool_array(name, &mut VecArray::new(self));
    }
}

impl Persist for Vec<String> {
    fn persist(&mut self, s: &mut dyn Serializer<'_>, name: Name<'_>) {
        if s.is_reader() {
            s.string_array(name, &mut StringVecSink::new(self));
        } else {
            s.string_array(name, &mut StrSliceArray::new(self));
        }
    }
}

/// Write a value without keeping a slot around. Writer-only.
///
/// # Panics
///
/// Panics if `s` is a reader.
pub fn put<T: Persist>(s: &mut dyn Serializer<'_>, name: Name<'_>, mut value: T) {
    assert!(!s.is_reader(), "put requires a writer");
    value.persist(s, name);
}

/// Bidirectional adapter over a `Vec` of copyable elements.
pub struct VecArray<'a, T>(&'a mut Vec<T>);

impl<'a, T> VecArray<'a, T> {
    pub fn new(vec: &'a mut Vec<T>) -> Self {
        VecArray(vec)
    }
}

impl<T: Copy + Default> ArrayAdapter<T> for VecArray<'_, T> {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn get(&self, index: usize) -> T {
        self.0[index]
    }

    fn resize(&mut self, len: usize) {
        self.0.resize(len, T::default());
    }

    fn set(&mut self, index: usize, value: T) {
        self.0[index] = value;
    }

    fn supports_bulk(&self) -> bool {
        true
    }

    fn as_slice(&self) -> &[T] {
        self.0
    }

    fn assign(&mut self, values: &[T]) {
        self.0.clear();
        self.0.extend_from_slice(values);
    }
}

/// Read-only adapter over a slice; for writing existing data out.
pub struct SliceArray<'a, T>(&'a [T]);

impl<'a, T> SliceArray<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        SliceArray(items)
    }
}

impl<T: Copy> ArrayAdapter<T> for SliceArray<'_, T> {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn get(&self, index: usize) -> T {
        self.0[index]
    }

    fn supports_bulk(&self) -> bool {
        true
    }

    fn as_slice(&self) -> &[T] {
        self.0
    }
}

/// Adapter over a caller-owned slice with fixed capacity. Reads record how
/// many elements arrived in `loaded` instead of reallocating.
pub struct FixedArray<'a, T> {
    slots: &'a mut [T],
    loaded: usize,
}

impl<'a, T> FixedArray<'a, T> {
    pub fn new(slots: &'a mut [T]) -> Self {
        FixedArray { slots, loaded: 0 }
    }

    /// Number of elements the last read produced.
    #[must_use]
    pub fn loaded(&self) -> usize {
        self.loaded
    }
}

impl<T: Copy> ArrayAdapter<T> for FixedArray<'_, T> {
    fn len(&self) -> usize {
        self.slots.len()
    }

    fn get(&self, index: usize) -> T {
        self.slots[index]
    }

    fn resize(&mut self, len: usize) {
        assert!(
            len <= self.slots.len(),
            "fixed array of {} slots cannot hold {len} elements",
            self.slots.len()
        );
        self.loaded = len;
    }

    fn set(&mut self, index: usize, value: T) {
        self.slots[index] = value;
    }

    fn supports_bulk(&self) -> bool {
        true
    }

    fn as_slice(&self) -> &[T] {
        self.slots
    }

    fn assign(&mut self, values: &[T]) {
        self.resize(values.len());
        self.slots[..values.len()].copy_from_slice(values);
    }
}

/// Read-only adapter presenting owned strings as name tokens.
pub struct StrSliceArray<'a> {
    items: &'a [String],
}

impl<'a> StrSliceArray<'a> {
    pub fn new(items: &'a [String]) -> Self {
        StrSliceArray { items }
    }
}

impl<'a, 'x> ArrayAdapter<Name<'x>> for StrSliceArray<'a>
where
    'a: 'x,
{
    fn len(&self) -> usize {
        self.items.len()
    }

    fn get(&self, index: usize) -> Name<'x> {
        Name::new(self.items[index].as_str())
    }
}

/// Write-only adapter collecting name tokens into owned strings.
pub struct StringVecSink<'a> {
    out: &'a mut Vec<String>,
}

impl<'a> StringVecSink<'a> {
    pub fn new(out: &'a mut Vec<String>) -> Self {
        StringVecSink { out }
    }
}

impl<'x> ArrayAdapter<Name<'x>> for StringVecSink<'_> {
    fn len(&self) -> usize {
        self.out.len()
    }

    fn resize(&mut self, len: usize) {
        self.out.resize(len, String::new());
    }

    fn set(&mut self, index: usize, value: Name<'x>) {
        self.out[index] = value.as_str().to_owned();
    }
}
