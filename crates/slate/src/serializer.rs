//! The uniform read/write visitor interface.
//!
//! Application code describes its data once against [`Serializer`] and the
//! same code path drives both directions: a writer reads each slot and
//! records it, a reader locates the member and stores into the slot. The
//! [`is_reader`](Serializer::is_reader) probe is a single virtual call and
//! tells conditional logic (container resize, child construction) which
//! side to take.
//!
//! `'doc` is the lifetime of the backing document. It only matters on the
//! read side: string slots receive borrows that stay valid for as long as
//! the document. Writers implement the trait for any `'doc`.

use crate::array::ArrayAdapter;
use crate::name::Name;

/// Polymorphic serializer applied to user data.
///
/// Every operation takes the slot as a mutable reference on both sides:
/// writers read it, readers assign it. Reading a name that does not exist
/// leaves the slot untouched, which is what makes optional members and
/// schema growth work.
pub trait Serializer<'doc> {
    /// Does this serializer read a document (as opposed to writing one)?
    fn is_reader(&self) -> bool;

    /// Is there a member called `name` in the current scope?
    fn has_member(&self, name: Name<'_>) -> bool;

    fn int32(&mut self, name: Name<'_>, slot: &mut i32);
    fn uint32(&mut self, name: Name<'_>, slot: &mut u32);
    fn float32(&mut self, name: Name<'_>, slot: &mut f32);
    fn boolean(&mut self, name: Name<'_>, slot: &mut bool);

    /// Serialize a string slot.
    ///
    /// On read the slot receives a borrow valid for `'doc`; a missing
    /// member leaves it untouched. On write the slot must hold a value and
    /// the backend captures the bytes during the call.
    fn string<'x>(&mut self, name: Name<'_>, slot: &mut Option<&'x str>)
    where
        'doc: 'x;

    /// Serialize a named sub-object; `body` runs with a serializer scoped
    /// to it. On write, a body that emits nothing persists no element.
    /// On read, a missing member does not invoke `body`.
    fn object(&mut self, name: Name<'_>, body: &mut dyn FnMut(&mut dyn Serializer<'doc>));

    /// Visit each member of the current scope in document order.
    /// `visit` returns `false` to stop.
    fn iterate(&mut self, visit: &mut dyn FnMut(&mut dyn Serializer<'doc>, Name<'_>) -> bool);

    fn int32_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<i32>);
    fn uint32_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<u32>);
    fn float32_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<f32>);
    fn bool_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<bool>);
    fn string_array<'x>(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<Name<'x>>)
    where
        'doc: 'x;

    /// Write a heterogeneous array of `len` sub-objects; `each` runs once
    /// per index with a serializer scoped to that slot. A slot whose body
    /// emits nothing is recorded as null. Writer-only.
    fn write_object_array(
        &mut self,
        name: Name<'_>,
        len: usize,
        each: &mut dyn FnMut(&mut dyn Serializer<'doc>, usize),
    );

    /// Number of slots in the heterogeneous array `name`, or 0 when absent.
    /// Reader-only.
    fn read_object_array_len(&mut self, name: Name<'_>) -> usize;

    /// Visit each non-null slot of the heterogeneous array `name`.
    /// Null slots are skipped silently. Reader-only.
    fn read_object_array(
        &mut self,
        name: Name<'_>,
        each: &mut dyn FnMut(&mut dyn Serializer<'doc>, usize),
    );
}

/// Serialize a named sub-object with an ordinary closure.
pub fn serialize_object<'doc>(
    s: &mut dyn Serializer<'doc>,
    name: Name<'_>,
    mut body: impl FnMut(&mut dyn Serializer<'doc>),
) {
    s.object(name, &mut body);
}

/// Visit each member of the current scope with an ordinary closure.
/// The closure returns `false` to stop.
pub fn iterate_members<'doc>(
    s: &mut dyn Serializer<'doc>,
    mut visit: impl FnMut(&mut dyn Serializer<'doc>, Name<'_>) -> bool,
) {
    s.iterate(&mut visit);
}

/// Write a heterogeneous array with an ordinary closure.
///
/// # Panics
///
/// Panics if `s` is a reader.
pub fn write_object_array<'doc>(
    s: &mut dyn Serializer<'doc>,
    name: Name<'_>,
    len: usize,
    mut each: impl FnMut(&mut dyn Serializer<'doc>, usize),
) {
    assert!(!s.is_reader(), "write_object_array requires a writer");
    s.write_object_array(name, len, &mut each);
}

/// Read a heterogeneous array with an ordinary closure.
///
/// # Panics
///
/// Panics if `s` is a writer.
pub fn read_object_array<'doc>(
    s: &mut dyn Serializer<'doc>,
    name: Name<'_>,
    mut each: impl FnMut(&mut dyn Serializer<'doc>, usize),
) {
    assert!(s.is_reader(), "read_object_array requires a reader");
    s.read_object_array(name, &mut each);
}
