//! Polymorphic views over homogeneous sequences.
//!
//! An [`ArrayAdapter`] lets a backend read or fill an external sequence
//! without owning it. Writers use the read side (`len`/`get`), readers use
//! the write side (`resize`/`set`). The bulk methods are optional; backends
//! that store elements contiguously take them when
//! [`supports_bulk`](ArrayAdapter::supports_bulk) says so.
//!
//! An adapter is transient: it borrows the underlying storage for the
//! duration of a single serialize call. Invoking a side the adapter does
//! not support is a programming error and panics.

/// Read/write capability over a homogeneous sequence of `T`.
pub trait ArrayAdapter<T> {
    /// Number of elements currently held.
    fn len(&self) -> usize;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch the element at `index`. Used by writers.
    fn get(&self, _index: usize) -> T {
        panic!("array adapter is write-only: get is not supported");
    }

    /// Resize the backing storage to `len` elements. Used by readers.
    fn resize(&mut self, _len: usize) {
        panic!("array adapter is read-only: resize is not supported");
    }

    /// Store `value` at `index`. Used by readers, after `resize`.
    fn set(&mut self, _index: usize, _value: T) {
        panic!("array adapter is read-only: set is not supported");
    }

    /// Whether the bulk methods below are available.
    fn supports_bulk(&self) -> bool {
        false
    }

    /// Contiguous view of all elements. Requires `supports_bulk`.
    fn as_slice(&self) -> &[T] {
        panic!("array adapter does not support bulk access");
    }

    /// Replace the whole contents with `values` (resize + copy).
    /// Requires `supports_bulk`.
    fn assign(&mut self, _values: &[T]) {
        panic!("array adapter does not support bulk access");
    }
}
