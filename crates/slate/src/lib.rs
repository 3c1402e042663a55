//! Describe your data once, read and write it in multiple formats.
//!
//! Application code targets the [`Serializer`] visitor: one function per
//! user type invokes the visitor's primitives, and the same code path
//! drives reading and writing in every backend. Two backends ship in the
//! crate — a JSON backend over `serde_json` values and a compact binary
//! format with an interned string table — plus a [`transcode`] layer that
//! converts any source document into any destination backend.
//!
//! ```
//! use slate::{name, BinaryDocument, BinaryReader, BinaryWriter, Serializer};
//!
//! #[derive(Default, PartialEq, Debug)]
//! struct Stats {
//!     level: i32,
//!     health: f32,
//! }
//!
//! fn persist_stats(s: &mut dyn Serializer<'_>, stats: &mut Stats) {
//!     s.int32(name!("level"), &mut stats.level);
//!     s.float32(name!("health"), &mut stats.health);
//! }
//!
//! let mut doc = BinaryDocument::new();
//! {
//!     let mut writer = BinaryWriter::new(&mut doc);
//!     let mut stats = Stats { level: 12, health: 55.5 };
//!     persist_stats(&mut writer, &mut stats);
//! }
//!
//! let mut reader = BinaryReader::new(&doc);
//! let mut loaded = Stats::default();
//! persist_stats(&mut reader, &mut loaded);
//! assert_eq!(loaded, Stats { level: 12, health: 55.5 });
//! ```

pub mod array;
pub mod containers;
pub mod document;
pub mod element;
pub mod error;
pub mod json;
pub mod name;
pub mod reader;
pub mod serializer;
pub mod transcode;
pub mod writer;

pub use array::ArrayAdapter;
pub use containers::{put, FixedArray, Persist, SliceArray, StrSliceArray, StringVecSink, VecArray};
pub use document::{BinaryDocument, BinaryView};
pub use error::{Error, Result};
pub use json::{JsonReader, JsonWriter};
pub use name::Name;
pub use reader::BinaryReader;
pub use serializer::{
    iterate_members, read_object_array, serialize_object, write_object_array, Serializer,
};
pub use transcode::{transcode_binary, transcode_binary_view, transcode_json};
pub use writer::BinaryWriter;
