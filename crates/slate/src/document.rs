//! Owning and borrowed binary documents, plus the serialized layout.
//!
//! A binary document is a de-duplicated string table and a contiguous
//! element stream. The serialized form is host-endian and carries no magic
//! number or version tag:
//!
//! ```text
//! u64  string_count
//! repeat string_count times:
//!     u64  byte_length
//!     bytes[byte_length]        (no terminator)
//! u64  stream_bytes
//! bytes[stream_bytes]          (the element stream)
//! ```

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

// Cap on speculative preallocation: untrusted inputs can claim any count,
// only this much is allocated ahead of proof.
const MAX_PREALLOC: usize = 2048;

/// An owning binary document: string table plus element stream.
///
/// Created empty, filled by a [`BinaryWriter`](crate::BinaryWriter). Once
/// the outermost writer is dropped the stream contains no tombstones and
/// the document is ready to be read or persisted.
#[derive(Default, Clone)]
pub struct BinaryDocument {
    pub(crate) strings: Vec<String>,
    pub(crate) bytes: Vec<u8>,
}

impl BinaryDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The de-duplicated string table.
    #[inline]
    #[must_use]
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// The element stream.
    #[inline]
    #[must_use]
    pub fn stream(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty() && self.strings.is_empty()
    }

    /// Serialize the whole document into a byte vector.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.save_to(&mut out)
            .expect("writing to a Vec cannot fail");
        out
    }

    /// Write the serialized form to `out`.
    pub fn save_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(&(self.strings.len() as u64).to_ne_bytes())?;
        for s in &self.strings {
            out.write_all(&(s.len() as u64).to_ne_bytes())?;
            out.write_all(s.as_bytes())?;
        }
        out.write_all(&(self.bytes.len() as u64).to_ne_bytes())?;
        out.write_all(&self.bytes)?;
        debug!(
            strings = self.strings.len(),
            stream_bytes = self.bytes.len(),
            "binary document serialized"
        );
        Ok(())
    }

    /// Write the serialized form to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.save_to(&mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Read an owning document back from `input`.
    pub fn load_from<R: Read>(input: &mut R) -> Result<BinaryDocument> {
        let string_count = read_u64(input)? as usize;
        let mut strings = Vec::with_capacity(string_count.min(MAX_PREALLOC));
        for index in 0..string_count {
            let len = read_u64(input)?;
            let bytes = read_exact_len(input, len)?;
            let s = String::from_utf8(bytes).map_err(|_| Error::InvalidUtf8 { index })?;
            strings.push(s);
        }
        let stream_bytes = read_u64(input)?;
        let bytes = read_exact_len(input, stream_bytes)?;
        debug!(
            strings = strings.len(),
            stream_bytes = bytes.len(),
            "binary document loaded"
        );
        Ok(BinaryDocument { strings, bytes })
    }

    /// Read an owning document from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<BinaryDocument> {
        let mut input = BufReader::new(File::open(path)?);
        Self::load_from(&mut input)
    }
}

impl fmt::Debug for BinaryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryDocument")
            .field("strings", &self.strings.len())
            .field("stream_bytes", &self.bytes.len())
            .finish()
    }
}

/// A binary document parsed out of a byte blob.
///
/// The string table is copied out of the blob; the element stream stays
/// borrowed. This is the form produced when extracting an embedded
/// sub-document from a memory chunk.
#[derive(Clone)]
pub struct BinaryView<'a> {
    pub(crate) strings: Vec<String>,
    pub(crate) stream: &'a [u8],
}

impl<'a> BinaryView<'a> {
    /// Parse the serialized layout from `bytes`, validating every declared
    /// length against the remaining input.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<BinaryView<'a>> {
        let mut cursor = 0usize;

        let string_count = take_u64(bytes, &mut cursor)? as usize;
        let mut strings = Vec::with_capacity(string_count.min(MAX_PREALLOC));
        for index in 0..string_count {
            let len = take_u64(bytes, &mut cursor)? as usize;
            let raw = take(bytes, &mut cursor, len)?;
            let s = std::str::from_utf8(raw).map_err(|_| Error::InvalidUtf8 { index })?;
            strings.push(s.to_owned());
        }

        let declared = take_u64(bytes, &mut cursor)?;
        let remaining = bytes.len() - cursor;
        if declared as usize > remaining {
            return Err(Error::StreamOverrun {
                declared,
                remaining,
            });
        }
        let stream = &bytes[cursor..cursor + declared as usize];
        Ok(BinaryView { strings, stream })
    }

    #[inline]
    #[must_use]
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    #[inline]
    #[must_use]
    pub fn stream(&self) -> &'a [u8] {
        self.stream
    }
}

impl fmt::Debug for BinaryView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryView")
            .field("strings", &self.strings.len())
            .field("stream_bytes", &self.stream.len())
            .finish()
    }
}

fn read_u64<R: Read>(input: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf)?;
    Ok(u64::from_ne_bytes(buf))
}

// Reads exactly `len` bytes without trusting `len` for preallocation.
fn read_exact_len<R: Read>(input: &mut R, len: u64) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity((len as usize).min(MAX_PREALLOC));
    input.take(len).read_to_end(&mut buf)?;
    if (buf.len() as u64) != len {
        return Err(Error::Truncated {
            expected: (len - buf.len() as u64) as usize,
            found: 0,
        });
    }
    Ok(buf)
}

fn take<'a>(bytes: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = cursor.checked_add(len).ok_or(Error::Truncated {
        expected: len,
        found: bytes.len() - *cursor,
    })?;
    if end > bytes.len() {
        return Err(Error::Truncated {
            expected: len,
            found: bytes.len() - *cursor,
        });
    }
    let out = &bytes[*cursor..end];
    *cursor = end;
    Ok(out)
}

fn take_u64(bytes: &[u8], cursor: &mut usize) -> Result<u64> {
    let raw = take(bytes, cursor, 8)?;
    Ok(u64::from_ne_bytes(raw.try_into().expect("take returned 8 bytes")))
}
