//! In-memory response body stream.
//!
//! A [`Body`] behaves like a temporary file opened read/write: writes advance
//! the cursor, reads start from the cursor, and [`Body::rewind`] returns to
//! offset 0. Serialization always sends the full contents regardless of the
//! cursor.

use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

/// A seekable, readable and writable byte stream.
///
/// # Examples
///
/// ```
/// use std::io::{Read, Write};
/// use webwire::http::Body;
///
/// let mut body = Body::new();
/// body.write_all(b"hello").unwrap();
/// assert_eq!(body.position(), 5);
///
/// body.rewind();
/// let mut text = String::new();
/// body.read_to_string(&mut text).unwrap();
/// assert_eq!(text, "hello");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Body {
    cursor: Cursor<Vec<u8>>,
}

impl Body {
    /// Creates an empty stream positioned at offset 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stream holding `bytes`, positioned at offset 0.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            cursor: Cursor::new(bytes.into()),
        }
    }

    /// Current read/write offset.
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Moves the cursor back to offset 0.
    pub fn rewind(&mut self) {
        self.cursor.set_position(0);
    }

    /// Total number of bytes held, independent of the cursor.
    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    /// The full contents, independent of the cursor.
    pub fn as_bytes(&self) -> &[u8] {
        self.cursor.get_ref()
    }

    /// Drops all contents and resets the cursor.
    pub fn clear(&mut self) {
        self.cursor = Cursor::new(Vec::new());
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.cursor.into_inner()
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Write for Body {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for Body {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}
