/// Length tag announcing a 3-byte little-endian length prefix.
pub const LONG_STRING_TAG: u8 = 254;

/// Longest string the word encoding can carry (the long form has 24 bits of length).
pub const MAX_STRING_LEN: usize = (1 << 24) - 1;

/// Errors raised while reading from a [`ByteBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// Fewer than `needed` bytes remain at `offset`.
    Truncated { offset: usize, needed: usize },
    /// A string started with the reserved length tag 255.
    InvalidStringTag { offset: usize },
    /// Unread bytes remain after the last expected value.
    Unconsumed { offset: usize },
    /// The string starting at `offset` is not valid UTF-8.
    InvalidUtf8 { offset: usize },
}

/// Errors raised while writing to a [`ByteBufferMut`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteError {
    /// The string does not fit the 24-bit length of the long form.
    StringTooLong { len: usize },
}

/// A TL schema buffer meant for reading.
///
/// The schema is a stream of little-endian 32-bit words. Strings are the only
/// values that are not a whole number of words on their own, so every string is
/// padded up to the next 4-byte boundary.
///
/// ```
/// let mut bb = tlgen_schema::ByteBuffer::new(&[3, b'a', b'b', b'c', 7, 0, 0, 0]);
/// assert_eq!(bb.read_string().unwrap(), "abc");
/// assert_eq!(bb.read_i32(), Ok(7));
/// assert_eq!(bb.read_end(), Ok(()));
/// ```
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> ByteBuffer<'a> {
    /// Create a new ByteBuffer that wraps the provided byte slice.
    pub fn new(data: &'a [u8]) -> ByteBuffer<'a> {
        ByteBuffer { data, index: 0 }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Retrieves the current index into the underlying byte slice. This starts
    /// off as 0 and ends up as `self.data().len()` when everything has been
    /// read.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ReadError> {
        if self.remaining() < len {
            return Err(ReadError::Truncated { offset: self.index, needed: len });
        }
        let value = &self.data[self.index..self.index + len];
        self.index += len;
        Ok(value)
    }

    /// Try to read a little-endian 32-bit integer starting at the current index.
    pub fn read_i32(&mut self) -> Result<i32, ReadError> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Try to read a little-endian 64-bit integer starting at the current index.
    pub fn read_i64(&mut self) -> Result<i64, ReadError> {
        let bytes = self.take(8)?;
        let mut word = [0u8; 8];
        word.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(word))
    }

    /// Try to read a length-tagged, word-padded UTF-8 string starting at the
    /// current index.
    pub fn read_string(&mut self) -> Result<&'a str, ReadError> {
        let start = self.index;
        let tag = self.take(1)?[0];

        let (len, header) = match tag {
            255 => {
                self.index = start;
                return Err(ReadError::InvalidStringTag { offset: start });
            }
            LONG_STRING_TAG => {
                let b = self.take(3)?;
                let len = b[0] as usize | (b[1] as usize) << 8 | (b[2] as usize) << 16;
                (len, 4)
            }
            short => (short as usize, 1),
        };

        let bytes = self.take(len)?;
        let padding = padding_for(header + len);
        self.take(padding)?;
        std::str::from_utf8(bytes).map_err(|_| {
            self.index = start;
            ReadError::InvalidUtf8 { offset: start }
        })
    }

    /// Succeeds only when the whole buffer has been consumed.
    pub fn read_end(&self) -> Result<(), ReadError> {
        if self.remaining() != 0 {
            return Err(ReadError::Unconsumed { offset: self.index });
        }
        Ok(())
    }
}

fn padding_for(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// A TL schema buffer meant for writing.
#[derive(Default)]
pub struct ByteBufferMut {
    data: Vec<u8>,
}

impl ByteBufferMut {
    /// Creates an empty ByteBufferMut ready for writing.
    pub fn new() -> ByteBufferMut {
        ByteBufferMut { data: vec![] }
    }

    /// Consumes this buffer and returns the underlying backing store.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write a little-endian 32-bit integer to the end of the buffer.
    pub fn write_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian 64-bit integer to the end of the buffer.
    pub fn write_i64(&mut self, value: i64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a string to the end of the buffer, padded to a word boundary.
    /// Nothing is written if the string is longer than [`MAX_STRING_LEN`] bytes.
    pub fn write_string(&mut self, value: &str) -> Result<(), WriteError> {
        let bytes = value.as_bytes();
        let len = bytes.len();
        if len > MAX_STRING_LEN {
            return Err(WriteError::StringTooLong { len });
        }

        let header = if len < LONG_STRING_TAG as usize {
            self.data.push(len as u8);
            1
        } else {
            self.data.extend_from_slice(&[LONG_STRING_TAG, len as u8, (len >> 8) as u8, (len >> 16) as u8]);
            4
        };
        self.data.extend_from_slice(bytes);
        let padding = padding_for(header + len);
        self.data.extend(std::iter::repeat(0).take(padding));
        Ok(())
    }
}

#[test]
fn read_i32() {
    let read = |bytes| ByteBuffer::new(bytes).read_i32();
    assert_eq!(read(&[]), Err(ReadError::Truncated { offset: 0, needed: 4 }));
    assert_eq!(read(&[1, 2, 3]), Err(ReadError::Truncated { offset: 0, needed: 4 }));
    assert_eq!(read(&[1, 0, 0, 0]), Ok(1));
    assert_eq!(read(&[0xff, 0xff, 0xff, 0xff]), Ok(-1));
    assert_eq!(read(&[0xe2, 0x9b, 0x2f, 0x3a]), Ok(0x3a2f9be2));
}

#[test]
fn read_i64() {
    let read = |bytes| ByteBuffer::new(bytes).read_i64();
    assert_eq!(read(&[0; 7]), Err(ReadError::Truncated { offset: 0, needed: 8 }));
    assert_eq!(read(&[1, 0, 0, 0, 0, 0, 0, 0]), Ok(1));
    assert_eq!(read(&[0, 0, 0, 0, 1, 0, 0, 0]), Ok(1 << 32));
    assert_eq!(read(&[0xff; 8]), Ok(-1));
}

#[test]
fn read_string() {
    let read = |bytes| ByteBuffer::new(bytes).read_string().map(|s| s.to_owned());
    assert_eq!(read(&[0, 0, 0, 0]), Ok(String::new()));
    assert_eq!(read(&[1, b'x', 0, 0]), Ok("x".to_owned()));
    assert_eq!(read(&[3, b'a', b'b', b'c']), Ok("abc".to_owned()));
    assert_eq!(read(&[4, b'a', b'b', b'c', b'd', 0, 0, 0]), Ok("abcd".to_owned()));
    assert_eq!(read(&[4, b'a', b'b', b'c']), Err(ReadError::Truncated { offset: 1, needed: 4 }));
    assert_eq!(read(&[255, 0, 0, 0]), Err(ReadError::InvalidStringTag { offset: 0 }));
    assert_eq!(read(&[2, 0xc3, 0x28, 0]), Err(ReadError::InvalidUtf8 { offset: 0 }));
    assert_eq!(read(&[2, 0xc3, 0xa9, 0]), Ok("\u{e9}".to_owned()));
}

#[test]
fn read_string_keeps_position_on_bad_utf8() {
    let mut bb = ByteBuffer::new(&[1, 0xff, 0, 0]);
    assert_eq!(bb.read_string(), Err(ReadError::InvalidUtf8 { offset: 0 }));
    assert_eq!(bb.index(), 0);
}

#[test]
fn read_long_string() {
    let mut bytes = vec![254, 0, 1, 0];
    bytes.extend(std::iter::repeat(b'z').take(256));
    let mut bb = ByteBuffer::new(&bytes);
    assert_eq!(bb.read_string().unwrap().len(), 256);
    assert_eq!(bb.read_end(), Ok(()));
}

#[test]
fn read_end() {
    let mut bb = ByteBuffer::new(&[1, 0, 0, 0, 2, 0, 0, 0]);
    assert_eq!(bb.read_i32(), Ok(1));
    assert_eq!(bb.read_end(), Err(ReadError::Unconsumed { offset: 4 }));
    assert_eq!(bb.read_i32(), Ok(2));
    assert_eq!(bb.read_end(), Ok(()));
}

#[cfg(test)]
fn write_once(cb: fn(&mut ByteBufferMut)) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    cb(&mut bb);
    bb.data()
}

#[test]
fn write_i32() {
    assert_eq!(write_once(|bb| bb.write_i32(0)), [0, 0, 0, 0]);
    assert_eq!(write_once(|bb| bb.write_i32(-1)), [255, 255, 255, 255]);
    assert_eq!(write_once(|bb| bb.write_i32(0x12eb4386)), [0x86, 0x43, 0xeb, 0x12]);
}

#[test]
fn write_string() {
    assert_eq!(write_once(|bb| bb.write_string("").unwrap()), [0, 0, 0, 0]);
    assert_eq!(write_once(|bb| bb.write_string("abc").unwrap()), [3, b'a', b'b', b'c']);
    assert_eq!(write_once(|bb| bb.write_string("abcd").unwrap()), [4, b'a', b'b', b'c', b'd', 0, 0, 0]);

    let long = "y".repeat(300);
    let mut bb = ByteBufferMut::new();
    bb.write_string(&long).unwrap();
    let data = bb.data();
    assert_eq!(&data[..4], &[254, 44, 1, 0]);
    assert_eq!(data.len(), 304);
}

#[test]
fn write_string_too_long() {
    let mut bb = ByteBufferMut::new();
    bb.write_i32(1);
    let len = MAX_STRING_LEN + 1;
    assert_eq!(bb.write_string(&"z".repeat(len)), Err(WriteError::StringTooLong { len }));
    assert_eq!(bb.len(), 4);
}

#[test]
fn write_sequence() {
    let mut bb = ByteBufferMut::new();
    bb.write_i32(5);
    bb.write_string("id").unwrap();
    bb.write_i64(-2);
    let data = bb.data();
    assert_eq!(data.len(), 16);

    let mut bb = ByteBuffer::new(&data);
    assert_eq!(bb.read_i32(), Ok(5));
    assert_eq!(bb.read_string().unwrap(), "id");
    assert_eq!(bb.read_i64(), Ok(-2));
    assert_eq!(bb.read_end(), Ok(()));
}

#[cfg(test)]
mod props {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn string_round_trip(s in "\\PC{0,600}") {
            let mut bb = ByteBufferMut::new();
            bb.write_string(&s).unwrap();
            let data = bb.data();
            prop_assert_eq!(data.len() % 4, 0);

            let mut bb = ByteBuffer::new(&data);
            prop_assert_eq!(bb.read_string().unwrap(), s.as_str());
            prop_assert_eq!(bb.read_end(), Ok(()));
        }

        #[test]
        fn long_string_round_trip(len in 250usize..70_000) {
            let s = "q".repeat(len);
            let mut bb = ByteBufferMut::new();
            bb.write_string(&s).unwrap();
            let data = bb.data();
            prop_assert_eq!(data.len() % 4, 0);

            let mut bb = ByteBuffer::new(&data);
            prop_assert_eq!(bb.read_string().unwrap().len(), len);
            prop_assert_eq!(bb.read_end(), Ok(()));
        }
    }
}
