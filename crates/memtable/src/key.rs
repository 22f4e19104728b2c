//! Primary-key type and its canonical byte encoding.
//!
//! Keys are a closed, ordered union over the scalar types a primary key may
//! take. Both the memtable's equality semantics and the segment sort /
//! binary-search depend on this ordering being total and transitive, so it
//! is derived from the variant order rather than computed per comparison:
//! all integers sort before all strings, which sort before all byte strings.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

/// Key encoding tags. Part of the segment format; never renumber.
const TAG_INT: u8 = 0;
const TAG_STR: u8 = 1;
const TAG_BYTES: u8 = 2;

/// A primary-key value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    /// Signed 64-bit integer key.
    Int(i64),
    /// UTF-8 string key.
    Str(String),
    /// Raw byte-string key.
    Bytes(Vec<u8>),
}

impl Key {
    /// Appends the canonical encoding of this key to `buf`.
    ///
    /// Layout: `tag: u8` then either `i64 LE` (int) or `len: u32 LE | bytes`
    /// (string / byte string).
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Key::Int(v) => {
                buf.push(TAG_INT);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Key::Str(s) => {
                buf.push(TAG_STR);
                buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
                buf.extend_from_slice(s.as_bytes());
            }
            Key::Bytes(b) => {
                buf.push(TAG_BYTES);
                buf.extend_from_slice(&(b.len() as u32).to_le_bytes());
                buf.extend_from_slice(b);
            }
        }
    }

    /// Returns the canonical encoding as a fresh buffer.
    #[must_use]
    pub fn encoded(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf
    }

    /// Length of the canonical encoding in bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self {
            Key::Int(_) => 1 + 8,
            Key::Str(s) => 1 + 4 + s.len(),
            Key::Bytes(b) => 1 + 4 + b.len(),
        }
    }

    /// Decodes a key from `r`, refusing lengths above `max_len`.
    ///
    /// The cap guards against allocating from a corrupt length field; the
    /// caller picks it (the segment reader uses its key-size maximum).
    pub fn read_from<R: Read>(r: &mut R, max_len: usize) -> io::Result<Key> {
        let tag = r.read_u8()?;
        match tag {
            TAG_INT => Ok(Key::Int(r.read_i64::<LittleEndian>()?)),
            TAG_STR => {
                let len = r.read_u32::<LittleEndian>()? as usize;
                if len > max_len {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("key length {} exceeds maximum {}", len, max_len),
                    ));
                }
                let mut bytes = vec![0u8; len];
                r.read_exact(&mut bytes)?;
                let s = String::from_utf8(bytes).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidData, "string key is not valid UTF-8")
                })?;
                Ok(Key::Str(s))
            }
            TAG_BYTES => {
                let len = r.read_u32::<LittleEndian>()? as usize;
                if len > max_len {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("key length {} exceeds maximum {}", len, max_len),
                    ));
                }
                let mut bytes = vec![0u8; len];
                r.read_exact(&mut bytes)?;
                Ok(Key::Bytes(bytes))
            }
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown key tag: {}", other),
            )),
        }
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int(v)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<Vec<u8>> for Key {
    fn from(b: Vec<u8>) -> Self {
        Key::Bytes(b)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{}", v),
            Key::Str(s) => write!(f, "{}", s),
            Key::Bytes(b) => {
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}
