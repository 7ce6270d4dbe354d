//! DNS domain name representation.
//!
//! A [`Name`] is an uncompressed wire-format label sequence: each label is
//! prefixed by its length byte and the sequence ends with the zero-length
//! root label. Compression pointers are rejected; a stored name must be
//! self-contained.
//!
//! Names compare and hash ASCII-case-insensitively per RFC 1035 and
//! RFC 4343, so `a.EXAMPLE` and `A.example` are the same key everywhere in
//! this workspace.

use crate::error::{Error, Result};
use crate::{MAX_LABEL_LENGTH, MAX_NAME_LENGTH};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A DNS domain name.
///
/// Stored as the complete uncompressed wire encoding, including the
/// terminating root label. Typical names fit the 64-byte inline buffer
/// without touching the heap.
///
/// # Example
///
/// ```rust
/// use sluice_proto::Name;
/// use std::str::FromStr;
///
/// let name = Name::from_str("www.example.com").unwrap();
/// assert_eq!(name.label_count(), 3);
/// assert_eq!(name, Name::from_str("WWW.Example.COM").unwrap());
/// ```
#[derive(Clone)]
pub struct Name {
    /// Wire-format bytes, terminated by the root label.
    wire: SmallVec<[u8; 64]>,
}

impl Name {
    /// Creates the root domain name.
    #[inline]
    pub fn root() -> Self {
        Self {
            wire: SmallVec::from_slice(&[0]),
        }
    }

    /// Creates a domain name from uncompressed wire-format bytes.
    ///
    /// The bytes must be a valid label sequence ending in the root label,
    /// with no compression pointers and no trailing data.
    pub fn from_wire(bytes: &[u8]) -> Result<Self> {
        Self::validate_wire(bytes)?;
        Ok(Self {
            wire: SmallVec::from_slice(bytes),
        })
    }

    /// Validates an uncompressed wire-format name.
    fn validate_wire(bytes: &[u8]) -> Result<()> {
        if bytes.len() > MAX_NAME_LENGTH {
            return Err(Error::NameTooLong {
                length: bytes.len(),
            });
        }

        let mut pos = 0;
        loop {
            let Some(&len) = bytes.get(pos) else {
                // Ran off the end without seeing the root label.
                return Err(Error::EmptyLabel { position: pos });
            };
            let len = len as usize;

            if len == 0 {
                let remaining = bytes.len() - pos - 1;
                if remaining != 0 {
                    return Err(Error::TrailingData { remaining });
                }
                return Ok(());
            }
            if len >= 0xC0 {
                return Err(Error::CompressedName { offset: pos });
            }
            if len > MAX_LABEL_LENGTH {
                return Err(Error::LabelTooLong { length: len });
            }
            pos += 1 + len;
        }
    }

    /// Returns the wire-format bytes, including the terminating root label.
    #[inline]
    pub fn wire(&self) -> &[u8] {
        &self.wire
    }

    /// Returns the wire-format length in bytes.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.wire.len()
    }

    /// Returns true if this is the root name.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.wire.len() == 1
    }

    /// Returns the number of labels, excluding the root label.
    pub fn label_count(&self) -> usize {
        self.labels().count()
    }

    /// Iterates over the labels, root label excluded.
    pub fn labels(&self) -> LabelIter<'_> {
        LabelIter {
            wire: &self.wire,
            pos: 0,
        }
    }

    /// Returns a copy with every label byte ASCII-lowercased.
    ///
    /// Length bytes are at most 63 and therefore never collide with the
    /// ASCII uppercase range, so the whole wire form can be folded.
    pub fn lowercased(&self) -> Self {
        let mut wire = self.wire.clone();
        wire.make_ascii_lowercase();
        Self { wire }
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.wire.eq_ignore_ascii_case(&other.wire)
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for &b in self.wire.iter() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl FromStr for Name {
    type Err = Error;

    /// Parses a name from presentation format.
    ///
    /// Accepts both absolute (`example.com.`) and relative (`example.com`)
    /// spellings; the result is always stored absolute. Escapes are not
    /// supported.
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || s == "." {
            return Ok(Self::root());
        }

        let s = s.strip_suffix('.').unwrap_or(s);
        let mut wire = SmallVec::new();
        for label in s.split('.') {
            if label.is_empty() {
                return Err(Error::InvalidPresentation {
                    message: "empty label".to_string(),
                });
            }
            if label.len() > MAX_LABEL_LENGTH {
                return Err(Error::LabelTooLong {
                    length: label.len(),
                });
            }
            wire.push(label.len() as u8);
            wire.extend_from_slice(label.as_bytes());
        }
        wire.push(0);

        if wire.len() > MAX_NAME_LENGTH {
            return Err(Error::NameTooLong { length: wire.len() });
        }
        Ok(Self { wire })
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        let mut first = true;
        for label in self.labels() {
            if !first {
                f.write_str(".")?;
            }
            first = false;
            for &b in label {
                match b {
                    b'.' | b'\\' => write!(f, "\\{}", b as char)?,
                    0x21..=0x7E => write!(f, "{}", b as char)?,
                    _ => write!(f, "\\{b:03}")?,
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({self})")
    }
}

/// Iterator over the labels of a [`Name`].
pub struct LabelIter<'a> {
    wire: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for LabelIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let len = *self.wire.get(self.pos)? as usize;
        if len == 0 {
            return None;
        }
        let start = self.pos + 1;
        self.pos = start + len;
        self.wire.get(start..start + len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(name: &Name) -> u64 {
        let mut h = DefaultHasher::new();
        name.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_from_str_wire_form() {
        let name = Name::from_str("www.example.com").unwrap();
        assert_eq!(name.wire(), b"\x03www\x07example\x03com\x00");
        assert_eq!(name.label_count(), 3);
        assert!(!name.is_root());
    }

    #[test]
    fn test_absolute_and_relative_spellings() {
        assert_eq!(
            Name::from_str("example.com").unwrap(),
            Name::from_str("example.com.").unwrap()
        );
    }

    #[test]
    fn test_root() {
        let root = Name::root();
        assert!(root.is_root());
        assert_eq!(root.label_count(), 0);
        assert_eq!(root.wire(), &[0]);
        assert_eq!(Name::from_str(".").unwrap(), root);
    }

    #[test]
    fn test_case_insensitive_eq_and_hash() {
        let a = Name::from_str("a.EXAMPLE.com").unwrap();
        let b = Name::from_str("A.example.COM").unwrap();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let c = Name::from_str("b.example.com").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_lowercased() {
        let name = Name::from_str("MiXeD.Example").unwrap();
        assert_eq!(name.lowercased().wire(), b"\x05mixed\x07example\x00");
    }

    #[test]
    fn test_from_wire_validation() {
        assert!(Name::from_wire(b"\x03www\x07example\x03com\x00").is_ok());

        // Pointer byte.
        assert!(matches!(
            Name::from_wire(b"\xC0\x0C"),
            Err(Error::CompressedName { offset: 0 })
        ));

        // Missing root terminator.
        assert!(Name::from_wire(b"\x03www").is_err());

        // Trailing bytes after root.
        assert!(matches!(
            Name::from_wire(b"\x03www\x00\x01"),
            Err(Error::TrailingData { remaining: 1 })
        ));
    }

    #[test]
    fn test_label_length_limits() {
        let long_label = "a".repeat(64);
        assert!(matches!(
            Name::from_str(&long_label),
            Err(Error::LabelTooLong { length: 64 })
        ));

        // Four 63-byte labels exceed the 255-byte wire limit.
        let label = "a".repeat(63);
        let long_name = format!("{label}.{label}.{label}.{label}");
        assert!(matches!(
            Name::from_str(&long_name),
            Err(Error::NameTooLong { .. })
        ));
    }

    #[test]
    fn test_display() {
        let name = Name::from_str("www.example.com").unwrap();
        assert_eq!(name.to_string(), "www.example.com");
        assert_eq!(Name::root().to_string(), ".");
    }
}
