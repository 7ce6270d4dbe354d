//! DNS query classes.
//!
//! The limiter treats the class as an opaque key component, so this is a
//! transparent `u16` newtype rather than a closed enum; the mnemonic
//! constants cover the registered values (RFC 1035, RFC 2136).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A DNS query class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QClass(pub u16);

impl QClass {
    /// Internet - RFC 1035.
    pub const IN: Self = Self(1);

    /// CHAOS - RFC 1035.
    pub const CH: Self = Self(3);

    /// Hesiod - RFC 1035.
    pub const HS: Self = Self(4);

    /// Query class NONE - RFC 2136.
    pub const NONE: Self = Self(254);

    /// Query class ANY (*) - RFC 1035.
    pub const ANY: Self = Self(255);

    /// Returns the numeric value of the class.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        self.0
    }

    /// Creates a class from its numeric value.
    #[inline]
    pub const fn from_u16(value: u16) -> Self {
        Self(value)
    }

    /// Returns true if this is the Internet class.
    #[inline]
    pub const fn is_internet(self) -> bool {
        self.0 == Self::IN.0
    }

    /// Returns the mnemonic for registered classes.
    pub const fn mnemonic(self) -> Option<&'static str> {
        match self.0 {
            1 => Some("IN"),
            3 => Some("CH"),
            4 => Some("HS"),
            254 => Some("NONE"),
            255 => Some("ANY"),
            _ => None,
        }
    }
}

impl From<u16> for QClass {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<QClass> for u16 {
    fn from(class: QClass) -> Self {
        class.0
    }
}

impl fmt::Display for QClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mnemonic() {
            Some(m) => f.write_str(m),
            None => write!(f, "CLASS{}", self.0),
        }
    }
}

impl Default for QClass {
    fn default() -> Self {
        Self::IN
    }
}
