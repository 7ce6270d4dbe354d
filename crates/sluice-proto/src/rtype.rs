//! DNS query types.
//!
//! Like [`QClass`](crate::QClass), the limiter only ever compares and hashes
//! the type value, so this is a transparent `u16` newtype with mnemonic
//! constants for the types that show up in practice.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A DNS query type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QType(pub u16);

impl QType {
    /// IPv4 host address - RFC 1035.
    pub const A: Self = Self(1);

    /// Authoritative name server - RFC 1035.
    pub const NS: Self = Self(2);

    /// Canonical name for an alias - RFC 1035.
    pub const CNAME: Self = Self(5);

    /// Start of a zone of authority - RFC 1035.
    pub const SOA: Self = Self(6);

    /// Domain name pointer - RFC 1035.
    pub const PTR: Self = Self(12);

    /// Mail exchange - RFC 1035.
    pub const MX: Self = Self(15);

    /// Text strings - RFC 1035.
    pub const TXT: Self = Self(16);

    /// IPv6 host address - RFC 3596.
    pub const AAAA: Self = Self(28);

    /// Service locator - RFC 2782.
    pub const SRV: Self = Self(33);

    /// EDNS OPT pseudo-RR - RFC 6891.
    pub const OPT: Self = Self(41);

    /// Delegation signer - RFC 4034.
    pub const DS: Self = Self(43);

    /// DNSSEC signature - RFC 4034.
    pub const RRSIG: Self = Self(46);

    /// DNSSEC key - RFC 4034.
    pub const DNSKEY: Self = Self(48);

    /// HTTPS binding - RFC 9460.
    pub const HTTPS: Self = Self(65);

    /// Incremental zone transfer - RFC 1995.
    pub const IXFR: Self = Self(251);

    /// Full zone transfer - RFC 1035.
    pub const AXFR: Self = Self(252);

    /// All records (*) - RFC 1035.
    pub const ANY: Self = Self(255);

    /// Returns the numeric value of the type.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        self.0
    }

    /// Creates a type from its numeric value.
    #[inline]
    pub const fn from_u16(value: u16) -> Self {
        Self(value)
    }

    /// Returns the mnemonic for well-known types.
    pub const fn mnemonic(self) -> Option<&'static str> {
        match self.0 {
            1 => Some("A"),
            2 => Some("NS"),
            5 => Some("CNAME"),
            6 => Some("SOA"),
            12 => Some("PTR"),
            15 => Some("MX"),
            16 => Some("TXT"),
            28 => Some("AAAA"),
            33 => Some("SRV"),
            41 => Some("OPT"),
            43 => Some("DS"),
            46 => Some("RRSIG"),
            48 => Some("DNSKEY"),
            65 => Some("HTTPS"),
            251 => Some("IXFR"),
            252 => Some("AXFR"),
            255 => Some("ANY"),
            _ => None,
        }
    }
}

impl From<u16> for QType {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<QType> for u16 {
    fn from(qtype: QType) -> Self {
        qtype.0
    }
}

impl fmt::Display for QType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mnemonic() {
            Some(m) => f.write_str(m),
            None => write!(f, "TYPE{}", self.0),
        }
    }
}
