//! DNS response codes (RCODEs).
//!
//! Header response codes as defined in RFC 1035 Section 4.1.1 and RFC 2136.
//! Extended (EDNS) codes never reach the limiter: by the time a response is
//! classified for rate limiting only the header code matters.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// DNS header response code.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u16)]
pub enum Rcode {
    /// No error condition - RFC 1035.
    NoError = 0,

    /// Format error - the server could not interpret the query - RFC 1035.
    FormErr = 1,

    /// Server failure - RFC 1035.
    ServFail = 2,

    /// Name error - the queried domain does not exist - RFC 1035.
    NXDomain = 3,

    /// Not implemented - RFC 1035.
    NotImp = 4,

    /// Query refused for policy reasons - RFC 1035.
    Refused = 5,

    /// Name exists when it should not - RFC 2136.
    YXDomain = 6,

    /// RR set exists when it should not - RFC 2136.
    YXRRSet = 7,

    /// RR set that should exist does not - RFC 2136.
    NXRRSet = 8,

    /// Server not authoritative / not authorized - RFC 2136, RFC 8945.
    NotAuth = 9,

    /// Name not contained in zone - RFC 2136.
    NotZone = 10,
}

impl Rcode {
    /// Returns the numeric value of the response code.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Creates a response code from its numeric value.
    #[inline]
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Returns true if this response indicates success.
    #[inline]
    pub const fn is_no_error(self) -> bool {
        matches!(self, Self::NoError)
    }

    /// Returns true if this response indicates the name does not exist.
    #[inline]
    pub const fn is_nxdomain(self) -> bool {
        matches!(self, Self::NXDomain)
    }

    /// Returns the conventional upper-case name of the response code.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoError => "NOERROR",
            Self::FormErr => "FORMERR",
            Self::ServFail => "SERVFAIL",
            Self::NXDomain => "NXDOMAIN",
            Self::NotImp => "NOTIMP",
            Self::Refused => "REFUSED",
            Self::YXDomain => "YXDOMAIN",
            Self::YXRRSet => "YXRRSET",
            Self::NXRRSet => "NXRRSET",
            Self::NotAuth => "NOTAUTH",
            Self::NotZone => "NOTZONE",
        }
    }
}

impl std::fmt::Display for Rcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Default for Rcode {
    fn default() -> Self {
        Self::NoError
    }
}
