//! # Sluice DNS Vocabulary
//!
//! Minimal DNS protocol types consumed by the Sluice response rate limiter.
//!
//! The limiter classifies and counts responses; it never parses or renders
//! DNS messages. This crate therefore provides only the vocabulary that
//! crosses the limiter's boundary:
//!
//! - [`QClass`] and [`QType`] — opaque 16-bit query class and type values
//! - [`Rcode`] — header response codes (RFC 1035, RFC 2136)
//! - [`Name`] — an uncompressed wire-format domain name with the
//!   case-insensitive comparison semantics of RFC 1035 and RFC 4343
//!
//! Message parsing, rdata, EDNS, and wire rendering belong to the calling
//! server, not here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod class;
pub mod error;
pub mod name;
pub mod rcode;
pub mod rtype;

pub use class::QClass;
pub use error::{Error, Result};
pub use name::Name;
pub use rcode::Rcode;
pub use rtype::QType;

/// Maximum length of a DNS label (63 bytes per RFC 1035).
pub const MAX_LABEL_LENGTH: usize = 63;

/// Maximum length of a domain name in wire format (255 bytes per RFC 1035).
pub const MAX_NAME_LENGTH: usize = 255;
