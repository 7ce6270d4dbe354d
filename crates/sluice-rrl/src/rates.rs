//! Response categories and the per-category rate vector.

use serde::{Deserialize, Serialize};
use sluice_proto::Rcode;
use std::fmt;

/// The category a response is rate-counted under.
///
/// Responses sharing a category share a token bucket; the three categories
/// carry independently configured rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseCategory {
    /// Positive answers (NOERROR).
    Query,
    /// Non-existent domain answers (NXDOMAIN).
    NxDomain,
    /// Everything else (SERVFAIL, REFUSED, FORMERR, ...).
    Error,
}

impl ResponseCategory {
    /// Classifies a response code into its rate category.
    ///
    /// Unknown or unusual rcodes deliberately land in `Error`; that is a
    /// classification, not a failure.
    #[inline]
    pub const fn from_rcode(rcode: Rcode) -> Self {
        match rcode {
            Rcode::NoError => Self::Query,
            Rcode::NXDomain => Self::NxDomain,
            _ => Self::Error,
        }
    }

    /// Stable one-byte tag used in key hashing.
    #[inline]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Query => 0,
            Self::NxDomain => 1,
            Self::Error => 2,
        }
    }

    /// Returns the category name used in log lines.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Query => "response",
            Self::NxDomain => "nxdomain",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ResponseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The three configured rates, in responses per second.
///
/// A zero rate disables limiting for that category entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateVector {
    responses_per_second: u32,
    nxdomains_per_second: u32,
    errors_per_second: u32,
}

impl RateVector {
    /// Creates a rate vector from the three configured rates.
    pub const fn new(
        responses_per_second: u32,
        nxdomains_per_second: u32,
        errors_per_second: u32,
    ) -> Self {
        Self {
            responses_per_second,
            nxdomains_per_second,
            errors_per_second,
        }
    }

    /// Returns the configured rate for a category.
    #[inline]
    pub const fn rate(&self, category: ResponseCategory) -> u32 {
        match category {
            ResponseCategory::Query => self.responses_per_second,
            ResponseCategory::NxDomain => self.nxdomains_per_second,
            ResponseCategory::Error => self.errors_per_second,
        }
    }

    /// Returns the tokens regenerated over `elapsed` seconds, saturating.
    #[inline]
    pub fn credit(&self, category: ResponseCategory, elapsed: u32) -> i32 {
        let tokens = u64::from(self.rate(category)) * u64::from(elapsed);
        i32::try_from(tokens).unwrap_or(i32::MAX)
    }
}
