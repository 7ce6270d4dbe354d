//! Equivalence-class keys and the seeded entry hash.
//!
//! A key identifies the tuple responses are rate-counted under: the client's
//! masked network prefix, the response category, the query class and type,
//! and (for some categories) the query name. Keys are fixed-size: the name
//! contributes a 32-bit hash of its lowercased wire form rather than the
//! name itself, so building a key and creating an entry never allocates.

use crate::rates::ResponseCategory;
use sluice_proto::{Name, QClass, QType};
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// A client address masked to the configured prefix.
///
/// Masked-off bits are zero, so every client in the same prefix produces
/// byte-identical keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskedAddr {
    /// Masked IPv4 address bytes.
    V4([u8; 4]),
    /// Masked IPv6 address bytes.
    V6([u8; 16]),
}

impl MaskedAddr {
    /// Masks a client address to the configured prefix lengths.
    ///
    /// IPv4-mapped IPv6 addresses are unmapped first so a client keys the
    /// same whether it arrived over a v4 or a dual-stack v6 socket.
    pub fn new(addr: IpAddr, ipv4_prefix_len: u8, ipv6_prefix_len: u8) -> Self {
        let addr = match addr {
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => IpAddr::V4(v4),
                None => IpAddr::V6(v6),
            },
            v4 => v4,
        };

        match addr {
            IpAddr::V4(v4) => {
                let masked = u32::from(v4) & v4_mask(ipv4_prefix_len);
                Self::V4(masked.to_be_bytes())
            }
            IpAddr::V6(v6) => {
                let masked = u128::from(v6) & v6_mask(ipv6_prefix_len);
                Self::V6(masked.to_be_bytes())
            }
        }
    }

    /// Returns the network address for display and logging.
    pub fn to_ip(self) -> IpAddr {
        match self {
            Self::V4(bytes) => IpAddr::V4(Ipv4Addr::from(bytes)),
            Self::V6(bytes) => IpAddr::V6(Ipv6Addr::from(bytes)),
        }
    }

    /// Returns true for an IPv4 prefix.
    pub const fn is_ipv4(self) -> bool {
        matches!(self, Self::V4(_))
    }

    fn write_to(&self, hasher: &mut DefaultHasher) {
        match self {
            Self::V4(bytes) => {
                hasher.write_u8(4);
                hasher.write(bytes);
            }
            Self::V6(bytes) => {
                hasher.write_u8(6);
                hasher.write(bytes);
            }
        }
    }
}

/// Returns the IPv4 mask keeping the top `prefix_len` bits.
pub(crate) const fn v4_mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else if prefix_len >= 32 {
        u32::MAX
    } else {
        u32::MAX << (32 - prefix_len)
    }
}

/// Returns the IPv6 mask keeping the top `prefix_len` bits.
pub(crate) const fn v6_mask(prefix_len: u8) -> u128 {
    if prefix_len == 0 {
        0
    } else if prefix_len >= 128 {
        u128::MAX
    } else {
        u128::MAX << (128 - prefix_len)
    }
}

/// The fingerprint an entry is keyed and compared by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RrlKey {
    addr: MaskedAddr,
    /// Seeded hash of the lowercased wire-format name; 0 when no name
    /// participates in the key.
    qname_hash: u32,
    qclass: u16,
    qtype: u16,
    category: ResponseCategory,
}

impl RrlKey {
    /// Builds the key for one about-to-be-sent response.
    ///
    /// For the `Error` category the query name is deliberately ignored:
    /// errors aggregate per prefix, class and type, so a flood cannot be
    /// diffused across arbitrary names. For `NxDomain` the caller may pass
    /// the zone-clipped name; it is hashed opaquely either way.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: IpAddr,
        ipv4_prefix_len: u8,
        ipv6_prefix_len: u8,
        category: ResponseCategory,
        qclass: QClass,
        qtype: QType,
        qname: Option<&Name>,
        seed: u32,
    ) -> Self {
        let qname_hash = match (category, qname) {
            (ResponseCategory::Error, _) | (_, None) => 0,
            (_, Some(name)) => hash_name(name, seed),
        };

        Self {
            addr: MaskedAddr::new(client, ipv4_prefix_len, ipv6_prefix_len),
            qname_hash,
            qclass: qclass.to_u16(),
            qtype: qtype.to_u16(),
            category,
        }
    }

    /// Placeholder key for vacant arena slots.
    pub(crate) const fn vacant() -> Self {
        Self {
            addr: MaskedAddr::V4([0; 4]),
            qname_hash: 0,
            qclass: 0,
            qtype: 0,
            category: ResponseCategory::Query,
        }
    }

    /// Computes the seeded 32-bit entry hash over every key field.
    pub fn hash(&self, seed: u32) -> u32 {
        let mut hasher = DefaultHasher::new();
        hasher.write_u32(seed);
        self.addr.write_to(&mut hasher);
        hasher.write_u8(self.category.tag());
        hasher.write_u16(self.qclass);
        hasher.write_u16(self.qtype);
        hasher.write_u32(self.qname_hash);
        fold(hasher.finish())
    }

    /// Returns the masked client prefix.
    pub fn masked_addr(&self) -> MaskedAddr {
        self.addr
    }

    /// Returns the response category.
    pub fn category(&self) -> ResponseCategory {
        self.category
    }

    /// Returns the query class.
    pub fn qclass(&self) -> QClass {
        QClass::from_u16(self.qclass)
    }

    /// Returns the query type.
    pub fn qtype(&self) -> QType {
        QType::from_u16(self.qtype)
    }
}

/// Hashes the lowercased wire form of a name with the instance seed.
fn hash_name(name: &Name, seed: u32) -> u32 {
    let mut hasher = DefaultHasher::new();
    hasher.write_u32(seed);
    for &b in name.wire() {
        hasher.write_u8(b.to_ascii_lowercase());
    }
    fold(hasher.finish())
}

/// Folds a 64-bit hash into 32 bits.
const fn fold(h: u64) -> u32 {
    (h ^ (h >> 32)) as u32
}
