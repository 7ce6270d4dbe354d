//! # Sluice Response Rate Limiting
//!
//! Response Rate Limiting (RRL) for authoritative DNS servers. RRL dampens
//! reflection and amplification attacks by deciding, per about-to-be-sent
//! response, whether to send it normally ([`Verdict::Allow`]), drop it
//! silently ([`Verdict::Drop`]), or truncate it so a legitimate client
//! retries over TCP ([`Verdict::Slip`]).
//!
//! Decisions aggregate by an equivalence class: the client's masked network
//! prefix, the query class and type, the response category, and (for some
//! categories) the query name. Each class carries a token bucket refilled
//! at the category's configured rate; classes live in a bounded,
//! LRU-recycled table.
//!
//! The limiter consumes already-classified responses and returns verdicts.
//! Message parsing, answer synthesis, wire rendering, and log formatting
//! belong to the calling server.
//!
//! ## Concurrency model
//!
//! [`ResponseLimiter`] is deliberately single-threaded: `check` takes
//! `&mut self`, state is private, and nothing suspends or performs I/O.
//! Run one limiter per packet-handling thread. For servers that want one
//! shared limiter instead, [`SharedLimiter`] wraps it in a mutex; the
//! critical section is a hash lookup plus token-bucket arithmetic and is
//! not a bottleneck below roughly 100 kqps per instance.
//!
//! ## Example
//!
//! ```rust
//! use sluice_proto::{Name, QClass, QType, Rcode};
//! use sluice_rrl::{ResponseLimiter, RrlConfig, Verdict};
//! use std::str::FromStr;
//!
//! let now = 1_700_000_000;
//! let mut limiter = ResponseLimiter::new(&RrlConfig::default(), now).unwrap();
//!
//! let client = "192.0.2.7".parse().unwrap();
//! let qname = Name::from_str("www.example.com").unwrap();
//! let verdict = limiter.check(
//!     client,
//!     false,
//!     QClass::IN,
//!     QType::A,
//!     Some(&qname),
//!     Rcode::NoError,
//!     now,
//! );
//! assert_eq!(verdict, Verdict::Allow);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bases;
pub mod config;
pub mod entry;
pub mod key;
pub mod log;
pub mod rates;
pub mod table;

pub use config::{ConfigError, RrlConfig};
pub use key::MaskedAddr;
pub use log::{BlockLogger, BlockSummary, NoopLogger, TracingLogger};
pub use rates::{RateVector, ResponseCategory};
pub use table::TableStats;

use crate::bases::TimestampBases;
use crate::key::RrlKey;
use crate::table::RrlTable;
use ipnet::IpNet;
use parking_lot::Mutex;
use sluice_proto::{Name, QClass, QType, Rcode};
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::net::IpAddr;

/// The limiter's decision for one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Send the response normally.
    Allow,
    /// Drop the response silently.
    Drop,
    /// Send a truncated (TC) response so the client retries over TCP.
    Slip,
}

impl Verdict {
    /// Returns true for `Drop` and `Slip`.
    #[inline]
    pub const fn is_penalized(self) -> bool {
        !matches!(self, Self::Allow)
    }
}

/// The response rate limiter.
///
/// Owns the entry table, the rate vector, and the timestamp base pool.
/// Construct one per server process (or per packet-handling thread; see
/// the crate docs for the concurrency model).
pub struct ResponseLimiter {
    table: RrlTable,
    rates: RateVector,
    bases: TimestampBases,
    window: u32,
    slip: u32,
    ipv4_prefix_len: u8,
    ipv6_prefix_len: u8,
    log_only: bool,
    exempt: Vec<IpNet>,
    hash_seed: u32,
    logger: Box<dyn BlockLogger>,
}

impl ResponseLimiter {
    /// Creates a limiter from validated configuration.
    ///
    /// `now` is the current wall-clock second; it anchors the first
    /// timestamp base and seeds the hash.
    pub fn new(config: &RrlConfig, now: u64) -> Result<Self, ConfigError> {
        Self::with_logger(config, Box::new(NoopLogger), now)
    }

    /// Creates a limiter that reports block transitions to `logger`.
    pub fn with_logger(
        config: &RrlConfig,
        logger: Box<dyn BlockLogger>,
        now: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            table: RrlTable::new(config.min_table_size, config.max_table_size),
            rates: RateVector::new(
                config.responses_per_second,
                config.nxdomains_per_second,
                config.errors_per_second,
            ),
            bases: TimestampBases::new(now),
            window: config.window,
            slip: config.slip,
            ipv4_prefix_len: config.ipv4_prefix_len,
            ipv6_prefix_len: config.ipv6_prefix_len,
            log_only: config.log_only,
            exempt: config.exempt.clone(),
            hash_seed: derive_hash_seed(now),
            logger,
        })
    }

    /// Decides the fate of one about-to-be-sent response.
    ///
    /// `is_reliable` marks responses delivered over connection-oriented
    /// transport (TCP and its encrypted variants); those are never limited
    /// and leave no state behind. `qname` is the owner name of the
    /// response — for NXDOMAIN the caller may pass the zone-clipped name.
    /// `now` is the current wall-clock second.
    ///
    /// In log-only mode the verdict is still computed and reported to the
    /// block logger, but the caller is expected to send the response
    /// regardless.
    #[allow(clippy::too_many_arguments)]
    pub fn check(
        &mut self,
        client: IpAddr,
        is_reliable: bool,
        qclass: QClass,
        qtype: QType,
        qname: Option<&Name>,
        rcode: Rcode,
        now: u64,
    ) -> Verdict {
        if is_reliable {
            return Verdict::Allow;
        }
        if self.is_exempt(client) {
            return Verdict::Allow;
        }

        let category = ResponseCategory::from_rcode(rcode);
        if self.rates.rate(category) == 0 {
            // Disabled category: no limiting, no state.
            return Verdict::Allow;
        }

        let key = RrlKey::new(
            client,
            self.ipv4_prefix_len,
            self.ipv6_prefix_len,
            category,
            qclass,
            qtype,
            qname,
            self.hash_seed,
        );
        let hash = key.hash(self.hash_seed);

        let (current, retired) = self.bases.current(now);
        if let Some(retired) = retired {
            self.table.note_retired_base(retired);
        }

        let idx = self.table.get_entry(
            &key,
            hash,
            &self.bases,
            current,
            &self.rates,
            now,
            self.window,
        );

        let entry = self.table.entry_mut(idx);
        let was_logging = entry.is_logging();
        let verdict =
            entry.update_balance(&self.bases, current, &self.rates, self.slip, now, self.window);

        // Block logging transitions: a first penalized verdict opens a
        // block, recovery (or a stale reset inside update_balance) closes
        // it.
        if verdict.is_penalized() {
            if !entry.is_logging() {
                entry.set_logging(true);
                let summary = summarize(
                    entry.key(),
                    self.ipv4_prefix_len,
                    self.ipv6_prefix_len,
                    self.log_only,
                );
                self.logger.on_block_start(&summary);
            }
        } else if was_logging {
            entry.set_logging(false);
            let summary = summarize(
                entry.key(),
                self.ipv4_prefix_len,
                self.ipv6_prefix_len,
                self.log_only,
            );
            self.logger.on_block_end(&summary);
        }

        verdict
    }

    fn is_exempt(&self, client: IpAddr) -> bool {
        self.exempt.iter().any(|net| net.contains(&client))
    }

    /// Returns the configured NOERROR rate.
    pub fn response_rate(&self) -> u32 {
        self.rates.rate(ResponseCategory::Query)
    }

    /// Returns the configured NXDOMAIN rate.
    pub fn nxdomain_rate(&self) -> u32 {
        self.rates.rate(ResponseCategory::NxDomain)
    }

    /// Returns the configured error rate.
    pub fn error_rate(&self) -> u32 {
        self.rates.rate(ResponseCategory::Error)
    }

    /// Returns the number of live entries in the table.
    pub fn entry_count(&self) -> usize {
        self.table.entry_count()
    }

    /// Returns the configured window, in seconds.
    pub fn window(&self) -> u32 {
        self.window
    }

    /// Returns the configured slip ratio.
    pub fn slip(&self) -> u32 {
        self.slip
    }

    /// Returns true when verdicts are advisory only.
    pub fn is_log_only(&self) -> bool {
        self.log_only
    }

    /// Returns the configured IPv4 prefix length.
    pub fn ipv4_prefix_len(&self) -> u8 {
        self.ipv4_prefix_len
    }

    /// Returns the configured IPv6 prefix length.
    pub fn ipv6_prefix_len(&self) -> u8 {
        self.ipv6_prefix_len
    }

    /// Returns the IPv4 client mask as a host-order integer.
    pub fn ipv4_mask(&self) -> u32 {
        key::v4_mask(self.ipv4_prefix_len)
    }

    /// Returns the IPv6 client mask as a host-order integer.
    pub fn ipv6_mask(&self) -> u128 {
        key::v6_mask(self.ipv6_prefix_len)
    }

    /// Returns the timestamp base in effect at `now`.
    pub fn current_timestamp_base(&mut self, now: u64) -> u64 {
        let (base, retired) = self.bases.current(now);
        if let Some(retired) = retired {
            self.table.note_retired_base(retired);
        }
        base.second
    }

    /// Returns the table behavior counters.
    pub fn table_stats(&self) -> &TableStats {
        self.table.stats()
    }
}

impl std::fmt::Debug for ResponseLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseLimiter")
            .field("rates", &self.rates)
            .field("window", &self.window)
            .field("slip", &self.slip)
            .field("ipv4_prefix_len", &self.ipv4_prefix_len)
            .field("ipv6_prefix_len", &self.ipv6_prefix_len)
            .field("log_only", &self.log_only)
            .field("entry_count", &self.table.entry_count())
            .finish_non_exhaustive()
    }
}

/// Builds the log summary for an entry.
fn summarize(key: &RrlKey, ipv4_prefix_len: u8, ipv6_prefix_len: u8, log_only: bool) -> BlockSummary {
    let addr = key.masked_addr();
    BlockSummary {
        network: addr.to_ip(),
        prefix_len: if addr.is_ipv4() {
            ipv4_prefix_len
        } else {
            ipv6_prefix_len
        },
        category: key.category(),
        qclass: key.qclass(),
        qtype: key.qtype(),
        log_only,
    }
}

/// Derives the per-instance hash seed from `(now, pid)`.
///
/// Unpredictable enough to frustrate trivially crafted collisions, and
/// deliberately nothing more.
fn derive_hash_seed(now: u64) -> u32 {
    let mut hasher = DefaultHasher::new();
    hasher.write_u64(now);
    hasher.write_u32(std::process::id());
    let h = hasher.finish();
    (h ^ (h >> 32)) as u32
}

/// A [`ResponseLimiter`] shareable across threads.
///
/// The parallel-safe deployment model: one limiter behind a single mutex.
/// All state mutation happens inside the short `check` critical section.
pub struct SharedLimiter {
    inner: Mutex<ResponseLimiter>,
}

impl SharedLimiter {
    /// Creates a shared limiter from validated configuration.
    pub fn new(config: &RrlConfig, now: u64) -> Result<Self, ConfigError> {
        Ok(Self {
            inner: Mutex::new(ResponseLimiter::new(config, now)?),
        })
    }

    /// Wraps an existing limiter.
    pub fn from_limiter(limiter: ResponseLimiter) -> Self {
        Self {
            inner: Mutex::new(limiter),
        }
    }

    /// Decides the fate of one response; see [`ResponseLimiter::check`].
    #[allow(clippy::too_many_arguments)]
    pub fn check(
        &self,
        client: IpAddr,
        is_reliable: bool,
        qclass: QClass,
        qtype: QType,
        qname: Option<&Name>,
        rcode: Rcode,
        now: u64,
    ) -> Verdict {
        self.inner
            .lock()
            .check(client, is_reliable, qclass, qtype, qname, rcode, now)
    }

    /// Returns the number of live entries in the table.
    pub fn entry_count(&self) -> usize {
        self.inner.lock().entry_count()
    }

    /// Runs `f` with the limiter locked, for introspection.
    pub fn with_limiter<R>(&self, f: impl FnOnce(&mut ResponseLimiter) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl std::fmt::Debug for SharedLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedLimiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const T: u64 = 1_700_000_000;

    fn limiter(config: &RrlConfig) -> ResponseLimiter {
        ResponseLimiter::new(config, T).unwrap()
    }

    fn small_config() -> RrlConfig {
        RrlConfig {
            min_table_size: 64,
            max_table_size: 1024,
            ..Default::default()
        }
    }

    #[test]
    fn test_constructor_rejects_bad_config() {
        let config = RrlConfig {
            ipv4_prefix_len: 40,
            ..Default::default()
        };
        assert!(ResponseLimiter::new(&config, T).is_err());
    }

    #[test]
    fn test_introspection() {
        let config = RrlConfig {
            responses_per_second: 7,
            nxdomains_per_second: 3,
            errors_per_second: 2,
            ..small_config()
        };
        let mut limiter = limiter(&config);
        assert_eq!(limiter.response_rate(), 7);
        assert_eq!(limiter.nxdomain_rate(), 3);
        assert_eq!(limiter.error_rate(), 2);
        assert_eq!(limiter.window(), 15);
        assert_eq!(limiter.slip(), 2);
        assert!(!limiter.is_log_only());
        assert_eq!(limiter.ipv4_prefix_len(), 24);
        assert_eq!(limiter.ipv4_mask(), 0xFFFF_FF00);
        assert_eq!(limiter.current_timestamp_base(T), T);
        assert_eq!(limiter.entry_count(), 0);
    }

    #[test]
    fn test_reliable_transport_bypasses_state() {
        let mut limiter = limiter(&small_config());
        let qname = Name::from_str("a.example").unwrap();
        for _ in 0..100 {
            let verdict = limiter.check(
                "192.0.2.7".parse().unwrap(),
                true,
                QClass::IN,
                QType::A,
                Some(&qname),
                Rcode::NoError,
                T,
            );
            assert_eq!(verdict, Verdict::Allow);
        }
        assert_eq!(limiter.entry_count(), 0);
    }

    #[test]
    fn test_exempt_network_bypasses_state() {
        let config = RrlConfig {
            exempt: vec!["192.0.2.0/24".parse().unwrap()],
            ..small_config()
        };
        let mut limiter = limiter(&config);
        for _ in 0..100 {
            let verdict = limiter.check(
                "192.0.2.7".parse().unwrap(),
                false,
                QClass::IN,
                QType::A,
                None,
                Rcode::NoError,
                T,
            );
            assert_eq!(verdict, Verdict::Allow);
        }
        assert_eq!(limiter.entry_count(), 0);
    }

    #[test]
    fn test_zero_rate_category_disabled() {
        let config = RrlConfig {
            errors_per_second: 0,
            ..small_config()
        };
        let mut limiter = limiter(&config);
        for _ in 0..100 {
            let verdict = limiter.check(
                "192.0.2.7".parse().unwrap(),
                false,
                QClass::IN,
                QType::A,
                None,
                Rcode::ServFail,
                T,
            );
            assert_eq!(verdict, Verdict::Allow);
        }
        assert_eq!(limiter.entry_count(), 0);
    }

    #[test]
    fn test_shared_limiter() {
        let config = small_config();
        let shared = SharedLimiter::new(&config, T).unwrap();
        let qname = Name::from_str("a.example").unwrap();
        for _ in 0..5 {
            let verdict = shared.check(
                "192.0.2.7".parse().unwrap(),
                false,
                QClass::IN,
                QType::A,
                Some(&qname),
                Rcode::NoError,
                T,
            );
            assert_eq!(verdict, Verdict::Allow);
        }
        assert_eq!(shared.entry_count(), 1);
        let window = shared.with_limiter(|l| l.window());
        assert_eq!(window, 15);
    }
}
