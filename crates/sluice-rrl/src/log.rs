//! Block logging collaborator.
//!
//! The limiter does not format or emit log lines itself; it reports block
//! transitions to a [`BlockLogger`] and the server decides what to do with
//! them. The default [`NoopLogger`] discards everything; [`TracingLogger`]
//! forwards to the `tracing` subscriber.

use crate::rates::ResponseCategory;
use sluice_proto::{QClass, QType};
use std::fmt;
use std::net::IpAddr;

/// Summary of a blocked equivalence class, handed to the logger at the
/// start and end of a penalized run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSummary {
    /// Masked network address of the blocked prefix.
    pub network: IpAddr,
    /// Prefix length the address was masked to.
    pub prefix_len: u8,
    /// Rate category of the blocked responses.
    pub category: ResponseCategory,
    /// Query class.
    pub qclass: QClass,
    /// Query type.
    pub qtype: QType,
    /// True when the limiter is running in log-only mode and the caller is
    /// expected to send the response regardless.
    pub log_only: bool,
}

impl fmt::Display for BlockSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} {} {} {}",
            self.network, self.prefix_len, self.qclass, self.qtype, self.category
        )?;
        if self.log_only {
            f.write_str(" (log-only)")?;
        }
        Ok(())
    }
}

/// Receives block start/stop notifications from the limiter.
///
/// Implementations must not block; they run inside the verdict path.
pub trait BlockLogger {
    /// A previously unpenalized equivalence class has entered a penalized
    /// run.
    fn on_block_start(&self, summary: &BlockSummary) {
        let _ = summary;
    }

    /// A penalized equivalence class has recovered.
    fn on_block_end(&self, summary: &BlockSummary) {
        let _ = summary;
    }
}

/// Discards all block notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl BlockLogger for NoopLogger {}

/// Emits block notifications as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl BlockLogger for TracingLogger {
    fn on_block_start(&self, summary: &BlockSummary) {
        tracing::info!(%summary, "rate limiting {}", summary.network);
    }

    fn on_block_end(&self, summary: &BlockSummary) {
        tracing::info!(%summary, "done rate limiting {}", summary.network);
    }
}
