//! Callgrind sampling toggles.
//!
//! Callgrind's collection state is process-global. [`Callgrind`] is the single
//! place that issues commands against it. Every command is fire-and-forget:
//! there is no return value, and when the process is not running under valgrind
//! the requests execute as no-ops.
//!
//! The coordinator is `Send` but not `Sync`. Callgrind offers no guarantees for
//! concurrent requests from several threads, so callers that benchmark from
//! more than one thread must serialize access themselves.
//!
//! ```ignore
//! use instrument_hooks::Callgrind;
//!
//! let callgrind = Callgrind::attach();
//! callgrind.zero_stats();
//! callgrind.start_instrumentation();
//! run_benchmark();
//! callgrind.stop_instrumentation();
//! callgrind.dump_stats_at("bench::fibo");
//! callgrind.detach();
//! ```

pub(crate) mod client_request;

use std::cell::Cell;
use std::marker::PhantomData;

use client_request::{callgrind, CallgrindRequest};

/// Whether this process runs under valgrind.
#[inline]
pub fn running_on_valgrind() -> bool {
    client_request::running_on_valgrind() > 0
}

/// Coordinator for callgrind's global collection state.
#[derive(Debug)]
pub struct Callgrind {
    on_valgrind: bool,
    _not_sync: PhantomData<Cell<()>>,
}

impl Callgrind {
    /// Set up the coordinator, probing once whether valgrind is present.
    pub fn attach() -> Self {
        let on_valgrind = running_on_valgrind();
        if on_valgrind {
            tracing::info!("callgrind toggles active (running under valgrind)");
        } else {
            tracing::debug!("not running under valgrind; callgrind toggles are no-ops");
        }
        Self {
            on_valgrind,
            _not_sync: PhantomData,
        }
    }

    /// Whether requests reach a live valgrind instance.
    pub fn is_active(&self) -> bool {
        self.on_valgrind
    }

    /// Start collecting instrumentation data.
    #[inline(always)]
    pub fn start_instrumentation(&self) {
        callgrind(CallgrindRequest::StartInstrumentation, 0);
    }

    /// Stop collecting instrumentation data.
    #[inline(always)]
    pub fn stop_instrumentation(&self) {
        callgrind(CallgrindRequest::StopInstrumentation, 0);
    }

    /// Dump the counters accumulated so far.
    pub fn dump_stats(&self) {
        callgrind(CallgrindRequest::DumpStats, 0);
    }

    /// Dump the counters, tagging the dump with `label`.
    ///
    /// Valgrind reads the label as a C string, so it is cut at the first NUL
    /// byte if one is present.
    pub fn dump_stats_at(&self, label: &str) {
        self.dump_stats_at_bytes(label.as_bytes());
    }

    /// [`dump_stats_at`](Self::dump_stats_at) for a label that is not
    /// necessarily UTF-8, e.g. one received from C. Cut at the first NUL.
    pub fn dump_stats_at_bytes(&self, label: &[u8]) {
        let end = label.iter().position(|&b| b == 0).unwrap_or(label.len());
        dump_stats_at_bytes(&label[..end]);
    }

    /// Reset the counters to zero.
    pub fn zero_stats(&self) {
        callgrind(CallgrindRequest::ZeroStats, 0);
    }

    /// Flip the fine-grained "collecting" flag.
    pub fn toggle_collect(&self) {
        callgrind(CallgrindRequest::ToggleCollect, 0);
    }

    /// Tear the coordinator down.
    ///
    /// Collection state is left as is; callgrind owns it.
    pub fn detach(self) {
        tracing::debug!(on_valgrind = self.on_valgrind, "callgrind coordinator detached");
    }
}

/// `DUMP_STATS_AT` with a label that must not contain NUL.
pub(crate) fn dump_stats_at_bytes(label: &[u8]) {
    let mut c_label = Vec::with_capacity(label.len() + 1);
    c_label.extend_from_slice(label);
    c_label.push(0);
    callgrind(CallgrindRequest::DumpStatsAt, c_label.as_ptr() as usize);
}

/// Zero the counters and start instrumentation.
#[inline(always)]
pub(crate) fn begin_region() {
    callgrind(CallgrindRequest::ZeroStats, 0);
    callgrind(CallgrindRequest::StartInstrumentation, 0);
}

/// Stop instrumentation.
#[inline(always)]
pub(crate) fn end_region() {
    callgrind(CallgrindRequest::StopInstrumentation, 0);
}
