//! Process-wide feature flags.
//!
//! Flags are stored in a single atomic bitset, so they can be toggled from any
//! thread. They affect every handle in the process.

use std::sync::atomic::{AtomicU64, Ordering};

static ENABLED: AtomicU64 = AtomicU64::new(0);

/// Optional behaviour switches.
#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// The callgrind backend's start/stop skip the start/stop-instrumentation
    /// client requests, leaving them to the harness.
    DisableCallgrindMarkers = 0,
}

impl Feature {
    /// Look up a feature by its raw C ABI value.
    pub fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            0 => Some(Feature::DisableCallgrindMarkers),
            _ => None,
        }
    }

    #[inline]
    fn mask(self) -> u64 {
        1 << (self as u64)
    }
}

/// Enable or disable a feature for the whole process.
pub fn set_feature(feature: Feature, enabled: bool) {
    if enabled {
        ENABLED.fetch_or(feature.mask(), Ordering::Relaxed);
    } else {
        ENABLED.fetch_and(!feature.mask(), Ordering::Relaxed);
    }
    tracing::debug!(?feature, enabled, "feature flag updated");
}

/// Whether a feature is currently enabled.
#[inline]
pub fn is_enabled(feature: Feature) -> bool {
    ENABLED.load(Ordering::Relaxed) & feature.mask() != 0
}
