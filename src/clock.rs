//! Monotonic high-resolution clock for marker timestamps.
//!
//! On unix this reads `CLOCK_MONOTONIC` directly, which is the clock perf uses
//! for its sample timestamps, so markers line up with a recorded trace.
//! Elsewhere it falls back to [`std::time::Instant`] measured from the first
//! call in the process.
//!
//! Only intra-process monotonicity is guaranteed. Reading the clock needs no
//! handle and is safe from any thread.

/// Current monotonic time in nanoseconds.
#[cfg(unix)]
#[inline]
pub fn current_timestamp() -> u64 {
    let mut ts = unsafe { std::mem::zeroed::<libc::timespec>() };
    // Only fails if the clock id is unsupported.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    if rc != 0 {
        return fallback::current_timestamp();
    }
    (ts.tv_sec as u64)
        .saturating_mul(1_000_000_000)
        .saturating_add(ts.tv_nsec as u64)
}

/// Current monotonic time in nanoseconds.
#[cfg(not(unix))]
#[inline]
pub fn current_timestamp() -> u64 {
    fallback::current_timestamp()
}

mod fallback {
    use std::sync::OnceLock;
    use std::time::Instant;

    static ANCHOR: OnceLock<Instant> = OnceLock::new();

    pub(super) fn current_timestamp() -> u64 {
        let anchor = ANCHOR.get_or_init(Instant::now);
        u64::try_from(anchor.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}
