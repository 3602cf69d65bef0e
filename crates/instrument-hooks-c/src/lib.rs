//! C ABI for instrument-hooks.
//!
//! Exposes the handle manager, session controller, markers and callgrind
//! toggles to C, C++ and to Python through cffi/ctypes.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │          Harness (C / C++ / Python)           │
//! ├───────────────────────────────────────────────┤
//! │            instrument_hooks.h                 │
//! ├───────────────────────────────────────────────┤
//! │   instrument-hooks-c (this crate, FFI layer)  │
//! │                     │                         │
//! │                     ▼                         │
//! │   instrument-hooks (handle, session, markers) │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! # Safety
//!
//! Handles are heap-allocated `InstrumentHooks` values handed out as opaque
//! pointers. A NULL handle is rejected with `IH_INVALID_HANDLE` before any
//! backend is touched. All public functions use `catch_unwind` so Rust panics
//! never cross the FFI boundary.

use std::ffi::{c_char, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

use instrument_hooks::{Callgrind, Feature, InstrumentHooks, MarkerType};

pub mod types;

use types::{status_of, IhStatus};

thread_local! {
    static CALLGRIND: Callgrind = Callgrind::attach();
}

// ============================================================================
// Handle lifecycle
// ============================================================================

/// Acquire an instrumentation handle.
///
/// Returns NULL when no handle can be acquired, which is the normal outcome
/// outside an instrumented environment.
#[no_mangle]
pub extern "C" fn instrument_hooks_init() -> *mut InstrumentHooks {
    let result = catch_unwind(InstrumentHooks::acquire);
    match result {
        Ok(Ok(hooks)) => Box::into_raw(Box::new(hooks)),
        Ok(Err(e)) => {
            tracing::debug!(reason = %e, "instrument_hooks_init returned NULL");
            ptr::null_mut()
        }
        Err(_) => ptr::null_mut(),
    }
}

/// Release a handle. NULL is ignored.
///
/// # Safety
///
/// - `hooks` must come from [`instrument_hooks_init`] or be NULL
/// - Only call this once per handle
#[no_mangle]
pub unsafe extern "C" fn instrument_hooks_deinit(hooks: *mut InstrumentHooks) {
    if hooks.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        Box::from_raw(hooks).release();
    }));
}

/// Whether the handle's backend is actively instrumenting.
///
/// # Safety
///
/// `hooks` must be a live handle or NULL.
#[no_mangle]
pub unsafe extern "C" fn instrument_hooks_is_instrumented(hooks: *mut InstrumentHooks) -> bool {
    if hooks.is_null() {
        return false;
    }
    catch_unwind(AssertUnwindSafe(|| (*hooks).is_instrumented())).unwrap_or(false)
}

// ============================================================================
// Session
// ============================================================================

/// Start a measured region.
///
/// # Safety
///
/// `hooks` must be a live handle or NULL.
#[no_mangle]
pub unsafe extern "C" fn instrument_hooks_start_benchmark(hooks: *mut InstrumentHooks) -> IhStatus {
    with_hooks(hooks, |h| status_of("start_benchmark", h.start_benchmark()))
}

/// End the measured region.
///
/// # Safety
///
/// `hooks` must be a live handle or NULL.
#[no_mangle]
pub unsafe extern "C" fn instrument_hooks_stop_benchmark(hooks: *mut InstrumentHooks) -> IhStatus {
    with_hooks(hooks, |h| status_of("stop_benchmark", h.stop_benchmark()))
}

/// Record the executed benchmark for a process.
///
/// # Safety
///
/// - `hooks` must be a live handle or NULL
/// - `uri` must be a NUL-terminated string or NULL
#[no_mangle]
pub unsafe extern "C" fn instrument_hooks_set_executed_benchmark(
    hooks: *mut InstrumentHooks,
    pid: i32,
    uri: *const c_char,
) -> IhStatus {
    with_hooks(hooks, |h| match str_arg(uri) {
        Some(uri) => status_of("set_executed_benchmark", h.set_executed_benchmark(pid, uri)),
        None => IhStatus::InvalidArgument,
    })
}

/// Record the harness integration.
///
/// # Safety
///
/// - `hooks` must be a live handle or NULL
/// - `name` and `version` must be NUL-terminated strings or NULL
#[no_mangle]
pub unsafe extern "C" fn instrument_hooks_set_integration(
    hooks: *mut InstrumentHooks,
    name: *const c_char,
    version: *const c_char,
) -> IhStatus {
    with_hooks(hooks, |h| match (str_arg(name), str_arg(version)) {
        (Some(name), Some(version)) => {
            status_of("set_integration", h.set_integration(name, version))
        }
        _ => IhStatus::InvalidArgument,
    })
}

// ============================================================================
// Markers and clock
// ============================================================================

/// Forward a timestamped marker.
///
/// `marker_type` is one of the `MARKER_TYPE_*` values.
///
/// # Safety
///
/// `hooks` must be a live handle or NULL.
#[no_mangle]
pub unsafe extern "C" fn instrument_hooks_add_marker(
    hooks: *mut InstrumentHooks,
    pid: u32,
    marker_type: u8,
    timestamp: u64,
) -> IhStatus {
    with_hooks(hooks, |h| {
        let result =
            MarkerType::try_from(marker_type).and_then(|ty| h.add_marker(pid, ty, timestamp));
        status_of("add_marker", result)
    })
}

/// Monotonic timestamp in nanoseconds. Needs no handle.
#[no_mangle]
pub extern "C" fn instrument_hooks_current_timestamp() -> u64 {
    instrument_hooks::current_timestamp()
}

/// Toggle a process-wide feature. Unknown feature values are ignored.
#[no_mangle]
pub extern "C" fn instrument_hooks_set_feature(feature: u64, enabled: bool) {
    match Feature::from_raw(feature) {
        Some(feature) => instrument_hooks::set_feature(feature, enabled),
        None => tracing::debug!(feature, "ignoring unknown feature"),
    }
}

// ============================================================================
// Callgrind toggles
// ============================================================================

/// Start callgrind instrumentation. No-op outside valgrind.
#[no_mangle]
pub extern "C" fn callgrind_start_instrumentation() {
    with_callgrind(Callgrind::start_instrumentation);
}

/// Stop callgrind instrumentation. No-op outside valgrind.
#[no_mangle]
pub extern "C" fn callgrind_stop_instrumentation() {
    with_callgrind(Callgrind::stop_instrumentation);
}

/// Dump callgrind counters.
#[no_mangle]
pub extern "C" fn callgrind_dump_stats() {
    with_callgrind(Callgrind::dump_stats);
}

/// Dump callgrind counters tagged with `label`, passed through byte for
/// byte. NULL dumps without a label.
///
/// # Safety
///
/// `label` must be a NUL-terminated string or NULL.
#[no_mangle]
pub unsafe extern "C" fn callgrind_dump_stats_at(label: *const c_char) {
    if label.is_null() {
        callgrind_dump_stats();
        return;
    }
    let label = CStr::from_ptr(label).to_bytes();
    with_callgrind(|cg| cg.dump_stats_at_bytes(label));
}

/// Zero callgrind counters.
#[no_mangle]
pub extern "C" fn callgrind_zero_stats() {
    with_callgrind(Callgrind::zero_stats);
}

/// Flip callgrind's collect flag.
#[no_mangle]
pub extern "C" fn callgrind_toggle_collect() {
    with_callgrind(Callgrind::toggle_collect);
}

/// Library version.
#[no_mangle]
pub extern "C" fn instrument_hooks_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ============================================================================
// Internal implementation
// ============================================================================

unsafe fn with_hooks(
    hooks: *mut InstrumentHooks,
    f: impl FnOnce(&mut InstrumentHooks) -> IhStatus,
) -> IhStatus {
    if hooks.is_null() {
        return IhStatus::InvalidHandle;
    }
    let hooks = &mut *hooks;
    catch_unwind(AssertUnwindSafe(|| f(hooks))).unwrap_or(IhStatus::Panic)
}

fn with_callgrind(f: impl FnOnce(&Callgrind)) {
    let _ = catch_unwind(AssertUnwindSafe(|| CALLGRIND.with(f)));
}

/// Borrow a C string argument; NULL and invalid UTF-8 are rejected.
unsafe fn str_arg<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}
