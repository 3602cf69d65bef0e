//! Integration tests for the instrument-hooks C ABI.
//!
//! Live handles are built through the Rust API with an inert configuration
//! and passed across as raw pointers, exactly as `instrument_hooks_init`
//! hands them out.

use std::ffi::c_char;
use std::ptr;

use instrument_hooks::{Config, InstrumentHooks};
use instrument_hooks_c::types::IhStatus;
use instrument_hooks_c::*;

// =============================================================================
// Test Helpers
// =============================================================================

fn inert_handle() -> *mut InstrumentHooks {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::new()
        .require_env(false)
        .detect_valgrind(false)
        .runner_fifos(dir.path().join("ctl.fifo"), dir.path().join("ack.fifo"));
    let hooks = InstrumentHooks::acquire_with(&config).unwrap();
    Box::into_raw(Box::new(hooks))
}

fn cstr(s: &'static [u8]) -> *const c_char {
    assert_eq!(s.last(), Some(&0));
    s.as_ptr() as *const c_char
}

// =============================================================================
// NULL handle
// =============================================================================

#[test]
fn null_handle_is_rejected_everywhere() {
    let null = ptr::null_mut();
    unsafe {
        assert!(!instrument_hooks_is_instrumented(null));
        assert_eq!(instrument_hooks_start_benchmark(null), IhStatus::InvalidHandle);
        assert_eq!(instrument_hooks_stop_benchmark(null), IhStatus::InvalidHandle);
        assert_eq!(
            instrument_hooks_set_executed_benchmark(null, 1, cstr(b"bench\0")),
            IhStatus::InvalidHandle
        );
        assert_eq!(
            instrument_hooks_set_integration(null, cstr(b"n\0"), cstr(b"v\0")),
            IhStatus::InvalidHandle
        );
        assert_eq!(
            instrument_hooks_add_marker(null, 1, 0, 0),
            IhStatus::InvalidHandle
        );
        instrument_hooks_deinit(null);
    }
}

#[test]
fn init_then_deinit() {
    // NULL outside an instrumented environment, a live handle inside one.
    let hooks = instrument_hooks_init();
    unsafe { instrument_hooks_deinit(hooks) };
}

// =============================================================================
// Live handle
// =============================================================================

#[test]
fn full_scenario() {
    let hooks = inert_handle();
    unsafe {
        assert!(!instrument_hooks_is_instrumented(hooks));
        assert_eq!(
            instrument_hooks_set_integration(hooks, cstr(b"pytest-codspeed\0"), cstr(b"1.0.0\0")),
            IhStatus::Ok
        );
        assert_eq!(
            instrument_hooks_set_executed_benchmark(hooks, 1234, cstr(b"test_mod::test_fn\0")),
            IhStatus::Ok
        );
        assert_eq!(instrument_hooks_start_benchmark(hooks), IhStatus::Ok);
        assert_eq!(instrument_hooks_stop_benchmark(hooks), IhStatus::Ok);
        instrument_hooks_deinit(hooks);
    }
}

#[test]
fn protocol_violations_map_to_status() {
    let hooks = inert_handle();
    unsafe {
        assert_eq!(instrument_hooks_stop_benchmark(hooks), IhStatus::NotRunning);
        assert_eq!(instrument_hooks_start_benchmark(hooks), IhStatus::Ok);
        assert_eq!(instrument_hooks_start_benchmark(hooks), IhStatus::AlreadyRunning);
        // Released while running: deinit stops the benchmark.
        instrument_hooks_deinit(hooks);
    }
}

#[test]
fn markers() {
    let hooks = inert_handle();
    let pid = std::process::id();
    unsafe {
        for ty in 0..=3u8 {
            let ts = instrument_hooks_current_timestamp();
            assert_eq!(instrument_hooks_add_marker(hooks, pid, ty, ts), IhStatus::Ok);
        }
        assert_eq!(
            instrument_hooks_add_marker(hooks, pid, 4, 0),
            IhStatus::InvalidArgument
        );
        assert_eq!(
            instrument_hooks_add_marker(hooks, u32::MAX, 0, 0),
            IhStatus::InvalidArgument
        );
        instrument_hooks_deinit(hooks);
    }
}

#[test]
fn null_and_invalid_strings() {
    let hooks = inert_handle();
    unsafe {
        assert_eq!(
            instrument_hooks_set_executed_benchmark(hooks, 1, ptr::null()),
            IhStatus::InvalidArgument
        );
        assert_eq!(
            instrument_hooks_set_integration(hooks, cstr(b"name\0"), ptr::null()),
            IhStatus::InvalidArgument
        );
        assert_eq!(
            instrument_hooks_set_executed_benchmark(hooks, 1, cstr(b"\xc3\x28\0")),
            IhStatus::InvalidArgument
        );
        instrument_hooks_deinit(hooks);
    }
}

// =============================================================================
// Global functions
// =============================================================================

#[test]
fn timestamps_are_monotonic() {
    let start = instrument_hooks_current_timestamp();
    let end = instrument_hooks_current_timestamp();
    assert!(end >= start);
}

#[test]
fn features_accept_unknown_values() {
    instrument_hooks_set_feature(0, true);
    instrument_hooks_set_feature(0, false);
    instrument_hooks_set_feature(42, true);
}

#[test]
fn callgrind_toggles_without_valgrind() {
    callgrind_zero_stats();
    callgrind_start_instrumentation();
    callgrind_toggle_collect();
    callgrind_toggle_collect();
    callgrind_stop_instrumentation();
    callgrind_dump_stats();
    unsafe {
        callgrind_dump_stats_at(cstr(b"bench::label\0"));
        callgrind_dump_stats_at(ptr::null());
        // Not UTF-8; forwarded unchanged.
        callgrind_dump_stats_at(cstr(b"bench::\xff\xfe\0"));
    }
}
