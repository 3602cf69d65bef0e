//! Raw valgrind client requests.
//!
//! A client request is a "special instruction preamble" (a sequence of rotates
//! that is a no-op on real hardware) followed by a marker instruction. Natively
//! the sequence does nothing and the default value comes back unchanged; under
//! valgrind the JIT recognises it and services the request.
//!
//! Request codes follow `valgrind.h` and `callgrind.h`.

/// `VG_USERREQ__RUNNING_ON_VALGRIND`.
pub(crate) const RUNNING_ON_VALGRIND: usize = 0x1001;

/// `VG_USERREQ_TOOL_BASE('C', 'T')`.
const CALLGRIND_BASE: usize = ((b'C' as usize) << 24) | ((b'T' as usize) << 16);

/// Callgrind tool requests, in `callgrind.h` order.
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallgrindRequest {
    DumpStats = CALLGRIND_BASE,
    ZeroStats,
    ToggleCollect,
    DumpStatsAt,
    StartInstrumentation,
    StopInstrumentation,
}

/// Issue a client request and return valgrind's answer, or `default` when
/// not running under valgrind.
#[cfg(all(
    target_arch = "x86_64",
    any(target_os = "linux", target_os = "macos", target_os = "freebsd")
))]
#[inline(always)]
pub(crate) fn do_client_request(default: usize, args: &[usize; 6]) -> usize {
    let mut result = default;
    // SAFETY: the rotates sum to 128 bits, leaving rdi unchanged, and
    // `xchg rbx, rbx` is a no-op. Valgrind only reads the args array.
    unsafe {
        core::arch::asm!(
            "rol rdi, 3",
            "rol rdi, 13",
            "rol rdi, 61",
            "rol rdi, 51",
            "xchg rbx, rbx",
            inout("rdx") result,
            in("rax") args.as_ptr(),
            options(nostack),
        );
    }
    result
}

/// Issue a client request and return valgrind's answer, or `default` when
/// not running under valgrind.
#[cfg(all(target_arch = "aarch64", any(target_os = "linux", target_os = "macos")))]
#[inline(always)]
pub(crate) fn do_client_request(default: usize, args: &[usize; 6]) -> usize {
    let mut result = default;
    // SAFETY: the rotates sum to 128 bits, leaving x12 unchanged, and
    // `orr x10, x10, x10` is a no-op. Valgrind only reads the args array.
    unsafe {
        core::arch::asm!(
            "ror x12, x12, #3",
            "ror x12, x12, #13",
            "ror x12, x12, #51",
            "ror x12, x12, #61",
            "orr x10, x10, x10",
            inout("x3") result,
            in("x4") args.as_ptr(),
            options(nostack),
        );
    }
    result
}

/// Valgrind cannot run this target; every request answers `default`.
#[cfg(not(any(
    all(
        target_arch = "x86_64",
        any(target_os = "linux", target_os = "macos", target_os = "freebsd")
    ),
    all(target_arch = "aarch64", any(target_os = "linux", target_os = "macos"))
)))]
#[inline(always)]
pub(crate) fn do_client_request(default: usize, _args: &[usize; 6]) -> usize {
    default
}

/// Number of valgrind layers we are running under (0 natively).
#[inline]
pub(crate) fn running_on_valgrind() -> usize {
    do_client_request(0, &[RUNNING_ON_VALGRIND, 0, 0, 0, 0, 0])
}

/// Issue a callgrind request with a single argument.
#[inline(always)]
pub(crate) fn callgrind(request: CallgrindRequest, arg: usize) {
    do_client_request(0, &[request as usize, arg, 0, 0, 0, 0]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_codes() {
        assert_eq!(CallgrindRequest::DumpStats as usize, 0x4354_0000);
        assert_eq!(CallgrindRequest::ZeroStats as usize, 0x4354_0001);
        assert_eq!(CallgrindRequest::ToggleCollect as usize, 0x4354_0002);
        assert_eq!(CallgrindRequest::DumpStatsAt as usize, 0x4354_0003);
        assert_eq!(CallgrindRequest::StartInstrumentation as usize, 0x4354_0004);
        assert_eq!(CallgrindRequest::StopInstrumentation as usize, 0x4354_0005);
    }

    #[test]
    fn test_native_request_returns_default() {
        if running_on_valgrind() > 0 {
            return;
        }
        assert_eq!(do_client_request(1234, &[RUNNING_ON_VALGRIND, 0, 0, 0, 0, 0]), 1234);
    }
}
