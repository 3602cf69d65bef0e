//! FFI-safe status codes for instrument-hooks-c.
//!
//! Every fallible entry point returns an [`IhStatus`], which is ABI-compatible
//! with `uint8_t`. Zero is success.

use instrument_hooks::{BackendError, MarkerError, SessionError};

/// Result of a C ABI call.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IhStatus {
    /// Success.
    Ok = 0,
    /// The handle pointer was NULL.
    InvalidHandle = 1,
    /// `start_benchmark` while a benchmark is running.
    AlreadyRunning = 2,
    /// `stop_benchmark` without a running benchmark.
    NotRunning = 3,
    /// The backend rejected the command or could not be reached.
    BackendError = 4,
    /// A string argument was NULL or not UTF-8, a marker type was unknown,
    /// or a pid did not fit.
    InvalidArgument = 5,
    /// A Rust panic was caught at the boundary.
    Panic = 255,
}

impl IhStatus {
    /// Raw wire value.
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<&BackendError> for IhStatus {
    fn from(err: &BackendError) -> Self {
        match err {
            BackendError::InteriorNul => IhStatus::InvalidArgument,
            _ => IhStatus::BackendError,
        }
    }
}

impl From<&SessionError> for IhStatus {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::AlreadyRunning => IhStatus::AlreadyRunning,
            SessionError::NotRunning => IhStatus::NotRunning,
            SessionError::Backend(e) => e.into(),
        }
    }
}

impl From<&MarkerError> for IhStatus {
    fn from(err: &MarkerError) -> Self {
        match err {
            MarkerError::UnknownType(_) | MarkerError::PidOutOfRange(_) => {
                IhStatus::InvalidArgument
            }
            MarkerError::Backend(e) => e.into(),
        }
    }
}

/// Collapse a Rust result into a status, logging failures.
pub(crate) fn status_of<E>(op: &'static str, result: Result<(), E>) -> IhStatus
where
    E: std::fmt::Display,
    for<'a> IhStatus: From<&'a E>,
{
    match result {
        Ok(()) => IhStatus::Ok,
        Err(e) => {
            tracing::debug!(op, error = %e, "instrument-hooks call failed");
            IhStatus::from(&e)
        }
    }
}
