//! Error types for the instrumentation bridge.
//!
//! Errors are split by operation family so callers can match on exactly what
//! a given call can fail with:
//! - [`AttachError`] from acquiring a handle
//! - [`SessionError`] from the benchmark start/stop/identity protocol
//! - [`MarkerError`] from marker emission
//!
//! [`BackendError`] is shared by the last two and describes a failure reported
//! by (or while talking to) the backend itself.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::protocol::Command;

/// Error returned when no instrumentation handle could be acquired.
///
/// This is the common case when no profiler is attached. Callers should treat
/// it as "run uninstrumented", never as a fatal condition.
#[derive(Debug, Error)]
pub enum AttachError {
    /// The environment gate variable is not set.
    #[error("not running in an instrumented environment ({0} is unset)")]
    OutsideEnvironment(String),

    /// The runner control FIFO exists but nothing is reading from it.
    #[error("runner FIFO {} has no reader", path.display())]
    RunnerUnavailable {
        /// Path of the control FIFO.
        path: PathBuf,
    },

    /// A runner FIFO could not be opened.
    #[error("failed to open runner FIFO {}: {source}", path.display())]
    Fifo {
        /// Path of the FIFO that failed to open.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The runner did not accept our protocol version.
    #[error("runner rejected protocol version {0}")]
    ProtocolVersion(u64),

    /// The backend failed while completing initialization.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Failure reported by a backend, or while exchanging a command with it.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Reading or writing a runner FIFO failed.
    #[error("runner I/O failed: {0}")]
    Io(#[from] io::Error),

    /// A command could not be encoded or a reply could not be decoded.
    #[error("runner message codec failed: {0}")]
    Codec(#[from] bincode::Error),

    /// The runner answered with an error.
    ///
    /// The runner does not say why, so every rejection is reported the same way.
    #[error("runner rejected the command")]
    Rejected,

    /// The runner answered with something other than the expected reply.
    #[error("unexpected runner reply: {0:?}")]
    UnexpectedReply(Command),

    /// A frame announced a payload larger than we are willing to read.
    #[error("runner frame of {0} bytes exceeds the {max} byte limit", max = crate::protocol::MAX_FRAME_LEN)]
    FrameTooLarge(usize),

    /// A string destined for valgrind contains a NUL byte.
    #[error("string argument contains an interior NUL byte")]
    InteriorNul,
}

/// Protocol violation or backend rejection from the session controller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// `start_benchmark` was called while a benchmark is already running.
    #[error("a benchmark is already running on this handle")]
    AlreadyRunning,

    /// `stop_benchmark` was called without a matching start.
    #[error("no benchmark is running on this handle")]
    NotRunning,

    /// The backend refused the operation.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Failure to record a marker.
#[derive(Debug, Error)]
pub enum MarkerError {
    /// Raw marker type outside the closed `0..=3` range.
    #[error("unknown marker type {0}")]
    UnknownType(u8),

    /// The pid does not fit the runner's signed pid field.
    #[error("pid {0} is out of range")]
    PidOutOfRange(u32),

    /// The backend refused the marker.
    #[error(transparent)]
    Backend(#[from] BackendError),
}
