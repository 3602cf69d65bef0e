//! # instrument-hooks
//!
//! Control bridge between a benchmark harness and the profilers that may be
//! watching it.
//!
//! For every benchmark execution the harness needs to know: is a profiler
//! attached, should collection be active right now, which markers to record,
//! and which process/benchmark the measurements belong to. This crate answers
//! those questions over three pieces:
//!
//! - **Handle manager** ([`InstrumentHooks::acquire`], [`InstrumentHooks::release`],
//!   [`InstrumentHooks::is_instrumented`]) owns the connection to the
//!   profiler, if there is one.
//! - **Session controller** ([`InstrumentHooks::start_benchmark`],
//!   [`InstrumentHooks::stop_benchmark`], identity setters) brackets each
//!   measured region.
//! - **Markers and sampling toggles** ([`InstrumentHooks::add_marker`],
//!   [`current_timestamp`], [`Callgrind`]) record timestamped events and
//!   drive callgrind's global collection state.
//!
//! ## Quick Start
//!
//! ```ignore
//! use instrument_hooks::{Config, InstrumentHooks};
//!
//! let config = Config::from_env().integration("my-harness", env!("CARGO_PKG_VERSION"));
//! let mut attachment = InstrumentHooks::attach_with(&config);
//!
//! for (uri, bench) in benchmarks {
//!     // Instrumented when a profiler is attached, a plain call otherwise.
//!     attachment.measure(uri, bench);
//! }
//! ```
//!
//! ## Backends
//!
//! - **callgrind**: selected when the process runs under valgrind; commands
//!   become valgrind client requests.
//! - **runner**: selected when the benchmark runner's control FIFO exists;
//!   commands are framed messages over a FIFO pair (see [`protocol`]).
//! - **inert**: the gate is open but nothing is listening. The handle works
//!   and reports [`is_instrumented`](InstrumentHooks::is_instrumented) as
//!   `false`.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod backend;
mod clock;
mod config;
mod error;
mod hooks;
mod marker;
mod session;

// Functional modules
pub mod callgrind;
pub mod features;
pub mod protocol;

// Re-exports for public API
pub use callgrind::{running_on_valgrind, Callgrind};
pub use clock::current_timestamp;
pub use config::{Config, ACK_FIFO_ENV, CTL_FIFO_ENV, DEFAULT_ENV_GATE};
pub use error::{AttachError, BackendError, MarkerError, SessionError};
pub use features::{set_feature, Feature};
pub use hooks::{Attachment, InstrumentHooks};
pub use marker::{Marker, MarkerType};
pub use protocol::IntegrationMode;
pub use session::{ExecutedBenchmark, Integration, Phase};
