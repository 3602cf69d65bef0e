//! Benchmark session controller.
//!
//! Each handle runs at most one benchmark at a time:
//!
//! ```text
//!   Idle ──start_benchmark──▶ Running ──stop_benchmark──▶ Idle
//! ```
//!
//! Identity metadata (executed benchmark, integration) is independent of the
//! state machine. Integration is typically set once per process and the
//! executed benchmark once per benchmark item, while start/stop brackets every
//! measured region, so they are separate calls.

use std::panic::{self, AssertUnwindSafe};

use crate::clock::current_timestamp;
use crate::error::SessionError;
use crate::hooks::InstrumentHooks;
use crate::marker::MarkerType;

/// Where a handle is in the start/stop protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No benchmark running.
    #[default]
    Idle,
    /// Between a successful start and its stop.
    Running,
}

/// Identity of the benchmark executed under a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedBenchmark {
    /// Process that executed the benchmark.
    pub pid: i32,
    /// Opaque benchmark identifier, e.g. `tests/test_mod.py::test_fn`.
    pub uri: String,
}

/// Harness integration that drives the benchmarks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integration {
    /// Integration name, e.g. `pytest-codspeed`.
    pub name: String,
    /// Integration version.
    pub version: String,
}

impl Integration {
    /// Build an integration identity.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Per-handle session bookkeeping.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionState {
    pub(crate) phase: Phase,
    pub(crate) executed: Option<ExecutedBenchmark>,
    pub(crate) integration: Option<Integration>,
}

impl InstrumentHooks {
    /// Signal the start of a measured region.
    ///
    /// Fails with [`SessionError::AlreadyRunning`] if a benchmark is already
    /// running; the backend is not contacted in that case. If the backend
    /// rejects the start the handle stays idle and the region must not be
    /// treated as measured.
    pub fn start_benchmark(&mut self) -> Result<(), SessionError> {
        if self.session.phase == Phase::Running {
            return Err(SessionError::AlreadyRunning);
        }
        if self.session.executed.is_none() && self.session.integration.is_none() {
            tracing::debug!("benchmark started before any identity was set");
        }
        self.backend_mut().start_benchmark()?;
        self.session.phase = Phase::Running;
        Ok(())
    }

    /// Signal the end of the measured region.
    ///
    /// Fails with [`SessionError::NotRunning`] without a matching start. A
    /// backend rejection is reported, but the handle returns to idle anyway.
    pub fn stop_benchmark(&mut self) -> Result<(), SessionError> {
        if self.session.phase != Phase::Running {
            return Err(SessionError::NotRunning);
        }
        self.session.phase = Phase::Idle;
        self.backend_mut().stop_benchmark()?;
        Ok(())
    }

    /// Record which benchmark runs (or just ran) and in which process.
    ///
    /// Overwrites any previous value. Allowed in either phase.
    pub fn set_executed_benchmark(
        &mut self,
        pid: i32,
        uri: impl Into<String>,
    ) -> Result<(), SessionError> {
        let executed = ExecutedBenchmark {
            pid,
            uri: uri.into(),
        };
        self.backend_mut()
            .set_executed_benchmark(executed.pid, &executed.uri)?;
        self.session.executed = Some(executed);
        Ok(())
    }

    /// Record the harness integration name and version.
    ///
    /// Overwrites any previous value. Allowed in either phase.
    pub fn set_integration(
        &mut self,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<(), SessionError> {
        let integration = Integration::new(name, version);
        self.backend_mut()
            .set_integration(&integration.name, &integration.version)?;
        self.session.integration = Some(integration);
        Ok(())
    }

    /// Current phase of the start/stop protocol.
    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    /// Whether a benchmark is running.
    pub fn is_running(&self) -> bool {
        self.session.phase == Phase::Running
    }

    /// The last executed-benchmark identity accepted by the backend.
    pub fn executed_benchmark(&self) -> Option<&ExecutedBenchmark> {
        self.session.executed.as_ref()
    }

    /// The last integration identity accepted by the backend.
    pub fn integration(&self) -> Option<&Integration> {
        self.session.integration.as_ref()
    }

    /// Run `f` as one measured benchmark.
    ///
    /// Brackets the body with start/stop and `BenchmarkStart`/`BenchmarkEnd`
    /// markers, then records `uri` as the executed benchmark for this process.
    /// Instrumentation failures are logged and never stop the body from
    /// running; the body's value is always returned.
    ///
    /// If the body panics the region is still closed and the identity still
    /// recorded before the panic resumes, so the handle is idle again for the
    /// next benchmark.
    pub fn measure<T>(&mut self, uri: &str, f: impl FnOnce() -> T) -> T {
        let pid = std::process::id();

        let started = match self.start_benchmark() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(uri, error = %e, "failed to start benchmark measurement");
                false
            }
        };
        if started {
            self.warn_on_marker(pid, MarkerType::BenchmarkStart);
        }

        let out = panic::catch_unwind(AssertUnwindSafe(|| std::hint::black_box(f())));

        self.finish_measure(uri, pid, started);
        match out {
            Ok(out) => out,
            Err(payload) => {
                tracing::warn!(uri, "benchmark body panicked; measurement closed");
                panic::resume_unwind(payload)
            }
        }
    }

    fn finish_measure(&mut self, uri: &str, pid: u32, started: bool) {
        if started {
            self.warn_on_marker(pid, MarkerType::BenchmarkEnd);
            if let Err(e) = self.stop_benchmark() {
                tracing::warn!(uri, error = %e, "failed to stop benchmark measurement");
            }
        }

        match i32::try_from(pid) {
            Ok(pid) => {
                if let Err(e) = self.set_executed_benchmark(pid, uri) {
                    tracing::warn!(uri, error = %e, "failed to set executed benchmark");
                }
            }
            Err(_) => tracing::warn!(pid, "pid does not fit the executed-benchmark field"),
        }
    }

    fn warn_on_marker(&mut self, pid: u32, marker_type: MarkerType) {
        if let Err(e) = self.add_marker(pid, marker_type, current_timestamp()) {
            tracing::warn!(?marker_type, error = %e, "failed to add marker");
        }
    }
}
