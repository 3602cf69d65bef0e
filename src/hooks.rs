//! Handle manager: acquiring, querying and releasing instrumentation handles.
//!
//! An [`InstrumentHooks`] value is the capability to talk to whatever
//! profiler is attached to this process. It is owned, not `Clone`, and
//! releasing it consumes it, so a released handle cannot be used again.
//!
//! Failing to acquire a handle is the normal outcome outside a profiling
//! environment. [`Attachment`] makes that branch explicit:
//!
//! ```ignore
//! use instrument_hooks::{Attachment, InstrumentHooks};
//!
//! let mut attachment = InstrumentHooks::attach();
//! let answer = attachment.measure("tests/test_math.py::test_fibo", || fibo(30));
//!
//! match attachment {
//!     Attachment::Attached(hooks) => hooks.release(),
//!     Attachment::NotAttached(reason) => eprintln!("ran uninstrumented: {}", reason),
//! }
//! ```

use crate::backend::Backend;
use crate::config::Config;
use crate::error::AttachError;
use crate::protocol::IntegrationMode;
use crate::session::{Phase, SessionState};

/// A live connection to the attached profiler.
#[derive(Debug)]
pub struct InstrumentHooks {
    backend: Backend,
    pub(crate) session: SessionState,
}

impl InstrumentHooks {
    /// Acquire a handle using [`Config::from_env`].
    pub fn acquire() -> Result<Self, AttachError> {
        Self::acquire_with(&Config::from_env())
    }

    /// Acquire a handle with an explicit configuration.
    ///
    /// If the configuration names an integration it is announced before the
    /// handle is returned; a rejection there fails the acquire.
    pub fn acquire_with(config: &Config) -> Result<Self, AttachError> {
        if !config.gate_open() {
            return Err(AttachError::OutsideEnvironment(config.env_gate.clone()));
        }

        let backend = Backend::select(config)?;
        tracing::debug!(backend = backend.name(), "instrumentation handle acquired");
        let mut hooks = Self::from_backend(backend);

        if let Some(integration) = &config.integration {
            hooks
                .backend
                .set_integration(&integration.name, &integration.version)?;
            hooks.session.integration = Some(integration.clone());
        }
        Ok(hooks)
    }

    /// Acquire a handle, keeping the failure reason when none is available.
    pub fn attach() -> Attachment {
        Attachment::from(Self::acquire())
    }

    /// [`attach`](Self::attach) with an explicit configuration.
    pub fn attach_with(config: &Config) -> Attachment {
        Attachment::from(Self::acquire_with(config))
    }

    pub(crate) fn from_backend(backend: Backend) -> Self {
        Self {
            backend,
            session: SessionState::default(),
        }
    }

    pub(crate) fn backend_mut(&mut self) -> &mut Backend {
        &mut self.backend
    }

    /// Whether the backend reports that it is actively instrumenting.
    ///
    /// A live handle may answer `false`, e.g. when no profiler supervises
    /// the process.
    pub fn is_instrumented(&mut self) -> bool {
        self.backend.is_instrumented()
    }

    /// Measurement mode of the attached profiler, if it reports one.
    pub fn integration_mode(&mut self) -> Option<IntegrationMode> {
        self.backend.integration_mode()
    }

    /// Name of the selected backend (`callgrind`, `runner` or `inert`).
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Tear the handle down.
    ///
    /// Equivalent to dropping it; provided so the end of a handle's life is
    /// visible at the call site.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for InstrumentHooks {
    fn drop(&mut self) {
        if self.session.phase == Phase::Running {
            tracing::warn!(
                backend = self.backend.name(),
                "instrumentation handle released while a benchmark is running; stopping it"
            );
            self.session.phase = Phase::Idle;
            if let Err(e) = self.backend.stop_benchmark() {
                tracing::warn!(error = %e, "failed to stop benchmark during release");
            }
        }
        tracing::debug!(backend = self.backend.name(), "instrumentation handle released");
    }
}

/// Outcome of looking for a profiler.
#[derive(Debug)]
pub enum Attachment {
    /// A handle was acquired.
    Attached(InstrumentHooks),
    /// No handle; the harness should run uninstrumented.
    NotAttached(AttachError),
}

impl Attachment {
    /// Whether a handle was acquired.
    pub fn is_attached(&self) -> bool {
        matches!(self, Attachment::Attached(_))
    }

    /// The handle, if any.
    pub fn hooks_mut(&mut self) -> Option<&mut InstrumentHooks> {
        match self {
            Attachment::Attached(hooks) => Some(hooks),
            Attachment::NotAttached(_) => None,
        }
    }

    /// Convert back into a `Result`.
    pub fn into_result(self) -> Result<InstrumentHooks, AttachError> {
        match self {
            Attachment::Attached(hooks) => Ok(hooks),
            Attachment::NotAttached(e) => Err(e),
        }
    }

    /// Run `f` as a benchmark: instrumented when attached, plainly otherwise.
    pub fn measure<T>(&mut self, uri: &str, f: impl FnOnce() -> T) -> T {
        match self {
            Attachment::Attached(hooks) => hooks.measure(uri, f),
            Attachment::NotAttached(_) => f(),
        }
    }
}

impl From<Result<InstrumentHooks, AttachError>> for Attachment {
    fn from(result: Result<InstrumentHooks, AttachError>) -> Self {
        match result {
            Ok(hooks) => Attachment::Attached(hooks),
            Err(e) => {
                tracing::debug!(reason = %e, "running without instrumentation");
                Attachment::NotAttached(e)
            }
        }
    }
}
