//! Instrumentation backends behind a handle.
//!
//! | Backend     | Selected when                         | Instrumented |
//! |-------------|---------------------------------------|--------------|
//! | `Callgrind` | the process runs under valgrind       | yes          |
//! | `Runner`    | the runner control FIFO exists        | if it answers|
//! | `Inert`     | gate open, but no profiler found      | no           |
//!
//! Dispatch goes through the [`Backend`] enum rather than a trait object so
//! the hot start/stop path stays a direct call.

#[cfg(unix)]
mod runner;

#[cfg(unix)]
pub use runner::RunnerBackend;

use crate::callgrind;
use crate::config::Config;
use crate::error::{AttachError, BackendError};
use crate::features::{self, Feature};
use crate::marker::MarkerType;
use crate::protocol::{Command, IntegrationMode, MarkerEvent};

/// The backend a handle talks to.
#[derive(Debug)]
pub enum Backend {
    /// Valgrind/callgrind client requests.
    Callgrind,
    /// Benchmark runner over FIFOs.
    #[cfg(unix)]
    Runner(RunnerBackend),
    /// No profiler present. Every operation succeeds and does nothing.
    Inert,
}

impl Backend {
    /// Pick and initialize a backend for `config`.
    ///
    /// The environment gate is checked by the caller.
    pub fn select(config: &Config) -> Result<Self, AttachError> {
        if config.detect_valgrind && callgrind::running_on_valgrind() {
            tracing::info!("running under valgrind; using callgrind backend");
            return Ok(Backend::Callgrind);
        }

        #[cfg(unix)]
        if config.ctl_fifo.exists() {
            return RunnerBackend::connect(config).map(Backend::Runner);
        }

        tracing::debug!(
            ctl = %config.ctl_fifo.display(),
            "no profiler detected; handle will not be instrumented"
        );
        Ok(Backend::Inert)
    }

    /// Short name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Callgrind => "callgrind",
            #[cfg(unix)]
            Backend::Runner(_) => "runner",
            Backend::Inert => "inert",
        }
    }

    /// Whether the backend is actively instrumenting.
    pub fn is_instrumented(&mut self) -> bool {
        match self {
            Backend::Callgrind => callgrind::running_on_valgrind(),
            #[cfg(unix)]
            Backend::Runner(runner) => match runner.integration_mode() {
                Ok(_) => true,
                Err(e) => {
                    tracing::debug!(error = %e, "runner did not answer mode query");
                    false
                }
            },
            Backend::Inert => false,
        }
    }

    /// Measurement mode of the attached profiler, if any.
    pub fn integration_mode(&mut self) -> Option<IntegrationMode> {
        match self {
            Backend::Callgrind => Some(IntegrationMode::Simulation),
            #[cfg(unix)]
            Backend::Runner(runner) => runner.integration_mode().ok(),
            Backend::Inert => None,
        }
    }

    pub fn start_benchmark(&mut self) -> Result<(), BackendError> {
        match self {
            Backend::Callgrind => {
                if !features::is_enabled(Feature::DisableCallgrindMarkers) {
                    callgrind::begin_region();
                }
                Ok(())
            }
            #[cfg(unix)]
            Backend::Runner(runner) => runner.send_acked(&Command::StartBenchmark),
            Backend::Inert => Ok(()),
        }
    }

    pub fn stop_benchmark(&mut self) -> Result<(), BackendError> {
        match self {
            Backend::Callgrind => {
                if !features::is_enabled(Feature::DisableCallgrindMarkers) {
                    callgrind::end_region();
                }
                Ok(())
            }
            #[cfg(unix)]
            Backend::Runner(runner) => runner.send_acked(&Command::StopBenchmark),
            Backend::Inert => Ok(()),
        }
    }

    #[cfg_attr(not(unix), allow(unused_variables))]
    pub fn set_executed_benchmark(&mut self, pid: i32, uri: &str) -> Result<(), BackendError> {
        match self {
            Backend::Callgrind => dump_label(uri),
            #[cfg(unix)]
            Backend::Runner(runner) => runner.send_acked(&Command::CurrentBenchmark {
                pid,
                uri: uri.to_string(),
            }),
            Backend::Inert => Ok(()),
        }
    }

    pub fn set_integration(&mut self, name: &str, version: &str) -> Result<(), BackendError> {
        match self {
            Backend::Callgrind => dump_label(&metadata_label(name, version)),
            #[cfg(unix)]
            Backend::Runner(runner) => runner.send_acked(&Command::SetIntegration {
                name: name.to_string(),
                version: version.to_string(),
            }),
            Backend::Inert => Ok(()),
        }
    }

    #[cfg_attr(not(unix), allow(unused_variables))]
    pub fn add_marker(
        &mut self,
        pid: i32,
        marker_type: MarkerType,
        timestamp: u64,
    ) -> Result<(), BackendError> {
        match self {
            // Callgrind has no timeline to attach markers to.
            Backend::Callgrind => Ok(()),
            #[cfg(unix)]
            Backend::Runner(runner) => runner.send_acked(&Command::AddMarker {
                pid,
                marker: MarkerEvent::new(marker_type, timestamp),
            }),
            Backend::Inert => Ok(()),
        }
    }
}

fn metadata_label(name: &str, version: &str) -> String {
    format!("Metadata: {} {}", name, version)
}

fn dump_label(label: &str) -> Result<(), BackendError> {
    if label.as_bytes().contains(&0) {
        return Err(BackendError::InteriorNul);
    }
    callgrind::dump_stats_at_bytes(label.as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::hooks::InstrumentHooks;

    #[test]
    fn test_inert_accepts_everything() {
        let mut backend = Backend::Inert;
        assert!(!backend.is_instrumented());
        assert_eq!(backend.integration_mode(), None);
        backend.set_integration("pytest-codspeed", "1.0.0").unwrap();
        backend.set_executed_benchmark(1234, "test_mod::test_fn").unwrap();
        backend.start_benchmark().unwrap();
        for ty in MarkerType::ALL {
            backend.add_marker(1234, ty, 0).unwrap();
        }
        backend.stop_benchmark().unwrap();
    }

    #[test]
    fn test_select_falls_back_to_inert() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new()
            .detect_valgrind(false)
            .runner_fifos(dir.path().join("ctl"), dir.path().join("ack"));
        let backend = Backend::select(&config).unwrap();
        assert_eq!(backend.name(), "inert");
    }

    #[test]
    fn test_dump_label_rejects_nul() {
        assert!(matches!(dump_label("a\0b"), Err(BackendError::InteriorNul)));
    }

    #[test]
    fn test_callgrind_start_stop_with_and_without_markers() {
        let mut hooks = InstrumentHooks::from_backend(Backend::Callgrind);
        hooks.start_benchmark().unwrap();
        hooks.stop_benchmark().unwrap();

        features::set_feature(Feature::DisableCallgrindMarkers, true);
        hooks.start_benchmark().unwrap();
        assert!(hooks.is_running());
        hooks.stop_benchmark().unwrap();
        features::set_feature(Feature::DisableCallgrindMarkers, false);

        assert!(!hooks.is_running());
    }

    #[test]
    fn test_callgrind_identity_labels() {
        let mut hooks = InstrumentHooks::from_backend(Backend::Callgrind);
        hooks.set_integration("pytest-codspeed", "1.0.0").unwrap();
        hooks.set_executed_benchmark(1, "test_mod::test_fn").unwrap();

        let err = hooks.set_executed_benchmark(1, "a\0b").unwrap_err();
        assert!(matches!(err, SessionError::Backend(BackendError::InteriorNul)));
        assert_eq!(hooks.executed_benchmark().unwrap().uri, "test_mod::test_fn");

        let err = hooks.set_integration("py\0test", "1.0.0").unwrap_err();
        assert!(matches!(err, SessionError::Backend(BackendError::InteriorNul)));
        assert_eq!(hooks.integration().unwrap().name, "pytest-codspeed");
    }

    #[test]
    fn test_callgrind_markers_and_mode() {
        let mut hooks = InstrumentHooks::from_backend(Backend::Callgrind);
        assert_eq!(hooks.backend_name(), "callgrind");
        assert_eq!(hooks.integration_mode(), Some(IntegrationMode::Simulation));
        assert_eq!(hooks.is_instrumented(), callgrind::running_on_valgrind());
        for ty in MarkerType::ALL {
            hooks.add_marker(std::process::id(), ty, 0).unwrap();
        }
    }

    #[test]
    fn test_metadata_label_format() {
        assert_eq!(metadata_label("pytest-codspeed", "1.0.0"), "Metadata: pytest-codspeed 1.0.0");
    }
}
