//! Configuration for acquiring an instrumentation handle.

use std::env;
use std::path::PathBuf;

use crate::protocol::{RUNNER_ACK_FIFO, RUNNER_CTL_FIFO};
use crate::session::Integration;

/// Environment variable that marks a process as running inside an
/// instrumented environment.
pub const DEFAULT_ENV_GATE: &str = "CODSPEED_ENV";

/// Overrides the runner control FIFO path in [`Config::from_env`].
pub const CTL_FIFO_ENV: &str = "INSTRUMENT_HOOKS_CTL_FIFO";

/// Overrides the runner ack FIFO path in [`Config::from_env`].
pub const ACK_FIFO_ENV: &str = "INSTRUMENT_HOOKS_ACK_FIFO";

/// Options controlling how [`InstrumentHooks::acquire_with`] looks for a
/// backend.
///
/// [`InstrumentHooks::acquire_with`]: crate::InstrumentHooks::acquire_with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Refuse to attach unless [`env_gate`](Self::env_gate) is set.
    ///
    /// Default: true.
    pub require_env: bool,

    /// Name of the gate variable checked when `require_env` is set.
    ///
    /// Default: `CODSPEED_ENV`.
    pub env_gate: String,

    /// Select the callgrind backend when running under valgrind.
    ///
    /// Default: true.
    pub detect_valgrind: bool,

    /// Runner control FIFO (we write commands here).
    ///
    /// Default: `/tmp/runner.ctl.fifo`.
    pub ctl_fifo: PathBuf,

    /// Runner ack FIFO (we read replies here).
    ///
    /// Default: `/tmp/runner.ack.fifo`.
    pub ack_fifo: PathBuf,

    /// Integration announced right after a successful acquire.
    ///
    /// Default: None.
    pub integration: Option<Integration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            require_env: true,
            env_gate: DEFAULT_ENV_GATE.to_string(),
            detect_valgrind: true,
            ctl_fifo: PathBuf::from(RUNNER_CTL_FIFO),
            ack_fifo: PathBuf::from(RUNNER_ACK_FIFO),
            integration: None,
        }
    }
}

impl Config {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration with FIFO paths taken from the environment
    /// when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = env_path(CTL_FIFO_ENV) {
            config.ctl_fifo = path;
        }
        if let Some(path) = env_path(ACK_FIFO_ENV) {
            config.ack_fifo = path;
        }
        config
    }

    /// Set whether the environment gate is required.
    pub fn require_env(mut self, require: bool) -> Self {
        self.require_env = require;
        self
    }

    /// Set the gate variable name.
    pub fn env_gate(mut self, name: impl Into<String>) -> Self {
        self.env_gate = name.into();
        self
    }

    /// Set whether valgrind is probed for.
    pub fn detect_valgrind(mut self, detect: bool) -> Self {
        self.detect_valgrind = detect;
        self
    }

    /// Set both runner FIFO paths.
    pub fn runner_fifos(mut self, ctl: impl Into<PathBuf>, ack: impl Into<PathBuf>) -> Self {
        self.ctl_fifo = ctl.into();
        self.ack_fifo = ack.into();
        self
    }

    /// Announce this integration once attached.
    pub fn integration(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.integration = Some(Integration::new(name, version));
        self
    }

    /// Whether the gate allows attaching in the current environment.
    pub(crate) fn gate_open(&self) -> bool {
        !self.require_env || env::var_os(&self.env_gate).is_some()
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
