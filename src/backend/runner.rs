//! Runner backend: talks to the benchmark runner over a FIFO pair.
//!
//! The runner owns the profiler (e.g. `perf record`) and listens on a control
//! FIFO. Every command we send is answered on the ack FIFO, so each call here
//! is one blocking round trip.
//!
//! # Connecting
//!
//! The control FIFO is opened with `O_NONBLOCK`: opening a FIFO for writing
//! fails with `ENXIO` when nobody is reading, which tells us the runner is not
//! listening without hanging. Once open, both descriptors are switched back to
//! blocking mode.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use crate::config::Config;
use crate::error::{AttachError, BackendError};
use crate::protocol::{read_frame, write_frame, Command, IntegrationMode, CURRENT_PROTOCOL_VERSION};

/// Connection to a listening runner.
pub struct RunnerBackend {
    ctl: File,
    ack: File,
}

impl RunnerBackend {
    /// Open both FIFOs and perform the version handshake.
    pub fn connect(config: &Config) -> Result<Self, AttachError> {
        let ctl = open_fifo(&config.ctl_fifo, FifoEnd::Write)?;
        let ack = open_fifo(&config.ack_fifo, FifoEnd::Read)?;
        let mut backend = Self { ctl, ack };

        match backend.round_trip(&Command::SetVersion(CURRENT_PROTOCOL_VERSION))? {
            Command::Ack => {}
            Command::Err => return Err(AttachError::ProtocolVersion(CURRENT_PROTOCOL_VERSION)),
            other => return Err(BackendError::UnexpectedReply(other).into()),
        }

        tracing::info!(
            ctl = %config.ctl_fifo.display(),
            version = CURRENT_PROTOCOL_VERSION,
            "connected to benchmark runner"
        );
        Ok(backend)
    }

    /// Send a command and read its reply.
    pub fn round_trip(&mut self, command: &Command) -> Result<Command, BackendError> {
        tracing::debug!(?command, "runner command");
        write_frame(&mut self.ctl, command)?;
        read_frame(&mut self.ack)
    }

    /// Send a command that must be acknowledged.
    pub fn send_acked(&mut self, command: &Command) -> Result<(), BackendError> {
        match self.round_trip(command)? {
            Command::Ack => Ok(()),
            Command::Err => Err(BackendError::Rejected),
            other => Err(BackendError::UnexpectedReply(other)),
        }
    }

    /// Ask the runner which mode it measures in.
    pub fn integration_mode(&mut self) -> Result<IntegrationMode, BackendError> {
        match self.round_trip(&Command::GetIntegrationMode)? {
            Command::IntegrationModeResponse(mode) => Ok(mode),
            Command::Err => Err(BackendError::Rejected),
            other => Err(BackendError::UnexpectedReply(other)),
        }
    }
}

impl std::fmt::Debug for RunnerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerBackend")
            .field("ctl_fd", &self.ctl.as_raw_fd())
            .field("ack_fd", &self.ack.as_raw_fd())
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum FifoEnd {
    Read,
    Write,
}

fn open_fifo(path: &Path, end: FifoEnd) -> Result<File, AttachError> {
    let mut options = OpenOptions::new();
    match end {
        FifoEnd::Read => options.read(true),
        FifoEnd::Write => options.write(true),
    };

    let file = options
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .map_err(|source| {
            if source.raw_os_error() == Some(libc::ENXIO) {
                AttachError::RunnerUnavailable {
                    path: path.to_path_buf(),
                }
            } else {
                AttachError::Fifo {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

    set_blocking(&file).map_err(|source| AttachError::Fifo {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file)
}

fn set_blocking(file: &File) -> io::Result<()> {
    let fd = file.as_raw_fd();
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
