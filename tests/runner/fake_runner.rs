//! In-process stand-in for the benchmark runner.
//!
//! Creates a FIFO pair in a temporary directory and serves it from a thread,
//! answering each command through a responder closure and recording what it
//! received.

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use instrument_hooks::protocol::{read_frame, write_frame, Command, IntegrationMode};
use instrument_hooks::Config;
use tempfile::TempDir;

pub struct FakeRunner {
    _dir: TempDir,
    pub ctl: PathBuf,
    pub ack: PathBuf,
    shutdown: File,
    handle: JoinHandle<Vec<Command>>,
}

/// Acknowledge everything, report perf mode when asked.
pub fn default_reply(command: &Command) -> Command {
    match command {
        Command::GetIntegrationMode => Command::IntegrationModeResponse(IntegrationMode::Perf),
        _ => Command::Ack,
    }
}

fn mkfifo(path: &Path) {
    let c_path = CString::new(path.as_os_str().as_bytes()).unwrap();
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) };
    assert_eq!(rc, 0, "mkfifo failed: {}", std::io::Error::last_os_error());
}

/// Open both ends so the FIFO never reports EOF and opens never block.
fn open_rdwr(path: &Path) -> File {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .unwrap()
}

impl FakeRunner {
    pub fn spawn<F>(mut responder: F) -> Self
    where
        F: FnMut(&Command) -> Command + Send + 'static,
    {
        let dir = tempfile::tempdir().unwrap();
        let ctl = dir.path().join("runner.ctl.fifo");
        let ack = dir.path().join("runner.ack.fifo");
        mkfifo(&ctl);
        mkfifo(&ack);

        let mut ctl_reader = open_rdwr(&ctl);
        let shutdown = ctl_reader.try_clone().unwrap();
        let mut ack_writer = open_rdwr(&ack);

        let handle = std::thread::spawn(move || {
            let mut received = Vec::new();
            // A zero-length frame fails to decode and ends the loop.
            while let Ok(command) = read_frame(&mut ctl_reader) {
                let reply = responder(&command);
                received.push(command);
                write_frame(&mut ack_writer, &reply).unwrap();
            }
            received
        });

        Self {
            _dir: dir,
            ctl,
            ack,
            shutdown,
            handle,
        }
    }

    pub fn with_defaults() -> Self {
        Self::spawn(default_reply)
    }

    /// Client configuration pointing at this runner.
    pub fn config(&self) -> Config {
        Config::new()
            .require_env(false)
            .detect_valgrind(false)
            .runner_fifos(&self.ctl, &self.ack)
    }

    /// Stop serving and return every command received, in order.
    pub fn finish(mut self) -> Vec<Command> {
        self.shutdown.write_all(&0u32.to_le_bytes()).unwrap();
        self.handle.join().unwrap()
    }
}
