//! Wire protocol spoken with the benchmark runner over its FIFO pair.
//!
//! Every message is a frame: a little-endian `u32` payload length followed by a
//! bincode-encoded [`Command`]. The client writes to the control FIFO and reads
//! replies from the ack FIFO.
//!
//! Variant order of the enums in this module is part of the wire format
//! (bincode encodes the variant index). Append new variants, never reorder.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::marker::MarkerType;

/// Default path of the control FIFO (client → runner).
pub const RUNNER_CTL_FIFO: &str = "/tmp/runner.ctl.fifo";

/// Default path of the ack FIFO (runner → client).
pub const RUNNER_ACK_FIFO: &str = "/tmp/runner.ack.fifo";

/// Protocol version announced during the handshake.
pub const CURRENT_PROTOCOL_VERSION: u64 = 2;

/// Largest payload accepted when reading a frame (1 MiB).
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// A marker as carried on the wire, timestamp included.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MarkerEvent {
    /// Start of a sampling period.
    SampleStart(u64),
    /// End of a sampling period.
    SampleEnd(u64),
    /// Start of the measured benchmark body.
    BenchmarkStart(u64),
    /// End of the measured benchmark body.
    BenchmarkEnd(u64),
}

impl MarkerEvent {
    /// Pair a marker type with its timestamp.
    pub fn new(marker_type: MarkerType, timestamp: u64) -> Self {
        match marker_type {
            MarkerType::SampleStart => MarkerEvent::SampleStart(timestamp),
            MarkerType::SampleEnd => MarkerEvent::SampleEnd(timestamp),
            MarkerType::BenchmarkStart => MarkerEvent::BenchmarkStart(timestamp),
            MarkerType::BenchmarkEnd => MarkerEvent::BenchmarkEnd(timestamp),
        }
    }

    /// The marker type, without its timestamp.
    pub fn marker_type(&self) -> MarkerType {
        match self {
            MarkerEvent::SampleStart(_) => MarkerType::SampleStart,
            MarkerEvent::SampleEnd(_) => MarkerType::SampleEnd,
            MarkerEvent::BenchmarkStart(_) => MarkerType::BenchmarkStart,
            MarkerEvent::BenchmarkEnd(_) => MarkerType::BenchmarkEnd,
        }
    }

    /// The carried timestamp.
    pub fn timestamp(&self) -> u64 {
        match *self {
            MarkerEvent::SampleStart(t)
            | MarkerEvent::SampleEnd(t)
            | MarkerEvent::BenchmarkStart(t)
            | MarkerEvent::BenchmarkEnd(t) => t,
        }
    }
}

/// Measurement mode the runner is operating in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationMode {
    /// Sampling with `perf`, driven by markers.
    Perf,
    /// CPU simulation (callgrind).
    Simulation,
    /// Memory/allocation analysis.
    Analysis,
}

/// A single message exchanged with the runner.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Identity of the benchmark that just executed.
    CurrentBenchmark {
        /// Process that ran the benchmark.
        pid: i32,
        /// Benchmark URI.
        uri: String,
    },
    /// Measured region begins.
    StartBenchmark,
    /// Measured region ends.
    StopBenchmark,
    /// Positive acknowledgement.
    Ack,
    /// Legacy liveness probe, superseded by [`Command::GetIntegrationMode`].
    PingPerf,
    /// Name and version of the harness integration.
    SetIntegration {
        /// Integration name.
        name: String,
        /// Integration version.
        version: String,
    },
    /// Negative acknowledgement.
    Err,
    /// Timestamped marker for a process.
    AddMarker {
        /// Process the marker belongs to.
        pid: i32,
        /// Marker with its timestamp.
        marker: MarkerEvent,
    },
    /// Protocol version handshake.
    SetVersion(u64),
    /// Ask the runner which mode it runs in.
    GetIntegrationMode,
    /// Reply to [`Command::GetIntegrationMode`].
    IntegrationModeResponse(IntegrationMode),
}

/// Encode `command` and write it as one frame.
pub fn write_frame<W: Write>(writer: &mut W, command: &Command) -> Result<(), BackendError> {
    let payload = bincode::serialize(command)?;
    let len = u32::try_from(payload.len()).map_err(|_| BackendError::FrameTooLarge(payload.len()))?;

    // Single write so the frame is not interleaved with other writers
    // (FIFO writes up to PIPE_BUF are atomic).
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame and decode the command it carries.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Command, BackendError> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > MAX_FRAME_LEN {
        return Err(BackendError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(bincode::deserialize(&payload)?)
}
