//! Timestamped markers.
//!
//! Markers let the backend correlate its own recording (e.g. a perf trace)
//! with the benchmark timeline. They are forwarded immediately and never kept.

use crate::clock::current_timestamp;
use crate::error::MarkerError;
use crate::hooks::InstrumentHooks;

/// Kind of event a marker records.
///
/// The discriminants are stable wire values shared with the C ABI.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkerType {
    /// Start of a sampling period (delimits one benchmark from the next).
    SampleStart = 0,
    /// End of a sampling period.
    SampleEnd = 1,
    /// Start of the measured body, harness code excluded.
    BenchmarkStart = 2,
    /// End of the measured body.
    BenchmarkEnd = 3,
}

impl MarkerType {
    /// All marker types in wire order.
    pub const ALL: [MarkerType; 4] = [
        MarkerType::SampleStart,
        MarkerType::SampleEnd,
        MarkerType::BenchmarkStart,
        MarkerType::BenchmarkEnd,
    ];

    /// Wire value of this marker type.
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MarkerType {
    type Error = MarkerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MarkerType::SampleStart),
            1 => Ok(MarkerType::SampleEnd),
            2 => Ok(MarkerType::BenchmarkStart),
            3 => Ok(MarkerType::BenchmarkEnd),
            other => Err(MarkerError::UnknownType(other)),
        }
    }
}

/// A single timestamped event for one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    /// Process the event belongs to.
    pub pid: u32,
    /// What happened.
    pub marker_type: MarkerType,
    /// When it happened, in [`current_timestamp`] units.
    pub timestamp: u64,
}

impl Marker {
    /// Build a marker with an explicit timestamp.
    pub fn new(pid: u32, marker_type: MarkerType, timestamp: u64) -> Self {
        Self {
            pid,
            marker_type,
            timestamp,
        }
    }

    /// Build a marker stamped with the current clock reading.
    pub fn now(pid: u32, marker_type: MarkerType) -> Self {
        Self::new(pid, marker_type, current_timestamp())
    }
}

impl InstrumentHooks {
    /// Forward a marker to the backend.
    ///
    /// The timestamp is supplied by the caller (normally from
    /// [`current_timestamp`]) so markers can be batched or aligned with events
    /// measured elsewhere. Session state is not affected.
    pub fn add_marker(
        &mut self,
        pid: u32,
        marker_type: MarkerType,
        timestamp: u64,
    ) -> Result<(), MarkerError> {
        self.add(Marker::new(pid, marker_type, timestamp))
    }

    /// Forward an already-built [`Marker`].
    pub fn add(&mut self, marker: Marker) -> Result<(), MarkerError> {
        let pid = i32::try_from(marker.pid).map_err(|_| MarkerError::PidOutOfRange(marker.pid))?;
        self.backend_mut()
            .add_marker(pid, marker.marker_type, marker.timestamp)?;
        Ok(())
    }
}
