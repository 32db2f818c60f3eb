//! Sampling result codes.

use crate::actuator::MoveResult;
use crate::capture::CaptureResultCode;
use std::fmt;

/// Result of sampling channels over one actuator movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleResult {
    /// Movement and capture both finished.
    Ok,
    /// Movement or capture aborted.
    Aborted,
    /// Actuator is powered off.
    PoweredOff,
}

impl SampleResult {
    /// Reduce the results of one movement and one capture.
    ///
    /// # Panics
    /// Panics if the combination cannot be produced by a finished move and
    /// a finished capture (e.g. either of them reporting a wait timeout).
    pub fn reduce(move_rc: MoveResult, cap_rc: CaptureResultCode) -> Self {
        if move_rc == MoveResult::Aborted || cap_rc == CaptureResultCode::Aborted {
            return Self::Aborted;
        }
        if move_rc == MoveResult::PoweredOff {
            return Self::PoweredOff;
        }
        assert_eq!(move_rc, MoveResult::Ok, "unfinished move reduced");
        assert_eq!(cap_rc, CaptureResultCode::Ok, "unfinished capture reduced");
        Self::Ok
    }

    /// Upper-case name of the result.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Aborted => "ABORTED",
            Self::PoweredOff => "POWERED_OFF",
        }
    }
}

impl fmt::Display for SampleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
