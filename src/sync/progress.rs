// ABOUTME: Progress events emitted by the sync pipeline over a bounded channel
// ABOUTME: Non-blocking best-effort delivery; every event is also logged at debug level
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace};

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncPhase {
    /// Paging through activity summaries since the watermark
    Activities,
    /// Fetching sensor streams for eligible activities
    Streams,
    /// Computing per-activity metrics
    Metrics,
    /// Rebuilding the daily training load series
    Trends,
    /// Pipeline finished
    Done,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Activities => "activities",
            Self::Streams => "streams",
            Self::Metrics => "metrics",
            Self::Trends => "trends",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// One progress notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    /// Phase emitting the event
    pub phase: SyncPhase,
    /// Items in the phase, when known
    pub total: usize,
    /// Items finished so far
    pub completed: usize,
    /// Item being processed
    pub current_label: Option<String>,
    /// Failure for the item, if it failed
    pub error: Option<String>,
}

impl SyncProgress {
    /// Event marking a phase boundary
    #[must_use]
    pub const fn phase(phase: SyncPhase, total: usize) -> Self {
        Self {
            phase,
            total,
            completed: 0,
            current_label: None,
            error: None,
        }
    }
}

impl fmt::Display for SyncProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}/{}", self.phase, self.completed, self.total)?;
        if let Some(label) = &self.current_label {
            write!(f, " {label}")?;
        }
        if let Some(error) = &self.error {
            write!(f, " failed: {error}")?;
        }
        Ok(())
    }
}

/// Sending half of the progress channel
///
/// Cloneable so concurrent item tasks can report independently. A reporter
/// without a channel only logs.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<mpsc::Sender<SyncProgress>>,
}

impl ProgressReporter {
    /// Create a reporter and the receiver an observer drains
    #[must_use]
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<SyncProgress>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// Reporter that only logs
    #[must_use]
    pub const fn disabled() -> Self {
        Self { sender: None }
    }

    /// Deliver an event without waiting
    ///
    /// A full or closed channel drops the event.
    pub fn emit(&self, event: SyncProgress) {
        debug!(
            phase = %event.phase,
            total = event.total,
            completed = event.completed,
            label = event.current_label.as_deref(),
            error = event.error.as_deref(),
            "sync progress"
        );

        let Some(sender) = &self.sender else {
            return;
        };
        match sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!("progress channel full, event dropped"),
            Err(TrySendError::Closed(_)) => trace!("progress observer gone, event dropped"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_full_channel_drops_without_blocking() {
        let (reporter, mut receiver) = ProgressReporter::channel(1);
        reporter.emit(SyncProgress::phase(SyncPhase::Streams, 3));
        reporter.emit(SyncProgress::phase(SyncPhase::Metrics, 3));

        assert_eq!(receiver.try_recv().unwrap().phase, SyncPhase::Streams);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (reporter, receiver) = ProgressReporter::channel(4);
        drop(receiver);
        reporter.emit(SyncProgress::phase(SyncPhase::Trends, 0));
    }

    #[test]
    fn test_display_includes_error() {
        let event = SyncProgress {
            phase: SyncPhase::Streams,
            total: 2,
            completed: 1,
            current_label: Some("Easy Run (2024-05-04)".into()),
            error: Some("404".into()),
        };
        assert_eq!(
            event.to_string(),
            "[streams] 1/2 Easy Run (2024-05-04) failed: 404"
        );
    }
}
