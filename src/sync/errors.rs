// ABOUTME: Sync pipeline error type carrying the partial report of an interrupted run
// ABOUTME: Cancellation, provider, and storage failures tagged with the phase they stopped
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::progress::SyncPhase;
use super::report::SyncReport;
use fitness_core::errors::database::DatabaseError;
use fitness_core::errors::provider::ProviderError;
use thiserror::Error;

/// Why a sync run stopped early
///
/// Everything persisted before the interruption stays valid; `partial`
/// describes it.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Cancellation signal observed
    #[error("sync cancelled during {phase} phase")]
    Cancelled {
        /// Phase that observed the signal
        phase: SyncPhase,
        /// Work completed before cancellation
        partial: Box<SyncReport>,
    },

    /// Provider failure that cannot be isolated to one item
    #[error("provider failure during {phase} phase: {source}")]
    Provider {
        /// Phase that failed
        phase: SyncPhase,
        /// Underlying error
        source: ProviderError,
        /// Work completed before the failure
        partial: Box<SyncReport>,
    },

    /// Storage failure that cannot be isolated to one item
    #[error("storage failure during {phase} phase: {source}")]
    Storage {
        /// Phase that failed
        phase: SyncPhase,
        /// Underlying error
        source: DatabaseError,
        /// Work completed before the failure
        partial: Box<SyncReport>,
    },
}

impl SyncError {
    /// Phase the run stopped in
    #[must_use]
    pub const fn phase(&self) -> SyncPhase {
        match self {
            Self::Cancelled { phase, .. }
            | Self::Provider { phase, .. }
            | Self::Storage { phase, .. } => *phase,
        }
    }

    /// Work completed before the interruption
    #[must_use]
    pub fn partial_report(&self) -> &SyncReport {
        match self {
            Self::Cancelled { partial, .. }
            | Self::Provider { partial, .. }
            | Self::Storage { partial, .. } => partial,
        }
    }

    /// Whether the run was cancelled
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Failure inside a phase, before it is tagged with phase and report
#[derive(Debug, Error)]
pub(crate) enum Interrupt {
    #[error("cancelled")]
    Cancelled,
    #[error(transparent)]
    Provider(ProviderError),
    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

impl From<ProviderError> for Interrupt {
    fn from(error: ProviderError) -> Self {
        if error.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Provider(error)
        }
    }
}

impl Interrupt {
    pub(crate) fn into_sync_error(self, phase: SyncPhase, report: SyncReport) -> SyncError {
        let partial = Box::new(report);
        match self {
            Self::Cancelled => SyncError::Cancelled { phase, partial },
            Self::Provider(source) => SyncError::Provider {
                phase,
                source,
                partial,
            },
            Self::Storage(source) => SyncError::Storage {
                phase,
                source,
                partial,
            },
        }
    }
}
