// ABOUTME: Sync pipeline module: orchestrator, progress reporting, reports, and errors
// ABOUTME: Turns provider data into persisted summaries, streams, metrics, and training load
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Sync error with partial report
pub mod errors;
/// Phase state machine
pub mod orchestrator;
/// Progress events and the non-blocking reporter
pub mod progress;
/// Per-item outcomes and phase reports
pub mod report;

pub use errors::SyncError;
pub use orchestrator::SyncOrchestrator;
pub use progress::{ProgressReporter, SyncPhase, SyncProgress};
pub use report::{ItemOutcome, ItemResult, PhaseReport, SyncReport};
