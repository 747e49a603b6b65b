// ABOUTME: Core types and constants for the fitness sync pipeline
// ABOUTME: Foundation crate with data model, error taxonomy, constants, and cancellation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Fitness Core
//!
//! Foundation crate shared by the provider, intelligence, and sync layers.
//! It changes infrequently, which keeps incremental builds of the workspace cheap.
//!
//! ## Modules
//!
//! - **models**: activity summaries, stream samples, metrics rows, daily load rows
//! - **errors**: `ProviderError` and `DatabaseError` taxonomies
//! - **constants**: provider limits, physiology defaults, environment variable names
//! - **cancellation**: cooperative cancellation token shared by every await point

/// Cooperative cancellation signal for long-running sync work
pub mod cancellation;

/// Application constants organized by domain
pub mod constants;

/// Domain-specific error types
pub mod errors;

/// Core data models (summaries, streams, metrics, training load)
pub mod models;

pub use cancellation::CancellationToken;
