// ABOUTME: Main library entry point for the fitness sync pipeline
// ABOUTME: Wires provider clients, storage, and the intelligence engine into a resumable sync
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Fitness Sync
//!
//! Rate-limited ingestion of activity summaries and sensor streams from a
//! fitness provider, followed by per-activity aerobic metrics and a daily
//! training load series.
//!
//! ## Architecture
//!
//! - **fitness-core**: data model, error taxonomy, constants, cancellation
//! - **fitness-providers**: rate limiter, credentials, Strava client
//! - **fitness-intelligence**: metrics engine, training load, trends
//! - **database**: repository trait with in-memory and SQLite implementations
//! - **sync**: the phase orchestrator and progress reporting
//!
//! ## Example
//!
//! ```rust,no_run
//! use fitness_sync::config::ServerConfig;
//! use fitness_sync::database::open_repository;
//! use fitness_sync::sync::SyncOrchestrator;
//! use fitness_sync::CancellationToken;
//! use fitness_intelligence::MetricsEngine;
//! use fitness_providers::{
//!     build_client, RateLimiter, StaticTokenProvider, StravaClient,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServerConfig::from_env()?;
//! let repository = open_repository(&config.database_url).await?;
//! let client = StravaClient::new(
//!     build_client(config.strava.http),
//!     &config.strava.base_url,
//!     Arc::new(RateLimiter::new(config.rate_limit)),
//!     Arc::new(StaticTokenProvider::new("token")),
//! );
//! let orchestrator = SyncOrchestrator::new(
//!     Arc::new(client),
//!     repository,
//!     MetricsEngine::new(config.heart_rate),
//!     config.sync,
//! );
//! let report = orchestrator.run(&CancellationToken::new()).await?;
//! println!("{} streams synced", report.streams.succeeded());
//! # Ok(())
//! # }
//! ```

/// Environment configuration
pub mod config;

/// Storage repository trait and implementations
pub mod database;

/// Structured logging setup
pub mod logging;

/// Sync pipeline orchestration
pub mod sync;

pub use fitness_core::errors;
pub use fitness_core::models;
pub use fitness_core::CancellationToken;
