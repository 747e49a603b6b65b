// ABOUTME: Domain-specific error taxonomies for provider and storage operations
// ABOUTME: Provider errors classify transport, API, cancellation, and data failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Storage repository errors
pub mod database;
/// Remote provider errors
pub mod provider;

pub use database::{DatabaseError, DatabaseResult};
pub use provider::{ProviderError, ProviderResult};
