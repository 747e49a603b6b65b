// ABOUTME: Configuration module for the sync pipeline
// ABOUTME: Environment-only settings parsed into typed structs at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Environment variable parsing
pub mod environment;

pub use environment::{ServerConfig, StravaApiConfig, StravaCredentials, SyncSettings};
