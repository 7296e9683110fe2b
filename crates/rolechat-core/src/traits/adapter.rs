// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait shared by provider and storage adapters.

use async_trait::async_trait;

use crate::error::RolechatError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, health and lifecycle common to every long-lived adapter.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, RolechatError>;

    /// Releases any held resources.
    async fn shutdown(&self) -> Result<(), RolechatError>;
}
