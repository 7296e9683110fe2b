// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for streaming text-generation services.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::RolechatError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderStreamChunk};

/// Boxed stream of provider chunks.
pub type ProviderStream =
    Pin<Box<dyn Stream<Item = Result<ProviderStreamChunk, RolechatError>> + Send>>;

/// Adapter for inference providers.
///
/// `stream` resolves once the provider has accepted the request (or
/// refused it with [`RolechatError::ProviderRejected`]). Failures after
/// that arrive as `Err` items of type [`RolechatError::ProviderStream`].
/// Dropping the returned stream must abort the underlying request.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    async fn stream(&self, request: ProviderRequest) -> Result<ProviderStream, RolechatError>;
}
