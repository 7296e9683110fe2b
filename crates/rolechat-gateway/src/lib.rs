// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for Rolechat.
//!
//! Exposes `POST /v1/chat/send`, which starts one chat turn and streams
//! its events as Server-Sent Events, and an unauthenticated `GET /health`.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{GatewayState, HealthState, ServerConfig, router, start_server};
