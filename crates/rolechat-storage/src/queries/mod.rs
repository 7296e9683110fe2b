// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for conversation and message rows.

pub mod conversations;
pub mod messages;
