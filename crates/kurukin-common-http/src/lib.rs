// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP client for Kurukin.
//!
//! Every outbound request carries the same User-Agent so relay operators can
//! tell SDK traffic apart from browser traffic.

mod client;

pub use client::{builder, builder_with_user_agent, new_client, user_agent};
