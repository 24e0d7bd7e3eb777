// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end tests for the attribution and relay pipeline.

mod attribution;
mod dispatch;
mod persistence;
mod pixel;
mod support;
