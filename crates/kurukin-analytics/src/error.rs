// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the analytics SDK.
//!
//! Only construction-time problems surface as [`AnalyticsError`]. Failures
//! while dispatching an event are folded into a
//! [`TrackResult`](kurukin_analytics_core::TrackResult) instead.

use kurukin_analytics_core::ValidationError;
use thiserror::Error;

/// Analytics SDK errors.
#[derive(Debug, Error)]
pub enum AnalyticsError {
	/// Webhook URL could not be parsed or is not http(s).
	#[error("invalid webhook URL '{url}': {message}")]
	InvalidWebhookUrl { url: String, message: String },

	/// Cookie lifetime setting is not a positive number of days.
	#[error("invalid cookie lifetime '{0}': expected a positive number of days")]
	InvalidCookieLifetime(String),

	/// HTTP client could not be built.
	#[error("HTTP client error: {0}")]
	HttpClient(#[from] reqwest::Error),

	/// Event failed schema validation.
	#[error("event validation failed: {0}")]
	Validation(#[from] ValidationError),

	/// Navigation observer task has stopped.
	#[error("navigation observer has shut down")]
	ObserverShutdown,
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Errors from the persistence capabilities (key-value storage, cookie jar).
#[derive(Debug, Error)]
pub enum StorageError {
	/// No storage in this context.
	#[error("storage is unavailable")]
	Unavailable,

	/// Write would exceed the storage quota.
	#[error("storage quota exceeded writing '{key}'")]
	QuotaExceeded { key: String },

	#[error("storage I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("storage serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Errors from the browser pixel host.
///
/// Cloneable so one load failure can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PixelError {
	/// No pixel-capable host in this context.
	#[error("pixel host is unavailable")]
	Unavailable,

	/// Script failed to load.
	#[error("failed to load pixel script from {src}: {message}")]
	ScriptLoad { src: String, message: String },

	/// The host refused a pixel call.
	#[error("pixel call '{method}' failed: {message}")]
	Call { method: String, message: String },
}

/// Errors from the relay transport.
#[derive(Debug, Error)]
pub enum RelayError {
	#[error("relay request failed: {0}")]
	Transport(String),

	#[error("relay payload serialization failed: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for RelayError {
	fn from(err: reqwest::Error) -> Self {
		RelayError::Transport(err.to_string())
	}
}

impl RelayError {
	/// The message carried into a `network_error:<message>` reason.
	pub fn message(&self) -> String {
		match self {
			RelayError::Transport(message) => message.clone(),
			RelayError::Serialization(err) => err.to_string(),
		}
	}
}
