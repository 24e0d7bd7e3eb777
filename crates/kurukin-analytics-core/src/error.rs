// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Validation errors for event construction.

use thiserror::Error;

/// Errors raised while building or validating a tracked event.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
	/// Event name is empty or whitespace.
	#[error("event name must not be empty")]
	EmptyEventName,

	/// A custom event tried to use one of the standard event names.
	#[error("'{0}' is a standard event name and must use its standard parameters")]
	ReservedEventName(String),

	/// Currency is not a three-letter ISO 4217 code.
	#[error("invalid currency code '{0}': expected three ASCII letters")]
	InvalidCurrency(String),

	/// A numeric parameter is NaN or infinite.
	#[error("parameter '{0}' must be a finite number")]
	NonFiniteNumber(String),

	/// A required parameter is missing or blank.
	#[error("missing required parameter '{0}'")]
	MissingParameter(String),

	/// Parameters did not match the schema of a standard event.
	#[error("invalid parameters for {event}: {message}")]
	InvalidParameters { event: String, message: String },

	/// A custom parameter is not a primitive or an array of primitives.
	#[error("custom parameter '{0}' must be a string, number, boolean or an array of those")]
	UnsupportedParamValue(String),
}

/// Result type alias for validation.
pub type Result<T> = std::result::Result<T, ValidationError>;
