// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Visitor consent state and the tracking gate derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Consent decision recorded for the visitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentStatus {
	/// No decision yet. Tracking is disabled.
	#[default]
	Unknown,
	/// The visitor opted in.
	Granted,
	/// The visitor opted out.
	Denied,
}

impl ConsentStatus {
	pub const ALL: [ConsentStatus; 3] = [
		ConsentStatus::Unknown,
		ConsentStatus::Granted,
		ConsentStatus::Denied,
	];

	/// Returns the wire representation.
	pub fn as_str(&self) -> &'static str {
		match self {
			ConsentStatus::Unknown => "unknown",
			ConsentStatus::Granted => "granted",
			ConsentStatus::Denied => "denied",
		}
	}
}

impl std::fmt::Display for ConsentStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl std::str::FromStr for ConsentStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim() {
			"unknown" => Ok(ConsentStatus::Unknown),
			"granted" => Ok(ConsentStatus::Granted),
			"denied" => Ok(ConsentStatus::Denied),
			other => Err(format!("unknown consent status '{other}'")),
		}
	}
}

/// Persisted consent state.
///
/// Missing members in a persisted blob fall back to the defaults, so older
/// snapshots stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentState {
	pub status: ConsentStatus,
	pub gdpr_applies: bool,
	pub ccpa_opt_out: bool,
	pub updated_at: Option<DateTime<Utc>>,
}

impl Default for ConsentState {
	fn default() -> Self {
		Self {
			status: ConsentStatus::Unknown,
			gdpr_applies: true,
			ccpa_opt_out: false,
			updated_at: None,
		}
	}
}

impl ConsentState {
	/// Tracking is permitted only for a granted status without a CCPA opt-out.
	pub fn allows_tracking(&self) -> bool {
		self.status == ConsentStatus::Granted && !self.ccpa_opt_out
	}

	/// Returns a copy with `update` applied and `updated_at` stamped to `now`.
	pub fn apply(&self, update: &ConsentUpdate, now: DateTime<Utc>) -> ConsentState {
		ConsentState {
			status: update.status.unwrap_or(self.status),
			gdpr_applies: update.gdpr_applies.unwrap_or(self.gdpr_applies),
			ccpa_opt_out: update.ccpa_opt_out.unwrap_or(self.ccpa_opt_out),
			updated_at: Some(now),
		}
	}
}

/// Partial consent update. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsentUpdate {
	pub status: Option<ConsentStatus>,
	pub gdpr_applies: Option<bool>,
	pub ccpa_opt_out: Option<bool>,
}

impl ConsentUpdate {
	/// Creates an update that only changes the status.
	pub fn status(status: ConsentStatus) -> Self {
		Self {
			status: Some(status),
			..Self::default()
		}
	}

	pub fn granted() -> Self {
		Self::status(ConsentStatus::Granted)
	}

	pub fn denied() -> Self {
		Self::status(ConsentStatus::Denied)
	}

	pub fn with_gdpr_applies(mut self, applies: bool) -> Self {
		self.gdpr_applies = Some(applies);
		self
	}

	pub fn with_ccpa_opt_out(mut self, opt_out: bool) -> Self {
		self.ccpa_opt_out = Some(opt_out);
		self
	}
}
