// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Outcome of one dual-channel dispatch.

use serde::{Deserialize, Serialize};

use crate::ids::EventId;

/// Reason recorded when tracking is blocked by consent.
pub const REASON_CONSENT_NOT_GRANTED: &str = "consent_not_granted";

/// Reason recorded when no relay webhook is configured.
pub const REASON_MISSING_WEBHOOK_URL: &str = "missing_webhook_url";

/// Reason for a non-success relay response.
pub fn http_status_reason(status: u16) -> String {
	format!("http_{status}")
}

/// Reason for a relay transport failure.
pub fn network_error_reason(message: &str) -> String {
	format!("network_error:{message}")
}

/// What happened to one tracked event.
///
/// Dispatch never fails: every downgrade is reported here instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResult {
	#[serde(rename = "eventID")]
	pub event_id: EventId,
	pub browser_sent: bool,
	pub server_sent: bool,
	pub server_status: Option<u16>,
	pub skipped: bool,
	pub reason: Option<String>,
}

impl TrackResult {
	/// Consent gate closed: nothing was sent.
	pub fn consent_not_granted(event_id: EventId) -> Self {
		Self {
			event_id,
			browser_sent: false,
			server_sent: false,
			server_status: None,
			skipped: true,
			reason: Some(REASON_CONSENT_NOT_GRANTED.to_string()),
		}
	}

	/// Event was rejected before dispatch.
	pub fn skipped(event_id: EventId, reason: impl Into<String>) -> Self {
		Self {
			event_id,
			browser_sent: false,
			server_sent: false,
			server_status: None,
			skipped: true,
			reason: Some(reason.into()),
		}
	}

	pub fn missing_webhook(event_id: EventId, browser_sent: bool) -> Self {
		Self {
			event_id,
			browser_sent,
			server_sent: false,
			server_status: None,
			skipped: false,
			reason: Some(REASON_MISSING_WEBHOOK_URL.to_string()),
		}
	}

	/// The relay answered. Any 2xx status counts as sent.
	pub fn relayed(event_id: EventId, browser_sent: bool, status: u16) -> Self {
		let ok = (200..300).contains(&status);
		Self {
			event_id,
			browser_sent,
			server_sent: ok,
			server_status: Some(status),
			skipped: false,
			reason: (!ok).then(|| http_status_reason(status)),
		}
	}

	pub fn network_error(event_id: EventId, browser_sent: bool, message: &str) -> Self {
		Self {
			event_id,
			browser_sent,
			server_sent: false,
			server_status: None,
			skipped: false,
			reason: Some(network_error_reason(message)),
		}
	}
}
