// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! First-party ad-matching cookies (`_fbp`, `_fbc`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifetime applied to generated cookies when the caller does not pick one.
pub const DEFAULT_COOKIE_LIFETIME_DAYS: u32 = 90;

/// Exclusive upper bound of the random component in a generated `_fbp`.
const FBP_RANDOM_BOUND: u64 = 10_000_000_000;

/// The two cookies used for ad attribution matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetaCookieName {
	/// `_fbp`: browser id, independent of any ad click.
	#[serde(rename = "_fbp")]
	BrowserId,
	/// `_fbc`: click id, derived from an `fbclid` landing parameter.
	#[serde(rename = "_fbc")]
	ClickId,
}

impl MetaCookieName {
	pub const ALL: [MetaCookieName; 2] = [MetaCookieName::BrowserId, MetaCookieName::ClickId];

	/// Returns the cookie name as written to the browser.
	pub fn as_str(&self) -> &'static str {
		match self {
			MetaCookieName::BrowserId => "_fbp",
			MetaCookieName::ClickId => "_fbc",
		}
	}
}

impl std::fmt::Display for MetaCookieName {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl std::str::FromStr for MetaCookieName {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"_fbp" => Ok(MetaCookieName::BrowserId),
			"_fbc" => Ok(MetaCookieName::ClickId),
			other => Err(format!("unknown cookie '{other}'")),
		}
	}
}

/// Current values of both cookies. Either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaCookieValues {
	#[serde(rename = "_fbp")]
	pub fbp: Option<String>,
	#[serde(rename = "_fbc")]
	pub fbc: Option<String>,
}

impl MetaCookieValues {
	pub fn get(&self, name: MetaCookieName) -> Option<&str> {
		match name {
			MetaCookieName::BrowserId => self.fbp.as_deref(),
			MetaCookieName::ClickId => self.fbc.as_deref(),
		}
	}

	pub fn set(&mut self, name: MetaCookieName, value: Option<String>) {
		match name {
			MetaCookieName::BrowserId => self.fbp = value,
			MetaCookieName::ClickId => self.fbc = value,
		}
	}
}

/// Generates a browser id cookie value: `fb.1.<epoch_ms>.<random>`.
pub fn generate_fbp(now: DateTime<Utc>) -> String {
	format!(
		"fb.1.{}.{}",
		now.timestamp_millis(),
		fastrand::u64(0..FBP_RANDOM_BOUND)
	)
}

/// Generates a click id cookie value bound to `fbclid`: `fb.1.<epoch_ms>.<fbclid>`.
pub fn generate_fbc(now: DateTime<Utc>, fbclid: &str) -> String {
	format!("fb.1.{}.{}", now.timestamp_millis(), fbclid)
}
