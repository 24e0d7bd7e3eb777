// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracker configuration.
//!
//! Both the pixel id and the webhook URL are optional: without a pixel id the
//! browser channel is skipped, without a webhook the server channel is.

use kurukin_analytics_core::DEFAULT_COOKIE_LIFETIME_DAYS;
use url::Url;

use crate::error::{AnalyticsError, Result};

pub const ENV_PIXEL_ID: &str = "KURUKIN_META_PIXEL_ID";
pub const ENV_WEBHOOK_URL: &str = "KURUKIN_CAPI_WEBHOOK_URL";
pub const ENV_TEST_EVENT_CODE: &str = "KURUKIN_META_TEST_EVENT_CODE";
pub const ENV_COOKIE_DAYS: &str = "KURUKIN_COOKIE_DAYS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsConfig {
	pub pixel_id: Option<String>,
	pub webhook_url: Option<Url>,
	/// Copied into the server payload so events land in the test console.
	pub test_event_code: Option<String>,
	pub cookie_lifetime_days: u32,
}

impl Default for AnalyticsConfig {
	fn default() -> Self {
		Self {
			pixel_id: None,
			webhook_url: None,
			test_event_code: None,
			cookie_lifetime_days: DEFAULT_COOKIE_LIFETIME_DAYS,
		}
	}
}

impl AnalyticsConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Reads configuration from the process environment.
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Reads configuration through `lookup`. Blank values count as unset.
	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |key: &str| normalize(lookup(key));

		let webhook_url = get(ENV_WEBHOOK_URL)
			.map(|raw| parse_webhook_url(&raw))
			.transpose()?;

		let cookie_lifetime_days = match get(ENV_COOKIE_DAYS) {
			Some(raw) => parse_cookie_days(&raw)?,
			None => DEFAULT_COOKIE_LIFETIME_DAYS,
		};

		Ok(Self {
			pixel_id: get(ENV_PIXEL_ID),
			webhook_url,
			test_event_code: get(ENV_TEST_EVENT_CODE),
			cookie_lifetime_days,
		})
	}

	pub fn with_pixel_id(mut self, pixel_id: impl Into<String>) -> Self {
		self.pixel_id = normalize(Some(pixel_id.into()));
		self
	}

	pub fn with_webhook_url(mut self, url: &str) -> Result<Self> {
		self.webhook_url = normalize(Some(url.to_string()))
			.map(|raw| parse_webhook_url(&raw))
			.transpose()?;
		Ok(self)
	}

	pub fn with_test_event_code(mut self, code: impl Into<String>) -> Self {
		self.test_event_code = normalize(Some(code.into()));
		self
	}

	pub fn with_cookie_lifetime_days(mut self, days: u32) -> Result<Self> {
		if days == 0 {
			return Err(AnalyticsError::InvalidCookieLifetime(days.to_string()));
		}
		self.cookie_lifetime_days = days;
		Ok(self)
	}
}

/// Parses a webhook URL, accepting only http and https.
pub fn parse_webhook_url(raw: &str) -> Result<Url> {
	let url = Url::parse(raw.trim()).map_err(|e| AnalyticsError::InvalidWebhookUrl {
		url: raw.to_string(),
		message: e.to_string(),
	})?;
	match url.scheme() {
		"http" | "https" => Ok(url),
		other => Err(AnalyticsError::InvalidWebhookUrl {
			url: raw.to_string(),
			message: format!("unsupported scheme '{other}'"),
		}),
	}
}

fn parse_cookie_days(raw: &str) -> Result<u32> {
	match raw.parse::<u32>() {
		Ok(days) if days > 0 => Ok(days),
		_ => Err(AnalyticsError::InvalidCookieLifetime(raw.to_string())),
	}
}

fn normalize(value: Option<String>) -> Option<String> {
	let value = value?;
	let trimmed = value.trim();
	(!trimmed.is_empty()).then(|| trimmed.to_string())
}
