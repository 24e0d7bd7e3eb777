// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP client construction with a consistent User-Agent header.

use reqwest::{Client, ClientBuilder};

/// Creates a new HTTP client with the standard Kurukin User-Agent header.
pub fn new_client() -> reqwest::Result<Client> {
	builder().build()
}

/// Creates a new HTTP client builder with the standard Kurukin User-Agent header.
///
/// Use this when the client needs further tuning.
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// let client = kurukin_common_http::builder()
///     .tcp_keepalive(Duration::from_secs(60))
///     .build();
/// assert!(client.is_ok());
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a new HTTP client builder with a custom User-Agent header.
pub fn builder_with_user_agent(user_agent: impl Into<String>) -> ClientBuilder {
	Client::builder().user_agent(user_agent.into())
}

/// Returns the standard Kurukin User-Agent string.
///
/// Format: `kurukin-analytics/{version}/{os}-{arch}`
pub fn user_agent() -> String {
	format!(
		"kurukin-analytics/{}/{}-{}",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 3);
		assert_eq!(parts[0], "kurukin-analytics");
		assert_eq!(parts[1], env!("CARGO_PKG_VERSION"));
		assert!(parts[2].contains('-'));
	}

	#[tokio::test]
	async fn default_client_builds() {
		assert!(new_client().is_ok());
	}

	#[test]
	fn builder_with_custom_user_agent() {
		let client = builder_with_user_agent("kurukin-cli/1.0").build();
		assert!(client.is_ok());
	}
}
