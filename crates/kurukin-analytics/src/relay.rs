// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server-side relay of tracked events.

use std::time::Duration;

use async_trait::async_trait;
use kurukin_analytics_core::RelayPayload;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::{AnalyticsError, RelayError};

/// Keep-alive interval for the relay connection.
const TCP_KEEPALIVE: Duration = Duration::from_secs(60);

/// Delivers relay payloads to the webhook.
#[async_trait]
pub trait RelaySender: Send + Sync {
	/// Sends one payload, returning the HTTP status. Non-2xx statuses are not
	/// errors; only transport failures are.
	async fn send(&self, payload: &RelayPayload) -> Result<u16, RelayError>;
}

/// POSTs payloads as JSON to a webhook URL. No timeout, no retries.
#[derive(Debug, Clone)]
pub struct HttpRelaySender {
	client: Client,
	url: Url,
}

impl HttpRelaySender {
	pub fn new(url: Url) -> Result<Self, AnalyticsError> {
		let client = kurukin_common_http::builder()
			.tcp_keepalive(TCP_KEEPALIVE)
			.build()?;
		Ok(Self { client, url })
	}

	pub fn with_client(url: Url, client: Client) -> Self {
		Self { client, url }
	}

	pub fn url(&self) -> &Url {
		&self.url
	}
}

#[async_trait]
impl RelaySender for HttpRelaySender {
	async fn send(&self, payload: &RelayPayload) -> Result<u16, RelayError> {
		let body = serde_json::to_vec(payload)?;
		let response = self
			.client
			.post(self.url.clone())
			.header(reqwest::header::CONTENT_TYPE, "application/json")
			.body(body)
			.send()
			.await?;

		let status = response.status().as_u16();
		debug!(
			event_name = %payload.event_name,
			event_id = %payload.event_id,
			status,
			"Relay responded"
		);
		Ok(status)
	}
}
