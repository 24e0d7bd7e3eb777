// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Dual-channel event dispatch.
//!
//! One call to [`Tracker::track`] produces one event id and, consent allowing,
//! fires the browser pixel and then POSTs the relay webhook with that same id.
//! Dispatch never fails; every downgrade ends up in the returned
//! [`TrackResult`].

use std::sync::Arc;

use chrono::Utc;
use kurukin_analytics_core::{MetaEvent, RelayPayload, TrackResult, TrackedEvent, UserData};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::pixel::{NoPixelHost, PixelHost, PixelLoader};
use crate::relay::{HttpRelaySender, RelaySender};
use crate::store::AnalyticsStore;
use crate::video::EventSink;

/// Per-call extras.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackOptions {
	/// Merged over the default server `user_data`; present fields win.
	pub user_data: UserData,
}

impl TrackOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Extra matching fields, typically built with
	/// [`HashedUserData`](kurukin_analytics_core::HashedUserData).
	pub fn with_user_data(mut self, user_data: UserData) -> Self {
		self.user_data = user_data;
		self
	}
}

/// Builder for [`Tracker`].
pub struct TrackerBuilder {
	store: Option<AnalyticsStore>,
	config: AnalyticsConfig,
	pixel_host: Option<Arc<dyn PixelHost>>,
	relay: Option<Arc<dyn RelaySender>>,
}

impl TrackerBuilder {
	pub fn new() -> Self {
		Self {
			store: None,
			config: AnalyticsConfig::default(),
			pixel_host: None,
			relay: None,
		}
	}

	/// Store holding consent, identity and attribution. Defaults to a
	/// detached store.
	pub fn store(mut self, store: AnalyticsStore) -> Self {
		self.store = Some(store);
		self
	}

	pub fn config(mut self, config: AnalyticsConfig) -> Self {
		self.config = config;
		self
	}

	/// Document hosting the pixel. Defaults to none. Trackers built over the
	/// same host share its script load and `init` bookkeeping.
	pub fn pixel_host(mut self, host: Arc<dyn PixelHost>) -> Self {
		self.pixel_host = Some(host);
		self
	}

	/// Overrides the relay transport. Setting one counts as having a webhook.
	pub fn relay(mut self, relay: Arc<dyn RelaySender>) -> Self {
		self.relay = Some(relay);
		self
	}

	pub fn build(self) -> Result<Tracker> {
		let relay = match self.relay {
			Some(relay) => Some(relay),
			None => match self.config.webhook_url.clone() {
				Some(url) => Some(Arc::new(HttpRelaySender::new(url)?) as Arc<dyn RelaySender>),
				None => None,
			},
		};

		let host = self
			.pixel_host
			.unwrap_or_else(|| Arc::new(NoPixelHost) as Arc<dyn PixelHost>);

		info!(
			pixel = self.config.pixel_id.is_some(),
			webhook = relay.is_some(),
			"Tracker initialized"
		);

		Ok(Tracker {
			inner: Arc::new(TrackerInner {
				store: self.store.unwrap_or_else(AnalyticsStore::detached),
				config: self.config,
				pixel: PixelLoader::new(host),
				relay,
			}),
		})
	}
}

impl Default for TrackerBuilder {
	fn default() -> Self {
		Self::new()
	}
}

struct TrackerInner {
	store: AnalyticsStore,
	config: AnalyticsConfig,
	pixel: PixelLoader,
	relay: Option<Arc<dyn RelaySender>>,
}

/// Sends events to the pixel and the relay webhook.
#[derive(Clone)]
pub struct Tracker {
	inner: Arc<TrackerInner>,
}

impl Tracker {
	pub fn builder() -> TrackerBuilder {
		TrackerBuilder::new()
	}

	pub fn store(&self) -> &AnalyticsStore {
		&self.inner.store
	}

	pub fn config(&self) -> &AnalyticsConfig {
		&self.inner.config
	}

	/// Whether consent currently allows tracking.
	pub fn is_enabled(&self) -> bool {
		self.inner.store.has_consent_for_tracking()
	}

	/// Whether the pixel script has finished loading.
	pub fn is_ready(&self) -> bool {
		self.inner.pixel.is_ready()
	}

	/// Loads the pixel ahead of the first event when tracking is enabled and a
	/// pixel id is configured. Returns readiness.
	pub async fn prepare(&self) -> bool {
		let Some(pixel_id) = self.inner.config.pixel_id.as_deref() else {
			return false;
		};
		if !self.is_enabled() || !self.inner.pixel.is_available() {
			return false;
		}
		if let Err(e) = self.inner.pixel.ensure(pixel_id).await {
			warn!(error = %e, "Pixel preload failed");
		}
		self.is_ready()
	}

	pub async fn track(&self, event: MetaEvent) -> TrackResult {
		self.track_with(event, TrackOptions::default()).await
	}

	pub async fn track_with(&self, event: MetaEvent, options: TrackOptions) -> TrackResult {
		let inner = &self.inner;
		let source_url = inner.store.page().location().map(|l| l.href().to_string());
		let tracked = TrackedEvent::new(&event, Utc::now(), source_url);
		let event_id = tracked.event_id;

		if !inner.store.has_consent_for_tracking() {
			debug!(event_name = %tracked.event_name, "Tracking skipped: consent not granted");
			return TrackResult::consent_not_granted(event_id);
		}

		if let Err(e) = event.validate() {
			warn!(event_name = %tracked.event_name, error = %e, "Tracking skipped: invalid parameters");
			return TrackResult::skipped(event_id, format!("invalid_params:{e}"));
		}

		let cookies = inner.store.sync_meta_cookies();
		let browser_sent = self.send_browser(&tracked).await;

		let Some(relay) = inner.relay.as_ref() else {
			debug!(event_name = %tracked.event_name, %event_id, "No webhook configured");
			return TrackResult::missing_webhook(event_id, browser_sent);
		};

		let anonymous_id = inner.store.anonymous_id();
		let user_data = UserData {
			external_id: Some(anonymous_id.to_string()),
			fbp: cookies.fbp.clone(),
			fbc: cookies.fbc.clone(),
			client_user_agent: inner.store.page().user_agent(),
			..UserData::default()
		}
		.merge(options.user_data);

		let server = tracked.server_payload(user_data, inner.config.test_event_code.clone());
		let payload = RelayPayload::new(
			&tracked,
			server,
			inner.store.attribution(),
			inner.store.consent(),
			anonymous_id,
			cookies,
		);

		match relay.send(&payload).await {
			Ok(status) => {
				let result = TrackResult::relayed(event_id, browser_sent, status);
				if result.server_sent {
					debug!(event_name = %tracked.event_name, %event_id, status, "Event relayed");
				} else {
					warn!(event_name = %tracked.event_name, %event_id, status, "Relay rejected event");
				}
				result
			}
			Err(e) => {
				warn!(event_name = %tracked.event_name, %event_id, error = %e, "Relay request failed");
				TrackResult::network_error(event_id, browser_sent, &e.message())
			}
		}
	}

	/// Spawns [`track`](Self::track) onto the current runtime. Returns `None`,
	/// dropping the event, when called outside a runtime.
	pub fn track_detached(&self, event: MetaEvent) -> Option<JoinHandle<TrackResult>> {
		match Handle::try_current() {
			Ok(handle) => {
				let tracker = self.clone();
				Some(handle.spawn(async move { tracker.track(event).await }))
			}
			Err(_) => {
				warn!(event_name = %event.name(), "No async runtime; event dropped");
				None
			}
		}
	}

	async fn send_browser(&self, tracked: &TrackedEvent) -> bool {
		let inner = &self.inner;
		let Some(pixel_id) = inner.config.pixel_id.as_deref() else {
			return false;
		};
		if !inner.pixel.is_available() {
			return false;
		}

		if let Err(e) = inner.pixel.ensure(pixel_id).await {
			warn!(event_name = %tracked.event_name, error = %e, "Pixel unavailable");
			return false;
		}

		match inner.pixel.track(
			tracked.method,
			&tracked.event_name,
			tracked.params.clone(),
			tracked.event_id,
		) {
			Ok(()) => true,
			Err(e) => {
				warn!(event_name = %tracked.event_name, error = %e, "Pixel call failed");
				false
			}
		}
	}
}

impl EventSink for Tracker {
	fn emit(&self, event: MetaEvent) {
		self.track_detached(event);
	}
}

impl std::fmt::Debug for Tracker {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Tracker")
			.field("config", &self.inner.config)
			.field("pixel", &self.inner.pixel)
			.finish_non_exhaustive()
	}
}
