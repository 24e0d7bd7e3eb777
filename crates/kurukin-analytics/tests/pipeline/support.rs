// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use kurukin_analytics::{
	AnalyticsConfig, AnalyticsStore, KeyValueStorage, MemoryCookieJar, MemoryPixelHost,
	MemoryStorage, StaticPage, StoreEnvironment, Tracker,
};
use kurukin_analytics_core::ConsentUpdate;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PIXEL_ID: &str = "1234567890";
pub const LANDING: &str = "https://kurukin.com/precios";

/// One visitor's browser: storage, cookies and the page they are on.
pub struct Visitor {
	pub storage: Arc<MemoryStorage>,
	pub cookies: Arc<MemoryCookieJar>,
	pub page: Arc<StaticPage>,
	pub pixel: Arc<MemoryPixelHost>,
}

impl Visitor {
	pub fn at(href: &str) -> Self {
		Self {
			storage: Arc::new(MemoryStorage::new()),
			cookies: Arc::new(MemoryCookieJar::new()),
			page: Arc::new(
				StaticPage::new(href)
					.expect("valid href")
					.with_user_agent("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)"),
			),
			pixel: Arc::new(MemoryPixelHost::new()),
		}
	}

	/// A store over this visitor's storage. Each call reloads from storage.
	pub fn store(&self) -> AnalyticsStore {
		AnalyticsStore::load(StoreEnvironment::new(
			self.storage.clone() as Arc<dyn KeyValueStorage>,
			self.cookies.clone(),
			self.page.clone(),
		))
	}

	/// An initialized store with consent granted.
	pub fn consenting_store(&self) -> AnalyticsStore {
		let store = self.store();
		store.initialize();
		store.set_consent(ConsentUpdate::granted());
		store
	}

	pub fn tracker(&self, store: AnalyticsStore, webhook: Option<&str>) -> Tracker {
		let mut config = AnalyticsConfig::new().with_pixel_id(PIXEL_ID);
		if let Some(url) = webhook {
			config = config.with_webhook_url(url).expect("valid webhook url");
		}
		Tracker::builder()
			.store(store)
			.config(config)
			.pixel_host(self.pixel.clone())
			.build()
			.expect("tracker builds")
	}
}

/// A webhook answering every POST to `/capi` with `status`, expecting
/// `expected` calls.
pub async fn webhook(status: u16, expected: u64) -> (MockServer, String) {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/capi"))
		.respond_with(ResponseTemplate::new(status))
		.expect(expected)
		.mount(&server)
		.await;
	let url = format!("{}/capi", server.uri());
	(server, url)
}
