// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Kurukin conversion tracking SDK.
//!
//! Wires the pure types from [`kurukin_analytics_core`] to the outside world:
//! persistent storage and cookies, the page being viewed, the Meta pixel, and
//! the relay webhook that forwards events to the Conversions API.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use kurukin_analytics::{
//!     AnalyticsConfig, AnalyticsStore, MemoryCookieJar, MemoryStorage, StaticPage,
//!     StoreEnvironment, Tracker,
//! };
//! use kurukin_analytics_core::{ConsentUpdate, MetaEvent};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = AnalyticsStore::load(StoreEnvironment::new(
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(MemoryCookieJar::new()),
//!     Arc::new(StaticPage::new("https://kurukin.com/?utm_source=ig")?),
//! ));
//! let navigation = kurukin_analytics::bootstrap(&store).await;
//! store.set_consent(ConsentUpdate::granted());
//!
//! let tracker = Tracker::builder()
//!     .store(store)
//!     .config(AnalyticsConfig::from_env()?)
//!     .build()?;
//!
//! let result = tracker.track(MetaEvent::purchase(49.97, "USD")?).await;
//! println!("relayed: {}", result.server_sent);
//!
//! navigation.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod cookie_jar;
pub mod error;
pub mod navigation;
pub mod page;
pub mod pixel;
pub mod relay;
pub mod storage;
pub mod store;
pub mod tracker;
pub mod video;

pub use capture::capture_from_page;
pub use config::{parse_webhook_url, AnalyticsConfig};
pub use cookie_jar::{
	parse_cookie_header, CookieJar, MemoryCookieJar, NoCookieJar, SetCookie, StorageCookieJar,
};
pub use error::{AnalyticsError, PixelError, RelayError, Result, StorageError};
pub use navigation::{bootstrap, NavigationEvent, NavigationHandle, NavigationObserver};
pub use page::{NoPage, PageContext, PageLocation, StaticPage};
pub use pixel::{
	LoadState, MemoryPixelHost, NoPixelHost, PixelCommand, PixelHost, PixelLoader, PixelSession,
	ScriptBehavior, PIXEL_SCRIPT_ID, PIXEL_SCRIPT_URL,
};
pub use relay::{HttpRelaySender, RelaySender};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, NoStorage};
pub use store::{
	AnalyticsStore, PersistedState, StoreEnvironment, StoreSnapshot, ANONYMOUS_ID_STORAGE_KEY,
	STATE_STORAGE_KEY,
};
pub use tracker::{TrackOptions, Tracker, TrackerBuilder};
pub use video::{
	progress_percent, safe_number, EventSink, PlaybackSnapshot, PlayerEvent, VideoAnalytics,
	PROGRESS_MILESTONES,
};
