// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pixel script loading under concurrent dispatch.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use kurukin_analytics::{LoadState, MemoryPixelHost, PixelHost, PixelLoader, ScriptBehavior};
use kurukin_analytics_core::MetaEvent;

use super::support::{webhook, Visitor, LANDING, PIXEL_ID};

#[tokio::test]
async fn concurrent_tracks_insert_one_script() {
	let (_server, url) = webhook(200, 5).await;
	let mut visitor = Visitor::at(LANDING);
	visitor.pixel = Arc::new(MemoryPixelHost::new().with_load_delay(Duration::from_millis(50)));
	let tracker = visitor.tracker(visitor.consenting_store(), Some(&url));

	let results = join_all((0..5).map(|_| tracker.track(MetaEvent::page_view()))).await;

	assert!(results.iter().all(|r| r.browser_sent && r.server_sent));
	assert_eq!(visitor.pixel.script_insertions(), 1);
	assert_eq!(visitor.pixel.init_calls(), 1);
	assert_eq!(visitor.pixel.track_calls().len(), 5);
	assert!(tracker.is_ready());
}

#[tokio::test]
async fn failed_load_downgrades_only_the_event_that_saw_it() {
	let (_server, url) = webhook(200, 2).await;
	let mut visitor = Visitor::at(LANDING);
	visitor.pixel = Arc::new(MemoryPixelHost::new().with_behavior(ScriptBehavior::FailAfterInsert));
	let tracker = visitor.tracker(visitor.consenting_store(), Some(&url));

	let first = tracker.track(MetaEvent::page_view()).await;
	assert!(!first.browser_sent);
	assert!(first.server_sent);
	assert_eq!(visitor.pixel.session().state(), LoadState::Failed);

	// The tag stayed on the page, so the next event uses it without reloading.
	let second = tracker.track(MetaEvent::page_view()).await;
	assert!(second.browser_sent);
	assert_eq!(visitor.pixel.script_insertions(), 1);
	assert_eq!(visitor.pixel.track_calls().len(), 1);
	assert!(tracker.is_ready());
}

#[tokio::test]
async fn trackers_on_one_page_share_script_and_init() {
	let (_server, url) = webhook(200, 2).await;
	let mut visitor = Visitor::at(LANDING);
	visitor.pixel = Arc::new(MemoryPixelHost::new().with_load_delay(Duration::from_millis(30)));
	let store = visitor.consenting_store();
	let header = visitor.tracker(store.clone(), Some(&url));
	let player = visitor.tracker(store, Some(&url));

	let (a, b) = tokio::join!(
		header.track(MetaEvent::page_view()),
		player.track(MetaEvent::page_view())
	);

	assert!(a.browser_sent && b.browser_sent);
	assert_eq!(visitor.pixel.script_insertions(), 1);
	assert_eq!(visitor.pixel.init_calls(), 1);
	assert_eq!(visitor.pixel.track_calls().len(), 2);
	assert!(header.is_ready() && player.is_ready());
}

#[tokio::test]
async fn script_that_never_landed_is_retried() {
	let (_server, url) = webhook(200, 2).await;
	let mut visitor = Visitor::at(LANDING);
	visitor.pixel = Arc::new(MemoryPixelHost::new().with_behavior(ScriptBehavior::FailBeforeInsert));
	let tracker = visitor.tracker(visitor.consenting_store(), Some(&url));

	let first = tracker.track(MetaEvent::page_view()).await;
	assert!(!first.browser_sent);

	visitor.pixel.set_behavior(ScriptBehavior::Load);
	let second = tracker.track(MetaEvent::page_view()).await;
	assert!(second.browser_sent);
	assert_eq!(visitor.pixel.script_insertions(), 1);
}

#[tokio::test]
async fn prepare_preloads_the_script() {
	let visitor = Visitor::at(LANDING);
	let tracker = visitor.tracker(visitor.consenting_store(), None);

	assert!(!tracker.is_ready());
	assert!(tracker.prepare().await);
	assert_eq!(visitor.pixel.script_insertions(), 1);

	tracker.track(MetaEvent::page_view()).await;
	assert_eq!(visitor.pixel.script_insertions(), 1);

	// A fresh loader on the same page sees the finished load.
	let loader = PixelLoader::new(visitor.pixel.clone());
	assert_eq!(loader.state(), LoadState::Loaded);
	loader.ensure(PIXEL_ID).await.unwrap();
	assert_eq!(visitor.pixel.script_insertions(), 1);
	assert_eq!(visitor.pixel.init_calls(), 1);
}
