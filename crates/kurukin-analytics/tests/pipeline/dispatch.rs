// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Dual-channel dispatch against a live webhook.
//!
//! Key invariants:
//! - The pixel call and the relay body carry the same event id
//! - Without consent neither channel is touched
//! - Relay failures downgrade the result, they never error

use kurukin_analytics::{PixelCommand, TrackOptions};
use kurukin_analytics_core::{
	ConsentStatus, ConsentUpdate, CustomParams, EventId, HashedUserData, MetaEvent,
};
use serde_json::Value;

use super::support::{webhook, Visitor, LANDING, PIXEL_ID};

// ============================================================================
// Successful relay
// ============================================================================

#[tokio::test]
async fn purchase_reaches_both_channels() {
	let (server, url) = webhook(200, 1).await;
	let visitor = Visitor::at(&format!("{LANDING}?utm_source=ig&utm_campaign=launch"));
	let tracker = visitor.tracker(visitor.consenting_store(), Some(&url));

	let result = tracker.track(MetaEvent::purchase(49.97, "USD").unwrap()).await;
	assert!(result.browser_sent);
	assert!(result.server_sent);
	assert!(!result.skipped);
	assert_eq!(result.server_status, Some(200));
	assert_eq!(result.reason, None);

	let requests = server.received_requests().await.unwrap();
	let body: Value = requests[0].body_json().unwrap();
	assert_eq!(body["provider"], "meta");
	assert_eq!(body["event_name"], "Purchase");
	assert_eq!(body["event_id"], result.event_id.to_string());
	assert_eq!(body["browser"]["channel"], "browser");
	assert_eq!(body["browser"]["method"], "track");
	assert_eq!(body["browser"]["params"]["value"], 49.97);
	assert_eq!(body["browser"]["params"]["currency"], "USD");
	assert_eq!(body["server"]["channel"], "server");
	assert_eq!(body["server"]["action_source"], "website");
	assert_eq!(body["server"]["event_id"], body["event_id"]);
	assert_eq!(body["server"]["custom_data"], body["browser"]["params"]);
	assert_eq!(body["server"]["user_data"]["external_id"], body["anonymous_id"]);
	assert_eq!(body["server"]["user_data"]["fbp"], body["cookies"]["_fbp"]);
	assert!(body["server"].get("test_event_code").is_none());
	assert_eq!(body["attribution"]["utm_source"], "ig");
	assert_eq!(body["attribution"]["utm_campaign"], "launch");
	assert_eq!(body["consent"]["status"], "granted");

	let pixel_ids: Vec<EventId> = visitor
		.pixel
		.track_calls()
		.into_iter()
		.filter_map(|call| match call {
			PixelCommand::Track { event_id, .. } => Some(event_id),
			_ => None,
		})
		.collect();
	assert_eq!(pixel_ids, vec![result.event_id]);
	assert_eq!(visitor.pixel.calls()[0], PixelCommand::Init { pixel_id: PIXEL_ID.to_string() });
}

#[tokio::test]
async fn every_call_gets_a_fresh_event_id() {
	let (_server, url) = webhook(200, 2).await;
	let visitor = Visitor::at(LANDING);
	let tracker = visitor.tracker(visitor.consenting_store(), Some(&url));

	let first = tracker.track(MetaEvent::page_view()).await;
	let second = tracker.track(MetaEvent::page_view()).await;
	assert_ne!(first.event_id, second.event_id);
}

#[tokio::test]
async fn hashed_user_data_is_forwarded() {
	let (server, url) = webhook(200, 1).await;
	let visitor = Visitor::at(LANDING);
	let tracker = visitor.tracker(visitor.consenting_store(), Some(&url));

	let event = MetaEvent::from_json("Lead", serde_json::json!({"lead_type": "demo"})).unwrap();
	let options = TrackOptions::new().with_user_data(
		HashedUserData::new()
			.email(" Ana@Example.com ")
			.phone("+52 (55) 1234-5678")
			.build(),
	);
	tracker.track_with(event, options).await;

	let body: Value = server.received_requests().await.unwrap()[0].body_json().unwrap();
	let user_data = &body["server"]["user_data"];
	assert_eq!(user_data["em"], kurukin_analytics_core::sha256_hex("ana@example.com"));
	assert_eq!(user_data["ph"], kurukin_analytics_core::sha256_hex("525512345678"));
	assert_eq!(
		user_data["client_user_agent"],
		"Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)"
	);
}

// ============================================================================
// Downgrades
// ============================================================================

#[tokio::test]
async fn server_error_is_reported_as_http_status() {
	let (_server, url) = webhook(500, 1).await;
	let visitor = Visitor::at(LANDING);
	let tracker = visitor.tracker(visitor.consenting_store(), Some(&url));

	let result = tracker.track(MetaEvent::purchase(49.97, "USD").unwrap()).await;
	assert!(result.browser_sent);
	assert!(!result.server_sent);
	assert!(!result.skipped);
	assert_eq!(result.server_status, Some(500));
	assert_eq!(result.reason.as_deref(), Some("http_500"));
}

#[tokio::test]
async fn unreachable_webhook_is_a_network_error() {
	let visitor = Visitor::at(LANDING);
	let tracker = visitor.tracker(visitor.consenting_store(), Some("http://127.0.0.1:1/capi"));

	let result = tracker.track(MetaEvent::page_view()).await;
	assert!(result.browser_sent);
	assert!(!result.server_sent);
	assert_eq!(result.server_status, None);
	assert!(result.reason.unwrap().starts_with("network_error:"));
}

#[tokio::test]
async fn missing_webhook_keeps_browser_channel() {
	let visitor = Visitor::at(LANDING);
	let tracker = visitor.tracker(visitor.consenting_store(), None);

	let result = tracker.track(MetaEvent::page_view()).await;
	assert!(result.browser_sent);
	assert!(!result.server_sent);
	assert!(!result.skipped);
	assert_eq!(result.reason.as_deref(), Some("missing_webhook_url"));
}

// ============================================================================
// Consent gate
// ============================================================================

#[tokio::test]
async fn nothing_leaves_without_consent() {
	for status in ConsentStatus::ALL {
		for ccpa_opt_out in [false, true] {
			if status == ConsentStatus::Granted && !ccpa_opt_out {
				continue;
			}

			let (server, url) = webhook(200, 0).await;
			let visitor = Visitor::at(&format!("{LANDING}?fbclid=abc123"));
			let store = visitor.store();
			store.initialize();
			store.set_consent(ConsentUpdate::status(status).with_ccpa_opt_out(ccpa_opt_out));
			let tracker = visitor.tracker(store, Some(&url));

			let result = tracker.track(MetaEvent::purchase(10.0, "MXN").unwrap()).await;
			assert!(result.skipped, "{status} ccpa_opt_out={ccpa_opt_out}");
			assert!(!result.browser_sent);
			assert!(!result.server_sent);
			assert_eq!(result.reason.as_deref(), Some("consent_not_granted"));
			assert!(visitor.pixel.calls().is_empty());
			assert_eq!(visitor.pixel.script_insertions(), 0);

			server.verify().await;
		}
	}
}

#[tokio::test]
async fn granting_consent_later_enables_tracking() {
	let (_server, url) = webhook(200, 1).await;
	let visitor = Visitor::at(LANDING);
	let store = visitor.store();
	store.initialize();
	let tracker = visitor.tracker(store.clone(), Some(&url));

	let blocked = tracker.track(MetaEvent::page_view()).await;
	assert!(blocked.skipped);

	store.set_consent(ConsentUpdate::granted());
	let sent = tracker.track(MetaEvent::page_view()).await;
	assert!(sent.server_sent);
}

// ============================================================================
// Detached dispatch
// ============================================================================

#[tokio::test]
async fn detached_track_completes_on_its_own() {
	let (server, url) = webhook(200, 1).await;
	let visitor = Visitor::at(LANDING);
	let tracker = visitor.tracker(visitor.consenting_store(), Some(&url));

	let event = MetaEvent::custom("DemoBooked", CustomParams::new().insert("seats", 3)).unwrap();
	let handle = tracker.track_detached(event).unwrap();
	drop(tracker);

	let result = handle.await.unwrap();
	assert!(result.server_sent);
	let body: Value = server.received_requests().await.unwrap()[0].body_json().unwrap();
	assert_eq!(body["browser"]["method"], "trackCustom");
	assert_eq!(body["browser"]["params"]["seats"], 3);
}
