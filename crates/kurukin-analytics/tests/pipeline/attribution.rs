// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribution capture across navigations.
//!
//! Key invariants:
//! - A later capture never erases a value an earlier capture set
//! - Present values in a later capture win
//! - `_fbc` follows the most recent `fbclid` and is otherwise left alone

use kurukin_analytics::{bootstrap, CookieJar, NavigationEvent};
use kurukin_analytics_core::MetaCookieName;
use proptest::prelude::*;

use super::support::{Visitor, LANDING};

#[test]
fn click_id_survives_a_later_organic_visit() {
	let visitor = Visitor::at(&format!("{LANDING}?utm_source=ig&utm_campaign=launch&fbclid=abc123"));
	let store = visitor.store();
	store.initialize();

	let attribution = store.attribution();
	assert_eq!(attribution.utm_source.as_deref(), Some("ig"));
	assert_eq!(attribution.utm_campaign.as_deref(), Some("launch"));
	assert_eq!(attribution.fbclid.as_deref(), Some("abc123"));

	let fbc = visitor.cookies.get("_fbc").unwrap();
	assert!(fbc.starts_with("fb.1."));
	assert!(fbc.ends_with(".abc123"));
	assert_eq!(store.get_cookie(MetaCookieName::ClickId).as_deref(), Some(fbc.as_str()));

	visitor.page.navigate(&format!("{LANDING}?utm_source=fb")).unwrap();
	let attribution = store.capture_attribution_from_url(None);
	assert_eq!(attribution.utm_source.as_deref(), Some("fb"));
	assert_eq!(attribution.utm_campaign.as_deref(), Some("launch"));
	assert_eq!(attribution.fbclid.as_deref(), Some("abc123"));
	assert_eq!(visitor.cookies.get("_fbc").as_deref(), Some(fbc.as_str()));
}

#[test]
fn initialize_is_idempotent() {
	let visitor = Visitor::at(&format!("{LANDING}?utm_source=ig"));
	let store = visitor.store();

	let first = store.initialize();
	let second = store.initialize();
	assert_eq!(first.anonymous_id, second.anonymous_id);
	assert_eq!(first.cookies.fbp, second.cookies.fbp);
	assert_eq!(second.attribution.utm_source.as_deref(), Some("ig"));
	assert!(second.is_initialized);
}

#[tokio::test]
async fn navigations_are_captured_in_order() {
	let visitor = Visitor::at(&format!("{LANDING}?utm_source=ig"));
	let store = visitor.store();
	let navigation = bootstrap(&store).await;

	visitor
		.page
		.navigate("https://kurukin.com/demo?utm_medium=reel&fbclid=xyz")
		.unwrap();
	navigation.notify(NavigationEvent::PushState).unwrap();
	navigation.shutdown().await;

	let attribution = store.attribution();
	assert_eq!(attribution.utm_source.as_deref(), Some("ig"));
	assert_eq!(attribution.utm_medium.as_deref(), Some("reel"));
	assert_eq!(attribution.fbclid.as_deref(), Some("xyz"));
	assert_eq!(attribution.landing_page.as_deref(), Some("/demo?utm_medium=reel&fbclid=xyz"));
	assert!(visitor.cookies.get("_fbc").unwrap().ends_with(".xyz"));
}

// ============================================================================
// Merge property
// ============================================================================

const KEYS: [&str; 7] = [
	"utm_source",
	"utm_medium",
	"utm_campaign",
	"utm_term",
	"utm_content",
	"utm_id",
	"fbclid",
];

fn capture_strategy() -> impl Strategy<Value = Vec<Option<String>>> {
	proptest::collection::vec(proptest::option::of("[a-z0-9]{1,8}"), KEYS.len())
}

fn query(values: &[Option<String>]) -> String {
	let pairs: Vec<String> = KEYS
		.iter()
		.zip(values)
		.filter_map(|(key, value)| value.as_ref().map(|v| format!("{key}={v}")))
		.collect();
	format!("?{}", pairs.join("&"))
}

proptest! {
	#[test]
	fn fields_hold_the_latest_present_value(captures in proptest::collection::vec(capture_strategy(), 1..8)) {
		let visitor = Visitor::at(LANDING);
		let store = visitor.store();

		let mut expected: Vec<Option<String>> = vec![None; KEYS.len()];
		for capture in &captures {
			store.capture_attribution_from_url(Some(&query(capture)));
			for (slot, value) in expected.iter_mut().zip(capture) {
				if value.is_some() {
					*slot = value.clone();
				}
			}
		}

		let attribution = store.attribution();
		let actual = [
			attribution.utm_source,
			attribution.utm_medium,
			attribution.utm_campaign,
			attribution.utm_term,
			attribution.utm_content,
			attribution.utm_id,
			attribution.fbclid,
		];
		prop_assert_eq!(actual.to_vec(), expected);

		let any_signal = captures.iter().flatten().any(Option::is_some);
		prop_assert_eq!(attribution.captured_at.is_some(), any_signal);
	}
}
