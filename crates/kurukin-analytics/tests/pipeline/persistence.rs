// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persistence across process restarts.
//!
//! Key invariants:
//! - The anonymous id is stable once written
//! - Consent and attribution reload exactly as stored
//! - Corrupt state falls back to defaults without failing

use std::sync::Arc;

use kurukin_analytics::{
	AnalyticsStore, FileStorage, KeyValueStorage, StaticPage, StorageCookieJar, StoreEnvironment,
	ANONYMOUS_ID_STORAGE_KEY, STATE_STORAGE_KEY,
};
use kurukin_analytics_core::{ConsentStatus, ConsentUpdate, MetaCookieName};
use tempfile::tempdir;

use super::support::{Visitor, LANDING};

fn file_store(path: &std::path::Path, href: &str) -> AnalyticsStore {
	let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::open(path).unwrap());
	AnalyticsStore::load(StoreEnvironment::new(
		storage.clone(),
		Arc::new(StorageCookieJar::new(storage)),
		Arc::new(StaticPage::new(href).unwrap()),
	))
}

#[test]
fn state_survives_a_restart() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("state.json");

	let before = {
		let store = file_store(&path, &format!("{LANDING}?utm_source=ig&fbclid=abc123"));
		store.initialize();
		store.set_consent(ConsentUpdate::granted().with_gdpr_applies(true));
		store.snapshot()
	};

	let store = file_store(&path, LANDING);
	assert!(!store.is_initialized());
	assert_eq!(store.anonymous_id(), before.anonymous_id);
	assert_eq!(store.consent(), before.consent);
	assert_eq!(store.attribution(), before.attribution);
	assert_eq!(store.cookies(), before.cookies);
	assert!(store.has_consent_for_tracking());

	let after = store.initialize();
	assert_eq!(after.anonymous_id, before.anonymous_id);
	assert_eq!(after.cookies.fbp, before.cookies.fbp);
	assert_eq!(after.cookies.fbc, before.cookies.fbc);
	assert_eq!(after.attribution.utm_source.as_deref(), Some("ig"));
}

#[test]
fn blob_and_raw_id_agree() {
	let visitor = Visitor::at(LANDING);
	let store = visitor.store();
	store.initialize();

	let raw_id = visitor.storage.get(ANONYMOUS_ID_STORAGE_KEY).unwrap().unwrap();
	let blob: serde_json::Value =
		serde_json::from_str(&visitor.storage.get(STATE_STORAGE_KEY).unwrap().unwrap()).unwrap();
	assert_eq!(raw_id, store.anonymous_id().as_str());
	assert_eq!(blob["anonymousId"], raw_id);
	assert_eq!(blob["consent"]["status"], "unknown");
}

#[test]
fn corrupt_blob_falls_back_to_raw_id() {
	let visitor = Visitor::at(LANDING);
	visitor.storage.set(ANONYMOUS_ID_STORAGE_KEY, "anon_existing").unwrap();
	visitor.storage.set(STATE_STORAGE_KEY, "{not json").unwrap();

	let store = visitor.store();
	assert_eq!(store.anonymous_id().as_str(), "anon_existing");
	assert_eq!(store.consent().status, ConsentStatus::Unknown);
	assert!(!store.has_consent_for_tracking());
}

#[test]
fn null_members_read_back_as_defaults() {
	let visitor = Visitor::at(LANDING);
	visitor
		.storage
		.set(
			STATE_STORAGE_KEY,
			r#"{"consent":null,"attribution":null,"anonymousId":"anon_blob"}"#,
		)
		.unwrap();

	let store = visitor.store();
	assert_eq!(store.anonymous_id().as_str(), "anon_blob");
	assert_eq!(store.consent().status, ConsentStatus::Unknown);
	assert_eq!(store.attribution().utm_source, None);
}

#[test]
fn cleared_cookie_is_regenerated_on_next_sync() {
	let visitor = Visitor::at(LANDING);
	let store = visitor.store();
	let fbp = store.initialize().cookies.fbp.unwrap();

	store.clear_cookie(MetaCookieName::BrowserId);
	assert_eq!(store.get_cookie(MetaCookieName::BrowserId), None);
	assert_eq!(store.cookies().fbp, None);

	let synced = store.sync_meta_cookies();
	let regenerated = synced.fbp.unwrap();
	assert_ne!(regenerated, fbp);
	assert!(regenerated.starts_with("fb.1."));
}

#[test]
fn manual_cookie_is_mirrored_in_state() {
	let visitor = Visitor::at(LANDING);
	let store = visitor.store();
	store.set_cookie(MetaCookieName::ClickId, "fb.1.1700000000000.manual", Some(7));
	assert_eq!(store.cookies().fbc.as_deref(), Some("fb.1.1700000000000.manual"));
	assert!(visitor.cookies.written().iter().any(|h| h.starts_with("_fbc=")));
}
