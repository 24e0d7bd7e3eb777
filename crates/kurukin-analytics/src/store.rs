// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity, consent, attribution and cookie state for one visitor.
//!
//! The store is the single owner of this state in-process. Every mutation
//! runs under one lock: read the current state, compute the next one, publish
//! it, then write it through to storage. Storage is best-effort; when a write
//! fails the in-memory state stays authoritative and the failure is logged at
//! debug level.
//!
//! Persisted layout:
//!
//! | Key | Contents |
//! |-----|----------|
//! | `kurukin.analytics.state.v1` | JSON `{consent, attribution, anonymousId}` |
//! | `kurukin.analytics.anonymous_id.v1` | the raw anonymous id |
//! | cookies `_fbp`, `_fbc` | ad-matching ids, `Path=/`, `SameSite=Lax` |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kurukin_analytics_core::{
	generate_fbc, generate_fbp, AnonymousId, AttributionData, ConsentState, ConsentUpdate,
	MetaCookieName, MetaCookieValues, DEFAULT_COOKIE_LIFETIME_DAYS,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::capture::capture_from_page;
use crate::cookie_jar::{CookieJar, NoCookieJar, SetCookie};
use crate::page::{NoPage, PageContext};
use crate::storage::{KeyValueStorage, NoStorage};

/// Storage key of the persisted state blob.
pub const STATE_STORAGE_KEY: &str = "kurukin.analytics.state.v1";

/// Storage key of the raw anonymous id.
pub const ANONYMOUS_ID_STORAGE_KEY: &str = "kurukin.analytics.anonymous_id.v1";

/// The host capabilities the store reads and writes through.
#[derive(Clone)]
pub struct StoreEnvironment {
	pub storage: Arc<dyn KeyValueStorage>,
	pub cookies: Arc<dyn CookieJar>,
	pub page: Arc<dyn PageContext>,
	pub cookie_lifetime_days: u32,
}

impl StoreEnvironment {
	pub fn new(
		storage: Arc<dyn KeyValueStorage>,
		cookies: Arc<dyn CookieJar>,
		page: Arc<dyn PageContext>,
	) -> Self {
		Self {
			storage,
			cookies,
			page,
			cookie_lifetime_days: DEFAULT_COOKIE_LIFETIME_DAYS,
		}
	}

	/// No storage, no cookies, no page.
	pub fn detached() -> Self {
		Self::new(Arc::new(NoStorage), Arc::new(NoCookieJar), Arc::new(NoPage))
	}

	pub fn with_cookie_lifetime_days(mut self, days: u32) -> Self {
		self.cookie_lifetime_days = days;
		self
	}
}

impl std::fmt::Debug for StoreEnvironment {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StoreEnvironment")
			.field("cookie_lifetime_days", &self.cookie_lifetime_days)
			.finish_non_exhaustive()
	}
}

/// The JSON blob stored under [`STATE_STORAGE_KEY`].
///
/// Missing or null `consent`/`attribution` members read back as defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
	#[serde(default, deserialize_with = "null_as_default")]
	pub consent: ConsentState,
	#[serde(default, deserialize_with = "null_as_default")]
	pub attribution: AttributionData,
	pub anonymous_id: AnonymousId,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: serde::Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl PersistedState {
	/// Parses a stored blob. Malformed JSON or a blank anonymous id yield `None`.
	pub fn parse(raw: &str) -> Option<Self> {
		let state: PersistedState = serde_json::from_str(raw).ok()?;
		(!state.anonymous_id.is_blank()).then_some(state)
	}
}

/// A point-in-time copy of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
	pub is_initialized: bool,
	pub consent: ConsentState,
	pub attribution: AttributionData,
	pub anonymous_id: AnonymousId,
	pub cookies: MetaCookieValues,
}

struct StoreInner {
	env: StoreEnvironment,
	state: Mutex<StoreSnapshot>,
}

/// Shared handle to the visitor store. Clones share state.
#[derive(Clone)]
pub struct AnalyticsStore {
	inner: Arc<StoreInner>,
}

impl AnalyticsStore {
	/// Reads persisted state once and builds the store from it.
	///
	/// The anonymous id comes from the persisted blob, then from the raw id
	/// key, and is generated (and written) when neither has one.
	pub fn load(env: StoreEnvironment) -> Self {
		let persisted = env
			.storage
			.get(STATE_STORAGE_KEY)
			.unwrap_or_else(|e| {
				debug!(key = STATE_STORAGE_KEY, error = %e, "Failed to read analytics state");
				None
			})
			.and_then(|raw| PersistedState::parse(&raw));

		let (consent, attribution, anonymous_id) = match persisted {
			Some(p) => (p.consent, p.attribution, p.anonymous_id),
			None => (
				ConsentState::default(),
				AttributionData::default(),
				get_or_create_anonymous_id(env.storage.as_ref(), None),
			),
		};

		let cookies = read_meta_cookies(env.cookies.as_ref());

		Self {
			inner: Arc::new(StoreInner {
				state: Mutex::new(StoreSnapshot {
					is_initialized: false,
					consent,
					attribution,
					anonymous_id,
					cookies,
				}),
				env,
			}),
		}
	}

	/// A store with no persistence and no page.
	pub fn detached() -> Self {
		Self::load(StoreEnvironment::detached())
	}

	/// Ensures the anonymous id and `_fbp` exist, captures the current page,
	/// refreshes `_fbc` when the page carries an `fbclid`, and persists.
	///
	/// Safe to call more than once; it only ever adds data.
	pub fn initialize(&self) -> StoreSnapshot {
		let now = Utc::now();
		let inner = &self.inner;
		let mut state = inner.state.lock();

		let anonymous_id =
			get_or_create_anonymous_id(inner.env.storage.as_ref(), Some(&state.anonymous_id));

		let mut cookies = read_meta_cookies(inner.env.cookies.as_ref());
		if cookies.fbp.is_none() {
			let fbp = generate_fbp(now);
			inner.write_cookie(MetaCookieName::BrowserId, &fbp, inner.env.cookie_lifetime_days, now);
			cookies.fbp = Some(fbp);
		}

		let captured = capture_from_page(inner.env.page.as_ref(), None, now);
		if let Some(fbclid) = captured.fbclid.as_deref() {
			let fbc = generate_fbc(now, fbclid);
			inner.write_cookie(MetaCookieName::ClickId, &fbc, inner.env.cookie_lifetime_days, now);
			cookies.fbc = Some(fbc);
		}

		state.attribution = state.attribution.merge(&captured, now);
		state.anonymous_id = anonymous_id;
		state.cookies = cookies;
		state.is_initialized = true;
		inner.persist(&state);

		info!(anonymous_id = %state.anonymous_id, "Analytics store initialized");
		state.clone()
	}

	/// Applies a partial consent update, stamps `updated_at`, and persists.
	pub fn set_consent(&self, update: ConsentUpdate) -> ConsentState {
		let mut state = self.inner.state.lock();
		state.consent = state.consent.apply(&update, Utc::now());
		self.inner.persist(&state);
		debug!(
			status = %state.consent.status,
			ccpa_opt_out = state.consent.ccpa_opt_out,
			"Consent updated"
		);
		state.consent.clone()
	}

	pub fn has_consent_for_tracking(&self) -> bool {
		self.inner.state.lock().consent.allows_tracking()
	}

	/// Captures attribution from `search` (or the page's own query), merges it
	/// first-touch style, refreshes `_fbc` when an `fbclid` is present, persists,
	/// and returns the merged attribution.
	pub fn capture_attribution_from_url(&self, search: Option<&str>) -> AttributionData {
		let now = Utc::now();
		let inner = &self.inner;
		let incoming = capture_from_page(inner.env.page.as_ref(), search, now);

		let mut state = inner.state.lock();
		state.attribution = state.attribution.merge(&incoming, now);

		if let Some(fbclid) = incoming.fbclid.as_deref() {
			let fbc = generate_fbc(now, fbclid);
			inner.write_cookie(MetaCookieName::ClickId, &fbc, inner.env.cookie_lifetime_days, now);
			state.cookies.fbc = Some(fbc);
		}

		inner.persist(&state);
		state.attribution.clone()
	}

	/// Re-reads both cookies, generating `_fbp` when it is missing.
	pub fn sync_meta_cookies(&self) -> MetaCookieValues {
		let now = Utc::now();
		let inner = &self.inner;
		let mut state = inner.state.lock();

		let mut cookies = read_meta_cookies(inner.env.cookies.as_ref());
		if cookies.fbp.is_none() {
			let fbp = generate_fbp(now);
			inner.write_cookie(MetaCookieName::BrowserId, &fbp, inner.env.cookie_lifetime_days, now);
			cookies.fbp = Some(fbp);
		}

		state.cookies = cookies.clone();
		cookies
	}

	/// Reads a cookie straight from the jar.
	pub fn get_cookie(&self, name: MetaCookieName) -> Option<String> {
		read_cookie(self.inner.env.cookies.as_ref(), name)
	}

	/// Writes a cookie living `days` (default 90) and mirrors the jar's view of
	/// it in memory. Blank values are ignored.
	pub fn set_cookie(&self, name: MetaCookieName, value: &str, days: Option<u32>) {
		let inner = &self.inner;
		let mut state = inner.state.lock();
		let days = days.unwrap_or(DEFAULT_COOKIE_LIFETIME_DAYS);
		inner.write_cookie(name, value, days, Utc::now());
		state.cookies.set(name, read_cookie(inner.env.cookies.as_ref(), name));
	}

	/// Deletes a cookie by writing it already expired.
	pub fn clear_cookie(&self, name: MetaCookieName) {
		let inner = &self.inner;
		let mut state = inner.state.lock();
		let cookie = SetCookie::expired(name.as_str(), inner.is_secure());
		if let Err(e) = inner.env.cookies.set(cookie) {
			debug!(cookie = %name, error = %e, "Failed to clear cookie");
		}
		state.cookies.set(name, None);
	}

	pub fn consent(&self) -> ConsentState {
		self.inner.state.lock().consent.clone()
	}

	pub fn attribution(&self) -> AttributionData {
		self.inner.state.lock().attribution.clone()
	}

	pub fn anonymous_id(&self) -> AnonymousId {
		self.inner.state.lock().anonymous_id.clone()
	}

	pub fn cookies(&self) -> MetaCookieValues {
		self.inner.state.lock().cookies.clone()
	}

	pub fn is_initialized(&self) -> bool {
		self.inner.state.lock().is_initialized
	}

	pub fn snapshot(&self) -> StoreSnapshot {
		self.inner.state.lock().clone()
	}

	/// The page this store captures from.
	pub fn page(&self) -> Arc<dyn PageContext> {
		Arc::clone(&self.inner.env.page)
	}
}

impl std::fmt::Debug for AnalyticsStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AnalyticsStore")
			.field("state", &*self.inner.state.lock())
			.finish()
	}
}

impl StoreInner {
	fn is_secure(&self) -> bool {
		self.env
			.page
			.location()
			.map(|l| l.is_secure())
			.unwrap_or(false)
	}

	fn write_cookie(&self, name: MetaCookieName, value: &str, days: u32, now: DateTime<Utc>) {
		let value = value.trim();
		if value.is_empty() {
			return;
		}
		let cookie = SetCookie::new(name.as_str(), value, now, days, self.is_secure());
		if let Err(e) = self.env.cookies.set(cookie) {
			debug!(cookie = %name, error = %e, "Failed to write cookie");
		}
	}

	fn persist(&self, state: &StoreSnapshot) {
		let persisted = PersistedState {
			consent: state.consent.clone(),
			attribution: state.attribution.clone(),
			anonymous_id: state.anonymous_id.clone(),
		};
		let body = match serde_json::to_string(&persisted) {
			Ok(body) => body,
			Err(e) => {
				debug!(error = %e, "Failed to serialize analytics state");
				return;
			}
		};

		let storage = self.env.storage.as_ref();
		if let Err(e) = storage.set(STATE_STORAGE_KEY, &body) {
			debug!(key = STATE_STORAGE_KEY, error = %e, "Failed to persist analytics state");
		}
		if let Err(e) = storage.set(ANONYMOUS_ID_STORAGE_KEY, state.anonymous_id.as_str()) {
			debug!(key = ANONYMOUS_ID_STORAGE_KEY, error = %e, "Failed to persist anonymous id");
		}
	}
}

/// Reads the raw anonymous id key; falls back to `current`, then to a fresh
/// id. Whatever is chosen is written back when the key was empty.
fn get_or_create_anonymous_id(
	storage: &dyn KeyValueStorage,
	current: Option<&AnonymousId>,
) -> AnonymousId {
	let stored = storage
		.get(ANONYMOUS_ID_STORAGE_KEY)
		.unwrap_or_else(|e| {
			debug!(key = ANONYMOUS_ID_STORAGE_KEY, error = %e, "Failed to read anonymous id");
			None
		})
		.and_then(|raw| AnonymousId::parse(&raw));

	if let Some(id) = stored {
		return id;
	}

	let id = current.cloned().unwrap_or_else(AnonymousId::generate);
	if let Err(e) = storage.set(ANONYMOUS_ID_STORAGE_KEY, id.as_str()) {
		debug!(key = ANONYMOUS_ID_STORAGE_KEY, error = %e, "Failed to persist anonymous id");
	}
	id
}

fn read_cookie(jar: &dyn CookieJar, name: MetaCookieName) -> Option<String> {
	kurukin_analytics_core::normalize_nullable(jar.get(name.as_str()).as_deref())
}

fn read_meta_cookies(jar: &dyn CookieJar) -> MetaCookieValues {
	MetaCookieValues {
		fbp: read_cookie(jar, MetaCookieName::BrowserId),
		fbc: read_cookie(jar, MetaCookieName::ClickId),
	}
}
