// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! First-party cookie access.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage::KeyValueStorage;

const COOKIE_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// One cookie write: `Path=/` and `SameSite=Lax` always, `Secure` on https pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCookie {
	pub name: String,
	pub value: String,
	pub expires: DateTime<Utc>,
	pub secure: bool,
}

impl SetCookie {
	/// A cookie living `days` from `now`.
	pub fn new(name: &str, value: &str, now: DateTime<Utc>, days: u32, secure: bool) -> Self {
		Self {
			name: name.to_string(),
			value: value.to_string(),
			expires: now + Duration::days(i64::from(days)),
			secure,
		}
	}

	/// An empty cookie expiring at the Unix epoch, which deletes it.
	pub fn expired(name: &str, secure: bool) -> Self {
		Self {
			name: name.to_string(),
			value: String::new(),
			expires: DateTime::<Utc>::UNIX_EPOCH,
			secure,
		}
	}

	pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
		self.expires <= now
	}

	/// The cookie string a browser would receive, value percent-encoded.
	pub fn header(&self) -> String {
		let secure = if self.secure { "; Secure" } else { "" };
		format!(
			"{}={}; Expires={}; Path=/; SameSite=Lax{}",
			self.name,
			urlencoding::encode(&self.value),
			self.expires.format(COOKIE_DATE_FORMAT),
			secure
		)
	}
}

/// Splits a `document.cookie` style string (`a=1; b=2`) into decoded pairs.
///
/// Segments without `=` are skipped. Values that fail to percent-decode are
/// kept raw.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
	header
		.split(';')
		.filter_map(|segment| {
			let (name, raw) = segment.trim().split_once('=')?;
			let value = urlencoding::decode(raw)
				.map(|v| v.into_owned())
				.unwrap_or_else(|_| raw.to_string());
			Some((name.trim().to_string(), value))
		})
		.collect()
}

/// Cookie storage visible to the page.
pub trait CookieJar: Send + Sync {
	/// Current decoded value, `None` when absent or expired.
	fn get(&self, name: &str) -> Option<String>;

	fn set(&self, cookie: SetCookie) -> Result<(), StorageError>;
}

/// In-process cookie jar that also records every cookie string written.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
	cookies: Mutex<BTreeMap<String, SetCookie>>,
	written: Mutex<Vec<String>>,
}

impl MemoryCookieJar {
	pub fn new() -> Self {
		Self::default()
	}

	/// Seeds the jar from a `document.cookie` style string. Seeded cookies
	/// never expire.
	pub fn from_cookie_header(header: &str) -> Self {
		let jar = Self::new();
		{
			let mut cookies = jar.cookies.lock();
			for (name, value) in parse_cookie_header(header) {
				cookies.insert(
					name.clone(),
					SetCookie {
						name,
						value,
						expires: DateTime::<Utc>::MAX_UTC,
						secure: false,
					},
				);
			}
		}
		jar
	}

	/// Cookie strings written so far, oldest first.
	pub fn written(&self) -> Vec<String> {
		self.written.lock().clone()
	}
}

impl CookieJar for MemoryCookieJar {
	fn get(&self, name: &str) -> Option<String> {
		let cookies = self.cookies.lock();
		let cookie = cookies.get(name)?;
		(!cookie.is_expired_at(Utc::now())).then(|| cookie.value.clone())
	}

	fn set(&self, cookie: SetCookie) -> Result<(), StorageError> {
		self.written.lock().push(cookie.header());
		let mut cookies = self.cookies.lock();
		if cookie.is_expired_at(Utc::now()) {
			cookies.remove(&cookie.name);
		} else {
			cookies.insert(cookie.name.clone(), cookie);
		}
		Ok(())
	}
}

/// Cookie jar persisted through a [`KeyValueStorage`], for hosts without a
/// browser cookie store. Expiry is checked on read.
pub struct StorageCookieJar {
	storage: Arc<dyn KeyValueStorage>,
}

impl StorageCookieJar {
	pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
		Self { storage }
	}

	fn key(name: &str) -> String {
		format!("kurukin.cookie.{name}")
	}
}

impl CookieJar for StorageCookieJar {
	fn get(&self, name: &str) -> Option<String> {
		let raw = self.storage.get(&Self::key(name)).ok()??;
		let cookie: SetCookie = serde_json::from_str(&raw).ok()?;
		(!cookie.is_expired_at(Utc::now())).then_some(cookie.value)
	}

	fn set(&self, cookie: SetCookie) -> Result<(), StorageError> {
		let key = Self::key(&cookie.name);
		if cookie.is_expired_at(Utc::now()) {
			return self.storage.remove(&key);
		}
		self.storage.set(&key, &serde_json::to_string(&cookie)?)
	}
}

/// Cookie jar for contexts without cookies.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCookieJar;

impl CookieJar for NoCookieJar {
	fn get(&self, _name: &str) -> Option<String> {
		None
	}

	fn set(&self, _cookie: SetCookie) -> Result<(), StorageError> {
		Err(StorageError::Unavailable)
	}
}
