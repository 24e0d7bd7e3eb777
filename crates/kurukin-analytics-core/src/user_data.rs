// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User matching fields sent with the server copy of an event.
//!
//! Personal fields (`em`, `ph`, names, location) must be SHA-256 hashed before
//! they leave the process. [`HashedUserData`] normalises and hashes raw input;
//! identifiers such as `fbp`, `fbc` and the user agent are sent as-is.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Lower-case hex SHA-256 of `value`.
pub fn sha256_hex(value: &str) -> String {
	hex::encode(Sha256::digest(value.as_bytes()))
}

/// Trims and lower-cases, returning `None` for blank input.
pub fn normalize_text(value: &str) -> Option<String> {
	let normalized = value.trim().to_lowercase();
	(!normalized.is_empty()).then_some(normalized)
}

/// Keeps digits only, returning `None` when nothing is left.
pub fn normalize_phone(value: &str) -> Option<String> {
	let digits: String = value.chars().filter(char::is_ascii_digit).collect();
	(!digits.is_empty()).then_some(digits)
}

/// Lower-cases and strips whitespace, so `"SW1A 1AA"` and `"sw1a1aa"` hash the same.
fn normalize_compact(value: &str) -> Option<String> {
	let compact: String = value
		.chars()
		.filter(|c| !c.is_whitespace())
		.collect::<String>()
		.to_lowercase();
	(!compact.is_empty()).then_some(compact)
}

/// The `user_data` object of the server payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub external_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fbp: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fbc: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_user_agent: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_ip_address: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub em: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ph: Option<String>,
	#[serde(rename = "fn", default, skip_serializing_if = "Option::is_none")]
	pub first_name: Option<String>,
	#[serde(rename = "ln", default, skip_serializing_if = "Option::is_none")]
	pub last_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ct: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub st: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub zp: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub country: Option<String>,
}

impl UserData {
	/// Overlays `extra` on top of `self`. Present fields in `extra` win.
	pub fn merge(self, extra: UserData) -> UserData {
		UserData {
			external_id: extra.external_id.or(self.external_id),
			fbp: extra.fbp.or(self.fbp),
			fbc: extra.fbc.or(self.fbc),
			client_user_agent: extra.client_user_agent.or(self.client_user_agent),
			client_ip_address: extra.client_ip_address.or(self.client_ip_address),
			em: extra.em.or(self.em),
			ph: extra.ph.or(self.ph),
			first_name: extra.first_name.or(self.first_name),
			last_name: extra.last_name.or(self.last_name),
			ct: extra.ct.or(self.ct),
			st: extra.st.or(self.st),
			zp: extra.zp.or(self.zp),
			country: extra.country.or(self.country),
		}
	}
}

/// Builder that normalises and hashes personal fields.
///
/// ```
/// use kurukin_analytics_core::HashedUserData;
///
/// let data = HashedUserData::new()
///     .email(" Ana@Example.com ")
///     .phone("+52 (55) 1234-5678")
///     .build();
/// assert_eq!(data.em.as_deref().map(str::len), Some(64));
/// ```
#[derive(Debug, Clone, Default)]
pub struct HashedUserData {
	data: UserData,
}

impl HashedUserData {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn email(mut self, email: &str) -> Self {
		self.data.em = normalize_text(email).map(|v| sha256_hex(&v));
		self
	}

	pub fn phone(mut self, phone: &str) -> Self {
		self.data.ph = normalize_phone(phone).map(|v| sha256_hex(&v));
		self
	}

	pub fn first_name(mut self, name: &str) -> Self {
		self.data.first_name = normalize_text(name).map(|v| sha256_hex(&v));
		self
	}

	pub fn last_name(mut self, name: &str) -> Self {
		self.data.last_name = normalize_text(name).map(|v| sha256_hex(&v));
		self
	}

	pub fn city(mut self, city: &str) -> Self {
		self.data.ct = normalize_compact(city).map(|v| sha256_hex(&v));
		self
	}

	pub fn state(mut self, state: &str) -> Self {
		self.data.st = normalize_compact(state).map(|v| sha256_hex(&v));
		self
	}

	pub fn zip(mut self, zip: &str) -> Self {
		self.data.zp = normalize_compact(zip).map(|v| sha256_hex(&v));
		self
	}

	pub fn country(mut self, country: &str) -> Self {
		self.data.country = normalize_compact(country).map(|v| sha256_hex(&v));
		self
	}

	/// Sets a caller-side user id. Not hashed.
	pub fn external_id(mut self, id: &str) -> Self {
		self.data.external_id = normalize_text(id).map(|_| id.trim().to_string());
		self
	}

	pub fn client_ip_address(mut self, ip: &str) -> Self {
		let ip = ip.trim();
		self.data.client_ip_address = (!ip.is_empty()).then(|| ip.to_string());
		self
	}

	pub fn build(self) -> UserData {
		self.data
	}
}
