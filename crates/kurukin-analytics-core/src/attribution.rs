// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Marketing attribution parsed from landing URLs.
//!
//! Attribution is first-touch sticky: a capture never erases a value that an
//! earlier capture set. Incoming non-null values overwrite, incoming nulls fall
//! back to what is already stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query keys recognised as attribution signals. Matching is case-sensitive.
pub const ATTRIBUTION_QUERY_KEYS: [&str; 7] = [
	"utm_source",
	"utm_medium",
	"utm_campaign",
	"utm_term",
	"utm_content",
	"utm_id",
	"fbclid",
];

/// Trims a value and maps blank strings to `None`.
pub fn normalize_nullable(value: Option<&str>) -> Option<String> {
	let trimmed = value?.trim();
	if trimmed.is_empty() {
		None
	} else {
		Some(trimmed.to_string())
	}
}

/// Attribution parameters carried by a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlAttributionParams {
	pub utm_source: Option<String>,
	pub utm_medium: Option<String>,
	pub utm_campaign: Option<String>,
	pub utm_term: Option<String>,
	pub utm_content: Option<String>,
	pub utm_id: Option<String>,
	pub fbclid: Option<String>,
}

impl UrlAttributionParams {
	/// Parses a query string, with or without the leading `?`.
	///
	/// The first occurrence of a repeated key wins.
	pub fn from_query(search: &str) -> Self {
		let query = search.strip_prefix('?').unwrap_or(search);
		let mut params = Self::default();

		for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
			let slot = match &*key {
				"utm_source" => &mut params.utm_source,
				"utm_medium" => &mut params.utm_medium,
				"utm_campaign" => &mut params.utm_campaign,
				"utm_term" => &mut params.utm_term,
				"utm_content" => &mut params.utm_content,
				"utm_id" => &mut params.utm_id,
				"fbclid" => &mut params.fbclid,
				_ => continue,
			};
			// A blank first occurrence still counts as the value for that key.
			if slot.is_none() {
				*slot = Some(value.into_owned());
			}
		}

		params.normalized()
	}

	fn normalized(self) -> Self {
		Self {
			utm_source: normalize_nullable(self.utm_source.as_deref()),
			utm_medium: normalize_nullable(self.utm_medium.as_deref()),
			utm_campaign: normalize_nullable(self.utm_campaign.as_deref()),
			utm_term: normalize_nullable(self.utm_term.as_deref()),
			utm_content: normalize_nullable(self.utm_content.as_deref()),
			utm_id: normalize_nullable(self.utm_id.as_deref()),
			fbclid: normalize_nullable(self.fbclid.as_deref()),
		}
	}

	/// Returns true if any marketing parameter is present.
	pub fn has_signal(&self) -> bool {
		[
			&self.utm_source,
			&self.utm_medium,
			&self.utm_campaign,
			&self.utm_term,
			&self.utm_content,
			&self.utm_id,
			&self.fbclid,
		]
		.iter()
		.any(|v| v.is_some())
	}
}

/// Attribution stored for the visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionData {
	pub utm_source: Option<String>,
	pub utm_medium: Option<String>,
	pub utm_campaign: Option<String>,
	pub utm_term: Option<String>,
	pub utm_content: Option<String>,
	pub utm_id: Option<String>,
	pub fbclid: Option<String>,
	pub landing_page: Option<String>,
	pub referrer: Option<String>,
	pub captured_at: Option<DateTime<Utc>>,
}

impl AttributionData {
	/// Builds a fresh capture from parsed URL parameters and page context.
	pub fn captured(
		params: UrlAttributionParams,
		landing_page: Option<String>,
		referrer: Option<String>,
		captured_at: DateTime<Utc>,
	) -> Self {
		Self {
			utm_source: params.utm_source,
			utm_medium: params.utm_medium,
			utm_campaign: params.utm_campaign,
			utm_term: params.utm_term,
			utm_content: params.utm_content,
			utm_id: params.utm_id,
			fbclid: params.fbclid,
			landing_page: normalize_nullable(landing_page.as_deref()),
			referrer: normalize_nullable(referrer.as_deref()),
			captured_at: Some(captured_at),
		}
	}

	/// The marketing parameters of this record.
	pub fn url_params(&self) -> UrlAttributionParams {
		UrlAttributionParams {
			utm_source: self.utm_source.clone(),
			utm_medium: self.utm_medium.clone(),
			utm_campaign: self.utm_campaign.clone(),
			utm_term: self.utm_term.clone(),
			utm_content: self.utm_content.clone(),
			utm_id: self.utm_id.clone(),
			fbclid: self.fbclid.clone(),
		}
	}

	/// Merges `incoming` over `self`.
	///
	/// `captured_at` moves to `now` only when `incoming` carries a marketing
	/// parameter; a plain navigation keeps the timestamp of the last real signal.
	pub fn merge(&self, incoming: &AttributionData, now: DateTime<Utc>) -> AttributionData {
		fn pick(incoming: &Option<String>, current: &Option<String>) -> Option<String> {
			incoming.clone().or_else(|| current.clone())
		}

		AttributionData {
			utm_source: pick(&incoming.utm_source, &self.utm_source),
			utm_medium: pick(&incoming.utm_medium, &self.utm_medium),
			utm_campaign: pick(&incoming.utm_campaign, &self.utm_campaign),
			utm_term: pick(&incoming.utm_term, &self.utm_term),
			utm_content: pick(&incoming.utm_content, &self.utm_content),
			utm_id: pick(&incoming.utm_id, &self.utm_id),
			fbclid: pick(&incoming.fbclid, &self.fbclid),
			landing_page: pick(&incoming.landing_page, &self.landing_page),
			referrer: pick(&incoming.referrer, &self.referrer),
			captured_at: if incoming.url_params().has_signal() {
				Some(now)
			} else {
				self.captured_at
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;

	fn capture(search: &str, now: DateTime<Utc>) -> AttributionData {
		AttributionData::captured(
			UrlAttributionParams::from_query(search),
			Some(format!("/{search}")),
			None,
			now,
		)
	}

	#[test]
	fn parses_recognised_keys_with_or_without_question_mark() {
		let with = UrlAttributionParams::from_query("?utm_source=ig&utm_campaign=launch&fbclid=abc123");
		let without = UrlAttributionParams::from_query("utm_source=ig&utm_campaign=launch&fbclid=abc123");
		assert_eq!(with, without);
		assert_eq!(with.utm_source.as_deref(), Some("ig"));
		assert_eq!(with.utm_campaign.as_deref(), Some("launch"));
		assert_eq!(with.fbclid.as_deref(), Some("abc123"));
		assert!(with.utm_medium.is_none());
	}

	#[test]
	fn keys_are_case_sensitive() {
		let params = UrlAttributionParams::from_query("?UTM_SOURCE=ads&Fbclid=x");
		assert!(!params.has_signal());
	}

	#[test]
	fn blank_values_normalize_to_none() {
		let params = UrlAttributionParams::from_query("?utm_source=%20%20&utm_medium=&utm_term=+cpc+");
		assert!(params.utm_source.is_none());
		assert!(params.utm_medium.is_none());
		assert_eq!(params.utm_term.as_deref(), Some("cpc"));
	}

	#[test]
	fn first_occurrence_of_repeated_key_wins() {
		let params = UrlAttributionParams::from_query("?utm_source=first&utm_source=second");
		assert_eq!(params.utm_source.as_deref(), Some("first"));
	}

	#[test]
	fn percent_encoded_values_are_decoded() {
		let params = UrlAttributionParams::from_query("?utm_campaign=black%20friday");
		assert_eq!(params.utm_campaign.as_deref(), Some("black friday"));
	}

	#[test]
	fn merge_preserves_first_touch() {
		let t0 = Utc::now();
		let first = AttributionData::default().merge(&capture("?utm_source=ads", t0), t0);
		let t1 = t0 + Duration::seconds(30);
		let second = first.merge(&capture("", t1), t1);

		assert_eq!(second.utm_source.as_deref(), Some("ads"));
	}

	#[test]
	fn incoming_values_overwrite() {
		let t0 = Utc::now();
		let first = AttributionData::default().merge(&capture("?utm_source=ig", t0), t0);
		let second = first.merge(&capture("?utm_source=fb", t0), t0);
		assert_eq!(second.utm_source.as_deref(), Some("fb"));
	}

	#[test]
	fn captured_at_only_advances_on_signal() {
		let t0 = Utc::now();
		let first = AttributionData::default().merge(&capture("?utm_source=ads", t0), t0);
		assert_eq!(first.captured_at, Some(t0));

		let t1 = t0 + Duration::minutes(1);
		let quiet = first.merge(&capture("", t1), t1);
		assert_eq!(quiet.captured_at, Some(t0));

		let t2 = t0 + Duration::minutes(2);
		let signalled = quiet.merge(&capture("?utm_id=xyz", t2), t2);
		assert_eq!(signalled.captured_at, Some(t2));
		assert_eq!(signalled.utm_id.as_deref(), Some("xyz"));
	}

	#[test]
	fn landing_page_and_referrer_follow_latest_non_null_capture() {
		let t0 = Utc::now();
		let first = AttributionData::captured(
			UrlAttributionParams::default(),
			Some("/pricing".to_string()),
			Some("https://google.com/".to_string()),
			t0,
		);
		let merged = AttributionData::default().merge(&first, t0);
		let second = AttributionData::captured(UrlAttributionParams::default(), Some("/chat".to_string()), None, t0);
		let merged = merged.merge(&second, t0);

		assert_eq!(merged.landing_page.as_deref(), Some("/chat"));
		assert_eq!(merged.referrer.as_deref(), Some("https://google.com/"));
	}

	#[test]
	fn serializes_nulls_explicitly() {
		let json = serde_json::to_value(AttributionData::default()).unwrap();
		assert!(json["utm_source"].is_null());
		assert!(json["captured_at"].is_null());
		assert_eq!(json.as_object().unwrap().len(), 10);
	}
}
