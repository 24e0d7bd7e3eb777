// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Builds attribution captures from the current page.

use chrono::{DateTime, Utc};
use kurukin_analytics_core::{AttributionData, UrlAttributionParams};

use crate::page::PageContext;

/// Captures attribution from `page`.
///
/// `search` overrides the query string that is parsed; the landing page is
/// always the page's own path, query and fragment. Without a document the
/// capture is empty.
pub fn capture_from_page(
	page: &dyn PageContext,
	search: Option<&str>,
	now: DateTime<Utc>,
) -> AttributionData {
	let Some(location) = page.location() else {
		return AttributionData::default();
	};

	let params = match search {
		Some(search) => UrlAttributionParams::from_query(search),
		None => UrlAttributionParams::from_query(&location.search()),
	};

	AttributionData::captured(params, Some(location.full_path()), page.referrer(), now)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::page::{NoPage, StaticPage};

	#[test]
	fn captures_query_landing_page_and_referrer() {
		let page = StaticPage::new("https://kurukin.com/demo?utm_source=ig&utm_campaign=launch#top")
			.unwrap()
			.with_referrer("https://l.instagram.com/");
		let now = Utc::now();
		let captured = capture_from_page(&page, None, now);

		assert_eq!(captured.utm_source.as_deref(), Some("ig"));
		assert_eq!(captured.utm_campaign.as_deref(), Some("launch"));
		assert_eq!(captured.landing_page.as_deref(), Some("/demo?utm_source=ig&utm_campaign=launch#top"));
		assert_eq!(captured.referrer.as_deref(), Some("https://l.instagram.com/"));
		assert_eq!(captured.captured_at, Some(now));
	}

	#[test]
	fn explicit_search_overrides_page_query() {
		let page = StaticPage::new("https://kurukin.com/?utm_source=ig").unwrap();
		let captured = capture_from_page(&page, Some("utm_source=fb"), Utc::now());
		assert_eq!(captured.utm_source.as_deref(), Some("fb"));
		assert_eq!(captured.landing_page.as_deref(), Some("/?utm_source=ig"));
	}

	#[test]
	fn blank_referrer_is_null() {
		let page = StaticPage::new("https://kurukin.com/").unwrap().with_referrer("  ");
		assert_eq!(capture_from_page(&page, None, Utc::now()).referrer, None);
	}

	#[test]
	fn no_document_captures_nothing() {
		assert_eq!(capture_from_page(&NoPage, Some("utm_source=ig"), Utc::now()), AttributionData::default());
	}
}
