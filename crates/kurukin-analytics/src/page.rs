// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The current document: location, referrer and user agent.

use parking_lot::RwLock;
use url::Url;

/// A parsed page location, split the way `window.location` splits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
	url: Url,
}

impl PageLocation {
	pub fn parse(href: &str) -> Result<Self, url::ParseError> {
		Ok(Self {
			url: Url::parse(href)?,
		})
	}

	pub fn href(&self) -> &str {
		self.url.as_str()
	}

	/// Scheme with trailing colon, e.g. `https:`.
	pub fn protocol(&self) -> String {
		format!("{}:", self.url.scheme())
	}

	pub fn pathname(&self) -> &str {
		self.url.path()
	}

	/// Query with leading `?`, or empty.
	pub fn search(&self) -> String {
		match self.url.query() {
			Some(q) if !q.is_empty() => format!("?{q}"),
			_ => String::new(),
		}
	}

	/// Fragment with leading `#`, or empty.
	pub fn hash(&self) -> String {
		match self.url.fragment() {
			Some(f) if !f.is_empty() => format!("#{f}"),
			_ => String::new(),
		}
	}

	pub fn is_secure(&self) -> bool {
		self.url.scheme() == "https"
	}

	/// Path, query and fragment: what gets recorded as the landing page.
	pub fn full_path(&self) -> String {
		format!("{}{}{}", self.pathname(), self.search(), self.hash())
	}
}

/// Read access to the page the visitor is on.
pub trait PageContext: Send + Sync {
	/// `None` outside a document.
	fn location(&self) -> Option<PageLocation>;

	fn referrer(&self) -> Option<String>;

	fn user_agent(&self) -> Option<String>;
}

/// A page whose location the host sets explicitly.
#[derive(Debug, Default)]
pub struct StaticPage {
	location: RwLock<Option<PageLocation>>,
	referrer: RwLock<Option<String>>,
	user_agent: Option<String>,
}

impl StaticPage {
	pub fn new(href: &str) -> Result<Self, url::ParseError> {
		Ok(Self {
			location: RwLock::new(Some(PageLocation::parse(href)?)),
			..Self::default()
		})
	}

	pub fn with_referrer(self, referrer: impl Into<String>) -> Self {
		*self.referrer.write() = Some(referrer.into());
		self
	}

	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());
		self
	}

	/// Moves to `href`, as a same-document navigation would.
	pub fn navigate(&self, href: &str) -> Result<(), url::ParseError> {
		*self.location.write() = Some(PageLocation::parse(href)?);
		Ok(())
	}

	pub fn set_referrer(&self, referrer: Option<String>) {
		*self.referrer.write() = referrer;
	}
}

impl PageContext for StaticPage {
	fn location(&self) -> Option<PageLocation> {
		self.location.read().clone()
	}

	fn referrer(&self) -> Option<String> {
		self.referrer.read().clone()
	}

	fn user_agent(&self) -> Option<String> {
		self.user_agent.clone()
	}
}

/// No document: every capture is empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPage;

impl PageContext for NoPage {
	fn location(&self) -> Option<PageLocation> {
		None
	}

	fn referrer(&self) -> Option<String> {
		None
	}

	fn user_agent(&self) -> Option<String> {
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_location_like_a_browser() {
		let loc = PageLocation::parse("https://kurukin.com/precios?utm_source=ig#plan").unwrap();
		assert_eq!(loc.protocol(), "https:");
		assert_eq!(loc.pathname(), "/precios");
		assert_eq!(loc.search(), "?utm_source=ig");
		assert_eq!(loc.hash(), "#plan");
		assert_eq!(loc.full_path(), "/precios?utm_source=ig#plan");
		assert!(loc.is_secure());
	}

	#[test]
	fn empty_query_and_fragment_are_blank() {
		let loc = PageLocation::parse("http://localhost:5173/").unwrap();
		assert_eq!(loc.search(), "");
		assert_eq!(loc.hash(), "");
		assert_eq!(loc.full_path(), "/");
		assert!(!loc.is_secure());
	}

	#[test]
	fn static_page_navigates() {
		let page = StaticPage::new("https://kurukin.com/")
			.unwrap()
			.with_referrer("https://instagram.com/");
		page.navigate("https://kurukin.com/demo?utm_source=fb").unwrap();
		let loc = page.location().unwrap();
		assert_eq!(loc.search(), "?utm_source=fb");
		assert_eq!(page.referrer().as_deref(), Some("https://instagram.com/"));
		assert!(page.navigate("not a url").is_err());
	}

	#[test]
	fn no_page_has_nothing() {
		assert!(NoPage.location().is_none());
		assert!(NoPage.user_agent().is_none());
	}
}
