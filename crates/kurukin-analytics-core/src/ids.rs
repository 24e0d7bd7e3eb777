// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identifier types: the persisted anonymous visitor id and per-event ids.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for an anonymous visitor.
///
/// Generated ids are UUIDs, but any non-blank string read back from storage
/// is accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnonymousId(String);

impl AnonymousId {
	/// Generates a fresh random id.
	pub fn generate() -> Self {
		Self(Uuid::new_v4().to_string())
	}

	/// Wraps a stored value, rejecting blank strings.
	pub fn parse(raw: &str) -> Option<Self> {
		let trimmed = raw.trim();
		if trimmed.is_empty() {
			None
		} else {
			Some(Self(trimmed.to_string()))
		}
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns true if the wrapped value is blank.
	pub fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl std::fmt::Display for AnonymousId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Identifier shared by the browser and server copies of one event, so the
/// receiving ad platform can deduplicate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl EventId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for EventId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for EventId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for EventId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use std::collections::HashSet;

	#[test]
	fn ten_thousand_event_ids_are_distinct() {
		let ids: HashSet<EventId> = (0..10_000).map(|_| EventId::new()).collect();
		assert_eq!(ids.len(), 10_000);
	}

	#[test]
	fn anonymous_id_rejects_blank() {
		assert!(AnonymousId::parse("").is_none());
		assert!(AnonymousId::parse("   ").is_none());
		assert_eq!(AnonymousId::parse(" abc ").unwrap().as_str(), "abc");
	}

	#[test]
	fn anonymous_id_serializes_as_plain_string() {
		let id = AnonymousId::parse("anon_1").unwrap();
		assert_eq!(serde_json::to_string(&id).unwrap(), "\"anon_1\"");
	}

	#[test]
	fn generated_anonymous_ids_differ() {
		assert_ne!(AnonymousId::generate(), AnonymousId::generate());
	}

	proptest! {
		#[test]
		fn event_id_roundtrip(uuid_str in "[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}") {
			let id: EventId = uuid_str.parse().unwrap();
			let parsed: EventId = id.to_string().parse().unwrap();
			prop_assert_eq!(id, parsed);
		}
	}
}
