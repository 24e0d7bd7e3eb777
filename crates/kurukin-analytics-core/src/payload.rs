// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire payloads for the server relay webhook.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attribution::AttributionData;
use crate::consent::ConsentState;
use crate::cookies::MetaCookieValues;
use crate::event::{BrowserMethod, MetaEvent};
use crate::ids::{AnonymousId, EventId};
use crate::user_data::UserData;

/// Provider tag written into every payload.
pub const PROVIDER: &str = "meta";

/// Where the conversion happened, as understood by the ad platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSource {
	#[default]
	Website,
	App,
	Chat,
	Email,
	PhoneCall,
	PhysicalStore,
	SystemGenerated,
	Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
	Browser,
	Server,
}

/// One event stamped with its id, time and page, ready to go out on both channels.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEvent {
	pub event_id: EventId,
	pub event_name: String,
	pub method: BrowserMethod,
	pub params: Value,
	/// Whole seconds since the Unix epoch.
	pub event_time: i64,
	pub source_url: Option<String>,
}

impl TrackedEvent {
	/// Stamps `event` with a fresh id and the given time.
	pub fn new(event: &MetaEvent, now: DateTime<Utc>, source_url: Option<String>) -> Self {
		Self {
			event_id: EventId::new(),
			event_name: event.name().to_string(),
			method: event.method(),
			params: event.params_json(),
			event_time: now.timestamp(),
			source_url,
		}
	}

	/// Page URL for the wire, empty when there was no page.
	fn source_url_or_empty(&self) -> String {
		self.source_url.clone().unwrap_or_default()
	}

	pub fn browser_payload(&self) -> BrowserPayload {
		BrowserPayload {
			provider: PROVIDER.to_string(),
			channel: Channel::Browser,
			method: self.method,
			event_name: self.event_name.clone(),
			event_id: self.event_id,
			event_time: self.event_time,
			event_source_url: self.source_url_or_empty(),
			action_source: ActionSource::Website,
			params: self.params.clone(),
		}
	}

	pub fn server_payload(&self, user_data: UserData, test_event_code: Option<String>) -> ServerPayload {
		ServerPayload {
			provider: PROVIDER.to_string(),
			channel: Channel::Server,
			event_name: self.event_name.clone(),
			event_id: self.event_id,
			event_time: self.event_time,
			event_source_url: self.source_url_or_empty(),
			action_source: ActionSource::Website,
			user_data,
			custom_data: self.params.clone(),
			test_event_code,
		}
	}
}

/// The browser channel's view of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserPayload {
	pub provider: String,
	pub channel: Channel,
	pub method: BrowserMethod,
	pub event_name: String,
	pub event_id: EventId,
	pub event_time: i64,
	pub event_source_url: String,
	pub action_source: ActionSource,
	pub params: Value,
}

/// The server channel's view of an event, for the conversions API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerPayload {
	pub provider: String,
	pub channel: Channel,
	pub event_name: String,
	pub event_id: EventId,
	pub event_time: i64,
	pub event_source_url: String,
	pub action_source: ActionSource,
	pub user_data: UserData,
	pub custom_data: Value,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub test_event_code: Option<String>,
}

/// Body POSTed to the relay webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayPayload {
	pub provider: String,
	pub event_name: String,
	pub event_id: EventId,
	pub event_time: i64,
	pub browser: BrowserPayload,
	pub server: ServerPayload,
	pub attribution: AttributionData,
	pub consent: ConsentState,
	pub anonymous_id: AnonymousId,
	pub cookies: MetaCookieValues,
}

impl RelayPayload {
	/// Assembles the relay body from a tracked event and the visitor's state.
	pub fn new(
		event: &TrackedEvent,
		server: ServerPayload,
		attribution: AttributionData,
		consent: ConsentState,
		anonymous_id: AnonymousId,
		cookies: MetaCookieValues,
	) -> Self {
		Self {
			provider: PROVIDER.to_string(),
			event_name: event.event_name.clone(),
			event_id: event.event_id,
			event_time: event.event_time,
			browser: event.browser_payload(),
			server,
			attribution,
			consent,
			anonymous_id,
			cookies,
		}
	}
}
