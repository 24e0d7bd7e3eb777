// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Kurukin event attribution.
//!
//! This crate holds the pure, I/O-free half of the pipeline: consent state,
//! URL attribution parsing and first-touch merging, ad-matching cookie formats,
//! identifiers, event schemas and the relay wire payloads. The runtime half
//! (storage, pixel loading, HTTP relay, video producer) lives in
//! `kurukin-analytics`.
//!
//! # Overview
//!
//! - Consent gate: tracking only for a `granted` status without a CCPA opt-out
//! - Attribution merge keeps earlier values when a later capture lacks them
//! - Standard events carry typed parameters, custom events an open map
//! - One [`EventId`] is shared by the browser and server copies of an event

pub mod attribution;
pub mod consent;
pub mod cookies;
pub mod error;
pub mod event;
pub mod ids;
pub mod params;
pub mod payload;
pub mod result;
pub mod user_data;

pub use attribution::{normalize_nullable, AttributionData, UrlAttributionParams, ATTRIBUTION_QUERY_KEYS};
pub use consent::{ConsentState, ConsentStatus, ConsentUpdate};
pub use cookies::{generate_fbc, generate_fbp, MetaCookieName, MetaCookieValues, DEFAULT_COOKIE_LIFETIME_DAYS};
pub use error::{Result, ValidationError};
pub use event::{
	AddPaymentInfoParams, BrowserMethod, CommerceParams, CompleteRegistrationParams, ContactParams,
	ContentParams, ContentType, CurrencyCode, CustomEvent, DeliveryCategory, DonateParams,
	FindLocationParams, LeadParams, MetaContent, MetaEvent, PageViewParams, PurchaseParams,
	ScheduleParams, SearchParams, StandardEventName, SubscriptionParams,
};
pub use ids::{AnonymousId, EventId};
pub use params::{CustomParams, ParamValue, Primitive};
pub use payload::{ActionSource, BrowserPayload, Channel, RelayPayload, ServerPayload, TrackedEvent, PROVIDER};
pub use result::{TrackResult, REASON_CONSENT_NOT_GRANTED, REASON_MISSING_WEBHOOK_URL};
pub use user_data::{sha256_hex, HashedUserData, UserData};
