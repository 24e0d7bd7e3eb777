// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Standard and custom pixel events.
//!
//! Standard events are a closed set of names, each with its own parameter
//! schema. Anything else is a custom event carrying an open map of primitives.
//! The variant decides which pixel method is used:
//!
//! | Variant | Browser method |
//! |---------|----------------|
//! | one of the 18 standard names | `track` |
//! | [`MetaEvent::Custom`] | `trackCustom` |

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ValidationError};
use crate::params::CustomParams;

/// The standard event names understood by the pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardEventName {
	PageView,
	ViewContent,
	Search,
	AddToCart,
	AddToWishlist,
	InitiateCheckout,
	AddPaymentInfo,
	Purchase,
	Lead,
	CompleteRegistration,
	Contact,
	CustomizeProduct,
	Donate,
	FindLocation,
	Schedule,
	StartTrial,
	SubmitApplication,
	Subscribe,
}

impl StandardEventName {
	pub const ALL: [StandardEventName; 18] = [
		StandardEventName::PageView,
		StandardEventName::ViewContent,
		StandardEventName::Search,
		StandardEventName::AddToCart,
		StandardEventName::AddToWishlist,
		StandardEventName::InitiateCheckout,
		StandardEventName::AddPaymentInfo,
		StandardEventName::Purchase,
		StandardEventName::Lead,
		StandardEventName::CompleteRegistration,
		StandardEventName::Contact,
		StandardEventName::CustomizeProduct,
		StandardEventName::Donate,
		StandardEventName::FindLocation,
		StandardEventName::Schedule,
		StandardEventName::StartTrial,
		StandardEventName::SubmitApplication,
		StandardEventName::Subscribe,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			StandardEventName::PageView => "PageView",
			StandardEventName::ViewContent => "ViewContent",
			StandardEventName::Search => "Search",
			StandardEventName::AddToCart => "AddToCart",
			StandardEventName::AddToWishlist => "AddToWishlist",
			StandardEventName::InitiateCheckout => "InitiateCheckout",
			StandardEventName::AddPaymentInfo => "AddPaymentInfo",
			StandardEventName::Purchase => "Purchase",
			StandardEventName::Lead => "Lead",
			StandardEventName::CompleteRegistration => "CompleteRegistration",
			StandardEventName::Contact => "Contact",
			StandardEventName::CustomizeProduct => "CustomizeProduct",
			StandardEventName::Donate => "Donate",
			StandardEventName::FindLocation => "FindLocation",
			StandardEventName::Schedule => "Schedule",
			StandardEventName::StartTrial => "StartTrial",
			StandardEventName::SubmitApplication => "SubmitApplication",
			StandardEventName::Subscribe => "Subscribe",
		}
	}

	/// Classifies a name. Matching is exact and case-sensitive.
	pub fn parse(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|n| n.as_str() == name)
	}
}

impl std::fmt::Display for StandardEventName {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Pixel call used for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrowserMethod {
	#[serde(rename = "track")]
	Track,
	#[serde(rename = "trackCustom")]
	TrackCustom,
}

impl BrowserMethod {
	pub fn as_str(&self) -> &'static str {
		match self {
			BrowserMethod::Track => "track",
			BrowserMethod::TrackCustom => "trackCustom",
		}
	}
}

impl std::fmt::Display for BrowserMethod {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Upper-case ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
	/// Accepts three ASCII letters in any case and stores them upper-cased.
	pub fn new(code: &str) -> Result<Self> {
		let trimmed = code.trim();
		if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
			Ok(Self(trimmed.to_ascii_uppercase()))
		} else {
			Err(ValidationError::InvalidCurrency(code.to_string()))
		}
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl TryFrom<String> for CurrencyCode {
	type Error = ValidationError;

	fn try_from(value: String) -> Result<Self> {
		Self::new(&value)
	}
}

impl From<CurrencyCode> for String {
	fn from(code: CurrencyCode) -> Self {
		code.0
	}
}

impl std::fmt::Display for CurrencyCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
	Product,
	ProductGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryCategory {
	HomeDelivery,
	InStore,
}

/// One line item in a commerce event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaContent {
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub quantity: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub item_price: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub delivery_category: Option<DeliveryCategory>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub brand: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
}

/// Catalogue fields shared by commerce events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentParams {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content_type: Option<ContentType>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content_ids: Option<Vec<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub contents: Option<Vec<MetaContent>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content_category: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub num_items: Option<u32>,
}

/// Optional value, currency and catalogue fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommerceParams {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub currency: Option<CurrencyCode>,
	#[serde(flatten)]
	pub content: ContentParams,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageViewParams {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub page_title: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub page_path: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub page_location: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub referrer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
	pub search_string: String,
	#[serde(flatten)]
	pub commerce: CommerceParams,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddPaymentInfoParams {
	#[serde(flatten)]
	pub commerce: CommerceParams,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payment_type: Option<String>,
}

/// Purchase requires both a value and a currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseParams {
	pub value: f64,
	pub currency: CurrencyCode,
	#[serde(flatten)]
	pub content: ContentParams,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadParams {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub currency: Option<CurrencyCode>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub lead_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompleteRegistrationParams {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub currency: Option<CurrencyCode>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactParams {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub contact_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonateParams {
	pub value: f64,
	pub currency: CurrencyCode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindLocationParams {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub location_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub search_string: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleParams {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub currency: Option<CurrencyCode>,
}

/// Parameters shared by `StartTrial` and `Subscribe`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionParams {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub currency: Option<CurrencyCode>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub predicted_ltv: Option<f64>,
}

/// A custom event: any name outside the standard set.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEvent {
	name: String,
	params: CustomParams,
}

impl CustomEvent {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn params(&self) -> &CustomParams {
		&self.params
	}
}

/// An event ready for dispatch, tagged by its schema.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaEvent {
	PageView(PageViewParams),
	ViewContent(CommerceParams),
	Search(SearchParams),
	AddToCart(CommerceParams),
	AddToWishlist(CommerceParams),
	InitiateCheckout(CommerceParams),
	AddPaymentInfo(AddPaymentInfoParams),
	Purchase(PurchaseParams),
	Lead(LeadParams),
	CompleteRegistration(CompleteRegistrationParams),
	Contact(ContactParams),
	CustomizeProduct(CommerceParams),
	Donate(DonateParams),
	FindLocation(FindLocationParams),
	Schedule(ScheduleParams),
	StartTrial(SubscriptionParams),
	SubmitApplication,
	Subscribe(SubscriptionParams),
	Custom(CustomEvent),
}

impl MetaEvent {
	/// Builds a custom event. Standard names are refused so that a name always
	/// maps to exactly one schema.
	pub fn custom(name: impl Into<String>, params: CustomParams) -> Result<Self> {
		let name = name.into();
		let trimmed = name.trim();
		if trimmed.is_empty() {
			return Err(ValidationError::EmptyEventName);
		}
		if StandardEventName::parse(trimmed).is_some() {
			return Err(ValidationError::ReservedEventName(trimmed.to_string()));
		}
		params.validate()?;
		Ok(MetaEvent::Custom(CustomEvent {
			name: trimmed.to_string(),
			params,
		}))
	}

	/// Builds a purchase event.
	pub fn purchase(value: f64, currency: &str) -> Result<Self> {
		let event = MetaEvent::Purchase(PurchaseParams {
			value,
			currency: CurrencyCode::new(currency)?,
			content: ContentParams::default(),
		});
		event.validate()?;
		Ok(event)
	}

	pub fn page_view() -> Self {
		MetaEvent::PageView(PageViewParams::default())
	}

	/// Builds an event from a name and a JSON parameter object, validating the
	/// parameters against the schema the name selects.
	pub fn from_json(name: &str, params: Value) -> Result<Self> {
		let Some(standard) = StandardEventName::parse(name.trim()) else {
			return Self::custom(name, CustomParams::try_from(params)?);
		};

		let params = if params.is_null() {
			Value::Object(Default::default())
		} else {
			params
		};

		let event = match standard {
			StandardEventName::PageView => MetaEvent::PageView(decode(standard, params)?),
			StandardEventName::ViewContent => MetaEvent::ViewContent(decode(standard, params)?),
			StandardEventName::Search => MetaEvent::Search(decode(standard, params)?),
			StandardEventName::AddToCart => MetaEvent::AddToCart(decode(standard, params)?),
			StandardEventName::AddToWishlist => MetaEvent::AddToWishlist(decode(standard, params)?),
			StandardEventName::InitiateCheckout => {
				MetaEvent::InitiateCheckout(decode(standard, params)?)
			}
			StandardEventName::AddPaymentInfo => MetaEvent::AddPaymentInfo(decode(standard, params)?),
			StandardEventName::Purchase => MetaEvent::Purchase(decode(standard, params)?),
			StandardEventName::Lead => MetaEvent::Lead(decode(standard, params)?),
			StandardEventName::CompleteRegistration => {
				MetaEvent::CompleteRegistration(decode(standard, params)?)
			}
			StandardEventName::Contact => MetaEvent::Contact(decode(standard, params)?),
			StandardEventName::CustomizeProduct => {
				MetaEvent::CustomizeProduct(decode(standard, params)?)
			}
			StandardEventName::Donate => MetaEvent::Donate(decode(standard, params)?),
			StandardEventName::FindLocation => MetaEvent::FindLocation(decode(standard, params)?),
			StandardEventName::Schedule => MetaEvent::Schedule(decode(standard, params)?),
			StandardEventName::StartTrial => MetaEvent::StartTrial(decode(standard, params)?),
			StandardEventName::SubmitApplication => MetaEvent::SubmitApplication,
			StandardEventName::Subscribe => MetaEvent::Subscribe(decode(standard, params)?),
		};
		event.validate()?;
		Ok(event)
	}

	/// The event name as sent on the wire.
	pub fn name(&self) -> &str {
		match self {
			MetaEvent::Custom(custom) => custom.name(),
			other => other
				.standard_name()
				.map(|n| n.as_str())
				.unwrap_or_default(),
		}
	}

	/// The standard name for this event, or `None` for custom events.
	pub fn standard_name(&self) -> Option<StandardEventName> {
		let name = match self {
			MetaEvent::PageView(_) => StandardEventName::PageView,
			MetaEvent::ViewContent(_) => StandardEventName::ViewContent,
			MetaEvent::Search(_) => StandardEventName::Search,
			MetaEvent::AddToCart(_) => StandardEventName::AddToCart,
			MetaEvent::AddToWishlist(_) => StandardEventName::AddToWishlist,
			MetaEvent::InitiateCheckout(_) => StandardEventName::InitiateCheckout,
			MetaEvent::AddPaymentInfo(_) => StandardEventName::AddPaymentInfo,
			MetaEvent::Purchase(_) => StandardEventName::Purchase,
			MetaEvent::Lead(_) => StandardEventName::Lead,
			MetaEvent::CompleteRegistration(_) => StandardEventName::CompleteRegistration,
			MetaEvent::Contact(_) => StandardEventName::Contact,
			MetaEvent::CustomizeProduct(_) => StandardEventName::CustomizeProduct,
			MetaEvent::Donate(_) => StandardEventName::Donate,
			MetaEvent::FindLocation(_) => StandardEventName::FindLocation,
			MetaEvent::Schedule(_) => StandardEventName::Schedule,
			MetaEvent::StartTrial(_) => StandardEventName::StartTrial,
			MetaEvent::SubmitApplication => StandardEventName::SubmitApplication,
			MetaEvent::Subscribe(_) => StandardEventName::Subscribe,
			MetaEvent::Custom(_) => return None,
		};
		Some(name)
	}

	pub fn method(&self) -> BrowserMethod {
		match self {
			MetaEvent::Custom(_) => BrowserMethod::TrackCustom,
			_ => BrowserMethod::Track,
		}
	}

	/// Serializes the parameters as a JSON object.
	pub fn params_json(&self) -> Value {
		let value = match self {
			MetaEvent::PageView(p) => serde_json::to_value(p),
			MetaEvent::ViewContent(p)
			| MetaEvent::AddToCart(p)
			| MetaEvent::AddToWishlist(p)
			| MetaEvent::InitiateCheckout(p)
			| MetaEvent::CustomizeProduct(p) => serde_json::to_value(p),
			MetaEvent::Search(p) => serde_json::to_value(p),
			MetaEvent::AddPaymentInfo(p) => serde_json::to_value(p),
			MetaEvent::Purchase(p) => serde_json::to_value(p),
			MetaEvent::Lead(p) => serde_json::to_value(p),
			MetaEvent::CompleteRegistration(p) => serde_json::to_value(p),
			MetaEvent::Contact(p) => serde_json::to_value(p),
			MetaEvent::Donate(p) => serde_json::to_value(p),
			MetaEvent::FindLocation(p) => serde_json::to_value(p),
			MetaEvent::Schedule(p) => serde_json::to_value(p),
			MetaEvent::StartTrial(p) | MetaEvent::Subscribe(p) => serde_json::to_value(p),
			MetaEvent::SubmitApplication => Ok(Value::Object(Default::default())),
			MetaEvent::Custom(custom) => Ok(custom.params.clone().into_value()),
		};
		value.unwrap_or_else(|_| Value::Object(Default::default()))
	}

	/// Checks required fields and numeric sanity for the variant's schema.
	pub fn validate(&self) -> Result<()> {
		match self {
			MetaEvent::PageView(_) | MetaEvent::Contact(_) | MetaEvent::SubmitApplication => Ok(()),
			MetaEvent::ViewContent(p)
			| MetaEvent::AddToCart(p)
			| MetaEvent::AddToWishlist(p)
			| MetaEvent::InitiateCheckout(p)
			| MetaEvent::CustomizeProduct(p) => validate_commerce(p),
			MetaEvent::Search(p) => {
				if p.search_string.trim().is_empty() {
					return Err(ValidationError::MissingParameter("search_string".to_string()));
				}
				validate_commerce(&p.commerce)
			}
			MetaEvent::AddPaymentInfo(p) => validate_commerce(&p.commerce),
			MetaEvent::Purchase(p) => {
				finite("value", Some(p.value))?;
				validate_content(&p.content)
			}
			MetaEvent::Lead(p) => finite("value", p.value),
			MetaEvent::CompleteRegistration(p) => finite("value", p.value),
			MetaEvent::Donate(p) => finite("value", Some(p.value)),
			MetaEvent::FindLocation(_) => Ok(()),
			MetaEvent::Schedule(p) => finite("value", p.value),
			MetaEvent::StartTrial(p) | MetaEvent::Subscribe(p) => {
				finite("value", p.value)?;
				finite("predicted_ltv", p.predicted_ltv)
			}
			MetaEvent::Custom(custom) => custom.params.validate(),
		}
	}
}

fn decode<T: DeserializeOwned>(event: StandardEventName, params: Value) -> Result<T> {
	serde_json::from_value(params).map_err(|e| ValidationError::InvalidParameters {
		event: event.to_string(),
		message: e.to_string(),
	})
}

fn finite(field: &str, value: Option<f64>) -> Result<()> {
	match value {
		Some(v) if !v.is_finite() => Err(ValidationError::NonFiniteNumber(field.to_string())),
		_ => Ok(()),
	}
}

fn validate_commerce(params: &CommerceParams) -> Result<()> {
	finite("value", params.value)?;
	validate_content(&params.content)
}

fn validate_content(content: &ContentParams) -> Result<()> {
	for item in content.contents.iter().flatten() {
		finite("contents.item_price", item.item_price)?;
	}
	Ok(())
}
