// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Open parameter maps for custom events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ValidationError};

/// A scalar custom parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Primitive {
	Bool(bool),
	Integer(i64),
	Float(f64),
	String(String),
}

impl Primitive {
	fn is_finite(&self) -> bool {
		match self {
			Primitive::Float(v) => v.is_finite(),
			_ => true,
		}
	}

	fn from_json(value: Value) -> Option<Self> {
		match value {
			Value::Bool(b) => Some(Primitive::Bool(b)),
			Value::Number(n) => n
				.as_i64()
				.map(Primitive::Integer)
				.or_else(|| n.as_f64().map(Primitive::Float)),
			Value::String(s) => Some(Primitive::String(s)),
			_ => None,
		}
	}
}

/// A custom parameter value: a primitive or a flat array of primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
	Primitive(Primitive),
	List(Vec<Primitive>),
}

macro_rules! impl_from_primitive {
	($($ty:ty => $variant:ident as $conv:ty),* $(,)?) => {
		$(
			impl From<$ty> for Primitive {
				fn from(value: $ty) -> Self {
					Primitive::$variant(<$conv>::from(value))
				}
			}

			impl From<$ty> for ParamValue {
				fn from(value: $ty) -> Self {
					ParamValue::Primitive(Primitive::from(value))
				}
			}
		)*
	};
}

impl_from_primitive! {
	bool => Bool as bool,
	i32 => Integer as i64,
	i64 => Integer as i64,
	u8 => Integer as i64,
	u32 => Integer as i64,
	f32 => Float as f64,
	f64 => Float as f64,
	String => String as String,
	&str => String as String,
}

impl<T: Into<Primitive>> From<Vec<T>> for ParamValue {
	fn from(values: Vec<T>) -> Self {
		ParamValue::List(values.into_iter().map(Into::into).collect())
	}
}

/// A builder for custom event parameters.
///
/// # Example
///
/// ```
/// use kurukin_analytics_core::CustomParams;
///
/// let params = CustomParams::new()
///     .insert("video_id", "intro")
///     .insert("progress_percent", 25.5)
///     .insert("muted", false)
///     .insert("tags", vec!["hero", "landing"]);
/// assert_eq!(params.len(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomParams {
	inner: BTreeMap<String, ParamValue>,
}

impl CustomParams {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts a key-value pair, replacing any existing value for the key.
	pub fn insert<K, V>(mut self, key: K, value: V) -> Self
	where
		K: Into<String>,
		V: Into<ParamValue>,
	{
		self.inner.insert(key.into(), value.into());
		self
	}

	/// Merges another map into this one. Values from `other` win.
	pub fn merge(mut self, other: CustomParams) -> Self {
		self.inner.extend(other.inner);
		self
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	pub fn len(&self) -> usize {
		self.inner.len()
	}

	pub fn get(&self, key: &str) -> Option<&ParamValue> {
		self.inner.get(key)
	}

	/// Rejects NaN and infinite numbers, which have no JSON representation.
	pub fn validate(&self) -> Result<()> {
		for (key, value) in &self.inner {
			let finite = match value {
				ParamValue::Primitive(p) => p.is_finite(),
				ParamValue::List(items) => items.iter().all(Primitive::is_finite),
			};
			if !finite {
				return Err(ValidationError::NonFiniteNumber(key.clone()));
			}
		}
		Ok(())
	}

	pub fn into_value(self) -> Value {
		serde_json::to_value(self.inner).unwrap_or_else(|_| Value::Object(Default::default()))
	}
}

impl TryFrom<Value> for CustomParams {
	type Error = ValidationError;

	/// Accepts `null` as an empty map and otherwise requires an object whose
	/// values are primitives or arrays of primitives.
	fn try_from(value: Value) -> Result<Self> {
		let map = match value {
			Value::Null => return Ok(Self::new()),
			Value::Object(map) => map,
			_ => {
				return Err(ValidationError::InvalidParameters {
					event: "custom".to_string(),
					message: "parameters must be a JSON object".to_string(),
				})
			}
		};

		let mut params = Self::new();
		for (key, value) in map {
			let converted = match value {
				Value::Array(items) => items
					.into_iter()
					.map(Primitive::from_json)
					.collect::<Option<Vec<_>>>()
					.map(ParamValue::List),
				other => Primitive::from_json(other).map(ParamValue::Primitive),
			};
			match converted {
				Some(v) => params.inner.insert(key, v),
				None => return Err(ValidationError::UnsupportedParamValue(key)),
			};
		}
		Ok(params)
	}
}
