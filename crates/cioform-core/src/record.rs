//! Attribute records sent to the identity sink.
//!
//! A record maps field names to values in DOM traversal order. Form fields
//! always produce text; the only integer the binding writes itself is the
//! `created_at` timestamp.

use crate::error::{FormError, FormResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key used for the identity of the person submitting the form.
pub const ID_KEY: &str = "id";

/// Key the id is derived from when the form has no explicit id.
pub const EMAIL_KEY: &str = "email";

/// Key holding the submission timestamp in epoch seconds.
pub const CREATED_AT_KEY: &str = "created_at";

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
	/// A raw control value, or `"true"`/`"false"` for checkable controls.
	Text(String),
	/// An integer written by the binding (timestamps).
	Integer(i64),
}

impl AttributeValue {
	/// Returns the text payload, if this is a text value.
	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(text) => Some(text),
			Self::Integer(_) => None,
		}
	}

	/// Returns the integer payload, if this is an integer value.
	pub fn as_integer(&self) -> Option<i64> {
		match self {
			Self::Integer(value) => Some(*value),
			Self::Text(_) => None,
		}
	}

	/// Mirrors JavaScript truthiness for the values a form can produce.
	pub fn is_truthy(&self) -> bool {
		match self {
			Self::Text(text) => !text.is_empty(),
			Self::Integer(value) => *value != 0,
		}
	}
}

impl fmt::Display for AttributeValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Text(text) => f.write_str(text),
			Self::Integer(value) => write!(f, "{value}"),
		}
	}
}

impl From<&str> for AttributeValue {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}

impl From<String> for AttributeValue {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

impl From<i64> for AttributeValue {
	fn from(value: i64) -> Self {
		Self::Integer(value)
	}
}

impl From<bool> for AttributeValue {
	fn from(value: bool) -> Self {
		Self::Text(value.to_string())
	}
}

/// Insertion-ordered attribute map built from a form on every submit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeRecord {
	values: IndexMap<String, AttributeValue>,
}

impl AttributeRecord {
	/// Creates an empty record.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the value stored under `key`.
	pub fn get(&self, key: &str) -> Option<&AttributeValue> {
		self.values.get(key)
	}

	/// Returns the value stored under `key` when it is text.
	pub fn get_text(&self, key: &str) -> Option<&str> {
		self.values.get(key).and_then(AttributeValue::as_text)
	}

	/// Stores `value` under `key` and returns the stored value.
	///
	/// Re-setting an existing key keeps its original position.
	pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> &AttributeValue {
		let entry = self.values.entry(key.into());
		let value = value.into();
		match entry {
			indexmap::map::Entry::Occupied(mut occupied) => {
				occupied.insert(value);
				occupied.into_mut()
			}
			indexmap::map::Entry::Vacant(vacant) => vacant.insert(value),
		}
	}

	/// Removes `key`, keeping the order of the remaining entries.
	pub fn unset(&mut self, key: &str) -> Option<AttributeValue> {
		self.values.shift_remove(key)
	}

	/// Returns true if `key` is present.
	pub fn contains(&self, key: &str) -> bool {
		self.values.contains_key(key)
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.values.len()
	}

	/// Returns true if the record has no entries.
	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Iterates entries in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
		self.values.iter().map(|(key, value)| (key.as_str(), value))
	}

	/// Iterates keys in insertion order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.values.keys().map(String::as_str)
	}

	/// Resolves and stores the `id` entry.
	///
	/// `explicit` wins when it is non-empty. Otherwise the id is derived
	/// from a non-empty `email` entry. When neither exists the `id` entry
	/// is dropped so the sink never receives an empty identity.
	pub fn apply_id(&mut self, explicit: Option<&str>) -> Option<String> {
		let resolved = explicit
			.filter(|id| !id.is_empty())
			.map(str::to_string)
			.or_else(|| {
				self.get_text(EMAIL_KEY)
					.filter(|email| !email.is_empty())
					.map(derive_id)
			});

		match &resolved {
			Some(id) => {
				self.set(ID_KEY, id.clone());
			}
			None => {
				self.unset(ID_KEY);
			}
		}
		resolved
	}

	/// Stores the `created_at` timestamp.
	pub fn stamp_created_at(&mut self, epoch_seconds: i64) {
		self.set(CREATED_AT_KEY, epoch_seconds);
	}

	/// Serializes the record as a JSON object.
	pub fn to_json(&self) -> FormResult<String> {
		serde_json::to_string(self).map_err(|error| FormError::Sink(error.to_string()))
	}
}

impl<K, V> FromIterator<(K, V)> for AttributeRecord
where
	K: Into<String>,
	V: Into<AttributeValue>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut record = Self::new();
		for (key, value) in iter {
			record.set(key, value);
		}
		record
	}
}

/// Derives an id from an email address.
///
/// Replaces the first `@` and then the first `.` with `_`, so
/// `"a@b.com"` becomes `"a_b_com"` and `"first.last@example.com"` becomes
/// `"first_last_example.com"`.
pub fn derive_id(email: &str) -> String {
	email.replacen('@', "_", 1).replacen('.', "_", 1)
}
