//! Binding configuration.
//!
//! Settings are plain serde data so they can be read from the options
//! object a page passes in, from JSON, or built in Rust. Every field has a
//! default, so `{}` is a valid settings document.
//!
//! ```
//! use cioform_core::FormSettings;
//!
//! let settings = FormSettings::from_json(r#"{"remote": true, "cookie": {"name": "_signup"}}"#).unwrap();
//! assert!(settings.remote);
//! assert_eq!(settings.cookie.name, "_signup");
//! assert_eq!(settings.cookie.expire, 365);
//! ```

use crate::error::{FormError, FormResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default completion cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "_cioForm";

/// Default completion cookie lifetime in days.
pub const DEFAULT_COOKIE_EXPIRE_DAYS: i64 = 365;

/// Longest accepted completion cookie lifetime in days.
pub const MAX_COOKIE_EXPIRE_DAYS: i64 = 36_500;

/// Default completion cookie value.
pub const DEFAULT_COOKIE_VALUE: &str = "true";

/// Default delay between readiness checks.
pub const DEFAULT_READY_INTERVAL_MS: u64 = 10;

/// Completion cookie configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
	/// Cookie name; its presence marks the form as completed.
	pub name: String,
	/// Lifetime in days.
	pub expire: i64,
	/// Stored value. Only existence matters to `has_filled`.
	#[serde(deserialize_with = "deserialize_cookie_value")]
	pub value: String,
}

impl Default for CookieSettings {
	fn default() -> Self {
		Self {
			name: DEFAULT_COOKIE_NAME.to_string(),
			expire: DEFAULT_COOKIE_EXPIRE_DAYS,
			value: DEFAULT_COOKIE_VALUE.to_string(),
		}
	}
}

/// Settings snapshot taken by each binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSettings {
	/// Action restored before the native submit when the form element was
	/// served without one.
	pub action: String,
	/// Leave the native submit to the caller after a successful send.
	pub remote: bool,
	/// Stamp `created_at` on every collected record.
	#[serde(alias = "createdAt")]
	pub created_at: bool,
	/// Completion cookie.
	pub cookie: CookieSettings,
	/// Delay between readiness checks.
	#[serde(alias = "readyIntervalMs")]
	pub ready_interval_ms: u64,
	/// Upper bound on the readiness wait. `None` waits forever.
	#[serde(alias = "readyTimeoutMs")]
	pub ready_timeout_ms: Option<u64>,
}

impl Default for FormSettings {
	fn default() -> Self {
		Self {
			action: String::new(),
			remote: false,
			created_at: true,
			cookie: CookieSettings::default(),
			ready_interval_ms: DEFAULT_READY_INTERVAL_MS,
			ready_timeout_ms: None,
		}
	}
}

impl FormSettings {
	/// Parses and validates settings from a JSON document.
	pub fn from_json(json: &str) -> FormResult<Self> {
		let settings: Self = serde_json::from_str(json)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Checks the settings for values the binding cannot work with.
	pub fn validate(&self) -> FormResult<()> {
		crate::cookie::validate_name(&self.cookie.name).map_err(|_| {
			FormError::InvalidSettings(format!(
				"cookie.name {:?} is not a valid cookie name",
				self.cookie.name
			))
		})?;

		if !(1..=MAX_COOKIE_EXPIRE_DAYS).contains(&self.cookie.expire) {
			return Err(FormError::InvalidSettings(format!(
				"cookie.expire must be between 1 and {MAX_COOKIE_EXPIRE_DAYS}, got {}",
				self.cookie.expire
			)));
		}

		if self.ready_interval_ms == 0 {
			return Err(FormError::InvalidSettings(
				"ready_interval_ms must be at least 1".to_string(),
			));
		}

		Ok(())
	}

	/// Delay between readiness checks.
	pub fn ready_interval(&self) -> Duration {
		Duration::from_millis(self.ready_interval_ms)
	}

	/// Upper bound on the readiness wait, if any.
	pub fn ready_timeout(&self) -> Option<Duration> {
		self.ready_timeout_ms.map(Duration::from_millis)
	}

	/// Sets the action override.
	pub fn with_action(mut self, action: impl Into<String>) -> Self {
		self.action = action.into();
		self
	}

	/// Sets remote mode.
	pub fn with_remote(mut self, remote: bool) -> Self {
		self.remote = remote;
		self
	}

	/// Enables or disables `created_at` stamping.
	pub fn with_created_at(mut self, created_at: bool) -> Self {
		self.created_at = created_at;
		self
	}

	/// Replaces the cookie settings.
	pub fn with_cookie(mut self, cookie: CookieSettings) -> Self {
		self.cookie = cookie;
		self
	}

	/// Bounds the readiness wait.
	pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
		self.ready_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
		self
	}
}

// Page scripts pass `value: true` as often as `value: "true"`.
fn deserialize_cookie_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let value = serde_json::Value::deserialize(deserializer)?;
	Ok(match value {
		serde_json::Value::String(text) => text,
		serde_json::Value::Null => DEFAULT_COOKIE_VALUE.to_string(),
		other => other.to_string(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_defaults() {
		let settings = FormSettings::default();
		assert_eq!(settings.action, "");
		assert!(!settings.remote);
		assert!(settings.created_at);
		assert_eq!(settings.cookie.name, "_cioForm");
		assert_eq!(settings.cookie.expire, 365);
		assert_eq!(settings.cookie.value, "true");
		assert_eq!(settings.ready_interval(), Duration::from_millis(10));
		assert_eq!(settings.ready_timeout(), None);
	}

	#[rstest]
	fn test_empty_document_uses_defaults() {
		assert_eq!(FormSettings::from_json("{}").unwrap(), FormSettings::default());
	}

	#[rstest]
	fn test_longest_lifetime_is_accepted() {
		let settings = FormSettings::from_json(r#"{"cookie": {"expire": 36500}}"#).unwrap();
		assert_eq!(settings.cookie.expire, MAX_COOKIE_EXPIRE_DAYS);
	}

	#[rstest]
	fn test_partial_cookie_merges_with_defaults() {
		let settings = FormSettings::from_json(r#"{"cookie": {"expire": 30}}"#).unwrap();
		assert_eq!(settings.cookie.name, "_cioForm");
		assert_eq!(settings.cookie.expire, 30);
	}

	#[rstest]
	#[case(r#"{"cookie": {"value": true}}"#, "true")]
	#[case(r#"{"cookie": {"value": 1}}"#, "1")]
	#[case(r#"{"cookie": {"value": "done"}}"#, "done")]
	fn test_cookie_value_accepts_scalars(#[case] json: &str, #[case] expected: &str) {
		let settings = FormSettings::from_json(json).unwrap();
		assert_eq!(settings.cookie.value, expected);
	}

	#[rstest]
	fn test_camel_case_aliases() {
		let settings =
			FormSettings::from_json(r#"{"createdAt": false, "readyTimeoutMs": 2000}"#).unwrap();
		assert!(!settings.created_at);
		assert_eq!(settings.ready_timeout(), Some(Duration::from_secs(2)));
	}

	#[rstest]
	#[case(r#"{"cookie": {"name": "bad name"}}"#)]
	#[case(r#"{"cookie": {"expire": 0}}"#)]
	#[case(r#"{"cookie": {"expire": 36501}}"#)]
	#[case(r#"{"cookie": {"expire": 1000000000000}}"#)]
	#[case(r#"{"ready_interval_ms": 0}"#)]
	fn test_validation_failures(#[case] json: &str) {
		assert!(matches!(
			FormSettings::from_json(json),
			Err(FormError::InvalidSettings(_))
		));
	}

	#[rstest]
	fn test_huge_ready_timeout_saturates() {
		let settings = FormSettings::default().with_ready_timeout(Duration::MAX);
		assert_eq!(settings.ready_timeout_ms, Some(u64::MAX));
	}

	#[rstest]
	fn test_parse_failure() {
		assert!(matches!(
			FormSettings::from_json(r#"{"remote": "yes"}"#),
			Err(FormError::SettingsParse(_))
		));
	}
}
