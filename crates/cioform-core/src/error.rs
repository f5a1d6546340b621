//! Error types shared by every cioform crate.
//!
//! Nothing in this taxonomy is fatal. The binding reports each variant
//! through the `error` hook or a returned `Result`, and the browser
//! adapter logs whatever reaches the event handler instead of throwing.

use thiserror::Error;

/// Result type for form binding operations.
pub type FormResult<T> = Result<T, FormError>;

/// Errors raised while collecting, sending or tracking a form submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FormError {
	/// The record handed to the sink has nothing to identify.
	#[error("attribute record is missing or empty")]
	MalformedPayload,

	/// The cookie name cannot be used in a `document.cookie` entry.
	#[error("invalid cookie name: {0:?}")]
	InvalidCookieName(String),

	/// The cookie lifetime moves the expiry date out of the representable range.
	#[error("cookie lifetime of {0} days is out of range")]
	CookieExpiry(i64),

	/// The identity sink rejected the identify call.
	#[error("identity sink error: {0}")]
	Sink(String),

	/// The bounded readiness wait gave up.
	#[error("identity sink not ready after {waited_ms}ms")]
	ReadyTimeout {
		/// Milliseconds spent waiting before giving up.
		waited_ms: u64,
	},

	/// The readiness wait was aborted before the sink became ready.
	#[error("readiness wait cancelled")]
	Cancelled,

	/// A setting holds a value the binding cannot work with.
	#[error("invalid settings: {0}")]
	InvalidSettings(String),

	/// The settings document could not be parsed.
	#[error("failed to parse settings: {0}")]
	SettingsParse(String),

	/// A browser DOM call failed.
	#[error("DOM error: {0}")]
	Dom(String),
}

impl From<serde_json::Error> for FormError {
	fn from(error: serde_json::Error) -> Self {
		Self::SettingsParse(error.to_string())
	}
}
