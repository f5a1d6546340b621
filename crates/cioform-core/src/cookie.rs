//! Cookie wire format used for the completion marker.
//!
//! Entries follow the `document.cookie` write syntax:
//!
//! ```text
//! _cioForm=true; expires=Mon, 18 Oct 2027 09:30:00 GMT; path=/
//! ```
//!
//! Values are percent-escaped. Alphanumerics and `@*_+-./` stay literal,
//! every other byte of the UTF-8 encoding becomes `%XX`.

use crate::error::{FormError, FormResult};
use chrono::{DateTime, TimeDelta, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters left untouched by [`escape_value`].
const COOKIE_VALUE_SET: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'@')
	.remove(b'*')
	.remove(b'_')
	.remove(b'+')
	.remove(b'-')
	.remove(b'.')
	.remove(b'/');

/// Days subtracted from "now" when expiring a cookie.
pub const REMOVAL_OFFSET_DAYS: i64 = 100;

/// Percent-escapes a cookie value.
pub fn escape_value(value: &str) -> String {
	utf8_percent_encode(value, COOKIE_VALUE_SET).to_string()
}

/// Reverses [`escape_value`]. Malformed UTF-8 sequences are replaced.
pub fn unescape_value(value: &str) -> String {
	percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Checks that `name` can be written as a cookie name.
pub fn validate_name(name: &str) -> FormResult<()> {
	let invalid = name.is_empty()
		|| name
			.chars()
			.any(|ch| ch == '=' || ch == ';' || ch == ',' || ch.is_whitespace() || ch.is_control());

	if invalid {
		return Err(FormError::InvalidCookieName(name.to_string()));
	}
	Ok(())
}

/// Formats a timestamp the way `Date.prototype.toUTCString` does.
pub fn http_date(at: DateTime<Utc>) -> String {
	at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Builds the entry that stores `value` under `name` for `expire_days`.
pub fn build_set_cookie(
	name: &str,
	value: &str,
	expire_days: i64,
	now: DateTime<Utc>,
) -> FormResult<String> {
	validate_name(name)?;
	let expires = shift_days(now, expire_days)?;
	Ok(format!(
		"{}={}; expires={}; path=/",
		name,
		escape_value(value),
		http_date(expires)
	))
}

/// Builds the entry that expires `name` immediately.
pub fn build_removal(name: &str, now: DateTime<Utc>) -> FormResult<String> {
	validate_name(name)?;
	let expires = shift_days(now, -REMOVAL_OFFSET_DAYS)?;
	Ok(format!("{}=; expires={}; path=/", name, http_date(expires)))
}

fn shift_days(now: DateTime<Utc>, days: i64) -> FormResult<DateTime<Utc>> {
	TimeDelta::try_days(days)
		.and_then(|offset| now.checked_add_signed(offset))
		.ok_or(FormError::CookieExpiry(days))
}

/// Finds the raw (still escaped) value of `name` in a cookie header.
///
/// The header is split on `;`, leading spaces are trimmed, and the first
/// entry starting with `name=` wins.
pub fn find_raw(header: &str, name: &str) -> Option<String> {
	let prefix = format!("{name}=");
	header
		.split(';')
		.map(|entry| entry.trim_start_matches(' '))
		.find_map(|entry| entry.strip_prefix(prefix.as_str()))
		.map(str::to_string)
}

/// Returns true if `name` occurs anywhere in the cookie header.
///
/// This is a substring test, not a cookie-name match: a header holding
/// `x_cioForm_old=1` also reports `_cioForm` as present.
pub fn header_mentions(header: &str, name: &str) -> bool {
	header.contains(name)
}

/// A parsed cookie write, as understood by an in-memory cookie jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieWrite {
	/// Cookie name.
	pub name: String,
	/// Raw value as written, still escaped.
	pub value: String,
	/// Expiry, when the entry carried a parseable `expires` attribute.
	pub expires: Option<DateTime<Utc>>,
}

impl CookieWrite {
	/// Parses a `document.cookie` style write.
	///
	/// Attributes other than `expires` are ignored.
	pub fn parse(raw: &str) -> FormResult<Self> {
		let mut parts = raw.split(';');
		let pair = parts.next().unwrap_or_default().trim();
		let (name, value) = pair
			.split_once('=')
			.ok_or_else(|| FormError::InvalidCookieName(pair.to_string()))?;
		validate_name(name.trim())?;

		let expires = parts
			.filter_map(|attribute| attribute.trim().split_once('='))
			.find(|(key, _)| key.trim().eq_ignore_ascii_case("expires"))
			.and_then(|(_, date)| DateTime::parse_from_rfc2822(date.trim()).ok())
			.map(|date| date.with_timezone(&Utc));

		Ok(Self {
			name: name.trim().to_string(),
			value: value.trim().to_string(),
			expires,
		})
	}

	/// Returns true if the write deletes the cookie at `now`.
	pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
		self.expires.is_some_and(|expires| expires <= now)
	}
}
