//! The completion cookie as configured, written and read back.

use chrono::{TimeZone, Utc};
use cioform_core::cookie::{self, CookieWrite};
use cioform_core::{FormError, FormSettings};
use rstest::rstest;

#[rstest]
fn test_configured_cookie_roundtrips_through_a_header() {
	let settings = FormSettings::from_json(
		r#"{"cookie": {"name": "_signup", "expire": 30, "value": "done: yes"}}"#,
	)
	.unwrap();
	let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();

	let entry = cookie::build_set_cookie(
		&settings.cookie.name,
		&settings.cookie.value,
		settings.cookie.expire,
		now,
	)
	.unwrap();
	let write = CookieWrite::parse(&entry).unwrap();
	assert_eq!(
		write.expires,
		Some(Utc.with_ymd_and_hms(2026, 11, 17, 9, 30, 0).unwrap())
	);

	let header = format!("theme=dark; {}={}", write.name, write.value);
	assert!(cookie::header_mentions(&header, "_signup"));
	assert_eq!(
		cookie::find_raw(&header, "_signup").map(|raw| cookie::unescape_value(&raw)),
		Some("done: yes".to_string())
	);
}

#[rstest]
fn test_removal_entry_is_already_expired() {
	let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
	let write = CookieWrite::parse(&cookie::build_removal("_cioForm", now).unwrap()).unwrap();

	assert_eq!(write.value, "");
	assert!(write.is_expired_at(now));
}

#[rstest]
#[case("")]
#[case("a=b")]
#[case("semi;colon")]
#[case("com,ma")]
#[case("tab\tname")]
fn test_invalid_names_are_rejected_before_writing(#[case] name: &str) {
	let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
	assert_eq!(
		cookie::build_set_cookie(name, "true", 1, now),
		Err(FormError::InvalidCookieName(name.to_string()))
	);
}
