//! Completion cookie store.
//!
//! [`CookieJar`] is the raw `document.cookie` surface: reading yields the
//! whole header, writing takes one entry. [`CookieStore`] layers the
//! completion-marker operations on top of it.

use crate::env::Clock;
use cioform_core::cookie::{self, CookieWrite};
use cioform_core::{CookieSettings, FormResult};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// The `document.cookie` surface.
pub trait CookieJar {
	/// The current cookie header (`"a=1; b=2"`).
	fn header(&self) -> String;

	/// Writes one cookie entry (`"a=1; expires=...; path=/"`).
	fn write(&self, entry: &str) -> FormResult<()>;
}

/// Get, set and remove operations for the completion marker.
#[derive(Clone)]
pub struct CookieStore {
	jar: Rc<dyn CookieJar>,
	clock: Rc<dyn Clock>,
	defaults: CookieSettings,
}

impl CookieStore {
	/// Creates a store that falls back to `defaults` for omitted arguments.
	pub fn new(jar: Rc<dyn CookieJar>, clock: Rc<dyn Clock>, defaults: CookieSettings) -> Self {
		Self {
			jar,
			clock,
			defaults,
		}
	}

	/// Reads and unescapes a cookie. `None` reads the configured cookie.
	pub fn get(&self, name: Option<&str>) -> FormResult<Option<String>> {
		let name = self.resolve_name(name);
		cookie::validate_name(name)?;
		Ok(cookie::find_raw(&self.jar.header(), name).map(|raw| cookie::unescape_value(&raw)))
	}

	/// Writes a cookie expiring `expire_days` from now.
	///
	/// Omitted or empty arguments fall back to the configured cookie.
	pub fn set(&self, name: Option<&str>, value: Option<&str>, expire_days: Option<i64>) -> FormResult<()> {
		let name = self.resolve_name(name);
		let value = value
			.filter(|value| !value.is_empty())
			.unwrap_or(&self.defaults.value);
		let expire_days = expire_days
			.filter(|days| *days != 0)
			.unwrap_or(self.defaults.expire);

		let entry = cookie::build_set_cookie(name, value, expire_days, self.clock.now())?;
		self.jar.write(&entry)
	}

	/// Expires a cookie. `None` removes the configured cookie.
	pub fn remove(&self, name: Option<&str>) -> FormResult<()> {
		let name = self.resolve_name(name);
		let entry = cookie::build_removal(name, self.clock.now())?;
		self.jar.write(&entry)
	}

	/// Returns true if the configured cookie name appears in the header.
	///
	/// Substring semantics: see [`cookie::header_mentions`].
	pub fn has_filled(&self) -> bool {
		cookie::header_mentions(&self.jar.header(), &self.defaults.name)
	}

	fn resolve_name<'a>(&'a self, name: Option<&'a str>) -> &'a str {
		name.filter(|name| !name.is_empty())
			.unwrap_or(&self.defaults.name)
	}
}

impl std::fmt::Debug for CookieStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CookieStore")
			.field("defaults", &self.defaults)
			.finish_non_exhaustive()
	}
}

/// A cookie jar that behaves like `document.cookie` without a browser.
///
/// Writes replace entries by name; a write whose `expires` lies in the past
/// deletes the entry. Reads render the entries that are still live at the
/// clock's current time, in insertion order.
pub struct MemoryCookieJar {
	entries: RefCell<IndexMap<String, CookieWrite>>,
	clock: Rc<dyn Clock>,
}

impl MemoryCookieJar {
	/// Creates an empty jar that judges expiry with `clock`.
	pub fn new(clock: Rc<dyn Clock>) -> Self {
		Self {
			entries: RefCell::new(IndexMap::new()),
			clock,
		}
	}

	/// Seeds the jar from a cookie header, as if the page loaded with it.
	/// Seeded entries never expire.
	pub fn with_header(self, header: &str) -> Self {
		{
			let mut entries = self.entries.borrow_mut();
			for pair in header.split(';') {
				if let Some((name, value)) = pair.trim().split_once('=') {
					entries.insert(
						name.to_string(),
						CookieWrite {
							name: name.to_string(),
							value: value.to_string(),
							expires: None,
						},
					);
				}
			}
		}
		self
	}

	/// Number of live entries.
	pub fn len(&self) -> usize {
		let now = self.clock.now();
		self.entries
			.borrow()
			.values()
			.filter(|entry| !entry.is_expired_at(now))
			.count()
	}

	/// Returns true if the jar holds no live entries.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl CookieJar for MemoryCookieJar {
	fn header(&self) -> String {
		let now = self.clock.now();
		self.entries
			.borrow()
			.values()
			.filter(|entry| !entry.is_expired_at(now))
			.map(|entry| format!("{}={}", entry.name, entry.value))
			.collect::<Vec<_>>()
			.join("; ")
	}

	fn write(&self, entry: &str) -> FormResult<()> {
		let write = CookieWrite::parse(entry)?;
		let mut entries = self.entries.borrow_mut();
		if write.is_expired_at(self.clock.now()) {
			entries.shift_remove(&write.name);
		} else {
			entries.insert(write.name.clone(), write);
		}
		Ok(())
	}
}

impl std::fmt::Debug for MemoryCookieJar {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemoryCookieJar")
			.field("header", &self.header())
			.finish_non_exhaustive()
	}
}
