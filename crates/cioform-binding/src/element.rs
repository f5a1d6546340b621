//! Form element abstraction.
//!
//! The binding never touches `web_sys` directly. It reads and writes the
//! form through [`FormElement`], which the browser adapter implements over
//! `HtmlFormElement` and the test doubles implement in memory.

use cioform_core::FormResult;
use std::fmt;

/// Identity of a form element, used to keep one binding per element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementKey(String);

impl ElementKey {
	/// Creates a key from any string identity.
	pub fn new(key: impl Into<String>) -> Self {
		Self(key.into())
	}

	/// The key as a string.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ElementKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// The tag of a form control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlTag {
	/// `<input>`
	Input,
	/// `<select>`
	Select,
	/// `<textarea>`
	TextArea,
}

/// A snapshot of one form control, in DOM order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormControl {
	/// Element tag.
	pub tag: ControlTag,
	/// The `type` property, lower-cased (`"text"`, `"checkbox"`, ...).
	pub kind: String,
	/// The `name` property. Empty when the control has no name.
	pub name: String,
	/// The `value` property.
	pub value: String,
	/// The `checked` property. Only meaningful for checkable inputs.
	pub checked: bool,
}

impl FormControl {
	/// An `<input>` of the given type.
	pub fn input(kind: &str, name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			tag: ControlTag::Input,
			kind: kind.to_ascii_lowercase(),
			name: name.into(),
			value: value.into(),
			checked: false,
		}
	}

	/// An `<input type="text">`.
	pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self::input("text", name, value)
	}

	/// An `<input type="checkbox">`.
	pub fn checkbox(name: impl Into<String>, checked: bool) -> Self {
		Self {
			checked,
			..Self::input("checkbox", name, "on")
		}
	}

	/// An `<input type="radio">`.
	pub fn radio(name: impl Into<String>, value: impl Into<String>, checked: bool) -> Self {
		Self {
			checked,
			..Self::input("radio", name, value)
		}
	}

	/// An `<input type="submit">`.
	pub fn submit(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self::input("submit", name, value)
	}

	/// A `<select>`; `kind` follows the DOM (`"select-one"`).
	pub fn select(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			tag: ControlTag::Select,
			kind: "select-one".to_string(),
			name: name.into(),
			value: value.into(),
			checked: false,
		}
	}

	/// A `<textarea>`.
	pub fn textarea(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			tag: ControlTag::TextArea,
			kind: "textarea".to_string(),
			name: name.into(),
			value: value.into(),
			checked: false,
		}
	}

	/// Submit buttons never contribute an attribute.
	pub fn is_submit(&self) -> bool {
		self.kind == "submit"
	}

	/// Checkboxes and radios report their checked state instead of a value.
	pub fn is_checkable(&self) -> bool {
		self.tag == ControlTag::Input && (self.kind == "checkbox" || self.kind == "radio")
	}

	/// The value this control contributes to an attribute record.
	pub fn attribute_value(&self) -> String {
		if self.is_checkable() {
			self.checked.to_string()
		} else {
			self.value.clone()
		}
	}

	/// Whether `reset` clears this control: selects, and inputs other than
	/// hidden fields and submit buttons.
	pub fn is_resettable(&self) -> bool {
		match self.tag {
			ControlTag::Input => self.kind != "hidden" && !self.is_submit(),
			ControlTag::Select => true,
			ControlTag::TextArea => false,
		}
	}
}

/// DOM operations the binding performs on its form.
pub trait FormElement {
	/// Stable identity of the element.
	fn key(&self) -> ElementKey;

	/// Every input, select and textarea inside the form, in DOM order.
	fn controls(&self) -> Vec<FormControl>;

	/// Sets the value of the control at `index` in [`FormElement::controls`] order.
	fn set_control_value(&self, index: usize, value: &str) -> FormResult<()>;

	/// Reads an attribute of the form element.
	fn attribute(&self, name: &str) -> Option<String>;

	/// Writes an attribute of the form element.
	fn set_attribute(&self, name: &str, value: &str) -> FormResult<()>;

	/// Removes an attribute of the form element.
	fn remove_attribute(&self, name: &str) -> FormResult<()>;

	/// Runs the native form submission, bypassing submit listeners.
	fn submit(&self) -> FormResult<()>;
}
