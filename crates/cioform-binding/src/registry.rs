//! One binding per form element.

use crate::binding::FormBinding;
use crate::element::{ElementKey, FormElement};
use crate::env::BindingEnv;
use crate::hooks::Hooks;
use crate::{debug_log, info_log};
use cioform_core::{FormResult, FormSettings};
use std::collections::HashMap;
use std::rc::Rc;

/// Tracks the bindings attached in a page session.
///
/// Attaching an element that already has a binding returns the existing
/// binding untouched: settings are not replaced and no hook runs again.
#[derive(Debug, Default)]
pub struct FormRegistry {
	bindings: HashMap<ElementKey, FormBinding>,
}

impl FormRegistry {
	/// An empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Binds every element that has no binding yet.
	///
	/// Returns one binding per element, in input order, new or existing.
	/// Settings are validated once before any element is touched.
	pub fn attach<I>(
		&mut self,
		elements: I,
		settings: &FormSettings,
		hooks: &Hooks,
		env: &BindingEnv,
	) -> FormResult<Vec<FormBinding>>
	where
		I: IntoIterator<Item = Rc<dyn FormElement>>,
	{
		settings.validate()?;

		let mut attached = Vec::new();
		for element in elements {
			let key = element.key();
			if let Some(existing) = self.bindings.get(&key) {
				debug_log!("form {} already bound", key);
				attached.push(existing.clone());
				continue;
			}

			let binding = FormBinding::new(element, settings.clone(), hooks.clone(), env.clone())?;
			self.bindings.insert(key, binding.clone());
			attached.push(binding);
		}

		info_log!("{} form(s) attached, {} bound in total", attached.len(), self.bindings.len());
		Ok(attached)
	}

	/// The binding for `key`, if attached.
	pub fn get(&self, key: &ElementKey) -> Option<&FormBinding> {
		self.bindings.get(key)
	}

	/// Number of bound elements.
	pub fn len(&self) -> usize {
		self.bindings.len()
	}

	/// Returns true if nothing is bound.
	pub fn is_empty(&self) -> bool {
		self.bindings.is_empty()
	}

	/// Forgets a binding and cancels its pending readiness wait.
	pub fn detach(&mut self, key: &ElementKey) -> Option<FormBinding> {
		let binding = self.bindings.remove(key)?;
		if binding.cancel_pending() {
			debug_log!("form {} detached with a pending wait", key);
		}
		Some(binding)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::element::FormControl;
	use crate::testing::{MockForm, TestHarness};
	use cioform_core::{CookieSettings, FormError};
	use rstest::rstest;
	use std::cell::Cell;

	fn form(key: &str) -> Rc<dyn FormElement> {
		Rc::new(MockForm::new(key).with_control(FormControl::text("email", "a@b.c")))
	}

	#[rstest]
	fn test_reattach_returns_existing_binding() {
		let harness = TestHarness::new();
		let loads = Rc::new(Cell::new(0));
		let hooks = {
			let loads = loads.clone();
			Hooks::new().on_load(move |_| loads.set(loads.get() + 1))
		};
		let mut registry = FormRegistry::new();

		let first = registry
			.attach([form("a")], &FormSettings::default(), &hooks, &harness.env())
			.unwrap();
		let again = registry
			.attach([form("a"), form("b")], &FormSettings::default(), &hooks, &harness.env())
			.unwrap();

		assert_eq!(again.len(), 2);
		assert!(first[0].ptr_eq(&again[0]));
		assert_eq!(registry.len(), 2);
		assert_eq!(loads.get(), 2);
	}

	#[rstest]
	fn test_invalid_settings_bind_nothing() {
		let harness = TestHarness::new();
		let settings = FormSettings::default().with_cookie(CookieSettings {
			expire: 0,
			..CookieSettings::default()
		});
		let mut registry = FormRegistry::new();

		let result = registry.attach([form("a")], &settings, &Hooks::new(), &harness.env());
		assert!(matches!(result, Err(FormError::InvalidSettings(_))));
		assert!(registry.is_empty());
	}

	#[rstest]
	fn test_detach_forgets_binding() {
		let harness = TestHarness::new();
		let mut registry = FormRegistry::new();
		registry
			.attach([form("a")], &FormSettings::default(), &Hooks::new(), &harness.env())
			.unwrap();

		let key = ElementKey::new("a");
		assert!(registry.detach(&key).is_some());
		assert!(registry.get(&key).is_none());
		assert!(registry.detach(&key).is_none());
	}
}
