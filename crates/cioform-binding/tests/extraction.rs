//! Attribute extraction over arbitrary forms.

use cioform_binding::testing::{MockForm, TestHarness};
use cioform_binding::{FormBinding, FormControl, FormElement, Hooks};
use cioform_core::FormSettings;
use proptest::prelude::*;
use std::rc::Rc;

fn control() -> impl Strategy<Value = FormControl> {
	prop_oneof![
		("[a-z]{1,6}", "[ -~]{0,12}").prop_map(|(name, value)| FormControl::text(name, value)),
		("[a-z]{1,6}", any::<bool>()).prop_map(|(name, checked)| FormControl::checkbox(name, checked)),
		("[a-z]{1,6}", "[a-z]{1,4}", any::<bool>())
			.prop_map(|(name, value, checked)| FormControl::radio(name, value, checked)),
		("[a-z]{1,6}", "[a-z]{0,4}").prop_map(|(name, value)| FormControl::select(name, value)),
		("[a-z]{1,6}", "[ -~]{0,12}").prop_map(|(name, value)| FormControl::textarea(name, value)),
		"[a-z]{1,6}".prop_map(|name| FormControl::submit(name, "Send")),
	]
}

fn bind(controls: &[FormControl]) -> FormBinding {
	let form = controls
		.iter()
		.cloned()
		.fold(MockForm::new("generated"), MockForm::with_control);
	let element: Rc<dyn FormElement> = Rc::new(form);
	let settings = FormSettings::default().with_created_at(false);
	FormBinding::new(element, settings, Hooks::new(), TestHarness::new().env()).unwrap()
}

proptest! {
	#[test]
	fn every_distinct_non_submit_name_yields_one_entry(controls in prop::collection::vec(control(), 0..12)) {
		let binding = bind(&controls);
		let record = binding.read_controls();

		let mut expected: Vec<&str> = Vec::new();
		for control in controls.iter().filter(|control| !control.is_submit()) {
			if !expected.contains(&control.name.as_str()) {
				expected.push(&control.name);
			}
		}
		prop_assert_eq!(record.keys().collect::<Vec<_>>(), expected);
	}

	#[test]
	fn checkables_map_to_booleans(name in "[a-z]{1,6}", checked in any::<bool>()) {
		let binding = bind(&[FormControl::checkbox(name.clone(), checked)]);
		let record = binding.read_controls();
		let expected = if checked { "true" } else { "false" };
		prop_assert_eq!(record.get_text(&name), Some(expected));
	}
}
