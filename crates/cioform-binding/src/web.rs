//! Browser adapters.
//!
//! Wires bindings to real `<form>` elements: [`WebForm`] implements
//! [`FormElement`] over `HtmlFormElement`, [`DocumentCookieJar`] reads and
//! writes `document.cookie`, [`WindowSink`] talks to the `_cio` and
//! `analytics` globals, and [`BrowserTimer`] sleeps with `gloo-timers`.
//!
//! Page scripts call the exported `cioForm(selector, options)`:
//!
//! ```js
//! cioForm("#signup", {
//!     remote: false,
//!     cookie: { name: "_cioForm", expire: 365 },
//!     before: function () { console.log("sending", this); },
//!     success: function (record) { console.log("sent", record); },
//! });
//! ```

use crate::binding::{FormBinding, SubmitOutcome};
use crate::cookies::CookieJar;
use crate::element::{ElementKey, FormControl, FormElement};
use crate::env::{BindingEnv, SystemClock, Timer};
use crate::hooks::{Hook, Hooks};
use crate::registry::FormRegistry;
use crate::sink::{IdentitySink, SinkProbe};
use crate::{debug_log, error_log, info_log, warn_log};
use cioform_core::{AttributeRecord, FormError, FormResult, FormSettings};
use futures::future::LocalBoxFuture;
use gloo_timers::future::TimeoutFuture;
use js_sys::{Array, Function, JSON, Reflect};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
	Element, Event, HtmlDocument, HtmlFormElement, HtmlInputElement, HtmlSelectElement,
	HtmlTextAreaElement,
};

/// Attribute that carries a form's [`ElementKey`].
pub const KEY_ATTRIBUTE: &str = "data-cioform-key";

const CONTROL_SELECTOR: &str = "input, select, textarea";

thread_local! {
	static NEXT_KEY: Cell<u32> = const { Cell::new(0) };
	static REGISTRY: RefCell<FormRegistry> = RefCell::new(FormRegistry::new());
}

fn dom_error(value: JsValue) -> FormError {
	FormError::Dom(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

fn sink_error(value: JsValue) -> FormError {
	FormError::Sink(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

fn html_document() -> FormResult<HtmlDocument> {
	web_sys::window()
		.and_then(|window| window.document())
		.and_then(|document| document.dyn_into::<HtmlDocument>().ok())
		.ok_or_else(|| FormError::Dom("no HTML document".to_string()))
}

/// A `<form>` element.
#[derive(Debug, Clone)]
pub struct WebForm {
	form: HtmlFormElement,
	key: ElementKey,
}

impl WebForm {
	/// Wraps a form, tagging it with a key on first sight.
	pub fn new(form: HtmlFormElement) -> FormResult<Self> {
		let key = match form.get_attribute(KEY_ATTRIBUTE) {
			Some(key) => key,
			None => {
				let key = NEXT_KEY.with(|next| {
					let id = next.get() + 1;
					next.set(id);
					format!("cioform-{id}")
				});
				form.set_attribute(KEY_ATTRIBUTE, &key).map_err(dom_error)?;
				key
			}
		};
		Ok(Self {
			form,
			key: ElementKey::new(key),
		})
	}

	/// The wrapped element.
	pub fn form(&self) -> &HtmlFormElement {
		&self.form
	}

	fn control_elements(&self) -> Vec<Element> {
		let Ok(nodes) = self.form.query_selector_all(CONTROL_SELECTOR) else {
			return Vec::new();
		};
		(0..nodes.length())
			.filter_map(|index| nodes.get(index))
			.filter_map(|node| node.dyn_into::<Element>().ok())
			.collect()
	}
}

fn read_control(element: &Element) -> Option<FormControl> {
	if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
		let mut control = FormControl::input(&input.type_(), input.name(), input.value());
		control.checked = input.checked();
		return Some(control);
	}
	if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
		return Some(FormControl::select(select.name(), select.value()));
	}
	element
		.dyn_ref::<HtmlTextAreaElement>()
		.map(|area| FormControl::textarea(area.name(), area.value()))
}

impl FormElement for WebForm {
	fn key(&self) -> ElementKey {
		self.key.clone()
	}

	fn controls(&self) -> Vec<FormControl> {
		self.control_elements()
			.iter()
			.filter_map(read_control)
			.collect()
	}

	fn set_control_value(&self, index: usize, value: &str) -> FormResult<()> {
		let element = self
			.control_elements()
			.into_iter()
			.nth(index)
			.ok_or_else(|| FormError::Dom(format!("no control at index {index}")))?;

		if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
			input.set_value(value);
		} else if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
			select.set_value(value);
		} else if let Some(area) = element.dyn_ref::<HtmlTextAreaElement>() {
			area.set_value(value);
		}
		Ok(())
	}

	fn attribute(&self, name: &str) -> Option<String> {
		self.form.get_attribute(name)
	}

	fn set_attribute(&self, name: &str, value: &str) -> FormResult<()> {
		self.form.set_attribute(name, value).map_err(dom_error)
	}

	fn remove_attribute(&self, name: &str) -> FormResult<()> {
		self.form.remove_attribute(name).map_err(dom_error)
	}

	fn submit(&self) -> FormResult<()> {
		self.form.submit().map_err(dom_error)
	}
}

/// `document.cookie`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentCookieJar;

impl CookieJar for DocumentCookieJar {
	fn header(&self) -> String {
		html_document()
			.ok()
			.and_then(|document| document.cookie().ok())
			.unwrap_or_default()
	}

	fn write(&self, entry: &str) -> FormResult<()> {
		html_document()?.set_cookie(entry).map_err(dom_error)
	}
}

/// The Customer.io globals on `window`.
///
/// `window._cio` is the direct handle. Customer.io enabled under
/// `window.analytics.Integrations` is the alternate integration.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowSink;

fn global(name: &str) -> Option<JsValue> {
	Reflect::get(&js_sys::global(), &JsValue::from_str(name))
		.ok()
		.filter(|value| !value.is_undefined() && !value.is_null())
}

fn property(target: &JsValue, name: &str) -> Option<JsValue> {
	Reflect::get(target, &JsValue::from_str(name))
		.ok()
		.filter(|value| !value.is_undefined() && !value.is_null())
}

fn record_to_js(record: &AttributeRecord) -> FormResult<JsValue> {
	JSON::parse(&record.to_json()?).map_err(sink_error)
}

impl IdentitySink for WindowSink {
	fn probe(&self) -> SinkProbe {
		let alternate = global("analytics")
			.and_then(|analytics| property(&analytics, "Integrations"))
			.and_then(|integrations| property(&integrations, "Customer.io"))
			.is_some_and(|enabled| enabled.is_truthy());
		let direct = global("_cio")
			.and_then(|cio| property(&cio, "identify"))
			.is_some_and(|identify| identify.is_function());
		SinkProbe { alternate, direct }
	}

	fn identify(&self, record: &AttributeRecord) -> FormResult<()> {
		let data = record_to_js(record)?;
		let cio = match global("_cio") {
			Some(cio) => cio,
			None => {
				// Same queue the Customer.io snippet creates; the library
				// replays it once loaded.
				let queue: JsValue = Array::new().into();
				Reflect::set(&js_sys::global(), &JsValue::from_str("_cio"), &queue).map_err(sink_error)?;
				queue
			}
		};

		if let Some(identify) = property(&cio, "identify").and_then(|f| f.dyn_into::<Function>().ok()) {
			identify.call1(&cio, &data).map_err(sink_error)?;
			return Ok(());
		}

		let queue = cio
			.dyn_into::<Array>()
			.map_err(|_| FormError::Sink("_cio has no identify method".to_string()))?;
		queue.push(&Array::of2(&JsValue::from_str("identify"), &data));
		Ok(())
	}

	fn identify_alternate(&self, id: Option<&str>, record: &AttributeRecord) -> FormResult<()> {
		let analytics =
			global("analytics").ok_or_else(|| FormError::Sink("analytics is not loaded".to_string()))?;
		let identify = property(&analytics, "identify")
			.and_then(|f| f.dyn_into::<Function>().ok())
			.ok_or_else(|| FormError::Sink("analytics has no identify method".to_string()))?;

		let id = id.map(JsValue::from_str).unwrap_or(JsValue::UNDEFINED);
		identify
			.call2(&analytics, &id, &record_to_js(record)?)
			.map_err(sink_error)?;
		Ok(())
	}
}

/// Timer backed by `setTimeout`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserTimer;

impl Timer for BrowserTimer {
	fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
		let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
		Box::pin(TimeoutFuture::new(millis))
	}
}

/// The browser environment: `window` sink, `document.cookie`, wall clock
/// and `setTimeout`.
pub fn browser_env() -> BindingEnv {
	BindingEnv::new(
		Rc::new(WindowSink),
		Rc::new(DocumentCookieJar),
		Rc::new(SystemClock),
		Rc::new(BrowserTimer),
	)
}

/// Binds every `<form>` matching `selector` and wires its submit listener.
///
/// Forms bound earlier keep their binding and listener.
pub fn attach_selector(
	selector: &str,
	settings: &FormSettings,
	hooks: &Hooks,
) -> FormResult<Vec<FormBinding>> {
	attach_forms(selector, settings, |_| hooks.clone())
}

fn attach_forms<F>(selector: &str, settings: &FormSettings, hooks_for: F) -> FormResult<Vec<FormBinding>>
where
	F: Fn(&HtmlFormElement) -> Hooks,
{
	let nodes = html_document()?
		.query_selector_all(selector)
		.map_err(dom_error)?;
	let env = browser_env();

	let mut bindings = Vec::new();
	for index in 0..nodes.length() {
		let Some(form) = nodes
			.get(index)
			.and_then(|node| node.dyn_into::<HtmlFormElement>().ok())
		else {
			debug_log!("{} match #{} is not a form, skipped", selector, index);
			continue;
		};

		let element = WebForm::new(form.clone())?;
		let key = element.key();
		let hooks = hooks_for(&form);
		let (binding, is_new) = REGISTRY.with(|registry| {
			let mut registry = registry
				.try_borrow_mut()
				.map_err(|_| FormError::Dom("cioForm called from inside a hook".to_string()))?;
			let is_new = registry.get(&key).is_none();
			let element: Rc<dyn FormElement> = Rc::new(element);
			let mut attached = registry.attach([element], settings, &hooks, &env)?;
			let binding = attached
				.pop()
				.ok_or_else(|| FormError::Dom(format!("form {key} was not bound")))?;
			Ok::<_, FormError>((binding, is_new))
		})?;

		if is_new {
			wire_submit(&form, binding.clone())?;
		}
		bindings.push(binding);
	}

	info_log!("{} bound {} form(s)", selector, bindings.len());
	Ok(bindings)
}

fn wire_submit(form: &HtmlFormElement, binding: FormBinding) -> FormResult<()> {
	let closure = Closure::wrap(Box::new(move |event: Event| {
		event.prevent_default();

		let binding = binding.clone();
		wasm_bindgen_futures::spawn_local(async move {
			match binding.submit().await {
				Ok(SubmitOutcome::InFlight) => {}
				Ok(outcome) => debug_log!("form {} finished: {:?}", binding.key(), outcome),
				Err(FormError::Cancelled) => info_log!("form {} submission cancelled", binding.key()),
				Err(error) => error_log!("form {} submission failed: {}", binding.key(), error),
			}
		});
	}) as Box<dyn FnMut(_)>);

	form.add_event_listener_with_callback("submit", closure.as_ref().unchecked_ref())
		.map_err(dom_error)?;

	closure.forget(); // Keep closure alive
	Ok(())
}

fn js_function(options: &JsValue, names: &[&str]) -> Option<Function> {
	names
		.iter()
		.find_map(|name| property(options, name).and_then(|value| value.dyn_into::<Function>().ok()))
}

fn report_throw(binding: &FormBinding, hook: &str, result: Result<JsValue, JsValue>) {
	if let Err(thrown) = result {
		warn_log!("form {} {} hook threw: {:?}", binding.key(), hook, thrown);
	}
}

fn unit_hook(function: Function, this: JsValue, name: &'static str) -> Hook {
	Hook::new(move |binding, ()| report_throw(binding, name, function.call0(&this)))
}

// Function-valued options become hooks called with the form as `this`.
fn js_hooks(options: &JsValue, form: &HtmlFormElement) -> Hooks {
	let this: JsValue = form.clone().into();
	let mut hooks = Hooks::new();

	hooks.before = js_function(options, &["before"]).map(|f| unit_hook(f, this.clone(), "before"));
	hooks.completed = js_function(options, &["completed"]).map(|f| unit_hook(f, this.clone(), "completed"));
	hooks.uncompleted =
		js_function(options, &["uncompleted"]).map(|f| unit_hook(f, this.clone(), "uncompleted"));
	hooks.on_load = js_function(options, &["onLoad", "on_load"]).map(|f| unit_hook(f, this.clone(), "onLoad"));

	hooks.error = js_function(options, &["error"]).map(|function| {
		let this = this.clone();
		Hook::new(move |binding: &FormBinding, error: FormError| {
			let message = JsValue::from_str(&error.to_string());
			report_throw(binding, "error", function.call1(&this, &message));
		})
	});

	hooks.success = js_function(options, &["success"]).map(|function| {
		let this = this.clone();
		Hook::new(move |binding: &FormBinding, record: AttributeRecord| {
			match record_to_js(&record) {
				Ok(record) => report_throw(binding, "success", function.call1(&this, &record)),
				Err(error) => warn_log!("form {} success hook skipped: {}", binding.key(), error),
			}
		})
	});

	hooks
}

fn settings_from_js(options: &JsValue) -> FormResult<FormSettings> {
	if options.is_undefined() || options.is_null() {
		return Ok(FormSettings::default());
	}
	// Function-valued fields are dropped by JSON.stringify.
	let json: String = JSON::stringify(options)
		.map_err(|error| FormError::SettingsParse(format!("{error:?}")))?
		.into();
	FormSettings::from_json(&json)
}

/// `cioForm(selector, options)`: binds matching forms and returns how many
/// are bound.
#[wasm_bindgen(js_name = cioForm)]
pub fn cio_form(selector: &str, options: JsValue) -> Result<u32, JsValue> {
	let bound = settings_from_js(&options)
		.and_then(|settings| attach_forms(selector, &settings, |form| js_hooks(&options, form)))
		.map_err(|error| {
			error_log!("cioForm({}) failed: {}", selector, error);
			JsValue::from_str(&error.to_string())
		})?;
	Ok(u32::try_from(bound.len()).unwrap_or(u32::MAX))
}
