//! Form binding and submission state machine.
//!
//! A [`FormBinding`] owns one form element. It intercepts the native
//! submission, collects the form into an [`AttributeRecord`], forwards the
//! record to the identity sink, waits for the sink to become ready, then
//! marks the form as completed and lets the real submission through.
//!
//! ## Submission flow
//!
//! ```text
//! Idle ──► AttributesCollected ──► PreSendHookRun ──► Sent ──► AwaitingReady ──► Completed
//!                                         │                          │
//!                                         ▼                          ├──► ReadyTimedOut
//!                                    SendFailed                      └──► Cancelled
//! ```
//!
//! On `Completed` the binding writes the completion cookie, fires the
//! `success` hook, restores the form `action` and, unless `remote` is set,
//! runs the native submission.
//!
//! ## Example
//!
//! ```ignore
//! use cioform_binding::{FormBinding, Hooks};
//! use cioform_core::FormSettings;
//!
//! let binding = FormBinding::new(form, FormSettings::default(), Hooks::new(), env)?;
//! let outcome = binding.submit().await?;
//! ```

use crate::cookies::CookieStore;
use crate::element::{ElementKey, FormElement};
use crate::env::BindingEnv;
use crate::hooks::Hooks;
use crate::readiness::{ReadinessWait, ReadyOptions, ReadyReport, WaitHandle};
use crate::{debug_log, error_log, info_log, warn_log};
use cioform_core::record::ID_KEY;
use cioform_core::{AttributeRecord, AttributeValue, FormError, FormResult, FormSettings};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Where a submission currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionState {
	/// No submission running.
	#[default]
	Idle,
	/// The record was rebuilt from the form controls.
	AttributesCollected,
	/// The `before` hook has run.
	PreSendHookRun,
	/// The record was handed to the sink.
	Sent,
	/// Waiting for the sink to report ready.
	AwaitingReady,
	/// Cookie written, success hook fired, action restored.
	Completed,
	/// The send was rejected. Terminal.
	SendFailed,
	/// The bounded readiness wait expired. Terminal.
	ReadyTimedOut,
	/// The readiness wait was cancelled. Terminal.
	Cancelled,
	/// Completion ran but the native submission failed. Terminal.
	SubmitFailed,
}

impl SubmissionState {
	/// Returns true while a submission is between collection and completion.
	pub fn is_in_flight(self) -> bool {
		matches!(
			self,
			Self::AttributesCollected | Self::PreSendHookRun | Self::Sent | Self::AwaitingReady
		)
	}
}

/// How a submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
	/// Completed and the native submission ran.
	Submitted,
	/// Completed in remote mode; the native submission is left to the caller.
	Deferred,
	/// Refused because another submission is still in flight.
	InFlight,
}

/// Binds one form element to the identity sink.
///
/// Cloning is cheap and yields a handle to the same binding.
#[derive(Clone)]
pub struct FormBinding {
	inner: Rc<Inner>,
}

struct Inner {
	key: ElementKey,
	element: Rc<dyn FormElement>,
	settings: FormSettings,
	hooks: Hooks,
	env: BindingEnv,
	cookies: CookieStore,
	attributes: RefCell<AttributeRecord>,
	original_action: RefCell<Option<String>>,
	success: Cell<bool>,
	alternate: Cell<bool>,
	state: Cell<SubmissionState>,
	pending: RefCell<Option<WaitHandle>>,
}

impl FormBinding {
	/// Binds `element` and runs bind-time initialization.
	///
	/// Initialization checks the alternate integration, fires `on_load`,
	/// captures and strips the form `action`, then fires `completed` when a
	/// `completed` hook exists and the form was already filled, or
	/// `uncompleted` otherwise.
	pub fn new(
		element: Rc<dyn FormElement>,
		settings: FormSettings,
		hooks: Hooks,
		env: BindingEnv,
	) -> FormResult<Self> {
		settings.validate()?;

		let cookies = CookieStore::new(
			Rc::clone(&env.cookies),
			Rc::clone(&env.clock),
			settings.cookie.clone(),
		);
		let binding = Self {
			inner: Rc::new(Inner {
				key: element.key(),
				element,
				settings,
				hooks,
				env,
				cookies,
				attributes: RefCell::new(AttributeRecord::new()),
				original_action: RefCell::new(None),
				success: Cell::new(false),
				alternate: Cell::new(false),
				state: Cell::new(SubmissionState::Idle),
				pending: RefCell::new(None),
			}),
		};
		binding.initialize()?;
		Ok(binding)
	}

	fn initialize(&self) -> FormResult<()> {
		self.refresh_alternate();

		if let Some(hook) = &self.inner.hooks.on_load {
			hook.call(self, ());
		}

		self.capture_action()?;

		match &self.inner.hooks.completed {
			Some(completed) if self.has_filled() => {
				debug_log!("form {} already completed", self.inner.key);
				completed.call(self, ());
			}
			_ => {
				if let Some(uncompleted) = &self.inner.hooks.uncompleted {
					uncompleted.call(self, ());
				}
			}
		}

		info_log!("bound form {}", self.inner.key);
		Ok(())
	}

	/// The bound element's key.
	pub fn key(&self) -> &ElementKey {
		&self.inner.key
	}

	/// The settings snapshot taken at bind time.
	pub fn settings(&self) -> &FormSettings {
		&self.inner.settings
	}

	/// The bound element.
	pub fn element(&self) -> &Rc<dyn FormElement> {
		&self.inner.element
	}

	/// Current submission state.
	pub fn state(&self) -> SubmissionState {
		self.inner.state.get()
	}

	/// Whether records are routed through the alternate integration.
	pub fn is_alternate(&self) -> bool {
		self.inner.alternate.get()
	}

	/// Whether the last send was accepted by the sink.
	pub fn is_sent(&self) -> bool {
		self.inner.success.get()
	}

	/// The form `action` captured at bind time.
	pub fn original_action(&self) -> Option<String> {
		self.inner.original_action.borrow().clone()
	}

	/// Returns true if both handles point at the same binding.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	// Record

	/// Reads one attribute.
	pub fn get(&self, key: &str) -> Option<AttributeValue> {
		self.inner.attributes.borrow().get(key).cloned()
	}

	/// Writes one attribute and returns the stored value.
	pub fn set(&self, key: impl Into<String>, value: impl Into<AttributeValue>) -> AttributeValue {
		self.inner.attributes.borrow_mut().set(key, value).clone()
	}

	/// Removes one attribute and returns the remaining record.
	pub fn unset(&self, key: &str) -> AttributeRecord {
		let mut attributes = self.inner.attributes.borrow_mut();
		attributes.unset(key);
		attributes.clone()
	}

	/// A copy of the current record.
	pub fn attributes(&self) -> AttributeRecord {
		self.inner.attributes.borrow().clone()
	}

	/// Reads the form controls into a fresh record without storing it.
	///
	/// Submit buttons and unnamed controls are skipped. Checkboxes and
	/// radios contribute `"true"` or `"false"`.
	pub fn read_controls(&self) -> AttributeRecord {
		self.inner
			.element
			.controls()
			.into_iter()
			.filter(|control| !control.is_submit() && !control.name.is_empty())
			.map(|control| {
				let value = control.attribute_value();
				(control.name, value)
			})
			.collect()
	}

	/// Rebuilds the record from the form, then stamps `id` and `created_at`.
	pub fn collect_attributes(&self) -> AttributeRecord {
		let record = self.read_controls();
		debug_log!("form {} collected {} controls", self.inner.key, record.len());
		*self.inner.attributes.borrow_mut() = record;

		self.set_id(None);
		self.set_timestamp();
		self.attributes()
	}

	/// Resolves the `id` attribute.
	///
	/// `id` wins when non-empty, then a non-empty `id` already in the
	/// record, then an id derived from `email`.
	pub fn set_id(&self, id: Option<&str>) -> Option<String> {
		let mut attributes = self.inner.attributes.borrow_mut();
		let existing = attributes.get_text(ID_KEY).map(str::to_string);
		let explicit = id.filter(|id| !id.is_empty()).or(existing.as_deref());
		attributes.apply_id(explicit)
	}

	/// Stamps `created_at` unless disabled in the settings.
	pub fn set_timestamp(&self) -> Option<i64> {
		if !self.inner.settings.created_at {
			return None;
		}
		let now = self.inner.env.clock.epoch_seconds();
		self.inner.attributes.borrow_mut().stamp_created_at(now);
		Some(now)
	}

	/// Clears non-hidden inputs and selects.
	pub fn reset(&self) -> FormResult<()> {
		let controls = self.inner.element.controls();
		for (index, control) in controls.iter().enumerate() {
			if control.is_resettable() {
				self.inner.element.set_control_value(index, "")?;
			}
		}
		debug_log!("form {} reset", self.inner.key);
		Ok(())
	}

	// Form action

	/// Captures the form `action` attribute and strips it from the element.
	///
	/// Without an `action` the browser cannot navigate away before the
	/// record is sent. A present attribute is captured even when empty.
	pub fn capture_action(&self) -> FormResult<()> {
		if let Some(action) = self.inner.element.attribute("action") {
			*self.inner.original_action.borrow_mut() = Some(action);
		}
		self.inner.element.remove_attribute("action")
	}

	/// Puts an `action` attribute back on the form and returns it.
	///
	/// `action` wins when non-empty. Otherwise a captured attribute is
	/// restored as served, `action=""` included, and the `action` setting
	/// only applies to forms served without one.
	pub fn restore_action(&self, action: Option<&str>) -> FormResult<String> {
		let resolved = action
			.filter(|action| !action.is_empty())
			.map(str::to_string)
			.or_else(|| self.original_action())
			.unwrap_or_else(|| self.inner.settings.action.clone());

		self.inner.element.set_attribute("action", &resolved)?;
		Ok(resolved)
	}

	/// Runs the native form submission directly.
	pub fn force_submit(&self) -> FormResult<()> {
		debug_log!("form {} native submit", self.inner.key);
		self.inner.element.submit()
	}

	// Completion cookie

	/// Reads a cookie. `None` reads the completion cookie.
	pub fn get_cookie(&self, name: Option<&str>) -> FormResult<Option<String>> {
		self.inner.cookies.get(name)
	}

	/// Writes a cookie. Omitted arguments come from the cookie settings.
	pub fn set_cookie(&self, name: Option<&str>, value: Option<&str>, expire_days: Option<i64>) -> FormResult<()> {
		self.inner.cookies.set(name, value, expire_days)
	}

	/// Expires a cookie. `None` expires the completion cookie.
	pub fn remove_cookie(&self, name: Option<&str>) -> FormResult<()> {
		self.inner.cookies.remove(name)
	}

	/// Returns true if the completion cookie name occurs in the cookie header.
	pub fn has_filled(&self) -> bool {
		self.inner.cookies.has_filled()
	}

	// Submission

	/// Hands a record to the sink.
	///
	/// `None` sends the current record. The record goes through the
	/// alternate integration when it was detected, and to the direct handle
	/// otherwise. An empty record or a sink rejection fires the `error`
	/// hook before it is returned.
	pub fn send(&self, record: Option<AttributeRecord>) -> FormResult<()> {
		let record = record.unwrap_or_else(|| self.attributes());
		if let Err(error) = self.deliver(&record) {
			error_log!("form {} send failed: {}", self.inner.key, error);
			self.fail(error.clone());
			return Err(error);
		}

		self.inner.success.set(true);
		debug_log!("form {} sent {} attributes", self.inner.key, record.len());
		Ok(())
	}

	fn deliver(&self, record: &AttributeRecord) -> FormResult<()> {
		if record.is_empty() {
			return Err(FormError::MalformedPayload);
		}

		let sink = &self.inner.env.sink;
		if self.inner.alternate.get() {
			let id = record.get_text(ID_KEY).map(str::to_string);
			sink.identify_alternate(id.as_deref(), record)
		} else {
			sink.identify(record)
		}
	}

	/// Runs one submission from start to finish.
	///
	/// Errors that halt the submission fire the `error` hook before they are
	/// returned, except [`FormError::Cancelled`], which only ends the
	/// submission.
	pub async fn submit(&self) -> FormResult<SubmitOutcome> {
		if self.state().is_in_flight() {
			warn_log!(
				"form {} submit ignored: submission already {:?}",
				self.inner.key,
				self.state()
			);
			return Ok(SubmitOutcome::InFlight);
		}

		self.inner.success.set(false);
		self.transition(SubmissionState::Idle);

		self.collect_attributes();
		self.transition(SubmissionState::AttributesCollected);

		if let Some(before) = &self.inner.hooks.before {
			before.call(self, ());
		}
		self.transition(SubmissionState::PreSendHookRun);

		if let Err(error) = self.send(None) {
			self.transition(SubmissionState::SendFailed);
			return Err(error);
		}
		self.transition(SubmissionState::Sent);

		self.refresh_alternate();
		self.transition(SubmissionState::AwaitingReady);

		match self.await_ready().await {
			Ok(report) => {
				debug_log!(
					"form {} sink ready after {} checks ({:?})",
					self.inner.key,
					report.checks,
					report.waited
				);
			}
			Err(FormError::Cancelled) => {
				info_log!("form {} readiness wait cancelled", self.inner.key);
				self.transition(SubmissionState::Cancelled);
				return Err(FormError::Cancelled);
			}
			Err(error) => {
				error_log!("form {} gave up waiting: {}", self.inner.key, error);
				self.transition(SubmissionState::ReadyTimedOut);
				self.fail(error.clone());
				return Err(error);
			}
		}

		self.complete()
	}

	/// Aborts a pending readiness wait. Returns true if one was pending.
	pub fn cancel_pending(&self) -> bool {
		let pending = self.inner.pending.borrow().clone();
		match pending {
			Some(handle) => {
				handle.cancel();
				true
			}
			None => false,
		}
	}

	fn complete(&self) -> FormResult<SubmitOutcome> {
		if !self.inner.success.get() {
			// Nothing reached the sink; leave the form alone.
			return Err(FormError::MalformedPayload);
		}

		// Cookie and action failures are reported but do not undo a send the
		// sink already accepted.
		if let Err(error) = self.set_cookie(None, None, None) {
			warn_log!("form {} completion cookie not written: {}", self.inner.key, error);
		}

		if let Some(success) = &self.inner.hooks.success {
			success.call(self, self.attributes());
		}

		if let Err(error) = self.restore_action(None) {
			warn_log!("form {} action not restored: {}", self.inner.key, error);
		}

		self.transition(SubmissionState::Completed);

		if self.inner.settings.remote {
			debug_log!("form {} completed in remote mode", self.inner.key);
			return Ok(SubmitOutcome::Deferred);
		}

		if let Err(error) = self.force_submit() {
			error_log!("form {} native submit failed: {}", self.inner.key, error);
			self.transition(SubmissionState::SubmitFailed);
			self.fail(error.clone());
			return Err(error);
		}
		Ok(SubmitOutcome::Submitted)
	}

	async fn await_ready(&self) -> FormResult<ReadyReport> {
		let sink = Rc::clone(&self.inner.env.sink);
		let alternate = self.inner.alternate.get();
		let (wait, handle) = ReadinessWait::new(
			move || alternate || sink.probe().direct,
			Rc::clone(&self.inner.env.timer),
		)
		.with_options(ReadyOptions::from_settings(&self.inner.settings))
		.cancellable();

		*self.inner.pending.borrow_mut() = Some(handle);
		let result = wait.await;
		self.inner.pending.borrow_mut().take();
		result
	}

	// The alternate integration can load after bind time, so detection is
	// sticky and re-run on every submission.
	fn refresh_alternate(&self) {
		if !self.inner.alternate.get() && self.inner.env.sink.probe().alternate {
			debug_log!("form {} routing through the alternate integration", self.inner.key);
			self.inner.alternate.set(true);
		}
	}

	fn fail(&self, error: FormError) {
		if let Some(hook) = &self.inner.hooks.error {
			hook.call(self, error);
		}
	}

	fn transition(&self, next: SubmissionState) {
		let previous = self.inner.state.replace(next);
		debug_log!("form {} {:?} -> {:?}", self.inner.key, previous, next);
	}
}

impl fmt::Debug for FormBinding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FormBinding")
			.field("key", &self.inner.key)
			.field("state", &self.inner.state.get())
			.field("alternate", &self.inner.alternate.get())
			.field("attributes", &self.inner.attributes.borrow())
			.finish_non_exhaustive()
	}
}
