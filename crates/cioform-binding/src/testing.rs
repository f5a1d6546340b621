//! Native test doubles for driving bindings without a browser.
//!
//! [`TestHarness`] wires the doubles together. Its [`StepTimer`] advances
//! the shared [`ManualClock`] on every sleep, and [`RecordingSink`] judges
//! readiness against that clock, so "the sink loads 30ms from now" resolves
//! after exactly three polling intervals without any real waiting.
//!
//! ```ignore
//! use cioform_binding::testing::{MockForm, TestHarness};
//! use std::time::Duration;
//!
//! let harness = TestHarness::new();
//! harness.sink.ready_after(Duration::from_millis(30));
//! let binding = FormBinding::new(Rc::new(form), settings, hooks, harness.env())?;
//! binding.submit().await?;
//! assert_eq!(harness.timer.sleeps(), 3);
//! ```

use crate::cookies::MemoryCookieJar;
use crate::element::{ElementKey, FormControl, FormElement};
use crate::env::{BindingEnv, Clock, Timer};
use crate::sink::{IdentitySink, SinkProbe};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use cioform_core::{AttributeRecord, FormError, FormResult};
use futures::future::{self, LocalBoxFuture};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

/// Something the binding did to a [`MockForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
	/// An attribute of the form element was written.
	SetAttribute {
		/// Attribute name.
		name: String,
		/// New value.
		value: String,
	},
	/// An attribute of the form element was removed.
	RemoveAttribute {
		/// Attribute name.
		name: String,
	},
	/// A control value was written.
	SetControlValue {
		/// Control position.
		index: usize,
		/// New value.
		value: String,
	},
	/// The native submission ran.
	Submitted {
		/// The form `action` at the moment of submission.
		action: Option<String>,
	},
}

/// An in-memory form element.
#[derive(Debug)]
pub struct MockForm {
	key: ElementKey,
	controls: RefCell<Vec<FormControl>>,
	attributes: RefCell<IndexMap<String, String>>,
	events: RefCell<Vec<FormEvent>>,
	submit_failure: RefCell<Option<String>>,
}

impl MockForm {
	/// An empty form identified by `key`.
	pub fn new(key: &str) -> Self {
		Self {
			key: ElementKey::new(key),
			controls: RefCell::new(Vec::new()),
			attributes: RefCell::new(IndexMap::new()),
			events: RefCell::new(Vec::new()),
			submit_failure: RefCell::new(None),
		}
	}

	/// Sets the `action` attribute the page was served with.
	pub fn with_action(self, action: &str) -> Self {
		self.attributes
			.borrow_mut()
			.insert("action".to_string(), action.to_string());
		self
	}

	/// Appends a control.
	pub fn with_control(self, control: FormControl) -> Self {
		self.push_control(control);
		self
	}

	/// Appends a control to an already shared form.
	pub fn push_control(&self, control: FormControl) {
		self.controls.borrow_mut().push(control);
	}

	/// Types into the first control named `name`.
	pub fn fill(&self, name: &str, value: &str) {
		if let Some(control) = self
			.controls
			.borrow_mut()
			.iter_mut()
			.find(|control| control.name == name)
		{
			control.value = value.to_string();
		}
	}

	/// Ticks or unticks the first control named `name`.
	pub fn check(&self, name: &str, checked: bool) {
		if let Some(control) = self
			.controls
			.borrow_mut()
			.iter_mut()
			.find(|control| control.name == name)
		{
			control.checked = checked;
		}
	}

	/// Makes every later native submission fail with a DOM error.
	pub fn fail_submit(&self, message: &str) {
		*self.submit_failure.borrow_mut() = Some(message.to_string());
	}

	/// Everything the binding did to the form, oldest first.
	pub fn events(&self) -> Vec<FormEvent> {
		self.events.borrow().clone()
	}

	/// The `action` seen by each native submission.
	pub fn submissions(&self) -> Vec<Option<String>> {
		self.events
			.borrow()
			.iter()
			.filter_map(|event| match event {
				FormEvent::Submitted { action } => Some(action.clone()),
				_ => None,
			})
			.collect()
	}
}

impl FormElement for MockForm {
	fn key(&self) -> ElementKey {
		self.key.clone()
	}

	fn controls(&self) -> Vec<FormControl> {
		self.controls.borrow().clone()
	}

	fn set_control_value(&self, index: usize, value: &str) -> FormResult<()> {
		let mut controls = self.controls.borrow_mut();
		let control = controls
			.get_mut(index)
			.ok_or_else(|| FormError::Dom(format!("no control at index {index}")))?;
		control.value = value.to_string();
		self.events.borrow_mut().push(FormEvent::SetControlValue {
			index,
			value: value.to_string(),
		});
		Ok(())
	}

	fn attribute(&self, name: &str) -> Option<String> {
		self.attributes.borrow().get(name).cloned()
	}

	fn set_attribute(&self, name: &str, value: &str) -> FormResult<()> {
		self.attributes
			.borrow_mut()
			.insert(name.to_string(), value.to_string());
		self.events.borrow_mut().push(FormEvent::SetAttribute {
			name: name.to_string(),
			value: value.to_string(),
		});
		Ok(())
	}

	fn remove_attribute(&self, name: &str) -> FormResult<()> {
		self.attributes.borrow_mut().shift_remove(name);
		self.events.borrow_mut().push(FormEvent::RemoveAttribute {
			name: name.to_string(),
		});
		Ok(())
	}

	fn submit(&self) -> FormResult<()> {
		if let Some(message) = self.submit_failure.borrow().clone() {
			return Err(FormError::Dom(message));
		}
		let action = self.attribute("action");
		self.events
			.borrow_mut()
			.push(FormEvent::Submitted { action });
		Ok(())
	}
}

/// Which sink entry point received a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentVia {
	/// [`IdentitySink::identify`].
	Direct,
	/// [`IdentitySink::identify_alternate`] with the given id.
	Alternate {
		/// The id passed alongside the record.
		id: Option<String>,
	},
}

/// A record received by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentRecord {
	/// Entry point used.
	pub via: SentVia,
	/// The record as received.
	pub record: AttributeRecord,
}

/// An identity sink that records what it receives.
///
/// The direct handle becomes ready at a configurable instant of the shared
/// clock; by default it is ready from the start.
pub struct RecordingSink {
	clock: Rc<dyn Clock>,
	ready_at: Cell<Option<DateTime<Utc>>>,
	alternate: Cell<bool>,
	failure: RefCell<Option<String>>,
	probes: Cell<u32>,
	sent: RefCell<Vec<SentRecord>>,
}

impl RecordingSink {
	/// A sink that is ready immediately.
	pub fn new(clock: Rc<dyn Clock>) -> Self {
		let now = clock.now();
		Self {
			clock,
			ready_at: Cell::new(Some(now)),
			alternate: Cell::new(false),
			failure: RefCell::new(None),
			probes: Cell::new(0),
			sent: RefCell::new(Vec::new()),
		}
	}

	/// The direct handle appears `delay` after the clock's current time.
	pub fn ready_after(&self, delay: Duration) {
		let delay = TimeDelta::from_std(delay).unwrap_or_else(|_| TimeDelta::max_value());
		self.ready_at.set(self.clock.now().checked_add_signed(delay));
	}

	/// The direct handle never appears.
	pub fn never_ready(&self) {
		self.ready_at.set(None);
	}

	/// Turns the alternate integration on or off.
	pub fn set_alternate(&self, active: bool) {
		self.alternate.set(active);
	}

	/// Makes every following identify call fail with `message`.
	pub fn fail_with(&self, message: &str) {
		*self.failure.borrow_mut() = Some(message.to_string());
	}

	/// Number of probe calls so far.
	pub fn probes(&self) -> u32 {
		self.probes.get()
	}

	/// Records received so far.
	pub fn sent(&self) -> Vec<SentRecord> {
		self.sent.borrow().clone()
	}

	fn record(&self, via: SentVia, record: &AttributeRecord) -> FormResult<()> {
		if let Some(message) = self.failure.borrow().as_ref() {
			return Err(FormError::Sink(message.clone()));
		}
		self.sent.borrow_mut().push(SentRecord {
			via,
			record: record.clone(),
		});
		Ok(())
	}
}

impl IdentitySink for RecordingSink {
	fn probe(&self) -> SinkProbe {
		self.probes.set(self.probes.get() + 1);
		SinkProbe {
			alternate: self.alternate.get(),
			direct: self
				.ready_at
				.get()
				.is_some_and(|ready_at| self.clock.now() >= ready_at),
		}
	}

	fn identify(&self, record: &AttributeRecord) -> FormResult<()> {
		self.record(SentVia::Direct, record)
	}

	fn identify_alternate(&self, id: Option<&str>, record: &AttributeRecord) -> FormResult<()> {
		self.record(
			SentVia::Alternate {
				id: id.map(str::to_string),
			},
			record,
		)
	}
}

impl std::fmt::Debug for RecordingSink {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RecordingSink")
			.field("ready_at", &self.ready_at.get())
			.field("alternate", &self.alternate.get())
			.field("sent", &self.sent.borrow().len())
			.finish_non_exhaustive()
	}
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
	now: Cell<DateTime<Utc>>,
}

impl ManualClock {
	/// A clock stopped at `at`.
	pub fn new(at: DateTime<Utc>) -> Self {
		Self { now: Cell::new(at) }
	}

	/// Moves the clock forward.
	pub fn advance(&self, by: TimeDelta) {
		self.now.set(self.now.get() + by);
	}

	/// Jumps to `at`.
	pub fn set(&self, at: DateTime<Utc>) {
		self.now.set(at);
	}
}

impl Default for ManualClock {
	/// Stopped at 2026-10-18 09:30:00 UTC.
	fn default() -> Self {
		Self::new(
			Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0)
				.single()
				.unwrap_or_default(),
		)
	}
}

impl Clock for ManualClock {
	fn now(&self) -> DateTime<Utc> {
		self.now.get()
	}
}

/// A timer whose sleeps complete at once.
///
/// When built with [`StepTimer::with_clock`] each sleep advances the clock
/// by the requested duration.
#[derive(Debug, Default)]
pub struct StepTimer {
	clock: Option<Rc<ManualClock>>,
	sleeps: Cell<usize>,
	slept: Cell<Duration>,
}

impl StepTimer {
	/// A timer that only counts.
	pub fn new() -> Self {
		Self::default()
	}

	/// A timer that advances `clock` on every sleep.
	pub fn with_clock(clock: Rc<ManualClock>) -> Self {
		Self {
			clock: Some(clock),
			..Self::default()
		}
	}

	/// Number of sleeps so far.
	pub fn sleeps(&self) -> usize {
		self.sleeps.get()
	}

	/// Total duration slept.
	pub fn slept(&self) -> Duration {
		self.slept.get()
	}
}

impl Timer for StepTimer {
	fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
		self.sleeps.set(self.sleeps.get() + 1);
		self.slept.set(self.slept.get() + duration);
		if let Some(clock) = &self.clock {
			clock.advance(TimeDelta::from_std(duration).unwrap_or_else(|_| TimeDelta::max_value()));
		}
		Box::pin(future::ready(()))
	}
}

/// The doubles wired into one [`BindingEnv`].
#[derive(Debug)]
pub struct TestHarness {
	/// Shared clock.
	pub clock: Rc<ManualClock>,
	/// Recording sink, ready immediately unless reconfigured.
	pub sink: Rc<RecordingSink>,
	/// In-memory cookie jar.
	pub jar: Rc<MemoryCookieJar>,
	/// Timer that advances [`TestHarness::clock`].
	pub timer: Rc<StepTimer>,
}

impl TestHarness {
	/// Fresh doubles around a [`ManualClock::default`].
	pub fn new() -> Self {
		let clock = Rc::new(ManualClock::default());
		Self {
			sink: Rc::new(RecordingSink::new(clock.clone())),
			jar: Rc::new(MemoryCookieJar::new(clock.clone())),
			timer: Rc::new(StepTimer::with_clock(clock.clone())),
			clock,
		}
	}

	/// An environment over the harness doubles.
	pub fn env(&self) -> BindingEnv {
		self.env_with_timer(self.timer.clone())
	}

	/// An environment over the harness doubles with a different timer.
	pub fn env_with_timer(&self, timer: Rc<dyn Timer>) -> BindingEnv {
		BindingEnv::new(self.sink.clone(), self.jar.clone(), self.clock.clone(), timer)
	}
}

impl Default for TestHarness {
	fn default() -> Self {
		Self::new()
	}
}
