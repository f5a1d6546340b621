//! End-to-end submissions against the native test doubles.

use cioform_binding::testing::{FormEvent, MockForm, SentVia, TestHarness};
use cioform_binding::{
	CookieJar, FormBinding, FormControl, FormElement, FormRegistry, Hooks, SubmissionState,
	SubmitOutcome, TokioTimer,
};
use cioform_core::{AttributeRecord, AttributeValue, FormError, FormSettings};
use rstest::{fixture, rstest};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[fixture]
fn harness() -> TestHarness {
	TestHarness::new()
}

fn newsletter_form() -> Rc<MockForm> {
	Rc::new(
		MockForm::new("newsletter")
			.with_action("/subscribed")
			.with_control(FormControl::text("email", "x@y.com"))
			.with_control(FormControl::text("name", "X"))
			.with_control(FormControl::submit("", "Subscribe")),
	)
}

fn bind(harness: &TestHarness, form: &Rc<MockForm>, settings: FormSettings, hooks: Hooks) -> FormBinding {
	let element: Rc<dyn FormElement> = form.clone();
	FormBinding::new(element, settings, hooks, harness.env()).unwrap()
}

#[rstest]
#[tokio::test]
async fn test_submit_sends_record_and_completes(harness: TestHarness) {
	let form = newsletter_form();
	let succeeded = Rc::new(RefCell::new(None));
	let hooks = {
		let succeeded = succeeded.clone();
		Hooks::new().success(move |_, record| *succeeded.borrow_mut() = Some(record))
	};
	let binding = bind(&harness, &form, FormSettings::default(), hooks);

	let outcome = binding.submit().await.unwrap();

	assert_eq!(outcome, SubmitOutcome::Submitted);
	let sent = harness.sink.sent();
	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].via, SentVia::Direct);

	let record = &sent[0].record;
	assert_eq!(record.get_text("email"), Some("x@y.com"));
	assert_eq!(record.get_text("name"), Some("X"));
	assert_eq!(record.get_text("id"), Some("x_y_com"));
	assert!(
		record
			.get("created_at")
			.and_then(AttributeValue::as_integer)
			.is_some_and(|created_at| created_at > 0)
	);

	assert!(binding.has_filled());
	assert_eq!(succeeded.borrow().as_ref(), Some(record));

	// The action is back in place before the native submission runs.
	let events = form.events();
	let restored = events
		.iter()
		.position(|event| {
			*event
				== FormEvent::SetAttribute {
					name: "action".to_string(),
					value: "/subscribed".to_string(),
				}
		})
		.unwrap();
	let submitted = events
		.iter()
		.position(|event| matches!(event, FormEvent::Submitted { .. }))
		.unwrap();
	assert!(restored < submitted);
	assert_eq!(form.submissions(), vec![Some("/subscribed".to_string())]);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(5)]
#[tokio::test]
async fn test_submit_waits_for_sink(harness: TestHarness, #[case] intervals: u32) {
	harness
		.sink
		.ready_after(Duration::from_millis(10) * intervals);
	let binding = bind(&harness, &newsletter_form(), FormSettings::default(), Hooks::new());

	assert_eq!(binding.submit().await, Ok(SubmitOutcome::Submitted));
	assert_eq!(harness.timer.sleeps(), intervals as usize);
	assert_eq!(harness.sink.sent().len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_empty_form_fires_error_hook_and_writes_no_cookie(harness: TestHarness) {
	let form = Rc::new(MockForm::new("empty").with_control(FormControl::submit("go", "Go")));
	let errors = Rc::new(RefCell::new(Vec::new()));
	let hooks = {
		let errors = errors.clone();
		Hooks::new().error(move |_, error| errors.borrow_mut().push(error))
	};
	let settings = FormSettings::default().with_created_at(false);
	let binding = bind(&harness, &form, settings, hooks);

	assert_eq!(binding.submit().await, Err(FormError::MalformedPayload));
	assert_eq!(*errors.borrow(), vec![FormError::MalformedPayload]);
	assert_eq!(binding.state(), SubmissionState::SendFailed);
	assert!(harness.jar.header().is_empty());
	assert!(form.submissions().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_remote_mode_defers_native_submit(harness: TestHarness) {
	let form = newsletter_form();
	let binding = bind(&harness, &form, FormSettings::default().with_remote(true), Hooks::new());

	assert_eq!(binding.submit().await, Ok(SubmitOutcome::Deferred));
	assert!(binding.has_filled());
	assert_eq!(form.attribute("action"), Some("/subscribed".to_string()));
	assert!(form.submissions().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_alternate_integration_detected_at_submit(harness: TestHarness) {
	let binding = bind(&harness, &newsletter_form(), FormSettings::default(), Hooks::new());
	assert!(!binding.is_alternate());

	// Segment finished loading after the form was bound.
	harness.sink.set_alternate(true);
	harness.sink.never_ready();
	binding.submit().await.unwrap();

	assert!(binding.is_alternate());
	assert_eq!(
		harness.sink.sent()[0].via,
		SentVia::Alternate {
			id: Some("x_y_com".to_string())
		}
	);
	assert_eq!(harness.timer.sleeps(), 0);
}

#[rstest]
#[tokio::test]
async fn test_bounded_wait_times_out(harness: TestHarness) {
	harness.sink.never_ready();
	let errors = Rc::new(RefCell::new(Vec::new()));
	let hooks = {
		let errors = errors.clone();
		Hooks::new().error(move |_, error| errors.borrow_mut().push(error))
	};
	let settings = FormSettings::default().with_ready_timeout(Duration::from_millis(50));
	let binding = bind(&harness, &newsletter_form(), settings, hooks);

	let expected = FormError::ReadyTimeout { waited_ms: 50 };
	assert_eq!(binding.submit().await, Err(expected.clone()));
	assert_eq!(binding.state(), SubmissionState::ReadyTimedOut);
	assert_eq!(*errors.borrow(), vec![expected]);
	assert!(!binding.has_filled());
}

#[rstest]
#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_second_submit_while_waiting_is_refused(harness: TestHarness) {
	harness.sink.never_ready();
	let errors = Rc::new(RefCell::new(Vec::new()));
	let hooks = {
		let errors = errors.clone();
		Hooks::new().error(move |_, error| errors.borrow_mut().push(error))
	};
	let form = newsletter_form();
	let element: Rc<dyn FormElement> = form.clone();
	let binding =
		FormBinding::new(element, FormSettings::default(), hooks, harness.env_with_timer(Rc::new(TokioTimer)))
			.unwrap();

	let local = tokio::task::LocalSet::new();
	local
		.run_until(async {
			let first = tokio::task::spawn_local({
				let binding = binding.clone();
				async move { binding.submit().await }
			});
			tokio::time::sleep(Duration::from_millis(25)).await;

			assert_eq!(binding.state(), SubmissionState::AwaitingReady);
			assert_eq!(binding.submit().await, Ok(SubmitOutcome::InFlight));

			assert!(binding.cancel_pending());
			assert_eq!(first.await.unwrap(), Err(FormError::Cancelled));
		})
		.await;

	assert_eq!(binding.state(), SubmissionState::Cancelled);
	assert_eq!(harness.sink.sent().len(), 1);
	assert!(errors.borrow().is_empty());
	assert!(form.submissions().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_resubmit_rebuilds_record(harness: TestHarness) {
	let form = newsletter_form();
	let binding = bind(&harness, &form, FormSettings::default(), Hooks::new());
	binding.submit().await.unwrap();

	binding.set("stale", "yes");
	form.fill("email", "z@w.org");
	binding.submit().await.unwrap();

	let sent = harness.sink.sent();
	assert_eq!(sent.len(), 2);
	assert_eq!(sent[1].record.get_text("id"), Some("z_w_org"));
	assert!(!sent[1].record.contains("stale"));
}

#[rstest]
fn test_registry_attach_is_idempotent(harness: TestHarness) {
	let fired = Rc::new(RefCell::new(Vec::new()));
	let hooks = {
		let (load, open) = (fired.clone(), fired.clone());
		Hooks::new()
			.on_load(move |binding| load.borrow_mut().push(format!("load:{}", binding.key())))
			.uncompleted(move |binding| open.borrow_mut().push(format!("open:{}", binding.key())))
	};
	let form: Rc<dyn FormElement> = newsletter_form();
	let mut registry = FormRegistry::new();

	let first = registry
		.attach([form.clone()], &FormSettings::default(), &hooks, &harness.env())
		.unwrap();
	let second = registry
		.attach([form], &FormSettings::default(), &hooks, &harness.env())
		.unwrap();

	assert!(first[0].ptr_eq(&second[0]));
	assert_eq!(registry.len(), 1);
	assert_eq!(*fired.borrow(), vec!["load:newsletter", "open:newsletter"]);
}

#[rstest]
fn test_completion_cookie_survives_rebind(harness: TestHarness) {
	let binding = bind(&harness, &newsletter_form(), FormSettings::default(), Hooks::new());
	binding.set_cookie(None, None, None).unwrap();

	let completed = Rc::new(RefCell::new(false));
	let hooks = {
		let completed = completed.clone();
		Hooks::new().completed(move |_| *completed.borrow_mut() = true)
	};
	let other = Rc::new(MockForm::new("other").with_control(FormControl::text("email", "q@r.s")));
	bind(&harness, &other, FormSettings::default(), hooks);

	assert!(*completed.borrow());
	assert_eq!(binding.get_cookie(None).unwrap(), Some("true".to_string()));

	binding.remove_cookie(None).unwrap();
	assert!(!binding.has_filled());
}

#[rstest]
fn test_override_record_is_sent_as_is(harness: TestHarness) {
	let binding = bind(&harness, &newsletter_form(), FormSettings::default(), Hooks::new());
	let record: AttributeRecord = [("id", "crm-7"), ("plan", "pro")].into_iter().collect();

	binding.send(Some(record.clone())).unwrap();

	assert!(binding.is_sent());
	assert_eq!(harness.sink.sent()[0].record, record);
}

#[rstest]
fn test_oversized_cookie_lifetime_is_rejected(harness: TestHarness) {
	let form: Rc<dyn FormElement> = newsletter_form();
	let settings = FormSettings::from_json(r#"{"cookie": {"expire": 1000000000000}}"#);
	assert!(matches!(settings, Err(FormError::InvalidSettings(_))));

	let binding = FormBinding::new(form, FormSettings::default(), Hooks::new(), harness.env()).unwrap();
	assert_eq!(
		binding.set_cookie(None, None, Some(i64::MAX)),
		Err(FormError::CookieExpiry(i64::MAX))
	);
	assert!(!binding.has_filled());
}

#[rstest]
fn test_send_without_record_on_empty_form_fires_error_hook(harness: TestHarness) {
	let form = Rc::new(MockForm::new("empty"));
	let errors = Rc::new(RefCell::new(Vec::new()));
	let hooks = {
		let errors = errors.clone();
		Hooks::new().error(move |_, error| errors.borrow_mut().push(error))
	};
	let binding = bind(&harness, &form, FormSettings::default(), hooks);

	assert_eq!(binding.send(None), Err(FormError::MalformedPayload));
	assert_eq!(*errors.borrow(), vec![FormError::MalformedPayload]);
	assert!(harness.jar.header().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_failed_native_submit_fires_error_hook(harness: TestHarness) {
	let form = newsletter_form();
	form.fail_submit("form detached");
	let errors = Rc::new(RefCell::new(Vec::new()));
	let hooks = {
		let errors = errors.clone();
		Hooks::new().error(move |_, error| errors.borrow_mut().push(error))
	};
	let binding = bind(&harness, &form, FormSettings::default(), hooks);

	let expected = FormError::Dom("form detached".to_string());
	assert_eq!(binding.submit().await, Err(expected.clone()));
	assert_eq!(binding.state(), SubmissionState::SubmitFailed);
	assert_eq!(*errors.borrow(), vec![expected]);
	// The sink already has the record, so completion still stands.
	assert!(binding.has_filled());
	assert!(form.submissions().is_empty());
}
