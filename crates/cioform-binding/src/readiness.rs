//! Waiting for the identity sink to become ready.
//!
//! The tracking library is loaded by a third-party script that may not have
//! run yet when the form is submitted. [`ReadinessWait`] polls a probe,
//! sleeping a fixed interval between checks through the injected
//! [`Timer`], until the probe reports ready.
//!
//! # Example
//!
//! ```ignore
//! use cioform_binding::readiness::ReadinessWait;
//! use std::time::Duration;
//!
//! let report = ReadinessWait::new(|| sink.probe().is_ready(), timer)
//!     .with_timeout(Duration::from_secs(5))
//!     .await?;
//! ```

use crate::env::Timer;
use cioform_core::{FormError, FormResult, FormSettings};
use futures::future::{AbortHandle, Abortable, LocalBoxFuture};
use futures::FutureExt;
use std::future::IntoFuture;
use std::rc::Rc;
use std::time::Duration;

/// Default interval between readiness checks (10ms).
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);

/// Options for the readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyOptions {
	/// Interval between checks.
	pub interval: Duration,
	/// Upper bound on the total time slept. `None` retries forever.
	pub timeout: Option<Duration>,
}

impl Default for ReadyOptions {
	fn default() -> Self {
		Self {
			interval: DEFAULT_INTERVAL,
			timeout: None,
		}
	}
}

impl ReadyOptions {
	/// Reads the wait options out of form settings.
	pub fn from_settings(settings: &FormSettings) -> Self {
		Self {
			interval: settings.ready_interval(),
			timeout: settings.ready_timeout(),
		}
	}
}

/// What a successful wait observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyReport {
	/// Number of probe calls, including the final successful one.
	pub checks: u32,
	/// Number of sleeps between checks.
	pub sleeps: u32,
	/// Total time slept.
	pub waited: Duration,
}

/// Polls a probe until it reports ready.
pub struct ReadinessWait<P>
where
	P: FnMut() -> bool,
{
	probe: P,
	timer: Rc<dyn Timer>,
	options: ReadyOptions,
}

impl<P> ReadinessWait<P>
where
	P: FnMut() -> bool,
{
	/// Creates a wait with default options.
	pub fn new(probe: P, timer: Rc<dyn Timer>) -> Self {
		Self {
			probe,
			timer,
			options: ReadyOptions::default(),
		}
	}

	/// Sets the polling interval.
	pub fn with_interval(mut self, interval: Duration) -> Self {
		self.options.interval = interval;
		self
	}

	/// Bounds the total time slept.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.options.timeout = Some(timeout);
		self
	}

	/// Replaces all options.
	pub fn with_options(mut self, options: ReadyOptions) -> Self {
		self.options = options;
		self
	}

	/// Runs the wait.
	///
	/// Resolves once, right after the first probe that reports ready. Fails
	/// with [`FormError::ReadyTimeout`] when a timeout is set and the time
	/// slept reaches it.
	pub async fn wait(mut self) -> FormResult<ReadyReport> {
		let mut report = ReadyReport {
			checks: 0,
			sleeps: 0,
			waited: Duration::ZERO,
		};

		loop {
			report.checks += 1;
			if (self.probe)() {
				return Ok(report);
			}

			if let Some(timeout) = self.options.timeout
				&& report.waited >= timeout
			{
				return Err(FormError::ReadyTimeout {
					waited_ms: u64::try_from(report.waited.as_millis()).unwrap_or(u64::MAX),
				});
			}

			self.timer.sleep(self.options.interval).await;
			report.sleeps += 1;
			report.waited += self.options.interval;
		}
	}
}

impl<P> ReadinessWait<P>
where
	P: FnMut() -> bool + 'static,
{
	/// Runs the wait as an abortable future.
	///
	/// Cancelling through the returned handle drops the pending sleep and
	/// resolves the future with [`FormError::Cancelled`].
	pub fn cancellable(self) -> (LocalBoxFuture<'static, FormResult<ReadyReport>>, WaitHandle) {
		let (abort, registration) = AbortHandle::new_pair();
		let future = Abortable::new(self.wait(), registration)
			.map(|result| result.unwrap_or(Err(FormError::Cancelled)))
			.boxed_local();
		(future, WaitHandle { abort })
	}
}

impl<P> IntoFuture for ReadinessWait<P>
where
	P: FnMut() -> bool + 'static,
{
	type Output = FormResult<ReadyReport>;
	type IntoFuture = LocalBoxFuture<'static, Self::Output>;

	fn into_future(self) -> Self::IntoFuture {
		self.wait().boxed_local()
	}
}

/// Cancels a wait started with [`ReadinessWait::cancellable`].
#[derive(Debug, Clone)]
pub struct WaitHandle {
	abort: AbortHandle,
}

impl WaitHandle {
	/// Aborts the wait. Safe to call more than once.
	pub fn cancel(&self) {
		self.abort.abort();
	}
}
