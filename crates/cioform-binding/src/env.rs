//! Injected collaborators: clock, timer and the bundle handed to bindings.

use crate::cookies::CookieJar;
use crate::sink::IdentitySink;
use chrono::{DateTime, Utc};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::time::Duration;

/// Source of the current time.
pub trait Clock {
	/// The current instant.
	fn now(&self) -> DateTime<Utc>;

	/// The current time in epoch seconds, rounded to the nearest second.
	fn epoch_seconds(&self) -> i64 {
		(self.now().timestamp_millis() + 500).div_euclid(1000)
	}
}

/// Wall clock of the host platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	#[cfg(not(target_arch = "wasm32"))]
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}

	#[cfg(target_arch = "wasm32")]
	fn now(&self) -> DateTime<Utc> {
		DateTime::from_timestamp_millis(js_sys::Date::now() as i64).unwrap_or_default()
	}
}

/// Schedules a wake-up after a delay.
///
/// The readiness wait yields through this trait between checks, so it
/// never blocks the event loop.
pub trait Timer {
	/// Resolves once `duration` has elapsed.
	fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

/// Timer backed by `tokio::time`.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

#[cfg(not(target_arch = "wasm32"))]
impl Timer for TokioTimer {
	fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
		Box::pin(tokio::time::sleep(duration))
	}
}

/// Everything a binding needs from its surroundings.
#[derive(Clone)]
pub struct BindingEnv {
	/// Where records are sent.
	pub sink: Rc<dyn IdentitySink>,
	/// The document cookie store.
	pub cookies: Rc<dyn CookieJar>,
	/// Time source for timestamps and cookie expiry.
	pub clock: Rc<dyn Clock>,
	/// Delay source for the readiness wait.
	pub timer: Rc<dyn Timer>,
}

impl BindingEnv {
	/// Bundles the collaborators.
	pub fn new(
		sink: Rc<dyn IdentitySink>,
		cookies: Rc<dyn CookieJar>,
		clock: Rc<dyn Clock>,
		timer: Rc<dyn Timer>,
	) -> Self {
		Self {
			sink,
			cookies,
			clock,
			timer,
		}
	}
}

impl std::fmt::Debug for BindingEnv {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BindingEnv")
			.field("sink", &"<dyn IdentitySink>")
			.field("cookies", &"<dyn CookieJar>")
			.field("clock", &"<dyn Clock>")
			.field("timer", &"<dyn Timer>")
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::ManualClock;
	use chrono::TimeZone;
	use rstest::rstest;

	#[rstest]
	#[case(0, 1_700_000_000)]
	#[case(499, 1_700_000_000)]
	#[case(500, 1_700_000_001)]
	#[case(999, 1_700_000_001)]
	fn test_epoch_seconds_rounds(#[case] millis: u32, #[case] expected: i64) {
		let at = Utc.timestamp_opt(1_700_000_000, millis * 1_000_000).unwrap();
		let clock = ManualClock::new(at);
		assert_eq!(clock.epoch_seconds(), expected);
	}

	#[tokio::test(start_paused = true)]
	async fn test_tokio_timer_sleeps_for_duration() {
		let start = tokio::time::Instant::now();
		TokioTimer.sleep(Duration::from_millis(10)).await;
		assert_eq!(start.elapsed(), Duration::from_millis(10));
	}
}
