//! Logging macros that work on both WASM and native targets.
//!
//! ## Macro Overview
//!
//! | Macro | WASM (debug builds) | WASM (release) | Native |
//! |-------|---------------------|----------------|--------|
//! | `debug_log!` | `console.debug` | no-op | `tracing::debug!` |
//! | `info_log!` | `console.info` | no-op | `tracing::info!` |
//! | `warn_log!` | `console.warn` | no-op | `tracing::warn!` |
//! | `error_log!` | `console.error` | `console.error` | `tracing::error!` |
//!
//! Native events are emitted under the `cioform` target, so a subscriber
//! can filter them with `RUST_LOG=cioform=debug`.
//!
//! ## Example
//!
//! ```ignore
//! use cioform_binding::{debug_log, error_log};
//!
//! debug_log!("collected {} attributes", record.len());
//! error_log!("send failed: {}", error);
//! ```

#[doc(hidden)]
pub mod __private {
	#[cfg(not(target_arch = "wasm32"))]
	pub use tracing;
	#[cfg(target_arch = "wasm32")]
	pub use web_sys;
}

/// Logs a debug message.
#[macro_export]
#[cfg(all(debug_assertions, target_arch = "wasm32"))]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		$crate::logging::__private::web_sys::console::debug_1(&format!($($arg)*).into());
	}};
}

/// Logs a debug message.
#[macro_export]
#[cfg(all(not(debug_assertions), target_arch = "wasm32"))]
macro_rules! debug_log {
	($($arg:tt)*) => {{}};
}

/// Logs a debug message.
#[macro_export]
#[cfg(not(target_arch = "wasm32"))]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		$crate::logging::__private::tracing::debug!(target: "cioform", $($arg)*);
	}};
}

/// Logs an info message.
#[macro_export]
#[cfg(all(debug_assertions, target_arch = "wasm32"))]
macro_rules! info_log {
	($($arg:tt)*) => {{
		$crate::logging::__private::web_sys::console::info_1(&format!($($arg)*).into());
	}};
}

/// Logs an info message.
#[macro_export]
#[cfg(all(not(debug_assertions), target_arch = "wasm32"))]
macro_rules! info_log {
	($($arg:tt)*) => {{}};
}

/// Logs an info message.
#[macro_export]
#[cfg(not(target_arch = "wasm32"))]
macro_rules! info_log {
	($($arg:tt)*) => {{
		$crate::logging::__private::tracing::info!(target: "cioform", $($arg)*);
	}};
}

/// Logs a warning.
#[macro_export]
#[cfg(all(debug_assertions, target_arch = "wasm32"))]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		$crate::logging::__private::web_sys::console::warn_1(&format!($($arg)*).into());
	}};
}

/// Logs a warning.
#[macro_export]
#[cfg(all(not(debug_assertions), target_arch = "wasm32"))]
macro_rules! warn_log {
	($($arg:tt)*) => {{}};
}

/// Logs a warning.
#[macro_export]
#[cfg(not(target_arch = "wasm32"))]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		$crate::logging::__private::tracing::warn!(target: "cioform", $($arg)*);
	}};
}

/// Logs an error. Errors are reported in release builds too.
#[macro_export]
#[cfg(target_arch = "wasm32")]
macro_rules! error_log {
	($($arg:tt)*) => {{
		$crate::logging::__private::web_sys::console::error_1(&format!($($arg)*).into());
	}};
}

/// Logs an error.
#[macro_export]
#[cfg(not(target_arch = "wasm32"))]
macro_rules! error_log {
	($($arg:tt)*) => {{
		$crate::logging::__private::tracing::error!(target: "cioform", $($arg)*);
	}};
}

#[cfg(test)]
mod tests {
	use crate::{debug_log, error_log, info_log, warn_log};
	use rstest::rstest;

	#[rstest]
	fn test_logging_macros_compile() {
		debug_log!("Debug message: {}", 42);
		info_log!("Info message: {}", "test");
		warn_log!("Warning message: {:?}", vec![1, 2, 3]);
		error_log!("Error message: {}", "error");
	}

	#[rstest]
	fn test_logging_macros_no_args() {
		debug_log!("Simple debug");
		info_log!("Simple info");
		warn_log!("Simple warning");
		error_log!("Simple error");
	}

	#[rstest]
	fn test_logging_with_subscriber() {
		let subscriber = tracing_subscriber::fmt()
			.with_max_level(tracing::Level::DEBUG)
			.with_test_writer()
			.finish();
		tracing::subscriber::with_default(subscriber, || {
			debug_log!("binding {} entered {:?}", "form-1", "Idle");
			warn_log!("ignored submit while awaiting readiness");
		});
	}
}
