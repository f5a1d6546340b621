//! # cioform
//!
//! Binds HTML forms to Customer.io. On submit a bound form collects its
//! fields into an attribute record, sends it to the identity sink (the
//! `_cio` global, or Customer.io through Segment `analytics`), waits for
//! the tracking library to be ready, sets a completion cookie and then
//! lets the real submission through.
//!
//! ## Crates
//!
//! - [`core`]: records, cookie wire format, settings, errors
//! - [`binding`]: the per-form state machine, readiness wait, hooks and
//!   browser adapters
//!
//! ## Quick Start (browser)
//!
//! ```js
//! cioForm("form.signup", {
//!     cookie: { name: "_signup", expire: 30 },
//!     completed: function () { this.style.display = "none"; },
//! });
//! ```
//!
//! ## Quick Start (Rust)
//!
//! ```ignore
//! use cioform::prelude::*;
//!
//! let mut registry = FormRegistry::new();
//! let bindings = registry.attach(forms, &FormSettings::default(), &Hooks::new(), &env)?;
//! bindings[0].submit().await?;
//! ```

pub use cioform_binding as binding;
pub use cioform_core as core;

/// Commonly used types.
pub mod prelude {
	pub use cioform_binding::{
		BindingEnv, CookieStore, FormBinding, FormElement, FormRegistry, Hook, Hooks, IdentitySink,
		ReadinessWait, SubmissionState, SubmitOutcome,
	};
	pub use cioform_core::{AttributeRecord, AttributeValue, CookieSettings, FormError, FormResult, FormSettings};

	#[cfg(target_arch = "wasm32")]
	pub use cioform_binding::{attach_selector, browser_env};
}
