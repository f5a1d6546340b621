//! cioform binding - attach HTML forms to the Customer.io identity sink
//!
//! This crate holds the runtime side of cioform:
//!
//! - [`binding`]: [`FormBinding`], the per-form submission state machine
//! - [`registry`]: [`FormRegistry`], at most one binding per element
//! - [`readiness`]: the polling wait for the tracking library
//! - [`cookies`]: the completion cookie store over `document.cookie`
//! - [`hooks`]: lifecycle callbacks
//! - [`element`], [`sink`], [`env`]: the seams the binding is driven through
//! - `web` (wasm32 only): browser adapters and the `cioForm` export
//! - `testing` (tests and the `testing` feature): native test doubles
//!
//! ## Architecture
//!
//! ```text
//! submit event ──► FormBinding ──► IdentitySink
//!                      │  ▲
//!        FormElement ◄─┘  └── ReadinessWait (Timer)
//!                      │
//!                      └──► CookieStore (CookieJar)
//! ```

#![warn(missing_docs)]

pub mod binding;
pub mod cookies;
pub mod element;
pub mod env;
pub mod hooks;
pub mod logging;
pub mod readiness;
pub mod registry;
pub mod sink;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use binding::{FormBinding, SubmissionState, SubmitOutcome};
pub use cookies::{CookieJar, CookieStore, MemoryCookieJar};
pub use element::{ControlTag, ElementKey, FormControl, FormElement};
pub use env::{BindingEnv, Clock, SystemClock, Timer};
pub use hooks::{Hook, Hooks};
pub use readiness::{ReadinessWait, ReadyOptions, ReadyReport, WaitHandle};
pub use registry::FormRegistry;
pub use sink::{IdentitySink, SinkProbe};

#[cfg(not(target_arch = "wasm32"))]
pub use env::TokioTimer;

#[cfg(target_arch = "wasm32")]
pub use web::{BrowserTimer, DocumentCookieJar, WebForm, WindowSink, attach_selector, browser_env};
