//! cioform core - platform-independent building blocks
//!
//! This crate holds everything the form binding needs that does not touch
//! a browser:
//!
//! - [`error`]: the [`FormError`] taxonomy shared by all cioform crates
//! - [`record`]: the ordered [`AttributeRecord`] sent to the identity sink,
//!   plus id derivation from an email address
//! - [`cookie`]: the completion cookie wire format (escaping, parsing,
//!   expiry dates)
//! - [`settings`]: serde-backed [`FormSettings`]
//!
//! The runtime side (DOM access, readiness wait, hooks) lives in
//! `cioform-binding`.

#![warn(missing_docs)]

pub mod cookie;
pub mod error;
pub mod record;
pub mod settings;

pub use error::{FormError, FormResult};
pub use record::{AttributeRecord, AttributeValue, derive_id};
pub use settings::{CookieSettings, FormSettings};
