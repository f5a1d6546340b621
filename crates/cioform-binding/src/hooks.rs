//! Lifecycle hooks.
//!
//! Every hook receives the [`FormBinding`] it fires for, so a hook can read
//! or edit the record (`binding.set(..)`) without relying on an implicit
//! receiver.

use crate::binding::FormBinding;
use cioform_core::{AttributeRecord, FormError};
use std::fmt;
use std::rc::Rc;

/// A cloneable hook callback.
///
/// ## Example
///
/// ```ignore
/// use cioform_binding::Hook;
///
/// let before = Hook::new(|binding, ()| {
///     binding.set("source", "landing-page");
/// });
/// ```
pub struct Hook<Args = ()> {
	inner: Rc<dyn Fn(&FormBinding, Args) + 'static>,
}

impl<Args> Hook<Args> {
	/// Wraps a closure.
	pub fn new<F>(f: F) -> Self
	where
		F: Fn(&FormBinding, Args) + 'static,
	{
		Self { inner: Rc::new(f) }
	}

	/// Invokes the hook.
	pub fn call(&self, binding: &FormBinding, args: Args) {
		(self.inner)(binding, args)
	}
}

impl<Args> Clone for Hook<Args> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<Args> fmt::Debug for Hook<Args> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Hook").finish_non_exhaustive()
	}
}

/// The hook set of one binding. Unset hooks are skipped.
#[derive(Debug, Clone, Default)]
pub struct Hooks {
	/// Runs after the record is collected, before it is sent.
	pub before: Option<Hook>,
	/// Runs at bind time when the form was already completed.
	pub completed: Option<Hook>,
	/// Runs at bind time when the form was not completed, or when no
	/// `completed` hook is configured.
	pub uncompleted: Option<Hook>,
	/// Runs when a submission halts with an error.
	pub error: Option<Hook<FormError>>,
	/// Runs first thing at bind time.
	pub on_load: Option<Hook>,
	/// Runs after the completion cookie is written, with the sent record.
	pub success: Option<Hook<AttributeRecord>>,
}

impl Hooks {
	/// An empty hook set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the `before` hook.
	pub fn before(mut self, f: impl Fn(&FormBinding) + 'static) -> Self {
		self.before = Some(Hook::new(move |binding, ()| f(binding)));
		self
	}

	/// Sets the `completed` hook.
	pub fn completed(mut self, f: impl Fn(&FormBinding) + 'static) -> Self {
		self.completed = Some(Hook::new(move |binding, ()| f(binding)));
		self
	}

	/// Sets the `uncompleted` hook.
	pub fn uncompleted(mut self, f: impl Fn(&FormBinding) + 'static) -> Self {
		self.uncompleted = Some(Hook::new(move |binding, ()| f(binding)));
		self
	}

	/// Sets the `error` hook.
	pub fn error(mut self, f: impl Fn(&FormBinding, FormError) + 'static) -> Self {
		self.error = Some(Hook::new(f));
		self
	}

	/// Sets the `on_load` hook.
	pub fn on_load(mut self, f: impl Fn(&FormBinding) + 'static) -> Self {
		self.on_load = Some(Hook::new(move |binding, ()| f(binding)));
		self
	}

	/// Sets the `success` hook.
	pub fn success(mut self, f: impl Fn(&FormBinding, AttributeRecord) + 'static) -> Self {
		self.success = Some(Hook::new(f));
		self
	}
}
