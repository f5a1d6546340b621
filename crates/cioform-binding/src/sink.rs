//! The identity sink the binding forwards records to.
//!
//! In the browser this is Customer.io's `_cio` global, or Customer.io
//! reached through the Segment `analytics` integration. Both arrive from
//! third-party scripts that may still be loading when the form is
//! submitted, so the sink reports readiness separately from sending.

use cioform_core::{AttributeRecord, FormResult};

/// A snapshot of what the sink can do right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkProbe {
	/// The alternate integration (Segment with Customer.io enabled) is active.
	pub alternate: bool,
	/// The direct handle exists and exposes `identify`.
	pub direct: bool,
}

impl SinkProbe {
	/// The sink can accept a record.
	pub fn is_ready(&self) -> bool {
		self.alternate || self.direct
	}
}

/// Receives attribute records.
pub trait IdentitySink {
	/// Reports availability. Must be cheap; the readiness wait calls it
	/// on every poll.
	fn probe(&self) -> SinkProbe;

	/// Sends a record through the direct handle.
	fn identify(&self, record: &AttributeRecord) -> FormResult<()>;

	/// Sends a record through the alternate integration.
	fn identify_alternate(&self, id: Option<&str>, record: &AttributeRecord) -> FormResult<()>;
}
