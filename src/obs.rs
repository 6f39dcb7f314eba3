//! Optional observability helpers for rendezvous, key, and verification operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `agent_gate.op` with the `op` and `stage`
//!   fields, plus debug/info events for redefined jobs, evictions, and key rotations.
//! - Enable `metrics` to increment the `agent_gate_op_total` counter for every
//!   attempt/success/miss/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Producer half of a rendezvous.
	Define,
	/// Consumer half of a rendezvous.
	Wait,
	/// Removal of expired jobs.
	Evict,
	/// Verification key refresh.
	KeyRefresh,
	/// Bearer token verification.
	Verify,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Define => "define",
			OpKind::Wait => "wait",
			OpKind::Evict => "evict",
			OpKind::KeyRefresh => "key_refresh",
			OpKind::Verify => "verify",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Expected negative result (wait window closed, token rejected).
	Miss,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Miss => "miss",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
