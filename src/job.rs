//! Job rendezvous: a producer request defines a payload under a job id and a consumer request
//! waits for it, in either order, within a bounded window.
//!
//! [`JobManager::define`] stores (or overwrites) the payload and wakes any consumer already
//! waiting on that id. [`JobManager::wait`] returns the payload as soon as it is present, or
//! `None` once the window measured from the start of the wait closes. Jobs older than the
//! window are evicted on every re-check and are never returned, even before eviction
//! physically removes them.

pub mod manager;
mod metrics;
pub mod store;

pub use manager::JobManager;
pub use metrics::RendezvousMetrics;
pub use store::JobStore;

// self
use crate::{_prelude::*, auth::JobId};

/// Payload waiting for its consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job<P> {
	/// Key shared by the producer and the consumer.
	pub id: JobId,
	/// Producer-defined payload; never interpreted by the rendezvous.
	pub payload: P,
	/// Clock reading at definition time.
	pub created_at: Duration,
}
impl<P> Job<P> {
	/// Creates a job stamped with `created_at`.
	pub fn new(id: JobId, payload: P, created_at: Duration) -> Self {
		Self { id, payload, created_at }
	}

	/// Age of the job at `now`.
	pub fn age_at(&self, now: Duration) -> Duration {
		now - self.created_at
	}

	/// Returns true once the job has outlived `timeout`.
	pub fn is_expired_at(&self, now: Duration, timeout: Duration) -> bool {
		self.age_at(now) > timeout
	}

	/// Consumes the job, returning its payload.
	pub fn into_payload(self) -> P {
		self.payload
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn expiry_is_strictly_after_the_timeout() {
		let job = Job::new(
			JobId::new("job-1").expect("Job fixture should be valid."),
			"payload",
			Duration::seconds(1),
		);
		let timeout = Duration::seconds(2);

		assert_eq!(job.age_at(Duration::seconds(3)), timeout);
		assert!(!job.is_expired_at(Duration::seconds(3), timeout));
		assert!(job.is_expired_at(Duration::milliseconds(3_001), timeout));
	}
}
