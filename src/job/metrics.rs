// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for rendezvous activity.
#[derive(Debug, Default)]
pub struct RendezvousMetrics {
	defined: AtomicU64,
	redefined: AtomicU64,
	hits: AtomicU64,
	timeouts: AtomicU64,
	evicted: AtomicU64,
}
impl RendezvousMetrics {
	/// Returns the number of `define` calls.
	pub fn defined(&self) -> u64 {
		self.defined.load(Ordering::Relaxed)
	}

	/// Returns how many `define` calls replaced an uncollected job.
	pub fn redefined(&self) -> u64 {
		self.redefined.load(Ordering::Relaxed)
	}

	/// Returns the number of waits that found their job.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Returns the number of waits whose window closed empty.
	pub fn timeouts(&self) -> u64 {
		self.timeouts.load(Ordering::Relaxed)
	}

	/// Returns the number of jobs removed for exceeding the timeout.
	pub fn evicted(&self) -> u64 {
		self.evicted.load(Ordering::Relaxed)
	}

	pub(crate) fn record_define(&self, replaced: bool) {
		self.defined.fetch_add(1, Ordering::Relaxed);

		if replaced {
			self.redefined.fetch_add(1, Ordering::Relaxed);
		}
	}

	pub(crate) fn record_hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_timeout(&self) {
		self.timeouts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_evicted(&self, count: usize) {
		self.evicted.fetch_add(count as u64, Ordering::Relaxed);
	}
}
