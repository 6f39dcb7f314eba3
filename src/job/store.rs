//! Thread-safe in-process store holding at most one pending job per id.

// std
use std::collections::hash_map::Entry;
// crates.io
use tokio::sync::Notify;
// self
use crate::{_prelude::*, auth::JobId, job::Job};

struct Waiter {
	notify: Arc<Notify>,
	count: usize,
}

struct StoreState<P> {
	jobs: HashMap<JobId, Job<P>>,
	waiters: HashMap<JobId, Waiter>,
}
impl<P> StoreState<P> {
	fn evict_expired(&mut self, now: Duration, timeout: Duration) -> usize {
		let before = self.jobs.len();

		self.jobs.retain(|_, job| !job.is_expired_at(now, timeout));

		before - self.jobs.len()
	}
}

/// Job map plus per-id wake-up handles for consumers currently waiting.
///
/// Lookups, inserts, and eviction all run under one lock, so an eviction pass can never race
/// a lookup for the same id: a job is either returned or removed, never both.
pub struct JobStore<P>(Mutex<StoreState<P>>);
impl<P> JobStore<P> {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self(Mutex::new(StoreState { jobs: HashMap::new(), waiters: HashMap::new() }))
	}

	/// Stores `job`, replacing any job with the same id, and wakes waiters for that id.
	///
	/// Returns true when an uncollected job was overwritten.
	pub fn insert(&self, job: Job<P>) -> bool {
		let (replaced, notify) = {
			let mut state = self.0.lock();
			let notify = state.waiters.get(&job.id).map(|waiter| waiter.notify.clone());
			let replaced = state.jobs.insert(job.id.clone(), job).is_some();

			(replaced, notify)
		};

		if let Some(notify) = notify {
			notify.notify_waiters();
		}

		replaced
	}

	/// Removes every job older than `timeout` at `now`, returning how many were dropped.
	pub fn evict_expired(&self, now: Duration, timeout: Duration) -> usize {
		self.0.lock().evict_expired(now, timeout)
	}

	/// Evicts expired jobs and looks up `id` in the same critical section.
	///
	/// With `remove` set the job is taken out of the store; otherwise a clone is returned and
	/// later lookups see the same job until it expires. The second tuple element is the number
	/// of jobs evicted by this pass.
	pub fn collect(
		&self,
		id: &str,
		now: Duration,
		timeout: Duration,
		remove: bool,
	) -> (Option<Job<P>>, usize)
	where
		P: Clone,
	{
		let mut state = self.0.lock();
		let evicted = state.evict_expired(now, timeout);
		let job = if remove { state.jobs.remove(id) } else { state.jobs.get(id).cloned() };

		(job, evicted)
	}

	/// Looks up `id` without evicting, hiding jobs that have already outlived `timeout`.
	pub fn peek(&self, id: &str, now: Duration, timeout: Duration) -> Option<Job<P>>
	where
		P: Clone,
	{
		self.0.lock().jobs.get(id).filter(|job| !job.is_expired_at(now, timeout)).cloned()
	}

	/// Removes the job for `id` regardless of age.
	pub fn remove(&self, id: &str) -> Option<Job<P>> {
		self.0.lock().jobs.remove(id)
	}

	/// Returns true when a job for `id` is physically present, expired or not.
	pub fn contains(&self, id: &str) -> bool {
		self.0.lock().jobs.contains_key(id)
	}

	/// Number of jobs physically present.
	pub fn len(&self) -> usize {
		self.0.lock().jobs.len()
	}

	/// Returns true if no jobs are stored.
	pub fn is_empty(&self) -> bool {
		self.0.lock().jobs.is_empty()
	}

	/// Number of consumers currently waiting on `id`.
	pub fn waiting(&self, id: &str) -> usize {
		self.0.lock().waiters.get(id).map_or(0, |waiter| waiter.count)
	}

	/// Registers interest in `id`; the returned guard unregisters on drop.
	pub(crate) fn register_waiter(&self, id: &JobId) -> WaiterGuard<'_, P> {
		let notify = {
			let mut state = self.0.lock();
			let waiter = state
				.waiters
				.entry(id.clone())
				.or_insert_with(|| Waiter { notify: Arc::new(Notify::new()), count: 0 });

			waiter.count += 1;

			waiter.notify.clone()
		};

		WaiterGuard { store: self, id: id.clone(), notify }
	}

	fn unregister_waiter(&self, id: &JobId) {
		let mut state = self.0.lock();

		if let Entry::Occupied(mut entry) = state.waiters.entry(id.clone()) {
			let waiter = entry.get_mut();

			waiter.count = waiter.count.saturating_sub(1);

			if waiter.count == 0 {
				entry.remove();
			}
		}
	}
}
impl<P> Default for JobStore<P> {
	fn default() -> Self {
		Self::new()
	}
}
impl<P> Debug for JobStore<P> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.0.lock();

		f.debug_struct("JobStore")
			.field("jobs", &state.jobs.len())
			.field("waiting_ids", &state.waiters.len())
			.finish()
	}
}

/// Registration of one waiting consumer; dropping it (including on cancellation) unregisters.
pub(crate) struct WaiterGuard<'a, P> {
	store: &'a JobStore<P>,
	id: JobId,
	notify: Arc<Notify>,
}
impl<P> WaiterGuard<'_, P> {
	pub(crate) fn notify(&self) -> &Notify {
		&self.notify
	}
}
impl<P> Drop for WaiterGuard<'_, P> {
	fn drop(&mut self) {
		self.store.unregister_waiter(&self.id);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const TIMEOUT: Duration = Duration::seconds(2);

	fn job(id: &str, payload: &'static str, created_at: Duration) -> Job<&'static str> {
		Job::new(JobId::new(id).expect("Job fixture should be valid."), payload, created_at)
	}

	#[test]
	fn later_insert_overwrites_earlier_one() {
		let store = JobStore::new();

		assert!(!store.insert(job("x", "p1", Duration::ZERO)));
		assert!(store.insert(job("x", "p2", Duration::ZERO)));

		let (found, _) = store.collect("x", Duration::ZERO, TIMEOUT, false);

		assert_eq!(found.map(Job::into_payload), Some("p2"));
		assert_eq!(store.len(), 1);
	}

	#[test]
	fn stale_job_is_hidden_before_it_is_evicted() {
		let store = JobStore::new();

		store.insert(job("x", "hello", Duration::ZERO));

		let later = Duration::milliseconds(2_500);

		assert!(store.peek("x", later, TIMEOUT).is_none());
		assert!(store.contains("x"), "Peeking must not evict.");

		let (found, evicted) = store.collect("x", later, TIMEOUT, false);

		assert!(found.is_none());
		assert_eq!(evicted, 1);
		assert!(store.is_empty());
	}

	#[test]
	fn eviction_only_touches_expired_jobs() {
		let store = JobStore::new();

		store.insert(job("old", "a", Duration::ZERO));
		store.insert(job("new", "b", Duration::seconds(1)));

		assert_eq!(store.evict_expired(Duration::milliseconds(2_500), TIMEOUT), 1);
		assert!(!store.contains("old"));
		assert!(store.contains("new"));
	}

	#[test]
	fn collect_without_removal_is_idempotent() {
		let store = JobStore::new();

		store.insert(job("x", "hello", Duration::ZERO));

		for _ in 0..3 {
			let (found, _) = store.collect("x", Duration::seconds(1), TIMEOUT, false);

			assert_eq!(found.map(Job::into_payload), Some("hello"));
		}

		let (taken, _) = store.collect("x", Duration::seconds(1), TIMEOUT, true);

		assert_eq!(taken.map(Job::into_payload), Some("hello"));
		assert!(store.is_empty());
	}

	#[test]
	fn waiter_registrations_are_counted_and_released() {
		let store: JobStore<&'static str> = JobStore::new();
		let id = JobId::new("x").expect("Job fixture should be valid.");
		let first = store.register_waiter(&id);
		let second = store.register_waiter(&id);

		assert_eq!(store.waiting("x"), 2);

		drop(first);

		assert_eq!(store.waiting("x"), 1);

		drop(second);

		assert_eq!(store.waiting("x"), 0);
		assert_eq!(format!("{store:?}"), "JobStore { jobs: 0, waiting_ids: 0 }");
	}
}
