//! Rendezvous orchestration over [`JobStore`] and an injected [`Clock`].

// crates.io
use tokio::task::JoinHandle;
// self
use crate::{
	_prelude::*,
	auth::JobId,
	clock::Clock,
	config::RendezvousConfig,
	error::ConfigError,
	job::{Job, JobStore, RendezvousMetrics},
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// Lets a producer and a consumer that share a job id meet within a bounded window.
///
/// One manager is built per process and shared by reference (typically behind an [`Arc`]) with
/// every request handler. All operations are safe to call concurrently; only
/// [`wait`](Self::wait) suspends, and only the calling task.
pub struct JobManager<P> {
	store: JobStore<P>,
	clock: Arc<dyn Clock>,
	config: RendezvousConfig,
	/// Shared counters for rendezvous activity.
	pub metrics: Arc<RendezvousMetrics>,
}
impl<P> JobManager<P>
where
	P: Clone + Send,
{
	/// Creates a manager after validating `config`.
	pub fn new(clock: Arc<dyn Clock>, config: RendezvousConfig) -> Result<Self, ConfigError> {
		config.validate()?;

		Ok(Self { store: JobStore::new(), clock, config, metrics: Default::default() })
	}

	/// Stores `payload` under `job_id`, stamped with the current clock reading.
	///
	/// A job already stored under the same id is replaced (last writer wins). Consumers waiting
	/// on the id are woken and observe whichever job is present when they re-check.
	pub fn define(&self, job_id: JobId, payload: P) {
		let _span = OpSpan::new(OpKind::Define, "define").entered();
		let job = Job::new(job_id, payload, self.clock.now());
		let id = job.id.clone();
		let replaced = self.store.insert(job);

		if replaced {
			obs::record_job_redefined(&id);
		}

		self.metrics.record_define(replaced);
		obs::record_op_outcome(OpKind::Define, OpOutcome::Success);
	}

	/// Waits for the job defined under `job_id`.
	///
	/// Returns the job as soon as it is present, or `None` once the configured timeout has
	/// elapsed since this call began. Every re-check first evicts expired jobs. Dropping the
	/// returned future abandons the wait without touching any stored job.
	pub async fn wait(&self, job_id: &JobId) -> Option<Job<P>> {
		const KIND: OpKind = OpKind::Wait;

		let span = OpSpan::new(KIND, "wait");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let found = span.instrument(self.wait_inner(job_id)).await;

		match found {
			Some(_) => {
				self.metrics.record_hit();
				obs::record_op_outcome(KIND, OpOutcome::Success);
			},
			None => {
				self.metrics.record_timeout();
				obs::record_op_outcome(KIND, OpOutcome::Miss);
			},
		}

		found
	}

	async fn wait_inner(&self, job_id: &JobId) -> Option<Job<P>> {
		let timeout = self.config.timeout;
		let started = self.clock.now();
		let waiter = self.store.register_waiter(job_id);

		loop {
			// Created before the lookup so a define racing the check still wakes this task.
			let notified = waiter.notify().notified();
			let now = self.clock.now();
			let (job, evicted) =
				self.store.collect(job_id, now, timeout, self.config.remove_on_collect);

			self.note_evictions(evicted);

			if job.is_some() {
				return job;
			}

			let elapsed = now - started;

			if elapsed >= timeout {
				return None;
			}

			let tick = (timeout - elapsed).min(self.config.poll_interval);

			tokio::select! {
				_ = notified => {},
				_ = self.clock.sleep(tick) => {},
			}
		}
	}

	/// Removes every job that has outlived the timeout, returning how many were dropped.
	pub fn evict_stale(&self) -> usize {
		let _span = OpSpan::new(OpKind::Evict, "evict_stale").entered();
		let evicted = self.store.evict_expired(self.clock.now(), self.config.timeout);

		self.note_evictions(evicted);

		evicted
	}

	/// Looks up `job_id` without waiting; expired jobs are never returned.
	pub fn peek(&self, job_id: &str) -> Option<Job<P>> {
		self.store.peek(job_id, self.clock.now(), self.config.timeout)
	}

	/// Read-only view of the underlying store.
	pub fn store(&self) -> &JobStore<P> {
		&self.store
	}

	/// Configuration the manager was built with.
	pub fn config(&self) -> &RendezvousConfig {
		&self.config
	}

	fn note_evictions(&self, evicted: usize) {
		if evicted > 0 {
			self.metrics.record_evicted(evicted);
			obs::record_evictions(evicted);
			obs::record_op_outcome(OpKind::Evict, OpOutcome::Success);
		}
	}
}
impl<P> JobManager<P>
where
	P: 'static + Clone + Send + Sync,
{
	/// Runs [`evict_stale`](Self::evict_stale) every `every` on a background tokio task.
	///
	/// The task only holds a weak reference and exits once the manager is dropped, so it never
	/// keeps the manager alive on its own.
	pub fn spawn_evictor(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
		let manager = Arc::downgrade(self);
		let clock = self.clock.clone();

		tokio::spawn(async move {
			loop {
				clock.sleep(every).await;

				let Some(live) = manager.upgrade() else { break };

				live.evict_stale();
			}
		})
	}
}
impl<P> Debug for JobManager<P> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JobManager")
			.field("store", &self.store)
			.field("clock", &self.clock)
			.field("config", &self.config)
			.finish()
	}
}
