//! Replaceable time sources for timing-dependent components.
//!
//! Every component that reasons about elapsed time (job expiry, wait windows, key staleness,
//! token claims) reads it through [`Clock`]. Production code uses [`SystemClock`]; tests use
//! [`ManualClock`] to step virtual time without sleeping.

// self
use crate::_prelude::*;

/// Boxed future returned by [`Clock::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Monotonic time source with a sleep primitive.
pub trait Clock
where
	Self: Debug + Send + Sync,
{
	/// Time elapsed since the clock's origin; never decreases.
	fn now(&self) -> Duration;

	/// Current wall-clock instant, used for token `exp`/`nbf`/`iat` claims.
	fn wall(&self) -> OffsetDateTime;

	/// Suspends the calling task for `duration`.
	fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

/// Clock backed by the tokio timer and the system wall clock.
///
/// Monotonic readings come from [`tokio::time::Instant`], so tests running with a paused tokio
/// runtime observe auto-advanced time as well.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
	origin: tokio::time::Instant,
}
impl SystemClock {
	/// Creates a clock whose origin is the current instant.
	pub fn new() -> Self {
		Self { origin: tokio::time::Instant::now() }
	}
}
impl Default for SystemClock {
	fn default() -> Self {
		Self::new()
	}
}
impl Clock for SystemClock {
	fn now(&self) -> Duration {
		Duration::try_from(self.origin.elapsed()).unwrap_or(Duration::MAX)
	}

	fn wall(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}

	fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
		let duration = std::time::Duration::try_from(duration).unwrap_or_default();

		Box::pin(tokio::time::sleep(duration))
	}
}

type ScheduledAction = Box<dyn FnOnce() + Send>;

struct ManualState {
	now: Duration,
	wall_origin: OffsetDateTime,
	scheduled: Vec<(Duration, ScheduledAction)>,
}

/// Deterministic clock whose time only moves when told to.
///
/// [`sleep`](Clock::sleep) advances virtual time by the requested duration and then yields,
/// so a single waiting task walks through time as fast as it polls. Actions registered with
/// [`at`](Self::at) run once virtual time reaches their instant, which lets tests place a
/// producer at an exact point inside a consumer's wait.
#[derive(Clone)]
pub struct ManualClock(Arc<Mutex<ManualState>>);
impl ManualClock {
	/// Creates a clock at virtual time zero whose wall reading starts at `wall_origin`.
	pub fn new(wall_origin: OffsetDateTime) -> Self {
		Self(Arc::new(Mutex::new(ManualState {
			now: Duration::ZERO,
			wall_origin,
			scheduled: Vec::new(),
		})))
	}

	/// Moves virtual time forward and runs every action that became due, in time order.
	pub fn advance(&self, by: Duration) {
		let due = {
			let mut state = self.0.lock();

			state.now += by;

			let now = state.now;
			let (mut due, pending): (Vec<_>, Vec<_>) =
				state.scheduled.drain(..).partition(|(at, _)| *at <= now);

			state.scheduled = pending;
			due.sort_by_key(|(at, _)| *at);

			due
		};

		for (_, action) in due {
			action();
		}
	}

	/// Registers `action` to run when virtual time reaches `at`.
	///
	/// Actions whose instant has already passed run on the next [`advance`](Self::advance).
	pub fn at(&self, at: Duration, action: impl 'static + FnOnce() + Send) {
		self.0.lock().scheduled.push((at, Box::new(action)));
	}

	/// Number of actions that have not run yet.
	pub fn pending_actions(&self) -> usize {
		self.0.lock().scheduled.len()
	}
}
impl Default for ManualClock {
	fn default() -> Self {
		Self::new(OffsetDateTime::UNIX_EPOCH + Duration::days(20_000))
	}
}
impl Debug for ManualClock {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.0.lock();

		f.debug_struct("ManualClock")
			.field("now", &state.now)
			.field("scheduled", &state.scheduled.len())
			.finish()
	}
}
impl Clock for ManualClock {
	fn now(&self) -> Duration {
		self.0.lock().now
	}

	fn wall(&self) -> OffsetDateTime {
		let state = self.0.lock();

		state.wall_origin + state.now
	}

	fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
		Box::pin(async move {
			self.advance(duration);
			tokio::task::yield_now().await;
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicU32, Ordering};
	// self
	use super::*;

	#[test]
	fn manual_clock_runs_due_actions_in_order() {
		let clock = ManualClock::default();
		let log = Arc::new(Mutex::new(Vec::new()));

		for (at, label) in [(1_500, "late"), (500, "early"), (3_000, "never")] {
			let log = log.clone();

			clock.at(Duration::milliseconds(at), move || log.lock().push(label));
		}

		clock.advance(Duration::seconds(2));

		assert_eq!(*log.lock(), ["early", "late"]);
		assert_eq!(clock.pending_actions(), 1);
		assert_eq!(clock.now(), Duration::seconds(2));
	}

	#[test]
	fn manual_clock_wall_tracks_virtual_time() {
		let origin = time::macros::datetime!(2026-01-01 00:00 UTC);
		let clock = ManualClock::new(origin);

		clock.advance(Duration::minutes(5));

		assert_eq!(clock.wall(), origin + Duration::minutes(5));
	}

	#[tokio::test]
	async fn manual_sleep_advances_and_fires_actions() {
		let clock = ManualClock::default();
		let fired = Arc::new(AtomicU32::new(0));
		let counter = fired.clone();

		clock.at(Duration::milliseconds(100), move || {
			counter.fetch_add(1, Ordering::SeqCst);
		});
		clock.sleep(Duration::milliseconds(100)).await;

		assert_eq!(fired.load(Ordering::SeqCst), 1);
		assert_eq!(clock.now(), Duration::milliseconds(100));
	}

	#[tokio::test(start_paused = true)]
	async fn system_clock_follows_tokio_time() {
		let clock = SystemClock::new();

		clock.sleep(Duration::seconds(3)).await;

		assert!(clock.now() >= Duration::seconds(3));
		assert!(clock.now() < Duration::seconds(4));
	}
}
