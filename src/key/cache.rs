//! Process-wide cache for the verification key with single-flight refresh.

// self
use crate::{
	_prelude::*,
	clock::Clock,
	key::{FetchMetrics, KeyMaterial, KeySource},
	obs::{self, OpKind, OpOutcome, OpSpan},
};
#[cfg(feature = "reqwest")]
use crate::{config::CredentialConfig, error::ConfigError, key::HttpKeySource};

#[derive(Clone)]
struct CachedKey {
	key: KeyMaterial,
	fetched_at: Duration,
}

/// Serves the verification key, refetching it once it is older than the refresh interval.
///
/// Concurrent callers that find the key stale share one fetch: the first takes the refresh
/// guard, the rest wait on it and then reuse the key it stored. A failed fetch leaves the
/// previous key in place and is returned to the caller that triggered it; the stale key is
/// never served in its place by [`get_key`](Self::get_key).
pub struct CredentialCache {
	source: Arc<dyn KeySource>,
	clock: Arc<dyn Clock>,
	refresh_interval: Duration,
	current: RwLock<Option<CachedKey>>,
	refresh_guard: AsyncMutex<()>,
	/// Shared counters for fetch activity.
	pub metrics: Arc<FetchMetrics>,
}
impl CredentialCache {
	/// Default freshness window for a fetched key.
	pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::seconds(60);

	/// Creates an empty cache over `source`; the first lookup fetches.
	pub fn new(source: Arc<dyn KeySource>, clock: Arc<dyn Clock>) -> Self {
		Self {
			source,
			clock,
			refresh_interval: Self::DEFAULT_REFRESH_INTERVAL,
			current: RwLock::new(None),
			refresh_guard: AsyncMutex::new(()),
			metrics: Default::default(),
		}
	}

	/// Overrides the freshness window; negative values are clamped to zero.
	pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
		self.refresh_interval = if interval.is_negative() { Duration::ZERO } else { interval };

		self
	}

	/// Builds a cache backed by [`HttpKeySource`] from validated configuration.
	#[cfg(feature = "reqwest")]
	pub fn from_config(config: &CredentialConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
		config.validate()?;

		let source = HttpKeySource::new(config.key_url.clone())?;

		Ok(Self::new(Arc::new(source), clock).with_refresh_interval(config.refresh_interval))
	}

	/// Returns a key no older than the refresh interval, fetching one if needed.
	pub async fn get_key(&self) -> Result<KeyMaterial> {
		const KIND: OpKind = OpKind::KeyRefresh;

		if let Some(key) = self.fresh() {
			self.metrics.record_cache_hit();

			return Ok(key);
		}

		let span = OpSpan::new(KIND, "get_key");

		span.instrument(async move {
			let _singleflight = self.refresh_guard.lock().await;

			// Another caller may have refreshed while this one waited on the guard.
			if let Some(key) = self.fresh() {
				self.metrics.record_cache_hit();

				return Ok(key);
			}

			obs::record_op_outcome(KIND, OpOutcome::Attempt);
			self.metrics.record_attempt();

			match self.source.fetch().await {
				Ok(key) => {
					let previous = self.store(key.clone());

					obs::record_key_fetched(previous.as_deref(), key.fingerprint());
					obs::record_op_outcome(KIND, OpOutcome::Success);
					self.metrics.record_success();

					Ok(key)
				},
				Err(e) => {
					obs::record_op_outcome(KIND, OpOutcome::Failure);
					self.metrics.record_failure();

					Err(Error::from(e))
				},
			}
		})
		.await
	}

	/// Last successfully fetched key regardless of age, for callers that opt into serving
	/// stale material themselves.
	pub fn cached(&self) -> Option<KeyMaterial> {
		self.current.read().as_ref().map(|cached| cached.key.clone())
	}

	/// Clock reading of the last successful fetch.
	pub fn last_fetched_at(&self) -> Option<Duration> {
		self.current.read().as_ref().map(|cached| cached.fetched_at)
	}

	/// Configured freshness window.
	pub fn refresh_interval(&self) -> Duration {
		self.refresh_interval
	}

	fn fresh(&self) -> Option<KeyMaterial> {
		let now = self.clock.now();
		let current = self.current.read();

		current
			.as_ref()
			.filter(|cached| now - cached.fetched_at <= self.refresh_interval)
			.map(|cached| cached.key.clone())
	}

	fn store(&self, key: KeyMaterial) -> Option<String> {
		let fetched_at = self.clock.now();
		let mut current = self.current.write();
		let previous = current.as_ref().map(|cached| cached.key.fingerprint().to_owned());

		*current = Some(CachedKey { key, fetched_at });

		previous
	}
}
impl Debug for CredentialCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let current = self.current.read();

		f.debug_struct("CredentialCache")
			.field("refresh_interval", &self.refresh_interval)
			.field("fingerprint", &current.as_ref().map(|cached| cached.key.fingerprint()))
			.field("fetched_at", &current.as_ref().map(|cached| cached.fetched_at))
			.finish()
	}
}
