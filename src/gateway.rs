//! Token-gated front door for the rendezvous: both halves of a job are authenticated before
//! they touch the [`JobManager`].

// crates.io
use tokio::task::JoinHandle;
// self
use crate::{
	_prelude::*,
	auth::{Identity, JobId},
	clock::Clock,
	config::GateConfig,
	job::{Job, JobManager},
	key::{CredentialCache, KeySource},
	verify::{self, TokenVerifier},
};
#[cfg(feature = "reqwest")]
use crate::{clock::SystemClock, key::HttpKeySource};

/// Pairs a [`JobManager`] with the verifier that guards it.
///
/// `start` and `collect` are the two request halves: each verifies the caller's
/// `Authorization` header first, then defines or waits for the job. The gateway is cheap to
/// clone and is meant to be shared by every request handler in the process.
pub struct Gateway<P> {
	/// Rendezvous shared by both halves.
	pub jobs: Arc<JobManager<P>>,
	/// Verifier applied to every request.
	pub verifier: Arc<dyn TokenVerifier>,
}
impl<P> Gateway<P>
where
	P: Clone + Send,
{
	/// Assembles a gateway from prebuilt parts.
	pub fn new(jobs: Arc<JobManager<P>>, verifier: Arc<dyn TokenVerifier>) -> Self {
		Self { jobs, verifier }
	}

	/// Wires the rendezvous, key cache, and verifier described by `config`.
	///
	/// No eviction task is started; stale jobs are only swept by waits until the caller runs
	/// [`spawn_evictor`](Self::spawn_evictor).
	pub fn from_config(
		config: &GateConfig,
		source: Arc<dyn KeySource>,
		clock: Arc<dyn Clock>,
	) -> Result<Self> {
		config.validate()?;

		let jobs = Arc::new(JobManager::new(clock.clone(), config.rendezvous.clone())?);
		let keys = Arc::new(
			CredentialCache::new(source, clock.clone())
				.with_refresh_interval(config.credentials.refresh_interval),
		);
		let verifier = verify::build_verifier(&config.verifier, keys, clock)?;

		Ok(Self::new(jobs, verifier))
	}

	/// Producer half: verifies the caller, then stores `payload` under `job_id`.
	pub async fn start(
		&self,
		authorization: Option<&str>,
		job_id: &str,
		payload: P,
	) -> Result<Identity> {
		let identity = self.verifier.verify_authorization(authorization).await?;

		self.jobs.define(parse_job_id(job_id)?, payload);

		Ok(identity)
	}

	/// Consumer half: verifies the caller, then waits for the job defined under `job_id`.
	///
	/// A wait window that closes empty becomes [`Error::JobNotFound`].
	pub async fn collect(&self, authorization: Option<&str>, job_id: &str) -> Result<Job<P>> {
		self.verifier.verify_authorization(authorization).await?;

		let id = parse_job_id(job_id)?;

		self.jobs.wait(&id).await.ok_or_else(|| Error::JobNotFound { job_id: id.into() })
	}
}
impl<P> Gateway<P>
where
	P: 'static + Clone + Send + Sync,
{
	/// Wires a production gateway: keys over HTTPS from the configured URL and the system
	/// clock.
	///
	/// When called inside a tokio runtime the background evictor is started as well, sweeping
	/// once per rendezvous timeout until the gateway is dropped.
	#[cfg(feature = "reqwest")]
	pub fn connect(config: &GateConfig) -> Result<Self> {
		let source = HttpKeySource::new(config.credentials.key_url.clone())?;
		let gateway = Self::from_config(config, Arc::new(source), Arc::new(SystemClock::new()))?;

		if tokio::runtime::Handle::try_current().is_ok() {
			gateway.spawn_evictor();
		}

		Ok(gateway)
	}

	/// Starts the background evictor, sweeping once per rendezvous timeout.
	///
	/// Jobs whose consumer never arrives are removed within two timeouts of being defined.
	pub fn spawn_evictor(&self) -> JoinHandle<()> {
		self.jobs.spawn_evictor(self.jobs.config().timeout)
	}
}
impl<P> Clone for Gateway<P> {
	fn clone(&self) -> Self {
		Self { jobs: self.jobs.clone(), verifier: self.verifier.clone() }
	}
}
impl<P> Debug for Gateway<P> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway").field("jobs", &self.jobs).field("verifier", &self.verifier).finish()
	}
}

fn parse_job_id(raw: &str) -> Result<JobId> {
	JobId::new(raw).map_err(|source| Error::InvalidJobId { job_id: raw.to_owned(), source })
}
