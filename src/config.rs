//! Construction-time configuration for the rendezvous, key cache, and verifier.
//!
//! Settings are fixed once a component is built; none of them can be changed at runtime.
//! [`GateConfig::from_env`] covers the handful of values deployments usually inject through
//! the process environment.

// self
use crate::{_prelude::*, auth::AcceptableSubjects, error::ConfigError};

/// Key document endpoint used when none is configured.
pub const DEFAULT_KEY_URL: &str = "https://api.penlight.ai/public-key";
/// Environment variable overriding [`DEFAULT_KEY_URL`].
pub const ENV_KEY_URL: &str = "CONSUMER_PUBLIC_KEY_INFO_URL";
/// Environment variable selecting the [`Environment`].
pub const ENV_ENVIRONMENT: &str = "AISER_ENVIRONMENT";
/// Environment variable holding the public URL of this server, used as the expected audience.
pub const ENV_COMPLETE_URL: &str = "COMPLETE_URL";

/// Deployment environment; only [`Environment::Development`] may skip token verification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
	/// Production deployment (the default).
	#[default]
	Production,
	/// Local development deployment.
	Development,
}
impl Environment {
	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Environment::Production => "production",
			Environment::Development => "development",
		}
	}

	/// Returns true when the environment is explicitly marked as non-production.
	pub const fn is_development(self) -> bool {
		matches!(self, Environment::Development)
	}
}
impl Display for Environment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Environment {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"production" | "prod" => Ok(Self::Production),
			"development" | "dev" => Ok(Self::Development),
			_ => Err(ConfigError::UnknownEnvironment { value: s.to_owned() }),
		}
	}
}

/// How bearer tokens are checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
	/// Full signature and claim verification.
	Strict,
	/// Accept every request with a placeholder identity.
	Permissive,
}

/// Timing settings for [`JobManager`](crate::job::JobManager).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendezvousConfig {
	/// Wait window for consumers and maximum age of an uncollected job.
	pub timeout: Duration,
	/// Upper bound between re-checks and eviction passes inside a wait.
	pub poll_interval: Duration,
	/// Remove a job once a consumer collects it instead of leaving it to expire.
	pub remove_on_collect: bool,
}
impl RendezvousConfig {
	/// Default wait window and job lifetime.
	pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(10);
	/// Default re-check interval.
	pub const DEFAULT_POLL_INTERVAL: Duration = Duration::milliseconds(100);

	/// Overrides the wait window.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the re-check interval.
	pub fn with_poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval = interval;

		self
	}

	/// Removes jobs as soon as they are collected.
	pub fn with_remove_on_collect(mut self, remove: bool) -> Self {
		self.remove_on_collect = remove;

		self
	}

	/// Validates the timing invariants.
	pub fn validate(&self) -> Result<(), ConfigError> {
		ensure_positive("timeout", self.timeout)?;
		ensure_positive("poll_interval", self.poll_interval)?;

		if self.poll_interval > self.timeout {
			return Err(ConfigError::InvalidDuration {
				field: "poll_interval",
				reason: "must not exceed the timeout",
			});
		}

		Ok(())
	}
}
impl Default for RendezvousConfig {
	fn default() -> Self {
		Self {
			timeout: Self::DEFAULT_TIMEOUT,
			poll_interval: Self::DEFAULT_POLL_INTERVAL,
			remove_on_collect: false,
		}
	}
}

/// Settings for [`CredentialCache`](crate::key::CredentialCache) and its HTTP source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
	/// Endpoint serving the key document.
	pub key_url: Url,
	/// Maximum age of a cached key before it must be refetched.
	pub refresh_interval: Duration,
}
impl CredentialConfig {
	/// Default freshness window for the cached key.
	pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::seconds(60);

	/// Creates a config pointing at `key_url` with the default refresh interval.
	pub fn new(key_url: Url) -> Self {
		Self { key_url, refresh_interval: Self::DEFAULT_REFRESH_INTERVAL }
	}

	/// Parses `raw` as the key URL.
	pub fn parse(raw: &str) -> Result<Self, ConfigError> {
		let url = Url::parse(raw).map_err(|source| ConfigError::InvalidKeyUrl { source })?;

		Ok(Self::new(url))
	}

	/// Overrides the refresh interval.
	pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
		self.refresh_interval = interval;

		self
	}

	/// Validates the refresh interval and the key URL scheme.
	pub fn validate(&self) -> Result<(), ConfigError> {
		ensure_positive("refresh_interval", self.refresh_interval)?;

		validate_key_url(&self.key_url)
	}
}
impl Default for CredentialConfig {
	fn default() -> Self {
		Self {
			key_url: Url::parse(DEFAULT_KEY_URL).expect("Default key URL is a valid literal."),
			refresh_interval: Self::DEFAULT_REFRESH_INTERVAL,
		}
	}
}

/// Settings for bearer token verification.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
	/// Deployment environment.
	pub environment: Environment,
	/// Explicit mode; when unset, development deployments verify permissively and every other
	/// environment verifies strictly.
	pub mode: Option<VerificationMode>,
	/// Required `aud` claim value.
	pub expected_audience: Option<String>,
	/// Subjects a token may name.
	pub acceptable_subjects: AcceptableSubjects,
	/// Allows strict verification without any audience or subject restriction.
	pub allow_any_subject: bool,
	/// Clock skew tolerated on `exp`, `nbf`, and `iat`.
	pub leeway: Duration,
}
impl VerifierConfig {
	/// Overrides the environment.
	pub fn with_environment(mut self, environment: Environment) -> Self {
		self.environment = environment;

		self
	}

	/// Forces a verification mode.
	pub fn with_mode(mut self, mode: VerificationMode) -> Self {
		self.mode = Some(mode);

		self
	}

	/// Requires tokens to carry `audience` in their `aud` claim.
	pub fn with_expected_audience(mut self, audience: impl Into<String>) -> Self {
		self.expected_audience = Some(audience.into());

		self
	}

	/// Restricts the `sub` claim to `subjects`.
	pub fn with_acceptable_subjects(mut self, subjects: AcceptableSubjects) -> Self {
		self.acceptable_subjects = subjects;

		self
	}

	/// Opts out of the audience/subject requirement for strict verification.
	pub fn with_allow_any_subject(mut self, allow: bool) -> Self {
		self.allow_any_subject = allow;

		self
	}

	/// Overrides the tolerated clock skew.
	pub fn with_leeway(mut self, leeway: Duration) -> Self {
		self.leeway = if leeway.is_negative() { Duration::ZERO } else { leeway };

		self
	}

	/// Resolves the effective verification mode.
	pub fn effective_mode(&self) -> VerificationMode {
		self.mode.unwrap_or(if self.environment.is_development() {
			VerificationMode::Permissive
		} else {
			VerificationMode::Strict
		})
	}

	/// Returns true when a strict verifier would accept tokens for anyone.
	pub fn is_unrestricted(&self) -> bool {
		self.expected_audience.is_none() && self.acceptable_subjects.is_empty()
	}
}

/// Complete configuration for a [`Gateway`](crate::gateway::Gateway).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
	/// Rendezvous timing.
	pub rendezvous: RendezvousConfig,
	/// Key cache and source.
	pub credentials: CredentialConfig,
	/// Token verification.
	pub verifier: VerifierConfig,
}
impl GateConfig {
	/// Reads overrides from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_env_with(|name| std::env::var(name).ok())
	}

	/// Reads overrides through `lookup`, falling back to defaults for unset variables.
	pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
		let mut config = Self::default();

		if let Some(raw) = read(ENV_KEY_URL) {
			config.credentials = CredentialConfig::parse(raw.trim())?;
		}
		if let Some(raw) = read(ENV_ENVIRONMENT) {
			config.verifier.environment = raw.parse()?;
		}
		if let Some(raw) = read(ENV_COMPLETE_URL) {
			config.verifier.expected_audience = Some(raw.trim().to_owned());
		}

		config.validate()?;

		Ok(config)
	}

	/// Validates every section.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.rendezvous.validate()?;
		self.credentials.validate()
	}
}

/// Requires HTTPS for key URLs, allowing plain HTTP only for loopback hosts.
pub fn validate_key_url(url: &Url) -> Result<(), ConfigError> {
	let loopback = match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	};

	match url.scheme() {
		"https" => Ok(()),
		"http" if loopback => Ok(()),
		_ => Err(ConfigError::InsecureKeyUrl { url: url.to_string() }),
	}
}

fn ensure_positive(field: &'static str, value: Duration) -> Result<(), ConfigError> {
	if value.is_positive() {
		Ok(())
	} else {
		Err(ConfigError::InvalidDuration { field, reason: "must be positive" })
	}
}
