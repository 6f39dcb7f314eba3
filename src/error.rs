//! Crate-level error types shared across the rendezvous, key cache, and verifier.

// self
use crate::{_prelude::*, auth::IdentifierError, config::Environment, verify::Rejection};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Verification key could not be refreshed; retry the enclosing request.
	#[error("Verification key could not be fetched.")]
	CredentialFetch(
		#[from]
		#[source]
		KeyFetchError,
	),
	/// Bearer token failed verification.
	#[error("Token rejected: {0}.")]
	Rejected(#[from] Rejection),
	/// Permissive verification was selected for an environment that does not allow it.
	#[error("Permissive token verification is not allowed in the {environment} environment.")]
	MisconfiguredPermissiveMode {
		/// Environment the verifier was built for.
		environment: Environment,
	},
	/// Request supplied an empty job id.
	#[error("Job id `{job_id}` is not usable.")]
	InvalidJobId {
		/// Job identifier as supplied by the caller.
		job_id: String,
		/// Validation failure.
		#[source]
		source: IdentifierError,
	},
	/// No job was defined for the id before the wait window closed.
	#[error("Job `{job_id}` was not defined within the wait window.")]
	JobNotFound {
		/// Job identifier the caller waited for.
		job_id: String,
	},
}

/// Configuration and validation failures raised at construction time.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Key URL could not be parsed.
	#[error("Key URL is invalid.")]
	InvalidKeyUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Key URL must use HTTPS unless it points at a loopback host.
	#[error("The key URL must use HTTPS: {url}.")]
	InsecureKeyUrl {
		/// URL that failed validation.
		url: String,
	},
	/// A duration setting is out of range.
	#[error("The {field} setting is invalid: {reason}.")]
	InvalidDuration {
		/// Setting name.
		field: &'static str,
		/// Why the value was rejected.
		reason: &'static str,
	},
	/// Environment name is not recognized.
	#[error("Unknown server environment `{value}`.")]
	UnknownEnvironment {
		/// Raw value supplied by the caller.
		value: String,
	},
	/// Identifier failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] IdentifierError),
	/// Group of entities mixes anonymous and identified members.
	#[error("{group} is not valid; when it holds more than one entity every entity needs an id.")]
	InvalidEntityGroup {
		/// Name of the offending group.
		group: String,
	},
	/// Strict verifier would accept any audience and subject.
	#[error(
		"Strict verification needs an expected audience or acceptable subjects; set allow_any_subject to opt out."
	)]
	UnrestrictedSubjects,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures raised while refreshing the verification key.
#[derive(Debug, ThisError)]
pub enum KeyFetchError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the key endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Key endpoint answered with a non-success status.
	#[error("Key endpoint returned HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
	},
	/// Key endpoint responded with a document that could not be parsed.
	#[error("Key endpoint returned a malformed document.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
	},
	/// Document parsed but the key material is unusable.
	#[error("Key endpoint returned unusable key material: {reason}.")]
	InvalidKey {
		/// Why the key was rejected.
		reason: String,
	},
}
impl KeyFetchError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for KeyFetchError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
