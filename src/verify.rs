//! Bearer token verification.
//!
//! [`JwtVerifier`] walks a token through `parsed -> signature checked -> claims checked` and
//! either accepts it with an [`Identity`] or rejects it with a [`Rejection`]. Timing and
//! membership failures are rejections; only a key fetch failure surfaces as a different
//! error, so the caller can retry the enclosing request.
//!
//! [`PermissiveVerifier`] accepts everything and can only be built for a development
//! environment. [`build_verifier`] picks between the two from a [`VerifierConfig`].

pub mod jwt;
pub mod permissive;

pub use jwt::JwtVerifier;
pub use permissive::PermissiveVerifier;

// self
use crate::{
	_prelude::*,
	auth::Identity,
	clock::Clock,
	config::{VerificationMode, VerifierConfig},
	key::CredentialCache,
	obs,
};

/// Boxed future returned by [`TokenVerifier`] methods.
pub type VerifyFuture<'a> = Pin<Box<dyn Future<Output = Result<Identity>> + 'a + Send>>;

/// Why a bearer token was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ThisError)]
pub enum Rejection {
	/// Token or authorization header could not be parsed.
	#[error("malformed")]
	Malformed,
	/// Signature, algorithm, or mandatory claim check failed.
	#[error("invalid")]
	Invalid,
	/// `exp` has passed.
	#[error("expired")]
	Expired,
	/// `nbf` or `iat` lies in the future.
	#[error("not_yet_valid")]
	NotYetValid,
	/// `aud` or `sub` does not match the configured restriction.
	#[error("audience_mismatch")]
	AudienceMismatch,
}
impl Rejection {
	/// Returns a stable label suitable for logs and responses.
	pub const fn as_str(self) -> &'static str {
		match self {
			Rejection::Malformed => "malformed",
			Rejection::Invalid => "invalid",
			Rejection::Expired => "expired",
			Rejection::NotYetValid => "not_yet_valid",
			Rejection::AudienceMismatch => "audience_mismatch",
		}
	}
}

/// Decides whether a request carries a valid credential.
pub trait TokenVerifier
where
	Self: Debug + Send + Sync,
{
	/// Verifies a raw token (without the `Bearer` scheme).
	fn verify<'a>(&'a self, token: &'a str) -> VerifyFuture<'a>;

	/// Verifies the value of an `Authorization` header.
	///
	/// A missing header or a scheme other than `Bearer` is rejected as malformed.
	fn verify_authorization<'a>(&'a self, authorization: Option<&'a str>) -> VerifyFuture<'a> {
		match authorization.and_then(bearer_token) {
			Some(token) => self.verify(token),
			None => Box::pin(async {
				obs::record_rejection(Rejection::Malformed.as_str());

				Err::<Identity, Error>(Rejection::Malformed.into())
			}),
		}
	}
}

/// Extracts the token from a `Bearer <token>` header value; the scheme is case-insensitive.
pub fn bearer_token(authorization: &str) -> Option<&str> {
	let (scheme, token) = authorization.trim().split_once(' ')?;
	let token = token.trim();

	(scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Builds the verifier selected by `config`.
///
/// Unless a mode is forced, development deployments verify permissively and every other
/// environment verifies strictly. Permissive verification outside development fails with
/// [`Error::MisconfiguredPermissiveMode`].
pub fn build_verifier(
	config: &VerifierConfig,
	keys: Arc<CredentialCache>,
	clock: Arc<dyn Clock>,
) -> Result<Arc<dyn TokenVerifier>> {
	let verifier: Arc<dyn TokenVerifier> = match config.effective_mode() {
		VerificationMode::Strict => Arc::new(JwtVerifier::new(keys, clock, config)?),
		VerificationMode::Permissive => Arc::new(PermissiveVerifier::new(config.environment)?),
	};

	Ok(verifier)
}
