//! Development-only verifier that accepts every request.

// self
use crate::{
	_prelude::*,
	auth::Identity,
	config::Environment,
	obs::{self, OpKind, OpOutcome},
	verify::{TokenVerifier, VerifyFuture},
};

/// Accepts every request with [`Identity::placeholder`], without reading the token.
#[derive(Clone, Debug)]
pub struct PermissiveVerifier {
	environment: Environment,
}
impl PermissiveVerifier {
	/// Builds the verifier; fails unless `environment` is explicitly development.
	pub fn new(environment: Environment) -> Result<Self> {
		if !environment.is_development() {
			return Err(Error::MisconfiguredPermissiveMode { environment });
		}

		#[cfg(feature = "tracing")]
		{
			tracing::warn!(%environment, "bearer tokens are not verified");
		}

		Ok(Self { environment })
	}

	/// Environment the verifier was built for.
	pub fn environment(&self) -> Environment {
		self.environment
	}
}
impl TokenVerifier for PermissiveVerifier {
	fn verify<'a>(&'a self, _token: &'a str) -> VerifyFuture<'a> {
		obs::record_op_outcome(OpKind::Verify, OpOutcome::Success);

		Box::pin(async { Ok::<_, Error>(Identity::placeholder()) })
	}

	fn verify_authorization<'a>(&'a self, _authorization: Option<&'a str>) -> VerifyFuture<'a> {
		self.verify("")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn production_is_refused() {
		let err = PermissiveVerifier::new(Environment::Production)
			.expect_err("Permissive mode must fail closed in production.");

		assert!(matches!(
			err,
			Error::MisconfiguredPermissiveMode { environment: Environment::Production }
		));
		assert_eq!(
			err.to_string(),
			"Permissive token verification is not allowed in the production environment."
		);
	}

	#[tokio::test]
	async fn development_accepts_anything() {
		let verifier = PermissiveVerifier::new(Environment::Development)
			.expect("Development environment should allow permissive mode.");

		for header in [None, Some("Bearer not-a-jwt"), Some("Basic abc")] {
			let identity = verifier
				.verify_authorization(header)
				.await
				.expect("Permissive verifier accepts every request.");

			assert!(identity.is_placeholder());
			assert!(identity.subject.is_none());
		}

		assert_eq!(verifier.environment(), Environment::Development);
	}
}
