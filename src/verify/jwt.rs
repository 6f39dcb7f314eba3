//! RS256 JWT verification against the cached verification key.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, Validation};
use serde::{Deserializer, de::IgnoredAny};
// self
use crate::{
	_prelude::*,
	auth::{AcceptableSubjects, Identity, TokenSecret},
	clock::Clock,
	config::VerifierConfig,
	error::ConfigError,
	key::CredentialCache,
	obs::{self, OpKind, OpOutcome, OpSpan},
	verify::{Rejection, TokenVerifier, VerifyFuture},
};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
	One(String),
	Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct Claims {
	sub: Option<String>,
	aud: Option<Audience>,
	iss: Option<String>,
	#[serde(default, deserialize_with = "numeric_date")]
	exp: Option<i64>,
	#[serde(default, deserialize_with = "numeric_date")]
	nbf: Option<i64>,
	#[serde(default, deserialize_with = "numeric_date")]
	iat: Option<i64>,
}
impl Claims {
	fn audiences(&self) -> &[String] {
		match &self.aud {
			Some(Audience::One(aud)) => std::slice::from_ref(aud),
			Some(Audience::Many(auds)) => auds,
			None => &[],
		}
	}

	fn into_identity(self, token: &str) -> Identity {
		let audience = self.audiences().to_vec();
		let expires_at = self.exp.and_then(|exp| OffsetDateTime::from_unix_timestamp(exp).ok());

		Identity {
			subject: self.sub,
			audience,
			issuer: self.iss,
			expires_at,
			token: TokenSecret::new(token),
		}
	}
}

/// Strict verifier: RS256 signature, `exp`/`nbf`/`iat` against the injected clock, then the
/// configured audience and subject restrictions.
///
/// The key is read from the [`CredentialCache`] on every call, so rotations take effect as
/// soon as the cache refetches. A token without `exp` is rejected as invalid.
#[derive(Debug)]
pub struct JwtVerifier {
	keys: Arc<CredentialCache>,
	clock: Arc<dyn Clock>,
	validation: Validation,
	expected_audience: Option<String>,
	acceptable_subjects: AcceptableSubjects,
	leeway: i64,
}
impl JwtVerifier {
	/// Builds a verifier over `keys`.
	///
	/// Fails with [`ConfigError::UnrestrictedSubjects`] when neither an expected audience nor
	/// acceptable subjects are configured and `allow_any_subject` is not set.
	pub fn new(
		keys: Arc<CredentialCache>,
		clock: Arc<dyn Clock>,
		config: &VerifierConfig,
	) -> Result<Self, ConfigError> {
		if config.is_unrestricted() && !config.allow_any_subject {
			return Err(ConfigError::UnrestrictedSubjects);
		}

		// The library only checks the signature and algorithm; time and audience claims are
		// checked against the injected clock below.
		let mut validation = Validation::new(Algorithm::RS256);

		validation.validate_exp = false;
		validation.validate_nbf = false;
		validation.validate_aud = false;
		validation.required_spec_claims.clear();

		Ok(Self {
			keys,
			clock,
			validation,
			expected_audience: config.expected_audience.clone(),
			acceptable_subjects: config.acceptable_subjects.clone(),
			leeway: config.leeway.whole_seconds().max(0),
		})
	}

	async fn verify_inner(&self, token: &str) -> Result<Identity> {
		let claims = parse(token)?;
		let key = self.keys.get_key().await?;

		jsonwebtoken::decode::<IgnoredAny>(token, key.decoding_key(), &self.validation)
			.map_err(|_| Rejection::Invalid)?;

		self.check_claims(&claims)?;

		Ok(claims.into_identity(token))
	}

	fn check_claims(&self, claims: &Claims) -> Result<(), Rejection> {
		let now = self.clock.wall().unix_timestamp();
		let exp = claims.exp.ok_or(Rejection::Invalid)?;

		if now >= exp.saturating_add(self.leeway) {
			return Err(Rejection::Expired);
		}
		if [claims.nbf, claims.iat].into_iter().flatten().any(|at| at > now.saturating_add(self.leeway))
		{
			return Err(Rejection::NotYetValid);
		}
		if self
			.expected_audience
			.as_ref()
			.is_some_and(|expected| !claims.audiences().iter().any(|aud| aud == expected))
		{
			return Err(Rejection::AudienceMismatch);
		}
		if !self.acceptable_subjects.is_empty()
			&& !claims.sub.as_deref().is_some_and(|sub| self.acceptable_subjects.contains(sub))
		{
			return Err(Rejection::AudienceMismatch);
		}

		Ok(())
	}
}
impl TokenVerifier for JwtVerifier {
	fn verify<'a>(&'a self, token: &'a str) -> VerifyFuture<'a> {
		const KIND: OpKind = OpKind::Verify;

		Box::pin(async move {
			let span = OpSpan::new(KIND, "verify");

			obs::record_op_outcome(KIND, OpOutcome::Attempt);

			let result = span.instrument(self.verify_inner(token)).await;

			match &result {
				Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
				Err(Error::Rejected(rejection)) => {
					obs::record_rejection(rejection.as_str());
					obs::record_op_outcome(KIND, OpOutcome::Miss);
				},
				Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
			}

			result
		})
	}
}

/// NumericDate seconds; fractional values are truncated toward the earlier second.
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<f64>::deserialize(deserializer)?.map(|at| at.floor() as i64))
}

/// Structural check: three segments, a JSON object header, and a JSON claims object.
///
/// The header's contents are left to the signature stage, so an unknown or unsupported `alg`
/// is rejected there as invalid rather than malformed.
fn parse(token: &str) -> Result<Claims, Rejection> {
	let mut segments = token.split('.');
	let (Some(header), Some(payload), Some(signature), None) =
		(segments.next(), segments.next(), segments.next(), segments.next())
	else {
		return Err(Rejection::Malformed);
	};

	if signature.is_empty() {
		return Err(Rejection::Malformed);
	}

	let header = URL_SAFE_NO_PAD.decode(header).map_err(|_| Rejection::Malformed)?;

	serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(&header)
		.map_err(|_| Rejection::Malformed)?;

	let payload = URL_SAFE_NO_PAD.decode(payload).map_err(|_| Rejection::Malformed)?;

	serde_json::from_slice(&payload).map_err(|_| Rejection::Malformed)
}
