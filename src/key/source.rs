//! Transport seam for fetching the verification key.
//!
//! [`KeySource`] is the cache's only dependency on a network stack. The crate ships
//! [`HttpKeySource`] (feature `reqwest`); tests and embedders can plug in anything that can
//! produce [`KeyMaterial`].

// std
#[cfg(feature = "reqwest")] use std::time::Duration as StdDuration;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::{header::ACCEPT, redirect::Policy};
// self
use crate::{_prelude::*, error::KeyFetchError, key::KeyMaterial};
#[cfg(feature = "reqwest")]
use crate::{config::validate_key_url, error::ConfigError, key::KeyDocument};

/// Boxed future returned by [`KeySource::fetch`].
pub type KeyFuture<'a> = Pin<Box<dyn Future<Output = Result<KeyMaterial, KeyFetchError>> + 'a + Send>>;

/// Remote origin of the verification key.
///
/// Implementations perform exactly one fetch per call; staleness, single-flight, and error
/// bookkeeping live in [`CredentialCache`](crate::key::CredentialCache).
pub trait KeySource
where
	Self: Send + Sync,
{
	/// Fetches the current key.
	fn fetch(&self) -> KeyFuture<'_>;
}

/// Fetches the key document over HTTP(S) with reqwest.
///
/// Redirects are not followed: the key endpoint must answer directly so a compromised
/// redirect target cannot substitute its own key.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct HttpKeySource {
	client: ReqwestClient,
	url: Url,
}
#[cfg(feature = "reqwest")]
impl HttpKeySource {
	/// Upper bound for a single key fetch.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

	/// Builds a source for `url` with a dedicated client.
	pub fn new(url: Url) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.redirect(Policy::none())
			.timeout(Self::DEFAULT_TIMEOUT)
			.build()?;

		Self::with_client(client, url)
	}

	/// Wraps an existing reqwest [`ReqwestClient`]; configure it not to follow redirects.
	pub fn with_client(client: ReqwestClient, url: Url) -> Result<Self, ConfigError> {
		validate_key_url(&url)?;

		Ok(Self { client, url })
	}

	/// Endpoint this source reads from.
	pub fn url(&self) -> &Url {
		&self.url
	}
}
#[cfg(feature = "reqwest")]
impl KeySource for HttpKeySource {
	fn fetch(&self) -> KeyFuture<'_> {
		Box::pin(async move {
			let response = self
				.client
				.get(self.url.clone())
				.header(ACCEPT, "application/json")
				.send()
				.await?;
			let status = response.status();

			if !status.is_success() {
				return Err(KeyFetchError::Status { status: status.as_u16() });
			}

			let body = response.bytes().await?;
			let document = KeyDocument::from_slice(&body)?;

			KeyMaterial::from_document(&document)
		})
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;

	#[test]
	fn insecure_remote_url_is_rejected() {
		let url = Url::parse("http://keys.example.com/public-key").expect("URL should parse.");

		assert!(matches!(HttpKeySource::new(url), Err(ConfigError::InsecureKeyUrl { .. })));
	}

	#[test]
	fn https_url_is_accepted() {
		let url = Url::parse("https://keys.example.com/public-key").expect("URL should parse.");
		let source = HttpKeySource::new(url.clone()).expect("HTTPS source should build.");

		assert_eq!(source.url(), &url);
	}
}
