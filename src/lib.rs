//! Token-gated job rendezvous for split start/collect HTTP requests: bounded waits keyed by job
//! id, single-flight verification key caching, and RS256 bearer verification in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod job;
pub mod key;
pub mod obs;
pub mod verify;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use jsonwebtoken::{Algorithm, EncodingKey, Header};
	// self
	use crate::{
		clock::{Clock, ManualClock},
		key::{CredentialCache, KeyFuture, KeyMaterial, KeySource},
	};

	/// RSA private key (PKCS#1 PEM) whose public half is [`SIGNING_PUBLIC_KEY`].
	pub const SIGNING_PRIVATE_KEY: &str = include_str!("../tests/fixtures/signing.key.pem");
	/// Base64 DER SubjectPublicKeyInfo matching [`SIGNING_PRIVATE_KEY`].
	pub const SIGNING_PUBLIC_KEY: &str = include_str!("../tests/fixtures/signing.pub.b64");
	/// Unrelated RSA private key used to forge signatures.
	pub const ROGUE_PRIVATE_KEY: &str = include_str!("../tests/fixtures/rogue.key.pem");
	/// Base64 DER SubjectPublicKeyInfo matching [`ROGUE_PRIVATE_KEY`].
	pub const ROGUE_PUBLIC_KEY: &str = include_str!("../tests/fixtures/rogue.pub.b64");

	/// Signs `claims` with RS256 using the given PKCS#1 PEM private key.
	pub fn sign_rs256(private_pem: &str, claims: &serde_json::Value) -> String {
		let key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
			.expect("Test private key fixture should parse.");

		jsonwebtoken::encode(&Header::new(Algorithm::RS256), claims, &key)
			.expect("Test token should encode.")
	}

	/// Builds [`KeyMaterial`] from one of the public key fixtures.
	pub fn fixture_key(public_b64: &str) -> KeyMaterial {
		KeyMaterial::from_base64_der(public_b64.trim()).expect("Public key fixture should parse.")
	}

	/// Key source that serves a swappable key and counts how often it was asked.
	#[derive(Debug)]
	pub struct StaticKeySource {
		key: Mutex<Option<KeyMaterial>>,
		fetches: std::sync::atomic::AtomicUsize,
	}
	impl StaticKeySource {
		/// Serves `key` on every fetch.
		pub fn new(key: KeyMaterial) -> Self {
			Self { key: Mutex::new(Some(key)), fetches: Default::default() }
		}

		/// Fails every fetch until a key is installed again.
		pub fn failing() -> Self {
			Self { key: Mutex::new(None), fetches: Default::default() }
		}

		/// Replaces the served key; `None` makes subsequent fetches fail.
		pub fn set(&self, key: Option<KeyMaterial>) {
			*self.key.lock() = key;
		}

		/// Number of fetches performed so far.
		pub fn fetches(&self) -> usize {
			self.fetches.load(std::sync::atomic::Ordering::SeqCst)
		}
	}
	impl KeySource for StaticKeySource {
		fn fetch(&self) -> KeyFuture<'_> {
			self.fetches.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

			let key = self.key.lock().clone();

			Box::pin(async move {
				key.ok_or_else(|| crate::error::KeyFetchError::Status { status: 503 })
			})
		}
	}

	/// Builds a credential cache over `source` driven by `clock` with the default interval.
	pub fn build_test_cache(
		source: Arc<StaticKeySource>,
		clock: Arc<ManualClock>,
	) -> Arc<CredentialCache> {
		Arc::new(CredentialCache::new(source, clock))
	}

	/// Unix timestamp of the manual clock's wall reading, shifted by `offset_secs`.
	pub fn unix_at(clock: &ManualClock, offset_secs: i64) -> i64 {
		clock.wall().unix_timestamp() + offset_secs
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeSet, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use jsonwebtoken;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
