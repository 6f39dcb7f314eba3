//! Verification key material, the remote source it comes from, and the cache in front of it.

pub mod cache;
mod metrics;
pub mod source;

pub use cache::CredentialCache;
pub use metrics::FetchMetrics;
pub use source::*;

// crates.io
use base64::{
	Engine as _,
	engine::general_purpose::{STANDARD, STANDARD_NO_PAD},
};
use jsonwebtoken::DecodingKey;
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, error::KeyFetchError};

const PEM_LINE_WIDTH: usize = 64;

/// Key document served by the key endpoint.
///
/// Only `publicKey` is read; it carries a base64-encoded DER `SubjectPublicKeyInfo`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDocument {
	/// Base64 DER public key.
	pub public_key: String,
}
impl KeyDocument {
	/// Parses a key document, reporting the failing JSON path on error.
	pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyFetchError> {
		let mut de = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut de).map_err(|source| KeyFetchError::Parse { source })
	}
}

/// RSA public key ready for signature verification.
#[derive(Clone)]
pub struct KeyMaterial {
	der: Arc<[u8]>,
	decoding: DecodingKey,
	fingerprint: String,
}
impl KeyMaterial {
	/// Builds key material from DER-encoded `SubjectPublicKeyInfo` bytes.
	pub fn from_der(der: impl Into<Arc<[u8]>>) -> Result<Self, KeyFetchError> {
		let der = der.into();

		if der.is_empty() {
			return Err(KeyFetchError::InvalidKey { reason: "key is empty".into() });
		}

		let decoding = DecodingKey::from_rsa_pem(pem_from_der(&der).as_bytes())
			.map_err(|e| KeyFetchError::InvalidKey { reason: e.to_string() })?;
		let fingerprint = STANDARD_NO_PAD.encode(Sha256::digest(&der));

		Ok(Self { der, decoding, fingerprint })
	}

	/// Builds key material from base64-encoded DER.
	pub fn from_base64_der(encoded: &str) -> Result<Self, KeyFetchError> {
		let der = STANDARD
			.decode(encoded.trim())
			.map_err(|e| KeyFetchError::InvalidKey { reason: format!("invalid base64: {e}") })?;

		Self::from_der(der)
	}

	/// Builds key material from a parsed [`KeyDocument`].
	pub fn from_document(document: &KeyDocument) -> Result<Self, KeyFetchError> {
		Self::from_base64_der(&document.public_key)
	}

	/// Key handle used by the signature check.
	pub fn decoding_key(&self) -> &DecodingKey {
		&self.decoding
	}

	/// Raw DER bytes.
	pub fn der(&self) -> &[u8] {
		&self.der
	}

	/// Base64 (no padding) SHA-256 digest of the DER bytes; stable across refetches of the
	/// same key, so a change signals rotation.
	pub fn fingerprint(&self) -> &str {
		&self.fingerprint
	}

	/// PEM rendering of the public key.
	pub fn to_pem(&self) -> String {
		pem_from_der(&self.der)
	}
}
impl PartialEq for KeyMaterial {
	fn eq(&self, other: &Self) -> bool {
		self.der == other.der
	}
}
impl Eq for KeyMaterial {}
impl Debug for KeyMaterial {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("KeyMaterial").field("fingerprint", &self.fingerprint).finish()
	}
}

fn pem_from_der(der: &[u8]) -> String {
	let body = STANDARD.encode(der);
	let mut pem = String::from("-----BEGIN PUBLIC KEY-----\n");

	for line in body.as_bytes().chunks(PEM_LINE_WIDTH) {
		// Base64 output is ASCII, so every chunk is valid UTF-8.
		pem.push_str(&String::from_utf8_lossy(line));
		pem.push('\n');
	}

	pem.push_str("-----END PUBLIC KEY-----\n");

	pem
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::{ROGUE_PUBLIC_KEY, SIGNING_PUBLIC_KEY};

	#[test]
	fn document_parses_camel_case_field() {
		let document = KeyDocument::from_slice(b"{\"publicKey\":\"abc\",\"algorithm\":\"RS256\"}")
			.expect("Key document should parse.");

		assert_eq!(document.public_key, "abc");
	}

	#[test]
	fn document_errors_report_the_path() {
		let err = KeyDocument::from_slice(b"{\"publicKey\":42}")
			.expect_err("Numeric key should be rejected.");

		match err {
			KeyFetchError::Parse { source } => assert_eq!(source.path().to_string(), "publicKey"),
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	#[test]
	fn fixture_keys_parse_with_distinct_fingerprints() {
		let signing = KeyMaterial::from_base64_der(SIGNING_PUBLIC_KEY)
			.expect("Signing fixture should parse.");
		let again = KeyMaterial::from_base64_der(SIGNING_PUBLIC_KEY)
			.expect("Signing fixture should parse twice.");
		let rogue =
			KeyMaterial::from_base64_der(ROGUE_PUBLIC_KEY).expect("Rogue fixture should parse.");

		assert_eq!(signing.fingerprint(), again.fingerprint());
		assert_ne!(signing.fingerprint(), rogue.fingerprint());
		assert_eq!(signing, again);
		assert!(signing.to_pem().starts_with("-----BEGIN PUBLIC KEY-----\n"));
		assert!(signing.to_pem().lines().all(|line| line.len() <= PEM_LINE_WIDTH));
	}

	#[test]
	fn garbage_key_material_is_rejected() {
		assert!(matches!(
			KeyMaterial::from_base64_der("not base64!"),
			Err(KeyFetchError::InvalidKey { .. })
		));
		assert!(matches!(
			KeyMaterial::from_base64_der(""),
			Err(KeyFetchError::InvalidKey { .. })
		));
		assert!(matches!(
			KeyMaterial::from_base64_der("AAECAwQFBgcICQ=="),
			Err(KeyFetchError::InvalidKey { .. })
		));
	}
}
