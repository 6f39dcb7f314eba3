//! Shared fixtures for integration tests.

#![allow(dead_code)]

// crates.io
use httpmock::prelude::*;
// self
use agent_gate::{
	clock::{Clock, ManualClock},
	jsonwebtoken::{self, Algorithm, EncodingKey, Header},
	url::Url,
};

pub const SIGNING_PRIVATE_KEY: &str = include_str!("../fixtures/signing.key.pem");
pub const SIGNING_PUBLIC_KEY: &str = include_str!("../fixtures/signing.pub.b64");
pub const ROGUE_PRIVATE_KEY: &str = include_str!("../fixtures/rogue.key.pem");
pub const ROGUE_PUBLIC_KEY: &str = include_str!("../fixtures/rogue.pub.b64");
pub const KEY_PATH: &str = "/public-key";
pub const AUDIENCE: &str = "https://agents.example.com";

pub fn sign(private_pem: &str, claims: &serde_json::Value) -> String {
	let key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
		.expect("Private key fixture should parse.");

	jsonwebtoken::encode(&Header::new(Algorithm::RS256), claims, &key)
		.expect("Test token should encode.")
}

pub fn claims(clock: &ManualClock, subject: &str) -> serde_json::Value {
	let now = clock.wall().unix_timestamp();

	serde_json::json!({
		"sub": subject,
		"aud": AUDIENCE,
		"iat": now,
		"exp": now + 300,
	})
}

pub fn bearer(token: &str) -> String {
	format!("Bearer {token}")
}

pub fn key_document(public_b64: &str) -> String {
	serde_json::json!({ "publicKey": public_b64.trim() }).to_string()
}

pub fn key_url(server: &MockServer) -> Url {
	Url::parse(&server.url(KEY_PATH)).expect("Mock key URL should parse.")
}

pub async fn serve_key<'a>(server: &'a MockServer, public_b64: &str) -> httpmock::Mock<'a> {
	let body = key_document(public_b64);

	server
		.mock_async(|when, then| {
			when.method(GET).path(KEY_PATH);
			then.status(200).header("content-type", "application/json").body(body.as_str());
		})
		.await
}
