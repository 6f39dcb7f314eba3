mod common;

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use time::Duration;
// self
use agent_gate::{
	clock::ManualClock,
	error::{ConfigError, Error, KeyFetchError},
	key::{CredentialCache, HttpKeySource, KeyMaterial},
	url::Url,
};
use common::*;

fn cache(server: &MockServer, clock: &ManualClock) -> CredentialCache {
	let source = HttpKeySource::new(key_url(server)).expect("Loopback key URL should be accepted.");

	CredentialCache::new(Arc::new(source), Arc::new(clock.clone()))
}

async fn fetch_error(cache: &CredentialCache) -> KeyFetchError {
	match cache.get_key().await {
		Err(Error::CredentialFetch(e)) => e,
		other => panic!("Expected a credential fetch failure, got {other:?}."),
	}
}

#[tokio::test]
async fn key_is_fetched_once_per_refresh_interval() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let mock = serve_key(&server, SIGNING_PUBLIC_KEY).await;
	let clock = ManualClock::default();
	let cache = cache(&server, &clock);
	let first = cache.get_key().await?;
	let second = cache.get_key().await?;

	assert_eq!(first, second);
	assert_eq!(first, KeyMaterial::from_base64_der(SIGNING_PUBLIC_KEY)?);
	mock.assert_calls_async(1).await;

	clock.advance(Duration::seconds(61));
	cache.get_key().await?;
	cache.get_key().await?;
	mock.assert_calls_async(2).await;

	assert_eq!(cache.metrics.attempts(), 2);
	assert_eq!(cache.metrics.cache_hits(), 2);

	Ok(())
}

#[tokio::test]
async fn concurrent_cold_lookups_share_one_request() {
	let server = MockServer::start_async().await;
	let mock = serve_key(&server, SIGNING_PUBLIC_KEY).await;
	let clock = ManualClock::default();
	let cache = cache(&server, &clock);
	let (a, b, c, d) = tokio::join!(cache.get_key(), cache.get_key(), cache.get_key(), cache.get_key());

	for result in [a, b, c, d] {
		result.expect("Every caller should receive the key.");
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn non_success_status_is_reported() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(KEY_PATH);
			then.status(503);
		})
		.await;
	let clock = ManualClock::default();
	let cache = cache(&server, &clock);

	assert!(matches!(fetch_error(&cache).await, KeyFetchError::Status { status: 503 }));
	// Failures are not cached; the next lookup asks again.
	assert!(matches!(fetch_error(&cache).await, KeyFetchError::Status { status: 503 }));
	mock.assert_calls_async(2).await;
	assert_eq!(cache.metrics.failures(), 2);
	assert!(cache.cached().is_none());
}

#[tokio::test]
async fn redirects_are_not_followed() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(KEY_PATH);
			then.status(302).header("location", "https://keys.attacker.example/public-key");
		})
		.await;

	let clock = ManualClock::default();
	let cache = cache(&server, &clock);

	assert!(matches!(fetch_error(&cache).await, KeyFetchError::Status { status: 302 }));
}

#[tokio::test]
async fn malformed_documents_are_parse_errors() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(KEY_PATH);
			then.status(200).header("content-type", "application/json").body("{\"key\":\"abc\"}");
		})
		.await;

	let clock = ManualClock::default();
	let cache = cache(&server, &clock);

	assert!(matches!(fetch_error(&cache).await, KeyFetchError::Parse { .. }));
}

#[tokio::test]
async fn unusable_key_material_is_rejected() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(KEY_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(key_document("bm90IGEga2V5").as_str());
		})
		.await;

	let clock = ManualClock::default();
	let cache = cache(&server, &clock);

	assert!(matches!(fetch_error(&cache).await, KeyFetchError::InvalidKey { .. }));
}

#[tokio::test]
async fn rotation_keeps_serving_the_old_key_until_it_goes_stale() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let mut mock = serve_key(&server, SIGNING_PUBLIC_KEY).await;
	let clock = ManualClock::default();
	let cache = cache(&server, &clock);
	let original = cache.get_key().await?;

	mock.delete_async().await;
	mock = serve_key(&server, ROGUE_PUBLIC_KEY).await;

	assert_eq!(cache.get_key().await?, original);

	clock.advance(Duration::seconds(61));

	let rotated = cache.get_key().await?;

	assert_ne!(rotated.fingerprint(), original.fingerprint());
	mock.assert_calls_async(1).await;

	Ok(())
}

#[test]
fn remote_plain_http_is_refused() {
	let url = Url::parse("http://keys.example.com/public-key").expect("URL should parse.");

	assert!(matches!(HttpKeySource::new(url), Err(ConfigError::InsecureKeyUrl { .. })));
}
