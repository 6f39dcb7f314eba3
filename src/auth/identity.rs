//! Caller identity produced by a successful verification.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Authenticated caller handed to the request layer after verification.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
	/// `sub` claim, when the token carried one.
	pub subject: Option<String>,
	/// Audiences named by the `aud` claim.
	pub audience: Vec<String>,
	/// `iss` claim, when present.
	pub issuer: Option<String>,
	/// Expiry derived from the `exp` claim.
	pub expires_at: Option<OffsetDateTime>,
	/// Token the identity was derived from; empty for the development placeholder.
	pub token: TokenSecret,
}
impl Identity {
	/// Fixed identity returned by permissive verification.
	pub fn placeholder() -> Self {
		Self {
			subject: None,
			audience: Vec::new(),
			issuer: None,
			expires_at: None,
			token: TokenSecret::new(String::new()),
		}
	}

	/// Returns true for the identity produced without inspecting any token.
	pub fn is_placeholder(&self) -> bool {
		self.token.is_empty()
	}
}
impl Debug for Identity {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Identity")
			.field("subject", &self.subject)
			.field("audience", &self.audience)
			.field("issuer", &self.issuer)
			.field("expires_at", &self.expires_at)
			.field("token", &"<redacted>")
			.finish()
	}
}
