//! Token requests and the minted tokens that answer them.

// self
use crate::{
	_prelude::*,
	auth::{AccountName, Region, TokenSecret},
	credentials::CredentialSource,
};

/// Everything a signer needs to mint a database authentication token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRequest {
	/// Database endpoint host name.
	pub host: String,
	/// Database endpoint port.
	pub port: u16,
	/// Database account the token authenticates as.
	pub account: AccountName,
	/// Region the endpoint lives in.
	pub region: Region,
	/// Where the signing credentials come from.
	pub credentials: CredentialSource,
}
impl TokenRequest {
	/// Creates a request signed with the ambient credentials.
	pub fn new(host: impl Into<String>, port: u16, account: AccountName, region: Region) -> Self {
		Self { host: host.into(), port, account, region, credentials: Default::default() }
	}

	/// Signs with the provided credential source instead of the ambient one.
	pub fn with_credentials(mut self, credentials: CredentialSource) -> Self {
		self.credentials = credentials;

		self
	}

	/// Returns the `host:port` pair the token is bound to.
	pub fn endpoint(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}
}

/// Token value plus the instant it stops being accepted.
#[derive(Clone, PartialEq, Eq)]
pub struct MintedToken {
	/// Token value; callers must avoid logging it.
	pub secret: TokenSecret,
	/// Instant the token was minted.
	pub issued_at: OffsetDateTime,
	/// Instant after which the database rejects the token.
	pub expires_at: OffsetDateTime,
}
impl MintedToken {
	/// Creates a token valid for `window` starting at `issued_at`.
	pub fn new(secret: impl Into<String>, issued_at: OffsetDateTime, window: Duration) -> Self {
		Self { secret: TokenSecret::new(secret), issued_at, expires_at: issued_at + window }
	}

	/// Validity left at the provided instant; negative once expired.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		self.expires_at - now
	}

	/// Returns `true` if the token may be handed out at `now` without minting a replacement.
	///
	/// That needs at least `safety_margin` of validity left; an expired token never qualifies.
	pub fn is_reusable_at(&self, now: OffsetDateTime, safety_margin: Duration) -> bool {
		let remaining = self.remaining_at(now);

		remaining.is_positive() && remaining >= safety_margin
	}
}
impl Debug for MintedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MintedToken")
			.field("secret", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
