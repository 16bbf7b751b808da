//! Token signing: the [`SignToken`] primitive and the [`TokenMinter`] adapter that stamps expiry.
//!
//! `SignToken` is the narrow seam to whatever produces the signed string (the built-in
//! [`SigV4Presigner`] or a host-provided SDK call). `TokenMinter` wraps it so the rest of the
//! crate deals in [`MintedToken`]s whose expiry is computed locally, since the token format
//! never echoes one back. The stamped window never outlives what the signer itself claims.

pub mod sigv4;

pub use sigv4::SigV4Presigner;

// self
use crate::{
	_prelude::*,
	auth::{MintedToken, TokenRequest},
	clock::Clock,
	config::TokenPolicy,
	error::BoxError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Boxed future returned by [`SignToken::sign`].
pub type SignerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SigningError>> + 'a + Send>>;

/// Signing primitive that turns a [`TokenRequest`] into a token string.
pub trait SignToken
where
	Self: Send + Sync,
{
	/// Signs a token for the request with the identity its credential source names.
	fn sign<'a>(&'a self, request: &'a TokenRequest) -> SignerFuture<'a, String>;

	/// How long tokens from this signer are accepted, when the signer fixes it.
	fn validity(&self) -> Option<Duration> {
		None
	}
}

/// Failures raised while resolving credentials or signing.
#[derive(Debug, ThisError)]
pub enum SigningError {
	/// No credentials were available from the configured source.
	#[error("No cloud credentials are available to sign the token.")]
	MissingCredentials,
	/// The credential source failed.
	#[error("Cloud credentials could not be resolved: {message}.")]
	Credentials {
		/// Provider-supplied description of the failure.
		message: String,
	},
	/// The configured provider cannot serve the connection's credential source.
	#[error("The credentials provider cannot resolve {kind} credentials.")]
	UnsupportedCredentialSource {
		/// Label of the requested source.
		kind: &'static str,
	},
	/// The signing step itself failed.
	#[error("Token signing failed.")]
	Signer {
		/// Underlying signer failure.
		#[source]
		source: BoxError,
	},
}
impl SigningError {
	/// Wraps a signer-specific failure.
	pub fn signer(src: impl Into<BoxError>) -> Self {
		Self::Signer { source: src.into() }
	}
}

/// Adapter that signs through a [`SignToken`] and stamps `now + token_window` as the expiry.
///
/// The window is the shorter of the configured one and [`SignToken::validity`].
#[derive(Clone)]
pub struct TokenMinter {
	signer: Arc<dyn SignToken>,
	clock: Arc<dyn Clock>,
	token_window: Duration,
}
impl TokenMinter {
	/// Creates a minter over the provided signer and clock.
	pub fn new(signer: Arc<dyn SignToken>, clock: Arc<dyn Clock>, token_window: Duration) -> Self {
		Self { signer, clock, token_window: Duration::ZERO }.with_token_window(token_window)
	}

	/// Creates a minter stamping the window of `policy`.
	pub fn from_policy(
		signer: Arc<dyn SignToken>,
		clock: Arc<dyn Clock>,
		policy: &TokenPolicy,
	) -> Self {
		Self::new(signer, clock, policy.token_window)
	}

	/// Replaces the configured window; it is still capped by the signer's validity.
	pub fn with_token_window(mut self, token_window: Duration) -> Self {
		let token_window = token_window.clamp(Duration::ZERO, TokenPolicy::MAX_TOKEN_WINDOW);

		self.token_window = match self.signer.validity() {
			Some(validity) => token_window.min(validity),
			None => token_window,
		};

		self
	}

	/// Returns the validity window stamped onto minted tokens.
	pub fn token_window(&self) -> Duration {
		self.token_window
	}

	/// Signs a fresh token; failures surface as [`Error::SigningFailed`] and are not retried.
	pub async fn mint(&self, request: &TokenRequest) -> Result<MintedToken> {
		const KIND: FlowKind = FlowKind::Mint;

		let span = FlowSpan::new(KIND, "mint");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let issued_at = self.clock.now();
				let value = self.signer.sign(request).await?;

				Ok(MintedToken::new(value, issued_at, self.token_window))
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
impl Debug for TokenMinter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenMinter").field("token_window", &self.token_window).finish()
	}
}
