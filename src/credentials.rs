//! Cloud identity: credential and region providers consumed by the signer and the parser.
//!
//! [`SdkCredentialsProvider`] and [`SdkRegionProvider`] sit on a loaded `aws_config::SdkConfig`
//! and therefore follow the SDK's default chains (environment, profile files, web identity,
//! container and instance metadata). They also honour per-connection sources: a named profile,
//! static keys, and an STS role to assume on top of either. The static providers cover tests
//! and hosts that manage keys themselves.

pub mod region;
pub mod sdk;
pub mod source;

pub use region::*;
pub use sdk::*;
pub use source::*;

// self
use crate::{
	_prelude::*,
	auth::{TokenRequest, TokenSecret},
	signer::SigningError,
};

/// Boxed future returned by [`CredentialsProvider`] methods.
pub type CredentialsFuture<'a> =
	Pin<Box<dyn Future<Output = Result<AwsCredentials, SigningError>> + 'a + Send>>;

/// Resolves the credentials used to sign tokens.
pub trait CredentialsProvider
where
	Self: Send + Sync,
{
	/// Returns the ambient credentials to sign with right now.
	fn credentials(&self) -> CredentialsFuture<'_>;

	/// Returns the credentials for `request`, honouring its [`CredentialSource`].
	///
	/// The default implementation serves ambient requests from [`Self::credentials`] and static
	/// keys as given; profiles and role assumption need a provider that overrides this.
	fn credentials_for<'a>(&'a self, request: &'a TokenRequest) -> CredentialsFuture<'a> {
		let source = &request.credentials;

		match (&source.base, &source.role) {
			(BaseCredentials::Ambient, None) => self.credentials(),
			(BaseCredentials::Static(credentials), None) => {
				let credentials = credentials.clone();

				Box::pin(async move { Ok(credentials) })
			},
			_ => {
				let kind = source.kind();

				Box::pin(async move { Err(SigningError::UnsupportedCredentialSource { kind }) })
			},
		}
	}
}

/// Access key pair plus optional session token.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
	/// Access key identifier; safe to log.
	pub access_key_id: String,
	/// Secret access key.
	pub secret_access_key: TokenSecret,
	/// Session token for temporary credentials.
	pub session_token: Option<TokenSecret>,
}
impl AwsCredentials {
	/// Creates long-lived credentials without a session token.
	pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
		Self {
			access_key_id: access_key_id.into(),
			secret_access_key: TokenSecret::new(secret_access_key),
			session_token: None,
		}
	}

	/// Attaches a session token.
	pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
		self.session_token = Some(TokenSecret::new(token));

		self
	}
}
impl Debug for AwsCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AwsCredentials")
			.field("access_key_id", &self.access_key_id)
			.field("secret_access_key", &"<redacted>")
			.field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Hands out the same credentials on every ambient call.
#[derive(Clone, Debug)]
pub struct StaticCredentialsProvider(AwsCredentials);
impl StaticCredentialsProvider {
	/// Wraps fixed credentials.
	pub fn new(credentials: AwsCredentials) -> Self {
		Self(credentials)
	}
}
impl CredentialsProvider for StaticCredentialsProvider {
	fn credentials(&self) -> CredentialsFuture<'_> {
		let credentials = self.0.clone();

		Box::pin(async move { Ok(credentials) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::{AccountName, Region};

	fn request(source: CredentialSource) -> TokenRequest {
		TokenRequest::new(
			"db.example.com",
			5432,
			AccountName::new("svc").expect("Account fixture should be valid."),
			Region::new("us-east-1").expect("Region fixture should be valid."),
		)
		.with_credentials(source)
	}

	fn ambient() -> StaticCredentialsProvider {
		StaticCredentialsProvider::new(AwsCredentials::new("AKIDAMBIENT", "ambient-secret"))
	}

	#[test]
	fn credentials_debug_redacts_secrets() {
		let credentials = AwsCredentials::new("AKIDEXAMPLE", "top-secret").with_session_token("tok");
		let rendered = format!("{credentials:?}");

		assert!(rendered.contains("AKIDEXAMPLE"));
		assert!(!rendered.contains("top-secret"));
		assert!(!rendered.contains("tok\""));
	}

	#[tokio::test]
	async fn static_provider_returns_its_credentials() {
		let credentials = ambient().credentials().await.expect("Static provider should never fail.");

		assert_eq!(credentials.secret_access_key.expose(), "ambient-secret");
	}

	#[tokio::test]
	async fn per_connection_keys_override_the_ambient_ones() {
		let provider = ambient();
		let ambient = provider
			.credentials_for(&request(CredentialSource::default()))
			.await
			.expect("Ambient source should resolve.");

		assert_eq!(ambient.access_key_id, "AKIDAMBIENT");

		let source = CredentialSource::from_keys(AwsCredentials::new("AKIDCONN", "conn-secret"));
		let overridden = provider
			.credentials_for(&request(source))
			.await
			.expect("Static keys should resolve without an SDK.");

		assert_eq!(overridden.access_key_id, "AKIDCONN");
		assert_eq!(overridden.secret_access_key.expose(), "conn-secret");
	}

	#[tokio::test]
	async fn profiles_and_roles_need_an_sdk_backed_provider() {
		let provider = ambient();
		let profile = provider
			.credentials_for(&request(CredentialSource::from_profile("analytics")))
			.await
			.expect_err("Static providers cannot read profiles.");

		assert!(matches!(profile, SigningError::UnsupportedCredentialSource { kind: "profile" }));

		let role = CredentialSource::default()
			.with_role(RoleAssumption::new("arn:aws:iam::123456789012:role/db-connect"));
		let err = provider
			.credentials_for(&request(role))
			.await
			.expect_err("Static providers cannot assume roles.");

		assert!(matches!(err, SigningError::UnsupportedCredentialSource { kind: "assumed role" }));
	}
}
