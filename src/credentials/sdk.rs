//! Providers backed by a loaded `aws_config::SdkConfig`.

// crates.io
use aws_config::{
	SdkConfig,
	meta::region::ProvideRegion,
	profile::{ProfileFileCredentialsProvider, ProfileFileRegionProvider},
	sts::AssumeRoleProvider,
};
use aws_credential_types::{
	Credentials,
	provider::{ProvideCredentials, SharedCredentialsProvider, error::CredentialsError},
};
// self
use crate::{
	_prelude::*,
	auth::{Region, TokenRequest},
	credentials::{
		AwsCredentials, BaseCredentials, CredentialsFuture, CredentialsProvider, RegionFuture,
		RegionProvider, RoleAssumption,
	},
	signer::SigningError,
};

const PROVIDER_NAME: &str = "iam-db-auth";

/// Credentials from the SDK's provider chain, plus per-connection profiles, keys and roles.
#[derive(Clone)]
pub struct SdkCredentialsProvider {
	config: SdkConfig,
}
impl SdkCredentialsProvider {
	/// Uses the credentials provider of `config` for ambient requests and its region, HTTP
	/// client and retry settings for STS calls.
	pub fn from_config(config: &SdkConfig) -> Self {
		Self { config: config.clone() }
	}

	fn base_provider(
		&self,
		base: &BaseCredentials,
	) -> Result<SharedCredentialsProvider, SigningError> {
		Ok(match base {
			BaseCredentials::Ambient =>
				self.config.credentials_provider().ok_or(SigningError::MissingCredentials)?,
			BaseCredentials::Profile(profile) => SharedCredentialsProvider::new(
				ProfileFileCredentialsProvider::builder().profile_name(profile).build(),
			),
			BaseCredentials::Static(credentials) => SharedCredentialsProvider::new(Credentials::new(
				credentials.access_key_id.clone(),
				credentials.secret_access_key.expose(),
				credentials.session_token.as_ref().map(|token| token.expose().to_owned()),
				None,
				PROVIDER_NAME,
			)),
		})
	}

	async fn assume(
		&self,
		role: &RoleAssumption,
		region: &Region,
		base: SharedCredentialsProvider,
	) -> SharedCredentialsProvider {
		let mut builder = AssumeRoleProvider::builder(role.role_arn.clone()).configure(&self.config);

		if self.config.region().is_none() {
			builder = builder.region(aws_config::Region::new(region.to_string()));
		}
		if let Some(session_name) = &role.session_name {
			builder = builder.session_name(session_name.clone());
		}
		if let Some(external_id) = &role.external_id {
			builder = builder.external_id(external_id.clone());
		}

		SharedCredentialsProvider::new(builder.build_from_provider(base).await)
	}
}
impl CredentialsProvider for SdkCredentialsProvider {
	fn credentials(&self) -> CredentialsFuture<'_> {
		Box::pin(async move { fetch(&self.base_provider(&BaseCredentials::Ambient)?).await })
	}

	fn credentials_for<'a>(&'a self, request: &'a TokenRequest) -> CredentialsFuture<'a> {
		Box::pin(async move {
			let source = &request.credentials;
			let base = self.base_provider(&source.base)?;
			let provider = match &source.role {
				Some(role) => self.assume(role, &request.region, base).await,
				None => base,
			};

			fetch(&provider).await
		})
	}
}
impl Debug for SdkCredentialsProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SdkCredentialsProvider")
			.field("region", &self.config.region())
			.field("has_credentials", &self.config.credentials_provider().is_some())
			.finish()
	}
}

/// Region from the SDK's region chain, with profile files consulted first for named profiles.
#[derive(Clone, Debug, Default)]
pub struct SdkRegionProvider {
	region: Option<Region>,
}
impl SdkRegionProvider {
	/// Captures the region `config` was loaded with.
	pub fn from_config(config: &SdkConfig) -> Self {
		Self { region: config.region().and_then(|region| Region::new(region.as_ref()).ok()) }
	}
}
impl RegionProvider for SdkRegionProvider {
	fn region<'a>(&'a self, profile: Option<&'a str>) -> RegionFuture<'a> {
		Box::pin(async move {
			if let Some(profile) = profile {
				let provider = ProfileFileRegionProvider::builder().profile_name(profile).build();
				let region = ProvideRegion::region(&provider)
					.await
					.and_then(|region| Region::new(region.as_ref()).ok());

				if region.is_some() {
					return region;
				}
			}

			self.region.clone()
		})
	}
}

async fn fetch(provider: &SharedCredentialsProvider) -> Result<AwsCredentials, SigningError> {
	let credentials = provider.provide_credentials().await.map_err(|e| match e {
		CredentialsError::CredentialsNotLoaded(_) => SigningError::MissingCredentials,
		e => SigningError::Credentials { message: e.to_string() },
	})?;
	let resolved = AwsCredentials::new(credentials.access_key_id(), credentials.secret_access_key());

	Ok(match credentials.session_token() {
		Some(token) => resolved.with_session_token(token),
		None => resolved,
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::AccountName,
		credentials::{AwsCredentials, CredentialSource},
	};

	fn config(credentials: Option<Credentials>) -> SdkConfig {
		let builder = SdkConfig::builder().region(aws_config::Region::new("eu-west-1"));

		match credentials {
			Some(credentials) =>
				builder.credentials_provider(SharedCredentialsProvider::new(credentials)).build(),
			None => builder.build(),
		}
	}

	fn request(source: CredentialSource) -> TokenRequest {
		TokenRequest::new(
			"db.example.com",
			5432,
			AccountName::new("svc").expect("Account fixture should be valid."),
			Region::new("eu-west-1").expect("Region fixture should be valid."),
		)
		.with_credentials(source)
	}

	#[tokio::test]
	async fn ambient_credentials_come_from_the_sdk_chain() {
		let sdk = Credentials::new("AKIDSDK", "sdk-secret", Some("sdk-session".into()), None, "test");
		let provider = SdkCredentialsProvider::from_config(&config(Some(sdk)));
		let credentials = provider.credentials().await.expect("Configured chain should resolve.");

		assert_eq!(credentials.access_key_id, "AKIDSDK");
		assert_eq!(credentials.secret_access_key.expose(), "sdk-secret");
		assert_eq!(credentials.session_token.as_ref().map(|t| t.expose()), Some("sdk-session"));
	}

	#[tokio::test]
	async fn missing_chain_reports_missing_credentials() {
		let provider = SdkCredentialsProvider::from_config(&config(None));
		let err = provider
			.credentials_for(&request(CredentialSource::default()))
			.await
			.expect_err("A config without credentials cannot sign.");

		assert!(matches!(err, SigningError::MissingCredentials));
	}

	#[tokio::test]
	async fn connection_keys_bypass_the_chain() {
		let provider = SdkCredentialsProvider::from_config(&config(None));
		let source = CredentialSource::from_keys(
			AwsCredentials::new("AKIDCONN", "conn-secret").with_session_token("conn-session"),
		);
		let credentials = provider
			.credentials_for(&request(source))
			.await
			.expect("Static keys should resolve without a chain.");

		assert_eq!(credentials.access_key_id, "AKIDCONN");
		assert_eq!(credentials.session_token.as_ref().map(|t| t.expose()), Some("conn-session"));
	}

	#[tokio::test]
	async fn region_comes_from_the_loaded_config() {
		let provider = SdkRegionProvider::from_config(&config(None));

		assert_eq!(provider.region(None).await.as_deref(), Some("eu-west-1"));
		assert_eq!(SdkRegionProvider::default().region(None).await, None);
	}
}
