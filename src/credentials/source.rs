//! Per-connection credential selection read from descriptor properties.

// self
use crate::{_prelude::*, credentials::AwsCredentials};

/// Where the signing credentials for one connection come from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CredentialSource {
	/// Long-lived identity the token (or the role session) is signed with.
	pub base: BaseCredentials,
	/// Role to assume on top of `base`.
	pub role: Option<RoleAssumption>,
}
impl CredentialSource {
	/// Signs with a named shared-config profile.
	pub fn from_profile(profile: impl Into<String>) -> Self {
		Self { base: BaseCredentials::Profile(profile.into()), role: None }
	}

	/// Signs with static keys.
	pub fn from_keys(credentials: AwsCredentials) -> Self {
		Self { base: BaseCredentials::Static(credentials), role: None }
	}

	/// Assumes `role` with the current base credentials.
	pub fn with_role(mut self, role: RoleAssumption) -> Self {
		self.role = Some(role);

		self
	}

	/// Returns `true` when the provider's ambient credentials are used unchanged.
	pub fn is_ambient(&self) -> bool {
		matches!(self.base, BaseCredentials::Ambient) && self.role.is_none()
	}

	/// Short label for errors and logs.
	pub fn kind(&self) -> &'static str {
		match (&self.base, &self.role) {
			(_, Some(_)) => "assumed role",
			(BaseCredentials::Ambient, None) => "ambient",
			(BaseCredentials::Profile(_), None) => "profile",
			(BaseCredentials::Static(_), None) => "static keys",
		}
	}

	/// Secret-free identity of this source, used to keep tokens from different principals apart.
	pub fn scope(&self) -> CredentialScope {
		let base = match &self.base {
			BaseCredentials::Ambient => ScopeBase::Ambient,
			BaseCredentials::Profile(profile) => ScopeBase::Profile(profile.clone()),
			BaseCredentials::Static(credentials) =>
				ScopeBase::AccessKey(credentials.access_key_id.clone()),
		};
		let role = self.role.as_ref().map(|role| (role.role_arn.clone(), role.external_id.clone()));

		CredentialScope { base, role }
	}
}

/// Base identity of a [`CredentialSource`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BaseCredentials {
	/// Whatever the configured provider resolves on its own.
	#[default]
	Ambient,
	/// Named profile from the shared config and credentials files.
	Profile(String),
	/// Keys supplied with the connection.
	Static(AwsCredentials),
}

/// STS role the connection signs as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleAssumption {
	/// ARN of the role to assume.
	pub role_arn: String,
	/// Session name; the SDK generates one when absent.
	pub session_name: Option<String>,
	/// External ID required by the role's trust policy.
	pub external_id: Option<String>,
}
impl RoleAssumption {
	/// Assumes `role_arn` with a generated session name and no external ID.
	pub fn new(role_arn: impl Into<String>) -> Self {
		Self { role_arn: role_arn.into(), session_name: None, external_id: None }
	}
}

/// Hashable, secret-free identity of a [`CredentialSource`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CredentialScope {
	/// Base identity.
	pub base: ScopeBase,
	/// Assumed role ARN and external ID.
	pub role: Option<(String, Option<String>)>,
}

/// Base identity part of a [`CredentialScope`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScopeBase {
	/// Provider defaults.
	#[default]
	Ambient,
	/// Named profile.
	Profile(String),
	/// Access key identifier of static keys.
	AccessKey(String),
}
