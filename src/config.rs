//! Tunable token lifetimes and property naming.
//!
//! Both structs implement [`Default`] with values matching RDS IAM authentication and can be
//! deserialized from any serde format; durations are expressed in whole seconds
//! (`token_window_secs`, `safety_margin_secs`).

// self
use crate::_prelude::*;

/// Lifetime rules applied to minted tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenPolicy {
	/// How long a freshly signed token stays valid; at most [`Self::MAX_TOKEN_WINDOW`].
	#[serde(rename = "token_window_secs", with = "whole_seconds")]
	pub token_window: Duration,
	/// Minimum validity a cached token must still have to be reused.
	#[serde(rename = "safety_margin_secs", with = "whole_seconds")]
	pub safety_margin: Duration,
}
impl TokenPolicy {
	/// RDS IAM tokens are accepted for 15 minutes after signing.
	pub const DEFAULT_TOKEN_WINDOW: Duration = Duration::minutes(15);
	/// Cached tokens are replaced once less than a minute of validity remains.
	pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::seconds(60);
	/// RDS rejects tokens presigned for longer than 15 minutes.
	pub const MAX_TOKEN_WINDOW: Duration = Duration::minutes(15);

	/// Overrides the token window, clamped to `0..=MAX_TOKEN_WINDOW`.
	pub fn with_token_window(mut self, window: Duration) -> Self {
		self.token_window = window.clamp(Duration::ZERO, Self::MAX_TOKEN_WINDOW);

		self
	}

	/// Overrides the safety margin; negative values clamp to zero.
	pub fn with_safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}
}
impl Default for TokenPolicy {
	fn default() -> Self {
		Self {
			token_window: Self::DEFAULT_TOKEN_WINDOW,
			safety_margin: Self::DEFAULT_SAFETY_MARGIN,
		}
	}
}

/// Names of the connection properties the dispatcher reads and rewrites.
///
/// Every name except `user` and `password` is wrapper-only: it is read from the query or the
/// caller's properties and never reaches the underlying driver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyNames {
	/// Property carrying the database account.
	pub user: String,
	/// Property the minted token is written into.
	pub password: String,
	/// Property carrying the region.
	pub region: String,
	/// Shared-config profile supplying credentials and, failing `region`, the region.
	pub aws_profile: String,
	/// Access key ID of per-connection static keys.
	pub access_key_id: String,
	/// Secret access key of per-connection static keys.
	pub secret_access_key: String,
	/// ARN of an STS role to assume before signing.
	pub role_arn: String,
	/// Session name for the assumed role.
	pub role_session_name: String,
	/// External ID for the assumed role.
	pub external_id: String,
}
impl PropertyNames {
	/// Returns `true` for properties that only mean something to this wrapper.
	pub fn is_wrapper_only(&self, name: &str) -> bool {
		[
			&self.region,
			&self.aws_profile,
			&self.access_key_id,
			&self.secret_access_key,
			&self.role_arn,
			&self.role_session_name,
			&self.external_id,
		]
		.into_iter()
		.any(|wrapper_only| wrapper_only == name)
	}
}
impl Default for PropertyNames {
	fn default() -> Self {
		Self {
			user: "user".into(),
			password: "password".into(),
			region: "region".into(),
			aws_profile: "awsProfile".into(),
			access_key_id: "awsAccessKeyId".into(),
			secret_access_key: "awsSecretAccessKey".into(),
			role_arn: "awsStsCredentialProviderRoleArn".into(),
			role_session_name: "awsStsCredentialProviderSessionName".into(),
			external_id: "awsStsCredentialProviderExternalId".into(),
		}
	}
}

mod whole_seconds {
	// crates.io
	use serde::{Deserialize, Deserializer, Serializer};
	use time::Duration;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_seconds())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let secs = u32::deserialize(deserializer)?;

		Ok(Duration::seconds(secs.into()))
	}
}
