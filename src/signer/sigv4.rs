//! RDS IAM token presigner built on AWS Signature Version 4.
//!
//! An RDS authentication token is a presigned `GET` for `Action=connect` against the
//! database endpoint, scoped to the `rds-db` service, with the `https://` prefix dropped.
//! Signing is a local computation; the only I/O is whatever the [`CredentialsProvider`] does.

// crates.io
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use time::{UtcOffset, format_description::BorrowedFormatItem, macros::format_description};
// self
use crate::{
	_prelude::*,
	auth::{Region, TokenRequest},
	clock::{Clock, SystemClock},
	credentials::{AwsCredentials, CredentialsProvider},
	signer::{SignToken, SignerFuture, SigningError},
};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "rds-db";
const TERMINATOR: &str = "aws4_request";
const EMPTY_PAYLOAD_SHA256: &str =
	"e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
const AMZ_DATE: &[BorrowedFormatItem<'static>] =
	format_description!("[year][month][day]T[hour][minute][second]Z");

/// [`SignToken`] implementation producing RDS IAM authentication tokens.
#[derive(Clone)]
pub struct SigV4Presigner {
	credentials: Arc<dyn CredentialsProvider>,
	clock: Arc<dyn Clock>,
	expires_in: Duration,
}
impl SigV4Presigner {
	/// RDS rejects presigned tokens that claim more than 15 minutes.
	pub const MAX_EXPIRES_IN: Duration = Duration::minutes(15);

	/// Creates a presigner using the system clock and the maximum token lifetime.
	pub fn new(credentials: Arc<dyn CredentialsProvider>) -> Self {
		Self { credentials, clock: Arc::new(SystemClock), expires_in: Self::MAX_EXPIRES_IN }
	}

	/// Replaces the clock used for `X-Amz-Date`.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Overrides `X-Amz-Expires`, clamped to `1s..=15min`.
	///
	/// [`TokenMinter`](crate::signer::TokenMinter) reads it back through [`SignToken::validity`],
	/// so cached tokens never outlive the value signed here.
	pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
		self.expires_in = expires_in.clamp(Duration::SECOND, Self::MAX_EXPIRES_IN);

		self
	}

	/// Builds the token for `request` with explicit credentials and signing instant.
	pub fn presign(
		&self,
		request: &TokenRequest,
		credentials: &AwsCredentials,
		at: OffsetDateTime,
	) -> Result<String, SigningError> {
		let amz_date = at.to_offset(UtcOffset::UTC).format(AMZ_DATE).map_err(SigningError::signer)?;
		let date = &amz_date[..8];
		let scope = format!("{date}/{}/{SERVICE}/{TERMINATOR}", request.region);
		let endpoint = request.endpoint();
		let mut params = vec![
			("Action", "connect".to_owned()),
			("DBUser", request.account.to_string()),
			("X-Amz-Algorithm", ALGORITHM.to_owned()),
			("X-Amz-Credential", format!("{}/{scope}", credentials.access_key_id)),
			("X-Amz-Date", amz_date.clone()),
			("X-Amz-Expires", self.expires_in.whole_seconds().to_string()),
			("X-Amz-SignedHeaders", "host".to_owned()),
		];

		if let Some(token) = &credentials.session_token {
			params.push(("X-Amz-Security-Token", token.expose().to_owned()));
		}

		params.sort_by(|a, b| a.0.cmp(b.0));

		let query = canonical_query(&params);
		let canonical_request =
			format!("GET\n/\n{query}\nhost:{endpoint}\n\nhost\n{EMPTY_PAYLOAD_SHA256}");
		let string_to_sign = format!(
			"{ALGORITHM}\n{amz_date}\n{scope}\n{}",
			hex::encode(Sha256::digest(canonical_request.as_bytes()))
		);
		let key = signing_key(credentials.secret_access_key.expose(), date, &request.region)?;
		let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

		Ok(format!("{endpoint}/?{query}&X-Amz-Signature={signature}"))
	}
}
impl SignToken for SigV4Presigner {
	fn sign<'a>(&'a self, request: &'a TokenRequest) -> SignerFuture<'a, String> {
		Box::pin(async move {
			let credentials = self.credentials.credentials_for(request).await?;

			self.presign(request, &credentials, self.clock.now())
		})
	}

	fn validity(&self) -> Option<Duration> {
		Some(self.expires_in)
	}
}
impl Debug for SigV4Presigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SigV4Presigner").field("expires_in", &self.expires_in).finish()
	}
}

fn canonical_query(params: &[(&str, String)]) -> String {
	params
		.iter()
		.map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
		.collect::<Vec<_>>()
		.join("&")
}

fn signing_key(secret: &str, date: &str, region: &Region) -> Result<Vec<u8>, SigningError> {
	let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes())?;
	let k_region = hmac_sha256(&k_date, region.as_bytes())?;
	let k_service = hmac_sha256(&k_region, SERVICE.as_bytes())?;

	hmac_sha256(&k_service, TERMINATOR.as_bytes())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SigningError> {
	let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
		.map_err(|_| SigningError::signer("HMAC key has an invalid length"))?;

	mac.update(data);

	Ok(mac.finalize().into_bytes().to_vec())
}
