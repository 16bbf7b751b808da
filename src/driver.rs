//! Driver contract and the `iamauth` dispatcher that implements it.
//!
//! [`IamAuthDriver`] looks like any other [`Driver`] to the host: it accepts `iamauth`
//! descriptors, swaps the password for a cached or freshly minted token, and forwards the
//! rewritten descriptor to the driver registered for the engine. The connection it returns is
//! the underlying driver's, untouched.
//!
//! [`IamAuthDriver::new`] loads the AWS SDK defaults once and signs with the SDK's credential
//! chain; [`IamAuthDriver::from_sdk_config`] reuses a config the host already loaded.

pub mod manager;
pub mod registry;

pub use manager::*;
pub use registry::*;

// crates.io
use aws_config::{BehaviorVersion, SdkConfig};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	cache::TokenCache,
	clock::{Clock, SystemClock},
	config::{PropertyNames, TokenPolicy},
	credentials::{SdkCredentialsProvider, SdkRegionProvider},
	descriptor::{self, DescriptorParser},
	error::BoxError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	signer::{SigV4Presigner, TokenMinter},
};

/// Connection properties handed to drivers, ordered by name.
pub type Properties = BTreeMap<String, String>;

/// Error type drivers report; carried through the dispatcher without re-wrapping.
pub type DriverError = BoxError;

/// Boxed future returned by [`Driver::connect`].
pub type DriverFuture<'a, C> = Pin<Box<dyn Future<Output = Result<C, DriverError>> + 'a + Send>>;

/// Engine driver contract shared by the dispatcher and the drivers it delegates to.
pub trait Driver
where
	Self: Send + Sync,
{
	/// Connection handle produced by this driver.
	type Connection: Send;

	/// Returns `true` if this driver understands the descriptor.
	fn accepts_descriptor(&self, descriptor: &str) -> bool;

	/// Opens a connection for the descriptor using the provided properties.
	fn connect<'a>(
		&'a self,
		descriptor: &'a str,
		properties: Properties,
	) -> DriverFuture<'a, Self::Connection>;
}

/// Dispatcher that authenticates `iamauth` descriptors with short-lived tokens.
pub struct IamAuthDriver<C>
where
	C: 'static + Send,
{
	registry: Arc<DriverRegistry<C>>,
	cache: Arc<TokenCache>,
	minter: TokenMinter,
	parser: DescriptorParser,
}
impl<C> IamAuthDriver<C>
where
	C: 'static + Send,
{
	/// Creates a dispatcher on the process-wide cache, signing with SigV4 and the AWS SDK's
	/// default credential and region chains.
	pub async fn new(registry: Arc<DriverRegistry<C>>) -> Self {
		let config = aws_config::defaults(BehaviorVersion::latest()).load().await;

		Self::from_sdk_config(registry, &config)
	}

	/// Creates a dispatcher on the process-wide cache that signs with the credentials of
	/// `config` and falls back to its region.
	pub fn from_sdk_config(registry: Arc<DriverRegistry<C>>, config: &SdkConfig) -> Self {
		let clock: Arc<dyn Clock> = Arc::new(SystemClock);
		let credentials = Arc::new(SdkCredentialsProvider::from_config(config));
		let signer = SigV4Presigner::new(credentials).with_clock(clock.clone());

		Self::from_parts(
			registry,
			TokenCache::shared(),
			TokenMinter::from_policy(Arc::new(signer), clock, &TokenPolicy::default()),
			DescriptorParser::new(
				PropertyNames::default(),
				Arc::new(SdkRegionProvider::from_config(config)),
			),
		)
	}

	/// Creates a dispatcher from explicitly built collaborators.
	pub fn from_parts(
		registry: Arc<DriverRegistry<C>>,
		cache: Arc<TokenCache>,
		minter: TokenMinter,
		parser: DescriptorParser,
	) -> Self {
		Self { registry, cache, minter, parser }
	}

	/// Replaces the token cache, e.g. to isolate tenants or tests from the shared one.
	pub fn with_cache(mut self, cache: Arc<TokenCache>) -> Self {
		self.cache = cache;

		self
	}

	/// Applies `policy` to the minter window and the cache margin.
	///
	/// A cache whose margin differs is replaced by a private one on the same clock, so dispatchers
	/// with different margins never share entries.
	pub fn with_policy(mut self, policy: TokenPolicy) -> Self {
		self.minter = self.minter.with_token_window(policy.token_window);

		if self.cache.safety_margin() != policy.safety_margin {
			self.cache = Arc::new(TokenCache::from_policy(self.cache.clock().clone(), &policy));
		}

		self
	}

	/// Returns the token minter.
	pub fn minter(&self) -> &TokenMinter {
		&self.minter
	}

	/// Replaces the token minter.
	pub fn with_minter(mut self, minter: TokenMinter) -> Self {
		self.minter = minter;

		self
	}

	/// Replaces the descriptor parser.
	pub fn with_parser(mut self, parser: DescriptorParser) -> Self {
		self.parser = parser;

		self
	}

	/// Returns the registry of underlying drivers.
	pub fn registry(&self) -> &Arc<DriverRegistry<C>> {
		&self.registry
	}

	/// Returns the token cache this dispatcher reads and fills.
	pub fn cache(&self) -> &Arc<TokenCache> {
		&self.cache
	}

	/// Authenticates and opens a connection through the engine's driver.
	///
	/// The token is obtained before the engine's driver is looked up, so an unregistered engine
	/// still costs one signing call on a cold cache.
	pub async fn connect(&self, descriptor: &str, properties: Properties) -> Result<C> {
		const KIND: FlowKind = FlowKind::Connect;

		let span = FlowSpan::new(KIND, "connect");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let parsed = self.parser.parse(descriptor, &properties).await?;
				let request = parsed.token_request();
				let token =
					self.cache.get_or_mint(&parsed.cache_key(), || self.minter.mint(&request)).await?;
				let properties = self.rewrite_properties(properties, &token);
				let driver = self.registry.resolve(&parsed.engine).ok_or_else(|| {
					Error::UnsupportedEngine { engine: parsed.engine.to_string() }
				})?;

				driver.connect(&parsed.delegate, properties).await.map_err(Error::Driver)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	fn rewrite_properties(&self, mut properties: Properties, token: &TokenSecret) -> Properties {
		let names = self.parser.names();

		properties.retain(|name, _| !names.is_wrapper_only(name));
		properties.insert(names.password.clone(), token.expose().to_owned());

		properties
	}
}
impl<C> Driver for IamAuthDriver<C>
where
	C: 'static + Send,
{
	type Connection = C;

	fn accepts_descriptor(&self, descriptor: &str) -> bool {
		descriptor::is_iam_descriptor(descriptor)
	}

	fn connect<'a>(
		&'a self,
		descriptor: &'a str,
		properties: Properties,
	) -> DriverFuture<'a, Self::Connection> {
		Box::pin(async move {
			IamAuthDriver::connect(self, descriptor, properties).await.map_err(|e| match e {
				Error::Driver(inner) => inner,
				other => DriverError::from(other),
			})
		})
	}
}
impl<C> Clone for IamAuthDriver<C>
where
	C: 'static + Send,
{
	fn clone(&self) -> Self {
		Self {
			registry: self.registry.clone(),
			cache: self.cache.clone(),
			minter: self.minter.clone(),
			parser: self.parser.clone(),
		}
	}
}
impl<C> Debug for IamAuthDriver<C>
where
	C: 'static + Send,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IamAuthDriver")
			.field("engines", &self.registry.engines())
			.field("cache", &self.cache)
			.field("minter", &self.minter)
			.field("parser", &self.parser)
			.finish()
	}
}
