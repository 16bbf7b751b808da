//! Short-lived IAM token authentication for managed databases.
//!
//! An `iamauth` descriptor is parsed, a signed token is minted or reused behind a single-flight
//! cache, and the connection is handed to the engine's real driver with the token as its
//! password.

#![deny(clippy::all, missing_docs)]
#![cfg_attr(not(test), deny(unused_crate_dependencies))]

pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod descriptor;
pub mod driver;
pub mod error;
pub mod obs;
pub mod signer;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fixtures for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use crate::{
		auth::{EngineId, TokenRequest},
		cache::TokenCache,
		clock::Clock,
		config::{PropertyNames, TokenPolicy},
		credentials::NoRegion,
		descriptor::DescriptorParser,
		driver::{Driver, DriverError, DriverFuture, DriverRegistry, IamAuthDriver, Properties},
		signer::{SignToken, SignerFuture, SigningError, TokenMinter},
	};

	/// Dispatcher type used by integration tests.
	pub type EchoIamAuthDriver = IamAuthDriver<EchoConnection>;

	/// Clock whose instant only moves when a test tells it to.
	#[derive(Clone, Debug)]
	pub struct ManualClock(Arc<Mutex<OffsetDateTime>>);
	impl ManualClock {
		/// Creates a clock frozen at the provided instant.
		pub fn new(now: OffsetDateTime) -> Self {
			Self(Arc::new(Mutex::new(now)))
		}

		/// Moves the clock forward by the provided duration.
		pub fn advance(&self, by: Duration) {
			*self.0.lock() += by;
		}
	}
	impl Clock for ManualClock {
		fn now(&self) -> OffsetDateTime {
			*self.0.lock()
		}
	}

	/// Signer that returns `token-<n>` and counts how many times it was called.
	///
	/// When built with [`CountingSigner::failing`] every call fails with a credentials error.
	#[derive(Debug, Default)]
	pub struct CountingSigner {
		calls: AtomicUsize,
		fail: bool,
		requests: Mutex<Vec<TokenRequest>>,
	}
	impl CountingSigner {
		/// Builds a signer whose every call fails.
		pub fn failing() -> Self {
			Self { fail: true, ..Default::default() }
		}

		/// Returns how many sign calls were made so far.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}

		/// Returns the requests observed so far, in call order.
		pub fn requests(&self) -> Vec<TokenRequest> {
			self.requests.lock().clone()
		}
	}
	impl SignToken for CountingSigner {
		fn sign<'a>(&'a self, request: &'a TokenRequest) -> SignerFuture<'a, String> {
			let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

			self.requests.lock().push(request.clone());

			Box::pin(async move {
				if self.fail {
					Err(SigningError::Credentials { message: "no credentials in test".into() })
				} else {
					Ok(format!("token-{n}"))
				}
			})
		}
	}

	/// What an [`EchoDriver`] was asked to connect to.
	#[derive(Clone, Debug, PartialEq, Eq)]
	pub struct EchoConnection {
		/// Engine label the driver was registered under.
		pub engine: String,
		/// Descriptor the driver received.
		pub descriptor: String,
		/// Properties the driver received.
		pub properties: Properties,
	}
	impl EchoConnection {
		/// Returns the password property the driver received, if any.
		pub fn password(&self) -> Option<&str> {
			self.properties.get("password").map(String::as_str)
		}
	}

	/// Underlying driver stub that accepts `<engine>://` descriptors and echoes its inputs back.
	#[derive(Debug)]
	pub struct EchoDriver {
		engine: String,
		refuse_with: Option<String>,
	}
	impl EchoDriver {
		/// Creates a driver for the provided engine scheme.
		pub fn new(engine: impl Into<String>) -> Self {
			Self { engine: engine.into(), refuse_with: None }
		}

		/// Creates a driver whose every connect attempt fails with the provided message.
		pub fn refusing(engine: impl Into<String>, message: impl Into<String>) -> Self {
			Self { engine: engine.into(), refuse_with: Some(message.into()) }
		}
	}
	impl Driver for EchoDriver {
		type Connection = EchoConnection;

		fn accepts_descriptor(&self, descriptor: &str) -> bool {
			descriptor.strip_prefix(self.engine.as_str()).is_some_and(|rest| rest.starts_with("://"))
		}

		fn connect<'a>(
			&'a self,
			descriptor: &'a str,
			properties: Properties,
		) -> DriverFuture<'a, Self::Connection> {
			Box::pin(async move {
				if let Some(message) = &self.refuse_with {
					return Err(DriverError::from(EchoRefused(message.clone())));
				}

				Ok(EchoConnection {
					engine: self.engine.clone(),
					descriptor: descriptor.to_owned(),
					properties,
				})
			})
		}
	}

	/// Error raised by a refusing [`EchoDriver`].
	#[derive(Debug, PartialEq, Eq, ThisError)]
	#[error("Echo driver refused the connection: {0}.")]
	pub struct EchoRefused(pub String);

	/// Builds a dispatcher over echo drivers for `postgres`, `postgresql`, and `mysql`, with a
	/// private cache on `clock`, default lifetimes, and no ambient region.
	pub fn build_test_driver(
		signer: Arc<dyn SignToken>,
		clock: Arc<ManualClock>,
	) -> (EchoIamAuthDriver, Arc<TokenCache>) {
		let registry = Arc::new(DriverRegistry::<EchoConnection>::new());

		for engine in ["postgres", "postgresql", "mysql"] {
			let id = EngineId::new(engine).expect("Echo engine names should be valid.");

			registry.register(id, EchoDriver::new(engine));
		}

		let policy = TokenPolicy::default();
		let cache = Arc::new(TokenCache::from_policy(clock.clone(), &policy));
		let minter = TokenMinter::from_policy(signer, clock, &policy);
		let parser = DescriptorParser::new(PropertyNames::default(), Arc::new(NoRegion));

		(IamAuthDriver::from_parts(registry, cache.clone(), minter, parser), cache)
	}

	/// Fixed instant used by tests that need a deterministic clock.
	pub fn test_instant() -> OffsetDateTime {
		time::macros::datetime!(2025-11-10 12:00 UTC)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use time;
