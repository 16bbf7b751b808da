//! Demonstrates routing an `iamauth` descriptor through the dispatcher: the token is presigned
//! locally with static example credentials, cached, and handed to a stand-in driver as the
//! password.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
// self
use iam_db_auth::{
	auth::{EngineId, Region},
	cache::TokenCache,
	clock::SystemClock,
	config::{PropertyNames, TokenPolicy},
	credentials::{AwsCredentials, StaticCredentialsProvider, StaticRegionProvider},
	descriptor::DescriptorParser,
	driver::{Driver, DriverFuture, DriverRegistry, IamAuthDriver, Properties},
	signer::{SigV4Presigner, TokenMinter},
};

/// Stand-in for a real Postgres driver; reports what it would have connected with.
struct PrintingDriver;
impl Driver for PrintingDriver {
	type Connection = String;

	fn accepts_descriptor(&self, descriptor: &str) -> bool {
		descriptor.starts_with("postgres://")
	}

	fn connect<'a>(
		&'a self,
		descriptor: &'a str,
		properties: Properties,
	) -> DriverFuture<'a, Self::Connection> {
		Box::pin(async move {
			let password = properties.get("password").map(String::as_str).unwrap_or_default();
			let preview = password.get(..48).unwrap_or(password);

			Ok(format!("{descriptor} with password {preview}..."))
		})
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let policy = TokenPolicy::default();
	let clock = Arc::new(SystemClock);
	let credentials = AwsCredentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY");
	let signer = SigV4Presigner::new(Arc::new(StaticCredentialsProvider::new(credentials)));
	let registry = Arc::new(DriverRegistry::<String>::new());

	registry.register(EngineId::new("postgres")?, PrintingDriver);

	let cache = Arc::new(TokenCache::from_policy(clock.clone(), &policy));
	let driver = IamAuthDriver::from_parts(
		registry,
		cache.clone(),
		TokenMinter::from_policy(Arc::new(signer), clock, &policy),
		DescriptorParser::new(
			PropertyNames::default(),
			Arc::new(StaticRegionProvider(Region::new("us-east-1")?)),
		),
	);
	let descriptor = "wrap:iamauth:postgres://mydb.123456789012.us-east-1.rds.amazonaws.com/orders?user=svc";

	for _ in 0..2 {
		println!("{}", driver.connect(descriptor, Properties::new()).await?);
	}

	let stats = cache.stats();

	println!("Minted {} token(s), reused {}.", stats.mints, stats.hits);

	Ok(())
}
