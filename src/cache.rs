//! Token cache with freshness policy and per-key singleflight minting.
//!
//! [`TokenCache::get_or_mint`] answers from the cache while the stored token still has at
//! least the safety margin left, and otherwise mints a replacement. Each [`CacheKey`] owns an
//! async guard: concurrent callers for the same key queue on it and re-check the entry once
//! they get in, so only the first one reaches the signer. Keys never share a guard, and the
//! map holding the guards is only locked for the lookup itself.

mod stats;

pub use stats::CacheStats;

// std
use std::sync::OnceLock;
// self
use crate::{
	_prelude::*,
	auth::{AccountName, MintedToken, Region, TokenRequest, TokenSecret},
	cache::stats::CacheCounters,
	clock::{Clock, SystemClock},
	config::TokenPolicy,
	credentials::CredentialScope,
	obs::CacheEvent,
};

/// Identity, endpoint and signing principal a token is valid for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
	/// Database account.
	pub account: AccountName,
	/// Endpoint host name.
	pub host: String,
	/// Endpoint port.
	pub port: u16,
	/// Endpoint region.
	pub region: Region,
	/// Credential source the token is signed with.
	pub credentials: CredentialScope,
}
impl From<&TokenRequest> for CacheKey {
	fn from(request: &TokenRequest) -> Self {
		Self {
			account: request.account.clone(),
			host: request.host.clone(),
			port: request.port,
			region: request.region.clone(),
			credentials: request.credentials.scope(),
		}
	}
}

/// Keyed store of minted tokens shared by every connect call that uses it.
pub struct TokenCache {
	entries: RwLock<HashMap<CacheKey, MintedToken>>,
	guards: Mutex<HashMap<CacheKey, Arc<AsyncMutex<()>>>>,
	clock: Arc<dyn Clock>,
	safety_margin: Duration,
	counters: CacheCounters,
}
impl TokenCache {
	/// Creates an empty cache that reuses tokens with at least `safety_margin` left.
	pub fn new(clock: Arc<dyn Clock>, safety_margin: Duration) -> Self {
		Self {
			entries: Default::default(),
			guards: Default::default(),
			clock,
			safety_margin: if safety_margin.is_negative() { Duration::ZERO } else { safety_margin },
			counters: Default::default(),
		}
	}

	/// Creates an empty cache applying the safety margin of `policy`.
	pub fn from_policy(clock: Arc<dyn Clock>, policy: &TokenPolicy) -> Self {
		Self::new(clock, policy.safety_margin)
	}

	/// Process-wide cache on the system clock and the default [`TokenPolicy`].
	///
	/// Initialised on first use and never torn down; entries expire on their own.
	pub fn shared() -> Arc<Self> {
		static SHARED: OnceLock<Arc<TokenCache>> = OnceLock::new();

		SHARED
			.get_or_init(|| Arc::new(Self::from_policy(Arc::new(SystemClock), &TokenPolicy::default())))
			.clone()
	}

	/// Returns the configured safety margin.
	pub fn safety_margin(&self) -> Duration {
		self.safety_margin
	}

	/// Returns the clock freshness is judged against.
	pub fn clock(&self) -> &Arc<dyn Clock> {
		&self.clock
	}

	/// Returns a snapshot of the hit, mint, failure and invalidation counts.
	pub fn stats(&self) -> CacheStats {
		self.counters.snapshot()
	}

	/// Returns the expiry of the cached token for `key`, if one is stored.
	pub fn expires_at(&self, key: &CacheKey) -> Option<OffsetDateTime> {
		self.entries.read().get(key).map(|token| token.expires_at)
	}

	/// Number of stored tokens, stale ones included.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	/// Returns `true` when nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Drops the token for `key` so the next lookup mints; returns whether one was stored.
	pub fn invalidate(&self, key: &CacheKey) -> bool {
		let removed = self.entries.write().remove(key).is_some();

		if removed {
			self.counters.record(CacheEvent::Invalidate);
		}

		removed
	}

	/// Drops every stored token.
	pub fn clear(&self) {
		self.entries.write().clear();
	}

	/// Returns a reusable token for `key`, calling `mint` only when none is cached or the cached
	/// one is inside the safety margin.
	///
	/// A failed mint is returned as is and leaves any previous entry in place. Dropping the
	/// returned future while it waits for another caller's mint releases the wait without
	/// affecting that mint.
	pub async fn get_or_mint<F, Fut>(&self, key: &CacheKey, mint: F) -> Result<TokenSecret>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<MintedToken>>,
	{
		if let Some(secret) = self.reusable(key) {
			return Ok(secret);
		}

		let guard = self.guard(key);
		let _singleflight = guard.lock().await;

		// Another caller may have minted while this one was queued.
		if let Some(secret) = self.reusable(key) {
			return Ok(secret);
		}

		let minted = match mint().await {
			Ok(minted) => minted,
			Err(e) => {
				self.counters.record(CacheEvent::MintFailure);

				return Err(e);
			},
		};
		let secret = minted.secret.clone();

		self.entries.write().insert(key.clone(), minted);
		self.counters.record(CacheEvent::Mint);

		Ok(secret)
	}

	fn reusable(&self, key: &CacheKey) -> Option<TokenSecret> {
		let now = self.clock.now();
		let secret = self
			.entries
			.read()
			.get(key)
			.filter(|token| token.is_reusable_at(now, self.safety_margin))
			.map(|token| token.secret.clone())?;

		self.counters.record(CacheEvent::Hit);

		Some(secret)
	}

	fn guard(&self, key: &CacheKey) -> Arc<AsyncMutex<()>> {
		let mut guards = self.guards.lock();

		guards.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("entries", &self.len())
			.field("safety_margin", &self.safety_margin)
			.field("stats", &self.stats())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use tokio::sync::Notify;
	// self
	use super::*;
	use crate::{
		_preludet::{ManualClock, test_instant},
		credentials::{AwsCredentials, CredentialSource, ScopeBase},
		signer::SigningError,
	};

	const WINDOW: Duration = Duration::minutes(15);
	const MARGIN: Duration = Duration::seconds(60);

	fn key(account: &str, host: &str) -> CacheKey {
		CacheKey {
			account: AccountName::new(account).expect("Account fixture should be valid."),
			host: host.into(),
			port: 5432,
			region: Region::new("us-east-1").expect("Region fixture should be valid."),
			credentials: CredentialScope::default(),
		}
	}

	fn cache_at(clock: &ManualClock) -> TokenCache {
		TokenCache::new(Arc::new(clock.clone()), MARGIN)
	}

	async fn lookup(
		cache: &TokenCache,
		clock: &ManualClock,
		key: &CacheKey,
		calls: &AtomicUsize,
	) -> String {
		cache
			.get_or_mint(key, || async {
				let n = calls.fetch_add(1, Ordering::SeqCst) + 1;

				Ok(MintedToken::new(format!("token-{n}"), clock.now(), WINDOW))
			})
			.await
			.expect("Minting should succeed.")
			.expose()
			.to_owned()
	}

	#[tokio::test]
	async fn reuses_token_while_outside_margin() {
		let clock = ManualClock::new(test_instant());
		let cache = cache_at(&clock);
		let calls = AtomicUsize::new(0);
		let key = key("svc", "db.example.com");

		assert_eq!(lookup(&cache, &clock, &key, &calls).await, "token-1");

		clock.advance(WINDOW - MARGIN);

		assert_eq!(lookup(&cache, &clock, &key, &calls).await, "token-1");
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(cache.stats().hits, 1);
		assert_eq!(cache.stats().mints, 1);
	}

	#[tokio::test]
	async fn remints_inside_margin_and_after_expiry() {
		let clock = ManualClock::new(test_instant());
		let cache = cache_at(&clock);
		let calls = AtomicUsize::new(0);
		let key = key("svc", "db.example.com");

		lookup(&cache, &clock, &key, &calls).await;
		clock.advance(WINDOW - MARGIN + Duration::SECOND);

		assert_eq!(lookup(&cache, &clock, &key, &calls).await, "token-2");
		assert_eq!(cache.expires_at(&key), Some(clock.now() + WINDOW));

		clock.advance(WINDOW * 2);

		assert_eq!(lookup(&cache, &clock, &key, &calls).await, "token-3");
		assert_eq!(calls.load(Ordering::SeqCst), 3);
		assert_eq!(cache.len(), 1, "Replacements overwrite rather than accumulate.");
	}

	#[tokio::test]
	async fn failed_mint_keeps_previous_entry() {
		let clock = ManualClock::new(test_instant());
		let cache = cache_at(&clock);
		let calls = AtomicUsize::new(0);
		let key = key("svc", "db.example.com");

		lookup(&cache, &clock, &key, &calls).await;

		let before = cache.expires_at(&key);

		clock.advance(WINDOW - MARGIN + Duration::SECOND);

		let err = cache
			.get_or_mint(&key, || async { Err(Error::from(SigningError::MissingCredentials)) })
			.await
			.expect_err("Mint failure should propagate.");

		assert!(matches!(err, Error::SigningFailed(SigningError::MissingCredentials)));
		assert_eq!(cache.expires_at(&key), before);
		assert_eq!(cache.stats().mint_failures, 1);
	}

	#[tokio::test]
	async fn invalidate_forces_a_new_mint() {
		let clock = ManualClock::new(test_instant());
		let cache = cache_at(&clock);
		let calls = AtomicUsize::new(0);
		let key = key("svc", "db.example.com");

		lookup(&cache, &clock, &key, &calls).await;

		assert!(cache.invalidate(&key));
		assert!(!cache.invalidate(&key));
		assert_eq!(lookup(&cache, &clock, &key, &calls).await, "token-2");
		assert_eq!(cache.stats().invalidations, 1);

		cache.clear();

		assert!(cache.is_empty());
	}

	#[tokio::test]
	async fn keys_ignore_everything_but_identity_and_endpoint() {
		let clock = ManualClock::new(test_instant());
		let cache = cache_at(&clock);
		let calls = AtomicUsize::new(0);
		let profiled = CacheKey {
			credentials: CredentialSource::from_profile("ops").scope(),
			..key("svc", "a.example.com")
		};

		lookup(&cache, &clock, &key("svc", "a.example.com"), &calls).await;
		lookup(&cache, &clock, &key("svc", "b.example.com"), &calls).await;
		lookup(&cache, &clock, &key("reporting", "a.example.com"), &calls).await;
		lookup(&cache, &clock, &profiled, &calls).await;
		lookup(&cache, &clock, &key("svc", "a.example.com"), &calls).await;

		assert_eq!(calls.load(Ordering::SeqCst), 4);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_callers_share_one_mint() {
		let clock = ManualClock::new(test_instant());
		let cache = Arc::new(cache_at(&clock));
		let calls = Arc::new(AtomicUsize::new(0));
		let key = key("svc", "db.example.com");
		let tasks = (0..16)
			.map(|_| {
				let cache = cache.clone();
				let calls = calls.clone();
				let clock = clock.clone();
				let key = key.clone();

				tokio::spawn(async move {
					cache
						.get_or_mint(&key, || async {
							calls.fetch_add(1, Ordering::SeqCst);
							tokio::time::sleep(std::time::Duration::from_millis(50)).await;

							Ok(MintedToken::new("shared", clock.now(), WINDOW))
						})
						.await
						.expect("Minting should succeed.")
				})
			})
			.collect::<Vec<_>>();

		for task in tasks {
			let secret = task.await.expect("Lookup task should not panic.");

			assert_eq!(secret.expose(), "shared");
		}

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(cache.stats().hits, 15);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn slow_mint_does_not_block_other_keys() {
		let clock = ManualClock::new(test_instant());
		let cache = Arc::new(cache_at(&clock));
		let release = Arc::new(Notify::new());
		let started = Arc::new(Notify::new());
		let blocked = {
			let cache = cache.clone();
			let release = release.clone();
			let started = started.clone();
			let clock = clock.clone();

			tokio::spawn(async move {
				cache
					.get_or_mint(&key("svc", "slow.example.com"), || async {
						started.notify_one();
						release.notified().await;

						Ok(MintedToken::new("slow", clock.now(), WINDOW))
					})
					.await
			})
		};

		started.notified().await;

		let calls = AtomicUsize::new(0);
		let fast = tokio::time::timeout(
			std::time::Duration::from_secs(5),
			lookup(&cache, &clock, &key("svc", "fast.example.com"), &calls),
		)
		.await
		.expect("A different key must not wait on the slow mint.");

		assert_eq!(fast, "token-1");

		release.notify_one();

		let slow = blocked
			.await
			.expect("Slow task should not panic.")
			.expect("Slow mint should succeed.");

		assert_eq!(slow.expose(), "slow");
	}

	#[test]
	fn shared_cache_is_a_singleton() {
		assert!(Arc::ptr_eq(&TokenCache::shared(), &TokenCache::shared()));
		assert_eq!(TokenCache::shared().safety_margin(), TokenPolicy::DEFAULT_SAFETY_MARGIN);
	}

	#[test]
	fn policy_sets_the_margin() {
		let clock = ManualClock::new(test_instant());
		let policy = TokenPolicy::default().with_safety_margin(Duration::seconds(5));

		assert_eq!(TokenCache::from_policy(Arc::new(clock), &policy).safety_margin(), Duration::seconds(5));
	}

	#[test]
	fn key_follows_the_request_credentials() {
		let request = TokenRequest::new(
			"db.example.com",
			5432,
			AccountName::new("svc").expect("Account fixture should be valid."),
			Region::new("us-east-1").expect("Region fixture should be valid."),
		);

		assert_eq!(CacheKey::from(&request), key("svc", "db.example.com"));

		let keyed = request.with_credentials(CredentialSource::from_keys(AwsCredentials::new(
			"AKIDCONN",
			"conn-secret",
		)));

		assert_eq!(
			CacheKey::from(&keyed).credentials.base,
			ScopeBase::AccessKey("AKIDCONN".into())
		);
	}
}
