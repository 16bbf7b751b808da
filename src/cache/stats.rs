// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::obs::{self, CacheEvent};

/// Counts of cache decisions at one point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
	/// Lookups answered from the cache, coalesced waiters included.
	pub hits: u64,
	/// Tokens minted and stored.
	pub mints: u64,
	/// Mint attempts that failed.
	pub mint_failures: u64,
	/// Entries dropped through [`TokenCache::invalidate`](super::TokenCache::invalidate).
	pub invalidations: u64,
}
impl CacheStats {
	/// Share of lookups served without signing; `None` before the first lookup.
	pub fn hit_ratio(&self) -> Option<f64> {
		let lookups = self.hits + self.mints + self.mint_failures;

		(lookups > 0).then(|| self.hits as f64 / lookups as f64)
	}
}

/// Per-cache event counters; every event is also forwarded to the `obs` recorders.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters([AtomicU64; 4]);
impl CacheCounters {
	pub(crate) fn record(&self, event: CacheEvent) {
		self.0[slot(event)].fetch_add(1, Ordering::Relaxed);

		obs::record_cache_event(event);
	}

	pub(crate) fn snapshot(&self) -> CacheStats {
		let load = |event| self.0[slot(event)].load(Ordering::Relaxed);

		CacheStats {
			hits: load(CacheEvent::Hit),
			mints: load(CacheEvent::Mint),
			mint_failures: load(CacheEvent::MintFailure),
			invalidations: load(CacheEvent::Invalidate),
		}
	}
}

const fn slot(event: CacheEvent) -> usize {
	match event {
		CacheEvent::Hit => 0,
		CacheEvent::Mint => 1,
		CacheEvent::MintFailure => 2,
		CacheEvent::Invalidate => 3,
	}
}
