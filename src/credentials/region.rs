//! Region resolution used when a descriptor does not name a region.

// self
use crate::{_prelude::*, auth::Region};

/// Boxed future returned by [`RegionProvider::region`].
pub type RegionFuture<'a> = Pin<Box<dyn Future<Output = Option<Region>> + 'a + Send>>;

/// Supplies the fallback region for descriptors that omit one.
pub trait RegionProvider
where
	Self: Send + Sync,
{
	/// Returns the region for `profile` when one is named, otherwise the ambient region.
	fn region<'a>(&'a self, profile: Option<&'a str>) -> RegionFuture<'a>;
}

/// Always answers with the same region, whatever the profile.
#[derive(Clone, Debug)]
pub struct StaticRegionProvider(pub Region);
impl RegionProvider for StaticRegionProvider {
	fn region<'a>(&'a self, _: Option<&'a str>) -> RegionFuture<'a> {
		let region = self.0.clone();

		Box::pin(async move { Some(region) })
	}
}

/// Never resolves a region; descriptors must carry their own.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRegion;
impl RegionProvider for NoRegion {
	fn region<'a>(&'a self, _: Option<&'a str>) -> RegionFuture<'a> {
		Box::pin(async { None })
	}
}
