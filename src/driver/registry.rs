//! Engine-keyed registry of the drivers the dispatcher delegates to.

// self
use crate::{_prelude::*, auth::EngineId, driver::Driver};

/// Shared handle to an underlying driver producing `C` connections.
pub type SharedDriver<C> = Arc<dyn Driver<Connection = C>>;

/// Maps engine identifiers to the driver that speaks the engine's protocol.
///
/// Registration is allowed at any time; lookups only hold the read lock long enough to clone
/// the driver handle.
pub struct DriverRegistry<C>
where
	C: 'static + Send,
{
	drivers: RwLock<HashMap<EngineId, SharedDriver<C>>>,
}
impl<C> DriverRegistry<C>
where
	C: 'static + Send,
{
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self { drivers: Default::default() }
	}

	/// Registers `driver` for `engine`, returning the driver it replaced.
	pub fn register<D>(&self, engine: EngineId, driver: D) -> Option<SharedDriver<C>>
	where
		D: 'static + Driver<Connection = C>,
	{
		self.register_shared(engine, Arc::new(driver))
	}

	/// Registers an already shared driver for `engine`, returning the driver it replaced.
	pub fn register_shared(
		&self,
		engine: EngineId,
		driver: SharedDriver<C>,
	) -> Option<SharedDriver<C>> {
		self.drivers.write().insert(engine, driver)
	}

	/// Removes the driver registered for `engine`.
	pub fn deregister(&self, engine: &str) -> Option<SharedDriver<C>> {
		self.drivers.write().remove(engine)
	}

	/// Returns the driver registered for `engine`.
	pub fn resolve(&self, engine: &str) -> Option<SharedDriver<C>> {
		self.drivers.read().get(engine).cloned()
	}

	/// Registered engines, sorted.
	pub fn engines(&self) -> Vec<EngineId> {
		let mut engines = self.drivers.read().keys().cloned().collect::<Vec<_>>();

		engines.sort();

		engines
	}
}
impl<C> Default for DriverRegistry<C>
where
	C: 'static + Send,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<C> Debug for DriverRegistry<C>
where
	C: 'static + Send,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DriverRegistry").field("engines", &self.drivers.read().len()).finish()
	}
}
