//! Host-side driver manager routing descriptors to the first driver that accepts them.

// self
use crate::{
	_prelude::*,
	driver::{Driver, DriverError, Properties, SharedDriver},
};

/// Failures raised by [`DriverManager::connect`].
#[derive(Debug, ThisError)]
pub enum ManagerError {
	/// No registered driver accepts the descriptor.
	#[error("No registered driver accepts the connection descriptor.")]
	NoSuitableDriver,
	/// The selected driver failed; its error is passed through.
	#[error(transparent)]
	Driver(DriverError),
}

/// Ordered collection of drivers, consulted in registration order.
pub struct DriverManager<C>
where
	C: 'static + Send,
{
	drivers: RwLock<Vec<SharedDriver<C>>>,
}
impl<C> DriverManager<C>
where
	C: 'static + Send,
{
	/// Creates a manager with no drivers.
	pub fn new() -> Self {
		Self { drivers: Default::default() }
	}

	/// Appends `driver`; earlier registrations win when several accept a descriptor.
	pub fn register<D>(&self, driver: D)
	where
		D: 'static + Driver<Connection = C>,
	{
		self.register_shared(Arc::new(driver));
	}

	/// Appends an already shared driver.
	pub fn register_shared(&self, driver: SharedDriver<C>) {
		self.drivers.write().push(driver);
	}

	/// Returns the first registered driver accepting `descriptor`.
	pub fn driver_for(&self, descriptor: &str) -> Option<SharedDriver<C>> {
		self.drivers.read().iter().find(|driver| driver.accepts_descriptor(descriptor)).cloned()
	}

	/// Connects through the first driver accepting `descriptor`.
	pub async fn connect(
		&self,
		descriptor: &str,
		properties: Properties,
	) -> Result<C, ManagerError> {
		let driver = self.driver_for(descriptor).ok_or(ManagerError::NoSuitableDriver)?;

		driver.connect(descriptor, properties).await.map_err(ManagerError::Driver)
	}

	/// Number of registered drivers.
	pub fn len(&self) -> usize {
		self.drivers.read().len()
	}

	/// Returns `true` when no driver is registered.
	pub fn is_empty(&self) -> bool {
		self.drivers.read().is_empty()
	}
}
impl<C> Default for DriverManager<C>
where
	C: 'static + Send,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<C> Debug for DriverManager<C>
where
	C: 'static + Send,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DriverManager").field("drivers", &self.drivers.read().len()).finish()
	}
}
