//! Crate-level error types shared by the parser, the token cache, and the dispatcher.

// self
use crate::{_prelude::*, signer::SigningError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error used wherever an external collaborator's error is carried verbatim.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical error surfaced by [`IamAuthDriver::connect`](crate::driver::IamAuthDriver::connect).
///
/// Each variant names the stage that failed first; nothing is retried or downgraded to a
/// fallback credential.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The descriptor is not a well-formed `iamauth` descriptor.
	#[error("Malformed connection descriptor: {reason}.")]
	MalformedDescriptor {
		/// What the parser rejected.
		reason: String,
	},
	/// No region was supplied and the ambient provider had none either.
	#[error("No region was provided and none could be resolved from the environment.")]
	RegionUnresolved,
	/// The engine is syntactically valid but no driver is registered for it.
	#[error("No underlying driver is registered for engine `{engine}`.")]
	UnsupportedEngine {
		/// Engine identifier taken from the descriptor.
		engine: String,
	},
	/// Credential resolution or token signing failed.
	#[error(transparent)]
	SigningFailed(#[from] SigningError),
	/// The underlying driver failed; the inner error is its own, untouched.
	#[error(transparent)]
	Driver(BoxError),
}
impl Error {
	/// Builds a [`Error::MalformedDescriptor`] from any displayable reason.
	pub fn malformed(reason: impl Into<String>) -> Self {
		Self::MalformedDescriptor { reason: reason.into() }
	}
}
