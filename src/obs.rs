//! Optional observability helpers for connect and mint flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `iam_db_auth.flow` with the `flow` and `stage` fields,
//!   plus `debug` events for token cache decisions. Token values never reach either.
//! - Enable `metrics` to increment `iam_db_auth_flow_total` (labels `flow`, `outcome`) and
//!   `iam_db_auth_cache_total` (label `event`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// A full dispatcher connect call.
	Connect,
	/// A token mint through the signer.
	Mint,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Connect => "connect",
			FlowKind::Mint => "mint",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Token cache decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheEvent {
	/// A cached token was handed out.
	Hit,
	/// A token was minted and stored.
	Mint,
	/// A mint attempt failed.
	MintFailure,
	/// An entry was dropped on request.
	Invalidate,
}
impl CacheEvent {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheEvent::Hit => "hit",
			CacheEvent::Mint => "mint",
			CacheEvent::MintFailure => "mint_failure",
			CacheEvent::Invalidate => "invalidate",
		}
	}
}
impl Display for CacheEvent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records a cache decision through whichever of `tracing`/`metrics` is enabled.
pub fn record_cache_event(event: CacheEvent) {
	trace_cache_event(event);
	count_cache_event(event);
}
