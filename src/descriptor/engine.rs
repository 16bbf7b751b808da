//! Conventional ports of the engines the dispatcher knows by name.

// self
use crate::auth::EngineId;

impl EngineId {
	/// Conventional port for well-known engines; `None` means the descriptor must name one.
	pub fn default_port(&self) -> Option<u16> {
		match &**self {
			"postgres" | "postgresql" => Some(5432),
			"mysql" | "mariadb" => Some(3306),
			_ => None,
		}
	}
}
