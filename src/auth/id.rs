//! Strongly typed identifiers for engines, database accounts, and cloud regions.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal $(, $rule:path => $expected:literal)?) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				Self::validate(view)?;

				Ok(Self(view.to_owned()))
			}

			fn validate(view: &str) -> Result<(), IdentifierError> {
				validate_view($kind, view)?;
				$(
					if !$rule(view) {
						return Err(IdentifierError::InvalidFormat { kind: $kind, expected: $expected });
					}
				)?

				Ok(())
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::validate(&value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (engine, account, region).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (engine, account, region).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (engine, account, region).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// The identifier does not follow the grammar of its kind.
	#[error("{kind} identifier must be {expected}.")]
	InvalidFormat {
		/// Kind of identifier (engine, account, region).
		kind: &'static str,
		/// Human-readable shape the value must have.
		expected: &'static str,
	},
}

def_id! {
	EngineId,
	"Identifier selecting the underlying driver (`postgres`, `mysql`, ...).",
	"Engine",
	is_scheme => "a lowercase URL scheme such as `postgres`"
}
def_id! { AccountName, "Database account the token is minted for.", "Account" }
def_id! {
	Region,
	"Cloud region the database lives in (`us-east-1`, ...).",
	"Region",
	is_region_code => "a lowercase region code such as `us-east-1`"
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

/// Engines double as the delegate descriptor's URL scheme.
fn is_scheme(view: &str) -> bool {
	let mut chars = view.chars();

	chars.next().is_some_and(|c| c.is_ascii_lowercase())
		&& chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
}

fn is_region_code(view: &str) -> bool {
	let mut parts = view.split('-');

	parts.next().is_some_and(|head| !head.is_empty() && head.chars().all(|c| c.is_ascii_lowercase()))
		&& view.contains('-')
		&& parts.all(|part| {
			!part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
		})
}
