//! Identity-side domain types: validated identifiers, token secrets, and minted tokens.

pub mod id;
pub mod secret;
pub mod token;

pub use id::*;
pub use secret::*;
pub use token::*;
