//! Identity-side domain types: validated identifiers, allow-lists, and verified identities.

pub mod id;
pub mod identity;
pub mod secret;
pub mod subjects;

pub use id::*;
pub use identity::*;
pub use secret::*;
pub use subjects::*;
