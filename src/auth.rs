//! Auth-domain identifiers, scope sets, redacted codes, and subjects.

pub mod id;
pub mod scope;
pub mod secret;
pub mod subject;

pub use id::*;
pub use scope::*;
pub use secret::*;
pub use subject::*;
