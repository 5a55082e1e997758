//! Device authorization records, code generation, and engine options.

pub mod code;
pub mod options;
pub mod record;

pub use code::*;
pub use options::*;
pub use record::*;
