//! Logger setup shared by surge binaries.
//!
//! Everything is written to stderr; stdout is left to the tools surge drives.
mod logger;
pub use logger::*;
