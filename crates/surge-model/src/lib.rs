//! Data types shared by every surge crate.
//!
//! A [`Unit`] is one throwaway workload; the orchestrator records what happened to it per [`Phase`] in a [`UnitRecord`],
//! and the whole run is serialized as a [`Report`].

mod error;
pub use error::ModelError;

mod domain;
pub use domain::*;

mod report;
pub use report::Report;

pub mod timestamp;
