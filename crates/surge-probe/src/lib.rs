//! HTTP health probing of activated units.

mod config;
pub use config::ProbeConfig;

mod errors;
pub use errors::ProbeError;

mod http;
pub use http::{HealthProbe, HttpProbe};
