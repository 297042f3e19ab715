use std::time::Duration;

/// Probe settings shared by every unit of a run.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Pause between attempts after a transient answer.
    pub backoff: Duration,
    /// Per-request deadline; `None` leaves it to the transport.
    pub request_timeout: Option<Duration>,
    pub skip_verify_certificate: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(2),
            request_timeout: Some(Duration::from_secs(30)),
            skip_verify_certificate: false,
        }
    }
}
