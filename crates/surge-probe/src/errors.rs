use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("invalid route {route}: {reason}")]
    InvalidRoute { route: String, reason: String },

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} answered {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("{endpoint} still answering {status} after {attempts} attempts: {body}")]
    RetriesExhausted {
        endpoint: String,
        status: u16,
        body: String,
        attempts: u32,
    },

    #[error("probe cancelled")]
    Cancelled,
}
