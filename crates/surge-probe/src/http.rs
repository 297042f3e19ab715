use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{config::ProbeConfig, errors::ProbeError};

/// Checks that an activated unit answers on its route.
///
/// `max_retries` bounds the retries after transient answers; `0` means a single attempt.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(
        &self,
        cancel: &CancellationToken,
        route: &str,
        max_retries: u32,
    ) -> Result<String, ProbeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Healthy,
    /// Route not wired up or instance still booting.
    Transient,
    Terminal,
}

fn classify(status: StatusCode) -> Verdict {
    match status {
        StatusCode::OK => Verdict::Healthy,
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::NOT_FOUND => Verdict::Transient,
        _ => Verdict::Terminal,
    }
}

/// [`HealthProbe`] issuing plain GET requests.
#[derive(Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    backoff: std::time::Duration,
}

impl HttpProbe {
    pub fn new(cfg: &ProbeConfig) -> Result<Self, ProbeError> {
        let mut builder =
            reqwest::Client::builder().danger_accept_invalid_certs(cfg.skip_verify_certificate);
        if let Some(timeout) = cfg.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ProbeError::Client)?;

        Ok(Self {
            client,
            backoff: cfg.backoff,
        })
    }

    async fn attempt(&self, url: &Url) -> Result<(StatusCode, String), ProbeError> {
        let transport = |source| ProbeError::Transport {
            endpoint: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        Ok((status, body))
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(
        &self,
        cancel: &CancellationToken,
        route: &str,
        max_retries: u32,
    ) -> Result<String, ProbeError> {
        let url = Url::parse(route).map_err(|e| ProbeError::InvalidRoute {
            route: route.to_string(),
            reason: e.to_string(),
        })?;
        let endpoint = url.to_string();

        let mut failed: u32 = 0;
        loop {
            let (status, body) = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
                res = self.attempt(&url) => res?,
            };

            match classify(status) {
                Verdict::Healthy => {
                    debug!(target: "surge.probe", %endpoint, attempts = failed + 1, "healthy");
                    return Ok(body);
                }
                Verdict::Transient if failed < max_retries => {
                    failed += 1;
                    warn!(
                        target: "surge.probe",
                        %endpoint,
                        status = status.as_u16(),
                        %body,
                        retry = failed,
                        "transient answer; retrying",
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
                        _ = tokio::time::sleep(self.backoff) => {}
                    }
                }
                Verdict::Transient => {
                    warn!(target: "surge.probe", %endpoint, status = status.as_u16(), %body, "retry budget exhausted");
                    return Err(ProbeError::RetriesExhausted {
                        endpoint,
                        status: status.as_u16(),
                        body,
                        attempts: failed + 1,
                    });
                }
                Verdict::Terminal => {
                    warn!(target: "surge.probe", %endpoint, status = status.as_u16(), %body, "probe failed");
                    return Err(ProbeError::Status {
                        endpoint,
                        status: status.as_u16(),
                        body,
                    });
                }
            }
        }
    }
}
