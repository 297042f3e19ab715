use std::time::Duration;

use serde::Deserialize;
use surge_exec::CommandRunner;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::CoreError;

const SHARED_DOMAINS_PATH: &str = "/v2/shared_domains";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct SharedDomains {
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    entity: Entity,
}

#[derive(Debug, Deserialize)]
struct Entity {
    name: String,
}

/// First shared domain the platform advertises; used when no domain is configured.
pub async fn default_shared_domain(
    runner: &dyn CommandRunner,
    cancel: &CancellationToken,
) -> Result<String, CoreError> {
    let args = ["curl".to_string(), SHARED_DOMAINS_PATH.to_string()];
    let output = runner.run(cancel, LOOKUP_TIMEOUT, &args).await?;
    let domain = parse_shared_domains(&output)?;

    info!(target: "surge.core.domain", %domain, "using default shared domain");
    Ok(domain)
}

fn parse_shared_domains(raw: &[u8]) -> Result<String, CoreError> {
    let parsed: SharedDomains =
        serde_json::from_slice(raw).map_err(|e| CoreError::DomainParse(e.to_string()))?;
    parsed
        .resources
        .into_iter()
        .next()
        .map(|r| r.entity.name)
        .ok_or(CoreError::NoSharedDomain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRunner;

    const TWO_DOMAINS: &str = r#"{
        "total_results": 2,
        "resources": [
            {"metadata": {"guid": "g1"}, "entity": {"name": "apps.example.com", "router_group_guid": null}},
            {"metadata": {"guid": "g2"}, "entity": {"name": "tcp.example.com"}}
        ]
    }"#;

    #[test]
    fn picks_the_first_domain() {
        assert_eq!(
            parse_shared_domains(TWO_DOMAINS.as_bytes()).unwrap(),
            "apps.example.com"
        );
    }

    #[test]
    fn large_answers_parse_whole() {
        let resources: Vec<String> = (0..12)
            .map(|i| {
                format!(
                    r#"{{"metadata": {{"guid": "guid-{i:04}", "url": "/v2/shared_domains/guid-{i:04}", "created_at": "2024-03-05T07:08:09Z"}}, "entity": {{"name": "d{i}.apps.example.com", "internal": false, "router_group_guid": null, "router_group_type": null}}}}"#
                )
            })
            .collect();
        let raw = format!(
            r#"{{"total_results": 12, "total_pages": 1, "prev_url": null, "next_url": null, "resources": [{}]}}"#,
            resources.join(",")
        );
        assert!(raw.len() > 1024);

        assert_eq!(parse_shared_domains(raw.as_bytes()).unwrap(), "d0.apps.example.com");
    }

    #[test]
    fn empty_resources_is_an_error() {
        assert!(matches!(
            parse_shared_domains(br#"{"resources": []}"#),
            Err(CoreError::NoSharedDomain)
        ));
        assert!(matches!(
            parse_shared_domains(b"{}"),
            Err(CoreError::NoSharedDomain)
        ));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            parse_shared_domains(b"FAILED\nNot logged in."),
            Err(CoreError::DomainParse(_))
        ));
    }

    #[tokio::test]
    async fn queries_the_platform_through_the_runner() {
        let runner = FakeRunner::default().with_curl_output(TWO_DOMAINS);
        let domain = default_shared_domain(&runner, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(domain, "apps.example.com");
        assert_eq!(runner.calls(), vec![vec!["curl".to_string(), SHARED_DOMAINS_PATH.to_string()]]);
    }
}
