use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use crate::collector::{Collector, CollectorDescriptor, CollectorError};
use crate::identity::ClientIdentity;

const DESCRIPTOR: CollectorDescriptor = CollectorDescriptor {
    pid: "p/dr",
    version: 1,
};

/// What the probe observed. Probe failure is reported in-band (`ok: false`)
/// rather than as a collector error, since an unreachable probe endpoint is
/// itself a signal.
#[derive(Debug, Serialize)]
struct DnsProbeReport {
    ok: bool,
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    dns: Option<String>,
}

/// Resolves the regional probe domain.
///
/// When a control URL is configured the domain is fetched from it per run;
/// absence of a control URL, or any failure talking to it, falls back to the
/// static region so that region resolution is never a mandatory network
/// dependency.
pub struct RegionResolver {
    http: reqwest::Client,
    control_url: Option<String>,
    fallback: String,
}

impl RegionResolver {
    pub fn new(http: reqwest::Client, control_url: Option<String>, fallback: String) -> Self {
        Self {
            http,
            control_url,
            fallback,
        }
    }

    pub async fn resolve(&self) -> String {
        let control_url = match &self.control_url {
            Some(url) => url,
            None => return self.fallback.clone(),
        };

        match self.fetch_region(control_url).await {
            Ok(region) => {
                log::debug!("using regional probe domain: {region}");
                region
            }
            Err(e) => {
                log::debug!("regional domain fetch failed ({e}), using {}", self.fallback);
                self.fallback.clone()
            }
        }
    }

    async fn fetch_region(&self, control_url: &str) -> Result<String> {
        let response = self
            .http
            .get(control_url)
            .send()
            .await
            .context("region control request failed")?;

        if !response.status().is_success() {
            bail!("region control endpoint returned {}", response.status());
        }

        let region = response
            .text()
            .await
            .context("region control response was not text")?
            .trim()
            .to_string();

        if region.is_empty() {
            bail!("region control endpoint returned an empty body");
        }
        Ok(region)
    }
}

/// Issues a DNS resolution probe (`p/dr`): a GET against a unique,
/// per-invocation subdomain of the regional probe domain. The act of
/// resolving that subdomain is the measurement; the response body is the
/// endpoint's observation of the resolver that performed it.
pub struct DnsProbeCollector {
    http: reqwest::Client,
    region: RegionResolver,
}

impl DnsProbeCollector {
    pub fn new(http: reqwest::Client, region: RegionResolver) -> Self {
        Self { http, region }
    }

    async fn probe(&self, id: &str, region: &str, identity: &ClientIdentity) -> Result<String> {
        let mut url = Url::parse(&format!("https://{id}.{region}/d/p"))
            .with_context(|| format!("invalid probe host {id}.{region}"))?;
        // The probe id rides along as its own parameter, ahead of the common
        // identity parameters.
        url.query_pairs_mut().append_pair("s", id);
        identity.append_query_params(&mut url);

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            bail!("probe endpoint returned {}", response.status());
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Collector for DnsProbeCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        DESCRIPTOR
    }

    async fn collect(&self, identity: &ClientIdentity) -> Result<String, CollectorError> {
        let id = Uuid::new_v4().simple().to_string();
        let region = self.region.resolve().await;

        let report = match self.probe(&id, &region, identity).await {
            Ok(dns) => DnsProbeReport {
                ok: true,
                id,
                dns: Some(dns),
            },
            Err(e) => {
                log::debug!("dns probe failed: {e}");
                DnsProbeReport {
                    ok: false,
                    id,
                    dns: None,
                }
            }
        };

        serde_json::to_string(&report).map_err(|e| CollectorError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn http_client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_region_static_without_control_url() {
        let resolver = RegionResolver::new(http_client(), None, "probe.example.com".to_string());
        assert_eq!(resolver.resolve().await, "probe.example.com");
    }

    #[tokio::test]
    async fn test_region_fetched_from_control_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/region")
            .with_status(200)
            .with_body("eu.probe.example.com\n")
            .create_async()
            .await;

        let resolver = RegionResolver::new(
            http_client(),
            Some(format!("{}/region", server.url())),
            "probe.example.com".to_string(),
        );
        assert_eq!(resolver.resolve().await, "eu.probe.example.com");
    }

    #[tokio::test]
    async fn test_region_falls_back_on_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/region")
            .with_status(500)
            .create_async()
            .await;

        let resolver = RegionResolver::new(
            http_client(),
            Some(format!("{}/region", server.url())),
            "probe.example.com".to_string(),
        );
        assert_eq!(resolver.resolve().await, "probe.example.com");
    }

    #[tokio::test]
    async fn test_region_falls_back_on_empty_body() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/region")
            .with_status(200)
            .with_body("  \n")
            .create_async()
            .await;

        let resolver = RegionResolver::new(
            http_client(),
            Some(format!("{}/region", server.url())),
            "probe.example.com".to_string(),
        );
        assert_eq!(resolver.resolve().await, "probe.example.com");
    }

    #[tokio::test]
    async fn test_unreachable_probe_reports_in_band_failure() {
        // `.invalid` is reserved and never resolves, so the probe request
        // fails fast; the collector must still succeed with ok=false.
        let region = RegionResolver::new(http_client(), None, "invalid".to_string());
        let collector = DnsProbeCollector::new(http_client(), region);
        let identity = ClientIdentity::new("tok".to_string(), None, None);

        let payload = collector.collect(&identity).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();

        assert_eq!(value["ok"], false);
        assert!(value["id"].as_str().unwrap().len() == 32);
        assert!(value.get("dns").is_none());
    }
}
