use std::path::Path;
use std::time::Duration;

use chrono::Utc;

use crate::assessment::{AssessmentResponse, DecryptedAssessment};
use crate::bundle::{Bundle, CollectionResult};
use crate::collector::{CollectorError, CollectorRegistry};
use crate::config::SightlineConfig;
use crate::decrypt::{DecryptClient, DecryptError};
use crate::identity::ClientIdentity;
use crate::transport::BundleTransport;

/// The assessment client: identity, the collector registry, and both
/// network endpoints, owned explicitly by the caller.
///
/// Constructed once per process via [`SightlineClient::new`]; there is no
/// global instance.
pub struct SightlineClient {
    identity: ClientIdentity,
    registry: CollectorRegistry,
    transport: BundleTransport,
    decrypt: DecryptClient,
    collector_timeout: Option<Duration>,
}

impl SightlineClient {
    /// Build a ready client from configuration, or fail with the
    /// configuration error. The registry is built from the config's
    /// capability flags.
    pub fn new(config: SightlineConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let http = Self::build_http(&config)?;
        let registry = CollectorRegistry::from_config(&config, &http);
        Self::assemble(config, registry, http)
    }

    /// Build a client around a caller-supplied registry. The registry's
    /// order fixes the order of results in every submitted bundle.
    pub fn with_registry(
        config: SightlineConfig,
        registry: CollectorRegistry,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let http = Self::build_http(&config)?;
        Self::assemble(config, registry, http)
    }

    fn build_http(config: &SightlineConfig) -> anyhow::Result<reqwest::Client> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .user_agent(concat!("sightline/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(http)
    }

    fn assemble(
        config: SightlineConfig,
        registry: CollectorRegistry,
        http: reqwest::Client,
    ) -> anyhow::Result<Self> {
        let identity = ClientIdentity::new(
            config.token.clone(),
            config.context.clone(),
            config.state_path.as_deref().map(Path::new),
        );
        let transport = BundleTransport::new(http.clone(), config.ingest_url.clone());
        let decrypt = DecryptClient::new(
            http,
            config.decrypt_url.clone(),
            config.decrypt_secret.clone(),
        );

        Ok(Self {
            identity,
            registry,
            transport,
            decrypt,
            collector_timeout: config.collector_timeout_seconds.map(Duration::from_secs),
        })
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Run one assessment: collect, bundle, submit, decode.
    ///
    /// Never returns an error: every failure mode degrades to an
    /// `AssessmentResponse` whose status describes it and whose verdict is
    /// absent.
    pub async fn assess(&self) -> AssessmentResponse {
        let results = self.run_collectors().await;
        let bundle = Bundle::new(results);

        let body = match bundle.encode() {
            Ok(body) => body,
            Err(e) => {
                log::error!("{e}");
                return AssessmentResponse::degraded(e.to_string());
            }
        };

        log::debug!("submitting bundle: {body}");

        let raw = match self.transport.post_bundle(&self.identity, &body).await {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("bundle submission failed: {e}");
                return AssessmentResponse::degraded(e.to_string());
            }
        };

        match AssessmentResponse::decode(&raw) {
            Ok(response) => {
                log::debug!("assessment status: {}", response.status);
                response
            }
            Err(e) => {
                log::warn!("failed to decode assessment response: {e}");
                AssessmentResponse::degraded("error decoding assessment response")
            }
        }
    }

    /// Run every registered collector strictly sequentially, in registry
    /// order. A collector's failure is absorbed into its result; the next
    /// collector always runs.
    async fn run_collectors(&self) -> Vec<CollectionResult> {
        let mut results = Vec::with_capacity(self.registry.len());

        for collector in self.registry.iter() {
            let descriptor = collector.descriptor();
            let start = Utc::now();

            let outcome = match self.collector_timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, collector.collect(&self.identity)).await {
                        Ok(outcome) => outcome,
                        Err(_) => Err(CollectorError::Timeout(limit)),
                    }
                }
                None => collector.collect(&self.identity).await,
            };

            let mut result = CollectionResult {
                pid: descriptor.pid.to_string(),
                version: descriptor.version,
                start,
                end: Some(Utc::now()),
                data: None,
                error: None,
            };

            match outcome {
                Ok(payload) => result.data = Some(payload),
                Err(e) => {
                    log::warn!("collector {} failed: {e}", descriptor.pid);
                    result.error = Some(e.to_string());
                }
            }

            results.push(result);
        }

        results
    }

    /// Decrypt a previously obtained opaque verdict. Independent of
    /// `assess()`; see [`DecryptClient::decrypt_assessment`].
    pub async fn decrypt_assessment(
        &self,
        opaque_verdict: &str,
    ) -> Result<DecryptedAssessment, DecryptError> {
        self.decrypt.decrypt_assessment(opaque_verdict).await
    }
}
