use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_INGEST_URL: &str = "https://in.sightline.dev/r/bundle";
pub const DEFAULT_DECRYPT_URL: &str = "https://decrypt.sightline.dev/api/v1/assessment";
pub const DEFAULT_REGION_DOMAIN: &str = "probe.sightline.dev";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SightlineConfig {
    /// Site token identifying the integration.
    pub token: String,
    /// Secret for the decryption endpoint; decryption is unavailable without it.
    #[serde(default)]
    pub decrypt_secret: Option<String>,
    #[serde(default = "default_ingest_url")]
    pub ingest_url: String,
    #[serde(default = "default_decrypt_url")]
    pub decrypt_url: String,
    /// Static regional probe domain, used unless `region_url` resolves one.
    #[serde(default = "default_region_domain")]
    pub region_domain: String,
    /// Optional control endpoint that serves the regional probe domain.
    #[serde(default)]
    pub region_url: Option<String>,
    /// Caller-provided context data, forwarded as the `cd` query parameter.
    #[serde(default)]
    pub context: Option<String>,
    /// Where the per-device install id is persisted. Unset means a fresh id
    /// per process.
    #[serde(default)]
    pub state_path: Option<String>,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
    /// Upper bound per collector run. Unset means collectors are unbounded
    /// and a hung collector stalls the whole assessment.
    #[serde(default)]
    pub collector_timeout_seconds: Option<u64>,
    #[serde(default = "default_true")]
    pub collect_dns_probe: bool,
    #[serde(default = "default_true")]
    pub collect_device: bool,
    #[serde(default = "default_true")]
    pub collect_network: bool,
    #[serde(default = "default_true")]
    pub collect_location: bool,
}

fn default_ingest_url() -> String {
    DEFAULT_INGEST_URL.to_string()
}

fn default_decrypt_url() -> String {
    DEFAULT_DECRYPT_URL.to_string()
}

fn default_region_domain() -> String {
    DEFAULT_REGION_DOMAIN.to_string()
}

fn default_http_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for SightlineConfig {
    fn default() -> Self {
        SightlineConfig {
            token: String::new(),
            decrypt_secret: None,
            ingest_url: default_ingest_url(),
            decrypt_url: default_decrypt_url(),
            region_domain: default_region_domain(),
            region_url: None,
            context: None,
            state_path: None,
            http_timeout_seconds: default_http_timeout(),
            collector_timeout_seconds: None,
            collect_dns_probe: true,
            collect_device: true,
            collect_network: true,
            collect_location: true,
        }
    }
}

impl SightlineConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path}"))?;
        let config: SightlineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.token.trim().is_empty() {
            bail!("token must not be empty");
        }
        Url::parse(&self.ingest_url)
            .with_context(|| format!("invalid ingest_url: {}", self.ingest_url))?;
        Url::parse(&self.decrypt_url)
            .with_context(|| format!("invalid decrypt_url: {}", self.decrypt_url))?;
        if let Some(region_url) = &self.region_url {
            Url::parse(region_url).with_context(|| format!("invalid region_url: {region_url}"))?;
        }
        if self.region_domain.trim().is_empty() {
            bail!("region_domain must not be empty");
        }
        Ok(())
    }
}
