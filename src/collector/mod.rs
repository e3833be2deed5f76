pub mod device;
pub mod dns_probe;
pub mod location;
pub mod network;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::SightlineConfig;
use crate::identity::ClientIdentity;

pub use device::DeviceInfoCollector;
pub use dns_probe::{DnsProbeCollector, RegionResolver};
pub use location::LocationCollector;
pub use network::NetworkCollector;

/// Fixed identity of a collector kind on the wire: a short protocol id and
/// the schema version of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorDescriptor {
    pub pid: &'static str,
    pub version: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("network error: {0}")]
    Network(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("collector timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Other(String),
}

/// A unit of work producing one signal for the assessment bundle.
///
/// The output is the payload already rendered to its JSON wire form; the
/// pipeline treats it as an opaque string from here on. All failure must be
/// returned as a `CollectorError`: nothing escapes the boundary, and one
/// collector's failure never affects its siblings.
#[async_trait]
pub trait Collector: Send + Sync {
    fn descriptor(&self) -> CollectorDescriptor;

    async fn collect(&self, identity: &ClientIdentity) -> Result<String, CollectorError>;
}

/// The ordered set of enabled collectors.
///
/// Built once from configuration and never mutated afterwards. Order is
/// significant: it fixes the order of results in the submitted bundle.
pub struct CollectorRegistry {
    collectors: Vec<Box<dyn Collector>>,
}

impl CollectorRegistry {
    pub fn new(collectors: Vec<Box<dyn Collector>>) -> Self {
        Self { collectors }
    }

    /// Build the registry from the config's capability flags, in the fixed
    /// order: dns-probe, device, network, location.
    pub fn from_config(config: &SightlineConfig, http: &reqwest::Client) -> Self {
        let mut collectors: Vec<Box<dyn Collector>> = Vec::new();

        if config.collect_dns_probe {
            let region = RegionResolver::new(
                http.clone(),
                config.region_url.clone(),
                config.region_domain.clone(),
            );
            collectors.push(Box::new(DnsProbeCollector::new(http.clone(), region)));
        }
        if config.collect_device {
            collectors.push(Box::new(DeviceInfoCollector::new()));
        }
        if config.collect_network {
            collectors.push(Box::new(NetworkCollector::new(
                config.region_domain.clone(),
                config.http_timeout_seconds,
            )));
        }
        if config.collect_location {
            collectors.push(Box::new(LocationCollector::new()));
        }

        log::debug!("collector registry built with {} collectors", collectors.len());
        Self { collectors }
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Collector> {
        self.collectors.iter().map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}
