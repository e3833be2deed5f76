use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use serde::Serialize;

use crate::collector::{Collector, CollectorDescriptor, CollectorError};
use crate::identity::ClientIdentity;

const DESCRIPTOR: CollectorDescriptor = CollectorDescriptor {
    pid: "p/nw",
    version: 1,
};

/// Characteristics of the resolver path the client is using.
#[derive(Debug, Serialize)]
struct NetworkInfo {
    resolver_ok: bool,
    a_records: u32,
    aaaa_records: u32,
    ipv6: bool,
}

/// Probes the local resolver (`p/nw`): whether the probe domain resolves
/// through the system configuration, and whether the path offers IPv6.
pub struct NetworkCollector {
    probe_domain: String,
    timeout_seconds: u64,
}

impl NetworkCollector {
    pub fn new(probe_domain: String, timeout_seconds: u64) -> Self {
        Self {
            probe_domain,
            timeout_seconds,
        }
    }

    async fn lookup(&self) -> Result<NetworkInfo, CollectorError> {
        let resolver = TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|e| CollectorError::Other(format!("failed to create DNS resolver: {e}")))?;

        let lookup_future = resolver.lookup_ip(self.probe_domain.as_str());
        let bounded = tokio::time::timeout(Duration::from_secs(self.timeout_seconds), lookup_future);

        match bounded.await {
            Ok(Ok(response)) => {
                let mut a_records = 0;
                let mut aaaa_records = 0;
                for ip in response.iter() {
                    match ip {
                        IpAddr::V4(_) => a_records += 1,
                        IpAddr::V6(_) => aaaa_records += 1,
                    }
                }
                log::debug!(
                    "resolver lookup for {}: {a_records} A, {aaaa_records} AAAA",
                    self.probe_domain
                );
                Ok(NetworkInfo {
                    resolver_ok: a_records + aaaa_records > 0,
                    a_records,
                    aaaa_records,
                    ipv6: aaaa_records > 0,
                })
            }
            Ok(Err(e)) => {
                log::debug!("resolver lookup for {} failed: {e}", self.probe_domain);
                Ok(NetworkInfo {
                    resolver_ok: false,
                    a_records: 0,
                    aaaa_records: 0,
                    ipv6: false,
                })
            }
            Err(_) => {
                log::debug!("resolver lookup for {} timed out", self.probe_domain);
                Ok(NetworkInfo {
                    resolver_ok: false,
                    a_records: 0,
                    aaaa_records: 0,
                    ipv6: false,
                })
            }
        }
    }
}

#[async_trait]
impl Collector for NetworkCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        DESCRIPTOR
    }

    async fn collect(&self, _identity: &ClientIdentity) -> Result<String, CollectorError> {
        let info = self.lookup().await?;
        serde_json::to_string(&info).map_err(|e| CollectorError::Serialization(e.to_string()))
    }
}
