use async_trait::async_trait;
use chrono::Local;
use serde::Serialize;

use crate::collector::{Collector, CollectorDescriptor, CollectorError};
use crate::identity::ClientIdentity;

const DESCRIPTOR: CollectorDescriptor = CollectorDescriptor {
    pid: "p/di",
    version: 1,
};

/// Platform attributes observable from a headless process.
#[derive(Debug, Serialize)]
struct DeviceInfo {
    os: &'static str,
    arch: &'static str,
    family: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cpus: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    locale: Option<String>,
    utc_offset_minutes: i32,
    install_id: String,
}

/// Gathers device attributes (`p/di`).
pub struct DeviceInfoCollector;

impl DeviceInfoCollector {
    pub fn new() -> Self {
        Self
    }

    fn gather(identity: &ClientIdentity) -> DeviceInfo {
        DeviceInfo {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            family: std::env::consts::FAMILY,
            hostname: hostname(),
            cpus: std::thread::available_parallelism().ok().map(|n| n.get()),
            locale: locale(),
            utc_offset_minutes: Local::now().offset().local_minus_utc() / 60,
            install_id: identity.install_id.clone(),
        }
    }
}

impl Default for DeviceInfoCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for DeviceInfoCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        DESCRIPTOR
    }

    async fn collect(&self, identity: &ClientIdentity) -> Result<String, CollectorError> {
        let info = Self::gather(identity);
        serde_json::to_string(&info).map_err(|e| CollectorError::Serialization(e.to_string()))
    }
}

fn hostname() -> Option<String> {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
}

fn locale() -> Option<String> {
    std::env::var("LC_ALL")
        .or_else(|_| std::env::var("LANG"))
        .ok()
        .filter(|l| !l.is_empty())
}
