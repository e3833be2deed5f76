use async_trait::async_trait;
use chrono::Local;
use serde::Serialize;

use crate::collector::{Collector, CollectorDescriptor, CollectorError};
use crate::identity::ClientIdentity;

const DESCRIPTOR: CollectorDescriptor = CollectorDescriptor {
    pid: "p/li",
    version: 1,
};

/// Coarse location hints. A headless client has no positioning sensor, so
/// coordinates are zeroed with `fix: false` and the timezone carries the
/// signal.
#[derive(Debug, Serialize)]
struct LocationHints {
    fix: bool,
    latitude: f64,
    longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    timezone: Option<String>,
    utc_offset_minutes: i32,
}

/// Gathers location hints (`p/li`).
pub struct LocationCollector;

impl LocationCollector {
    pub fn new() -> Self {
        Self
    }

    fn gather() -> LocationHints {
        LocationHints {
            fix: false,
            latitude: 0.0,
            longitude: 0.0,
            timezone: timezone_name(),
            utc_offset_minutes: Local::now().offset().local_minus_utc() / 60,
        }
    }
}

impl Default for LocationCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for LocationCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        DESCRIPTOR
    }

    async fn collect(&self, _identity: &ClientIdentity) -> Result<String, CollectorError> {
        let hints = Self::gather();
        serde_json::to_string(&hints).map_err(|e| CollectorError::Serialization(e.to_string()))
    }
}

fn timezone_name() -> Option<String> {
    if let Ok(tz) = std::env::var("TZ") {
        if !tz.is_empty() {
            return Some(tz);
        }
    }
    // /etc/localtime is conventionally a symlink into the zoneinfo database.
    std::fs::read_link("/etc/localtime")
        .ok()
        .and_then(|target| {
            let target = target.to_string_lossy().into_owned();
            target
                .split("zoneinfo/")
                .nth(1)
                .map(|name| name.to_string())
        })
}
