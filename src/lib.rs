pub mod assessment;
pub mod bundle;
pub mod client;
pub mod collector;
pub mod config;
pub mod decrypt;
pub mod identity;
pub mod transport;

// Re-export the types a caller needs to run an assessment end to end
pub use assessment::{AssessmentResponse, DecryptedAssessment};
pub use client::SightlineClient;
pub use collector::{Collector, CollectorDescriptor, CollectorError, CollectorRegistry};
pub use config::SightlineConfig;
pub use decrypt::DecryptError;
pub use identity::ClientIdentity;
pub use transport::TransportError;
