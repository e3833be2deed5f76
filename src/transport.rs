use url::Url;

use crate::identity::ClientIdentity;

const CONTENT_TYPE_TEXT: &str = "text/plain;charset=UTF-8";

/// How a single submission attempt can end. There are no retries: one
/// attempt maps directly to one of these outcomes or the raw response text.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid submission URL")]
    InvalidUrl,
    #[error("network failure: {0}")]
    Network(#[source] reqwest::Error),
    #[error("server error {0}")]
    Server(u16),
    #[error("response body was not valid text")]
    InvalidResponseData,
}

/// Posts the encoded bundle to the scoring endpoint.
pub struct BundleTransport {
    http: reqwest::Client,
    ingest_url: String,
}

impl BundleTransport {
    pub fn new(http: reqwest::Client, ingest_url: String) -> Self {
        Self { http, ingest_url }
    }

    /// Submit the serialized bundle. Returns the raw response text on any
    /// 2xx status; everything else is classified into a `TransportError`.
    pub async fn post_bundle(
        &self,
        identity: &ClientIdentity,
        body: &str,
    ) -> Result<String, TransportError> {
        let mut url =
            Url::parse(&self.ingest_url).map_err(|_| TransportError::InvalidUrl)?;
        identity.append_query_params(&mut url);

        log::debug!("posting bundle to {url}");

        let response = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE_TEXT)
            .body(body.to_string())
            .send()
            .await
            .map_err(TransportError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Server(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|_| TransportError::InvalidResponseData)
    }
}
