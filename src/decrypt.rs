use url::Url;

use crate::assessment::DecryptedAssessment;

const CONTENT_TYPE_TEXT: &str = "text/plain;charset=UTF-8";
const SECRET_HEADER: &str = "TOKEN";

#[derive(Debug, thiserror::Error)]
pub enum DecryptError {
    #[error("no decryption secret configured")]
    MissingSecret,
    #[error("invalid decryption URL")]
    InvalidUrl,
    #[error("network failure: {0}")]
    Network(#[source] reqwest::Error),
    #[error("decryption endpoint returned {0}")]
    Http(String),
    #[error("response body was not valid text")]
    InvalidResponseData,
    #[error("error decoding decrypted assessment: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Exchanges an opaque verdict for the fully-typed assessment.
///
/// Independent of the submission pipeline: it shares only the immutable
/// client configuration, so callers may run it concurrently with `assess()`.
pub struct DecryptClient {
    http: reqwest::Client,
    decrypt_url: String,
    secret: Option<String>,
}

impl DecryptClient {
    pub fn new(http: reqwest::Client, decrypt_url: String, secret: Option<String>) -> Self {
        Self {
            http,
            decrypt_url,
            secret,
        }
    }

    /// Decrypt a previously obtained opaque verdict.
    ///
    /// Fails fast with `MissingSecret`, before any network activity, when
    /// no decryption secret is configured. Never returns a partially
    /// populated assessment: the result is the full decoded structure or an
    /// error.
    pub async fn decrypt_assessment(
        &self,
        opaque_verdict: &str,
    ) -> Result<DecryptedAssessment, DecryptError> {
        let secret = self.secret.as_deref().ok_or(DecryptError::MissingSecret)?;
        let url = Url::parse(&self.decrypt_url).map_err(|_| DecryptError::InvalidUrl)?;

        log::debug!("decrypting assessment via {url}");

        let response = self
            .http
            .post(url)
            .header(SECRET_HEADER, secret)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE_TEXT)
            .body(opaque_verdict.to_string())
            .send()
            .await
            .map_err(DecryptError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DecryptError::Http(status.to_string()));
        }

        let text = response
            .text()
            .await
            .map_err(|_| DecryptError::InvalidResponseData)?;

        Ok(serde_json::from_str(&text)?)
    }
}
