use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;

use photon_domain::{ContentSourcePort, DomainError};

/// Resolves `http(s)://` references with a GET and treats everything else as base64,
/// optionally wrapped in a `data:<mime>;base64,` URL.
pub struct HttpContentSource {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpContentSource {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DomainError::internal_error(&format!("http client: {err}")))?;
        Ok(Self { client, max_bytes })
    }

    fn too_large(&self) -> DomainError {
        DomainError::InvalidInput(format!("remote content exceeds {} bytes", self.max_bytes))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, DomainError> {
        tracing::debug!(url, "downloading remote content");
        let http_error =
            |err: reqwest::Error| DomainError::external_service_error("http", &err.to_string());
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(http_error)?;
        if response
            .content_length()
            .is_some_and(|length| length > self.max_bytes as u64)
        {
            return Err(self.too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(http_error)? {
            if body.len() + chunk.len() > self.max_bytes {
                tracing::warn!(url, max_bytes = self.max_bytes, "remote content over the limit");
                return Err(self.too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl ContentSourcePort for HttpContentSource {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, DomainError> {
        let trimmed = reference.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return self.download(trimmed).await;
        }
        let decoded = decode_base64_payload(trimmed)?;
        if decoded.len() > self.max_bytes {
            return Err(DomainError::InvalidInput(format!(
                "inline content exceeds {} bytes",
                self.max_bytes
            )));
        }
        Ok(decoded)
    }
}

pub fn decode_base64_payload(data: &str) -> Result<Vec<u8>, DomainError> {
    let payload = if data.starts_with("data:") {
        data.split_once(',').map(|(_, b64)| b64).unwrap_or(data)
    } else {
        data
    };
    let normalized: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if normalized.is_empty() {
        return Err(DomainError::invalid_input("empty payload"));
    }
    base64::engine::general_purpose::STANDARD
        .decode(normalized.as_bytes())
        .map_err(|err| DomainError::InvalidInput(format!("base64 decode error: {err}")))
}
