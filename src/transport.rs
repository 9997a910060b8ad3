use async_trait::async_trait;
use reqwest::{multipart, Client};
use std::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

use crate::errors::{AppError, AppResult};
use crate::security::InputValidator;

/// Progress callback invoked by a transport while an item is in flight.
/// Fractions are in 0.0..=1.0.
pub type ProgressFn = dyn Fn(f32) + Send + Sync;

/// Performs the actual network upload of one item's bytes into the session
/// container. Returns the remote document id on success.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn upload(
        &self,
        session_id: &str,
        container: &str,
        file_name: &str,
        bytes: Vec<u8>,
        on_progress: &ProgressFn,
    ) -> AppResult<String>;
}

/// HTTP transport posting multipart payloads to a repository endpoint
pub struct HttpTransport {
    client: Client,
    endpoint_url: String,
    last_request: Mutex<Option<Instant>>,
    min_request_spacing: Duration,
}

impl HttpTransport {
    pub fn new(endpoint_url: &str, timeout_secs: u64, min_spacing_ms: u64) -> AppResult<Self> {
        InputValidator::validate_endpoint_url(endpoint_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(AppError::Network)?;

        Ok(Self {
            client,
            endpoint_url: endpoint_url.trim().to_string(),
            last_request: Mutex::new(None),
            min_request_spacing: Duration::from_millis(min_spacing_ms),
        })
    }

    async fn wait_for_rate_limit(&self) {
        let wait_time = {
            match self.last_request.lock() {
                Ok(last) => last.and_then(|instant| {
                    let elapsed = instant.elapsed();
                    if elapsed < self.min_request_spacing {
                        Some(self.min_request_spacing - elapsed)
                    } else {
                        None
                    }
                }),
                Err(e) => {
                    log::warn!("Failed to acquire rate limiter lock (non-critical): {}", e);
                    None
                }
            }
        }; // MutexGuard is dropped here

        if let Some(wait_time) = wait_time {
            sleep(wait_time).await;
        }
    }

    fn record_request(&self) {
        match self.last_request.lock() {
            Ok(mut last) => *last = Some(Instant::now()),
            Err(e) => log::warn!("Failed to update rate limiter (non-critical): {}", e),
        }
    }

    fn mime_type_for(file_name: &str) -> &'static str {
        match file_name.rsplit('.').next().map(|e| e.to_lowercase()).as_deref() {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("webp") => "image/webp",
            Some("gif") => "image/gif",
            Some("bmp") => "image/bmp",
            _ => "application/octet-stream",
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn upload(
        &self,
        session_id: &str,
        container: &str,
        file_name: &str,
        bytes: Vec<u8>,
        on_progress: &ProgressFn,
    ) -> AppResult<String> {
        self.wait_for_rate_limit().await;

        let total_bytes = bytes.len();
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(Self::mime_type_for(file_name))
            .map_err(AppError::Network)?;

        let form = multipart::Form::new()
            .text("container", container.to_string())
            .text("session_id", session_id.to_string())
            .part("filedata", part);

        on_progress(0.0);

        log::info!(
            "Uploading {} ({:.2} MB) to container '{}'",
            file_name,
            total_bytes as f64 / 1024.0 / 1024.0,
            container
        );

        let response = self
            .client
            .post(&self.endpoint_url)
            .multipart(form)
            .send()
            .await?;

        self.record_request();

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::transport_failure(
                file_name,
                &format!("server returned {}: {}", status, error_text),
            ));
        }

        let response_text = response.text().await?;
        on_progress(1.0);

        Ok(extract_document_id(&response_text).unwrap_or_else(|| {
            log::warn!(
                "Could not extract document id from response for {}, generating one locally",
                file_name
            );
            uuid::Uuid::new_v4().to_string()
        }))
    }
}

/// Extract the created document id from the repository response body
fn extract_document_id(response_data: &str) -> Option<String> {
    if response_data.is_empty() {
        log::warn!("Empty response body from upload endpoint");
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(response_data) {
        Ok(json) => {
            if let Some(id) = json.get("id").and_then(|v| v.as_str()) {
                return Some(id.to_string());
            }

            // Alternative shape: {"entry": {"id": "..."}}
            if let Some(id) = json
                .get("entry")
                .and_then(|e| e.get("id"))
                .and_then(|v| v.as_str())
            {
                return Some(id.to_string());
            }

            log::debug!(
                "No document id found in upload response: {}",
                &response_data[..std::cmp::min(200, response_data.len())]
            );
            None
        }
        Err(e) => {
            log::warn!("Failed to parse upload response as JSON: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_document_id_from_flat_response() {
        let id = extract_document_id(r#"{"id": "doc-42", "name": "a.jpg"}"#);
        assert_eq!(id.as_deref(), Some("doc-42"));
    }

    #[test]
    fn extracts_document_id_from_entry_wrapper() {
        let id = extract_document_id(r#"{"entry": {"id": "node-7"}}"#);
        assert_eq!(id.as_deref(), Some("node-7"));
    }

    #[test]
    fn missing_id_yields_none() {
        assert_eq!(extract_document_id(""), None);
        assert_eq!(extract_document_id("not json"), None);
        assert_eq!(extract_document_id(r#"{"name": "a.jpg"}"#), None);
    }

    #[test]
    fn mime_types_follow_extension() {
        assert_eq!(HttpTransport::mime_type_for("a.png"), "image/png");
        assert_eq!(HttpTransport::mime_type_for("a.JPG"), "image/jpeg");
        assert_eq!(HttpTransport::mime_type_for("a"), "application/octet-stream");
    }

    #[test]
    fn rejects_invalid_endpoint() {
        assert!(HttpTransport::new("not a url", 30, 500).is_err());
    }
}
