//! Multipart upload to the tokenized endpoint.
//!
//! The endpoint is an opaque collaborator. Two success shapes are recognized:
//! a binary `image/*` body (a processed image the user can save locally) and
//! an informational JSON body such as `{"status": "success"}`. Failures are
//! JSON with a `detail` string.

use log::{debug, info};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Non-success HTTP status; carries the server-supplied detail when
    /// present, a generic message otherwise.
    #[error("{detail}")]
    Rejected { status: StatusCode, detail: String },
    #[error("upload failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The server returned a processed image; offer it as a local save.
    ProcessedImage(Vec<u8>),
    /// The server acknowledged the upload with an informational note.
    Accepted(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: Option<String>,
    message: Option<String>,
}

/// Blocking HTTP client for the upload endpoint. Runs on a worker thread;
/// no timeout is applied, failure is detected only via the response.
#[derive(Clone, Debug)]
pub struct UploadClient {
    endpoint: Url,
    token: String,
    http: reqwest::blocking::Client,
}

impl UploadClient {
    pub fn new(endpoint: Url, token: String) -> Self {
        Self {
            endpoint,
            token,
            http: reqwest::blocking::Client::new(),
        }
    }

    /// POSTs one multipart field `file`, with the token passed through
    /// unchanged as a query parameter.
    pub fn send(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadOutcome, UploadError> {
        info!(
            "uploading {file_name} ({} bytes) to {}",
            bytes.len(),
            self.endpoint
        );

        let part = Part::bytes(bytes)
            .file_name(file_name.to_owned())
            .mime_str(mime)?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(self.endpoint.clone())
            .query(&[("token", self.token.as_str())])
            .multipart(form)
            .send()?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes()?.to_vec();
        debug!("endpoint answered {status} with {} bytes", body.len());

        if !status.is_success() {
            return Err(UploadError::Rejected {
                status,
                detail: rejection_detail(&body),
            });
        }
        Ok(interpret_success(content_type.as_deref(), body))
    }
}

/// Reads the server-supplied `detail` string, falling back to generic text.
pub fn rejection_detail(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.detail)
        .unwrap_or_else(|| "upload failed".to_owned())
}

/// Classifies a success response into one of the two recognized shapes.
pub fn interpret_success(content_type: Option<&str>, body: Vec<u8>) -> UploadOutcome {
    if content_type.is_some_and(|ct| ct.starts_with("image/")) {
        return UploadOutcome::ProcessedImage(body);
    }
    let note = serde_json::from_slice::<StatusBody>(&body)
        .ok()
        .and_then(|parsed| parsed.status.or(parsed.message))
        .unwrap_or_else(|| "success".to_owned());
    UploadOutcome::Accepted(note)
}
