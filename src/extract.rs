//! Conversion of attachments into markdown for backends without file support.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Attachment, Error};

/// Turns an encoded document into structured text.
#[async_trait::async_trait]
pub trait DocumentExtractor: Send + Sync + 'static {
    /// Convert `attachment` into markdown.
    async fn extract_markdown(&self, attachment: &Attachment) -> Result<String, Error>;
}

/// Client for a docling-serve style conversion service.
pub struct HttpExtractor {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ConvertRequest<'a> {
    options: ConvertOptions,
    sources: Vec<ConvertSource<'a>>,
}

#[derive(Debug, Serialize)]
struct ConvertOptions {
    to_formats: Vec<&'static str>,
    do_ocr: bool,
    do_table_structure: bool,
}

#[derive(Debug, Serialize)]
struct ConvertSource<'a> {
    kind: &'static str,
    base64_string: &'a str,
    filename: &'a str,
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    document: ConvertedDocument,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ConvertedDocument {
    md_content: Option<String>,
}

impl HttpExtractor {
    /// OCR on large PDFs is slow, so the timeout is generous.
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        Self::with_timeout(base_url, Duration::from_secs(300))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl DocumentExtractor for HttpExtractor {
    async fn extract_markdown(&self, attachment: &Attachment) -> Result<String, Error> {
        let request = ConvertRequest {
            options: ConvertOptions {
                to_formats: vec!["md"],
                do_ocr: true,
                do_table_structure: true,
            },
            sources: vec![ConvertSource {
                kind: "file",
                base64_string: attachment.data(),
                filename: attachment.filename(),
            }],
        };

        debug!(filename = attachment.filename(), "Extracting document text");

        let response = self
            .client
            .post(format!("{}/v1/convert/source", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            return Err(Error::extraction(format!(
                "conversion of '{}' failed ({status}): {body}",
                attachment.filename()
            )));
        }

        let converted: ConvertResponse = response.json().await?;
        if matches!(converted.status.as_deref(), Some("failure")) {
            return Err(Error::extraction(format!(
                "conversion of '{}' failed: {:?}",
                attachment.filename(),
                converted.errors
            )));
        }

        converted.document.md_content.ok_or_else(|| {
            Error::extraction(format!(
                "no markdown returned for '{}'",
                attachment.filename()
            ))
        })
    }
}
