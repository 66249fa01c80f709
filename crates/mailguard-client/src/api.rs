//! REST client for the MailGuard HTTP API.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use mailguard_core::{EmailId, EmailPage, EmailQuery, EmailRecord, OutgoingEmail, Stats};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::{Error, Result};

/// Acknowledgement returned by `POST /api/send-email`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendReceipt {
    /// Whether the server reported success.
    #[serde(default)]
    pub success: bool,
    /// Server message, e.g. "Email sent successfully".
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    /// Creates a client for `config.api_url` with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("mailguard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base: config.api_url.clone(),
        })
    }

    /// API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolves an API path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error when the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    /// Fetches one page of records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`] for a non-success status,
    /// [`Error::InvalidContentType`] for a non-JSON response and
    /// [`Error::Decode`] for a malformed body.
    pub async fn list_emails(&self, query: &EmailQuery) -> Result<EmailPage> {
        let url = self.endpoint("api/emails")?;
        debug!(%url, page = query.page, view = query.view.as_str(), "Fetching emails");
        let response = self.http.get(url).query(&query.to_pairs()).send().await?;
        let page: EmailPage = read_json(response).await?;
        info!(
            count = page.emails.len(),
            page = page.current_page(),
            pages = page.page_count(),
            "Fetched emails"
        );
        Ok(page)
    }

    /// Fetches one record.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::list_emails`].
    pub async fn get_email(&self, id: EmailId) -> Result<EmailRecord> {
        let url = self.endpoint(&format!("api/emails/{id}"))?;
        let response = self.http.get(url).send().await?;
        read_json(response).await
    }

    /// Fetches aggregate statistics.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::list_emails`].
    pub async fn stats(&self) -> Result<Stats> {
        let url = self.endpoint("api/stats")?;
        let response = self.http.get(url).send().await?;
        read_json(response).await
    }

    /// Sends an email through the proxy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the email fails validation (no
    /// request is made), and [`Error::Server`] with the server's message on failure.
    pub async fn send_email(&self, email: &OutgoingEmail) -> Result<SendReceipt> {
        email.validate().map_err(|e| match e {
            mailguard_core::Error::Validation(message) => Error::Validation(message),
            other => Error::Core(other),
        })?;

        let mut form = Form::new()
            .text("from", email.from.clone())
            .text("to", email.to_field())
            .text("subject", email.subject.clone())
            .text("body", email.body.clone());
        for (index, attachment) in email.attachments.iter().enumerate() {
            let part = Part::bytes(attachment.content.clone())
                .file_name(attachment.filename.clone())
                .mime_str("application/octet-stream")?;
            form = form.part(format!("attachment_{index}"), part);
        }

        let url = self.endpoint("api/send-email")?;
        info!(
            to = %email.to_field(),
            attachments = email.attachments.len(),
            "Sending email"
        );
        let response = self.http.post(url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, "Send rejected");
            return Err(server_error(&body).unwrap_or_else(|| {
                Error::Server("Failed to send email".to_string())
            }));
        }
        read_json(response).await
    }

    /// URL of an attachment download.
    ///
    /// # Errors
    ///
    /// Returns an error when the joined URL is invalid.
    pub fn attachment_url(&self, id: i64) -> Result<Url> {
        self.endpoint(&format!("api/attachments/{id}/download"))
    }

    /// Downloads an attachment into memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Server`] when the server explains the failure, and
    /// [`Error::Status`] otherwise.
    pub async fn download_attachment(&self, id: i64) -> Result<Bytes> {
        let url = self.attachment_url(id)?;
        debug!(%url, "Downloading attachment");
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(server_error(&body).unwrap_or(Error::Status { status, body }));
        }
        Ok(response.bytes().await?)
    }

    /// Downloads an attachment to `dir/filename`, creating `dir` if needed.
    /// Only the final component of `filename` is used.
    ///
    /// # Errors
    ///
    /// Returns download errors as for [`ApiClient::download_attachment`],
    /// and I/O errors while writing.
    pub async fn download_attachment_to(
        &self,
        id: i64,
        dir: &Path,
        filename: &str,
    ) -> Result<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .map_or_else(|| format!("attachment-{id}"), |n| n.to_string_lossy().into_owned());
        let bytes = self.download_attachment(id).await?;

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(name);
        tokio::fs::write(&path, &bytes).await?;
        info!(path = %path.display(), size = bytes.len(), "Saved attachment");
        Ok(path)
    }
}

/// Checks status and content type, then decodes the JSON body.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "Request failed");
        return Err(Error::Status {
            status: status.as_u16(),
            body,
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.contains("application/json") {
        let content_type = if content_type.is_empty() {
            "no content type".to_string()
        } else {
            content_type
        };
        return Err(Error::InvalidContentType(content_type));
    }

    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// `{ "error": ... }` bodies become [`Error::Server`].
fn server_error(body: &str) -> Option<Error> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| Error::Server(b.error))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        let config = ClientConfig::builder().api_url(base).build().unwrap();
        ApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_joins_under_base_path() {
        let api = client("http://localhost:5001/proxy");
        assert_eq!(
            api.endpoint("/api/stats").unwrap().as_str(),
            "http://localhost:5001/proxy/api/stats"
        );
        assert_eq!(
            api.attachment_url(7).unwrap().as_str(),
            "http://localhost:5001/proxy/api/attachments/7/download"
        );
    }

    #[test]
    fn test_server_error_body() {
        let err = server_error(r#"{"error": "Attachment file not found"}"#).unwrap();
        assert_eq!(err.to_string(), "Attachment file not found");
        assert!(server_error("<html>").is_none());
    }

    #[tokio::test]
    async fn test_send_validates_before_request() {
        // Nothing listens on port 9; validation must fail first.
        let api = client("http://127.0.0.1:9");
        let email = OutgoingEmail::new("a@x.com", "Hi", "Body");
        let err = api.send_email(&email).await.unwrap_err();
        assert_eq!(err.to_string(), "Please enter a recipient email address");
    }
}
