//! HTTP collaborators of the dashboard and login flow.
//!
//! [`CloudApi`] is the seam the controllers talk to; [`HttpCloudClient`]
//! implements it against the storage web service, keeping the login
//! session in a cookie store for the lifetime of the process.

pub mod upload;

use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::drive::schema::{ApiReply, FileListResponse, LoginRequest, VerifyOtpRequest};
use crate::drive::FileRecord;
use crate::error::{CloudError, CloudResult};

pub use upload::{spawn_upload, UploadEvent, UploadFile, UploadStream};

/// Shown when the server no longer recognizes the session.
pub const SESSION_EXPIRED: &str = "Session expired. Please login again.";

/// Backend operations used by the client.
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Fetch the current file listing.
    async fn list_files(&self) -> CloudResult<Vec<FileRecord>>;

    /// Upload one file, sending whole-number percentages to `progress` as
    /// bytes go out. Returns the server's message on success.
    async fn upload(
        &self,
        file: UploadFile,
        progress: mpsc::UnboundedSender<u8>,
    ) -> CloudResult<Option<String>>;

    async fn delete(&self, name: &str) -> CloudResult<()>;

    /// Fetch a file's bytes.
    async fn download(&self, name: &str) -> CloudResult<Vec<u8>>;

    async fn login(&self, username: &str, password: &str) -> CloudResult<()>;

    async fn verify_otp(&self, otp: &str) -> CloudResult<()>;

    async fn resend_otp(&self) -> CloudResult<()>;

    async fn logout(&self) -> CloudResult<()>;
}

/// reqwest-backed client for the storage web service.
#[derive(Clone)]
pub struct HttpCloudClient {
    http: Client,
    base_url: String,
}

impl HttpCloudClient {
    pub fn new(config: &Config) -> CloudResult<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(concat!("cloud-drive/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CloudError::network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/<route>/<percent-encoded name>`
    fn file_url(&self, route: &str, name: &str) -> String {
        format!("{}/{}/{}", self.base_url, route, urlencoding::encode(name))
    }

    async fn send(&self, request: RequestBuilder) -> CloudResult<Response> {
        check_session(request.send().await?)
    }
}

/// Protected routes answer a missing session with a redirect to the login
/// page. Redirects are never followed, so that answer becomes an
/// unauthorized error instead of an HTML body.
fn check_session(response: Response) -> CloudResult<Response> {
    let status = response.status();
    if !status.is_redirection() {
        return Ok(response);
    }

    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if is_login_location(location) {
        debug!(%status, location, "Redirected to login");
        Err(CloudError::application(None, SESSION_EXPIRED).with_status(StatusCode::UNAUTHORIZED))
    } else {
        Err(CloudError::network(format!("unexpected redirect ({status}) to '{location}'")))
    }
}

fn is_login_location(location: &str) -> bool {
    let path = location.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/').ends_with("/login")
}

/// Decode a JSON reply and turn `success: false` or an error status into
/// an application error carrying the server's reason.
async fn expect_reply(response: Response, fallback: &'static str) -> CloudResult<ApiReply> {
    let status = response.status();
    let reply: ApiReply = decode(response).await?;

    if status.is_success() && reply.success {
        Ok(reply)
    } else {
        debug!(%status, error = ?reply.error, "Request rejected");
        Err(CloudError::application(reply.error, fallback).with_status(status))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> CloudResult<T> {
    let status = response.status();
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| {
        if status.is_success() {
            CloudError::network(format!("unexpected response: {e}"))
        } else if status == StatusCode::UNAUTHORIZED {
            CloudError::application(None, SESSION_EXPIRED).with_status(status)
        } else {
            CloudError::network(format!("server returned {status}"))
        }
    })
}

#[async_trait]
impl CloudApi for HttpCloudClient {
    async fn list_files(&self) -> CloudResult<Vec<FileRecord>> {
        debug!("Listing files");
        let response = self.send(self.http.get(self.url("/get-files"))).await?;
        let status = response.status();
        let listing: FileListResponse = decode(response).await?;

        match listing.files {
            Some(files) if listing.success && status.is_success() => {
                debug!(count = files.len(), "Listed files");
                Ok(files)
            }
            _ => Err(CloudError::application(listing.error, "Error loading files").with_status(status)),
        }
    }

    async fn upload(
        &self,
        file: UploadFile,
        progress: mpsc::UnboundedSender<u8>,
    ) -> CloudResult<Option<String>> {
        let name = file.name.clone();
        let size = file.size();
        let part = upload::progress_part(file, progress.clone()).await?;
        let form = reqwest::multipart::Form::new().part("file", part);

        debug!(file = %name, size, "Uploading");
        let response = self
            .http
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!(file = %name, error = %e, "Upload transport failed");
                CloudError::from(e)
            })
            .and_then(check_session)?;

        let reply = expect_reply(response, "Upload failed").await?;
        let _ = progress.send(100);
        info!(file = %name, size, "Upload complete");
        Ok(reply.message)
    }

    async fn delete(&self, name: &str) -> CloudResult<()> {
        debug!(file = %name, "Deleting");
        let response = self.send(self.http.post(self.file_url("delete", name))).await?;
        expect_reply(response, "Delete failed").await?;
        info!(file = %name, "Deleted");
        Ok(())
    }

    async fn download(&self, name: &str) -> CloudResult<Vec<u8>> {
        debug!(file = %name, "Downloading");
        let response = self.send(self.http.get(self.file_url("download", name))).await?;
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await?;
            info!(file = %name, size = bytes.len(), "Downloaded");
            return Ok(bytes.to_vec());
        }

        let reply: ApiReply = decode(response).await.unwrap_or_default();
        let err = CloudError::application(reply.error, "Download failed").with_status(status);
        if status == StatusCode::NOT_FOUND {
            warn!(file = %name, "File not found on server");
        }
        Err(err)
    }

    async fn login(&self, username: &str, password: &str) -> CloudResult<()> {
        debug!(%username, "Logging in");
        let response = self
            .http
            .post(self.url("/login"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        expect_reply(response, "Login failed").await?;
        Ok(())
    }

    async fn verify_otp(&self, otp: &str) -> CloudResult<()> {
        let response = self
            .send(self.http.post(self.url("/verify-otp")).json(&VerifyOtpRequest { otp }))
            .await?;
        expect_reply(response, "Invalid OTP").await?;
        Ok(())
    }

    async fn resend_otp(&self) -> CloudResult<()> {
        let response = self
            .send(
                self.http
                    .post(self.url("/resend-otp"))
                    .header(reqwest::header::CONTENT_TYPE, "application/json"),
            )
            .await?;
        expect_reply(response, "Failed to resend OTP").await?;
        Ok(())
    }

    /// The server answers with a redirect to the login page, which is the
    /// expected outcome and not checked.
    async fn logout(&self) -> CloudResult<()> {
        self.http.get(self.url("/logout")).send().await?;
        Ok(())
    }
}
