use serde::{Deserialize, Serialize};

use super::category::{classify, Category};

/// A file stored on the server, as the client knows it.
///
/// `name` is unique within a listing and is the key used for download and
/// delete requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    pub size: u64,
}

impl FileRecord {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self { name: name.into(), size }
    }

    /// Category derived from the name's extension. Never stored.
    pub fn category(&self) -> Category {
        classify(&self.name)
    }
}

/// `GET /get-files` response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileListResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub files: Option<Vec<FileRecord>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Reply shape shared by login, OTP, upload and delete endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Credentials posted to `/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Body posted to `/verify-otp`.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyOtpRequest<'a> {
    pub otp: &'a str,
}
