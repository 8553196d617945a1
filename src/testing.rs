//! In-memory stand-ins for the backend and the terminal, shared by unit
//! tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::client::{CloudApi, UploadFile};
use crate::drive::{FileRecord, StorageUsage};
use crate::error::{CloudError, CloudResult};
use crate::render::{DashboardView, EmptyState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListFiles,
    Upload(String, u64),
    Delete(String),
    Download(String),
    Login(String),
    VerifyOtp(String),
    ResendOtp,
    Logout,
}

/// Scriptable backend. Succeeds unless told otherwise; uploads add the
/// file to the listing and deletes remove it, like the real server.
#[derive(Default)]
pub struct MockApi {
    calls: Mutex<Vec<Call>>,
    files: Mutex<Vec<FileRecord>>,
    list_failures: Mutex<VecDeque<CloudError>>,
    upload_failures: Mutex<VecDeque<CloudError>>,
    delete_failures: Mutex<VecDeque<CloudError>>,
    verify_failures: Mutex<VecDeque<CloudError>>,
    resend_failures: Mutex<VecDeque<CloudError>>,
    login_failure: Mutex<Option<CloudError>>,
}

impl MockApi {
    pub fn with_files(files: Vec<FileRecord>) -> Self {
        let api = Self::default();
        *api.files.lock() = files;
        api
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn fail_list_once(&self, err: CloudError) {
        self.list_failures.lock().push_back(err);
    }

    pub fn fail_upload_once(&self, err: CloudError) {
        self.upload_failures.lock().push_back(err);
    }

    pub fn fail_delete_once(&self, err: CloudError) {
        self.delete_failures.lock().push_back(err);
    }

    pub fn fail_verify_once(&self, err: CloudError) {
        self.verify_failures.lock().push_back(err);
    }

    pub fn fail_resend_once(&self, err: CloudError) {
        self.resend_failures.lock().push_back(err);
    }

    pub fn fail_login(&self, err: CloudError) {
        *self.login_failure.lock() = Some(err);
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn take(queue: &Mutex<VecDeque<CloudError>>) -> CloudResult<()> {
        match queue.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CloudApi for MockApi {
    async fn list_files(&self) -> CloudResult<Vec<FileRecord>> {
        self.record(Call::ListFiles);
        Self::take(&self.list_failures)?;
        Ok(self.files.lock().clone())
    }

    async fn upload(
        &self,
        file: UploadFile,
        progress: mpsc::UnboundedSender<u8>,
    ) -> CloudResult<Option<String>> {
        self.record(Call::Upload(file.name.clone(), file.size()));
        for pct in [0, 25, 25, 50, 75] {
            let _ = progress.send(pct);
        }
        Self::take(&self.upload_failures)?;
        let _ = progress.send(100);
        self.files.lock().push(FileRecord::new(&file.name, file.size()));
        Ok(Some(format!("{} uploaded", file.name)))
    }

    async fn delete(&self, name: &str) -> CloudResult<()> {
        self.record(Call::Delete(name.to_string()));
        Self::take(&self.delete_failures)?;
        self.files.lock().retain(|f| f.name != name);
        Ok(())
    }

    async fn download(&self, name: &str) -> CloudResult<Vec<u8>> {
        self.record(Call::Download(name.to_string()));
        let size = self
            .files
            .lock()
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.size)
            .ok_or_else(|| CloudError::application(Some("File not found".into()), "Download failed"))?;
        Ok(vec![b'x'; size as usize])
    }

    async fn login(&self, username: &str, _password: &str) -> CloudResult<()> {
        self.record(Call::Login(username.to_string()));
        match self.login_failure.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn verify_otp(&self, otp: &str) -> CloudResult<()> {
        self.record(Call::VerifyOtp(otp.to_string()));
        Self::take(&self.verify_failures)
    }

    async fn resend_otp(&self) -> CloudResult<()> {
        self.record(Call::ResendOtp);
        Self::take(&self.resend_failures)
    }

    async fn logout(&self) -> CloudResult<()> {
        self.record(Call::Logout);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Files(Vec<String>),
    Empty(EmptyState),
    Usage(u64),
    Alert(String),
    Notice(String),
    UploadStarted(String),
    Progress(u8),
    UploadFinished,
}

/// Records everything the controller asks to show.
#[derive(Default)]
pub struct RecordingView {
    pub frames: Vec<Frame>,
}

impl RecordingView {
    pub fn alerts(&self) -> Vec<&str> {
        self.frames
            .iter()
            .filter_map(|f| match f {
                Frame::Alert(msg) => Some(msg.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<u8> {
        self.frames
            .iter()
            .filter_map(|f| match f {
                Frame::Progress(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn last_files(&self) -> Option<&Frame> {
        self.frames
            .iter()
            .rev()
            .find(|f| matches!(f, Frame::Files(_) | Frame::Empty(_)))
    }
}

impl DashboardView for RecordingView {
    fn show_files(&mut self, files: &[&FileRecord]) {
        self.frames
            .push(Frame::Files(files.iter().map(|f| f.name.clone()).collect()));
    }

    fn show_empty(&mut self, state: EmptyState) {
        self.frames.push(Frame::Empty(state));
    }

    fn show_usage(&mut self, usage: &StorageUsage, _quota: u64) {
        self.frames.push(Frame::Usage(usage.used_bytes));
    }

    fn show_alert(&mut self, message: &str) {
        self.frames.push(Frame::Alert(message.to_string()));
    }

    fn show_notice(&mut self, message: &str) {
        self.frames.push(Frame::Notice(message.to_string()));
    }

    fn upload_started(&mut self, name: &str) {
        self.frames.push(Frame::UploadStarted(name.to_string()));
    }

    fn upload_progress(&mut self, percent: u8) {
        self.frames.push(Frame::Progress(percent));
    }

    fn upload_finished(&mut self) {
        self.frames.push(Frame::UploadFinished);
    }
}
