//! Dashboard controller.
//!
//! Owns the [`ViewState`] and is the only thing that mutates it. Each
//! action calls the backend, updates state, and redraws through a
//! [`DashboardView`]. Failures are shown and returned, never fatal.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::client::{spawn_upload, CloudApi, UploadEvent, UploadFile, UploadStream};
use crate::config::Config;
use crate::drive::format::megabytes;
use crate::drive::{can_accept, CategoryFilter, DownloadDir, ViewState};
use crate::error::{CloudError, CloudResult, ValidationError};
use crate::render::{DashboardView, EmptyState};

pub struct Dashboard<V: DashboardView> {
    api: Arc<dyn CloudApi>,
    view: V,
    state: ViewState,
    quota: u64,
    downloads: DownloadDir,
    upload_settle_delay: Duration,
    uploading: Arc<AtomicBool>,
}

/// Holds the dashboard's single upload slot until dropped.
struct UploadSlot(Arc<AtomicBool>);

impl Drop for UploadSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// An admitted upload. Dropping it without
/// [`finish_upload`](Dashboard::finish_upload) frees the slot.
pub struct PendingUpload {
    name: String,
    stream: UploadStream,
    _slot: UploadSlot,
}

impl<V: DashboardView> Dashboard<V> {
    pub fn new(api: Arc<dyn CloudApi>, view: V, config: &Config) -> Self {
        Self {
            api,
            view,
            state: ViewState::new(),
            quota: config.quota_bytes,
            downloads: DownloadDir::new(&config.download_dir),
            upload_settle_delay: config.upload_settle_delay(),
            uploading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Re-fetch the listing and redraw. A failed fetch empties the list;
    /// the failure is logged but not shown as an alert.
    pub async fn refresh(&mut self) {
        match self.api.list_files().await {
            Ok(files) => {
                debug!(count = files.len(), "Listing refreshed");
                self.state.replace_files(files);
            }
            Err(err) => {
                warn!(error = %err, "Could not load files");
                self.state.clear_files();
            }
        }
        self.render_usage();
        self.render_files();
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        self.state.set_category(category);
        self.render_files();
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.state.set_search(query);
        self.render_files();
    }

    pub fn render_files(&mut self) {
        let visible = self.state.visible();
        if self.state.files().is_empty() {
            self.view.show_empty(EmptyState::NoFiles);
        } else if visible.is_empty() {
            self.view.show_empty(EmptyState::NoMatches);
        } else {
            self.view.show_files(&visible);
        }
    }

    pub fn render_usage(&mut self) {
        let usage = self.state.usage();
        self.view.show_usage(&usage, self.quota);
    }

    /// Admit an upload and start it. Rejected without a request when
    /// another upload is running or the file does not fit in the free
    /// space.
    pub fn begin_upload(&mut self, file: UploadFile) -> CloudResult<PendingUpload> {
        if self.uploading.load(Ordering::Acquire) {
            return Err(ValidationError::UploadInProgress.into());
        }

        let used = self.state.used_bytes();
        if !can_accept(file.size(), used, self.quota) {
            return Err(ValidationError::InsufficientStorage {
                file_mb: megabytes(file.size()),
                free_mb: megabytes(self.quota.saturating_sub(used)),
            }
            .into());
        }

        debug!(file = %file.name, size = file.size(), "Upload admitted");
        self.uploading.store(true, Ordering::Release);
        let slot = UploadSlot(self.uploading.clone());
        self.view.upload_started(&file.name);
        Ok(PendingUpload {
            name: file.name.clone(),
            stream: spawn_upload(self.api.clone(), file),
            _slot: slot,
        })
    }

    /// Drain an upload started by [`begin_upload`](Self::begin_upload),
    /// drawing progress, then refresh on success.
    pub async fn finish_upload(&mut self, pending: PendingUpload) -> CloudResult<()> {
        let PendingUpload {
            name,
            mut stream,
            _slot: slot,
        } = pending;

        let mut outcome = Err(CloudError::network("upload ended without a result"));
        while let Some(event) = stream.next().await {
            match event {
                UploadEvent::Progress(pct) => self.view.upload_progress(pct),
                UploadEvent::Completed(message) => outcome = Ok(message),
                UploadEvent::Failed(err) => outcome = Err(err),
            }
        }
        drop(slot);

        match outcome {
            Ok(message) => {
                tokio::time::sleep(self.upload_settle_delay).await;
                self.view.upload_finished();
                info!(file = %name, "Upload finished");
                self.view.show_notice(message.as_deref().unwrap_or("Upload complete"));
                self.refresh().await;
                Ok(())
            }
            Err(err) => {
                self.view.upload_finished();
                self.view.show_alert(&err.user_message());
                Err(err)
            }
        }
    }

    /// Check, send and track one upload to completion.
    pub async fn upload(&mut self, file: UploadFile) -> CloudResult<()> {
        let stream = self.begin_upload(file).inspect_err(|err| {
            self.view.show_alert(&err.user_message());
        })?;
        self.finish_upload(stream).await
    }

    pub async fn delete(&mut self, name: &str) -> CloudResult<()> {
        if !self.state.contains(name) {
            let err: CloudError = ValidationError::UnknownFile(name.to_string()).into();
            self.view.show_alert(&err.user_message());
            return Err(err);
        }

        match self.api.delete(name).await {
            Ok(()) => {
                self.refresh().await;
                Ok(())
            }
            Err(err) => {
                self.view.show_alert(&err.user_message());
                Err(err)
            }
        }
    }

    /// Fetch a file into the download directory.
    pub async fn download(&mut self, name: &str) -> CloudResult<PathBuf> {
        let result = match self.api.download(name).await {
            Ok(data) => self
                .downloads
                .store(name, &data)
                .await
                .map_err(|e| CloudError::storage(format!("{e:#}"))),
            Err(err) => Err(err),
        };

        match result {
            Ok(path) => {
                self.view.show_notice(&format!("Saved {}", path.display()));
                Ok(path)
            }
            Err(err) => {
                self.view.show_alert(&err.user_message());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::FileRecord;
    use crate::testing::{Call, Frame, MockApi, RecordingView};

    fn config(quota: u64, download_dir: &str) -> Config {
        Config {
            quota_bytes: quota,
            download_dir: download_dir.to_string(),
            upload_settle_delay_ms: 0,
            ..Config::default()
        }
    }

    fn dashboard(api: &Arc<MockApi>, quota: u64) -> Dashboard<RecordingView> {
        Dashboard::new(api.clone(), RecordingView::default(), &config(quota, "/nonexistent"))
    }

    fn sample() -> Vec<FileRecord> {
        vec![
            FileRecord::new("a.png", 100),
            FileRecord::new("b.pdf", 200),
            FileRecord::new("c.jpg", 300),
        ]
    }

    #[tokio::test]
    async fn refresh_replaces_list_and_renders() {
        let api = Arc::new(MockApi::with_files(sample()));
        let mut dash = dashboard(&api, 10_000);

        dash.refresh().await;

        assert_eq!(dash.state().used_bytes(), 600);
        assert_eq!(
            dash.view().frames,
            vec![
                Frame::Usage(600),
                Frame::Files(vec!["a.png".into(), "b.pdf".into(), "c.jpg".into()]),
            ]
        );
    }

    #[tokio::test]
    async fn failed_refresh_empties_list_without_alert() {
        let api = Arc::new(MockApi::with_files(sample()));
        let mut dash = dashboard(&api, 10_000);
        dash.refresh().await;

        api.fail_list_once(CloudError::network("connection refused"));
        dash.refresh().await;

        assert!(dash.state().files().is_empty());
        assert_eq!(dash.state().used_bytes(), 0);
        assert!(dash.view().alerts().is_empty());
        assert_eq!(dash.view().last_files(), Some(&Frame::Empty(EmptyState::NoFiles)));
    }

    #[tokio::test]
    async fn filters_redraw_with_distinct_empty_states() {
        let api = Arc::new(MockApi::with_files(sample()));
        let mut dash = dashboard(&api, 10_000);
        dash.refresh().await;

        dash.set_category(CategoryFilter::Images);
        assert_eq!(
            dash.view().last_files(),
            Some(&Frame::Files(vec!["a.png".into(), "c.jpg".into()]))
        );

        dash.set_search("zzz");
        assert_eq!(dash.view().last_files(), Some(&Frame::Empty(EmptyState::NoMatches)));

        dash.set_search("");
        dash.set_category(CategoryFilter::All);
        assert_eq!(
            dash.view().last_files(),
            Some(&Frame::Files(vec!["a.png".into(), "b.pdf".into(), "c.jpg".into()]))
        );
    }

    #[tokio::test]
    async fn upload_reports_progress_then_refreshes() {
        let api = Arc::new(MockApi::default());
        let mut dash = dashboard(&api, 10_000);
        dash.refresh().await;

        dash.upload(UploadFile::new("new.mp4", vec![0; 1000])).await.unwrap();

        assert_eq!(dash.view().progress(), vec![0, 25, 50, 75, 100]);
        assert_eq!(dash.state().used_bytes(), 1000);
        assert_eq!(dash.view().last_files(), Some(&Frame::Files(vec!["new.mp4".into()])));
        assert_eq!(api.count(|c| matches!(c, Call::ListFiles)), 2);
    }

    #[tokio::test]
    async fn upload_exactly_filling_quota_is_accepted() {
        let api = Arc::new(MockApi::with_files(vec![FileRecord::new("a.txt", 400)]));
        let mut dash = dashboard(&api, 1000);
        dash.refresh().await;

        dash.upload(UploadFile::new("b.txt", vec![0; 600])).await.unwrap();
        assert_eq!(dash.state().used_bytes(), 1000);
    }

    #[tokio::test]
    async fn upload_over_quota_is_rejected_without_request() {
        let api = Arc::new(MockApi::with_files(vec![FileRecord::new("a.txt", 400)]));
        let mut dash = dashboard(&api, 1000);
        dash.refresh().await;

        let err = dash
            .upload(UploadFile::new("b.txt", vec![0; 601]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CloudError::Validation(ValidationError::InsufficientStorage { .. })
        ));
        assert_eq!(api.count(|c| matches!(c, Call::Upload(..))), 0);
        assert!(dash.view().alerts()[0].starts_with("Not enough storage!"));
    }

    #[tokio::test]
    async fn second_upload_is_rejected_while_first_runs() {
        let api = Arc::new(MockApi::default());
        let mut dash = dashboard(&api, 10_000);

        let first = dash.begin_upload(UploadFile::new("one.txt", vec![1; 10])).unwrap();
        let err = dash
            .begin_upload(UploadFile::new("two.txt", vec![2; 10]))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            CloudError::Validation(ValidationError::UploadInProgress)
        ));

        dash.finish_upload(first).await.unwrap();
        let second = dash.begin_upload(UploadFile::new("two.txt", vec![2; 10])).unwrap();
        dash.finish_upload(second).await.unwrap();
        assert_eq!(dash.state().used_bytes(), 20);
    }

    #[tokio::test]
    async fn abandoned_upload_frees_slot() {
        let api = Arc::new(MockApi::default());
        let mut dash = dashboard(&api, 10_000);

        let abandoned = dash.begin_upload(UploadFile::new("one.txt", vec![1; 10])).unwrap();
        drop(abandoned);

        let next = dash.begin_upload(UploadFile::new("two.txt", vec![2; 10])).unwrap();
        dash.finish_upload(next).await.unwrap();
    }

    #[tokio::test]
    async fn over_quota_local_file_is_rejected_before_reading() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("huge.mkv");
        std::fs::File::create(&path).unwrap().set_len(2_000).unwrap();
        let file = UploadFile::from_path(&path).await.unwrap();
        // Any attempt to open the file from here on would fail.
        std::fs::remove_file(&path).unwrap();

        let api = Arc::new(MockApi::default());
        let mut dash = dashboard(&api, 1_000);
        let err = dash.upload(file).await.unwrap_err();

        assert!(matches!(
            err,
            CloudError::Validation(ValidationError::InsufficientStorage { .. })
        ));
        assert_eq!(api.count(|c| matches!(c, Call::Upload(..))), 0);
    }

    #[tokio::test]
    async fn failed_upload_alerts_and_frees_slot() {
        let api = Arc::new(MockApi::default());
        api.fail_upload_once(CloudError::application(None, "Upload failed"));
        let mut dash = dashboard(&api, 10_000);

        let err = dash.upload(UploadFile::new("x.gif", vec![0; 5])).await.unwrap_err();
        assert_eq!(err.user_message(), "Upload failed");
        assert_eq!(dash.view().alerts(), vec!["Upload failed"]);
        assert!(dash.view().frames.contains(&Frame::UploadFinished));
        assert_eq!(api.count(|c| matches!(c, Call::ListFiles)), 0);

        dash.upload(UploadFile::new("x.gif", vec![0; 5])).await.unwrap();
    }

    #[tokio::test]
    async fn delete_refreshes_on_success() {
        let api = Arc::new(MockApi::with_files(sample()));
        let mut dash = dashboard(&api, 10_000);
        dash.refresh().await;

        dash.delete("b.pdf").await.unwrap();

        assert!(!dash.state().contains("b.pdf"));
        assert_eq!(dash.state().used_bytes(), 400);
    }

    #[tokio::test]
    async fn delete_failure_shows_server_reason() {
        let api = Arc::new(MockApi::with_files(sample()));
        api.fail_delete_once(CloudError::application(Some("Locked".into()), "Delete failed"));
        let mut dash = dashboard(&api, 10_000);
        dash.refresh().await;

        let err = dash.delete("a.png").await.unwrap_err();
        assert_eq!(err.user_message(), "Locked");
        assert_eq!(dash.view().alerts(), vec!["Locked"]);
        assert!(dash.state().contains("a.png"));
    }

    #[tokio::test]
    async fn delete_of_unknown_name_makes_no_request() {
        let api = Arc::new(MockApi::with_files(sample()));
        let mut dash = dashboard(&api, 10_000);
        dash.refresh().await;

        assert!(dash.delete("missing.txt").await.unwrap_err().is_validation());
        assert_eq!(api.count(|c| matches!(c, Call::Delete(_))), 0);
    }

    #[tokio::test]
    async fn download_writes_into_download_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let api = Arc::new(MockApi::with_files(sample()));
        let mut dash = Dashboard::new(
            api.clone(),
            RecordingView::default(),
            &config(10_000, tmp.path().to_str().unwrap()),
        );
        dash.refresh().await;

        let path = dash.download("c.jpg").await.unwrap();

        assert_eq!(path, tmp.path().join("c.jpg"));
        assert_eq!(std::fs::read(&path).unwrap().len(), 300);
    }

    #[tokio::test]
    async fn download_failure_is_alerted() {
        let tmp = tempfile::tempdir().unwrap();
        let api = Arc::new(MockApi::default());
        let mut dash = Dashboard::new(
            api.clone(),
            RecordingView::default(),
            &config(10_000, tmp.path().to_str().unwrap()),
        );

        let err = dash.download("ghost.txt").await.unwrap_err();
        assert_eq!(err.user_message(), "File not found");
        assert_eq!(dash.view().alerts(), vec!["File not found"]);
    }
}
