//! Upload transport with progress reporting.
//!
//! The file body is streamed in fixed-size chunks; each chunk handed to the
//! HTTP stack advances the reported percentage. Callers consume an
//! [`UploadStream`]: zero or more [`UploadEvent::Progress`] values followed
//! by exactly one terminal event.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::stream::StreamExt;
use reqwest::multipart::Part;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::CloudApi;
use crate::drive::category::guess_mime_type;
use crate::error::{CloudError, CloudResult};

/// Bytes per body chunk.
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
enum Source {
    Memory(Vec<u8>),
    Disk(PathBuf),
}

/// A file ready to be sent. Files on disk are only opened once the body
/// is streamed, so admission checks work from the size alone.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    size: u64,
    source: Source,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: data.len() as u64,
            source: Source::Memory(data),
        }
    }

    /// Describe a local file by its metadata, keeping only its file name
    /// for the upload.
    pub async fn from_path(path: &Path) -> CloudResult<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CloudError::storage(format!("'{}' is not a file name", path.display())))?
            .to_string();
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| CloudError::storage(format!("{}: {e}", path.display())))?;
        if !meta.is_file() {
            return Err(CloudError::storage(format!("{} is not a regular file", path.display())));
        }
        Ok(Self {
            name,
            size: meta.len(),
            source: Source::Disk(path.to_path_buf()),
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    async fn open(self) -> CloudResult<Box<dyn AsyncRead + Send + Sync + Unpin>> {
        match self.source {
            Source::Memory(data) => Ok(Box::new(Cursor::new(data))),
            Source::Disk(path) => {
                let file = tokio::fs::File::open(&path)
                    .await
                    .map_err(|e| CloudError::storage(format!("{}: {e}", path.display())))?;
                Ok(Box::new(file))
            }
        }
    }
}

/// Progress and outcome of one upload.
#[derive(Debug)]
pub enum UploadEvent {
    /// Whole-number percentage, 0..=100, never decreasing.
    Progress(u8),
    /// The server accepted the file.
    Completed(Option<String>),
    Failed(CloudError),
}

impl UploadEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, UploadEvent::Progress(_))
    }
}

/// Receiving side of a running upload.
pub struct UploadStream {
    rx: mpsc::UnboundedReceiver<UploadEvent>,
    finished: bool,
}

impl UploadStream {
    /// Next event, or `None` once the terminal event has been returned.
    pub async fn next(&mut self) -> Option<UploadEvent> {
        if self.finished {
            return None;
        }
        let event = self.rx.recv().await?;
        if event.is_terminal() {
            self.finished = true;
        }
        Some(event)
    }
}

/// Percentage of `sent` over `total`, rounded half-up.
pub fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let sent = sent.min(total) as u128;
    let total = total as u128;
    ((sent * 200 + total) / (total * 2)) as u8
}

/// Build the multipart `file` part whose body is read in
/// [`UPLOAD_CHUNK_SIZE`] chunks and reports progress as it is consumed.
pub(crate) async fn progress_part(
    file: UploadFile,
    progress: mpsc::UnboundedSender<u8>,
) -> CloudResult<Part> {
    let total = file.size();
    let name = file.name.clone();
    let mime = guess_mime_type(&name);
    let reader = file.open().await?;

    let _ = progress.send(0);
    let mut sent = 0u64;
    let body = ReaderStream::with_capacity(reader, UPLOAD_CHUNK_SIZE).inspect(move |chunk| {
        if let Ok(chunk) = chunk {
            sent += chunk.len() as u64;
            let _ = progress.send(percent(sent, total));
        }
    });

    Part::stream_with_length(reqwest::Body::wrap_stream(body), total)
        .file_name(name)
        .mime_str(mime)
        .map_err(|e| CloudError::network(format!("invalid content type: {e}")))
}

/// Run an upload on the runtime and return its event stream.
///
/// Raw percentages from the transport are de-duplicated so each value is
/// reported once, and all of them precede the terminal event.
pub fn spawn_upload(api: Arc<dyn CloudApi>, file: UploadFile) -> UploadStream {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<u8>();
    let name = file.name.clone();

    tokio::spawn(async move {
        let upload = api.upload(file, progress_tx);
        tokio::pin!(upload);

        let mut last = None;
        let result = loop {
            tokio::select! {
                biased;
                Some(pct) = progress_rx.recv() => forward_progress(&events_tx, &mut last, pct),
                result = &mut upload => break result,
            }
        };
        while let Ok(pct) = progress_rx.try_recv() {
            forward_progress(&events_tx, &mut last, pct);
        }

        let terminal = match result {
            Ok(message) => UploadEvent::Completed(message),
            Err(err) => {
                debug!(file = %name, error = %err, "Upload failed");
                UploadEvent::Failed(err)
            }
        };
        let _ = events_tx.send(terminal);
    });

    UploadStream {
        rx: events_rx,
        finished: false,
    }
}

fn forward_progress(tx: &mpsc::UnboundedSender<UploadEvent>, last: &mut Option<u8>, pct: u8) {
    if last.is_none_or(|l| pct > l) {
        *last = Some(pct);
        let _ = tx.send(UploadEvent::Progress(pct));
    }
}
