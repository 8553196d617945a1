use anyhow::{bail, Context, Result};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Local directory that downloaded files are written into.
pub struct DownloadDir {
    base_dir: PathBuf,
}

impl DownloadDir {
    pub fn new(base_dir: &str) -> Self {
        let expanded = shellexpand::tilde(base_dir).to_string();
        Self {
            base_dir: PathBuf::from(expanded),
        }
    }

    /// Write downloaded bytes under the server-side name, returning the
    /// path inside the download directory. An existing file of the same
    /// name gets a numeric suffix instead of being overwritten.
    pub async fn store(&self, remote_name: &str, data: &[u8]) -> Result<PathBuf> {
        let file_name = sanitize(remote_name)?;
        fs::create_dir_all(&self.base_dir)
            .await
            .context("Failed to create download directory")?;

        let (stem, ext) = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (file_name.as_str(), None),
        };

        let mut n = 0u32;
        loop {
            let name = match (n, ext) {
                (0, _) => file_name.clone(),
                (_, Some(ext)) => format!("{stem} ({n}).{ext}"),
                (_, None) => format!("{stem} ({n})"),
            };
            let path = self.base_dir.join(name);

            // create_new never truncates an existing file.
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(mut file) => {
                    file.write_all(data)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    file.flush()
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to create {}", path.display()))
                }
            }
        }
    }
}

/// Keep only the final path component of a server-provided name.
fn sanitize(remote_name: &str) -> Result<String> {
    let name = remote_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        bail!("Refusing to save file with name '{remote_name}'");
    }
    Ok(name.to_string())
}
