//! Bulk upload and download of project files through signed links.
//!
//! Every file is an independent task. Up to `workers` tasks run at once,
//! each retried on any failure up to `transfer_attempts` times. A failed
//! task never cancels its siblings; the batch reports failure after all of
//! them have settled.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::CONTENT_LENGTH;
use reqwest::Body;
use tokio::io::AsyncWriteExt;

use super::client::{error_message, ImagenClient};
use super::error::ImagenError;
use super::options::JobKind;
use super::retry::{any_error, retry_with, RetryPolicy};

/// Files moved by one bulk operation, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub files: Vec<String>,
}

impl TransferSummary {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Upload,
    Download,
}

impl Direction {
    fn verb(&self) -> &'static str {
        match self {
            Direction::Upload => "upload",
            Direction::Download => "download",
        }
    }
}

/// One file paired with its signed link.
#[derive(Debug)]
struct TransferTask {
    file_name: String,
    path: PathBuf,
    url: String,
}

/// List the files in `dir` that should be uploaded.
///
/// Non-recursive. Skips anything that is not a regular file (symlinks are
/// followed), names starting with `.`, and names that are not valid UTF-8.
pub fn collect_upload_files(dir: &Path) -> Result<Vec<String>, ImagenError> {
    let mut names = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            log::warn!("Skipping {:?}: file name is not valid UTF-8", entry.file_name());
            continue;
        };

        let is_file = std::fs::metadata(entry.path())
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            log::info!("Skipping {}: not a regular file", name);
            continue;
        }
        if name.starts_with('.') {
            log::info!("Skipping hidden file {}", name);
            continue;
        }

        names.push(name);
    }

    names.sort();
    Ok(names)
}

/// Final path component of a remote file name, or `None` if nothing
/// usable is left (e.g. `..`).
fn local_file_name(remote: &str) -> Option<&str> {
    Path::new(remote).file_name().and_then(|n| n.to_str())
}

/// Temporary name a download is written to before it is complete.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

impl ImagenClient {
    /// Upload every eligible file in `local_dir` to the project.
    ///
    /// Issues exactly one link request (even for an empty directory) and one
    /// transfer per file.
    ///
    /// # Errors
    ///
    /// `ImagenError::Transfer` if the link request is refused, the server
    /// returns a link for an unknown file, or any file exhausts its retries.
    pub async fn upload(
        &self,
        job_id: &str,
        local_dir: &Path,
    ) -> Result<TransferSummary, ImagenError> {
        let names = collect_upload_files(local_dir)?;
        log::info!(
            "Uploading {} files from {} to project {}",
            names.len(),
            local_dir.display(),
            job_id
        );

        let links = self.upload_links(job_id, &names).await?;
        let known: HashSet<&str> = names.iter().map(String::as_str).collect();

        let mut linked: HashSet<String> = HashSet::with_capacity(links.len());
        let mut tasks = Vec::with_capacity(links.len());
        for link in links {
            if !known.contains(link.file_name.as_str()) {
                return Err(ImagenError::Transfer {
                    message: format!("received an upload link for unknown file {}", link.file_name),
                });
            }
            if !linked.insert(link.file_name.clone()) {
                return Err(ImagenError::Transfer {
                    message: format!("received more than one upload link for {}", link.file_name),
                });
            }
            tasks.push(TransferTask {
                path: local_dir.join(&link.file_name),
                file_name: link.file_name,
                url: link.upload_link,
            });
        }

        let missing: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|name| !linked.contains(*name))
            .collect();
        if !missing.is_empty() {
            return Err(ImagenError::Transfer {
                message: format!("no upload link received for {}", missing.join(", ")),
            });
        }

        self.run_transfers(tasks, Direction::Upload).await
    }

    /// Download every artifact of a finished phase into `local_dir`,
    /// creating it if needed.
    pub async fn download(
        &self,
        job_id: &str,
        kind: JobKind,
        local_dir: &Path,
    ) -> Result<TransferSummary, ImagenError> {
        let links = self.download_links(job_id, kind).await?;

        let mut local_names: HashSet<String> = HashSet::with_capacity(links.len());
        let mut tasks = Vec::with_capacity(links.len());
        for link in links {
            let Some(name) = local_file_name(&link.file_name) else {
                return Err(ImagenError::Transfer {
                    message: format!("unusable artifact name {:?}", link.file_name),
                });
            };
            // Two artifacts reduced to one local name would overwrite each other.
            if !local_names.insert(name.to_string()) {
                return Err(ImagenError::Transfer {
                    message: format!(
                        "artifact {} would overwrite another artifact named {}",
                        link.file_name, name
                    ),
                });
            }
            tasks.push(TransferTask {
                path: local_dir.join(name),
                file_name: name.to_string(),
                url: link.download_link,
            });
        }

        tokio::fs::create_dir_all(local_dir).await?;
        log::info!(
            "Downloading {} {} artifacts of project {} to {}",
            tasks.len(),
            kind,
            job_id,
            local_dir.display()
        );

        self.run_transfers(tasks, Direction::Download).await
    }

    async fn run_transfers(
        &self,
        tasks: Vec<TransferTask>,
        direction: Direction,
    ) -> Result<TransferSummary, ImagenError> {
        let total = tasks.len();
        let policy = RetryPolicy::immediate(self.config.transfer_attempts);
        let progress = self.progress_bar(total, direction);
        let progress_ref = &progress;

        let results: Vec<(&TransferTask, Result<(), ImagenError>)> = stream::iter(tasks.iter())
            .map(|task| async move {
                let label = format!("{} of {}", direction.verb(), task.file_name);
                let result = retry_with(policy, &label, any_error, move || {
                    self.transfer_once(task, direction)
                })
                .await;
                progress_ref.inc(1);
                (task, result)
            })
            .buffer_unordered(self.config.workers.max(1))
            .collect()
            .await;

        progress.finish_and_clear();

        let mut files = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (task, result) in results {
            match result {
                Ok(()) => files.push(task.file_name.clone()),
                Err(e) => {
                    log::error!("Failed to {} {}: {}", direction.verb(), task.file_name, e);
                    failures.push((task.file_name.as_str(), e));
                }
            }
        }

        if let Some((first_name, first_error)) = failures.first() {
            return Err(ImagenError::Transfer {
                message: format!(
                    "{} of {} files failed to {}; first failure: {}: {}",
                    failures.len(),
                    total,
                    direction.verb(),
                    first_name,
                    first_error
                ),
            });
        }

        files.sort();
        log::info!("Finished {} of {} files", direction.verb(), files.len());
        Ok(TransferSummary { files })
    }

    async fn transfer_once(
        &self,
        task: &TransferTask,
        direction: Direction,
    ) -> Result<(), ImagenError> {
        match direction {
            Direction::Upload => self.put_file(task).await,
            Direction::Download => self.get_file(task).await,
        }
    }

    /// Stream the file to a signed link. No credential header.
    async fn put_file(&self, task: &TransferTask) -> Result<(), ImagenError> {
        let file = tokio::fs::File::open(&task.path).await?;
        let len = file.metadata().await?.len();
        let response = self
            .http_client
            .put(&task.url)
            .header(CONTENT_LENGTH, len)
            .body(Body::from(file))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(ImagenError::Remote {
                status,
                message: error_message(response).await,
            });
        }
        Ok(())
    }

    /// GET a signed link and stream the body to disk.
    ///
    /// The body goes to a `.part` file next to the destination and is renamed
    /// into place once complete, so a failed transfer never leaves a
    /// truncated artifact under the final name.
    async fn get_file(&self, task: &TransferTask) -> Result<(), ImagenError> {
        let response = self.http_client.get(&task.url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(ImagenError::Remote {
                status,
                message: error_message(response).await,
            });
        }

        let partial = partial_path(&task.path);
        let result = async {
            let mut file = tokio::fs::File::create(&partial).await?;
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                file.write_all(&chunk?).await?;
            }
            file.flush().await?;
            drop(file);
            tokio::fs::rename(&partial, &task.path).await?;
            Ok::<(), ImagenError>(())
        }
        .await;

        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&partial).await {
                log::debug!("Could not remove {}: {}", partial.display(), e);
            }
        }
        result
    }

    fn progress_bar(&self, total: usize, direction: Direction) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template("{msg:>9} [{bar:40}] {pos}/{len}") {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message(direction.verb());
        bar
    }
}
