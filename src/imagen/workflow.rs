//! End-to-end batch edit: create, upload, edit, [export], download.

use std::path::PathBuf;

use super::client::ImagenClient;
use super::error::ImagenError;
use super::options::{EditOptions, JobKind, ProfileSelector};
use super::transfer::TransferSummary;
use crate::config::ClientConfig;

/// Everything one batch run needs besides the client settings.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub profile: ProfileSelector,
    pub options: EditOptions,
    /// Export after editing and download the exported files instead of the
    /// edited ones.
    pub export: bool,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub job_id: String,
    pub uploaded: TransferSummary,
    pub downloaded: TransferSummary,
    /// Phase whose artifacts were downloaded.
    pub artifacts: JobKind,
}

impl ImagenClient {
    /// Run the whole workflow against a brand-new project.
    ///
    /// Nothing is resumable: every call creates a new project, and any
    /// error ends the run.
    pub async fn run(&self, request: &RunRequest) -> Result<RunReport, ImagenError> {
        let profile_key = self.profile_key(&request.profile).await?;

        let job_id = self.create_job().await?;
        let uploaded = self.upload(&job_id, &request.input_dir).await?;

        self.submit_edit(&job_id, &profile_key, &request.options)
            .await?;
        self.await_completion(&job_id, JobKind::Edit).await?;

        let artifacts = if request.export {
            self.submit_export(&job_id).await?;
            self.await_completion(&job_id, JobKind::Export).await?;
            JobKind::Export
        } else {
            JobKind::Edit
        };

        let downloaded = self
            .download(&job_id, artifacts, &request.output_dir)
            .await?;

        log::info!(
            "Project {}: uploaded {} files, downloaded {} {} artifacts",
            job_id,
            uploaded.len(),
            downloaded.len(),
            artifacts
        );

        Ok(RunReport {
            job_id,
            uploaded,
            downloaded,
            artifacts,
        })
    }
}

/// Build a client from `config` and run one batch.
pub async fn run(config: ClientConfig, request: &RunRequest) -> Result<RunReport, ImagenError> {
    let client = ImagenClient::new(config)?;
    client.run(request).await
}
