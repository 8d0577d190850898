//! Waiting for a project phase to finish.

use tokio::time::Instant;

use super::client::ImagenClient;
use super::error::ImagenError;
use super::options::{JobKind, JobStatus};

impl ImagenClient {
    /// Poll the status of one phase until it is `Completed` or `Failed`.
    ///
    /// Sleeps `poll_interval` between queries. Without a `poll_deadline` the
    /// loop waits indefinitely; with one, it gives up rather than sleep past
    /// the deadline.
    ///
    /// # Errors
    ///
    /// `ImagenError::JobFailed` when the remote reports `Failed` (no further
    /// query is made), `ImagenError::PollTimeout` when the deadline passes,
    /// or whatever error the status query itself surfaced.
    pub async fn await_completion(&self, job_id: &str, kind: JobKind) -> Result<(), ImagenError> {
        let interval = self.config.poll_interval;
        let deadline = self.config.poll_deadline;
        let started = Instant::now();

        log::info!("Waiting for project {} {} to complete...", job_id, kind);

        loop {
            match self.job_status(job_id, kind).await? {
                JobStatus::Completed => {
                    log::info!("Project {} {} has completed successfully.", job_id, kind);
                    return Ok(());
                }
                JobStatus::Failed => {
                    log::error!("Project {} {} failed", job_id, kind);
                    return Err(ImagenError::JobFailed {
                        job_id: job_id.to_string(),
                        kind,
                    });
                }
                JobStatus::InProgress(status) => {
                    log::info!("Project {} status: {}", kind, status);
                }
            }

            if let Some(deadline) = deadline {
                let waited = started.elapsed();
                if waited.saturating_add(interval) > deadline {
                    log::error!(
                        "Project {} {} still running after {:?}; giving up",
                        job_id,
                        kind,
                        waited
                    );
                    return Err(ImagenError::PollTimeout {
                        job_id: job_id.to_string(),
                        kind,
                        waited,
                    });
                }
            }

            tokio::time::sleep(interval).await;
        }
    }
}
