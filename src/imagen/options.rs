//! Job phases, job states, edit options and profile selection.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::error::ImagenError;

/// Remote status string for a finished phase.
pub const STATUS_COMPLETED: &str = "Completed";

/// Remote status string for a phase that ended in failure.
pub const STATUS_FAILED: &str = "Failed";

/// The two independently tracked phases of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Edit,
    Export,
}

impl JobKind {
    /// Path segment used by the status and download-link endpoints.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Edit => "edit",
            JobKind::Export => "export",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed state of an edit or export phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Completed,
    Failed,
    /// Any non-terminal state; carries the raw remote value.
    InProgress(String),
}

impl JobStatus {
    /// Map the remote `data.status` string. Only the two terminal values are
    /// recognised exactly; everything else is still running.
    pub fn from_remote(status: &str) -> Self {
        match status {
            STATUS_COMPLETED => JobStatus::Completed,
            STATUS_FAILED => JobStatus::Failed,
            other => JobStatus::InProgress(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::InProgress(_))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Completed => f.write_str(STATUS_COMPLETED),
            JobStatus::Failed => f.write_str(STATUS_FAILED),
            JobStatus::InProgress(status) => f.write_str(status),
        }
    }
}

/// Options sent with an edit request.
///
/// The named flags cover the tools every API revision understands. `extra`
/// is flattened into the request body so newer tools can be switched on
/// without a client release.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EditOptions {
    pub crop: bool,
    pub straighten: bool,
    pub subject_mask: bool,
    pub hdr_merge: bool,
    pub smooth_skin: bool,
    pub perspective_correction: bool,
    /// Always serialized; the API accepts `null`.
    pub callback_url: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Request body for `POST /projects/{id}/edit`.
#[derive(Debug, Serialize)]
pub(crate) struct EditRequest<'a> {
    pub profile_key: &'a str,
    #[serde(flatten)]
    pub options: &'a EditOptions,
}

/// How the caller identified the profile to edit with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSelector {
    /// Opaque key, used as-is.
    Key(String),
    /// Human-readable name, resolved through the profile list.
    Name(String),
}

impl ProfileSelector {
    /// Pick a selector from optional key and name. The key wins when both
    /// are present; blank values count as absent.
    pub fn from_parts(
        profile_key: Option<String>,
        profile_name: Option<String>,
    ) -> Result<Self, ImagenError> {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        match (non_blank(profile_key), non_blank(profile_name)) {
            (Some(key), _) => Ok(ProfileSelector::Key(key)),
            (None, Some(name)) => Ok(ProfileSelector::Name(name)),
            (None, None) => Err(ImagenError::Configuration(
                "either a profile key or a profile name is required".to_string(),
            )),
        }
    }
}
