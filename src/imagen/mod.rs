//! Imagen API integration module.
//!
//! Drives a batch photo edit against the Imagen project API: resolve the
//! profile, create a project, upload the photos through signed links, submit
//! the edit (and optionally an export), poll until the phase finishes, and
//! download the artifacts.

mod client;
mod error;
mod options;
mod poll;
pub mod retry;
mod transfer;
mod workflow;

pub use client::{find_profile_key, DownloadLink, ImagenClient, Profile, UploadLink, API_KEY_HEADER};
pub use error::ImagenError;
pub use options::{
    EditOptions, JobKind, JobStatus, ProfileSelector, STATUS_COMPLETED, STATUS_FAILED,
};
pub use transfer::{collect_upload_files, TransferSummary};
pub use workflow::{run, RunReport, RunRequest};
