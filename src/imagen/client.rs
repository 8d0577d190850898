//! ImagenClient - handles communication with the Imagen API.

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::ImagenError;
use super::options::{EditOptions, EditRequest, JobKind, JobStatus, ProfileSelector};
use super::retry::{retry_with, RetryPolicy};
use crate::config::ClientConfig;

/// Header carrying the API key on every API call (not on signed links).
pub const API_KEY_HEADER: &str = "x-api-key";

/// Every successful API response wraps its payload in `data`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Failure body: `{"error": {"message": "..."}}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// An edit profile visible to the API key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub profile_name: String,
    pub profile_key: String,
}

#[derive(Debug, Deserialize)]
struct ProfilesData {
    profiles: Vec<Profile>,
}

#[derive(Debug, Deserialize)]
struct ProjectData {
    project_uuid: String,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    status: String,
}

#[derive(Debug, Serialize)]
struct FileName<'a> {
    file_name: &'a str,
}

#[derive(Debug, Serialize)]
struct UploadLinksRequest<'a> {
    files_list: Vec<FileName<'a>>,
}

#[derive(Debug, Deserialize)]
struct FilesList<T> {
    files_list: Vec<T>,
}

/// Signed URL for uploading one file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadLink {
    pub file_name: String,
    pub upload_link: String,
}

/// Signed URL for downloading one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DownloadLink {
    pub file_name: String,
    pub download_link: String,
}

/// Client for the Imagen project API.
///
/// Holds the immutable credential and a pooled HTTP client; `&ImagenClient`
/// is shared freely across concurrent transfers.
pub struct ImagenClient {
    pub(super) config: ClientConfig,
    pub(super) http_client: reqwest::Client,
}

impl ImagenClient {
    /// Create a client from an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns `ImagenError::Configuration` if the API key is empty. No
    /// request is made in that case.
    pub fn new(mut config: ClientConfig) -> Result<Self, ImagenError> {
        config.api_key = config.api_key.trim().to_string();
        if config.api_key.is_empty() {
            return Err(ImagenError::Configuration(
                "API key not configured".to_string(),
            ));
        }
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        config.workers = config.workers.max(1);

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.config.api_key
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    /// Attach the credential, send, and turn 401 / non-2xx into errors.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ImagenError> {
        let response = request
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let message = error_message(response).await;
            log::error!("API key rejected: {}", message);
            return Err(ImagenError::Authorization(message));
        }
        if !status.is_success() {
            let message = error_message(response).await;
            log::error!("Request failed with status {}: {}", status, message);
            return Err(ImagenError::Remote {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    /// Send a link-batch request; anything but 200 OK is a transfer error.
    async fn send_for_links<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<Vec<T>, ImagenError> {
        let response = request
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            let message = error_message(response).await;
            log::error!("Failed to get temporary {} links: {}", what, message);
            return Err(ImagenError::Transfer { message });
        }

        let body: Envelope<FilesList<T>> = parse_json(response).await?;
        Ok(body.data.files_list)
    }

    /// Fetch every profile visible to the API key.
    pub async fn list_profiles(&self) -> Result<Vec<Profile>, ImagenError> {
        let response = self.send(self.http_client.get(self.url("profiles"))).await?;
        let body: Envelope<ProfilesData> = parse_json(response).await?;
        Ok(body.data.profiles)
    }

    /// Resolve a profile name to its key. Names match exactly; the first
    /// match wins.
    ///
    /// # Errors
    ///
    /// `ImagenError::Authorization` if the key is rejected,
    /// `ImagenError::NotFound` if no profile has this name.
    pub async fn resolve_profile(&self, name: &str) -> Result<String, ImagenError> {
        let profiles = self.list_profiles().await?;
        find_profile_key(&profiles, name)
            .map(str::to_string)
            .ok_or_else(|| ImagenError::NotFound(format!("Profile {} not found", name)))
    }

    /// Turn a selector into a profile key, looking names up remotely.
    pub async fn profile_key(&self, selector: &ProfileSelector) -> Result<String, ImagenError> {
        match selector {
            ProfileSelector::Key(key) => Ok(key.clone()),
            ProfileSelector::Name(name) => self.resolve_profile(name).await,
        }
    }

    /// Create a new project and return its UUID.
    pub async fn create_job(&self) -> Result<String, ImagenError> {
        let response = self
            .send(self.http_client.post(self.url("projects/")))
            .await?;
        let body: Envelope<ProjectData> = parse_json(response).await?;
        log::info!("Created project {}", body.data.project_uuid);
        Ok(body.data.project_uuid)
    }

    /// Request one signed upload link per file name, in a single call.
    pub async fn upload_links(
        &self,
        job_id: &str,
        file_names: &[String],
    ) -> Result<Vec<UploadLink>, ImagenError> {
        let body = UploadLinksRequest {
            files_list: file_names
                .iter()
                .map(|name| FileName { file_name: name })
                .collect(),
        };
        let request = self
            .http_client
            .post(self.url(&format!(
                "projects/{}/get_temporary_upload_links",
                job_id
            )))
            .json(&body);
        self.send_for_links(request, "upload").await
    }

    /// Fetch the signed download links for a finished phase.
    pub async fn download_links(
        &self,
        job_id: &str,
        kind: JobKind,
    ) -> Result<Vec<DownloadLink>, ImagenError> {
        let request = self.http_client.get(self.url(&format!(
            "projects/{}/{}/get_temporary_download_links",
            job_id, kind
        )));
        self.send_for_links(request, "download").await
    }

    /// Send the project for editing with the given profile and options.
    pub async fn submit_edit(
        &self,
        job_id: &str,
        profile_key: &str,
        options: &EditOptions,
    ) -> Result<(), ImagenError> {
        let body = EditRequest {
            profile_key,
            options,
        };
        self.send(
            self.http_client
                .post(self.url(&format!("projects/{}/edit", job_id)))
                .json(&body),
        )
        .await?;
        log::info!("Project {} sent for editing", job_id);
        Ok(())
    }

    /// Start exporting an edited project.
    pub async fn submit_export(&self, job_id: &str) -> Result<(), ImagenError> {
        self.send(
            self.http_client
                .post(self.url(&format!("projects/{}/export", job_id))),
        )
        .await?;
        log::info!("Project {} sent for export", job_id);
        Ok(())
    }

    /// Query the current status of one phase. Transient failures are
    /// retried up to `status_attempts` times.
    pub async fn job_status(&self, job_id: &str, kind: JobKind) -> Result<JobStatus, ImagenError> {
        let url = self.url(&format!("projects/{}/{}/status", job_id, kind));
        let url = url.as_str();
        let label = format!("Fetching project {} status", kind);

        retry_with(
            RetryPolicy::immediate(self.config.status_attempts),
            &label,
            ImagenError::is_retryable,
            move || async move {
                let response = self.send(self.http_client.get(url)).await?;
                let body: Envelope<StatusData> = parse_json(response).await?;
                Ok(JobStatus::from_remote(&body.data.status))
            },
        )
        .await
    }
}

/// First profile whose name matches exactly.
pub fn find_profile_key<'a>(profiles: &'a [Profile], name: &str) -> Option<&'a str> {
    let mut matches = profiles.iter().filter(|p| p.profile_name == name);
    let first = matches.next()?;
    if matches.next().is_some() {
        log::debug!("Several profiles are named {}; using the first", name);
    }
    Some(first.profile_key.as_str())
}

/// Extract `error.message` from a failure body, falling back to the raw text.
pub(super) async fn error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    parse_error_message(&text).unwrap_or_else(|| {
        if text.trim().is_empty() {
            status.to_string()
        } else {
            format!("{}: {}", status, text.trim())
        }
    })
}

fn parse_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.error.message)
}

/// Decode a JSON body, reporting missing fields as `InvalidResponse`.
async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ImagenError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ImagenError::InvalidResponse(e.to_string()))
}
