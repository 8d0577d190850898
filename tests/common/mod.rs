//! Shared helpers for the mock-server integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use imagen_batch::config::ClientConfig;
use imagen_batch::imagen::ImagenClient;
use wiremock::{MockServer, Request, ResponseTemplate};

pub const API_KEY: &str = "test-api-key";

/// Client settings pointed at a mock server, with fast polling and no
/// progress bars.
pub fn test_config(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::new(API_KEY).with_base_url(server.uri());
    config.poll_interval = Duration::from_millis(10);
    config.show_progress = false;
    config
}

pub fn test_client(server: &MockServer) -> ImagenClient {
    ImagenClient::new(test_config(server)).unwrap()
}

/// Responder for `get_temporary_upload_links` that hands back one link per
/// requested file, pointing at `{link_base}/upload/{file_name}`.
pub fn echo_upload_links(
    link_base: String,
) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync + 'static {
    move |request: &Request| {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        let links: Vec<serde_json::Value> = body["files_list"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| {
                let name = f["file_name"].as_str().unwrap();
                serde_json::json!({
                    "file_name": name,
                    "upload_link": format!("{}/upload/{}", link_base, name),
                })
            })
            .collect();
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({"data": {"files_list": links}}))
    }
}

/// `data.files_list` body of download links served from `{link_base}/{prefix}/{name}`.
pub fn download_links_body(link_base: &str, prefix: &str, names: &[&str]) -> serde_json::Value {
    let links: Vec<serde_json::Value> = names
        .iter()
        .map(|name| {
            serde_json::json!({
                "file_name": name,
                "download_link": format!("{}/{}/{}", link_base, prefix, name),
            })
        })
        .collect();
    serde_json::json!({"data": {"files_list": links}})
}

pub fn status_body(status: &str) -> serde_json::Value {
    serde_json::json!({"data": {"status": status}})
}

/// Three photos, one dotfile and one sub-directory.
pub fn photo_dir(root: &Path) {
    std::fs::write(root.join("a.jpg"), b"photo-a").unwrap();
    std::fs::write(root.join("b.jpg"), b"photo-b").unwrap();
    std::fs::write(root.join("c.cr2"), b"photo-c").unwrap();
    std::fs::write(root.join(".DS_Store"), b"finder").unwrap();
    std::fs::create_dir(root.join("thumbs")).unwrap();
    std::fs::write(root.join("thumbs").join("a.jpg"), b"thumb").unwrap();
}

/// Requests the server received with the given method.
pub async fn requests_with_method(server: &MockServer, method: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == method)
        .collect()
}
