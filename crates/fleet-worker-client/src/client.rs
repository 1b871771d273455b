//! HttpWorkerClient — calls one worker's HTTP contract.
//!
//! One instance per `WorkerNode`, sharing a single persistent connection
//! pool to that worker for the lifetime of the process.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::error::WorkerClientError;
use crate::types::{HistoryEntry, QueueStatus, SubmitRequest, SubmitResponse, UploadResponse};

type Result<T> = std::result::Result<T, WorkerClientError>;

/// The operations the lifecycle driver and registry probe loop need from
/// a worker. Exists so both can be exercised against a stub in tests
/// without standing up an HTTP server.
#[async_trait]
pub trait WorkerApi: Send + Sync {
    async fn submit(&self, graph: &serde_json::Value) -> Result<String>;
    async fn history(&self, worker_job_id: &str) -> Result<Option<HistoryEntry>>;
    async fn outputs(&self, history: &HistoryEntry) -> Result<Vec<(String, Bytes)>>;
    async fn fetch(&self, filename: &str, subfolder: &str, kind: &str) -> Result<Bytes>;
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String>;
    async fn queue_status(&self) -> Result<QueueStatus>;
    async fn stats_ok(&self) -> Result<()>;
    /// Releases the connection pool. `reqwest::Client` is reference-counted
    /// internally, so this is a no-op beyond dropping the last handle.
    async fn close(&self) {}
}

pub struct HttpWorkerClient {
    base_url: String,
    client_id: String,
    http: reqwest::Client,
}

impl HttpWorkerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client builds");

        Self {
            base_url: base_url.into(),
            client_id: Uuid::new_v4().to_string(),
            http,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn map_transport_err(e: reqwest::Error) -> WorkerClientError {
        WorkerClientError::WorkerUnavailable(e.to_string())
    }
}

#[async_trait]
impl WorkerApi for HttpWorkerClient {
    async fn submit(&self, graph: &serde_json::Value) -> Result<String> {
        let body = SubmitRequest {
            prompt: graph,
            client_id: &self.client_id,
        };

        let resp = self
            .http
            .post(self.url("/prompt"))
            .json(&body)
            .send()
            .await
            .map_err(Self::map_transport_err)?;

        let status = resp.status();
        if status.is_server_error() {
            let text = resp.text().await.unwrap_or_default();
            return Err(WorkerClientError::WorkerUnavailable(format!(
                "{status}: {text}"
            )));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(WorkerClientError::SubmitRejected(format!(
                "{status}: {text}"
            )));
        }

        let parsed: SubmitResponse = resp.json().await.map_err(Self::map_transport_err)?;
        if let Some(err) = parsed.error {
            return Err(WorkerClientError::SubmitRejected(err.to_string()));
        }
        parsed
            .prompt_id
            .ok_or_else(|| WorkerClientError::SubmitRejected("no prompt_id returned".into()))
    }

    async fn history(&self, worker_job_id: &str) -> Result<Option<HistoryEntry>> {
        let resp = self
            .http
            .get(self.url(&format!("/history/{worker_job_id}")))
            .send()
            .await
            .map_err(Self::map_transport_err)?;

        if !resp.status().is_success() {
            return Err(WorkerClientError::WorkerUnavailable(
                resp.status().to_string(),
            ));
        }

        let mut body: serde_json::Map<String, serde_json::Value> =
            resp.json().await.map_err(Self::map_transport_err)?;

        match body.remove(worker_job_id) {
            None => Ok(None),
            Some(value) => {
                let entry: HistoryEntry =
                    serde_json::from_value(value).map_err(|e| {
                        WorkerClientError::WorkerUnavailable(format!("bad history body: {e}"))
                    })?;
                if entry.outputs.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(entry))
                }
            }
        }
    }

    async fn outputs(&self, history: &HistoryEntry) -> Result<Vec<(String, Bytes)>> {
        let mut out = Vec::new();
        for image in history.all_images() {
            let bytes = self.fetch(&image.filename, &image.subfolder, &image.kind).await?;
            out.push((image.filename.clone(), bytes));
        }
        Ok(out)
    }

    async fn fetch(&self, filename: &str, subfolder: &str, kind: &str) -> Result<Bytes> {
        let resp = self
            .http
            .get(self.url("/view"))
            .query(&[("filename", filename), ("subfolder", subfolder), ("type", kind)])
            .send()
            .await
            .map_err(Self::map_transport_err)?;

        if !resp.status().is_success() {
            return Err(WorkerClientError::WorkerUnavailable(
                resp.status().to_string(),
            ));
        }
        resp.bytes().await.map_err(Self::map_transport_err)
    }

    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("image/png")
            .map_err(Self::map_transport_err)?;
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("subfolder", "")
            .text("type", "input")
            .text("overwrite", "true");

        let resp = self
            .http
            .post(self.url("/upload/image"))
            .multipart(form)
            .send()
            .await
            .map_err(Self::map_transport_err)?;

        if !resp.status().is_success() {
            return Err(WorkerClientError::WorkerUnavailable(
                resp.status().to_string(),
            ));
        }
        let parsed: UploadResponse = resp.json().await.map_err(Self::map_transport_err)?;
        Ok(parsed.name)
    }

    async fn queue_status(&self) -> Result<QueueStatus> {
        let resp = self
            .http
            .get(self.url("/queue"))
            .send()
            .await
            .map_err(Self::map_transport_err)?;

        if !resp.status().is_success() {
            return Err(WorkerClientError::WorkerUnavailable(
                resp.status().to_string(),
            ));
        }
        resp.json().await.map_err(Self::map_transport_err)
    }

    async fn stats_ok(&self) -> Result<()> {
        let resp = self
            .http
            .get(self.url("/system_stats"))
            .send()
            .await
            .map_err(Self::map_transport_err)?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(WorkerClientError::WorkerUnavailable(
                resp.status().to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_strips_trailing_slash_on_base() {
        let client = HttpWorkerClient::new("http://127.0.0.1:8188/");
        assert_eq!(client.url("/prompt"), "http://127.0.0.1:8188/prompt");
    }

    #[test]
    fn each_client_gets_a_distinct_client_id() {
        let a = HttpWorkerClient::new("http://a:1");
        let b = HttpWorkerClient::new("http://b:1");
        assert_ne!(a.client_id(), b.client_id());
    }
}
