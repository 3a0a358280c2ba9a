//! Optional remote copy of the ledger.
//!
//! The shared document lives in a GitHub gist file. Pushes are conditional
//! on the document revision the caller last saw; the check is a re-read
//! before the write, so two clients can still interleave inside that window.

use crate::config::MirrorConfig;
use crate::error::RemoteError;
use crate::models::ledger::RemoteSnapshot;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait RemoteMirror: Send + Sync {
    /// Fetches the shared snapshot; `None` when the document holds no ledger yet.
    async fn pull(&self) -> Result<Option<RemoteSnapshot>, RemoteError>;

    /// Writes `snapshot` if the remote is still at `expected_revision` and
    /// returns the new revision.
    async fn push(
        &self,
        snapshot: &RemoteSnapshot,
        expected_revision: u64,
    ) -> Result<u64, RemoteError>;
}

pub struct GistMirror {
    client: reqwest::Client,
    url: String,
    token: String,
    file_name: String,
}

impl GistMirror {
    pub fn new(config: &MirrorConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("retro-club-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: format!(
                "{}/gists/{}",
                config.api_url.trim_end_matches('/'),
                config.document_id
            ),
            token: config.token.clone(),
            file_name: config.file_name.clone(),
        })
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.client
            .request(method, &self.url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
    }
}

#[async_trait]
impl RemoteMirror for GistMirror {
    async fn pull(&self) -> Result<Option<RemoteSnapshot>, RemoteError> {
        let response = self
            .request(reqwest::Method::GET)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let gist: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;

        parse_gist(&gist, &self.file_name)
    }

    async fn push(
        &self,
        snapshot: &RemoteSnapshot,
        expected_revision: u64,
    ) -> Result<u64, RemoteError> {
        let found = self.pull().await?.map_or(0, |remote| remote.revision);
        if found != expected_revision {
            return Err(RemoteError::Conflict {
                expected: expected_revision,
                found,
            });
        }

        let mut outgoing = snapshot.clone();
        outgoing.revision = found + 1;
        let body = patch_body(&outgoing, &self.file_name)?;

        let response = self
            .request(reqwest::Method::PATCH)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        tracing::debug!(revision = outgoing.revision, "pushed ledger snapshot");
        Ok(outgoing.revision)
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Transport(e.to_string())
    }
}

fn parse_gist(gist: &Value, file_name: &str) -> Result<Option<RemoteSnapshot>, RemoteError> {
    let Some(file) = gist.get("files").and_then(|files| files.get(file_name)) else {
        return Ok(None);
    };
    let content = file
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| RemoteError::Malformed(format!("{} has no content", file_name)))?;

    serde_json::from_str(content)
        .map(Some)
        .map_err(|e| RemoteError::Malformed(e.to_string()))
}

fn patch_body(snapshot: &RemoteSnapshot, file_name: &str) -> Result<Value, RemoteError> {
    let content = serde_json::to_string_pretty(snapshot)
        .map_err(|e| RemoteError::Malformed(e.to_string()))?;
    Ok(serde_json::json!({
        "files": {
            file_name: { "content": content }
        }
    }))
}
