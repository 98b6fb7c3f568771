//! Summary library: local filesystem store and the HTTP client for a remote one.

use glean_core::{Error, NewSummary, Result, SummaryRecord, SummaryStore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::env;

/// Response envelope shared by the library HTTP API and its client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

pub fn library_dir_from_env() -> PathBuf {
    env("GLEAN_LIBRARY_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("glean-library"))
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// One JSON file per record under `<root>/records/`.
#[derive(Debug, Clone)]
pub struct FsLibrary {
    root: PathBuf,
}

impl FsLibrary {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn from_env() -> Self {
        Self::new(library_dir_from_env())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn records_dir(&self) -> PathBuf {
        self.root.join("records")
    }

    fn record_id(new: &NewSummary, created_at_epoch_ms: u64) -> String {
        let mut h = Sha256::new();
        h.update(b"url:");
        h.update(new.url.as_bytes());
        h.update(b"\ntitle:");
        h.update(new.title.as_bytes());
        h.update(b"\nsummary:");
        h.update(new.summary.as_bytes());
        h.update(b"\ncreated_at:");
        h.update(created_at_epoch_ms.to_string().as_bytes());
        hex::encode(&h.finalize()[..16])
    }

    fn is_valid_id(id: &str) -> bool {
        id.len() == 32 && id.bytes().all(|b| b.is_ascii_hexdigit())
    }

    pub fn save_sync(&self, new: NewSummary) -> Result<SummaryRecord> {
        new.validate()?;
        let created_at_epoch_ms = now_epoch_ms();
        let record = SummaryRecord {
            id: Self::record_id(&new, created_at_epoch_ms),
            url: new.url.trim().to_string(),
            title: new.title.trim().to_string(),
            summary: new.summary,
            mode: new.mode,
            tags: new.tags,
            created_at_epoch_ms,
        };

        let dir = self.records_dir();
        fs::create_dir_all(&dir).map_err(|e| Error::Store(e.to_string()))?;
        let bytes = serde_json::to_vec_pretty(&record).map_err(|e| Error::Store(e.to_string()))?;
        // Write-then-rename so a listing never sees half a record.
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| Error::Store(e.to_string()))?;
        tmp.write_all(&bytes)
            .map_err(|e| Error::Store(e.to_string()))?;
        tmp.persist(dir.join(format!("{}.json", record.id)))
            .map_err(|e| Error::Store(e.to_string()))?;

        tracing::info!(id = %record.id, url = %record.url, "saved summary");
        Ok(record)
    }

    pub fn list_sync(&self) -> Result<Vec<SummaryRecord>> {
        let dir = self.records_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Store(e.to_string())),
        };
        let mut out = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::Store(e.to_string()))?.path();
            if path.extension().and_then(|x| x.to_str()) != Some("json") {
                continue;
            }
            match read_record(&path) {
                Ok(r) => out.push(r),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable record"),
            }
        }
        out.sort_by(|a, b| {
            b.created_at_epoch_ms
                .cmp(&a.created_at_epoch_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(out)
    }

    pub fn get_sync(&self, id: &str) -> Result<Option<SummaryRecord>> {
        if !Self::is_valid_id(id) {
            return Ok(None);
        }
        let path = self.records_dir().join(format!("{id}.json"));
        if !path.exists() {
            return Ok(None);
        }
        read_record(&path).map(Some)
    }
}

fn read_record(path: &Path) -> Result<SummaryRecord> {
    let bytes = fs::read(path).map_err(|e| Error::Store(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| Error::Store(e.to_string()))
}

#[async_trait::async_trait]
impl SummaryStore for FsLibrary {
    async fn save(&self, new: NewSummary) -> Result<SummaryRecord> {
        self.save_sync(new)
    }

    async fn list(&self) -> Result<Vec<SummaryRecord>> {
        self.list_sync()
    }

    async fn get(&self, id: &str) -> Result<Option<SummaryRecord>> {
        self.get_sync(id)
    }
}

/// Client for a library served over HTTP (`glean serve`, or any service with the
/// same `/api/summaries` routes).
#[derive(Debug, Clone)]
pub struct HttpLibrary {
    client: reqwest::Client,
    base_url: url::Url,
}

impl HttpLibrary {
    pub fn new(client: reqwest::Client, base_url: &str) -> Result<Self> {
        let mut base_url = url::Url::parse(base_url)
            .map_err(|e| Error::InvalidInput(format!("invalid library url {base_url:?}: {e}")))?;
        if !base_url.path().ends_with('/') {
            let p = format!("{}/", base_url.path());
            base_url.set_path(&p);
        }
        Ok(Self { client, base_url })
    }

    pub fn from_env(client: reqwest::Client) -> Result<Option<Self>> {
        env("GLEAN_LIBRARY_URL")
            .map(|u| Self::new(client, &u))
            .transpose()
    }

    fn endpoint(&self, rel: &str) -> Result<url::Url> {
        self.base_url
            .join(rel)
            .map_err(|e| Error::InvalidInput(e.to_string()))
    }

    async fn read_envelope<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<(reqwest::StatusCode, ApiEnvelope<T>)> {
        let status = resp.status();
        let env: ApiEnvelope<T> = resp
            .json()
            .await
            .map_err(|e| Error::Store(format!("library HTTP {status}: {e}")))?;
        Ok((status, env))
    }
}

fn into_data<T>(status: reqwest::StatusCode, env: ApiEnvelope<T>) -> Result<T> {
    if status.is_success() && env.success {
        return env
            .data
            .ok_or_else(|| Error::Store("library response has no data".to_string()));
    }
    let msg = env
        .error
        .unwrap_or_else(|| format!("library HTTP {status}"));
    if status == reqwest::StatusCode::BAD_REQUEST {
        Err(Error::InvalidInput(msg))
    } else {
        Err(Error::Store(msg))
    }
}

#[async_trait::async_trait]
impl SummaryStore for HttpLibrary {
    async fn save(&self, new: NewSummary) -> Result<SummaryRecord> {
        let resp = self
            .client
            .post(self.endpoint("api/summaries")?)
            .json(&new)
            .send()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        let (status, env) = Self::read_envelope::<SummaryRecord>(resp).await?;
        into_data(status, env)
    }

    async fn list(&self) -> Result<Vec<SummaryRecord>> {
        let resp = self
            .client
            .get(self.endpoint("api/summaries")?)
            .send()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        let (status, env) = Self::read_envelope::<Vec<SummaryRecord>>(resp).await?;
        into_data(status, env)
    }

    async fn get(&self, id: &str) -> Result<Option<SummaryRecord>> {
        let resp = self
            .client
            .get(self.endpoint(&format!("api/summaries/{id}"))?)
            .send()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let (status, env) = Self::read_envelope::<SummaryRecord>(resp).await?;
        into_data(status, env).map(Some)
    }
}
