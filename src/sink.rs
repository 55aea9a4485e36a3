//! Result store
//!
//! Every response the report API returns is written to disk, including the
//! intermediate "not ready yet" answers. Files live under
//! `<root>/<login>/<YYYYMMDDHHMMSSmmm>.json`, one per attempt. Two responses
//! stored within the same millisecond get a `-1`, `-2`, ... suffix.

use crate::error::{Error, Result};
use crate::fetch::RawResponse;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// File name timestamp format (fixed width, millisecond precision)
const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// On-disk form of one response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// Status line, e.g. `"202 Accepted"`
    pub status: String,
    /// Numeric status code
    pub status_code: u16,
    /// Response headers; repeated headers keep every value
    pub headers: BTreeMap<String, Vec<String>>,
    /// Response body
    pub body: String,
}

impl From<&RawResponse> for ResponseRecord {
    fn from(response: &RawResponse) -> Self {
        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in response.headers.iter() {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        Self {
            status: response.status_line(),
            status_code: response.status.as_u16(),
            headers,
            body: response.body.clone(),
        }
    }
}

/// Writes responses into per-login directories
#[derive(Debug, Clone)]
pub struct ResponseStore {
    root: PathBuf,
}

impl ResponseStore {
    /// Create a store rooted at `root` (created lazily)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the responses of `login`
    pub fn login_dir(&self, login: &str) -> Result<PathBuf> {
        let mut components = Path::new(login).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(login)),
            _ => Err(Error::Other(format!(
                "login {:?} cannot be used as a directory name",
                login
            ))),
        }
    }

    /// Write one response and return the file path
    ///
    /// The login directory is created on first use.
    pub async fn persist(&self, login: &str, response: &RawResponse) -> Result<PathBuf> {
        let dir = self.login_dir(login)?;
        tokio::fs::create_dir_all(&dir).await?;

        let record = ResponseRecord::from(response);
        let content = serde_json::to_vec_pretty(&record)?;

        let stamp = chrono::Local::now().format(FILE_TIMESTAMP_FORMAT).to_string();
        let mut suffix = 0u32;
        loop {
            let name = match suffix {
                0 => format!("{}.json", stamp),
                n => format!("{}-{}.json", stamp, n),
            };
            let path = dir.join(name);
            match create_new(&path).await {
                Ok(mut file) => {
                    file.write_all(&content).await?;
                    file.flush().await?;
                    tracing::debug!(login, path = %path.display(), "response stored");
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => suffix += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

async fn create_new(path: &Path) -> std::io::Result<tokio::fs::File> {
    tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
}
