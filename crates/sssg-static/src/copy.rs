//! Materialization of copy pointer files.
//!
//! A copy pointer (`name.ext.sssg-copy`) holds a single line naming a local
//! file, absolute or relative to the pointer, or a remote URL. The named
//! content is written to the pointer's destination as `name.ext`.

use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};

use reqwest::Client;
use url::Url;

use crate::builder::ProcessError;

/// Where a copy pointer's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopySource {
    Remote(Url),
    Local(PathBuf),
}

impl CopySource {
    /// Interpret the payload of the pointer file at `pointer`.
    ///
    /// Only the first line counts. A blank payload yields `None`.
    pub fn parse(pointer: &Path, payload: &str) -> Result<Option<Self>, ProcessError> {
        let line = payload.lines().next().unwrap_or("").trim();
        if line.is_empty() {
            return Ok(None);
        }

        // One-letter schemes are drive letters, not URLs
        let url = Url::parse(line).ok().filter(|url| url.scheme().len() > 1);

        let source = match url {
            Some(url) => match url.scheme() {
                "http" | "https" => Self::Remote(url),
                "file" => url
                    .to_file_path()
                    .map(Self::Local)
                    .map_err(|_| ProcessError::UnsupportedUrl(line.to_string()))?,
                _ => return Err(ProcessError::UnsupportedUrl(line.to_string())),
            },
            None => {
                let base = pointer.parent().unwrap_or(Path::new(""));
                Self::Local(base.join(line))
            }
        };

        Ok(Some(source))
    }
}

/// Resolves copy pointers and writes their content.
#[derive(Debug, Clone)]
pub struct CopyResolver {
    client: Client,
}

impl CopyResolver {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("sssg/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(client))
    }

    /// Use `client` for remote fetches.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Copy what the pointer at `pointer` names to `destination`.
    ///
    /// Returns `false` when the pointer is blank, in which case nothing is
    /// written.
    pub async fn materialize(
        &self,
        pointer: &Path,
        destination: &Path,
    ) -> Result<bool, ProcessError> {
        let payload = fs::read_to_string(pointer)?;

        let Some(source) = CopySource::parse(pointer, &payload)? else {
            tracing::debug!("Empty copy pointer {}", pointer.display());
            return Ok(false);
        };

        match source {
            CopySource::Remote(url) => self.fetch(url, destination).await?,
            CopySource::Local(path) => {
                if !path.exists() {
                    return Err(ProcessError::CopySourceNotFound(path));
                }
                copy_preserving(&path, destination)?;
            }
        }

        Ok(true)
    }

    async fn fetch(&self, url: Url, destination: &Path) -> Result<(), ProcessError> {
        tracing::debug!("Fetching {}", url);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProcessError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        fs::write(destination, &bytes)?;

        Ok(())
    }
}

/// Copy a file, keeping its permissions and access/modification times.
///
/// Permissions are applied last, so read-only sources copy cleanly and a
/// read-only copy left by an earlier build is replaced.
pub fn copy_preserving(source: &Path, destination: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    let mut times = FileTimes::new().set_modified(metadata.modified()?);
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }

    match fs::remove_file(destination) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut reader = File::open(source)?;
    let mut writer = File::create(destination)?;
    io::copy(&mut reader, &mut writer)?;
    writer.set_times(times)?;
    writer.set_permissions(metadata.permissions())
}
