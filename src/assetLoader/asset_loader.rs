use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Subdirectory of the cache root that holds downloaded audio
const AUDIO_CACHE_SUBDIR: &str = "audio";

/// Extension used for cached remote audio files
const AUDIO_CACHE_EXT: &str = "mp3";

/// Opaque handle to an encoded audio asset.
///
/// The mixer never inspects what an asset is, it only asks the loader for
/// its bytes.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum AssetRef {
    /// Remote asset fetched over HTTP(S)
    Url(String),
    /// Asset on the local filesystem
    File(PathBuf),
    /// Asset bundled with the caller or already held in memory
    Embedded(Arc<[u8]>),
}

impl AssetRef {
    /// Wrap in-memory bytes (e.g. an `include_bytes!` asset)
    pub fn embedded(bytes: impl Into<Arc<[u8]>>) -> Self {
        AssetRef::Embedded(bytes.into())
    }
}

impl fmt::Debug for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetRef::Url(url) => f.debug_tuple("Url").field(url).finish(),
            AssetRef::File(path) => f.debug_tuple("File").field(path).finish(),
            AssetRef::Embedded(bytes) => write!(f, "Embedded({} bytes)", bytes.len()),
        }
    }
}

impl From<&str> for AssetRef {
    fn from(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            AssetRef::Url(s.to_string())
        } else {
            AssetRef::File(PathBuf::from(s))
        }
    }
}

impl From<String> for AssetRef {
    fn from(s: String) -> Self {
        AssetRef::from(s.as_str())
    }
}

impl From<PathBuf> for AssetRef {
    fn from(path: PathBuf) -> Self {
        AssetRef::File(path)
    }
}

/// Generate a cache key from URL (hash-based filename)
fn url_to_filename(url: &str) -> String {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    let hash = hasher.finish();
    format!("{:x}.{}", hash, AUDIO_CACHE_EXT)
}

/// Write `bytes` to a uniquely named sibling, then rename it over `path`.
///
/// Readers only ever see a missing file or a complete one.
async fn store_in_cache(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let mut partial = path.as_os_str().to_owned();
    partial.push(format!(".{}.part", Uuid::new_v4().simple()));
    let partial = PathBuf::from(partial);

    if let Err(e) = tokio::fs::write(&partial, bytes).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&partial, path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }
    Ok(())
}

/// Resolves asset references to raw encoded bytes.
///
/// Remote downloads are optionally cached on disk under
/// `<cache_dir>/audio/<hash>.mp3` so repeated starts of the same track do
/// not hit the network again.
#[derive(Debug, Clone, Default)]
pub struct AssetLoader {
    client: reqwest::Client,
    cache_dir: Option<PathBuf>,
}

impl AssetLoader {
    /// Loader without an on-disk cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader that caches remote downloads under `cache_dir`
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache_dir: Some(cache_dir.into()),
        }
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// Fetch the raw bytes behind an asset reference.
    ///
    /// Network and storage failures both surface as `Error::AssetFetch`.
    /// Nothing is retried.
    pub async fn fetch(&self, asset: &AssetRef) -> Result<Vec<u8>> {
        match asset {
            AssetRef::Embedded(bytes) => Ok(bytes.to_vec()),
            AssetRef::File(path) => tokio::fs::read(path).await.map_err(|e| {
                Error::AssetFetch(format!("Failed to read {}: {}", path.display(), e))
            }),
            AssetRef::Url(url) => self.fetch_remote(url).await,
        }
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>> {
        if let Some(path) = self.cache_path(url) {
            if path.exists() {
                debug!(url, path = %path.display(), "asset served from cache");
                return Ok(tokio::fs::read(&path).await?);
            }
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::AssetFetch(format!("Failed to download asset: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::AssetFetch(format!("HTTP error: {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::AssetFetch(format!("Failed to read response: {}", e)))?;

        if let Some(path) = self.cache_path(url) {
            // The download already succeeded; a cache write failure only costs the next fetch
            match store_in_cache(&path, &bytes).await {
                Ok(()) => info!(url, path = %path.display(), "asset downloaded and cached"),
                Err(e) => warn!(url, path = %path.display(), error = %e, "asset cache write failed"),
            }
        }

        Ok(bytes.to_vec())
    }

    /// Path where a remote asset is (or would be) cached.
    ///
    /// `None` when the loader has no cache directory.
    pub fn cache_path(&self, url: &str) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(AUDIO_CACHE_SUBDIR).join(url_to_filename(url)))
    }

    /// Check if a remote asset is already cached
    pub fn is_cached(&self, url: &str) -> bool {
        self.cache_path(url).map_or(false, |p| p.exists())
    }

    /// Remove every cached download. A missing cache is not an error.
    pub async fn clear_cache(&self) -> Result<()> {
        if let Some(dir) = &self.cache_dir {
            let audio_dir = dir.join(AUDIO_CACHE_SUBDIR);
            if audio_dir.exists() {
                tokio::fs::remove_dir_all(&audio_dir).await?;
                info!(path = %audio_dir.display(), "asset cache cleared");
            }
        }
        Ok(())
    }
}
