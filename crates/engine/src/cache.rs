//! Local artifact cache with on-demand acquisition.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::coordinate::PackageCoordinate;
use crate::{Error, Result};

/// Populates a cache directory with the material of one coordinate.
#[async_trait]
pub trait Fetcher: Send + Sync {
	/// Fetches `coordinate` into `dest`, which already exists.
	async fn fetch(&self, coordinate: &PackageCoordinate, dest: &Path) -> Result<()>;
}

/// Downloads artifacts from a Maven-layout HTTP repository.
pub struct HttpFetcher {
	client: reqwest::Client,
	base_url: String,
	extension: String,
}

impl HttpFetcher {
	pub fn new(base_url: impl Into<String>, extension: impl Into<String>) -> Self {
		Self {
			client: reqwest::Client::new(),
			base_url: base_url.into().trim_end_matches('/').to_string(),
			extension: extension.into(),
		}
	}

	/// `{artifact}-{version}.{ext}`
	pub fn file_name(&self, coordinate: &PackageCoordinate) -> String {
		format!("{}-{}.{}", coordinate.artifact(), coordinate.version(), self.extension)
	}

	pub fn url(&self, coordinate: &PackageCoordinate) -> String {
		format!("{}/{}/{}", self.base_url, coordinate.remote_path(), self.file_name(coordinate))
	}
}

#[async_trait]
impl Fetcher for HttpFetcher {
	async fn fetch(&self, coordinate: &PackageCoordinate, dest: &Path) -> Result<()> {
		let url = self.url(coordinate);
		let unavailable = |reason: String| Error::ArtifactUnavailable {
			coordinate: coordinate.to_string(),
			reason,
		};

		info!(%url, "Downloading artifact");
		let response = self
			.client
			.get(&url)
			.send()
			.await
			.map_err(|e| unavailable(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			return Err(unavailable(format!("GET {url}: status {status}")));
		}

		let bytes = response.bytes().await.map_err(|e| unavailable(e.to_string()))?;

		let target = dest.join(self.file_name(coordinate));
		let partial = target.with_extension(format!("{}.part", self.extension));
		tokio::fs::write(&partial, &bytes).await?;
		tokio::fs::rename(&partial, &target).await?;
		debug!(path = %target.display(), size = bytes.len(), "Artifact stored");
		Ok(())
	}
}

/// Name endings of files that never count as cached material: interrupted
/// downloads and the resolver's failed-lookup markers.
const TRANSIENT_SUFFIXES: [&str; 2] = [".part", ".lastupdated"];

/// Shared local repository of artifact directories.
///
/// Acquisitions of the same coordinate are serialized; different
/// coordinates proceed concurrently.
pub struct ArtifactCache {
	root: PathBuf,
	/// Lowercased name endings of files that make a directory populated.
	suffixes: Vec<String>,
	fetcher: Arc<dyn Fetcher>,
	locks: Mutex<HashMap<PackageCoordinate, Arc<tokio::sync::Mutex<()>>>>,
}

impl ArtifactCache {
	/// A cache under `root` that treats a directory as populated once it holds
	/// a file ending in one of `suffixes`.
	pub fn new<S: Into<String>>(
		root: impl Into<PathBuf>,
		suffixes: impl IntoIterator<Item = S>,
		fetcher: Arc<dyn Fetcher>,
	) -> Self {
		Self {
			root: root.into(),
			suffixes: suffixes.into_iter().map(|s| s.into().to_lowercase()).collect(),
			fetcher,
			locks: Mutex::new(HashMap::new()),
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Returns the local directory of `coordinate`, acquiring it first when
	/// `force` is set or the directory holds no artifact.
	pub async fn ensure(&self, force: bool, coordinate: &PackageCoordinate) -> Result<PathBuf> {
		let lock = self.lock_for(coordinate);
		let result = {
			let _held = lock.lock().await;
			self.ensure_locked(force, coordinate).await
		};
		drop(lock);
		self.release(coordinate);
		result
	}

	async fn ensure_locked(&self, force: bool, coordinate: &PackageCoordinate) -> Result<PathBuf> {
		let path = coordinate.local_path(&self.root);

		if !force && self.has_material(&path).await {
			debug!(%coordinate, path = %path.display(), "Artifact cached");
			return Ok(path);
		}

		tokio::fs::create_dir_all(&path).await?;
		self.fetcher.fetch(coordinate, &path).await.map_err(|e| match e {
			Error::ArtifactUnavailable { .. } => e,
			other => Error::ArtifactUnavailable {
				coordinate: coordinate.to_string(),
				reason: other.to_string(),
			},
		})?;

		if !self.has_material(&path).await {
			return Err(Error::ArtifactUnavailable {
				coordinate: coordinate.to_string(),
				reason: format!("nothing was stored in {}", path.display()),
			});
		}

		info!(%coordinate, path = %path.display(), force, "Artifact acquired");
		Ok(path)
	}

	fn lock_for(&self, coordinate: &PackageCoordinate) -> Arc<tokio::sync::Mutex<()>> {
		self.locks.lock().entry(coordinate.clone()).or_default().clone()
	}

	/// Drops the lock entry of `coordinate` once no acquisition refers to it.
	fn release(&self, coordinate: &PackageCoordinate) {
		let mut locks = self.locks.lock();
		if locks.get(coordinate).is_some_and(|lock| Arc::strong_count(lock) == 1) {
			locks.remove(coordinate);
		}
	}

	/// True if `path` holds at least one artifact file.
	async fn has_material(&self, path: &Path) -> bool {
		let Ok(mut entries) = tokio::fs::read_dir(path).await else {
			return false;
		};
		while let Ok(Some(entry)) = entries.next_entry().await {
			let name = entry.file_name().to_string_lossy().to_lowercase();
			if TRANSIENT_SUFFIXES.iter().any(|s| name.ends_with(s)) {
				continue;
			}
			if !self.suffixes.iter().any(|s| name.ends_with(s.as_str())) {
				continue;
			}
			if entry.file_type().await.is_ok_and(|t| t.is_file()) {
				return true;
			}
		}
		false
	}
}
