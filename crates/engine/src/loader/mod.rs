//! Request-scoped isolated loading of interface units.
//!
//! Every request builds its own [`Namespace`] from the units found under its
//! resolved artifact directories, layered over whatever namespace is active
//! in its [`LoadContext`]. The new namespace is active only while the request
//! body runs and is released afterwards.

mod context;
mod library;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use walkdir::WalkDir;

pub use self::context::{LoadContext, NamespaceGuard};
pub use self::library::SharedLibraryLoader;
use crate::namespace::{LoadedUnit, Namespace};
use crate::{Error, Result};

/// Turns a unit file into type definitions.
pub trait UnitLoader: Send + Sync {
	fn load(&self, path: &Path) -> Result<LoadedUnit>;
}

/// Collects every regular file under `paths` whose name ends with `suffix`,
/// compared case-insensitively.
pub fn collect_units(paths: &[PathBuf], suffix: &str) -> Result<Vec<PathBuf>> {
	let suffix = suffix.to_lowercase();
	let mut units = Vec::new();

	for root in paths {
		for entry in WalkDir::new(root).sort_by_file_name() {
			let entry = entry.map_err(|e| {
				let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
				Error::Io(std::io::Error::other(format!("{}: {e}", path.display())))
			})?;
			if !entry.file_type().is_file() {
				continue;
			}
			if entry.file_name().to_string_lossy().to_lowercase().ends_with(&suffix) {
				units.push(entry.into_path());
			}
		}
	}
	Ok(units)
}

/// Loads every unit under `paths`, in collection order.
pub fn load_units(loader: &dyn UnitLoader, paths: &[PathBuf], suffix: &str) -> Result<Vec<LoadedUnit>> {
	collect_units(paths, suffix)?
		.iter()
		.map(|path| loader.load(path))
		.collect()
}

/// Loads the units under `paths` into a fresh namespace layered over
/// `ctx.active()`, runs `body` with it installed, then restores the previous
/// namespace.
///
/// Directory walking and library loading run on the blocking pool.
/// Restoration happens on every exit path, including a panic in `body` or the
/// returned future being dropped early.
pub async fn with_isolated_namespace<F, Fut, T>(
	ctx: &LoadContext,
	loader: &Arc<dyn UnitLoader>,
	suffix: &str,
	paths: &[PathBuf],
	body: F,
) -> Result<T>
where
	F: FnOnce(Arc<Namespace>) -> Fut,
	Fut: Future<Output = T>,
{
	let loader = loader.clone();
	let paths = paths.to_vec();
	let suffix = suffix.to_string();
	let units = tokio::task::spawn_blocking(move || load_units(loader.as_ref(), &paths, &suffix))
		.await
		.map_err(|e| Error::Io(std::io::Error::other(format!("unit loading aborted: {e}"))))??;

	let namespace = Arc::new(Namespace::layered(ctx.active(), units));
	info!(units = namespace.units().len(), "Isolated namespace built");

	let _guard = ctx.install(namespace.clone());
	let output = body(namespace).await;
	debug!("Isolated namespace released");
	Ok(output)
}
