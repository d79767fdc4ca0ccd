//! Transitive dependency discovery through an external resolver process.
//!
//! The resolver is run against a throwaway single-dependency project. Its
//! merged stdout/stderr is scanned for `[INFO]    group:artifact:packaging:version[:scope]`
//! records, which make up the dependency closure.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tracing::{debug, info, warn};

use crate::config::ResolverCommand;
use crate::coordinate::{PackageCoordinate, parse_parts};
use crate::{Error, Result};

/// Level prefix of a dependency record once color escapes are removed.
const RECORD_PREFIX: &str = "[INFO]    ";

/// Name of the synthesized project descriptor.
const DESCRIPTOR_NAME: &str = "pom.xml";

/// Ordered dependency coordinates reported by the resolver.
pub type DependencyClosure = Vec<PackageCoordinate>;

/// One dependency record from resolver output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRecord {
	pub coordinate: PackageCoordinate,
	pub packaging: String,
	pub scope: Option<String>,
}

impl DependencyRecord {
	/// Parses `group:artifact:packaging:version[:scope…]`.
	pub fn parse(token: &str) -> Result<Self> {
		let parts = parse_parts(token)?;
		let coordinate = PackageCoordinate::from_record(token)?;
		Ok(Self {
			coordinate,
			packaging: parts[2].to_string(),
			scope: parts.get(4).map(|s| s.trim().to_string()),
		})
	}
}

/// Extracts the dependency token from a resolver output line.
///
/// Returns `None` for anything that is not an info-level record.
pub fn parse_record_line(line: &str) -> Option<String> {
	let plain = strip_ansi_escapes::strip_str(line);
	if !plain.starts_with(RECORD_PREFIX) {
		return None;
	}
	let start = plain.find("  ")?;
	let token = plain[start..].trim();
	if token.is_empty() {
		return None;
	}
	Some(token.to_string())
}

/// Scans resolver output and collects the reported closure in order.
///
/// Lines are decoded lossily, so undecodable noise is skipped like any other
/// non-record line. A record with fewer than four parts aborts the scan.
pub fn parse_output(mut output: impl BufRead) -> Result<DependencyClosure> {
	let mut closure = DependencyClosure::new();
	let mut buf = Vec::new();
	loop {
		buf.clear();
		if output.read_until(b'\n', &mut buf)? == 0 {
			break;
		}
		let line = String::from_utf8_lossy(&buf);
		let Some(token) = parse_record_line(line.trim_end_matches(['\r', '\n'])) else {
			continue;
		};
		let record = DependencyRecord::parse(&token)?;
		debug!(dependency = %token, scope = ?record.scope, "Found dependency");
		closure.push(record.coordinate);
	}
	Ok(closure)
}

/// Renders the single-dependency project descriptor for `coordinate`.
pub fn project_descriptor(coordinate: &PackageCoordinate) -> String {
	format!(
		concat!(
			"<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
			"<project xmlns=\"http://maven.apache.org/POM/4.0.0\" ",
			"xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" ",
			"xsi:schemaLocation=\"http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd\">\n",
			"<modelVersion>4.0.0</modelVersion><groupId>gprobe</groupId><artifactId>gprobe-resolve</artifactId>",
			"<version>0.0.1-SNAPSHOT</version><dependencies>\n",
			"<dependency><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version></dependency>\n",
			"</dependencies></project>\n",
		),
		coordinate.group(),
		coordinate.artifact(),
		coordinate.version()
	)
}

/// Kills the resolver child if it is still running when dropped.
struct ChildGuard(Child);

impl Drop for ChildGuard {
	fn drop(&mut self) {
		if let Ok(None) = self.0.try_wait() {
			let _ = self.0.kill();
			let _ = self.0.wait();
		}
	}
}

/// Runs the external resolver for one root coordinate.
#[derive(Debug, Clone)]
pub struct DependencyResolver {
	command: ResolverCommand,
	local_repository: PathBuf,
}

impl DependencyResolver {
	pub fn new(command: ResolverCommand, local_repository: impl Into<PathBuf>) -> Self {
		Self {
			command,
			local_repository: local_repository.into(),
		}
	}

	/// Resolves the transitive closure of `root`.
	///
	/// On failure the pre-created cache directory of `root` is removed. The
	/// temporary project directory is removed in every case.
	pub async fn resolve(&self, root: &PackageCoordinate) -> Result<DependencyClosure> {
		let this = self.clone();
		let owned = root.clone();
		tokio::task::spawn_blocking(move || this.resolve_blocking(&owned))
			.await
			.map_err(|e| Error::ResolutionFailure {
				coordinate: root.to_string(),
				reason: e.to_string(),
			})?
	}

	/// Blocking form of [`Self::resolve`].
	pub fn resolve_blocking(&self, root: &PackageCoordinate) -> Result<DependencyClosure> {
		let failure = |reason: String| Error::ResolutionFailure {
			coordinate: root.to_string(),
			reason,
		};

		let dir = tempfile::Builder::new()
			.prefix("gprobe-resolve")
			.tempdir()
			.map_err(|e| failure(format!("failed to create temp directory: {e}")))?;
		info!(coordinate = %root, dir = %dir.path().display(), "Resolving dependencies");

		let result = self.resolve_in(dir.path(), root);

		let dir_path = dir.path().to_path_buf();
		let removed = dir.close();
		info!(coordinate = %root, dir = %dir_path.display(), removed = removed.is_ok(), "Resolution finished");

		result.map_err(|e| match e {
			Error::MalformedCoordinate(_) => e,
			Error::ResolutionFailure { reason, .. } => failure(reason),
			other => failure(other.to_string()),
		})
	}

	fn resolve_in(&self, dir: &Path, root: &PackageCoordinate) -> Result<DependencyClosure> {
		let mut descriptor = OpenOptions::new()
			.write(true)
			.create_new(true)
			.open(dir.join(DESCRIPTOR_NAME))?;
		descriptor.write_all(project_descriptor(root).as_bytes())?;
		drop(descriptor);

		let cache_dir = root.local_path(&self.local_repository);
		let result = fs::create_dir_all(&cache_dir)
			.map_err(Error::from)
			.and_then(|()| self.run(dir));

		if result.is_err() {
			match fs::remove_dir_all(&cache_dir) {
				Ok(()) => debug!(path = %cache_dir.display(), "Removed unresolved cache directory"),
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
				Err(e) => warn!(path = %cache_dir.display(), error = %e, "Failed to remove cache directory"),
			}
		}
		result
	}

	fn run(&self, dir: &Path) -> Result<DependencyClosure> {
		info!(program = %self.command.program, args = ?self.command.args, "exec");

		let (reader, writer) = os_pipe::pipe()?;
		let mut cmd = Command::new(&self.command.program);
		cmd.args(&self.command.args)
			.current_dir(dir)
			.stdin(Stdio::null())
			.stdout(writer.try_clone()?)
			.stderr(writer);

		let child = cmd.spawn().map_err(|e| Error::ResolutionFailure {
			coordinate: String::new(),
			reason: format!("failed to spawn {}: {e}", self.command.program),
		})?;
		// The command still holds both pipe writers; they must close before
		// the reader can see EOF.
		drop(cmd);
		let mut child = ChildGuard(child);

		let closure = parse_output(BufReader::new(reader))?;

		let status = child.0.wait()?;
		if status.success() {
			debug!(%status, "Resolver exited");
		} else {
			warn!(%status, "Resolver exited with failure");
		}
		Ok(closure)
	}
}

#[cfg(test)]
mod tests;
