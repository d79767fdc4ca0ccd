//! Harness configuration.
//!
//! Values come from a TOML file (`--config`, `$GPROBE_CONFIG`, or
//! `<config dir>/gprobe/config.toml`), with every field defaulted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Application name used when a request does not supply one.
pub const DEFAULT_APPLICATION_NAME: &str = "api-generic-consumer";

/// Remote call timeout used when a request does not supply one.
pub const DEFAULT_TIMEOUT_MS: u64 = 20 * 1000;

/// Resolver subprocess command line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolverCommand {
	pub program: String,
	pub args: Vec<String>,
}

impl Default for ResolverCommand {
	fn default() -> Self {
		let mut command = Vec::new();
		if cfg!(windows) {
			command.extend(["cmd", "/c"]);
		}
		command.extend(["mvn", "-f", "pom.xml", "dependency:resolve"]);

		let mut command = command.into_iter().map(String::from);
		Self {
			program: command.next().unwrap_or_default(),
			args: command.collect(),
		}
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
	/// Root of the local artifact repository.
	pub local_repository: PathBuf,
	/// Base URL artifacts are downloaded from.
	pub remote_repository: String,
	pub resolver: ResolverCommand,
	/// File name suffix of loadable units.
	pub archive_suffix: String,
	/// Extension of the artifact file fetched from the remote repository.
	pub artifact_extension: Option<String>,
	pub default_timeout_ms: u64,
	pub application_name: String,
}

impl Default for HarnessConfig {
	fn default() -> Self {
		Self {
			local_repository: default_local_repository(),
			remote_repository: "https://repo1.maven.org/maven2".to_string(),
			resolver: ResolverCommand::default(),
			archive_suffix: std::env::consts::DLL_SUFFIX.to_string(),
			artifact_extension: None,
			default_timeout_ms: DEFAULT_TIMEOUT_MS,
			application_name: DEFAULT_APPLICATION_NAME.to_string(),
		}
	}
}

impl HarnessConfig {
	/// Loads configuration from `path`, or from the default locations.
	///
	/// A missing default file yields [`HarnessConfig::default`]; a missing
	/// explicit file is an error.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let explicit = path
			.map(Path::to_path_buf)
			.or_else(|| std::env::var_os("GPROBE_CONFIG").map(PathBuf::from));

		let mut config = match explicit {
			Some(path) => Self::from_file(&path)?,
			None => match config_file().filter(|p| p.exists()) {
				Some(path) => Self::from_file(&path)?,
				None => Self::default(),
			},
		};

		if let Some(repo) = std::env::var_os("GPROBE_LOCAL_REPOSITORY") {
			config.local_repository = PathBuf::from(repo);
		}

		tracing::info!(local_repository = %config.local_repository.display(), "Local repository configured");
		Ok(config)
	}

	/// Parses a TOML configuration file.
	pub fn from_file(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path).map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
		Self::from_toml(&content).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
	}

	pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
		toml::from_str(content)
	}

	/// Extension of downloaded artifact files, derived from the unit suffix
	/// unless set explicitly.
	pub fn artifact_extension(&self) -> String {
		match &self.artifact_extension {
			Some(ext) => ext.trim_start_matches('.').to_string(),
			None => self.archive_suffix.trim_start_matches('.').to_string(),
		}
	}

	pub fn default_timeout(&self) -> Duration {
		Duration::from_millis(self.default_timeout_ms)
	}
}

/// `$HOME/.m2/repository`, the conventional Maven local repository.
fn default_local_repository() -> PathBuf {
	dirs::home_dir()
		.unwrap_or_else(|| PathBuf::from("."))
		.join(".m2")
		.join("repository")
}

fn config_file() -> Option<PathBuf> {
	dirs::config_dir().map(|d| d.join("gprobe").join("config.toml"))
}
