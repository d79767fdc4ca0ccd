//! Package coordinates (`group:artifact:version`) and their local layout.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{Error, Result};

/// Splits a coordinate string on `:`, requiring at least three parts.
///
/// Trailing parts (packaging, scope) are returned as-is; callers index by
/// position.
pub fn parse_parts(s: &str) -> Result<Vec<&str>> {
	let parts: Vec<&str> = s.split(':').collect();
	if parts.len() < 3 {
		return Err(Error::MalformedCoordinate(s.to_string()));
	}
	Ok(parts)
}

/// Identifier of a distributable unit of code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageCoordinate {
	group: String,
	artifact: String,
	version: String,
}

impl PackageCoordinate {
	/// Builds a coordinate, rejecting empty fields.
	pub fn new(group: impl Into<String>, artifact: impl Into<String>, version: impl Into<String>) -> Result<Self> {
		let coordinate = Self {
			group: group.into(),
			artifact: artifact.into(),
			version: version.into(),
		};
		if coordinate.group.is_empty() || coordinate.artifact.is_empty() || coordinate.version.is_empty() {
			return Err(Error::MalformedCoordinate(coordinate.to_string()));
		}
		Ok(coordinate)
	}

	/// Projects a resolver record `group:artifact:packaging:version[:scope…]`
	/// down to `group:artifact:version`.
	pub fn from_record(record: &str) -> Result<Self> {
		let parts = parse_parts(record)?;
		if parts.len() < 4 {
			return Err(Error::MalformedCoordinate(record.to_string()));
		}
		Self::new(parts[0], parts[1], parts[3]).map_err(|_| Error::MalformedCoordinate(record.to_string()))
	}

	pub fn group(&self) -> &str {
		&self.group
	}

	pub fn artifact(&self) -> &str {
		&self.artifact
	}

	pub fn version(&self) -> &str {
		&self.version
	}

	/// Local repository directory: `root/<group split on '.'>/artifact/version`.
	pub fn local_path(&self, root: &Path) -> PathBuf {
		let mut path = root.to_path_buf();
		path.extend(self.group.split('.'));
		path.push(&self.artifact);
		path.push(&self.version);
		path
	}

	/// Path of this coordinate relative to a remote repository root.
	pub fn remote_path(&self) -> String {
		format!("{}/{}/{}", self.group.replace('.', "/"), self.artifact, self.version)
	}
}

impl fmt::Display for PackageCoordinate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
	}
}

impl FromStr for PackageCoordinate {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let parts = parse_parts(s)?;
		Self::new(parts[0], parts[1], parts[2]).map_err(|_| Error::MalformedCoordinate(s.to_string()))
	}
}
