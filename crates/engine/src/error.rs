//! Error types for the probe pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while preparing a generic invocation.
///
/// Failures of the remote call itself never show up here; the invoker turns
/// them into [`InvocationOutcome::Failed`](crate::invoker::InvocationOutcome::Failed).
#[derive(Debug, Error)]
pub enum Error {
	#[error("invalid coordinate {0:?}")]
	MalformedCoordinate(String),

	#[error("cannot derive service from method {0:?}: expected `service#method` or `service.method`")]
	MalformedMethod(String),

	#[error("failed to resolve dependencies of {coordinate}: {reason}")]
	ResolutionFailure { coordinate: String, reason: String },

	#[error("artifact {coordinate} unavailable: {reason}")]
	ArtifactUnavailable { coordinate: String, reason: String },

	#[error("failed to load unit {path}: {reason}")]
	LoadFailure { path: PathBuf, reason: String },

	#[error("type not found: {0}")]
	TypeNotFound(String),

	#[error("the type of No.{position} parameter is primitive({type_name}), but the value passed is null")]
	NullForPrimitive { position: usize, type_name: String },

	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

/// Result type for probe operations.
pub type Result<T> = std::result::Result<T, Error>;
