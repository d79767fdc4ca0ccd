//! Generic invocation bridge.
//!
//! A resolved [`MethodDef`] and the raw request arguments are handed to a
//! [`GenericService`] obtained from a [`ReferenceFactory`]. Whatever happens on
//! the remote side comes back as an [`InvocationOutcome`]; nothing escapes as
//! an error.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::realize::realize;
use crate::request::InvocationRequest;
use crate::types::MethodDef;

/// Everything needed to obtain a generic reference to a remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceConfig {
	pub application: String,
	pub interface: String,
	pub registry: Option<String>,
	/// Direct provider URL, bypassing discovery.
	pub url: Option<String>,
	pub generic: bool,
	pub timeout: Duration,
}

/// Failures talking to a remote service.
#[derive(Debug, Error)]
pub enum RemoteError {
	#[error("connection failed: {0}")]
	Connect(String),
	#[error("timed out after {0:?}")]
	Timeout(Duration),
	#[error("{0}")]
	Remote(String),
	#[error("protocol error: {0}")]
	Protocol(String),
	#[error("unsupported: {0}")]
	Unsupported(String),
}

impl From<std::io::Error> for RemoteError {
	fn from(err: std::io::Error) -> Self {
		Self::Connect(err.to_string())
	}
}

/// A type-erased handle on a remote service.
#[async_trait]
pub trait GenericService: Send + Sync {
	/// Invokes `method` with declared `parameter_types` (wire names) and raw `args`.
	async fn invoke(&self, method: &str, parameter_types: &[String], args: &[Value]) -> Result<Value, RemoteError>;
}

/// Builds generic service handles from a [`ReferenceConfig`].
#[async_trait]
pub trait ReferenceFactory: Send + Sync {
	async fn refer(&self, config: &ReferenceConfig) -> Result<Arc<dyn GenericService>, RemoteError>;

	/// Whether the handles put the declared parameter types on the wire. When
	/// they do not, the provider picks among overloads by itself.
	fn sends_parameter_types(&self) -> bool {
		true
	}
}

/// Result of a probe request.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
	/// Normalized reply of the remote method.
	Value(Value),
	/// No overload of the method accepts the arguments.
	NotFound(String),
	/// A downgraded failure.
	Failed(String),
}

impl InvocationOutcome {
	pub fn not_found(service: &str, method: &str) -> Self {
		Self::NotFound(format!("No such method[{method}] in service[{service}]"))
	}

	pub fn failed(service: &str, method: &str, cause: impl std::fmt::Display) -> Self {
		Self::Failed(format!("Failed to invoke method[{service}.{method}], cause: {cause}"))
	}

	/// Names the locally selected overload in a failure, for transports that
	/// cannot pin it.
	pub fn note_unpinned(self, method: &MethodDef) -> Self {
		match self {
			Self::Failed(message) => Self::Failed(format!(
				"{message} (selected {method} locally; parameter types were not sent)"
			)),
			other => other,
		}
	}

	/// Collapses the outcome into one JSON value; messages become strings.
	pub fn into_value(self) -> Value {
		match self {
			Self::Value(value) => value,
			Self::NotFound(message) | Self::Failed(message) => Value::String(message),
		}
	}
}

pub struct GenericInvoker {
	factory: Arc<dyn ReferenceFactory>,
	default_timeout: Duration,
}

impl GenericInvoker {
	pub fn new(factory: Arc<dyn ReferenceFactory>, default_timeout: Duration) -> Self {
		Self {
			factory,
			default_timeout,
		}
	}

	pub fn sends_parameter_types(&self) -> bool {
		self.factory.sends_parameter_types()
	}

	pub fn reference_config(&self, request: &InvocationRequest) -> ReferenceConfig {
		ReferenceConfig {
			application: request.application_name.clone(),
			interface: request.service_interface.clone(),
			registry: request.registry_address.clone(),
			url: request.direct_url.clone(),
			generic: true,
			timeout: request.timeout.unwrap_or(self.default_timeout),
		}
	}

	/// Calls `method` remotely and normalizes the reply against its return type.
	pub async fn invoke(&self, request: &InvocationRequest, method: &MethodDef) -> InvocationOutcome {
		let service = request.service_interface.as_str();
		let name = request.method_name.as_str();
		let config = self.reference_config(request);
		let parameter_types = method.parameter_wire_names();

		let start = Instant::now();
		let call = self.call(&config, name, &parameter_types, &request.args);
		let reply = match AssertUnwindSafe(call).catch_unwind().await {
			Ok(reply) => reply,
			Err(panic) => Err(RemoteError::Remote(panic_message(panic.as_ref()))),
		};

		match reply {
			Ok(value) => {
				info!(service, method = name, elapsed_ms = start.elapsed().as_millis() as u64, "Invoked method");
				InvocationOutcome::Value(realize(value, &method.return_type))
			}
			Err(err) => {
				error!(service, method = name, error = %err, "Failed to invoke method");
				InvocationOutcome::failed(service, name, err)
			}
		}
	}

	async fn call(
		&self,
		config: &ReferenceConfig,
		method: &str,
		parameter_types: &[String],
		args: &[Value],
	) -> Result<Value, RemoteError> {
		let reference = self.factory.refer(config).await?;
		tokio::time::timeout(config.timeout, reference.invoke(method, parameter_types, args))
			.await
			.map_err(|_| RemoteError::Timeout(config.timeout))?
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		(*s).to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"transport panicked".to_string()
	}
}
