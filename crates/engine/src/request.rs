//! Probe request model.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::HarnessConfig;
use crate::{Error, Result};

/// A probe request as submitted by a caller.
///
/// `method` may carry the service as well (`com.acme.Calc#add` or
/// `com.acme.Calc.add`) when `service` is omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestBody {
	pub name: Option<String>,
	pub service: Option<String>,
	pub method: String,
	/// Coordinate of the service's interface artifact.
	pub dependency: String,
	/// Registry address.
	pub address: Option<String>,
	/// Direct provider URL.
	pub url: Option<String>,
	/// Remote call timeout in milliseconds.
	pub timeout: Option<u64>,
	pub args: Option<Vec<Value>>,
}

/// A normalized probe request.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
	pub application_name: String,
	pub service_interface: String,
	pub method_name: String,
	pub dependency: String,
	pub registry_address: Option<String>,
	pub direct_url: Option<String>,
	pub timeout: Option<Duration>,
	pub args: Vec<Value>,
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Splits `service#method`, or `service.method` when there is no `#`.
pub fn split_method(method: &str) -> Result<(&str, &str)> {
	let (service, name) = method
		.rsplit_once('#')
		.or_else(|| method.rsplit_once('.'))
		.ok_or_else(|| Error::MalformedMethod(method.to_string()))?;
	if service.is_empty() || name.is_empty() {
		return Err(Error::MalformedMethod(method.to_string()));
	}
	Ok((service, name))
}

impl RequestBody {
	/// Fills in defaults and separates service from method where needed.
	pub fn normalize(self, config: &HarnessConfig) -> Result<InvocationRequest> {
		let method = self.method.trim();
		if method.is_empty() {
			return Err(Error::MalformedMethod(self.method.clone()));
		}
		let dependency = self.dependency.trim();
		if dependency.is_empty() {
			return Err(Error::MalformedCoordinate(self.dependency.clone()));
		}

		let application_name = non_blank(self.name).unwrap_or_else(|| {
			info!(name = %config.application_name, "Using default application name");
			config.application_name.clone()
		});

		let (service_interface, method_name) = match non_blank(self.service) {
			Some(service) => (service, method.to_string()),
			None => {
				let (service, name) = split_method(method)?;
				info!(method, service, name, "Derived service from method");
				(service.to_string(), name.to_string())
			}
		};

		Ok(InvocationRequest {
			application_name,
			service_interface,
			method_name,
			dependency: dependency.to_string(),
			registry_address: non_blank(self.address),
			direct_url: non_blank(self.url),
			timeout: self.timeout.map(Duration::from_millis),
			args: self.args.unwrap_or_default(),
		})
	}
}
