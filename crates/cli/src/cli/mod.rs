//! CLI schema for the gprobe binary.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use gprobe_engine::RequestBody;
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "gprobe")]
#[command(about = "Invoke a remote service method generically from its interface artifact")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Request body as JSON, read from FILE or `-` for stdin
	#[arg(long, value_name = "FILE", conflicts_with_all = ["method", "dependency", "service", "name", "address", "url", "timeout", "args"])]
	pub request: Option<PathBuf>,

	/// Method to call, optionally qualified (`com.acme.Calc#add`)
	#[arg(short, long, required_unless_present = "request")]
	pub method: Option<String>,

	/// Coordinate of the interface artifact (`group:artifact:version`)
	#[arg(short, long, required_unless_present = "request")]
	pub dependency: Option<String>,

	/// Argument as a JSON literal; repeat for each parameter
	#[arg(short = 'a', long = "arg", value_name = "JSON")]
	pub args: Vec<String>,

	/// Service interface, when not part of the method
	#[arg(short, long)]
	pub service: Option<String>,

	/// Application name presented to the provider
	#[arg(long)]
	pub name: Option<String>,

	/// Registry address
	#[arg(long)]
	pub address: Option<String>,

	/// Direct provider URL (`dubbo://host:port`)
	#[arg(long)]
	pub url: Option<String>,

	/// Remote call timeout in milliseconds
	#[arg(long, value_name = "MS")]
	pub timeout: Option<u64>,

	/// Re-download artifacts even when cached
	#[arg(long)]
	pub force: bool,

	/// Configuration file
	#[arg(long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long)]
	pub verbose: bool,
}

impl Cli {
	/// Builds the request body from `--request` or from the individual flags.
	pub fn request_body(&self) -> anyhow::Result<RequestBody> {
		if let Some(path) = &self.request {
			let json = if path.as_os_str() == "-" {
				let mut buf = String::new();
				std::io::stdin().read_to_string(&mut buf).context("failed to read request from stdin")?;
				buf
			} else {
				std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
			};
			return serde_json::from_str(&json).context("invalid request body");
		}

		let args = self
			.args
			.iter()
			.map(|raw| serde_json::from_str::<Value>(raw).with_context(|| format!("--arg {raw:?} is not valid JSON")))
			.collect::<anyhow::Result<Vec<_>>>()?;

		Ok(RequestBody {
			name: self.name.clone(),
			service: self.service.clone(),
			method: self.method.clone().unwrap_or_default(),
			dependency: self.dependency.clone().unwrap_or_default(),
			address: self.address.clone(),
			url: self.url.clone(),
			timeout: self.timeout,
			args: Some(args),
		})
	}
}
