//! gprobe binary.
//!
//! Runs one probe request and prints the outcome as JSON on stdout. Logs go
//! to stderr.

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use gprobe_engine::{Harness, HarnessConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let subscriber = tracing_subscriber::fmt()
		.with_max_level(if cli.verbose {
			tracing::Level::DEBUG
		} else {
			tracing::Level::INFO
		})
		.with_writer(std::io::stderr)
		.finish();
	tracing::subscriber::set_global_default(subscriber)?;

	let config = HarnessConfig::load(cli.config.as_deref())?;
	let body = cli.request_body()?;
	info!(method = %body.method, dependency = %body.dependency, force = cli.force, "Probing");

	let harness = Harness::new(config);
	let outcome = harness.run(body, cli.force).await?;

	let rendered = serde_json::to_string_pretty(&outcome.into_value()).context("failed to render outcome")?;
	println!("{rendered}");
	Ok(())
}
