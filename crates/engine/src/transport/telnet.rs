//! Direct-connect transport over a provider's telnet command port.
//!
//! Providers answer `invoke Interface.method(arg, ...)` with the JSON encoded
//! result, an `elapsed:` trailer and a `dubbo>` prompt. Only direct
//! `dubbo://host:port` URLs are supported; registry discovery is not.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};
use url::Url;

use crate::invoker::{GenericService, ReferenceConfig, ReferenceFactory, RemoteError};

/// Port providers listen on when the URL names none.
pub const DEFAULT_PORT: u16 = 20880;

const PROMPT: &str = "dubbo>";
const RESULT_PREFIX: &str = "result: ";
const ELAPSED_PREFIX: &str = "elapsed:";
const ERROR_PREFIXES: &[&str] = &["Failed to invoke", "No such"];

/// Builds [`TelnetService`] handles from direct provider URLs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelnetReferenceFactory;

#[async_trait]
impl ReferenceFactory for TelnetReferenceFactory {
	async fn refer(&self, config: &ReferenceConfig) -> Result<Arc<dyn GenericService>, RemoteError> {
		let Some(raw) = config.url.as_deref() else {
			return Err(RemoteError::Unsupported(format!(
				"no direct url for {}; registry discovery ({}) is not available",
				config.interface,
				config.registry.as_deref().unwrap_or("none"),
			)));
		};

		let url = Url::parse(raw).map_err(|e| RemoteError::Protocol(format!("invalid url {raw:?}: {e}")))?;
		if url.scheme() != "dubbo" {
			return Err(RemoteError::Unsupported(format!("scheme {:?} in {raw}", url.scheme())));
		}
		let host = url
			.host_str()
			.ok_or_else(|| RemoteError::Protocol(format!("no host in {raw}")))?;
		let port = url.port().unwrap_or(DEFAULT_PORT);

		debug!(interface = %config.interface, host, port, "Referring provider over telnet");
		Ok(Arc::new(TelnetService {
			address: format!("{host}:{port}"),
			interface: config.interface.clone(),
		}))
	}

	fn sends_parameter_types(&self) -> bool {
		false
	}
}

/// One remote interface reached through the telnet command port.
#[derive(Debug, Clone)]
pub struct TelnetService {
	address: String,
	interface: String,
}

impl TelnetService {
	pub fn new(address: impl Into<String>, interface: impl Into<String>) -> Self {
		Self {
			address: address.into(),
			interface: interface.into(),
		}
	}

	fn command(&self, method: &str, args: &[Value]) -> String {
		let args: Vec<String> = args.iter().map(Value::to_string).collect();
		format!("invoke {}.{}({})\r\n", self.interface, method, args.join(","))
	}
}

#[async_trait]
impl GenericService for TelnetService {
	async fn invoke(&self, method: &str, parameter_types: &[String], args: &[Value]) -> Result<Value, RemoteError> {
		// The command port picks the overload itself from the argument values.
		debug!(method, ?parameter_types, "Declared parameter types not sent over telnet");

		let mut stream = TcpStream::connect(&self.address).await?;
		let command = self.command(method, args);
		trace!(address = %self.address, command = command.trim_end(), "Sending telnet command");
		stream.write_all(command.as_bytes()).await?;

		let mut reply = Vec::new();
		let mut chunk = [0u8; 4096];
		loop {
			let n = stream.read(&mut chunk).await?;
			if n == 0 {
				break;
			}
			reply.extend_from_slice(&chunk[..n]);
			if reply_complete(&String::from_utf8_lossy(&reply)) {
				break;
			}
		}

		parse_telnet_reply(&String::from_utf8_lossy(&reply))
	}
}

/// A reply is complete once something other than prompts ends in a prompt.
fn reply_complete(text: &str) -> bool {
	let body = strip_leading_prompts(text);
	!body.is_empty() && body.trim_end().ends_with(PROMPT)
}

fn strip_leading_prompts(mut text: &str) -> &str {
	loop {
		let trimmed = text.trim_start();
		match trimmed.strip_prefix(PROMPT) {
			Some(rest) => text = rest,
			None => return trimmed,
		}
	}
}

/// Extracts the result value from a telnet `invoke` reply.
pub fn parse_telnet_reply(raw: &str) -> Result<Value, RemoteError> {
	let body = strip_leading_prompts(raw);
	let body = body.trim_end();
	let body = body.strip_suffix(PROMPT).unwrap_or(body);

	let text = body
		.lines()
		.filter(|line| !line.trim_start().starts_with(ELAPSED_PREFIX))
		.collect::<Vec<_>>()
		.join("\n");
	let text = text.trim();
	let text = text.strip_prefix(RESULT_PREFIX).unwrap_or(text).trim();

	if text.is_empty() {
		return Err(RemoteError::Protocol("empty reply".to_string()));
	}
	if ERROR_PREFIXES.iter().any(|p| text.starts_with(p)) {
		return Err(RemoteError::Remote(text.to_string()));
	}
	Ok(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use serde_json::json;
	use tokio::io::{AsyncBufReadExt, BufReader};
	use tokio::net::TcpListener;

	use super::*;

	fn config(url: Option<&str>) -> ReferenceConfig {
		ReferenceConfig {
			application: "api-generic-consumer".into(),
			interface: "com.acme.Calc".into(),
			registry: None,
			url: url.map(String::from),
			generic: true,
			timeout: Duration::from_secs(1),
		}
	}

	#[test]
	fn test_parse_plain_reply() {
		let value = parse_telnet_reply("5\r\nelapsed: 3 ms.\r\ndubbo>").unwrap();
		assert_eq!(value, json!(5));
	}

	#[test]
	fn test_parse_prefixed_object_reply() {
		let value = parse_telnet_reply("dubbo>result: {\"total\":5,\"ops\":[\"add\"]}\r\nelapsed: 0 ms.\r\ndubbo>").unwrap();
		assert_eq!(value, json!({"total": 5, "ops": ["add"]}));
	}

	#[test]
	fn test_parse_non_json_reply_as_string() {
		assert_eq!(parse_telnet_reply("hello world\r\ndubbo>").unwrap(), json!("hello world"));
	}

	#[test]
	fn test_parse_error_replies() {
		let err = parse_telnet_reply("No such method add in service com.acme.Calc\r\ndubbo>").unwrap_err();
		assert!(matches!(err, RemoteError::Remote(m) if m.starts_with("No such method")));
		assert!(matches!(parse_telnet_reply("dubbo>"), Err(RemoteError::Protocol(_))));
	}

	#[test]
	fn test_reply_completion() {
		assert!(!reply_complete("dubbo>"));
		assert!(!reply_complete("5\r\nelapsed: 1 ms."));
		assert!(reply_complete("5\r\nelapsed: 1 ms.\r\ndubbo>"));
	}

	#[tokio::test]
	async fn test_refer_requires_direct_dubbo_url() {
		let factory = TelnetReferenceFactory;
		assert!(matches!(factory.refer(&config(None)).await, Err(RemoteError::Unsupported(_))));
		assert!(matches!(factory.refer(&config(Some("http://h:1"))).await, Err(RemoteError::Unsupported(_))));
		assert!(matches!(factory.refer(&config(Some("not a url"))).await, Err(RemoteError::Protocol(_))));
		assert!(!factory.sends_parameter_types());
	}

	#[tokio::test]
	async fn test_invoke_round_trip_against_local_provider() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();

		let provider = tokio::spawn(async move {
			let (socket, _) = listener.accept().await.unwrap();
			let (read, mut write) = socket.into_split();
			let mut line = String::new();
			BufReader::new(read).read_line(&mut line).await.unwrap();
			write.write_all(b"5\r\nelapsed: 1 ms.\r\ndubbo>").await.unwrap();
			line
		});

		let url = format!("dubbo://127.0.0.1:{port}");
		let service = TelnetReferenceFactory.refer(&config(Some(&url))).await.unwrap();
		let value = service
			.invoke("add", &["int".to_string(), "int".to_string()], &[json!(2), json!(3)])
			.await
			.unwrap();

		assert_eq!(value, json!(5));
		assert_eq!(provider.await.unwrap(), "invoke com.acme.Calc.add(2,3)\r\n");
	}

	#[tokio::test]
	async fn test_invoke_unreachable_provider() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let address = listener.local_addr().unwrap().to_string();
		drop(listener);

		let service = TelnetService::new(address, "com.acme.Calc");
		let err = service.invoke("add", &[], &[]).await.unwrap_err();
		assert!(matches!(err, RemoteError::Connect(_)));
	}
}
