use std::io::Cursor;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

const ESC: &str = "\u{1b}";

fn record(token: &str) -> String {
	format!("[{ESC}[1;34mINFO{ESC}[m]    {token}")
}

fn coordinates(closure: &DependencyClosure) -> Vec<String> {
	closure.iter().map(ToString::to_string).collect()
}

#[test]
fn test_record_line_requires_info_prefix() {
	assert_eq!(
		parse_record_line(&record("com.acme:calc-api:jar:1.0.0:compile")).as_deref(),
		Some("com.acme:calc-api:jar:1.0.0:compile")
	);
	assert_eq!(
		parse_record_line("[INFO]    org.slf4j:slf4j-api:jar:1.7.30:compile").as_deref(),
		Some("org.slf4j:slf4j-api:jar:1.7.30:compile")
	);
	assert_eq!(parse_record_line("[INFO] --- maven-dependency-plugin:3.1.2:resolve ---"), None);
	assert_eq!(parse_record_line(&format!("[{ESC}[1;33mWARNING{ESC}[m]    a:b:jar:1")), None);
	assert_eq!(parse_record_line("Downloading from central: https://repo1.maven.org"), None);
	assert_eq!(parse_record_line("[INFO]    "), None);
}

#[test]
fn test_parse_output_keeps_record_order() {
	let lines = [
		"[INFO] Scanning for projects...".to_string(),
		record("com.acme:calc-api:jar:1.0.0:compile"),
		"[INFO] ".to_string(),
		record("org.apache.dubbo:dubbo:jar:2.7.8:compile"),
		"Downloaded from central: https://repo1.maven.org/maven2/x.pom".to_string(),
		record("com.acme:calc-model:jar:1.0.0:compile -- module calc.model"),
		"[INFO] BUILD SUCCESS".to_string(),
	];
	let output = lines.join("\n");

	let closure = parse_output(Cursor::new(output)).unwrap();
	assert_eq!(
		coordinates(&closure),
		["com.acme:calc-api:1.0.0", "org.apache.dubbo:dubbo:2.7.8", "com.acme:calc-model:1.0.0"]
	);
}

#[test]
fn test_parse_output_keeps_duplicates() {
	let output = [record("a:b:jar:1:compile"), record("a:b:jar:1:runtime")].join("\n");
	let closure = parse_output(Cursor::new(output)).unwrap();
	assert_eq!(closure.len(), 2);
}

#[test]
fn test_short_record_is_malformed() {
	let output = [record("a:b:jar:1:compile"), record("com.acme:calc-api:1.0.0")].join("\n");
	let err = parse_output(Cursor::new(output)).unwrap_err();
	assert!(matches!(err, Error::MalformedCoordinate(ref s) if s == "com.acme:calc-api:1.0.0"));
}

#[test]
fn test_undecodable_noise_is_skipped() {
	let mut output = record("com.acme:calc-api:jar:1.0.0:compile").into_bytes();
	output.extend_from_slice(b"\n[WARNING] checksum mismatch reported by j\xfcrgen's mirror\n");
	output.extend_from_slice(b"[INFO]    com.acme:calc-model:jar:1.0.0:compile\r\n");

	let closure = parse_output(Cursor::new(output)).unwrap();
	assert_eq!(coordinates(&closure), ["com.acme:calc-api:1.0.0", "com.acme:calc-model:1.0.0"]);
}

#[test]
fn test_dependency_record_fields() {
	let record = DependencyRecord::parse("com.acme:calc-api:jar:1.0.0:provided").unwrap();
	assert_eq!(record.coordinate.to_string(), "com.acme:calc-api:1.0.0");
	assert_eq!(record.packaging, "jar");
	assert_eq!(record.scope.as_deref(), Some("provided"));
}

#[test]
fn test_descriptor_names_single_dependency() {
	let coordinate: PackageCoordinate = "com.acme:calc-api:1.0.0".parse().unwrap();
	let pom = project_descriptor(&coordinate);
	assert!(pom.contains("<dependency><groupId>com.acme</groupId><artifactId>calc-api</artifactId><version>1.0.0</version></dependency>"));
	assert_eq!(pom.matches("<dependency>").count(), 1);
}

fn arb_field() -> impl Strategy<Value = String> {
	"[a-zA-Z0-9][a-zA-Z0-9._-]{0,12}"
}

/// An output line and the coordinate it reports, if any.
fn arb_line() -> impl Strategy<Value = (Vec<u8>, Option<String>)> {
	prop_oneof![
		(arb_field(), arb_field(), arb_field()).prop_map(|(group, artifact, version)| {
			(
				record(&format!("{group}:{artifact}:jar:{version}:compile")).into_bytes(),
				Some(format!("{group}:{artifact}:{version}")),
			)
		}),
		"(\\[INFO\\] |\\[WARNING\\] |Downloading from central: )[a-z][a-z0-9 :/.]{0,30}"
			.prop_map(|noise| (noise.into_bytes(), None)),
		prop::collection::vec(0x80u8..=0xff, 1..8).prop_map(|bytes| ([b"[INFO] ".as_slice(), bytes.as_slice()].concat(), None)),
	]
}

proptest! {
	/// N records among M noise lines give exactly the N coordinates, in order.
	#[test]
	fn prop_closure_keeps_records_in_order(lines in prop::collection::vec(arb_line(), 0..24)) {
		let output = lines.iter().map(|(line, _)| line.as_slice()).collect::<Vec<_>>().join(&b'\n');
		let expected: Vec<String> = lines.into_iter().filter_map(|(_, coordinate)| coordinate).collect();

		let closure = parse_output(Cursor::new(output)).unwrap();
		prop_assert_eq!(coordinates(&closure), expected);
	}
}

#[cfg(unix)]
mod process {
	use super::*;
	use pretty_assertions::assert_eq;

	fn shell(script: &str) -> ResolverCommand {
		ResolverCommand {
			program: "sh".to_string(),
			args: vec!["-c".to_string(), script.to_string()],
		}
	}

	#[tokio::test]
	async fn test_resolve_reads_merged_output() {
		let repo = tempfile::tempdir().unwrap();
		let script = concat!(
			"test -f pom.xml || exit 3\n",
			"printf '[INFO]    com.acme:calc-api:jar:1.0.0:compile\\n'\n",
			"printf '[INFO]    com.acme:calc-model:jar:1.0.0:compile\\n' 1>&2\n",
			"printf 'noise\\n'\n",
		);
		let resolver = DependencyResolver::new(shell(script), repo.path());
		let root: PackageCoordinate = "com.acme:calc-api:1.0.0".parse().unwrap();

		let closure = resolver.resolve(&root).await.unwrap();
		assert_eq!(coordinates(&closure), ["com.acme:calc-api:1.0.0", "com.acme:calc-model:1.0.0"]);
		assert!(root.local_path(repo.path()).is_dir());
	}

	#[tokio::test]
	async fn test_resolve_ignores_exit_status() {
		let repo = tempfile::tempdir().unwrap();
		let resolver = DependencyResolver::new(shell("echo '[ERROR] no such artifact'; exit 1"), repo.path());
		let root: PackageCoordinate = "com.acme:missing:9.9.9".parse().unwrap();

		let closure = resolver.resolve(&root).await.unwrap();
		assert!(closure.is_empty());
	}

	#[tokio::test]
	async fn test_malformed_record_cleans_cache_directory() {
		let repo = tempfile::tempdir().unwrap();
		let resolver = DependencyResolver::new(shell("printf '[INFO]    a:b:jar:1\\n[INFO]    broken:record\\n'"), repo.path());
		let root: PackageCoordinate = "com.acme:calc-api:1.0.0".parse().unwrap();

		let err = resolver.resolve(&root).await.unwrap_err();
		assert!(matches!(err, Error::MalformedCoordinate(_)));
		assert!(!root.local_path(repo.path()).exists());
	}

	#[tokio::test]
	async fn test_spawn_failure_is_resolution_failure() {
		let repo = tempfile::tempdir().unwrap();
		let command = ResolverCommand {
			program: "gprobe-definitely-not-installed".to_string(),
			args: Vec::new(),
		};
		let resolver = DependencyResolver::new(command, repo.path());
		let root: PackageCoordinate = "com.acme:calc-api:1.0.0".parse().unwrap();

		let err = resolver.resolve(&root).await.unwrap_err();
		assert!(matches!(err, Error::ResolutionFailure { ref coordinate, .. } if coordinate == "com.acme:calc-api:1.0.0"));
		assert!(!root.local_path(repo.path()).exists());
	}
}
