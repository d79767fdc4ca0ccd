//! End-to-end probe pipeline.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::cache::{ArtifactCache, Fetcher, HttpFetcher};
use crate::config::HarnessConfig;
use crate::coordinate::PackageCoordinate;
use crate::invoker::{GenericInvoker, InvocationOutcome, ReferenceFactory};
use crate::loader::{LoadContext, SharedLibraryLoader, UnitLoader, with_isolated_namespace};
use crate::namespace::Namespace;
use crate::overload::find_method;
use crate::request::{InvocationRequest, RequestBody};
use crate::resolver::DependencyResolver;
use crate::transport::TelnetReferenceFactory;
use crate::types::MethodDef;
use crate::Result;

/// Runs probe requests: resolve, fetch, load, select an overload, invoke.
pub struct Harness {
	config: HarnessConfig,
	resolver: DependencyResolver,
	cache: ArtifactCache,
	loader: Arc<dyn UnitLoader>,
	invoker: GenericInvoker,
	ambient: Arc<Namespace>,
}

impl Harness {
	/// A harness downloading over HTTP, loading shared library units and
	/// invoking over the telnet transport.
	pub fn new(config: HarnessConfig) -> Self {
		let fetcher = Arc::new(HttpFetcher::new(
			config.remote_repository.clone(),
			config.artifact_extension(),
		));
		Self::with_parts(config, fetcher, Arc::new(SharedLibraryLoader), Arc::new(TelnetReferenceFactory))
	}

	pub fn with_parts(
		config: HarnessConfig,
		fetcher: Arc<dyn Fetcher>,
		loader: Arc<dyn UnitLoader>,
		factory: Arc<dyn ReferenceFactory>,
	) -> Self {
		let resolver = DependencyResolver::new(config.resolver.clone(), config.local_repository.clone());
		let suffixes = [config.archive_suffix.clone(), format!(".{}", config.artifact_extension())];
		let cache = ArtifactCache::new(config.local_repository.clone(), suffixes, fetcher);
		let invoker = GenericInvoker::new(factory, config.default_timeout());
		Self {
			config,
			resolver,
			cache,
			loader,
			invoker,
			ambient: Namespace::ambient(),
		}
	}

	pub fn config(&self) -> &HarnessConfig {
		&self.config
	}

	/// Runs one request.
	///
	/// Errors before units are loaded are returned. Everything after that,
	/// including unit load failures, is reported through the outcome.
	pub async fn run(&self, body: RequestBody, force: bool) -> Result<InvocationOutcome> {
		let request = body.normalize(&self.config)?;
		let root: PackageCoordinate = request.dependency.parse()?;

		let closure = self.resolver.resolve(&root).await?;
		info!(%root, dependencies = closure.len(), "Dependencies resolved");

		let mut seen = HashSet::new();
		let mut paths = Vec::with_capacity(closure.len() + 1);
		for coordinate in std::iter::once(root).chain(closure) {
			if seen.insert(coordinate.clone()) {
				paths.push(self.cache.ensure(force, &coordinate).await?);
			}
		}

		let ctx = LoadContext::new(self.ambient.clone());
		let scoped = with_isolated_namespace(&ctx, &self.loader, &self.config.archive_suffix, &paths, |ns| {
			self.invoke_in(ns, &request)
		})
		.await;

		Ok(scoped.unwrap_or_else(|err| self.downgrade(&request, err)))
	}

	async fn invoke_in(&self, ns: Arc<Namespace>, request: &InvocationRequest) -> InvocationOutcome {
		match select(&ns, request) {
			Ok(Some(method)) => {
				let overloads = overload_count(&ns, request);
				info!(service = %request.service_interface, %method, overloads, "Method resolved");
				let outcome = self.invoker.invoke(request, &method).await;
				if overloads > 1 && !self.invoker.sends_parameter_types() {
					warn!(
						service = %request.service_interface,
						%method,
						overloads,
						"Transport does not send parameter types; the provider picks the overload"
					);
					return outcome.note_unpinned(&method);
				}
				outcome
			}
			Ok(None) => {
				warn!(service = %request.service_interface, method = %request.method_name, "Method not found");
				InvocationOutcome::not_found(&request.service_interface, &request.method_name)
			}
			Err(err) => self.downgrade(request, err),
		}
	}

	fn downgrade(&self, request: &InvocationRequest, err: crate::Error) -> InvocationOutcome {
		error!(
			service = %request.service_interface,
			method = %request.method_name,
			error = %err,
			"Failed to invoke method"
		);
		InvocationOutcome::failed(&request.service_interface, &request.method_name, err)
	}
}

fn select(ns: &Namespace, request: &InvocationRequest) -> Result<Option<MethodDef>> {
	let interface = ns.resolve(&request.service_interface)?;
	find_method(ns, &interface, &request.method_name, &request.args)
}

/// Overloads of the requested method with the request's arity.
fn overload_count(ns: &Namespace, request: &InvocationRequest) -> usize {
	ns.resolve(&request.service_interface)
		.map(|interface| {
			ns.methods_of(&interface)
				.iter()
				.filter(|m| m.name == request.method_name && m.parameter_types.len() == request.args.len())
				.count()
		})
		.unwrap_or(0)
}
