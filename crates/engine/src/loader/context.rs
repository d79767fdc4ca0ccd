use std::sync::Arc;

use parking_lot::Mutex;

use crate::namespace::Namespace;

/// Per-request holder of the active namespace.
///
/// Each request owns its context, so overrides never leak between requests.
pub struct LoadContext {
	active: Mutex<Arc<Namespace>>,
}

impl LoadContext {
	pub fn new(ambient: Arc<Namespace>) -> Self {
		Self {
			active: Mutex::new(ambient),
		}
	}

	/// The namespace currently in effect.
	pub fn active(&self) -> Arc<Namespace> {
		self.active.lock().clone()
	}

	/// Makes `namespace` active until the returned guard is dropped.
	pub fn install(&self, namespace: Arc<Namespace>) -> NamespaceGuard<'_> {
		let previous = std::mem::replace(&mut *self.active.lock(), namespace);
		NamespaceGuard {
			ctx: self,
			previous: Some(previous),
		}
	}
}

/// Restores the previously active namespace on drop.
#[must_use = "the namespace is restored as soon as the guard is dropped"]
pub struct NamespaceGuard<'a> {
	ctx: &'a LoadContext,
	previous: Option<Arc<Namespace>>,
}

impl Drop for NamespaceGuard<'_> {
	fn drop(&mut self) {
		if let Some(previous) = self.previous.take() {
			*self.ctx.active.lock() = previous;
		}
	}
}
