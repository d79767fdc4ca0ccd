//! Layered type namespaces.
//!
//! A namespace owns the type definitions of the units it was built from and
//! delegates lookups it cannot answer to its parent. The root of every chain
//! is [`Namespace::ambient`], which knows the platform types a generic
//! invocation can carry.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use libloading::Library;

use crate::types::{MethodDef, Primitive, TypeDef, TypeKind, TypeRef};
use crate::{Error, Result};

/// A unit after loading: its type definitions and the library keeping them alive.
#[derive(Debug)]
pub struct LoadedUnit {
	pub path: PathBuf,
	pub types: Vec<TypeDef>,
	pub library: Option<Library>,
}

/// Platform types: `(name, kind, supertypes)`.
const AMBIENT_TYPES: &[(&str, TypeKind, &[&str])] = &[
	("java.lang.Object", TypeKind::Class, &[]),
	("java.io.Serializable", TypeKind::Interface, &[]),
	("java.lang.Cloneable", TypeKind::Interface, &[]),
	("java.lang.Comparable", TypeKind::Interface, &[]),
	("java.lang.CharSequence", TypeKind::Interface, &[]),
	("java.lang.Iterable", TypeKind::Interface, &[]),
	("java.util.RandomAccess", TypeKind::Interface, &[]),
	("java.lang.String", TypeKind::Class, &["java.lang.Object", "java.io.Serializable", "java.lang.Comparable", "java.lang.CharSequence"]),
	("java.lang.Number", TypeKind::Class, &["java.lang.Object", "java.io.Serializable"]),
	("java.lang.Byte", TypeKind::Class, &["java.lang.Number", "java.lang.Comparable"]),
	("java.lang.Short", TypeKind::Class, &["java.lang.Number", "java.lang.Comparable"]),
	("java.lang.Integer", TypeKind::Class, &["java.lang.Number", "java.lang.Comparable"]),
	("java.lang.Long", TypeKind::Class, &["java.lang.Number", "java.lang.Comparable"]),
	("java.lang.Float", TypeKind::Class, &["java.lang.Number", "java.lang.Comparable"]),
	("java.lang.Double", TypeKind::Class, &["java.lang.Number", "java.lang.Comparable"]),
	("java.math.BigInteger", TypeKind::Class, &["java.lang.Number", "java.lang.Comparable"]),
	("java.math.BigDecimal", TypeKind::Class, &["java.lang.Number", "java.lang.Comparable"]),
	("java.lang.Boolean", TypeKind::Class, &["java.lang.Object", "java.io.Serializable", "java.lang.Comparable"]),
	("java.lang.Character", TypeKind::Class, &["java.lang.Object", "java.io.Serializable", "java.lang.Comparable"]),
	("java.lang.Void", TypeKind::Class, &["java.lang.Object"]),
	("java.util.Date", TypeKind::Class, &["java.lang.Object", "java.io.Serializable", "java.lang.Cloneable", "java.lang.Comparable"]),
	("java.util.Collection", TypeKind::Interface, &["java.lang.Iterable"]),
	("java.util.List", TypeKind::Interface, &["java.util.Collection"]),
	("java.util.Set", TypeKind::Interface, &["java.util.Collection"]),
	("java.util.AbstractCollection", TypeKind::Class, &["java.lang.Object", "java.util.Collection"]),
	("java.util.AbstractList", TypeKind::Class, &["java.util.AbstractCollection", "java.util.List"]),
	("java.util.ArrayList", TypeKind::Class, &["java.util.AbstractList", "java.util.List", "java.util.RandomAccess", "java.lang.Cloneable", "java.io.Serializable"]),
	("java.util.AbstractSet", TypeKind::Class, &["java.util.AbstractCollection", "java.util.Set"]),
	("java.util.HashSet", TypeKind::Class, &["java.util.AbstractSet", "java.util.Set", "java.lang.Cloneable", "java.io.Serializable"]),
	("java.util.Map", TypeKind::Interface, &[]),
	("java.util.AbstractMap", TypeKind::Class, &["java.lang.Object", "java.util.Map"]),
	("java.util.HashMap", TypeKind::Class, &["java.util.AbstractMap", "java.util.Map", "java.lang.Cloneable", "java.io.Serializable"]),
	("java.util.LinkedHashMap", TypeKind::Class, &["java.util.HashMap", "java.util.Map"]),
];

/// A request-scoped set of type definitions layered over a parent namespace.
pub struct Namespace {
	parent: Option<Arc<Namespace>>,
	types: HashMap<String, Arc<TypeDef>>,
	units: Vec<PathBuf>,
	// Dropped after `types`; definitions are owned copies, the handles only
	// keep the units mapped for the namespace's lifetime.
	_libraries: Vec<Library>,
}

impl std::fmt::Debug for Namespace {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Namespace")
			.field("units", &self.units)
			.field("types", &self.types.len())
			.field("has_parent", &self.parent.is_some())
			.finish()
	}
}

impl Namespace {
	/// The root namespace holding platform types.
	pub fn ambient() -> Arc<Self> {
		let types = AMBIENT_TYPES
			.iter()
			.map(|(name, kind, supertypes)| {
				let def = TypeDef {
					name: name.to_string(),
					kind: *kind,
					supertypes: supertypes.iter().map(|s| s.to_string()).collect(),
					methods: Vec::new(),
				};
				(name.to_string(), Arc::new(def))
			})
			.collect();

		Arc::new(Self {
			parent: None,
			types,
			units: Vec::new(),
			_libraries: Vec::new(),
		})
	}

	/// Builds a namespace from loaded units on top of `parent`.
	///
	/// When two units define the same type the first one wins.
	pub fn layered(parent: Arc<Namespace>, units: Vec<LoadedUnit>) -> Self {
		let mut types = HashMap::new();
		let mut paths = Vec::with_capacity(units.len());
		let mut libraries = Vec::new();

		for unit in units {
			for def in unit.types {
				types.entry(def.name.clone()).or_insert_with(|| Arc::new(def));
			}
			paths.push(unit.path);
			libraries.extend(unit.library);
		}

		Self {
			parent: Some(parent),
			types,
			units: paths,
			_libraries: libraries,
		}
	}

	/// Unit files this namespace was built from.
	pub fn units(&self) -> &[PathBuf] {
		&self.units
	}

	pub fn parent(&self) -> Option<&Arc<Namespace>> {
		self.parent.as_ref()
	}

	/// Looks a type up here, then in the parent chain.
	pub fn lookup(&self, name: &str) -> Option<Arc<TypeDef>> {
		self.types
			.get(name)
			.cloned()
			.or_else(|| self.parent.as_ref().and_then(|p| p.lookup(name)))
	}

	pub fn resolve(&self, name: &str) -> Result<Arc<TypeDef>> {
		self.lookup(name).ok_or_else(|| Error::TypeNotFound(name.to_string()))
	}

	/// Resolves a type name to a descriptor, checking that reference types exist.
	pub fn resolve_ref(&self, name: &str) -> Result<TypeRef> {
		let ty: TypeRef = name.parse()?;
		let mut element = &ty;
		while let TypeRef::Array(component) = element {
			element = component;
		}
		if let TypeRef::Named(n) = element {
			self.resolve(n)?;
		}
		Ok(ty)
	}

	/// Public methods of `def`: declared first, then inherited, without
	/// repeating a signature already seen.
	pub fn methods_of(&self, def: &TypeDef) -> Vec<MethodDef> {
		let mut methods = Vec::new();
		let mut signatures = HashSet::new();
		let mut visited = HashSet::new();
		let mut queue = VecDeque::from([def.name.clone()]);

		while let Some(name) = queue.pop_front() {
			if !visited.insert(name.clone()) {
				continue;
			}
			let current = if name == def.name {
				Some(Arc::new(def.clone()))
			} else {
				self.lookup(&name)
			};
			let Some(current) = current else {
				continue;
			};

			for method in &current.methods {
				if signatures.insert((method.name.clone(), method.parameter_types.clone())) {
					methods.push(method.clone());
				}
			}
			queue.extend(current.supertypes.iter().cloned());
		}
		methods
	}

	/// Whether `name` equals `target` or inherits from it.
	fn is_subtype(&self, name: &str, target: &str) -> bool {
		if name == target {
			return true;
		}
		let mut visited = HashSet::new();
		let mut queue = VecDeque::from([name.to_string()]);
		while let Some(current) = queue.pop_front() {
			if current == target {
				return true;
			}
			if !visited.insert(current.clone()) {
				continue;
			}
			if let Some(def) = self.lookup(&current) {
				queue.extend(def.supertypes.iter().cloned());
			}
		}
		false
	}

	/// Whether a value of type `source` can be stored in `target`.
	pub fn is_assignable(&self, target: &TypeRef, source: &TypeRef) -> bool {
		match (target, source) {
			(TypeRef::Primitive(t), TypeRef::Primitive(s)) => t == s,
			(TypeRef::Primitive(_), _) | (_, TypeRef::Primitive(_)) => false,
			(TypeRef::Named(t), _) if t == TypeRef::OBJECT => true,
			(TypeRef::Named(t), TypeRef::Array(_)) => t == "java.lang.Cloneable" || t == "java.io.Serializable",
			(TypeRef::Array(_), TypeRef::Named(_)) => false,
			(TypeRef::Array(t), TypeRef::Array(s)) => match (t.as_ref(), s.as_ref()) {
				(TypeRef::Primitive(a), TypeRef::Primitive(b)) => a == b,
				(t, s) => self.is_assignable(t, s),
			},
			(TypeRef::Named(t), TypeRef::Named(s)) => self.is_subtype(s, t),
		}
	}

	/// Primitives, their boxes except `Void`, `String`, and `Number` or
	/// `Date` subtypes.
	pub fn is_primitive_like(&self, ty: &TypeRef) -> bool {
		match ty {
			TypeRef::Primitive(_) => true,
			TypeRef::Array(_) => false,
			TypeRef::Named(name) => {
				Primitive::from_boxed(name).is_some_and(|p| p != Primitive::Void)
					|| name == "java.lang.String"
					|| self.is_subtype(name, "java.lang.Number")
					|| self.is_subtype(name, "java.util.Date")
			}
		}
	}
}
