//! Type descriptors published by interface units.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Primitive (non-nullable) types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
	Boolean,
	Byte,
	Char,
	Short,
	Int,
	Long,
	Float,
	Double,
	Void,
}

impl Primitive {
	const ALL: [Primitive; 9] = [
		Self::Boolean,
		Self::Byte,
		Self::Char,
		Self::Short,
		Self::Int,
		Self::Long,
		Self::Float,
		Self::Double,
		Self::Void,
	];

	pub fn name(self) -> &'static str {
		match self {
			Self::Boolean => "boolean",
			Self::Byte => "byte",
			Self::Char => "char",
			Self::Short => "short",
			Self::Int => "int",
			Self::Long => "long",
			Self::Float => "float",
			Self::Double => "double",
			Self::Void => "void",
		}
	}

	/// Descriptor character used in array binary names.
	fn descriptor(self) -> char {
		match self {
			Self::Boolean => 'Z',
			Self::Byte => 'B',
			Self::Char => 'C',
			Self::Short => 'S',
			Self::Int => 'I',
			Self::Long => 'J',
			Self::Float => 'F',
			Self::Double => 'D',
			Self::Void => 'V',
		}
	}

	/// Name of the boxed counterpart.
	pub fn boxed(self) -> &'static str {
		match self {
			Self::Boolean => "java.lang.Boolean",
			Self::Byte => "java.lang.Byte",
			Self::Char => "java.lang.Character",
			Self::Short => "java.lang.Short",
			Self::Int => "java.lang.Integer",
			Self::Long => "java.lang.Long",
			Self::Float => "java.lang.Float",
			Self::Double => "java.lang.Double",
			Self::Void => "java.lang.Void",
		}
	}

	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|p| p.name() == name)
	}

	pub fn from_boxed(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|p| p.boxed() == name)
	}

	pub fn is_integral(self) -> bool {
		matches!(self, Self::Byte | Self::Short | Self::Int | Self::Long)
	}

	pub fn is_floating(self) -> bool {
		matches!(self, Self::Float | Self::Double)
	}
}

/// A type as written in a method signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
	Primitive(Primitive),
	Array(Box<TypeRef>),
	Named(String),
}

impl TypeRef {
	pub const OBJECT: &'static str = "java.lang.Object";

	pub fn named(name: impl Into<String>) -> Self {
		Self::Named(name.into())
	}

	pub fn is_primitive(&self) -> bool {
		matches!(self, Self::Primitive(_))
	}

	pub fn is_array(&self) -> bool {
		matches!(self, Self::Array(_))
	}

	/// Binary name carried on the wire (`int`, `[I`, `[Ljava.lang.String;`).
	pub fn wire_name(&self) -> String {
		match self {
			Self::Primitive(p) => p.name().to_string(),
			Self::Named(name) => name.clone(),
			Self::Array(component) => format!("[{}", component.array_descriptor()),
		}
	}

	fn array_descriptor(&self) -> String {
		match self {
			Self::Primitive(p) => p.descriptor().to_string(),
			Self::Named(name) => format!("L{name};"),
			Self::Array(component) => format!("[{}", component.array_descriptor()),
		}
	}
}

impl fmt::Display for TypeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Primitive(p) => f.write_str(p.name()),
			Self::Named(name) => f.write_str(name),
			Self::Array(component) => write!(f, "{component}[]"),
		}
	}
}

impl FromStr for TypeRef {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Error> {
		let s = s.trim();
		if let Some(component) = s.strip_suffix("[]") {
			return Ok(Self::Array(Box::new(component.parse()?)));
		}
		if s.is_empty() || s.contains(char::is_whitespace) {
			return Err(Error::TypeNotFound(s.to_string()));
		}
		Ok(match Primitive::from_name(s) {
			Some(p) => Self::Primitive(p),
			None => Self::Named(s.to_string()),
		})
	}
}

impl TryFrom<String> for TypeRef {
	type Error = Error;

	fn try_from(value: String) -> Result<Self, Error> {
		value.parse()
	}
}

impl From<TypeRef> for String {
	fn from(value: TypeRef) -> Self {
		value.to_string()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
	Interface,
	Class,
}

/// A method signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDef {
	pub name: String,
	#[serde(rename = "parameters", default)]
	pub parameter_types: Vec<TypeRef>,
	#[serde(rename = "returns")]
	pub return_type: TypeRef,
}

impl MethodDef {
	pub fn new(name: impl Into<String>, parameter_types: Vec<TypeRef>, return_type: TypeRef) -> Self {
		Self {
			name: name.into(),
			parameter_types,
			return_type,
		}
	}

	/// Wire names of the declared parameter types.
	pub fn parameter_wire_names(&self) -> Vec<String> {
		self.parameter_types.iter().map(TypeRef::wire_name).collect()
	}
}

impl fmt::Display for MethodDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}(", self.return_type, self.name)?;
		for (i, ty) in self.parameter_types.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{ty}")?;
		}
		f.write_str(")")
	}
}

/// A reference type and its public methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
	pub name: String,
	pub kind: TypeKind,
	/// Direct superclass and implemented interfaces.
	#[serde(default)]
	pub supertypes: Vec<String>,
	#[serde(default)]
	pub methods: Vec<MethodDef>,
}

/// JSON document published by a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCatalog {
	#[serde(default)]
	pub types: Vec<TypeDef>,
}

impl TypeCatalog {
	pub fn from_json(json: &str) -> serde_json::Result<Self> {
		serde_json::from_str(json)
	}
}
