//! Structural overload resolution.
//!
//! Arguments arrive as untyped JSON, so an overload is picked by comparing the
//! shape of each argument with the declared parameter types. The first
//! candidate that fits wins; ambiguity is not reported.

use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::namespace::Namespace;
use crate::types::{MethodDef, TypeDef, TypeRef};
use crate::{Error, Result};

/// Key naming the concrete type of an object argument.
pub const CLASS_KEY: &str = "class";

/// Runtime type a JSON value takes once deserialized on the wire. `None` for null.
pub fn runtime_type(value: &Value) -> Option<TypeRef> {
	let name = match value {
		Value::Null => return None,
		Value::Bool(_) => "java.lang.Boolean",
		Value::Number(n) => number_type(n),
		Value::String(_) => "java.lang.String",
		Value::Array(_) => "java.util.ArrayList",
		Value::Object(_) => "java.util.LinkedHashMap",
	};
	Some(TypeRef::named(name))
}

fn number_type(n: &Number) -> &'static str {
	if let Some(i) = n.as_i64() {
		if i32::try_from(i).is_ok() {
			"java.lang.Integer"
		} else {
			"java.lang.Long"
		}
	} else if n.is_u64() {
		"java.math.BigInteger"
	} else {
		"java.lang.Double"
	}
}

/// Finds the method of `interface` named `name` that accepts `args`.
///
/// A single candidate of the right arity is returned without inspecting the
/// arguments. A null argument for a primitive parameter aborts the search with
/// [`Error::NullForPrimitive`], even if a later candidate would accept it.
pub fn find_method(ns: &Namespace, interface: &TypeDef, name: &str, args: &[Value]) -> Result<Option<MethodDef>> {
	let mut candidates: Vec<MethodDef> = ns
		.methods_of(interface)
		.into_iter()
		.filter(|m| m.name == name && m.parameter_types.len() == args.len())
		.collect();
	debug!(service = %interface.name, method = name, candidates = candidates.len(), "Overload candidates");

	if candidates.len() == 1 {
		return Ok(candidates.pop());
	}
	for candidate in candidates {
		if is_match(ns, &candidate.parameter_types, args)? {
			return Ok(Some(candidate));
		}
	}
	Ok(None)
}

fn is_match(ns: &Namespace, types: &[TypeRef], args: &[Value]) -> Result<bool> {
	for (i, (ty, arg)) in types.iter().zip(args).enumerate() {
		let fits = match arg {
			Value::Null => {
				if ty.is_primitive() {
					return Err(Error::NullForPrimitive {
						position: i + 1,
						type_name: ty.to_string(),
					});
				}
				true
			}
			Value::Bool(_) | Value::Number(_) | Value::String(_) => ns.is_primitive_like(ty),
			Value::Object(fields) => ns.is_assignable(ty, &object_type(ns, fields)?),
			Value::Array(_) => ty.is_array() || ns.is_assignable(ty, &TypeRef::named("java.util.ArrayList")),
		};
		if !fits {
			return Ok(false);
		}
	}
	Ok(true)
}

fn object_type(ns: &Namespace, fields: &Map<String, Value>) -> Result<TypeRef> {
	match fields.get(CLASS_KEY) {
		Some(Value::String(class)) if !class.is_empty() => ns.resolve_ref(class),
		_ => Ok(TypeRef::named("java.util.LinkedHashMap")),
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;
	use std::sync::Arc;

	use serde_json::json;

	use super::*;
	use crate::namespace::LoadedUnit;
	use crate::types::TypeCatalog;

	fn namespace(json: &str) -> (Namespace, Arc<TypeDef>) {
		let unit = LoadedUnit {
			path: PathBuf::from("calc.unit"),
			types: TypeCatalog::from_json(json).unwrap().types,
			library: None,
		};
		let ns = Namespace::layered(Namespace::ambient(), vec![unit]);
		let svc = ns.resolve("com.acme.Svc").unwrap();
		(ns, svc)
	}

	fn svc(methods: &str) -> (Namespace, Arc<TypeDef>) {
		namespace(&format!(
			r#"{{"types":[
				{{"name":"com.acme.Svc","kind":"interface","methods":[{methods}]}},
				{{"name":"com.acme.Shape","kind":"interface"}},
				{{"name":"com.acme.Circle","kind":"class","supertypes":["java.lang.Object","com.acme.Shape"]}}
			]}}"#
		))
	}

	fn params(method: Option<MethodDef>) -> Vec<String> {
		method.unwrap().parameter_types.iter().map(ToString::to_string).collect()
	}

	const INT_THEN_STRING: &str = r#"{"name":"m","parameters":["int"],"returns":"void"},
		{"name":"m","parameters":["java.lang.String"],"returns":"void"}"#;
	const STRING_THEN_INT: &str = r#"{"name":"m","parameters":["java.lang.String"],"returns":"void"},
		{"name":"m","parameters":["int"],"returns":"void"}"#;

	#[test]
	fn test_scalar_picks_first_primitive_like() {
		let (ns, svc) = svc(INT_THEN_STRING);
		assert_eq!(params(find_method(&ns, &svc, "m", &[json!(5)]).unwrap()), ["int"]);
	}

	#[test]
	fn test_scalar_skips_void_box() {
		let (ns, svc) = svc(
			r#"{"name":"m","parameters":["java.lang.Void"],"returns":"void"},
			{"name":"m","parameters":["int"],"returns":"void"}"#,
		);
		assert_eq!(params(find_method(&ns, &svc, "m", &[json!(5)]).unwrap()), ["int"]);
	}

	#[test]
	fn test_null_skips_to_reference_parameter() {
		let (ns, svc) = svc(STRING_THEN_INT);
		let found = find_method(&ns, &svc, "m", &[Value::Null]).unwrap();
		assert_eq!(params(found), ["java.lang.String"]);
	}

	#[test]
	fn test_null_for_primitive_fails_fast() {
		let (ns, svc) = svc(INT_THEN_STRING);
		let err = find_method(&ns, &svc, "m", &[Value::Null]).unwrap_err();
		assert!(matches!(err, Error::NullForPrimitive { position: 1, ref type_name } if type_name == "int"));
		assert_eq!(
			err.to_string(),
			"the type of No.1 parameter is primitive(int), but the value passed is null"
		);
	}

	#[test]
	fn test_single_candidate_skips_matching() {
		let (ns, svc) = svc(r#"{"name":"m","parameters":["int"],"returns":"void"}"#);
		assert_eq!(params(find_method(&ns, &svc, "m", &[Value::Null]).unwrap()), ["int"]);
	}

	#[test]
	fn test_arity_mismatch_finds_nothing() {
		let (ns, svc) = svc(r#"{"name":"m","parameters":["int","int"],"returns":"int"}"#);
		assert_eq!(find_method(&ns, &svc, "m", &[json!(1), json!(2), json!(3)]).unwrap(), None);
		assert_eq!(find_method(&ns, &svc, "other", &[json!(1), json!(2)]).unwrap(), None);
	}

	#[test]
	fn test_no_candidate_fits() {
		let (ns, svc) = svc(INT_THEN_STRING);
		assert_eq!(find_method(&ns, &svc, "m", &[json!({"a": 1})]).unwrap(), None);
	}

	#[test]
	fn test_object_uses_class_key() {
		let (ns, svc) = svc(
			r#"{"name":"draw","parameters":["java.util.Map"],"returns":"void"},
			{"name":"draw","parameters":["com.acme.Shape"],"returns":"void"}"#,
		);
		let plain = find_method(&ns, &svc, "draw", &[json!({"r": 1})]).unwrap();
		assert_eq!(params(plain), ["java.util.Map"]);

		let typed = find_method(&ns, &svc, "draw", &[json!({"class": "com.acme.Circle", "r": 1})]).unwrap();
		assert_eq!(params(typed), ["com.acme.Shape"]);

		let blank = find_method(&ns, &svc, "draw", &[json!({"class": ""})]).unwrap();
		assert_eq!(params(blank), ["java.util.Map"]);
	}

	#[test]
	fn test_unknown_class_key_is_type_not_found() {
		let (ns, svc) = svc(
			r#"{"name":"draw","parameters":["java.util.Map"],"returns":"void"},
			{"name":"draw","parameters":["com.acme.Shape"],"returns":"void"}"#,
		);
		let err = find_method(&ns, &svc, "draw", &[json!({"class": "com.acme.Hexagon"})]).unwrap_err();
		assert!(matches!(err, Error::TypeNotFound(name) if name == "com.acme.Hexagon"));
	}

	#[test]
	fn test_array_matches_array_or_collection() {
		let (ns, svc) = svc(
			r#"{"name":"sum","parameters":["java.lang.String"],"returns":"long"},
			{"name":"sum","parameters":["int[]"],"returns":"long"},
			{"name":"sum","parameters":["java.util.List"],"returns":"long"}"#,
		);
		assert_eq!(params(find_method(&ns, &svc, "sum", &[json!([1, 2])]).unwrap()), ["int[]"]);

		let (ns, svc) = self::svc(
			r#"{"name":"sum","parameters":["java.util.Set"],"returns":"long"},
			{"name":"sum","parameters":["java.util.Collection"],"returns":"long"}"#,
		);
		assert_eq!(
			params(find_method(&ns, &svc, "sum", &[json!([1, 2])]).unwrap()),
			["java.util.Collection"]
		);
	}

	#[test]
	fn test_demo_unit_catalog() {
		let json = gprobe_demo_unit::CATALOG.trim_end_matches('\0');
		let unit = LoadedUnit {
			path: PathBuf::from("calc-api-1.0.0.so"),
			types: TypeCatalog::from_json(json).unwrap().types,
			library: None,
		};
		let ns = Namespace::layered(Namespace::ambient(), vec![unit]);
		let calc = ns.resolve("com.acme.Calc").unwrap();

		assert_eq!(params(find_method(&ns, &calc, "add", &[json!(1.5), json!(2)]).unwrap()), ["int", "int"]);
		assert_eq!(params(find_method(&ns, &calc, "sum", &[json!([1, 2])]).unwrap()), ["int[]"]);
		assert_eq!(
			params(find_method(&ns, &calc, "describe", &[json!({"class": "com.acme.Fraction"})]).unwrap()),
			["com.acme.Operand"]
		);
		assert!(ns.is_assignable(&TypeRef::named("java.io.Serializable"), &TypeRef::named("com.acme.Fraction")));
	}

	#[test]
	fn test_runtime_types() {
		let name = |v: Value| runtime_type(&v).map(|t| t.to_string());
		assert_eq!(name(json!(5)).as_deref(), Some("java.lang.Integer"));
		assert_eq!(name(json!(5_000_000_000_i64)).as_deref(), Some("java.lang.Long"));
		assert_eq!(name(json!(u64::MAX)).as_deref(), Some("java.math.BigInteger"));
		assert_eq!(name(json!(1.5)).as_deref(), Some("java.lang.Double"));
		assert_eq!(name(json!("x")).as_deref(), Some("java.lang.String"));
		assert_eq!(name(json!(true)).as_deref(), Some("java.lang.Boolean"));
		assert_eq!(name(json!([])).as_deref(), Some("java.util.ArrayList"));
		assert_eq!(name(json!({})).as_deref(), Some("java.util.LinkedHashMap"));
		assert_eq!(name(Value::Null), None);
	}
}
