//! Normalization of generic invocation replies against a declared return type.

use serde_json::{Map, Number, Value};

use crate::overload::CLASS_KEY;
use crate::types::{Primitive, TypeRef};

const MAP_TYPES: &[&str] = &[
	"java.util.Map",
	"java.util.HashMap",
	"java.util.LinkedHashMap",
	"java.util.TreeMap",
	"java.util.SortedMap",
	"java.util.concurrent.ConcurrentHashMap",
];

/// Shapes `value` into the plain data tree `ty` describes.
///
/// Values that cannot be coerced are passed through unchanged.
pub fn realize(value: Value, ty: &TypeRef) -> Value {
	if value.is_null() {
		return value;
	}
	match ty {
		TypeRef::Primitive(p) => realize_primitive(value, *p),
		TypeRef::Array(component) => realize_elements(value, component),
		TypeRef::Named(name) => match Primitive::from_boxed(name) {
			Some(p) => realize_primitive(value, p),
			None => realize_named(value, name),
		},
	}
}

fn realize_primitive(value: Value, p: Primitive) -> Value {
	match p {
		Primitive::Void => Value::Null,
		Primitive::Boolean => to_bool(value),
		Primitive::Char => to_string(value),
		p if p.is_integral() => to_integer(value),
		_ => to_float(value),
	}
}

fn realize_named(value: Value, name: &str) -> Value {
	match name {
		"java.lang.String" => to_string(value),
		"java.math.BigInteger" => to_integer(value),
		"java.math.BigDecimal" => to_float(value),
		name if MAP_TYPES.contains(&name) => match value {
			Value::Object(fields) => Value::Object(fields.into_iter().map(|(k, v)| (k, realize_object(v))).collect()),
			other => other,
		},
		_ => realize_object(value),
	}
}

fn realize_elements(value: Value, component: &TypeRef) -> Value {
	match value {
		Value::Array(items) => Value::Array(items.into_iter().map(|v| realize(v, component)).collect()),
		other => other,
	}
}

/// Drops the generic type marker from every object in the tree.
fn realize_object(value: Value) -> Value {
	match value {
		Value::Object(fields) => Value::Object(
			fields
				.into_iter()
				.filter(|(k, _)| k != CLASS_KEY)
				.map(|(k, v)| (k, realize_object(v)))
				.collect::<Map<_, _>>(),
		),
		Value::Array(items) => Value::Array(items.into_iter().map(realize_object).collect()),
		other => other,
	}
}

fn to_integer(value: Value) -> Value {
	match value {
		Value::Number(n) if n.is_f64() => n
			.as_f64()
			.map(|f| Value::from(f.trunc() as i64))
			.unwrap_or(Value::Number(n)),
		Value::String(s) => match s.trim().parse::<i64>() {
			Ok(i) => Value::from(i),
			Err(_) => Value::String(s),
		},
		other => other,
	}
}

fn to_float(value: Value) -> Value {
	match value {
		Value::Number(n) => n
			.as_f64()
			.and_then(Number::from_f64)
			.map(Value::Number)
			.unwrap_or(Value::Number(n)),
		Value::String(s) => match s.trim().parse::<f64>().ok().and_then(Number::from_f64) {
			Some(n) => Value::Number(n),
			None => Value::String(s),
		},
		other => other,
	}
}

fn to_bool(value: Value) -> Value {
	match value {
		Value::String(s) => match s.trim() {
			"true" => Value::Bool(true),
			"false" => Value::Bool(false),
			_ => Value::String(s),
		},
		other => other,
	}
}

fn to_string(value: Value) -> Value {
	match value {
		Value::Number(n) => Value::String(n.to_string()),
		Value::Bool(b) => Value::String(b.to_string()),
		other => other,
	}
}
