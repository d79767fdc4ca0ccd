//! Minimal example gprobe unit describing a calculator service.
//!
//! Build with `cargo build -p gprobe-demo-unit`, then publish the resulting
//! shared library as `calc-api-1.0.0` under the local repository path for
//! `com.acme:calc-api:1.0.0`.

use core::ffi::c_char;

use gprobe_unit_abi::{GPROBE_UNIT_ABI_VERSION, GprobeStatus, GprobeUnitV1};

/// Type catalog published by this unit.
pub const CATALOG: &str = concat!(
	r#"{"types":[
	{"name":"com.acme.Calc","kind":"interface","methods":[
		{"name":"add","parameters":["int","int"],"returns":"int"},
		{"name":"add","parameters":["double","double"],"returns":"double"},
		{"name":"sum","parameters":["int[]"],"returns":"long"},
		{"name":"describe","parameters":["com.acme.Operand"],"returns":"java.lang.String"},
		{"name":"history","parameters":[],"returns":"java.util.List"}
	]},
	{"name":"com.acme.Operand","kind":"class","supertypes":["java.io.Serializable"],"methods":[]},
	{"name":"com.acme.Fraction","kind":"class","supertypes":["com.acme.Operand"],"methods":[]}
]}"#,
	"\0"
);

#[unsafe(no_mangle)]
/// # Safety
/// `out_unit` must be non-null and valid for writes for the duration of this call.
pub unsafe extern "C" fn gprobe_unit_entry(out_unit: *mut GprobeUnitV1) -> GprobeStatus {
	if out_unit.is_null() {
		return GprobeStatus::Failed;
	}

	unsafe {
		*out_unit = GprobeUnitV1 {
			abi_version: GPROBE_UNIT_ABI_VERSION,
			catalog_json: CATALOG.as_ptr() as *const c_char,
		};
	}
	GprobeStatus::Ok
}
