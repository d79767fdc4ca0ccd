//! C ABI for gprobe interface units.
//!
//! A unit is a shared library exporting [`GPROBE_UNIT_ENTRY`]. The host calls
//! the entry point once per load with an out-pointer; the unit fills in its
//! ABI version and a NUL-terminated JSON type catalog that must stay valid for
//! as long as the library remains loaded.

use core::ffi::c_char;

/// Current unit ABI version.
pub const GPROBE_UNIT_ABI_VERSION: u32 = 1;

/// Symbol name of the unit entry point, NUL-terminated for `dlsym`.
pub const GPROBE_UNIT_ENTRY: &[u8] = b"gprobe_unit_entry\0";

/// Status returned by a unit entry point.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GprobeStatus {
	Ok = 0,
	Failed = 1,
	Incompatible = 2,
}

/// Descriptor written by the unit.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GprobeUnitV1 {
	pub abi_version: u32,
	/// Static JSON type catalog owned by the unit.
	pub catalog_json: *const c_char,
}

/// Signature of [`GPROBE_UNIT_ENTRY`].
pub type GprobeUnitEntryV1 = unsafe extern "C" fn(out_unit: *mut GprobeUnitV1) -> GprobeStatus;
