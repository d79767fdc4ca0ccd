use std::ffi::CStr;
use std::mem::MaybeUninit;
use std::path::Path;

use gprobe_unit_abi::{GPROBE_UNIT_ABI_VERSION, GPROBE_UNIT_ENTRY, GprobeStatus, GprobeUnitEntryV1, GprobeUnitV1};
use libloading::{Library, Symbol};

use super::UnitLoader;
use crate::namespace::LoadedUnit;
use crate::types::TypeCatalog;
use crate::{Error, Result};

/// Loads units built as shared libraries exporting `gprobe_unit_entry`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SharedLibraryLoader;

impl UnitLoader for SharedLibraryLoader {
	fn load(&self, path: &Path) -> Result<LoadedUnit> {
		let failure = |reason: String| Error::LoadFailure {
			path: path.to_path_buf(),
			reason,
		};

		// SAFETY: loading runs the unit's initializers; units are trusted
		// artifacts resolved from the configured repository.
		let lib = unsafe { Library::new(path) }.map_err(|e| failure(e.to_string()))?;

		let catalog = unsafe {
			let entry: Symbol<GprobeUnitEntryV1> = lib.get(GPROBE_UNIT_ENTRY).map_err(|e| failure(e.to_string()))?;

			let mut unit = MaybeUninit::<GprobeUnitV1>::uninit();
			let status = entry(unit.as_mut_ptr());
			if status != GprobeStatus::Ok {
				return Err(failure(format!("entry point returned {status:?}")));
			}
			let unit = unit.assume_init();

			if unit.abi_version != GPROBE_UNIT_ABI_VERSION {
				return Err(failure(format!(
					"ABI mismatch: expected {GPROBE_UNIT_ABI_VERSION}, got {}",
					unit.abi_version
				)));
			}
			if unit.catalog_json.is_null() {
				return Err(failure("unit published no type catalog".to_string()));
			}

			let json = CStr::from_ptr(unit.catalog_json)
				.to_str()
				.map_err(|e| failure(format!("catalog is not UTF-8: {e}")))?;
			TypeCatalog::from_json(json).map_err(|e| failure(format!("invalid catalog: {e}")))?
		};

		Ok(LoadedUnit {
			path: path.to_path_buf(),
			types: catalog.types,
			library: Some(lib),
		})
	}
}
