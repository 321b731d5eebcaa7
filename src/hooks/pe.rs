//! Module for locating import address table slots of a module mapped into
//! the current process

use crate::error::HookError;
use std::ffi::CStr;

/// `MZ` signature at the start of every image
const DOS_SIGNATURE: u16 = 0x5A4D;
/// `PE\0\0` signature at the start of the NT headers
const NT_SIGNATURE: u32 = 0x0000_4550;
/// Offset of `e_lfanew` within the DOS header
const NT_HEADERS_OFFSET: usize = 0x3C;
/// Size of the signature and `IMAGE_FILE_HEADER` preceding the optional header
const OPTIONAL_HEADER_OFFSET: usize = 4 + 20;

/// Optional header magic for images matching the process pointer width
#[cfg(target_pointer_width = "64")]
const NATIVE_MAGIC: u16 = 0x20B;
#[cfg(target_pointer_width = "32")]
const NATIVE_MAGIC: u16 = 0x10B;

/// Offset of `NumberOfRvaAndSizes` within the optional header
#[cfg(target_pointer_width = "64")]
const RVA_COUNT_OFFSET: usize = 108;
#[cfg(target_pointer_width = "32")]
const RVA_COUNT_OFFSET: usize = 92;

/// Offset of the data directories within the optional header
const DATA_DIRECTORIES_OFFSET: usize = RVA_COUNT_OFFSET + 4;
/// Index of the import directory in the data directories
const IMPORT_DIRECTORY: usize = 1;
/// Size of one `IMAGE_DATA_DIRECTORY`
const DATA_DIRECTORY_SIZE: usize = 8;

/// Set on lookup entries that import by ordinal
const ORDINAL_FLAG: usize = 1 << (usize::BITS - 1);
/// Bits of a lookup entry holding the `IMAGE_IMPORT_BY_NAME` RVA
const NAME_RVA_MASK: usize = 0x7FFF_FFFF;

/// `IMAGE_IMPORT_DESCRIPTOR`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
#[allow(dead_code)]
struct ImportDescriptor {
    original_first_thunk: u32,
    time_date_stamp: u32,
    forwarder_chain: u32,
    name: u32,
    first_thunk: u32,
}

/// Import table of a mapped module
pub struct ImportTable {
    base: *const u8,
    descriptors: *const ImportDescriptor,
}

/// Address table entry bound to an imported function
#[derive(Debug)]
pub struct ImportSlot {
    /// Name of the library the function is imported from
    pub library: String,
    /// The slot the module calls through
    pub slot: *mut usize,
}

/// Reads a `T` at `offset` bytes past `base`
#[inline]
unsafe fn read<T: Copy>(base: *const u8, offset: usize) -> T {
    base.add(offset).cast::<T>().read_unaligned()
}

impl ImportTable {
    /// Validates the headers of the module mapped at `base` and locates its
    /// import descriptors
    ///
    /// ## Safety
    ///
    /// `base` must point to the start of an image mapped by the loader (or an
    /// equivalent in-memory layout) that stays mapped while the table is used
    pub unsafe fn from_module(base: *const u8) -> Result<Self, HookError> {
        if base.is_null() {
            return Err(HookError::InvalidImage("module base is null"));
        }

        if read::<u16>(base, 0) != DOS_SIGNATURE {
            return Err(HookError::InvalidImage("missing DOS signature"));
        }

        let nt_headers = read::<u32>(base, NT_HEADERS_OFFSET) as usize;
        if read::<u32>(base, nt_headers) != NT_SIGNATURE {
            return Err(HookError::InvalidImage("missing NT signature"));
        }

        let optional_header = nt_headers + OPTIONAL_HEADER_OFFSET;
        if read::<u16>(base, optional_header) != NATIVE_MAGIC {
            return Err(HookError::InvalidImage(
                "image architecture does not match the process",
            ));
        }

        let directory_count = read::<u32>(base, optional_header + RVA_COUNT_OFFSET) as usize;
        if directory_count <= IMPORT_DIRECTORY {
            return Err(HookError::InvalidImage("image has no import directory"));
        }

        let directory =
            optional_header + DATA_DIRECTORIES_OFFSET + IMPORT_DIRECTORY * DATA_DIRECTORY_SIZE;
        let rva = read::<u32>(base, directory) as usize;
        let size = read::<u32>(base, directory + 4);
        if rva == 0 || size == 0 {
            return Err(HookError::InvalidImage("image has no imports"));
        }

        Ok(Self {
            base,
            descriptors: base.add(rva).cast(),
        })
    }

    /// Finds the address table slot the module uses to call `symbol`,
    /// searching every imported library
    ///
    /// ## Safety
    ///
    /// The import directory must be well formed
    pub unsafe fn find_slot(&self, symbol: &str) -> Option<ImportSlot> {
        let mut descriptor = self.descriptors;

        loop {
            let entry = descriptor.read_unaligned();
            if entry.name == 0 && entry.first_thunk == 0 {
                return None;
            }

            // Bound address tables no longer hold names
            if entry.original_first_thunk != 0 {
                if let Some(index) = self.find_lookup_index(entry.original_first_thunk, symbol) {
                    let slot = self
                        .base
                        .add(entry.first_thunk as usize)
                        .cast::<usize>()
                        .add(index)
                        .cast_mut();

                    let library = CStr::from_ptr(self.base.add(entry.name as usize).cast())
                        .to_string_lossy()
                        .into_owned();

                    return Some(ImportSlot { library, slot });
                }
            }

            descriptor = descriptor.add(1);
        }
    }

    /// Index of the lookup entry importing `symbol` by name
    unsafe fn find_lookup_index(&self, lookup_rva: u32, symbol: &str) -> Option<usize> {
        let lookup = self.base.add(lookup_rva as usize).cast::<usize>();
        let mut index = 0;

        loop {
            let entry = lookup.add(index).read_unaligned();
            if entry == 0 {
                return None;
            }

            if entry & ORDINAL_FLAG == 0 {
                // IMAGE_IMPORT_BY_NAME: u16 hint then the name
                let name = CStr::from_ptr(self.base.add((entry & NAME_RVA_MASK) + 2).cast());
                if name.to_bytes() == symbol.as_bytes() {
                    return Some(index);
                }
            }

            index += 1;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::{
        test_image::{Import, Library, TestImage},
        ImportTable,
    };
    use crate::error::HookError;

    fn game_image() -> TestImage {
        TestImage::new(vec![
            Library::new(
                "KERNEL32.dll",
                vec![
                    Import::Named("GetModuleHandleW", 0x7000_1000),
                    Import::Ordinal(17),
                    Import::Named("ExitProcess", 0x7000_2000),
                ],
            ),
            Library::new(
                "UnityPlayer.dll",
                vec![Import::Ordinal(3), Import::Named("UnityMain", 0x6000_0100)],
            ),
        ])
    }

    #[test]
    fn finds_slot_across_libraries() {
        let image = game_image();
        let table = unsafe { ImportTable::from_module(image.base()) }.expect("Image should parse");

        let slot = unsafe { table.find_slot("UnityMain") }.expect("UnityMain is imported");
        assert_eq!(slot.library, "UnityPlayer.dll");
        assert_eq!(unsafe { *slot.slot }, 0x6000_0100);
        assert_eq!(image.slot(1, 1), 0x6000_0100);

        let slot = unsafe { table.find_slot("ExitProcess") }.expect("ExitProcess is imported");
        assert_eq!(slot.library, "KERNEL32.dll");
        assert_eq!(unsafe { *slot.slot }, 0x7000_2000);
    }

    #[test]
    fn missing_symbol_is_not_found() {
        let image = game_image();
        let table = unsafe { ImportTable::from_module(image.base()) }.expect("Image should parse");

        assert!(unsafe { table.find_slot("UnityMainEx") }.is_none());
        assert!(unsafe { table.find_slot("unitymain") }.is_none());
        assert!(unsafe { table.find_slot("") }.is_none());
    }

    #[test]
    fn descriptors_without_lookup_table_are_skipped() {
        let mut player = Library::new("UnityPlayer.dll", vec![Import::Named("UnityMain", 0x6000_0100)]);
        player.lookup = false;
        let image = TestImage::new(vec![player]);

        let table = unsafe { ImportTable::from_module(image.base()) }.expect("Image should parse");
        assert!(unsafe { table.find_slot("UnityMain") }.is_none());
    }

    #[test]
    fn rejects_corrupted_headers() {
        let mut image = game_image();
        image.write_bytes(0, b"ZM");
        assert!(matches!(
            unsafe { ImportTable::from_module(image.base()) },
            Err(HookError::InvalidImage("missing DOS signature"))
        ));

        let mut image = game_image();
        image.write_bytes(0x80, b"NE\0\0");
        assert!(matches!(
            unsafe { ImportTable::from_module(image.base()) },
            Err(HookError::InvalidImage("missing NT signature"))
        ));

        assert!(matches!(
            unsafe { ImportTable::from_module(std::ptr::null()) },
            Err(HookError::InvalidImage(_))
        ));
    }

    #[test]
    fn rejects_image_without_imports() {
        let image = TestImage::new(Vec::new());
        // The directory still spans the terminating descriptor
        assert!(unsafe { ImportTable::from_module(image.base()) }.is_ok());

        let mut image = TestImage::new(Vec::new());
        let directory = 0x80 + 24 + super::DATA_DIRECTORIES_OFFSET + super::DATA_DIRECTORY_SIZE;
        image.write_bytes(directory, &[0; 8]);
        assert!(matches!(
            unsafe { ImportTable::from_module(image.base()) },
            Err(HookError::InvalidImage("image has no imports"))
        ));
    }
}
