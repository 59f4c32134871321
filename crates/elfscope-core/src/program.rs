//! Program-header (segment) parsing.
//!
//! Like symbol entries, program headers differ structurally between
//! classes: the 64-bit layout moves the flags word up front, right after
//! the type.

use std::io::{Read, Seek};

use crate::header::{Class, Layout};
use crate::value::{elf_values, range_desc};
use crate::{ElfError, ElfResult};

elf_values! {
    /// Assigned segment types, including the GNU and Sun entries living in
    /// the OS-specific range.
    pub enum ProgramType(u32) {
        Null = 0, "NULL", "Unused entry";
        Load = 1, "LOAD", "Loadable segment";
        Dynamic = 2, "DYNAMIC", "Dynamic linking information";
        Interp = 3, "INTERP", "Interpreter path";
        Note = 4, "NOTE", "Auxiliary information";
        ShLib = 5, "SHLIB", "Reserved";
        Phdr = 6, "PHDR", "Program header table";
        Tls = 7, "TLS", "Thread-local storage template";
        GnuEhFrame = 0x6474_e550, "GNU_EH_FRAME", "GCC .eh_frame_hdr segment";
        GnuStack = 0x6474_e551, "GNU_STACK", "Stack executability";
        GnuRelro = 0x6474_e552, "GNU_RELRO", "Read-only after relocation";
        GnuProperty = 0x6474_e553, "GNU_PROPERTY", "GNU property";
        SunWBss = 0x6fff_fffa, "SUNWBSS", "Sun specific BSS segment";
        SunWStack = 0x6fff_fffb, "SUNWSTACK", "Sun stack segment";
    }
}

/// Resolved segment type, tolerating the reserved ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramKind {
    Known(ProgramType),
    /// In 0x60000000..=0x6fffffff but in no table.
    OsSpecific(u32),
    /// In 0x70000000..=0x7fffffff but in no table.
    ProcSpecific(u32),
}

impl ProgramKind {
    /// OS-specific segment type range
    pub const LO_OS: u32 = 0x6000_0000;
    pub const HI_OS: u32 = 0x6fff_ffff;
    /// Processor-specific segment type range
    pub const LO_PROC: u32 = 0x7000_0000;
    pub const HI_PROC: u32 = 0x7fff_ffff;

    /// Resolve a raw segment type.
    ///
    /// # Errors
    ///
    /// [`ElfError::OutOfBound`] for values in no table and no range.
    pub fn resolve(raw: u32) -> ElfResult<Self> {
        if (Self::LO_OS..=Self::HI_OS).contains(&raw) {
            return Ok(ProgramType::from_raw(raw).map_or(Self::OsSpecific(raw), Self::Known));
        }
        if (Self::LO_PROC..=Self::HI_PROC).contains(&raw) {
            return Ok(ProgramType::from_raw(raw).map_or(Self::ProcSpecific(raw), Self::Known));
        }
        ProgramType::from_raw(raw)
            .map(Self::Known)
            .ok_or_else(|| ElfError::OutOfBound {
                domain: "program header type",
                value: u64::from(raw),
                context: String::new(),
            })
    }

    pub fn describe(self) -> String {
        match self {
            Self::Known(t) => t.desc().to_owned(),
            Self::OsSpecific(v) => range_desc("PT_LOOS", u64::from(v), u64::from(Self::LO_OS)),
            Self::ProcSpecific(v) => {
                range_desc("PT_LOPROC", u64::from(v), u64::from(Self::LO_PROC))
            }
        }
    }
}

/// Segment permission flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgramFlags(pub u32);

impl ProgramFlags {
    /// Execute permission
    pub const X: u32 = 0x1;
    /// Write permission
    pub const W: u32 = 0x2;
    /// Read permission
    pub const R: u32 = 0x4;

    pub fn is_executable(self) -> bool {
        self.0 & Self::X != 0
    }

    pub fn is_writable(self) -> bool {
        self.0 & Self::W != 0
    }

    pub fn is_readable(self) -> bool {
        self.0 & Self::R != 0
    }
}

/// One program-header-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramHeader {
    /// Position in the program-header table.
    pub index: usize,
    pub kind: ProgramKind,
    pub flags: ProgramFlags,
    pub offset: u64,
    pub virtual_address: u64,
    pub physical_address: u64,
    pub file_size: u64,
    pub memory_size: u64,
    pub alignment: u64,
}

impl ProgramHeader {
    /// Read one entry; assumes the cursor sits at its start and leaves it
    /// at the next.
    pub fn read<R: Read + Seek>(r: &mut R, layout: Layout, index: usize) -> ElfResult<Self> {
        let kind = ProgramKind::resolve(layout.read_word(r)?)?;

        match layout.class {
            Class::Elf32 => {
                let offset = layout.read_off(r)?;
                let virtual_address = layout.read_addr(r)?;
                let physical_address = layout.read_addr(r)?;
                let file_size = layout.read_word(r)?.into();
                let memory_size = layout.read_word(r)?.into();
                let flags = ProgramFlags(layout.read_word(r)?);
                let alignment = layout.read_word(r)?.into();
                Ok(Self {
                    index,
                    kind,
                    flags,
                    offset,
                    virtual_address,
                    physical_address,
                    file_size,
                    memory_size,
                    alignment,
                })
            }
            Class::Elf64 => {
                let flags = ProgramFlags(layout.read_word(r)?);
                let offset = layout.read_off(r)?;
                let virtual_address = layout.read_addr(r)?;
                let physical_address = layout.read_addr(r)?;
                let file_size = layout.read_xword_or_word(r)?;
                let memory_size = layout.read_xword_or_word(r)?;
                let alignment = layout.read_xword_or_word(r)?;
                Ok(Self {
                    index,
                    kind,
                    flags,
                    offset,
                    virtual_address,
                    physical_address,
                    file_size,
                    memory_size,
                    alignment,
                })
            }
        }
    }

    pub fn is_load(&self) -> bool {
        self.kind == ProgramKind::Known(ProgramType::Load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Endian;
    use std::io::Cursor;

    #[test]
    fn test_read_64bit_flag_position() {
        let layout = Layout {
            class: Class::Elf64,
            endian: Endian::Little,
        };
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes()); // LOAD
        bytes.extend_from_slice(&5u32.to_le_bytes()); // flags R+X
        bytes.extend_from_slice(&0x1000u64.to_le_bytes()); // offset
        bytes.extend_from_slice(&0x401000u64.to_le_bytes()); // vaddr
        bytes.extend_from_slice(&0x401000u64.to_le_bytes()); // paddr
        bytes.extend_from_slice(&0x200u64.to_le_bytes()); // filesz
        bytes.extend_from_slice(&0x200u64.to_le_bytes()); // memsz
        bytes.extend_from_slice(&0x1000u64.to_le_bytes()); // align

        let mut c = Cursor::new(bytes);
        let ph = ProgramHeader::read(&mut c, layout, 0).unwrap();
        assert!(ph.is_load());
        assert!(ph.flags.is_readable());
        assert!(ph.flags.is_executable());
        assert!(!ph.flags.is_writable());
        assert_eq!(ph.virtual_address, 0x401000);
    }

    #[test]
    fn test_read_32bit_flag_position() {
        let layout = Layout {
            class: Class::Elf32,
            endian: Endian::Big,
        };
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u32.to_be_bytes()); // DYNAMIC
        bytes.extend_from_slice(&0x2000u32.to_be_bytes()); // offset
        bytes.extend_from_slice(&0x12000u32.to_be_bytes()); // vaddr
        bytes.extend_from_slice(&0x12000u32.to_be_bytes()); // paddr
        bytes.extend_from_slice(&0x100u32.to_be_bytes()); // filesz
        bytes.extend_from_slice(&0x100u32.to_be_bytes()); // memsz
        bytes.extend_from_slice(&6u32.to_be_bytes()); // flags R+W
        bytes.extend_from_slice(&4u32.to_be_bytes()); // align

        let mut c = Cursor::new(bytes);
        let ph = ProgramHeader::read(&mut c, layout, 1).unwrap();
        assert_eq!(ph.kind, ProgramKind::Known(ProgramType::Dynamic));
        assert!(ph.flags.is_writable());
        assert_eq!(ph.offset, 0x2000);
        assert_eq!(ph.alignment, 4);
    }

    #[test]
    fn test_type_ranges() {
        assert_eq!(
            ProgramKind::resolve(0x6474_e551).unwrap(),
            ProgramKind::Known(ProgramType::GnuStack)
        );
        let k = ProgramKind::resolve(0x6000_0007).unwrap();
        assert_eq!(k, ProgramKind::OsSpecific(0x6000_0007));
        assert_eq!(k.describe(), "PT_LOOS+0000007");
        assert!(ProgramKind::resolve(8).is_err());
    }
}
