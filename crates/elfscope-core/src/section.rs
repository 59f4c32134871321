//! Section descriptors, type dispatch and materialized sections.
//!
//! The section-header table is read eagerly into cheap [`SectionHeader`]
//! descriptors; payloads decode on demand into [`SectionData`], picked by
//! [`SectionKind::resolve`]. Type resolution is two-tiered: explicit
//! tables for assigned values, tolerated tagged cases for the reserved
//! OS-, processor- and application-specific ranges.

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use crate::dynamic::DynamicEntry;
use crate::gnu::{VersionDef, VersionNeed};
use crate::header::{Layout, Machine, OsAbi};
use crate::strtab::StringTable;
use crate::sunw::Capability;
use crate::symbol::SymbolTable;
use crate::value::{elf_values, range_desc};
use crate::{ElfError, ElfResult};

// Reserved section indexes (SHN_*): these never name a real descriptor.
pub const SHN_UNDEF: u16 = 0;
pub const SHN_LORESERVE: u16 = 0xff00;
pub const SHN_ABS: u16 = 0xfff1;
pub const SHN_COMMON: u16 = 0xfff2;
pub const SHN_XINDEX: u16 = 0xffff;
pub const SHN_HIRESERVE: u16 = 0xffff;

elf_values! {
    /// Assigned section types, including the Checksum value that lives
    /// inside the OS-specific range.
    pub enum SectionType(u32) {
        Null = 0, "NULL", "Unused";
        ProgBits = 1, "PROGBITS", "Program data";
        SymTab = 2, "SYMTAB", "Symbol table";
        StrTab = 3, "STRTAB", "String table";
        RelA = 4, "RELA", "Relocation entries with addends";
        Hash = 5, "HASH", "Symbol hash table";
        Dynamic = 6, "DYNAMIC", "Dynamic linking information";
        Note = 7, "NOTE", "Notes";
        NoBits = 8, "NOBITS", "Program space with no data (bss)";
        Rel = 9, "REL", "Relocation entries, no addends";
        ShLib = 10, "SHLIB", "Reserved";
        DynSym = 11, "DYNSYM", "Dynamic linker symbol table";
        InitArray = 14, "INIT_ARRAY", "Array of constructors";
        FiniArray = 15, "FINI_ARRAY", "Array of destructors";
        PreinitArray = 16, "PREINIT_ARRAY", "Array of pre-constructors";
        Group = 17, "GROUP", "Section group";
        SymTabShndx = 18, "SYMTAB_SHNDX", "Extended section indeces";
        Checksum = 0x6ffffff8, "CHECKSUM", "Checksum for DSO content";
    }
}

elf_values! {
    /// GNU-specific section types; generally emitted for glibc-based
    /// systems using GNU binutils, but other OSes use them too.
    pub enum GnuSectionType(u32) {
        Hash = 0x6ffffff6, "GNU_HASH", "GNU-style hash table";
        Liblist = 0x6ffffff7, "GNU_LIBLIST", "Prelink library list";
        VerDef = 0x6ffffffd, "GNU_VERDEF", "Version definition section";
        VerNeed = 0x6ffffffe, "GNU_VERNEED", "Version needs section";
        VerSym = 0x6fffffff, "GNU_VERSYM", "Version symbol table";
    }
}

elf_values! {
    /// Sun-specific section types (subrange 0x6ffffff1..=0x6fffffff).
    pub enum SunWSectionType(u32) {
        SymSort = 0x6ffffff1, "SUNW_SYMSORT", "Sorted symbol index";
        TlsSort = 0x6ffffff2, "SUNW_TLSSORT", "Sorted TLS symbol index";
        LDynSym = 0x6ffffff3, "SUNW_LDYNSYM", "Local dynamic symbol table";
        Dof = 0x6ffffff4, "SUNW_DOF", "DTrace object format";
        Cap = 0x6ffffff5, "SUNW_CAP", "Software/Hardware Capabilities";
        Signature = 0x6ffffff6, "SUNW_SIGNATURE", "Signature block";
        Annotate = 0x6ffffff7, "SUNW_ANNOTATE", "Annotation section";
        DebugStr = 0x6ffffff8, "SUNW_DEBUGSTR", "Debug string table";
        Debug = 0x6ffffff9, "SUNW_DEBUG", "Debug information";
        Move = 0x6ffffffa, "SUNW_MOVE", "Partially initialized object move table";
        ComDat = 0x6ffffffb, "SUNW_COMDAT", "COMDAT section";
        SymInfo = 0x6ffffffc, "SUNW_SYMINFO", "Symbol information";
        VerDef = 0x6ffffffd, "SUNW_VERDEF", "Version definition section";
        VerNeed = 0x6ffffffe, "SUNW_VERNEED", "Version needs section";
        VerSym = 0x6fffffff, "SUNW_VERSYM", "Version symbol table";
    }
}

elf_values! {
    /// ARM processor-specific section types.
    pub enum ProcArmSectionType(u32) {
        ArmAttributes = 0x70000003, "ARM_ATTRIBUTES", "ARM Attributes";
    }
}

/// Section flags as a bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionFlags(pub u64);

impl SectionFlags {
    /// Writable
    pub const WRITE: u64 = 0x0000_0001;
    /// Allocated
    pub const ALLOC: u64 = 0x0000_0002;
    /// Executable
    pub const EXECINSTR: u64 = 0x0000_0004;
    /// Mergeable
    pub const MERGE: u64 = 0x0000_0010;
    /// Contains null-terminated strings
    pub const STRINGS: u64 = 0x0000_0020;
    /// sh_info contains SHT index
    pub const INFO_LINK: u64 = 0x0000_0040;
    /// Preserve order after combining
    pub const LINK_ORDER: u64 = 0x0000_0080;
    /// Non-standard OS specific handling required
    pub const OS_NONCONFORMING: u64 = 0x0000_0100;
    /// Section is member of a group
    pub const GROUP: u64 = 0x0000_0200;
    /// Section holds thread-local data
    pub const TLS: u64 = 0x0000_0400;
    /// Special ordering requirement
    pub const ORDERED: u64 = 0x4000_0000;
    /// Section is excluded unless referenced or allocated
    pub const EXCLUDE: u64 = 0x8000_0000;
    /// OS-specific flags mask
    pub const MASK_OS: u64 = 0x0ff0_0000;
    /// Processor-specific flags mask
    pub const MASK_PROC: u64 = 0xf000_0000;

    const NAMED: &'static [(u64, &'static str)] = &[
        (Self::WRITE, "Writable"),
        (Self::ALLOC, "Allocated"),
        (Self::EXECINSTR, "Executable"),
        (Self::MERGE, "Mergeable"),
        (Self::STRINGS, "Contains null-terminated strings"),
        (Self::INFO_LINK, "sh_info contains SHT index"),
        (Self::LINK_ORDER, "Preserve order after combining"),
        (Self::OS_NONCONFORMING, "Non-standard OS specific handling required"),
        (Self::GROUP, "Section is member of a group"),
        (Self::TLS, "Section hold thread-local data"),
        (Self::ORDERED, "Special ordering requirement"),
        (Self::EXCLUDE, "Section is excluded unless referenced or allocated"),
    ];

    pub fn contains(self, flag: u64) -> bool {
        self.0 & flag == flag
    }

    pub fn is_writable(self) -> bool {
        self.contains(Self::WRITE)
    }

    pub fn is_allocated(self) -> bool {
        self.contains(Self::ALLOC)
    }

    pub fn is_executable(self) -> bool {
        self.contains(Self::EXECINSTR)
    }

    pub fn is_tls(self) -> bool {
        self.contains(Self::TLS)
    }

    /// Descriptions of every set named flag.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|&(_, name)| name)
            .collect()
    }
}

/// Resolved section type: an entry from one of the explicit tables, or a
/// tolerated placeholder for values inside a reserved range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Standard(SectionType),
    Gnu(GnuSectionType),
    SunW(SunWSectionType),
    ProcArm(ProcArmSectionType),
    /// In 0x60000000..=0x6fffffff but in no table.
    OsSpecific(u32),
    /// In 0x70000000..=0x7fffffff but in no table.
    ProcSpecific(u32),
    /// In 0x80000000..=0x8fffffff but in no table.
    UserSpecific(u32),
}

impl SectionKind {
    /// OS-specific type range
    pub const LO_OS: u32 = 0x6000_0000;
    pub const HI_OS: u32 = 0x6fff_ffff;
    /// Sun-specific subrange of the OS range
    pub const LO_SUNW: u32 = 0x6fff_fff1;
    pub const HI_SUNW: u32 = 0x6fff_ffff;
    /// Processor-specific type range
    pub const LO_PROC: u32 = 0x7000_0000;
    pub const HI_PROC: u32 = 0x7fff_ffff;
    /// Application-specific type range
    pub const LO_USER: u32 = 0x8000_0000;
    pub const HI_USER: u32 = 0x8fff_ffff;

    /// Determine the concrete type for a raw section type id.
    ///
    /// Processor-range ids dispatch on the file's machine (only ARM has
    /// its own table). OS-range ids dispatch on the section name prefix or
    /// the declared ABI — real binaries frequently mislabel their ABI, so
    /// the name is consulted too — then fall back to the standard table,
    /// then to a tolerated placeholder. `name` is `None` when the file has
    /// no string table; `index` only labels errors.
    ///
    /// # Errors
    ///
    /// [`ElfError::UnknownSectionType`] for a value in no table and no
    /// tolerated range, or missing from an explicitly selected vendor
    /// table.
    pub fn resolve(
        type_id: u32,
        machine: Machine,
        abi: OsAbi,
        name: Option<&str>,
        index: usize,
    ) -> ElfResult<Self> {
        let label = || name.map_or_else(|| format!("#{index}"), str::to_owned);

        if (Self::LO_PROC..=Self::HI_PROC).contains(&type_id) {
            return match machine {
                Machine::Arm => ProcArmSectionType::from_raw(type_id)
                    .map(Self::ProcArm)
                    .ok_or_else(|| ElfError::UnknownSectionType {
                        type_id,
                        name: label(),
                    }),
                _ => Ok(SectionType::from_raw(type_id)
                    .map_or(Self::ProcSpecific(type_id), Self::Standard)),
            };
        }

        if (Self::LO_OS..=Self::HI_OS).contains(&type_id) {
            let named = |prefix: &str| name.is_some_and(|n| n.starts_with(prefix));
            if abi == OsAbi::Solaris || named(".SUNW_") {
                return SunWSectionType::from_raw(type_id)
                    .map(Self::SunW)
                    .ok_or_else(|| ElfError::UnknownSectionType {
                        type_id,
                        name: label(),
                    });
            }
            if abi == OsAbi::Linux || named(".gnu.") {
                return GnuSectionType::from_raw(type_id)
                    .map(Self::Gnu)
                    .ok_or_else(|| ElfError::UnknownSectionType {
                        type_id,
                        name: label(),
                    });
            }
            return Ok(SectionType::from_raw(type_id)
                .map_or(Self::OsSpecific(type_id), Self::Standard));
        }

        if (Self::LO_USER..=Self::HI_USER).contains(&type_id) {
            return Ok(SectionType::from_raw(type_id)
                .map_or(Self::UserSpecific(type_id), Self::Standard));
        }

        SectionType::from_raw(type_id)
            .map(Self::Standard)
            .ok_or_else(|| ElfError::UnknownSectionType {
                type_id,
                name: label(),
            })
    }

    /// Raw numeric type id.
    pub const fn raw(self) -> u32 {
        match self {
            Self::Standard(t) => t.raw(),
            Self::Gnu(t) => t.raw(),
            Self::SunW(t) => t.raw(),
            Self::ProcArm(t) => t.raw(),
            Self::OsSpecific(v) | Self::ProcSpecific(v) | Self::UserSpecific(v) => v,
        }
    }

    /// Description; placeholders format as `BASE+hexoffset`.
    pub fn describe(self) -> String {
        match self {
            Self::Standard(t) => t.desc().to_owned(),
            Self::Gnu(t) => t.desc().to_owned(),
            Self::SunW(t) => t.desc().to_owned(),
            Self::ProcArm(t) => t.desc().to_owned(),
            Self::OsSpecific(v) => {
                range_desc("SHT_LOOS", u64::from(v), u64::from(Self::LO_OS))
            }
            Self::ProcSpecific(v) => {
                range_desc("SHT_LOPROC", u64::from(v), u64::from(Self::LO_PROC))
            }
            Self::UserSpecific(v) => {
                range_desc("SHT_LOUSER", u64::from(v), u64::from(Self::LO_USER))
            }
        }
    }
}

/// Raw section descriptor, captured eagerly for every section at file-open
/// time. Payload decoding happens separately and at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    /// Position in the section-header table.
    pub index: usize,
    /// Name offset into the section-name string table.
    pub name_index: u32,
    /// Resolved name; `None` when the file has no string table.
    pub name: Option<String>,
    pub type_id: u32,
    pub flags: SectionFlags,
    pub addr: u64,
    pub offset: u64,
    pub size: u64,
    pub link: u32,
    pub info: u32,
    pub addralign: u64,
    pub entsize: u64,
}

impl SectionHeader {
    /// Read one descriptor; assumes the cursor sits at the start of a
    /// section-header-table entry and leaves it at the next.
    pub fn read<R: Read + Seek>(r: &mut R, layout: Layout, index: usize) -> ElfResult<Self> {
        Ok(Self {
            index,
            name_index: layout.read_word(r)?,
            name: None,
            type_id: layout.read_word(r)?,
            flags: SectionFlags(layout.read_xword_or_word(r)?),
            addr: layout.read_addr(r)?,
            offset: layout.read_off(r)?,
            size: layout.read_xword_or_word(r)?,
            link: layout.read_word(r)?,
            info: layout.read_word(r)?,
            addralign: layout.read_xword_or_word(r)?,
            entsize: layout.read_xword_or_word(r)?,
        })
    }

    /// Name, or `#index` for files without a string table.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("#{}", self.index))
    }

    /// Number of fixed-stride entries held by this section.
    ///
    /// # Errors
    ///
    /// [`ElfError::MisalignedEntries`] when the size is not an exact
    /// multiple of the entry size, or the entry size is zero.
    pub fn entry_count(&self) -> ElfResult<u64> {
        if self.entsize == 0 || self.size % self.entsize != 0 {
            return Err(ElfError::MisalignedEntries {
                section: self.display_name(),
                size: self.size,
                entry_size: self.entsize,
            });
        }
        Ok(self.size / self.entsize)
    }
}

/// Decoded payload of a section.
#[derive(Debug, Clone)]
pub enum SectionData {
    /// Raw bytes (also the shape of NoBits sections, with no content).
    Raw(Vec<u8>),
    Strings(StringTable),
    Symbols(SymbolTable),
    Dynamic(Vec<DynamicEntry>),
    /// Parallel `.gnu.version` half-word array.
    VersionSymbols(Vec<u16>),
    /// Version definitions keyed by version index.
    VersionDefs(BTreeMap<u16, VersionDef>),
    /// Version needs keyed by version index.
    VersionNeeds(BTreeMap<u16, VersionNeed>),
    Capabilities(Vec<Capability>),
}

/// A section: its descriptor, resolved type, and decoded payload.
#[derive(Debug, Clone)]
pub struct Section {
    pub header: SectionHeader,
    pub kind: SectionKind,
    pub data: SectionData,
}

impl Section {
    pub fn index(&self) -> usize {
        self.header.index
    }

    pub fn name(&self) -> Option<&str> {
        self.header.name.as_deref()
    }

    pub fn addr(&self) -> u64 {
        self.header.addr
    }

    pub fn size(&self) -> u64 {
        self.header.size
    }

    pub fn flags(&self) -> SectionFlags {
        self.header.flags
    }

    /// Index of the linked section (string table, symbol table, ...).
    pub fn link(&self) -> usize {
        self.header.link as usize
    }

    /// String-table payload, if this is a string table.
    pub fn strings(&self) -> Option<&StringTable> {
        match &self.data {
            SectionData::Strings(t) => Some(t),
            _ => None,
        }
    }

    /// Symbol-table payload, if this is a symbol table.
    pub fn symbols(&self) -> Option<&SymbolTable> {
        match &self.data {
            SectionData::Symbols(t) => Some(t),
            _ => None,
        }
    }

    /// Dynamic entries, if this is the dynamic section.
    pub fn dynamic_entries(&self) -> Option<&[DynamicEntry]> {
        match &self.data {
            SectionData::Dynamic(e) => Some(e),
            _ => None,
        }
    }

    /// Version-symbol array, if this is a `.gnu.version` section.
    pub fn version_symbols(&self) -> Option<&[u16]> {
        match &self.data {
            SectionData::VersionSymbols(v) => Some(v),
            _ => None,
        }
    }

    /// Version definitions, if this is a `.gnu.version_d` section.
    pub fn version_defs(&self) -> Option<&BTreeMap<u16, VersionDef>> {
        match &self.data {
            SectionData::VersionDefs(m) => Some(m),
            _ => None,
        }
    }

    /// Version needs, if this is a `.gnu.version_r` section.
    pub fn version_needs(&self) -> Option<&BTreeMap<u16, VersionNeed>> {
        match &self.data {
            SectionData::VersionNeeds(m) => Some(m),
            _ => None,
        }
    }

    /// Capability entries, if this is a Sun capabilities section.
    pub fn capabilities(&self) -> Option<&[Capability]> {
        match &self.data {
            SectionData::Capabilities(c) => Some(c),
            _ => None,
        }
    }

    /// One-letter nm classification of symbols defined in this section:
    /// 'T' for executable sections, 'B' for NoBits, 'R' for `.rodata*`.
    /// `None` feeds the symbol-level `UnknownNmCode` error.
    pub fn nm_letter(&self) -> Option<char> {
        section_nm_letter(&self.header)
    }
}

impl PartialEq for Section {
    /// Two sections are the same iff they sit at the same table index and
    /// address; with memoized decoding this is reference identity within
    /// one file.
    fn eq(&self, other: &Self) -> bool {
        self.header.index == other.header.index && self.header.addr == other.header.addr
    }
}

/// nm letter for a section known only by its descriptor.
pub(crate) fn section_nm_letter(header: &SectionHeader) -> Option<char> {
    if header.flags.is_executable() {
        return Some('T');
    }
    if header.type_id == SectionType::NoBits.raw() {
        return Some('B');
    }
    if header.name.as_deref().is_some_and(|n| n.starts_with(".rodata")) {
        return Some('R');
    }
    None
}
