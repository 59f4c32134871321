//! Dynamic-section decoding.
//!
//! The `.dynamic` section is a run of (tag, value) pairs, both at address
//! width, terminated by a Null tag. What a value *means* — nothing, a
//! plain scalar, or a virtual address — is a fixed per-tag policy; a few
//! tags additionally resolve into strings, a timestamp, or the section
//! living at the stored address.

use std::io::{Read, Seek};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::header::Layout;
use crate::section::SectionHeader;
use crate::strtab::StringTable;
use crate::value::{elf_values, range_desc};
use crate::{ElfError, ElfResult};

elf_values! {
    /// Assigned dynamic-entry tags.
    pub enum DynamicTag(i64) {
        Null = 0, "NULL", "NULL";
        Needed = 1, "NEEDED", "NEEDED";
        PltRelSz = 2, "PLTRELSZ", "PLTRELSZ";
        PltGot = 3, "PLTGOT", "PLTGOT";
        Hash = 4, "HASH", "HASH";
        StrTab = 5, "STRTAB", "STRTAB";
        SymTab = 6, "SYMTAB", "SYMTAB";
        RelA = 7, "RELA", "RELA";
        RelASz = 8, "RELASZ", "RELASZ";
        RelAEnt = 9, "RELAENT", "RELAENT";
        StrSz = 10, "STRSZ", "STRSZ";
        SymEnt = 11, "SYMENT", "SYMENT";
        Init = 12, "INIT", "INIT";
        Fini = 13, "FINI", "FINI";
        SoName = 14, "SONAME", "SONAME";
        RPath = 15, "RPATH", "RPATH";
        Symbolic = 16, "SYMBOLIC", "SYMBOLIC";
        Rel = 17, "REL", "REL";
        RelSz = 18, "RELSZ", "RELSZ";
        RelEnt = 19, "RELENT", "RELENT";
        PltRel = 20, "PLTREL", "PLTREL";
        Debug = 21, "DEBUG", "DEBUG";
        TextRel = 22, "TEXTREL", "TEXTREL";
        JmpRel = 23, "JMPREL", "JMPREL";
        BindNow = 24, "BINDNOW", "BINDNOW";
        InitArray = 25, "INIT_ARRAY", "INIT_ARRAY";
        FiniArray = 26, "FINI_ARRAY", "FINI_ARRAY";
        InitArraySz = 27, "INIT_ARRAYSZ", "INIT_ARRAYSZ";
        FiniArraySz = 28, "FINI_ARRAYSZ", "FINI_ARRAYSZ";
        RunPath = 29, "RUNPATH", "RUNPATH";
        Flags = 30, "FLAGS", "FLAGS";
        PreinitArray = 32, "PREINIT_ARRAY", "PREINIT_ARRAY";
        PreinitArraySz = 33, "PREINIT_ARRAYSZ", "PREINIT_ARRAYSZ";
        // DT_VAL* block
        GnuPrelinked = 0x6ffffdf5, "GNU_PRELINKED", "GNU_PRELINKED";
        GnuConflictSz = 0x6ffffdf6, "GNU_CONFLICTSZ", "GNU_CONFLICTSZ";
        GnuLibListSz = 0x6ffffdf7, "GNU_LIBLISTSZ", "GNU_LIBLISTSZ";
        CheckSum = 0x6ffffdf8, "CHECKSUM", "CHECKSUM";
        PltPadSz = 0x6ffffdf9, "PLTPADSZ", "PLTPADSZ";
        MoveEnt = 0x6ffffdfa, "MOVENT", "MOVENT";
        MoveSz = 0x6ffffdfb, "MOVESZ", "MOVESZ";
        Feature1 = 0x6ffffdfc, "FEATURE_1", "FEATURE_1";
        PosFlag1 = 0x6ffffdfd, "POSFLAG_1", "POSFLAG_1";
        SymInSz = 0x6ffffdfe, "SYMINSZ", "SYMINSZ";
        SymInEnt = 0x6ffffdff, "SYMINENT", "SYMINENT";
        // DT_ADDR* block
        GnuHash = 0x6ffffef5, "GNU_HASH", "GNU_HASH";
        TlsDescPlt = 0x6ffffef6, "TLSDESC_PLT", "TLSDESC_PLT";
        TlsDescGot = 0x6ffffef7, "TLSDESC_GOT", "TLSDESC_GOT";
        GnuConflict = 0x6ffffef8, "GNU_CONFLICT", "GNU_CONFLICT";
        GnuLibList = 0x6ffffef9, "GNU_LIBLIST", "GNU_LIBLIST";
        Config = 0x6ffffefa, "CONFIG", "CONFIG";
        DepAudit = 0x6ffffefb, "DEPAUDIT", "DEPAUDIT";
        PltPad = 0x6ffffefc, "PLTPAD", "PLTPAD";
        MoveTab = 0x6ffffefd, "MOVETAB", "MOVETAB";
        SymInfo = 0x6ffffeff, "SYMINFO", "SYMINFO";
        VerSym = 0x6ffffff0, "VERSYM", "VERSYM";
        RelACount = 0x6ffffff9, "RELACOUNT", "RELACOUNT";
        RelCount = 0x6ffffffa, "RELCOUNT", "RELCOUNT";
        // Sun extensions
        Flags1 = 0x6ffffffb, "FLAGS_1", "FLAGS_1";
        VerDef = 0x6ffffffc, "VERDEF", "VERDEF";
        VerDefNum = 0x6ffffffd, "VERDEFNUM", "VERDEFNUM";
        VerNeed = 0x6ffffffe, "VERNEED", "VERNEED";
        VerNeedNum = 0x6fffffff, "VERNEEDNUM", "VERNEEDNUM";
    }
}

/// How the raw value of a tag is to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagAttribute {
    /// Value carries no meaning here.
    Ignore,
    /// Plain scalar.
    Value,
    /// Virtual address.
    Address,
}

impl DynamicTag {
    /// Static per-tag value classification.
    pub const fn attribute(self) -> TagAttribute {
        use DynamicTag::*;
        match self {
            Null | PltGot | Symbolic | Debug | TextRel | BindNow | VerSym => TagAttribute::Ignore,
            Hash | StrTab | SymTab | RelA | Init | Fini | Rel | JmpRel | InitArray | FiniArray
            | PreinitArray | GnuHash | TlsDescPlt | TlsDescGot | GnuConflict | GnuLibList
            | Config | DepAudit | PltPad | MoveTab | SymInfo | VerDef | VerNeed => {
                TagAttribute::Address
            }
            _ => TagAttribute::Value,
        }
    }
}

/// Resolved tag: an assigned one, or a tolerated reserved-range value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicTagKind {
    Known(DynamicTag),
    /// In 0x6000000d..=0x6ffff000 but in no table.
    OsSpecific(i64),
    /// In 0x70000000..=0x7fffffff but in no table.
    ProcSpecific(i64),
}

impl DynamicTagKind {
    /// OS-specific tag range
    pub const LO_OS: i64 = 0x6000_000d;
    pub const HI_OS: i64 = 0x6fff_f000;
    /// Processor-specific tag range
    pub const LO_PROC: i64 = 0x7000_0000;
    pub const HI_PROC: i64 = 0x7fff_ffff;

    /// Resolve a raw tag.
    ///
    /// # Errors
    ///
    /// [`ElfError::OutOfBound`] for a tag in no table and no range.
    pub fn resolve(raw: i64) -> ElfResult<Self> {
        if (Self::LO_OS..=Self::HI_OS).contains(&raw) {
            return Ok(DynamicTag::from_raw(raw).map_or(Self::OsSpecific(raw), Self::Known));
        }
        if (Self::LO_PROC..=Self::HI_PROC).contains(&raw) {
            return Ok(DynamicTag::from_raw(raw).map_or(Self::ProcSpecific(raw), Self::Known));
        }
        DynamicTag::from_raw(raw)
            .map(Self::Known)
            .ok_or_else(|| ElfError::OutOfBound {
                domain: "dynamic tag",
                value: raw as u64,
                context: String::new(),
            })
    }

    /// Value classification; reserved-range tags default to plain scalar.
    pub const fn attribute(self) -> TagAttribute {
        match self {
            Self::Known(tag) => tag.attribute(),
            Self::OsSpecific(_) | Self::ProcSpecific(_) => TagAttribute::Value,
        }
    }

    pub fn describe(self) -> String {
        match self {
            Self::Known(tag) => tag.desc().to_owned(),
            Self::OsSpecific(v) => range_desc("DT_LOOS", v as u64, Self::LO_OS as u64),
            Self::ProcSpecific(v) => range_desc("DT_LOPROC", v as u64, Self::LO_PROC as u64),
        }
    }
}

/// Interpreted payload of the tags that carry more than a scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DynamicValue {
    /// `.dynstr` entry (Needed, SoName, RPath, RunPath).
    String(String),
    /// Unix timestamp (GnuPrelinked).
    Timestamp(SystemTime),
    /// Index of the section whose address matches the value.
    SectionIndex(usize),
}

/// One dynamic-section entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicEntry {
    pub tag: DynamicTagKind,
    pub value: u64,
    pub parsed: Option<DynamicValue>,
}

fn parse_value(
    tag: DynamicTagKind,
    value: u64,
    dynstr: Option<&StringTable>,
    descriptors: &[SectionHeader],
) -> ElfResult<Option<DynamicValue>> {
    use DynamicTag::*;
    let DynamicTagKind::Known(tag) = tag else {
        return Ok(None);
    };
    match tag {
        Needed | SoName | RPath | RunPath => dynstr
            .map(|t| t.get(value).map(DynamicValue::String))
            .transpose(),
        GnuPrelinked => Ok(Some(DynamicValue::Timestamp(
            UNIX_EPOCH + Duration::from_secs(value),
        ))),
        Hash | StrTab | SymTab | Init | Fini | GnuHash => Ok(descriptors
            .iter()
            .find(|h| h.addr == value)
            .map(|h| DynamicValue::SectionIndex(h.index))),
        _ => Ok(None),
    }
}

/// Read up to `count` entries, stopping right after the Null terminator.
///
/// `dynstr` must be the already-decoded `.dynstr` table when the file has
/// one; string-valued tags stay unparsed without it.
pub fn read_entries<R: Read + Seek>(
    r: &mut R,
    layout: Layout,
    count: u64,
    dynstr: Option<&StringTable>,
    descriptors: &[SectionHeader],
) -> ElfResult<Vec<DynamicEntry>> {
    let mut entries = Vec::new();
    for _ in 0..count {
        let raw_tag = layout.read_sxword_or_sword(r)?;
        let tag = DynamicTagKind::resolve(raw_tag)?;
        let value = layout.read_addr(r)?;
        let parsed = parse_value(tag, value, dynstr, descriptors)?;
        entries.push(DynamicEntry { tag, value, parsed });

        // Entries after the terminator are not decoded.
        if tag == DynamicTagKind::Known(DynamicTag::Null) {
            break;
        }
    }
    Ok(entries)
}

/// DT_FLAGS bits.
pub mod flags {
    pub const ORIGIN: u64 = 0x0000_0001;
    pub const SYMBOLIC: u64 = 0x0000_0002;
    pub const TEXTREL: u64 = 0x0000_0004;
    pub const BIND_NOW: u64 = 0x0000_0008;
    pub const STATIC_TLS: u64 = 0x0000_0010;
}

/// DT_FLAGS_1 bits.
pub mod flags1 {
    pub const NOW: u64 = 0x0000_0001;
    pub const GLOBAL: u64 = 0x0000_0002;
    pub const GROUP: u64 = 0x0000_0004;
    pub const NODELETE: u64 = 0x0000_0008;
    pub const LOADFLTR: u64 = 0x0000_0010;
    pub const INITFIRST: u64 = 0x0000_0020;
    pub const NOOPEN: u64 = 0x0000_0040;
    pub const ORIGIN: u64 = 0x0000_0080;
    pub const DIRECT: u64 = 0x0000_0100;
    pub const TRANS: u64 = 0x0000_0200;
    pub const INTERPOSE: u64 = 0x0000_0400;
    pub const NODEFLIB: u64 = 0x0000_0800;
    pub const NODUMP: u64 = 0x0000_1000;
    pub const CONFALT: u64 = 0x0000_2000;
    pub const ENDFILTEE: u64 = 0x0000_4000;
    pub const DISPRELDNE: u64 = 0x0000_8000;
    pub const DISPRELPND: u64 = 0x0001_0000;
}

/// DT_FEATURE_1 bits.
pub mod features1 {
    pub const PARINIT: u64 = 0x0000_0001;
    pub const CONFEXP: u64 = 0x0000_0002;
}

/// DT_POSFLAG_1 bits.
pub mod posflags1 {
    pub const LAZYLOAD: u64 = 0x0000_0001;
    pub const GROUPPERM: u64 = 0x0000_0002;
}
