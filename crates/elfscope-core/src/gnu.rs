//! GNU symbol-versioning sections.
//!
//! `.gnu.version` is a flat half-word array parallel to the dynamic symbol
//! table. `.gnu.version_d` and `.gnu.version_r` are *not* flat arrays:
//! records chain through relative offsets (a zero "next" delta terminates
//! a chain), and each record carries its own chain of auxiliary entries.
//! The decode order below — in particular reading the version-need "more
//! records" word before entering the inner loop — is load-bearing and
//! mirrors the on-disk layout exactly.

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use crate::header::Layout;
use crate::reader::BytestreamRead;
use crate::strtab::StringTable;
use crate::{ElfError, ElfResult};

/// Version definition flag: the base version of the file itself.
pub const VER_FLG_BASE: u16 = 0x0001;
/// Version definition flag: weak version reference.
pub const VER_FLG_WEAK: u16 = 0x0002;
/// High bit of a versym entry: the association is hidden.
pub const VERSYM_HIDDEN: u16 = 0x8000;

/// One version defined (exported) by the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDef {
    pub flags: u16,
    /// Version index, the key used by versym entries.
    pub index: u16,
    pub hash: u32,
    /// First name is the version itself, the rest its predecessors.
    pub names: Vec<String>,
}

impl VersionDef {
    pub fn is_base(&self) -> bool {
        self.flags & VER_FLG_BASE != 0
    }

    /// The version's own name.
    pub fn name(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }
}

/// One version needed (imported) from another object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionNeed {
    /// Object the version is imported from.
    pub file: String,
    pub hash: u32,
    pub flags: u16,
    /// Bit 15 of the index half-word.
    pub hidden: bool,
    pub name: String,
}

/// Read the flat `.gnu.version` array.
pub fn read_versym<R: Read + Seek>(
    r: &mut R,
    layout: Layout,
    count: u64,
) -> ElfResult<Vec<u16>> {
    r.read_array_u16(layout.endian, count as usize)
}

/// Read a `.gnu.version_d` section starting at `base_offset`.
///
/// Records sit at absolute offsets: the first at the section base, each
/// next at the previous record's offset plus its next-record delta; a zero
/// delta terminates. `strtab` is the decoded section named by the verdef
/// section's link.
///
/// # Errors
///
/// [`ElfError::SymbolVersionUnknown`] on any record revision other than 1.
pub fn read_verdef<R: Read + Seek>(
    r: &mut R,
    layout: Layout,
    base_offset: u64,
    strtab: &StringTable,
) -> ElfResult<BTreeMap<u16, VersionDef>> {
    let mut defs = BTreeMap::new();
    let mut entry_off = base_offset;

    loop {
        r.seek_to(entry_off)?;

        let revision = layout.read_half(r)?;
        if revision != 1 {
            return Err(ElfError::SymbolVersionUnknown(revision));
        }
        let flags = layout.read_half(r)?;
        let index = layout.read_half(r)?;
        let aux_count = layout.read_half(r)?;
        let hash = layout.read_word(r)?;
        let mut name_off = entry_off + u64::from(layout.read_word(r)?);
        let next_entry = layout.read_word(r)?;

        let mut names = Vec::new();
        for _ in 0..aux_count {
            r.seek_to(name_off)?;
            names.push(strtab.get(u64::from(layout.read_word(r)?))?);
            let next_name = layout.read_word(r)?;
            if next_name == 0 {
                break;
            }
            name_off += u64::from(next_name);
        }

        defs.insert(index, VersionDef { flags, index, hash, names });

        if next_entry == 0 {
            break;
        }
        entry_off += u64::from(next_entry);
    }

    Ok(defs)
}

/// Read a `.gnu.version_r` section from the cursor's current position.
///
/// Outer records are read sequentially; the aux-offset word is discarded
/// (auxiliary entries follow their record directly) and the outer
/// continuation flag comes from the next-record word read *before* the
/// inner loop. Inner entries terminate on their own zero next-delta.
/// Entries key by the versym index with the hidden bit cleared.
///
/// # Errors
///
/// [`ElfError::SymbolVersionUnknown`] on any record revision other than 1.
pub fn read_verneed<R: Read + Seek>(
    r: &mut R,
    layout: Layout,
    strtab: &StringTable,
) -> ElfResult<BTreeMap<u16, VersionNeed>> {
    let mut needs = BTreeMap::new();

    loop {
        let revision = layout.read_half(r)?;
        if revision != 1 {
            return Err(ElfError::SymbolVersionUnknown(revision));
        }
        let aux_count = layout.read_half(r)?;
        let file = strtab.get(u64::from(layout.read_word(r)?))?;
        // Aux offset; only interesting for non-sequential reading.
        let _ = layout.read_word(r)?;
        let more = layout.read_word(r)? != 0;

        for _ in 0..aux_count {
            let hash = layout.read_word(r)?;
            let flags = layout.read_half(r)?;

            let tmp = layout.read_half(r)?;
            let hidden = tmp & VERSYM_HIDDEN != 0;
            let index = tmp & !VERSYM_HIDDEN;

            let name = strtab.get(u64::from(layout.read_word(r)?))?;

            needs.insert(
                index,
                VersionNeed {
                    file: file.clone(),
                    hash,
                    flags,
                    hidden,
                    name,
                },
            );

            if layout.read_word(r)? == 0 {
                break;
            }
        }

        if !more {
            break;
        }
    }

    Ok(needs)
}

/// Version associated with one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolVersion {
    /// Version defined (exported) by this file.
    Defined { name: String },
    /// Version needed (imported) from another object.
    Needed {
        file: String,
        name: String,
        hidden: bool,
    },
}

impl SymbolVersion {
    pub fn name(&self) -> &str {
        match self {
            Self::Defined { name } | Self::Needed { name, .. } => name,
        }
    }
}
