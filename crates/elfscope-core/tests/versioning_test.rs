//! GNU symbol-versioning: chained-record decoding and per-symbol routing.

mod common;

use std::io::Cursor;

use common::{ElfBuilder, SectionSpec, strtab};
use elfscope_core::section::SectionFlags;
use elfscope_core::{ElfError, ElfFile, SymbolVersion, elf_hash};

/// A shared object with two defined versions (indices 2 and 3), two
/// needed versions (indices 2 and 3, the latter hidden), and a versym
/// array exercising every routing case: [0, 1, 2, 3, 0x8002, 0x8003].
fn versioned_so() -> Vec<u8> {
    let mut b = ElfBuilder::le64().file_type(3);

    let text = b.section(
        SectionSpec::new(".text", 1, vec![0x90; 8])
            .flags(SectionFlags::ALLOC | SectionFlags::EXECINSTR)
            .addr(0x1000),
    );
    let bss = b.section(
        SectionSpec::new(".bss", 8, Vec::new())
            .flags(SectionFlags::ALLOC | SectionFlags::WRITE)
            .addr(0x2000)
            .no_content(16),
    );

    let (dynstr_blob, offs) = strtab(&[
        "libx.so.1",   // 0: base version name
        "XVER_1.0",    // 1
        "XVER_1.1",    // 2
        "libdep.so.2", // 3: needed file
        "DEP_2.0",     // 4
        "DEP_2.1",     // 5
        "s_none",      // 6: symbol names...
        "s_base",      // 7
        "s_def0",      // 8
        "s_def1",      // 9
        "s_need0",     // 10
        "s_need1",     // 11
        "s_abs",       // 12
        "s_bss",       // 13
    ]);

    // .dynsym mirrors the versym array below, index for index.
    let dynsym_data = {
        let mut e = b.emit();
        e.symbol(0, 0, 0, 0, 0, 0);
        e.symbol(offs[7], 0x12, 0, text as u16, 0x1000, 0); // s_base
        e.symbol(offs[8], 0x12, 0, text as u16, 0x1004, 0); // s_def0
        e.symbol(offs[9], 0x12, 0, text as u16, 0x1006, 0); // s_def1
        e.symbol(offs[10], 0x12, 0, 0, 0, 0); // s_need0, imported
        e.symbol(offs[11], 0x12, 0, 0, 0, 0); // s_need1, imported
        e.symbol(offs[12], 0x11, 0, 0xfff1, 0x42, 0); // s_abs, absolute object
        e.symbol(offs[13], 0x11, 0, bss as u16, 0x2000, 8); // s_bss
        e.finish()
    };
    // .dynsym lands at index 3, .dynstr right after it at 4.
    let dynsym = b.section(
        SectionSpec::new(".dynsym", 11, dynsym_data)
            .link(4)
            .entsize(24),
    );
    let dynstr = b.section(SectionSpec::new(".dynstr", 3, dynstr_blob));

    // versym: one half-word per dynsym entry.
    let versym_data = {
        let mut e = b.emit();
        for v in [0u16, 1, 2, 3, 0x8002, 0x8003, 2, 2] {
            e.u16(v);
        }
        e.finish()
    };
    b.section(
        SectionSpec::new(".gnu.version", 0x6fff_ffff, versym_data)
            .link(dynsym)
            .entsize(2),
    );

    // .gnu.version_d: two chained records, aux arrays right behind each
    // record, next-record deltas [28, 0].
    let verdef_data = {
        let mut e = b.emit();
        // index 2: one name
        e.u16(1); // revision
        e.u16(0); // flags
        e.u16(2); // index
        e.u16(1); // aux count
        e.u32(elf_hash(b"XVER_1.0"));
        e.u32(20); // first aux delta
        e.u32(28); // next record delta
        e.u32(offs[1]); // "XVER_1.0"
        e.u32(0);
        // index 3: two names (own + parent)
        e.u16(1);
        e.u16(0);
        e.u16(3);
        e.u16(2);
        e.u32(elf_hash(b"XVER_1.1"));
        e.u32(20);
        e.u32(0); // chain ends
        e.u32(offs[2]); // "XVER_1.1"
        e.u32(8);
        e.u32(offs[1]); // parent "XVER_1.0"
        e.u32(0);
        e.finish()
    };
    b.section(
        SectionSpec::new(".gnu.version_d", 0x6fff_fffd, verdef_data).link(dynstr),
    );

    // .gnu.version_r: one file record with two aux entries.
    let verneed_data = {
        let mut e = b.emit();
        e.u16(1); // revision
        e.u16(2); // aux count
        e.u32(offs[3]); // file "libdep.so.2"
        e.u32(16); // aux offset (sequential anyway)
        e.u32(0); // no more records
        // aux: index 2
        e.u32(elf_hash(b"DEP_2.0"));
        e.u16(0);
        e.u16(2);
        e.u32(offs[4]);
        e.u32(16);
        // aux: index 3, hidden
        e.u32(elf_hash(b"DEP_2.1"));
        e.u16(0);
        e.u16(0x8003);
        e.u32(offs[5]);
        e.u32(0);
        e.finish()
    };
    b.section(
        SectionSpec::new(".gnu.version_r", 0x6fff_fffe, verneed_data).link(dynstr),
    );

    b.build()
}

#[test]
fn verdef_chain_decodes_exactly_two_records() {
    let mut f = ElfFile::parse(Cursor::new(versioned_so())).unwrap();
    let defs = f
        .section_by_name(".gnu.version_d")
        .unwrap()
        .version_defs()
        .unwrap();

    assert_eq!(defs.len(), 2);
    assert_eq!(defs[&2].names, vec!["XVER_1.0".to_string()]);
    assert_eq!(
        defs[&3].names,
        vec!["XVER_1.1".to_string(), "XVER_1.0".to_string()]
    );
    assert_eq!(defs[&3].hash, elf_hash(b"XVER_1.1"));
}

#[test]
fn verneed_decodes_both_aux_entries() {
    let mut f = ElfFile::parse(Cursor::new(versioned_so())).unwrap();
    let needs = f
        .section_by_name(".gnu.version_r")
        .unwrap()
        .version_needs()
        .unwrap();

    assert_eq!(needs.len(), 2);
    assert_eq!(needs[&2].file, "libdep.so.2");
    assert_eq!(needs[&2].name, "DEP_2.0");
    assert!(!needs[&2].hidden);
    assert_eq!(needs[&3].name, "DEP_2.1");
    assert!(needs[&3].hidden);
}

#[test]
fn versym_routing_covers_all_index_shapes() {
    let mut f = ElfFile::parse(Cursor::new(versioned_so())).unwrap();
    let symbols: Vec<_> = f
        .section_by_name(".dynsym")
        .unwrap()
        .symbols()
        .unwrap()
        .iter()
        .cloned()
        .collect();

    // Index 0: no version.
    assert_eq!(f.symbol_version(&symbols[0]).unwrap(), None);
    // Index 1: base version, still "no version" to callers.
    assert_eq!(f.symbol_version(&symbols[1]).unwrap(), None);
    // Index 2, high bit clear: defined version, base name.
    assert_eq!(
        f.symbol_version(&symbols[2]).unwrap(),
        Some(SymbolVersion::Defined { name: "XVER_1.0".into() })
    );
    // Index 3, high bit clear: defined version.
    assert_eq!(
        f.symbol_version(&symbols[3]).unwrap(),
        Some(SymbolVersion::Defined { name: "XVER_1.1".into() })
    );
    // 0x8002: needed version via the cleared index.
    assert_eq!(
        f.symbol_version(&symbols[4]).unwrap(),
        Some(SymbolVersion::Needed {
            file: "libdep.so.2".into(),
            name: "DEP_2.0".into(),
            hidden: true,
        })
    );
    // 0x8003: needed version.
    assert_eq!(
        f.symbol_version(&symbols[5]).unwrap(),
        Some(SymbolVersion::Needed {
            file: "libdep.so.2".into(),
            name: "DEP_2.1".into(),
            hidden: true,
        })
    );
    // Absolute symbols never carry a version, whatever versym says.
    assert_eq!(f.symbol_version(&symbols[6]).unwrap(), None);
    // Neither do symbols living in .bss.
    assert_eq!(f.symbol_version(&symbols[7]).unwrap(), None);
}

#[test]
fn file_without_versym_reports_no_versions() {
    let mut b = ElfBuilder::le64();
    let text = b.section(SectionSpec::new(".text", 1, vec![0; 4]));
    let (strtab_blob, offs) = strtab(&["f"]);
    let symtab_data = {
        let mut e = b.emit();
        e.symbol(0, 0, 0, 0, 0, 0);
        e.symbol(offs[0], 0x12, 0, text as u16, 0, 0);
        e.finish()
    };
    b.section(SectionSpec::new(".symtab", 2, symtab_data).link(3).entsize(24));
    b.section(SectionSpec::new(".strtab", 3, strtab_blob));

    let mut f = ElfFile::parse(Cursor::new(b.build())).unwrap();
    let sym = f
        .section_by_name(".symtab")
        .unwrap()
        .symbols()
        .unwrap()
        .get(1)
        .unwrap()
        .clone();
    assert_eq!(f.symbol_version(&sym).unwrap(), None);
}

#[test]
fn bad_verdef_revision_fails_decode() {
    let mut b = ElfBuilder::le64();
    let verdef_data = {
        let mut e = b.emit();
        e.u16(7); // bad revision
        e.u16(0);
        e.u16(2);
        e.u16(0);
        e.u32(0);
        e.u32(20);
        e.u32(0);
        e.finish()
    };
    b.section(SectionSpec::new(".gnu.version_d", 0x6fff_fffd, verdef_data).link(2));
    b.section(SectionSpec::new(".dynstr", 3, vec![0]));

    let mut f = ElfFile::parse(Cursor::new(b.build())).unwrap();
    assert!(matches!(
        f.section_by_name(".gnu.version_d"),
        Err(ElfError::SymbolVersionUnknown(7))
    ));
}
