//! Sun/Solaris capability sections.
//!
//! A capabilities section is a Null-terminated run of (tag, value)
//! records. Software capabilities decode the same way everywhere;
//! hardware capabilities are defined per machine, and only for i386 and
//! SPARC.

use std::io::{Read, Seek};

use crate::header::{Layout, Machine};
use crate::value::elf_values;
use crate::{ElfError, ElfResult};

elf_values! {
    /// Capability record tags.
    pub enum CapabilityTag(u64) {
        Null = 0, "NULL", "End of capabilities";
        Hardware1 = 1, "HW_1", "Hardware capabilities";
        Software1 = 2, "SF_1", "Software capabilities";
    }
}

elf_values! {
    /// Software capability bits.
    pub enum SoftwareCap(u64) {
        FramePointerKnown = 0x0001, "FPKNWN", "Frame pointer use is known";
        FramePointerUsed = 0x0002, "FPUSED", "Frame pointer is used";
    }
}

elf_values! {
    /// SPARC hardware capability bits.
    pub enum SparcHardwareCap(u64) {
        Mul32 = 0x0001, "MUL32", "Uses 32x32-bit smul/umul";
        Div32 = 0x0002, "DIV32", "Uses 32x32-bit sdiv/udiv";
        Fsmuld = 0x0004, "FSMULD", "Uses fsmuld instruction";
        V8Plus = 0x0008, "V8PLUS", "Uses V9 intructins in 32-bit apps";
        Popc = 0x0010, "POPC", "Uses popc instruction";
        Vis = 0x0020, "VIS", "Uses VIS instruction set";
        Vis2 = 0x0040, "VIS2", "Uses VIS2 instruction set";
        AsiBlkInit = 0x0080, "ASI_BLK_INIT", "Uses ASI block initialization";
        Fmaf = 0x0100, "FMAF", "Uses Fused Multiply-Add";
        FjFmau = 0x0200, "FJFMAU", "Uses Fujitsu Unfused Multiply-Add";
        Ima = 0x0400, "IMA", "Uses Integer Multiply-Add";
    }
}

elf_values! {
    /// i386 hardware capability bits.
    pub enum I386HardwareCap(u64) {
        Fpu = 0x0000_0001, "FPU", "Uses x87-style floating point";
        Tsc = 0x0000_0002, "TSC", "Uses rdtsc instruction";
        Cx8 = 0x0000_0004, "CX8", "Uses cmpxchg8b instruction";
        Sep = 0x0000_0008, "SEP", "Uses sysenter/sysexit instructions";
        AmdSysC = 0x0000_0010, "AMD_SYSC", "Uses AMD's syscall/sysret instructions";
        CMov = 0x0000_0020, "CMOV", "Uses conditional move instructions";
        Mmx = 0x0000_0040, "MMX", "Uses MMX instruction set";
        AmdMmx = 0x0000_0080, "AMD_MMX", "Uses AMD's MMX instruction set";
        Amd3DNow = 0x0000_0100, "AMD_3DNOW", "Uses AMD's 3DNow! instruction set";
        Amd3DNowX = 0x0000_0200, "AMD_3DNOWX", "Uses AMD's 3DNow! extended instruction set";
        Fxsr = 0x0000_0400, "FXSR", "Uses fxsave/fxrstor instructions";
        Sse = 0x0000_0800, "SSE", "Uses SSE instruction set and registers";
        Sse2 = 0x0000_1000, "SSE2", "Uses SSE2 instruction set and registers";
        Pause = 0x0000_2000, "PAUSE", "Uses pause instruction";
        Sse3 = 0x0000_4000, "SSE3", "Uses SSE3 instruction set and registers";
        Mon = 0x0000_8000, "MON", "Uses monitor/mwait instructions";
        Cx16 = 0x0001_0000, "CX16", "Uses cmpxchg16b instruction";
        Ahf = 0x0002_0000, "AHF", "Uses lahf/sahf instructions";
        Tscp = 0x0004_0000, "TSCP", "Uses rdtscp instruction";
        AmdSse4a = 0x0008_0000, "AMD_SSE4A", "Uses AMD's SSEA4a instructions";
        PopCnt = 0x0010_0000, "POPCNT", "Uses popcnt instruction";
        AmdLzcnt = 0x0020_0000, "AMD_LZCNT", "Uses AMD's lzcnt instructon";
        Ssse3 = 0x0040_0000, "SSSE3", "Uses Intel's SSSE3 instruction set";
        Sse4_1 = 0x0080_0000, "SSE4_1", "Uses Intel's SSE4.1 instruction set";
        Sse4_2 = 0x0100_0000, "SSE4_2", "uses Intel's SSE4.2 instruction set";
    }
}

/// One decoded capability record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub tag: CapabilityTag,
    /// Raw capability word.
    pub value: u64,
    /// Descriptions of the set, known bits.
    pub flags: Vec<&'static str>,
}

fn software_flags(value: u64) -> Vec<&'static str> {
    SoftwareCap::ALL
        .iter()
        .filter(|f| value & f.raw() == f.raw())
        .map(|f| f.desc())
        .collect()
}

fn hardware_flags(value: u64, machine: Machine) -> ElfResult<Vec<&'static str>> {
    match machine {
        Machine::Sparc | Machine::Sparc32Plus | Machine::SparcV9 => Ok(SparcHardwareCap::ALL
            .iter()
            .filter(|f| value & f.raw() == f.raw())
            .map(|f| f.desc())
            .collect()),
        Machine::I386 => Ok(I386HardwareCap::ALL
            .iter()
            .filter(|f| value & f.raw() == f.raw())
            .map(|f| f.desc())
            .collect()),
        other => Err(ElfError::UnsupportedCapabilityMachine(
            other.desc().to_owned(),
        )),
    }
}

/// Read capability records until the Null terminator (excluded).
pub fn read_capabilities<R: Read + Seek>(
    r: &mut R,
    layout: Layout,
    machine: Machine,
) -> ElfResult<Vec<Capability>> {
    let mut entries = Vec::new();
    loop {
        let raw_tag = layout.read_xword_or_word(r)?;
        let tag = CapabilityTag::from_raw(raw_tag).ok_or_else(|| ElfError::OutOfBound {
            domain: "capability tag",
            value: raw_tag,
            context: String::new(),
        })?;

        if tag == CapabilityTag::Null {
            break;
        }

        let value = layout.read_xword_or_word(r)?;
        let flags = match tag {
            CapabilityTag::Software1 => software_flags(value),
            CapabilityTag::Hardware1 => hardware_flags(value, machine)?,
            CapabilityTag::Null => unreachable!("terminator handled above"),
        };

        entries.push(Capability { tag, value, flags });
    }
    Ok(entries)
}
