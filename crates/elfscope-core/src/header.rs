//! ELF header decoding.
//!
//! The identification block fixes the class (field widths) and data
//! encoding (byte order) for everything that follows; both are captured in
//! a [`Layout`] chosen once here and threaded through every downstream
//! decoder.

use std::io::{Read, Seek};

use crate::reader::{BytestreamRead, Endian};
use crate::value::elf_values;
use crate::{ELF_MAGIC, EI_NIDENT, ElfError, ElfResult};

elf_values! {
    /// File class: 32- or 64-bit layouts.
    pub enum Class(u8) {
        Elf32 = 1, "ELF32", "32-bit";
        Elf64 = 2, "ELF64", "64-bit";
    }
}

elf_values! {
    /// Data encoding (byte order) of the file.
    pub enum DataEncoding(u8) {
        Lsb = 1, "LSB", "Little-endian";
        Msb = 2, "MSB", "Big-endian";
    }
}

impl DataEncoding {
    /// Cursor byte order declared by this encoding.
    pub const fn endian(self) -> Endian {
        match self {
            Self::Lsb => Endian::Little,
            Self::Msb => Endian::Big,
        }
    }
}

elf_values! {
    /// OS ABI identification.
    pub enum OsAbi(u8) {
        SysV = 0, "SYSV", "UNIX System V ABI";
        HpUx = 1, "HPUX", "HP-UX";
        NetBsd = 2, "NETBSD", "NetBSD";
        Linux = 3, "LINUX", "Linux";
        Solaris = 6, "SOLARIS", "Solaris";
        Aix = 7, "AIX", "IBM AIX";
        Irix = 8, "IRIX", "SGI Irix";
        FreeBsd = 9, "FREEBSD", "FreeBSD";
        Tru64 = 10, "TRU64", "Compaq TRU64 UNIX";
        Modesto = 11, "MODESTO", "Novell Modesto";
        OpenBsd = 12, "OPENBSD", "OpenBSD";
        Arm = 97, "ARM", "ARM";
        Standalone = 255, "STANDALONE", "Standalone (embedded) application";
    }
}

elf_values! {
    /// Machine architecture.
    pub enum Machine(u16) {
        None = 0, "NONE", "No machine";
        M32 = 1, "M32", "AT&T WE 32100";
        Sparc = 2, "SPARC", "SUN SPARC";
        I386 = 3, "386", "Intel 80386";
        M68k = 4, "68K", "Motorola m68k family";
        M88k = 5, "88K", "Motorola m88k family";
        M860 = 7, "860", "Intel 80860";
        Mips = 8, "MIPS", "MIPS R3000 big-endian";
        S370 = 9, "S370", "IBM System/370";
        MipsRs3Le = 10, "MIPS_RS3_LE", "MIPS R3000 little-endian";
        PaRisc = 15, "PARISC", "HPPA";
        Vpp500 = 17, "VPP500", "Fujitsu VPP500";
        Sparc32Plus = 18, "SPARC32PLUS", "Sun's \"v8plus\"";
        I960 = 19, "960", "Intel 80960";
        Ppc = 20, "PPC", "PowerPC";
        Ppc64 = 21, "PPC64", "PowerPC 64-bit";
        S390 = 22, "S390", "IBM S390";
        V800 = 36, "V800", "NEC V800 series";
        Fr20 = 37, "FR20", "Fujitsu FR20";
        Rh32 = 38, "RH32", "TRW RH-32";
        Rce = 39, "RCE", "Motorola RCE";
        Arm = 40, "ARM", "ARM";
        FakeAlpha = 41, "FAKE_ALPHA", "Digital Alpha";
        Sh = 42, "SH", "Hitachi SH";
        SparcV9 = 43, "SPARCV9", "SPARC v9 64-bit";
        Tricore = 44, "TRICORE", "Siemens Tricore";
        Arc = 45, "ARC", "Argonaut RISC Core";
        H8300 = 46, "H8_300", "Hitachi H8/300";
        H8300H = 47, "H8_300H", "Hitachi H8/300H";
        H8S = 48, "H8S", "Hitachi H8S";
        H8500 = 49, "H8_500", "Hitachi H8/500";
        Ia64 = 50, "IA_64", "Intel Merced";
        MipsX = 51, "MIPS_X", "Stanford MIPS-X";
        Coldfire = 52, "COLDFIRE", "Motorola Coldfire";
        M68Hc12 = 53, "68HC12", "Motorola M68HC12";
        Mma = 54, "MMA", "Fujitsu MMA Multimedia Accelerator";
        Pcp = 55, "PCP", "Siemens PCP";
        Ncpu = 56, "NCPU", "Sony nCPU embeeded RISC";
        Ndr1 = 57, "NDR1", "Denso NDR1 microprocessor";
        StarCore = 58, "STARCORE", "Motorola Start*Core processor";
        Me16 = 59, "ME16", "Toyota ME16 processor";
        St100 = 60, "ST100", "STMicroelectronic ST100 processor";
        Tinyj = 61, "TINYJ", "Advanced Logic Corp. Tinyj emb.fam";
        X8664 = 62, "X86_64", "AMD x86-64 architecture";
        Pdsp = 63, "PDSP", "Sony DSP Processor";
        Fx66 = 66, "FX66", "Siemens FX66 microcontroller";
        St9Plus = 67, "ST9PLUS", "STMicroelectronics ST9+ 8/16 mc";
        St7 = 68, "ST7", "STmicroelectronics ST7 8 bit mc";
        M68Hc16 = 69, "68HC16", "Motorola MC68HC16 microcontroller";
        M68Hc11 = 70, "68HC11", "Motorola MC68HC11 microcontroller";
        M68Hc08 = 71, "68HC08", "Motorola MC68HC08 microcontroller";
        M68Hc05 = 72, "68HC05", "Motorola MC68HC05 microcontroller";
        Svx = 73, "SVX", "Silicon Graphics SVx";
        St19 = 74, "ST19", "STMicroelectronics ST19 8 bit mc";
        Vax = 75, "VAX", "Digital VAX";
        Cris = 76, "CRIS", "Axis Communications 32-bit embedded processor";
        Javelin = 77, "JAVELIN", "Infineon Technologies 32-bit embedded processor";
        Firepath = 78, "FIREPATH", "Element 14 64-bit DSP Processor";
        Zsp = 79, "ZSP", "LSI Logic 16-bit DSP Processor";
        Mmix = 80, "MMIX", "Donald Knuth's educational 64-bit processor";
        Huany = 81, "HUANY", "Harvard University machine-independent object files";
        Prism = 82, "PRISM", "SiTera Prism";
        Avr = 83, "AVR", "Atmel AVR 8-bit microcontroller";
        Fr30 = 84, "FR30", "Fujitsu FR30";
        D10V = 85, "D10V", "Mitsubishi D10V";
        D30V = 86, "D30V", "Mitsubishi D30V";
        V850 = 87, "V850", "NEC v850";
        M32R = 88, "M32R", "Mitsubishi M32R";
        Mn10300 = 89, "MN10300", "Matsushita MN10300";
        Mn10200 = 90, "MN10200", "Matsushita MN10200";
        Pj = 91, "PJ", "picoJava";
        OpenRisc = 92, "OPENRISC", "OpenRISC 32-bit embedded processor";
        ArcA5 = 93, "ARC_A5", "ARC Cores Tangent-A5";
        Xtensa = 94, "XTENSA", "Tensilica Xtensa Architecture";
        AArch64 = 183, "AARCH64", "ARM AARCH64";
        RiscV = 243, "RISCV", "RISC-V";
        Alpha = 0x9026, "ALPHA", "DEC Alpha";
    }
}

/// Object file type.
///
/// The five assigned values plus the reserved OS- and processor-specific
/// ranges, which are tolerated as tagged cases rather than errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// No file type
    None,
    /// Relocatable file
    Rel,
    /// Executable file
    Exec,
    /// Shared object file
    Dyn,
    /// Core file
    Core,
    /// Inside 0xfe00..=0xfeff
    OsSpecific(u16),
    /// Inside 0xff00..=0xffff
    ProcSpecific(u16),
}

impl FileType {
    /// OS-specific range
    pub const LO_OS: u16 = 0xfe00;
    pub const HI_OS: u16 = 0xfeff;
    /// Processor-specific range
    pub const LO_PROC: u16 = 0xff00;
    pub const HI_PROC: u16 = 0xffff;

    /// Resolve a raw file-type value.
    ///
    /// # Errors
    ///
    /// [`ElfError::InvalidFileType`] for values outside the assigned table
    /// and both reserved ranges.
    pub fn resolve(raw: u16) -> ElfResult<Self> {
        match raw {
            0 => Ok(Self::None),
            1 => Ok(Self::Rel),
            2 => Ok(Self::Exec),
            3 => Ok(Self::Dyn),
            4 => Ok(Self::Core),
            v if (Self::LO_OS..=Self::HI_OS).contains(&v) => Ok(Self::OsSpecific(v)),
            v if (Self::LO_PROC..=Self::HI_PROC).contains(&v) => Ok(Self::ProcSpecific(v)),
            v => Err(ElfError::InvalidFileType(v)),
        }
    }

    /// Raw numeric value.
    pub const fn raw(self) -> u16 {
        match self {
            Self::None => 0,
            Self::Rel => 1,
            Self::Exec => 2,
            Self::Dyn => 3,
            Self::Core => 4,
            Self::OsSpecific(v) | Self::ProcSpecific(v) => v,
        }
    }

    /// Human-readable description.
    pub fn desc(self) -> String {
        match self {
            Self::None => "No file type".into(),
            Self::Rel => "Relocatable file".into(),
            Self::Exec => "Executable file".into(),
            Self::Dyn => "Shared object file".into(),
            Self::Core => "Core file".into(),
            Self::OsSpecific(v) => {
                crate::value::range_desc("ET_LOOS", u64::from(v), u64::from(Self::LO_OS))
            }
            Self::ProcSpecific(v) => {
                crate::value::range_desc("ET_LOPROC", u64::from(v), u64::from(Self::LO_PROC))
            }
        }
    }
}

impl core::fmt::Display for FileType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.desc())
    }
}

/// Field widths and byte order, fixed once the identification block is
/// decoded.
///
/// Every class-dependent read in the crate goes through these methods, so
/// the 32/64-bit decision is made exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub class: Class,
    pub endian: Endian,
}

impl Layout {
    /// 2-byte half word.
    pub fn read_half<R: Read + Seek>(&self, r: &mut R) -> ElfResult<u16> {
        r.read_u16(self.endian)
    }

    /// 4-byte word.
    pub fn read_word<R: Read + Seek>(&self, r: &mut R) -> ElfResult<u32> {
        r.read_u32(self.endian)
    }

    /// 4-byte signed word.
    pub fn read_sword<R: Read + Seek>(&self, r: &mut R) -> ElfResult<i32> {
        r.read_s32(self.endian)
    }

    /// Address-width value: 4 bytes on ELF32, 8 on ELF64.
    pub fn read_addr<R: Read + Seek>(&self, r: &mut R) -> ElfResult<u64> {
        match self.class {
            Class::Elf32 => Ok(u64::from(r.read_u32(self.endian)?)),
            Class::Elf64 => r.read_u64(self.endian),
        }
    }

    /// Offset-width value; same width as an address.
    pub fn read_off<R: Read + Seek>(&self, r: &mut R) -> ElfResult<u64> {
        self.read_addr(r)
    }

    /// Word on ELF32, xword on ELF64 (flags, sizes, alignments).
    pub fn read_xword_or_word<R: Read + Seek>(&self, r: &mut R) -> ElfResult<u64> {
        match self.class {
            Class::Elf32 => Ok(u64::from(r.read_u32(self.endian)?)),
            Class::Elf64 => r.read_u64(self.endian),
        }
    }

    /// Signed word on ELF32, signed xword on ELF64 (dynamic tags).
    pub fn read_sxword_or_sword<R: Read + Seek>(&self, r: &mut R) -> ElfResult<i64> {
        match self.class {
            Class::Elf32 => Ok(i64::from(r.read_s32(self.endian)?)),
            Class::Elf64 => r.read_s64(self.endian),
        }
    }

    /// Version-symbol entry: a half word.
    pub fn read_versym<R: Read + Seek>(&self, r: &mut R) -> ElfResult<u16> {
        self.read_half(r)
    }

    /// Section index inside a symbol entry: a half word.
    pub fn read_section_index<R: Read + Seek>(&self, r: &mut R) -> ElfResult<u16> {
        self.read_half(r)
    }
}

/// Decoded ELF header.
#[derive(Debug, Clone)]
pub struct Header {
    pub class: Class,
    pub data_encoding: DataEncoding,
    pub abi: OsAbi,
    pub abi_version: u8,
    pub file_type: FileType,
    pub machine: Machine,
    /// File version from the full header (the word, not the ident byte).
    pub version: u32,
    pub entry: u64,
    pub phoff: u64,
    pub shoff: u64,
    pub flags: u32,
    pub ehsize: u16,
    pub phentsize: u16,
    pub phnum: u16,
    pub shentsize: u16,
    pub shnum: u16,
    pub shstrndx: u16,
    pub layout: Layout,
}

impl Header {
    /// Decode the identification block and the class-dependent header.
    ///
    /// Leaves the cursor positioned just past the header.
    ///
    /// # Errors
    ///
    /// Each identification field failure is its own variant so callers can
    /// tell "not ELF" from "unsupported variant" from "corrupt":
    /// [`ElfError::NotAnElf`], [`ElfError::InvalidClass`],
    /// [`ElfError::InvalidDataEncoding`], [`ElfError::UnsupportedVersion`],
    /// [`ElfError::InvalidOsAbi`], [`ElfError::InvalidFileType`],
    /// [`ElfError::InvalidMachine`].
    pub fn read<R: Read + Seek>(r: &mut R) -> ElfResult<Self> {
        let magic = match r.read_exactly(4) {
            Ok(m) => m,
            Err(ElfError::EndOfStream | ElfError::ShortRead { .. }) => {
                return Err(ElfError::NotAnElf);
            }
            Err(e) => return Err(e),
        };
        if magic != ELF_MAGIC {
            return Err(ElfError::NotAnElf);
        }

        let raw = r.read_u8()?;
        let class = Class::from_raw(raw).ok_or(ElfError::InvalidClass(raw))?;

        let raw = r.read_u8()?;
        let data_encoding =
            DataEncoding::from_raw(raw).ok_or(ElfError::InvalidDataEncoding(raw))?;

        let ident_version = r.read_u8()?;
        if ident_version > 1 {
            return Err(ElfError::UnsupportedVersion(ident_version));
        }

        let raw = r.read_u8()?;
        let abi = OsAbi::from_raw(raw).ok_or(ElfError::InvalidOsAbi(raw))?;
        let abi_version = r.read_u8()?;

        // Skip the reserved padding of the identification block.
        r.seek_to(EI_NIDENT as u64)?;

        let layout = Layout {
            class,
            endian: data_encoding.endian(),
        };

        let file_type = FileType::resolve(layout.read_half(r)?)?;

        let raw = layout.read_half(r)?;
        let machine = Machine::from_raw(raw).ok_or(ElfError::InvalidMachine(raw))?;

        let version = layout.read_word(r)?;
        let entry = layout.read_addr(r)?;
        let phoff = layout.read_off(r)?;
        let shoff = layout.read_off(r)?;
        let flags = layout.read_word(r)?;
        let ehsize = layout.read_half(r)?;
        let phentsize = layout.read_half(r)?;
        let phnum = layout.read_half(r)?;
        let shentsize = layout.read_half(r)?;
        let shnum = layout.read_half(r)?;
        let shstrndx = layout.read_half(r)?;

        Ok(Self {
            class,
            data_encoding,
            abi,
            abi_version,
            file_type,
            machine,
            version,
            entry,
            phoff,
            shoff,
            flags,
            ehsize,
            phentsize,
            phnum,
            shentsize,
            shnum,
            shstrndx,
            layout,
        })
    }
}
