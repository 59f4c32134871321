//! # elfscope-core
//!
//! Read-only parser and object model for ELF (Executable and Linkable
//! Format) binaries.
//!
//! Supports both 32- and 64-bit files in either endianness, and the common
//! vendor extensions found in the wild: GNU symbol versioning, Sun/Solaris
//! capabilities, and ARM attribute sections.
//!
//! # Design Principles
//!
//! 1. **Read-only**: no mutation, no relocation processing, no loading
//! 2. **Lazy**: section payloads decode on first access, exactly once
//! 3. **Typed failures**: every malformed-input case maps to an
//!    [`ElfError`] variant, never a panic
//! 4. **Tolerant where the format is**: OS-, processor- and
//!    application-specific value ranges decode to placeholder variants
//!    instead of failing the whole file

pub mod dynamic;
pub mod file;
pub mod gnu;
pub mod hash;
pub mod header;
pub mod pool;
pub mod program;
pub mod reader;
pub mod section;
pub mod strtab;
pub mod summary;
pub mod sunw;
pub mod symbol;
pub mod value;

pub use dynamic::{DynamicEntry, DynamicTag, DynamicTagKind, DynamicValue};
pub use file::ElfFile;
pub use gnu::{SymbolVersion, VersionDef, VersionNeed};
pub use hash::{elf_hash, gnu_hash};
pub use header::{Class, DataEncoding, FileType, Header, Layout, Machine, OsAbi};
pub use pool::FilePool;
pub use program::{ProgramFlags, ProgramHeader, ProgramKind, ProgramType};
pub use reader::{BytestreamRead, Endian};
pub use section::{Section, SectionData, SectionFlags, SectionHeader, SectionKind, SectionType};
pub use strtab::StringTable;
pub use summary::FileSummary;
pub use sunw::{Capability, CapabilityTag};
pub use symbol::{Binding, Symbol, SymbolSection, SymbolTable, SymbolType, Visibility};

/// ELF magic bytes: "\x7fELF"
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Size of the ELF identification block.
pub const EI_NIDENT: usize = 16;

/// Error type for every decode failure.
///
/// All of these are permanent input-validation failures; there is no
/// transient case in a pure in-memory/file decode. Callers that walk many
/// files are expected to catch per-file and keep going.
#[derive(Debug, thiserror::Error)]
pub enum ElfError {
    /// Magic mismatch, or the stream ended before the magic.
    #[error("not a valid ELF file")]
    NotAnElf,
    /// Identification version byte above 1.
    #[error("unsupported ELF version {0}")]
    UnsupportedVersion(u8),
    /// Class byte is neither 32- nor 64-bit.
    #[error("invalid ELF class {0}")]
    InvalidClass(u8),
    /// Data-encoding byte is neither LSB nor MSB.
    #[error("invalid ELF data encoding {0}")]
    InvalidDataEncoding(u8),
    /// OS ABI byte outside the known table.
    #[error("invalid ELF ABI {0}")]
    InvalidOsAbi(u8),
    /// File type outside the known table and the reserved ranges.
    #[error("invalid ELF file type {0:#x}")]
    InvalidFileType(u16),
    /// Machine value outside the known table.
    #[error("invalid ELF machine {0:#x}")]
    InvalidMachine(u16),
    /// A value fell outside a constant domain with no tolerated range.
    ///
    /// `context` is empty or a ", while ..." clause locating the value.
    #[error("value {value:#x} out of bound for {domain}{context}")]
    OutOfBound {
        domain: &'static str,
        value: u64,
        context: String,
    },
    /// Section lookup by an index or name that is not in the file.
    #[error("requested section {0} not found in the file")]
    MissingSection(String),
    /// Name-based section lookup on a file with no usable string table.
    #[error("requested section '{0}' but the file has no string table")]
    MissingStringTable(String),
    /// Section type outside every known table and tolerated range.
    #[error("unknown section type {type_id:#010x} for section {name}")]
    UnknownSectionType { type_id: u32, name: String },
    /// String-table offset past the end of the table.
    #[error("invalid string table index {index} (maximum index: {max})")]
    InvalidStringIndex { index: u64, max: u64 },
    /// Symbol name offset that the linked string table cannot resolve.
    #[error("invalid name index {name_index} in {strtab} for symbol {symbol}")]
    InvalidSymbolName {
        name_index: u64,
        symbol: usize,
        strtab: String,
    },
    /// Symbol lookup by an index or name that is not in the table.
    #[error("symbol {which} not found in section {section}")]
    UnknownSymbol { which: String, section: String },
    /// Chained version record with a revision other than 1.
    #[error("GNU symbol versioning revision {0} unknown")]
    SymbolVersionUnknown(u16),
    /// The nm classification ladder ran out of rules for this symbol.
    #[error("unknown nm code for symbol {symbol} in section {section}")]
    UnknownNmCode { symbol: String, section: String },
    /// Section size is not an exact multiple of its entry size.
    #[error("section {section}: size {size} is not a multiple of entry size {entry_size}")]
    MisalignedEntries {
        section: String,
        size: u64,
        entry_size: u64,
    },
    /// Sun hardware capabilities exist only for i386 and SPARC.
    #[error("hardware capabilities are not defined for machine {0}")]
    UnsupportedCapabilityMachine(String),
    /// A read found the stream already at its end.
    #[error("end of stream")]
    EndOfStream,
    /// A read got some bytes but fewer than requested: truncated input.
    #[error("short read: wanted {wanted} bytes, got {got}")]
    ShortRead { wanted: usize, got: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for decode operations.
pub type ElfResult<T> = Result<T, ElfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elf_magic() {
        assert_eq!(ELF_MAGIC, [0x7f, 0x45, 0x4c, 0x46]);
    }

    #[test]
    fn test_error_display() {
        let err = ElfError::NotAnElf;
        assert_eq!(format!("{err}"), "not a valid ELF file");

        let err = ElfError::InvalidMachine(0x3e);
        assert_eq!(format!("{err}"), "invalid ELF machine 0x3e");

        let err = ElfError::OutOfBound {
            domain: "symbol binding",
            value: 7,
            context: ", while processing symbol 3 (info 0x7f)".into(),
        };
        assert_eq!(
            format!("{err}"),
            "value 0x7 out of bound for symbol binding, while processing symbol 3 (info 0x7f)"
        );
    }
}
