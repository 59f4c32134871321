//! The file object: header, section directory, lazy section cache.
//!
//! An [`ElfFile`] owns its byte source exclusively for its lifetime; every
//! seek+read sequence goes through `&mut self`, which serializes access.
//! Section payloads decode on first request, exactly once, with the cursor
//! saved and restored around each decode so one decode never disturbs
//! another scan. Linked sections (string tables for symbol and version
//! sections, `.dynstr` for the dynamic section) are decoded *before* the
//! owning scan starts.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use crate::dynamic::{self, DynamicEntry};
use crate::gnu::{self, SymbolVersion};
use crate::header::{Class, DataEncoding, FileType, Header, Machine, OsAbi};
use crate::program::ProgramHeader;
use crate::reader::BytestreamRead;
use crate::section::{
    GnuSectionType, Section, SectionData, SectionHeader, SectionKind, SectionType,
    SunWSectionType,
};
use crate::strtab::StringTable;
use crate::summary::FileSummary;
use crate::sunw;
use crate::symbol::{Symbol, SymbolSection, SymbolTable};
use crate::{ElfError, ElfResult};

/// A decoded ELF file over any seekable byte source.
pub struct ElfFile<R> {
    reader: R,
    path: Option<PathBuf>,
    header: Header,
    descriptors: Vec<SectionHeader>,
    program_headers: Vec<ProgramHeader>,
    /// Memoized decoded sections, keyed by table index.
    sections: BTreeMap<usize, Section>,
    /// Guard against link cycles in corrupt files.
    in_progress: HashSet<usize>,
    /// Section name → index; `None` when the file has no usable
    /// section-name string table.
    names: Option<HashMap<String, usize>>,
}

impl ElfFile<BufReader<fs::File>> {
    /// Open a file-backed ELF file.
    ///
    /// The descriptor is owned by the returned value and released when it
    /// drops — including when construction fails partway through.
    pub fn open(path: impl AsRef<Path>) -> ElfResult<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(fs::File::open(path)?);
        let mut file = Self::parse(reader)?;
        file.path = Some(path.to_path_buf());
        Ok(file)
    }
}

impl<R: Read + Seek> ElfFile<R> {
    /// Decode the header, section directory and program headers from any
    /// seekable source (a `File`, an `io::Cursor` over a buffer, an
    /// archive member, ...).
    ///
    /// The source is consumed; on error it is dropped right here, so a
    /// rejected input never leaks its descriptor.
    pub fn parse(mut reader: R) -> ElfResult<Self> {
        let header = Header::read(&mut reader)?;
        let layout = header.layout;

        reader.seek_to(header.shoff)?;
        let mut descriptors = Vec::with_capacity(usize::from(header.shnum));
        for index in 0..usize::from(header.shnum) {
            descriptors.push(SectionHeader::read(&mut reader, layout, index)?);
        }

        let mut program_headers = Vec::with_capacity(usize::from(header.phnum));
        if header.phnum > 0 {
            reader.seek_to(header.phoff)?;
            for index in 0..usize::from(header.phnum) {
                program_headers.push(ProgramHeader::read(&mut reader, layout, index)?);
            }
        }

        let mut file = Self {
            reader,
            path: None,
            header,
            descriptors,
            program_headers,
            sections: BTreeMap::new(),
            in_progress: HashSet::new(),
            names: None,
        };
        file.resolve_string_table()?;
        Ok(file)
    }

    /// Resolve the section-name string table named by `e_shstrndx`.
    ///
    /// Index zero means the file simply has none (common for raw
    /// assembler output). A designated section that does not decode as a
    /// string table is non-fatal too: the file stays usable, but
    /// name-based lookups will fail with `MissingStringTable`.
    fn resolve_string_table(&mut self) -> ElfResult<()> {
        let index = usize::from(self.header.shstrndx);
        if index == 0 {
            return Ok(());
        }
        let Some(desc) = self.descriptors.get(index).cloned() else {
            return Ok(());
        };
        let kind = SectionKind::resolve(
            desc.type_id,
            self.header.machine,
            self.header.abi,
            None,
            index,
        )?;
        if kind != SectionKind::Standard(SectionType::StrTab) {
            return Ok(());
        }

        let old_pos = self.reader.tell()?;
        self.reader.seek_to(desc.offset)?;
        let table = StringTable::new(self.reader.read_exactly(desc.size as usize)?);
        self.reader.seek_to(old_pos)?;

        let mut names = HashMap::with_capacity(self.descriptors.len());
        for d in &mut self.descriptors {
            let name = table.get(u64::from(d.name_index))?;
            names.insert(name.clone(), d.index);
            d.name = Some(name);
        }
        self.names = Some(names);

        // The table itself counts as decoded; don't read it twice.
        let header = self.descriptors[index].clone();
        self.sections.insert(
            index,
            Section {
                header,
                kind,
                data: SectionData::Strings(table),
            },
        );
        Ok(())
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn class(&self) -> Class {
        self.header.class
    }

    pub fn data_encoding(&self) -> DataEncoding {
        self.header.data_encoding
    }

    pub fn abi(&self) -> OsAbi {
        self.header.abi
    }

    pub fn abi_version(&self) -> u8 {
        self.header.abi_version
    }

    pub fn file_type(&self) -> FileType {
        self.header.file_type
    }

    pub fn machine(&self) -> Machine {
        self.header.machine
    }

    pub fn version(&self) -> u32 {
        self.header.version
    }

    pub fn entry_address(&self) -> u64 {
        self.header.entry
    }

    /// Number of section-header-table entries.
    pub fn section_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Raw section descriptors, in table order.
    pub fn section_headers(&self) -> &[SectionHeader] {
        &self.descriptors
    }

    pub fn program_headers(&self) -> &[ProgramHeader] {
        &self.program_headers
    }

    /// Whether `index` names a section; triggers no decode.
    pub fn has_section(&self, index: usize) -> bool {
        index < self.descriptors.len()
    }

    /// Whether a section with this name exists; `false` when the file has
    /// no string table. Triggers no decode.
    pub fn has_section_named(&self, name: &str) -> bool {
        self.names
            .as_ref()
            .is_some_and(|names| names.contains_key(name))
    }

    fn section_index_by_name(&self, name: &str) -> Option<usize> {
        self.names.as_ref().and_then(|names| names.get(name).copied())
    }

    /// Section at `index`, decoding it on first request.
    ///
    /// # Errors
    ///
    /// [`ElfError::MissingSection`] for an out-of-range index, plus
    /// whatever the payload decode raises.
    pub fn section(&mut self, index: usize) -> ElfResult<&Section> {
        self.decode_section(index)?;
        self.sections
            .get(&index)
            .ok_or_else(|| ElfError::MissingSection(index.to_string()))
    }

    /// Section with this name, decoding it on first request.
    ///
    /// # Errors
    ///
    /// [`ElfError::MissingStringTable`] when the file has no string table
    /// (distinct from [`ElfError::MissingSection`], the plain not-found
    /// case).
    pub fn section_by_name(&mut self, name: &str) -> ElfResult<&Section> {
        let Some(names) = self.names.as_ref() else {
            return Err(ElfError::MissingStringTable(name.to_owned()));
        };
        let index = *names
            .get(name)
            .ok_or_else(|| ElfError::MissingSection(name.to_owned()))?;
        self.section(index)
    }

    /// First section whose address matches, if any.
    pub fn find_section_by_addr(&mut self, addr: u64) -> ElfResult<Option<&Section>> {
        let found = self.descriptors.iter().find(|d| d.addr == addr).map(|d| d.index);
        match found {
            Some(index) => self.section(index).map(Some),
            None => Ok(None),
        }
    }

    /// All sections in table order, forcing every one to decode — the
    /// full-file validation walk.
    pub fn sections(&mut self) -> ElfResult<Vec<&Section>> {
        for index in 0..self.descriptors.len() {
            self.decode_section(index)?;
        }
        Ok(self.sections.values().collect())
    }

    /// Whether two files could link against each other: same class,
    /// encoding, version, ABI and machine. File *type* is deliberately not
    /// compared — an executable links against a shared object just fine.
    pub fn is_compatible<R2: Read + Seek>(&self, other: &ElfFile<R2>) -> bool {
        self.header.class == other.header.class
            && self.header.data_encoding == other.header.data_encoding
            && self.header.version == other.header.version
            && self.header.abi == other.header.abi
            && self.header.abi_version == other.header.abi_version
            && self.header.machine == other.header.machine
    }

    /// Dynamic entries, when the file has a `.dynamic` section.
    pub fn dynamic_entries(&mut self) -> ElfResult<Option<&[DynamicEntry]>> {
        if !self.has_section_named(".dynamic") {
            return Ok(None);
        }
        Ok(self.section_by_name(".dynamic")?.dynamic_entries())
    }

    /// Serializable decoded snapshot of the whole file.
    pub fn summary(&mut self) -> ElfResult<FileSummary> {
        FileSummary::collect(self)
    }

    /// GNU version associated with `sym`, if any.
    ///
    /// Routing is by the symbol's entry in the parallel `.gnu.version`
    /// array: indexes 0 and 1 mean no/base version; the high bit picks the
    /// need table (imported, keyed by the cleared index), otherwise the
    /// def table. Absolute and `.bss` symbols carry no version.
    pub fn symbol_version(&mut self, sym: &Symbol) -> ElfResult<Option<SymbolVersion>> {
        if !self.has_section_named(".gnu.version")
            || sym.section == SymbolSection::Absolute
            || sym.section_name() == Some(".bss")
        {
            return Ok(None);
        }

        let version_index = self
            .section_by_name(".gnu.version")?
            .version_symbols()
            .and_then(|v| v.get(sym.index()).copied());
        let Some(version_index) = version_index else {
            return Ok(None);
        };
        if version_index < 2 {
            return Ok(None);
        }

        if version_index & gnu::VERSYM_HIDDEN != 0 {
            let key = version_index & !gnu::VERSYM_HIDDEN;
            if !self.has_section_named(".gnu.version_r") {
                return Ok(None);
            }
            let need = self
                .section_by_name(".gnu.version_r")?
                .version_needs()
                .and_then(|m| m.get(&key))
                .cloned();
            Ok(need.map(|n| SymbolVersion::Needed {
                file: n.file,
                name: n.name,
                hidden: true,
            }))
        } else {
            if !self.has_section_named(".gnu.version_d") {
                return Ok(None);
            }
            let def = self
                .section_by_name(".gnu.version_d")?
                .version_defs()
                .and_then(|m| m.get(&version_index))
                .cloned();
            Ok(def
                .and_then(|d| d.names.into_iter().next())
                .map(|name| SymbolVersion::Defined { name }))
        }
    }

    /// Decode one section into the cache, once.
    fn decode_section(&mut self, index: usize) -> ElfResult<()> {
        if self.sections.contains_key(&index) || !self.in_progress.insert(index) {
            // Already decoded, or a link cycle: the caller's linked-table
            // lookup will fail with a typed error.
            return Ok(());
        }
        let result = self.decode_section_inner(index);
        self.in_progress.remove(&index);
        result
    }

    fn decode_section_inner(&mut self, index: usize) -> ElfResult<()> {
        let desc = self
            .descriptors
            .get(index)
            .cloned()
            .ok_or_else(|| ElfError::MissingSection(index.to_string()))?;
        let layout = self.header.layout;
        let kind = SectionKind::resolve(
            desc.type_id,
            self.header.machine,
            self.header.abi,
            desc.name.as_deref(),
            index,
        )?;

        // Decode linked sections first; their lookups then happen in
        // memory, never against the cursor mid-scan.
        match kind {
            SectionKind::Standard(SectionType::SymTab | SectionType::DynSym)
            | SectionKind::Gnu(GnuSectionType::VerDef | GnuSectionType::VerNeed) => {
                self.decode_section(desc.link as usize)?;
            }
            SectionKind::Standard(SectionType::Dynamic) => {
                if let Some(dynstr) = self.section_index_by_name(".dynstr") {
                    self.decode_section(dynstr)?;
                }
            }
            _ => {}
        }

        let old_pos = self.reader.tell()?;
        self.reader.seek_to(desc.offset)?;

        let data = match kind {
            SectionKind::Standard(SectionType::NoBits) => SectionData::Raw(Vec::new()),
            SectionKind::Standard(SectionType::StrTab) => SectionData::Strings(StringTable::new(
                self.reader.read_exactly(desc.size as usize)?,
            )),
            SectionKind::Standard(SectionType::SymTab | SectionType::DynSym) => {
                let count = desc.entry_count()?;
                let link = self.sections.get(&(desc.link as usize));
                let strtab = link
                    .and_then(Section::strings)
                    .ok_or_else(|| ElfError::MissingStringTable(desc.display_name()))?;
                let strtab_name = link.map_or_else(String::new, |s| s.header.display_name());
                SectionData::Symbols(SymbolTable::read(
                    &mut self.reader,
                    layout,
                    count,
                    strtab,
                    &strtab_name,
                    &self.descriptors,
                    desc.display_name(),
                )?)
            }
            SectionKind::Standard(SectionType::Dynamic) => {
                let count = desc.entry_count()?;
                let dynstr = self
                    .section_index_by_name(".dynstr")
                    .and_then(|i| self.sections.get(&i))
                    .and_then(Section::strings);
                SectionData::Dynamic(dynamic::read_entries(
                    &mut self.reader,
                    layout,
                    count,
                    dynstr,
                    &self.descriptors,
                )?)
            }
            SectionKind::Gnu(GnuSectionType::VerSym) => {
                let count = desc.entry_count()?;
                SectionData::VersionSymbols(gnu::read_versym(&mut self.reader, layout, count)?)
            }
            SectionKind::Gnu(GnuSectionType::VerDef) => {
                let strtab = self
                    .sections
                    .get(&(desc.link as usize))
                    .and_then(Section::strings)
                    .ok_or_else(|| ElfError::MissingStringTable(desc.display_name()))?;
                SectionData::VersionDefs(gnu::read_verdef(
                    &mut self.reader,
                    layout,
                    desc.offset,
                    strtab,
                )?)
            }
            SectionKind::Gnu(GnuSectionType::VerNeed) => {
                let strtab = self
                    .sections
                    .get(&(desc.link as usize))
                    .and_then(Section::strings)
                    .ok_or_else(|| ElfError::MissingStringTable(desc.display_name()))?;
                SectionData::VersionNeeds(gnu::read_verneed(&mut self.reader, layout, strtab)?)
            }
            SectionKind::SunW(SunWSectionType::Cap) => SectionData::Capabilities(
                sunw::read_capabilities(&mut self.reader, layout, self.header.machine)?,
            ),
            _ => SectionData::Raw(self.reader.read_exactly(desc.size as usize)?),
        };

        self.reader.seek_to(old_pos)?;
        self.sections.insert(index, Section { header: desc, kind, data });
        Ok(())
    }
}

impl<R> std::fmt::Debug for ElfFile<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElfFile")
            .field("path", &self.path)
            .field("class", &self.header.class)
            .field("machine", &self.header.machine)
            .field("sections", &self.descriptors.len())
            .finish_non_exhaustive()
    }
}
