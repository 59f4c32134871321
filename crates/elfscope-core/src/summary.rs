//! Serializable decoded-file snapshot.
//!
//! [`FileSummary`] forces every section to decode and captures the result
//! as plain serde-serializable data — the machine-readable companion to
//! the human `Display` rendering.

use std::io::{Read, Seek};

use serde::Serialize;

use crate::file::ElfFile;
use crate::ElfResult;

/// One section row.
#[derive(Debug, Clone, Serialize)]
pub struct SectionSummary {
    pub index: usize,
    pub name: String,
    pub type_desc: String,
    pub flags_value: u64,
    pub flags: Vec<String>,
    pub addr: u64,
    pub offset: u64,
    pub size: u64,
    pub link: u32,
    pub info: u32,
    pub addralign: u64,
    pub entsize: u64,
}

/// Decoded snapshot of a whole file.
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub path: Option<String>,
    pub class: String,
    pub data_encoding: String,
    pub version: u32,
    pub abi: String,
    pub abi_version: u8,
    pub file_type: String,
    pub machine: String,
    pub entry: u64,
    pub sections: Vec<SectionSummary>,
}

impl FileSummary {
    /// Walk the file, forcing every section to decode.
    pub fn collect<R: Read + Seek>(file: &mut ElfFile<R>) -> ElfResult<Self> {
        let path = file.path().map(|p| p.display().to_string());
        let header = file.header().clone();

        let mut sections = Vec::with_capacity(file.section_count());
        for section in file.sections()? {
            sections.push(SectionSummary {
                index: section.index(),
                name: section.header.display_name(),
                type_desc: section.kind.describe(),
                flags_value: section.flags().0,
                flags: section
                    .flags()
                    .names()
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
                addr: section.addr(),
                offset: section.header.offset,
                size: section.size(),
                link: section.header.link,
                info: section.header.info,
                addralign: section.header.addralign,
                entsize: section.header.entsize,
            });
        }

        Ok(Self {
            path,
            class: header.class.to_string(),
            data_encoding: header.data_encoding.to_string(),
            version: header.version,
            abi: header.abi.to_string(),
            abi_version: header.abi_version,
            file_type: header.file_type.to_string(),
            machine: header.machine.to_string(),
            entry: header.entry,
            sections,
        })
    }
}

impl std::fmt::Display for FileSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(path) = &self.path {
            writeln!(f, "ELF file {path}")?;
        }
        writeln!(
            f,
            "ELF class: {} {} ver. {}",
            self.class, self.data_encoding, self.version
        )?;
        writeln!(f, "ELF ABI: {} ver. {}", self.abi, self.abi_version)?;
        writeln!(f, "ELF type: {} machine: {}", self.file_type, self.machine)?;
        writeln!(f, "Sections:")?;
        for s in &self.sections {
            writeln!(
                f,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                s.name,
                s.type_desc,
                s.flags_value,
                s.addr,
                s.offset,
                s.size,
                s.link,
                s.info,
                s.addralign,
                s.entsize
            )?;
        }
        Ok(())
    }
}
