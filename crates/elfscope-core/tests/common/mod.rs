//! Shared fixture builder: assembles syntactically valid ELF images in
//! memory, for both classes and both endiannesses.
//!
//! Each integration-test crate uses a different slice of this module.
#![allow(dead_code)]

/// Endian/class-aware byte emitter for section payloads.
pub struct Emit {
    pub class64: bool,
    pub big: bool,
    buf: Vec<u8>,
}

impl Emit {
    pub fn new(class64: bool, big: bool) -> Self {
        Self {
            class64,
            big,
            buf: Vec::new(),
        }
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        let b = if self.big { v.to_be_bytes() } else { v.to_le_bytes() };
        self.buf.extend_from_slice(&b);
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        let b = if self.big { v.to_be_bytes() } else { v.to_le_bytes() };
        self.buf.extend_from_slice(&b);
        self
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        let b = if self.big { v.to_be_bytes() } else { v.to_le_bytes() };
        self.buf.extend_from_slice(&b);
        self
    }

    /// Address-width value: 4 bytes on ELF32, 8 on ELF64.
    pub fn addr(&mut self, v: u64) -> &mut Self {
        if self.class64 {
            self.u64(v)
        } else {
            self.u32(v as u32)
        }
    }

    /// Word on ELF32, xword on ELF64.
    pub fn xword(&mut self, v: u64) -> &mut Self {
        self.addr(v)
    }

    pub fn bytes(&mut self, b: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(b);
        self
    }

    /// One symbol-table entry in the class's field order.
    pub fn symbol(
        &mut self,
        name_off: u32,
        info: u8,
        other: u8,
        shndx: u16,
        value: u64,
        size: u64,
    ) -> &mut Self {
        if self.class64 {
            self.u32(name_off);
            self.u8(info);
            self.u8(other);
            self.u16(shndx);
            self.addr(value);
            self.u64(size);
        } else {
            self.u32(name_off);
            self.addr(value);
            self.u32(size as u32);
            self.u8(info);
            self.u8(other);
            self.u16(shndx);
        }
        self
    }

    /// One dynamic entry (signed tag + address-width value).
    pub fn dyn_entry(&mut self, tag: i64, value: u64) -> &mut Self {
        if self.class64 {
            self.u64(tag as u64);
        } else {
            self.u32(tag as u32);
        }
        self.addr(value)
    }

    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

/// Build a NUL-joined string table; returns (blob, offset of each input).
pub fn strtab(strings: &[&str]) -> (Vec<u8>, Vec<u32>) {
    let mut blob = vec![0u8];
    let mut offsets = Vec::with_capacity(strings.len());
    for s in strings {
        offsets.push(blob.len() as u32);
        blob.extend_from_slice(s.as_bytes());
        blob.push(0);
    }
    (blob, offsets)
}

/// One section in a synthetic image.
pub struct SectionSpec {
    pub name: &'static str,
    pub type_id: u32,
    pub flags: u64,
    pub addr: u64,
    pub link: u32,
    pub info: u32,
    pub addralign: u64,
    pub entsize: u64,
    pub data: Vec<u8>,
    /// NoBits-style: the size is recorded but no bytes land in the file.
    pub no_content: bool,
    /// Overrides the recorded size (to fake misaligned tables).
    pub size_override: Option<u64>,
}

impl SectionSpec {
    pub fn new(name: &'static str, type_id: u32, data: Vec<u8>) -> Self {
        Self {
            name,
            type_id,
            flags: 0,
            addr: 0,
            link: 0,
            info: 0,
            addralign: 0,
            entsize: 0,
            data,
            no_content: false,
            size_override: None,
        }
    }

    pub fn flags(mut self, flags: u64) -> Self {
        self.flags = flags;
        self
    }

    pub fn addr(mut self, addr: u64) -> Self {
        self.addr = addr;
        self
    }

    pub fn link(mut self, link: u32) -> Self {
        self.link = link;
        self
    }

    pub fn entsize(mut self, entsize: u64) -> Self {
        self.entsize = entsize;
        self
    }

    pub fn no_content(mut self, size: u64) -> Self {
        self.no_content = true;
        self.size_override = Some(size);
        self
    }

    pub fn size_override(mut self, size: u64) -> Self {
        self.size_override = Some(size);
        self
    }
}

/// Synthetic ELF image builder.
///
/// Lays out: ELF header, section payloads, `.shstrtab`, section header
/// table. Section 0 is the conventional null entry; user sections start
/// at index 1; `.shstrtab` comes last (unless suppressed).
pub struct ElfBuilder {
    pub class64: bool,
    pub big: bool,
    pub file_type: u16,
    pub machine: u16,
    pub abi: u8,
    pub entry: u64,
    sections: Vec<SectionSpec>,
    no_shstrtab: bool,
}

impl ElfBuilder {
    pub fn le64() -> Self {
        Self::new(true, false)
    }

    pub fn be32() -> Self {
        Self::new(false, true)
    }

    pub fn new(class64: bool, big: bool) -> Self {
        Self {
            class64,
            big,
            file_type: 1, // ET_REL
            machine: if class64 { 62 } else { 20 },
            abi: 0,
            entry: 0,
            sections: Vec::new(),
            no_shstrtab: false,
        }
    }

    pub fn file_type(mut self, t: u16) -> Self {
        self.file_type = t;
        self
    }

    pub fn machine(mut self, m: u16) -> Self {
        self.machine = m;
        self
    }

    pub fn abi(mut self, abi: u8) -> Self {
        self.abi = abi;
        self
    }

    /// Drop `.shstrtab` and set `e_shstrndx` to zero.
    pub fn without_shstrtab(mut self) -> Self {
        self.no_shstrtab = true;
        self
    }

    /// Append a section; returns its final table index (user sections
    /// start at 1).
    pub fn section(&mut self, spec: SectionSpec) -> u32 {
        self.sections.push(spec);
        self.sections.len() as u32
    }

    pub fn emit(&self) -> Emit {
        Emit::new(self.class64, self.big)
    }

    fn ehsize(&self) -> u64 {
        if self.class64 { 64 } else { 52 }
    }

    fn shentsize(&self) -> u16 {
        if self.class64 { 64 } else { 40 }
    }

    pub fn build(&self) -> Vec<u8> {
        // Section-name table for all sections (plus .shstrtab itself).
        let mut names: Vec<&str> = self.sections.iter().map(|s| s.name).collect();
        if !self.no_shstrtab {
            names.push(".shstrtab");
        }
        let (shstrtab_blob, name_offsets) = strtab(&names);

        // Payload layout, starting right after the ELF header.
        let mut offset = self.ehsize();
        let mut section_offsets = Vec::with_capacity(self.sections.len());
        for s in &self.sections {
            section_offsets.push(offset);
            if !s.no_content {
                offset += s.data.len() as u64;
            }
        }
        let shstrtab_offset = offset;
        if !self.no_shstrtab {
            offset += shstrtab_blob.len() as u64;
        }
        let shoff = offset;

        let shnum = 1 + self.sections.len() as u16 + u16::from(!self.no_shstrtab);
        let shstrndx = if self.no_shstrtab { 0 } else { shnum - 1 };

        let mut e = Emit::new(self.class64, self.big);
        // Identification block
        e.bytes(&[0x7f, b'E', b'L', b'F']);
        e.u8(if self.class64 { 2 } else { 1 });
        e.u8(if self.big { 2 } else { 1 });
        e.u8(1); // version
        e.u8(self.abi);
        e.u8(0); // ABI version
        e.bytes(&[0u8; 7]);
        // Fixed header
        e.u16(self.file_type);
        e.u16(self.machine);
        e.u32(1);
        e.addr(self.entry);
        e.addr(0); // phoff
        e.addr(shoff);
        e.u32(0); // flags
        e.u16(self.ehsize() as u16);
        e.u16(0); // phentsize
        e.u16(0); // phnum
        e.u16(self.shentsize());
        e.u16(shnum);
        e.u16(shstrndx);

        // Payloads
        for s in &self.sections {
            if !s.no_content {
                e.bytes(&s.data);
            }
        }
        if !self.no_shstrtab {
            e.bytes(&shstrtab_blob);
        }

        // Null section header
        let zero_entry = vec![0u8; usize::from(self.shentsize())];
        e.bytes(&zero_entry);

        // User section headers
        for (i, s) in self.sections.iter().enumerate() {
            let size = s.size_override.unwrap_or(s.data.len() as u64);
            e.u32(name_offsets[i]);
            e.u32(s.type_id);
            e.xword(s.flags);
            e.addr(s.addr);
            e.addr(section_offsets[i]);
            e.xword(size);
            e.u32(s.link);
            e.u32(s.info);
            e.xword(s.addralign);
            e.xword(s.entsize);
        }

        // .shstrtab header
        if !self.no_shstrtab {
            e.u32(name_offsets[self.sections.len()]);
            e.u32(3); // STRTAB
            e.xword(0);
            e.addr(0);
            e.addr(shstrtab_offset);
            e.xword(shstrtab_blob.len() as u64);
            e.u32(0);
            e.u32(0);
            e.xword(0);
            e.xword(0);
        }

        e.finish()
    }
}
