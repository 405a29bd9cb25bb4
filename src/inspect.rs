//! Lightweight class-file inspection used to gate decompilation.
//!
//! Only the parts of the class-file format needed to identify a class are
//! read: the constant pool (keeping Utf8 and Class entries), the class header,
//! the interface list and the class-level `SourceFile` attribute. Fields and
//! methods are skipped wholesale, Code attributes included.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::info;

use crate::error::{DecompileError, SkipReason};
use crate::source::ClassUnit;

pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;
pub const PACKAGE_INFO: &str = "package-info.class";
pub const GROOVY_OBJECT: &str = "groovy/lang/GroovyObject";
pub const GROOVY_EXTENSION: &str = ".groovy";

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_SYNTHETIC: u16 = 0x1000;
pub const ACC_ANNOTATION: u16 = 0x2000;
pub const ACC_ENUM: u16 = 0x4000;
pub const ACC_MODULE: u16 = 0x8000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassHeader {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    /// Internal form, e.g. `org/example/Foo`.
    pub this_class: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub source_file: Option<String>,
}

impl ClassHeader {
    /// The two Groovy signals: the `GroovyObject` marker interface or a `.groovy` source file.
    pub fn is_groovy(&self) -> bool {
        self.interfaces.iter().any(|i| i == GROOVY_OBJECT)
            || self
                .source_file
                .as_deref()
                .is_some_and(|s| s.ends_with(GROOVY_EXTENSION))
    }

    pub fn package(&self) -> Option<String> {
        self.this_class
            .rsplit_once('/')
            .map(|(pkg, _)| pkg.replace('/', "."))
    }

    pub fn simple_name(&self) -> &str {
        self.this_class
            .rsplit_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.this_class)
    }

    /// Java release that emits this class-file major version (49 and later).
    pub fn java_release(&self) -> Option<u16> {
        self.major_version.checked_sub(44).filter(|v| *v >= 5)
    }

    pub fn has_flag(&self, flag: u16) -> bool {
        self.access_flags & flag != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Decompile,
    Skip(SkipReason),
}

/// Decides whether `bytes`, stored under `file_name`, should be handed to the engine.
///
/// Unreadable class files are accepted: the scan never blocks decompilation.
pub fn classify(file_name: &str, bytes: &[u8]) -> Verdict {
    if file_name == PACKAGE_INFO {
        return Verdict::Skip(SkipReason::PackageInfo);
    }
    if is_groovy(bytes) {
        return Verdict::Skip(SkipReason::Groovy);
    }
    Verdict::Decompile
}

pub fn inspect(unit: &ClassUnit) -> Verdict {
    let verdict = classify(unit.file_name(), unit.bytes());
    match verdict {
        Verdict::Skip(SkipReason::PackageInfo) => info!("skipped: {}", unit.key()),
        Verdict::Skip(SkipReason::Groovy) => info!("skipped Groovy class: {}", unit.key()),
        Verdict::Decompile => {}
    }
    verdict
}

/// Gate form of [`inspect`]: a rejected unit becomes `SkippedByPolicy`.
pub fn ensure_decompilable(unit: &ClassUnit) -> Result<(), DecompileError> {
    match inspect(unit) {
        Verdict::Decompile => Ok(()),
        Verdict::Skip(reason) => Err(DecompileError::SkippedByPolicy(reason)),
    }
}

pub fn is_decompilable(unit: &ClassUnit) -> bool {
    ensure_decompilable(unit).is_ok()
}

pub fn is_groovy(bytes: &[u8]) -> bool {
    parse_class_header(bytes)
        .map(|header| header.is_groovy())
        .unwrap_or(false)
}

enum Constant {
    Utf8(String),
    Class(u16),
    Other,
}

struct ClassReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .with_context(|| {
                format!(
                    "truncated class file: need {len} bytes at offset {}, have {}",
                    self.pos,
                    self.bytes.len()
                )
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

pub fn parse_class_header(bytes: &[u8]) -> Result<ClassHeader> {
    let mut r = ClassReader::new(bytes);

    let magic = r.u32()?;
    if magic != CLASS_MAGIC {
        bail!("not a class file: magic {magic:#010x}");
    }
    let minor_version = r.u16()?;
    let major_version = r.u16()?;

    let pool = read_constant_pool(&mut r)?;

    let access_flags = r.u16()?;
    let this_class = class_name(&pool, r.u16()?).context("this_class")?;
    let super_index = r.u16()?;
    let super_class = if super_index == 0 {
        None
    } else {
        Some(class_name(&pool, super_index).context("super_class")?)
    };

    let interface_count = r.u16()?;
    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        interfaces.push(class_name(&pool, r.u16()?).context("interfaces")?);
    }

    skip_members(&mut r).context("fields")?;
    skip_members(&mut r).context("methods")?;

    let mut source_file = None;
    let attribute_count = r.u16()?;
    for _ in 0..attribute_count {
        let name_index = r.u16()?;
        let len = r.u32()? as usize;
        if utf8(&pool, name_index)? == "SourceFile" && len == 2 {
            source_file = Some(utf8(&pool, r.u16()?)?.to_string());
        } else {
            r.skip(len)?;
        }
    }

    Ok(ClassHeader {
        minor_version,
        major_version,
        access_flags,
        this_class,
        super_class,
        interfaces,
        source_file,
    })
}

fn read_constant_pool(r: &mut ClassReader<'_>) -> Result<Vec<Constant>> {
    let count = r.u16()? as usize;
    let mut pool = Vec::with_capacity(count.max(1));
    pool.push(Constant::Other);

    while pool.len() < count {
        let tag = r.u8()?;
        match tag {
            1 => {
                let len = r.u16()? as usize;
                let raw = r.take(len)?;
                pool.push(Constant::Utf8(String::from_utf8_lossy(raw).into_owned()));
            }
            7 => pool.push(Constant::Class(r.u16()?)),
            3 | 4 => {
                r.skip(4)?;
                pool.push(Constant::Other);
            }
            // Long and Double occupy two slots.
            5 | 6 => {
                r.skip(8)?;
                pool.push(Constant::Other);
                pool.push(Constant::Other);
            }
            8 | 16 | 19 | 20 => {
                r.skip(2)?;
                pool.push(Constant::Other);
            }
            9 | 10 | 11 | 12 | 17 | 18 => {
                r.skip(4)?;
                pool.push(Constant::Other);
            }
            15 => {
                r.skip(3)?;
                pool.push(Constant::Other);
            }
            _ => bail!("unknown constant pool tag {tag} at entry {}", pool.len()),
        }
    }

    Ok(pool)
}

fn skip_members(r: &mut ClassReader<'_>) -> Result<()> {
    let count = r.u16()?;
    for _ in 0..count {
        // access_flags, name_index, descriptor_index
        r.skip(6)?;
        let attributes = r.u16()?;
        for _ in 0..attributes {
            r.skip(2)?;
            let len = r.u32()? as usize;
            r.skip(len)?;
        }
    }
    Ok(())
}

fn utf8(pool: &[Constant], index: u16) -> Result<&str> {
    match pool.get(index as usize) {
        Some(Constant::Utf8(s)) => Ok(s),
        _ => bail!("constant #{index} is not a Utf8 entry"),
    }
}

fn class_name(pool: &[Constant], index: u16) -> Result<String> {
    match pool.get(index as usize) {
        Some(Constant::Class(name_index)) => Ok(utf8(pool, *name_index)?.to_string()),
        _ => bail!("constant #{index} is not a Class entry"),
    }
}

#[cfg(test)]
pub(crate) mod fixture {
    //! Hand-assembled class files for tests.

    pub struct ClassFile<'a> {
        pub name: &'a str,
        pub super_name: Option<&'a str>,
        pub interfaces: Vec<&'a str>,
        pub source_file: Option<&'a str>,
        pub access: u16,
        pub major: u16,
    }

    impl<'a> ClassFile<'a> {
        pub fn new(name: &'a str) -> Self {
            Self {
                name,
                super_name: Some("java/lang/Object"),
                interfaces: Vec::new(),
                source_file: None,
                access: 0x0021,
                major: 52,
            }
        }

        pub fn implementing(mut self, iface: &'a str) -> Self {
            self.interfaces.push(iface);
            self
        }

        pub fn source(mut self, file: &'a str) -> Self {
            self.source_file = Some(file);
            self
        }

        pub fn build(&self) -> Vec<u8> {
            let mut pool = Pool::default();
            let this_class = pool.class(self.name);
            let super_class = self.super_name.map(|s| pool.class(s)).unwrap_or(0);
            let interfaces: Vec<u16> = self.interfaces.iter().map(|i| pool.class(i)).collect();
            pool.long(42);
            let field_name = pool.utf8("value");
            let field_desc = pool.utf8("I");
            let init = pool.utf8("<init>");
            let init_desc = pool.utf8("()V");
            let code = pool.utf8("Code");
            let source = self
                .source_file
                .map(|s| (pool.utf8("SourceFile"), pool.utf8(s)));

            let mut out = Vec::new();
            out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
            out.extend_from_slice(&0u16.to_be_bytes());
            out.extend_from_slice(&self.major.to_be_bytes());
            out.extend_from_slice(&pool.next.to_be_bytes());
            out.extend_from_slice(&pool.bytes);

            push_u16(&mut out, self.access);
            push_u16(&mut out, this_class);
            push_u16(&mut out, super_class);
            push_u16(&mut out, interfaces.len() as u16);
            for i in &interfaces {
                push_u16(&mut out, *i);
            }

            push_u16(&mut out, 1);
            for v in [0x0002, field_name, field_desc, 0] {
                push_u16(&mut out, v);
            }

            let code_body: &[u8] = &[0, 1, 0, 1, 0, 0, 0, 1, 0xB1, 0, 0, 0, 0];
            push_u16(&mut out, 1);
            for v in [0x0001, init, init_desc, 1, code] {
                push_u16(&mut out, v);
            }
            out.extend_from_slice(&(code_body.len() as u32).to_be_bytes());
            out.extend_from_slice(code_body);

            match source {
                Some((attr, value)) => {
                    push_u16(&mut out, 1);
                    push_u16(&mut out, attr);
                    out.extend_from_slice(&2u32.to_be_bytes());
                    push_u16(&mut out, value);
                }
                None => push_u16(&mut out, 0),
            }
            out
        }
    }

    fn push_u16(out: &mut Vec<u8>, v: u16) {
        out.extend_from_slice(&v.to_be_bytes());
    }

    struct Pool {
        bytes: Vec<u8>,
        next: u16,
    }

    impl Default for Pool {
        fn default() -> Self {
            Self {
                bytes: Vec::new(),
                next: 1,
            }
        }
    }

    impl Pool {
        fn utf8(&mut self, s: &str) -> u16 {
            self.bytes.push(1);
            push_u16(&mut self.bytes, s.len() as u16);
            self.bytes.extend_from_slice(s.as_bytes());
            self.bump(1)
        }

        fn class(&mut self, name: &str) -> u16 {
            let name_index = self.utf8(name);
            self.bytes.push(7);
            push_u16(&mut self.bytes, name_index);
            self.bump(1)
        }

        fn long(&mut self, v: i64) -> u16 {
            self.bytes.push(5);
            self.bytes.extend_from_slice(&v.to_be_bytes());
            self.bump(2)
        }

        fn bump(&mut self, slots: u16) -> u16 {
            let index = self.next;
            self.next += slots;
            index
        }
    }
}
