//! Class units and the set of sibling class files decompiled together.
//!
//! A top-level class `Foo` is always decompiled with every `Foo$...` class
//! file next to it, so the engine can inline or reference nested, inner and
//! anonymous classes. Units live either on disk or inside a jar archive.

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use memmap2::Mmap;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::engine::BytecodeProvider;
use crate::error::DecompileError;

pub const CLASS_EXTENSION: &str = "class";
pub const ARCHIVE_SEPARATOR: &str = "!/";

/// Canonical form for lookup keys: forward slashes only.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassLocation {
    File(PathBuf),
    Archive { archive: PathBuf, entry: String },
}

impl ClassLocation {
    /// Parses `lib.jar!/org/example/Foo.class` as an archive entry, anything else as a file.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(ARCHIVE_SEPARATOR) {
            Some((archive, entry)) if !archive.is_empty() && !entry.is_empty() => {
                ClassLocation::Archive {
                    archive: PathBuf::from(archive),
                    entry: normalize_path(entry),
                }
            }
            _ => ClassLocation::File(PathBuf::from(raw)),
        }
    }

    pub fn key(&self) -> String {
        match self {
            ClassLocation::File(path) => normalize_path(&path.to_string_lossy()),
            ClassLocation::Archive { archive, entry } => format!(
                "{}{ARCHIVE_SEPARATOR}{}",
                normalize_path(&archive.to_string_lossy()),
                normalize_path(entry)
            ),
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            ClassLocation::File(path) => path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            ClassLocation::Archive { entry, .. } => {
                entry.rsplit_once('/').map(|(_, n)| n).unwrap_or(entry)
            }
        }
    }

    /// The archive entry name, if the unit lives inside an archive.
    pub fn internal_path(&self) -> Option<&str> {
        match self {
            ClassLocation::File(_) => None,
            ClassLocation::Archive { entry, .. } => Some(entry),
        }
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        match self {
            ClassLocation::File(path) => std::fs::read(path)
                .with_context(|| format!("Failed to read class file: {}", path.display())),
            ClassLocation::Archive { archive, entry } => {
                let mmap = map_archive(archive)?;
                let mut zip = open_archive(&mmap, archive)?;
                read_entry(&mut zip, archive, entry)
            }
        }
    }
}

impl fmt::Display for ClassLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// One class file: its location and the bytes read from it.
#[derive(Debug, Clone)]
pub struct ClassUnit {
    location: ClassLocation,
    key: String,
    bytes: Vec<u8>,
}

impl ClassUnit {
    pub fn new(location: ClassLocation, bytes: Vec<u8>) -> Self {
        let key = location.key();
        Self {
            location,
            key,
            bytes,
        }
    }

    pub fn read(location: ClassLocation) -> Result<Self> {
        let bytes = location.read()?;
        Ok(Self::new(location, bytes))
    }

    pub fn location(&self) -> &ClassLocation {
        &self.location
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn file_name(&self) -> &str {
        self.location.file_name()
    }

    /// File name without its extension, e.g. `Foo$Bar` for `Foo$Bar.class`.
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The `Outer$` prefix shared by this class's nested class files.
    pub fn nested_prefix(&self) -> String {
        format!("{}$", self.stem())
    }
}

/// The primary class plus its `Primary$...` siblings, in discovery order.
#[derive(Debug, Clone)]
pub struct CompilationUnitSet {
    units: Vec<ClassUnit>,
    index: HashMap<String, usize>,
}

impl CompilationUnitSet {
    /// Starts a set holding only `primary`.
    pub fn single(primary: ClassUnit) -> Self {
        let mut set = Self {
            units: Vec::new(),
            index: HashMap::new(),
        };
        set.insert(primary);
        set
    }

    pub fn discover(primary: ClassUnit) -> Result<Self> {
        let prefix = primary.nested_prefix();
        let siblings = match primary.location() {
            ClassLocation::File(path) => file_siblings(path, &prefix)?,
            ClassLocation::Archive { archive, entry } => archive_siblings(archive, entry, &prefix)?,
        };

        let mut set = Self::single(primary);
        for unit in siblings {
            set.insert(unit);
        }
        Ok(set)
    }

    fn insert(&mut self, unit: ClassUnit) {
        let key = unit.key().to_string();
        if self.index.contains_key(&key) {
            return;
        }
        self.index.insert(key, self.units.len());
        self.units.push(unit);
    }

    pub fn primary(&self) -> &ClassUnit {
        &self.units[0]
    }

    pub fn get(&self, path: &str) -> Option<&ClassUnit> {
        self.index
            .get(&normalize_path(path))
            .map(|i| &self.units[*i])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn keys(&self) -> Vec<String> {
        self.units.iter().map(|u| u.key().to_string()).collect()
    }

    pub fn units(&self) -> &[ClassUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl BytecodeProvider for CompilationUnitSet {
    fn get_bytecode(
        &self,
        external_path: &str,
        _internal_path: Option<&str>,
    ) -> Result<Vec<u8>, DecompileError> {
        let path = normalize_path(external_path);
        match self.get(&path) {
            Some(unit) => Ok(unit.bytes().to_vec()),
            None => Err(DecompileError::ProviderNotFound(path)),
        }
    }
}

fn is_nested_class_name(file_name: &str, prefix: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => ext == CLASS_EXTENSION && stem.starts_with(prefix),
        None => false,
    }
}

fn file_siblings(primary: &Path, prefix: &str) -> Result<Vec<ClassUnit>> {
    let dir = match primary.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let walker = WalkBuilder::new(&dir)
        .max_depth(Some(1))
        .hidden(false)
        .ignore(false)
        .parents(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut siblings = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to list directory: {}", dir.display()))?;
        if entry.depth() != 1 || !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if is_nested_class_name(&name, prefix) {
            siblings.push(ClassUnit::read(ClassLocation::File(entry.path().to_path_buf()))?);
        }
    }
    Ok(siblings)
}

/// Reads every `Outer$` sibling of `entry` from one mapping of the archive,
/// ordered by entry name.
fn archive_siblings(archive: &Path, entry: &str, prefix: &str) -> Result<Vec<ClassUnit>> {
    let mmap = map_archive(archive)?;
    let mut zip = open_archive(&mmap, archive)?;

    let dir = entry.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    let mut names: Vec<String> = zip
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .filter(|name| {
            let name = normalize_path(name);
            let (entry_dir, file_name) = name.rsplit_once('/').unwrap_or(("", name.as_str()));
            entry_dir == dir && is_nested_class_name(file_name, prefix)
        })
        .map(str::to_string)
        .collect();
    names.sort();

    let mut siblings = Vec::with_capacity(names.len());
    for name in names {
        let bytes = read_entry(&mut zip, archive, &name)?;
        let location = ClassLocation::Archive {
            archive: archive.to_path_buf(),
            entry: normalize_path(&name),
        };
        siblings.push(ClassUnit::new(location, bytes));
    }
    Ok(siblings)
}

fn open_archive<'a>(mmap: &'a Mmap, archive: &Path) -> Result<ZipArchive<Cursor<&'a [u8]>>> {
    ZipArchive::new(Cursor::new(&mmap[..]))
        .with_context(|| format!("Failed to read zip structure: {}", archive.display()))
}

fn read_entry(zip: &mut ZipArchive<Cursor<&[u8]>>, archive: &Path, entry: &str) -> Result<Vec<u8>> {
    let mut file = zip
        .by_name(entry)
        .with_context(|| format!("Entry {entry} not found in {}", archive.display()))?;
    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes)
        .with_context(|| format!("Failed to read {entry} from {}", archive.display()))?;
    Ok(bytes)
}

fn map_archive(archive: &Path) -> Result<Mmap> {
    let file = File::open(archive)
        .with_context(|| format!("Failed to open archive: {}", archive.display()))?;
    // SAFETY: The file is opened read-only and the map is dropped before this request ends.
    unsafe { Mmap::map(&file) }.with_context(|| format!("mmap failed: {}", archive.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{SystemTime, UNIX_EPOCH};
    use zip::write::FileOptions;

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "classview_source_test_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> Result<()> {
        let file = File::create(path)?;
        let mut zip = zip::ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            zip.start_file(*name, options)?;
            zip.write_all(content)?;
        }
        zip.finish()?;
        Ok(())
    }

    #[test]
    fn discovers_nested_siblings_in_directory() -> Result<()> {
        let dir = temp_dir("discover_dir");
        std::fs::create_dir_all(&dir)?;
        for name in ["Foo.class", "Foo$1.class", "Foo$Bar.class", "FooHelper.class", "Foo$Bar.java"] {
            std::fs::write(dir.join(name), name.as_bytes())?;
        }

        let primary = ClassUnit::read(ClassLocation::File(dir.join("Foo.class")))?;
        let set = CompilationUnitSet::discover(primary)?;
        let names: Vec<&str> = set.units().iter().map(|u| u.file_name()).collect();
        assert_eq!(names, vec!["Foo.class", "Foo$1.class", "Foo$Bar.class"]);
        assert_eq!(set.primary().file_name(), "Foo.class");
        assert_eq!(set.get(&dir.join("Foo$Bar.class").to_string_lossy()).map(|u| u.bytes()), Some(&b"Foo$Bar.class"[..]));

        std::fs::remove_dir_all(dir)?;
        Ok(())
    }

    #[test]
    fn discovers_nested_siblings_in_archive() -> Result<()> {
        let dir = temp_dir("discover_jar");
        std::fs::create_dir_all(&dir)?;
        let jar = dir.join("lib.jar");
        write_jar(
            &jar,
            &[
                ("org/example/Foo.class", b"foo"),
                ("org/example/Foo$Inner.class", b"inner"),
                ("org/example/FooHelper.class", b"helper"),
                ("org/other/Foo$Inner.class", b"elsewhere"),
                ("META-INF/MANIFEST.MF", b""),
            ],
        )?;

        let location = ClassLocation::parse(&format!("{}!/org/example/Foo.class", jar.display()));
        assert_eq!(location.internal_path(), Some("org/example/Foo.class"));
        let set = CompilationUnitSet::discover(ClassUnit::read(location)?)?;
        let entries: Vec<Option<&str>> =
            set.units().iter().map(|u| u.location().internal_path()).collect();
        assert_eq!(
            entries,
            vec![Some("org/example/Foo.class"), Some("org/example/Foo$Inner.class")]
        );
        assert_eq!(set.units()[1].bytes(), b"inner");

        std::fs::remove_dir_all(dir)?;
        Ok(())
    }

    #[test]
    fn archive_siblings_are_read_in_entry_order() -> Result<()> {
        let dir = temp_dir("jar_order");
        std::fs::create_dir_all(&dir)?;
        let jar = dir.join("lib.jar");
        write_jar(
            &jar,
            &[
                ("a/Foo$Zed.class", b"zed"),
                ("a/Foo.class", b"foo"),
                ("a/Foo$1.class", b"one"),
                ("a/", b""),
                ("a/Foo$Bar.class", b"bar"),
            ],
        )?;

        let location = ClassLocation::parse(&format!("{}!/a/Foo.class", jar.display()));
        let set = CompilationUnitSet::discover(ClassUnit::read(location)?)?;
        let units: Vec<(&str, &[u8])> = set
            .units()
            .iter()
            .map(|u| (u.file_name(), u.bytes()))
            .collect();
        assert_eq!(
            units,
            vec![
                ("Foo.class", &b"foo"[..]),
                ("Foo$1.class", &b"one"[..]),
                ("Foo$Bar.class", &b"bar"[..]),
                ("Foo$Zed.class", &b"zed"[..]),
            ]
        );
        let key = format!("{}!/a/Foo$Bar.class", normalize_path(&jar.to_string_lossy()));
        assert_eq!(set.get_bytecode(&key, Some("a/Foo$Bar.class")).ok(), Some(b"bar".to_vec()));

        std::fs::remove_dir_all(dir)?;
        Ok(())
    }

    #[test]
    fn provider_normalizes_separators_and_rejects_unknown_paths() {
        let unit = ClassUnit::new(
            ClassLocation::File(PathBuf::from("out/classes/Foo.class")),
            vec![1, 2, 3],
        );
        let set = CompilationUnitSet::single(unit);
        assert_eq!(
            set.get_bytecode("out\\classes\\Foo.class", None).unwrap(),
            vec![1, 2, 3]
        );
        let err = set.get_bytecode("out/classes/Bar.class", None).unwrap_err();
        assert!(matches!(err, DecompileError::ProviderNotFound(p) if p == "out/classes/Bar.class"));
    }

    #[test]
    fn location_parse_and_names() {
        let file = ClassLocation::parse("build/Foo$1.class");
        assert_eq!(file, ClassLocation::File(PathBuf::from("build/Foo$1.class")));
        assert_eq!(file.file_name(), "Foo$1.class");
        assert_eq!(file.internal_path(), None);

        let entry = ClassLocation::parse("lib.jar!/a/b/Foo.class");
        assert_eq!(entry.key(), "lib.jar!/a/b/Foo.class");
        assert_eq!(entry.file_name(), "Foo.class");

        let unit = ClassUnit::new(entry, Vec::new());
        assert_eq!(unit.stem(), "Foo");
        assert_eq!(unit.nested_prefix(), "Foo$");
    }
}
