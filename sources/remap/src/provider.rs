//! Sources of class bytes for the inheritance graph.

use std::{
    collections::HashMap,
    fs::{self, File},
    io::{self, BufReader, Read},
    path::{Path, PathBuf},
};

use parse::parser::Parser;
use tracing::debug;
use zip::ZipArchive;

use crate::error::{RemapError, Result};

/// Hands out the bytes of classes by internal name.
pub trait ClassProvider {
    /// Where the classes come from, for diagnostics.
    fn describe(&self) -> String;

    /// Internal names of every class this provider holds, in a stable order.
    fn names(&self) -> Vec<String>;

    fn class_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>>;
}

/// The internal name a class entry path stands for, if it is a class that
/// belongs in a hierarchy.
pub fn class_name_of(path: &str) -> Option<&str> {
    let name = path.strip_suffix(".class")?;

    // Versioned overrides repeat classes already present at the root
    if name.starts_with("META-INF/") || name.is_empty() {
        return None;
    }

    let simple = name.rsplit('/').next().unwrap_or(name);
    if simple == "module-info" || simple == "package-info" {
        return None;
    }

    Some(name)
}

pub struct JarProvider {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
    names: Vec<String>,
}

impl JarProvider {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| RemapError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let archive = ZipArchive::new(BufReader::new(file)).map_err(|source| RemapError::Archive {
            path: path.to_path_buf(),
            source,
        })?;

        let names = archive
            .file_names()
            .filter_map(class_name_of)
            .map(|name| name.to_string())
            .collect::<Vec<_>>();

        debug!("Opened {} with {} classes", path.display(), names.len());

        Ok(Self {
            path: path.to_path_buf(),
            archive,
            names,
        })
    }
}

impl ClassProvider for JarProvider {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn class_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut entry = match self.archive.by_name(&format!("{}.class", name)) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(source) => {
                return Err(RemapError::Archive {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|source| RemapError::Io {
                path: self.path.clone(),
                source,
            })?;

        Ok(Some(bytes))
    }
}

/// An exploded class directory, laid out by package.
pub struct DirectoryProvider {
    root: PathBuf,
    names: Vec<String>,
}

impl DirectoryProvider {
    pub fn open(root: &Path) -> Result<Self> {
        let mut names = vec![];
        Self::walk(root, "", &mut names)?;
        names.sort();

        debug!("Opened {} with {} classes", root.display(), names.len());

        Ok(Self {
            root: root.to_path_buf(),
            names,
        })
    }

    fn walk(dir: &Path, prefix: &str, names: &mut Vec<String>) -> Result<()> {
        let io_error = |source: io::Error| RemapError::Io {
            path: dir.to_path_buf(),
            source,
        };

        for entry in fs::read_dir(dir).map_err(io_error)? {
            let entry = entry.map_err(io_error)?;
            let file_name = entry.file_name().to_string_lossy().to_string();
            let relative = format!("{}{}", prefix, file_name);

            if entry.file_type().map_err(io_error)?.is_dir() {
                Self::walk(&entry.path(), &format!("{}/", relative), names)?;
            } else if let Some(name) = class_name_of(&relative) {
                names.push(name.to_string());
            }
        }

        Ok(())
    }
}

impl ClassProvider for DirectoryProvider {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn class_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.root.join(format!("{}.class", name));
        if !path.exists() {
            return Ok(None);
        }

        fs::read(&path)
            .map(Some)
            .map_err(|source| RemapError::Io { path, source })
    }
}

/// Classes held in memory, keyed by the name found in their own header.
#[derive(Default)]
pub struct MemoryProvider {
    classes: HashMap<String, Vec<u8>>,
    order: Vec<String>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bytes: Vec<u8>) -> anyhow::Result<String> {
        let name = Parser::new(&bytes).parse_header()?.name;

        if self.classes.insert(name.clone(), bytes).is_none() {
            self.order.push(name.clone());
        }

        Ok(name)
    }
}

impl ClassProvider for MemoryProvider {
    fn describe(&self) -> String {
        "<memory>".to_string()
    }

    fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn class_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.classes.get(name).cloned())
    }
}

/// Open an auxiliary classpath entry, a jar or a class directory.
pub fn open_classpath_entry(path: &Path) -> Result<Box<dyn ClassProvider>> {
    let unresolved = |source: RemapError| RemapError::UnresolvedClasspathEntry {
        path: path.to_path_buf(),
        source: source.into(),
    };

    if path.is_dir() {
        Ok(Box::new(DirectoryProvider::open(path).map_err(unresolved)?))
    } else {
        Ok(Box::new(JarProvider::open(path).map_err(unresolved)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parse::builder::ClassBuilder;

    #[test]
    fn it_recognises_class_entries() {
        assert_eq!(class_name_of("a/B.class"), Some("a/B"));
        assert_eq!(class_name_of("B$1.class"), Some("B$1"));
        assert_eq!(class_name_of("module-info.class"), None);
        assert_eq!(class_name_of("a/package-info.class"), None);
        assert_eq!(class_name_of("META-INF/versions/17/a/B.class"), None);
        assert_eq!(class_name_of("a/B.txt"), None);
    }

    #[test]
    fn it_keys_memory_classes_by_header() -> anyhow::Result<()> {
        let mut provider = MemoryProvider::new();
        let name = provider.insert(ClassBuilder::new("net/World", None)?.to_bytes()?)?;

        assert_eq!(name, "net/World");
        assert_eq!(provider.names(), vec!["net/World".to_string()]);
        assert!(provider.class_bytes("net/World")?.is_some());
        assert!(provider.class_bytes("net/Entity")?.is_none());

        Ok(())
    }

    #[test]
    fn it_reads_class_directories() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        fs::create_dir_all(root.path().join("net/world"))?;
        fs::write(
            root.path().join("net/world/World.class"),
            ClassBuilder::new("net/world/World", None)?.to_bytes()?,
        )?;
        fs::write(root.path().join("net/readme.txt"), b"hello")?;

        let mut provider = DirectoryProvider::open(root.path())?;
        assert_eq!(provider.names(), vec!["net/world/World".to_string()]);
        assert!(provider.class_bytes("net/world/World")?.is_some());

        Ok(())
    }

    #[test]
    fn it_ignores_overstated_entry_sizes() -> anyhow::Result<()> {
        use std::io::Write;
        use zip::{write::FileOptions, ZipWriter};

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("lib.jar");
        let class = ClassBuilder::new("net/World", None)?.to_bytes()?;

        let mut writer = ZipWriter::new(File::create(&path)?);
        writer.start_file("net/World.class", FileOptions::default())?;
        writer.write_all(&class)?;
        writer.finish()?;

        // Claim 2 GiB in the central directory
        let mut data = fs::read(&path)?;
        let record = data
            .windows(4)
            .position(|window| window == [0x50, 0x4b, 0x01, 0x02])
            .ok_or(anyhow::anyhow!("no central directory"))?;
        data[record + 24..record + 28].copy_from_slice(&0x7fff_ffffu32.to_le_bytes());
        fs::write(&path, data)?;

        let mut provider = JarProvider::open(&path)?;
        assert_eq!(provider.class_bytes("net/World")?, Some(class));

        Ok(())
    }

    #[test]
    fn it_reports_missing_classpath_entries() {
        let result = open_classpath_entry(Path::new("/nonexistent/lib.jar"));
        assert!(matches!(
            result,
            Err(RemapError::UnresolvedClasspathEntry { .. })
        ));
    }
}
