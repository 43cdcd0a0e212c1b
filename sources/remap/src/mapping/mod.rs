//! Symbol mappings: old name to new name for classes, fields and methods.
//!
//! Lookups are exact-key only. A table loaded in [`Direction::Reverse`] has
//! its keys and values swapped up front, so callers never care which way it
//! was loaded.

use std::{collections::HashMap, fmt, fs, path::Path};

use support::descriptor::{remap_descriptor, MethodType};
use tracing::{debug, info};

use crate::error::{RemapError, Result};
use crate::mapping_error;

pub mod proguard;
pub mod srg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MappingEntry {
    Class {
        old: String,
        new: String,
    },
    Field {
        owner: String,
        old: String,
        new: String,
    },
    Method {
        owner: String,
        old: String,
        descriptor: String,
        new: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingFormat {
    /// `CL:`/`FD:`/`MD:` lines
    Srg,
    /// Compact SRG, bare `old new` tokens
    Csrg,
    /// CSRG grouped under class lines with tab-indented members
    Tsrg,
    /// `original -> obfuscated:` mapping files
    Proguard,
}

impl MappingFormat {
    pub fn detect(source: &str) -> Self {
        let mut indented = false;

        for line in source
            .lines()
            .map(|line| line.trim_end())
            .filter(|line| !line.is_empty() && !line.trim_start().starts_with('#'))
            .take(64)
        {
            if ["PK: ", "CL: ", "FD: ", "MD: "]
                .iter()
                .any(|prefix| line.starts_with(prefix))
            {
                return MappingFormat::Srg;
            }

            if line.contains(" -> ") {
                return MappingFormat::Proguard;
            }

            indented |= line.starts_with('\t');
        }

        if indented {
            MappingFormat::Tsrg
        } else {
            MappingFormat::Csrg
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    classes: HashMap<String, String>,
    fields: HashMap<FieldKey, String>,
    methods: HashMap<MethodKey, String>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path, direction: Direction) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|source| RemapError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let table = Self::parse(&source, direction)?;
        info!(
            "Loaded {} ({:?}): {} classes, {} fields, {} methods",
            path.display(),
            direction,
            table.classes.len(),
            table.fields.len(),
            table.methods.len()
        );

        Ok(table)
    }

    pub fn parse(source: &str, direction: Direction) -> Result<Self> {
        let format = MappingFormat::detect(source);
        debug!("Detected {:?} mappings", format);

        let entries = match format {
            MappingFormat::Srg => srg::parse_srg(source)?,
            MappingFormat::Csrg => srg::parse_csrg(source)?,
            MappingFormat::Tsrg => srg::parse_tsrg(source)?,
            MappingFormat::Proguard => proguard::parse_proguard(source)?,
        };

        Self::from_entries(entries, direction)
    }

    /// Build a table from entries tagged with the line they came from.
    pub fn from_entries(entries: Vec<(usize, MappingEntry)>, direction: Direction) -> Result<Self> {
        let mut forward = Self::new();
        for (line, entry) in &entries {
            forward.insert(*line, entry.clone())?;
        }

        if direction == Direction::Forward {
            return Ok(forward);
        }

        // Owners and descriptors of reversed members are spelled in the new namespace
        let mut reverse = Self::new();
        for (line, entry) in entries {
            let entry = match entry {
                MappingEntry::Class { old, new } => MappingEntry::Class { old: new, new: old },
                MappingEntry::Field { owner, old, new } => MappingEntry::Field {
                    owner: forward.map_class_or_keep(&owner),
                    old: new,
                    new: old,
                },
                MappingEntry::Method {
                    owner,
                    old,
                    descriptor,
                    new,
                } => MappingEntry::Method {
                    owner: forward.map_class_or_keep(&owner),
                    old: new,
                    descriptor: forward
                        .map_descriptor(&descriptor)
                        .map_err(|e| mapping_error!(line, "{}", e))?,
                    new: old,
                },
            };

            reverse.insert(line, entry)?;
        }

        Ok(reverse)
    }

    /// Add an entry. Repeating an identical entry is fine, a conflicting one is not.
    pub fn insert(&mut self, line: usize, entry: MappingEntry) -> Result<()> {
        match entry {
            MappingEntry::Class { old, new } => {
                if let Some(existing) = self.classes.get(&old) {
                    if *existing != new {
                        return Err(mapping_error!(
                            line,
                            "class {} is already mapped to {}, not {}",
                            old,
                            existing,
                            new
                        ));
                    }
                }
                self.classes.insert(old, new);
            }
            MappingEntry::Field { owner, old, new } => {
                let key = FieldKey { owner, name: old };
                if let Some(existing) = self.fields.get(&key) {
                    if *existing != new {
                        return Err(mapping_error!(
                            line,
                            "field {} is already mapped to {}, not {}",
                            key,
                            existing,
                            new
                        ));
                    }
                }
                self.fields.insert(key, new);
            }
            MappingEntry::Method {
                owner,
                old,
                descriptor,
                new,
            } => {
                MethodType::parse(&descriptor).map_err(|e| mapping_error!(line, "{}", e))?;

                let key = MethodKey {
                    owner,
                    name: old,
                    descriptor,
                };
                if let Some(existing) = self.methods.get(&key) {
                    if *existing != new {
                        return Err(mapping_error!(
                            line,
                            "method {} is already mapped to {}, not {}",
                            key,
                            existing,
                            new
                        ));
                    }
                }
                self.methods.insert(key, new);
            }
        }

        Ok(())
    }

    pub fn lookup_class(&self, name: &str) -> Option<&str> {
        self.classes.get(name).map(|s| s.as_str())
    }

    pub fn lookup_field(&self, owner: &str, name: &str) -> Option<&str> {
        let key = FieldKey {
            owner: owner.to_string(),
            name: name.to_string(),
        };
        self.fields.get(&key).map(|s| s.as_str())
    }

    pub fn lookup_method(&self, owner: &str, name: &str, descriptor: &str) -> Option<&str> {
        let key = MethodKey {
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        };
        self.methods.get(&key).map(|s| s.as_str())
    }

    fn map_class_or_keep(&self, name: &str) -> String {
        self.lookup_class(name).unwrap_or(name).to_string()
    }

    /// Rewrite the classes named by a descriptor. Fails on malformed descriptors.
    pub fn map_descriptor(&self, descriptor: &str) -> anyhow::Result<String> {
        remap_descriptor(descriptor, &|class| self.lookup_class(class).map(|s| s.to_string()))
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.fields.is_empty() && self.methods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRG: &str = "\
PK: ./ net/minecraft
CL: a net/minecraft/World
CL: b net/minecraft/Entity
FD: a/c net/minecraft/World/time
MD: a/d (Lb;I)La; net/minecraft/World/spawn (Lnet/minecraft/Entity;I)Lnet/minecraft/World;
";

    #[test]
    fn it_looks_up_exact_keys() -> anyhow::Result<()> {
        let table = MappingTable::parse(SRG, Direction::Forward)?;

        assert_eq!(table.lookup_class("a"), Some("net/minecraft/World"));
        assert_eq!(table.lookup_field("a", "c"), Some("time"));
        assert_eq!(table.lookup_method("a", "d", "(Lb;I)La;"), Some("spawn"));

        assert_eq!(table.lookup_class("net/minecraft"), None);
        assert_eq!(table.lookup_field("b", "c"), None);
        assert_eq!(table.lookup_method("a", "d", "(Lb;J)La;"), None);

        Ok(())
    }

    #[test]
    fn it_swaps_keys_when_reversed() -> anyhow::Result<()> {
        let table = MappingTable::parse(SRG, Direction::Reverse)?;

        assert_eq!(table.lookup_class("net/minecraft/World"), Some("a"));
        assert_eq!(table.lookup_field("net/minecraft/World", "time"), Some("c"));
        assert_eq!(
            table.lookup_method(
                "net/minecraft/World",
                "spawn",
                "(Lnet/minecraft/Entity;I)Lnet/minecraft/World;"
            ),
            Some("d")
        );
        assert_eq!(table.lookup_class("a"), None);

        Ok(())
    }

    #[test]
    fn it_tolerates_identical_duplicates() -> anyhow::Result<()> {
        let table = MappingTable::parse("a b\na b\na c d\na c d\n", Direction::Forward)?;
        assert_eq!(table.class_count(), 1);
        assert_eq!(table.field_count(), 1);

        Ok(())
    }

    #[test]
    fn it_rejects_conflicting_duplicates() {
        let result = MappingTable::parse("a b\nc d\na e\n", Direction::Forward);
        assert!(matches!(result, Err(RemapError::MappingParse { line: 3, .. })));

        // Two classes collapsing onto one name cannot be reversed
        let result = MappingTable::parse("a x\nb x\n", Direction::Reverse);
        assert!(matches!(result, Err(RemapError::MappingParse { line: 2, .. })));
    }

    #[test]
    fn it_rejects_bad_method_descriptors() {
        let result = MappingTable::parse("a b (I c\n", Direction::Forward);
        assert!(matches!(result, Err(RemapError::MappingParse { line: 1, .. })));
    }

    #[test]
    fn it_detects_formats() {
        assert_eq!(MappingFormat::detect(SRG), MappingFormat::Srg);
        assert_eq!(MappingFormat::detect("# header\na b\na c d\n"), MappingFormat::Csrg);
        assert_eq!(MappingFormat::detect("a b\n\tc d\n"), MappingFormat::Tsrg);
        assert_eq!(
            MappingFormat::detect("# compiler: R8\nnet.World -> a:\n    int time -> c\n"),
            MappingFormat::Proguard
        );
    }
}
