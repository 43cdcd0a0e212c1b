//! Rewriting whole archives, one entry at a time.

use std::{
    collections::HashSet,
    fs::File,
    io::{self, BufReader, Read, Write},
    path::{Path, PathBuf},
};

use parse::{classfile::ClassFile, parser::Parser};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::{result::ZipError, write::FileOptions, CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{RemapError, Result};
use crate::inheritance::InheritanceGraph;
use crate::mapping::MappingTable;
use crate::resolver::Resolver;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    pub classes: usize,
    pub resources: usize,
    /// Entries written under a new name, as (input, output)
    pub renamed: Vec<(String, String)>,
}

impl RewriteReport {
    pub fn entries(&self) -> usize {
        self.classes + self.resources
    }
}

/// A class rewritten in memory.
#[derive(Debug, Clone)]
pub struct RewrittenClass {
    pub old_name: String,
    pub new_name: String,
    pub bytes: Vec<u8>,
    /// How many reference sites changed
    pub rewritten: usize,
}

fn is_class_entry(name: &str) -> bool {
    name.ends_with(".class") && name.rsplit('/').next() != Some("module-info.class")
}

/// Where a renamed class is written, keeping any prefix in front of its package path.
fn entry_name_for(entry: &str, old_name: &str, new_name: &str) -> String {
    match entry
        .strip_suffix(".class")
        .and_then(|stem| stem.strip_suffix(old_name))
    {
        Some(prefix) if prefix.is_empty() || prefix.ends_with('/') => {
            format!("{}{}.class", prefix, new_name)
        }
        _ => entry.to_string(),
    }
}

fn claim(written: &mut HashSet<String>, name: &str) -> Result<()> {
    if written.insert(name.to_string()) {
        Ok(())
    } else {
        Err(RemapError::DuplicateEntry {
            name: name.to_string(),
        })
    }
}

fn io_error(path: &Path) -> impl Fn(io::Error) -> RemapError + '_ {
    move |source| RemapError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn archive_error(path: &Path) -> impl Fn(ZipError) -> RemapError + '_ {
    move |source| RemapError::Archive {
        path: path.to_path_buf(),
        source,
    }
}

pub struct ArchiveRewriter<'r> {
    resolver: Resolver<'r>,
}

impl<'r> ArchiveRewriter<'r> {
    pub fn new(mappings: &'r MappingTable, graph: &'r InheritanceGraph) -> Self {
        Self {
            resolver: Resolver::new(mappings, graph),
        }
    }

    pub fn rewrite_class(&self, bytes: &[u8]) -> anyhow::Result<RewrittenClass> {
        let mut class: ClassFile = Parser::new(bytes).parse()?;
        let old_name = class.name()?;

        let rewritten = class.remap(&self.resolver)?;
        if rewritten == 0 {
            return Ok(RewrittenClass {
                new_name: old_name.clone(),
                old_name,
                bytes: bytes.to_vec(),
                rewritten,
            });
        }

        Ok(RewrittenClass {
            old_name,
            new_name: class.name()?,
            bytes: class.to_bytes()?,
            rewritten,
        })
    }

    /// Rewrite `input` into `output`. Nothing is written to `output` unless
    /// every entry succeeds.
    pub fn rewrite_archive(&self, input: &Path, output: &Path) -> Result<RewriteReport> {
        let file = File::open(input).map_err(io_error(input))?;
        let mut archive = ZipArchive::new(BufReader::new(file)).map_err(archive_error(input))?;

        let parent = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = NamedTempFile::new_in(&parent).map_err(io_error(&parent))?;
        let mut writer = ZipWriter::new(temp);

        let mut report = RewriteReport::default();
        let mut written = HashSet::new();

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(archive_error(input))?;
            let name = entry.name().to_string();

            if entry.is_dir() || !is_class_entry(&name) {
                debug!("Copying {}", name);
                claim(&mut written, &name)?;
                writer.raw_copy_file(entry).map_err(archive_error(output))?;
                report.resources += 1;
                continue;
            }

            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).map_err(io_error(input))?;

            let class = self
                .rewrite_class(&bytes)
                .map_err(|source| RemapError::MalformedClass {
                    entry: name.clone(),
                    source,
                })?;

            let target = entry_name_for(&name, &class.old_name, &class.new_name);
            debug!("Rewrote {} sites in {} -> {}", class.rewritten, name, target);
            claim(&mut written, &target)?;

            let compression = match entry.compression() {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let mut options = FileOptions::default()
                .compression_method(compression)
                .last_modified_time(entry.last_modified());
            if let Some(mode) = entry.unix_mode() {
                options = options.unix_permissions(mode);
            }

            writer
                .start_file(target.clone(), options)
                .map_err(archive_error(output))?;
            writer.write_all(&class.bytes).map_err(io_error(output))?;

            if target != name {
                report.renamed.push((name, target));
            }
            report.classes += 1;
        }

        let temp = writer.finish().map_err(archive_error(output))?;
        temp.persist(output).map_err(|e| RemapError::Io {
            path: output.to_path_buf(),
            source: e.error,
        })?;

        info!(
            "Wrote {}: {} classes ({} renamed), {} resources",
            output.display(),
            report.classes,
            report.renamed.len(),
            report.resources
        );

        Ok(report)
    }
}
