//! The SRG family of line formats.

use crate::error::Result;
use crate::mapping::MappingEntry;
use crate::mapping_error;

/// Non-empty lines with comments removed, numbered from 1.
/// Leading whitespace is kept, TSRG relies on it.
fn lines(source: &str) -> impl Iterator<Item = (usize, &str)> {
    source
        .lines()
        .enumerate()
        .map(|(index, line)| {
            let line = match line.find('#') {
                Some(comment) => &line[..comment],
                None => line,
            };
            (index + 1, line.trim_end())
        })
        .filter(|(_, line)| !line.trim_start().is_empty())
}

fn split_member(line: usize, path: &str) -> Result<(&str, &str)> {
    path.rsplit_once('/')
        .filter(|(owner, name)| !owner.is_empty() && !name.is_empty())
        .ok_or_else(|| mapping_error!(line, "{:?} is not an owner/name pair", path))
}

fn is_package(name: &str) -> bool {
    name == "." || name == "./" || name.ends_with('/')
}

fn class(old: &str, new: &str) -> MappingEntry {
    MappingEntry::Class {
        old: old.to_string(),
        new: new.to_string(),
    }
}

fn field(owner: &str, old: &str, new: &str) -> MappingEntry {
    MappingEntry::Field {
        owner: owner.to_string(),
        old: old.to_string(),
        new: new.to_string(),
    }
}

fn method(owner: &str, old: &str, descriptor: &str, new: &str) -> MappingEntry {
    MappingEntry::Method {
        owner: owner.to_string(),
        old: old.to_string(),
        descriptor: descriptor.to_string(),
        new: new.to_string(),
    }
}

pub fn parse_srg(source: &str) -> Result<Vec<(usize, MappingEntry)>> {
    let mut entries = vec![];

    for (line, text) in lines(source) {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let entry = match tokens.as_slice() {
            // Package renames only matter for source remapping
            ["PK:", ..] => continue,
            ["CL:", old, new] => class(old, new),
            ["FD:", old, new] => {
                let (owner, old) = split_member(line, old)?;
                let (_, new) = split_member(line, new)?;
                field(owner, old, new)
            }
            ["MD:", old, descriptor, new, _] => {
                let (owner, old) = split_member(line, old)?;
                let (_, new) = split_member(line, new)?;
                method(owner, old, descriptor, new)
            }
            _ => return Err(mapping_error!(line, "unrecognised SRG line {:?}", text)),
        };

        entries.push((line, entry));
    }

    Ok(entries)
}

pub fn parse_csrg(source: &str) -> Result<Vec<(usize, MappingEntry)>> {
    let mut entries = vec![];

    for (line, text) in lines(source) {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let entry = match tokens.as_slice() {
            [old, new] if is_package(old) && is_package(new) => continue,
            [old, new] => class(old, new),
            [owner, old, new] => field(owner, old, new),
            [owner, old, descriptor, new] => method(owner, old, descriptor, new),
            _ => return Err(mapping_error!(line, "expected 2 to 4 tokens, found {}", tokens.len())),
        };

        entries.push((line, entry));
    }

    Ok(entries)
}

pub fn parse_tsrg(source: &str) -> Result<Vec<(usize, MappingEntry)>> {
    let mut entries = vec![];
    let mut owner: Option<&str> = None;

    for (line, text) in lines(source) {
        if text.starts_with("tsrg2 ") {
            return Err(mapping_error!(line, "TSRG v2 mappings are not supported"));
        }

        let indented = text.starts_with('\t') || text.starts_with(' ');
        let tokens: Vec<&str> = text.split_whitespace().collect();

        if !indented {
            owner = None;
            let entry = match tokens.as_slice() {
                [old, new] if is_package(old) && is_package(new) => continue,
                [old, new] => {
                    owner = Some(*old);
                    class(old, new)
                }
                _ => return Err(mapping_error!(line, "expected a class line, found {:?}", text)),
            };

            entries.push((line, entry));
            continue;
        }

        let owner = owner.ok_or_else(|| mapping_error!(line, "member line outside of a class"))?;
        let entry = match tokens.as_slice() {
            [old, new] => field(owner, old, new),
            [old, descriptor, new] => method(owner, old, descriptor, new),
            _ => return Err(mapping_error!(line, "expected a member line, found {:?}", text)),
        };

        entries.push((line, entry));
    }

    Ok(entries)
}
