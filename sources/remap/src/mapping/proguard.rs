//! ProGuard mapping files, as published alongside obfuscated releases.
//!
//! The obfuscated names are the "old" side of every entry, so a forward
//! table renames obfuscated code to readable names and a reverse table goes
//! back to the obfuscated namespace.

use std::collections::HashMap;

use proguard::{ProguardMapping, ProguardRecord};

use crate::error::Result;
use crate::mapping::MappingEntry;
use crate::mapping_error;

fn internal_name(java_name: &str) -> String {
    java_name.replace('.', "/")
}

/// Convert a Java source type such as `int[]` or `java.lang.String` into a
/// descriptor, naming classes by their obfuscated names where known.
fn type_descriptor(java_type: &str, classes: &HashMap<String, String>) -> String {
    let mut element = java_type.trim();
    let mut dimensions = 0;
    while let Some(stripped) = element.strip_suffix("[]") {
        element = stripped;
        dimensions += 1;
    }

    let base = match element {
        "boolean" => "Z".to_string(),
        "byte" => "B".to_string(),
        "char" => "C".to_string(),
        "short" => "S".to_string(),
        "int" => "I".to_string(),
        "long" => "J".to_string(),
        "float" => "F".to_string(),
        "double" => "D".to_string(),
        "void" => "V".to_string(),
        class => {
            let name = internal_name(class);
            let name = classes.get(&name).cloned().unwrap_or(name);
            format!("L{};", name)
        }
    };

    format!("{}{}", "[".repeat(dimensions), base)
}

fn method_descriptor(arguments: &str, return_type: &str, classes: &HashMap<String, String>) -> String {
    let parameters: String = arguments
        .split(',')
        .filter(|argument| !argument.trim().is_empty())
        .map(|argument| type_descriptor(argument, classes))
        .collect();

    format!("({}){}", parameters, type_descriptor(return_type, classes))
}

pub fn parse_proguard(source: &str) -> Result<Vec<(usize, MappingEntry)>> {
    let mapping = ProguardMapping::new(source.as_bytes());

    // Member types are written with readable names, collect the class table first
    let mut classes = HashMap::new();
    for (index, record) in mapping.iter().enumerate() {
        match record {
            Ok(ProguardRecord::Class {
                original,
                obfuscated,
            }) => {
                classes.insert(internal_name(original), internal_name(obfuscated));
            }
            Ok(_) => {}
            Err(e) => return Err(mapping_error!(index + 1, "{}", e)),
        }
    }

    let mut entries = vec![];
    let mut owner: Option<String> = None;

    for (index, record) in mapping.iter().enumerate() {
        let line = index + 1;
        let record = record.map_err(|e| mapping_error!(line, "{}", e))?;

        let entry = match record {
            ProguardRecord::Class {
                original,
                obfuscated,
            } => {
                let obfuscated = internal_name(obfuscated);
                owner = Some(obfuscated.clone());

                MappingEntry::Class {
                    old: obfuscated,
                    new: internal_name(original),
                }
            }
            ProguardRecord::Field {
                original,
                obfuscated,
                ..
            } => MappingEntry::Field {
                owner: owner
                    .clone()
                    .ok_or_else(|| mapping_error!(line, "field outside of a class"))?,
                old: obfuscated.to_string(),
                new: original.to_string(),
            },
            ProguardRecord::Method {
                ty,
                original,
                obfuscated,
                arguments,
                original_class,
                ..
            } => {
                // Inlined frames from other classes describe line numbers, not members
                if original_class.is_some() || original.starts_with('<') {
                    continue;
                }

                MappingEntry::Method {
                    owner: owner
                        .clone()
                        .ok_or_else(|| mapping_error!(line, "method outside of a class"))?,
                    old: obfuscated.to_string(),
                    descriptor: method_descriptor(arguments, ty, &classes),
                    new: original.to_string(),
                }
            }
            // Headers carry compiler and source file metadata only
            _ => continue,
        };

        entries.push((line, entry));
    }

    Ok(entries)
}
