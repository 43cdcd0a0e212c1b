#![allow(dead_code)]

use std::{
    fs::{self, File},
    io::{Read, Write},
    path::Path,
};

use anyhow::Result;
use parse::{
    builder::ClassBuilder,
    flags::{FieldAccessFlags, MethodAccessFlags},
    parser::Parser,
    pool::MemberRef,
    remap::Symbol,
};
use zip::{write::FileOptions, ZipArchive, ZipWriter};

/// Obfuscated names on the left, readable ones on the right.
pub const MAPPINGS: &str = "\
CL: a net/World
CL: b net/Base
FD: b/f net/Base/time
MD: b/e ()V net/Base/tick ()V
FD: a/c net/World/count
MD: a/d (Lb;)La; net/World/spawn (Lnet/Base;)Lnet/World;
";

pub const MANIFEST: &[u8] = b"Manifest-Version: 1.0\r\nCreated-By: tests\r\n\r\n";
pub const DATA: &[u8] = b"\x00\x01binary\xffdata";

/// `b`: declares field `f` and the overloads `e()` and `e(int)`.
pub fn base_class() -> Result<Vec<u8>> {
    let mut class = ClassBuilder::new("b", Some("java/lang/Object"))?;
    class.field(FieldAccessFlags::PUBLIC, "f", "I")?;
    class.method(MethodAccessFlags::PUBLIC, "e", "()V", Some(vec![0xb1]))?;
    class.method(MethodAccessFlags::PUBLIC, "e", "(I)V", Some(vec![0xb1]))?;
    class.to_bytes()
}

/// `a extends b`: reaches the inherited members through its own name.
pub fn world_class() -> Result<Vec<u8>> {
    world_class_extending("b")
}

pub fn world_class_extending(super_name: &str) -> Result<Vec<u8>> {
    let mut class = ClassBuilder::new("a", Some(super_name))?;
    let time = class.field_ref("a", "f", "I")?.to_be_bytes();
    let tick = class.method_ref("a", "e", "()V")?.to_be_bytes();
    let tick_with = class.method_ref("a", "e", "(I)V")?.to_be_bytes();

    class.field(FieldAccessFlags::PRIVATE, "c", "I")?;
    class.method(
        MethodAccessFlags::PUBLIC,
        "d",
        "(Lb;)La;",
        Some(vec![
            0x2a, // aload_0
            0xb4, time[0], time[1], // getfield a.f
            0x57, // pop
            0x2a, // aload_0
            0xb6, tick[0], tick[1], // invokevirtual a.e()V
            0x2a, // aload_0
            0x04, // iconst_1
            0xb6, tick_with[0], tick_with[1], // invokevirtual a.e(I)V
            0x2a, // aload_0
            0xb0, // areturn
        ]),
    )?;

    class.to_bytes()
}

/// A jar holding the obfuscated classes next to some resources.
pub fn obfuscated_jar(path: &Path) -> Result<()> {
    write_jar(
        path,
        &[
            ("META-INF/", vec![]),
            ("META-INF/MANIFEST.MF", MANIFEST.to_vec()),
            ("a.class", world_class()?),
            ("b.class", base_class()?),
            ("assets/", vec![]),
            ("assets/data.bin", DATA.to_vec()),
        ],
    )
}

/// Entries ending in `/` are written as directories.
pub fn write_jar(path: &Path, entries: &[(&str, Vec<u8>)]) -> Result<()> {
    let mut writer = ZipWriter::new(File::create(path)?);
    let options = FileOptions::default();

    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options)?;
        } else {
            writer.start_file(*name, options)?;
            writer.write_all(data)?;
        }
    }

    writer.finish()?;
    Ok(())
}

/// Rewrite the uncompressed size every central directory record declares.
pub fn overstate_entry_sizes(path: &Path, size: u32) -> Result<()> {
    let mut data = fs::read(path)?;
    let mut offset = 0;

    while offset + 28 <= data.len() {
        if data[offset..offset + 4] == [0x50, 0x4b, 0x01, 0x02] {
            data[offset + 24..offset + 28].copy_from_slice(&size.to_le_bytes());
            offset += 46;
        } else {
            offset += 1;
        }
    }

    fs::write(path, data)?;
    Ok(())
}

pub fn read_jar(path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut entries = vec![];

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let mut data = vec![];
        entry.read_to_end(&mut data)?;
        entries.push((entry.name().to_string(), data));
    }

    Ok(entries)
}

pub fn entry<'a>(entries: &'a [(String, Vec<u8>)], name: &str) -> Option<&'a [u8]> {
    entries
        .iter()
        .find(|(entry, _)| entry == name)
        .map(|(_, data)| data.as_slice())
}

pub fn write_mappings(dir: &Path) -> Result<std::path::PathBuf> {
    let path = dir.join("mappings.srg");
    fs::write(&path, MAPPINGS)?;
    Ok(path)
}

/// Every field and method reference in the constant pool of a class.
pub fn member_refs(bytes: &[u8]) -> Result<Vec<MemberRef>> {
    let class = Parser::new(bytes).parse()?;
    let pool = &class.constant_pool;

    pool.iter()
        .filter(|(_, entry)| entry.is_field() || entry.is_method())
        .map(|(index, _)| pool.member_ref(index))
        .collect()
}

pub fn has_member(members: &[MemberRef], owner: &str, name: &str, descriptor: &str) -> bool {
    members
        .iter()
        .any(|m| m.owner == owner && m.name == name && m.descriptor == descriptor)
}

/// The names a class uses, in site order.
pub fn symbols(bytes: &[u8]) -> Result<Vec<Symbol>> {
    let class = Parser::new(bytes).parse()?;
    Ok(class
        .reference_sites()?
        .into_iter()
        .map(|site| site.symbol)
        .collect())
}
