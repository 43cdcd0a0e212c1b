mod common;

use std::fs;

use anyhow::Result;
use common::{
    base_class, entry, has_member, member_refs, obfuscated_jar, overstate_entry_sizes, read_jar,
    world_class, world_class_extending, write_jar, write_mappings, DATA, MANIFEST,
};
use parse::parser::Parser;
use remap::{remap_jar, RemapConfig, RemapError};

#[test]
fn it_remaps_every_class_in_an_archive() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("obf.jar");
    let output = dir.path().join("named.jar");
    obfuscated_jar(&input)?;

    let config = RemapConfig::new(&input, &output, write_mappings(dir.path())?);
    let report = remap_jar(&config)?;

    assert_eq!(report.classes, 2);
    assert_eq!(report.resources, 4);
    assert_eq!(
        report.renamed,
        vec![
            ("a.class".to_string(), "net/World.class".to_string()),
            ("b.class".to_string(), "net/Base.class".to_string()),
        ]
    );

    let entries = read_jar(&output)?;
    let world = entry(&entries, "net/World.class").ok_or(anyhow::anyhow!("no World"))?;
    let class = Parser::new(world).parse()?;
    let pool = &class.constant_pool;

    assert_eq!(class.name()?, "net/World");
    assert_eq!(class.super_name()?.as_deref(), Some("net/Base"));
    assert!(class.fields.locate(pool, "count").is_some());
    assert!(class
        .methods
        .locate(pool, "spawn", "(Lnet/Base;)Lnet/World;")
        .is_some());

    let members = member_refs(world)?;
    // Reached through `a`, declared on `b`
    assert!(has_member(&members, "net/World", "time", "I"));
    assert!(has_member(&members, "net/World", "tick", "()V"));
    // The int overload has no entry of its own
    assert!(has_member(&members, "net/World", "e", "(I)V"));
    assert!(!members.iter().any(|m| m.owner == "a" || m.owner == "b"));

    let base = entry(&entries, "net/Base.class").ok_or(anyhow::anyhow!("no Base"))?;
    let class = Parser::new(base).parse()?;
    let pool = &class.constant_pool;
    assert!(class.fields.locate(pool, "time").is_some());
    assert!(class.methods.locate(pool, "tick", "()V").is_some());
    assert!(class.methods.locate(pool, "e", "(I)V").is_some());
    assert_eq!(class.super_name()?.as_deref(), Some("java/lang/Object"));

    Ok(())
}

#[test]
fn it_keeps_every_entry_exactly_once() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("obf.jar");
    let output = dir.path().join("named.jar");
    obfuscated_jar(&input)?;

    remap_jar(&RemapConfig::new(&input, &output, write_mappings(dir.path())?))?;

    let before = read_jar(&input)?;
    let after = read_jar(&output)?;
    assert_eq!(before.len(), after.len());

    let mut names: Vec<&str> = after.iter().map(|(name, _)| name.as_str()).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "META-INF/",
            "META-INF/MANIFEST.MF",
            "assets/",
            "assets/data.bin",
            "net/Base.class",
            "net/World.class",
        ]
    );

    assert_eq!(entry(&after, "META-INF/MANIFEST.MF"), Some(MANIFEST));
    assert_eq!(entry(&after, "assets/data.bin"), Some(DATA));

    Ok(())
}

#[test]
fn it_passes_unmapped_classes_through() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("in.jar");
    let output = dir.path().join("out.jar");
    let unrelated = world_class_extending("org/lib/Thing")?;
    write_jar(&input, &[("a.class", unrelated.clone())])?;

    let mappings = dir.path().join("unrelated.csrg");
    fs::write(&mappings, "q r\nq s t\n")?;

    let report = remap_jar(&RemapConfig::new(&input, &output, &mappings))?;
    assert!(report.renamed.is_empty());
    assert_eq!(entry(&read_jar(&output)?, "a.class"), Some(unrelated.as_slice()));

    Ok(())
}

#[test]
fn it_follows_hierarchies_into_the_classpath() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("in.jar");
    let library = dir.path().join("lib.jar");
    let output = dir.path().join("out.jar");

    // a extends x, only the library knows that x extends b
    write_jar(&input, &[("a.class", world_class_extending("x")?)])?;
    let middle = parse::builder::ClassBuilder::new("x", Some("b"))?.to_bytes()?;
    write_jar(&library, &[("x.class", middle), ("b.class", base_class()?)])?;

    let mappings = write_mappings(dir.path())?;

    remap_jar(&RemapConfig::new(&input, &output, &mappings))?;
    let isolated = member_refs(entry(&read_jar(&output)?, "net/World.class").unwrap_or_default())?;
    assert!(has_member(&isolated, "net/World", "f", "I"));

    remap_jar(&RemapConfig::new(&input, &output, &mappings).with_classpath([&library]))?;
    let linked = member_refs(entry(&read_jar(&output)?, "net/World.class").unwrap_or_default())?;
    assert!(has_member(&linked, "net/World", "time", "I"));
    assert!(has_member(&linked, "net/World", "tick", "()V"));

    Ok(())
}

#[test]
fn it_writes_nothing_when_a_class_is_malformed() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("in.jar");
    let output = dir.path().join("out.jar");

    let mut truncated = world_class()?;
    truncated.truncate(truncated.len() / 2);
    write_jar(
        &input,
        &[("b.class", base_class()?), ("broken/a.class", truncated)],
    )?;

    let result = remap_jar(&RemapConfig::new(&input, &output, write_mappings(dir.path())?));
    match result {
        Err(RemapError::MalformedClass { entry, .. }) => assert!(entry.contains("broken/a.class")),
        other => panic!("expected a malformed class error, got {:?}", other),
    }
    assert!(!output.exists());

    Ok(())
}

#[test]
fn it_rejects_entries_that_collide_after_renaming() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("in.jar");
    let output = dir.path().join("out.jar");

    let named = parse::builder::ClassBuilder::new("net/World", Some("java/lang/Object"))?.to_bytes()?;
    write_jar(
        &input,
        &[("net/World.class", named), ("a.class", world_class()?)],
    )?;

    let result = remap_jar(&RemapConfig::new(&input, &output, write_mappings(dir.path())?));
    assert!(matches!(
        result,
        Err(RemapError::DuplicateEntry { name }) if name == "net/World.class"
    ));
    assert!(!output.exists());

    Ok(())
}

#[test]
fn it_fails_before_rewriting_on_bad_inputs() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("in.jar");
    let output = dir.path().join("out.jar");
    obfuscated_jar(&input)?;

    let missing = dir.path().join("missing.jar");
    let result = remap_jar(
        &RemapConfig::new(&input, &output, write_mappings(dir.path())?).with_classpath([&missing]),
    );
    assert!(matches!(
        result,
        Err(RemapError::UnresolvedClasspathEntry { path, .. }) if path == missing
    ));

    let broken = dir.path().join("broken.srg");
    fs::write(&broken, "CL: a net/World\nMD: a/d nonsense\n")?;
    let result = remap_jar(&RemapConfig::new(&input, &output, &broken));
    assert!(matches!(result, Err(RemapError::MappingParse { line: 2, .. })));

    assert!(!output.exists());

    Ok(())
}

#[test]
fn it_ignores_declared_entry_sizes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("obf.jar");
    let output = dir.path().join("named.jar");
    write_jar(&input, &[("a.class", world_class()?), ("b.class", base_class()?)])?;
    overstate_entry_sizes(&input, 0x7fff_ffff)?;

    let report = remap_jar(&RemapConfig::new(&input, &output, write_mappings(dir.path())?))?;
    assert_eq!(report.classes, 2);

    let entries = read_jar(&output)?;
    let world = entry(&entries, "net/World.class").ok_or(anyhow::anyhow!("no World"))?;
    assert_eq!(Parser::new(world).parse()?.name()?, "net/World");

    Ok(())
}
