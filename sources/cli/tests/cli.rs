// Shared with the workspace integration tests
#[path = "../../../tests/common/mod.rs"]
mod common;

use anyhow::Result;
use assert_cmd::Command;
use common::{entry, obfuscated_jar, read_jar, write_mappings};

fn remap() -> Command {
    Command::cargo_bin("remap").expect("cargo to locate remap")
}

#[test]
fn it_remaps_from_the_command_line() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("obf.jar");
    let output = dir.path().join("named.jar");
    obfuscated_jar(&input)?;
    let mappings = write_mappings(dir.path())?;

    remap()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--srg-in")
        .arg(&mappings)
        .assert()
        .success();

    let entries = read_jar(&output)?;
    assert!(entry(&entries, "net/World.class").is_some());
    assert!(entry(&entries, "a.class").is_none());

    let back = dir.path().join("back.jar");
    remap()
        .arg("--input")
        .arg(&output)
        .arg("--output")
        .arg(&back)
        .arg("--mappings")
        .arg(&mappings)
        .arg("--reverse")
        .arg("-q")
        .assert()
        .success();

    assert!(entry(&read_jar(&back)?, "a.class").is_some());

    Ok(())
}

#[test]
fn it_fails_loudly_on_a_missing_classpath_entry() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("obf.jar");
    let output = dir.path().join("named.jar");
    obfuscated_jar(&input)?;
    let mappings = write_mappings(dir.path())?;

    remap()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("-m")
        .arg(&mappings)
        .arg("--cp")
        .arg(dir.path().join("missing.jar"))
        .assert()
        .failure();

    assert!(!output.exists());

    Ok(())
}

#[test]
fn it_requires_a_mapping_file() {
    remap().arg("-i").arg("in.jar").arg("-o").arg("out.jar").assert().failure();
}
