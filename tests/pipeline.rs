mod common;

use std::fs;

use anyhow::Result;
use common::{entry, obfuscated_jar, read_jar, symbols, write_mappings};
use remap::{Direction, Pipeline, Stage};

#[test]
fn it_undoes_a_forward_stage_with_a_reverse_one() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("obf.jar");
    let named = dir.path().join("named.jar");
    let back = dir.path().join("back.jar");
    obfuscated_jar(&input)?;
    let mappings = write_mappings(dir.path())?;

    let reports = Pipeline::new(&input)
        .stage(Stage::new(&mappings, &named))
        .stage(Stage::new(&mappings, &back).with_direction(Direction::Reverse))
        .run()?;

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].renamed.len(), 2);
    assert_eq!(reports[1].renamed.len(), 2);

    let original = read_jar(&input)?;
    let restored = read_jar(&back)?;
    assert_eq!(original.len(), restored.len());

    for (name, data) in &original {
        let restored = entry(&restored, name).ok_or(anyhow::anyhow!("{} went missing", name))?;

        if name.ends_with(".class") {
            assert_eq!(symbols(data)?, symbols(restored)?, "{} differs", name);
        } else {
            assert_eq!(data.as_slice(), restored, "{} differs", name);
        }
    }

    Ok(())
}

#[test]
fn it_runs_stages_independently() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("obf.jar");
    obfuscated_jar(&input)?;
    let mappings = write_mappings(dir.path())?;

    // The second stage only sees what the first one wrote
    let identity = dir.path().join("identity.csrg");
    fs::write(&identity, "# nothing to do\n")?;

    let first = dir.path().join("first.jar");
    let second = dir.path().join("second.jar");
    let reports = Pipeline::new(&input)
        .stage(Stage::new(&mappings, &first))
        .stage(Stage::new(&identity, &second))
        .run()?;

    assert!(reports[1].renamed.is_empty());
    assert_eq!(read_jar(&first)?, read_jar(&second)?);

    Ok(())
}
