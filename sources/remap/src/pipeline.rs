use tracing::info;

use crate::archive::{ArchiveRewriter, RewriteReport};
use crate::config::{Pipeline, RemapConfig};
use crate::error::Result;
use crate::inheritance::InheritanceGraph;
use crate::mapping::MappingTable;
use crate::provider::{open_classpath_entry, ClassProvider, JarProvider};

/// One remap run: `(archive, mapping, classpath) -> archive`.
///
/// Mappings are loaded before any archive is opened, and every archive
/// handle is closed again before the output is written.
pub fn remap_jar(config: &RemapConfig) -> Result<RewriteReport> {
    info!(
        "Remapping {} with {} ({:?})",
        config.input.display(),
        config.mappings.display(),
        config.direction
    );

    let mappings = MappingTable::load(&config.mappings, config.direction)?;

    let graph = {
        let mut providers: Vec<Box<dyn ClassProvider>> = vec![Box::new(JarProvider::open(&config.input)?)];
        for entry in &config.classpath {
            providers.push(open_classpath_entry(entry)?);
        }

        InheritanceGraph::build(&mut providers)?
    };

    ArchiveRewriter::new(&mappings, &graph).rewrite_archive(&config.input, &config.output)
}

impl Pipeline {
    pub fn run(&self) -> Result<Vec<RewriteReport>> {
        let mut input = self.input.clone();
        let mut reports = Vec::with_capacity(self.stages.len());

        for (index, stage) in self.stages.iter().enumerate() {
            info!("Stage {} of {}", index + 1, self.stages.len());

            reports.push(remap_jar(&stage.config(input))?);
            input = stage.output.clone();
        }

        Ok(reports)
    }
}
