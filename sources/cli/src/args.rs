use std::path::PathBuf;

use clap::{ArgAction, Parser};
use remap::{Direction, RemapConfig};
use tracing::Level;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(short, long)]
    /// The archive to remap
    pub input: PathBuf,

    #[arg(short, long)]
    /// Where to write the remapped archive
    pub output: PathBuf,

    #[arg(short, long, alias = "srg-in")]
    /// The mapping file (SRG, CSRG, TSRG or ProGuard)
    pub mappings: PathBuf,

    #[arg(long)]
    /// Apply the mappings from new names back to old ones
    pub reverse: bool,

    #[arg(long("cp"))]
    /// Archives or class directories that supply inheritance context
    pub classpath: Vec<PathBuf>,

    #[arg(short, long, action = ArgAction::Count)]
    /// Log more, repeat for trace output
    pub verbose: u8,

    #[arg(short, long, conflicts_with = "verbose")]
    /// Only log errors
    pub quiet: bool,
}

impl Cli {
    pub fn level(&self) -> Level {
        if self.quiet {
            return Level::ERROR;
        }

        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    pub fn config(&self) -> RemapConfig {
        let direction = if self.reverse {
            Direction::Reverse
        } else {
            Direction::Forward
        };

        RemapConfig::new(&self.input, &self.output, &self.mappings)
            .with_direction(direction)
            .with_classpath(self.classpath.iter().cloned())
    }
}
