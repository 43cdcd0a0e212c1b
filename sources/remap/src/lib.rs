pub mod archive;
pub mod config;
pub mod error;
pub mod inheritance;
pub mod mapping;
pub mod pipeline;
pub mod provider;
pub mod resolver;

pub use archive::{ArchiveRewriter, RewriteReport};
pub use config::{Pipeline, RemapConfig, Stage};
pub use error::RemapError;
pub use inheritance::InheritanceGraph;
pub use mapping::{Direction, MappingTable};
pub use pipeline::remap_jar;
pub use resolver::Resolver;

extern crate anyhow;
extern crate parse;
extern crate support;
