use std::{io, path::PathBuf};

use thiserror::Error;
use zip::result::ZipError;

#[derive(Error, Debug)]
pub enum RemapError {
    #[error("malformed class in {entry}: {source}")]
    MalformedClass {
        entry: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("mapping error on line {line}: {message}")]
    MappingParse { line: usize, message: String },

    #[error("cannot open classpath entry {path}: {source}")]
    UnresolvedClasspathEntry {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("archive error in {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: ZipError,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("two entries would both be written as {name}")]
    DuplicateEntry { name: String },
}

pub type Result<T> = std::result::Result<T, RemapError>;

#[macro_export]
macro_rules! mapping_error {
    ($line:expr, $msg:literal $(,)?) => {
        $crate::error::RemapError::MappingParse {
            line: $line,
            message: format!($msg),
        }
    };
    ($line:expr, $fmt:expr, $($arg:tt)*) => {
        $crate::error::RemapError::MappingParse {
            line: $line,
            message: format!($fmt, $($arg)*),
        }
    };
}
