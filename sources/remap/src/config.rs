use std::path::PathBuf;

use crate::mapping::Direction;

/// Everything one remap run needs, passed in rather than configured globally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub mappings: PathBuf,
    pub direction: Direction,
    /// Auxiliary archives and class directories, consulted for hierarchy only
    pub classpath: Vec<PathBuf>,
}

impl RemapConfig {
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        mappings: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            mappings: mappings.into(),
            direction: Direction::Forward,
            classpath: vec![],
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_classpath<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<PathBuf>,
    {
        self.classpath.extend(entries.into_iter().map(Into::into));
        self
    }
}

/// One step of a [`Pipeline`]. Its input is the previous step's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub mappings: PathBuf,
    pub direction: Direction,
    pub output: PathBuf,
    pub classpath: Vec<PathBuf>,
}

impl Stage {
    pub fn new(mappings: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            mappings: mappings.into(),
            direction: Direction::Forward,
            output: output.into(),
            classpath: vec![],
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_classpath<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<PathBuf>,
    {
        self.classpath.extend(entries.into_iter().map(Into::into));
        self
    }

    pub(crate) fn config(&self, input: PathBuf) -> RemapConfig {
        RemapConfig {
            input,
            output: self.output.clone(),
            mappings: self.mappings.clone(),
            direction: self.direction,
            classpath: self.classpath.clone(),
        }
    }
}

/// Independent remap runs chained through the files they produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub input: PathBuf,
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            stages: vec![],
        }
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }
}
