pub mod attributes;
#[cfg(any(test, feature = "test-util"))]
pub mod builder;
pub mod classfile;
pub mod code;
pub mod constants;
pub mod flags;
pub mod parser;
pub mod pool;
pub mod remap;
pub mod writer;

extern crate anyhow;
extern crate bytes;
extern crate enum_as_inner;
extern crate support;
