pub mod modified_utf8;

use anyhow::Result;

pub use self::modified_utf8::ModifiedUtf8;

/// A string encoding used inside class files.
pub trait EncodingFormat {
    fn into_java(str: &str) -> Vec<u8>;
    fn from_java(data: &[u8]) -> Result<String>;
}

/// Decode the contents of a `CONSTANT_Utf8` entry.
pub fn decode_string(data: &[u8]) -> Result<String> {
    ModifiedUtf8::from_java(data)
}

/// Encode a string into the bytes of a `CONSTANT_Utf8` entry.
pub fn encode_string(str: &str) -> Vec<u8> {
    ModifiedUtf8::into_java(str)
}
