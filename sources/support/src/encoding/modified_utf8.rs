use super::EncodingFormat;
use anyhow::{anyhow, Result};

/// The "modified UTF-8" of JVMS §4.4.7.
///
/// NUL is stored as two bytes and supplementary characters are stored as
/// a surrogate pair, each half taking three bytes.
pub struct ModifiedUtf8;

impl EncodingFormat for ModifiedUtf8 {
    fn into_java(str: &str) -> Vec<u8> {
        let mut data = Vec::with_capacity(str.len());

        for unit in str.encode_utf16() {
            match unit {
                0x0001..=0x007F => data.push(unit as u8),
                0x0000 | 0x0080..=0x07FF => {
                    data.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                    data.push(0x80 | (unit & 0x3F) as u8);
                }
                _ => {
                    data.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                    data.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                    data.push(0x80 | (unit & 0x3F) as u8);
                }
            }
        }

        data
    }

    fn from_java(data: &[u8]) -> Result<String> {
        // Fast path, the overwhelming majority of names are plain ascii
        if data.iter().all(|b| (0x01..=0x7F).contains(b)) {
            return Ok(String::from_utf8(data.to_vec())?);
        }

        let mut units: Vec<u16> = Vec::with_capacity(data.len());
        let mut i = 0;

        let continuation = |at: usize| -> Result<u16> {
            match data.get(at) {
                Some(b) if b & 0xC0 == 0x80 => Ok((b & 0x3F) as u16),
                _ => Err(anyhow!("bad continuation byte at {}", at)),
            }
        };

        while i < data.len() {
            let lead = data[i];
            match lead {
                0x01..=0x7F => {
                    units.push(lead as u16);
                    i += 1;
                }
                0xC0..=0xDF => {
                    units.push((((lead & 0x1F) as u16) << 6) | continuation(i + 1)?);
                    i += 2;
                }
                0xE0..=0xEF => {
                    units.push(
                        (((lead & 0x0F) as u16) << 12)
                            | (continuation(i + 1)? << 6)
                            | continuation(i + 2)?,
                    );
                    i += 3;
                }
                _ => return Err(anyhow!("invalid modified utf-8 byte {:#04x} at {}", lead, i)),
            }
        }

        Ok(String::from_utf16(&units)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_encodes_nul_as_two_bytes() {
        assert_eq!(ModifiedUtf8::into_java("a\0b"), vec![b'a', 0xC0, 0x80, b'b']);
    }

    #[test]
    fn it_encodes_supplementary_characters_as_surrogates() -> Result<()> {
        let encoded = ModifiedUtf8::into_java("\u{1F600}");
        assert_eq!(encoded.len(), 6);
        assert_eq!(ModifiedUtf8::from_java(&encoded)?, "\u{1F600}");

        Ok(())
    }

    #[test]
    fn it_decodes_two_byte_sequences() -> Result<()> {
        let encoded = ModifiedUtf8::into_java("caf\u{e9}");
        assert_eq!(ModifiedUtf8::from_java(&encoded)?, "caf\u{e9}");

        Ok(())
    }

    #[test]
    fn it_rejects_truncated_sequences() {
        assert!(ModifiedUtf8::from_java(&[0xE0, 0x80]).is_err());
    }
}
