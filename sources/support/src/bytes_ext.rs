use anyhow::{anyhow, Result};
use bytes::{Buf, BufMut};

/**
    This macro builds a set of safe_get_{number_type} functions for safe reading of
    bytes from a Buf. They return a Result instead of panicking when the buffer runs dry
**/
macro_rules! impl_safebuf {
    ( $($type:ty),* ) => {
        pub trait SafeBuf: Buf {
            paste::paste! {
                $(
                fn [<safe_get_ $type>](&mut self) -> Result<$type> {
                    if self.remaining() >= std::mem::size_of::<$type>() {
                        Ok(self.[<get_ $type>]())
                    } else {
                        Err(anyhow!(
                            "out of bytes reading {} ({} remaining)",
                            stringify!($type),
                            self.remaining()
                        ))
                    }
                }
                )*
            }

            fn safe_get_vec(&mut self, length: usize) -> Result<Vec<u8>> {
                if self.remaining() < length {
                    return Err(anyhow!(
                        "out of bytes reading {} byte block ({} remaining)",
                        length,
                        self.remaining()
                    ));
                }

                let mut data = vec![0; length];
                self.copy_to_slice(&mut data);
                Ok(data)
            }
        }

        impl<T: Buf> SafeBuf for T {}
    }
}

impl_safebuf!(u8, u16, u32, u64, i8, i16, i32);

/// Length-prefixed writes used by the class writer.
pub trait PrefixedBufMut: BufMut {
    fn put_u16_len(&mut self, length: usize) -> Result<()> {
        let length = u16::try_from(length).map_err(|_| anyhow!("{} does not fit in a u16", length))?;
        self.put_u16(length);
        Ok(())
    }

    fn put_u32_len(&mut self, length: usize) -> Result<()> {
        let length = u32::try_from(length).map_err(|_| anyhow!("{} does not fit in a u32", length))?;
        self.put_u32(length);
        Ok(())
    }
}

impl<T: BufMut> PrefixedBufMut for T {}

/// Overwrite a big endian u16 at `offset`, as used when patching pool indices inside attributes.
pub fn patch_u16(data: &mut [u8], offset: usize, value: u16) -> Result<()> {
    let len = data.len();
    let slot = data
        .get_mut(offset..offset + 2)
        .ok_or_else(|| anyhow!("patch offset {} out of bounds ({} bytes)", offset, len))?;

    slot.copy_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Read a big endian u16 at `offset` without consuming anything.
pub fn peek_u16(data: &[u8], offset: usize) -> Result<u16> {
    let slot = data
        .get(offset..offset + 2)
        .ok_or_else(|| anyhow!("read offset {} out of bounds ({} bytes)", offset, data.len()))?;

    Ok(u16::from_be_bytes([slot[0], slot[1]]))
}
