use anyhow::Result;
use bytes::{BufMut, BytesMut};
use support::bytes_ext::PrefixedBufMut;

use crate::attributes::Attributes;
use crate::classfile::ClassFile;
use crate::constants::MAGIC;
use crate::pool::{ConstantEntry, ConstantPool};

/// Serializes a [`ClassFile`] back into its binary form.
///
/// Attributes are written from their raw bodies and pool entries keep
/// their original slots, so an unmodified class writes back byte for byte.
pub struct Writer {
    bytes: BytesMut,
}

impl Writer {
    pub fn new() -> Self {
        Self {
            bytes: BytesMut::new(),
        }
    }

    pub fn write(mut self, class: &ClassFile) -> Result<Vec<u8>> {
        self.bytes.put_u32(MAGIC);
        self.bytes.put_u16(class.meta_data.minor_version);
        self.bytes.put_u16(class.meta_data.major_version);

        self.write_constant_pool(&class.constant_pool)?;

        self.bytes.put_u16(class.access_flags.bits());
        self.bytes.put_u16(class.this_class.index());
        self.bytes.put_u16(class.super_class.map_or(0, |c| c.index()));

        self.bytes.put_u16_len(class.interfaces.values.len())?;
        for interface in &class.interfaces.values {
            self.bytes.put_u16(interface.index());
        }

        self.bytes.put_u16_len(class.fields.values.len())?;
        for field in &class.fields.values {
            self.bytes.put_u16(field.flags.bits());
            self.bytes.put_u16(field.name.index());
            self.bytes.put_u16(field.descriptor.index());
            self.write_attributes(&field.attributes)?;
        }

        self.bytes.put_u16_len(class.methods.values.len())?;
        for method in &class.methods.values {
            self.bytes.put_u16(method.flags.bits());
            self.bytes.put_u16(method.name.index());
            self.bytes.put_u16(method.descriptor.index());
            self.write_attributes(&method.attributes)?;
        }

        self.write_attributes(&class.attributes)?;

        Ok(self.bytes.to_vec())
    }

    fn write_constant_pool(&mut self, pool: &ConstantPool) -> Result<()> {
        self.bytes.put_u16_len(pool.slots() + 1)?;

        for entry in pool.slots_iter() {
            let tag = match entry.tag() {
                Some(tag) => tag,
                // The upper half of a Long/Double has no bytes of its own
                None => continue,
            };
            self.bytes.put_u8(tag.value());

            match entry {
                ConstantEntry::Utf8(data) => {
                    self.bytes.put_u16_len(data.bytes.len())?;
                    self.bytes.put_slice(&data.bytes);
                }
                ConstantEntry::Integer(data) => self.bytes.put_u32(data.bytes),
                ConstantEntry::Float(data) => self.bytes.put_u32(data.bytes),
                ConstantEntry::Long(data) => self.bytes.put_u64(data.bytes),
                ConstantEntry::Double(data) => self.bytes.put_u64(data.bytes),
                ConstantEntry::Class(data) => self.bytes.put_u16(data.name.index()),
                ConstantEntry::String(data) => self.bytes.put_u16(data.string.index()),
                ConstantEntry::Field(data)
                | ConstantEntry::Method(data)
                | ConstantEntry::InterfaceMethod(data) => {
                    self.bytes.put_u16(data.class.index());
                    self.bytes.put_u16(data.name_and_type.index());
                }
                ConstantEntry::NameAndType(data) => {
                    self.bytes.put_u16(data.name.index());
                    self.bytes.put_u16(data.descriptor.index());
                }
                ConstantEntry::MethodHandle(data) => {
                    self.bytes.put_u8(data.kind);
                    self.bytes.put_u16(data.reference.index());
                }
                ConstantEntry::MethodType(data) => self.bytes.put_u16(data.descriptor.index()),
                ConstantEntry::Dynamic(data) | ConstantEntry::InvokeDynamic(data) => {
                    self.bytes.put_u16(data.bootstrap_method);
                    self.bytes.put_u16(data.name_and_type.index());
                }
                ConstantEntry::Module(data) | ConstantEntry::Package(data) => {
                    self.bytes.put_u16(data.name.index())
                }
                ConstantEntry::Reserved => {}
            }
        }

        Ok(())
    }

    fn write_attributes(&mut self, attributes: &Attributes) -> Result<()> {
        self.bytes.put_u16_len(attributes.values.len())?;
        for attribute in &attributes.values {
            self.bytes.put_u16(attribute.name.index());
            self.bytes.put_u32_len(attribute.data.len())?;
            self.bytes.put_slice(&attribute.data);
        }

        Ok(())
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassFile {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Writer::new().write(self)
    }
}
