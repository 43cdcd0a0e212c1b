use anyhow::{anyhow, Result};
use bytes::Bytes;
use support::bytes_ext::SafeBuf;

use crate::attributes::Attributes;
use crate::classfile::{
    ClassFile, ClassHeader, Field, Fields, Interfaces, MetaData, Method, Methods,
};
use crate::code;
use crate::constants::{MAGIC, MAX_MAJOR_VERSION, MIN_MAJOR_VERSION};
use crate::flags::{ClassFileAccessFlags, FieldAccessFlags, MethodAccessFlags};
use crate::pool::{
    Addressed, ConstantClass, ConstantDouble, ConstantDynamic, ConstantEntry, ConstantFloat,
    ConstantInteger, ConstantLong, ConstantMemberRef, ConstantMethodHandle, ConstantMethodType,
    ConstantModule, ConstantNameAndType, ConstantPool, ConstantString, ConstantTag, ConstantUtf8,
    Resolvable,
};

pub struct Parser {
    bytes: Bytes,
}

impl Parser {
    pub fn new(data: &[u8]) -> Self {
        Self {
            bytes: Bytes::copy_from_slice(data),
        }
    }

    fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        let length = self.bytes.safe_get_u16()?;
        if length == 0 {
            return Err(anyhow!("constant_pool_count must be at least 1"));
        }

        let mut pool = ConstantPool::new();

        while pool.slots() < (length - 1) as usize {
            let tag = ConstantTag::from_tag(self.bytes.safe_get_u8()?)?;
            let entry = match tag {
                ConstantTag::Utf8 => {
                    let length = self.bytes.safe_get_u16()?;
                    ConstantEntry::Utf8(ConstantUtf8 {
                        bytes: self.bytes.safe_get_vec(length.into())?,
                    })
                }
                ConstantTag::Integer => ConstantEntry::Integer(ConstantInteger {
                    bytes: self.bytes.safe_get_u32()?,
                }),
                ConstantTag::Float => ConstantEntry::Float(ConstantFloat {
                    bytes: self.bytes.safe_get_u32()?,
                }),
                ConstantTag::Long => ConstantEntry::Long(ConstantLong {
                    bytes: self.bytes.safe_get_u64()?,
                }),
                ConstantTag::Double => ConstantEntry::Double(ConstantDouble {
                    bytes: self.bytes.safe_get_u64()?,
                }),
                ConstantTag::Class => ConstantEntry::Class(ConstantClass {
                    name: pool.address(self.bytes.safe_get_u16()?),
                }),
                ConstantTag::String => ConstantEntry::String(ConstantString {
                    string: pool.address(self.bytes.safe_get_u16()?),
                }),
                ConstantTag::Field => ConstantEntry::Field(self.parse_member_ref(&pool)?),
                ConstantTag::Method => ConstantEntry::Method(self.parse_member_ref(&pool)?),
                ConstantTag::InterfaceMethod => {
                    ConstantEntry::InterfaceMethod(self.parse_member_ref(&pool)?)
                }
                ConstantTag::NameAndType => ConstantEntry::NameAndType(ConstantNameAndType {
                    name: pool.address(self.bytes.safe_get_u16()?),
                    descriptor: pool.address(self.bytes.safe_get_u16()?),
                }),
                ConstantTag::MethodHandle => ConstantEntry::MethodHandle(ConstantMethodHandle {
                    kind: self.bytes.safe_get_u8()?,
                    reference: pool.address(self.bytes.safe_get_u16()?),
                }),
                ConstantTag::MethodType => ConstantEntry::MethodType(ConstantMethodType {
                    descriptor: pool.address(self.bytes.safe_get_u16()?),
                }),
                ConstantTag::Dynamic => ConstantEntry::Dynamic(self.parse_dynamic(&pool)?),
                ConstantTag::InvokeDynamic => {
                    ConstantEntry::InvokeDynamic(self.parse_dynamic(&pool)?)
                }
                ConstantTag::Module => ConstantEntry::Module(ConstantModule {
                    name: pool.address(self.bytes.safe_get_u16()?),
                }),
                ConstantTag::Package => ConstantEntry::Package(ConstantModule {
                    name: pool.address(self.bytes.safe_get_u16()?),
                }),
            };

            pool.insert(entry)?;
        }

        // Format checking: a wide entry in the last slot overruns the declared count
        if pool.slots() != (length - 1) as usize {
            return Err(anyhow!(
                "constant pool declared {} slots but a wide entry overran it",
                length - 1
            ));
        }

        Ok(pool)
    }

    fn parse_member_ref(&mut self, pool: &ConstantPool) -> Result<ConstantMemberRef> {
        Ok(ConstantMemberRef {
            class: pool.address(self.bytes.safe_get_u16()?),
            name_and_type: pool.address(self.bytes.safe_get_u16()?),
        })
    }

    fn parse_dynamic(&mut self, pool: &ConstantPool) -> Result<ConstantDynamic> {
        Ok(ConstantDynamic {
            bootstrap_method: self.bytes.safe_get_u16()?,
            name_and_type: pool.address(self.bytes.safe_get_u16()?),
        })
    }

    fn parse_class_index(&mut self, pool: &ConstantPool) -> Result<Addressed<ConstantClass>> {
        let class: Addressed<ConstantClass> = pool.address(self.bytes.safe_get_u16()?);
        class.try_resolve(pool)?;
        Ok(class)
    }

    fn parse_utf8_index(&mut self, pool: &ConstantPool) -> Result<Addressed<ConstantUtf8>> {
        let utf8: Addressed<ConstantUtf8> = pool.address(self.bytes.safe_get_u16()?);
        utf8.try_resolve(pool)?;
        Ok(utf8)
    }

    fn parse_interfaces(&mut self, pool: &ConstantPool) -> Result<Interfaces> {
        let length = self.bytes.safe_get_u16()?;
        let mut interfaces = Interfaces {
            values: Vec::with_capacity(length.into()),
        };

        for _ in 0..length {
            interfaces.values.push(self.parse_class_index(pool)?);
        }

        Ok(interfaces)
    }

    fn parse_fields(&mut self, pool: &ConstantPool) -> Result<Fields> {
        let length = self.bytes.safe_get_u16()?;
        let mut fields = Fields {
            values: Vec::with_capacity(length.into()),
        };

        for _ in 0..length {
            fields.values.push(Field {
                flags: FieldAccessFlags::from_bits_retain(self.bytes.safe_get_u16()?),
                name: self.parse_utf8_index(pool)?,
                descriptor: self.parse_utf8_index(pool)?,
                attributes: Attributes::parse(&mut self.bytes, pool)?,
            });
        }

        Ok(fields)
    }

    fn parse_methods(&mut self, pool: &ConstantPool) -> Result<Methods> {
        let length = self.bytes.safe_get_u16()?;
        let mut methods = Methods {
            values: Vec::with_capacity(length.into()),
        };

        for _ in 0..length {
            methods.values.push(Method {
                flags: MethodAccessFlags::from_bits_retain(self.bytes.safe_get_u16()?),
                name: self.parse_utf8_index(pool)?,
                descriptor: self.parse_utf8_index(pool)?,
                attributes: Attributes::parse(&mut self.bytes, pool)?,
            });
        }

        Ok(methods)
    }

    fn parse_preamble(&mut self) -> Result<(MetaData, ConstantPool)> {
        let magic = self.bytes.safe_get_u32()?;

        // Format checking: The first four bytes must contain the right magic number
        if magic != MAGIC {
            return Err(anyhow!("invalid magic value '{:#010x}'", magic));
        }

        let minor = self.bytes.safe_get_u16()?;
        let major = self.bytes.safe_get_u16()?;

        if !(MIN_MAJOR_VERSION..=MAX_MAJOR_VERSION).contains(&major) {
            return Err(anyhow!("unsupported class file version {}.{}", major, minor));
        }

        let meta_data = MetaData {
            minor_version: minor,
            major_version: major,
        };

        let constant_pool = self.parse_constant_pool()?;
        // Format checking: The constant pool must satisfy the constraints documented throughout §4.4.
        constant_pool.perform_format_checking()?;

        Ok((meta_data, constant_pool))
    }

    /// Read only as far as the interface table, enough to place the class in a hierarchy.
    pub fn parse_header(&mut self) -> Result<ClassHeader> {
        let (_, constant_pool) = self.parse_preamble()?;

        let access_flags = ClassFileAccessFlags::from_bits_retain(self.bytes.safe_get_u16()?);
        let this_class = self.parse_class_index(&constant_pool)?;
        let super_class = match self.bytes.safe_get_u16()? {
            0 => None,
            index => Some(constant_pool.class_name(index)?),
        };
        let interfaces = self.parse_interfaces(&constant_pool)?;

        Ok(ClassHeader {
            name: constant_pool.class_name(this_class.index())?,
            super_name: super_class,
            interfaces: interfaces
                .values
                .iter()
                .map(|class| constant_pool.class_name(class.index()))
                .collect::<Result<_>>()?,
            access_flags,
        })
    }

    pub fn parse(&mut self) -> Result<ClassFile> {
        let (meta_data, constant_pool) = self.parse_preamble()?;

        let access_flags = ClassFileAccessFlags::from_bits_retain(self.bytes.safe_get_u16()?);
        let this_class = self.parse_class_index(&constant_pool)?;

        let super_class = match self.bytes.safe_get_u16()? {
            0 => None,
            index => {
                let class: Addressed<ConstantClass> = constant_pool.address(index);
                class.try_resolve(&constant_pool)?;
                Some(class)
            }
        };

        let interfaces = self.parse_interfaces(&constant_pool)?;
        let fields = self.parse_fields(&constant_pool)?;
        let methods = self.parse_methods(&constant_pool)?;
        let attributes = Attributes::parse(&mut self.bytes, &constant_pool)?;

        // Format checking: The class file must not be truncated or have extra bytes at the end
        if !self.bytes.is_empty() {
            return Err(anyhow!("classfile has extra bytes at the end"));
        }

        let class_file = ClassFile {
            constant_pool,
            meta_data,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        };

        // Format checking: every instruction operand must point at a constant of the right kind
        code::check_operands(&class_file)?;

        Ok(class_file)
    }
}
