use crate::{
    constants::attribute,
    pool::{Addressed, ConstantClass, ConstantEntry, ConstantMethodHandle, ConstantPool, ConstantUtf8, Resolvable},
};
use anyhow::{anyhow, Result};
use bytes::Buf;
use support::bytes_ext::SafeBuf;

/// An attribute kept as its raw body. Known attributes are decoded on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: Addressed<ConstantUtf8>,
    pub data: Vec<u8>,
}

impl Attribute {
    pub fn name(&self, pool: &ConstantPool) -> Result<String> {
        pool.utf8(self.name.index())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    pub values: Vec<Attribute>,
}

impl Attributes {
    pub fn known_attribute<T>(&self, constant_pool: &ConstantPool) -> Result<Option<T>>
    where
        T: KnownAttribute,
    {
        for attr in self.values.iter() {
            if attr.name(constant_pool)? == T::id() {
                let mut bytes = attr.data.as_slice();
                let decoded = T::decode(&mut bytes, constant_pool)?;

                if bytes.has_remaining() {
                    return Err(anyhow!("{} attribute has trailing bytes", T::id()));
                }

                return Ok(Some(decoded));
            }
        }

        Ok(None)
    }

    pub fn parse(bytes: &mut impl Buf, constant_pool: &ConstantPool) -> Result<Self> {
        let length = bytes.safe_get_u16()?;
        let mut attributes = Attributes {
            values: Vec::with_capacity(length.into()),
        };

        for _ in 0..length {
            let name: Addressed<ConstantUtf8> = constant_pool.address(bytes.safe_get_u16()?);
            // Format checking: attribute names must be Utf8 entries
            name.try_resolve(constant_pool)?;

            let attr_length = bytes.safe_get_u32()?;
            let info = bytes.safe_get_vec(attr_length as usize)?;

            attributes.values.push(Attribute { name, data: info });
        }

        Ok(attributes)
    }
}

pub trait KnownAttribute
where
    Self: Sized,
{
    fn decode(bytes: &mut &[u8], constant_pool: &ConstantPool) -> Result<Self>;
    fn id() -> &'static str;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionEntry>,
    pub attributes: Attributes,
}

impl CodeAttribute {
    /// Offset of the nested attribute table inside the raw attribute body.
    pub fn attributes_offset(&self) -> usize {
        2 + 2 + 4 + self.code.len() + 2 + self.exception_table.len() * 8
    }
}

impl KnownAttribute for CodeAttribute {
    fn decode(bytes: &mut &[u8], constant_pool: &ConstantPool) -> Result<Self> {
        let max_stack = bytes.safe_get_u16()?;
        let max_locals = bytes.safe_get_u16()?;

        let code_length = bytes.safe_get_u32()?;
        let code = bytes.safe_get_vec(code_length as usize)?;

        let exception_length = bytes.safe_get_u16()?;
        let mut exception_table: Vec<ExceptionEntry> = Vec::with_capacity(exception_length.into());
        for _ in 0..exception_length {
            let start_pc = bytes.safe_get_u16()?;
            let end_pc = bytes.safe_get_u16()?;
            let handler_pc = bytes.safe_get_u16()?;

            // Zero means the handler catches everything
            let catch_type = match bytes.safe_get_u16()? {
                0 => None,
                index => {
                    let class: Addressed<ConstantClass> = constant_pool.address(index);
                    class.try_resolve(constant_pool)?;
                    Some(class)
                }
            };

            exception_table.push(ExceptionEntry {
                start_pc,
                end_pc,
                handler_pc,
                catch_type,
            })
        }
        let attributes = Attributes::parse(bytes, constant_pool)?;

        Ok(CodeAttribute {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    fn id() -> &'static str {
        attribute::CODE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: Option<Addressed<ConstantClass>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapMethod {
    pub method: Addressed<ConstantMethodHandle>,
    pub arguments: Vec<Addressed<ConstantEntry>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapMethodsAttribute {
    pub methods: Vec<BootstrapMethod>,
}

impl KnownAttribute for BootstrapMethodsAttribute {
    fn decode(bytes: &mut &[u8], constant_pool: &ConstantPool) -> Result<Self> {
        let length = bytes.safe_get_u16()?;
        let mut methods = Vec::with_capacity(length.into());

        for _ in 0..length {
            let method: Addressed<ConstantMethodHandle> = constant_pool.address(bytes.safe_get_u16()?);
            method.try_resolve(constant_pool)?;

            let argument_count = bytes.safe_get_u16()?;
            let mut arguments = Vec::with_capacity(argument_count.into());
            for _ in 0..argument_count {
                let argument: Addressed<ConstantEntry> = constant_pool.address(bytes.safe_get_u16()?);
                argument.try_resolve(constant_pool)?;
                arguments.push(argument);
            }

            methods.push(BootstrapMethod { method, arguments });
        }

        Ok(BootstrapMethodsAttribute { methods })
    }

    fn id() -> &'static str {
        attribute::BOOTSTRAP_METHODS
    }
}
