use anyhow::Result;
use bytes::BufMut;
use support::bytes_ext::PrefixedBufMut;

use crate::attributes::{Attribute, Attributes};
use crate::classfile::{ClassFile, Field, Fields, Interfaces, MetaData, Method, Methods};
use crate::constants::attribute;
use crate::flags::{ClassFileAccessFlags, FieldAccessFlags, MethodAccessFlags};
use crate::pool::{
    Addressed, ConstantClass, ConstantDynamic, ConstantEntry, ConstantMemberRef,
    ConstantMethodHandle, ConstantMethodType, ConstantNameAndType, ConstantPool, ConstantString,
    ConstantUtf8,
};
use crate::writer::Writer;

struct PendingMethod {
    method: Method,
    code: Option<Vec<u8>>,
    code_attributes: Vec<Attribute>,
}

/// Assembles class files from scratch.
///
/// Constants are deduplicated, so asking for the same class or member twice
/// returns the same index.
pub struct ClassBuilder {
    pool: ConstantPool,
    access_flags: ClassFileAccessFlags,
    this_class: u16,
    super_class: Option<u16>,
    interfaces: Vec<u16>,
    fields: Vec<Field>,
    methods: Vec<PendingMethod>,
    attributes: Vec<Attribute>,
    bootstrap_methods: Vec<(u16, Vec<u16>)>,
    major_version: u16,
}

impl ClassBuilder {
    pub fn new(name: &str, super_name: Option<&str>) -> Result<Self> {
        let mut builder = Self {
            pool: ConstantPool::new(),
            access_flags: ClassFileAccessFlags::PUBLIC | ClassFileAccessFlags::SUPER,
            this_class: 0,
            super_class: None,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            attributes: vec![],
            bootstrap_methods: vec![],
            major_version: 61,
        };

        builder.this_class = builder.class(name)?;
        if let Some(super_name) = super_name {
            builder.super_class = Some(builder.class(super_name)?);
        }

        Ok(builder)
    }

    pub fn access_flags(mut self, flags: ClassFileAccessFlags) -> Self {
        self.access_flags = flags;
        self
    }

    pub fn implements(mut self, name: &str) -> Result<Self> {
        let interface = self.class(name)?;
        self.interfaces.push(interface);
        Ok(self)
    }

    fn find_or_insert(&mut self, entry: ConstantEntry) -> Result<u16> {
        if let Some((index, _)) = self.pool.iter().find(|(_, e)| **e == entry) {
            return Ok(index);
        }

        self.pool.insert(entry)
    }

    pub fn utf8(&mut self, value: &str) -> Result<u16> {
        self.find_or_insert(ConstantEntry::Utf8(ConstantUtf8::new(value)))
    }

    pub fn class(&mut self, name: &str) -> Result<u16> {
        let name = self.utf8(name)?;
        self.find_or_insert(ConstantEntry::Class(ConstantClass {
            name: Addressed::from(name),
        }))
    }

    pub fn string(&mut self, value: &str) -> Result<u16> {
        let string = self.utf8(value)?;
        self.find_or_insert(ConstantEntry::String(ConstantString {
            string: Addressed::from(string),
        }))
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name = self.utf8(name)?;
        let descriptor = self.utf8(descriptor)?;
        self.find_or_insert(ConstantEntry::NameAndType(ConstantNameAndType {
            name: Addressed::from(name),
            descriptor: Addressed::from(descriptor),
        }))
    }

    fn member_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<ConstantMemberRef> {
        Ok(ConstantMemberRef {
            class: Addressed::from(self.class(owner)?),
            name_and_type: Addressed::from(self.name_and_type(name, descriptor)?),
        })
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
        let member = self.member_ref(owner, name, descriptor)?;
        self.find_or_insert(ConstantEntry::Field(member))
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
        let member = self.member_ref(owner, name, descriptor)?;
        self.find_or_insert(ConstantEntry::Method(member))
    }

    pub fn interface_method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
        let member = self.member_ref(owner, name, descriptor)?;
        self.find_or_insert(ConstantEntry::InterfaceMethod(member))
    }

    pub fn method_type(&mut self, descriptor: &str) -> Result<u16> {
        let descriptor = self.utf8(descriptor)?;
        self.find_or_insert(ConstantEntry::MethodType(ConstantMethodType {
            descriptor: Addressed::from(descriptor),
        }))
    }

    pub fn method_handle(&mut self, kind: u8, reference: u16) -> Result<u16> {
        self.find_or_insert(ConstantEntry::MethodHandle(ConstantMethodHandle {
            kind,
            reference: Addressed::from(reference),
        }))
    }

    /// Register a bootstrap method, returning its index in `BootstrapMethods`.
    pub fn bootstrap_method(&mut self, handle: u16, arguments: &[u16]) -> u16 {
        self.bootstrap_methods.push((handle, arguments.to_vec()));
        (self.bootstrap_methods.len() - 1) as u16
    }

    pub fn invoke_dynamic(&mut self, bootstrap: u16, name: &str, descriptor: &str) -> Result<u16> {
        let name_and_type = self.name_and_type(name, descriptor)?;
        self.find_or_insert(ConstantEntry::InvokeDynamic(ConstantDynamic {
            bootstrap_method: bootstrap,
            name_and_type: Addressed::from(name_and_type),
        }))
    }

    pub fn field(&mut self, flags: FieldAccessFlags, name: &str, descriptor: &str) -> Result<usize> {
        let field = Field {
            flags,
            name: Addressed::from(self.utf8(name)?),
            descriptor: Addressed::from(self.utf8(descriptor)?),
            attributes: Attributes::default(),
        };
        self.fields.push(field);

        Ok(self.fields.len() - 1)
    }

    /// Declare a method. `code` is the raw bytecode, wrapped in a `Code` attribute.
    pub fn method(
        &mut self,
        flags: MethodAccessFlags,
        name: &str,
        descriptor: &str,
        code: Option<Vec<u8>>,
    ) -> Result<usize> {
        let method = Method {
            flags,
            name: Addressed::from(self.utf8(name)?),
            descriptor: Addressed::from(self.utf8(descriptor)?),
            attributes: Attributes::default(),
        };
        self.methods.push(PendingMethod {
            method,
            code,
            code_attributes: vec![],
        });

        Ok(self.methods.len() - 1)
    }

    fn attribute(&mut self, name: &str, data: Vec<u8>) -> Result<Attribute> {
        Ok(Attribute {
            name: Addressed::from(self.utf8(name)?),
            data,
        })
    }

    pub fn class_attribute(&mut self, name: &str, data: Vec<u8>) -> Result<()> {
        let attribute = self.attribute(name, data)?;
        self.attributes.push(attribute);
        Ok(())
    }

    pub fn field_attribute(&mut self, field: usize, name: &str, data: Vec<u8>) -> Result<()> {
        let attribute = self.attribute(name, data)?;
        if let Some(field) = self.fields.get_mut(field) {
            field.attributes.values.push(attribute);
        }
        Ok(())
    }

    pub fn method_attribute(&mut self, method: usize, name: &str, data: Vec<u8>) -> Result<()> {
        let attribute = self.attribute(name, data)?;
        if let Some(method) = self.methods.get_mut(method) {
            method.method.attributes.values.push(attribute);
        }
        Ok(())
    }

    /// Attach an attribute to the `Code` of a method, such as a `LocalVariableTable`.
    pub fn code_attribute(&mut self, method: usize, name: &str, data: Vec<u8>) -> Result<()> {
        let attribute = self.attribute(name, data)?;
        if let Some(method) = self.methods.get_mut(method) {
            method.code_attributes.push(attribute);
        }
        Ok(())
    }

    fn code_body(code: &[u8], attributes: &[Attribute]) -> Result<Vec<u8>> {
        let mut body = vec![];
        body.put_u16(8);
        body.put_u16(8);
        body.put_u32_len(code.len())?;
        body.put_slice(code);
        // No exception handlers
        body.put_u16(0);

        body.put_u16_len(attributes.len())?;
        for attribute in attributes {
            body.put_u16(attribute.name.index());
            body.put_u32_len(attribute.data.len())?;
            body.put_slice(&attribute.data);
        }

        Ok(body)
    }

    pub fn build(mut self) -> Result<ClassFile> {
        if !self.bootstrap_methods.is_empty() {
            let mut data = vec![];
            data.put_u16_len(self.bootstrap_methods.len())?;
            for (handle, arguments) in &self.bootstrap_methods {
                data.put_u16(*handle);
                data.put_u16_len(arguments.len())?;
                for argument in arguments {
                    data.put_u16(*argument);
                }
            }
            self.class_attribute(attribute::BOOTSTRAP_METHODS, data)?;
        }

        let mut methods = vec![];
        for pending in std::mem::take(&mut self.methods) {
            let mut method = pending.method;
            if let Some(code) = pending.code {
                let body = Self::code_body(&code, &pending.code_attributes)?;
                let code = self.attribute(attribute::CODE, body)?;
                method.attributes.values.insert(0, code);
            }
            methods.push(method);
        }

        Ok(ClassFile {
            constant_pool: self.pool,
            meta_data: MetaData {
                minor_version: 0,
                major_version: self.major_version,
            },
            access_flags: self.access_flags,
            this_class: Addressed::from(self.this_class),
            super_class: self.super_class.map(Addressed::from),
            interfaces: Interfaces {
                values: self.interfaces.into_iter().map(Addressed::from).collect(),
            },
            fields: Fields {
                values: self.fields,
            },
            methods: Methods { values: methods },
            attributes: Attributes {
                values: self.attributes,
            },
        })
    }

    pub fn to_bytes(self) -> Result<Vec<u8>> {
        Writer::new().write(&self.build()?)
    }
}
