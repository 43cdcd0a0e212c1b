use crate::{
    attributes::Attributes,
    flags::{ClassFileAccessFlags, FieldAccessFlags, MethodAccessFlags},
    pool::{Addressed, ConstantClass, ConstantPool, ConstantUtf8},
};
use anyhow::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    pub constant_pool: ConstantPool,
    pub meta_data: MetaData,

    pub access_flags: ClassFileAccessFlags,
    pub this_class: Addressed<ConstantClass>,
    pub super_class: Option<Addressed<ConstantClass>>,

    pub interfaces: Interfaces,
    pub fields: Fields,
    pub methods: Methods,
    pub attributes: Attributes,
}

impl ClassFile {
    pub fn name(&self) -> Result<String> {
        self.constant_pool.class_name(self.this_class.index())
    }

    pub fn super_name(&self) -> Result<Option<String>> {
        self.super_class
            .map(|class| self.constant_pool.class_name(class.index()))
            .transpose()
    }

    pub fn interface_names(&self) -> Result<Vec<String>> {
        self.interfaces
            .values
            .iter()
            .map(|class| self.constant_pool.class_name(class.index()))
            .collect()
    }

    pub fn header(&self) -> Result<ClassHeader> {
        Ok(ClassHeader {
            name: self.name()?,
            super_name: self.super_name()?,
            interfaces: self.interface_names()?,
            access_flags: self.access_flags,
        })
    }
}

/// The hierarchy facts of a class, cheap to read without parsing members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHeader {
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub access_flags: ClassFileAccessFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub flags: FieldAccessFlags,
    pub name: Addressed<ConstantUtf8>,
    pub descriptor: Addressed<ConstantUtf8>,
    pub attributes: Attributes,
}

impl Field {
    pub fn name(&self, pool: &ConstantPool) -> Result<String> {
        pool.utf8(self.name.index())
    }

    pub fn descriptor(&self, pool: &ConstantPool) -> Result<String> {
        pool.utf8(self.descriptor.index())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    pub values: Vec<Field>,
}

impl Fields {
    pub fn locate(&self, pool: &ConstantPool, name: &str) -> Option<&Field> {
        self.values
            .iter()
            .find(|v| v.name(pool).map_or(false, |n| n == name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub flags: MethodAccessFlags,
    pub name: Addressed<ConstantUtf8>,
    pub descriptor: Addressed<ConstantUtf8>,
    pub attributes: Attributes,
}

impl Method {
    pub fn name(&self, pool: &ConstantPool) -> Result<String> {
        pool.utf8(self.name.index())
    }

    pub fn descriptor(&self, pool: &ConstantPool) -> Result<String> {
        pool.utf8(self.descriptor.index())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Methods {
    pub values: Vec<Method>,
}

impl Methods {
    pub fn locate(&self, pool: &ConstantPool, name: &str, descriptor: &str) -> Option<&Method> {
        self.values.iter().find(|v| {
            let mname = v.name(pool);
            let mdescriptor = v.descriptor(pool);
            matches!((mname, mdescriptor), (Ok(n), Ok(d)) if n == name && d == descriptor)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interfaces {
    pub values: Vec<Addressed<ConstantClass>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaData {
    pub minor_version: u16,
    pub major_version: u16,
}
