//! Symbol reference sites and in-place renaming.
//!
//! A class refers to other classes and members only by name, and those names
//! are spread over the constant pool, the member tables and a handful of
//! attributes. [`ClassFile::reference_sites`] lists every one of them, and
//! [`ClassFile::remap`] rewrites them through a [`Remapper`].
//!
//! Existing `Utf8` and `NameAndType` entries are never edited since other
//! constants (string literals, unrelated members) may share them. Renamed
//! values get their own entries, appended to the pool, and the site is
//! repointed. Attribute bodies are patched in place, their length never changes.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use support::bytes_ext::{patch_u16, peek_u16};
use support::descriptor::{remap_descriptor, FieldType, MethodType};
use support::encoding::encode_string;
use support::signature::remap_signature;
use tracing::trace;

use crate::attributes::{Attributes, BootstrapMethodsAttribute, CodeAttribute};
use crate::classfile::ClassFile;
use crate::constants::{attribute, LAMBDA_METAFACTORY};
use crate::flags::{FieldAccessFlags, MethodAccessFlags};
use crate::pool::{
    Addressed, ConstantDynamic, ConstantEntry, ConstantNameAndType, ConstantPool, ConstantUtf8,
    MemberKind, Resolvable,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeOwner {
    Class,
    Field(usize),
    Method(usize),
}

/// Where a symbol lives inside a class file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    ClassConstant(u16),
    MemberConstant(u16),
    MethodTypeConstant(u16),
    DynamicConstant(u16),
    FieldDeclaration(usize),
    MethodDeclaration(usize),
    /// A pool index stored at `offset` inside the body of a top level attribute
    Attribute {
        owner: AttributeOwner,
        attribute: usize,
        offset: usize,
    },
    /// An instruction operand. It aliases the constant at `index` and is
    /// renamed through that constant.
    Instruction { method: usize, pc: u32, index: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaTarget {
    pub interface: String,
    pub method_descriptor: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicCallSite {
    pub name: String,
    pub descriptor: String,
    /// Set when the call site is bootstrapped by the lambda metafactory
    pub lambda: Option<LambdaTarget>,
}

/// A name as it appears at a reference site, before any renaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    /// An internal class name, or an array descriptor for array class constants
    Class(String),
    Field {
        owner: String,
        name: String,
        descriptor: String,
        /// Access flags when this is the declaration itself
        declared: Option<FieldAccessFlags>,
    },
    Method {
        owner: String,
        name: String,
        descriptor: String,
        declared: Option<MethodAccessFlags>,
    },
    Descriptor(String),
    Signature(String),
    InnerName {
        inner: String,
        name: String,
    },
    RecordComponent {
        owner: String,
        name: String,
        descriptor: String,
    },
    EnclosingMethod {
        owner: String,
        name: String,
        descriptor: String,
    },
    DynamicCallSite(DynamicCallSite),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSite {
    pub location: Location,
    pub symbol: Symbol,
}

/// Answers rename queries for the sites of a class.
///
/// Returning `None` leaves the symbol as it is.
pub trait Remapper {
    fn map_class(&self, name: &str) -> Option<String>;

    fn map_field_name(
        &self,
        owner: &str,
        name: &str,
        descriptor: &str,
        declared: Option<FieldAccessFlags>,
    ) -> Option<String>;

    fn map_method_name(
        &self,
        owner: &str,
        name: &str,
        descriptor: &str,
        declared: Option<MethodAccessFlags>,
    ) -> Option<String>;

    /// Class constants name arrays by their descriptor.
    fn map_type(&self, name: &str) -> Result<Option<String>> {
        if name.starts_with('[') {
            let mapped = self.map_descriptor(name)?;
            Ok((mapped != name).then_some(mapped))
        } else {
            Ok(self.map_class(name))
        }
    }

    fn map_descriptor(&self, descriptor: &str) -> Result<String> {
        remap_descriptor(descriptor, &|class| self.map_class(class))
    }

    fn map_signature(&self, signature: &str) -> Result<String> {
        remap_signature(signature, &|class| self.map_class(class))
    }

    /// The simple name recorded in `InnerClasses` follows the renamed class,
    /// unless only its package moved.
    fn map_inner_name(&self, inner: &str, name: &str) -> Option<String> {
        let mapped = self.map_class(inner)?;

        if let (Some(old), Some(new)) = (inner.rfind('/'), mapped.rfind('/')) {
            if inner[old..] == mapped[new..] {
                return None;
            }
        }

        let dollar = mapped.rfind('$')?;
        let simple = mapped[dollar + 1..].trim_start_matches(|c: char| c.is_ascii_digit());
        (simple != name).then(|| simple.to_string())
    }

    /// Lambda call sites are named after the interface method they implement.
    fn map_dynamic_name(&self, site: &DynamicCallSite) -> Option<String> {
        let lambda = site.lambda.as_ref()?;
        self.map_method_name(&lambda.interface, &site.name, &lambda.method_descriptor, None)
    }
}

/// Bounded big endian reads over an attribute body, tracking absolute offsets.
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
    end: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            end: data.len(),
        }
    }

    fn nested(&self, length: usize) -> Result<Reader<'a>> {
        let end = self.offset + length;
        if end > self.end {
            return Err(anyhow!("nested attribute of {} bytes overruns its parent", length));
        }

        Ok(Reader {
            data: self.data,
            offset: self.offset,
            end,
        })
    }

    fn position(&self) -> usize {
        self.offset
    }

    fn skip(&mut self, length: usize) -> Result<()> {
        if self.offset + length > self.end {
            return Err(anyhow!("attribute truncated at offset {}", self.offset));
        }
        self.offset += length;
        Ok(())
    }

    fn u8(&mut self) -> Result<u8> {
        let at = self.offset;
        self.skip(1)?;
        Ok(self.data[at])
    }

    fn u16(&mut self) -> Result<u16> {
        let at = self.offset;
        self.skip(2)?;
        peek_u16(self.data, at)
    }

    fn u32(&mut self) -> Result<u32> {
        let high = self.u16()? as u32;
        let low = self.u16()? as u32;
        Ok(high << 16 | low)
    }
}

struct SiteCollector<'c> {
    class: &'c ClassFile,
    pool: &'c ConstantPool,
    name: String,
    bootstrap: Option<BootstrapMethodsAttribute>,
    sites: Vec<ReferenceSite>,
}

impl<'c> SiteCollector<'c> {
    fn new(class: &'c ClassFile) -> Result<Self> {
        let pool = &class.constant_pool;

        Ok(Self {
            class,
            pool,
            name: class.name()?,
            bootstrap: class.attributes.known_attribute(pool)?,
            sites: vec![],
        })
    }

    fn push(&mut self, location: Location, symbol: Symbol) {
        self.sites.push(ReferenceSite { location, symbol });
    }

    fn member_symbol(&self, index: u16) -> Result<Symbol> {
        let member = self.pool.member_ref(index)?;
        Ok(match member.kind {
            MemberKind::Field => Symbol::Field {
                owner: member.owner,
                name: member.name,
                descriptor: member.descriptor,
                declared: None,
            },
            MemberKind::Method | MemberKind::InterfaceMethod => Symbol::Method {
                owner: member.owner,
                name: member.name,
                descriptor: member.descriptor,
                declared: None,
            },
        })
    }

    fn lambda_target(&self, bootstrap: u16, descriptor: &str) -> Result<Option<LambdaTarget>> {
        let methods = match &self.bootstrap {
            Some(attribute) => &attribute.methods,
            None => return Err(anyhow!("dynamic constant without a BootstrapMethods attribute")),
        };

        let method = methods
            .get(bootstrap as usize)
            .ok_or(anyhow!("bootstrap method {} out of range", bootstrap))?;

        let handle = method.method.try_resolve(self.pool)?;
        let factory = self.pool.member_ref(handle.reference.index())?;
        if factory.owner != LAMBDA_METAFACTORY
            || !(factory.name == "metafactory" || factory.name == "altMetafactory")
        {
            return Ok(None);
        }

        // Only invokedynamic call sites produce a functional interface
        if !descriptor.starts_with('(') {
            return Ok(None);
        }

        let interface = match MethodType::parse(descriptor)?.return_type {
            FieldType::Object(object) => object.class_name,
            _ => return Ok(None),
        };

        let method_descriptor = match method.arguments.first() {
            Some(argument) => match argument.try_resolve(self.pool)? {
                ConstantEntry::MethodType(method_type) => {
                    self.pool.utf8(method_type.descriptor.index())?
                }
                _ => return Ok(None),
            },
            None => return Ok(None),
        };

        Ok(Some(LambdaTarget {
            interface,
            method_descriptor,
        }))
    }

    fn dynamic_call_site(&self, dynamic: &ConstantDynamic) -> Result<DynamicCallSite> {
        let (name, descriptor) = self.pool.name_and_type(dynamic.name_and_type.index())?;
        let lambda = self.lambda_target(dynamic.bootstrap_method, &descriptor)?;

        Ok(DynamicCallSite {
            name,
            descriptor,
            lambda,
        })
    }

    /// The symbol carried by a constant, if it names anything.
    fn constant_symbol(&self, index: u16) -> Result<Option<(Location, Symbol)>> {
        Ok(Some(match self.pool.get(index)? {
            ConstantEntry::Class(_) => (
                Location::ClassConstant(index),
                Symbol::Class(self.pool.class_name(index)?),
            ),
            ConstantEntry::Field(_)
            | ConstantEntry::Method(_)
            | ConstantEntry::InterfaceMethod(_) => {
                (Location::MemberConstant(index), self.member_symbol(index)?)
            }
            ConstantEntry::MethodType(data) => (
                Location::MethodTypeConstant(index),
                Symbol::Descriptor(self.pool.utf8(data.descriptor.index())?),
            ),
            ConstantEntry::Dynamic(data) | ConstantEntry::InvokeDynamic(data) => (
                Location::DynamicConstant(index),
                Symbol::DynamicCallSite(self.dynamic_call_site(data)?),
            ),
            // Handles name their target through a member constant
            ConstantEntry::MethodHandle(handle) => (
                Location::MemberConstant(handle.reference.index()),
                self.member_symbol(handle.reference.index())?,
            ),
            _ => return Ok(None),
        }))
    }

    fn constants(&mut self) -> Result<()> {
        for (index, entry) in self.pool.iter() {
            if let ConstantEntry::MethodHandle(_) = entry {
                continue;
            }

            if let Some((location, symbol)) = self.constant_symbol(index)? {
                self.push(location, symbol);
            }
        }

        Ok(())
    }

    fn declarations(&mut self) -> Result<()> {
        let (class, pool) = (self.class, self.pool);

        for (index, field) in class.fields.values.iter().enumerate() {
            let symbol = Symbol::Field {
                owner: self.name.clone(),
                name: field.name(pool)?,
                descriptor: field.descriptor(pool)?,
                declared: Some(field.flags),
            };
            self.push(Location::FieldDeclaration(index), symbol);
        }

        for (index, method) in class.methods.values.iter().enumerate() {
            let symbol = Symbol::Method {
                owner: self.name.clone(),
                name: method.name(pool)?,
                descriptor: method.descriptor(pool)?,
                declared: Some(method.flags),
            };
            self.push(Location::MethodDeclaration(index), symbol);
        }

        Ok(())
    }

    fn instructions(&mut self) -> Result<()> {
        let class = self.class;

        for (method, declaration) in class.methods.values.iter().enumerate() {
            let code = match declaration.attributes.known_attribute::<CodeAttribute>(self.pool)? {
                Some(code) => code,
                None => continue,
            };

            for operand in code.pool_operands()? {
                if let Some((_, symbol)) = self.constant_symbol(operand.index)? {
                    let location = Location::Instruction {
                        method,
                        pc: operand.pc,
                        index: operand.index,
                    };
                    self.push(location, symbol);
                }
            }
        }

        Ok(())
    }

    fn attributes(&mut self) -> Result<()> {
        let class = self.class;

        self.attribute_table(AttributeOwner::Class, &class.attributes)?;
        for (index, field) in class.fields.values.iter().enumerate() {
            self.attribute_table(AttributeOwner::Field(index), &field.attributes)?;
        }
        for (index, method) in class.methods.values.iter().enumerate() {
            self.attribute_table(AttributeOwner::Method(index), &method.attributes)?;
        }

        Ok(())
    }

    fn attribute_table(&mut self, owner: AttributeOwner, attributes: &Attributes) -> Result<()> {
        for (index, attribute) in attributes.values.iter().enumerate() {
            let name = attribute.name(self.pool)?;
            let mut reader = Reader::new(&attribute.data);

            self.attribute(owner, index, &name, &mut reader)
                .map_err(|e| anyhow!("{} attribute is malformed: {}", name, e))?;
        }

        Ok(())
    }

    fn attribute(
        &mut self,
        owner: AttributeOwner,
        index: usize,
        name: &str,
        reader: &mut Reader,
    ) -> Result<()> {
        let pool = self.pool;
        let at = |offset: usize| Location::Attribute {
            owner,
            attribute: index,
            offset,
        };

        match name {
            attribute::SIGNATURE => {
                let offset = reader.position();
                let signature = pool.utf8(reader.u16()?)?;
                self.push(at(offset), Symbol::Signature(signature));
            }
            attribute::INNER_CLASSES => {
                for _ in 0..reader.u16()? {
                    let inner = reader.u16()?;
                    reader.skip(2)?;
                    let offset = reader.position();
                    let inner_name = reader.u16()?;
                    reader.skip(2)?;

                    // Anonymous classes have no simple name
                    if inner_name != 0 {
                        let symbol = Symbol::InnerName {
                            inner: pool.class_name(inner)?,
                            name: pool.utf8(inner_name)?,
                        };
                        self.push(at(offset), symbol);
                    }
                }
            }
            attribute::ENCLOSING_METHOD => {
                let class = reader.u16()?;
                let offset = reader.position();
                let method = reader.u16()?;

                if method != 0 {
                    let (name, descriptor) = pool.name_and_type(method)?;
                    let symbol = Symbol::EnclosingMethod {
                        owner: pool.class_name(class)?,
                        name,
                        descriptor,
                    };
                    self.push(at(offset), symbol);
                }
            }
            attribute::LOCAL_VARIABLE_TABLE | attribute::LOCAL_VARIABLE_TYPE_TABLE => {
                for _ in 0..reader.u16()? {
                    // start_pc, length, name
                    reader.skip(6)?;
                    let offset = reader.position();
                    let value = pool.utf8(reader.u16()?)?;
                    reader.skip(2)?;

                    let symbol = if name == attribute::LOCAL_VARIABLE_TABLE {
                        Symbol::Descriptor(value)
                    } else {
                        Symbol::Signature(value)
                    };
                    self.push(at(offset), symbol);
                }
            }
            attribute::RUNTIME_VISIBLE_ANNOTATIONS | attribute::RUNTIME_INVISIBLE_ANNOTATIONS => {
                for _ in 0..reader.u16()? {
                    self.annotation(&at, reader)?;
                }
            }
            attribute::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS
            | attribute::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS => {
                for _ in 0..reader.u8()? {
                    for _ in 0..reader.u16()? {
                        self.annotation(&at, reader)?;
                    }
                }
            }
            attribute::RUNTIME_VISIBLE_TYPE_ANNOTATIONS
            | attribute::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS => {
                for _ in 0..reader.u16()? {
                    self.type_annotation(&at, reader)?;
                }
            }
            attribute::ANNOTATION_DEFAULT => self.element_value(&at, reader)?,
            attribute::RECORD => {
                for _ in 0..reader.u16()? {
                    let name_offset = reader.position();
                    let name = pool.utf8(reader.u16()?)?;
                    let descriptor_offset = reader.position();
                    let descriptor = pool.utf8(reader.u16()?)?;

                    let symbol = Symbol::RecordComponent {
                        owner: self.name.clone(),
                        name,
                        descriptor: descriptor.clone(),
                    };
                    self.push(at(name_offset), symbol);
                    self.push(at(descriptor_offset), Symbol::Descriptor(descriptor));

                    self.nested_attributes(owner, index, reader)?;
                }
            }
            attribute::CODE if matches!(owner, AttributeOwner::Method(_)) => {
                // max_stack, max_locals
                reader.skip(4)?;
                let code_length = reader.u32()? as usize;
                reader.skip(code_length)?;
                let exceptions = reader.u16()? as usize;
                reader.skip(exceptions * 8)?;

                self.nested_attributes(owner, index, reader)?;
            }
            _ => {}
        }

        Ok(())
    }

    fn nested_attributes(
        &mut self,
        owner: AttributeOwner,
        index: usize,
        reader: &mut Reader,
    ) -> Result<()> {
        for _ in 0..reader.u16()? {
            let name = self.pool.utf8(reader.u16()?)?;
            let length = reader.u32()? as usize;

            let mut nested = reader.nested(length)?;
            self.attribute(owner, index, &name, &mut nested)?;
            reader.skip(length)?;
        }

        Ok(())
    }

    fn annotation(&mut self, at: &impl Fn(usize) -> Location, reader: &mut Reader) -> Result<()> {
        let offset = reader.position();
        let descriptor = self.pool.utf8(reader.u16()?)?;
        self.push(at(offset), Symbol::Descriptor(descriptor));

        for _ in 0..reader.u16()? {
            // element_name_index
            reader.skip(2)?;
            self.element_value(at, reader)?;
        }

        Ok(())
    }

    fn element_value(&mut self, at: &impl Fn(usize) -> Location, reader: &mut Reader) -> Result<()> {
        match reader.u8()? {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => reader.skip(2)?,
            b'e' => {
                let offset = reader.position();
                let descriptor = self.pool.utf8(reader.u16()?)?;
                self.push(at(offset), Symbol::Descriptor(descriptor));
                // const_name_index
                reader.skip(2)?;
            }
            b'c' => {
                let offset = reader.position();
                let descriptor = self.pool.utf8(reader.u16()?)?;
                // void.class is recorded as a bare return type
                if descriptor != "V" {
                    self.push(at(offset), Symbol::Descriptor(descriptor));
                }
            }
            b'@' => self.annotation(at, reader)?,
            b'[' => {
                for _ in 0..reader.u16()? {
                    self.element_value(at, reader)?;
                }
            }
            tag => return Err(anyhow!("unknown element value tag {:?}", tag as char)),
        }

        Ok(())
    }

    fn type_annotation(&mut self, at: &impl Fn(usize) -> Location, reader: &mut Reader) -> Result<()> {
        let target = reader.u8()?;
        match target {
            // type_parameter_target, formal_parameter_target
            0x00 | 0x01 | 0x16 => reader.skip(1)?,
            // supertype_target, type_parameter_bound_target, throws_target, catch_target, offset_target
            0x10..=0x12 | 0x17 | 0x42..=0x46 => reader.skip(2)?,
            // empty_target
            0x13..=0x15 => {}
            // localvar_target
            0x40 | 0x41 => {
                let length = reader.u16()? as usize;
                reader.skip(length * 6)?;
            }
            // type_argument_target
            0x47..=0x4b => reader.skip(3)?,
            _ => return Err(anyhow!("unknown type annotation target {:#04x}", target)),
        }

        let path_length = reader.u8()? as usize;
        reader.skip(path_length * 2)?;

        self.annotation(at, reader)
    }
}

enum Replacement {
    Utf8(String),
    NameAndType { name: String, descriptor: String },
}

fn changed(old: &str, new: String) -> Option<String> {
    (old != new).then_some(new)
}

fn member_replacement(
    name: &str,
    descriptor: &str,
    new_name: Option<String>,
    new_descriptor: String,
) -> Option<Replacement> {
    let new_name = new_name.unwrap_or_else(|| name.to_string());
    if new_name == name && new_descriptor == descriptor {
        return None;
    }

    Some(Replacement::NameAndType {
        name: new_name,
        descriptor: new_descriptor,
    })
}

fn replacement<R: Remapper + ?Sized>(remapper: &R, symbol: &Symbol) -> Result<Option<Replacement>> {
    Ok(match symbol {
        Symbol::Class(name) => remapper.map_type(name)?.map(Replacement::Utf8),
        Symbol::Field {
            owner,
            name,
            descriptor,
            declared,
        } => member_replacement(
            name,
            descriptor,
            remapper.map_field_name(owner, name, descriptor, *declared),
            remapper.map_descriptor(descriptor)?,
        ),
        Symbol::Method {
            owner,
            name,
            descriptor,
            declared,
        } => member_replacement(
            name,
            descriptor,
            remapper.map_method_name(owner, name, descriptor, *declared),
            remapper.map_descriptor(descriptor)?,
        ),
        Symbol::EnclosingMethod {
            owner,
            name,
            descriptor,
        } => member_replacement(
            name,
            descriptor,
            remapper.map_method_name(owner, name, descriptor, None),
            remapper.map_descriptor(descriptor)?,
        ),
        Symbol::DynamicCallSite(site) => member_replacement(
            &site.name,
            &site.descriptor,
            remapper.map_dynamic_name(site),
            remapper.map_descriptor(&site.descriptor)?,
        ),
        Symbol::Descriptor(descriptor) => {
            changed(descriptor, remapper.map_descriptor(descriptor)?).map(Replacement::Utf8)
        }
        Symbol::Signature(signature) => {
            changed(signature, remapper.map_signature(signature)?).map(Replacement::Utf8)
        }
        Symbol::InnerName { inner, name } => {
            remapper.map_inner_name(inner, name).map(Replacement::Utf8)
        }
        // Components mirror the private final fields backing them
        Symbol::RecordComponent {
            owner,
            name,
            descriptor,
        } => remapper
            .map_field_name(
                owner,
                name,
                descriptor,
                Some(FieldAccessFlags::PRIVATE | FieldAccessFlags::FINAL),
            )
            .and_then(|new| changed(name, new))
            .map(Replacement::Utf8),
    })
}

/// Finds or appends `Utf8` and `NameAndType` entries.
struct Interner {
    utf8: HashMap<Vec<u8>, u16>,
    name_and_type: HashMap<(u16, u16), u16>,
}

impl Interner {
    fn new(pool: &ConstantPool) -> Self {
        let mut utf8 = HashMap::new();
        let mut name_and_type = HashMap::new();

        for (index, entry) in pool.iter() {
            match entry {
                ConstantEntry::Utf8(data) => {
                    utf8.entry(data.bytes.clone()).or_insert(index);
                }
                ConstantEntry::NameAndType(data) => {
                    name_and_type
                        .entry((data.name.index(), data.descriptor.index()))
                        .or_insert(index);
                }
                _ => {}
            }
        }

        Self {
            utf8,
            name_and_type,
        }
    }

    fn utf8(&mut self, pool: &mut ConstantPool, value: &str) -> Result<u16> {
        let bytes = encode_string(value);
        if let Some(index) = self.utf8.get(&bytes) {
            return Ok(*index);
        }

        let index = pool.insert(ConstantEntry::Utf8(ConstantUtf8 {
            bytes: bytes.clone(),
        }))?;
        self.utf8.insert(bytes, index);

        Ok(index)
    }

    fn name_and_type(&mut self, pool: &mut ConstantPool, name: &str, descriptor: &str) -> Result<u16> {
        let key = (self.utf8(pool, name)?, self.utf8(pool, descriptor)?);
        if let Some(index) = self.name_and_type.get(&key) {
            return Ok(*index);
        }

        let index = pool.insert(ConstantEntry::NameAndType(ConstantNameAndType {
            name: Addressed::from(key.0),
            descriptor: Addressed::from(key.1),
        }))?;
        self.name_and_type.insert(key, index);

        Ok(index)
    }
}

impl ClassFile {
    /// Every place in this class that refers to a class or member by name.
    pub fn reference_sites(&self) -> Result<Vec<ReferenceSite>> {
        let mut collector = SiteCollector::new(self)?;

        collector.constants()?;
        collector.declarations()?;
        collector.attributes()?;
        collector.instructions()?;

        Ok(collector.sites)
    }

    /// Rename every reference site through `remapper`, returning how many changed.
    ///
    /// All lookups see the names as they were before the call.
    pub fn remap<R: Remapper + ?Sized>(&mut self, remapper: &R) -> Result<usize> {
        let sites = self.reference_sites()?;
        let mut interner = Interner::new(&self.constant_pool);
        let mut rewritten = 0;

        for site in sites {
            if let Location::Instruction { .. } = site.location {
                continue;
            }

            if let Some(replacement) = replacement(remapper, &site.symbol)? {
                trace!("Rewriting {:?} at {:?}", site.symbol, site.location);
                self.apply(&mut interner, site.location, replacement)?;
                rewritten += 1;
            }
        }

        Ok(rewritten)
    }

    fn attributes_mut(&mut self, owner: AttributeOwner) -> Result<&mut Attributes> {
        Ok(match owner {
            AttributeOwner::Class => &mut self.attributes,
            AttributeOwner::Field(index) => {
                &mut self
                    .fields
                    .values
                    .get_mut(index)
                    .ok_or(anyhow!("no field at {}", index))?
                    .attributes
            }
            AttributeOwner::Method(index) => {
                &mut self
                    .methods
                    .values
                    .get_mut(index)
                    .ok_or(anyhow!("no method at {}", index))?
                    .attributes
            }
        })
    }

    fn apply(
        &mut self,
        interner: &mut Interner,
        location: Location,
        replacement: Replacement,
    ) -> Result<()> {
        let pool = &mut self.constant_pool;

        match (location, replacement) {
            (Location::ClassConstant(index), Replacement::Utf8(name)) => {
                let name = interner.utf8(pool, &name)?;
                if let ConstantEntry::Class(class) = pool.get_mut(index)? {
                    class.name = Addressed::from(name);
                }
            }
            (Location::MethodTypeConstant(index), Replacement::Utf8(descriptor)) => {
                let descriptor = interner.utf8(pool, &descriptor)?;
                if let ConstantEntry::MethodType(method_type) = pool.get_mut(index)? {
                    method_type.descriptor = Addressed::from(descriptor);
                }
            }
            (Location::MemberConstant(index), Replacement::NameAndType { name, descriptor }) => {
                let nat = interner.name_and_type(pool, &name, &descriptor)?;
                match pool.get_mut(index)? {
                    ConstantEntry::Field(member)
                    | ConstantEntry::Method(member)
                    | ConstantEntry::InterfaceMethod(member) => {
                        member.name_and_type = Addressed::from(nat)
                    }
                    _ => {}
                }
            }
            (Location::DynamicConstant(index), Replacement::NameAndType { name, descriptor }) => {
                let nat = interner.name_and_type(pool, &name, &descriptor)?;
                match pool.get_mut(index)? {
                    ConstantEntry::Dynamic(dynamic) | ConstantEntry::InvokeDynamic(dynamic) => {
                        dynamic.name_and_type = Addressed::from(nat)
                    }
                    _ => {}
                }
            }
            (Location::FieldDeclaration(index), Replacement::NameAndType { name, descriptor }) => {
                let name = interner.utf8(pool, &name)?;
                let descriptor = interner.utf8(pool, &descriptor)?;
                let field = self
                    .fields
                    .values
                    .get_mut(index)
                    .ok_or(anyhow!("no field at {}", index))?;

                field.name = Addressed::from(name);
                field.descriptor = Addressed::from(descriptor);
            }
            (Location::MethodDeclaration(index), Replacement::NameAndType { name, descriptor }) => {
                let name = interner.utf8(pool, &name)?;
                let descriptor = interner.utf8(pool, &descriptor)?;
                let method = self
                    .methods
                    .values
                    .get_mut(index)
                    .ok_or(anyhow!("no method at {}", index))?;

                method.name = Addressed::from(name);
                method.descriptor = Addressed::from(descriptor);
            }
            (
                Location::Attribute {
                    owner,
                    attribute,
                    offset,
                },
                replacement,
            ) => {
                let value = match replacement {
                    Replacement::Utf8(value) => interner.utf8(pool, &value)?,
                    Replacement::NameAndType { name, descriptor } => {
                        interner.name_and_type(pool, &name, &descriptor)?
                    }
                };

                let attribute = self
                    .attributes_mut(owner)?
                    .values
                    .get_mut(attribute)
                    .ok_or(anyhow!("no attribute at {}", attribute))?;
                patch_u16(&mut attribute.data, offset, value)?;
            }
            (location, _) => {
                return Err(anyhow!("cannot rewrite {:?} with this kind of value", location))
            }
        }

        Ok(())
    }
}
