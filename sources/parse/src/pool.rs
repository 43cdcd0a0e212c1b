use std::{fmt, marker::PhantomData};

use anyhow::{anyhow, Result};
use enum_as_inner::EnumAsInner;
use support::encoding::{decode_string, encode_string};

use crate::constants::MAX_POOL_SLOTS;

/// The constant pool of a class file.
///
/// Slots are addressed from 1 as in the class file. `Long` and `Double`
/// occupy two slots, the second one is kept as [`ConstantEntry::Reserved`]
/// so that indices line up with the binary layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantPool {
    entries: Vec<ConstantEntry>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self { entries: vec![] }
    }

    /// Number of slots in use, this is `constant_pool_count - 1`.
    pub fn slots(&self) -> usize {
        self.entries.len()
    }

    /// Append an entry, returning its index.
    pub fn insert(&mut self, entry: ConstantEntry) -> Result<u16> {
        let wide = matches!(entry, ConstantEntry::Long(_) | ConstantEntry::Double(_));
        let needed = if wide { 2 } else { 1 };

        if self.entries.len() + needed > MAX_POOL_SLOTS {
            return Err(anyhow!(
                "constant pool overflow, cannot grow past {} slots",
                MAX_POOL_SLOTS
            ));
        }

        self.entries.push(entry);
        let index = self.entries.len() as u16;

        // Special case: 64 Bit types are supposed to take up 2 slots
        if wide {
            self.entries.push(ConstantEntry::Reserved);
        }

        Ok(index)
    }

    pub fn get(&self, index: u16) -> Result<&ConstantEntry> {
        let entry = index
            .checked_sub(1)
            .and_then(|i| self.entries.get(i as usize))
            .ok_or(anyhow!(
                "constant pool index #{} out of range (1..={})",
                index,
                self.entries.len()
            ))?;

        if let ConstantEntry::Reserved = entry {
            return Err(anyhow!("constant pool index #{} is the upper half of a wide entry", index));
        }

        Ok(entry)
    }

    pub fn get_mut(&mut self, index: u16) -> Result<&mut ConstantEntry> {
        let len = self.entries.len();
        index
            .checked_sub(1)
            .and_then(|i| self.entries.get_mut(i as usize))
            .ok_or(anyhow!("constant pool index #{} out of range (1..={})", index, len))
    }

    /// Every usable entry with its index, skipping reserved slots.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &ConstantEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !matches!(entry, ConstantEntry::Reserved))
            .map(|(i, entry)| ((i + 1) as u16, entry))
    }

    /// Every slot in order, including reserved ones. Used by the writer.
    pub(crate) fn slots_iter(&self) -> impl Iterator<Item = &ConstantEntry> {
        self.entries.iter()
    }

    pub fn address<T>(&self, for_index: u16) -> Addressed<T> {
        Addressed::from(for_index)
    }

    pub fn utf8(&self, index: u16) -> Result<String> {
        let addressed: Addressed<ConstantUtf8> = self.address(index);
        addressed.try_resolve(self)?.try_string()
    }

    pub fn class_name(&self, index: u16) -> Result<String> {
        let addressed: Addressed<ConstantClass> = self.address(index);
        let class = addressed.try_resolve(self)?;
        self.utf8(class.name.index())
    }

    pub fn name_and_type(&self, index: u16) -> Result<(String, String)> {
        let addressed: Addressed<ConstantNameAndType> = self.address(index);
        let nat = addressed.try_resolve(self)?;
        Ok((self.utf8(nat.name.index())?, self.utf8(nat.descriptor.index())?))
    }

    pub fn member_ref(&self, index: u16) -> Result<MemberRef> {
        let kind = match self.get(index)? {
            ConstantEntry::Field(_) => MemberKind::Field,
            ConstantEntry::Method(_) => MemberKind::Method,
            ConstantEntry::InterfaceMethod(_) => MemberKind::InterfaceMethod,
            other => {
                return Err(anyhow!(
                    "expected a member reference at #{} but found {}",
                    index,
                    other.tag_name()
                ))
            }
        };

        let addressed: Addressed<ConstantMemberRef> = self.address(index);
        let member = addressed.try_resolve(self)?;
        let (name, descriptor) = self.name_and_type(member.name_and_type.index())?;

        Ok(MemberRef {
            kind,
            owner: self.class_name(member.class.index())?,
            name,
            descriptor,
        })
    }

    /// Find an existing `Utf8` with exactly these contents.
    pub fn find_utf8(&self, value: &str) -> Option<u16> {
        let encoded = encode_string(value);
        self.iter().find_map(|(index, entry)| match entry {
            ConstantEntry::Utf8(utf8) if utf8.bytes == encoded => Some(index),
            _ => None,
        })
    }

    pub(crate) fn perform_format_checking(&self) -> Result<()> {
        for (index, item) in self.iter() {
            let checked = match item {
                ConstantEntry::Class(data) => data.name.try_resolve(self).map(|_| ()),
                ConstantEntry::String(data) => data.string.try_resolve(self).map(|_| ()),
                ConstantEntry::Field(data)
                | ConstantEntry::Method(data)
                | ConstantEntry::InterfaceMethod(data) => data
                    .class
                    .try_resolve(self)
                    .and_then(|_| data.name_and_type.try_resolve(self))
                    .map(|_| ()),
                ConstantEntry::NameAndType(data) => data
                    .name
                    .try_resolve(self)
                    .and_then(|_| data.descriptor.try_resolve(self))
                    .map(|_| ()),
                ConstantEntry::MethodHandle(data) => self.check_method_handle(data),
                ConstantEntry::MethodType(data) => data.descriptor.try_resolve(self).map(|_| ()),
                ConstantEntry::Dynamic(data) | ConstantEntry::InvokeDynamic(data) => {
                    data.name_and_type.try_resolve(self).map(|_| ())
                }
                ConstantEntry::Module(data) | ConstantEntry::Package(data) => {
                    data.name.try_resolve(self).map(|_| ())
                }
                ConstantEntry::Utf8(_)
                | ConstantEntry::Integer(_)
                | ConstantEntry::Float(_)
                | ConstantEntry::Long(_)
                | ConstantEntry::Double(_)
                | ConstantEntry::Reserved => Ok(()),
            };

            checked.map_err(|e| anyhow!("constant pool entry #{} is invalid: {}", index, e))?;
        }

        Ok(())
    }

    fn check_method_handle(&self, handle: &ConstantMethodHandle) -> Result<()> {
        let target = self.get(handle.reference.index())?;
        let valid = match handle.kind {
            1..=4 => matches!(target, ConstantEntry::Field(_)),
            5 | 8 => matches!(target, ConstantEntry::Method(_)),
            6 | 7 => matches!(
                target,
                ConstantEntry::Method(_) | ConstantEntry::InterfaceMethod(_)
            ),
            9 => matches!(target, ConstantEntry::InterfaceMethod(_)),
            _ => return Err(anyhow!("unknown method handle kind {}", handle.kind)),
        };

        if !valid {
            return Err(anyhow!(
                "method handle of kind {} cannot reference a {}",
                handle.kind,
                target.tag_name()
            ));
        }

        Ok(())
    }
}

/// A typed index into the constant pool.
pub struct Addressed<T> {
    index: u16,
    phantom: PhantomData<fn() -> T>,
}

impl<T> Addressed<T> {
    pub fn from(index: u16) -> Self {
        Self {
            index,
            phantom: PhantomData,
        }
    }

    pub fn index(&self) -> u16 {
        self.index
    }
}

impl<T> Clone for Addressed<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Addressed<T> {}

impl<T> PartialEq for Addressed<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Addressed<T> {}

impl<T> fmt::Debug for Addressed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Addressed {{ {} }}", self.index)
    }
}

pub trait Resolvable<T> {
    fn try_resolve<'p>(&self, pool: &'p ConstantPool) -> Result<&'p T>;
}

macro_rules! address {
    ($type: ty, $enum: ident) => {
        impl Resolvable<$type> for Addressed<$type> {
            fn try_resolve<'p>(&self, pool: &'p ConstantPool) -> Result<&'p $type> {
                match pool.get(self.index)? {
                    ConstantEntry::$enum(data) => Ok(data),
                    other => Err(anyhow!(
                        "expected {} at #{} but found {}",
                        stringify!($enum),
                        self.index,
                        other.tag_name()
                    )),
                }
            }
        }
    };
}

address!(ConstantUtf8, Utf8);
address!(ConstantClass, Class);
address!(ConstantNameAndType, NameAndType);
address!(ConstantMethodHandle, MethodHandle);
address!(ConstantMethodType, MethodType);

impl Resolvable<ConstantMemberRef> for Addressed<ConstantMemberRef> {
    fn try_resolve<'p>(&self, pool: &'p ConstantPool) -> Result<&'p ConstantMemberRef> {
        match pool.get(self.index)? {
            ConstantEntry::Field(data)
            | ConstantEntry::Method(data)
            | ConstantEntry::InterfaceMethod(data) => Ok(data),
            other => Err(anyhow!(
                "expected a member reference at #{} but found {}",
                self.index,
                other.tag_name()
            )),
        }
    }
}

impl Resolvable<ConstantEntry> for Addressed<ConstantEntry> {
    fn try_resolve<'p>(&self, pool: &'p ConstantPool) -> Result<&'p ConstantEntry> {
        pool.get(self.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantTag {
    Utf8,
    Integer,
    Float,
    Long,
    Double,
    Class,
    String,
    Field,
    Method,
    InterfaceMethod,
    NameAndType,
    MethodHandle,
    MethodType,
    Dynamic,
    InvokeDynamic,
    Module,
    Package,
}

impl ConstantTag {
    pub fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            1 => ConstantTag::Utf8,
            3 => ConstantTag::Integer,
            4 => ConstantTag::Float,
            5 => ConstantTag::Long,
            6 => ConstantTag::Double,
            7 => ConstantTag::Class,
            8 => ConstantTag::String,
            9 => ConstantTag::Field,
            10 => ConstantTag::Method,
            11 => ConstantTag::InterfaceMethod,
            12 => ConstantTag::NameAndType,
            15 => ConstantTag::MethodHandle,
            16 => ConstantTag::MethodType,
            17 => ConstantTag::Dynamic,
            18 => ConstantTag::InvokeDynamic,
            19 => ConstantTag::Module,
            20 => ConstantTag::Package,
            _ => return Err(anyhow!("{} is an unknown constant pool tag", tag)),
        })
    }

    pub fn value(self) -> u8 {
        match self {
            ConstantTag::Utf8 => 1,
            ConstantTag::Integer => 3,
            ConstantTag::Float => 4,
            ConstantTag::Long => 5,
            ConstantTag::Double => 6,
            ConstantTag::Class => 7,
            ConstantTag::String => 8,
            ConstantTag::Field => 9,
            ConstantTag::Method => 10,
            ConstantTag::InterfaceMethod => 11,
            ConstantTag::NameAndType => 12,
            ConstantTag::MethodHandle => 15,
            ConstantTag::MethodType => 16,
            ConstantTag::Dynamic => 17,
            ConstantTag::InvokeDynamic => 18,
            ConstantTag::Module => 19,
            ConstantTag::Package => 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantUtf8 {
    pub bytes: Vec<u8>,
}

impl ConstantUtf8 {
    pub fn new(value: &str) -> Self {
        Self {
            bytes: encode_string(value),
        }
    }

    pub fn try_string(&self) -> Result<String> {
        decode_string(&self.bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantInteger {
    pub bytes: u32,
}

/// Raw IEEE 754 bits, NaN payloads included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantFloat {
    pub bytes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantLong {
    pub bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantDouble {
    pub bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantClass {
    pub name: Addressed<ConstantUtf8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantString {
    pub string: Addressed<ConstantUtf8>,
}

/// Shared by `Fieldref`, `Methodref` and `InterfaceMethodref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantMemberRef {
    pub class: Addressed<ConstantClass>,
    pub name_and_type: Addressed<ConstantNameAndType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantNameAndType {
    pub name: Addressed<ConstantUtf8>,
    pub descriptor: Addressed<ConstantUtf8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantMethodHandle {
    pub kind: u8,
    pub reference: Addressed<ConstantMemberRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantMethodType {
    pub descriptor: Addressed<ConstantUtf8>,
}

/// Shared by `Dynamic` and `InvokeDynamic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantDynamic {
    /// Index into the `BootstrapMethods` attribute, not the pool
    pub bootstrap_method: u16,
    pub name_and_type: Addressed<ConstantNameAndType>,
}

/// Shared by `Module` and `Package`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantModule {
    pub name: Addressed<ConstantUtf8>,
}

#[derive(EnumAsInner, Clone, Debug, PartialEq)]
pub enum ConstantEntry {
    Utf8(ConstantUtf8),
    Integer(ConstantInteger),
    Float(ConstantFloat),
    Long(ConstantLong),
    Double(ConstantDouble),
    Class(ConstantClass),
    String(ConstantString),
    Field(ConstantMemberRef),
    Method(ConstantMemberRef),
    InterfaceMethod(ConstantMemberRef),
    NameAndType(ConstantNameAndType),
    MethodHandle(ConstantMethodHandle),
    MethodType(ConstantMethodType),
    Dynamic(ConstantDynamic),
    InvokeDynamic(ConstantDynamic),
    Module(ConstantModule),
    Package(ConstantModule),
    Reserved,
}

impl ConstantEntry {
    pub fn tag(&self) -> Option<ConstantTag> {
        Some(match self {
            ConstantEntry::Utf8(_) => ConstantTag::Utf8,
            ConstantEntry::Integer(_) => ConstantTag::Integer,
            ConstantEntry::Float(_) => ConstantTag::Float,
            ConstantEntry::Long(_) => ConstantTag::Long,
            ConstantEntry::Double(_) => ConstantTag::Double,
            ConstantEntry::Class(_) => ConstantTag::Class,
            ConstantEntry::String(_) => ConstantTag::String,
            ConstantEntry::Field(_) => ConstantTag::Field,
            ConstantEntry::Method(_) => ConstantTag::Method,
            ConstantEntry::InterfaceMethod(_) => ConstantTag::InterfaceMethod,
            ConstantEntry::NameAndType(_) => ConstantTag::NameAndType,
            ConstantEntry::MethodHandle(_) => ConstantTag::MethodHandle,
            ConstantEntry::MethodType(_) => ConstantTag::MethodType,
            ConstantEntry::Dynamic(_) => ConstantTag::Dynamic,
            ConstantEntry::InvokeDynamic(_) => ConstantTag::InvokeDynamic,
            ConstantEntry::Module(_) => ConstantTag::Module,
            ConstantEntry::Package(_) => ConstantTag::Package,
            ConstantEntry::Reserved => return None,
        })
    }

    pub fn tag_name(&self) -> String {
        match self.tag() {
            Some(tag) => format!("{:?}", tag),
            None => "Reserved".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    Method,
    InterfaceMethod,
}

/// A fully resolved `Fieldref`/`Methodref`/`InterfaceMethodref`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub kind: MemberKind,
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with_class(name: &str) -> Result<(ConstantPool, u16)> {
        let mut pool = ConstantPool::new();
        let utf8 = pool.insert(ConstantEntry::Utf8(ConstantUtf8::new(name)))?;
        let class = pool.insert(ConstantEntry::Class(ConstantClass {
            name: pool.address(utf8),
        }))?;
        Ok((pool, class))
    }

    #[test]
    fn it_resolves_class_names() -> Result<()> {
        let (pool, class) = pool_with_class("java/lang/Object")?;
        assert_eq!(pool.class_name(class)?, "java/lang/Object");

        Ok(())
    }

    #[test]
    fn it_reserves_the_slot_after_wide_entries() -> Result<()> {
        let mut pool = ConstantPool::new();
        let long = pool.insert(ConstantEntry::Long(ConstantLong { bytes: 7 }))?;
        let next = pool.insert(ConstantEntry::Integer(ConstantInteger { bytes: 1 }))?;

        assert_eq!(long, 1);
        assert_eq!(next, 3);
        assert!(pool.get(2).is_err());
        assert_eq!(pool.iter().count(), 2);

        Ok(())
    }

    #[test]
    fn it_rejects_wrongly_typed_addresses() -> Result<()> {
        let (pool, class) = pool_with_class("a")?;
        let bogus: Addressed<ConstantUtf8> = pool.address(class);

        assert!(bogus.try_resolve(&pool).is_err());
        assert!(pool.get(0).is_err());
        assert!(pool.get(3).is_err());

        Ok(())
    }

    #[test]
    fn it_detects_dangling_references() -> Result<()> {
        let mut pool = ConstantPool::new();
        pool.insert(ConstantEntry::Class(ConstantClass {
            name: Addressed::from(9),
        }))?;

        assert!(pool.perform_format_checking().is_err());

        Ok(())
    }

    #[test]
    fn it_finds_existing_utf8_entries() -> Result<()> {
        let (pool, _) = pool_with_class("a/B")?;
        assert_eq!(pool.find_utf8("a/B"), Some(1));
        assert_eq!(pool.find_utf8("a/C"), None);

        Ok(())
    }
}
