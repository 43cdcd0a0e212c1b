use std::{fmt, iter::Peekable, str::Chars};

use anyhow::{anyhow, Result};
use enum_as_inner::EnumAsInner;

/// <BaseType> ::= 'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z'
#[derive(EnumAsInner, Debug, PartialEq, Eq, Clone)]
pub enum BaseType {
    Boolean, // Z
    Char,    // C
    Float,   // F
    Double,  // D
    Byte,    // B
    Short,   // S
    Int,     // I
    Long,    // J
    Void,    // V
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BaseType::Boolean => "Z",
            BaseType::Char => "C",
            BaseType::Float => "F",
            BaseType::Double => "D",
            BaseType::Byte => "B",
            BaseType::Short => "S",
            BaseType::Int => "I",
            BaseType::Long => "J",
            BaseType::Void => "V",
        })
    }
}

/// <ObjectType> ::= 'L' <ClassName> ';'
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ObjectType {
    pub class_name: String,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{};", self.class_name)
    }
}

/// <ArrayType> ::= '[' <FieldType>
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ArrayType {
    pub field_type: Box<FieldType>,
}

impl fmt::Display for ArrayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.field_type)
    }
}

#[derive(EnumAsInner, Debug, PartialEq, Eq, Clone)]
pub enum FieldType {
    Base(BaseType),
    Object(ObjectType),
    Array(ArrayType),
}

/// <MethodType> ::= '(' { <FieldType> } ')' <FieldType>
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MethodType {
    pub parameters: Vec<FieldType>,
    pub return_type: FieldType,
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for parameter in &self.parameters {
            write!(f, "{}", parameter)?;
        }
        write!(f, "){}", self.return_type)
    }
}

impl MethodType {
    pub fn parse(str: &str) -> Result<Self> {
        let mut chars = str.chars().peekable();
        if chars.next() != Some('(') {
            return Err(anyhow!("descriptor {:?} did not start with (", str));
        }

        let mut parameters = Vec::new();

        loop {
            match chars.peek() {
                Some(')') => break,
                Some(_) => parameters.push(FieldType::parse_from_iterator(&mut chars)?),
                None => return Err(anyhow!("descriptor {:?} has no closing )", str)),
            }
        }

        // Skip )
        chars.next();

        let return_type = FieldType::parse_from_iterator(&mut chars)?;
        if chars.next().is_some() {
            return Err(anyhow!("descriptor {:?} has trailing characters", str));
        }

        Ok(MethodType {
            parameters,
            return_type,
        })
    }

    /// Rewrite every class name mentioned by this descriptor.
    pub fn remap(&self, map: &impl Fn(&str) -> Option<String>) -> Self {
        MethodType {
            parameters: self.parameters.iter().map(|p| p.remap(map)).collect(),
            return_type: self.return_type.remap(map),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Base(base) => base.fmt(f),
            FieldType::Object(object) => object.fmt(f),
            FieldType::Array(array) => array.fmt(f),
        }
    }
}

impl FieldType {
    fn parse_from_iterator(chars: &mut Peekable<Chars>) -> Result<Self> {
        let first = chars.next().ok_or(anyhow!("no more chars"))?;

        Ok(match first {
            'B' => FieldType::Base(BaseType::Byte),
            'C' => FieldType::Base(BaseType::Char),
            'D' => FieldType::Base(BaseType::Double),
            'F' => FieldType::Base(BaseType::Float),
            'I' => FieldType::Base(BaseType::Int),
            'J' => FieldType::Base(BaseType::Long),
            'S' => FieldType::Base(BaseType::Short),
            'Z' => FieldType::Base(BaseType::Boolean),
            'V' => FieldType::Base(BaseType::Void),
            '[' => FieldType::Array(ArrayType {
                field_type: Box::new(FieldType::parse_from_iterator(chars)?),
            }),
            'L' => {
                let mut class_name = String::new();
                loop {
                    match chars.next() {
                        Some(';') => break,
                        Some(c) => class_name.push(c),
                        None => return Err(anyhow!("class name {:?} is missing a ;", class_name)),
                    }
                }

                if class_name.is_empty() {
                    return Err(anyhow!("empty class name in descriptor"));
                }

                FieldType::Object(ObjectType { class_name })
            }
            _ => return Err(anyhow!("unknown type {first}")),
        })
    }

    pub fn parse(str: &str) -> Result<Self> {
        let mut chars = str.chars().peekable();
        let field_type = FieldType::parse_from_iterator(&mut chars)?;
        if chars.next().is_some() {
            return Err(anyhow!("descriptor {:?} has trailing characters", str));
        }

        Ok(field_type)
    }

    /// Rewrite every class name mentioned by this type.
    pub fn remap(&self, map: &impl Fn(&str) -> Option<String>) -> Self {
        match self {
            FieldType::Base(_) => self.clone(),
            FieldType::Object(object) => FieldType::Object(ObjectType {
                class_name: map(&object.class_name).unwrap_or_else(|| object.class_name.clone()),
            }),
            FieldType::Array(array) => FieldType::Array(ArrayType {
                field_type: Box::new(array.field_type.remap(map)),
            }),
        }
    }
}

/// Remap the class names inside a field or method descriptor.
/// `map` returns `None` for classes that keep their name.
pub fn remap_descriptor(descriptor: &str, map: &impl Fn(&str) -> Option<String>) -> Result<String> {
    if descriptor.starts_with('(') {
        Ok(MethodType::parse(descriptor)?.remap(map).to_string())
    } else {
        Ok(FieldType::parse(descriptor)?.remap(map).to_string())
    }
}
