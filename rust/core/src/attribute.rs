// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded attribute values
//!
//! Owned counterpart of [`Token`]: strings are unescaped, typed values keep
//! their type name so measure types (`IFCMASSMEASURE`, `IFCLABEL`) can be told
//! apart by callers.

use crate::parser::Token;
use crate::schema::IfcType;
use crate::step_string::decode_step_string;

/// IFC entity attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Entity reference
    EntityRef(u32),
    /// String value (decoded)
    String(String),
    /// Integer value
    Integer(i64),
    /// Float value
    Float(f64),
    /// Enum value without the surrounding dots
    Enum(String),
    /// List of values
    List(Vec<AttributeValue>),
    /// Select value wrapped in its defined type, e.g. `IFCLABEL('x')`
    Typed {
        type_name: String,
        value: Box<AttributeValue>,
    },
    /// Null/undefined
    Null,
    /// Derived value (*)
    Derived,
}

impl AttributeValue {
    /// Convert from Token
    pub fn from_token(token: &Token) -> Self {
        match token {
            Token::EntityRef(id) => AttributeValue::EntityRef(*id),
            Token::String(s) => AttributeValue::String(decode_step_string(s).into_owned()),
            Token::Integer(i) => AttributeValue::Integer(*i),
            Token::Float(f) => AttributeValue::Float(*f),
            Token::Enum(e) => AttributeValue::Enum(e.to_string()),
            Token::List(items) => {
                AttributeValue::List(items.iter().map(Self::from_token).collect())
            }
            Token::TypedValue(type_name, args) => {
                let value = match args.as_slice() {
                    [single] => Self::from_token(single),
                    [] => AttributeValue::Null,
                    many => AttributeValue::List(many.iter().map(Self::from_token).collect()),
                };
                AttributeValue::Typed {
                    type_name: type_name.to_ascii_uppercase(),
                    value: Box::new(value),
                }
            }
            Token::Null => AttributeValue::Null,
            Token::Derived => AttributeValue::Derived,
        }
    }

    /// Strip any defined-type wrapper
    #[inline]
    pub fn inner(&self) -> &AttributeValue {
        match self {
            AttributeValue::Typed { value, .. } => value.inner(),
            other => other,
        }
    }

    /// Defined type name for typed values
    #[inline]
    pub fn type_name(&self) -> Option<&str> {
        match self {
            AttributeValue::Typed { type_name, .. } => Some(type_name),
            _ => None,
        }
    }

    /// Get as entity reference
    #[inline]
    pub fn as_entity_ref(&self) -> Option<u32> {
        match self.inner() {
            AttributeValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as string
    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match self.inner() {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as enum value
    #[inline]
    pub fn as_enum(&self) -> Option<&str> {
        match self.inner() {
            AttributeValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Get STEP logical `.T.` / `.F.`
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_enum()? {
            "T" | "TRUE" => Some(true),
            "F" | "FALSE" => Some(false),
            _ => None,
        }
    }

    /// Get as float
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self.inner() {
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as integer
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self.inner() {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as list
    #[inline]
    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self.inner() {
            AttributeValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Entity references in a list attribute; empty for null or non-lists
    pub fn entity_refs(&self) -> Vec<u32> {
        self.as_list()
            .map(|items| items.iter().filter_map(|v| v.as_entity_ref()).collect())
            .unwrap_or_default()
    }

    /// Check if null/derived
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self.inner(), AttributeValue::Null | AttributeValue::Derived)
    }
}

static NULL_VALUE: AttributeValue = AttributeValue::Null;

/// Decoded IFC entity with attributes
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEntity {
    pub id: u32,
    pub ifc_type: IfcType,
    pub attributes: Vec<AttributeValue>,
}

impl DecodedEntity {
    /// Create new decoded entity
    pub fn new(id: u32, ifc_type: IfcType, attributes: Vec<AttributeValue>) -> Self {
        Self {
            id,
            ifc_type,
            attributes,
        }
    }

    /// Get attribute by index
    pub fn get(&self, index: usize) -> Option<&AttributeValue> {
        self.attributes.get(index)
    }

    /// Attribute by index; records shorter than the index read as `$`
    pub fn get_or_null(&self, index: usize) -> &AttributeValue {
        self.attributes.get(index).unwrap_or(&NULL_VALUE)
    }

    /// Get entity reference attribute
    pub fn get_ref(&self, index: usize) -> Option<u32> {
        self.get(index).and_then(|v| v.as_entity_ref())
    }

    /// Get string attribute
    pub fn get_string(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(|v| v.as_string())
    }

    /// Get float attribute
    pub fn get_float(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(|v| v.as_float())
    }

    /// Get list attribute
    pub fn get_list(&self, index: usize) -> Option<&[AttributeValue]> {
        self.get(index).and_then(|v| v.as_list())
    }

    /// Entity references from a list attribute
    pub fn get_refs(&self, index: usize) -> Vec<u32> {
        self.get(index).map(|v| v.entity_refs()).unwrap_or_default()
    }
}
