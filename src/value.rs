//! Runtime values for the dynamic codec.

use std::collections::HashMap;

/// A single decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Double(f64),
    Int128([u8; 16]),
    Int256([u8; 32]),
    /// `bytes` and `string` (strings are UTF-8 by convention, not checked).
    Bytes(Vec<u8>),
    /// `#` field.
    Flags(u32),
    /// `Bool`, and `true` fields (the gating bit).
    Bool(bool),
    Vector(Vec<Value>),
    Object(Box<Object>),
    /// Conditional field whose bit is clear and that has no natural zero.
    Null,
}

/// A decoded (or to-be-built) combinator instance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Object {
    /// Qualified combinator name, e.g. `help.getConfig`.
    pub name: String,
    pub tag: Option<u32>,
    pub fields: Vec<(String, Value)>,
}

impl Object {
    pub fn new(name: impl Into<String>) -> Self {
        Object {
            name: name.into(),
            tag: None,
            fields: Vec::new(),
        }
    }

    /// Append a field (builder style).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl Value {
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(x) => Some(*x),
            Value::Flags(x) => Some(*x as i32),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Long(x) => Some(*x),
            Value::Int(x) => Some(*x as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<u32> {
        match self {
            Value::Flags(x) => Some(*x),
            Value::Int(x) => Some(*x as u32),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Bytes(v.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Value::Object(Box::new(v))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Vector(v)
    }
}

/// Named field values handed to the builder.
pub trait FieldValues {
    fn field(&self, name: &str) -> Option<&Value>;
}

impl FieldValues for HashMap<String, Value> {
    fn field(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl FieldValues for Object {
    fn field(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl FieldValues for [(String, Value)] {
    fn field(&self, name: &str) -> Option<&Value> {
        self.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}
