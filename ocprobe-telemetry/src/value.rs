//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

// Telemetry leaf value.
//
// Every kind of scalar a device can report is represented by one variant;
// consumers match on it instead of probing the dynamic type of the payload.
#[derive(Clone, Debug, EnumAsInner, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Value {
    String(String),
    // YANG enumeration or identity name, possibly module-qualified.
    Enum(String),
    Uint(u64),
    Int(i64),
    Bool(bool),
    Float(f64),
    LeafList(Vec<Value>),
}

// Typed decoding of a telemetry value.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, ValueError>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct ValueError {
    pub expected: String,
    pub got: String,
}

// ===== impl Value =====

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(..) => "string",
            Value::Enum(..) => "enum",
            Value::Uint(..) => "uint",
            Value::Int(..) => "int",
            Value::Bool(..) => "bool",
            Value::Float(..) => "float",
            Value::LeafList(..) => "leaf-list",
        }
    }

    // Builds an identity value qualified with its defining module.
    pub fn identity(module: &str, name: &str) -> Value {
        Value::Enum(format!("{module}:{name}"))
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) | Value::Enum(s) => write!(f, "{s}"),
            Value::Uint(n) => write!(f, "{n}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::LeafList(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Value {
        Value::Float(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Int(n)
    }
}

macro_rules! uint_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Value {
                    Value::Uint(n as u64)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self, ValueError> {
                    match value {
                        Value::Uint(n) => <$ty>::try_from(*n).map_err(|_| {
                            ValueError::new(stringify!($ty), value)
                        }),
                        _ => Err(ValueError::new(stringify!($ty), value)),
                    }
                }
            }
        )*
    };
}

uint_value!(u8, u16, u32, u64);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Value {
        Value::LeafList(values.into_iter().map(Into::into).collect())
    }
}

// ===== impl FromValue =====

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        Ok(value.clone())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::String(s) | Value::Enum(s) => Ok(s.clone()),
            _ => Err(ValueError::new("string", value)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        value
            .as_bool()
            .copied()
            .ok_or_else(|| ValueError::new("bool", value))
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Int(n) => Ok(*n),
            Value::Uint(n) => {
                i64::try_from(*n).map_err(|_| ValueError::new("int", value))
            }
            _ => Err(ValueError::new("int", value)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(n) => Ok(*n),
            Value::Uint(n) => Ok(*n as f64),
            Value::Int(n) => Ok(*n as f64),
            _ => Err(ValueError::new("float", value)),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::LeafList(values) => {
                values.iter().map(T::from_value).collect()
            }
            _ => Err(ValueError::new("leaf-list", value)),
        }
    }
}

// ===== impl ValueError =====

impl ValueError {
    pub fn new(expected: impl Into<String>, got: &Value) -> ValueError {
        ValueError {
            expected: expected.into(),
            got: format!("{} {}", got.kind(), got),
        }
    }
}

impl std::fmt::Display for ValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "expected {}, got {}", self.expected, self.got)
    }
}

impl std::error::Error for ValueError {}

// ===== unit tests =====
