use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// One argument value as carried by the host codec.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ArgValue {
    fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Null => "null",
            ArgValue::Bool(_) => "bool",
            ArgValue::Int(_) => "int",
            ArgValue::Float(_) => "float",
            ArgValue::Str(_) => "string",
        }
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        ArgValue::Int(i64::from(value))
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Str(value)
    }
}

/// Named arguments of a method call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(BTreeMap<String, ArgValue>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse arguments from a JSON object; `null` yields an empty set.
    pub fn from_json(value: serde_json::Value) -> Result<Self, BridgeError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(|err| BridgeError::InvalidArgument {
            name: "arguments".into(),
            reason: err.to_string(),
        })
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ArgValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// True when the key is present, even if its value is null.
    pub fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn opt_str(&self, name: &str) -> Result<Option<String>, BridgeError> {
        match self.0.get(name) {
            None | Some(ArgValue::Null) => Ok(None),
            Some(ArgValue::Str(value)) => Ok(Some(value.clone())),
            Some(other) => Err(mismatch(name, "string", other)),
        }
    }

    pub fn require_str(&self, name: &str) -> Result<String, BridgeError> {
        self.opt_str(name)?
            .ok_or_else(|| BridgeError::MissingArgument(name.to_string()))
    }

    pub fn opt_i64(&self, name: &str) -> Result<Option<i64>, BridgeError> {
        match self.0.get(name) {
            None | Some(ArgValue::Null) => Ok(None),
            Some(ArgValue::Int(value)) => Ok(Some(*value)),
            Some(other) => Err(mismatch(name, "int", other)),
        }
    }

    pub fn opt_i32(&self, name: &str) -> Result<Option<i32>, BridgeError> {
        self.opt_i64(name)?
            .map(|value| {
                i32::try_from(value).map_err(|_| BridgeError::InvalidArgument {
                    name: name.to_string(),
                    reason: format!("{value} does not fit in 32 bits"),
                })
            })
            .transpose()
    }

    pub fn require_i32(&self, name: &str) -> Result<i32, BridgeError> {
        self.opt_i32(name)?
            .ok_or_else(|| BridgeError::MissingArgument(name.to_string()))
    }

    pub fn opt_bool(&self, name: &str) -> Result<Option<bool>, BridgeError> {
        match self.0.get(name) {
            None | Some(ArgValue::Null) => Ok(None),
            Some(ArgValue::Bool(value)) => Ok(Some(*value)),
            Some(other) => Err(mismatch(name, "bool", other)),
        }
    }
}

fn mismatch(name: &str, expected: &str, found: &ArgValue) -> BridgeError {
    BridgeError::InvalidArgument {
        name: name.to_string(),
        reason: format!("expected {expected}, found {}", found.type_name()),
    }
}

/// A named action request arriving from the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Arguments,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: Arguments::default(),
        }
    }

    pub fn with_arguments(method: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.arguments.insert(name, value);
        self
    }
}
