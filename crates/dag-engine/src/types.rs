//! Data types and runtime values flowing between modules
//!
//! `CType` is the closed set of types a data node can carry and `CValue`
//! is a runtime value of one of those types. Composite values record
//! their element types next to the elements; the constructors check
//! that every element agrees with the recorded type, so `c_type()` of a
//! value is always consistent with what is stored on it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The type of a data node or module parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "tag")]
pub enum CType {
    #[serde(rename = "CString")]
    String,
    #[serde(rename = "CInt")]
    Integer,
    #[serde(rename = "CFloat")]
    Float,
    #[serde(rename = "CBoolean")]
    Boolean,
    #[serde(rename = "CList", rename_all = "camelCase")]
    List { values_type: Box<CType> },
    #[serde(rename = "CMap", rename_all = "camelCase")]
    Map {
        keys_type: Box<CType>,
        values_type: Box<CType>,
    },
}

impl CType {
    /// `list<values_type>`
    pub fn list(values_type: CType) -> Self {
        Self::List {
            values_type: Box::new(values_type),
        }
    }

    /// `map<keys_type, values_type>`
    pub fn map(keys_type: CType, values_type: CType) -> Self {
        Self::Map {
            keys_type: Box::new(keys_type),
            values_type: Box::new(values_type),
        }
    }

    /// The value a fresh runner form starts with for this type
    pub fn default_value(&self) -> CValue {
        match self {
            Self::String => CValue::string(""),
            Self::Integer => CValue::integer(0),
            Self::Float => CValue::float(0.0),
            Self::Boolean => CValue::boolean(false),
            Self::List { values_type } => CValue::List(CList::empty(values_type.as_ref().clone())),
            Self::Map {
                keys_type,
                values_type,
            } => CValue::Map(CMap::empty(
                keys_type.as_ref().clone(),
                values_type.as_ref().clone(),
            )),
        }
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Boolean => write!(f, "boolean"),
            Self::List { values_type } => write!(f, "list<{}>", values_type),
            Self::Map {
                keys_type,
                values_type,
            } => write!(f, "map<{}, {}>", keys_type, values_type),
        }
    }
}

/// A runtime value; always carries enough information to recover its type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag")]
pub enum CValue {
    #[serde(rename = "CString")]
    String { value: String },
    #[serde(rename = "CInt")]
    Integer { value: i64 },
    #[serde(rename = "CFloat")]
    Float { value: f64 },
    #[serde(rename = "CBoolean")]
    Boolean { value: bool },
    #[serde(rename = "CList")]
    List(CList),
    #[serde(rename = "CMap")]
    Map(CMap),
}

impl CValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self::String {
            value: value.into(),
        }
    }

    pub fn integer(value: i64) -> Self {
        Self::Integer { value }
    }

    pub fn float(value: f64) -> Self {
        Self::Float { value }
    }

    pub fn boolean(value: bool) -> Self {
        Self::Boolean { value }
    }

    /// Build a list, taking the element type from the first element
    ///
    /// Fails on an empty vector; use [`CValue::list_of`] when the element
    /// type is known up front.
    pub fn list(values: Vec<CValue>) -> Result<Self, TypeError> {
        CList::new(values).map(Self::List)
    }

    /// Build a list with an explicit element type (may be empty)
    pub fn list_of(values: Vec<CValue>, values_type: CType) -> Result<Self, TypeError> {
        CList::of(values, values_type).map(Self::List)
    }

    /// Build a map, taking key and value types from the first entry
    pub fn map(entries: Vec<(CValue, CValue)>) -> Result<Self, TypeError> {
        CMap::new(entries).map(Self::Map)
    }

    /// Build a map with explicit key and value types (may be empty)
    pub fn map_of(
        entries: Vec<(CValue, CValue)>,
        keys_type: CType,
        values_type: CType,
    ) -> Result<Self, TypeError> {
        CMap::of(entries, keys_type, values_type).map(Self::Map)
    }

    /// The type of this value
    pub fn c_type(&self) -> CType {
        match self {
            Self::String { .. } => CType::String,
            Self::Integer { .. } => CType::Integer,
            Self::Float { .. } => CType::Float,
            Self::Boolean { .. } => CType::Boolean,
            Self::List(list) => CType::list(list.values_type.clone()),
            Self::Map(map) => CType::map(map.keys_type.clone(), map.values_type.clone()),
        }
    }

    /// Parse the raw form a user typed into a value of `ty`
    ///
    /// Lists are comma separated, each element trimmed and parsed with the
    /// element type. Maps have no raw form.
    pub fn parse(ty: &CType, raw: &str) -> Result<Self, TypeError> {
        let invalid = || TypeError::InvalidLiteral {
            ty: ty.clone(),
            raw: raw.to_string(),
        };
        match ty {
            CType::String => Ok(Self::string(raw)),
            CType::Integer => raw.trim().parse().map(Self::integer).map_err(|_| invalid()),
            CType::Float => raw.trim().parse().map(Self::float).map_err(|_| invalid()),
            CType::Boolean => Ok(Self::boolean(raw.trim() == "true")),
            CType::List { values_type } => {
                let values = raw
                    .split(',')
                    .map(|part| Self::parse(values_type, part.trim()))
                    .collect::<Result<Vec<_>, _>>()?;
                Self::list_of(values, values_type.as_ref().clone())
            }
            CType::Map { .. } => Err(TypeError::UnsupportedType(ty.clone())),
        }
    }

    /// The raw form accepted back by [`CValue::parse`]
    pub fn to_raw_string(&self) -> Result<String, TypeError> {
        match self {
            Self::String { value } => Ok(value.clone()),
            Self::Integer { value } => Ok(value.to_string()),
            Self::Float { value } => Ok(value.to_string()),
            Self::Boolean { value } => Ok(value.to_string()),
            Self::List(list) => {
                let parts = list
                    .values
                    .iter()
                    .map(CValue::to_raw_string)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(parts.join(", "))
            }
            Self::Map(_) => Err(TypeError::UnsupportedType(self.c_type())),
        }
    }

    /// Flatten to native JSON for display
    ///
    /// Maps keyed by strings become objects. Other maps also become objects,
    /// keyed by the JSON text of the key. The result is not meant to be read
    /// back.
    pub fn to_plain_json(&self) -> serde_json::Value {
        match self {
            Self::String { value } => serde_json::Value::from(value.as_str()),
            Self::Integer { value } => serde_json::Value::from(*value),
            Self::Float { value } => serde_json::Value::from(*value),
            Self::Boolean { value } => serde_json::Value::from(*value),
            Self::List(list) => {
                serde_json::Value::Array(list.values.iter().map(CValue::to_plain_json).collect())
            }
            Self::Map(map) => {
                let object = map
                    .entries
                    .iter()
                    .map(|(key, value)| {
                        let key = match key {
                            CValue::String { value } => value.clone(),
                            other => other.to_plain_json().to_string(),
                        };
                        (key, value.to_plain_json())
                    })
                    .collect();
                serde_json::Value::Object(object)
            }
        }
    }
}

impl fmt::Display for CValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String { value } => write!(f, "\"{}\"", value),
            Self::Integer { value } => write!(f, "{}", value),
            Self::Float { value } => write!(f, "{}", value),
            Self::Boolean { value } => write!(f, "{}", value),
            Self::List(list) => {
                write!(f, "[")?;
                for (i, value) in list.values.iter().enumerate() {
                    if i > 0 {
                        writeln!(f, ",")?;
                    }
                    write!(f, "  {}", value)?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                for (i, (key, value)) in map.entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                Ok(())
            }
        }
    }
}

fn check_element(expected: &CType, value: &CValue) -> Result<(), TypeError> {
    let found = value.c_type();
    if &found == expected {
        Ok(())
    } else {
        Err(TypeError::ElementTypeMismatch {
            expected: expected.clone(),
            found,
        })
    }
}

/// A homogeneous list value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawList", rename_all = "camelCase")]
pub struct CList {
    #[serde(rename = "value")]
    values: Vec<CValue>,
    values_type: CType,
}

impl CList {
    /// Build from non-empty values, inferring the element type
    pub fn new(values: Vec<CValue>) -> Result<Self, TypeError> {
        let head = values
            .first()
            .ok_or(TypeError::EmptyCollection { kind: "CList" })?;
        let values_type = head.c_type();
        Self::of(values, values_type)
    }

    /// Build with an explicit element type
    pub fn of(values: Vec<CValue>, values_type: CType) -> Result<Self, TypeError> {
        for value in &values {
            check_element(&values_type, value)?;
        }
        Ok(Self {
            values,
            values_type,
        })
    }

    /// A typed empty list
    pub fn empty(values_type: CType) -> Self {
        Self {
            values: Vec::new(),
            values_type,
        }
    }

    pub fn values(&self) -> &[CValue] {
        &self.values
    }

    pub fn values_type(&self) -> &CType {
        &self.values_type
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawList {
    value: Vec<CValue>,
    values_type: CType,
}

impl TryFrom<RawList> for CList {
    type Error = TypeError;

    fn try_from(raw: RawList) -> Result<Self, Self::Error> {
        Self::of(raw.value, raw.values_type)
    }
}

/// A homogeneous association list value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMap", rename_all = "camelCase")]
pub struct CMap {
    #[serde(rename = "value")]
    entries: Vec<(CValue, CValue)>,
    keys_type: CType,
    values_type: CType,
}

impl CMap {
    /// Build from non-empty entries, inferring key and value types
    pub fn new(entries: Vec<(CValue, CValue)>) -> Result<Self, TypeError> {
        let (key, value) = entries
            .first()
            .ok_or(TypeError::EmptyCollection { kind: "CMap" })?;
        let keys_type = key.c_type();
        let values_type = value.c_type();
        Self::of(entries, keys_type, values_type)
    }

    /// Build with explicit key and value types
    pub fn of(
        entries: Vec<(CValue, CValue)>,
        keys_type: CType,
        values_type: CType,
    ) -> Result<Self, TypeError> {
        for (key, value) in &entries {
            check_element(&keys_type, key)?;
            check_element(&values_type, value)?;
        }
        Ok(Self {
            entries,
            keys_type,
            values_type,
        })
    }

    /// A typed empty map
    pub fn empty(keys_type: CType, values_type: CType) -> Self {
        Self {
            entries: Vec::new(),
            keys_type,
            values_type,
        }
    }

    pub fn entries(&self) -> &[(CValue, CValue)] {
        &self.entries
    }

    pub fn keys_type(&self) -> &CType {
        &self.keys_type
    }

    pub fn values_type(&self) -> &CType {
        &self.values_type
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMap {
    value: Vec<(CValue, CValue)>,
    keys_type: CType,
    values_type: CType,
}

impl TryFrom<RawMap> for CMap {
    type Error = TypeError;

    fn try_from(raw: RawMap) -> Result<Self, Self::Error> {
        Self::of(raw.value, raw.keys_type, raw.values_type)
    }
}
