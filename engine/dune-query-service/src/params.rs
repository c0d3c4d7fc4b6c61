//! Typed query parameters and their Dune wire encoding
//!
//! A [`Parameter`] is one of four closed variants (text, number, date, enum). Each
//! variant renders itself into a [`WireParam`], the `{key, value, type}` object the
//! Dune API expects. Values are never parsed or validated locally: whatever the caller
//! configured is passed through and any error surfaces from the remote execution.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{DuneQueryError, Result};

/// Timestamp layout Dune expects for datetime parameters
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parameter kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Text,
    Number,
    Date,
    Enum,
}

impl ParameterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKind::Text => "text",
            ParameterKind::Number => "number",
            ParameterKind::Date => "date",
            ParameterKind::Enum => "enum",
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterKind {
    type Err = DuneQueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(ParameterKind::Text),
            "number" => Ok(ParameterKind::Number),
            "date" => Ok(ParameterKind::Date),
            "enum" => Ok(ParameterKind::Enum),
            other => Err(DuneQueryError::invalid_argument(format!(
                "Unknown param_type: {}",
                other
            ))),
        }
    }
}

/// Untyped value handed to the factory
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl ParamValue {
    fn into_text(self) -> String {
        match self {
            ParamValue::Text(s) => s,
            ParamValue::Integer(i) => i.to_string(),
            ParamValue::Float(f) => f.to_string(),
            ParamValue::Timestamp(ts) => ts.format(DATE_FORMAT).to_string(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<NaiveDateTime> for ParamValue {
    fn from(value: NaiveDateTime) -> Self {
        ParamValue::Timestamp(value)
    }
}

/// Numeric parameter value; `Raw` holds text that was configured under the number kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberValue {
    Integer(i64),
    Float(f64),
    Raw(String),
}

impl fmt::Display for NumberValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberValue::Integer(i) => write!(f, "{}", i),
            NumberValue::Float(v) => write!(f, "{}", v),
            NumberValue::Raw(s) => f.write_str(s),
        }
    }
}

/// Date parameter value; `Raw` strings are sent as configured.
///
/// `Raw` comes first so strings read from data are kept verbatim and never parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Raw(String),
    Timestamp(NaiveDateTime),
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::Timestamp(ts) => write!(f, "{}", ts.format(DATE_FORMAT)),
            DateValue::Raw(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextParam {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberParam {
    pub name: String,
    pub value: NumberValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateParam {
    pub name: String,
    pub value: DateValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumParam {
    pub name: String,
    pub value: String,
}

/// A typed query parameter, tagged by `kind` when serialized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Parameter {
    Text(TextParam),
    Number(NumberParam),
    Date(DateParam),
    Enum(EnumParam),
}

impl Parameter {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Parameter::Text(TextParam {
            name: name.into(),
            value: value.into(),
        })
    }

    pub fn number(name: impl Into<String>, value: NumberValue) -> Self {
        Parameter::Number(NumberParam {
            name: name.into(),
            value,
        })
    }

    pub fn date(name: impl Into<String>, value: DateValue) -> Self {
        Parameter::Date(DateParam {
            name: name.into(),
            value,
        })
    }

    pub fn enumeration(name: impl Into<String>, value: impl Into<String>) -> Self {
        Parameter::Enum(EnumParam {
            name: name.into(),
            value: value.into(),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Parameter::Text(p) => &p.name,
            Parameter::Number(p) => &p.name,
            Parameter::Date(p) => &p.name,
            Parameter::Enum(p) => &p.name,
        }
    }

    pub fn kind(&self) -> ParameterKind {
        match self {
            Parameter::Text(_) => ParameterKind::Text,
            Parameter::Number(_) => ParameterKind::Number,
            Parameter::Date(_) => ParameterKind::Date,
            Parameter::Enum(_) => ParameterKind::Enum,
        }
    }

    /// Render into the parameter object sent to the Dune API
    pub fn to_wire_parameter(&self) -> WireParam {
        let value = match self {
            Parameter::Text(p) => p.value.clone(),
            Parameter::Number(p) => p.value.to_string(),
            Parameter::Date(p) => p.value.to_string(),
            Parameter::Enum(p) => p.value.clone(),
        };

        WireParam {
            key: self.name().to_string(),
            value,
            kind: self.kind().into(),
        }
    }
}

/// Parameter type names used on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireParamType {
    Text,
    Number,
    #[serde(rename = "datetime")]
    Date,
    Enum,
}

impl From<ParameterKind> for WireParamType {
    fn from(kind: ParameterKind) -> Self {
        match kind {
            ParameterKind::Text => WireParamType::Text,
            ParameterKind::Number => WireParamType::Number,
            ParameterKind::Date => WireParamType::Date,
            ParameterKind::Enum => WireParamType::Enum,
        }
    }
}

impl From<WireParamType> for ParameterKind {
    fn from(kind: WireParamType) -> Self {
        match kind {
            WireParamType::Text => ParameterKind::Text,
            WireParamType::Number => ParameterKind::Number,
            WireParamType::Date => ParameterKind::Date,
            WireParamType::Enum => ParameterKind::Enum,
        }
    }
}

/// Dune API parameter object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireParam {
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: WireParamType,
}

/// Builds parameters from untyped `(name, value, kind)` triples
pub struct ParameterFactory;

impl ParameterFactory {
    /// Construct the variant matching `kind`; the value is stored without parsing
    pub fn create(
        name: impl Into<String>,
        value: impl Into<ParamValue>,
        kind: &str,
    ) -> Result<Parameter> {
        let kind: ParameterKind = kind.parse()?;
        Ok(Self::create_with_kind(name, value, kind))
    }

    pub fn create_with_kind(
        name: impl Into<String>,
        value: impl Into<ParamValue>,
        kind: ParameterKind,
    ) -> Parameter {
        let name = name.into();
        let value = value.into();

        match kind {
            ParameterKind::Text => Parameter::text(name, value.into_text()),
            ParameterKind::Number => {
                let value = match value {
                    ParamValue::Integer(i) => NumberValue::Integer(i),
                    ParamValue::Float(f) => NumberValue::Float(f),
                    other => NumberValue::Raw(other.into_text()),
                };
                Parameter::number(name, value)
            }
            ParameterKind::Date => {
                let value = match value {
                    ParamValue::Timestamp(ts) => DateValue::Timestamp(ts),
                    other => DateValue::Raw(other.into_text()),
                };
                Parameter::date(name, value)
            }
            ParameterKind::Enum => Parameter::enumeration(name, value.into_text()),
        }
    }
}
