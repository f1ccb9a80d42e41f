//! Provider schema documents and type expressions.
//!
//! Schemas arrive as the JSON produced by `terraform providers schema -json`.
//! Type expressions and nesting modes are kept in their raw form and parsed
//! when a value is diffed against them, so that a mismatch is reported for
//! the resource that hit it.

use crate::error::{DiffError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

/// The schemas of every provider used by a plan.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSchemas {
    #[serde(default)]
    pub format_version: String,
    #[serde(default)]
    pub provider_schemas: BTreeMap<String, ProviderSchema>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSchema {
    #[serde(default)]
    pub provider: Option<Schema>,
    #[serde(default)]
    pub resource_schemas: BTreeMap<String, Schema>,
    #[serde(default)]
    pub data_source_schemas: BTreeMap<String, Schema>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub block: Block,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
    #[serde(default)]
    pub block_types: BTreeMap<String, BlockType>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Attribute {
    /// Raw type expression, absent when `nested_type` is set.
    #[serde(default, rename = "type")]
    pub attribute_type: Option<serde_json::Value>,
    #[serde(default)]
    pub nested_type: Option<NestedType>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub deprecated: bool,
}

impl Attribute {
    /// Parses the attribute's type expression. A missing expression is
    /// treated as dynamic.
    pub fn cty_type(&self) -> Result<Type> {
        match &self.attribute_type {
            Some(expression) => Type::parse(expression),
            None => Ok(Type::Dynamic),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NestedType {
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
    #[serde(default)]
    pub nesting_mode: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockType {
    #[serde(default)]
    pub nesting_mode: String,
    #[serde(default)]
    pub block: Block,
    #[serde(default)]
    pub min_items: u64,
    #[serde(default)]
    pub max_items: u64,
}

/// How a nested attribute or block type repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingMode {
    Single,
    Group,
    List,
    Set,
    Map,
}

impl NestingMode {
    pub fn parse(mode: &str) -> Result<Self> {
        match mode {
            "single" => Ok(NestingMode::Single),
            "group" => Ok(NestingMode::Group),
            "list" => Ok(NestingMode::List),
            "set" => Ok(NestingMode::Set),
            "map" => Ok(NestingMode::Map),
            other => Err(DiffError::unknown_nesting_mode(other)),
        }
    }
}

/// A value type from a provider schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// No type information at all.
    Nil,
    /// The `dynamic` pseudo-type: any value, shape decided at runtime.
    Dynamic,
    String,
    Number,
    Bool,
    List(Box<Type>),
    Set(Box<Type>),
    Map(Box<Type>),
    Object(BTreeMap<String, Type>),
    Tuple(Vec<Type>),
}

impl Type {
    /// Parses a JSON type expression such as `"string"` or
    /// `["map", ["list", "number"]]`.
    pub fn parse(expression: &serde_json::Value) -> Result<Self> {
        use serde_json::Value as J;

        let unknown = || DiffError::unknown_type(expression.to_string());

        match expression {
            J::String(name) => match name.as_str() {
                "string" => Ok(Type::String),
                "number" => Ok(Type::Number),
                "bool" => Ok(Type::Bool),
                "dynamic" => Ok(Type::Dynamic),
                _ => Err(unknown()),
            },
            J::Array(parts) => {
                let kind = parts.first().and_then(J::as_str).ok_or_else(unknown)?;
                let argument = parts.get(1).ok_or_else(unknown)?;
                match kind {
                    "list" => Ok(Type::List(Box::new(Type::parse(argument)?))),
                    "set" => Ok(Type::Set(Box::new(Type::parse(argument)?))),
                    "map" => Ok(Type::Map(Box::new(Type::parse(argument)?))),
                    "object" => {
                        let fields = argument.as_object().ok_or_else(unknown)?;
                        let mut attributes = BTreeMap::new();
                        for (name, field) in fields {
                            attributes.insert(name.clone(), Type::parse(field)?);
                        }
                        Ok(Type::Object(attributes))
                    }
                    "tuple" => {
                        let elements = argument.as_array().ok_or_else(unknown)?;
                        Ok(Type::Tuple(
                            elements.iter().map(Type::parse).collect::<Result<_>>()?,
                        ))
                    }
                    _ => Err(unknown()),
                }
            }
            _ => Err(unknown()),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::String | Type::Number | Type::Bool)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Type::Object(_))
    }

    pub fn friendly_name(&self) -> String {
        match self {
            Type::Nil => "nil".to_string(),
            Type::Dynamic => "dynamic".to_string(),
            Type::String => "string".to_string(),
            Type::Number => "number".to_string(),
            Type::Bool => "bool".to_string(),
            Type::List(element) => format!("list of {}", element.friendly_name()),
            Type::Set(element) => format!("set of {}", element.friendly_name()),
            Type::Map(element) => format!("map of {}", element.friendly_name()),
            Type::Object(_) => "object".to_string(),
            Type::Tuple(_) => "tuple".to_string(),
        }
    }
}

/// Whether a resource is managed or a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceMode {
    Managed,
    Data,
}

impl ResourceMode {
    pub fn parse(mode: &str) -> Result<Self> {
        match mode {
            "managed" => Ok(ResourceMode::Managed),
            "data" => Ok(ResourceMode::Data),
            other => Err(DiffError::UnsupportedMode {
                mode: other.to_string(),
            }),
        }
    }

    /// The HCL keyword that declares a resource of this mode.
    pub fn keyword(&self) -> &'static str {
        match self {
            ResourceMode::Managed => "resource",
            ResourceMode::Data => "data",
        }
    }
}

impl ProviderSchemas {
    /// Finds the schema for a resource type.
    pub fn schema_for(&self, provider: &str, mode: &str, resource_type: &str) -> Result<&Schema> {
        let mode = ResourceMode::parse(mode)?;
        let missing = || DiffError::MissingSchema {
            provider: provider.to_string(),
            mode: mode.keyword().to_string(),
            resource_type: resource_type.to_string(),
        };

        let provider_schema = self.provider_schemas.get(provider).ok_or_else(missing)?;
        let schemas = match mode {
            ResourceMode::Managed => &provider_schema.resource_schemas,
            ResourceMode::Data => &provider_schema.data_source_schemas,
        };
        schemas.get(resource_type).ok_or_else(missing)
    }
}
