//! Schema types and builders for tfplug
//!
//! Providers describe their configuration, resources and data sources with a
//! [`Schema`]. Nested objects are expressed through [`AttributeType::Object`]
//! and [`AttributeType::List`].

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::BTreeMap;

/// AttributeType mirrors Terraform's type system
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    /// Ordered, allows duplicates
    List(Box<AttributeType>),
    /// String keys only
    Map(Box<AttributeType>),
    /// Fixed structure
    Object(BTreeMap<String, AttributeType>),
}

impl AttributeType {
    /// Shorthand for an object type built from `(name, type)` pairs
    pub fn object<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, AttributeType)>,
        S: Into<String>,
    {
        AttributeType::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list(element: AttributeType) -> Self {
        AttributeType::List(Box::new(element))
    }

    /// Whether `value` conforms to this type. Null and unknown conform to
    /// every type; object values may omit attributes (they read as null).
    pub fn accepts(&self, value: &Dynamic) -> bool {
        match (self, value) {
            (_, Dynamic::Null) | (_, Dynamic::Unknown) => true,
            (AttributeType::String, Dynamic::String(_)) => true,
            (AttributeType::Number, Dynamic::Number(_)) => true,
            (AttributeType::Bool, Dynamic::Bool(_)) => true,
            (AttributeType::List(element), Dynamic::List(items)) => {
                items.iter().all(|item| element.accepts(item))
            }
            (AttributeType::Map(element), Dynamic::Map(values)) => {
                values.values().all(|v| element.accepts(v))
            }
            (AttributeType::Object(fields), Dynamic::Map(values)) => {
                values.iter().all(|(name, v)| {
                    fields
                        .get(name)
                        .map(|field| field.accepts(v))
                        .unwrap_or(false)
                })
            }
            _ => false,
        }
    }
}

/// Schema is returned by providers, resources and data sources.
/// Version is used for state migration.
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub description: String,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Structural validation of a config against this schema: required
    /// attributes must be present and every value must match its type.
    pub fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        let values = match &config.value {
            Dynamic::Map(values) => values,
            Dynamic::Null | Dynamic::Unknown => return diagnostics,
            _ => {
                diagnostics.push(Diagnostic::error(
                    "Invalid configuration",
                    "Configuration must be an object",
                ));
                return diagnostics;
            }
        };

        for attr in &self.attributes {
            let value = values.get(&attr.name).unwrap_or(&Dynamic::Null);
            if attr.required && value.is_null() {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Missing required attribute: {}", attr.name),
                        format!("The attribute '{}' is required", attr.name),
                    )
                    .with_attribute(AttributePath::new(&attr.name)),
                );
            } else if !attr.r#type.accepts(value) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Type mismatch for attribute: {}", attr.name),
                        format!("Attribute '{}' expects {:?}", attr.name, attr.r#type),
                    )
                    .with_attribute(AttributePath::new(&attr.name)),
                );
            }
        }

        for name in values.keys() {
            if self.attribute(name).is_none() {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Unsupported attribute: {}", name),
                        format!("The attribute '{}' is not defined in the schema", name),
                    )
                    .with_attribute(AttributePath::new(name)),
                );
            }
        }

        diagnostics
    }
}

/// Attribute represents a single configuration attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
}

/// AttributeBuilder provides a fluent API for building attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Hidden from plan output
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides a fluent API for building schemas
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                description: String::new(),
                attributes: Vec::new(),
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.attributes.push(attr);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.description = desc.to_string();
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
