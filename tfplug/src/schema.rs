//! Schema types and builders for tfplug
//!
//! Schemas describe the provider block and every resource type. Nested objects
//! are expressed as attributes with a `NestedType` (single nesting), which is
//! how the framework models blocks such as an assistant's `model`.

use crate::plan_modifier::PlanModifier;
use std::collections::BTreeMap;
use std::sync::Arc;

/// AttributeType defines the type system for Terraform attributes
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List(Box<AttributeType>),
    Map(Box<AttributeType>),
    Object(BTreeMap<String, AttributeType>),
}

impl AttributeType {
    /// JSON type constraint as Terraform expects it in `Schema.Attribute.type`
    pub fn to_type_json(&self) -> serde_json::Value {
        use serde_json::{json, Value};
        match self {
            AttributeType::String => json!("string"),
            AttributeType::Number => json!("number"),
            AttributeType::Bool => json!("bool"),
            AttributeType::List(elem) => json!(["list", elem.to_type_json()]),
            AttributeType::Map(elem) => json!(["map", elem.to_type_json()]),
            AttributeType::Object(fields) => {
                let fields: serde_json::Map<String, Value> = fields
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.to_type_json()))
                    .collect();
                json!(["object", fields])
            }
        }
    }
}

/// Schema is returned by providers and resources.
/// `version` is reported to Terraform for state upgrades.
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.iter().find(|a| a.name == name)
    }

    /// Names of top-level attributes marked sensitive
    pub fn sensitive_attributes(&self) -> impl Iterator<Item = &str> {
        self.block
            .attributes
            .iter()
            .filter(|a| a.sensitive)
            .map(|a| a.name.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub description: String,
    pub description_kind: StringKind,
    pub deprecated: bool,
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub nested_type: Option<NestedType>,
    pub deprecated: bool,
}

impl Attribute {
    /// Value type of the attribute; nested attributes resolve to an object type
    pub fn value_type(&self) -> AttributeType {
        match &self.nested_type {
            Some(nested) => nested.object_type(),
            None => self.r#type.clone(),
        }
    }
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "plan_modifiers",
                &format!("{} plan modifiers", self.plan_modifiers.len()),
            )
            .field("nested_type", &self.nested_type)
            .finish()
    }
}

/// Single-nested object attribute
#[derive(Debug, Clone)]
pub struct NestedType {
    pub attributes: Vec<Attribute>,
}

impl NestedType {
    pub fn single(attributes: Vec<Attribute>) -> Self {
        Self { attributes }
    }

    pub fn object_type(&self) -> AttributeType {
        AttributeType::Object(
            self.attributes
                .iter()
                .map(|a| (a.name.clone(), a.value_type()))
                .collect(),
        )
    }
}

/// StringKind represents the format of description strings
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StringKind {
    Plain,
    Markdown,
}

/// AttributeBuilder provides fluent API for building attributes
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
                plan_modifiers: Vec::new(),
                nested_type: None,
                deprecated: false,
            },
        }
    }

    /// Single nested object attribute built from `attributes`
    pub fn nested(name: &str, attributes: Vec<Attribute>) -> Self {
        let nested = NestedType::single(attributes);
        let mut builder = Self::new(name, nested.object_type());
        builder.attribute.nested_type = Some(nested);
        builder
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

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn plan_modifier(mut self, modifier: impl PlanModifier + 'static) -> Self {
        self.attribute.plan_modifiers.push(Arc::new(modifier));
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides fluent API for building schemas
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block {
                    version: 0,
                    attributes: Vec::new(),
                    description: String::new(),
                    description_kind: StringKind::Plain,
                    deprecated: false,
                },
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn description_kind(mut self, kind: StringKind) -> Self {
        self.schema.block.description_kind = kind;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan_modifier::RequiresReplaceIfChanged;

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .description("Display name")
            .required()
            .build();

        assert_eq!(attr.name, "name");
        assert!(attr.required);
        assert!(!attr.optional);
        assert_eq!(attr.description, "Display name");
    }

    #[test]
    fn cloned_attribute_keeps_plan_modifiers() {
        let attr = AttributeBuilder::new("number", AttributeType::String)
            .required()
            .plan_modifier(RequiresReplaceIfChanged)
            .build();

        let cloned = attr.clone();
        assert_eq!(cloned.plan_modifiers.len(), 1);
    }

    #[test]
    fn nested_attribute_resolves_to_object_type() {
        let attr = AttributeBuilder::nested(
            "voice",
            vec![
                AttributeBuilder::new("voice_id", AttributeType::String)
                    .required()
                    .build(),
                AttributeBuilder::new("speed", AttributeType::Number)
                    .optional()
                    .build(),
            ],
        )
        .optional()
        .build();

        assert!(attr.nested_type.is_some());
        assert_eq!(
            attr.value_type().to_type_json(),
            serde_json::json!(["object", {"speed": "number", "voice_id": "string"}])
        );
    }

    #[test]
    fn list_type_json() {
        let ty = AttributeType::List(Box::new(AttributeType::String));
        assert_eq!(ty.to_type_json(), serde_json::json!(["list", "string"]));
    }

    #[test]
    fn schema_lists_sensitive_attributes() {
        let schema = SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("twilio_auth_token", AttributeType::String)
                    .optional()
                    .sensitive()
                    .build(),
            )
            .build();

        let sensitive: Vec<&str> = schema.sensitive_attributes().collect();
        assert_eq!(sensitive, vec!["twilio_auth_token"]);
        assert!(schema.attribute("id").is_some_and(|a| a.computed));
    }
}
