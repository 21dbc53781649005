//! Tool descriptors - the metadata a client sees in the discovery listing.
//!
//! A descriptor is built once with [`ToolDescriptor::builder`] and never
//! mutated afterwards. Its serialized form is the `function` object of the
//! discovery endpoint:
//!
//! ```json
//! {
//!   "name": "run_sql_query",
//!   "description": "...",
//!   "parameters": {
//!     "properties": { "query": { "type": "string", "description": "..." } },
//!     "required": ["query"]
//!   }
//! }
//! ```

use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// Type and description of a single parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSpec {
    /// JSON type tag (e.g. `"string"`).
    #[serde(rename = "type")]
    pub kind: String,

    /// Human-readable description shown to clients.
    pub description: String,
}

/// Parameter schema of a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolSchema {
    properties: BTreeMap<String, ParameterSpec>,
    required: Vec<String>,
}

impl ToolSchema {
    /// All declared parameters, keyed by name.
    pub fn properties(&self) -> &BTreeMap<String, ParameterSpec> {
        &self.properties
    }

    /// Names of the parameters a caller must supply.
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Check that every required name is a declared property.
    pub fn validate(&self) -> Result<(), String> {
        match self
            .required
            .iter()
            .find(|name| !self.properties.contains_key(*name))
        {
            Some(name) => Err(format!(
                "required parameter '{}' is not declared in properties",
                name
            )),
            None => Ok(()),
        }
    }

    /// Render as a JSON-Schema object (`{"type": "object", ...}`).
    pub fn to_json_schema(&self) -> Map<String, Value> {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, spec)| {
                (
                    name.clone(),
                    json!({ "type": spec.kind, "description": spec.description }),
                )
            })
            .collect();

        let mut schema = Map::new();
        schema.insert("type".into(), Value::String("object".into()));
        schema.insert("properties".into(), Value::Object(properties));
        if !self.required.is_empty() {
            schema.insert("required".into(), json!(self.required));
        }
        schema
    }
}

/// Immutable description of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    #[serde(rename = "parameters")]
    schema: ToolSchema,
}

impl ToolDescriptor {
    /// Start building a descriptor.
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder {
            name: name.into(),
            description: description.into(),
            schema: ToolSchema::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    /// Check the descriptor satisfies the tool shape.
    ///
    /// The loader skips tools whose descriptor fails this check.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("tool name is empty".to_string());
        }
        self.schema.validate()
    }

    /// Wrap into the discovery endpoint's `{function: ...}` envelope.
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            function: self.clone(),
        }
    }
}

/// Builder for [`ToolDescriptor`].
#[derive(Debug)]
pub struct DescriptorBuilder {
    name: String,
    description: String,
    schema: ToolSchema,
}

impl DescriptorBuilder {
    /// Declare an optional parameter.
    pub fn param(
        mut self,
        name: impl Into<String>,
        kind: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.schema.properties.insert(
            name.into(),
            ParameterSpec {
                kind: kind.into(),
                description: description.into(),
            },
        );
        self
    }

    /// Declare a required parameter.
    pub fn required_param(
        self,
        name: impl Into<String>,
        kind: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let name = name.into();
        self.param(name.clone(), kind, description).require(name)
    }

    /// Mark a name as required without declaring it.
    ///
    /// Mostly useful for building a descriptor that fails validation.
    pub fn require(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.schema.required.contains(&name) {
            self.schema.required.push(name);
        }
        self
    }

    pub fn build(self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name,
            description: self.description,
            schema: self.schema,
        }
    }
}

/// Discovery endpoint entry: `{"function": {name, description, parameters}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDefinition {
    pub function: ToolDescriptor,
}
