//! Response schema support.
//!
//! We generate the JSON Schema from our Rust types, send it to the LLM as the
//! requested response format, and then check the response against the same
//! schema before trusting it.

use std::fmt;

use jsonschema::Validator;
use schemars::{JsonSchema, schema_for};

use crate::prelude::*;

/// A JSON Schema describing an LLM response, plus a compiled validator.
pub struct ResponseSchema {
    /// The raw JSON Schema.
    schema: Value,

    /// Our compiled validator.
    validator: Validator,
}

impl ResponseSchema {
    /// Build a schema from a Rust type.
    pub fn from_type<T: JsonSchema>() -> Result<Self> {
        let schema = serde_json::to_value(schema_for!(T))
            .context("failed to serialize generated schema")?;
        Self::from_json_schema(schema)
    }

    /// Build a schema from an existing JSON Schema.
    pub fn from_json_schema(schema: Value) -> Result<Self> {
        let validator = jsonschema::validator_for(&schema)
            .map_err(|err| anyhow!("invalid JSON Schema: {err}"))?;
        Ok(Self { schema, validator })
    }

    /// The raw JSON Schema.
    pub fn json_schema(&self) -> &Value {
        &self.schema
    }

    /// The title of this schema, used by APIs which want a name for the
    /// response format.
    pub fn title(&self) -> String {
        get_schema_title(&self.schema)
    }

    /// Check `value` against this schema, collecting every violation.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<String>> {
        let errors = self
            .validator
            .iter_errors(value)
            .map(|err| {
                let path = err.instance_path.to_string();
                if path.is_empty() {
                    err.to_string()
                } else {
                    format!("{path}: {err}")
                }
            })
            .collect::<Vec<_>>();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl fmt::Debug for ResponseSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseSchema")
            .field("title", &self.title())
            .finish_non_exhaustive()
    }
}

/// Get the title of a JSON Schema, or a generic default.
pub fn get_schema_title(schema: &Value) -> String {
    schema
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("ResponseFormat")
        .to_owned()
}
