//! Helper functions for [`toml_span`].
//!
//! Prompts are written in TOML, but their shape is described with `serde`. We
//! parse with `toml_span` so that errors point at a line and column, convert
//! to JSON, and hand the result to `serde_json`.

use std::borrow::Cow;

use codespan_reporting::files::{Files as _, SimpleFile};
use toml_span::{DeserError, value::ValueInner};

use crate::prelude::*;

/// Parse a TOML string into JSON.
pub fn toml_to_json(toml_str: &str) -> Result<Value, DeserError> {
    let mut value = toml_span::de::parse(toml_str)?;
    <JsonValue as toml_span::Deserialize>::deserialize(&mut value).map(JsonValue::into_json)
}

/// Parse a TOML string, then deserialize it with `serde`. `name` is used in
/// error messages.
pub fn from_toml_str<T>(name: &str, toml_str: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let json = toml_to_json(toml_str)
        .map_err(|err| anyhow!("{}", describe_deser_error(name, toml_str, &err)))?;
    serde_json::from_value(json).with_context(|| format!("Failed to deserialize {name}"))
}

/// Format every error in `err` as `name:line:column: message`, one per line.
pub fn describe_deser_error(name: &str, source: &str, err: &DeserError) -> String {
    let file = SimpleFile::new(name, source);
    err.errors
        .iter()
        .map(|error| match file.location((), error.span.start) {
            Ok(location) => format!(
                "{}:{}:{}: {}",
                name, location.line_number, location.column_number, error
            ),
            Err(_) => format!("{}: {}", name, error),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Create a custom [`DeserError`] with a span.
fn custom_deser_error(span: toml_span::Span, msg: impl Into<Cow<'static, str>>) -> DeserError {
    let err_kind = toml_span::ErrorKind::Custom(msg.into());
    let err = toml_span::Error::from((err_kind, span));
    DeserError::from(err)
}

/// JSON [`Value`] wrapper for deserializing raw JSON from TOML.
#[derive(Debug)]
struct JsonValue(Value);

impl JsonValue {
    /// Convert to a [`Value`].
    fn into_json(self) -> Value {
        self.0
    }
}

impl<'de> toml_span::Deserialize<'de> for JsonValue {
    fn deserialize(value: &mut toml_span::Value<'de>) -> Result<Self, DeserError> {
        let inner = value.take();
        match inner {
            ValueInner::String(cow) => Ok(JsonValue(Value::String(cow.into_owned()))),
            ValueInner::Integer(i) => {
                Ok(JsonValue(Value::Number(serde_json::Number::from(i))))
            }
            ValueInner::Float(f) => Ok(JsonValue(Value::Number(
                serde_json::Number::from_f64(f).ok_or_else(|| {
                    custom_deser_error(value.span, "Invalid float value")
                })?,
            ))),
            ValueInner::Boolean(b) => Ok(JsonValue(Value::Bool(b))),
            ValueInner::Array(values) => {
                let values = values
                    .into_iter()
                    .map(|mut v| {
                        <JsonValue as toml_span::Deserialize>::deserialize(&mut v)
                            .map(JsonValue::into_json)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(JsonValue(Value::Array(values)))
            }
            ValueInner::Table(btree_map) => {
                let properties = btree_map
                    .into_iter()
                    .map(|(k, mut v)| -> Result<(String, Value), DeserError> {
                        let key = k.name.into_owned();
                        let value =
                            <JsonValue as toml_span::Deserialize>::deserialize(&mut v)?
                                .into_json();
                        Ok((key, value))
                    })
                    .collect::<Result<serde_json::Map<_, _>, _>>()?;
                Ok(JsonValue(Value::Object(properties)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_to_json() {
        let json = toml_to_json(
            r#"
developer = "Read checks."

[[messages]]
[messages.assistant]
json = { payee = "John Doe", amount = 500, exact = true }
"#,
        )
        .unwrap();
        assert_eq!(
            json,
            json!({
                "developer": "Read checks.",
                "messages": [
                    { "assistant": { "json": { "payee": "John Doe", "amount": 500, "exact": true } } }
                ],
            })
        );
    }

    #[test]
    fn test_syntax_errors_report_line_and_column() {
        let source = "developer = \"ok\"\nmessages = [\n";
        let err = toml_to_json(source).unwrap_err();
        let message = describe_deser_error("prompt.toml", source, &err);
        assert!(message.starts_with("prompt.toml:"), "{message}");
        assert!(message.split(':').nth(1).unwrap().parse::<usize>().is_ok());
    }
}
