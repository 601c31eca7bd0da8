//! Configuration validation.
//!
//! # Responsibilities
//! - Turn one raw JSON entry into a typed [`ServerSpec`]
//! - Reject entries that match neither the local nor the remote shape
//! - Check field types (`command` string, `args` list of strings, ...)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function of the raw value
//! - A config is accepted or rejected as a whole

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::config::schema::{ConfigMap, RemoteTransport, ServerSpec};

/// A single invalid service entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Server name must not be empty")]
    EmptyName,

    #[error("Server '{name}' configuration must be an object")]
    NotAnObject { name: String },

    #[error("Server '{name}' must have either 'command' for stdio or 'type' and 'url' for remote servers")]
    UnknownShape { name: String },

    #[error("Server '{name}' of type '{kind}' requires a 'url' field")]
    MissingUrl { name: String, kind: String },

    #[error("Server '{name}' has unsupported type '{kind}'")]
    UnsupportedType { name: String, kind: String },

    #[error("Server '{name}' field '{field}' {expected}")]
    InvalidField {
        name: String,
        field: &'static str,
        expected: &'static str,
    },
}

impl ValidationError {
    fn field(name: &str, field: &'static str, expected: &'static str) -> Self {
        Self::InvalidField {
            name: name.to_string(),
            field,
            expected,
        }
    }
}

/// Validate one service entry and convert it into a [`ServerSpec`].
pub fn validate_server_config(name: &str, raw: &Value) -> Result<ServerSpec, ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let obj = raw.as_object().ok_or_else(|| ValidationError::NotAnObject {
        name: name.to_string(),
    })?;

    let kind = match obj.get("type") {
        None | Some(Value::Null) => None,
        Some(kind) => Some(
            kind.as_str()
                .ok_or_else(|| ValidationError::field(name, "type", "must be a string"))?,
        ),
    };

    if let Some((kind_str, transport)) = kind.and_then(|k| RemoteTransport::parse(k).map(|t| (k, t))) {
        let url = non_empty_str(obj, "url").ok_or_else(|| ValidationError::MissingUrl {
            name: name.to_string(),
            kind: kind_str.to_string(),
        })?;
        return Ok(ServerSpec::Remote {
            transport,
            url: url.to_string(),
            headers: string_map(name, obj, "headers")?,
        });
    }

    // Any other `type` (usually "stdio") is just a label on a local entry.
    if let Some(command) = obj.get("command") {
        let command = command
            .as_str()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ValidationError::field(name, "command", "must be a non-empty string"))?;
        return Ok(ServerSpec::Local {
            command: command.to_string(),
            args: string_list(name, obj, "args")?,
            env: string_map(name, obj, "env")?,
        });
    }

    // No command: a non-remote `type` describes nothing this gateway can mount.
    if let Some(kind_str) = kind {
        if kind_str.eq_ignore_ascii_case("stdio") {
            return Err(ValidationError::UnknownShape {
                name: name.to_string(),
            });
        }
        return Err(ValidationError::UnsupportedType {
            name: name.to_string(),
            kind: kind_str.to_string(),
        });
    }

    // Older configs name an SSE endpoint by `url` alone.
    if let Some(url) = non_empty_str(obj, "url") {
        return Ok(ServerSpec::Remote {
            transport: RemoteTransport::Sse,
            url: url.to_string(),
            headers: string_map(name, obj, "headers")?,
        });
    }

    Err(ValidationError::UnknownShape {
        name: name.to_string(),
    })
}

/// Validate every entry of a raw service map.
pub fn validate_servers(raw: &Map<String, Value>) -> Result<ConfigMap, Vec<ValidationError>> {
    let mut servers = ConfigMap::new();
    let mut errors = Vec::new();

    for (name, value) in raw {
        match validate_server_config(name, value) {
            Ok(spec) => {
                servers.insert(name.clone(), spec);
            }
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(servers)
    } else {
        Err(errors)
    }
}

fn non_empty_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn string_list(name: &str, obj: &Map<String, Value>, field: &'static str) -> Result<Vec<String>, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ValidationError::field(name, field, "must be a list of strings"))
            })
            .collect(),
        Some(_) => Err(ValidationError::field(name, field, "must be a list of strings")),
    }
}

fn string_map(
    name: &str,
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<BTreeMap<String, String>, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(entries)) => entries
            .iter()
            .map(|(k, v)| {
                v.as_str()
                    .map(|s| (k.clone(), s.to_string()))
                    .ok_or_else(|| ValidationError::field(name, field, "must map names to strings"))
            })
            .collect(),
        Some(_) => Err(ValidationError::field(name, field, "must map names to strings")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_local_spec() {
        let spec = validate_server_config("test_server", &json!({"command": "echo", "args": ["hello", "world"]})).unwrap();
        assert_eq!(
            spec,
            ServerSpec::Local {
                command: "echo".into(),
                args: vec!["hello".into(), "world".into()],
                env: BTreeMap::new(),
            }
        );
    }

    #[test]
    fn test_stdio_type_with_command_is_local() {
        let spec = validate_server_config(
            "time",
            &json!({"type": "stdio", "command": "uvx", "args": ["mcp-server-time"]}),
        )
        .unwrap();
        assert_eq!(spec.kind(), "local");

        // An unknown label is tolerated when the entry is clearly local.
        assert!(validate_server_config("t", &json!({"type": "custom", "command": "uvx"})).is_ok());
    }

    #[test]
    fn test_non_remote_type_without_command() {
        let err = validate_server_config("time", &json!({"type": "stdio"})).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownShape { .. }));

        let err = validate_server_config("time", &json!({"type": "ws", "url": "ws://x"})).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedType { .. }));
    }

    #[test]
    fn test_remote_spec() {
        let spec = validate_server_config("test_server", &json!({"type": "sse", "url": "http://example.com/sse"})).unwrap();
        assert_eq!(spec.kind(), "sse");

        let spec = validate_server_config("s", &json!({"type": "streamable_http", "url": "http://x/mcp"})).unwrap();
        assert_eq!(spec.kind(), "streamable-http");
    }

    #[test]
    fn test_legacy_url_only_is_sse() {
        let spec = validate_server_config("s", &json!({"url": "http://x/sse"})).unwrap();
        assert!(matches!(spec, ServerSpec::Remote { transport: RemoteTransport::Sse, .. }));
    }

    #[test]
    fn test_neither_shape_rejected() {
        let err = validate_server_config("test_server", &json!({"invalid": "config"})).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("test_server"));
        assert!(msg.contains("must have either 'command' for stdio or 'type' and 'url'"));
    }

    #[test]
    fn test_remote_missing_url_rejected() {
        let err = validate_server_config("test_server", &json!({"type": "sse"})).unwrap_err();
        assert!(err.to_string().contains("requires a 'url' field"));
        assert_eq!(
            err,
            ValidationError::MissingUrl {
                name: "test_server".into(),
                kind: "sse".into()
            }
        );
    }

    #[test]
    fn test_field_types_checked() {
        assert!(validate_server_config("s", &json!({"command": 3})).is_err());
        assert!(validate_server_config("s", &json!({"command": "echo", "args": "x"})).is_err());
        assert!(validate_server_config("s", &json!({"command": "echo", "args": [1]})).is_err());
        assert!(validate_server_config("s", &json!({"command": "echo", "env": {"A": 1}})).is_err());
        assert!(validate_server_config("s", &json!({"type": "ws", "url": "ws://x"})).is_err());
        assert!(validate_server_config("s", &json!("echo")).is_err());
        assert!(validate_server_config("", &json!({"command": "echo"})).is_err());
    }

    #[test]
    fn test_collects_all_errors() {
        let raw = json!({
            "ok": {"command": "echo"},
            "bad1": {"invalid": "config"},
            "bad2": {"type": "sse"}
        });
        let errors = validate_servers(raw.as_object().unwrap()).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
