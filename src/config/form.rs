//! Reconstruct preference text from a URL-encoded form body.
//!
//! Each `key=value` pair becomes one TOML entry. Dotted keys address
//! sections (`server.port=8080`). A key the preference schema knows takes
//! the type of its default value, so `common.api_access_token=12345` stays
//! a string. Other values are typed the way TOML would read them, falling
//! back to a plain string.

use toml::{Table, Value};

use crate::config::loader::ConfigError;
use crate::config::schema::Preferences;

pub fn form_to_preferences(body: &[u8]) -> Result<String, ConfigError> {
    let schema = Value::try_from(Preferences::default())
        .map_err(|e| ConfigError::Form(e.to_string()))?;
    let mut root = Table::new();

    for (key, value) in url::form_urlencoded::parse(body) {
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = match lookup(&schema, key) {
            Some(Value::String(_)) => Value::String(value.into_owned()),
            _ => literal(&value),
        };
        insert_dotted(&mut root, key, value)?;
    }

    toml::to_string(&root).map_err(|e| ConfigError::Form(e.to_string()))
}

/// Default value at dotted `key`, if the schema has one.
fn lookup<'a>(schema: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(schema, |value, segment| value.get(segment.trim()))
}

fn literal(raw: &str) -> Value {
    match toml::from_str::<Table>(&format!("v = {raw}")) {
        Ok(mut table) if table.len() == 1 => table
            .remove("v")
            .unwrap_or_else(|| Value::String(raw.to_string())),
        _ => Value::String(raw.to_string()),
    }
}

fn insert_dotted(root: &mut Table, key: &str, value: Value) -> Result<(), ConfigError> {
    let mut segments: Vec<&str> = key.split('.').map(str::trim).collect();
    let leaf = segments.pop().unwrap_or_default();
    if leaf.is_empty() || segments.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::Form(format!("invalid key '{key}'")));
    }

    let mut table = root;
    for segment in segments {
        table = match table
            .entry(segment)
            .or_insert(Value::Table(Table::new()))
        {
            Value::Table(inner) => inner,
            _ => {
                return Err(ConfigError::Form(format!(
                    "key '{key}' conflicts with an existing value"
                )))
            }
        };
    }

    table.insert(leaf.to_string(), value);
    Ok(())
}
