//! Common types used throughout deskbridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque key addressing a remote record: a numeric ID or a name.
///
/// Immutable once an entity is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityKey {
    /// Numeric record ID (tickets, assets, users after lookup).
    Id(u64),
    /// Textual key (usernames, category names).
    Name(String),
}

impl EntityKey {
    /// Create a textual key.
    ///
    /// # Errors
    /// - Returns error if `name` is empty or only whitespace
    pub fn name(name: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(crate::Error::Config(
                "Entity key cannot be empty".to_string(),
            ));
        }
        Ok(Self::Name(name))
    }

    /// Numeric ID, if this key is one.
    pub fn as_id(&self) -> Option<u64> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Name(_) => None,
        }
    }

    /// JSON form used when the key is placed into a payload.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Id(id) => Value::from(*id),
            Self::Name(name) => Value::from(name.as_str()),
        }
    }
}

impl From<u64> for EntityKey {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Render a JSON value as a query-string parameter.
///
/// Returns `None` for null, which is left out of the query entirely.
/// Booleans use the API's literal `true`/`false` convention.
pub fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Interpret a JSON value as a strictly integral ID.
///
/// Strings are not accepted; the API returns bare integers on success.
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}
