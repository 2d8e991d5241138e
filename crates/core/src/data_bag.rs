use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::field_value::is_blank;

/// Open-ended mapping from field key to JSON value stored on a row.
///
/// Keys are field internal keys, but the bag may also hold keys whose field
/// has since been deleted. Those are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataBag(Map<String, Value>);

impl DataBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `key` is present with a non-blank value.
    pub fn has_value(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(|v| !is_blank(v))
    }

    /// True when at least one entry carries a non-blank value.
    pub fn has_any_value(&self) -> bool {
        self.0.values().any(|v| !is_blank(v))
    }

    pub fn to_json_string(&self) -> Result<String, CoreError> {
        serde_json::to_string(&self.0).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    pub fn from_json_str(s: &str) -> Result<Self, CoreError> {
        let value: Value =
            serde_json::from_str(s).map_err(|e| CoreError::Serialization(e.to_string()))?;
        Self::try_from(value)
    }
}

impl From<Map<String, Value>> for DataBag {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for DataBag {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CoreError::InvalidData(format!(
                "data bag must be a JSON object, got {other}"
            ))),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for DataBag {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
