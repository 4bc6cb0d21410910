use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered tags derived from a free-text, comma separated input.
///
/// Whitespace is removed everywhere (not only trimmed), then the input is
/// split on commas. Empty segments are dropped, so `""` yields no tags.
/// Tags are neither deduplicated nor length-checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagList(Vec<String>);

impl TagList {
    pub fn parse(input: &str) -> Self {
        let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        let tags = compact
            .split(',')
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();
        Self(tags)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().cloned().map(Value::String).collect())
    }
}

impl From<&str> for TagList {
    fn from(input: &str) -> Self {
        Self::parse(input)
    }
}
