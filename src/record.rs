/*!
 * Tree-structured content records with path based access.
 *
 * A record is an arbitrary JSON document. Fields are addressed with
 * lodash-style paths such as `seo.metaTitle`, `blocks[0].text` or
 * `blocks.0.text`. Writes create any missing intermediate objects or arrays.
 */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::errors::TranslationError;

/// One step of a field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object key
    Key(String),
    /// Array index (also usable as an object key)
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Parsed path into a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Path segments in traversal order
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    fn push_segment(segments: &mut Vec<PathSegment>, raw: &str, path: &str) -> Result<(), TranslationError> {
        if raw.is_empty() {
            return Err(TranslationError::Record(format!("Empty segment in field path '{}'", path)));
        }
        match raw.parse::<usize>() {
            Ok(index) => segments.push(PathSegment::Index(index)),
            Err(_) => segments.push(PathSegment::Key(raw.to_string())),
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = TranslationError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();

        for part in path.trim().split('.') {
            // `blocks[0][1]` style indices
            let (head, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };

            if !head.is_empty() || rest.is_empty() {
                Self::push_segment(&mut segments, head, path)?;
            }

            while !rest.is_empty() {
                let close = rest.find(']').ok_or_else(|| {
                    TranslationError::Record(format!("Unclosed bracket in field path '{}'", path))
                })?;
                let index = rest[1..close].parse::<usize>().map_err(|_| {
                    TranslationError::Record(format!(
                        "Invalid index '{}' in field path '{}'",
                        &rest[1..close],
                        path
                    ))
                })?;
                segments.push(PathSegment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(TranslationError::Record(format!(
                        "Unexpected characters after index in field path '{}'",
                        path
                    )));
                }
            }
        }

        Ok(Self { segments })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// A content record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Value);

impl Record {
    /// Wrap a JSON value
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Borrow the underlying JSON tree
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the underlying JSON tree
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Read the value at a path
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        let mut node = &self.0;
        for segment in path.segments() {
            node = match (node, segment) {
                (Value::Object(map), PathSegment::Key(key)) => map.get(key)?,
                (Value::Object(map), PathSegment::Index(index)) => map.get(&index.to_string())?,
                (Value::Array(items), PathSegment::Index(index)) => items.get(*index)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Read a string leaf; absent and non-string values yield `None`
    pub fn get_str(&self, path: &FieldPath) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Write a value at a path, creating intermediate structure as needed
    pub fn set(&mut self, path: &FieldPath, value: Value) -> Result<(), TranslationError> {
        if path.segments().is_empty() {
            return Err(TranslationError::Record("Cannot write to an empty field path".to_string()));
        }
        set_in(&mut self.0, path.segments(), value);
        Ok(())
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn set_in(node: &mut Value, segments: &[PathSegment], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    let slot = slot_mut(node, head);
    if rest.is_empty() {
        *slot = value;
    } else {
        set_in(slot, rest, value);
    }
}

/// Mutable slot for one segment, reshaping `node` when it cannot hold it
fn slot_mut<'a>(node: &'a mut Value, segment: &PathSegment) -> &'a mut Value {
    match segment {
        PathSegment::Key(key) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            let Value::Object(map) = node else {
                unreachable!("node was just replaced by an object");
            };
            map.entry(key.clone()).or_insert(Value::Null)
        }
        PathSegment::Index(index) => {
            if let Value::Object(map) = node {
                return map.entry(index.to_string()).or_insert(Value::Null);
            }
            if !node.is_array() {
                *node = Value::Array(Vec::new());
            }
            let Value::Array(items) = node else {
                unreachable!("node was just replaced by an array");
            };
            if items.len() <= *index {
                items.resize(*index + 1, Value::Null);
            }
            &mut items[*index]
        }
    }
}
