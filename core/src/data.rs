//! External data model access.
//!
//! The engine never owns the collected data. It reads (and the renderer writes)
//! through [`DataModel`], addressing values with dotted paths such as
//! `applicants[1].name`. Fields authored against a repeating section use an
//! empty index, `applicants[].name`, which [`resolve_field`] pins to the
//! current iteration.

use crate::error::PathError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Key-addressable store the wizard reads from and writes into.
pub trait DataModel: Send + Sync {
    fn get(&self, path: &str) -> Option<&Value>;

    fn set(&mut self, path: &str, value: Value) -> Result<(), PathError>;

    /// Length of the collection at `path`; zero when absent or not an array.
    fn collection_len(&self, path: &str) -> usize {
        self.get(path)
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

fn parse_path(path: &str) -> Result<Vec<Segment<'_>>, PathError> {
    let invalid = || PathError::Invalid(path.to_string());
    if path.is_empty() {
        return Err(invalid());
    }

    let mut segments = Vec::new();
    for part in path.split('.') {
        let (name, mut rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if !name.is_empty() {
            segments.push(Segment::Key(name));
        } else if rest.is_empty() {
            return Err(invalid());
        }
        while !rest.is_empty() {
            let close = rest.find(']').ok_or_else(invalid)?;
            let index = rest[1..close]
                .parse::<usize>()
                .map_err(|_| PathError::Unresolved(path.to_string()))?;
            segments.push(Segment::Index(index));
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return Err(invalid());
            }
        }
    }
    Ok(segments)
}

/// Replace every `key[]` placeholder in `field` with the current index for `key`.
///
/// Keys without an entry resolve to item 0.
pub fn resolve_field(field: &str, array_indexes: &BTreeMap<String, usize>) -> String {
    let mut resolved = String::with_capacity(field.len() + 4);
    let mut rest = field;
    while let Some(pos) = rest.find("[]") {
        let key = format!("{}{}", resolved, &rest[..pos]);
        let key = strip_indexes(&key);
        let index = array_indexes.get(&key).copied().unwrap_or(0);
        resolved.push_str(&rest[..pos]);
        resolved.push_str(&format!("[{index}]"));
        rest = &rest[pos + 2..];
    }
    resolved.push_str(rest);
    resolved
}

/// `household[0].members` -> `household[].members`, the form array keys are authored in.
fn strip_indexes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut in_index = false;
    for ch in path.chars() {
        match ch {
            '[' => {
                in_index = true;
                out.push('[');
            }
            ']' => {
                in_index = false;
                out.push(']');
            }
            _ if in_index => {}
            _ => out.push(ch),
        }
    }
    out
}

/// Refuse writes that would skip list items, before anything is mutated.
fn check_writable(root: &Value, path: &str, segments: &[Segment<'_>]) -> Result<(), PathError> {
    let mut current = Some(root);
    for segment in segments {
        current = match *segment {
            Segment::Key(key) => current.and_then(Value::as_object).and_then(|m| m.get(key)),
            Segment::Index(index) => {
                let items = current.and_then(Value::as_array);
                let len = items.map(Vec::len).unwrap_or(0);
                if index > len {
                    return Err(PathError::OutOfRange {
                        path: path.to_string(),
                        index,
                        len,
                    });
                }
                items.and_then(|items| items.get(index))
            }
        };
    }
    Ok(())
}

/// [`DataModel`] over a `serde_json::Value` tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonDataModel {
    root: Value,
}

impl JsonDataModel {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn into_inner(self) -> Value {
        self.root
    }
}

impl From<Value> for JsonDataModel {
    fn from(root: Value) -> Self {
        Self::new(root)
    }
}

impl DataModel for JsonDataModel {
    fn get(&self, path: &str) -> Option<&Value> {
        let segments = parse_path(path).ok()?;
        let mut current = &self.root;
        for segment in segments {
            current = match segment {
                Segment::Key(key) => current.as_object()?.get(key)?,
                Segment::Index(idx) => current.as_array()?.get(idx)?,
            };
        }
        Some(current)
    }

    fn set(&mut self, path: &str, value: Value) -> Result<(), PathError> {
        let segments = parse_path(path)?;
        check_writable(&self.root, path, &segments)?;
        let mut current = &mut self.root;
        for segment in segments {
            current = match segment {
                Segment::Key(key) => {
                    if !current.is_object() {
                        *current = Value::Object(Map::new());
                    }
                    match current {
                        Value::Object(map) => map.entry(key.to_string()).or_insert(Value::Null),
                        _ => return Err(PathError::Invalid(path.to_string())),
                    }
                }
                Segment::Index(idx) => {
                    if !current.is_array() {
                        *current = Value::Array(Vec::new());
                    }
                    match current {
                        Value::Array(items) => {
                            // Writes may append one item, never leave holes.
                            let len = items.len();
                            if idx == len {
                                items.push(Value::Null);
                            }
                            match items.get_mut(idx) {
                                Some(item) => item,
                                None => {
                                    return Err(PathError::OutOfRange {
                                        path: path.to_string(),
                                        index: idx,
                                        len,
                                    });
                                }
                            }
                        }
                        _ => return Err(PathError::Invalid(path.to_string())),
                    }
                }
            };
        }
        *current = value;
        Ok(())
    }
}
