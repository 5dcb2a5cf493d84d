//! Inspectable values and path edits
//!
//! Containers are reference counted, so [`with_value_at`] only rebuilds the
//! chain of containers from the top to the edited key and shares every other
//! branch with the original.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Props/state/context value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Rc<str>),
    Array(Rc<Vec<Value>>),
    Object(Rc<BTreeMap<String, Value>>),
}

impl Value {
    /// Empty object
    pub fn object() -> Self {
        Self::Object(Rc::default())
    }

    /// Object from key/value pairs
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Object(Rc::new(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::Float(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Child at `key`
    pub fn get(&self, key: &PathKey) -> Option<&Value> {
        match (self, key) {
            (Self::Object(map), key) => map.get(&key.to_string()),
            (Self::Array(items), PathKey::Index(i)) => items.get(*i),
            (Self::Array(items), PathKey::Key(k)) => k.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Descendant at `path`
    pub fn get_path(&self, path: &[PathKey]) -> Option<&Value> {
        path.iter().try_fold(self, |value, key| value.get(key))
    }

    /// Whether both values are the same shared container
    pub fn shares_with(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(Rc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(Rc::from(v))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(Rc::new(v))
    }
}

/// One step of an edit path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathKey {
    Index(usize),
    Key(String),
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{}", i),
            Self::Key(k) => f.write_str(k),
        }
    }
}

impl From<&str> for PathKey {
    fn from(k: &str) -> Self {
        Self::Key(k.to_string())
    }
}

impl From<String> for PathKey {
    fn from(k: String) -> Self {
        Self::Key(k)
    }
}

impl From<usize> for PathKey {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

/// Path edit error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("Cannot descend into {found} at depth {depth}")]
    NotAContainer { found: &'static str, depth: usize },

    #[error("Key {key:?} does not address an array element at depth {depth}")]
    KeyOnArray { key: String, depth: usize },

    #[error("Index {index} past the end of an array of length {len} at depth {depth}")]
    IndexOutOfRange { index: usize, len: usize, depth: usize },
}

/// Copy of `container` with `value` installed at `path`.
///
/// Missing intermediate containers are created (objects for keys, arrays for
/// index 0). An empty path yields `value` itself.
pub fn with_value_at(container: &Value, path: &[PathKey], value: Value) -> Result<Value, PathError> {
    copy_with_set(Some(container), path, value, 0)
}

fn copy_with_set(
    current: Option<&Value>,
    path: &[PathKey],
    value: Value,
    depth: usize,
) -> Result<Value, PathError> {
    let Some((key, rest)) = path.split_first() else {
        return Ok(value);
    };

    match current {
        None | Some(Value::Null) => match key {
            PathKey::Key(k) => {
                let child = copy_with_set(None, rest, value, depth + 1)?;
                Ok(Value::from_pairs([(k.clone(), child)]))
            }
            PathKey::Index(0) => {
                let child = copy_with_set(None, rest, value, depth + 1)?;
                Ok(Value::from(vec![child]))
            }
            PathKey::Index(index) => Err(PathError::IndexOutOfRange { index: *index, len: 0, depth }),
        },
        Some(Value::Object(map)) => {
            let k = key.to_string();
            let child = copy_with_set(map.get(&k), rest, value, depth + 1)?;
            let mut next = (**map).clone();
            next.insert(k, child);
            Ok(Value::Object(Rc::new(next)))
        }
        Some(Value::Array(items)) => {
            let index = match key {
                PathKey::Index(i) => *i,
                PathKey::Key(k) => k
                    .parse::<usize>()
                    .map_err(|_| PathError::KeyOnArray { key: k.clone(), depth })?,
            };
            if index > items.len() {
                return Err(PathError::IndexOutOfRange { index, len: items.len(), depth });
            }
            let child = copy_with_set(items.get(index), rest, value, depth + 1)?;
            let mut next = (**items).clone();
            if index == next.len() {
                next.push(child);
            } else {
                next[index] = child;
            }
            Ok(Value::Array(Rc::new(next)))
        }
        Some(scalar) => Err(PathError::NotAContainer { found: scalar.type_name(), depth }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(keys: &[&str]) -> Vec<PathKey> {
        keys.iter().map(|k| PathKey::from(*k)).collect()
    }

    fn sample() -> Value {
        Value::from_pairs([
            ("user", Value::from_pairs([("name", Value::from("ada")), ("age", Value::from(36))])),
            ("tags", Value::from(vec![Value::from("a"), Value::from("b")])),
            ("theme", Value::from_pairs([("dark", Value::from(true))])),
        ])
    }

    #[test]
    fn test_set_nested_key_shares_siblings() {
        let base = sample();
        let next = with_value_at(&base, &path(&["user", "age"]), Value::from(37)).unwrap();

        assert_eq!(next.get_path(&path(&["user", "age"])), Some(&Value::from(37)));
        assert_eq!(next.get_path(&path(&["user", "name"])), Some(&Value::from("ada")));
        assert_eq!(base.get_path(&path(&["user", "age"])), Some(&Value::from(36)));

        let theme = path(&["theme"]);
        assert!(next.get_path(&theme).unwrap().shares_with(base.get_path(&theme).unwrap()));
        let user = path(&["user"]);
        assert!(!next.get_path(&user).unwrap().shares_with(base.get_path(&user).unwrap()));
    }

    #[test]
    fn test_set_array_element_and_append() {
        let base = sample();
        let replaced = with_value_at(&base, &[PathKey::from("tags"), PathKey::from(1)], Value::from("z")).unwrap();
        assert_eq!(replaced.get_path(&path(&["tags", "1"])), Some(&Value::from("z")));

        let appended = with_value_at(&base, &[PathKey::from("tags"), PathKey::from(2)], Value::from("c")).unwrap();
        assert_eq!(appended.get_path(&path(&["tags", "2"])), Some(&Value::from("c")));

        assert_eq!(
            with_value_at(&base, &[PathKey::from("tags"), PathKey::from(5)], Value::Null),
            Err(PathError::IndexOutOfRange { index: 5, len: 2, depth: 1 })
        );
        assert_eq!(
            with_value_at(&base, &path(&["tags", "first"]), Value::Null),
            Err(PathError::KeyOnArray { key: "first".into(), depth: 1 })
        );
    }

    #[test]
    fn test_missing_intermediates_are_created() {
        let next = with_value_at(&Value::object(), &path(&["a", "b"]), Value::from(1)).unwrap();
        assert_eq!(next.get_path(&path(&["a", "b"])), Some(&Value::from(1)));
    }

    #[test]
    fn test_scalar_in_path_is_rejected() {
        let base = sample();
        assert_eq!(
            with_value_at(&base, &path(&["user", "name", "first"]), Value::Null),
            Err(PathError::NotAContainer { found: "string", depth: 2 })
        );
    }

    #[test]
    fn test_json_round_trip() {
        let json = serde_json::to_string(&sample()).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
    }
}
