//! JSON Pointer value object for addressing nodes in the form tree.
//!
//! This module provides a type-safe wrapper around RFC 6901 JSON Pointers with
//! built-in validation. Pointers are the stable identity of every node in the
//! tree, so only syntactically valid pointers can exist in the system.

use crate::error::{FormError, FormResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A validated RFC 6901 JSON Pointer.
///
/// The empty string addresses the document root; every other pointer is a
/// sequence of `/`-prefixed reference tokens with `~0`/`~1` escaping.
///
/// ## Examples
///
/// ```rust
/// use formtree::pointer::JsonPointer;
///
/// let root = JsonPointer::root();
/// let name = root.child("user").child("name");
/// assert_eq!(name.as_str(), "/user/name");
/// assert_eq!(name.parent().unwrap().as_str(), "/user");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct JsonPointer(String);

impl JsonPointer {
    /// The root pointer (empty string).
    pub fn root() -> Self {
        JsonPointer(String::new())
    }

    /// Parse a pointer with validation.
    ///
    /// Accepts the empty string (root) or a string starting with `/`.
    pub fn parse(value: impl Into<String>) -> FormResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Ok(JsonPointer(value));
        }
        if !value.starts_with('/') {
            return Err(FormError::pointer_syntax(value));
        }
        // Reject dangling escape characters
        let bytes = value.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'~' {
                match bytes.get(i + 1) {
                    Some(b'0') | Some(b'1') => i += 2,
                    _ => return Err(FormError::pointer_syntax(value)),
                }
            } else {
                i += 1;
            }
        }
        Ok(JsonPointer(value))
    }

    /// The pointer as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the document root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Append one reference token, escaping `~` and `/`.
    pub fn child(&self, token: &str) -> Self {
        let escaped = token.replace('~', "~0").replace('/', "~1");
        JsonPointer(format!("{}/{}", self.0, escaped))
    }

    /// Append an array index token.
    pub fn index(&self, index: usize) -> Self {
        JsonPointer(format!("{}/{}", self.0, index))
    }

    /// The parent pointer, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let cut = self.0.rfind('/').unwrap_or(0);
        Some(JsonPointer(self.0[..cut].to_string()))
    }

    /// The final reference token, unescaped, or `None` at the root.
    pub fn last_token(&self) -> Option<String> {
        if self.is_root() {
            return None;
        }
        let cut = self.0.rfind('/').unwrap_or(0);
        Some(Self::unescape(&self.0[cut + 1..]))
    }

    /// Iterate unescaped reference tokens from the root down.
    pub fn tokens(&self) -> impl Iterator<Item = String> + '_ {
        self.0.split('/').skip(1).map(Self::unescape)
    }

    /// Number of reference tokens.
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.matches('/').count()
        }
    }

    /// True when `self` addresses `other` or one of its ancestors.
    pub fn contains(&self, other: &JsonPointer) -> bool {
        self.is_root()
            || other.0 == self.0
            || (other.0.starts_with(&self.0) && other.0.as_bytes().get(self.0.len()) == Some(&b'/'))
    }

    /// True when the two pointers address overlapping subtrees.
    pub fn overlaps(&self, other: &JsonPointer) -> bool {
        self.contains(other) || other.contains(self)
    }

    fn unescape(token: &str) -> String {
        token.replace("~1", "/").replace("~0", "~")
    }

    /// Look up the addressed value inside `root`.
    pub fn lookup<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        root.pointer(&self.0)
    }

    /// Write `value` at the addressed position inside `root`, creating
    /// missing intermediate objects and extending arrays by exactly one
    /// trailing slot where the next token is the array's length.
    pub fn assign(&self, root: &mut Value, value: Value) -> FormResult<()> {
        if self.is_root() {
            *root = value;
            return Ok(());
        }
        let tokens: Vec<String> = self.tokens().collect();
        let mut cursor = root;
        for (i, token) in tokens.iter().enumerate() {
            let last = i + 1 == tokens.len();
            if cursor.is_null() {
                // Materialize the container implied by the token
                *cursor = if token.parse::<usize>().is_ok() {
                    Value::Array(Vec::new())
                } else {
                    Value::Object(serde_json::Map::new())
                };
            }
            match cursor {
                Value::Object(map) => {
                    if last {
                        map.insert(token.clone(), value);
                        return Ok(());
                    }
                    cursor = map.entry(token.clone()).or_insert(Value::Null);
                }
                Value::Array(items) => {
                    let index: usize = token
                        .parse()
                        .map_err(|_| FormError::pointer_syntax(self.0.clone()))?;
                    if index > items.len() {
                        return Err(FormError::node_not_found(self.0.clone()));
                    }
                    if index == items.len() {
                        items.push(Value::Null);
                    }
                    if last {
                        items[index] = value;
                        return Ok(());
                    }
                    cursor = &mut items[index];
                }
                _ => return Err(FormError::node_not_found(self.0.clone())),
            }
        }
        Ok(())
    }

    /// Remove the addressed value from `root`, returning it if present.
    pub fn remove(&self, root: &mut Value) -> Option<Value> {
        let parent = self.parent()?;
        let token = self.last_token()?;
        match parent.lookup_mut(root)? {
            Value::Object(map) => map.remove(&token),
            Value::Array(items) => {
                let index: usize = token.parse().ok()?;
                if index < items.len() {
                    Some(items.remove(index))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn lookup_mut<'v>(&self, root: &'v mut Value) -> Option<&'v mut Value> {
        root.pointer_mut(&self.0)
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JsonPointer {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for JsonPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for JsonPointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        JsonPointer::parse(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_root_pointer() {
        let root = JsonPointer::root();
        assert!(root.is_root());
        assert_eq!(root.depth(), 0);
        assert!(root.parent().is_none());
    }

    #[test]
    fn test_parse_rejects_missing_slash() {
        assert!(JsonPointer::parse("user/name").is_err());
        assert!(JsonPointer::parse("/user/name").is_ok());
    }

    #[test]
    fn test_parse_rejects_dangling_escape() {
        assert!(JsonPointer::parse("/a~").is_err());
        assert!(JsonPointer::parse("/a~2b").is_err());
        assert!(JsonPointer::parse("/a~0b").is_ok());
    }

    #[test]
    fn test_child_escapes_tokens() {
        let p = JsonPointer::root().child("a/b").child("c~d");
        assert_eq!(p.as_str(), "/a~1b/c~0d");
        let tokens: Vec<String> = p.tokens().collect();
        assert_eq!(tokens, vec!["a/b", "c~d"]);
    }

    #[test]
    fn test_contains() {
        let user = JsonPointer::parse("/user").unwrap();
        let name = JsonPointer::parse("/user/name").unwrap();
        let username = JsonPointer::parse("/username").unwrap();
        assert!(user.contains(&name));
        assert!(!user.contains(&username));
        assert!(!name.contains(&user));
        assert!(JsonPointer::root().contains(&user));
    }

    #[test]
    fn test_assign_creates_intermediates() {
        let mut value = json!({});
        let ptr = JsonPointer::parse("/user/name").unwrap();
        ptr.assign(&mut value, json!("ada")).unwrap();
        assert_eq!(value, json!({"user": {"name": "ada"}}));
    }

    #[test]
    fn test_assign_appends_one_array_slot() {
        let mut value = json!({"items": [1, 2]});
        JsonPointer::parse("/items/2")
            .unwrap()
            .assign(&mut value, json!(3))
            .unwrap();
        assert_eq!(value, json!({"items": [1, 2, 3]}));
        // A gap beyond the length is rejected
        let result = JsonPointer::parse("/items/5")
            .unwrap()
            .assign(&mut value, json!(9));
        assert!(result.is_err());
    }

    #[test]
    fn test_remove() {
        let mut value = json!({"user": {"name": "ada", "age": 36}});
        let removed = JsonPointer::parse("/user/name").unwrap().remove(&mut value);
        assert_eq!(removed, Some(json!("ada")));
        assert_eq!(value, json!({"user": {"age": 36}}));
    }

    proptest! {
        #[test]
        fn prop_child_token_roundtrip(token in "[a-z~/]{1,12}") {
            let p = JsonPointer::root().child(&token);
            let tokens: Vec<String> = p.tokens().collect();
            prop_assert_eq!(tokens, vec![token]);
        }
    }
}
