//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// Key value matching any instance of a list entry.
pub const WILDCARD: &str = "*";

// A single element of a hierarchical data path, optionally keyed.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct PathElem {
    pub name: String,
    pub keys: BTreeMap<String, String>,
}

// Hierarchical data path, e.g.
// `/interfaces/interface[name=Ethernet1]/state/oper-status`.
//
// A list element without keys, or with a key set to `*`, matches every
// entry of that list.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    elems: Vec<PathElem>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsePathError {
    pub path: String,
    pub reason: &'static str,
}

// ===== impl PathElem =====

impl PathElem {
    pub fn new(name: impl Into<String>) -> PathElem {
        PathElem {
            name: name.into(),
            keys: Default::default(),
        }
    }

    // Returns whether this element matches the given pattern element.
    //
    // Keys missing from the pattern or set to `*` match any value.
    pub fn matches(&self, pattern: &PathElem) -> bool {
        if pattern.name != self.name && pattern.name != WILDCARD {
            return false;
        }
        pattern.keys.iter().all(|(key, value)| {
            value == WILDCARD || self.keys.get(key) == Some(value)
        })
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == WILDCARD || self.keys.values().any(|v| v == WILDCARD)
    }
}

impl std::fmt::Display for PathElem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        for (key, value) in &self.keys {
            write!(f, "[{key}=")?;
            for c in value.chars() {
                if c == ']' || c == '\\' {
                    write!(f, "\\")?;
                }
                write!(f, "{c}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

// ===== impl Path =====

impl Path {
    pub fn root() -> Path {
        Path::default()
    }

    pub fn elems(&self) -> &[PathElem] {
        &self.elems
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_root(&self) -> bool {
        self.elems.is_empty()
    }

    // Appends an unkeyed element.
    pub fn elem(mut self, name: impl Into<String>) -> Path {
        self.elems.push(PathElem::new(name));
        self
    }

    // Appends a list element with a single key.
    pub fn keyed(
        self,
        name: impl Into<String>,
        key: impl Into<String>,
        value: impl ToString,
    ) -> Path {
        self.elem(name).with_key(key, value)
    }

    // Adds a key to the last element.
    pub fn with_key(
        mut self,
        key: impl Into<String>,
        value: impl ToString,
    ) -> Path {
        if let Some(last) = self.elems.last_mut() {
            last.keys.insert(key.into(), value.to_string());
        }
        self
    }

    pub fn push(&mut self, elem: PathElem) {
        self.elems.push(elem);
    }

    pub fn join(&self, other: &Path) -> Path {
        let mut path = self.clone();
        path.elems.extend(other.elems.iter().cloned());
        path
    }

    pub fn last(&self) -> Option<&PathElem> {
        self.elems.last()
    }

    pub fn parent(&self) -> Option<Path> {
        let (_, elems) = self.elems.split_last()?;
        Some(Path {
            elems: elems.to_vec(),
        })
    }

    // Returns the value of `key` in the first element named `elem`.
    pub fn key(&self, elem: &str, key: &str) -> Option<&str> {
        self.elems
            .iter()
            .find(|e| e.name == elem)
            .and_then(|e| e.keys.get(key))
            .map(String::as_str)
    }

    pub fn is_wildcard(&self) -> bool {
        self.elems.iter().any(PathElem::is_wildcard)
    }

    // Returns whether `prefix` (possibly containing wildcards) is a prefix of
    // this path.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        prefix.len() <= self.len()
            && self
                .elems
                .iter()
                .zip(prefix.elems.iter())
                .all(|(elem, pattern)| elem.matches(pattern))
    }

    // Returns whether this path matches `pattern` element by element.
    pub fn matches(&self, pattern: &Path) -> bool {
        self.len() == pattern.len() && self.starts_with(pattern)
    }

    // Returns a copy of this path with every element named `from` renamed to
    // `to` (e.g. `config` to `state`).
    pub fn rename_elems(&self, from: &str, to: &str) -> Path {
        let elems = self
            .elems
            .iter()
            .map(|elem| {
                let mut elem = elem.clone();
                if elem.name == from {
                    elem.name = to.to_owned();
                }
                elem
            })
            .collect();
        Path { elems }
    }

    pub fn contains_elem(&self, name: &str) -> bool {
        self.elems.iter().any(|elem| elem.name == name)
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.elems.is_empty() {
            return write!(f, "/");
        }
        for elem in &self.elems {
            write!(f, "/{elem}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = ParsePathError;

    fn from_str(s: &str) -> Result<Path, ParsePathError> {
        let error = |reason| ParsePathError {
            path: s.to_owned(),
            reason,
        };

        let mut elems = vec![];
        let mut chars = s.trim_start_matches('/').chars().peekable();
        while chars.peek().is_some() {
            // Element name.
            let mut elem = PathElem::default();
            while let Some(&c) = chars.peek() {
                if c == '/' || c == '[' {
                    break;
                }
                elem.name.push(c);
                chars.next();
            }
            if elem.name.is_empty() {
                return Err(error("empty path element"));
            }

            // Element keys.
            while chars.peek() == Some(&'[') {
                chars.next();
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('=') => break,
                        Some(']') | None => {
                            return Err(error("key without value"));
                        }
                        Some(c) => key.push(c),
                    }
                }
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(c) => value.push(c),
                            None => return Err(error("dangling escape")),
                        },
                        Some(']') => break,
                        Some(c) => value.push(c),
                        None => return Err(error("unterminated key")),
                    }
                }
                if key.is_empty() {
                    return Err(error("empty key name"));
                }
                elem.keys.insert(key, value);
            }

            match chars.next() {
                Some('/') | None => (),
                Some(_) => return Err(error("unexpected character")),
            }
            elems.push(elem);
        }

        Ok(Path { elems })
    }
}

impl TryFrom<String> for Path {
    type Error = ParsePathError;

    fn try_from(s: String) -> Result<Path, ParsePathError> {
        s.parse()
    }
}

impl From<Path> for String {
    fn from(path: Path) -> String {
        path.to_string()
    }
}

// ===== impl ParsePathError =====

impl std::fmt::Display for ParsePathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid path {:?}: {}", self.path, self.reason)
    }
}

impl std::error::Error for ParsePathError {}

// ===== unit tests =====
