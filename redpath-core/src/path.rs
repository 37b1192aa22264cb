//! Redfish traversal paths: `Key`, `Key[*]`, `A[*]/B/...`.
//!
//! Grammar:
//!
//! ```text
//! key_name       = [A-Z] , { [A-Za-z0-9] } ;
//! key_filter     = key_name , "[" , "*" , "]" ;
//! path_component = key_filter | key_name ;
//! path           = path_component , { "/" , path_component } ;
//! ```
//!
//! Whitespace is not recognized. Parsing succeeds only when the whole
//! input is consumed; errors carry the unconsumed tail.

use std::fmt;
use thiserror::Error;

/// A `key[x]` component. Only the `*` filter is defined today.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyFilter {
    pub key: String,
    pub filter: char,
}

/// One segment of a path: a bare key or a filtered key.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum PathComponent {
    Name(String),
    Filter(KeyFilter),
}

impl PathComponent {
    pub fn key(&self) -> &str {
        match self {
            PathComponent::Name(name) => name,
            PathComponent::Filter(filter) => &filter.key,
        }
    }
}

/// A parsed traversal path: head component plus the trailing segments.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    pub first: PathComponent,
    pub filters: Vec<PathComponent>,
}

impl Path {
    /// Rewrite for the follow-up fetch of a wildcard fan-out.
    ///
    /// A collection is materialized by fetching its `Members` and then
    /// each element, so a `K[*]` head (with `K` not already `Members`)
    /// becomes `Members[*]` with the tail kept. Any other head is
    /// dropped and the tail shifts left. A path with no tail has no
    /// parent to resolve.
    pub fn strip_parent(&self) -> Option<Path> {
        if self.filters.is_empty() {
            return None;
        }

        if let PathComponent::Filter(filter) = &self.first
            && filter.key != "Members"
            && filter.filter == '*'
        {
            return Some(Path {
                first: PathComponent::Filter(KeyFilter {
                    key: "Members".to_string(),
                    filter: filter.filter,
                }),
                filters: self.filters.clone(),
            });
        }

        Some(Path {
            first: self.filters[0].clone(),
            filters: self.filters[1..].to_vec(),
        })
    }
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathComponent::Name(name) => f.write_str(name),
            PathComponent::Filter(filter) => write!(f, "{}[{}]", filter.key, filter.filter),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first)?;
        for component in &self.filters {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("expected a key name, stopped at: {0:?}")]
    ExpectedKey(String),
    #[error("malformed filter, stopped at: {0:?}")]
    MalformedFilter(String),
    #[error("trailing input, stopped at: {0:?}")]
    TrailingInput(String),
}

/// Parse a full path expression. The entire input must be consumed.
pub fn parse_path(expr: &str) -> Result<Path, PathError> {
    let (first, mut rest) = parse_component(expr)?;
    let mut filters = Vec::new();
    while let Some(tail) = rest.strip_prefix('/') {
        let (component, next) = parse_component(tail)?;
        filters.push(component);
        rest = next;
    }
    if !rest.is_empty() {
        return Err(PathError::TrailingInput(rest.to_string()));
    }
    Ok(Path { first, filters })
}

fn parse_component(input: &str) -> Result<(PathComponent, &str), PathError> {
    if !input.starts_with(|c: char| c.is_ascii_uppercase()) {
        return Err(PathError::ExpectedKey(input.to_string()));
    }
    let end = input[1..]
        .find(|c: char| !c.is_ascii_alphanumeric())
        .map_or(input.len(), |i| i + 1);
    let (name, rest) = input.split_at(end);

    match rest.strip_prefix('[') {
        Some(tail) => {
            let Some(tail) = tail.strip_prefix('*').and_then(|t| t.strip_prefix(']')) else {
                return Err(PathError::MalformedFilter(rest.to_string()));
            };
            Ok((
                PathComponent::Filter(KeyFilter {
                    key: name.to_string(),
                    filter: '*',
                }),
                tail,
            ))
        }
        None => Ok((PathComponent::Name(name.to_string()), rest)),
    }
}
