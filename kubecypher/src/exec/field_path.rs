// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Field paths over schemaless documents
//!
//! Syntax: dot-separated field names, `[n]` for an array index, `[*]` or
//! `[]` to map over every element, and `"quoted"` or `["quoted"]` segments
//! for names containing dots or slashes, e.g.
//! `metadata.labels."app.kubernetes.io/name"` or
//! `spec.template.spec.containers[*].image`.

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldPathError {
    #[error("Empty field path")]
    Empty,

    #[error("Empty segment in field path '{0}'")]
    EmptySegment(String),

    #[error("Unterminated quote in field path '{0}'")]
    UnterminatedQuote(String),

    #[error("Unterminated bracket in field path '{0}'")]
    UnterminatedBracket(String),

    #[error("Invalid index '{index}' in field path '{path}'")]
    InvalidIndex { path: String, index: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
    Wildcard,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) if needs_quotes(name) => write!(f, "\"{}\"", name),
            PathSegment::Field(name) => write!(f, "{}", name),
            PathSegment::Index(i) => write!(f, "[{}]", i),
            PathSegment::Wildcard => write!(f, "[*]"),
        }
    }
}

fn needs_quotes(name: &str) -> bool {
    name.is_empty() || name.contains(['.', '/', '[', ']'])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    pub fn parse(text: &str) -> Result<Self, FieldPathError> {
        if text.is_empty() {
            return Err(FieldPathError::Empty);
        }

        let mut segments = Vec::new();
        let mut buffer = String::new();
        // A segment must follow the start of the path and every '.'
        let mut pending = true;
        let mut chars = text.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '.' => {
                    if !buffer.is_empty() {
                        segments.push(PathSegment::Field(std::mem::take(&mut buffer)));
                    } else if pending {
                        return Err(FieldPathError::EmptySegment(text.to_string()));
                    }
                    pending = true;
                }
                '"' if buffer.is_empty() => {
                    let quoted = read_until(&mut chars, '"')
                        .ok_or_else(|| FieldPathError::UnterminatedQuote(text.to_string()))?;
                    segments.push(PathSegment::Field(quoted));
                    pending = false;
                }
                '[' => {
                    if !buffer.is_empty() {
                        segments.push(PathSegment::Field(std::mem::take(&mut buffer)));
                    }
                    let inner = read_until(&mut chars, ']')
                        .ok_or_else(|| FieldPathError::UnterminatedBracket(text.to_string()))?;
                    segments.push(bracket_segment(text, &inner)?);
                    pending = false;
                }
                _ => {
                    buffer.push(ch);
                    pending = false;
                }
            }
        }

        if !buffer.is_empty() {
            segments.push(PathSegment::Field(buffer));
        } else if pending {
            return Err(FieldPathError::EmptySegment(text.to_string()));
        }

        Ok(Self { segments })
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Leading field name, if the path starts with one
    pub fn head(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Field(name)) => Some(name),
            _ => None,
        }
    }

    /// The path without its first segment
    pub fn tail(&self) -> FieldPath {
        FieldPath {
            segments: self.segments.iter().skip(1).cloned().collect(),
        }
    }

    /// True when the path has no index or wildcard segments
    pub fn is_plain(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, PathSegment::Field(_)))
    }

    /// Every value the path reaches; wildcards fan out
    pub fn resolve<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![document];
        for segment in &self.segments {
            let mut next = Vec::new();
            for value in current {
                match segment {
                    PathSegment::Field(name) => {
                        if let Some(child) = value.get(name.as_str()) {
                            next.push(child);
                        }
                    }
                    PathSegment::Index(i) => {
                        if let Some(child) = value.as_array().and_then(|a| a.get(*i)) {
                            next.push(child);
                        }
                    }
                    PathSegment::Wildcard => {
                        if let Some(items) = value.as_array() {
                            next.extend(items.iter());
                        }
                    }
                }
            }
            current = next;
        }
        current
    }

    pub fn first<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.resolve(document).into_iter().next()
    }

    /// Copy of the document reduced to this path, keeping the nesting.
    /// An index keeps the selected element as a one-element array and a
    /// wildcard keeps every element. `None` when nothing is reached.
    pub fn extract(&self, document: &Value) -> Option<Value> {
        extract_segments(&self.segments, document)
    }

    /// Nested object holding `value` at this path. Only plain paths can be
    /// nested.
    pub fn nest(&self, value: Value) -> Option<Value> {
        let mut nested = value;
        for segment in self.segments.iter().rev() {
            let PathSegment::Field(name) = segment else {
                return None;
            };
            let mut map = Map::new();
            map.insert(name.clone(), nested);
            nested = Value::Object(map);
        }
        Some(nested)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 && matches!(segment, PathSegment::Field(_)) {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

fn read_until<I: Iterator<Item = char>>(
    chars: &mut std::iter::Peekable<I>,
    end: char,
) -> Option<String> {
    let mut out = String::new();
    for ch in chars.by_ref() {
        if ch == end {
            return Some(out);
        }
        out.push(ch);
    }
    None
}

fn bracket_segment(path: &str, inner: &str) -> Result<PathSegment, FieldPathError> {
    let inner = inner.trim();
    if inner.is_empty() || inner == "*" {
        return Ok(PathSegment::Wildcard);
    }
    if let Some(quoted) = inner
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        return Ok(PathSegment::Field(quoted.to_string()));
    }
    inner
        .parse::<usize>()
        .map(PathSegment::Index)
        .map_err(|_| FieldPathError::InvalidIndex {
            path: path.to_string(),
            index: inner.to_string(),
        })
}

fn extract_segments(segments: &[PathSegment], value: &Value) -> Option<Value> {
    let Some((segment, rest)) = segments.split_first() else {
        return Some(value.clone());
    };
    match segment {
        PathSegment::Field(name) => {
            let child = value.get(name.as_str())?;
            let extracted = extract_segments(rest, child)?;
            let mut map = Map::new();
            map.insert(name.clone(), extracted);
            Some(Value::Object(map))
        }
        PathSegment::Index(i) => {
            let child = value.as_array()?.get(*i)?;
            Some(Value::Array(vec![extract_segments(rest, child)?]))
        }
        PathSegment::Wildcard => {
            let items = value.as_array()?;
            Some(Value::Array(
                items
                    .iter()
                    .map(|item| extract_segments(rest, item).unwrap_or(Value::Null))
                    .collect(),
            ))
        }
    }
}
