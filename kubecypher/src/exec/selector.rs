// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Equality-based field and label selectors
//!
//! A [`Selector`] is an AND of [`Requirement`]s. Label requirements are
//! checked against `metadata.labels`, field requirements against the dotted
//! document path named by the key. Rendering follows the platform's
//! `key=value,key!=value` text form.

use crate::exec::field_path::FieldPath;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

static LABEL_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").expect("label name pattern")
});

static DNS_SUBDOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("dns subdomain pattern")
});

static FIELD_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("field path pattern")
});

const MAX_LABEL_LENGTH: usize = 63;
const MAX_PREFIX_LENGTH: usize = 253;

/// Errors raised while building selectors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Invalid label key '{0}'")]
    InvalidLabelKey(String),

    #[error("Invalid value '{value}' for label '{key}'")]
    InvalidLabelValue { key: String, value: String },

    #[error("Invalid field path '{0}'")]
    InvalidFieldPath(String),

    #[error("Filter path '{0}' does not start with a bound variable")]
    UnknownBinding(String),

    #[error("Empty filter path")]
    EmptyPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorOperator {
    Equal,
    NotEqual,
}

impl fmt::Display for SelectorOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorOperator::Equal => write!(f, "="),
            SelectorOperator::NotEqual => write!(f, "!="),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub key: String,
    pub operator: SelectorOperator,
    pub value: String,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.key, self.operator, escape_value(&self.value))
    }
}

/// Conjunction of requirements. An empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Add a validated label requirement
    pub fn add_label(
        &mut self,
        key: &str,
        operator: SelectorOperator,
        value: &str,
    ) -> Result<(), SelectorError> {
        validate_label_key(key)?;
        validate_label_value(key, value)?;
        self.push(key, operator, value);
        Ok(())
    }

    /// Add a validated field requirement
    pub fn add_field(
        &mut self,
        path: &str,
        operator: SelectorOperator,
        value: &str,
    ) -> Result<(), SelectorError> {
        if !FIELD_PATH.is_match(path) {
            return Err(SelectorError::InvalidFieldPath(path.to_string()));
        }
        self.push(path, operator, value);
        Ok(())
    }

    fn push(&mut self, key: &str, operator: SelectorOperator, value: &str) {
        let requirement = Requirement {
            key: key.to_string(),
            operator,
            value: value.to_string(),
        };
        if !self.requirements.contains(&requirement) {
            self.requirements.push(requirement);
        }
    }

    /// Evaluate as a label selector against `metadata.labels`. A missing
    /// label fails `=` and satisfies `!=`.
    pub fn matches_labels(&self, document: &Value) -> bool {
        let labels = document.pointer("/metadata/labels");
        self.requirements.iter().all(|r| {
            let actual = labels.and_then(|l| l.get(&r.key)).and_then(Value::as_str);
            match r.operator {
                SelectorOperator::Equal => actual == Some(r.value.as_str()),
                SelectorOperator::NotEqual => actual != Some(r.value.as_str()),
            }
        })
    }

    /// Evaluate as a field selector. Missing fields compare as the empty
    /// string, scalars by their textual form.
    pub fn matches_fields(&self, document: &Value) -> bool {
        self.requirements.iter().all(|r| {
            let actual = FieldPath::parse(&r.key)
                .ok()
                .and_then(|path| path.first(document).map(scalar_text))
                .unwrap_or_default();
            match r.operator {
                SelectorOperator::Equal => actual == r.value,
                SelectorOperator::NotEqual => actual != r.value,
            }
        })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, requirement) in self.requirements.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", requirement)?;
        }
        Ok(())
    }
}

/// Text of a scalar document value; objects and arrays render as JSON
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | ',' | '=') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn validate_label_key(key: &str) -> Result<(), SelectorError> {
    let invalid = || SelectorError::InvalidLabelKey(key.to_string());
    let name = match key.split_once('/') {
        Some((prefix, name)) => {
            if prefix.is_empty()
                || prefix.len() > MAX_PREFIX_LENGTH
                || !DNS_SUBDOMAIN.is_match(prefix)
            {
                return Err(invalid());
            }
            name
        }
        None => key,
    };
    if name.len() > MAX_LABEL_LENGTH || !LABEL_NAME.is_match(name) {
        return Err(invalid());
    }
    Ok(())
}

fn validate_label_value(key: &str, value: &str) -> Result<(), SelectorError> {
    if value.is_empty() {
        return Ok(());
    }
    if value.len() > MAX_LABEL_LENGTH || !LABEL_NAME.is_match(value) {
        return Err(SelectorError::InvalidLabelValue {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}
