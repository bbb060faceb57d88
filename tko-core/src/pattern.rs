//! Wildcard patterns for ID and metadata filters
//!
//! Two dialects compile to anchored regular expressions:
//! - generic patterns (metadata values): `*` matches anything
//! - ID patterns: `*` stays within one segment, `**` crosses `/` and `:`
//!
//! In both, `\` escapes the next character and everything else is literal.
//! A pattern set matches only if every pattern in it matches.

use regex::Regex;
use std::collections::HashMap;

use crate::error::{Result, TkoError};
use crate::resource::metadata::Metadata;

const ID_SEGMENT: &str = r"[0-9A-Za-z_.\-]*";
const ID_PATH: &str = r"[0-9A-Za-z_.\-/:]*";

/// Checks an entity ID against `^[0-9A-Za-z_.\-/:]+$`
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/' | ':'))
}

/// Compiles a generic pattern
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    compile(pattern, false)
}

/// Compiles an ID pattern
pub fn compile_id_pattern(pattern: &str) -> Result<Regex> {
    compile(pattern, true)
}

fn compile(pattern: &str, id: bool) -> Result<Regex> {
    let mut expression = String::from("^");
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars.next().unwrap_or('\\');
                expression.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4])));
            }
            '*' if id => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    expression.push_str(ID_PATH);
                } else {
                    expression.push_str(ID_SEGMENT);
                }
            }
            '*' => expression.push_str(".*"),
            other => expression.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }

    expression.push('$');
    Regex::new(&expression)
        .map_err(|e| TkoError::bad_argument(format!("invalid pattern {:?}: {}", pattern, e)))
}

/// Compiled ID patterns (AND semantics)
#[derive(Debug, Clone, Default)]
pub struct IdPatterns(Vec<Regex>);

impl IdPatterns {
    pub fn new(patterns: &[String]) -> Result<Self> {
        patterns
            .iter()
            .map(|pattern| compile_id_pattern(pattern))
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, id: &str) -> bool {
        self.0.iter().all(|pattern| pattern.is_match(id))
    }
}

/// Compiled metadata patterns (AND semantics, missing key never matches)
#[derive(Debug, Clone, Default)]
pub struct MetadataPatterns(Vec<(String, Regex)>);

impl MetadataPatterns {
    pub fn new(patterns: &HashMap<String, String>) -> Result<Self> {
        patterns
            .iter()
            .map(|(key, pattern)| Ok((key.clone(), compile_pattern(pattern)?)))
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.0.iter().all(|(key, pattern)| {
            metadata
                .get(key)
                .is_some_and(|value| pattern.is_match(value))
        })
    }
}

/// Whether `value` matches every generic pattern
pub fn matches_patterns(value: &str, patterns: &[String]) -> Result<bool> {
    for pattern in patterns {
        if !compile_pattern(pattern)?.is_match(value) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Whether `id` matches every ID pattern
pub fn id_matches_patterns(id: &str, patterns: &[String]) -> Result<bool> {
    Ok(IdPatterns::new(patterns)?.matches(id))
}

/// Whether `metadata` matches every keyed pattern
pub fn metadata_matches_patterns(
    metadata: &Metadata,
    patterns: &HashMap<String, String>,
) -> Result<bool> {
    Ok(MetadataPatterns::new(patterns)?.matches(metadata))
}
