use regex::{Regex, RegexBuilder};
use serde_json::Value;

use super::StoreError;
use crate::document::id_from_value;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every document
    All,
    Eq {
        field: String,
        value: Value,
    },
    Ne {
        field: String,
        value: Value,
    },
    In {
        field: String,
        values: Vec<Value>,
    },
    Regex {
        field: String,
        pattern: String,
        case_insensitive: bool,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in(field: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Self {
        Filter::In {
            field: field.into(),
            values: values.into_iter().collect(),
        }
    }

    /// Case-insensitive regex, the form every relevance search uses
    pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::Regex {
            field: field.into(),
            pattern: pattern.into(),
            case_insensitive: true,
        }
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    /// Validates field paths and compiles regexes once, for repeated evaluation.
    pub fn compile(&self) -> Result<CompiledFilter, StoreError> {
        Ok(match self {
            Filter::All => CompiledFilter::All,
            Filter::Eq { field, value } => CompiledFilter::Eq {
                path: field_path(field)?,
                value: value.clone(),
            },
            Filter::Ne { field, value } => CompiledFilter::Ne {
                path: field_path(field)?,
                value: value.clone(),
            },
            Filter::In { field, values } => CompiledFilter::In {
                path: field_path(field)?,
                values: values.clone(),
            },
            Filter::Regex {
                field,
                pattern,
                case_insensitive,
            } => CompiledFilter::Regex {
                path: field_path(field)?,
                regex: compile_regex(pattern, *case_insensitive)?,
            },
            Filter::And(filters) => CompiledFilter::And(
                filters
                    .iter()
                    .map(Filter::compile)
                    .collect::<Result<_, _>>()?,
            ),
            Filter::Or(filters) => CompiledFilter::Or(
                filters
                    .iter()
                    .map(Filter::compile)
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    pub fn matches(&self, doc: &Value) -> Result<bool, StoreError> {
        Ok(self.compile()?.matches(doc))
    }
}

pub(crate) fn compile_regex(pattern: &str, case_insensitive: bool) -> Result<Regex, StoreError> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|err| StoreError::InvalidFilter(format!("bad regex `{pattern}`: {err}")))
}

/// Dotted field name split into path segments.
pub(crate) fn field_path(field: &str) -> Result<Vec<String>, StoreError> {
    let segments: Vec<String> = field.split('.').map(str::to_string).collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(StoreError::InvalidFilter(format!("bad field name `{field}`")));
    }
    Ok(segments)
}

#[derive(Debug, Clone)]
pub enum CompiledFilter {
    All,
    Eq { path: Vec<String>, value: Value },
    Ne { path: Vec<String>, value: Value },
    In { path: Vec<String>, values: Vec<Value> },
    Regex { path: Vec<String>, regex: Regex },
    And(Vec<CompiledFilter>),
    Or(Vec<CompiledFilter>),
}

impl CompiledFilter {
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            CompiledFilter::All => true,
            CompiledFilter::Eq { path, value } => field_equals(lookup(doc, path), value),
            CompiledFilter::Ne { path, value } => !field_equals(lookup(doc, path), value),
            CompiledFilter::In { path, values } => {
                let found = lookup(doc, path);
                values.iter().any(|value| field_equals(found, value))
            }
            CompiledFilter::Regex { path, regex } => match lookup(doc, path) {
                Some(Value::Array(items)) => items.iter().any(|item| regex_matches(regex, item)),
                Some(value) => regex_matches(regex, value),
                None => false,
            },
            CompiledFilter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            CompiledFilter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }
}

fn lookup<'a>(doc: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |current, segment| current.get(segment))
}

/// Equality as a document database applies it: an `{"$oid"}` wrapper equals its
/// string, an array equals any of its elements, and `null` also matches an absent field.
fn field_equals(found: Option<&Value>, expected: &Value) -> bool {
    match (found, expected) {
        (None, Value::Null) => true,
        (None, _) => false,
        (Some(Value::Array(items)), _) if !expected.is_array() => {
            items.iter().any(|item| scalar_equals(item, expected))
        }
        (Some(value), _) => scalar_equals(value, expected),
    }
}

fn scalar_equals(found: &Value, expected: &Value) -> bool {
    if found == expected {
        return true;
    }
    match (found, expected) {
        (Value::Object(_), Value::String(_)) | (Value::String(_), Value::Object(_)) => {
            match (id_from_value(found), id_from_value(expected)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        }
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => false,
    }
}

fn regex_matches(regex: &Regex, value: &Value) -> bool {
    match value {
        Value::String(s) => regex.is_match(s),
        Value::Number(n) => regex.is_match(&n.to_string()),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub limit: Option<usize>,
}

impl FindQuery {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            limit: None,
        }
    }

    pub fn all() -> Self {
        Self::new(Filter::All)
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_optional_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}
