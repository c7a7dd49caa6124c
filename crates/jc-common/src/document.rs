//! Store-boundary validation.
//!
//! Stored documents are loosely shaped: fields go missing, numbers arrive as strings,
//! skills are sometimes an array instead of a delimited string. Everything is coerced
//! here once so that scoring only ever works with `Option` fields.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::{
    ApprovalStatus, Candidate, CandidateDetail, Company, EducationEntry, EmploymentEntry, Job,
};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DocumentError {
    #[error("document is not an object (found {0})")]
    NotAnObject(&'static str),
    #[error("document has no usable _id")]
    MissingId,
    #[error("field `{field}` has unexpected type {found}")]
    InvalidField {
        field: &'static str,
        found: &'static str,
    },
}

/// What a wrong-typed field does to the document it sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// The whole document is rejected
    Strict,
    /// The field reads as absent and a warning is logged
    Lenient,
}

pub trait FromDocument: Sized {
    fn from_document_with(doc: &Value, coercion: Coercion) -> Result<Self, DocumentError>;

    fn from_document(doc: &Value) -> Result<Self, DocumentError> {
        Self::from_document_with(doc, Coercion::Strict)
    }

    /// Fails only for a non-object document or one without a usable `_id`.
    fn from_document_lenient(doc: &Value) -> Result<Self, DocumentError> {
        Self::from_document_with(doc, Coercion::Lenient)
    }
}

pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn as_object(doc: &Value) -> Result<&Map<String, Value>, DocumentError> {
    doc.as_object()
        .ok_or_else(|| DocumentError::NotAnObject(value_kind(doc)))
}

/// Identifier as stored: a string, a number, or an extended-JSON `{"$oid": "..."}`.
pub fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("$oid").and_then(id_from_value),
        _ => None,
    }
}

/// `_id` of a raw document, if it has one.
pub fn document_id(doc: &Value) -> Option<String> {
    doc.get("_id").and_then(id_from_value)
}

fn required_id(obj: &Map<String, Value>) -> Result<String, DocumentError> {
    obj.get("_id")
        .and_then(id_from_value)
        .ok_or(DocumentError::MissingId)
}

fn reference_field(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, DocumentError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => id_from_value(value).map(Some).ok_or(DocumentError::InvalidField {
            field,
            found: value_kind(value),
        }),
    }
}

/// Free text. Empty strings count as absent; arrays of strings are joined with ", ".
fn text_field(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, DocumentError> {
    let text = match obj.get(field) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => {
            return Err(DocumentError::InvalidField {
                field,
                found: value_kind(other),
            });
        }
    };

    if text.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

fn years_field(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<f64>, DocumentError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value @ Value::String(s)) => {
            s.trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| DocumentError::InvalidField {
                    field,
                    found: value_kind(value),
                })
        }
        Some(other) => Err(DocumentError::InvalidField {
            field,
            found: value_kind(other),
        }),
    }
}

fn bool_field(obj: &Map<String, Value>, field: &'static str) -> Result<bool, DocumentError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(true),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") || s.is_empty() => Ok(false),
        Some(other) => Err(DocumentError::InvalidField {
            field,
            found: value_kind(other),
        }),
    }
}

/// Object entries of a list field. Non-object items and non-list values are ignored.
fn object_entries<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> impl Iterator<Item = &'a Map<String, Value>> {
    obj.get(field)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn approval_status_field(obj: &Map<String, Value>) -> Result<ApprovalStatus, DocumentError> {
    match obj.get("approval_status") {
        Some(Value::String(s)) => Ok(ApprovalStatus::parse_lenient(s)),
        None | Some(Value::Null) => Ok(ApprovalStatus::default()),
        Some(other) => Err(DocumentError::InvalidField {
            field: "approval_status",
            found: value_kind(other),
        }),
    }
}

/// Field reader for one document that applies its [`Coercion`].
struct Fields<'a> {
    obj: &'a Map<String, Value>,
    doc_id: &'a str,
    coercion: Coercion,
}

impl<'a> Fields<'a> {
    fn new(obj: &'a Map<String, Value>, doc_id: &'a str, coercion: Coercion) -> Self {
        Self {
            obj,
            doc_id,
            coercion,
        }
    }

    /// Same document id and coercion, reading a nested entry.
    fn entry(&self, obj: &'a Map<String, Value>) -> Self {
        Self::new(obj, self.doc_id, self.coercion)
    }

    fn recover<T: Default>(&self, read: Result<T, DocumentError>) -> Result<T, DocumentError> {
        match read {
            Err(err @ DocumentError::InvalidField { .. }) if self.coercion == Coercion::Lenient => {
                warn!(document_id = self.doc_id, error = %err, "treating malformed field as absent");
                Ok(T::default())
            }
            read => read,
        }
    }

    fn text(&self, field: &'static str) -> Result<Option<String>, DocumentError> {
        self.recover(text_field(self.obj, field))
    }

    fn years(&self, field: &'static str) -> Result<Option<f64>, DocumentError> {
        self.recover(years_field(self.obj, field))
    }

    fn flag(&self, field: &'static str) -> Result<bool, DocumentError> {
        self.recover(bool_field(self.obj, field))
    }

    fn reference(&self, field: &'static str) -> Result<Option<String>, DocumentError> {
        self.recover(reference_field(self.obj, field))
    }

    fn approval_status(&self) -> Result<ApprovalStatus, DocumentError> {
        self.recover(approval_status_field(self.obj))
    }

    fn entries(&self, field: &'static str) -> impl Iterator<Item = Fields<'a>> + '_ {
        object_entries(self.obj, field).map(|entry| self.entry(entry))
    }
}

impl FromDocument for Job {
    fn from_document_with(doc: &Value, coercion: Coercion) -> Result<Self, DocumentError> {
        let obj = as_object(doc)?;
        let id = required_id(obj)?;
        let fields = Fields::new(obj, &id, coercion);
        Ok(Job {
            title: fields.text("title")?,
            description: fields.text("description")?,
            skills: fields.text("skills")?,
            location: fields.text("location")?,
            company_id: fields.reference("company")?,
            id,
        })
    }
}

impl FromDocument for Company {
    fn from_document_with(doc: &Value, coercion: Coercion) -> Result<Self, DocumentError> {
        let obj = as_object(doc)?;
        let id = required_id(obj)?;
        let fields = Fields::new(obj, &id, coercion);
        Ok(Company {
            employer_name: fields.text("employer_name")?,
            location: fields.text("location")?,
            id,
        })
    }
}

impl FromDocument for Candidate {
    fn from_document_with(doc: &Value, coercion: Coercion) -> Result<Self, DocumentError> {
        let obj = as_object(doc)?;
        let id = required_id(obj)?;
        let fields = Fields::new(obj, &id, coercion);
        Ok(Candidate {
            first_name: fields.text("first_name")?,
            last_name: fields.text("last_name")?,
            email: fields.text("email")?,
            city: fields.text("city")?,
            skills: fields.text("skills")?,
            job_role: fields.text("job_role")?,
            years_of_experience: fields.years("years_of_experience")?,
            is_job_seeking: fields.flag("is_job_seeking")?,
            approval_status: fields.approval_status()?,
            about: fields.text("about")?,
            biggest_achievement: fields.text("biggest_achievement")?,
            job_expectations: fields.text("job_expectations")?,
            id,
        })
    }
}

impl FromDocument for CandidateDetail {
    /// Detail records need no `_id` of their own.
    fn from_document_with(doc: &Value, coercion: Coercion) -> Result<Self, DocumentError> {
        let obj = as_object(doc)?;
        let id = document_id(doc);
        let fields = Fields::new(obj, id.as_deref().unwrap_or("unknown"), coercion);

        let education = fields
            .entries("education")
            .map(|entry| {
                Ok(EducationEntry {
                    summary: entry.text("summary")?,
                    major: entry.text("major")?,
                })
            })
            .collect::<Result<Vec<_>, DocumentError>>()?;

        let employment = fields
            .entries("employment")
            .map(|entry| {
                Ok(EmploymentEntry {
                    summary: entry.text("summary")?,
                    job_title: entry.text("job_title")?,
                })
            })
            .collect::<Result<Vec<_>, DocumentError>>()?;

        Ok(CandidateDetail {
            candidate_id: fields.reference("candidate")?,
            skills: fields.text("skills")?,
            job_role: fields.text("job_role")?,
            years_experience: fields.years("years_experience")?,
            education,
            employment,
            id,
        })
    }
}
