//! Declarative request validation.
//!
//! Each request record walks its fields through a [`Validator`], one rule per
//! field. Rules never short-circuit: every broken rule is recorded, and the
//! caller gets the full list back as [`ValidationErrors`].

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;

use crate::id::ObjectId;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// A single broken rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Violation {
    /// Request field the rule applies to (camelCase, as sent by the client)
    pub field: String,
    /// What is wrong with it
    pub message: String,
    /// The offending value, when there was one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<serde_json::Value>,
}

/// Non-empty list of violations produced by a failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    summary: Option<String>,
    violations: Vec<Violation>,
}

impl ValidationErrors {
    /// Top-level message: the summary when one was set, otherwise the first
    /// violation prefixed with "Invalid input:".
    pub fn message(&self) -> String {
        match (&self.summary, self.violations.first()) {
            (Some(summary), _) => summary.clone(),
            (None, Some(first)) => format!("Invalid input: {}", first.message),
            (None, None) => "Invalid input.".to_string(),
        }
    }

    pub fn first(&self) -> Option<&Violation> {
        self.violations.first()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    #[cfg(test)]
    pub(crate) fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for ValidationErrors {}

/// A closed set of string values accepted verbatim (case-sensitive).
pub trait Enumerated: Sized + Copy + 'static {
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn parse(raw: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == raw)
    }

    /// Permitted values rendered as `['A', 'B', 'C']`.
    fn permitted() -> String {
        let quoted: Vec<String> = Self::ALL
            .iter()
            .map(|v| format!("'{}'", v.as_str()))
            .collect();
        format!("[{}]", quoted.join(", "))
    }
}

/// The raw value, unless it is absent or only whitespace. Enum and id rules
/// match it untrimmed.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Collects violations while extracting normalized values.
///
/// Every rule returns `Some(value)` when the field passed and `None` after
/// recording a violation, so a clean validator guarantees all required
/// values are present.
#[derive(Debug, Default)]
pub struct Validator {
    summary: Option<String>,
    violations: Vec<Violation>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation directly.
    pub fn reject(
        &mut self,
        field: &str,
        message: impl Into<String>,
        received: Option<serde_json::Value>,
    ) {
        self.violations.push(Violation {
            field: field.to_string(),
            message: message.into(),
            received,
        });
    }

    /// Replace the "Invalid input: <first violation>" message.
    pub fn summarize(&mut self, summary: impl Into<String>) {
        self.summary = Some(summary.into());
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(self.into_errors())
        }
    }

    pub fn into_errors(self) -> ValidationErrors {
        ValidationErrors {
            summary: self.summary,
            violations: self.violations,
        }
    }

    /// Present and not blank. Returns the trimmed value.
    pub fn required_str(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v.to_string()),
            _ => {
                self.reject(field, format!("'{field}' is required."), None);
                None
            }
        }
    }

    /// Required member of `E`.
    pub fn required_enum<E: Enumerated>(&mut self, field: &str, value: Option<&str>) -> Option<E> {
        match non_blank(value) {
            Some(v) => self.enum_value(field, v),
            _ => {
                self.reject(field, format!("'{field}' is required."), None);
                None
            }
        }
    }

    /// Member of `E` when present. Absent or blank values are not a violation.
    pub fn optional_enum<E: Enumerated>(&mut self, field: &str, value: Option<&str>) -> Option<E> {
        non_blank(value).and_then(|v| self.enum_value(field, v))
    }

    fn enum_value<E: Enumerated>(&mut self, field: &str, raw: &str) -> Option<E> {
        let parsed = E::parse(raw);
        if parsed.is_none() {
            self.reject(
                field,
                format!("'{field}' must be one of {}.", E::permitted()),
                Some(serde_json::Value::String(raw.to_string())),
            );
        }
        parsed
    }

    /// Required reference to another document.
    pub fn object_id(&mut self, field: &str, value: Option<&str>) -> Option<ObjectId> {
        match non_blank(value) {
            Some(v) => self.object_id_value(field, v),
            _ => {
                self.reject(field, format!("'{field}' is required."), None);
                None
            }
        }
    }

    /// Reference to another document when present. Absent or blank values
    /// are not a violation.
    pub fn optional_object_id(&mut self, field: &str, value: Option<&str>) -> Option<ObjectId> {
        non_blank(value).and_then(|v| self.object_id_value(field, v))
    }

    fn object_id_value(&mut self, field: &str, raw: &str) -> Option<ObjectId> {
        match raw.parse::<ObjectId>() {
            Ok(id) => Some(id),
            Err(_) => {
                self.reject(
                    field,
                    format!("'{field}' must be a valid 24-character hex ID."),
                    Some(serde_json::Value::String(raw.to_string())),
                );
                None
            }
        }
    }

    /// Integer >= 1.
    pub fn positive_int(&mut self, field: &str, value: Option<i64>) -> Option<i64> {
        match value {
            Some(v) if v >= 1 => Some(v),
            Some(v) => {
                self.reject(
                    field,
                    format!("'{field}' must be a positive integer."),
                    Some(serde_json::json!(v)),
                );
                None
            }
            None => {
                self.reject(field, format!("'{field}' is required."), None);
                None
            }
        }
    }

    /// Required, and shaped like `user@domain.tld`.
    pub fn email(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        let email = self.required_str(field, value)?;
        if EMAIL_PATTERN.is_match(&email) {
            Some(email)
        } else {
            self.reject(
                field,
                format!("'{field}' must be a valid email address."),
                Some(serde_json::Value::String(email)),
            );
            None
        }
    }
}
