//! Student records and the request shapes accepted at the HTTP boundary.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

const NAME_MIN_LEN: usize = 3;
const NAME_MAX_LEN: usize = 50;
const AGE_MIN_EXCLUSIVE: i64 = 0;
const AGE_MAX_EXCLUSIVE: i64 = 130;

/// Stored student record returned by every read and write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Identifier assigned by the store; never reused within a process.
    pub id: u64,
    /// Display name (letters and spaces).
    pub name: String,
    /// Age in years.
    pub age: u8,
    /// Lower-cased email address, unique across the store.
    pub email: String,
}

/// Payload for `POST /students`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewStudent {
    /// Display name.
    pub name: String,
    /// Age in years.
    pub age: i64,
    /// Email address in any casing.
    pub email: String,
}

/// Payload for `PUT /students/{id}`; absent or `null` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudentPatch {
    /// Replacement name.
    #[serde(default)]
    pub name: Option<String>,
    /// Replacement age.
    #[serde(default)]
    pub age: Option<i64>,
    /// Replacement email.
    #[serde(default)]
    pub email: Option<String>,
}

/// Validated student fields ready to be handed to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentFields {
    /// Display name.
    pub name: String,
    /// Age in years.
    pub age: u8,
    /// Email address, not yet normalized.
    pub email: String,
}

/// Validated partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPatch {
    /// Replacement name.
    pub name: Option<String>,
    /// Replacement age.
    pub age: Option<u8>,
    /// Replacement email, not yet normalized.
    pub email: Option<String>,
}

/// Field-level constraint violations detected before the service is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Name length outside the accepted range.
    #[error("name must be between 3 and 50 characters")]
    NameLength,
    /// Name contains something other than ASCII letters and spaces.
    #[error("Name must contain only letters and spaces")]
    NameCharacters,
    /// Age outside the open interval (0, 130).
    #[error("age must be greater than 0 and less than 130")]
    AgeOutOfRange,
    /// Email failed the syntax check.
    #[error("value is not a valid email address: {0}")]
    InvalidEmail(String),
}

impl NewStudent {
    /// Check every field constraint and produce the validated form.
    pub fn validate(self) -> Result<StudentFields, ValidationError> {
        Ok(StudentFields {
            name: validate_name(self.name)?,
            age: validate_age(self.age)?,
            email: validate_email(self.email)?,
        })
    }
}

impl StudentPatch {
    /// Check the constraints of every provided field.
    pub fn validate(self) -> Result<FieldPatch, ValidationError> {
        Ok(FieldPatch {
            name: self.name.map(validate_name).transpose()?,
            age: self.age.map(validate_age).transpose()?,
            email: self.email.map(validate_email).transpose()?,
        })
    }
}

fn validate_name(name: String) -> Result<String, ValidationError> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let length = name.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&length) {
        return Err(ValidationError::NameLength);
    }
    let pattern = PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z ]+$").expect("valid name regex"));
    if !pattern.is_match(&name) {
        return Err(ValidationError::NameCharacters);
    }
    Ok(name)
}

fn validate_age(age: i64) -> Result<u8, ValidationError> {
    if age <= AGE_MIN_EXCLUSIVE || age >= AGE_MAX_EXCLUSIVE {
        return Err(ValidationError::AgeOutOfRange);
    }
    u8::try_from(age).map_err(|_| ValidationError::AgeOutOfRange)
}

fn validate_email(email: String) -> Result<String, ValidationError> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.[A-Za-z]{2,}$",
        )
        .expect("valid email regex")
    });
    let trimmed = email.trim();
    if !pattern.is_match(trimmed) || trimmed.starts_with('.') || trimmed.contains("..") {
        return Err(ValidationError::InvalidEmail(email));
    }
    Ok(trimmed.to_string())
}

/// Lower-case an email so uniqueness is case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
