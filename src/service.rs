//! Business rules layered on the record store.
//!
//! The service normalizes emails and enforces their uniqueness. Each create or update runs
//! its uniqueness check and its write while holding one store lock, so no two records can
//! ever end up sharing an email.

use crate::models::{FieldPatch, Student, StudentFields, normalize_email};
use crate::store::{StudentStore, UnsavedStudent};
use std::sync::Arc;
use thiserror::Error;

/// Domain failures raised by [`StudentService`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StudentError {
    /// Another record already uses the (normalized) email.
    #[error("Email already exists")]
    Conflict,
}

/// CRUD operations over students with email uniqueness.
#[derive(Debug, Clone)]
pub struct StudentService {
    store: Arc<StudentStore>,
}

impl StudentService {
    /// Build a service over the given store.
    pub fn new(store: Arc<StudentStore>) -> Self {
        Self { store }
    }

    /// Create a student, rejecting emails already taken (case-insensitively).
    pub fn create(&self, input: StudentFields) -> Result<Student, StudentError> {
        let email = normalize_email(&input.email);
        let mut guard = self.store.lock();
        if guard.email_in_use(&email, None) {
            tracing::info!(email = %email, "Rejected duplicate email on create");
            return Err(StudentError::Conflict);
        }
        let student = guard.insert(UnsavedStudent {
            name: input.name,
            age: input.age,
            email,
        });
        tracing::debug!(id = student.id, "Created student");
        Ok(student)
    }

    /// Look up a student by identifier.
    pub fn get_by_id(&self, id: u64) -> Option<Student> {
        self.store.get(id)
    }

    /// Snapshot of all students.
    pub fn list_all(&self) -> Vec<Student> {
        self.store.list_all()
    }

    /// Apply only the fields present in `patch`.
    ///
    /// Returns `Ok(None)` when no student has `id`. On conflict the stored record is left
    /// unchanged.
    pub fn update(&self, id: u64, patch: FieldPatch) -> Result<Option<Student>, StudentError> {
        let email = patch.email.as_deref().map(normalize_email);
        let mut guard = self.store.lock();
        if guard.get(id).is_none() {
            return Ok(None);
        }
        if let Some(email) = email.as_deref() {
            if guard.email_in_use(email, Some(id)) {
                tracing::info!(id, email = %email, "Rejected duplicate email on update");
                return Err(StudentError::Conflict);
            }
        }
        let FieldPatch { name, age, .. } = patch;
        let updated = guard.update(id, |student| {
            if let Some(name) = name {
                student.name = name;
            }
            if let Some(age) = age {
                student.age = age;
            }
            if let Some(email) = email {
                student.email = email;
            }
        });
        tracing::debug!(id, "Updated student");
        Ok(updated)
    }

    /// Remove a student; `true` when a record was deleted.
    pub fn delete(&self, id: u64) -> bool {
        let removed = self.store.delete(id);
        tracing::debug!(id, removed, "Delete student");
        removed
    }
}
