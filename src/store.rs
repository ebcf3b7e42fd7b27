//! In-memory record store guarded by a single collection-wide lock.
//!
//! Every operation locks the whole collection. Compound operations (check-then-write) go
//! through [`StudentStore::lock`], which hands out a [`StoreGuard`] so the caller can run
//! several steps inside one critical section. Nothing here performs I/O while the lock is held.

use crate::models::Student;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Authoritative student collection plus the identifier counter.
#[derive(Debug)]
pub struct StudentStore {
    inner: Mutex<StoreState>,
}

#[derive(Debug)]
struct StoreState {
    students: BTreeMap<u64, Student>,
    next_id: u64,
}

/// Student fields before an identifier has been assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsavedStudent {
    /// Display name.
    pub name: String,
    /// Age in years.
    pub age: u8,
    /// Normalized email.
    pub email: String,
}

/// Exclusive access to the collection for the lifetime of the guard.
pub struct StoreGuard<'a> {
    state: MutexGuard<'a, StoreState>,
}

impl StudentStore {
    /// Create an empty store whose first identifier is `1`.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreState {
                students: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Acquire the collection lock.
    ///
    /// Mutations are applied in a single assignment, so a poisoned lock never exposes a
    /// half-written record and is recovered rather than propagated.
    pub fn lock(&self) -> StoreGuard<'_> {
        StoreGuard {
            state: self.inner.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Insert a record under a freshly assigned identifier.
    pub fn insert(&self, record: UnsavedStudent) -> Student {
        self.lock().insert(record)
    }

    /// Fetch a copy of the record with `id`.
    pub fn get(&self, id: u64) -> Option<Student> {
        self.lock().get(id)
    }

    /// Snapshot of every record in identifier (insertion) order.
    pub fn list_all(&self) -> Vec<Student> {
        self.lock().list_all()
    }

    /// Apply `mutator` to the record with `id`, returning the updated copy.
    pub fn update<F>(&self, id: u64, mutator: F) -> Option<Student>
    where
        F: FnOnce(&mut Student),
    {
        self.lock().update(id, mutator)
    }

    /// Remove the record with `id`; `true` when something was removed.
    pub fn delete(&self, id: u64) -> bool {
        self.lock().delete(id)
    }
}

impl Default for StudentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreGuard<'_> {
    /// Insert a record under a freshly assigned identifier.
    pub fn insert(&mut self, record: UnsavedStudent) -> Student {
        let id = self.state.next_id;
        self.state.next_id += 1;
        let student = Student {
            id,
            name: record.name,
            age: record.age,
            email: record.email,
        };
        self.state.students.insert(id, student.clone());
        student
    }

    /// Fetch a copy of the record with `id`.
    pub fn get(&self, id: u64) -> Option<Student> {
        self.state.students.get(&id).cloned()
    }

    /// Snapshot of every record in identifier order.
    pub fn list_all(&self) -> Vec<Student> {
        self.state.students.values().cloned().collect()
    }

    /// Apply `mutator` to a clone of the record and store the clone.
    ///
    /// The identifier is restored after the mutator runs, so it can never change.
    pub fn update<F>(&mut self, id: u64, mutator: F) -> Option<Student>
    where
        F: FnOnce(&mut Student),
    {
        let mut updated = self.state.students.get(&id)?.clone();
        mutator(&mut updated);
        updated.id = id;
        self.state.students.insert(id, updated.clone());
        Some(updated)
    }

    /// Remove the record with `id`; `true` when something was removed.
    pub fn delete(&mut self, id: u64) -> bool {
        self.state.students.remove(&id).is_some()
    }

    /// Whether a record other than `exclude` already uses `email`.
    ///
    /// `email` must already be normalized; stored emails always are.
    pub fn email_in_use(&self, email: &str, exclude: Option<u64>) -> bool {
        self.state
            .students
            .values()
            .any(|student| student.email == email && Some(student.id) != exclude)
    }
}
