#![deny(missing_docs)]

//! Core library for the student registry service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Student records and boundary validation.
pub mod models;
/// Student CRUD rules on top of the record store.
pub mod service;
/// In-memory student record store.
pub mod store;
/// Ollama-backed student summaries.
pub mod summary;
