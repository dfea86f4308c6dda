//! Database queries for the storage backend.

pub mod entry;
