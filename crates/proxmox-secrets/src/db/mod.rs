//! Database module for the PostgreSQL storage backend.
//!
//! This module provides the connection pool and the queries behind
//! [`crate::storage::PgStorage`].

pub mod pool;
pub mod queries;

pub use pool::{create_pool, DbPool};
