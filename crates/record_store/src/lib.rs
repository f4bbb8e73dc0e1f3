//! Record storage for the tracker services
//!
//! This crate provides the storage abstraction behind every service: users,
//! defects, projects and stage options. History logs are stored together with
//! their entity so that a mutation and its history entry are committed by the
//! same write. Backends: SQLite (via sqlx) and an in-memory store for tests.

mod error;
mod memory;
mod sqlite;
mod traits;

pub use error::*;
pub use memory::*;
pub use sqlite::*;
pub use traits::*;
