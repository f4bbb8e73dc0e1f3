//! Core entity definitions for the tracker.
//!
//! This crate defines the records shared by every service (users, defects,
//! projects, stage options) and the append-only history log attached to
//! defects and projects. Mutations are methods on the entities so that a
//! field change and its history entry always travel together.

mod attachment;
mod defect;
mod history;
mod project;
mod stage_option;
mod user;

pub use attachment::*;
pub use defect::*;
pub use history::*;
pub use project::*;
pub use stage_option::*;
pub use user::*;
